//! Status Mapper - column name <-> persisted status symbol
//!
//! Lookups never fail: unknown symbols land in the first column, except
//! completion symbols (`x`/`X`) which first try a column named "Done".

use tracing::debug;

use crate::config::{BoardConfig, Column};

/// Symbol written when the configuration has no columns at all
const BLANK_SYMBOL: char = ' ';

/// Maps between columns and status symbols for one configuration
#[derive(Debug, Clone, Copy)]
pub struct StatusMapper<'a> {
    config: &'a BoardConfig,
}

impl<'a> StatusMapper<'a> {
    pub fn new(config: &'a BoardConfig) -> Self {
        Self { config }
    }

    /// Symbol persisted for a column; unknown columns map to the first column's symbol
    pub fn column_to_symbol(&self, column: &str) -> char {
        match self.config.column(column) {
            Some(c) => c.symbol,
            None => {
                debug!("Unknown column '{}', using default symbol", column);
                self.config
                    .default_column()
                    .map(|c| c.symbol)
                    .unwrap_or(BLANK_SYMBOL)
            }
        }
    }

    /// Column for a symbol
    pub fn symbol_to_column(&self, symbol: char) -> Option<&'a Column> {
        let columns = &self.config.columns;

        if let Some(column) = columns.iter().find(|c| c.symbol == symbol) {
            return Some(column);
        }

        if matches!(symbol, 'x' | 'X') {
            if let Some(done) = columns.iter().find(|c| c.name.eq_ignore_ascii_case("done")) {
                return Some(done);
            }
        }

        debug!("Unmapped status symbol {:?}, using default column", symbol);
        self.config.default_column()
    }

    /// Column name for a symbol, empty when no columns are configured
    pub fn column_name(&self, symbol: char) -> String {
        self.symbol_to_column(symbol)
            .map(|c| c.name.clone())
            .unwrap_or_default()
    }
}
