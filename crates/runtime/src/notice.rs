//! User-visible notices
//!
//! Conditions like a missing task source or document are surfaced once to
//! the user instead of failing the operation.

use std::sync::{Arc, Mutex};
use tracing::warn;

/// Receives user-visible notices
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Shared notifier reference
pub type SharedNotifier = Arc<dyn Notifier>;

/// Notifier that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        warn!("notice: {}", message);
    }
}

/// Notifier that records messages
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    messages: Mutex<Vec<String>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, message: &str) {
        warn!("notice: {}", message);
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}
