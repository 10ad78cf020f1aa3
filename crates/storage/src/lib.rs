// Taskboard Storage Layer
//
// Document storage collaborator with pluggable backends, plus the
// per-document mutation queue that serializes writes.

pub mod fs;
pub mod memory;
pub mod queue;
pub mod trait_;

pub use fs::FsDocumentStore;
pub use memory::MemoryDocumentStore;
pub use queue::{DocumentMutationQueue, MutationError, MutationOutcome, MutationResult, MutationTicket};
pub use trait_::*;
