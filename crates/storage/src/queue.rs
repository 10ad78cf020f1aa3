//! Document Mutation Queue - single writer per document path
//!
//! Responsibilities:
//! - Run mutation actions for one path strictly in submission order
//! - Let actions for different paths proceed independently
//! - Contain failures (errors and panics) to the action that raised them
//!
//! Each path gets a lane: an unbounded channel drained by one spawned worker.
//! Enqueueing is synchronous, so call order is submission order. A worker
//! that finds its channel empty removes its lane and exits; the next action
//! for that path starts a fresh lane.

use futures::FutureExt;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::trait_::StorageError;

/// What a mutation action did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The document was rewritten
    Applied,
    /// The action ran but the document already had the desired content
    Unchanged,
    /// The action could not find its target and did nothing
    Skipped(String),
}

/// Mutation action failures
#[derive(Debug, Error)]
pub enum MutationError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Mutation action panicked: {0}")]
    Panicked(String),

    #[error("Mutation lane for {0} shut down before the action completed")]
    LaneClosed(String),
}

pub type MutationResult = Result<MutationOutcome, MutationError>;

type Action = Box<dyn FnOnce() -> BoxFuture<'static, MutationResult> + Send>;

struct Job {
    label: String,
    action: Action,
    done: oneshot::Sender<MutationResult>,
}

type Lanes = Arc<Mutex<HashMap<String, mpsc::UnboundedSender<Job>>>>;

/// Completion handle for an enqueued action
#[derive(Debug)]
pub struct MutationTicket {
    path: String,
    label: String,
    done: oneshot::Receiver<MutationResult>,
}

impl MutationTicket {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Wait for the action to finish
    pub async fn wait(self) -> MutationResult {
        match self.done.await {
            Ok(result) => result,
            Err(_) => Err(MutationError::LaneClosed(self.path)),
        }
    }
}

/// Per-path serialized mutation queue
#[derive(Default)]
pub struct DocumentMutationQueue {
    lanes: Lanes,
}

impl std::fmt::Debug for DocumentMutationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentMutationQueue")
            .field("lanes", &self.lane_count())
            .finish()
    }
}

impl DocumentMutationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action to the chain for `path`.
    ///
    /// The action runs after every action previously enqueued for the same
    /// path has completed, whether it succeeded or not. Must be called from
    /// within a tokio runtime.
    pub fn enqueue<F, Fut>(&self, path: &str, label: &str, action: F) -> MutationTicket
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = MutationResult> + Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let job = Job {
            label: label.to_string(),
            action: Box::new(move || action().boxed()),
            done: done_tx,
        };

        let mut lanes = self.lanes.lock().unwrap_or_else(|e| e.into_inner());
        let pending = match lanes.get(path) {
            Some(lane) => lane.send(job).err().map(|e| e.0),
            None => Some(job),
        };

        // No lane yet, or its worker is gone
        if let Some(job) = pending {
            let lane = spawn_lane(path.to_string(), self.lanes.clone());
            if lane.send(job).is_err() {
                error!("Fresh mutation lane for {} rejected a job", path);
            }
            lanes.insert(path.to_string(), lane);
        }

        debug!("Enqueued '{}' for {}", label, path);
        MutationTicket {
            path: path.to_string(),
            label: label.to_string(),
            done: done_rx,
        }
    }

    /// Number of paths with queued or running actions
    pub fn lane_count(&self) -> usize {
        self.lanes.lock().map(|lanes| lanes.len()).unwrap_or(0)
    }
}

fn spawn_lane(path: String, lanes: Lanes) -> mpsc::UnboundedSender<Job> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
    let own = tx.clone();

    tokio::spawn(async move {
        while let Some(job) = next_job(&path, &mut rx, &own, &lanes) {
            let Job {
                label,
                action,
                done,
            } = job;

            let run = async move { action().await };
            let result = match AssertUnwindSafe(run).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(MutationError::Panicked(panic_message(&*payload))),
            };

            match &result {
                Ok(MutationOutcome::Applied) => debug!("'{}' applied to {}", label, path),
                Ok(MutationOutcome::Unchanged) => debug!("'{}' left {} unchanged", label, path),
                Ok(MutationOutcome::Skipped(reason)) => {
                    warn!("'{}' skipped on {}: {}", label, path, reason)
                }
                Err(e) => error!("'{}' failed on {}: {}", label, path, e),
            }

            // The caller may have dropped its ticket
            let _ = done.send(result);
        }
        debug!("Mutation lane for {} retired", path);
    });

    tx
}

/// Next queued job, or `None` once the lane has been removed from the map.
///
/// The final emptiness check runs under the map lock, which `enqueue` also
/// holds while sending, so no job can land in a retired lane.
fn next_job(
    path: &str,
    rx: &mut mpsc::UnboundedReceiver<Job>,
    own: &mpsc::UnboundedSender<Job>,
    lanes: &Lanes,
) -> Option<Job> {
    match rx.try_recv() {
        Ok(job) => return Some(job),
        Err(TryRecvError::Disconnected) => return None,
        Err(TryRecvError::Empty) => {}
    }

    let mut lanes = lanes.lock().unwrap_or_else(|e| e.into_inner());
    match rx.try_recv() {
        Ok(job) => Some(job),
        Err(_) => {
            if lanes.get(path).is_some_and(|lane| lane.same_channel(own)) {
                lanes.remove(path);
            }
            None
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocumentStore;
    use crate::trait_::DocumentStore;
    use std::sync::Arc;
    use std::time::Duration;

    /// Read-modify-write that appends `marker` to the document
    async fn append_marker(
        store: Arc<MemoryDocumentStore>,
        path: &'static str,
        marker: &'static str,
    ) -> MutationResult {
        let content = store.read(path).await?;
        store.write(path, &format!("{}{}", content, marker)).await?;
        Ok(MutationOutcome::Applied)
    }

    fn append(
        store: Arc<MemoryDocumentStore>,
        path: &'static str,
        marker: &'static str,
    ) -> impl FnOnce() -> BoxFuture<'static, MutationResult> + Send + 'static {
        move || append_marker(store, path, marker).boxed()
    }

    async fn explode() -> MutationResult {
        panic!("boom")
    }

    #[tokio::test]
    async fn test_same_path_runs_in_submission_order() {
        let store = Arc::new(
            MemoryDocumentStore::new()
                .with_read_delay(Duration::from_millis(20))
                .with_document("a.md", ""),
        );
        let queue = DocumentMutationQueue::new();

        let first = queue.enqueue("a.md", "first", append(store.clone(), "a.md", "1"));
        let second = queue.enqueue("a.md", "second", append(store.clone(), "a.md", "2"));
        let third = queue.enqueue("a.md", "third", append(store.clone(), "a.md", "3"));

        assert_eq!(third.wait().await.unwrap(), MutationOutcome::Applied);
        assert_eq!(second.wait().await.unwrap(), MutationOutcome::Applied);
        assert_eq!(first.wait().await.unwrap(), MutationOutcome::Applied);
        assert_eq!(store.content("a.md").as_deref(), Some("123"));
    }

    async fn wait_until_idle(queue: &DocumentMutationQueue) {
        for _ in 0..100 {
            if queue.lane_count() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("lanes still open: {}", queue.lane_count());
    }

    #[tokio::test]
    async fn test_drained_lanes_are_retired() {
        let store = Arc::new(MemoryDocumentStore::new().with_document("a.md", ""));
        let queue = DocumentMutationQueue::new();

        for path in ["a.md", "b.md", "c.md"] {
            let ticket = queue.enqueue(path, "touch", || async { Ok(MutationOutcome::Unchanged) });
            ticket.wait().await.unwrap();
        }
        wait_until_idle(&queue).await;

        // A retired path gets a fresh lane
        let again = queue.enqueue("a.md", "again", append(store.clone(), "a.md", "z"));
        assert_eq!(again.wait().await.unwrap(), MutationOutcome::Applied);
        assert_eq!(store.content("a.md").as_deref(), Some("z"));
        wait_until_idle(&queue).await;
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_chain() {
        let store = Arc::new(MemoryDocumentStore::new().with_document("a.md", ""));
        let queue = DocumentMutationQueue::new();

        store.set_write_failure("a.md", true);
        let failing = queue.enqueue("a.md", "failing", append(store.clone(), "a.md", "x"));
        let reset_store = store.clone();
        let reset = queue.enqueue("a.md", "reset", move || async move {
            reset_store.set_write_failure("a.md", false);
            Ok(MutationOutcome::Unchanged)
        });
        let after = queue.enqueue("a.md", "after", append(store.clone(), "a.md", "y"));

        assert!(matches!(failing.wait().await, Err(MutationError::Storage(_))));
        assert_eq!(reset.wait().await.unwrap(), MutationOutcome::Unchanged);
        assert_eq!(after.wait().await.unwrap(), MutationOutcome::Applied);
        assert_eq!(store.content("a.md").as_deref(), Some("y"));
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let store = Arc::new(MemoryDocumentStore::new().with_document("a.md", ""));
        let queue = DocumentMutationQueue::new();

        let boom = queue.enqueue("a.md", "boom", explode);
        let after = queue.enqueue("a.md", "after", append(store.clone(), "a.md", "ok"));

        match boom.wait().await {
            Err(MutationError::Panicked(message)) => assert_eq!(message, "boom"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(after.wait().await.unwrap(), MutationOutcome::Applied);
        assert_eq!(store.content("a.md").as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_different_paths_are_independent() {
        let queue = DocumentMutationQueue::new();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let blocked = queue.enqueue("slow.md", "blocked", move || async move {
            let _ = release_rx.await;
            Ok(MutationOutcome::Applied)
        });
        let other = queue.enqueue("fast.md", "other", || async { Ok(MutationOutcome::Unchanged) });

        // Completes while slow.md is still blocked
        let outcome = tokio::time::timeout(Duration::from_secs(1), other.wait())
            .await
            .expect("other path should not wait for slow.md");
        assert_eq!(outcome.unwrap(), MutationOutcome::Unchanged);

        // The blocked lane stays open while it has work
        assert!(queue.lane_count() >= 1);
        release_tx.send(()).unwrap();
        assert_eq!(blocked.wait().await.unwrap(), MutationOutcome::Applied);
    }

    #[tokio::test]
    async fn test_skipped_outcome_is_reported() {
        let queue = DocumentMutationQueue::new();
        let ticket = queue.enqueue("a.md", "skip", || async {
            Ok(MutationOutcome::Skipped("task line not found".to_string()))
        });
        assert_eq!(ticket.label(), "skip");
        assert_eq!(ticket.path(), "a.md");
        assert_eq!(
            ticket.wait().await.unwrap(),
            MutationOutcome::Skipped("task line not found".to_string())
        );
    }
}
