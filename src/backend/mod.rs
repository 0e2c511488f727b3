/// Backend collaborator
///
/// The board never owns its data: records live in a hosted table and
/// every client learns about changes through the table's change stream.
/// This module defines the narrow interface the rest of the app talks to:
/// - `rest.rs` - PostgREST reads and writes (Supabase)
/// - `realtime.rs` - change-notification socket (Supabase Realtime)
/// - `memory.rs` - in-process backend used by the tests
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::state::data::{NewTestCase, RecordId, Status, TestCase};

pub mod realtime;
pub mod rest;

#[cfg(test)]
pub mod memory;

pub use rest::SupabaseBackend;

/// Errors raised while talking to the backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid JSON from backend: {0}")]
    Json(#[from] serde_json::Error),

    #[error("realtime socket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("invalid backend URL: {0}")]
    Url(String),

    #[error("realtime channel rejected the subscription: {0}")]
    Rejected(String),
}

/// A change notification delivered by the realtime stream
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    Insert(TestCase),
    Update(TestCase),
    /// Only the prior row's identifier is needed
    Delete(RecordId),
}

/// Live subscription to the change stream.
///
/// Dropping the feed stops the worker that owns the socket, so the
/// subscription is always released with its owner.
#[derive(Debug)]
pub struct ChangeFeed {
    events: mpsc::UnboundedReceiver<ChangeEvent>,
    worker: Option<JoinHandle<()>>,
}

impl ChangeFeed {
    pub fn new(events: mpsc::UnboundedReceiver<ChangeEvent>, worker: JoinHandle<()>) -> Self {
        Self {
            events,
            worker: Some(worker),
        }
    }

    /// A feed whose producer is not a spawned task (e.g. in-process backends)
    #[cfg(test)]
    pub fn detached(events: mpsc::UnboundedReceiver<ChangeEvent>) -> Self {
        Self { events, worker: None }
    }

    /// Wait for the next event; `None` once the stream has closed
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }
}

impl Drop for ChangeFeed {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

/// The operations the board needs from its backend
#[async_trait]
pub trait Backend: Send + Sync {
    /// All records, oldest first
    async fn fetch_all(&self) -> Result<Vec<TestCase>, BackendError>;

    async fn insert(&self, record: &NewTestCase) -> Result<(), BackendError>;

    async fn update_status(&self, id: &RecordId, status: Status) -> Result<(), BackendError>;

    async fn delete(&self, id: &RecordId) -> Result<(), BackendError>;

    /// Open the change stream for the records table
    async fn subscribe(&self) -> Result<ChangeFeed, BackendError>;
}
