use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use std::sync::Mutex;
use tokio::sync::mpsc;

use super::{Backend, BackendError, ChangeEvent, ChangeFeed};
use crate::state::data::{NewTestCase, RecordId, Status, TestCase};

/// A write the backend received
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Insert(NewTestCase),
    UpdateStatus(RecordId, Status),
    Delete(RecordId),
}

#[derive(Default)]
struct Inner {
    rows: Vec<TestCase>,
    calls: Vec<Call>,
    feeds: Vec<mpsc::UnboundedSender<ChangeEvent>>,
    next_id: i64,
    fail_writes: bool,
}

/// In-process backend: keeps rows in memory, records every write and
/// echoes changes to all open feeds like the hosted table would.
#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail with a 500
    pub fn failing_writes() -> Self {
        let backend = Self::default();
        backend.inner.lock().unwrap().fail_writes = true;
        backend
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn rows(&self) -> Vec<TestCase> {
        self.inner.lock().unwrap().rows.clone()
    }

    fn write(&self, call: Call) -> Result<(), BackendError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call.clone());
        if inner.fail_writes {
            return Err(BackendError::Status {
                status: 500,
                body: "write refused".into(),
            });
        }

        let event = match call {
            Call::Insert(new) => {
                inner.next_id += 1;
                let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
                    + Duration::seconds(inner.next_id);
                let row = TestCase {
                    id: RecordId::from(inner.next_id),
                    test_case_id: new.test_case_id,
                    team: new.team,
                    description: new.description,
                    status: new.status,
                    created_at,
                };
                inner.rows.push(row.clone());
                Some(ChangeEvent::Insert(row))
            }
            Call::UpdateStatus(id, status) => inner.rows.iter_mut().find(|r| r.id == id).map(|row| {
                row.status = status;
                ChangeEvent::Update(row.clone())
            }),
            Call::Delete(id) => {
                let before = inner.rows.len();
                inner.rows.retain(|r| r.id != id);
                (inner.rows.len() != before).then_some(ChangeEvent::Delete(id))
            }
        };

        if let Some(event) = event {
            inner.feeds.retain(|feed| feed.send(event.clone()).is_ok());
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn fetch_all(&self) -> Result<Vec<TestCase>, BackendError> {
        let mut rows = self.rows();
        rows.sort_by_key(|r| r.created_at);
        Ok(rows)
    }

    async fn insert(&self, record: &NewTestCase) -> Result<(), BackendError> {
        self.write(Call::Insert(record.clone()))
    }

    async fn update_status(&self, id: &RecordId, status: Status) -> Result<(), BackendError> {
        self.write(Call::UpdateStatus(id.clone(), status))
    }

    async fn delete(&self, id: &RecordId) -> Result<(), BackendError> {
        self.write(Call::Delete(id.clone()))
    }

    async fn subscribe(&self) -> Result<ChangeFeed, BackendError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().unwrap().feeds.push(tx);
        Ok(ChangeFeed::detached(rx))
    }
}
