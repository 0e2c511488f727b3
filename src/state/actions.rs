/// Writes issued by the board
///
/// No write touches the rendered list. The originating client sees its own
/// change only when the backend echoes it through the change stream, so
/// every client converges through the same update/remove path.
use super::data::{NewTestCase, RecordId, Status, StatusChoice};
use crate::backend::{Backend, BackendError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Insert,
    Update,
    Delete,
}

/// A request for the backend
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    Insert(NewTestCase),
    UpdateStatus { id: RecordId, status: Status },
    Delete { id: RecordId },
}

impl Write {
    /// Translate a pick on an item's status control.
    /// `Delete` becomes a delete request, never a status write.
    pub fn from_status_choice(id: RecordId, choice: StatusChoice) -> Self {
        match choice {
            StatusChoice::Set(status) => Write::UpdateStatus { id, status },
            StatusChoice::Delete => Write::Delete { id },
        }
    }

    pub fn kind(&self) -> WriteKind {
        match self {
            Write::Insert(_) => WriteKind::Insert,
            Write::UpdateStatus { .. } => WriteKind::Update,
            Write::Delete { .. } => WriteKind::Delete,
        }
    }

    pub async fn send(self, backend: &dyn Backend) -> Result<(), BackendError> {
        match self {
            Write::Insert(record) => backend.insert(&record).await,
            Write::UpdateStatus { id, status } => backend.update_status(&id, status).await,
            Write::Delete { id } => backend.delete(&id).await,
        }
    }
}
