//! Structured descriptions of the mutations a user requests

use std::fmt::{Display, Formatter};

use crate::id::ReservationId;
use crate::reservation::{ReservationDraft, ReservationPatch};

/// A mutation request, produced by the [`translator`](crate::translator) or by an [`EditorSession`](crate::editor::EditorSession), and consumed by the [`cache`](crate::cache)
#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
    Create(ReservationDraft),
    Update { id: ReservationId, patch: ReservationPatch },
    Delete { id: ReservationId },
}

impl Display for Intent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Intent::Create(draft) => write!(f, "create \"{}\"", draft.title),
            Intent::Update{ id, .. } => write!(f, "update {}", id),
            Intent::Delete{ id } => write!(f, "delete {}", id),
        }
    }
}
