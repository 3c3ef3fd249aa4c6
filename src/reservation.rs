//! Calendar reservations, as they are cached and rendered

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::id::ReservationId;
use crate::decoration;


/// Identifies a cache entry for the whole session, even before the remote store has assigned it a [`ReservationId`]
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryKey {
    content: String,
}
impl EntryKey {
    /// Generate a random EntryKey.
    pub fn random() -> Self {
        let random = uuid::Uuid::new_v4().to_hyphenated().to_string();
        Self { content: random }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }
}
impl Display for EntryKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.content)
    }
}


/// A reservation, as stored in the cache.
///
/// `title` is always the base title. See [`decoration`](crate::decoration) for the displayed one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    /// `None` until the remote store has acknowledged the creation
    pub id: Option<ReservationId>,
    pub title: String,
    /// `start < end` is expected, but enforcing it is up to the remote store
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub comment: String,
}

impl Reservation {
    pub fn new(id: Option<ReservationId>, draft: ReservationDraft) -> Self {
        Self {
            id,
            title: draft.title,
            start: draft.start,
            end: draft.end,
            comment: draft.comment,
        }
    }

    pub fn display_title(&self) -> String {
        decoration::decorate(&self.title, &self.comment)
    }

    /// The full set of fields that are sent to the remote store
    pub fn to_draft(&self) -> ReservationDraft {
        ReservationDraft {
            title: self.title.clone(),
            start: self.start,
            end: self.end,
            comment: self.comment.clone(),
        }
    }
}


/// Every field of a reservation, except its identifier
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReservationDraft {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub comment: String,
}


/// Any subset of the fields of a reservation. `None` means "leave unchanged"
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReservationPatch {
    pub title: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub comment: Option<String>,
}

impl ReservationPatch {
    /// A patch that only moves a reservation in time
    pub fn times(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start: Some(start), end: Some(end), ..Self::default() }
    }

    /// A patch that replaces every field
    pub fn full(draft: ReservationDraft) -> Self {
        Self {
            title: Some(draft.title),
            start: Some(draft.start),
            end: Some(draft.end),
            comment: Some(draft.comment),
        }
    }

    pub fn with_title(mut self, title: String) -> Self {
        self.title = Some(title);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply_to(&self, reservation: &mut Reservation) {
        if let Some(title) = &self.title {
            reservation.title = title.clone();
        }
        if let Some(start) = self.start {
            reservation.start = start;
        }
        if let Some(end) = self.end {
            reservation.end = end;
        }
        if let Some(comment) = &self.comment {
            reservation.comment = comment.clone();
        }
    }
}


/// Describes whether a cache entry matches what the remote store holds, or whether some mutations are still in flight
#[derive(Clone, Debug, PartialEq)]
pub enum SyncStatus {
    /// This entry has been locally created, and its creation has not been acknowledged yet
    NotSynced,
    /// This entry matches the last state the remote store acknowledged
    Synced,
    /// This entry has been locally modified, and `in_flight` updates have not completed yet
    LocallyModified {
        /// The last state the remote store acknowledged. A failed update reverts to it
        committed: Box<Reservation>,
        /// Sequence number of the mutation `committed` comes from (0 for the loaded or created state)
        committed_seq: u64,
        in_flight: u32,
        /// Whether the visible state has been reverted to `committed` after the latest mutation failed
        reverted: bool,
    },
    /// A deletion is in flight. The entry stays visible until it succeeds
    LocallyDeleted {
        /// The status to come back to, in case the deletion fails
        previous: Box<SyncStatus>,
    },
}

impl SyncStatus {
    /// Whether a remote call is still in flight for this entry
    pub fn is_pending(&self) -> bool {
        !matches!(self, SyncStatus::Synced)
    }

    pub fn is_deleting(&self) -> bool {
        matches!(self, SyncStatus::LocallyDeleted{..})
    }

    /// The status that tracks modifications, i.e. the one a pending deletion would restore
    pub(crate) fn modification_status_mut(&mut self) -> &mut SyncStatus {
        match self {
            SyncStatus::LocallyDeleted{ previous } => previous.modification_status_mut(),
            other => other,
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            SyncStatus::NotSynced => ".",
            SyncStatus::Synced => "=",
            SyncStatus::LocallyModified{..} => "~",
            SyncStatus::LocallyDeleted{..} => "x",
        }
    }
}

impl Display for SyncStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.symbol())
    }
}


/// What a calendar widget needs to display an entry
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedEvent {
    pub key: EntryKey,
    pub id: Option<ReservationId>,
    /// Decorated title
    pub title: String,
    pub comment: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Lets the widget display pending entries differently
    pub pending: bool,
}
