//! The detail editor of a single reservation

use chrono::{DateTime, Utc};

use crate::decoration;
use crate::error::{Error, Result};
use crate::id::ReservationId;
use crate::intent::Intent;
use crate::reservation::{RenderedEvent, Reservation, ReservationDraft, ReservationPatch};


/// Holds the candidate fields of one reservation (either a new one or an existing one) while the user edits them.
///
/// Nothing reaches the cache until [`confirm`](Self::confirm) or [`confirm_delete`](Self::confirm_delete) produce an [`Intent`].
/// Dropping a session (or calling [`close`](Self::close)) discards the edits.
#[derive(Clone, Debug, PartialEq)]
pub struct EditorSession {
    id: Option<ReservationId>,
    title: String,
    comment: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    delete_requested: bool,
}

impl EditorSession {
    /// A session for a reservation that does not exist yet
    pub fn for_new_slot(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            id: None,
            title: String::new(),
            comment: String::new(),
            start,
            end,
            delete_requested: false,
        }
    }

    /// A session seeded from a cached reservation, whose title is stored undecorated
    pub fn for_reservation(reservation: &Reservation) -> Self {
        Self {
            id: reservation.id.clone(),
            title: reservation.title.clone(),
            comment: reservation.comment.clone(),
            start: reservation.start,
            end: reservation.end,
            delete_requested: false,
        }
    }

    /// A session seeded from what a calendar widget displays. The title decoration is removed
    pub fn for_rendered(event: &RenderedEvent) -> Self {
        Self {
            id: event.id.clone(),
            title: decoration::undecorate(&event.title, &event.comment).to_string(),
            comment: event.comment.clone(),
            start: event.start,
            end: event.end,
            delete_requested: false,
        }
    }

    pub fn id(&self) -> Option<&ReservationId> { self.id.as_ref() }
    pub fn title(&self) -> &str                 { &self.title }
    pub fn comment(&self) -> &str               { &self.comment }
    pub fn start(&self) -> DateTime<Utc>        { self.start }
    pub fn end(&self) -> DateTime<Utc>          { self.end }
    pub fn is_new(&self) -> bool                { self.id.is_none() }
    pub fn delete_requested(&self) -> bool      { self.delete_requested }

    pub fn set_title<S: ToString>(&mut self, title: S) {
        self.title = title.to_string();
    }
    pub fn set_comment<S: ToString>(&mut self, comment: S) {
        self.comment = comment.to_string();
    }
    pub fn set_start(&mut self, start: DateTime<Utc>) {
        self.start = start;
    }
    pub fn set_end(&mut self, end: DateTime<Utc>) {
        self.end = end;
    }

    fn draft(&self) -> ReservationDraft {
        ReservationDraft {
            title: self.title.clone(),
            start: self.start,
            end: self.end,
            comment: self.comment.clone(),
        }
    }

    /// Creates the reservation if it is new, or updates it otherwise.
    ///
    /// Updates always carry all four fields, whichever of them actually changed.
    pub fn confirm(&self) -> Intent {
        match &self.id {
            None => Intent::Create(self.draft()),
            Some(id) => Intent::Update{ id: id.clone(), patch: ReservationPatch::full(self.draft()) },
        }
    }

    /// First step of a deletion. Reservations that have not been saved cannot be deleted, only discarded
    pub fn request_delete(&mut self) -> Result<()> {
        if self.id.is_none() {
            return Err(Error::Unsaved);
        }
        self.delete_requested = true;
        Ok(())
    }

    pub fn cancel_delete(&mut self) {
        self.delete_requested = false;
    }

    /// Second step of a deletion. Fails unless [`Self::request_delete`] has been called before
    pub fn confirm_delete(&self) -> Result<Intent> {
        match (&self.id, self.delete_requested) {
            (None, _) => Err(Error::Unsaved),
            (Some(_), false) => Err(Error::DeletionNotRequested),
            (Some(id), true) => Ok(Intent::Delete{ id: id.clone() }),
        }
    }

    /// Discards every local edit
    pub fn close(self) {
        log::debug!("Closing the editor of {:?} without saving", self.id);
    }
}
