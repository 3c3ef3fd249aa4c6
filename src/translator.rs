//! Turns calendar widget interactions into editor sessions or mutation intents

use chrono::{DateTime, Utc};

use crate::cache::{CachedEntry, ReservationCache};
use crate::id::ReservationId;
use crate::decoration;
use crate::editor::EditorSession;
use crate::intent::Intent;
use crate::reservation::{RenderedEvent, ReservationPatch};


/// An interaction a calendar widget reports
#[derive(Clone, Debug, PartialEq)]
pub enum Interaction {
    /// An empty time range has been selected
    Select { start: DateTime<Utc>, end: DateTime<Utc> },
    /// An event has been dragged to a new time range
    Drag { event: RenderedEvent, start: DateTime<Utc>, end: DateTime<Utc> },
    /// An event has been resized
    Resize { event: RenderedEvent, start: DateTime<Utc>, end: DateTime<Utc> },
    /// An event has been clicked
    Click { event: RenderedEvent },
}

/// What an [`Interaction`] leads to
#[derive(Clone, Debug, PartialEq)]
pub enum Translation {
    OpenEditor(EditorSession),
    Mutate(Intent),
    /// The interaction concerns an event that cannot be edited (e.g. its creation is still in flight)
    Nothing,
}

pub fn translate(cache: &ReservationCache, interaction: Interaction) -> Translation {
    match interaction {
        Interaction::Select{ start, end } => {
            Translation::OpenEditor(EditorSession::for_new_slot(start, end))
        },
        Interaction::Drag{ event, start, end } |
        Interaction::Resize{ event, start, end } => {
            move_event(cache, &event, start, end)
        },
        Interaction::Click{ event } => {
            if current_id(cache, &event).is_none() {
                log::warn!("Ignoring a click on {}, that has not been saved yet", event.key);
                return Translation::Nothing;
            }
            let session = match cache.get(&event.key) {
                Some(entry) => EditorSession::for_reservation(entry.reservation()),
                None => EditorSession::for_rendered(&event),
            };
            Translation::OpenEditor(session)
        },
    }
}

/// The widget may still show an event rendered before its creation completed: the cached entry knows better
fn current_id<'a>(cache: &'a ReservationCache, event: &'a RenderedEvent) -> Option<&'a ReservationId> {
    cache.get(&event.key)
        .and_then(CachedEntry::id)
        .or(event.id.as_ref())
}

/// Only the time range changes. The title is sent again, the comment is left alone
fn move_event(cache: &ReservationCache, event: &RenderedEvent, start: DateTime<Utc>, end: DateTime<Utc>) -> Translation {
    let id = match current_id(cache, event) {
        None => {
            log::warn!("Ignoring a move of {}, that has not been saved yet", event.key);
            return Translation::Nothing;
        },
        Some(id) => id.clone(),
    };

    let title = match cache.get(&event.key) {
        Some(entry) => entry.reservation().title.clone(),
        None => decoration::undecorate(&event.title, &event.comment).to_string(),
    };
    Translation::Mutate(Intent::Update{
        id,
        patch: ReservationPatch::times(start, end).with_title(title),
    })
}
