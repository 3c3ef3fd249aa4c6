//! What a scheduler reports, and how to talk to a running one

use std::fmt::{Display, Formatter};

use tokio::sync::mpsc;

use crate::editor::EditorSession;
use crate::error::{Error, Result};
use crate::id::ReservationId;
use crate::intent::Intent;
use crate::reservation::{EntryKey, RenderedEvent};
use crate::translator::Interaction;

/// Something that happened to the cache of a [`Scheduler`](super::Scheduler)
#[derive(Debug)]
pub enum CacheEvent {
    /// The cache has been replaced by a list of `count` reservations
    Loaded { count: usize },
    /// The list could not be fetched. The cache is left untouched
    LoadFailed(Error),
    Created { key: EntryKey, id: ReservationId },
    Updated { key: EntryKey, id: ReservationId },
    Deleted { key: EntryKey, id: ReservationId },
    /// The remote call of an optimistic mutation failed, and the mutation has been rolled back.
    /// Submitting `intent` again retries it
    MutationFailed { intent: Intent, error: Error },
    /// An intent has been refused before anything was changed (e.g. it concerns an unknown reservation)
    Rejected { intent: Intent, error: Error },
    /// A completion changed nothing: its entry has been removed, or a newer state is cached
    Stale { key: EntryKey },
    /// An interaction asks for the detail editor to be shown
    EditorOpened(EditorSession),
    /// What the calendar widget must display now
    Render(Vec<RenderedEvent>),
}

impl CacheEvent {
    pub fn is_failure(&self) -> bool {
        matches!(self, CacheEvent::LoadFailed(_) | CacheEvent::MutationFailed{..} | CacheEvent::Rejected{..})
    }
}

impl Display for CacheEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheEvent::Loaded{ count } => write!(f, "Loaded {} reservations", count),
            CacheEvent::LoadFailed(err) => write!(f, "Unable to load reservations: {}", err),
            CacheEvent::Created{ key, id } => write!(f, "{} saved as reservation {}", key, id),
            CacheEvent::Updated{ key, id } => write!(f, "Reservation {} ({}) updated", id, key),
            CacheEvent::Deleted{ key, id } => write!(f, "Reservation {} ({}) deleted", id, key),
            CacheEvent::MutationFailed{ intent, error } => write!(f, "{} failed: {}", intent, error),
            CacheEvent::Rejected{ intent, error } => write!(f, "{} rejected: {}", intent, error),
            CacheEvent::Stale{ key } => write!(f, "Ignored an outdated completion for {}", key),
            CacheEvent::EditorOpened(session) => match session.id() {
                None => write!(f, "Editing a new reservation"),
                Some(id) => write!(f, "Editing reservation {}", id),
            },
            CacheEvent::Render(events) => write!(f, "{} events to display", events.len()),
        }
    }
}


/// See [`feedback_channel`]
pub type FeedbackSender = mpsc::UnboundedSender<CacheEvent>;
/// See [`feedback_channel`]
pub type FeedbackReceiver = mpsc::UnboundedReceiver<CacheEvent>;

/// Create a feedback channel, that receives every [`CacheEvent`] of a scheduler.
///
/// Contrary to a watch channel, no event is ever skipped.
pub fn feedback_channel() -> (FeedbackSender, FeedbackReceiver) {
    mpsc::unbounded_channel()
}


/// A request sent to a running scheduler
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Submit(Intent),
    Interact(Interaction),
    Reload,
}

/// See [`command_channel`]
pub type CommandReceiver = mpsc::UnboundedReceiver<Command>;

/// Create the channel that drives [`Scheduler::run`](super::Scheduler::run)
pub fn command_channel() -> (SchedulerHandle, CommandReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (SchedulerHandle { sender }, receiver)
}

/// A cloneable way to enqueue commands into a running scheduler.
///
/// Commands are handled in the order they have been sent. Dropping every handle stops the scheduler once its in-flight calls have completed.
#[derive(Clone, Debug)]
pub struct SchedulerHandle {
    sender: mpsc::UnboundedSender<Command>,
}

impl SchedulerHandle {
    pub fn submit(&self, intent: Intent) -> Result<()> {
        self.send(Command::Submit(intent))
    }

    pub fn interact(&self, interaction: Interaction) -> Result<()> {
        self.send(Command::Interact(interaction))
    }

    pub fn reload(&self) -> Result<()> {
        self.send(Command::Reload)
    }

    fn send(&self, command: Command) -> Result<()> {
        self.sender.send(command).map_err(|_| Error::SchedulerStopped)
    }
}
