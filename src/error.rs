//! Errors of this crate

use std::time::Duration;

use thiserror::Error;

use crate::id::{ReservationId, TaskId};

/// Everything that can go wrong when talking to a remote store or when mutating a cache
#[derive(Error, Debug)]
pub enum Error {
    /// The request never got an HTTP answer (DNS, connection refused, TLS...)
    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The request did not complete in time
    #[error("Remote call timed out after {0:?}")]
    Timeout(Duration),

    /// The remote store refused the session credentials.
    /// This is meant to be handled by whatever issued the session, not by the cache
    #[error("The remote store rejected the session credentials")]
    Unauthorized,

    /// The remote store answered with a non-success HTTP status
    #[error("Unexpected HTTP status code {status}: {message}")]
    Status { status: u16, message: String },

    /// The remote store answered something this crate cannot understand
    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No cached reservation has id {0}")]
    UnknownReservation(ReservationId),

    #[error("No task has id {0}")]
    UnknownTask(TaskId),

    /// A deletion is already in flight for this reservation
    #[error("Reservation {0} is already being deleted")]
    DeletionPending(ReservationId),

    /// This operation needs a reservation that the remote store knows about
    #[error("This reservation has not been saved yet")]
    Unsaved,

    #[error("Deletion has not been requested, nothing to confirm")]
    DeletionNotRequested,

    /// Refused locally, before any remote call (empty task title, clocking in twice...)
    #[error("{0}")]
    Rejected(String),

    /// Injected by a [`MockBehaviour`](crate::mock_behaviour::MockBehaviour)
    #[error("Mocked failure: {0}")]
    Mocked(String),

    #[error("The scheduler is not running anymore")]
    SchedulerStopped,
}

impl Error {
    /// Whether this error comes from a remote call (as opposed to a local usage error)
    pub fn is_remote(&self) -> bool {
        matches!(self,
            Error::Transport(_) | Error::Timeout(_) | Error::Unauthorized |
            Error::Status{..} | Error::Malformed(_) | Error::Json(_) | Error::Mocked(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
