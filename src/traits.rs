//! The remote stores this crate talks to

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::id::{ReservationId, TaskId};
use crate::reservation::{Reservation, ReservationDraft};
use crate::task::{Task, TaskPatch};
use crate::attendance::{AttendanceAmendment, AttendanceRecord};

/// Owns the durable set of reservations.
///
/// This is usually a [`Client`](crate::client::Client), or a [`MemoryStore`](crate::memory_store::MemoryStore) for tests and offline use.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Returns every reservation. Returned reservations always have an id
    async fn list_reservations(&self) -> Result<Vec<Reservation>>;
    /// Creates a reservation, and returns the id the store has assigned to it
    async fn create_reservation(&self, draft: &ReservationDraft) -> Result<ReservationId>;
    /// Replaces every field of a reservation. Success means nothing more than "done"
    async fn update_reservation(&self, id: &ReservationId, fields: &ReservationDraft) -> Result<()>;
    async fn delete_reservation(&self, id: &ReservationId) -> Result<()>;
}

/// Owns the tasks of the authenticated user
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list_tasks(&self) -> Result<Vec<Task>>;
    async fn create_task(&self, title: &str) -> Result<Task>;
    /// Returns the task as the store saved it
    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task>;
    async fn delete_task(&self, id: &TaskId) -> Result<()>;
}

/// Owns the attendance records of the authenticated user
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Returns today's record, if any
    async fn today(&self) -> Result<Option<AttendanceRecord>>;
    /// Returns the records of a month, sorted by date
    async fn monthly(&self, year: i32, month: u32) -> Result<Vec<AttendanceRecord>>;
    /// Records the current time as today's start time
    async fn clock_in(&self) -> Result<AttendanceRecord>;
    /// Records the current time as today's end time
    async fn clock_out(&self) -> Result<AttendanceRecord>;
    /// Creates or corrects the record of a given day
    async fn amend(&self, amendment: &AttendanceAmendment) -> Result<AttendanceRecord>;

    /// The clock the store decides "today" with
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
