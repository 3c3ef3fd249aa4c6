//! An in-memory implementation of every store, that behaves like the remote API.
//!
//! This is mostly useful for tests, where failures and latency can be injected, and to work offline.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::attendance::{AttendanceAmendment, AttendanceRecord};
use crate::error::{Error, Result};
use crate::id::{AttendanceId, ReservationId, TaskId};
use crate::mock_behaviour::MockBehaviour;
use crate::reservation::{Reservation, ReservationDraft};
use crate::task::{Task, TaskPatch};
use crate::traits::{AttendanceStore, ReservationStore, TaskStore};

#[derive(Default)]
struct State {
    reservations: Vec<Reservation>,
    tasks: Vec<Task>,
    attendance: Vec<AttendanceRecord>,
    last_id: u64,
    behaviour: MockBehaviour,
    latency: Duration,
    /// Overrides the current time
    now: Option<DateTime<Utc>>,
    /// The name of every call this store has received, in order
    calls: Vec<String>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }
}

/// A store that keeps everything in memory
#[derive(Default)]
pub struct MemoryStore {
    owner: String,
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already contains some reservations. Those without an id get one
    pub fn with_reservations(reservations: Vec<Reservation>) -> Self {
        let store = Self::new();
        store.replace_reservations(reservations);
        store
    }

    pub fn with_behaviour(self, behaviour: MockBehaviour) -> Self {
        self.set_behaviour(behaviour);
        self
    }

    pub fn with_owner<S: ToString>(mut self, owner: S) -> Self {
        self.owner = owner.to_string();
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_behaviour(&self, behaviour: MockBehaviour) {
        self.state().behaviour = behaviour;
    }

    /// Every call will take (at least) this long to complete
    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = latency;
    }

    /// Pretend it is `now`, e.g. to clock in on a given day
    pub fn set_now(&self, now: DateTime<Utc>) {
        self.state().now = Some(now);
    }

    /// Changes the stored reservations behind the back of any client, as another user would
    pub fn replace_reservations(&self, reservations: Vec<Reservation>) {
        let mut state = self.state();
        let mut stored = Vec::with_capacity(reservations.len());
        for mut reservation in reservations {
            match &reservation.id {
                Some(id) => {
                    if let Ok(numeric) = id.as_str().parse::<u64>() {
                        state.last_id = state.last_id.max(numeric);
                    }
                },
                None => reservation.id = Some(ReservationId::from(state.next_id())),
            }
            stored.push(reservation);
        }
        state.reservations = stored;
    }

    pub fn reservations(&self) -> Vec<Reservation> {
        self.state().reservations.clone()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state().tasks.clone()
    }

    pub fn attendance_records(&self) -> Vec<AttendanceRecord> {
        self.state().attendance.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Records a call, and waits for the configured latency.
    ///
    /// The lock is released while waiting, so that concurrent calls overlap.
    async fn enter(&self, call: &str) {
        let latency = {
            let mut state = self.state();
            state.calls.push(call.to_string());
            state.latency
        };
        if latency > Duration::from_millis(0) {
            tokio::time::sleep(latency).await;
        }
    }
}

fn not_found(what: &str) -> Error {
    Error::Status{ status: 404, message: format!("{} not found", what) }
}

fn bad_request(message: &str) -> Error {
    Error::Status{ status: 400, message: message.to_string() }
}


#[async_trait]
impl ReservationStore for MemoryStore {
    async fn list_reservations(&self) -> Result<Vec<Reservation>> {
        self.enter("list_reservations").await;
        let mut state = self.state();
        state.behaviour.can_list()?;
        Ok(state.reservations.clone())
    }

    async fn create_reservation(&self, draft: &ReservationDraft) -> Result<ReservationId> {
        self.enter("create_reservation").await;
        let mut state = self.state();
        state.behaviour.can_create()?;
        let id = ReservationId::from(state.next_id());
        state.reservations.push(Reservation::new(Some(id.clone()), draft.clone()));
        Ok(id)
    }

    async fn update_reservation(&self, id: &ReservationId, fields: &ReservationDraft) -> Result<()> {
        self.enter("update_reservation").await;
        let mut state = self.state();
        state.behaviour.can_update()?;
        match state.reservations.iter_mut().find(|r| r.id.as_ref() == Some(id)) {
            None => Err(not_found("Reservation")),
            Some(stored) => {
                *stored = Reservation::new(Some(id.clone()), fields.clone());
                Ok(())
            },
        }
    }

    /// Deleting an unknown reservation is not an error, as for the remote API
    async fn delete_reservation(&self, id: &ReservationId) -> Result<()> {
        self.enter("delete_reservation").await;
        let mut state = self.state();
        state.behaviour.can_delete()?;
        state.reservations.retain(|r| r.id.as_ref() != Some(id));
        Ok(())
    }
}


#[async_trait]
impl TaskStore for MemoryStore {
    async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.enter("list_tasks").await;
        let mut state = self.state();
        state.behaviour.can_change_task()?;
        Ok(state.tasks.clone())
    }

    async fn create_task(&self, title: &str) -> Result<Task> {
        self.enter("create_task").await;
        let mut state = self.state();
        state.behaviour.can_change_task()?;
        if title.is_empty() {
            return Err(bad_request("Invalid request"));
        }
        let id = TaskId::from(state.next_id());
        let task = Task::new(id, title.to_string(), false, self.owner.clone());
        state.tasks.push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task> {
        self.enter("update_task").await;
        let mut state = self.state();
        state.behaviour.can_change_task()?;
        let task = state.tasks.iter_mut()
            .find(|task| task.id() == id)
            .ok_or_else(|| not_found("Task"))?;
        if let Some(title) = &patch.title {
            task.set_title(title.clone());
        }
        if let Some(completed) = patch.completed {
            task.set_completed(completed);
        }
        Ok(task.clone())
    }

    async fn delete_task(&self, id: &TaskId) -> Result<()> {
        self.enter("delete_task").await;
        let mut state = self.state();
        state.behaviour.can_change_task()?;
        let count = state.tasks.len();
        state.tasks.retain(|task| task.id() != id);
        if state.tasks.len() == count {
            return Err(not_found("Task"));
        }
        Ok(())
    }
}


fn at(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(time))
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn today(&self) -> Result<Option<AttendanceRecord>> {
        self.enter("attendance_today").await;
        let state = self.state();
        let today = state.now().date_naive();
        Ok(state.attendance.iter().find(|record| record.date == today).cloned())
    }

    async fn monthly(&self, year: i32, month: u32) -> Result<Vec<AttendanceRecord>> {
        use chrono::Datelike;

        self.enter("attendance_monthly").await;
        let state = self.state();
        let mut records: Vec<AttendanceRecord> = state.attendance.iter()
            .filter(|record| record.date.year() == year && record.date.month() == month)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.date);
        Ok(records)
    }

    async fn clock_in(&self) -> Result<AttendanceRecord> {
        self.enter("clock_in").await;
        let mut state = self.state();
        state.behaviour.can_change_attendance()?;
        let now = state.now();
        let today = now.date_naive();

        let position = state.attendance.iter().position(|record| record.date == today);
        match position {
            Some(pos) => {
                let record = &mut state.attendance[pos];
                if record.start_time.is_some() {
                    return Err(bad_request("Start time already recorded"));
                }
                record.start_time = Some(now);
                Ok(record.clone())
            },
            None => {
                let record = AttendanceRecord {
                    id: AttendanceId::from(state.next_id()),
                    date: today,
                    start_time: Some(now),
                    end_time: None,
                    comment: String::new(),
                };
                state.attendance.push(record.clone());
                Ok(record)
            },
        }
    }

    async fn clock_out(&self) -> Result<AttendanceRecord> {
        self.enter("clock_out").await;
        let mut state = self.state();
        state.behaviour.can_change_attendance()?;
        let now = state.now();
        let today = now.date_naive();

        let record = state.attendance.iter_mut()
            .find(|record| record.date == today)
            .ok_or_else(|| not_found("Attendance record"))?;
        if record.start_time.is_none() {
            return Err(bad_request("Start time not recorded yet"));
        }
        if record.end_time.is_some() {
            return Err(bad_request("End time already recorded"));
        }
        record.end_time = Some(now);
        Ok(record.clone())
    }

    async fn amend(&self, amendment: &AttendanceAmendment) -> Result<AttendanceRecord> {
        self.enter("attendance_amend").await;
        let mut state = self.state();
        state.behaviour.can_change_attendance()?;

        let position = state.attendance.iter().position(|record| record.date == amendment.date);
        let pos = match position {
            Some(pos) => pos,
            None => {
                let id = AttendanceId::from(state.next_id());
                state.attendance.push(AttendanceRecord {
                    id,
                    date: amendment.date,
                    start_time: None,
                    end_time: None,
                    comment: String::new(),
                });
                state.attendance.len() - 1
            },
        };

        let record = &mut state.attendance[pos];
        if let Some(start) = amendment.start {
            record.start_time = Some(at(amendment.date, start));
        }
        if let Some(end) = amendment.end {
            record.end_time = Some(at(amendment.date, end));
        }
        record.comment = amendment.comment.clone();
        Ok(record.clone())
    }

    fn now(&self) -> DateTime<Utc> {
        self.state().now()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str) -> ReservationDraft {
        ReservationDraft {
            title: title.to_string(),
            start: Utc.with_ymd_and_hms(2024, 3, 18, 10, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 3, 18, 11, 0, 0).unwrap(),
            comment: String::new(),
        }
    }

    #[tokio::test]
    async fn ids_follow_the_seeded_ones() {
        let store = MemoryStore::with_reservations(vec![
            Reservation::new(Some(ReservationId::from(41)), draft("Standup")),
            Reservation::new(None, draft("Retro")),
        ]);
        assert_eq!(store.reservations()[1].id, Some(ReservationId::from(42)));

        let id = store.create_reservation(&draft("Planning")).await.unwrap();
        assert_eq!(id, ReservationId::from(43));
        assert_eq!(store.calls(), vec!["create_reservation".to_string()]);
    }

    #[tokio::test]
    async fn updates_of_unknown_reservations_are_not_found() {
        let store = MemoryStore::new();
        let err = store.update_reservation(&ReservationId::from(1), &draft("Nope")).await.unwrap_err();
        assert!(matches!(err, Error::Status{ status: 404, .. }));
        assert!(store.delete_reservation(&ReservationId::from(1)).await.is_ok());
    }

    #[tokio::test]
    async fn clocking_follows_the_remote_rules() {
        let store = MemoryStore::new();
        store.set_now(Utc.with_ymd_and_hms(2024, 3, 18, 9, 0, 0).unwrap());

        assert!(matches!(store.clock_out().await, Err(Error::Status{ status: 404, .. })));
        store.clock_in().await.unwrap();
        assert!(matches!(store.clock_in().await, Err(Error::Status{ status: 400, .. })));

        store.set_now(Utc.with_ymd_and_hms(2024, 3, 18, 17, 30, 0).unwrap());
        let record = store.clock_out().await.unwrap();
        assert_eq!(record.duration(), Some(chrono::Duration::minutes(8 * 60 + 30)));
        assert!(matches!(store.clock_out().await, Err(Error::Status{ status: 400, .. })));
    }
}
