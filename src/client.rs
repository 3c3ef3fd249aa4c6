//! This module provides a client to connect to the reservation, task and attendance API

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::attendance::{AttendanceAmendment, AttendanceRecord};
use crate::config::{ClientConfig, USER_AGENT};
use crate::error::{Error, Result};
use crate::id::{AttendanceId, ReservationId, TaskId};
use crate::reservation::{Reservation, ReservationDraft};
use crate::resource::Resource;
use crate::task::{Task, TaskPatch};
use crate::traits::{AttendanceStore, ReservationStore, TaskStore};


#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteReservation {
    id: ReservationId,
    #[serde(default)]
    title: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    #[serde(default)]
    comment: Option<String>,
}

impl From<RemoteReservation> for Reservation {
    fn from(remote: RemoteReservation) -> Self {
        Reservation {
            id: Some(remote.id),
            title: remote.title,
            start: remote.start_time,
            end: remote.end_time,
            comment: remote.comment.unwrap_or_default(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReservationBody<'a> {
    title: &'a str,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    comment: &'a str,
}

impl<'a> From<&'a ReservationDraft> for ReservationBody<'a> {
    fn from(draft: &'a ReservationDraft) -> Self {
        Self { title: &draft.title, start_time: draft.start, end_time: draft.end, comment: &draft.comment }
    }
}

#[derive(Deserialize)]
struct CreatedReservation {
    id: ReservationId,
}

#[derive(Deserialize)]
struct TaskListing {
    #[serde(default)]
    tasks: Option<Vec<Task>>,
}

#[derive(Deserialize)]
struct SingleTask {
    task: Task,
}

#[derive(Deserialize)]
struct RemoteAttendance {
    #[serde(rename = "ID")]
    id: AttendanceId,
    /// Midnight of the day, in the time zone of the server
    #[serde(rename = "Date")]
    date: DateTime<FixedOffset>,
    #[serde(rename = "StartTime", default)]
    start_time: Option<DateTime<Utc>>,
    #[serde(rename = "EndTime", default)]
    end_time: Option<DateTime<Utc>>,
    #[serde(rename = "Comment", default)]
    comment: Option<String>,
}

impl From<RemoteAttendance> for AttendanceRecord {
    fn from(remote: RemoteAttendance) -> Self {
        AttendanceRecord {
            id: remote.id,
            date: remote.date.date_naive(),
            start_time: remote.start_time,
            end_time: remote.end_time,
            comment: remote.comment.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct Wrapped<T> {
    attendance: T,
}


/// A client of the remote API. This does not start a connection until a request is issued
pub struct Client {
    http: reqwest::Client,
    timeout: std::time::Duration,
    reservations: Resource,
    tasks: Resource,
    attendance: Resource,
}

impl Client {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let user_agent = match USER_AGENT.lock() {
            Ok(ua) => ua.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            timeout: config.timeout,
            reservations: config.reservations()?,
            tasks: config.tasks()?,
            attendance: config.attendance()?,
        })
    }

    /// Issues a request, and returns the body of a successful response
    async fn send(&self, method: Method, resource: &Resource, body: Option<String>) -> Result<String> {
        log::debug!("{} {}", method, resource.url());
        let mut request = resource.authorize(self.http.request(method.clone(), resource.url().clone()));
        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = request.send().await.map_err(|err| self.transport_error(err))?;
        let status = response.status();
        let text = response.text().await.map_err(|err| self.transport_error(err))?;

        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized);
        }
        if status.is_success() == false {
            log::warn!("{} {} returned {}", method, resource.url(), status);
            return Err(Error::Status{ status: status.as_u16(), message: error_message(status, &text) });
        }
        Ok(text)
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(self.timeout)
        } else {
            Error::Transport(err)
        }
    }

    fn item(base: &Resource, id: &dyn std::fmt::Display) -> Result<Resource> {
        base.combine(&id.to_string())
    }
}

/// The message of an `{"error": "..."}` (or `{"message": "..."}`) body, or the body itself
fn error_message(status: StatusCode, body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        #[serde(alias = "message")]
        error: String,
    }
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) if body.trim().is_empty() => status.canonical_reason().unwrap_or("").to_string(),
        Err(_) => body.trim().to_string(),
    }
}

fn parse<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|err| {
        let excerpt: String = body.chars().take(120).collect();
        Error::Malformed(format!("{} (in {:?})", err, excerpt))
    })
}


#[async_trait]
impl ReservationStore for Client {
    async fn list_reservations(&self) -> Result<Vec<Reservation>> {
        let text = self.send(Method::GET, &self.reservations, None).await?;
        let listing: Option<Vec<RemoteReservation>> = parse(&text)?;
        Ok(listing.unwrap_or_default().into_iter().map(Reservation::from).collect())
    }

    async fn create_reservation(&self, draft: &ReservationDraft) -> Result<ReservationId> {
        let body = serde_json::to_string(&ReservationBody::from(draft))?;
        let text = self.send(Method::POST, &self.reservations, Some(body)).await?;
        let created: CreatedReservation = parse(&text)?;
        Ok(created.id)
    }

    async fn update_reservation(&self, id: &ReservationId, fields: &ReservationDraft) -> Result<()> {
        let body = serde_json::to_string(&ReservationBody::from(fields))?;
        let resource = Self::item(&self.reservations, id)?;
        self.send(Method::PUT, &resource, Some(body)).await?;
        Ok(())
    }

    async fn delete_reservation(&self, id: &ReservationId) -> Result<()> {
        let resource = Self::item(&self.reservations, id)?;
        self.send(Method::DELETE, &resource, None).await?;
        Ok(())
    }
}

#[async_trait]
impl TaskStore for Client {
    async fn list_tasks(&self) -> Result<Vec<Task>> {
        let text = self.send(Method::GET, &self.tasks, None).await?;
        let listing: TaskListing = parse(&text)?;
        Ok(listing.tasks.unwrap_or_default())
    }

    async fn create_task(&self, title: &str) -> Result<Task> {
        let body = json!({ "title": title }).to_string();
        let text = self.send(Method::POST, &self.tasks, Some(body)).await?;
        let created: SingleTask = parse(&text)?;
        Ok(created.task)
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task> {
        let body = serde_json::to_string(patch)?;
        let resource = Self::item(&self.tasks, id)?;
        let text = self.send(Method::PUT, &resource, Some(body)).await?;
        let updated: SingleTask = parse(&text)?;
        Ok(updated.task)
    }

    async fn delete_task(&self, id: &TaskId) -> Result<()> {
        let resource = Self::item(&self.tasks, id)?;
        self.send(Method::DELETE, &resource, None).await?;
        Ok(())
    }
}

#[async_trait]
impl AttendanceStore for Client {
    async fn today(&self) -> Result<Option<AttendanceRecord>> {
        let text = self.send(Method::GET, &self.attendance, None).await?;
        let today: Wrapped<Option<RemoteAttendance>> = parse(&text)?;
        Ok(today.attendance.map(AttendanceRecord::from))
    }

    async fn monthly(&self, year: i32, month: u32) -> Result<Vec<AttendanceRecord>> {
        let resource = self.attendance.combine("monthly")?
            .with_query(&[("month", month.to_string()), ("year", year.to_string())]);
        let text = self.send(Method::GET, &resource, None).await?;
        let records: Wrapped<Option<Vec<RemoteAttendance>>> = parse(&text)?;
        Ok(records.attendance.unwrap_or_default().into_iter().map(AttendanceRecord::from).collect())
    }

    async fn clock_in(&self) -> Result<AttendanceRecord> {
        let resource = self.attendance.combine("start")?;
        let text = self.send(Method::POST, &resource, None).await?;
        let record: Wrapped<RemoteAttendance> = parse(&text)?;
        Ok(record.attendance.into())
    }

    async fn clock_out(&self) -> Result<AttendanceRecord> {
        let resource = self.attendance.combine("end")?;
        let text = self.send(Method::POST, &resource, None).await?;
        let record: Wrapped<RemoteAttendance> = parse(&text)?;
        Ok(record.attendance.into())
    }

    async fn amend(&self, amendment: &AttendanceAmendment) -> Result<AttendanceRecord> {
        let resource = self.attendance.combine("update")?;
        let body = amendment.to_json().to_string();
        let text = self.send(Method::POST, &resource, Some(body)).await?;
        let record: Wrapped<RemoteAttendance> = parse(&text)?;
        Ok(record.attendance.into())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn reservation_listing() {
        let body = r#"[
            {"id": 12, "title": "Standup", "startTime": "2024-03-18T10:00:00Z", "endTime": "2024-03-18T11:00:00Z",
             "comment": "urgent", "userEmail": "a@b.c", "createdAt": "2024-03-01T08:00:00Z"},
            {"id": "13", "title": "Retro", "startTime": "2024-03-18T14:00:00+01:00", "endTime": "2024-03-18T15:00:00+01:00"}
        ]"#;
        let listing: Vec<RemoteReservation> = parse(body).unwrap();
        let reservations: Vec<Reservation> = listing.into_iter().map(Reservation::from).collect();

        assert_eq!(reservations[0].id, Some(ReservationId::from(12)));
        assert_eq!(reservations[0].comment, "urgent");
        assert_eq!(reservations[1].id, Some(ReservationId::from(13)));
        assert_eq!(reservations[1].comment, "");
        assert_eq!(reservations[1].start, Utc.with_ymd_and_hms(2024, 3, 18, 13, 0, 0).unwrap());
    }

    #[test]
    fn reservation_body() {
        let draft = ReservationDraft {
            title: "Standup".to_string(),
            start: Utc.with_ymd_and_hms(2024, 3, 18, 10, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 3, 18, 11, 0, 0).unwrap(),
            comment: String::new(),
        };
        let body: serde_json::Value = serde_json::to_value(ReservationBody::from(&draft)).unwrap();
        assert_eq!(body, json!({
            "title": "Standup",
            "startTime": "2024-03-18T10:00:00Z",
            "endTime": "2024-03-18T11:00:00Z",
            "comment": "",
        }));
    }

    #[test]
    fn malformed_bodies() {
        assert!(matches!(parse::<Vec<RemoteReservation>>("<html>"), Err(Error::Malformed(_))));
        assert!(matches!(parse::<CreatedReservation>(r#"{"id": ""}"#), Err(Error::Malformed(_))));
    }

    #[test]
    fn attendance_records() {
        let body = r#"{"attendance": {"ID": 3, "UserEmail": "a@b.c", "Date": "2024-03-18T00:00:00+09:00",
            "StartTime": "2024-03-18T09:00:00+09:00", "EndTime": null, "Comment": ""}}"#;
        let today: Wrapped<Option<RemoteAttendance>> = parse(body).unwrap();
        let record = AttendanceRecord::from(today.attendance.unwrap());
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 3, 18).unwrap());
        assert_eq!(record.start_time, Some(Utc.with_ymd_and_hms(2024, 3, 18, 0, 0, 0).unwrap()));
        assert_eq!(record.end_time, None);

        let nothing: Wrapped<Option<RemoteAttendance>> = parse(r#"{"attendance": null}"#).unwrap();
        assert!(nothing.attendance.is_none());
    }

    #[test]
    fn task_listings() {
        let listing: TaskListing = parse(r#"{"tasks": null}"#).unwrap();
        assert_eq!(listing.tasks.unwrap_or_default(), Vec::new());
        let listing: TaskListing = parse(r#"{"tasks": [{"ID": 1, "Title": "Call Bob", "Completed": false, "OwnerEmail": "a@b.c"}]}"#).unwrap();
        assert_eq!(listing.tasks.unwrap()[0].title(), "Call Bob");
    }

    #[test]
    fn error_messages() {
        assert_eq!(error_message(StatusCode::BAD_REQUEST, r#"{"error": "Start time already recorded"}"#), "Start time already recorded");
        assert_eq!(error_message(StatusCode::BAD_REQUEST, r#"{"message": "End time already recorded"}"#), "End time already recorded");
        assert_eq!(error_message(StatusCode::NOT_FOUND, ""), "Not Found");
        assert_eq!(error_message(StatusCode::INTERNAL_SERVER_ERROR, "oops\n"), "oops");
    }
}
