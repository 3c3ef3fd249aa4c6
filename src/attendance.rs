//! Clocking in and out, and the monthly attendance sheet

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde_json::json;

use crate::error::{Error, Result};
use crate::id::AttendanceId;
use crate::traits::AttendanceStore;

/// How long a standard workday lasts, unless configured otherwise
pub fn default_workday() -> Duration {
    Duration::hours(8)
}

/// The attendance of the authenticated user on a given day
#[derive(Clone, Debug, PartialEq)]
pub struct AttendanceRecord {
    pub id: AttendanceId,
    pub date: NaiveDate,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub comment: String,
}

impl AttendanceRecord {
    pub fn is_clocked_in(&self) -> bool {
        self.start_time.is_some()
    }

    pub fn is_clocked_out(&self) -> bool {
        self.end_time.is_some()
    }

    /// The time worked on this day, floored to the minute. `None` until both times are known
    pub fn duration(&self) -> Option<Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(Duration::minutes((end - start).num_minutes())),
            _ => None,
        }
    }

    /// The time worked beyond `standard_workday`, or zero
    pub fn overtime(&self, standard_workday: Duration) -> Option<Duration> {
        self.duration().map(|worked| {
            let extra = worked - standard_workday;
            if extra > Duration::zero() { extra } else { Duration::zero() }
        })
    }
}

/// Formats a duration as e.g. `7h 45m`
pub fn format_duration(duration: Duration) -> String {
    let minutes = duration.num_minutes();
    let sign = if minutes < 0 { "-" } else { "" };
    let minutes = minutes.abs();
    format!("{}{}h {}m", sign, minutes / 60, minutes % 60)
}


/// Creates or corrects the record of a day.
///
/// A time left to `None` is not changed by the remote store.
#[derive(Clone, Debug, PartialEq)]
pub struct AttendanceAmendment {
    pub date: NaiveDate,
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
    pub comment: String,
}

impl AttendanceAmendment {
    pub fn new(date: NaiveDate) -> Self {
        Self { date, start: None, end: None, comment: String::new() }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let time = |t: &Option<NaiveTime>| t.map(|t| t.format("%H:%M").to_string()).unwrap_or_default();
        json!({
            "Date": self.date.format("%Y-%m-%d").to_string(),
            "StartTime": time(&self.start),
            "EndTime": time(&self.end),
            "Comment": self.comment,
        })
    }
}


/// Today's record and the displayed month, kept in sync with an [`AttendanceStore`]
pub struct AttendanceTracker<S: AttendanceStore> {
    store: S,
    standard_workday: Duration,
    today: Option<AttendanceRecord>,
    month: Vec<AttendanceRecord>,
    /// The year and month `month` holds, once loaded
    loaded_month: Option<(i32, u32)>,
}

impl<S: AttendanceStore> AttendanceTracker<S> {
    pub fn new(store: S, standard_workday: Duration) -> Self {
        Self { store, standard_workday, today: None, month: Vec::new(), loaded_month: None }
    }

    pub fn store(&self) -> &S                       { &self.store }
    pub fn standard_workday(&self) -> Duration      { self.standard_workday }
    pub fn today(&self) -> Option<&AttendanceRecord> { self.today.as_ref() }
    pub fn month(&self) -> &[AttendanceRecord]      { &self.month }
    pub fn loaded_month(&self) -> Option<(i32, u32)> { self.loaded_month }

    pub async fn refresh_today(&mut self) -> Result<()> {
        self.today = self.store.today().await?;
        Ok(())
    }

    pub async fn load_month(&mut self, year: i32, month: u32) -> Result<()> {
        if (1..=12).contains(&month) == false {
            return Err(Error::Rejected(format!("Invalid month {}", month)));
        }
        let mut records = self.store.monthly(year, month).await?;
        records.sort_by_key(|record| record.date);
        log::info!("Loaded {} attendance records for {}-{:02}", records.len(), year, month);
        self.month = records;
        self.loaded_month = Some((year, month));
        Ok(())
    }

    /// Fetches today's record again, unless the cached one already is today's
    async fn ensure_today(&mut self) -> Result<()> {
        let today = self.store.now().date_naive();
        if self.today.as_ref().map(|record| record.date) != Some(today) {
            self.refresh_today().await?;
        }
        Ok(())
    }

    pub async fn clock_in(&mut self) -> Result<AttendanceRecord> {
        self.ensure_today().await?;
        if self.today.as_ref().map(AttendanceRecord::is_clocked_in) == Some(true) {
            return Err(Error::Rejected("Start time already recorded".to_string()));
        }

        let record = self.store.clock_in().await?;
        self.today = Some(record.clone());
        self.store_record(&record);
        Ok(record)
    }

    pub async fn clock_out(&mut self) -> Result<AttendanceRecord> {
        self.ensure_today().await?;
        match &self.today {
            Some(record) if record.is_clocked_out() => {
                return Err(Error::Rejected("End time already recorded".to_string()));
            },
            Some(record) if record.is_clocked_in() => {},
            _ => return Err(Error::Rejected("Start time not recorded yet".to_string())),
        }

        let record = self.store.clock_out().await?;
        self.today = Some(record.clone());
        self.store_record(&record);
        Ok(record)
    }

    pub async fn amend(&mut self, amendment: &AttendanceAmendment) -> Result<AttendanceRecord> {
        if let (Some(start), Some(end)) = (amendment.start, amendment.end) {
            if end < start {
                return Err(Error::Rejected("The end time cannot be before the start time".to_string()));
            }
        }
        let record = self.store.amend(amendment).await?;
        self.store_record(&record);
        Ok(record)
    }

    /// The total time worked in the loaded month
    pub fn month_total(&self) -> Duration {
        self.month.iter()
            .filter_map(AttendanceRecord::duration)
            .fold(Duration::zero(), |total, worked| total + worked)
    }

    /// The overtime of the loaded month
    pub fn month_overtime(&self) -> Duration {
        self.month.iter()
            .filter_map(|record| record.overtime(self.standard_workday))
            .fold(Duration::zero(), |total, extra| total + extra)
    }

    /// Stores a record returned by the remote store in today's slot and in the loaded month, where they match its date
    fn store_record(&mut self, record: &AttendanceRecord) {
        match self.month.iter_mut().find(|known| known.date == record.date) {
            Some(known) => *known = record.clone(),
            None => {
                if self.loaded_month == Some((record.date.year(), record.date.month())) {
                    self.month.push(record.clone());
                    self.month.sort_by_key(|known| known.date);
                }
            },
        }

        if record.date == self.store.now().date_naive() {
            self.today = Some(record.clone());
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    fn record(start: Option<(u32, u32)>, end: Option<(u32, u32)>) -> AttendanceRecord {
        let at = |(h, m): (u32, u32)| Utc.with_ymd_and_hms(2024, 3, 18, h, m, 0).unwrap();
        AttendanceRecord {
            id: AttendanceId::from(1),
            date: NaiveDate::from_ymd_opt(2024, 3, 18).unwrap(),
            start_time: start.map(at),
            end_time: end.map(at),
            comment: String::new(),
        }
    }

    #[test]
    fn durations_are_floored_to_the_minute() {
        let mut day = record(Some((9, 0)), Some((17, 45)));
        day.end_time = day.end_time.map(|end| end + Duration::seconds(59));
        assert_eq!(day.duration(), Some(Duration::minutes(8 * 60 + 45)));
        assert_eq!(format_duration(day.duration().unwrap()), "8h 45m");
        assert_eq!(day.overtime(default_workday()), Some(Duration::minutes(45)));

        assert_eq!(record(Some((9, 0)), None).duration(), None);
        assert_eq!(record(Some((9, 0)), Some((12, 5))).overtime(default_workday()), Some(Duration::zero()));
        assert_eq!(format_duration(Duration::minutes(0)), "0h 0m");
    }

    #[test]
    fn amendments_use_the_remote_formats() {
        let mut amendment = AttendanceAmendment::new(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        amendment.start = NaiveTime::from_hms_opt(8, 30, 0);
        amendment.comment = "Dentist".to_string();

        assert_eq!(amendment.to_json(), json!({
            "Date": "2024-03-05",
            "StartTime": "08:30",
            "EndTime": "",
            "Comment": "Dentist",
        }));
    }
}
