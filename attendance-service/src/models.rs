//! Attendance domain models.
//!
//! Core types for clock events, monthly punch logs and the read-only
//! employee/location/schedule references the service consumes.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Geographic coordinate reported by a client or configured on a location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub long: f64,
}

/// Work location with its geofence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub coordinates: Coordinate,
    /// Geofence acceptance threshold, in meters. Never negative.
    pub radius_meters: f64,
}

/// One shift window within a scheduled day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShiftWindow {
    #[serde(rename = "in")]
    pub start: NaiveTime,
    #[serde(rename = "out")]
    pub end: NaiveTime,
}

/// Weekly shift schedule. A weekday without an entry is an off day.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub id: String,
    pub title: String,
    pub shift_times: HashMap<Weekday, ShiftWindow>,
}

impl Schedule {
    /// Shift window for a weekday, if the employee is scheduled that day.
    pub fn shift_for(&self, weekday: Weekday) -> Option<&ShiftWindow> {
        self.shift_times.get(&weekday)
    }

    /// Whether the employee is scheduled on the given calendar date.
    pub fn is_scheduled_on(&self, date: NaiveDate) -> bool {
        self.shift_times.contains_key(&date.weekday())
    }
}

/// Employee record as supplied by the external directory.
///
/// The service only reads these; employee CRUD lives elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub location: Option<String>,
    pub schedule: Option<String>,
}

/// Employee with location and schedule references resolved.
///
/// References that fail to resolve stay `None`, so one broken reference
/// degrades that employee's figures without failing a whole report.
#[derive(Debug, Clone)]
pub struct ResolvedEmployee {
    pub id: String,
    pub name: String,
    pub location: Option<Location>,
    pub schedule: Option<Schedule>,
}

/// Expected next punch for an employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PunchMode {
    /// Next valid punch is a clock-in.
    Start,
    /// Next valid punch is a clock-out.
    Stop,
}

/// One work session within a day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogInterval {
    #[serde(rename = "in")]
    pub clock_in: DateTime<Utc>,
    #[serde(rename = "out", skip_serializing_if = "Option::is_none")]
    pub clock_out: Option<DateTime<Utc>>,
    #[serde(default)]
    pub late_punched: bool,
    /// Minutes past the scheduled shift start, zero when on time.
    #[serde(default)]
    pub late_minutes: i64,
}

impl LogInterval {
    /// Create an open interval starting at the given clock-in time.
    pub fn open(clock_in: DateTime<Utc>) -> Self {
        Self {
            clock_in,
            clock_out: None,
            late_punched: false,
            late_minutes: 0,
        }
    }

    /// Whether the interval has both a clock-in and a clock-out.
    pub fn is_closed(&self) -> bool {
        self.clock_out.is_some()
    }

    /// Hours worked in this interval once it is closed.
    pub fn working_hours(&self) -> Option<f64> {
        self.clock_out.map(|out| {
            let duration = out.signed_duration_since(self.clock_in);
            duration.num_minutes() as f64 / 60.0
        })
    }
}

/// Month bucket key for a date, e.g. `"1-2024"` for January 2024.
pub fn month_key(date: NaiveDate) -> String {
    format!("{}-{}", date.month(), date.year())
}

/// Per-employee, per-month punch log.
///
/// Days are keyed by full calendar date so that logs merged across months
/// never collide on the day-of-month. Reduction to day-of-month or weekday
/// keys happens only at display time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyLog {
    /// Month bucket key, `"M-YYYY"`.
    pub month: String,
    /// Owning employee. Immutable after creation.
    pub employee_id: String,
    /// Ordered punch intervals per calendar date.
    pub days: BTreeMap<NaiveDate, Vec<LogInterval>>,
    /// Most recent clock-in across the whole month.
    pub last_in: Option<DateTime<Utc>>,
    /// Most recent clock-out across the whole month.
    pub last_out: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Optimistic-concurrency version, bumped by the repository on update.
    #[serde(default)]
    pub version: u64,
}

impl MonthlyLog {
    /// Create an empty log for an employee and month bucket.
    pub fn new(employee_id: impl Into<String>, month: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            month: month.into(),
            employee_id: employee_id.into(),
            days: BTreeMap::new(),
            last_in: None,
            last_out: None,
            created_at: now,
            version: 0,
        }
    }

    /// Intervals recorded for a date, if any.
    pub fn day(&self, date: NaiveDate) -> Option<&Vec<LogInterval>> {
        self.days.get(&date)
    }

    /// Whether every interval recorded for the date is closed.
    pub fn day_fully_closed(&self, date: NaiveDate) -> bool {
        self.days
            .get(&date)
            .map(|intervals| intervals.iter().all(LogInterval::is_closed))
            .unwrap_or(true)
    }

    /// Earliest still-open interval for the date.
    pub fn first_open_interval_mut(&mut self, date: NaiveDate) -> Option<&mut LogInterval> {
        self.days
            .get_mut(&date)?
            .iter_mut()
            .find(|interval| !interval.is_closed())
    }

    /// Append a new interval to the date and track the last clock-in.
    pub fn append_interval(&mut self, date: NaiveDate, interval: LogInterval) {
        self.last_in = Some(interval.clock_in);
        self.days.entry(date).or_default().push(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_month_key_format() {
        assert_eq!(month_key(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()), "1-2024");
        assert_eq!(month_key(NaiveDate::from_ymd_opt(2024, 11, 1).unwrap()), "11-2024");
    }

    #[test]
    fn test_working_hours_requires_clock_out() {
        let mut interval = LogInterval::open(ts(2024, 1, 15, 9, 0));
        assert!(interval.working_hours().is_none());

        interval.clock_out = Some(ts(2024, 1, 15, 17, 30));
        let hours = interval.working_hours().unwrap();
        assert!((hours - 8.5).abs() < 0.01);
    }

    #[test]
    fn test_first_open_interval_is_earliest() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let mut log = MonthlyLog::new("EMP001", "1-2024", ts(2024, 1, 15, 8, 0));

        let mut closed = LogInterval::open(ts(2024, 1, 15, 9, 0));
        closed.clock_out = Some(ts(2024, 1, 15, 12, 0));
        log.append_interval(date, closed);
        log.append_interval(date, LogInterval::open(ts(2024, 1, 15, 13, 0)));
        log.append_interval(date, LogInterval::open(ts(2024, 1, 15, 14, 0)));

        let open = log.first_open_interval_mut(date).unwrap();
        assert_eq!(open.clock_in, ts(2024, 1, 15, 13, 0));
        assert!(!log.day_fully_closed(date));
    }

    #[test]
    fn test_schedule_off_day() {
        let mut shift_times = HashMap::new();
        shift_times.insert(
            Weekday::Mon,
            ShiftWindow {
                start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            },
        );
        let schedule = Schedule {
            id: "SCH1".to_string(),
            title: "Weekday".to_string(),
            shift_times,
        };

        // 2024-01-15 is a Monday, 2024-01-14 a Sunday.
        assert!(schedule.is_scheduled_on(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()));
        assert!(!schedule.is_scheduled_on(NaiveDate::from_ymd_opt(2024, 1, 14).unwrap()));
    }
}
