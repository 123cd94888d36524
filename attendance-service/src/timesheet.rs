//! Timesheet aggregation.
//!
//! Pure reshaping of monthly logs into date-bounded views: the P/A/O
//! attendance grid, the weekly raw view and the flat export rows. Merging
//! across months stays keyed by full calendar date; reduction to
//! day-of-month or weekday keys happens only at the display step.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Days, Months, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::models::{LogInterval, MonthlyLog, ResolvedEmployee};

/// Timesheet display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimesheetMode {
    /// Grid keyed by day-of-month, filled with P/A/O statuses.
    Monthly,
    /// Raw intervals keyed by weekday name.
    Weekly,
}

/// Attendance status of one day in the monthly grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayStatus {
    #[serde(rename = "P")]
    Present,
    #[serde(rename = "A")]
    Absent,
    #[serde(rename = "O")]
    Off,
}

/// One cell of a timesheet row.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DayEntry {
    Status(DayStatus),
    Intervals(Vec<LogInterval>),
}

/// One employee's row in the timesheet.
#[derive(Debug, Clone, Serialize)]
pub struct TimesheetRow {
    pub employee_id: String,
    pub employee_name: String,
    pub logs: BTreeMap<String, DayEntry>,
}

/// One interval flattened for CSV/spreadsheet export.
///
/// The export formatting itself is external; these rows carry everything
/// it needs, scheduled shift times included.
#[derive(Debug, Clone, Serialize)]
pub struct ExportRow {
    pub date: NaiveDate,
    pub day: String,
    pub employee_id: String,
    pub employee_name: String,
    pub clock_in: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clock_out: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_in: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_out: Option<NaiveTime>,
    pub late_punched: bool,
    pub late_minutes: i64,
}

/// English weekday name, matching schedule display keys.
pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Number of days in the calendar month containing `date`.
pub fn days_in_month(date: NaiveDate) -> u32 {
    let first = date.with_day(1).expect("day 1 always exists");
    let next_month = first + Months::new(1);
    (next_month - Days::new(1)).day()
}

/// Merge monthly logs by employee, keyed by full calendar date.
///
/// Logs of the same employee from different months cannot collide here:
/// day 15 of January and day 15 of February stay distinct dates.
pub fn merge_logs(logs: &[MonthlyLog]) -> HashMap<String, BTreeMap<NaiveDate, Vec<LogInterval>>> {
    let mut merged: HashMap<String, BTreeMap<NaiveDate, Vec<LogInterval>>> = HashMap::new();
    for log in logs {
        let days = merged.entry(log.employee_id.clone()).or_default();
        for (date, intervals) in &log.days {
            days.insert(*date, intervals.clone());
        }
    }
    merged
}

/// Build the timesheet for a date range.
///
/// `today` bounds the monthly fill so future days stay blank; passing it
/// in keeps the function pure.
pub fn build_timesheet(
    logs: &[MonthlyLog],
    employees: &[ResolvedEmployee],
    start_date: NaiveDate,
    end_date: NaiveDate,
    mode: TimesheetMode,
    today: NaiveDate,
) -> Vec<TimesheetRow> {
    let merged = merge_logs(logs);

    let mut rows: Vec<TimesheetRow> = employees
        .iter()
        .filter_map(|employee| {
            let days = merged.get(&employee.id)?;
            let in_range: BTreeMap<NaiveDate, Vec<LogInterval>> = days
                .iter()
                .filter(|(date, _)| **date >= start_date && **date <= end_date)
                .map(|(date, intervals)| (*date, intervals.clone()))
                .collect();

            let logs = match mode {
                TimesheetMode::Monthly => monthly_grid(&in_range, employee, start_date, today),
                TimesheetMode::Weekly => weekly_view(&in_range),
            };

            Some(TimesheetRow {
                employee_id: employee.id.clone(),
                employee_name: employee.name.clone(),
                logs,
            })
        })
        .collect();

    rows.sort_by(|a, b| a.employee_name.cmp(&b.employee_name));
    rows
}

/// P/A/O grid keyed by day-of-month for the month containing `start_date`.
fn monthly_grid(
    days: &BTreeMap<NaiveDate, Vec<LogInterval>>,
    employee: &ResolvedEmployee,
    start_date: NaiveDate,
    today: NaiveDate,
) -> BTreeMap<String, DayEntry> {
    let mut grid = BTreeMap::new();

    for day in 1..=days_in_month(start_date) {
        let date = match start_date.with_day(day) {
            Some(date) => date,
            None => continue,
        };
        if date > today {
            break;
        }

        // A late day is still Present at the grid level; lateness is a
        // metric, not an attendance status.
        let status = if days.contains_key(&date) {
            DayStatus::Present
        } else {
            let scheduled = employee
                .schedule
                .as_ref()
                .map(|s| s.is_scheduled_on(date))
                .unwrap_or(false);
            if scheduled {
                DayStatus::Absent
            } else {
                DayStatus::Off
            }
        };

        grid.insert(day.to_string(), DayEntry::Status(status));
    }

    grid
}

/// Raw intervals re-keyed by weekday name. On a range longer than a week
/// the later date wins its weekday slot.
fn weekly_view(days: &BTreeMap<NaiveDate, Vec<LogInterval>>) -> BTreeMap<String, DayEntry> {
    let mut view = BTreeMap::new();
    for (date, intervals) in days {
        view.insert(
            weekday_name(date.weekday()).to_string(),
            DayEntry::Intervals(intervals.clone()),
        );
    }
    view
}

/// Flatten in-range intervals into export rows, ordered by employee name
/// and date.
pub fn build_export_rows(
    logs: &[MonthlyLog],
    employees: &[ResolvedEmployee],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Vec<ExportRow> {
    let merged = merge_logs(logs);

    let mut rows = Vec::new();
    let mut sorted: Vec<&ResolvedEmployee> = employees.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    for employee in sorted {
        let Some(days) = merged.get(&employee.id) else {
            continue;
        };
        for (date, intervals) in days {
            if *date < start_date || *date > end_date {
                continue;
            }
            let shift = employee
                .schedule
                .as_ref()
                .and_then(|s| s.shift_for(date.weekday()));
            for interval in intervals {
                rows.push(ExportRow {
                    date: *date,
                    day: weekday_name(date.weekday()).to_string(),
                    employee_id: employee.id.clone(),
                    employee_name: employee.name.clone(),
                    clock_in: interval.clock_in,
                    clock_out: interval.clock_out,
                    scheduled_in: shift.map(|s| s.start),
                    scheduled_out: shift.map(|s| s.end),
                    late_punched: interval.late_punched,
                    late_minutes: interval.late_minutes,
                });
            }
        }
    }

    rows
}
