//! Attendance metrics engine.
//!
//! Derived dashboard statistics over a snapshot of monthly logs plus the
//! employees' resolved schedules and locations. Everything here is pure
//! aggregation; callers fetch the inputs and decide the date window.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{Location, LogInterval, MonthlyLog, ResolvedEmployee};
use crate::timesheet::merge_logs;

/// Work-hour and lateness totals for one employee.
#[derive(Debug, Clone, Default)]
struct EmployeeTotals {
    work_hours: f64,
    late_days: u64,
    late_minutes: i64,
}

/// Average lateness across employees with at least one log.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LateMetrics {
    pub avg_late_days: f64,
    pub avg_late_minutes: f64,
}

/// On-time percentage of one location's employees.
#[derive(Debug, Clone, Serialize)]
pub struct LocationOnTime {
    pub location_id: String,
    pub location_name: String,
    pub on_time_percentage: f64,
}

/// Presence/absence/off day counts for one location.
#[derive(Debug, Clone, Serialize)]
pub struct LocationAttendance {
    pub location_id: String,
    pub location_name: String,
    pub present_days: u64,
    pub absent_days: u64,
    pub off_days: u64,
}

/// Today-only attendance status per employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SnapshotStatus {
    Off,
    Absent,
    Late,
    #[serde(rename = "On Time")]
    OnTime,
}

/// One employee's entry in the today snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotEntry {
    pub employee_id: String,
    pub employee_name: String,
    pub status: SnapshotStatus,
}

/// Full dashboard payload for a date window.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardMetrics {
    pub avg_work_hours: f64,
    pub avg_late_days: f64,
    pub avg_late_minutes: f64,
    pub on_time_percentage: f64,
    pub late_percentage: f64,
    pub absent_percentage: f64,
    pub on_time_percentage_by_location: Vec<LocationOnTime>,
    pub on_time_percentage_by_date: BTreeMap<NaiveDate, f64>,
    pub attendance_by_location: Vec<LocationAttendance>,
}

fn in_window(date: NaiveDate, start: NaiveDate, end: NaiveDate) -> bool {
    date >= start && date <= end
}

/// Per-employee totals over the in-window days of the given logs.
fn employee_totals(
    logs: &[MonthlyLog],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> BTreeMap<String, EmployeeTotals> {
    let mut totals: BTreeMap<String, EmployeeTotals> = BTreeMap::new();

    for (employee_id, days) in merge_logs(logs) {
        let entry = totals.entry(employee_id).or_default();
        for (date, intervals) in days {
            if !in_window(date, start_date, end_date) {
                continue;
            }
            for interval in intervals {
                if let Some(hours) = interval.working_hours() {
                    entry.work_hours += hours;
                }
                if interval.late_punched {
                    entry.late_days += 1;
                }
                entry.late_minutes += interval.late_minutes;
            }
        }
    }

    totals
}

/// Average work hours per employee with at least one log in the window.
///
/// Employees without logs are excluded from the denominator, not counted
/// as zero.
pub fn average_work_hours(logs: &[MonthlyLog], start_date: NaiveDate, end_date: NaiveDate) -> f64 {
    let totals = employee_totals(logs, start_date, end_date);
    if totals.is_empty() {
        return 0.0;
    }
    let sum: f64 = totals.values().map(|t| t.work_hours).sum();
    sum / totals.len() as f64
}

/// Average late days and minutes per employee with at least one log.
pub fn late_metrics(logs: &[MonthlyLog], start_date: NaiveDate, end_date: NaiveDate) -> LateMetrics {
    let totals = employee_totals(logs, start_date, end_date);
    if totals.is_empty() {
        return LateMetrics::default();
    }
    let count = totals.len() as f64;
    LateMetrics {
        avg_late_days: totals.values().map(|t| t.late_days as f64).sum::<f64>() / count,
        avg_late_minutes: totals.values().map(|t| t.late_minutes as f64).sum::<f64>() / count,
    }
}

/// Inclusive day count of the window.
pub fn days_in_range(start_date: NaiveDate, end_date: NaiveDate) -> i64 {
    end_date.signed_duration_since(start_date).num_days() + 1
}

/// `100 − avgLateDays × 100 / totalDaysInRange`, clamped at the zero-width
/// window.
pub fn on_time_percentage(avg_late_days: f64, start_date: NaiveDate, end_date: NaiveDate) -> f64 {
    let days = days_in_range(start_date, end_date);
    if days <= 0 {
        return 0.0;
    }
    100.0 - (avg_late_days * 100.0 / days as f64)
}

/// On-time percentage grouped by employee location.
///
/// Every known location appears; locations without matching employees
/// report zero rather than being omitted.
pub fn on_time_percentage_by_location(
    logs: &[MonthlyLog],
    employees: &[ResolvedEmployee],
    locations: &[Location],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Vec<LocationOnTime> {
    locations
        .iter()
        .map(|location| {
            let member_ids: Vec<&str> = employees
                .iter()
                .filter(|e| e.location.as_ref().is_some_and(|l| l.id == location.id))
                .map(|e| e.id.as_str())
                .collect();

            let member_logs: Vec<MonthlyLog> = logs
                .iter()
                .filter(|l| member_ids.contains(&l.employee_id.as_str()))
                .cloned()
                .collect();

            let percentage = if member_logs.is_empty() {
                0.0
            } else {
                let late = late_metrics(&member_logs, start_date, end_date);
                on_time_percentage(late.avg_late_days, start_date, end_date)
            };

            LocationOnTime {
                location_id: location.id.clone(),
                location_name: location.name.clone(),
                on_time_percentage: percentage,
            }
        })
        .collect()
}

/// Per-date on-time percentage across all employees.
///
/// A date with zero punch entries yields `0`, never a division by zero.
pub fn on_time_percentage_by_date(
    logs: &[MonthlyLog],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> BTreeMap<NaiveDate, f64> {
    let merged = merge_logs(logs);
    let mut by_date = BTreeMap::new();

    let mut date = start_date;
    while date <= end_date {
        let entries: Vec<&LogInterval> = merged
            .values()
            .filter_map(|days| days.get(&date))
            .flatten()
            .collect();

        let percentage = if entries.is_empty() {
            0.0
        } else {
            let late = entries.iter().filter(|e| e.late_punched).count() as f64;
            100.0 - (late * 100.0 / entries.len() as f64)
        };
        by_date.insert(date, percentage);

        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    by_date
}

/// Present/absent/off day counts grouped by location, up to `today`.
pub fn attendance_by_location(
    logs: &[MonthlyLog],
    employees: &[ResolvedEmployee],
    locations: &[Location],
    start_date: NaiveDate,
    end_date: NaiveDate,
    today: NaiveDate,
) -> Vec<LocationAttendance> {
    let merged = merge_logs(logs);
    let end = end_date.min(today);

    locations
        .iter()
        .map(|location| {
            let mut attendance = LocationAttendance {
                location_id: location.id.clone(),
                location_name: location.name.clone(),
                present_days: 0,
                absent_days: 0,
                off_days: 0,
            };

            for employee in employees {
                if !employee.location.as_ref().is_some_and(|l| l.id == location.id) {
                    continue;
                }
                let days = merged.get(&employee.id);

                let mut date = start_date;
                while date <= end {
                    let punched = days.is_some_and(|d| d.contains_key(&date));
                    let scheduled = employee
                        .schedule
                        .as_ref()
                        .map(|s| s.is_scheduled_on(date))
                        .unwrap_or(false);

                    if punched {
                        attendance.present_days += 1;
                    } else if scheduled {
                        attendance.absent_days += 1;
                    } else {
                        attendance.off_days += 1;
                    }

                    date = match date.succ_opt() {
                        Some(next) => next,
                        None => break,
                    };
                }
            }

            attendance
        })
        .collect()
}

/// Today-only status per employee.
pub fn snapshot(
    logs: &[MonthlyLog],
    employees: &[ResolvedEmployee],
    today: NaiveDate,
) -> Vec<SnapshotEntry> {
    let merged = merge_logs(logs);

    employees
        .iter()
        .map(|employee| {
            let todays_intervals = merged.get(&employee.id).and_then(|days| days.get(&today));
            let scheduled = employee
                .schedule
                .as_ref()
                .map(|s| s.is_scheduled_on(today))
                .unwrap_or(false);

            let status = match todays_intervals {
                Some(intervals) => {
                    if intervals.iter().any(|i| i.late_punched) {
                        SnapshotStatus::Late
                    } else {
                        SnapshotStatus::OnTime
                    }
                }
                None if scheduled => SnapshotStatus::Absent,
                None => SnapshotStatus::Off,
            };

            SnapshotEntry {
                employee_id: employee.id.clone(),
                employee_name: employee.name.clone(),
                status,
            }
        })
        .collect()
}

/// Assemble the full dashboard payload for a window.
pub fn dashboard(
    logs: &[MonthlyLog],
    employees: &[ResolvedEmployee],
    locations: &[Location],
    start_date: NaiveDate,
    end_date: NaiveDate,
    today: NaiveDate,
) -> DashboardMetrics {
    let avg_work_hours = average_work_hours(logs, start_date, end_date);
    let late = late_metrics(logs, start_date, end_date);
    let on_time = on_time_percentage(late.avg_late_days, start_date, end_date);

    let by_location = attendance_by_location(logs, employees, locations, start_date, end_date, today);
    let scheduled_days: u64 = by_location
        .iter()
        .map(|l| l.present_days + l.absent_days)
        .sum();
    let absent_days: u64 = by_location.iter().map(|l| l.absent_days).sum();
    let absent_percentage = if scheduled_days == 0 {
        0.0
    } else {
        absent_days as f64 * 100.0 / scheduled_days as f64
    };

    DashboardMetrics {
        avg_work_hours,
        avg_late_days: late.avg_late_days,
        avg_late_minutes: late.avg_late_minutes,
        on_time_percentage: on_time,
        late_percentage: 100.0 - on_time,
        absent_percentage,
        on_time_percentage_by_location: on_time_percentage_by_location(
            logs, employees, locations, start_date, end_date,
        ),
        on_time_percentage_by_date: on_time_percentage_by_date(logs, start_date, end_date),
        attendance_by_location: by_location,
    }
}
