//! Attendance service
//!
//! Business logic for geofence-gated punch tracking, timesheets and
//! dashboard metrics. Storage and directory lookups are injected through
//! their traits; everything here works against those seams.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::directory::{resolve_employee, EmployeeDirectory, LocationLookup, ScheduleLookup};
use crate::geofence::{self, OutOfRange};
use crate::metrics::{self, DashboardMetrics, SnapshotEntry};
use crate::models::{
    month_key, Coordinate, Employee, Location, MonthlyLog, PunchMode, ResolvedEmployee, Schedule,
};
use crate::punch::{self, PunchError};
use crate::repository::{LogRepository, RepositoryError};
use crate::timesheet::{self, ExportRow, TimesheetMode, TimesheetRow};

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AttendanceConfig {
    /// Bounded retries for punch writes that race on the same log.
    pub max_conflict_retries: u32,
    /// Report generation timeout in seconds.
    pub report_timeout_secs: u64,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: 3,
            report_timeout_secs: 30,
        }
    }
}

impl AttendanceConfig {
    /// Get the report timeout as a Duration.
    pub fn report_timeout(&self) -> Duration {
        Duration::from_secs(self.report_timeout_secs)
    }
}

/// Service errors.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("No schedule assigned yet")]
    NoSchedule,

    #[error("You are not scheduled for today")]
    NotScheduledToday,

    #[error(transparent)]
    Punch(#[from] PunchError),

    #[error(transparent)]
    OutOfRange(#[from] OutOfRange),

    #[error("Employee {0} does not exist")]
    EmployeeNotFound(String),

    #[error("Location {0} does not exist")]
    LocationNotFound(String),

    #[error("Start date must not be after end date")]
    InvalidRange,

    #[error("Punch conflicted with concurrent updates, please retry")]
    Conflict,

    #[error("Report generation timed out")]
    ReportTimeout,

    #[error("Repository error: {0}")]
    Repository(String),
}

impl ServiceError {
    fn repository(err: anyhow::Error) -> Self {
        Self::Repository(err.to_string())
    }
}

/// Current tracking state echoed to the caller after every punch.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingStatus {
    pub last_in: Option<DateTime<Utc>>,
    pub last_out: Option<DateTime<Utc>>,
    pub current_mode: PunchMode,
}

/// Timesheet request parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct TimesheetQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub mode: TimesheetMode,
    /// Employee name filter; empty matches everyone.
    #[serde(default)]
    pub search: String,
}

/// Timesheet response.
#[derive(Debug, Serialize)]
pub struct TimesheetResponse {
    pub timesheet: Vec<TimesheetRow>,
    pub total_docs: usize,
}

/// Dimension for scoping a dashboard query to chosen groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupingFilter {
    Location,
    Schedule,
}

/// Dashboard metrics request parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Employee name filter; empty matches everyone.
    #[serde(default)]
    pub search: String,
    /// Scope employees by membership in the listed locations or schedules.
    #[serde(default)]
    pub filter: Option<GroupingFilter>,
    /// Comma-separated ids for `filter`; empty disables the scoping.
    #[serde(default)]
    pub ids: String,
}

impl MetricsQuery {
    fn id_list(&self) -> Vec<&str> {
        self.ids
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .collect()
    }
}

/// Attendance service for punch tracking and reporting.
pub struct AttendanceService {
    repository: Arc<dyn LogRepository>,
    employees: Arc<dyn EmployeeDirectory>,
    locations: Arc<dyn LocationLookup>,
    schedules: Arc<dyn ScheduleLookup>,
    config: AttendanceConfig,
}

impl AttendanceService {
    /// Create a new attendance service over the given capabilities.
    pub fn new(
        repository: Arc<dyn LogRepository>,
        employees: Arc<dyn EmployeeDirectory>,
        locations: Arc<dyn LocationLookup>,
        schedules: Arc<dyn ScheduleLookup>,
        config: AttendanceConfig,
    ) -> Self {
        Self {
            repository,
            employees,
            locations,
            schedules,
            config,
        }
    }

    async fn require_employee(&self, employee_id: &str) -> Result<Employee, ServiceError> {
        self.employees
            .find_employee(employee_id)
            .await
            .map_err(ServiceError::repository)?
            .ok_or_else(|| ServiceError::EmployeeNotFound(employee_id.to_string()))
    }

    /// Geofence gate shared by clock-in and clock-out.
    async fn check_geofence(
        &self,
        employee: &Employee,
        reported: Coordinate,
    ) -> Result<Location, ServiceError> {
        let location_id = employee
            .location
            .as_deref()
            .ok_or_else(|| ServiceError::LocationNotFound("unassigned".to_string()))?;
        let location = self
            .locations
            .find_location(location_id)
            .await
            .map_err(ServiceError::repository)?
            .ok_or_else(|| ServiceError::LocationNotFound(location_id.to_string()))?;

        geofence::check(reported, location.coordinates, location.radius_meters)?;
        Ok(location)
    }

    async fn require_schedule(&self, employee: &Employee) -> Result<Schedule, ServiceError> {
        let schedule_id = employee.schedule.as_deref().ok_or(ServiceError::NoSchedule)?;
        self.schedules
            .find_schedule(schedule_id)
            .await
            .map_err(ServiceError::repository)?
            .ok_or(ServiceError::NoSchedule)
    }

    /// Clock an employee in at the reported coordinate.
    ///
    /// Concurrent punches against the same monthly log are serialized by
    /// the repository's version check; this loop retries the read-modify-
    /// write a bounded number of times before giving up.
    pub async fn clock_in(
        &self,
        employee_id: &str,
        reported: Coordinate,
        timestamp: DateTime<Utc>,
    ) -> Result<TrackingStatus, ServiceError> {
        let employee = self.require_employee(employee_id).await?;
        self.check_geofence(&employee, reported).await?;
        let schedule = self.require_schedule(&employee).await?;

        let date = timestamp.date_naive();
        let shift = *schedule
            .shift_for(date.weekday())
            .ok_or(ServiceError::NotScheduledToday)?;

        let month = month_key(date);
        for _attempt in 0..=self.config.max_conflict_retries {
            let existing = self
                .repository
                .find_by_employee_and_month(employee_id, &month)
                .await
                .map_err(ServiceError::repository)?;

            let result = match existing {
                Some(mut log) => {
                    punch::apply_clock_in(&mut log, date, timestamp, Some(&shift))?;
                    self.repository.update(&log).await
                }
                None => {
                    let mut log = MonthlyLog::new(employee_id, month.clone(), timestamp);
                    punch::apply_clock_in(&mut log, date, timestamp, Some(&shift))?;
                    self.repository.insert(&log).await
                }
            };

            match result {
                Ok(saved) => {
                    tracing::info!(employee = employee_id, month = %month, "clock-in recorded");
                    return Ok(TrackingStatus {
                        last_in: saved.last_in,
                        last_out: saved.last_out,
                        current_mode: PunchMode::Stop,
                    });
                }
                Err(err) if is_write_race(&err) => {
                    tracing::debug!(employee = employee_id, "punch write raced, retrying");
                    continue;
                }
                Err(err) => return Err(ServiceError::repository(err)),
            }
        }

        Err(ServiceError::Conflict)
    }

    /// Clock an employee out at the reported coordinate.
    pub async fn clock_out(
        &self,
        employee_id: &str,
        reported: Coordinate,
        timestamp: DateTime<Utc>,
    ) -> Result<TrackingStatus, ServiceError> {
        let employee = self.require_employee(employee_id).await?;
        self.check_geofence(&employee, reported).await?;

        let date = timestamp.date_naive();
        let month = month_key(date);
        for _attempt in 0..=self.config.max_conflict_retries {
            let mut log = self
                .repository
                .find_by_employee_and_month(employee_id, &month)
                .await
                .map_err(ServiceError::repository)?
                .ok_or(PunchError::NoOpenPunch)?;

            punch::apply_clock_out(&mut log, date, timestamp)?;

            match self.repository.update(&log).await {
                Ok(saved) => {
                    tracing::info!(employee = employee_id, month = %month, "clock-out recorded");
                    return Ok(TrackingStatus {
                        last_in: saved.last_in,
                        last_out: saved.last_out,
                        current_mode: PunchMode::Start,
                    });
                }
                Err(err) if is_write_race(&err) => {
                    tracing::debug!(employee = employee_id, "punch write raced, retrying");
                    continue;
                }
                Err(err) => return Err(ServiceError::repository(err)),
            }
        }

        Err(ServiceError::Conflict)
    }

    /// Current punch mode of an employee, as of `now`.
    pub async fn current_mode_at(
        &self,
        employee_id: &str,
        now: DateTime<Utc>,
    ) -> Result<TrackingStatus, ServiceError> {
        self.require_employee(employee_id).await?;

        let month = month_key(now.date_naive());
        let log = self
            .repository
            .find_by_employee_and_month(employee_id, &month)
            .await
            .map_err(ServiceError::repository)?;

        let (last_in, last_out) = log.map(|l| (l.last_in, l.last_out)).unwrap_or((None, None));
        Ok(TrackingStatus {
            last_in,
            last_out,
            current_mode: punch::current_mode(last_in, last_out),
        })
    }

    /// Current punch mode of an employee.
    pub async fn current_mode(&self, employee_id: &str) -> Result<TrackingStatus, ServiceError> {
        self.current_mode_at(employee_id, Utc::now()).await
    }

    /// Fetch and resolve the employees matching a search term.
    async fn resolved_employees(&self, search: &str) -> Result<Vec<ResolvedEmployee>, ServiceError> {
        let employees = self
            .employees
            .find_employees(search)
            .await
            .map_err(ServiceError::repository)?;

        let mut resolved = Vec::with_capacity(employees.len());
        for employee in &employees {
            resolved
                .push(resolve_employee(employee, self.locations.as_ref(), self.schedules.as_ref()).await);
        }
        Ok(resolved)
    }

    async fn logs_for(
        &self,
        employees: &[ResolvedEmployee],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<MonthlyLog>, ServiceError> {
        let ids: Vec<String> = employees.iter().map(|e| e.id.clone()).collect();
        self.repository
            .find_in_range(&ids, start_date, end_date)
            .await
            .map_err(ServiceError::repository)
    }

    /// Build the timesheet for a query, with `today` bounding the monthly
    /// fill.
    pub async fn timesheet_at(
        &self,
        query: &TimesheetQuery,
        today: NaiveDate,
    ) -> Result<TimesheetResponse, ServiceError> {
        if query.start_date > query.end_date {
            return Err(ServiceError::InvalidRange);
        }

        let report = async {
            let employees = self.resolved_employees(&query.search).await?;
            let logs = self.logs_for(&employees, query.start_date, query.end_date).await?;
            let rows = timesheet::build_timesheet(
                &logs,
                &employees,
                query.start_date,
                query.end_date,
                query.mode,
                today,
            );
            Ok(TimesheetResponse {
                total_docs: rows.len(),
                timesheet: rows,
            })
        };

        tokio::time::timeout(self.config.report_timeout(), report)
            .await
            .map_err(|_| ServiceError::ReportTimeout)?
    }

    /// Build the timesheet for a query.
    pub async fn timesheet(&self, query: &TimesheetQuery) -> Result<TimesheetResponse, ServiceError> {
        self.timesheet_at(query, Utc::now().date_naive()).await
    }

    /// Employees matching a metrics query's search term and grouping
    /// filter.
    async fn scoped_employees(
        &self,
        query: &MetricsQuery,
    ) -> Result<Vec<ResolvedEmployee>, ServiceError> {
        let employees = self.resolved_employees(&query.search).await?;
        Ok(scope_employees(employees, query.filter, &query.id_list()))
    }

    /// Raw interval rows for CSV/spreadsheet export.
    pub async fn export_rows(&self, query: &MetricsQuery) -> Result<Vec<ExportRow>, ServiceError> {
        if query.start_date > query.end_date {
            return Err(ServiceError::InvalidRange);
        }

        let report = async {
            let employees = self.scoped_employees(query).await?;
            let logs = self.logs_for(&employees, query.start_date, query.end_date).await?;
            Ok(timesheet::build_export_rows(
                &logs,
                &employees,
                query.start_date,
                query.end_date,
            ))
        };

        tokio::time::timeout(self.config.report_timeout(), report)
            .await
            .map_err(|_| ServiceError::ReportTimeout)?
    }

    /// Dashboard metrics for a query, with `today` bounding attendance
    /// counts.
    pub async fn dashboard_metrics_at(
        &self,
        query: &MetricsQuery,
        today: NaiveDate,
    ) -> Result<DashboardMetrics, ServiceError> {
        if query.start_date > query.end_date {
            return Err(ServiceError::InvalidRange);
        }

        let report = async {
            let employees = self.scoped_employees(query).await?;
            let locations = self
                .locations
                .all_locations()
                .await
                .map_err(ServiceError::repository)?;
            let logs = self.logs_for(&employees, query.start_date, query.end_date).await?;
            Ok(metrics::dashboard(
                &logs,
                &employees,
                &locations,
                query.start_date,
                query.end_date,
                today,
            ))
        };

        tokio::time::timeout(self.config.report_timeout(), report)
            .await
            .map_err(|_| ServiceError::ReportTimeout)?
    }

    /// Dashboard metrics for a query.
    pub async fn dashboard_metrics(&self, query: &MetricsQuery) -> Result<DashboardMetrics, ServiceError> {
        self.dashboard_metrics_at(query, Utc::now().date_naive()).await
    }

    /// Today-only attendance snapshot for every employee.
    pub async fn snapshot_at(&self, today: NaiveDate) -> Result<Vec<SnapshotEntry>, ServiceError> {
        let report = async {
            let employees = self.resolved_employees("").await?;
            let logs = self.logs_for(&employees, today, today).await?;
            Ok(metrics::snapshot(&logs, &employees, today))
        };

        tokio::time::timeout(self.config.report_timeout(), report)
            .await
            .map_err(|_| ServiceError::ReportTimeout)?
    }

    /// Today-only attendance snapshot for every employee.
    pub async fn snapshot(&self) -> Result<Vec<SnapshotEntry>, ServiceError> {
        self.snapshot_at(Utc::now().date_naive()).await
    }
}

/// Restrict employees to members of the listed locations or schedules.
///
/// No filter, or a filter without ids, keeps everyone; an unresolved
/// location/schedule reference never matches a group.
fn scope_employees(
    employees: Vec<ResolvedEmployee>,
    filter: Option<GroupingFilter>,
    ids: &[&str],
) -> Vec<ResolvedEmployee> {
    let Some(filter) = filter else {
        return employees;
    };
    if ids.is_empty() {
        return employees;
    }

    employees
        .into_iter()
        .filter(|employee| match filter {
            GroupingFilter::Location => employee
                .location
                .as_ref()
                .is_some_and(|location| ids.contains(&location.id.as_str())),
            GroupingFilter::Schedule => employee
                .schedule
                .as_ref()
                .is_some_and(|schedule| ids.contains(&schedule.id.as_str())),
        })
        .collect()
}

/// Whether a storage failure is a lost write race worth retrying.
fn is_write_race(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<RepositoryError>(),
        Some(RepositoryError::VersionConflict { .. } | RepositoryError::DuplicateMonth { .. })
    )
}
