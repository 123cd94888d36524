//! Monthly log repository.
//!
//! Storage operations for per-employee, per-month punch logs. The trait is
//! the seam for real storage backends; the in-memory implementation backs
//! tests and development.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::MonthlyLog;

/// Repository errors.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Log not found for employee {employee_id} in month {month}")]
    NotFound { employee_id: String, month: String },

    #[error("Log already exists for employee {employee_id} in month {month}")]
    DuplicateMonth { employee_id: String, month: String },

    #[error("Version conflict for employee {employee_id} in month {month}")]
    VersionConflict { employee_id: String, month: String },

    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Monthly log repository.
///
/// At most one log exists per (employee, month); `insert` enforces the
/// uniqueness so a racing first-punch-of-month loser retries as an update.
/// `update` is a compare-and-swap on the log's version field, which
/// serializes concurrent writers to the same employee-day.
#[async_trait]
pub trait LogRepository: Send + Sync {
    /// Find the log for an employee and month bucket.
    async fn find_by_employee_and_month(
        &self,
        employee_id: &str,
        month: &str,
    ) -> Result<Option<MonthlyLog>>;

    /// Insert a new monthly log. Fails with `DuplicateMonth` if one
    /// already exists for the (employee, month) pair.
    async fn insert(&self, log: &MonthlyLog) -> Result<MonthlyLog>;

    /// Update an existing log if its version still matches; the stored
    /// version is bumped on success. Fails with `VersionConflict` when
    /// another writer got there first.
    async fn update(&self, log: &MonthlyLog) -> Result<MonthlyLog>;

    /// All logs of the given employees whose activity touches the date
    /// window. Callers trim partial-month boundary days themselves.
    async fn find_in_range(
        &self,
        employee_ids: &[String],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<MonthlyLog>>;
}

/// In-memory repository for testing and development.
#[derive(Debug, Default)]
pub struct InMemoryLogRepository {
    logs: std::sync::RwLock<Vec<MonthlyLog>>,
}

impl InMemoryLogRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LogRepository for InMemoryLogRepository {
    async fn find_by_employee_and_month(
        &self,
        employee_id: &str,
        month: &str,
    ) -> Result<Option<MonthlyLog>> {
        let logs = self.logs.read().unwrap();
        Ok(logs
            .iter()
            .find(|l| l.employee_id == employee_id && l.month == month)
            .cloned())
    }

    async fn insert(&self, log: &MonthlyLog) -> Result<MonthlyLog> {
        let mut logs = self.logs.write().unwrap();
        if logs
            .iter()
            .any(|l| l.employee_id == log.employee_id && l.month == log.month)
        {
            return Err(RepositoryError::DuplicateMonth {
                employee_id: log.employee_id.clone(),
                month: log.month.clone(),
            }
            .into());
        }
        let mut stored = log.clone();
        stored.version = 1;
        logs.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, log: &MonthlyLog) -> Result<MonthlyLog> {
        let mut logs = self.logs.write().unwrap();
        let existing = logs
            .iter_mut()
            .find(|l| l.employee_id == log.employee_id && l.month == log.month)
            .ok_or_else(|| RepositoryError::NotFound {
                employee_id: log.employee_id.clone(),
                month: log.month.clone(),
            })?;

        if existing.version != log.version {
            return Err(RepositoryError::VersionConflict {
                employee_id: log.employee_id.clone(),
                month: log.month.clone(),
            }
            .into());
        }

        let mut updated = log.clone();
        updated.version += 1;
        *existing = updated.clone();
        Ok(updated)
    }

    async fn find_in_range(
        &self,
        employee_ids: &[String],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<MonthlyLog>> {
        let logs = self.logs.read().unwrap();
        Ok(logs
            .iter()
            .filter(|l| {
                employee_ids.iter().any(|id| *id == l.employee_id)
                    && l.days.keys().any(|d| *d >= start_date && *d <= end_date)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{month_key, LogInterval};
    use chrono::{TimeZone, Utc};

    fn sample_log(employee_id: &str, y: i32, m: u32, d: u32) -> MonthlyLog {
        let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        let now = Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap();
        let mut log = MonthlyLog::new(employee_id, month_key(date), now);
        log.append_interval(date, LogInterval::open(now));
        log
    }

    #[tokio::test]
    async fn test_insert_enforces_month_uniqueness() {
        let repo = InMemoryLogRepository::new();
        let log = sample_log("EMP001", 2024, 1, 15);

        repo.insert(&log).await.unwrap();
        let err = repo.insert(&log).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RepositoryError>(),
            Some(RepositoryError::DuplicateMonth { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_detects_version_conflict() {
        let repo = InMemoryLogRepository::new();
        let log = sample_log("EMP001", 2024, 1, 15);

        let stored = repo.insert(&log).await.unwrap();
        assert_eq!(stored.version, 1);

        // First writer wins and bumps the version.
        let updated = repo.update(&stored).await.unwrap();
        assert_eq!(updated.version, 2);

        // Second writer still holds version 1 and must conflict.
        let err = repo.update(&stored).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RepositoryError>(),
            Some(RepositoryError::VersionConflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_punches_around_midnight_land_in_separate_months() {
        let repo = InMemoryLogRepository::new();
        repo.insert(&sample_log("EMP001", 2024, 1, 31)).await.unwrap();
        repo.insert(&sample_log("EMP001", 2024, 2, 1)).await.unwrap();

        let january = repo
            .find_by_employee_and_month("EMP001", "1-2024")
            .await
            .unwrap()
            .unwrap();
        let february = repo
            .find_by_employee_and_month("EMP001", "2-2024")
            .await
            .unwrap()
            .unwrap();
        assert_ne!(january.month, february.month);
    }

    #[tokio::test]
    async fn test_find_in_range_spans_months() {
        let repo = InMemoryLogRepository::new();
        repo.insert(&sample_log("EMP001", 2024, 1, 15)).await.unwrap();
        repo.insert(&sample_log("EMP001", 2024, 2, 15)).await.unwrap();
        repo.insert(&sample_log("EMP002", 2024, 1, 15)).await.unwrap();

        let ids = vec!["EMP001".to_string()];
        let logs = repo
            .find_in_range(
                &ids,
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(logs.len(), 2);

        let logs = repo
            .find_in_range(
                &ids,
                NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].month, "2-2024");
    }
}
