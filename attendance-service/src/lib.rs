//! Attendance Service
//!
//! This crate provides geofence-gated punch tracking, monthly log storage,
//! timesheet aggregation and attendance metrics. It exposes its operations
//! for InProcess calls from the gateway.

pub mod directory;
pub mod geofence;
pub mod metrics;
pub mod models;
pub mod punch;
pub mod repository;
pub mod service;
pub mod timesheet;

pub use directory::{EmployeeDirectory, InMemoryDirectory, LocationLookup, ScheduleLookup};
pub use models::{Coordinate, Employee, Location, LogInterval, MonthlyLog, PunchMode, Schedule};
pub use repository::{InMemoryLogRepository, LogRepository};
pub use service::{AttendanceConfig, AttendanceService, GroupingFilter, ServiceError};
pub use timesheet::{TimesheetMode, TimesheetRow};
