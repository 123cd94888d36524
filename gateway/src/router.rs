//! Service Router
//!
//! Routes requests to the attendance service via InProcess calls.
//! This enables direct function calls without network overhead.

use std::sync::Arc;

use attendance_service::{
    AttendanceConfig, AttendanceService, InMemoryDirectory, InMemoryLogRepository,
};

/// Service router that manages InProcess service calls.
///
/// The in-memory repository and directory back development and tests; a
/// deployment wires real storage and directory services through the same
/// trait seams in `attendance-service`.
pub struct ServiceRouter {
    attendance_service: AttendanceService,
    directory: Arc<InMemoryDirectory>,
}

impl ServiceRouter {
    /// Create a new service router with in-memory backends.
    pub fn new() -> Self {
        Self::with_config(AttendanceConfig::default())
    }

    /// Create a new service router with the given service configuration.
    pub fn with_config(config: AttendanceConfig) -> Self {
        let directory = Arc::new(InMemoryDirectory::new());
        let attendance_service = AttendanceService::new(
            Arc::new(InMemoryLogRepository::new()),
            directory.clone(),
            directory.clone(),
            directory.clone(),
            config,
        );
        Self {
            attendance_service,
            directory,
        }
    }

    /// The attendance service handle for InProcess calls.
    pub fn attendance(&self) -> &AttendanceService {
        &self.attendance_service
    }

    /// The backing directory, for seeding employees, locations and
    /// schedules.
    pub fn directory(&self) -> &InMemoryDirectory {
        &self.directory
    }
}

impl Default for ServiceRouter {
    fn default() -> Self {
        Self::new()
    }
}
