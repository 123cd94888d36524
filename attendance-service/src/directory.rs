//! Read-only lookups supplied by the surrounding platform.
//!
//! Employee, location and schedule CRUD live in other services; the
//! attendance service only resolves references through these traits.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Employee, Location, ResolvedEmployee, Schedule};

/// Employee directory lookup.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// Find an employee by id.
    async fn find_employee(&self, employee_id: &str) -> Result<Option<Employee>>;

    /// Find employees whose name matches the search term (case-insensitive
    /// substring). An empty term matches everyone.
    async fn find_employees(&self, search: &str) -> Result<Vec<Employee>>;
}

/// Location lookup.
#[async_trait]
pub trait LocationLookup: Send + Sync {
    /// Find a location by id.
    async fn find_location(&self, location_id: &str) -> Result<Option<Location>>;

    /// All known locations, for breakdowns that must list every location.
    async fn all_locations(&self) -> Result<Vec<Location>>;
}

/// Schedule lookup.
#[async_trait]
pub trait ScheduleLookup: Send + Sync {
    /// Find a schedule by id.
    async fn find_schedule(&self, schedule_id: &str) -> Result<Option<Schedule>>;
}

/// Resolve an employee's location and schedule references.
///
/// Broken references are logged and left unresolved instead of failing,
/// so one bad employee record cannot take down a whole report.
pub async fn resolve_employee(
    employee: &Employee,
    locations: &dyn LocationLookup,
    schedules: &dyn ScheduleLookup,
) -> ResolvedEmployee {
    let location = match &employee.location {
        Some(id) => match locations.find_location(id).await {
            Ok(location) => {
                if location.is_none() {
                    tracing::warn!(employee = %employee.id, location = %id, "location not found");
                }
                location
            }
            Err(err) => {
                tracing::warn!(employee = %employee.id, error = %err, "location lookup failed");
                None
            }
        },
        None => None,
    };

    let schedule = match &employee.schedule {
        Some(id) => match schedules.find_schedule(id).await {
            Ok(schedule) => {
                if schedule.is_none() {
                    tracing::warn!(employee = %employee.id, schedule = %id, "schedule not found");
                }
                schedule
            }
            Err(err) => {
                tracing::warn!(employee = %employee.id, error = %err, "schedule lookup failed");
                None
            }
        },
        None => None,
    };

    ResolvedEmployee {
        id: employee.id.clone(),
        name: employee.name.clone(),
        location,
        schedule,
    }
}

/// In-memory directory for testing and development.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    employees: std::sync::RwLock<Vec<Employee>>,
    locations: std::sync::RwLock<Vec<Location>>,
    schedules: std::sync::RwLock<Vec<Schedule>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an employee record.
    pub fn add_employee(&self, employee: Employee) {
        self.employees.write().unwrap().push(employee);
    }

    /// Register a location.
    pub fn add_location(&self, location: Location) {
        self.locations.write().unwrap().push(location);
    }

    /// Register a schedule.
    pub fn add_schedule(&self, schedule: Schedule) {
        self.schedules.write().unwrap().push(schedule);
    }
}

#[async_trait]
impl EmployeeDirectory for InMemoryDirectory {
    async fn find_employee(&self, employee_id: &str) -> Result<Option<Employee>> {
        let employees = self.employees.read().unwrap();
        Ok(employees.iter().find(|e| e.id == employee_id).cloned())
    }

    async fn find_employees(&self, search: &str) -> Result<Vec<Employee>> {
        let needle = search.to_lowercase();
        let employees = self.employees.read().unwrap();
        Ok(employees
            .iter()
            .filter(|e| e.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LocationLookup for InMemoryDirectory {
    async fn find_location(&self, location_id: &str) -> Result<Option<Location>> {
        let locations = self.locations.read().unwrap();
        Ok(locations.iter().find(|l| l.id == location_id).cloned())
    }

    async fn all_locations(&self) -> Result<Vec<Location>> {
        Ok(self.locations.read().unwrap().clone())
    }
}

#[async_trait]
impl ScheduleLookup for InMemoryDirectory {
    async fn find_schedule(&self, schedule_id: &str) -> Result<Option<Schedule>> {
        let schedules = self.schedules.read().unwrap();
        Ok(schedules.iter().find(|s| s.id == schedule_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinate;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_find_employees_by_search() {
        let directory = InMemoryDirectory::new();
        directory.add_employee(Employee {
            id: "EMP001".to_string(),
            name: "Alice Harper".to_string(),
            location: None,
            schedule: None,
        });
        directory.add_employee(Employee {
            id: "EMP002".to_string(),
            name: "Bob Stone".to_string(),
            location: None,
            schedule: None,
        });

        let matches = directory.find_employees("harp").await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "EMP001");

        let everyone = directory.find_employees("").await.unwrap();
        assert_eq!(everyone.len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_employee_tolerates_missing_references() {
        let directory = InMemoryDirectory::new();
        directory.add_location(Location {
            id: "LOC1".to_string(),
            name: "Main Shop".to_string(),
            coordinates: Coordinate { lat: 0.0, long: 0.0 },
            radius_meters: 50.0,
        });

        let employee = Employee {
            id: "EMP001".to_string(),
            name: "Alice".to_string(),
            location: Some("LOC1".to_string()),
            schedule: Some("MISSING".to_string()),
        };

        let resolved = resolve_employee(&employee, &directory, &directory).await;
        assert!(resolved.location.is_some());
        assert!(resolved.schedule.is_none());
    }

    #[tokio::test]
    async fn test_find_schedule() {
        let directory = InMemoryDirectory::new();
        directory.add_schedule(Schedule {
            id: "SCH1".to_string(),
            title: "Weekday".to_string(),
            shift_times: HashMap::new(),
        });

        assert!(directory.find_schedule("SCH1").await.unwrap().is_some());
        assert!(directory.find_schedule("SCH2").await.unwrap().is_none());
    }
}
