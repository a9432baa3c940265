//! Core types and traits for availability modelling.
//!
//! An entity moves between Idle, Working, Breakdown and Maintenance. Calendar
//! maintenance, operating-hours maintenance and stochastic breakdowns decide
//! when it leaves service; a [`Plant`] owns every entity of one run and
//! dispatches the cooperative [`Task`]s the discrete-event executor resumes.

use serde::{Deserialize, Serialize};

pub type SimTime = f64;
pub type CycleIndex = usize;

/// Two instants closer than this are the same instant.
pub const TIME_TOLERANCE: SimTime = 1.0e-9;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub usize);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub mod breakdown;
pub mod calendar;
pub mod config;
pub mod dist;
pub mod entity;
pub mod error;
pub mod operating;
pub mod plant;
pub mod shared;
pub mod state;
pub mod task;
pub mod tracker;

pub use breakdown::BreakdownGenerator;
pub use calendar::{CalendarCycle, CalendarSchedule};
pub use config::{
    AvailabilityConfig, BreakdownConfig, BreakdownSources, CalendarMaintenanceConfig,
    OperatingHoursConfig,
};
pub use dist::ProbabilitySource;
pub use entity::{Entity, EntityBehavior, EntityStatus};
pub use error::{ConfigError, CoreError, LookupError, SchedulerInvariantViolation};
pub use operating::{OperatingHoursCycle, OperatingHoursSchedule};
pub use plant::Plant;
pub use shared::{MaintenanceRole, SharedMaintenanceGroup};
pub use state::{StateId, StateSet};
pub use task::{Process, Scheduler, Step, Task};
pub use tracker::StateTracker;
