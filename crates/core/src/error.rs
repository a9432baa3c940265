use crate::{CycleIndex, EntityId, SimTime};

/// Problems found while validating an entity's configuration. The run does not start.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{entity}: {first} has {expected} entries but {second} has {found}")]
    LengthMismatch {
        entity: String,
        first: &'static str,
        second: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{entity}: MaintenanceInterval should be greater than MaintenanceDuration for cycle {cycle} ({interval} < {duration})")]
    IntervalShorterThanDuration {
        entity: String,
        cycle: CycleIndex,
        interval: SimTime,
        duration: SimTime,
    },
    #[error("{entity}: {key}[{cycle}] must be positive, got {value}")]
    NonPositive {
        entity: String,
        key: &'static str,
        cycle: CycleIndex,
        value: f64,
    },
    #[error("{entity}: {key}[{cycle}] must not be negative, got {value}")]
    Negative {
        entity: String,
        key: &'static str,
        cycle: CycleIndex,
        value: f64,
    },
    #[error("{entity}: availability must lie within [0, 1], got {value}")]
    AvailabilityOutOfRange { entity: String, value: f64 },
    #[error("{entity}: when availability is less than one a downtime duration distribution is required")]
    MissingDurationDistribution { entity: String },
    #[error("{entity}: an inter-arrival distribution requires a downtime duration distribution")]
    InterArrivalWithoutDuration { entity: String },
    #[error("{entity}: {key} cannot allow negative values (minimum {minimum})")]
    NegativeSupport {
        entity: String,
        key: &'static str,
        minimum: f64,
    },
    #[error("{entity}: unknown distribution `{name}`")]
    UnknownDistribution { entity: String, name: String },
    #[error("{entity}: unknown shared-maintenance member `{member}`")]
    UnknownMember { entity: String, member: String },
    #[error("{entity}: a shared-maintenance member cannot define its own maintenance cycles")]
    MemberDefinesCycles { entity: String },
    #[error("{entity}: already belongs to the shared-maintenance group of {master}")]
    AlreadyShared { entity: String, master: String },
    #[error("{entity}: a shared-maintenance master needs at least one maintenance cycle")]
    MasterWithoutCycles { entity: String },
    #[error("{entity}: an entity with this name already exists")]
    DuplicateEntity { entity: String },
}

/// A defect in the scheduling logic itself. Fatal for the run.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SchedulerInvariantViolation {
    #[error("{entity}: maintenance pending should not be negative for cycle {cycle} (observed {observed})")]
    NegativeBacklog {
        entity: String,
        cycle: CycleIndex,
        observed: i64,
    },
    #[error("{entity}: present state index {index} does not exist in hours per state (len {len})")]
    InvalidState {
        entity: String,
        index: usize,
        len: usize,
    },
    #[error("{entity}: no maintenance cycle {cycle} is defined")]
    UnknownCycle { entity: String, cycle: CycleIndex },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("specified state `{name}` was not found in the state list")]
    UnknownState { name: String },
    #[error("no entity {id} in this plant")]
    UnknownEntity { id: EntityId },
    #[error("no entity named `{name}` in this plant")]
    UnknownEntityName { name: String },
}

#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Invariant(#[from] SchedulerInvariantViolation),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
