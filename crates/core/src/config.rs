//! Per-entity availability configuration and its load-time validation.

use serde::{Deserialize, Serialize};

use crate::calendar::CalendarCycle;
use crate::dist::ProbabilitySource;
use crate::error::ConfigError;
use crate::operating::OperatingHoursCycle;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CalendarMaintenanceConfig {
    pub first_times: Vec<f64>,
    pub intervals: Vec<f64>,
    pub durations: Vec<f64>,
    pub skip_if_overlap: Vec<bool>,
    pub force: Option<Vec<bool>>,
    pub release_equipment: Option<Vec<bool>>,
    pub defer_limits: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OperatingHoursConfig {
    pub first_hours: Vec<f64>,
    pub intervals: Vec<f64>,
    pub durations: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BreakdownConfig {
    pub availability: f64,
    pub duration_distribution: Option<String>,
    pub inter_arrival_distribution: Option<String>,
    pub downtime_to_release_equipment: f64,
}

impl Default for BreakdownConfig {
    fn default() -> Self {
        Self {
            availability: 1.0,
            duration_distribution: None,
            inter_arrival_distribution: None,
            downtime_to_release_equipment: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AvailabilityConfig {
    pub maintenance: CalendarMaintenanceConfig,
    pub operating_hours: OperatingHoursConfig,
    pub breakdowns: BreakdownConfig,
    /// Names of the entities that share this entity's maintenance schedule.
    pub shared_maintenance: Vec<String>,
}

/// Resolved breakdown distributions for one entity.
#[derive(Debug, Default)]
pub struct BreakdownSources {
    pub duration: Option<Box<dyn ProbabilitySource>>,
    pub inter_arrival: Option<Box<dyn ProbabilitySource>>,
}

fn matching(entity: &str, first: &'static str, a: usize, second: &'static str, b: usize) -> Result<(), ConfigError> {
    if a != b {
        return Err(ConfigError::LengthMismatch {
            entity: entity.to_string(),
            first,
            second,
            expected: a,
            found: b,
        });
    }
    Ok(())
}

fn non_negative(entity: &str, key: &'static str, values: &[f64]) -> Result<(), ConfigError> {
    match values.iter().enumerate().find(|(_, v)| !(**v >= 0.0)) {
        Some((cycle, &value)) => Err(ConfigError::Negative {
            entity: entity.to_string(),
            key,
            cycle,
            value,
        }),
        None => Ok(()),
    }
}

fn positive(entity: &str, key: &'static str, values: &[f64]) -> Result<(), ConfigError> {
    match values.iter().enumerate().find(|(_, v)| !(**v > 0.0)) {
        Some((cycle, &value)) => Err(ConfigError::NonPositive {
            entity: entity.to_string(),
            key,
            cycle,
            value,
        }),
        None => Ok(()),
    }
}

impl CalendarMaintenanceConfig {
    pub fn len(&self) -> usize {
        self.first_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first_times.is_empty()
    }

    pub fn validate(&self, entity: &str) -> Result<(), ConfigError> {
        let n = self.first_times.len();
        matching(entity, "FirstMaintenanceTimes", n, "MaintenanceIntervals", self.intervals.len())?;
        matching(entity, "FirstMaintenanceTimes", n, "MaintenanceDurations", self.durations.len())?;
        if !self.skip_if_overlap.is_empty() {
            matching(entity, "FirstMaintenanceTimes", n, "SkipMaintenanceIfOverlap", self.skip_if_overlap.len())?;
        }
        if let Some(force) = &self.force {
            matching(entity, "FirstMaintenanceTimes", n, "ForceMaintenance", force.len())?;
        }
        if let Some(release) = &self.release_equipment {
            matching(entity, "FirstMaintenanceTimes", n, "ReleaseEquipment", release.len())?;
        }
        if let Some(limits) = &self.defer_limits {
            matching(entity, "FirstMaintenanceTimes", n, "DeferMaintenanceLimit", limits.len())?;
            non_negative(entity, "DeferMaintenanceLimit", limits)?;
        }

        non_negative(entity, "FirstMaintenanceTimes", &self.first_times)?;
        non_negative(entity, "MaintenanceDurations", &self.durations)?;
        positive(entity, "MaintenanceIntervals", &self.intervals)?;

        for (cycle, (&interval, &duration)) in self.intervals.iter().zip(&self.durations).enumerate() {
            if interval < duration {
                return Err(ConfigError::IntervalShorterThanDuration {
                    entity: entity.to_string(),
                    cycle,
                    interval,
                    duration,
                });
            }
        }
        Ok(())
    }

    /// Assumes [`Self::validate`] passed.
    pub fn cycles(&self) -> Vec<CalendarCycle> {
        (0..self.first_times.len())
            .map(|i| CalendarCycle {
                first_due: self.first_times[i],
                interval: self.intervals[i],
                duration: self.durations[i],
                skip_if_overlap: self.skip_if_overlap.get(i).copied().unwrap_or(false),
                force: self.force.as_ref().and_then(|f| f.get(i).copied()).unwrap_or(false),
                release_equipment: self
                    .release_equipment
                    .as_ref()
                    .and_then(|r| r.get(i).copied())
                    .unwrap_or(true),
                defer_limit: self
                    .defer_limits
                    .as_ref()
                    .and_then(|d| d.get(i).copied())
                    .unwrap_or(0.0),
            })
            .collect()
    }
}

impl OperatingHoursConfig {
    pub fn validate(&self, entity: &str) -> Result<(), ConfigError> {
        let n = self.first_hours.len();
        matching(entity, "FirstMaintenanceOperatingHours", n, "MaintenanceOperatingHoursIntervals", self.intervals.len())?;
        matching(entity, "FirstMaintenanceOperatingHours", n, "MaintenanceOperatingHoursDurations", self.durations.len())?;
        non_negative(entity, "FirstMaintenanceOperatingHours", &self.first_hours)?;
        positive(entity, "MaintenanceOperatingHoursIntervals", &self.intervals)?;
        positive(entity, "MaintenanceOperatingHoursDurations", &self.durations)?;
        Ok(())
    }

    pub fn cycles(&self) -> Vec<OperatingHoursCycle> {
        (0..self.first_hours.len())
            .map(|i| OperatingHoursCycle {
                first_due_hours: self.first_hours[i],
                interval_hours: self.intervals[i],
                duration: self.durations[i],
            })
            .collect()
    }
}

impl BreakdownConfig {
    pub fn validate(&self, entity: &str, sources: &BreakdownSources) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.availability) {
            return Err(ConfigError::AvailabilityOutOfRange {
                entity: entity.to_string(),
                value: self.availability,
            });
        }
        if self.availability < 1.0 && sources.duration.is_none() {
            return Err(ConfigError::MissingDurationDistribution {
                entity: entity.to_string(),
            });
        }
        if sources.inter_arrival.is_some() && sources.duration.is_none() {
            return Err(ConfigError::InterArrivalWithoutDuration {
                entity: entity.to_string(),
            });
        }
        if !(self.downtime_to_release_equipment >= 0.0) {
            return Err(ConfigError::Negative {
                entity: entity.to_string(),
                key: "DowntimeToReleaseEquipment",
                cycle: 0,
                value: self.downtime_to_release_equipment,
            });
        }
        for (key, source) in [
            ("DowntimeDurationDistribution", &sources.duration),
            ("DowntimeIATDistribution", &sources.inter_arrival),
        ] {
            if let Some(dist) = source {
                let minimum = dist.minimum_value();
                if minimum < 0.0 {
                    return Err(ConfigError::NegativeSupport {
                        entity: entity.to_string(),
                        key,
                        minimum,
                    });
                }
            }
        }
        Ok(())
    }
}

impl AvailabilityConfig {
    /// Every load-time check for one entity. Group membership is checked by the plant.
    pub fn validate(&self, entity: &str, sources: &BreakdownSources) -> Result<(), ConfigError> {
        self.maintenance.validate(entity)?;
        self.operating_hours.validate(entity)?;
        self.breakdowns.validate(entity, sources)?;
        if !self.shared_maintenance.is_empty() && self.maintenance.is_empty() {
            return Err(ConfigError::MasterWithoutCycles {
                entity: entity.to_string(),
            });
        }
        Ok(())
    }
}
