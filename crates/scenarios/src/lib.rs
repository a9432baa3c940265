//! JSON scenario files: named distributions, machines with their availability
//! settings, and the run parameters needed to drive them.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use av_core::{
    AvailabilityConfig, BreakdownSources, ConfigError, Plant, ProbabilitySource, SimTime, StateId, StateSet,
};
use av_dists::DistSpec;
use av_runtime::Executor;
use serde::{Deserialize, Serialize};
use tracing::info;

pub mod machine;

pub use machine::{drive, HookCounts, Machine};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineSpec {
    pub name: String,
    #[serde(default = "default_true")]
    pub has_demand: bool,
    /// State the machine works in; defaults to `Working`.
    #[serde(default)]
    pub work_state: Option<String>,
    #[serde(flatten)]
    pub availability: AvailabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub name: String,
    pub seed: u64,
    pub horizon_hours: SimTime,
    pub poll_interval_hours: SimTime,
    /// Statistics are cleared once this much time has passed.
    pub warmup_hours: SimTime,
    /// Extra states that count as working time.
    pub working_states: Vec<String>,
    pub distributions: BTreeMap<String, DistSpec>,
    pub machines: Vec<MachineSpec>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            name: "scenario".to_string(),
            seed: 1,
            horizon_hours: 8760.0,
            poll_interval_hours: 1.0,
            warmup_hours: 0.0,
            working_states: Vec::new(),
            distributions: BTreeMap::new(),
            machines: Vec::new(),
        }
    }
}

impl ScenarioConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).context("parsing scenario")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("loading {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.horizon_hours > 0.0, "horizon_hours must be positive");
        ensure!(self.poll_interval_hours > 0.0, "poll_interval_hours must be positive");
        ensure!(
            self.warmup_hours >= 0.0 && self.warmup_hours < self.horizon_hours,
            "warmup_hours must lie within [0, horizon_hours)"
        );
        Ok(())
    }

    pub fn states(&self) -> StateSet {
        StateSet::with_working_substates(&self.working_states)
    }

    /// Each machine draws from its own stream so adding a machine does not
    /// perturb the others.
    fn source(&self, machine: &str, index: usize, name: &Option<String>, salt: u64) -> Result<Option<Box<dyn ProbabilitySource>>> {
        let Some(name) = name else { return Ok(None) };
        let spec = self
            .distributions
            .get(name)
            .ok_or_else(|| ConfigError::UnknownDistribution {
                entity: machine.to_string(),
                name: name.clone(),
            })?;
        let seed = self
            .seed
            .wrapping_mul(0x9e37_79b9_7f4a_7c15)
            .wrapping_add((index as u64) << 1 | salt);
        let source = spec
            .boxed(seed)
            .with_context(|| format!("{machine}: distribution `{name}`"))?;
        Ok(Some(source))
    }

    pub fn build_plant(&self) -> Result<Plant<Machine>> {
        let states = self.states();
        let mut plant = Plant::new(states);
        for (index, spec) in self.machines.iter().enumerate() {
            let breakdowns = &spec.availability.breakdowns;
            let sources = BreakdownSources {
                duration: self.source(&spec.name, index, &breakdowns.duration_distribution, 0)?,
                inter_arrival: self.source(&spec.name, index, &breakdowns.inter_arrival_distribution, 1)?,
            };
            let work_state = match &spec.work_state {
                Some(name) => plant.states().lookup(name)?,
                None => StateId::WORKING,
            };
            ensure!(
                plant.states().is_working(work_state),
                "{}: work_state `{}` is not a working state",
                spec.name,
                spec.work_state.as_deref().unwrap_or("Working")
            );
            let machine = Machine::new(spec.has_demand, work_state);
            plant.add_entity(&spec.name, &spec.availability, sources, machine)?;
        }
        plant.resolve_shared_maintenance()?;
        info!(scenario = %self.name, machines = plant.len(), groups = plant.groups().len(), "plant built");
        Ok(plant)
    }

    /// Initializes `plant` and installs the polling driver and the warm-up reset.
    pub fn install(&self, plant: &mut Plant<Machine>, exec: &mut Executor<Plant<Machine>>) -> Result<()> {
        plant.initialize(exec.scheduler())?;
        exec.every(0.0, self.poll_interval_hours, drive)?;
        if self.warmup_hours > 0.0 {
            let mut done = false;
            exec.every(self.warmup_hours, self.horizon_hours, move |plant: &mut Plant<Machine>, sched| {
                if !done {
                    plant.clear_statistics(sched.now());
                    info!(now = sched.now(), "statistics cleared after warm-up");
                    done = true;
                }
                Ok(())
            })?;
        }
        Ok(())
    }
}

/// Occupancy summary of one machine.
#[derive(Debug, Clone, Serialize)]
pub struct MachineReport {
    pub name: String,
    pub percent_by_state: BTreeMap<String, f64>,
    pub commitment: f64,
    pub working_hours: f64,
    pub hooks: HookCounts,
}

pub fn report(plant: &Plant<Machine>, now: SimTime) -> Vec<MachineReport> {
    plant
        .entities()
        .map(|e| MachineReport {
            name: e.name().to_string(),
            percent_by_state: e
                .states()
                .names()
                .map(|s| (s.to_string(), e.percent_of_time(s, now).unwrap_or(0.0)))
                .collect(),
            commitment: e.commitment(now),
            working_hours: e.working_hours(now),
            hooks: e.behavior().hooks().clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use av_runtime::MetricsRegistry;

    const PRESS_LINE: &str = include_str!("../data/press_line.json");

    #[test]
    fn bundled_scenario_parses_and_builds() {
        let config = ScenarioConfig::from_json(PRESS_LINE).unwrap();
        assert_eq!(config.machines.len(), 3);
        let plant = config.build_plant().unwrap();
        assert_eq!(plant.groups().len(), 1);
        assert!(plant.states().lookup("Loading").is_ok());
    }

    #[test]
    fn unknown_distribution_is_a_config_error() {
        let text = r#"{
            "machines": [
                { "name": "m1", "breakdowns": { "availability": 0.9, "duration_distribution": "missing" } }
            ]
        }"#;
        let err = ScenarioConfig::from_json(text).unwrap().build_plant().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::UnknownDistribution { .. })
        ));
    }

    #[test]
    fn work_state_must_be_a_working_state() {
        let text = r#"{ "machines": [ { "name": "m1", "work_state": "Maintenance" } ] }"#;
        assert!(ScenarioConfig::from_json(text).unwrap().build_plant().is_err());
    }

    #[test]
    fn rejects_bad_run_parameters() {
        assert!(ScenarioConfig::from_json(r#"{ "horizon_hours": 0 }"#).is_err());
        assert!(ScenarioConfig::from_json(r#"{ "poll_interval_hours": -1 }"#).is_err());
    }

    #[test]
    fn machine_without_demand_stays_idle() {
        let text = r#"{
            "horizon_hours": 100,
            "machines": [ { "name": "spare", "has_demand": false }, { "name": "busy" } ]
        }"#;
        let config = ScenarioConfig::from_json(text).unwrap();
        let mut plant = config.build_plant().unwrap();
        let mut exec = Executor::new(MetricsRegistry::default());
        config.install(&mut plant, &mut exec).unwrap();
        exec.run_until(&mut plant, config.horizon_hours).unwrap();

        let rows = report(&plant, exec.now());
        assert_eq!(rows[0].percent_by_state["Idle"], 100.0);
        assert_eq!(rows[0].commitment, 0.0);
        assert_eq!(rows[1].percent_by_state["Working"], 100.0);
        assert_eq!(rows[1].working_hours, 100.0);
    }

    #[test]
    fn warmup_clears_statistics_once() {
        let text = r#"{
            "horizon_hours": 100,
            "warmup_hours": 40,
            "machines": [ { "name": "m1" } ]
        }"#;
        let config = ScenarioConfig::from_json(text).unwrap();
        let mut plant = config.build_plant().unwrap();
        let mut exec = Executor::new(MetricsRegistry::default());
        config.install(&mut plant, &mut exec).unwrap();
        exec.run_until(&mut plant, 100.0).unwrap();
        let m = plant.entities().next().unwrap();
        assert_eq!(m.working_hours(100.0), 60.0);
        assert_eq!(m.tracker().last_statistics_reset(), 40.0);
    }
}
