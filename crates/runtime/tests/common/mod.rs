#![allow(dead_code)]

use anyhow::Result;
use av_core::{
    AvailabilityConfig, BreakdownSources, CalendarMaintenanceConfig, EntityBehavior, EntityId, EntityStatus,
    OperatingHoursConfig, Plant, Scheduler, StateId, StateSet,
};
use av_runtime::{Executor, MetricsRegistry};

/// A machine that works whenever it is idle and not held busy by the test.
#[derive(Debug, Default)]
pub struct Machine {
    pub busy: bool,
    pub pre_maintenance: u32,
    pub restarts: u32,
    pub releases: u32,
}

impl EntityBehavior for Machine {
    fn is_available(&self, status: &EntityStatus) -> bool {
        !self.busy && !status.is_in_service()
    }

    fn do_pre_maintenance(&mut self) {
        self.pre_maintenance += 1;
    }

    fn restart(&mut self) {
        self.restarts += 1;
    }

    fn release_equipment(&mut self) {
        self.releases += 1;
    }
}

/// Polls every entity, then puts idle machines back to work.
pub fn drive(plant: &mut Plant<Machine>, sched: &mut dyn Scheduler) -> Result<()> {
    let ids: Vec<EntityId> = plant.entities().map(|e| e.id()).collect();
    for id in ids {
        plant.poll(id, sched)?;
        let now = sched.now();
        let machine = plant.entity_mut(id)?;
        if !machine.is_in_service() && !machine.behavior().busy && machine.current_state() == Some("Idle") {
            machine.set_state(StateId::WORKING, now)?;
        }
    }
    Ok(())
}

pub fn calendar(first: &[f64], interval: &[f64], duration: &[f64]) -> AvailabilityConfig {
    AvailabilityConfig {
        maintenance: CalendarMaintenanceConfig {
            first_times: first.to_vec(),
            intervals: interval.to_vec(),
            durations: duration.to_vec(),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn operating_hours(first: &[f64], interval: &[f64], duration: &[f64]) -> AvailabilityConfig {
    AvailabilityConfig {
        operating_hours: OperatingHoursConfig {
            first_hours: first.to_vec(),
            intervals: interval.to_vec(),
            durations: duration.to_vec(),
        },
        ..Default::default()
    }
}

pub struct Run {
    pub plant: Plant<Machine>,
    pub exec: Executor<Plant<Machine>>,
}

impl Run {
    /// Initializes `plant` and drives it every `poll` hours from time zero.
    pub fn start(mut plant: Plant<Machine>, poll: f64) -> Result<Self> {
        let mut exec = Executor::new(MetricsRegistry::default());
        plant.initialize(exec.scheduler())?;
        exec.every(0.0, poll, drive)?;
        Ok(Self { plant, exec })
    }

    pub fn single(config: AvailabilityConfig, sources: BreakdownSources, poll: f64) -> Result<(Self, EntityId)> {
        let mut plant = Plant::new(StateSet::standard());
        let id = plant.add_entity("m0", &config, sources, Machine::default())?;
        Ok((Self::start(plant, poll)?, id))
    }

    pub fn until(&mut self, horizon: f64) -> Result<()> {
        self.exec.run_until(&mut self.plant, horizon)
    }

    pub fn now(&self) -> f64 {
        self.exec.now()
    }
}
