//! A generic machine: available whenever it is not in service, and back at
//! work after every breakdown or maintenance as long as it has demand.

use anyhow::Result;
use av_core::{EntityBehavior, EntityId, EntityStatus, Plant, Scheduler, StateId};
use serde::Serialize;
use tracing::trace;

#[derive(Debug, Clone, Default, Serialize)]
pub struct HookCounts {
    pub pre_maintenance: u64,
    pub restarts: u64,
    pub equipment_releases: u64,
}

#[derive(Debug, Clone)]
pub struct Machine {
    has_demand: bool,
    work_state: StateId,
    hooks: HookCounts,
}

impl Machine {
    pub fn new(has_demand: bool, work_state: StateId) -> Self {
        Self {
            has_demand,
            work_state,
            hooks: HookCounts::default(),
        }
    }

    pub fn has_demand(&self) -> bool {
        self.has_demand
    }

    pub fn set_demand(&mut self, has_demand: bool) {
        self.has_demand = has_demand;
    }

    pub fn work_state(&self) -> StateId {
        self.work_state
    }

    pub fn hooks(&self) -> &HookCounts {
        &self.hooks
    }
}

impl EntityBehavior for Machine {
    fn is_available(&self, status: &EntityStatus) -> bool {
        !status.is_in_service()
    }

    fn do_pre_maintenance(&mut self) {
        self.hooks.pre_maintenance += 1;
    }

    fn restart(&mut self) {
        self.hooks.restarts += 1;
    }

    fn release_equipment(&mut self) {
        self.hooks.equipment_releases += 1;
    }
}

/// One poll of every machine: breakdowns and maintenance first, then idle
/// machines with demand go back to work and working machines without it stop.
pub fn drive(plant: &mut Plant<Machine>, sched: &mut dyn Scheduler) -> Result<()> {
    let ids: Vec<EntityId> = plant.entities().map(|e| e.id()).collect();
    for id in ids {
        plant.poll(id, sched)?;
        let now = sched.now();
        let entity = plant.entity_mut(id)?;
        if entity.is_in_service() {
            continue;
        }
        let working = entity.is_working();
        let demand = entity.behavior().has_demand();
        if demand && !working {
            let state = entity.behavior().work_state();
            entity.set_state(state, now)?;
            trace!(entity = %entity.name(), now, "back to work");
        } else if !demand && working {
            entity.set_state(StateId::IDLE, now)?;
        }
    }
    Ok(())
}
