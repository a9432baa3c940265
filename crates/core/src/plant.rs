//! All entities of one simulation run, their shared-maintenance groups, and
//! the dispatch of cooperative tasks to them.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::calendar::CalendarCycle;
use crate::config::{AvailabilityConfig, BreakdownSources};
use crate::entity::{Entity, EntityBehavior};
use crate::error::{ConfigError, CoreError, LookupError, SchedulerInvariantViolation};
use crate::shared::{MaintenanceRole, SharedMaintenanceGroup};
use crate::state::StateSet;
use crate::task::{NetworkPhase, Process, Scheduler, ServicePhase, Step, Task};
use crate::{CalendarSchedule, CycleIndex, EntityId, SimTime, TIME_TOLERANCE};

#[derive(Debug)]
pub struct Plant<B> {
    states: Arc<StateSet>,
    entities: Vec<Entity<B>>,
    names: HashMap<String, EntityId>,
    groups: Vec<SharedMaintenanceGroup>,
    unresolved: Vec<(EntityId, Vec<String>)>,
}

impl<B: EntityBehavior> Plant<B> {
    pub fn new(states: StateSet) -> Self {
        Self {
            states: Arc::new(states),
            entities: Vec::new(),
            names: HashMap::new(),
            groups: Vec::new(),
            unresolved: Vec::new(),
        }
    }

    pub fn states(&self) -> &StateSet {
        &self.states
    }

    /// Validates `config` and adds the entity. Shared-maintenance member names
    /// are resolved by [`Self::resolve_shared_maintenance`].
    pub fn add_entity(
        &mut self,
        name: &str,
        config: &AvailabilityConfig,
        sources: BreakdownSources,
        behavior: B,
    ) -> Result<EntityId, ConfigError> {
        if self.names.contains_key(name) {
            return Err(ConfigError::DuplicateEntity {
                entity: name.to_string(),
            });
        }
        let id = EntityId(self.entities.len());
        let entity = Entity::new(id, name, Arc::clone(&self.states), config, sources, behavior)?;
        self.entities.push(entity);
        self.names.insert(name.to_string(), id);
        if !config.shared_maintenance.is_empty() {
            self.unresolved.push((id, config.shared_maintenance.clone()));
        }
        Ok(id)
    }

    /// Turns configured member names into groups. Membership is static afterwards.
    pub fn resolve_shared_maintenance(&mut self) -> Result<(), ConfigError> {
        for (master, member_names) in std::mem::take(&mut self.unresolved) {
            let master_name = self.entities[master.0].name().to_string();
            let mut members = Vec::with_capacity(member_names.len());
            for member_name in &member_names {
                let id = self
                    .names
                    .get(member_name)
                    .copied()
                    .filter(|&id| id != master)
                    .ok_or_else(|| ConfigError::UnknownMember {
                        entity: master_name.clone(),
                        member: member_name.clone(),
                    })?;
                members.push(id);
            }
            self.share_maintenance(master, &members)?;
        }
        Ok(())
    }

    pub fn share_maintenance(&mut self, master: EntityId, members: &[EntityId]) -> Result<(), ConfigError> {
        let master_name = self.name_of(master).to_string();
        let cycles = match self.entities.get(master.0) {
            Some(e) if e.calendar().has_cycles() => e.calendar().cycles().len(),
            _ => return Err(ConfigError::MasterWithoutCycles { entity: master_name }),
        };
        match self.entities[master.0].role() {
            MaintenanceRole::Member(m) => {
                return Err(ConfigError::AlreadyShared {
                    entity: master_name,
                    master: self.name_of(m).to_string(),
                });
            }
            MaintenanceRole::Master => {
                return Err(ConfigError::AlreadyShared {
                    entity: master_name.clone(),
                    master: master_name,
                });
            }
            MaintenanceRole::Independent => {}
        }
        for &member in members {
            let Some(entity) = self.entities.get(member.0) else {
                return Err(ConfigError::UnknownMember {
                    entity: master_name,
                    member: member.to_string(),
                });
            };
            if entity.calendar().has_cycles() {
                return Err(ConfigError::MemberDefinesCycles {
                    entity: entity.name().to_string(),
                });
            }
            if entity.role() != MaintenanceRole::Independent {
                return Err(ConfigError::AlreadyShared {
                    entity: entity.name().to_string(),
                    master: master_name,
                });
            }
        }

        for &member in members {
            let entity = &mut self.entities[member.0];
            entity.set_role(MaintenanceRole::Member(master));
            *entity.calendar_mut() = CalendarSchedule::mirror(cycles);
        }
        self.entities[master.0].set_role(MaintenanceRole::Master);
        self.groups
            .push(SharedMaintenanceGroup::new(master, members.to_vec()));
        Ok(())
    }

    fn name_of(&self, id: EntityId) -> &str {
        self.entities.get(id.0).map(|e| e.name()).unwrap_or("?")
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity<B>> {
        self.entities.iter()
    }

    pub fn groups(&self) -> &[SharedMaintenanceGroup] {
        &self.groups
    }

    pub fn lookup(&self, name: &str) -> Result<EntityId, LookupError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| LookupError::UnknownEntityName {
                name: name.to_string(),
            })
    }

    pub fn entity(&self, id: EntityId) -> Result<&Entity<B>, LookupError> {
        self.entities.get(id.0).ok_or(LookupError::UnknownEntity { id })
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity<B>, LookupError> {
        self.entities.get_mut(id.0).ok_or(LookupError::UnknownEntity { id })
    }

    pub fn group_of(&self, id: EntityId) -> Option<&SharedMaintenanceGroup> {
        let master = match self.entities.get(id.0)?.role() {
            MaintenanceRole::Independent => return None,
            MaintenanceRole::Master => id,
            MaintenanceRole::Member(m) => m,
        };
        self.groups.iter().find(|g| g.master() == master)
    }

    pub fn is_group_available(&self, group: &SharedMaintenanceGroup) -> bool {
        group.is_available(|id| self.entities.get(id.0).map_or(false, |e| e.is_available()))
    }

    /// Cycle definitions that govern `id`: its master's for a group member.
    pub fn authoritative_cycles(&self, id: EntityId) -> Result<&[CalendarCycle], LookupError> {
        let entity = self.entity(id)?;
        match entity.role() {
            MaintenanceRole::Member(master) => Ok(self.entity(master)?.calendar().cycles()),
            _ => Ok(entity.calendar().cycles()),
        }
    }

    fn authoritative_cycle(&self, id: EntityId, cycle: CycleIndex) -> Result<CalendarCycle, CoreError> {
        self.authoritative_cycles(id)?
            .get(cycle)
            .cloned()
            .ok_or_else(|| {
                CoreError::from(SchedulerInvariantViolation::UnknownCycle {
                    entity: self.name_of(id).to_string(),
                    cycle,
                })
            })
    }

    /// Initializes every entity, then arms the calendar network of each
    /// independent entity and group master.
    pub fn initialize(&mut self, sched: &mut dyn Scheduler) -> Result<(), CoreError> {
        self.resolve_shared_maintenance()?;
        let now = sched.now();
        for entity in &mut self.entities {
            entity.initialize(now)?;
        }
        let networks: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|e| e.calendar().has_cycles())
            .map(|e| e.id())
            .collect();
        for id in networks {
            self.start_task(id, Task::MaintenanceNetwork(NetworkPhase::Start), sched)?;
        }
        info!(entities = self.entities.len(), groups = self.groups.len(), "plant initialized");
        Ok(())
    }

    pub fn clear_statistics(&mut self, now: SimTime) {
        for entity in &mut self.entities {
            entity.clear_statistics(now);
        }
    }

    /// Runs the first step of `task` immediately and hands the rest to `sched`.
    pub fn start_task(&mut self, id: EntityId, task: Task, sched: &mut dyn Scheduler) -> Result<(), CoreError> {
        sched.task_started(id, &task);
        self.run_task(id, task, sched)
    }

    fn resume(&mut self, id: EntityId, task: &mut Task, sched: &mut dyn Scheduler) -> Result<Step, CoreError> {
        let now = sched.now();
        match task {
            Task::MaintenanceNetwork(phase) => self.resume_network(id, phase, sched),
            Task::CalendarMaintenance { cycle, phase } => {
                let definition = self.authoritative_cycle(id, *cycle)?;
                self.entity_mut(id)?
                    .resume_calendar_service(*cycle, &definition, phase, now)
            }
            Task::OperatingHoursMaintenance { cycle, phase } => {
                self.entity_mut(id)?
                    .resume_operating_hours_service(*cycle, phase, now)
            }
            Task::Breakdown { started } => self.entity_mut(id)?.resume_breakdown(started, now),
            Task::DeferredCheck { limit, waited } => {
                if !*waited {
                    *waited = true;
                    return Ok(Step::Wait(*limit));
                }
                debug!(entity = %self.name_of(id), now, "deferral limit expired");
                self.check_maintenance(id, sched)?;
                Ok(Step::Done)
            }
        }
    }

    /// The perpetual calendar loop: one suspension per due occurrence.
    fn resume_network(
        &mut self,
        id: EntityId,
        phase: &mut NetworkPhase,
        sched: &mut dyn Scheduler,
    ) -> Result<Step, CoreError> {
        let mut cycle = match *phase {
            NetworkPhase::Start => {
                let entity = self.entity_mut(id)?;
                entity.calendar_mut().start_network();
                let Some((cycle, _)) = entity.calendar().earliest() else {
                    return Ok(Step::Done);
                };
                *phase = NetworkPhase::Due { cycle };
                return Ok(Step::LastInInstant);
            }
            NetworkPhase::Due { cycle } => cycle,
        };

        loop {
            let now = sched.now();
            let due = self.entity(id)?.calendar().next_due(cycle).unwrap_or(f64::INFINITY);
            let dt = due - now;
            if dt > TIME_TOLERANCE {
                *phase = NetworkPhase::Due { cycle };
                return Ok(Step::Wait(dt));
            }

            self.fire_calendar_occurrence(id, cycle, sched)?;

            let entity = self.entity_mut(id)?;
            entity.calendar_mut().advance(cycle);
            match entity.calendar().earliest() {
                Some((next, _)) => cycle = next,
                None => return Ok(Step::Done),
            }
        }
    }

    fn fire_calendar_occurrence(
        &mut self,
        id: EntityId,
        cycle: CycleIndex,
        sched: &mut dyn Scheduler,
    ) -> Result<(), CoreError> {
        let now = sched.now();

        if let Some(group) = self.group_of(id).cloned() {
            for member in group.participants() {
                self.entity_mut(member)?.calendar_mut().add_occurrence(cycle);
            }
            if self.is_group_available(&group) {
                info!(master = %self.name_of(id), cycle, now, "shared maintenance due; group available");
                for member in group.participants() {
                    if !self.entity(member)?.is_in_maintenance() {
                        self.start_task(member, calendar_task(cycle), sched)?;
                    }
                }
            } else {
                info!(
                    master = %self.name_of(id),
                    cycle,
                    now,
                    backlog = self.entity(id)?.calendar().backlog(cycle),
                    "shared maintenance due; group busy"
                );
            }
            return Ok(());
        }

        let definition = self.authoritative_cycle(id, cycle)?;
        let entity = self.entity_mut(id)?;
        entity.calendar_mut().add_occurrence(cycle);
        if entity.can_start_calendar(cycle, Some(&definition)) {
            return self.start_task(id, calendar_task(cycle), sched);
        }

        entity.calendar_mut().record_attempt(cycle, now);
        if definition.skip_if_overlap
            && (entity.calendar().any_other_pending(cycle) || entity.is_in_maintenance())
        {
            entity.calendar_mut().cancel_occurrence(cycle);
            info!(entity = %entity.name(), cycle, now, "overlapping maintenance skipped");
        } else {
            debug!(
                entity = %entity.name(),
                cycle,
                now,
                backlog = entity.calendar().backlog(cycle),
                "maintenance deferred"
            );
        }
        if definition.defer_limit > 0.0 {
            let task = Task::DeferredCheck {
                limit: definition.defer_limit,
                waited: false,
            };
            self.start_task(id, task, sched)?;
        }
        Ok(())
    }

    /// Tries the calendar backlog, then operating hours. Starts at most one
    /// maintenance (for a group: one per participant) and reports whether it did.
    pub fn check_maintenance(&mut self, id: EntityId, sched: &mut dyn Scheduler) -> Result<bool, CoreError> {
        if let Some(group) = self.group_of(id).cloned() {
            if self.is_group_available(&group) {
                let mut started = false;
                for member in group.participants() {
                    let cycles = self.authoritative_cycles(member)?;
                    let entity = self.entity(member)?;
                    if entity.is_in_maintenance() {
                        continue;
                    }
                    if let Some(cycle) = entity.calendar().lowest_pending(cycles) {
                        self.start_task(member, calendar_task(cycle), sched)?;
                        started |= self.entity(member)?.is_in_maintenance();
                    }
                }
                if started {
                    return Ok(true);
                }
            }
        } else {
            let cycles = self.authoritative_cycles(id)?;
            let entity = self.entity(id)?;
            let ready = (0..entity.calendar().backlog_len()).find(|&cycle| {
                let definition = cycles.get(cycle);
                entity.calendar().backlog(cycle) > 0
                    && definition.map_or(false, |c| c.duration > 0.0)
                    && entity.can_start_calendar(cycle, definition)
            });
            if let Some(cycle) = ready {
                self.start_task(id, calendar_task(cycle), sched)?;
                if self.entity(id)?.is_in_maintenance() {
                    return Ok(true);
                }
            }
        }
        self.check_operating_hours_maintenance(id, sched)
    }

    pub fn check_operating_hours_maintenance(
        &mut self,
        id: EntityId,
        sched: &mut dyn Scheduler,
    ) -> Result<bool, CoreError> {
        let now = sched.now();
        let Some(cycle) = self.entity_mut(id)?.trigger_operating_hours(now) else {
            return Ok(false);
        };
        let task = Task::OperatingHoursMaintenance {
            cycle,
            phase: ServicePhase::Begin,
        };
        self.start_task(id, task, sched)?;
        Ok(true)
    }

    pub fn check_breakdown(&mut self, id: EntityId, sched: &mut dyn Scheduler) -> Result<bool, CoreError> {
        let now = sched.now();
        if !self.entity_mut(id)?.breakdown_due(now) {
            return Ok(false);
        }
        self.start_task(id, Task::Breakdown { started: false }, sched)?;
        Ok(true)
    }

    /// Opportunistic availability poll: breakdowns first, then maintenance.
    pub fn poll(&mut self, id: EntityId, sched: &mut dyn Scheduler) -> Result<bool, CoreError> {
        if self.check_breakdown(id, sched)? {
            return Ok(true);
        }
        self.check_maintenance(id, sched)
    }

    pub fn scheduled_maintenance_hours_for_period(
        &self,
        id: EntityId,
        start: SimTime,
        end: SimTime,
    ) -> Result<f64, LookupError> {
        let cycles = self.authoritative_cycles(id)?;
        Ok(self
            .entity(id)?
            .calendar()
            .scheduled_hours_for_period(cycles, start, end))
    }

    pub fn is_forced_maintenance_pending(&self, id: EntityId) -> Result<bool, LookupError> {
        let cycles = self.authoritative_cycles(id)?;
        Ok(self.entity(id)?.calendar().is_forced_pending(cycles))
    }
}

fn calendar_task(cycle: CycleIndex) -> Task {
    Task::CalendarMaintenance {
        cycle,
        phase: ServicePhase::Begin,
    }
}

impl<B: EntityBehavior> Process for Plant<B> {
    fn run_task(&mut self, entity: EntityId, mut task: Task, sched: &mut dyn Scheduler) -> Result<(), CoreError> {
        match self.resume(entity, &mut task, sched)? {
            Step::Wait(dt) => sched.schedule_wait(entity, dt, task),
            Step::LastInInstant => sched.schedule_last_in_current_instant(entity, task),
            Step::Done => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CalendarMaintenanceConfig, OperatingHoursConfig};
    use crate::entity::EntityStatus;
    use crate::state::StateId;

    #[derive(Debug, Default)]
    struct Cell {
        busy: bool,
        restarts: u32,
    }

    impl EntityBehavior for Cell {
        fn is_available(&self, status: &EntityStatus) -> bool {
            !self.busy && !status.is_in_service()
        }

        fn restart(&mut self) {
            self.restarts += 1;
        }
    }

    /// Just enough of an executor to drive a plant in unit tests.
    #[derive(Default)]
    struct Agenda {
        now: SimTime,
        seq: u64,
        timed: Vec<(SimTime, u64, EntityId, Task)>,
        last: Vec<(EntityId, Task)>,
    }

    impl Scheduler for Agenda {
        fn now(&self) -> SimTime {
            self.now
        }

        fn schedule_wait(&mut self, entity: EntityId, dt: SimTime, task: Task) {
            self.seq += 1;
            self.timed.push((self.now + dt, self.seq, entity, task));
        }

        fn schedule_last_in_current_instant(&mut self, entity: EntityId, task: Task) {
            self.last.push((entity, task));
        }
    }

    impl Agenda {
        fn run_until(&mut self, plant: &mut Plant<Cell>, horizon: SimTime) {
            loop {
                let next = self
                    .timed
                    .iter()
                    .enumerate()
                    .min_by(|a, b| a.1 .0.total_cmp(&b.1 .0).then(a.1 .1.cmp(&b.1 .1)))
                    .map(|(i, e)| (i, e.0));
                let same_instant = next.map_or(false, |(_, t)| t <= self.now + TIME_TOLERANCE);
                if !same_instant && !self.last.is_empty() {
                    let (id, task) = self.last.remove(0);
                    plant.run_task(id, task, self).unwrap();
                    continue;
                }
                match next {
                    Some((i, t)) if t <= horizon => {
                        let (t, _, id, task) = self.timed.remove(i);
                        self.now = t;
                        plant.run_task(id, task, self).unwrap();
                    }
                    _ => break,
                }
            }
            self.now = horizon;
        }
    }

    fn calendar(first: &[f64], interval: &[f64], duration: &[f64]) -> AvailabilityConfig {
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

    fn plant_with(config: AvailabilityConfig, busy: bool) -> (Plant<Cell>, EntityId, Agenda) {
        let mut plant = Plant::new(StateSet::standard());
        let cell = Cell { busy, restarts: 0 };
        let id = plant
            .add_entity("press", &config, BreakdownSources::default(), cell)
            .unwrap();
        let mut agenda = Agenda::default();
        plant.initialize(&mut agenda).unwrap();
        (plant, id, agenda)
    }

    #[test]
    fn calendar_maintenance_repeats_every_interval() {
        let (mut plant, id, mut agenda) = plant_with(calendar(&[24.0], &[168.0], &[8.0]), false);
        agenda.run_until(&mut plant, 30.0);
        let press = plant.entity(id).unwrap();
        assert!(press.is_in_maintenance());
        assert_eq!(press.maintenance_end_time(), 32.0);

        agenda.run_until(&mut plant, 32.0);
        let press = plant.entity(id).unwrap();
        assert!(!press.is_in_maintenance());
        assert_eq!(press.current_state(), Some("Idle"));
        assert_eq!(press.hours_for_state("Maintenance", 32.0).unwrap(), 8.0);

        agenda.run_until(&mut plant, 200.0);
        let press = plant.entity(id).unwrap();
        assert_eq!(press.hours_for_state("Maintenance", 200.0).unwrap(), 16.0);
        assert!((press.percent_of_time("Maintenance", 200.0).unwrap() - 8.0).abs() < 1e-9);
        assert_eq!(press.behavior().restarts, 1);
        assert_eq!(press.next_maintenance_start_time(), 360.0);
    }

    #[test]
    fn busy_entity_accumulates_backlog_and_serves_it_back_to_back() {
        let (mut plant, id, mut agenda) = plant_with(calendar(&[10.0], &[10.0], &[2.0]), true);
        agenda.run_until(&mut plant, 35.0);
        assert_eq!(plant.entity(id).unwrap().calendar().backlog(0), 3);
        assert_eq!(plant.entity(id).unwrap().calendar().last_attempts()[0], 30.0);

        plant.entity_mut(id).unwrap().behavior_mut().busy = false;
        assert!(plant.poll(id, &mut agenda).unwrap());
        assert_eq!(plant.entity(id).unwrap().maintenance_end_time(), 41.0);

        // The occurrence due at 40 joins the running maintenance.
        agenda.run_until(&mut plant, 45.0);
        let press = plant.entity(id).unwrap();
        assert!(!press.is_in_maintenance());
        assert_eq!(press.calendar().backlog(0), 0);
        assert_eq!(press.hours_for_state("Maintenance", 45.0).unwrap(), 8.0);
    }

    #[test]
    fn overlapping_occurrence_is_skipped() {
        let mut config = calendar(&[10.0, 10.0], &[100.0, 100.0], &[5.0, 1.0]);
        config.maintenance.skip_if_overlap = vec![false, true];
        let (mut plant, id, mut agenda) = plant_with(config, true);
        agenda.run_until(&mut plant, 20.0);
        assert_eq!(plant.entity(id).unwrap().calendar().backlogs(), &[1, 0]);
    }

    #[test]
    fn forced_cycle_starts_while_busy() {
        let mut config = calendar(&[10.0], &[100.0], &[5.0]);
        config.maintenance.force = Some(vec![true]);
        let (mut plant, id, mut agenda) = plant_with(config, true);
        agenda.run_until(&mut plant, 12.0);
        assert!(plant.entity(id).unwrap().is_in_maintenance());
        assert!(!plant.is_forced_maintenance_pending(id).unwrap());
    }

    #[test]
    fn deferral_limit_triggers_a_recheck() {
        let mut config = calendar(&[10.0], &[100.0], &[2.0]);
        config.maintenance.defer_limits = Some(vec![3.0]);
        let (mut plant, id, mut agenda) = plant_with(config, true);
        agenda.run_until(&mut plant, 11.0);
        plant.entity_mut(id).unwrap().behavior_mut().busy = false;
        agenda.run_until(&mut plant, 14.0);
        let press = plant.entity(id).unwrap();
        assert!(press.is_in_maintenance());
        assert_eq!(press.maintenance_start_time(), 13.0);
    }

    #[test]
    fn operating_hours_maintenance_starts_on_poll() {
        let config = AvailabilityConfig {
            operating_hours: OperatingHoursConfig {
                first_hours: vec![10.0],
                intervals: vec![20.0],
                durations: vec![2.0],
            },
            ..Default::default()
        };
        let (mut plant, id, mut agenda) = plant_with(config, false);
        plant.entity_mut(id).unwrap().set_state(StateId::WORKING, 0.0).unwrap();
        agenda.run_until(&mut plant, 12.0);
        assert!(plant.entity(id).unwrap().is_maintenance_pending(12.0));
        assert!(plant.poll(id, &mut agenda).unwrap());
        agenda.run_until(&mut plant, 20.0);
        let press = plant.entity(id).unwrap();
        assert_eq!(press.operating_hours().next_due_hours(0), Some(30.0));
        assert_eq!(press.hours_for_state("Maintenance", 20.0).unwrap(), 2.0);
        assert_eq!(press.current_state(), Some("Idle"));
    }

    #[test]
    fn zero_duration_backlog_does_not_block_operating_hours() {
        let mut config = calendar(&[1.0], &[100.0], &[0.0]);
        config.operating_hours = OperatingHoursConfig {
            first_hours: vec![5.0],
            intervals: vec![50.0],
            durations: vec![2.0],
        };
        let (mut plant, id, mut agenda) = plant_with(config, false);
        plant.entity_mut(id).unwrap().set_state(StateId::WORKING, 0.0).unwrap();
        agenda.run_until(&mut plant, 10.0);
        assert_eq!(plant.entity(id).unwrap().calendar().backlog(0), 1);

        assert!(plant.check_maintenance(id, &mut agenda).unwrap());
        let press = plant.entity(id).unwrap();
        assert!(press.is_in_maintenance());
        assert_eq!(press.operating_hours().backlog(0), 0);

        agenda.run_until(&mut plant, 12.0);
        assert!(!plant.entity(id).unwrap().is_in_maintenance());
        assert!(!plant.check_maintenance(id, &mut agenda).unwrap());
    }

    #[test]
    fn shared_group_waits_for_every_participant() {
        let mut plant = Plant::new(StateSet::standard());
        let mut master_config = calendar(&[5.0], &[50.0], &[4.0]);
        master_config.shared_maintenance = vec!["b".to_string()];
        let a = plant
            .add_entity("a", &master_config, BreakdownSources::default(), Cell::default())
            .unwrap();
        let member = Cell { busy: true, restarts: 0 };
        let b = plant
            .add_entity("b", &AvailabilityConfig::default(), BreakdownSources::default(), member)
            .unwrap();
        let mut agenda = Agenda::default();
        plant.initialize(&mut agenda).unwrap();
        assert_eq!(plant.entity(b).unwrap().role(), MaintenanceRole::Member(a));

        agenda.run_until(&mut plant, 8.0);
        assert!(!plant.entity(a).unwrap().is_in_maintenance());
        assert_eq!(plant.entity(a).unwrap().calendar().backlog(0), 1);
        assert_eq!(plant.entity(b).unwrap().calendar().backlog(0), 1);

        plant.entity_mut(b).unwrap().behavior_mut().busy = false;
        assert!(plant.poll(b, &mut agenda).unwrap());
        assert!(plant.entity(a).unwrap().is_in_maintenance());
        assert!(plant.entity(b).unwrap().is_in_maintenance());

        agenda.run_until(&mut plant, 20.0);
        for id in [a, b] {
            let e = plant.entity(id).unwrap();
            assert_eq!(e.hours_for_state("Maintenance", 20.0).unwrap(), 4.0);
            assert_eq!(e.calendar().backlog(0), 0);
        }
        assert_eq!(plant.scheduled_maintenance_hours_for_period(b, 20.0, 60.0).unwrap(), 4.0);
    }

    #[test]
    fn group_configuration_errors() {
        let mut plant: Plant<Cell> = Plant::new(StateSet::standard());
        let mut master_config = calendar(&[5.0], &[50.0], &[4.0]);
        master_config.shared_maintenance = vec!["ghost".to_string()];
        plant
            .add_entity("a", &master_config, BreakdownSources::default(), Cell::default())
            .unwrap();
        assert!(matches!(
            plant.resolve_shared_maintenance(),
            Err(ConfigError::UnknownMember { .. })
        ));

        let mut plant: Plant<Cell> = Plant::new(StateSet::standard());
        let a = plant
            .add_entity("a", &calendar(&[5.0], &[50.0], &[4.0]), BreakdownSources::default(), Cell::default())
            .unwrap();
        let b = plant
            .add_entity("b", &calendar(&[1.0], &[10.0], &[1.0]), BreakdownSources::default(), Cell::default())
            .unwrap();
        assert!(matches!(
            plant.share_maintenance(a, &[b]),
            Err(ConfigError::MemberDefinesCycles { .. })
        ));
        assert!(matches!(
            plant.add_entity("a", &AvailabilityConfig::default(), BreakdownSources::default(), Cell::default()),
            Err(ConfigError::DuplicateEntity { .. })
        ));
        assert!(matches!(plant.lookup("zz"), Err(LookupError::UnknownEntityName { .. })));
    }

    #[test]
    fn master_leads_a_single_group() {
        let mut plant: Plant<Cell> = Plant::new(StateSet::standard());
        let a = plant
            .add_entity("a", &calendar(&[5.0], &[50.0], &[4.0]), BreakdownSources::default(), Cell::default())
            .unwrap();
        let b = plant
            .add_entity("b", &AvailabilityConfig::default(), BreakdownSources::default(), Cell::default())
            .unwrap();
        let c = plant
            .add_entity("c", &AvailabilityConfig::default(), BreakdownSources::default(), Cell::default())
            .unwrap();
        plant.share_maintenance(a, &[b]).unwrap();
        assert!(matches!(
            plant.share_maintenance(a, &[c]),
            Err(ConfigError::AlreadyShared { .. })
        ));
        assert_eq!(plant.groups().len(), 1);
        assert_eq!(plant.entity(c).unwrap().role(), MaintenanceRole::Independent);
    }
}
