//! Per-entity availability facade.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::breakdown::BreakdownGenerator;
use crate::calendar::{CalendarCycle, CalendarSchedule};
use crate::config::{AvailabilityConfig, BreakdownSources};
use crate::error::{ConfigError, CoreError, LookupError, SchedulerInvariantViolation};
use crate::operating::OperatingHoursSchedule;
use crate::shared::MaintenanceRole;
use crate::state::{StateId, StateSet};
use crate::task::{ServicePhase, Step};
use crate::tracker::StateTracker;
use crate::{CycleIndex, EntityId, SimTime};

/// Snapshot handed to behavior hooks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EntityStatus {
    pub state: Option<StateId>,
    pub in_working_state: bool,
    pub broken_down: bool,
    pub in_maintenance: bool,
    pub associated_breakdown: bool,
    pub associated_maintenance: bool,
}

impl EntityStatus {
    pub fn is_in_service(&self) -> bool {
        self.broken_down || self.in_maintenance || self.associated_breakdown || self.associated_maintenance
    }
}

/// What a concrete entity type supplies to the availability core.
pub trait EntityBehavior {
    fn is_available(&self, status: &EntityStatus) -> bool;

    fn can_start_maintenance(&self, status: &EntityStatus, _cycle: CycleIndex) -> bool {
        self.is_available(status)
    }

    /// Consulted for cycles flagged `force`, which may interrupt work.
    fn can_start_forced_maintenance(&self, _status: &EntityStatus) -> bool {
        true
    }

    fn is_working(&self, status: &EntityStatus) -> bool {
        status.in_working_state
    }

    fn do_pre_maintenance(&mut self) {}

    /// Called when a breakdown or maintenance period ends.
    fn restart(&mut self) {}

    fn release_equipment(&mut self) {}
}

#[derive(Debug)]
pub struct Entity<B> {
    id: EntityId,
    name: String,
    states: Arc<StateSet>,
    behavior: B,
    tracker: StateTracker,
    breakdown: BreakdownGenerator,
    calendar: CalendarSchedule,
    operating: OperatingHoursSchedule,
    role: MaintenanceRole,
    broken_down: bool,
    in_maintenance: bool,
    associated_breakdown: bool,
    associated_maintenance: bool,
    maintenance_start_time: SimTime,
    maintenance_end_time: SimTime,
    breakdown_start_time: SimTime,
    breakdown_end_time: SimTime,
}

impl<B: EntityBehavior> Entity<B> {
    pub fn new(
        id: EntityId,
        name: impl Into<String>,
        states: Arc<StateSet>,
        config: &AvailabilityConfig,
        sources: BreakdownSources,
        behavior: B,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        config.validate(&name, &sources)?;
        let tracker = StateTracker::new(states.len());
        Ok(Self {
            id,
            name,
            states,
            behavior,
            tracker,
            breakdown: BreakdownGenerator::new(
                config.breakdowns.availability,
                sources,
                config.breakdowns.downtime_to_release_equipment,
            ),
            calendar: CalendarSchedule::new(config.maintenance.cycles()),
            operating: OperatingHoursSchedule::new(config.operating_hours.cycles()),
            role: MaintenanceRole::Independent,
            broken_down: false,
            in_maintenance: false,
            associated_breakdown: false,
            associated_maintenance: false,
            maintenance_start_time: 0.0,
            maintenance_end_time: f64::INFINITY,
            breakdown_start_time: 0.0,
            breakdown_end_time: f64::INFINITY,
        })
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn states(&self) -> &StateSet {
        &self.states
    }

    pub fn behavior(&self) -> &B {
        &self.behavior
    }

    pub fn behavior_mut(&mut self) -> &mut B {
        &mut self.behavior
    }

    pub fn role(&self) -> MaintenanceRole {
        self.role
    }

    pub(crate) fn set_role(&mut self, role: MaintenanceRole) {
        self.role = role;
    }

    pub fn calendar(&self) -> &CalendarSchedule {
        &self.calendar
    }

    pub(crate) fn calendar_mut(&mut self) -> &mut CalendarSchedule {
        &mut self.calendar
    }

    pub fn operating_hours(&self) -> &OperatingHoursSchedule {
        &self.operating
    }

    pub fn breakdowns(&self) -> &BreakdownGenerator {
        &self.breakdown
    }

    pub fn tracker(&self) -> &StateTracker {
        &self.tracker
    }

    /// Resets flags, statistics, breakdown calibration and operating-hours thresholds,
    /// and puts the entity in Idle. The calendar network is armed by the plant.
    pub fn initialize(&mut self, now: SimTime) -> Result<(), CoreError> {
        self.broken_down = false;
        self.in_maintenance = false;
        self.associated_breakdown = false;
        self.associated_maintenance = false;
        self.maintenance_start_time = 0.0;
        self.maintenance_end_time = f64::INFINITY;
        self.breakdown_start_time = 0.0;
        self.breakdown_end_time = f64::INFINITY;

        self.tracker.initialize(self.states.len(), now);
        self.breakdown.initialize();
        self.breakdown.schedule_next_failure(0.0);
        self.calendar.reset();
        self.operating.reset();

        self.set_state(StateId::IDLE, now)?;
        debug!(entity = %self.name, mtbf = self.breakdown.mean_inter_arrival(), "initialized");
        Ok(())
    }

    /// Zeroes the occupancy accumulators and working hours. Thresholds measured
    /// in working hours are shifted so the remaining distance to each is kept.
    pub fn clear_statistics(&mut self, now: SimTime) {
        let working_now = self.is_working();
        let discarded = self.tracker.clear(now, working_now);
        self.operating.rebase(discarded);
        self.breakdown.rebase(discarded);
    }

    pub fn start_statistics_cycle(&mut self, now: SimTime) {
        self.tracker.start_statistics_cycle(now);
    }

    pub fn status(&self) -> EntityStatus {
        let state = self.tracker.current();
        EntityStatus {
            state,
            in_working_state: state.map_or(false, |s| self.states.is_working(s)),
            broken_down: self.broken_down,
            in_maintenance: self.in_maintenance,
            associated_breakdown: self.associated_breakdown,
            associated_maintenance: self.associated_maintenance,
        }
    }

    pub fn set_state(&mut self, state: StateId, now: SimTime) -> Result<(), CoreError> {
        let working = self.is_working();
        self.tracker
            .record_state_change(&self.name, state, now, working)
            .map_err(|e| self.fatal(e))?;
        Ok(())
    }

    pub fn set_state_named(&mut self, name: &str, now: SimTime) -> Result<(), CoreError> {
        let state = self.states.lookup(name)?;
        self.set_state(state, now)
    }

    fn fatal(&self, violation: SchedulerInvariantViolation) -> SchedulerInvariantViolation {
        error!(entity = %self.name, %violation, "scheduler invariant violated");
        violation
    }

    pub fn current_state(&self) -> Option<&str> {
        self.tracker.current().and_then(|s| self.states.name(s))
    }

    pub fn is_broken_down(&self) -> bool {
        self.broken_down
    }

    pub fn is_in_maintenance(&self) -> bool {
        self.in_maintenance
    }

    pub fn is_in_associated_breakdown(&self) -> bool {
        self.associated_breakdown
    }

    pub fn is_in_associated_maintenance(&self) -> bool {
        self.associated_maintenance
    }

    pub fn set_associated_breakdown(&mut self, value: bool) {
        self.associated_breakdown = value;
    }

    pub fn set_associated_maintenance(&mut self, value: bool) {
        self.associated_maintenance = value;
    }

    pub fn is_in_service(&self) -> bool {
        self.status().is_in_service()
    }

    pub fn is_available(&self) -> bool {
        self.behavior.is_available(&self.status())
    }

    pub fn is_working(&self) -> bool {
        self.behavior.is_working(&self.status())
    }

    pub fn can_start_maintenance(&self, cycle: CycleIndex) -> bool {
        self.behavior.can_start_maintenance(&self.status(), cycle)
    }

    pub(crate) fn can_start_calendar(&self, cycle: CycleIndex, definition: Option<&CalendarCycle>) -> bool {
        if self.is_in_service() {
            return false;
        }
        if self.can_start_maintenance(cycle) {
            return true;
        }
        definition.map_or(false, |c| c.force) && self.behavior.can_start_forced_maintenance(&self.status())
    }

    pub fn working_hours(&self, now: SimTime) -> f64 {
        self.tracker.working_hours(now, self.is_working())
    }

    pub fn hours_for_state(&self, name: &str, now: SimTime) -> Result<f64, LookupError> {
        Ok(self.tracker.hours_for(self.states.lookup(name)?, now))
    }

    pub fn fraction_of_time(&self, name: &str, now: SimTime) -> Result<f64, LookupError> {
        Ok(self.tracker.fraction_of_time(self.states.lookup(name)?, now))
    }

    pub fn percent_of_time(&self, name: &str, now: SimTime) -> Result<f64, LookupError> {
        Ok(self.tracker.percent_of_time(self.states.lookup(name)?, now))
    }

    pub fn time_between(&self, start: &str, end: &str) -> Result<f64, LookupError> {
        let start = self.states.lookup(start)?;
        let end = self.states.lookup(end)?;
        Ok(self.tracker.time_between(start, end))
    }

    pub fn commitment(&self, now: SimTime) -> f64 {
        1.0 - self.tracker.fraction_of_time(StateId::IDLE, now)
    }

    pub fn maintenance_start_time(&self) -> SimTime {
        self.maintenance_start_time
    }

    pub fn maintenance_end_time(&self) -> SimTime {
        self.maintenance_end_time
    }

    pub fn breakdown_start_time(&self) -> SimTime {
        self.breakdown_start_time
    }

    pub fn breakdown_end_time(&self) -> SimTime {
        self.breakdown_end_time
    }

    pub fn is_breakdown_pending(&self) -> bool {
        self.breakdown.is_pending()
    }

    pub fn hours_for_next_failure(&self) -> f64 {
        self.breakdown.hours_for_next_failure()
    }

    pub fn next_maintenance_start_time(&self) -> SimTime {
        self.calendar.next_start_time()
    }

    pub fn next_maintenance_duration(&self) -> SimTime {
        self.calendar.next_duration()
    }

    /// Time of the last attempt each calendar cycle was deferred at, +∞ if never.
    pub fn last_scheduled_maintenance_times(&self) -> &[SimTime] {
        self.calendar.last_attempts()
    }

    pub fn is_maintenance_pending(&self, now: SimTime) -> bool {
        self.calendar.is_pending() || self.operating.any_due(self.working_hours(now))
    }

    pub fn has_service_defined(&self) -> bool {
        self.calendar.has_cycles() || self.breakdown.has_duration_distribution()
    }

    pub fn has_service_scheduled(&self) -> bool {
        self.calendar.has_cycles() || matches!(self.role, MaintenanceRole::Member(_))
    }

    /// True when a breakdown should start now; marks it pending if the entity is busy in service.
    pub fn breakdown_due(&mut self, now: SimTime) -> bool {
        if self.broken_down || !self.breakdown.is_due(self.working_hours(now)) {
            return false;
        }
        if self.is_in_service() {
            self.breakdown.set_pending(true);
            return false;
        }
        true
    }

    /// Operating-hours cycle that should start now, already booked into its backlog.
    pub fn trigger_operating_hours(&mut self, now: SimTime) -> Option<CycleIndex> {
        if self.is_in_service() {
            return None;
        }
        let working = self.working_hours(now);
        let cycle = (0..self.operating.len())
            .find(|&i| self.can_start_maintenance(i) && self.operating.is_due(i, working))?;
        self.operating.trigger(cycle);
        Some(cycle)
    }

    pub(crate) fn resume_calendar_service(
        &mut self,
        cycle: CycleIndex,
        definition: &CalendarCycle,
        phase: &mut ServicePhase,
        now: SimTime,
    ) -> Result<Step, CoreError> {
        self.calendar.check_backlog(&self.name, cycle).map_err(|e| self.fatal(e))?;
        match *phase {
            ServicePhase::Begin => {
                let backlog = self.calendar.backlog(cycle);
                if definition.duration <= 0.0 || backlog == 0 || self.in_maintenance {
                    return Ok(Step::Done);
                }
                self.maintenance_start_time = now;
                self.maintenance_end_time = now + backlog as f64 * definition.duration;
                self.set_state(StateId::MAINTENANCE, now)?;
                self.in_maintenance = true;
                self.behavior.do_pre_maintenance();
                if definition.release_equipment {
                    self.behavior.release_equipment();
                }
                info!(
                    entity = %self.name,
                    cycle,
                    backlog,
                    now,
                    until = self.maintenance_end_time,
                    "maintenance started"
                );
                self.calendar.take_occurrence(&self.name, cycle).map_err(|e| self.fatal(e))?;
                *phase = ServicePhase::Serving {
                    duration: definition.duration,
                };
                Ok(Step::Wait(definition.duration))
            }
            ServicePhase::Serving { duration } => {
                if self.calendar.backlog(cycle) != 0 {
                    self.calendar.take_occurrence(&self.name, cycle).map_err(|e| self.fatal(e))?;
                    return Ok(Step::Wait(duration));
                }
                self.finish_maintenance(cycle, now)?;
                Ok(Step::Done)
            }
        }
    }

    pub(crate) fn resume_operating_hours_service(
        &mut self,
        cycle: CycleIndex,
        phase: &mut ServicePhase,
        now: SimTime,
    ) -> Result<Step, CoreError> {
        match *phase {
            ServicePhase::Begin => {
                let backlog = self.operating.backlog(cycle);
                if backlog == 0 {
                    return Ok(Step::Done);
                }
                let duration = self.operating.duration(cycle);
                self.maintenance_start_time = now;
                self.maintenance_end_time = now + backlog as f64 * duration;
                self.set_state(StateId::MAINTENANCE, now)?;
                self.in_maintenance = true;
                self.behavior.do_pre_maintenance();
                info!(
                    entity = %self.name,
                    cycle,
                    backlog,
                    now,
                    until = self.maintenance_end_time,
                    "operating-hours maintenance started"
                );
                self.operating.take_occurrence(&self.name, cycle).map_err(|e| self.fatal(e))?;
                *phase = ServicePhase::Serving { duration };
                Ok(Step::Wait(duration))
            }
            ServicePhase::Serving { duration } => {
                if self.operating.backlog(cycle) != 0 {
                    self.operating.take_occurrence(&self.name, cycle).map_err(|e| self.fatal(e))?;
                    return Ok(Step::Wait(duration));
                }
                self.finish_maintenance(cycle, now)?;
                Ok(Step::Done)
            }
        }
    }

    fn finish_maintenance(&mut self, cycle: CycleIndex, now: SimTime) -> Result<(), CoreError> {
        self.set_state(StateId::IDLE, now)?;
        self.in_maintenance = false;
        info!(entity = %self.name, cycle, now, "maintenance finished");
        self.behavior.restart();
        Ok(())
    }

    pub(crate) fn resume_breakdown(&mut self, started: &mut bool, now: SimTime) -> Result<Step, CoreError> {
        if !*started {
            let downtime = self.breakdown.next_breakdown_duration();
            self.breakdown_start_time = now;
            self.breakdown_end_time = now + downtime;
            self.breakdown.set_pending(false);
            self.set_state(StateId::BREAKDOWN, now)?;
            self.broken_down = true;
            if self.breakdown.releases_equipment(downtime) {
                self.behavior.release_equipment();
            }
            info!(entity = %self.name, now, downtime, "breakdown started");
            *started = true;
            return Ok(Step::Wait(downtime));
        }

        self.set_state(StateId::IDLE, now)?;
        self.broken_down = false;
        let working = self.working_hours(now);
        self.breakdown.schedule_next_failure(working);
        info!(
            entity = %self.name,
            now,
            next_failure_hours = self.breakdown.hours_for_next_failure(),
            "breakdown repaired"
        );
        self.behavior.restart();
        Ok(Step::Done)
    }
}
