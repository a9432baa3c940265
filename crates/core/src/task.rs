//! Cooperative tasks and the scheduler seam.
//!
//! A task is a resumable process owned by one entity. Resuming it runs until
//! its next suspension point and returns a [`Step`]; the task value itself
//! carries the phase to continue from, so a perpetual loop never grows the stack.

use serde::Serialize;

use crate::error::CoreError;
use crate::{CycleIndex, EntityId, SimTime};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum NetworkPhase {
    /// Not yet armed; yields to the end of the instant so group members finish initializing.
    Start,
    /// Waiting for `cycle` to fall due.
    Due { cycle: CycleIndex },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ServicePhase {
    Begin,
    /// One occurrence of the given duration is being served.
    Serving { duration: SimTime },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Task {
    /// The perpetual calendar-maintenance loop of an independent entity or a group master.
    MaintenanceNetwork(NetworkPhase),
    /// Serves a calendar cycle's backlog back-to-back.
    CalendarMaintenance { cycle: CycleIndex, phase: ServicePhase },
    /// Serves an operating-hours cycle's backlog.
    OperatingHoursMaintenance { cycle: CycleIndex, phase: ServicePhase },
    /// One breakdown from failure to repair.
    Breakdown { started: bool },
    /// Re-checks maintenance once a deferral limit expires.
    DeferredCheck { limit: SimTime, waited: bool },
}

impl Task {
    pub fn kind(&self) -> &'static str {
        match self {
            Task::MaintenanceNetwork(_) => "maintenance_network",
            Task::CalendarMaintenance { .. } => "calendar_maintenance",
            Task::OperatingHoursMaintenance { .. } => "operating_hours_maintenance",
            Task::Breakdown { .. } => "breakdown",
            Task::DeferredCheck { .. } => "deferred_check",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Resume after `dt` simulated hours.
    Wait(SimTime),
    /// Resume after every other task of the current instant.
    LastInInstant,
    Done,
}

/// What the core needs from the discrete-event executor.
pub trait Scheduler {
    fn now(&self) -> SimTime;

    /// Suspends `task` of `entity` and resumes it `dt` later.
    fn schedule_wait(&mut self, entity: EntityId, dt: SimTime, task: Task);

    /// Suspends `task` of `entity` until the end of the current instant's queue.
    fn schedule_last_in_current_instant(&mut self, entity: EntityId, task: Task);

    /// Notification that a task was started; executors may count these.
    fn task_started(&mut self, _entity: EntityId, _task: &Task) {}
}

/// Something the executor can hand suspended tasks back to.
pub trait Process {
    /// Resumes `task` of `entity` and re-suspends it with `sched` unless it finished.
    fn run_task(&mut self, entity: EntityId, task: Task, sched: &mut dyn Scheduler) -> Result<(), CoreError>;
}
