//! Calendar-based maintenance cycles and their backlog of due occurrences.
//!
//! Each cycle loops Scheduled -> Pending -> InMaintenance -> Scheduled. The
//! perpetual network task (see [`crate::task::Task::MaintenanceNetwork`])
//! sleeps until the earliest next due time, adds one occurrence to that
//! cycle's backlog and advances the cycle by its interval. Occurrences are
//! served back-to-back, so a backlog of `n` keeps the entity in maintenance
//! for `n × duration`.

use serde::Serialize;

use crate::error::SchedulerInvariantViolation;
use crate::{CycleIndex, SimTime, TIME_TOLERANCE};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarCycle {
    pub first_due: SimTime,
    pub interval: SimTime,
    pub duration: SimTime,
    pub skip_if_overlap: bool,
    pub force: bool,
    pub release_equipment: bool,
    pub defer_limit: SimTime,
}

impl CalendarCycle {
    /// First due time at or after `now`.
    pub fn next_due_at(&self, now: SimTime) -> SimTime {
        if self.first_due >= now || self.interval <= 0.0 {
            return self.first_due;
        }
        let n = ((now - self.first_due) / self.interval - TIME_TOLERANCE).ceil();
        self.first_due + n * self.interval
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CalendarSchedule {
    cycles: Vec<CalendarCycle>,
    pending: Vec<i64>,
    next_due: Option<Vec<SimTime>>,
    last_attempt: Vec<SimTime>,
}

impl CalendarSchedule {
    pub fn new(cycles: Vec<CalendarCycle>) -> Self {
        let n = cycles.len();
        Self {
            cycles,
            pending: vec![0; n],
            next_due: None,
            last_attempt: vec![f64::INFINITY; n],
        }
    }

    /// Backlog-only schedule for a shared-maintenance member; the cycle
    /// definitions stay with the master.
    pub fn mirror(cycles: usize) -> Self {
        Self {
            cycles: Vec::new(),
            pending: vec![0; cycles],
            next_due: None,
            last_attempt: vec![f64::INFINITY; cycles],
        }
    }

    pub fn cycles(&self) -> &[CalendarCycle] {
        &self.cycles
    }

    pub fn cycle(&self, index: CycleIndex) -> Option<&CalendarCycle> {
        self.cycles.get(index)
    }

    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }

    pub fn backlog_len(&self) -> usize {
        self.pending.len()
    }

    /// Empties every backlog and forgets the network's due times.
    pub fn reset(&mut self) {
        self.pending.iter_mut().for_each(|p| *p = 0);
        self.last_attempt.iter_mut().for_each(|t| *t = f64::INFINITY);
        self.next_due = None;
    }

    pub fn start_network(&mut self) {
        self.pending.iter_mut().for_each(|p| *p = 0);
        self.next_due = Some(self.cycles.iter().map(|c| c.first_due).collect());
    }

    /// Earliest next due time; ties go to the lowest index.
    pub fn earliest(&self) -> Option<(CycleIndex, SimTime)> {
        let due = self.next_due.as_ref()?;
        let mut best: Option<(CycleIndex, SimTime)> = None;
        for (i, &t) in due.iter().enumerate() {
            match best {
                Some((_, b)) if t >= b - TIME_TOLERANCE => {}
                _ => best = Some((i, t)),
            }
        }
        best
    }

    pub fn advance(&mut self, index: CycleIndex) {
        let interval = self.cycles.get(index).map(|c| c.interval).unwrap_or(0.0);
        if let Some(t) = self.next_due.as_mut().and_then(|d| d.get_mut(index)) {
            *t += interval;
        }
    }

    pub fn next_due(&self, index: CycleIndex) -> Option<SimTime> {
        self.next_due.as_ref().and_then(|d| d.get(index).copied())
    }

    /// Start of the next scheduled maintenance, +∞ before the network runs.
    pub fn next_start_time(&self) -> SimTime {
        self.next_due
            .as_ref()
            .map(|d| d.iter().copied().fold(f64::INFINITY, f64::min))
            .unwrap_or(f64::INFINITY)
    }

    pub fn next_duration(&self) -> SimTime {
        self.earliest()
            .and_then(|(i, _)| self.cycles.get(i))
            .map(|c| c.duration)
            .unwrap_or(0.0)
    }

    pub fn backlog(&self, index: CycleIndex) -> i64 {
        self.pending.get(index).copied().unwrap_or(0)
    }

    pub fn backlogs(&self) -> &[i64] {
        &self.pending
    }

    pub fn add_occurrence(&mut self, index: CycleIndex) {
        if let Some(p) = self.pending.get_mut(index) {
            *p += 1;
        }
    }

    /// Drops one occurrence without serving it (skip-if-overlap).
    pub fn cancel_occurrence(&mut self, index: CycleIndex) {
        if let Some(p) = self.pending.get_mut(index) {
            if *p > 0 {
                *p -= 1;
            }
        }
    }

    /// Consumes one occurrence that is about to be served.
    pub fn take_occurrence(&mut self, entity: &str, index: CycleIndex) -> Result<(), SchedulerInvariantViolation> {
        if let Some(p) = self.pending.get_mut(index) {
            *p -= 1;
        }
        self.check_backlog(entity, index)
    }

    pub fn check_backlog(&self, entity: &str, index: CycleIndex) -> Result<(), SchedulerInvariantViolation> {
        let observed = self.backlog(index);
        if observed < 0 {
            return Err(SchedulerInvariantViolation::NegativeBacklog {
                entity: entity.to_string(),
                cycle: index,
                observed,
            });
        }
        Ok(())
    }

    pub fn any_other_pending(&self, index: CycleIndex) -> bool {
        self.pending
            .iter()
            .enumerate()
            .any(|(i, &p)| i != index && p > 0)
    }

    /// Lowest cycle with a backlog that takes any time to serve. `cycles` are
    /// the master's for a group member.
    pub fn lowest_pending(&self, cycles: &[CalendarCycle]) -> Option<CycleIndex> {
        self.pending
            .iter()
            .zip(cycles)
            .position(|(&p, c)| p > 0 && c.duration > 0.0)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.iter().any(|&p| p > 0)
    }

    pub fn is_forced_pending(&self, cycles: &[CalendarCycle]) -> bool {
        self.pending
            .iter()
            .zip(cycles)
            .any(|(&p, c)| p > 0 && c.force)
    }

    pub fn record_attempt(&mut self, index: CycleIndex, now: SimTime) {
        if let Some(t) = self.last_attempt.get_mut(index) {
            *t = now;
        }
    }

    pub fn last_attempts(&self) -> &[SimTime] {
        &self.last_attempt
    }

    /// Hours of maintenance owed between `start` and `end`: the pending
    /// backlog plus every occurrence falling in the period, where each
    /// counted occurrence pushes the end of the period out by its duration.
    ///
    /// A cycle whose interval does not exceed its duration keeps the entity
    /// booked from its next occurrence to the end of the period.
    pub fn scheduled_hours_for_period(&self, cycles: &[CalendarCycle], start: SimTime, end: SimTime) -> f64 {
        let mut total: f64 = self
            .pending
            .iter()
            .zip(cycles)
            .map(|(&p, c)| p as f64 * c.duration)
            .sum();

        for cycle in cycles.iter().take(self.pending.len()) {
            if cycle.interval <= 0.0 {
                continue;
            }
            let first = cycle.next_due_at(start);
            if first >= end {
                continue;
            }
            // Occurrence k counts while first + k * interval < end + k * duration.
            let slack = cycle.interval - cycle.duration;
            if slack <= TIME_TOLERANCE {
                total += end - first;
                continue;
            }
            let occurrences = ((end - first) / slack).ceil();
            total += occurrences * cycle.duration;
        }
        total
    }
}
