//! Maintenance driven by accumulated working hours.

use serde::Serialize;

use crate::error::SchedulerInvariantViolation;
use crate::CycleIndex;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperatingHoursCycle {
    pub first_due_hours: f64,
    pub interval_hours: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OperatingHoursSchedule {
    cycles: Vec<OperatingHoursCycle>,
    next_due_hours: Vec<f64>,
    pending: Vec<i64>,
}

impl OperatingHoursSchedule {
    pub fn new(cycles: Vec<OperatingHoursCycle>) -> Self {
        let next_due_hours = cycles.iter().map(|c| c.first_due_hours).collect();
        let pending = vec![0; cycles.len()];
        Self {
            cycles,
            next_due_hours,
            pending,
        }
    }

    pub fn reset(&mut self) {
        self.next_due_hours = self.cycles.iter().map(|c| c.first_due_hours).collect();
        self.pending.iter_mut().for_each(|p| *p = 0);
    }

    pub fn cycles(&self) -> &[OperatingHoursCycle] {
        &self.cycles
    }

    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    pub fn next_due_hours(&self, index: CycleIndex) -> Option<f64> {
        self.next_due_hours.get(index).copied()
    }

    pub fn is_due(&self, index: CycleIndex, working_hours: f64) -> bool {
        self.next_due_hours
            .get(index)
            .map_or(false, |&due| working_hours > due)
    }

    pub fn any_due(&self, working_hours: f64) -> bool {
        (0..self.cycles.len()).any(|i| self.is_due(i, working_hours))
    }

    /// Moves the threshold one interval on and books one occurrence.
    pub fn trigger(&mut self, index: CycleIndex) {
        let interval = self.cycles.get(index).map(|c| c.interval_hours).unwrap_or(0.0);
        if let Some(due) = self.next_due_hours.get_mut(index) {
            *due += interval;
        }
        if let Some(p) = self.pending.get_mut(index) {
            *p += 1;
        }
    }

    pub fn backlog(&self, index: CycleIndex) -> i64 {
        self.pending.get(index).copied().unwrap_or(0)
    }

    pub fn backlogs(&self) -> &[i64] {
        &self.pending
    }

    pub fn duration(&self, index: CycleIndex) -> f64 {
        self.cycles.get(index).map(|c| c.duration).unwrap_or(0.0)
    }

    pub fn take_occurrence(&mut self, entity: &str, index: CycleIndex) -> Result<(), SchedulerInvariantViolation> {
        if let Some(p) = self.pending.get_mut(index) {
            *p -= 1;
        }
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

    /// Shifts every threshold after working hours were zeroed by a statistics reset.
    pub fn rebase(&mut self, discarded_working_hours: f64) {
        self.next_due_hours
            .iter_mut()
            .for_each(|due| *due -= discarded_working_hours);
    }
}
