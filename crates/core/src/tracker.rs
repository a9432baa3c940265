//! Time-weighted occupancy per state.

use serde::Serialize;

use crate::error::SchedulerInvariantViolation;
use crate::state::StateId;
use crate::SimTime;

#[derive(Debug, Clone, Default, Serialize)]
pub struct StateTracker {
    hours_per_state: Vec<f64>,
    last_start: Vec<SimTime>,
    second_to_last_start: Vec<SimTime>,
    current: Option<StateId>,
    time_of_last_change: SimTime,
    working_hours: f64,
    last_reset: SimTime,
    second_to_last_reset: SimTime,
}

impl StateTracker {
    pub fn new(states: usize) -> Self {
        Self {
            hours_per_state: vec![0.0; states],
            last_start: vec![0.0; states],
            second_to_last_start: vec![0.0; states],
            ..Self::default()
        }
    }

    /// Forgets the present state and every accumulator; `now` becomes the
    /// start of the first statistics cycle.
    pub fn initialize(&mut self, states: usize, now: SimTime) {
        self.hours_per_state = vec![0.0; states];
        self.last_start = vec![0.0; states];
        self.second_to_last_start = vec![0.0; states];
        self.current = None;
        self.time_of_last_change = now;
        self.working_hours = 0.0;
        self.last_reset = now;
        self.second_to_last_reset = now;
    }

    /// Folds the time since the last change into the present state.
    /// `working` says whether that time counts towards working hours.
    pub fn update_hours(
        &mut self,
        entity: &str,
        now: SimTime,
        working: bool,
    ) -> Result<(), SchedulerInvariantViolation> {
        let Some(state) = self.current else {
            self.time_of_last_change = now;
            return Ok(());
        };
        self.check_index(entity, state)?;

        let dur = now - self.time_of_last_change;
        if dur > 0.0 {
            self.hours_per_state[state.0] += dur;
            self.time_of_last_change = now;
            if working {
                self.working_hours += dur;
            }
        }
        Ok(())
    }

    /// Returns `Ok(false)` when `state` is already the present state.
    pub fn record_state_change(
        &mut self,
        entity: &str,
        state: StateId,
        now: SimTime,
        working: bool,
    ) -> Result<bool, SchedulerInvariantViolation> {
        if self.current == Some(state) {
            return Ok(false);
        }
        self.check_index(entity, state)?;
        self.update_hours(entity, now, working)?;
        self.time_of_last_change = now;
        self.current = Some(state);
        self.second_to_last_start[state.0] = self.last_start[state.0];
        self.last_start[state.0] = now;
        Ok(true)
    }

    fn check_index(&self, entity: &str, state: StateId) -> Result<(), SchedulerInvariantViolation> {
        let len = self
            .hours_per_state
            .len()
            .min(self.last_start.len())
            .min(self.second_to_last_start.len());
        if state.0 >= len {
            return Err(SchedulerInvariantViolation::InvalidState {
                entity: entity.to_string(),
                index: state.0,
                len,
            });
        }
        Ok(())
    }

    pub fn current(&self) -> Option<StateId> {
        self.current
    }

    pub fn time_of_last_change(&self) -> SimTime {
        self.time_of_last_change
    }

    fn pending(&self, now: SimTime) -> f64 {
        if self.current.is_some() {
            (now - self.time_of_last_change).max(0.0)
        } else {
            0.0
        }
    }

    /// Hours spent in `state` up to `now`, including the unfolded tail of the present state.
    pub fn hours_for(&self, state: StateId, now: SimTime) -> f64 {
        let base = self.hours_per_state.get(state.0).copied().unwrap_or(0.0);
        if self.current == Some(state) {
            base + self.pending(now)
        } else {
            base
        }
    }

    pub fn total_hours(&self, now: SimTime) -> f64 {
        self.hours_per_state.iter().sum::<f64>() + self.pending(now)
    }

    pub fn hours_per_state(&self, now: SimTime) -> Vec<f64> {
        (0..self.hours_per_state.len())
            .map(|i| self.hours_for(StateId(i), now))
            .collect()
    }

    pub fn fraction_of_time(&self, state: StateId, now: SimTime) -> f64 {
        let total = self.total_hours(now);
        if total > 0.0 {
            self.hours_for(state, now) / total
        } else {
            0.0
        }
    }

    pub fn percent_of_time(&self, state: StateId, now: SimTime) -> f64 {
        self.fraction_of_time(state, now) * 100.0
    }

    /// Working hours up to `now`; `working_now` says whether the present state counts.
    pub fn working_hours(&self, now: SimTime, working_now: bool) -> f64 {
        if working_now {
            self.working_hours + self.pending(now)
        } else {
            self.working_hours
        }
    }

    pub fn last_statistics_reset(&self) -> SimTime {
        self.last_reset
    }

    pub fn start_statistics_cycle(&mut self, now: SimTime) {
        self.second_to_last_reset = self.last_reset;
        self.last_reset = now;
    }

    /// Zeroes the accumulators and starts a new statistics cycle.
    /// Returns the working hours that were discarded.
    pub fn clear(&mut self, now: SimTime, working_now: bool) -> f64 {
        let discarded = self.working_hours(now, working_now);
        self.hours_per_state.iter_mut().for_each(|h| *h = 0.0);
        self.time_of_last_change = now;
        self.working_hours = 0.0;
        self.start_statistics_cycle(now);
        discarded
    }

    /// Time from the last entry into `start` to the last entry into `end`
    /// within the present statistics cycle, or NaN when either entry predates it.
    /// If `start` was re-entered after `end`, its second-to-last entry is used.
    pub fn time_between(&self, start: StateId, end: StateId) -> f64 {
        let (Some(&end_last), Some(&start_last), Some(&start_prev)) = (
            self.last_start.get(end.0),
            self.last_start.get(start.0),
            self.second_to_last_start.get(start.0),
        ) else {
            return f64::NAN;
        };

        if end_last >= start_last {
            if end_last <= self.last_reset || start_last <= self.last_reset {
                return f64::NAN;
            }
            end_last - start_last
        } else {
            if end_last <= self.last_reset || start_prev <= self.second_to_last_reset {
                return f64::NAN;
            }
            end_last - start_prev
        }
    }
}
