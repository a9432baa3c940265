//! Stochastic breakdowns calibrated to a target availability.

use tracing::debug;

use crate::config::BreakdownSources;
use crate::dist::{within_tolerance, ProbabilitySource};

#[derive(Debug)]
pub struct BreakdownGenerator {
    availability: f64,
    duration: Option<Box<dyn ProbabilitySource>>,
    inter_arrival: Option<Box<dyn ProbabilitySource>>,
    mean_inter_arrival: f64,
    hours_for_next_failure: f64,
    downtime_to_release_equipment: f64,
    pending: bool,
}

impl BreakdownGenerator {
    pub fn new(availability: f64, sources: BreakdownSources, downtime_to_release_equipment: f64) -> Self {
        Self {
            availability,
            duration: sources.duration,
            inter_arrival: sources.inter_arrival,
            mean_inter_arrival: f64::INFINITY,
            hours_for_next_failure: f64::INFINITY,
            downtime_to_release_equipment,
            pending: false,
        }
    }

    /// Derives the mean time between failures from the availability target.
    /// A configured inter-arrival source is rescaled to that mean rather than replaced.
    pub fn initialize(&mut self) {
        self.pending = false;
        let average = self
            .duration
            .as_ref()
            .map(|d| d.expected_value())
            .unwrap_or(0.0);

        if self.availability >= 1.0 || average == 0.0 {
            self.mean_inter_arrival = f64::INFINITY;
            return;
        }

        let target = average / (1.0 - self.availability) - average;
        self.mean_inter_arrival = match self.inter_arrival.as_mut() {
            Some(dist) => {
                let expected = dist.expected_value();
                if expected > 0.0 && !within_tolerance(expected, target) {
                    dist.set_value_factor(target / expected);
                    debug!(expected, target, "rescaled breakdown inter-arrival distribution");
                }
                dist.expected_value()
            }
            None => target,
        };
    }

    pub fn is_disabled(&self) -> bool {
        self.mean_inter_arrival.is_infinite()
    }

    pub fn availability(&self) -> f64 {
        self.availability
    }

    pub fn mean_inter_arrival(&self) -> f64 {
        self.mean_inter_arrival
    }

    /// Working hours until the next failure.
    pub fn next_inter_arrival_time(&mut self) -> f64 {
        if self.is_disabled() {
            return f64::INFINITY;
        }
        match self.inter_arrival.as_mut() {
            Some(dist) => dist.next_value(),
            None => self.mean_inter_arrival,
        }
    }

    pub fn next_breakdown_duration(&mut self) -> f64 {
        self.duration.as_mut().map(|d| d.next_value()).unwrap_or(0.0)
    }

    pub fn has_duration_distribution(&self) -> bool {
        self.duration.is_some()
    }

    pub fn schedule_next_failure(&mut self, working_hours: f64) {
        self.hours_for_next_failure = working_hours + self.next_inter_arrival_time();
    }

    pub fn hours_for_next_failure(&self) -> f64 {
        self.hours_for_next_failure
    }

    pub fn set_hours_for_next_failure(&mut self, hours: f64) {
        self.hours_for_next_failure = hours;
    }

    pub fn is_due(&self, working_hours: f64) -> bool {
        working_hours >= self.hours_for_next_failure
    }

    /// Shifts the threshold after working hours were zeroed by a statistics reset.
    pub fn rebase(&mut self, discarded_working_hours: f64) {
        self.hours_for_next_failure -= discarded_working_hours;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn set_pending(&mut self, pending: bool) {
        self.pending = pending;
    }

    pub fn releases_equipment(&self, downtime: f64) -> bool {
        downtime > self.downtime_to_release_equipment
    }
}
