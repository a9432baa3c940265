//! Probability source seam.

/// A stochastic source of non-negative hours: breakdown durations and
/// inter-arrival times. Implementations live outside the core.
pub trait ProbabilitySource: std::fmt::Debug {
    /// One draw.
    fn next_value(&mut self) -> f64;

    fn expected_value(&self) -> f64;

    /// Lower bound of the support; a negative value disqualifies the source.
    fn minimum_value(&self) -> f64;

    /// Multiplies the present scale of every subsequent draw (and of the
    /// expected value) by `factor`.
    fn set_value_factor(&mut self, factor: f64);
}

/// Relative-or-absolute closeness used when checking calibrated means.
pub fn within_tolerance(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1.0e-6 * b.abs().max(1.0)
}
