//! Seeded probability sources for breakdown durations and inter-arrival times.

use av_core::ProbabilitySource;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Exp, Normal, Triangular, Uniform};
use serde::{Deserialize, Serialize};

/// Draws below zero from a normal source are redrawn this many times before clamping.
const NORMAL_REDRAWS: usize = 64;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DistError {
    #[error("{kind}: {reason}")]
    InvalidParameters { kind: &'static str, reason: String },
}

fn invalid(kind: &'static str, reason: impl ToString) -> DistError {
    DistError::InvalidParameters {
        kind,
        reason: reason.to_string(),
    }
}

/// Declarative form of a source, as it appears in scenario files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DistSpec {
    Constant { value: f64 },
    Uniform { min: f64, max: f64 },
    Exponential { mean: f64 },
    Triangular { min: f64, mode: f64, max: f64 },
    /// Truncated at zero.
    Normal { mean: f64, std_dev: f64 },
}

impl DistSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            DistSpec::Constant { .. } => "constant",
            DistSpec::Uniform { .. } => "uniform",
            DistSpec::Exponential { .. } => "exponential",
            DistSpec::Triangular { .. } => "triangular",
            DistSpec::Normal { .. } => "normal",
        }
    }

    pub fn mean(&self) -> f64 {
        match *self {
            DistSpec::Constant { value } => value,
            DistSpec::Uniform { min, max } => (min + max) / 2.0,
            DistSpec::Exponential { mean } => mean,
            DistSpec::Triangular { min, mode, max } => (min + mode + max) / 3.0,
            DistSpec::Normal { mean, .. } => mean,
        }
    }

    pub fn minimum(&self) -> f64 {
        match *self {
            DistSpec::Constant { value } => value,
            DistSpec::Uniform { min, .. } | DistSpec::Triangular { min, .. } => min,
            DistSpec::Exponential { .. } | DistSpec::Normal { .. } => 0.0,
        }
    }

    /// Builds a sampler for these parameters, scaled by `factor`.
    fn sampler(&self, factor: f64) -> Result<Sampler, DistError> {
        let kind = self.kind();
        let sampler = match *self {
            DistSpec::Constant { value } => Sampler::Constant(value * factor),
            DistSpec::Uniform { min, max } => {
                if !(min <= max) {
                    return Err(invalid(kind, format!("min {min} exceeds max {max}")));
                }
                Sampler::Uniform(Uniform::new_inclusive(min * factor, max * factor))
            }
            DistSpec::Exponential { mean } => {
                if !(mean > 0.0) {
                    return Err(invalid(kind, format!("mean must be positive, got {mean}")));
                }
                Sampler::Exponential(Exp::new(1.0 / (mean * factor)).map_err(|e| invalid(kind, e))?)
            }
            DistSpec::Triangular { min, mode, max } => Sampler::Triangular(
                Triangular::new(min * factor, max * factor, mode * factor).map_err(|e| invalid(kind, e))?,
            ),
            DistSpec::Normal { mean, std_dev } => {
                Sampler::Normal(Normal::new(mean * factor, std_dev * factor).map_err(|e| invalid(kind, e))?)
            }
        };
        Ok(sampler)
    }

    pub fn build(&self, seed: u64) -> Result<SeededSource, DistError> {
        Ok(SeededSource {
            spec: self.clone(),
            factor: 1.0,
            sampler: self.sampler(1.0)?,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn boxed(&self, seed: u64) -> Result<Box<dyn ProbabilitySource>, DistError> {
        Ok(Box::new(self.build(seed)?))
    }
}

#[derive(Debug, Clone)]
enum Sampler {
    Constant(f64),
    Uniform(Uniform<f64>),
    Exponential(Exp<f64>),
    Triangular(Triangular<f64>),
    Normal(Normal<f64>),
}

/// A [`DistSpec`] with its own random stream.
#[derive(Debug, Clone)]
pub struct SeededSource {
    spec: DistSpec,
    factor: f64,
    sampler: Sampler,
    rng: StdRng,
}

impl SeededSource {
    pub fn spec(&self) -> &DistSpec {
        &self.spec
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }
}

impl ProbabilitySource for SeededSource {
    fn next_value(&mut self) -> f64 {
        match &self.sampler {
            Sampler::Constant(v) => *v,
            Sampler::Uniform(d) => d.sample(&mut self.rng),
            Sampler::Exponential(d) => d.sample(&mut self.rng),
            Sampler::Triangular(d) => d.sample(&mut self.rng),
            Sampler::Normal(d) => {
                for _ in 0..NORMAL_REDRAWS {
                    let v = d.sample(&mut self.rng);
                    if v >= 0.0 {
                        return v;
                    }
                }
                0.0
            }
        }
    }

    fn expected_value(&self) -> f64 {
        self.spec.mean() * self.factor
    }

    fn minimum_value(&self) -> f64 {
        self.spec.minimum() * self.factor
    }

    fn set_value_factor(&mut self, factor: f64) {
        let scaled = self.factor * factor;
        // Parameters were valid at build time, so only a degenerate factor can fail here.
        if let Ok(sampler) = self.spec.sampler(scaled) {
            self.sampler = sampler;
            self.factor = scaled;
        }
    }
}
