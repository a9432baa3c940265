//! Runtime bootstrap and the discrete-event executor that drives availability tasks.

use tracing_subscriber::EnvFilter;

pub mod executor;
pub mod metrics;

pub use executor::{Callback, Clock, Executor};
pub use metrics::{MetricsRegistry, MetricsSnapshot, RunTimer};

/// Installs the fmt subscriber. `RUST_LOG` picks the filter; without it only
/// `info` and above are shown.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
