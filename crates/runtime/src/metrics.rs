use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

#[derive(Clone, Default)]
pub struct MetricsRegistry {
    inner: Arc<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    resumptions: AtomicU64,
    callbacks_fired: AtomicU64,
    network_tasks: AtomicU64,
    calendar_maintenance: AtomicU64,
    operating_hours_maintenance: AtomicU64,
    breakdowns: AtomicU64,
    deferred_checks: AtomicU64,
    agenda_peak: AtomicU64,
}

impl MetricsRegistry {
    pub fn inc_resumptions(&self, delta: u64) {
        self.inner.resumptions.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_callbacks_fired(&self, delta: u64) {
        self.inner.callbacks_fired.fetch_add(delta, Ordering::Relaxed);
    }

    /// Counts one started task under the bucket for `kind` (see `Task::kind`).
    pub fn inc_task_started(&self, kind: &str) {
        let counter = match kind {
            "maintenance_network" => &self.inner.network_tasks,
            "calendar_maintenance" => &self.inner.calendar_maintenance,
            "operating_hours_maintenance" => &self.inner.operating_hours_maintenance,
            "breakdown" => &self.inner.breakdowns,
            "deferred_check" => &self.inner.deferred_checks,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_agenda_peak(&self, len: u64) {
        self.inner.agenda_peak.fetch_max(len, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            resumptions: self.inner.resumptions.load(Ordering::Relaxed),
            callbacks_fired: self.inner.callbacks_fired.load(Ordering::Relaxed),
            network_tasks: self.inner.network_tasks.load(Ordering::Relaxed),
            calendar_maintenance: self.inner.calendar_maintenance.load(Ordering::Relaxed),
            operating_hours_maintenance: self.inner.operating_hours_maintenance.load(Ordering::Relaxed),
            breakdowns: self.inner.breakdowns.load(Ordering::Relaxed),
            deferred_checks: self.inner.deferred_checks.load(Ordering::Relaxed),
            agenda_peak: self.inner.agenda_peak.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricsSnapshot {
    pub resumptions: u64,
    pub callbacks_fired: u64,
    pub network_tasks: u64,
    pub calendar_maintenance: u64,
    pub operating_hours_maintenance: u64,
    pub breakdowns: u64,
    pub deferred_checks: u64,
    pub agenda_peak: u64,
}

impl MetricsSnapshot {
    pub fn to_json_line(&self, label: &str, sim_hours: f64, elapsed: Option<Duration>) -> String {
        #[derive(Serialize)]
        struct Snapshot<'a> {
            label: &'a str,
            sim_hours: f64,
            #[serde(flatten)]
            counters: &'a MetricsSnapshot,
            elapsed_ms: Option<u128>,
        }

        let payload = Snapshot {
            label,
            sim_hours,
            counters: self,
            elapsed_ms: elapsed.map(|d| d.as_millis()),
        };
        serde_json::to_string(&payload).unwrap_or_else(|_| String::from("{}"))
    }
}

/// Wall-clock timer for a run.
pub struct RunTimer {
    start: Instant,
}

impl RunTimer {
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_kinds_land_in_their_buckets() {
        let metrics = MetricsRegistry::default();
        metrics.inc_task_started("breakdown");
        metrics.inc_task_started("breakdown");
        metrics.inc_task_started("calendar_maintenance");
        metrics.inc_task_started("unknown");
        metrics.record_agenda_peak(4);
        metrics.record_agenda_peak(2);
        let snap = metrics.snapshot();
        assert_eq!(snap.breakdowns, 2);
        assert_eq!(snap.calendar_maintenance, 1);
        assert_eq!(snap.agenda_peak, 4);
    }

    #[test]
    fn json_line_is_flat() {
        let metrics = MetricsRegistry::default();
        metrics.inc_callbacks_fired(3);
        let line = metrics.snapshot().to_json_line("run", 100.0, None);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["label"], "run");
        assert_eq!(value["callbacks_fired"], 3);
        assert_eq!(value["sim_hours"], 100.0);
    }
}
