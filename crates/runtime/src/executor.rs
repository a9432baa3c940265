//! Single-threaded discrete-event executor for cooperative core tasks.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use anyhow::Result;
use av_core::{EntityId, Process, Scheduler, SimTime, Task, TIME_TOLERANCE};
use tracing::{debug, trace};

use crate::metrics::MetricsRegistry;

/// A callback fired on a fixed period, e.g. to poll availability or to move
/// entities between working and idle.
pub type Callback<M> = Box<dyn FnMut(&mut M, &mut dyn Scheduler) -> Result<()>>;

#[derive(Debug, Clone, Copy)]
enum Payload {
    Resume(EntityId, Task),
    Callback(usize),
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    time: SimTime,
    seq: u64,
    payload: Payload,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Reversed so the max-heap pops the earliest time, then the earliest insertion.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// The part of the executor that tasks see through [`Scheduler`].
pub struct Clock {
    now: SimTime,
    seq: u64,
    agenda: BinaryHeap<Entry>,
    end_of_instant: VecDeque<(EntityId, Task)>,
    metrics: MetricsRegistry,
}

impl Clock {
    fn push(&mut self, time: SimTime, payload: Payload) {
        self.seq += 1;
        self.agenda.push(Entry {
            time,
            seq: self.seq,
            payload,
        });
        self.metrics.record_agenda_peak(self.agenda.len() as u64);
    }

    pub fn pending(&self) -> usize {
        self.agenda.len() + self.end_of_instant.len()
    }
}

impl Scheduler for Clock {
    fn now(&self) -> SimTime {
        self.now
    }

    fn schedule_wait(&mut self, entity: EntityId, dt: SimTime, task: Task) {
        if !dt.is_finite() {
            trace!(%entity, kind = task.kind(), "task suspended forever");
            return;
        }
        let time = self.now + dt.max(0.0);
        self.push(time, Payload::Resume(entity, task));
    }

    fn schedule_last_in_current_instant(&mut self, entity: EntityId, task: Task) {
        self.end_of_instant.push_back((entity, task));
    }

    fn task_started(&mut self, entity: EntityId, task: &Task) {
        trace!(%entity, kind = task.kind(), now = self.now, "task started");
        self.metrics.inc_task_started(task.kind());
    }
}

struct Periodic<M> {
    interval: SimTime,
    callback: Callback<M>,
}

pub struct Executor<M> {
    clock: Clock,
    periodic: Vec<Periodic<M>>,
}

impl<M: Process> Executor<M> {
    pub fn new(metrics: MetricsRegistry) -> Self {
        Self {
            clock: Clock {
                now: 0.0,
                seq: 0,
                agenda: BinaryHeap::new(),
                end_of_instant: VecDeque::new(),
                metrics,
            },
            periodic: Vec::new(),
        }
    }

    pub fn now(&self) -> SimTime {
        self.clock.now
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.clock.metrics
    }

    /// Scheduler handle for starting work outside a run, e.g. `Plant::initialize`.
    pub fn scheduler(&mut self) -> &mut dyn Scheduler {
        &mut self.clock
    }

    pub fn pending(&self) -> usize {
        self.clock.pending()
    }

    /// Fires `callback` at `first` and every `interval` hours after.
    pub fn every(
        &mut self,
        first: SimTime,
        interval: SimTime,
        callback: impl FnMut(&mut M, &mut dyn Scheduler) -> Result<()> + 'static,
    ) -> Result<()> {
        anyhow::ensure!(interval > 0.0, "callback interval must be positive, got {interval}");
        let index = self.periodic.len();
        self.periodic.push(Periodic {
            interval,
            callback: Box::new(callback),
        });
        self.clock.push(first.max(self.clock.now), Payload::Callback(index));
        Ok(())
    }

    /// Processes every event up to and including `horizon`, then advances the clock to it.
    pub fn run_until(&mut self, model: &mut M, horizon: SimTime) -> Result<()> {
        debug!(from = self.clock.now, horizon, pending = self.pending(), "run started");
        loop {
            let next = self.clock.agenda.peek().map(|e| e.time);
            let same_instant = next.map_or(false, |t| t <= self.clock.now + TIME_TOLERANCE);
            if !same_instant {
                if let Some((entity, task)) = self.clock.end_of_instant.pop_front() {
                    self.resume(model, entity, task)?;
                    continue;
                }
            }

            match next {
                Some(t) if t <= horizon => {}
                _ => break,
            }
            let Some(entry) = self.clock.agenda.pop() else { break };
            self.clock.now = self.clock.now.max(entry.time);
            match entry.payload {
                Payload::Resume(entity, task) => self.resume(model, entity, task)?,
                Payload::Callback(index) => self.fire(model, index)?,
            }
        }
        self.clock.now = self.clock.now.max(horizon);
        debug!(now = self.clock.now, pending = self.pending(), "run paused");
        Ok(())
    }

    fn resume(&mut self, model: &mut M, entity: EntityId, task: Task) -> Result<()> {
        self.clock.metrics.inc_resumptions(1);
        model.run_task(entity, task, &mut self.clock)?;
        Ok(())
    }

    fn fire(&mut self, model: &mut M, index: usize) -> Result<()> {
        let Some(periodic) = self.periodic.get_mut(index) else {
            anyhow::bail!("no periodic callback {index}");
        };
        (periodic.callback)(model, &mut self.clock)?;
        let next = self.clock.now + periodic.interval;
        self.clock.push(next, Payload::Callback(index));
        self.clock.metrics.inc_callbacks_fired(1);
        Ok(())
    }
}
