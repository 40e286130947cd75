//! Cooperative suite scheduler
//!
//! The scheduler never drives a suite's tests itself. On each poll tick it
//! looks at the head of its queue:
//!
//! | head status | action |
//! |---|---|
//! | none (queue empty) | finish the run, emit `hiro.onComplete` |
//! | `Ready` | start the suite's progress (setup, then tests) |
//! | `Done` | release the suite's sandbox, dequeue it |
//! | anything else | wait for the next tick |
//!
//! Suite progress runs concurrently with the ticker on the same task, so
//! an asynchronous setup hook never blocks the poll loop.

use crate::error::{HiroError, HiroResult};
use crate::events::{Event, EventBus};
use crate::registry::Registry;
use crate::status::Status;
use crate::suite::Suite;
use futures_util::future::LocalBoxFuture;
use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt, StreamExt};
use hiro_config::{Config, DEFAULT_POLL_INTERVAL_MS};
use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Scheduler settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    poll_interval: Duration,
}

impl SchedulerConfig {
    /// Create settings with the given poll period, which must be non-zero
    pub fn new(poll_interval: Duration) -> HiroResult<Self> {
        if poll_interval.is_zero() {
            return Err(HiroError::InvalidPollInterval);
        }
        Ok(Self { poll_interval })
    }

    /// Settings from a loaded configuration
    pub fn from_config(config: &Config) -> HiroResult<Self> {
        Self::new(config.poll_interval())
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

type Progress = FuturesUnordered<LocalBoxFuture<'static, ()>>;

/// Runs the suites of a registry one after another
#[derive(Debug)]
pub struct Scheduler {
    bus: Rc<EventBus>,
    registry: Rc<Registry>,
    config: SchedulerConfig,
    status: Cell<Status>,
}

/// Puts an abandoned run back to `Ready` so the scheduler can be reused
///
/// Every suite the run picked up that has not finished goes back to `Ready`
/// as well; otherwise a suite stuck in `Waiting` would hold the head of the
/// next run's queue forever.
struct RunGuard<'a> {
    status: &'a Cell<Status>,
    suites: Vec<Rc<Suite>>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.status.get() == Status::Done {
            return;
        }
        self.status.set(Status::Ready);
        for suite in &self.suites {
            if suite.status().is_done() {
                suite.release_sandbox();
            } else {
                suite.reset();
            }
        }
        warn!(suites = self.suites.len(), "run abandoned");
    }
}

impl Scheduler {
    pub fn new(bus: Rc<EventBus>, registry: Rc<Registry>, config: SchedulerConfig) -> Self {
        Self {
            bus,
            registry,
            config,
            status: Cell::new(Status::Ready),
        }
    }

    /// Global run status
    pub fn status(&self) -> Status {
        self.status.get()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run every registered suite, or only the suite named `filter`
    ///
    /// Resolves once the queue is exhausted and `hiro.onComplete` has been
    /// emitted. Suites that already finished in an earlier run are released
    /// and skipped, never run again. Dropping the future abandons the run and
    /// puts its unfinished suites back to `Ready`.
    pub async fn run(&self, filter: Option<&str>) -> HiroResult<()> {
        if self.status.get() == Status::Running {
            return Err(HiroError::AlreadyRunning);
        }

        self.status.set(Status::Running);
        let mut guard = RunGuard {
            status: &self.status,
            suites: Vec::new(),
        };

        self.bus.trigger(&Event::HiroStart);

        guard.suites = self.registry.matching(filter);
        let mut queue: VecDeque<Rc<Suite>> = guard.suites.iter().cloned().collect();
        info!(suites = queue.len(), filter = ?filter, "run started");

        let period = self.config.poll_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut progress = Progress::new();
        loop {
            tokio::select! {
                biased;
                Some(()) = progress.next(), if !progress.is_empty() => {}
                _ = ticker.tick() => {
                    if !self.tick(&mut queue, &mut progress) {
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// One poll tick. Returns false once the run is complete.
    fn tick(&self, queue: &mut VecDeque<Rc<Suite>>, progress: &mut Progress) -> bool {
        let Some(suite) = queue.front().cloned() else {
            self.status.set(Status::Done);
            info!("run complete");
            self.bus.trigger(&Event::HiroComplete);
            return false;
        };

        match suite.status() {
            Status::Ready => {
                debug!(suite = suite.name(), "preparing suite");
                let bus = Rc::clone(&self.bus);
                progress.push(
                    async move {
                        suite.prepare(&bus).await;
                        suite.run(&bus);
                    }
                    .boxed_local(),
                );
            }
            Status::Done => {
                if suite.release_sandbox() {
                    debug!(suite = suite.name(), "sandbox released");
                }
                queue.pop_front();
            }
            Status::Waiting | Status::Running | Status::Paused => {}
        }
        true
    }
}
