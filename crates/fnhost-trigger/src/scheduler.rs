//! Shared cron scheduler.
//!
//! One background task serves every cron-bound function. It keeps
//! `function -> (schedule, next fire)` and sleeps until the earliest fire
//! time, waking early whenever the set of jobs changes.
//!
//! Each due job is run on its own task, so a slow or failing run never
//! delays the next tick of the same or any other function. Runs may
//! overlap. Fire times missed while the process was busy or down are
//! skipped: the next fire is always computed from "now".
//!
//! Results of scheduled runs are only logged.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};

use fnhost_core::{CronSchedule, FunctionInvoker};

/// Upper bound on how long the loop sleeps without re-checking the clock.
const MAX_IDLE: Duration = Duration::from_secs(60);

/// Public view of one scheduled function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledJob {
    /// Function name.
    pub function: String,
    /// Cron expression.
    pub expression: String,
    /// Next fire time, or `None` if the expression never fires again.
    pub next_fire: Option<DateTime<Utc>>,
}

struct Job {
    schedule: CronSchedule,
    next_fire: Option<DateTime<Utc>>,
}

struct Shared {
    jobs: Mutex<HashMap<String, Job>>,
    changed: Notify,
    invoker: Arc<dyn FunctionInvoker>,
}

/// Handle to the scheduler task.
///
/// Dropping the handle stops the loop. Runs already started keep going.
pub struct Scheduler {
    shared: Arc<Shared>,
    task: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Start the scheduler loop.
    ///
    /// Must be called within a Tokio runtime.
    pub fn new(invoker: Arc<dyn FunctionInvoker>) -> Self {
        let mut scheduler = Self::manual(invoker);
        scheduler.task = Some(tokio::spawn(run(scheduler.shared.clone())));
        scheduler
    }

    /// A scheduler without a loop: jobs only fire through
    /// [`fire_due`](Self::fire_due).
    pub fn manual(invoker: Arc<dyn FunctionInvoker>) -> Self {
        Self {
            shared: Arc::new(Shared {
                jobs: Mutex::new(HashMap::new()),
                changed: Notify::new(),
                invoker,
            }),
            task: None,
        }
    }

    /// Schedule `function`, replacing any existing schedule for it.
    ///
    /// Returns the first fire time.
    pub fn schedule(&self, function: &str, schedule: CronSchedule) -> Option<DateTime<Utc>> {
        let next_fire = schedule.next_after(Utc::now());
        if next_fire.is_none() {
            warn!(
                function,
                expression = schedule.expression(),
                "Cron expression has no future fire time"
            );
        }

        let expression = schedule.expression().to_string();
        let replaced = self
            .shared
            .jobs
            .lock()
            .insert(
                function.to_string(),
                Job {
                    schedule,
                    next_fire,
                },
            )
            .is_some();
        self.shared.changed.notify_one();

        debug!(function, expression, ?next_fire, replaced, "Function scheduled");
        next_fire
    }

    /// Stop scheduling `function`. Returns `true` if it was scheduled.
    pub fn unschedule(&self, function: &str) -> bool {
        let removed = self.shared.jobs.lock().remove(function).is_some();
        if removed {
            self.shared.changed.notify_one();
            debug!(function, "Function unscheduled");
        }
        removed
    }

    /// Returns `true` if `function` has a schedule.
    pub fn is_scheduled(&self, function: &str) -> bool {
        self.shared.jobs.lock().contains_key(function)
    }

    /// Next fire time of `function`.
    pub fn next_fire(&self, function: &str) -> Option<DateTime<Utc>> {
        self.shared
            .jobs
            .lock()
            .get(function)
            .and_then(|job| job.next_fire)
    }

    /// All scheduled functions, sorted by name.
    pub fn jobs(&self) -> Vec<ScheduledJob> {
        let mut jobs: Vec<_> = self
            .shared
            .jobs
            .lock()
            .iter()
            .map(|(function, job)| ScheduledJob {
                function: function.clone(),
                expression: job.schedule.expression().to_string(),
                next_fire: job.next_fire,
            })
            .collect();
        jobs.sort_by(|a, b| a.function.cmp(&b.function));
        jobs
    }

    /// Number of scheduled functions.
    pub fn len(&self) -> usize {
        self.shared.jobs.lock().len()
    }

    /// Returns `true` if nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start a run of every job due at `now` and advance their fire times.
    ///
    /// The loop calls this on every wake-up. Returns one handle per started
    /// run. Must be called within a Tokio runtime.
    pub fn fire_due(&self, now: DateTime<Utc>) -> Vec<JoinHandle<()>> {
        self.shared.fire_due(now)
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("jobs", &self.len())
            .finish_non_exhaustive()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

impl Shared {
    fn fire_due(&self, now: DateTime<Utc>) -> Vec<JoinHandle<()>> {
        let due: Vec<String> = {
            let mut jobs = self.jobs.lock();
            jobs.iter_mut()
                .filter(|(_, job)| job.next_fire.is_some_and(|at| at <= now))
                .map(|(function, job)| {
                    job.next_fire = job.schedule.next_after(now);
                    function.clone()
                })
                .collect()
        };

        due.into_iter()
            .map(|function| {
                let invoker = self.invoker.clone();
                let span = info_span!("scheduled_run", function = %function, fired_at = %now);
                tokio::spawn(
                    async move {
                        match invoker.invoke(&function).await {
                            Ok(invocation) => info!(
                                invocation_id = %invocation.id,
                                duration_ms = invocation.duration.as_millis(),
                                output = %invocation.output_lossy(),
                                "Scheduled run finished"
                            ),
                            Err(e) => error!(error = %e, "Scheduled run failed"),
                        }
                    }
                    .instrument(span),
                )
            })
            .collect()
    }

    fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.jobs.lock().values().filter_map(|job| job.next_fire).min()
    }
}

async fn run(shared: Arc<Shared>) {
    debug!("Scheduler started");
    loop {
        shared.fire_due(Utc::now());

        let idle = shared.next_deadline().map_or(MAX_IDLE, |at| {
            (at - Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO)
                .min(MAX_IDLE)
        });

        tokio::select! {
            () = tokio::time::sleep(idle) => {}
            () = shared.changed.notified() => {}
        }
    }
}
