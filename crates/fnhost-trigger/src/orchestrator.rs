//! Trigger orchestration.
//!
//! [`TriggerOrchestrator`] owns the live bindings: the HTTP route table and
//! the shared scheduler. A function is bound to at most one of them; binding
//! again replaces whatever was there before.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use fnhost_common::RuntimeError;
use fnhost_core::{FunctionInvoker, FunctionMetadata, FunctionName, Invocation, Trigger};

use crate::routes::RouteTable;
use crate::scheduler::{ScheduledJob, Scheduler};

/// Live binding of one function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Binding {
    /// Registered but not reachable.
    Unbound,
    /// Served on `route`.
    Http {
        /// Request path, `/<name>`.
        route: String,
    },
    /// Fired by the scheduler.
    Schedule {
        /// Cron expression.
        expression: String,
        /// Next fire time, if any.
        next_fire: Option<DateTime<Utc>>,
    },
}

impl Binding {
    /// Returns `true` unless [`Binding::Unbound`].
    pub fn is_bound(&self) -> bool {
        !matches!(self, Self::Unbound)
    }
}

/// Binds functions to routes or schedules and dispatches activations.
pub struct TriggerOrchestrator {
    invoker: Arc<dyn FunctionInvoker>,
    routes: RouteTable,
    scheduler: Scheduler,
}

impl std::fmt::Debug for TriggerOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerOrchestrator")
            .field("routes", &self.routes)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl TriggerOrchestrator {
    /// Create an orchestrator and start its scheduler.
    ///
    /// Must be called within a Tokio runtime.
    pub fn new(invoker: Arc<dyn FunctionInvoker>) -> Self {
        let scheduler = Scheduler::new(invoker.clone());
        Self::with_scheduler(invoker, scheduler)
    }

    /// Create an orchestrator around an existing scheduler.
    pub fn with_scheduler(invoker: Arc<dyn FunctionInvoker>, scheduler: Scheduler) -> Self {
        Self {
            invoker,
            routes: RouteTable::new(),
            scheduler,
        }
    }

    /// Get the route table.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Get the scheduler.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Bind `name` to `trigger`, replacing any prior binding.
    ///
    /// [`Trigger::None`] only removes the prior binding.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Validation`] if `name` is not a valid
    /// function name.
    #[instrument(skip(self, trigger), fields(trigger = %trigger))]
    pub fn bind(&self, name: &str, trigger: &Trigger) -> Result<Binding, RuntimeError> {
        let name = FunctionName::parse(name)?;
        let route = name.route();

        let binding = match trigger {
            Trigger::None => {
                self.unbind(name.as_str());
                Binding::Unbound
            }
            Trigger::Http => {
                self.scheduler.unschedule(name.as_str());
                self.routes.insert(route.clone(), name.as_str());
                Binding::Http { route }
            }
            Trigger::Schedule(schedule) => {
                self.routes.remove(&route);
                let next_fire = self.scheduler.schedule(name.as_str(), schedule.clone());
                Binding::Schedule {
                    expression: schedule.expression().to_string(),
                    next_fire,
                }
            }
        };

        info!(function = %name, kind = trigger.kind(), "Trigger bound");
        Ok(binding)
    }

    /// Remove any binding for `name`. Returns `true` if one existed.
    pub fn unbind(&self, name: &str) -> bool {
        let routed = self.routes.remove(&format!("/{name}")).is_some();
        let scheduled = self.scheduler.unschedule(name);
        routed || scheduled
    }

    /// Current binding of `name`.
    pub fn binding(&self, name: &str) -> Binding {
        let route = format!("/{name}");
        if self.routes.contains(&route) {
            return Binding::Http { route };
        }
        self.scheduler
            .jobs()
            .into_iter()
            .find(|job| job.function == name)
            .map_or(Binding::Unbound, |job| Binding::Schedule {
                expression: job.expression,
                next_fire: job.next_fire,
            })
    }

    /// Run the function routed on `path`.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::FunctionNotFound`] if no function is routed on
    ///   `path`
    /// - whatever the invoker returns
    pub async fn invoke_route(&self, path: &str) -> Result<Invocation, RuntimeError> {
        let Some(function) = self.routes.resolve(path) else {
            return Err(RuntimeError::function_not_found(path.trim_start_matches('/')));
        };
        self.invoker.invoke(&function).await
    }

    /// All scheduled functions.
    pub fn scheduled(&self) -> Vec<ScheduledJob> {
        self.scheduler.jobs()
    }

    /// Re-bind every entry of a loaded registry.
    ///
    /// Entries with an unparsable trigger are skipped with a warning.
    /// Returns the number of functions bound to a route or schedule.
    pub fn restore<'a>(&self, entries: impl IntoIterator<Item = &'a FunctionMetadata>) -> usize {
        let mut bound = 0;
        for entry in entries {
            let result =
                Trigger::parse(&entry.trigger).and_then(|trigger| self.bind(&entry.name, &trigger));
            match result {
                Ok(binding) if binding.is_bound() => bound += 1,
                Ok(_) => {}
                Err(e) => warn!(function = %entry.name, error = %e, "Skipping binding on restore"),
            }
        }
        info!(bound, "Trigger bindings restored");
        bound
    }
}
