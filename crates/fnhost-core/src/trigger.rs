//! Trigger parsing.
//!
//! A trigger string is one of:
//! - empty: the function is registered but not reachable
//! - `"http"`: the function is served on `/<name>`
//! - a 5-field cron expression: the function runs on a recurring schedule
//!
//! Parsing happens before anything touches the filesystem, so a bad cron
//! expression is a validation error rather than a half-registered function.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use croner::Cron;

use fnhost_common::RuntimeError;

/// Literal trigger value for HTTP-bound functions.
pub const HTTP_TRIGGER: &str = "http";

/// Number of fields in an accepted cron expression.
const CRON_FIELDS: usize = 5;

/// Parsed activation mechanism for a function.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// No activation; the function is registered but unreachable.
    None,
    /// Served on the route `/<name>`.
    Http,
    /// Fired on a recurring schedule.
    Schedule(CronSchedule),
}

impl Trigger {
    /// Parse a raw trigger string.
    pub fn parse(raw: &str) -> Result<Self, RuntimeError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::None);
        }
        if raw == HTTP_TRIGGER {
            return Ok(Self::Http);
        }
        CronSchedule::parse(raw).map(Self::Schedule)
    }

    /// Short label used in logs and listings.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Http => "http",
            Self::Schedule(_) => "schedule",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Http => f.write_str(HTTP_TRIGGER),
            Self::Schedule(schedule) => f.write_str(schedule.expression()),
        }
    }
}

/// A validated 5-field cron expression.
///
/// Fields are minute, hour, day-of-month, month and day-of-week, with the
/// usual wildcards, ranges, lists and steps. Times are evaluated in UTC.
#[derive(Clone)]
pub struct CronSchedule {
    expression: String,
    cron: Arc<Cron>,
}

impl CronSchedule {
    /// Parse and validate an expression.
    pub fn parse(expression: &str) -> Result<Self, RuntimeError> {
        let expression = expression.trim();
        let fields = expression.split_whitespace().count();
        if fields != CRON_FIELDS {
            return Err(RuntimeError::validation(format!(
                "cron expression '{expression}' must have {CRON_FIELDS} fields, found {fields}"
            )));
        }

        let cron = Cron::new(expression).parse().map_err(|e| {
            RuntimeError::validation(format!("invalid cron expression '{expression}': {e}"))
        })?;

        Ok(Self {
            expression: expression.to_string(),
            cron: Arc::new(cron),
        })
    }

    /// The expression as submitted (trimmed).
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First fire time strictly after `after`.
    ///
    /// Returns `None` if the expression can never fire (e.g. `0 0 31 2 *`).
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.cron.find_next_occurrence(&after, false).ok()
    }
}

impl fmt::Debug for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CronSchedule")
            .field("expression", &self.expression)
            .finish_non_exhaustive()
    }
}
