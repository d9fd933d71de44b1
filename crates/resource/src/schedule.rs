//! Recurring refresh schedules and the background trigger that runs them.
//!
//! Two expression forms are accepted:
//! - cron with a leading seconds field, e.g. `*/5 * * * * *`, evaluated in
//!   local time;
//! - `@every <duration>`, e.g. `@every 30s` or `@every 1m30s`.

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use chrono::Local;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

const EVERY_PREFIX: &str = "@every";

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// A parsed refresh schedule.
#[derive(Debug, Clone)]
pub enum Schedule {
    /// Cron expression with seconds resolution.
    Cron {
        /// The expression as written.
        expression: String,
        /// Parsed form.
        schedule: Box<cron::Schedule>,
    },
    /// Fixed delay between the end of one run and the start of the next.
    Every(Duration),
}

impl Schedule {
    /// Time to wait from now until the next fire, or `None` when the
    /// schedule has no future occurrence.
    #[must_use]
    pub fn next_delay(&self) -> Option<Duration> {
        match self {
            Self::Every(period) => Some(*period),
            Self::Cron { schedule, .. } => {
                let now = Local::now();
                let next = schedule.after(&now).next()?;
                Some((next - now).to_std().unwrap_or(Duration::ZERO))
            }
        }
    }
}

impl FromStr for Schedule {
    type Err = Error;

    fn from_str(expression: &str) -> Result<Self> {
        let expr = expression.trim();
        let invalid = |reason: String| Error::InvalidSchedule {
            expression: expression.to_string(),
            reason,
        };

        if let Some(rest) = expr.strip_prefix(EVERY_PREFIX) {
            let period = humantime::parse_duration(rest.trim())
                .map_err(|e| invalid(e.to_string()))?;
            if period.is_zero() {
                return Err(invalid("period must be greater than zero".to_string()));
            }
            return Ok(Self::Every(period));
        }

        cron::Schedule::from_str(expr)
            .map(|schedule| Self::Cron {
                expression: expr.to_string(),
                schedule: Box::new(schedule),
            })
            .map_err(|e| invalid(e.to_string()))
    }
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cron { expression, .. } => f.write_str(expression),
            Self::Every(period) => {
                write!(f, "{EVERY_PREFIX} {}", humantime::format_duration(*period))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

/// Background task that runs a job on every tick of a [`Schedule`].
///
/// Runs never overlap: the next delay is computed after the previous run
/// finishes. [`stop_and_drain`](Self::stop_and_drain) lets an in-flight run
/// complete before returning.
pub struct Trigger {
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Trigger {
    /// Spawn the trigger. It also stops when `cancel` is cancelled.
    pub fn spawn<F, Fut>(schedule: Schedule, cancel: CancellationToken, job: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Some(delay) = schedule.next_delay() else {
                    tracing::debug!(%schedule, "schedule exhausted");
                    break;
                };
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    () = tokio::time::sleep(delay) => {}
                }
                job().await;
            }
        });

        Self {
            cancel,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Whether the trigger task is still scheduled to run.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop scheduling new runs and wait for the current one to finish.
    pub async fn stop_and_drain(&self) {
        self.cancel.cancel();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(error) = handle.await {
                tracing::error!(%error, "refresh trigger task failed");
            }
        }
    }
}

impl Drop for Trigger {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trigger")
            .field("running", &self.is_running())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
