//! Container decorator that repeats the refresh pass on a schedule.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::connection::ConnectionHandle;
use crate::container::{Container, ResourceContainer};
use crate::error::{Error, Result};
use crate::resource::ResourceState;
use crate::schedule::{Schedule, Trigger};

/// A [`Container`] whose refresh pass re-runs on every tick of a
/// [`Schedule`].
///
/// The first pass is synchronous and fail-fast. Later passes run in the
/// background; their errors are logged and the previous connections stay in
/// service. [`stop`](Self::stop) drains the trigger before closing anything.
pub struct ScheduledContainer {
    inner: Arc<Container>,
    schedule: Schedule,
    trigger: Mutex<Option<Trigger>>,
}

impl ScheduledContainer {
    /// Wrap `container` with `schedule`. Nothing runs until
    /// [`run`](Self::run).
    #[must_use]
    pub fn new(container: Container, schedule: Schedule) -> Self {
        Self {
            inner: Arc::new(container),
            schedule,
            trigger: Mutex::new(None),
        }
    }

    /// The refresh schedule.
    #[must_use]
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// The wrapped container.
    #[must_use]
    pub fn container(&self) -> &Container {
        &self.inner
    }

    /// Run the first pass, then start the trigger.
    ///
    /// Returns the first pass's error without starting the trigger. The
    /// trigger stops by itself once `cancel` is cancelled.
    ///
    /// # Errors
    /// [`Error::AlreadyRunning`] if the trigger was started before and not
    /// stopped.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<()> {
        let mut trigger = self.trigger.lock().await;
        if trigger.as_ref().is_some_and(Trigger::is_running) {
            return Err(Error::AlreadyRunning);
        }

        self.inner.run(cancel).await?;

        let container = Arc::clone(&self.inner);
        let pass_cancel = cancel.clone();
        *trigger = Some(Trigger::spawn(
            self.schedule.clone(),
            cancel.child_token(),
            move || {
                let container = Arc::clone(&container);
                let cancel = pass_cancel.clone();
                async move {
                    if let Err(error) = container.run(&cancel).await {
                        tracing::warn!(%error, "scheduled refresh failed");
                    }
                }
            },
        ));
        tracing::info!(schedule = %self.schedule, "refresh trigger started");
        Ok(())
    }

    /// Stop the trigger, wait for any in-flight pass, then close every
    /// connection.
    pub async fn stop(&self) {
        let trigger = self.trigger.lock().await.take();
        if let Some(trigger) = trigger {
            trigger.stop_and_drain().await;
            tracing::info!("refresh trigger stopped");
        }
        self.inner.stop().await;
    }
}

impl std::fmt::Debug for ScheduledContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledContainer")
            .field("schedule", &self.schedule.to_string())
            .field("inner", &self.inner)
            .finish()
    }
}

#[async_trait]
impl ResourceContainer for ScheduledContainer {
    async fn run(&self, cancel: &CancellationToken) -> Result<()> {
        ScheduledContainer::run(self, cancel).await
    }

    fn get(&self, name: &str) -> Option<ConnectionHandle> {
        self.inner.get(name)
    }

    fn state(&self, name: &str) -> Option<ResourceState> {
        self.inner.state(name)
    }

    fn names(&self) -> Vec<String> {
        self.inner.names()
    }

    async fn stop(&self) {
        ScheduledContainer::stop(self).await;
    }
}
