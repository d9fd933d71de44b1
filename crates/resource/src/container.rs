//! Resource container: named providers, lazily created resources, and the
//! full refresh pass.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::connection::ConnectionHandle;
use crate::error::{Error, Result};
use crate::provider::Provider;
use crate::resource::{Resource, ResourceState};
use crate::schedule::Schedule;
use crate::scheduled::ScheduledContainer;

// ---------------------------------------------------------------------------
// ResourceContainer
// ---------------------------------------------------------------------------

/// Public surface shared by [`Container`] and [`ScheduledContainer`].
#[async_trait]
pub trait ResourceContainer: Send + Sync {
    /// Reconcile every registered resource against its provider.
    async fn run(&self, cancel: &CancellationToken) -> Result<()>;

    /// The live connection for `name`, if it has ever been provided.
    fn get(&self, name: &str) -> Option<ConnectionHandle>;

    /// Published state of `name`, if it has ever been provided.
    fn state(&self, name: &str) -> Option<ResourceState>;

    /// Registered resource names, in registration order.
    fn names(&self) -> Vec<String>;

    /// Close every connection. Callers must make sure no pass is running.
    async fn stop(&self);
}

// ---------------------------------------------------------------------------
// Container
// ---------------------------------------------------------------------------

/// One-shot reconciler over a fixed set of named providers.
///
/// Resources are created on the first reconciliation attempt for their name
/// and are never removed.
pub struct Container {
    providers: IndexMap<String, Arc<dyn Provider>>,
    resources: DashMap<String, Arc<Resource>>,
    retirements: TaskTracker,
}

impl Container {
    /// Create a container over `providers`.
    #[must_use]
    pub fn new(providers: IndexMap<String, Arc<dyn Provider>>) -> Self {
        Self {
            providers,
            resources: DashMap::new(),
            retirements: TaskTracker::new(),
        }
    }

    /// Reconcile one registered name.
    ///
    /// Returns `Ok(false)` when `name` has no provider.
    pub async fn reconcile(&self, cancel: &CancellationToken, name: &str) -> Result<bool> {
        let Some(provider) = self.providers.get(name) else {
            return Ok(false);
        };
        self.resource(name)
            .reconcile(cancel, provider.as_ref())
            .await?;
        Ok(true)
    }

    /// One full pass, aborting on the first failure.
    ///
    /// Resources applied earlier in the pass keep their new connection when a
    /// later one fails or the pass is cancelled.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<()> {
        for (name, provider) in &self.providers {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled {
                    resource_id: name.clone(),
                });
            }
            self.resource(name)
                .reconcile(cancel, provider.as_ref())
                .await?;
        }
        Ok(())
    }

    /// Non-blocking lookup; never creates a resource.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ConnectionHandle> {
        self.resources.get(name)?.connection()
    }

    /// Published state of `name`.
    #[must_use]
    pub fn state(&self, name: &str) -> Option<ResourceState> {
        self.resources.get(name)?.state()
    }

    /// Registered names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    /// Close every connection, then wait for pending retirements.
    pub async fn stop(&self) {
        // Clone the Arcs so no shard lock is held across the awaits below.
        let resources: Vec<Arc<Resource>> = self
            .resources
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        for resource in resources {
            if let Err(error) = resource.close().await {
                tracing::error!(resource = resource.name(), %error, "failed to close connection");
            }
        }

        self.retirements.close();
        self.retirements.wait().await;
        self.retirements.reopen();
    }

    /// Insert-if-absent; concurrent first callers share one resource.
    fn resource(&self, name: &str) -> Arc<Resource> {
        if let Some(existing) = self.resources.get(name) {
            return Arc::clone(existing.value());
        }
        let entry = self
            .resources
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Resource::new(name, self.retirements.clone())));
        Arc::clone(entry.value())
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .field("resources", &self.resources.len())
            .finish()
    }
}

#[async_trait]
impl ResourceContainer for Container {
    async fn run(&self, cancel: &CancellationToken) -> Result<()> {
        Container::run(self, cancel).await
    }

    fn get(&self, name: &str) -> Option<ConnectionHandle> {
        Container::get(self, name)
    }

    fn state(&self, name: &str) -> Option<ResourceState> {
        Container::state(self, name)
    }

    fn names(&self) -> Vec<String> {
        Container::names(self)
    }

    async fn stop(&self) {
        Container::stop(self).await;
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Container settings read from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Refresh schedule: a cron expression with a seconds field, or
    /// `@every <duration>`. Absent or blank disables periodic refresh.
    pub schedule: Option<String>,
}

/// Builds a [`ResourceContainer`], scheduled or not.
#[derive(Default)]
pub struct ContainerBuilder {
    providers: IndexMap<String, Arc<dyn Provider>>,
    schedule: Option<String>,
}

impl ContainerBuilder {
    /// Start with no providers and no schedule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from configuration.
    #[must_use]
    pub fn from_config(config: ContainerConfig) -> Self {
        Self {
            providers: IndexMap::new(),
            schedule: config.schedule,
        }
    }

    /// Register a provider. A later registration under the same name
    /// replaces the earlier one.
    #[must_use]
    pub fn provider(mut self, name: impl Into<String>, provider: impl Provider) -> Self {
        self.providers.insert(name.into(), Arc::new(provider));
        self
    }

    /// Register a provider that is already shared.
    #[must_use]
    pub fn shared_provider(mut self, name: impl Into<String>, provider: Arc<dyn Provider>) -> Self {
        self.providers.insert(name.into(), provider);
        self
    }

    /// Set or clear the refresh schedule.
    #[must_use]
    pub fn schedule(mut self, expression: Option<impl Into<String>>) -> Self {
        self.schedule = expression.map(Into::into);
        self
    }

    /// Build a plain [`Container`].
    #[must_use]
    pub fn build_container(self) -> Container {
        Container::new(self.providers)
    }

    /// Build the container, wrapped in a [`ScheduledContainer`] when a
    /// non-blank schedule is set.
    ///
    /// # Errors
    /// Returns [`Error::InvalidSchedule`] when the schedule does not parse.
    pub fn build(self) -> Result<Arc<dyn ResourceContainer>> {
        let schedule = match self.schedule.as_deref().map(str::trim) {
            Some(expr) if !expr.is_empty() => Some(expr.parse::<Schedule>()?),
            _ => None,
        };
        let container = Container::new(self.providers);
        Ok(match schedule {
            Some(schedule) => Arc::new(ScheduledContainer::new(container, schedule)),
            None => Arc::new(container),
        })
    }
}

impl std::fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .field("schedule", &self.schedule)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
