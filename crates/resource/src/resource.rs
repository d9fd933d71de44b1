//! A single named connection slot and its reconciliation against a provider.
//!
//! Readers load the published [`Applied`] record lock-free. Mutators of the
//! same resource are serialized by a per-resource async mutex, so the
//! fingerprint comparison and the publish act as one step.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::connection::ConnectionHandle;
use crate::error::{Error, Result};
use crate::provider::Provider;

/// The connection currently in service together with the fingerprint it was
/// built from. Published and replaced as a whole.
#[derive(Debug)]
struct Applied {
    connection: ConnectionHandle,
    fingerprint: String,
    updated_at: DateTime<Utc>,
}

/// Point-in-time view of a resource, for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceState {
    /// Resource name.
    pub name: String,
    /// Fingerprint of the connection in service.
    pub fingerprint: String,
    /// When that connection was published.
    pub updated_at: DateTime<Utc>,
}

/// One named connection slot.
pub struct Resource {
    name: String,
    current: ArcSwapOption<Applied>,
    reconcile_lock: Mutex<()>,
    retirements: TaskTracker,
}

impl Resource {
    /// Create an empty slot. Superseded connections are closed on tasks
    /// spawned through `retirements`.
    #[must_use]
    pub fn new(name: impl Into<String>, retirements: TaskTracker) -> Self {
        Self {
            name: name.into(),
            current: ArcSwapOption::empty(),
            reconcile_lock: Mutex::new(()),
            retirements,
        }
    }

    /// Resource name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The connection in service, if any reconciliation has succeeded.
    #[must_use]
    pub fn connection(&self) -> Option<ConnectionHandle> {
        self.current
            .load_full()
            .map(|applied| applied.connection.clone())
    }

    /// Fingerprint of the connection in service.
    #[must_use]
    pub fn fingerprint(&self) -> Option<String> {
        self.current
            .load_full()
            .map(|applied| applied.fingerprint.clone())
    }

    /// Snapshot of the published state.
    #[must_use]
    pub fn state(&self) -> Option<ResourceState> {
        self.current.load_full().map(|applied| ResourceState {
            name: self.name.clone(),
            fingerprint: applied.fingerprint.clone(),
            updated_at: applied.updated_at,
        })
    }

    /// Bring this slot in line with `provider`.
    ///
    /// Unchanged fingerprint: no-op. Otherwise a new connection is provided
    /// and published, and the previous one is closed on a detached task. On
    /// provider failure the slot is left exactly as it was.
    pub async fn reconcile<P>(&self, cancel: &CancellationToken, provider: &P) -> Result<()>
    where
        P: Provider + ?Sized,
    {
        let _guard = self.reconcile_lock.lock().await;

        let next = provider.fingerprint();
        let previous_fingerprint = match self.current.load_full() {
            Some(applied) if applied.fingerprint == next => {
                tracing::trace!(resource = %self.name, "fingerprint unchanged");
                return Ok(());
            }
            Some(applied) => Some(applied.fingerprint.clone()),
            None => None,
        };

        let connection = provider
            .provide(cancel)
            .await
            .map_err(|source| Error::provide(&self.name, source))?;

        tracing::info!(
            resource = %self.name,
            from = previous_fingerprint.as_deref().unwrap_or(""),
            to = %next,
            "connection updated"
        );

        let previous = self.current.swap(Some(Arc::new(Applied {
            connection,
            fingerprint: next,
            updated_at: Utc::now(),
        })));

        if let Some(previous) = previous {
            self.retire(previous);
        }
        Ok(())
    }

    /// Take the connection out of service and close it.
    ///
    /// Returns `Ok(false)` when the slot was already empty. The slot is
    /// emptied even if closing fails, so a connection is never closed twice.
    pub async fn close(&self) -> Result<bool> {
        let Some(applied) = self.current.swap(None) else {
            return Ok(false);
        };
        applied
            .connection
            .close()
            .await
            .map_err(|source| Error::close(&self.name, source))?;
        tracing::debug!(resource = %self.name, "connection closed");
        Ok(true)
    }

    fn retire(&self, previous: Arc<Applied>) {
        let name = self.name.clone();
        self.retirements.spawn(async move {
            match previous.connection.close().await {
                Ok(()) => tracing::debug!(
                    resource = %name,
                    fingerprint = %previous.fingerprint,
                    "retired previous connection"
                ),
                Err(error) => tracing::warn!(
                    resource = %name,
                    fingerprint = %previous.fingerprint,
                    %error,
                    "failed to close previous connection"
                ),
            }
        });
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("fingerprint", &self.fingerprint())
            .finish_non_exhaustive()
    }
}
