//! The provider contract: build a connection, fingerprint its configuration.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::connection::ConnectionHandle;
use crate::error::BoxError;

/// Builds connections for one named resource.
///
/// The container compares [`fingerprint`](Self::fingerprint) against the
/// fingerprint of the connection it currently holds and calls
/// [`provide`](Self::provide) only when they differ.
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    /// Deterministic digest of every configuration value that affects the
    /// identity of the connection. Two configurations that would produce
    /// different connections must not share a fingerprint.
    ///
    /// Must be cheap: it is evaluated for every resource on every pass.
    fn fingerprint(&self) -> String;

    /// Build a new connection.
    ///
    /// Implementations should watch `cancel` during blocking I/O and give up
    /// early when it fires.
    async fn provide(&self, cancel: &CancellationToken) -> Result<ConnectionHandle, BoxError>;
}

#[async_trait]
impl<P: Provider + ?Sized> Provider for Arc<P> {
    fn fingerprint(&self) -> String {
        (**self).fingerprint()
    }

    async fn provide(&self, cancel: &CancellationToken) -> Result<ConnectionHandle, BoxError> {
        (**self).provide(cancel).await
    }
}
