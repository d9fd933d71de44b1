//! Start/stop contract for long-running components.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::container::ResourceContainer;
use crate::error::Result;

/// A component that is started once and shut down once.
#[async_trait]
pub trait Service: Send + Sync {
    /// Start the component. Returns once it is serving; background work may
    /// continue until `cancel` fires or [`shutdown`](Self::shutdown) is called.
    async fn serve(&self, cancel: &CancellationToken) -> Result<()>;

    /// Release everything the component holds.
    async fn shutdown(&self);
}

#[async_trait]
impl<T: ResourceContainer + ?Sized> Service for T {
    async fn serve(&self, cancel: &CancellationToken) -> Result<()> {
        self.run(cancel).await
    }

    async fn shutdown(&self) {
        self.stop().await;
    }
}

/// Serve `service` until `cancel` fires, then shut it down.
///
/// A start that fails or is cancelled may have acquired part of its
/// resources, so the service is shut down before the error is returned.
pub async fn run_service<S>(cancel: &CancellationToken, service: &S) -> Result<()>
where
    S: Service + ?Sized,
{
    if let Err(error) = service.serve(cancel).await {
        tracing::warn!(%error, "start failed, shutting down");
        service.shutdown().await;
        return Err(error);
    }
    tracing::info!("service started");

    cancel.cancelled().await;
    tracing::info!("shutting down");
    service.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::container::ContainerBuilder;
    use crate::testing::ScriptedProvider;

    #[tokio::test]
    async fn failed_start_closes_what_was_applied() {
        let a = Arc::new(ScriptedProvider::new("a1"));
        let b = Arc::new(ScriptedProvider::new("b1"));
        b.fail_next(1);
        let container = ContainerBuilder::new()
            .provider("a", Arc::clone(&a))
            .provider("b", Arc::clone(&b))
            .build()
            .unwrap();

        let cancel = CancellationToken::new();
        let err = run_service(&cancel, container.as_ref()).await.unwrap_err();
        assert_eq!(err.resource_id(), Some("b"));
        assert!(container.get("a").is_none());
        assert_eq!(a.ledger().connection(0).unwrap().close_count(), 1);
        assert!(b.ledger().connections().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_start_closes_what_was_applied() {
        let a = Arc::new(ScriptedProvider::new("a1"));
        let b = Arc::new(ScriptedProvider::new("b1").with_latency(Duration::from_secs(10)));
        let container = ContainerBuilder::new()
            .provider("a", Arc::clone(&a))
            .provider("b", Arc::clone(&b))
            .schedule(Some("@every 1s"))
            .build()
            .unwrap();

        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        assert!(run_service(&cancel, container.as_ref()).await.is_err());
        assert!(container.get("a").is_none());
        assert_eq!(a.ledger().closed_total(), 1);
        assert!(b.ledger().connections().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_closes_everything() {
        let provider = Arc::new(ScriptedProvider::new("v1"));
        let container = ContainerBuilder::new()
            .provider("db", Arc::clone(&provider))
            .schedule(Some("@every 1s"))
            .build()
            .unwrap();

        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            canceller.cancel();
        });

        run_service(&cancel, container.as_ref()).await.unwrap();
        assert!(container.get("db").is_none());
        assert_eq!(provider.ledger().closed_total(), 1);
    }
}
