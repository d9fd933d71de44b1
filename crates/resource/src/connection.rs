//! Closable connections and the shared handle readers receive.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BoxError;

/// Anything a provider can produce: a live connection with a single
/// `close` operation.
///
/// `close` takes `&self` because readers may still hold the handle when the
/// container retires it. Implementations should make later calls on a closed
/// connection fail rather than panic.
#[async_trait]
pub trait Connection: Any + Send + Sync {
    /// Close the connection and release what it holds.
    async fn close(&self) -> Result<(), BoxError>;
}

/// Cloneable, type-erased handle to a provided connection.
///
/// Every clone points at the same connection. Use [`downcast`](Self::downcast)
/// to get the concrete type back.
#[derive(Clone)]
pub struct ConnectionHandle {
    conn: Arc<dyn Connection>,
    any: Arc<dyn Any + Send + Sync>,
}

impl ConnectionHandle {
    /// Wrap an owned connection.
    pub fn new<C: Connection>(connection: C) -> Self {
        Self::from_arc(Arc::new(connection))
    }

    /// Wrap a connection that is already shared.
    pub fn from_arc<C: Connection>(connection: Arc<C>) -> Self {
        let any: Arc<dyn Any + Send + Sync> = connection.clone();
        Self {
            conn: connection,
            any,
        }
    }

    /// Get the concrete connection, if it is a `C`.
    #[must_use]
    pub fn downcast<C: Connection>(&self) -> Option<Arc<C>> {
        Arc::clone(&self.any).downcast::<C>().ok()
    }

    /// Whether both handles refer to the same connection.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.any, &other.any)
    }

    /// Close the underlying connection.
    pub async fn close(&self) -> Result<(), BoxError> {
        self.conn.close().await
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("ptr", &Arc::as_ptr(&self.any).cast::<()>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Counting(AtomicU32);

    #[async_trait]
    impl Connection for Counting {
        async fn close(&self) -> Result<(), BoxError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Other;

    #[async_trait]
    impl Connection for Other {
        async fn close(&self) -> Result<(), BoxError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn close_reaches_the_shared_connection() {
        let inner = Arc::new(Counting(AtomicU32::new(0)));
        let handle = ConnectionHandle::from_arc(Arc::clone(&inner));
        let clone = handle.clone();

        clone.close().await.unwrap();
        assert_eq!(inner.0.load(Ordering::SeqCst), 1);
        assert!(handle.ptr_eq(&clone));
    }

    #[test]
    fn downcast_matches_concrete_type_only() {
        let handle = ConnectionHandle::new(Counting(AtomicU32::new(7)));
        let counting = handle.downcast::<Counting>().expect("should downcast");
        assert_eq!(counting.0.load(Ordering::SeqCst), 7);
        assert!(handle.downcast::<Other>().is_none());
    }

    #[test]
    fn distinct_connections_are_not_ptr_eq() {
        let a = ConnectionHandle::new(Other);
        let b = ConnectionHandle::new(Other);
        assert!(!a.ptr_eq(&b));
    }
}
