//! Test doubles for providers and connections.
//!
//! [`ScriptedProvider`] is driven by the test: its fingerprint, failures and
//! latency are set explicitly. [`MockProvider`] reports a fresh fingerprint on
//! every call, so every pass rebuilds. Both record what they produced in a
//! shared [`Ledger`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::connection::{Connection, ConnectionHandle};
use crate::error::BoxError;
use crate::provider::Provider;

// ---------------------------------------------------------------------------
// MockConnection
// ---------------------------------------------------------------------------

/// Connection that counts how often it was closed.
#[derive(Debug)]
pub struct MockConnection {
    id: u64,
    fingerprint: String,
    closes: AtomicU32,
    fail_close: bool,
}

impl MockConnection {
    /// Create a connection tagged with `id` and the fingerprint it was built for.
    pub fn new(id: u64, fingerprint: impl Into<String>, fail_close: bool) -> Self {
        Self {
            id,
            fingerprint: fingerprint.into(),
            closes: AtomicU32::new(0),
            fail_close,
        }
    }

    /// Sequence number assigned by the provider.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Fingerprint this connection was built for.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Number of `close` calls, failed ones included.
    #[must_use]
    pub fn close_count(&self) -> u32 {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn close(&self) -> Result<(), BoxError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(format!("mock connection {} refused to close", self.id).into());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct LedgerInner {
    provide_calls: AtomicU32,
    next_id: AtomicU64,
    in_flight: AtomicU32,
    peak_in_flight: AtomicU32,
    connections: Mutex<Vec<Arc<MockConnection>>>,
}

/// Shared record of provide calls and the connections they produced.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    inner: Arc<LedgerInner>,
}

impl Ledger {
    /// Number of `provide` calls, failed and cancelled ones included.
    #[must_use]
    pub fn provide_calls(&self) -> u32 {
        self.inner.provide_calls.load(Ordering::SeqCst)
    }

    /// The `index`-th connection successfully produced.
    #[must_use]
    pub fn connection(&self, index: usize) -> Option<Arc<MockConnection>> {
        self.inner.connections.lock().get(index).cloned()
    }

    /// Every connection successfully produced, oldest first.
    #[must_use]
    pub fn connections(&self) -> Vec<Arc<MockConnection>> {
        self.inner.connections.lock().clone()
    }

    /// Sum of close calls over every produced connection.
    #[must_use]
    pub fn closed_total(&self) -> u32 {
        self.inner
            .connections
            .lock()
            .iter()
            .map(|conn| conn.close_count())
            .sum()
    }

    /// Highest number of `provide` calls that were running at once.
    #[must_use]
    pub fn peak_in_flight(&self) -> u32 {
        self.inner.peak_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self) -> InFlight<'_> {
        self.inner.provide_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlight(self)
    }

    /// Build a connection with a fresh id and record it.
    fn produce(&self, fingerprint: String, fail_close: bool) -> ConnectionHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let conn = Arc::new(MockConnection::new(id, fingerprint, fail_close));
        self.inner.connections.lock().push(Arc::clone(&conn));
        ConnectionHandle::from_arc(conn)
    }
}

struct InFlight<'a>(&'a Ledger);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Sleep for `latency`, giving up when `cancel` fires.
async fn wait(latency: Duration, cancel: &CancellationToken) -> Result<(), BoxError> {
    if latency.is_zero() {
        return Ok(());
    }
    tokio::select! {
        () = cancel.cancelled() => Err("provide cancelled".into()),
        () = tokio::time::sleep(latency) => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// ScriptedProvider
// ---------------------------------------------------------------------------

/// Provider whose behavior is set by the test.
#[derive(Debug)]
pub struct ScriptedProvider {
    fingerprint: Mutex<String>,
    fail_next: AtomicU32,
    fail_close: AtomicBool,
    latency_ms: AtomicU64,
    ledger: Ledger,
}

impl ScriptedProvider {
    /// Provider reporting `fingerprint` and succeeding immediately.
    pub fn new(fingerprint: impl Into<String>) -> Self {
        Self {
            fingerprint: Mutex::new(fingerprint.into()),
            fail_next: AtomicU32::new(0),
            fail_close: AtomicBool::new(false),
            latency_ms: AtomicU64::new(0),
            ledger: Ledger::default(),
        }
    }

    /// Delay every `provide` call by `latency`.
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        self.set_latency(latency);
        self
    }

    /// Change the reported fingerprint.
    pub fn set_fingerprint(&self, fingerprint: impl Into<String>) {
        *self.fingerprint.lock() = fingerprint.into();
    }

    /// Change the delay of later `provide` calls.
    pub fn set_latency(&self, latency: Duration) {
        let ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(ms, Ordering::SeqCst);
    }

    /// Make the next `count` calls to `provide` fail.
    pub fn fail_next(&self, count: u32) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Make connections produced from now on fail to close.
    pub fn fail_close(&self, fail: bool) {
        self.fail_close.store(fail, Ordering::SeqCst);
    }

    /// Record of everything this provider produced.
    #[must_use]
    pub fn ledger(&self) -> Ledger {
        self.ledger.clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn fingerprint(&self) -> String {
        self.fingerprint.lock().clone()
    }

    async fn provide(&self, cancel: &CancellationToken) -> Result<ConnectionHandle, BoxError> {
        let _in_flight = self.ledger.enter();
        let fingerprint = self.fingerprint();

        wait(
            Duration::from_millis(self.latency_ms.load(Ordering::SeqCst)),
            cancel,
        )
        .await?;

        let should_fail = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(format!("scripted failure for fingerprint '{fingerprint}'").into());
        }

        Ok(self
            .ledger
            .produce(fingerprint, self.fail_close.load(Ordering::SeqCst)))
    }
}

// ---------------------------------------------------------------------------
// MockProvider
// ---------------------------------------------------------------------------

/// Provider whose fingerprint changes on every call, so every pass rebuilds.
///
/// Each connection is tagged with the fingerprint reported just before it
/// was provided.
#[derive(Debug)]
pub struct MockProvider {
    generation: AtomicU64,
    last_fingerprint: Mutex<String>,
    latency: Duration,
    ledger: Ledger,
}

impl MockProvider {
    /// Provider that takes `latency` to build each connection.
    #[must_use]
    pub fn new(latency: Duration) -> Self {
        Self {
            generation: AtomicU64::new(0),
            last_fingerprint: Mutex::new(String::new()),
            latency,
            ledger: Ledger::default(),
        }
    }

    /// Record of everything this provider produced.
    #[must_use]
    pub fn ledger(&self) -> Ledger {
        self.ledger.clone()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn fingerprint(&self) -> String {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst);
        let fingerprint = format!("mock-{generation}");
        self.last_fingerprint.lock().clone_from(&fingerprint);
        fingerprint
    }

    async fn provide(&self, cancel: &CancellationToken) -> Result<ConnectionHandle, BoxError> {
        let _in_flight = self.ledger.enter();
        let fingerprint = self.last_fingerprint.lock().clone();
        wait(self.latency, cancel).await?;
        Ok(self.ledger.produce(fingerprint, false))
    }
}
