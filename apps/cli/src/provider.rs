//! TCP connections described by the configuration file.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use relink_config::{ConfigFile, Configuration};
use relink_resource::{BoxError, Connection, ConnectionHandle, Fingerprinter, Provider};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use parking_lot::Mutex;
use tokio::sync::MutexGuard;
use tokio_util::sync::CancellationToken;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings of one `resources.<name>` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpSettings {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub nodelay: bool,
}

impl TcpSettings {
    /// Read the section at `resources.<name>`, filling in defaults.
    pub fn from_config(config: &Configuration, name: &str) -> Result<Self, BoxError> {
        let section = format!("resources.{name}");
        let port = config.i64_or(&format!("{section}.port"), 0);
        let port = u16::try_from(port)
            .ok()
            .filter(|port| *port != 0)
            .ok_or_else(|| format!("resource '{name}': invalid port {port}"))?;

        Ok(Self {
            host: config.string_or(&format!("{section}.host"), DEFAULT_HOST),
            port,
            connect_timeout: config
                .duration_or(&format!("{section}.connect_timeout"), DEFAULT_CONNECT_TIMEOUT),
            nodelay: config.bool_or(&format!("{section}.nodelay"), true),
        })
    }

    fn fingerprint(&self) -> String {
        Fingerprinter::new()
            .field("host", &self.host)
            .field("port", self.port)
            .field("connect_timeout_ms", self.connect_timeout.as_millis())
            .field("nodelay", self.nodelay)
            .finish()
    }
}

/// Builds a [`TcpConnection`] from the current configuration file.
///
/// `provide` dials with the settings read by the preceding `fingerprint`
/// call, so the stored fingerprint always describes the connection even when
/// the file changes in between.
#[derive(Debug)]
pub struct TcpProvider {
    name: String,
    config: Arc<ConfigFile>,
    fingerprinted: Mutex<Option<Result<TcpSettings, String>>>,
}

impl TcpProvider {
    pub fn new(name: impl Into<String>, config: Arc<ConfigFile>) -> Self {
        Self {
            name: name.into(),
            config,
            fingerprinted: Mutex::new(None),
        }
    }

    fn settings(&self) -> Result<TcpSettings, String> {
        TcpSettings::from_config(&self.config.snapshot(), &self.name).map_err(|e| e.to_string())
    }
}

#[async_trait]
impl Provider for TcpProvider {
    fn fingerprint(&self) -> String {
        let settings = self.settings();
        // Invalid settings get a stable marker so the next pass retries the
        // provide and reports the error.
        let fingerprint = settings
            .as_ref()
            .map_or_else(|error| format!("invalid: {error}"), TcpSettings::fingerprint);
        *self.fingerprinted.lock() = Some(settings);
        fingerprint
    }

    async fn provide(&self, cancel: &CancellationToken) -> Result<ConnectionHandle, BoxError> {
        let settings = self
            .fingerprinted
            .lock()
            .clone()
            .unwrap_or_else(|| self.settings())?;
        let dial = tokio::time::timeout(
            settings.connect_timeout,
            TcpStream::connect((settings.host.as_str(), settings.port)),
        );

        let stream = tokio::select! {
            () = cancel.cancelled() => return Err("connect cancelled".into()),
            result = dial => result
                .map_err(|_| format!(
                    "connect to {}:{} timed out after {:?}",
                    settings.host, settings.port, settings.connect_timeout
                ))??,
        };
        stream.set_nodelay(settings.nodelay)?;
        let peer = stream.peer_addr()?;
        tracing::debug!(resource = %self.name, %peer, "connected");

        Ok(ConnectionHandle::new(TcpConnection {
            peer,
            stream: tokio::sync::Mutex::new(Some(stream)),
        }))
    }
}

/// A connected TCP stream; `close` shuts it down.
#[derive(Debug)]
pub struct TcpConnection {
    peer: SocketAddr,
    stream: tokio::sync::Mutex<Option<TcpStream>>,
}

impl TcpConnection {
    /// Remote address.
    #[must_use]
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Lock the stream; `None` once the connection is closed.
    pub async fn stream(&self) -> MutexGuard<'_, Option<TcpStream>> {
        self.stream.lock().await
    }
}

#[async_trait]
impl Connection for TcpConnection {
    async fn close(&self) -> Result<(), BoxError> {
        let Some(mut stream) = self.stream.lock().await.take() else {
            return Ok(());
        };
        stream.shutdown().await?;
        Ok(())
    }
}
