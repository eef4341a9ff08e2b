//! Connectivity probing.
//!
//! The sync controller asks a [`NetworkProbe`] before every load and reads the
//! cache instead of the network when the answer is "disconnected".

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use tokio::net::TcpStream;
use tracing::debug;

/// Reports whether the network is currently reachable.
#[async_trait]
pub trait NetworkProbe: Send + Sync {
    async fn is_connected(&self) -> bool;
}

/// Considers the network up if a TCP connection to the headlines host can be
/// opened within `timeout`.
pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    /// Probe the host and port an endpoint URL points at.
    ///
    /// Returns `None` for URLs without a host (e.g. `file:`).
    pub fn for_endpoint(endpoint: &Url, timeout: Duration) -> Option<Self> {
        let host = endpoint.host_str()?;
        let port = endpoint.port_or_known_default()?;
        Some(Self::new(host, port, timeout))
    }
}

#[async_trait]
impl NetworkProbe for TcpProbe {
    async fn is_connected(&self) -> bool {
        let target = (self.host.as_str(), self.port);
        let connected = matches!(
            tokio::time::timeout(self.timeout, TcpStream::connect(target)).await,
            Ok(Ok(_))
        );
        debug!(host = %self.host, port = self.port, connected, "connectivity probe");
        connected
    }
}
