//! TCP listener bootstrap.
//!
//! # Responsibilities
//! - Parse the configured address
//! - Bind before the serving task is spawned, so the bound address is known
//!   (and registered) before anything depends on it
//! - Log where the facility listens

use std::net::SocketAddr;

use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// The configured address is not a socket address.
    Address(std::net::AddrParseError),
    /// Failed to bind to address.
    Bind(std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Address(e) => write!(f, "invalid listen address: {}", e),
            ListenerError::Bind(e) => write!(f, "failed to bind: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Address(e) => Some(e),
            ListenerError::Bind(e) => Some(e),
        }
    }
}

/// A bound TCP listener of one facility.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind to `address`.
    pub async fn bind(facility: &str, address: &str) -> Result<Self, ListenerError> {
        let requested: SocketAddr = address.parse().map_err(ListenerError::Address)?;

        let inner = TcpListener::bind(requested)
            .await
            .map_err(ListenerError::Bind)?;
        let local_addr = inner.local_addr().map_err(ListenerError::Bind)?;

        // An ephemeral port is only discoverable from the log.
        if requested.port() == 0 {
            tracing::info!(facility, address = %local_addr, "listener bound");
        } else {
            tracing::debug!(facility, address = %local_addr, "listener bound");
        }

        Ok(Self { inner, local_addr })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn into_inner(self) -> TcpListener {
        self.inner
    }
}
