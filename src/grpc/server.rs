//! gRPC facility.
//!
//! # Responsibilities
//! - Collect tonic services from Start callbacks
//! - Let Init callbacks tune server settings through [`GrpcOptions`]
//! - Bind the listener and serve in the background until shutdown
//!
//! # Design Decisions
//! - Requests are traced at debug level, one span per call
//! - Message size limits are set per service by the generated code, so they
//!   are not part of the server settings

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::IntoResponse;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_stream::StreamExt;
use tonic::body::Body;
use tonic::server::NamedService;
use tonic::service::{Routes, RoutesBuilder};
use tonic::transport::Server;
use tower::Service;

use crate::config::GrpcConfig;
use crate::lifecycle::exit::{ExitReporter, ServeError};
use crate::lifecycle::shutdown::Shutdown;
use crate::net::listener::{Listener, ListenerError};

/// Server settings applied when the gRPC listener starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrpcSettings {
    /// Per-request timeout.
    pub timeout: Option<Duration>,
    pub concurrency_limit_per_connection: Option<usize>,
    pub tcp_nodelay: bool,
    pub http2_keepalive_interval: Option<Duration>,
}

impl Default for GrpcSettings {
    fn default() -> Self {
        Self {
            timeout: None,
            concurrency_limit_per_connection: None,
            tcp_nodelay: true,
            http2_keepalive_interval: None,
        }
    }
}

/// Shared, mutable [`GrpcSettings`]. Registered before Init.
#[derive(Debug, Clone, Default)]
pub struct GrpcOptions {
    settings: Arc<Mutex<GrpcSettings>>,
}

impl GrpcOptions {
    pub fn update(&self, f: impl FnOnce(&mut GrpcSettings)) {
        f(&mut self.settings.lock().expect("grpc options mutex poisoned"));
    }

    pub fn timeout(&self, timeout: Duration) {
        self.update(|settings| settings.timeout = Some(timeout));
    }

    pub fn concurrency_limit_per_connection(&self, limit: usize) {
        self.update(|settings| settings.concurrency_limit_per_connection = Some(limit));
    }

    pub fn settings(&self) -> GrpcSettings {
        self.settings
            .lock()
            .expect("grpc options mutex poisoned")
            .clone()
    }
}

/// Service accumulator for the service's gRPC endpoint.
#[derive(Debug, Clone, Default)]
pub struct GrpcServer {
    routes: Arc<Mutex<RoutesBuilder>>,
}

impl GrpcServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a generated tonic service.
    pub fn add_service<S>(&self, service: S)
    where
        S: Service<axum::http::Request<Body>, Error = Infallible>
            + NamedService
            + Clone
            + Send
            + Sync
            + 'static,
        S::Response: IntoResponse,
        S::Future: Send + 'static,
    {
        tracing::debug!(service = S::NAME, "grpc service added");
        self.routes
            .lock()
            .expect("grpc routes mutex poisoned")
            .add_service(service);
    }

    pub(crate) fn take_routes(&self) -> Routes {
        std::mem::take(&mut *self.routes.lock().expect("grpc routes mutex poisoned")).routes()
    }
}

/// Address the gRPC listener is bound to. Registered before Ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrpcAddr(pub SocketAddr);

impl Default for GrpcAddr {
    fn default() -> Self {
        Self(SocketAddr::from(([0, 0, 0, 0], 0)))
    }
}

/// Bind and serve in the background. The task reports once on exit.
pub(crate) async fn start(
    server: &GrpcServer,
    options: &GrpcOptions,
    config: &GrpcConfig,
    shutdown: &Shutdown,
    reporter: ExitReporter,
) -> Result<GrpcAddr, ListenerError> {
    let settings = options.settings();
    tracing::debug!(cfg = ?config, settings = ?settings, "starting GRPC server");

    let listener = Listener::bind("grpc", &config.address).await?;
    let addr = listener.local_addr();

    let mut builder = Server::builder()
        .trace_fn(|request| tracing::debug_span!("grpc", path = %request.uri().path()))
        .http2_keepalive_interval(settings.http2_keepalive_interval);
    if let Some(timeout) = settings.timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(limit) = settings.concurrency_limit_per_connection {
        builder = builder.concurrency_limit_per_connection(limit);
    }
    let router = builder.add_routes(server.take_routes());

    let nodelay = settings.tcp_nodelay;
    let incoming = TcpListenerStream::new(listener.into_inner()).map(move |stream| {
        let stream = stream?;
        stream.set_nodelay(nodelay)?;
        Ok::<_, std::io::Error>(stream)
    });
    let signal = shutdown.signal();

    tokio::spawn(async move {
        match router.serve_with_incoming_shutdown(incoming, signal).await {
            Ok(()) => {
                tracing::info!(address = %addr, "GRPC server stopped");
                reporter.report(Ok(()));
            }
            Err(e) => {
                tracing::error!(error = %e, "GRPC serve failed");
                reporter.report(Err(ServeError::Grpc(e)));
            }
        }
    });

    Ok(GrpcAddr(addr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_are_shared() {
        let options = GrpcOptions::default();
        let seen_by_init = options.clone();

        seen_by_init.timeout(Duration::from_secs(5));
        seen_by_init.update(|settings| settings.tcp_nodelay = false);

        let settings = options.settings();
        assert_eq!(settings.timeout, Some(Duration::from_secs(5)));
        assert!(!settings.tcp_nodelay);
        assert_eq!(settings.concurrency_limit_per_connection, None);
    }
}
