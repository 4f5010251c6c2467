//! HTTP facility.
//!
//! # Responsibilities
//! - Collect routes from Start callbacks into one Axum router
//! - Wire up middleware (access log, optional CORS)
//! - Bind the listener and serve in the background until shutdown
//!
//! # Design Decisions
//! - `HttpServer` is a shared handle, registered as a provider before Start
//! - The router is taken when serving begins; later additions are not served

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::http::HeaderValue;
use axum::routing::MethodRouter;
use axum::Router;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::HttpConfig;
use crate::lifecycle::exit::{ExitReporter, ServeError};
use crate::lifecycle::shutdown::Shutdown;
use crate::net::listener::{Listener, ListenerError};

/// Route accumulator for the service's HTTP endpoint.
#[derive(Debug, Clone, Default)]
pub struct HttpServer {
    router: Arc<Mutex<Router>>,
}

impl HttpServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge all routes of `router`.
    pub fn merge(&self, router: Router) {
        self.update(|current| current.merge(router));
    }

    pub fn route(&self, path: &str, method_router: MethodRouter) {
        self.update(|current| current.route(path, method_router));
    }

    /// Mount `router` under `path`.
    pub fn nest(&self, path: &str, router: Router) {
        self.update(|current| current.nest(path, router));
    }

    pub(crate) fn take_router(&self) -> Router {
        std::mem::take(&mut *self.router.lock().expect("http router mutex poisoned"))
    }

    fn update(&self, f: impl FnOnce(Router) -> Router) {
        let mut guard = self.router.lock().expect("http router mutex poisoned");
        let current = std::mem::take(&mut *guard);
        *guard = f(current);
    }
}

/// Address the HTTP listener is bound to. Registered before Ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpAddr(pub SocketAddr);

impl Default for HttpAddr {
    fn default() -> Self {
        Self(SocketAddr::from(([0, 0, 0, 0], 0)))
    }
}

/// Wrap `router` with the configured middleware.
pub fn build_app(router: Router, config: &HttpConfig) -> Router {
    let level = if config.access_log_info {
        Level::INFO
    } else {
        Level::DEBUG
    };

    let app = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(level))
            .on_response(DefaultOnResponse::new().level(level)),
    );

    if config.cors {
        app.layer(cors_layer(config))
    } else {
        app
    }
}

/// CORS policy from the configuration. Methods and headers are mirrored.
pub fn cors_layer(config: &HttpConfig) -> CorsLayer {
    let origins = &config.cors_allowed_origins;

    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::any()
    } else if origins.is_empty() {
        // A literal `*` is not allowed together with credentials.
        if config.cors_allow_credentials {
            AllowOrigin::mirror_request()
        } else {
            AllowOrigin::any()
        }
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(config.cors_allow_credentials)
}

/// Bind and serve in the background. The task reports once on exit.
pub(crate) async fn start(
    server: &HttpServer,
    config: &HttpConfig,
    shutdown: &Shutdown,
    reporter: ExitReporter,
) -> Result<HttpAddr, ListenerError> {
    tracing::debug!(cfg = ?config, "starting HTTP server");

    let listener = Listener::bind("http", &config.address).await?;
    let addr = listener.local_addr();
    let app = build_app(server.take_router(), config);
    let signal = shutdown.signal();

    tokio::spawn(async move {
        let result = axum::serve(listener.into_inner(), app)
            .with_graceful_shutdown(signal)
            .await;

        match result {
            Ok(()) => {
                tracing::info!(address = %addr, "HTTP server stopped");
                reporter.report(Ok(()));
            }
            Err(e) => {
                tracing::error!(error = %e, "HTTP serve failed");
                reporter.report(Err(ServeError::Http(e)));
            }
        }
    });

    Ok(HttpAddr(addr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::routing::get;
    use tower::ServiceExt;

    fn server() -> HttpServer {
        let server = HttpServer::new();
        server.route("/ping", get(|| async { "pong" }));
        server.nest("/v1", Router::new().route("/status", get(|| async { "ok" })));
        server
    }

    #[tokio::test]
    async fn test_routes_accumulate() {
        let app = build_app(server().take_router(), &HttpConfig::default());

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::builder().uri("/v1/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cors_allowed_origin() {
        let config = HttpConfig {
            cors: true,
            cors_allowed_origins: vec!["https://app.example".to_string()],
            ..HttpConfig::default()
        };
        let app = build_app(server().take_router(), &config);

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/ping")
                    .header(header::ORIGIN, "https://app.example")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&HeaderValue::from_static("https://app.example"))
        );
    }
}
