//! Greeter: a small service built on the bootstrap runtime.
//!
//! ```text
//! greeter --help-config          # list GREETER__* environment variables
//! GREETER__GREETING__TEXT=hey greeter -c greeter.toml
//! greeter --except=audit         # skip the audit module
//! ```

use std::process::ExitCode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};

use service_bootstrap::{
    BoxError, Component, ConfigSection, Dep, HttpAddr, HttpServer, Logger, Service, Version,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct GreeterConfig {
    greeting: GreetingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct GreetingConfig {
    text: String,
    max_name_len: usize,
}

impl Default for GreetingConfig {
    fn default() -> Self {
        Self {
            text: "hello".to_string(),
            max_name_len: 64,
        }
    }
}

impl ConfigSection for GreeterConfig {
    fn post_load(&mut self, logger: &Logger) -> Result<(), BoxError> {
        if self.greeting.text.trim().is_empty() {
            return Err("greeting.text must not be empty".into());
        }
        logger.debug(format_args!("greeting is {:?}", self.greeting.text));
        Ok(())
    }
}

/// Counts served greetings.
#[derive(Debug, Default)]
struct Counter(AtomicU64);

#[derive(Clone)]
struct AppState {
    config: GreeterConfig,
    counter: Arc<Counter>,
}

async fn greet(State(state): State<AppState>, Path(name): Path<String>) -> String {
    let name: String = name.chars().take(state.config.greeting.max_name_len).collect();
    state.counter.0.fetch_add(1, Ordering::Relaxed);
    format!("{}, {}!", state.config.greeting.text, name)
}

async fn count(State(state): State<AppState>) -> String {
    state.counter.0.load(Ordering::Relaxed).to_string()
}

#[tokio::main]
async fn main() -> ExitCode {
    Service::builder()
        .name("greeter")
        .version(Version::new(
            env!("CARGO_PKG_VERSION"),
            option_env!("GREETER_COMMIT").unwrap_or_default(),
            option_env!("GREETER_BUILD_DATE").unwrap_or_default(),
        ))
        .config::<GreeterConfig>()
        .http(true)
        .init("counter", |logger: Logger| async move {
            logger.info("counter ready");
            Arc::new(Counter::default())
        })
        .start(
            "api",
            |Dep(http): Dep<HttpServer>, Dep(config): Dep<GreeterConfig>, Dep(counter): Dep<Arc<Counter>>| async move {
                let state = AppState { config, counter };
                http.merge(
                    Router::new()
                        .route("/greet/{name}", get(greet))
                        .route("/count", get(count))
                        .with_state(state),
                );
            },
        )
        .component(
            Component::new("audit")
                .disabled(true)
                .ready(|logger: Logger, addr: Option<HttpAddr>| async move {
                    match addr {
                        Some(HttpAddr(addr)) => logger.info(format_args!("serving greetings on {addr}")),
                        None => logger.warn("http disabled, nothing to audit"),
                    }
                }),
        )
        .run_cli()
        .await
}
