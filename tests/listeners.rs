//! Listener tests: serving, bind failures, shutdown, and the exit signal.

use std::time::Duration;

use axum::routing::get;
use service_bootstrap::net::ListenerError;
use service_bootstrap::{
    Dep, Error, ExitReporter, GrpcAddr, GrpcOptions, HttpAddr, HttpServer, ServeError,
};

mod common;

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_http_routes_added_in_start_are_served() {
    let file = common::config_file(common::LOCAL_CONFIG);

    let running = common::builder()
        .flags(common::flags(&file))
        .http(true)
        .start("api", |Dep(http): Dep<HttpServer>| async move {
            http.route("/hello", get(|| async { "hello from api" }));
        })
        .build()
        .start()
        .await
        .unwrap();

    assert_eq!(running.listeners(), 1);
    let HttpAddr(addr) = running.providers().resolve::<HttpAddr>().unwrap();
    assert_ne!(addr.port(), 0);

    let body = reqwest::get(format!("http://{addr}/hello"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "hello from api");

    running.shutdown();
    let outcome = tokio::time::timeout(WAIT, running.wait()).await.unwrap();
    assert!(outcome.is_ok());
}

#[tokio::test]
async fn test_http_disabled_by_config() {
    let file = common::config_file("[http]\nenabled = false\naddress = \"127.0.0.1:0\"\n");

    let running = common::builder()
        .flags(common::flags(&file))
        .http(true)
        .build()
        .start()
        .await
        .unwrap();

    assert_eq!(running.listeners(), 0);
    assert!(running.providers().resolve::<HttpAddr>().is_none());
}

#[tokio::test]
async fn test_bind_failure_is_synchronous() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = taken.local_addr().unwrap();
    let file = common::config_file(&format!("[http]\naddress = \"{address}\"\n"));

    let err = common::builder()
        .flags(common::flags(&file))
        .http(true)
        .build()
        .start()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Listener {
            facility: "http",
            source: ListenerError::Bind(_)
        }
    ));
}

#[tokio::test]
async fn test_grpc_address_registered_before_ready() {
    let file = common::config_file(common::LOCAL_CONFIG);
    let seen = common::Journal::default();
    let seen_by_ready = seen.clone();

    let running = common::builder()
        .flags(common::flags(&file))
        .grpc(true)
        .init("tuning", |Dep(options): Dep<GrpcOptions>| async move {
            options.timeout(Duration::from_secs(10));
        })
        .ready("announce", move |addr: Option<GrpcAddr>| {
            let seen = seen_by_ready.clone();
            async move {
                if let Some(GrpcAddr(addr)) = addr {
                    seen.push(addr.to_string());
                }
            }
        })
        .build()
        .start()
        .await
        .unwrap();

    let GrpcAddr(addr) = running.providers().resolve::<GrpcAddr>().unwrap();
    assert_eq!(seen.entries(), vec![addr.to_string()]);
    assert!(tokio::net::TcpStream::connect(addr).await.is_ok());

    running.shutdown();
    let outcome = tokio::time::timeout(WAIT, running.wait()).await.unwrap();
    assert!(outcome.is_ok());
}

#[tokio::test]
async fn test_background_failure_reported_once() {
    let file = common::config_file(common::LOCAL_CONFIG);

    let running = common::builder()
        .flags(common::flags(&file))
        .start("worker", |reporter: Option<ExitReporter>| async move {
            let reporter = reporter.unwrap();
            for name in ["worker-a", "worker-b"] {
                let reporter = reporter.clone();
                tokio::spawn(async move { reporter.fail(name, "queue closed") });
            }
        })
        .build()
        .start()
        .await
        .unwrap();

    let outcome = tokio::time::timeout(WAIT, running.wait()).await.unwrap();
    match outcome {
        Err(ServeError::Task { name, message }) => {
            assert!(name.starts_with("worker-"));
            assert_eq!(message, "queue closed");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}
