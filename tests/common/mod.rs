//! Shared utilities for integration tests.

use std::io::Write;
use std::sync::{Arc, Mutex};

use service_bootstrap::{Flags, Logger, Selection, Service, ServiceBuilder};
use tempfile::NamedTempFile;

/// Listeners on ephemeral loopback ports, diagnostics off.
pub const LOCAL_CONFIG: &str = r#"
[http]
address = "127.0.0.1:0"

[grpc]
address = "127.0.0.1:0"
"#;

/// Write `content` to a temporary TOML file, kept alive by the handle.
pub fn config_file(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

/// Flags pointing at `file`.
pub fn flags(file: &NamedTempFile) -> Flags {
    Flags {
        config_path: Some(file.path().to_path_buf()),
        ..Flags::default()
    }
}

#[allow(dead_code)]
pub fn selection(onlys: &[&str], excepts: &[&str]) -> Selection {
    Selection {
        onlys: onlys.iter().map(|s| s.to_string()).collect(),
        excepts: excepts.iter().map(|s| s.to_string()).collect(),
        ..Selection::default()
    }
}

/// A builder with a test name and logger, so nothing depends on the
/// environment or on the global subscriber.
pub fn builder() -> ServiceBuilder {
    Service::builder()
        .name("bootstrap-test")
        .logger(Logger::new("bootstrap-test"))
}

/// Ordered record of which callbacks ran.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    /// A callback that records `entry` when invoked.
    pub fn record(&self, entry: &str) -> impl Fn() -> std::future::Ready<()> + Send + Sync + 'static {
        let journal = self.clone();
        let entry = entry.to_string();
        move || {
            journal.push(entry.clone());
            std::future::ready(())
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}
