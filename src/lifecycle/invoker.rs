//! Callback invocation.
//!
//! Resolves a callback's inputs, awaits it, and folds its outputs back into
//! the registry. Phases are run strictly one callback at a time.

use std::time::Instant;

use tracing::Instrument;

use crate::error::Error;
use crate::lifecycle::callback::Callback;
use crate::lifecycle::phase::Phase;
use crate::module::ModuleFilter;
use crate::observability::logging::Logger;
use crate::observability::metrics::record_callback;
use crate::provider::{Providers, Scope};

/// Invoke a single callback.
///
/// On failure nothing the callback returned is registered.
pub async fn invoke(
    phase: Phase,
    callback: &Callback,
    providers: &Providers,
    logger: &Logger,
) -> Result<(), Error> {
    let logger = logger.named(callback.name());
    let span = logger.span();
    let scope = Scope::new(providers.clone(), logger);
    let started = Instant::now();

    let future = span.in_scope(|| callback.call(&scope));

    match future.instrument(span).await {
        Ok(outputs) => {
            record_callback(phase, "ok", started);
            tracing::trace!(
                phase = %phase,
                callback = callback.name(),
                outputs = outputs.len(),
                "callback done"
            );
            providers.extend(outputs);
            Ok(())
        }
        Err(source) => {
            record_callback(phase, "error", started);
            Err(Error::Callback {
                phase,
                name: callback.name().to_string(),
                source,
            })
        }
    }
}

/// Run every callback of a phase that `filter` enables, in order, stopping at
/// the first failure.
pub(crate) async fn run_phase(
    phase: Phase,
    filter: &ModuleFilter,
    callbacks: &[Callback],
    providers: &Providers,
    logger: &Logger,
) -> Result<(), Error> {
    let (enabled, _) = filter.partition(callbacks);

    if enabled.is_empty() {
        if phase.is_loud() {
            logger.info(phase.idle_message());
        } else {
            logger.debug(phase.idle_message());
        }
        return Ok(());
    }

    let names: Vec<&str> = enabled.iter().map(|cb| cb.name()).collect();
    if phase.is_loud() {
        tracing::info!(logger = %logger, components = ?names, "{}", phase.active_message());
    } else {
        tracing::debug!(logger = %logger, components = ?names, "{}", phase.active_message());
    }

    for callback in enabled {
        invoke(phase, callback, providers, logger).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::error::BoxError;
    use crate::provider::Dep;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Handle(u32);

    #[tokio::test]
    async fn test_failure_halts_phase_and_folds_nothing() {
        let providers = Providers::new();
        let logger = Logger::new("svc");
        let calls = Arc::new(AtomicUsize::new(0));

        let after = calls.clone();
        let callbacks = [
            Callback::new("db", || async {
                Err::<(Arc<Handle>,), BoxError>("disk full".into())
            }),
            Callback::new("cache", move || {
                let after = after.clone();
                async move {
                    after.fetch_add(1, Ordering::SeqCst);
                }
            }),
        ];
        let err = run_phase(Phase::Init, &ModuleFilter::default(), &callbacks, &providers, &logger)
            .await
            .unwrap_err();

        match err {
            Error::Callback { phase, name, source } => {
                assert_eq!(phase, Phase::Init);
                assert_eq!(name, "db");
                assert_eq!(source.to_string(), "disk full");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(providers.is_empty());
    }

    #[tokio::test]
    async fn test_outputs_visible_to_later_callbacks() {
        let providers = Providers::new();
        let logger = Logger::new("svc");

        let db = Callback::new("db", || async { Arc::new(Handle(7)) });
        let api = Callback::new("api", |Dep(handle): Dep<Arc<Handle>>| async move {
            Arc::new(format!("handle {}", handle.0))
        });

        invoke(Phase::Init, &db, &providers, &logger).await.unwrap();
        invoke(Phase::Start, &api, &providers, &logger).await.unwrap();

        assert_eq!(
            providers.resolve::<Arc<String>>().as_deref().map(String::as_str),
            Some("handle 7")
        );
    }
}
