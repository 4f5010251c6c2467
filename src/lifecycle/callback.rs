//! Lifecycle callbacks.
//!
//! # Responsibilities
//! - Turn async closures with injectable arguments into stored callbacks
//! - Convert whatever a callback returns into providers
//! - Group callbacks per phase, in registration order
//!
//! # Design Decisions
//! - Arguments are resolved through [`FromProviders`], the same way axum
//!   resolves extractors: one `Handler` impl per arity, generated by a macro
//! - A `Result` output is the failure signal. `Err` is never registered
//! - Stored callbacks are type-erased behind `Arc`, so they clone cheaply

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::error::BoxError;
use crate::lifecycle::phase::Phase;
use crate::provider::{FromProviders, Provider, Scope};

/// Values a callback can return.
///
/// Every value that is not a failure becomes a provider, in order. `Arc`s
/// register as themselves; any other value is returned as [`Output`], or as a
/// [`Provider`] when it should also resolve through a capability.
pub trait IntoOutputs {
    fn into_outputs(self) -> Result<Vec<Provider>, BoxError>;
}

impl IntoOutputs for () {
    fn into_outputs(self) -> Result<Vec<Provider>, BoxError> {
        Ok(Vec::new())
    }
}

impl IntoOutputs for Provider {
    fn into_outputs(self) -> Result<Vec<Provider>, BoxError> {
        Ok(vec![self])
    }
}

impl IntoOutputs for Vec<Provider> {
    fn into_outputs(self) -> Result<Vec<Provider>, BoxError> {
        Ok(self)
    }
}

impl<T: ?Sized + Send + Sync + 'static> IntoOutputs for Arc<T> {
    fn into_outputs(self) -> Result<Vec<Provider>, BoxError> {
        Ok(vec![Provider::new(self)])
    }
}

/// Registers a plain value, e.g. `Output(HttpAddr(addr))`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Output<T>(pub T);

impl<T: Any + Send + Sync> IntoOutputs for Output<T> {
    fn into_outputs(self) -> Result<Vec<Provider>, BoxError> {
        Ok(vec![Provider::new(self.0)])
    }
}

impl<T, E> IntoOutputs for Result<T, E>
where
    T: IntoOutputs,
    E: Into<BoxError>,
{
    fn into_outputs(self) -> Result<Vec<Provider>, BoxError> {
        self.map_err(Into::into)?.into_outputs()
    }
}

macro_rules! impl_into_outputs_tuple {
    ($($ty:ident),+) => {
        #[allow(non_snake_case)]
        impl<$($ty: IntoOutputs,)+> IntoOutputs for ($($ty,)+) {
            fn into_outputs(self) -> Result<Vec<Provider>, BoxError> {
                let ($($ty,)+) = self;
                let mut outputs = Vec::new();
                $(outputs.extend($ty.into_outputs()?);)+
                Ok(outputs)
            }
        }
    };
}

impl_into_outputs_tuple!(A);
impl_into_outputs_tuple!(A, B);
impl_into_outputs_tuple!(A, B, C);
impl_into_outputs_tuple!(A, B, C, D);

/// An async function usable as a lifecycle callback.
///
/// Implemented for closures and functions taking up to eight
/// [`FromProviders`] arguments and returning a future of [`IntoOutputs`].
pub trait Handler<Args>: Send + Sync + 'static {
    fn call(&self, scope: &Scope) -> BoxFuture<'static, Result<Vec<Provider>, BoxError>>;
}

macro_rules! impl_handler {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_variables)]
        impl<F, Fut, Out, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Out> + Send + 'static,
            Out: IntoOutputs,
            $($ty: FromProviders,)*
        {
            fn call(&self, scope: &Scope) -> BoxFuture<'static, Result<Vec<Provider>, BoxError>> {
                $(let $ty = <$ty as FromProviders>::from_providers(scope);)*
                let fut = (self)($($ty),*);
                Box::pin(async move { fut.await.into_outputs() })
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);

trait ErasedHandler: Send + Sync {
    fn call(&self, scope: &Scope) -> BoxFuture<'static, Result<Vec<Provider>, BoxError>>;
}

struct Erased<H, Args> {
    handler: H,
    _args: PhantomData<fn() -> Args>,
}

impl<H, Args> ErasedHandler for Erased<H, Args>
where
    H: Handler<Args>,
    Args: 'static,
{
    fn call(&self, scope: &Scope) -> BoxFuture<'static, Result<Vec<Provider>, BoxError>> {
        self.handler.call(scope)
    }
}

/// A named, type-erased callback.
#[derive(Clone)]
pub struct Callback {
    name: Arc<str>,
    handler: Arc<dyn ErasedHandler>,
}

impl Callback {
    pub fn new<H, Args>(name: impl Into<String>, handler: H) -> Self
    where
        H: Handler<Args>,
        Args: 'static,
    {
        Self {
            name: Arc::from(name.into()),
            handler: Arc::new(Erased {
                handler,
                _args: PhantomData,
            }),
        }
    }

    /// The module name the filter matches against.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve inputs from `scope` and start the callback.
    pub(crate) fn call(&self, scope: &Scope) -> BoxFuture<'static, Result<Vec<Provider>, BoxError>> {
        self.handler.call(scope)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback").field("name", &self.name).finish()
    }
}

/// Callbacks grouped by phase. Registration order is execution order.
#[derive(Debug, Clone, Default)]
pub struct Callbacks {
    init: Vec<Callback>,
    setup: Vec<Callback>,
    start: Vec<Callback>,
    ready: Vec<Callback>,
}

impl Callbacks {
    pub fn push(&mut self, phase: Phase, callback: Callback) {
        self.list_mut(phase).push(callback);
    }

    pub fn phase(&self, phase: Phase) -> &[Callback] {
        match phase {
            Phase::Init => &self.init,
            Phase::Setup => &self.setup,
            Phase::Start => &self.start,
            Phase::Ready => &self.ready,
        }
    }

    fn list_mut(&mut self, phase: Phase) -> &mut Vec<Callback> {
        match phase {
            Phase::Init => &mut self.init,
            Phase::Setup => &mut self.setup,
            Phase::Start => &mut self.start,
            Phase::Ready => &mut self.ready,
        }
    }
}

/// Callbacks that belong to one named module.
///
/// At most one callback per phase; setting a phase twice keeps the last.
#[derive(Debug, Clone)]
pub struct Component {
    name: String,
    callbacks: Vec<(Phase, Callback)>,
    disabled: bool,
}

impl Component {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            callbacks: Vec::new(),
            disabled: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn init<H, Args>(self, handler: H) -> Self
    where
        H: Handler<Args>,
        Args: 'static,
    {
        self.on(Phase::Init, handler)
    }

    pub fn setup<H, Args>(self, handler: H) -> Self
    where
        H: Handler<Args>,
        Args: 'static,
    {
        self.on(Phase::Setup, handler)
    }

    pub fn start<H, Args>(self, handler: H) -> Self
    where
        H: Handler<Args>,
        Args: 'static,
    {
        self.on(Phase::Start, handler)
    }

    pub fn ready<H, Args>(self, handler: H) -> Self
    where
        H: Handler<Args>,
        Args: 'static,
    {
        self.on(Phase::Ready, handler)
    }

    /// Disable the module unless it is enabled explicitly.
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    fn on<H, Args>(mut self, phase: Phase, handler: H) -> Self
    where
        H: Handler<Args>,
        Args: 'static,
    {
        let callback = Callback::new(self.name.clone(), handler);
        self.callbacks.retain(|(p, _)| *p != phase);
        self.callbacks.push((phase, callback));
        self
    }

    /// Per-phase registrations, in phase order.
    pub(crate) fn into_callbacks(mut self) -> Vec<(Phase, Callback)> {
        self.callbacks.sort_by_key(|(phase, _)| *phase);
        self.callbacks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::logging::Logger;
    use crate::provider::{Dep, Providers};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Port(u16);

    fn scope(providers: &Providers) -> Scope {
        Scope::new(providers.clone(), Logger::new("svc.test"))
    }

    #[tokio::test]
    async fn test_handler_resolves_inputs() {
        let providers = Providers::new();
        providers.add(Port(9000));

        let callback = Callback::new("api", |Dep(port): Dep<Port>, logger: Logger| async move {
            assert_eq!(logger.name(), "svc.test");
            Arc::new(port.0 + 1)
        });

        let outputs = callback.call(&scope(&providers)).await.unwrap();
        providers.extend(outputs);

        assert_eq!(providers.resolve::<Arc<u16>>().as_deref(), Some(&9001));
    }

    #[tokio::test]
    async fn test_result_output() {
        let providers = Providers::new();

        let ok = Callback::new("db", || async { Ok::<_, BoxError>((Arc::new(1u8), Arc::new("db"))) });
        assert_eq!(ok.call(&scope(&providers)).await.unwrap().len(), 2);

        let failed = Callback::new("db", || async { Err::<Arc<u8>, _>("connection refused") });
        let err = failed.call(&scope(&providers)).await.unwrap_err();
        assert_eq!(err.to_string(), "connection refused");
    }

    #[tokio::test]
    async fn test_plain_value_output() {
        let providers = Providers::new();

        let callback = Callback::new("net", || async { (Output(Port(8080)), Output("edge")) });
        providers.extend(callback.call(&scope(&providers)).await.unwrap());

        assert_eq!(providers.resolve::<Port>(), Some(Port(8080)));
        assert_eq!(providers.resolve::<&'static str>(), Some("edge"));
    }

    #[test]
    fn test_component_expansion() {
        let component = Component::new("cache")
            .start(|| async {})
            .init(|| async {})
            .init(|| async { Arc::new(1u8) })
            .disabled(true);

        assert!(component.is_disabled());
        let phases: Vec<_> = component
            .into_callbacks()
            .into_iter()
            .map(|(phase, cb)| (phase, cb.name().to_string()))
            .collect();
        assert_eq!(
            phases,
            vec![
                (Phase::Init, "cache".to_string()),
                (Phase::Start, "cache".to_string())
            ]
        );
    }
}
