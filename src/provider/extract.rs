//! Callback input resolution.
//!
//! Each callback argument implements [`FromProviders`]. Resolution never
//! fails: a dependency nobody registered degrades to a default value.

use std::any::Any;
use std::ops::{Deref, DerefMut};

use crate::observability::logging::Logger;
use crate::provider::registry::Providers;

/// What a callback can see while its inputs are being resolved.
#[derive(Debug, Clone)]
pub struct Scope {
    providers: Providers,
    logger: Logger,
}

impl Scope {
    pub fn new(providers: Providers, logger: Logger) -> Self {
        Self { providers, logger }
    }

    pub fn providers(&self) -> &Providers {
        &self.providers
    }

    /// Logger already scoped to the callback being invoked.
    pub fn logger(&self) -> &Logger {
        &self.logger
    }
}

/// A callback argument that can be built from the registry.
pub trait FromProviders: Sized {
    fn from_providers(scope: &Scope) -> Self;
}

/// Resolves `T`, falling back to `T::default()` when nothing provides it.
///
/// A missing mandatory dependency therefore shows up as a default value, not
/// as an error. Use `Option<T>` instead when absence must be observable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dep<T>(pub T);

impl<T> Dep<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Dep<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Dep<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: Any + Clone + Default> FromProviders for Dep<T> {
    fn from_providers(scope: &Scope) -> Self {
        match scope.providers.resolve::<T>() {
            Some(value) => Dep(value),
            None => {
                scope.logger.debug(format_args!(
                    "no provider for {}, using default",
                    std::any::type_name::<T>()
                ));
                Dep(T::default())
            }
        }
    }
}

/// `None` is the zero value for dependencies without a sensible default,
/// such as trait objects.
impl<T: Any + Clone> FromProviders for Option<T> {
    fn from_providers(scope: &Scope) -> Self {
        scope.providers.resolve::<T>()
    }
}

impl FromProviders for Logger {
    fn from_providers(scope: &Scope) -> Self {
        scope.logger.clone()
    }
}

impl FromProviders for Providers {
    fn from_providers(scope: &Scope) -> Self {
        scope.providers.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Port(u16);

    fn scope() -> Scope {
        Scope::new(Providers::new(), Logger::new("svc").named("db"))
    }

    #[test]
    fn test_missing_dependency_degrades_to_default() {
        let scope = scope();

        let Dep(port) = Dep::<Port>::from_providers(&scope);
        assert_eq!(port, Port(0));

        let missing = Option::<Arc<str>>::from_providers(&scope);
        assert!(missing.is_none());
    }

    #[test]
    fn test_registered_dependency_is_resolved() {
        let scope = scope();
        scope.providers().add(Port(8080));

        assert_eq!(*Dep::<Port>::from_providers(&scope), Port(8080));
        assert_eq!(Option::<Port>::from_providers(&scope), Some(Port(8080)));
    }

    #[test]
    fn test_logger_is_callback_scoped() {
        let scope = scope();
        scope.providers().add(Logger::new("root"));

        assert_eq!(Logger::from_providers(&scope).name(), "svc.db");
        assert_eq!(
            Option::<Logger>::from_providers(&scope).map(|l| l.name().to_string()),
            Some("root".to_string())
        );
    }
}
