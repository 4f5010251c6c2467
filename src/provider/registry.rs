//! Ordered, append-only provider store.
//!
//! # Responsibilities
//! - Hold every value registered during bootstrap, in insertion order
//! - Resolve a requested type to the earliest matching entry
//! - Resolve capability views (typically `Arc<dyn Trait>`) the same way
//!
//! # Design Decisions
//! - Values are stored as-is behind `Box<dyn Any>`; resolution clones them
//!   out, so providers are usually cheap handles (`Arc`, channels, configs)
//! - Exact and capability matches share one front-to-back scan, so the
//!   first registered entry wins regardless of how it matched
//! - The registry is itself a handle and always resolves to itself

use std::any::{type_name, Any};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

type Erased = Box<dyn Any + Send + Sync>;

/// A single registered value plus the extra types it can be resolved as.
pub struct Provider {
    type_name: &'static str,
    value: Erased,
    capabilities: Vec<(&'static str, Erased)>,
}

impl Provider {
    /// Wrap a value for registration.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: type_name::<T>(),
            value: Box::new(value),
            capabilities: Vec::new(),
        }
    }

    /// Expose this provider under an additional type.
    ///
    /// This is how interface-shaped dependencies are satisfied: a concrete
    /// handle is registered together with its trait-object view.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use service_bootstrap::provider::{Provider, Providers};
    ///
    /// trait Store: Send + Sync {}
    /// struct MemStore;
    /// impl Store for MemStore {}
    ///
    /// let store = Arc::new(MemStore);
    /// let providers = Providers::new();
    /// providers.add_provider(
    ///     Provider::new(store.clone()).with_capability::<Arc<dyn Store>>(store),
    /// );
    /// assert!(providers.resolve::<Arc<dyn Store>>().is_some());
    /// assert!(providers.resolve::<Arc<MemStore>>().is_some());
    /// ```
    pub fn with_capability<C: Any + Send + Sync>(mut self, view: C) -> Self {
        self.capabilities.push((type_name::<C>(), Box::new(view)));
        self
    }

    /// Name of the concrete type held by this provider.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn get<T: Any + Clone>(&self) -> Option<T> {
        if let Some(value) = self.value.downcast_ref::<T>() {
            return Some(value.clone());
        }

        self.capabilities
            .iter()
            .find_map(|(_, view)| view.downcast_ref::<T>())
            .cloned()
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("type", &self.type_name)
            .field(
                "capabilities",
                &self.capabilities.iter().map(|(name, _)| *name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Shared handle to the provider registry.
///
/// Cloning the handle does not copy the registry.
#[derive(Clone, Default)]
pub struct Providers {
    inner: Arc<RwLock<Vec<Provider>>>,
}

impl Providers {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value.
    pub fn add<T: Any + Send + Sync>(&self, value: T) {
        self.add_provider(Provider::new(value));
    }

    /// Append a prepared provider (for example one carrying capabilities).
    pub fn add_provider(&self, provider: Provider) {
        self.write().push(provider);
    }

    /// Append several providers, preserving their order.
    pub fn extend<I: IntoIterator<Item = Provider>>(&self, providers: I) {
        self.write().extend(providers);
    }

    /// Resolve `T` to the earliest registered value of that type, or the
    /// earliest value exposing `T` as a capability.
    pub fn resolve<T: Any + Clone>(&self) -> Option<T> {
        if let Some(registry) = (self as &dyn Any).downcast_ref::<T>() {
            return Some(registry.clone());
        }

        self.read().iter().find_map(Provider::get::<T>)
    }

    /// Whether anything would resolve for `T`.
    pub fn contains<T: Any + Clone>(&self) -> bool {
        self.resolve::<T>().is_some()
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Concrete type names in registration order.
    pub fn type_names(&self) -> Vec<&'static str> {
        self.read().iter().map(Provider::type_name).collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Provider>> {
        self.inner.read().expect("provider registry lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Provider>> {
        self.inner.write().expect("provider registry lock poisoned")
    }
}

impl fmt::Debug for Providers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.type_names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Named: Send + Sync {
        fn name(&self) -> &str;
    }

    struct Db(&'static str);

    impl Named for Db {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_first_added_wins() {
        let providers = Providers::new();
        providers.add(String::from("meow"));
        providers.add(1_i32);
        providers.add(1.2_f64);
        providers.add(String::from("woof"));
        providers.add(2_i32);

        assert_eq!(providers.resolve::<String>().as_deref(), Some("meow"));
        assert_eq!(providers.resolve::<i32>(), Some(1));
        assert_eq!(providers.resolve::<f64>(), Some(1.2));
        assert_eq!(providers.resolve::<u8>(), None);
        assert_eq!(providers.len(), 5);
    }

    #[test]
    fn test_capability_resolution() {
        let providers = Providers::new();
        let first = Arc::new(Db("first"));
        let second = Arc::new(Db("second"));

        providers.add(7_u32);
        providers.add_provider(
            Provider::new(first.clone()).with_capability::<Arc<dyn Named>>(first),
        );
        providers.add_provider(
            Provider::new(second.clone()).with_capability::<Arc<dyn Named>>(second),
        );

        let named = providers.resolve::<Arc<dyn Named>>().unwrap();
        assert_eq!(named.name(), "first");

        let concrete = providers.resolve::<Arc<Db>>().unwrap();
        assert_eq!(concrete.name(), "first");

        // Never registered under any name.
        assert!(!providers.contains::<Arc<dyn Fn() + Send + Sync>>());
    }

    #[test]
    fn test_exact_match_before_later_capability() {
        let providers = Providers::new();
        providers.add(String::from("exact"));
        providers.add_provider(Provider::new(1_u8).with_capability(String::from("view")));

        assert_eq!(providers.resolve::<String>().as_deref(), Some("exact"));
    }

    #[test]
    fn test_registry_resolves_itself() {
        let providers = Providers::new();
        let handle = providers.resolve::<Providers>().unwrap();

        handle.add(42_u64);
        assert_eq!(providers.resolve::<u64>(), Some(42));
        assert_eq!(providers.type_names(), vec!["u64"]);
    }

    #[test]
    fn test_shared_handle_is_same_object() {
        let providers = Providers::new();
        let db = Arc::new(Db("shared"));
        providers.add(db.clone());

        let resolved = providers.resolve::<Arc<Db>>().unwrap();
        assert!(Arc::ptr_eq(&db, &resolved));
    }
}
