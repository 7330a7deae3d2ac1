//! Factory types for creating service instances
//!
//! - [`SharedFactory`] memoizes the first result (lazy singleton).
//! - [`Factory`] produces a fresh instance on every `new_instance` call.
//! - [`Callable`] and [`Definition`] are what callers hand to the container.

use crate::autowire::{Autowired, Overrides};
use crate::provider::{erase, AnyService, Injectable};
use crate::{Container, DiError, Result};
use once_cell::sync::OnceCell;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Type-erased service constructor receiving the container
pub(crate) type ServiceFn = Arc<dyn Fn(&Container) -> Result<AnyService> + Send + Sync>;

/// Type-erased constructor driven by per-call overrides
pub type FactoryFn = Arc<dyn Fn(&Overrides) -> Result<AnyService> + Send + Sync>;

// =============================================================================
// Shared Factory
// =============================================================================

/// Lazy singleton - invoked at most once, the result is memoized in place
pub(crate) struct SharedFactory {
    init: ServiceFn,
    instance: OnceCell<AnyService>,
    discovered: bool,
}

impl SharedFactory {
    #[inline]
    pub(crate) fn new(init: ServiceFn) -> Self {
        Self {
            init,
            instance: OnceCell::new(),
            discovered: false,
        }
    }

    /// A shared service registered by auto-wiring rather than by the user
    #[inline]
    pub(crate) fn discovered(init: ServiceFn) -> Self {
        Self {
            discovered: true,
            ..Self::new(init)
        }
    }

    /// Get the instance, creating it if necessary
    pub(crate) fn resolve(&self, container: &Container, id: &str) -> Result<AnyService> {
        if let Some(instance) = self.instance.get() {
            #[cfg(feature = "logging")]
            trace!(
                target: "autowire_di",
                service = id,
                "Shared service already initialized, returning cached instance"
            );
            return Ok(Arc::clone(instance));
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "autowire_di",
            service = id,
            "Shared service initializing on first access"
        );

        self.instance
            .get_or_try_init(|| (self.init)(container))
            .map(Arc::clone)
            .map_err(|e| e.context(id))
    }

    #[inline]
    pub(crate) fn is_initialized(&self) -> bool {
        self.instance.get().is_some()
    }

    #[inline]
    pub(crate) fn is_discovered(&self) -> bool {
        self.discovered
    }
}

// =============================================================================
// Callable
// =============================================================================

/// An invokable definition: a closure receiving the container.
///
/// Registering a `Callable` makes it a shared service.
#[derive(Clone)]
pub struct Callable {
    f: ServiceFn,
}

impl Callable {
    /// Wrap an infallible closure
    pub fn new<T, F>(f: F) -> Self
    where
        T: Injectable,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        Self {
            f: Arc::new(move |c: &Container| Ok(erase(f(c)))),
        }
    }

    /// Wrap a fallible closure
    pub fn try_new<T, F>(f: F) -> Self
    where
        T: Injectable,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            f: Arc::new(move |c: &Container| f(c).map(erase)),
        }
    }

    /// Wrap a closure that already produces erased values
    pub fn erased<F>(f: F) -> Self
    where
        F: Fn(&Container) -> Result<AnyService> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Invoke the closure
    #[inline]
    pub fn call(&self, container: &Container) -> Result<AnyService> {
        (self.f)(container)
    }

    pub(crate) fn into_fn(self) -> ServiceFn {
        self.f
    }
}

impl std::fmt::Debug for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Callable")
    }
}

// =============================================================================
// Definition
// =============================================================================

pub(crate) enum DefinitionKind {
    Value(AnyService),
    Shared(ServiceFn),
}

/// What gets registered under an identifier with [`Container::set`]
pub struct Definition {
    pub(crate) kind: DefinitionKind,
}

impl Definition {
    /// A plain value, returned as-is
    pub fn value<T: Injectable>(value: T) -> Self {
        Self::erased(erase(value))
    }

    /// A plain value that is already erased
    pub fn erased(value: AnyService) -> Self {
        Self {
            kind: DefinitionKind::Value(value),
        }
    }

    /// A shared service created on first access
    pub fn shared<T, F>(f: F) -> Self
    where
        T: Injectable,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        Callable::new(f).into()
    }

    /// A shared service whose constructor may fail
    pub fn try_shared<T, F>(f: F) -> Self
    where
        T: Injectable,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        Callable::try_new(f).into()
    }

    #[inline]
    pub fn is_shared(&self) -> bool {
        matches!(self.kind, DefinitionKind::Shared(_))
    }
}

impl From<Callable> for Definition {
    fn from(callable: Callable) -> Self {
        Self {
            kind: DefinitionKind::Shared(callable.into_fn()),
        }
    }
}

impl From<Factory> for Definition {
    /// A factory registered as a plain value; consumers call `new_instance` on it
    fn from(factory: Factory) -> Self {
        Self::value(factory)
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Produces fresh instances on demand.
///
/// # Examples
///
/// ```rust
/// use autowire_di::Factory;
///
/// let factory = Factory::new(|| vec![1, 2, 3]);
/// let a = factory.new_instance_as::<Vec<i32>>().unwrap();
/// let b = factory.new_instance_as::<Vec<i32>>().unwrap();
/// assert!(!std::sync::Arc::ptr_eq(&a, &b));
/// ```
#[derive(Clone)]
pub struct Factory {
    callback: FactoryFn,
}

impl Factory {
    /// Wrap a closure
    pub fn new<T, F>(f: F) -> Self
    where
        T: Injectable,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(move |_: &Overrides| Ok(erase(f()))),
        }
    }

    /// Wrap a closure that receives the overrides of each call
    pub fn with_overrides<F>(f: F) -> Self
    where
        F: Fn(&Overrides) -> Result<AnyService> + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(f),
        }
    }

    pub(crate) fn from_autowired(autowired: Autowired) -> Self {
        Self::with_overrides(move |overrides| autowired.invoke(overrides))
    }

    /// Create a new instance
    #[inline]
    pub fn new_instance(&self) -> Result<AnyService> {
        (self.callback)(&Overrides::default())
    }

    /// Create a new instance, overriding constructor parameters by name
    #[inline]
    pub fn new_instance_with(&self, overrides: &Overrides) -> Result<AnyService> {
        (self.callback)(overrides)
    }

    /// Create a new instance and downcast it
    pub fn new_instance_as<T: Injectable>(&self) -> Result<Arc<T>> {
        self.new_instance()?
            .downcast::<T>()
            .map_err(|_| DiError::type_mismatch::<T>("factory instance"))
    }

    /// Create a new instance with overrides and downcast it
    pub fn new_instance_with_as<T: Injectable>(&self, overrides: &Overrides) -> Result<Arc<T>> {
        self.new_instance_with(overrides)?
            .downcast::<T>()
            .map_err(|_| DiError::type_mismatch::<T>("factory instance"))
    }
}

impl std::fmt::Debug for Factory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Factory")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Clone)]
    struct TestService {
        id: u32,
    }

    #[test]
    fn test_shared_factory_memoizes() {
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        let container = Container::new();
        let factory = SharedFactory::new(Arc::new(|_: &Container| {
            Ok(erase(TestService {
                id: COUNTER.fetch_add(1, Ordering::SeqCst),
            }))
        }));

        assert!(!factory.is_initialized());
        let a = factory.resolve(&container, "test").unwrap();
        let b = factory.resolve(&container, "test").unwrap();
        assert!(factory.is_initialized());
        assert_eq!(COUNTER.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_shared_factory_error_not_memoized() {
        static CALLS: AtomicU32 = AtomicU32::new(0);

        let container = Container::new();
        let factory = SharedFactory::new(Arc::new(|_: &Container| {
            if CALLS.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(DiError::creation_failed("Flaky", "first call fails"))
            } else {
                Ok(erase(TestService { id: 9 }))
            }
        }));

        let err = factory.resolve(&container, "flaky").err().unwrap();
        assert!(matches!(err, DiError::Container { .. }));
        let ok = factory.resolve(&container, "flaky").unwrap();
        assert_eq!(ok.downcast::<TestService>().unwrap().id, 9);
    }

    #[test]
    fn test_factory_creates_distinct_instances() {
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        let factory = Factory::new(|| TestService {
            id: COUNTER.fetch_add(1, Ordering::SeqCst),
        });

        let a = factory.new_instance_as::<TestService>().unwrap();
        let b = factory.new_instance_as::<TestService>().unwrap();
        assert_ne!(a.id, b.id);
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_factory_type_mismatch() {
        let factory = Factory::new(|| 1u8);
        let err = factory.new_instance_as::<String>().err().unwrap();
        assert!(matches!(err, DiError::TypeMismatch { .. }));
    }

    #[test]
    fn test_callable_and_definition() {
        let container = Container::new();
        let callable = Callable::new(|_| TestService { id: 5 });
        let value = callable.call(&container).unwrap();
        assert_eq!(value.downcast::<TestService>().unwrap().id, 5);

        assert!(Definition::from(callable).is_shared());
        assert!(!Definition::value(TestService { id: 1 }).is_shared());
        assert!(!Definition::from(Factory::new(|| 0u8)).is_shared());
    }
}
