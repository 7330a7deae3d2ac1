//! String-keyed dependency injection container
//!
//! The `Container` stores services under identifiers and discovers the ones
//! nobody registered: an unknown identifier is rewritten through the prefix
//! map, turned into a class name and, if the reflector knows that class,
//! auto-wired and registered as a shared service.

use crate::alias::{AliasTable, FollowGuard};
use crate::autowire::{self, Autowired, Overrides};
use crate::config::{ContainerBuilder, DefaultPolicy};
use crate::extension::{self, DecoratorFn, Extension};
use crate::factory::{Callable, Definition, DefinitionKind, Factory, ServiceFn, SharedFactory};
use crate::negative_cache::NegativeCache;
use crate::normalize::to_class_form;
use crate::prefix::PrefixMap;
use crate::provider::{erase, AnyService, Injectable};
use crate::reflect::{ClassDescriptor, Reflector};
use crate::storage::{Entry, ServiceStore};
use crate::{DiError, Result};
use std::sync::{Arc, Weak};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Identifier suffix that asks for a factory of the base identifier's class
pub const FACTORY_SUFFIX: &str = ".factory";

/// Which entries a lookup may use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    /// Stored entries only, never discovery
    StoredOnly,
    /// Stored entries, then discovery
    StoredFirst,
    /// Stored entries not registered by discovery, never discovery
    ExplicitOnly,
    /// Discovery only, ignoring anything stored under the candidates
    DiscoveryOnly,
}

/// A discovered service that is not stored yet
enum Built {
    Service(Autowired),
    Factory(Autowired),
}

impl Built {
    fn into_entry(self) -> Entry {
        let init: ServiceFn = match self {
            Built::Service(autowired) => {
                Arc::new(move |_: &Container| autowired.invoke(&Overrides::default()))
            }
            Built::Factory(autowired) => {
                Arc::new(move |_: &Container| Ok(erase(Factory::from_autowired(autowired.clone()))))
            }
        };
        Entry::Shared(Arc::new(SharedFactory::discovered(init)))
    }

    fn instantiate(self) -> Result<AnyService> {
        match self {
            Built::Service(autowired) => autowired.invoke(&Overrides::default()),
            Built::Factory(autowired) => Ok(erase(Factory::from_autowired(autowired))),
        }
    }
}

/// Outcome of a successful lookup
enum Found {
    /// Already stored under this identifier
    Stored(String),
    /// Discovered for this identifier
    Built(String, Built),
}

struct Inner {
    store: ServiceStore,
    aliases: AliasTable,
    prefixes: PrefixMap,
    policy: DefaultPolicy,
    negative_cache: NegativeCache,
    reflector: Arc<dyn Reflector>,
}

/// Dependency injection container.
///
/// Cloning is cheap and yields a handle to the same container.
///
/// # Examples
///
/// ```rust
/// use autowire_di::{Container, Definition};
///
/// let container = Container::new();
/// container.set("greeting", Definition::value(String::from("hello")));
/// container.alias("salutation", "greeting");
///
/// let greeting = container.get_as::<String>("salutation").unwrap();
/// assert_eq!(greeting.as_str(), "hello");
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

/// Non-owning handle to a [`Container`]
#[derive(Clone)]
pub struct WeakContainer {
    inner: Weak<Inner>,
}

impl WeakContainer {
    /// Get the container back, if it is still alive
    pub fn upgrade(&self) -> Option<Container> {
        self.inner.upgrade().map(|inner| Container { inner })
    }
}

impl std::fmt::Debug for WeakContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakContainer")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl Container {
    /// Create an empty container with the identity prefix rule and no classes
    pub fn new() -> Self {
        ContainerBuilder::new().build()
    }

    /// Start configuring a container
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    pub(crate) fn from_parts(
        prefixes: PrefixMap,
        policy: DefaultPolicy,
        negative_cache: NegativeCache,
        reflector: Arc<dyn Reflector>,
    ) -> Self {
        #[cfg(feature = "logging")]
        debug!(
            target: "autowire_di",
            prefix_rules = prefixes.rules().len(),
            policy = ?policy,
            cached_misses = negative_cache.len(),
            "Creating container"
        );

        Self {
            inner: Arc::new(Inner {
                store: ServiceStore::new(),
                aliases: AliasTable::new(),
                prefixes,
                policy,
                negative_cache,
                reflector,
            }),
        }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a definition under `id`, replacing whatever was there.
    ///
    /// Bypasses discovery. Plain values are returned as-is, callables are
    /// shared (invoked once on first access).
    pub fn set(&self, id: impl Into<String>, definition: impl Into<Definition>) {
        let id = id.into();
        let entry = match definition.into().kind {
            DefinitionKind::Value(value) => Entry::Value(value),
            DefinitionKind::Shared(init) => Entry::Shared(Arc::new(SharedFactory::new(init))),
        };

        #[cfg(feature = "logging")]
        debug!(
            target: "autowire_di",
            service = %id,
            kind = entry.kind(),
            "Registering service"
        );

        self.inner.store.insert(id, entry);
    }

    /// Register an erased value as a shared service.
    ///
    /// The value must be invokable: a [`Callable`] or an [`Extension`].
    /// Anything else fails with `InvalidDefinition`.
    pub fn share(&self, id: impl Into<String>, value: AnyService) -> Result<()> {
        let id = id.into();
        let value = match value.downcast::<Callable>() {
            Ok(callable) => {
                self.set(id, Callable::clone(&callable));
                return Ok(());
            }
            Err(value) => value,
        };
        match value.downcast::<Extension>() {
            Ok(extension) => {
                self.set(id, extension);
                Ok(())
            }
            Err(_) => Err(DiError::invalid_definition(
                id,
                "service definition is not a callable or an extension",
            )),
        }
    }

    /// Remove the entry stored under `id`. Returns true if there was one.
    pub fn unset(&self, id: &str) -> bool {
        self.inner.store.remove(id).is_some()
    }

    /// Whether an entry is stored under exactly `id`. Never discovers.
    #[inline]
    pub fn is_defined(&self, id: &str) -> bool {
        self.inner.store.contains(id)
    }

    /// Redirect `from` to `to`. Resolving `from` re-resolves `to` every time.
    pub fn alias(&self, from: &str, to: &str) {
        if self.inner.aliases.install(&self.inner.store, from, to) {
            #[cfg(feature = "logging")]
            debug!(target: "autowire_di", from, to, "Alias installed");
        }
    }

    /// Decorate the service under `id`.
    ///
    /// The decorator receives the undecorated value and the container.
    /// Successive calls chain and apply in registration order. The returned
    /// [`Extension`] can be registered with [`set`](Self::set) to memoize the
    /// decorated value.
    ///
    /// A decorator must not resolve `id` itself expecting the decorated value.
    pub fn extend<T, U, F>(&self, id: impl Into<String>, decorator: F) -> Arc<Extension>
    where
        T: Injectable,
        U: Injectable,
        F: Fn(Arc<T>, &Container) -> U + Send + Sync + 'static,
    {
        let id = id.into();
        let expected = id.clone();
        self.extend_erased(
            id,
            Arc::new(move |inner: AnyService, container: &Container| {
                let inner = inner
                    .downcast::<T>()
                    .map_err(|_| DiError::type_mismatch::<T>(expected.clone()))?;
                Ok(erase(decorator(inner, container)))
            }),
        )
    }

    /// Decorate with an already erased decorator
    pub fn extend_erased(&self, id: impl Into<String>, decorator: DecoratorFn) -> Arc<Extension> {
        let id = id.into();
        let base = self.inner.store.get(&id);

        #[cfg(feature = "logging")]
        debug!(
            target: "autowire_di",
            service = %id,
            has_base = base.is_some(),
            "Extending service"
        );

        let extension = Arc::new(Extension::new(id.clone(), base, decorator));
        self.inner
            .store
            .insert(id, Entry::Extension(Arc::clone(&extension)));
        extension
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Whether `id` resolves.
    ///
    /// Discovery has side effects: a discovered class is registered as a
    /// shared service under the rewritten identifier, and `id` is aliased to
    /// that identifier.
    pub fn has(&self, id: &str) -> Result<bool> {
        let Some(found) = self.find(id, Lookup::StoredFirst, &Overrides::default())? else {
            return Ok(false);
        };

        let resolved = match found {
            Found::Stored(resolved) => resolved,
            Found::Built(resolved, built) => {
                // Another thread may have registered it meanwhile; keep the first
                if self.inner.store.insert_if_absent(resolved.clone(), built.into_entry()) {
                    #[cfg(feature = "logging")]
                    debug!(
                        target: "autowire_di",
                        service = %resolved,
                        requested = id,
                        "Auto-registered discovered service"
                    );
                }
                resolved
            }
        };

        self.alias(id, &resolved);
        Ok(true)
    }

    /// Resolve `id`.
    ///
    /// Fails with `NotFound` if neither the store nor discovery can provide it.
    pub fn get(&self, id: &str) -> Result<AnyService> {
        #[cfg(feature = "logging")]
        trace!(target: "autowire_di", service = id, "Resolving service");

        if !self.has(id)? {
            #[cfg(feature = "logging")]
            debug!(target: "autowire_di", service = id, "Service not found");
            return Err(DiError::not_found(id));
        }
        let entry = self
            .inner
            .store
            .get(id)
            .ok_or_else(|| DiError::not_found(id))?;
        self.resolve_entry(id, entry)
    }

    /// Resolve `id` and downcast it
    pub fn get_as<T: Injectable>(&self, id: &str) -> Result<Arc<T>> {
        self.get(id)?
            .downcast::<T>()
            .map_err(|_| DiError::type_mismatch::<T>(id))
    }

    fn resolve_entry(&self, id: &str, entry: Entry) -> Result<AnyService> {
        match entry {
            Entry::Value(value) => Ok(value),
            Entry::Shared(shared) => shared.resolve(self, id),
            Entry::Alias(alias) => {
                #[cfg(feature = "logging")]
                trace!(target: "autowire_di", from = id, to = alias.target(), "Following alias");
                let Some(_guard) = FollowGuard::enter(self.identity(), id) else {
                    return Err(DiError::circular(id));
                };
                self.get(alias.target()).map_err(|e| e.context(id))
            }
            Entry::Extension(extension) => extension::unwind(self, &extension),
        }
    }

    /// Build `id` with some constructor parameters replaced.
    ///
    /// Nothing is registered for `id`. Without overrides stored entries win
    /// and discovered classes give a fresh instance. With overrides,
    /// explicitly registered entries still win, but instances cached by
    /// discovery are bypassed so the overrides apply; those are only used
    /// when no candidate names an auto-wireable class.
    pub fn get_modified(&self, id: &str, overrides: &Overrides) -> Result<AnyService> {
        #[cfg(feature = "logging")]
        debug!(
            target: "autowire_di",
            service = id,
            overrides = ?overrides,
            "Resolving modified service"
        );

        let found = if overrides.is_empty() {
            self.find(id, Lookup::StoredFirst, overrides)?
        } else {
            match self.find(id, Lookup::ExplicitOnly, overrides)? {
                Some(found) => Some(found),
                None => match self.find(id, Lookup::DiscoveryOnly, overrides)? {
                    Some(found) => Some(found),
                    None => self.find(id, Lookup::StoredOnly, overrides)?,
                },
            }
        };

        match found {
            Some(Found::Built(_, built)) => built.instantiate(),
            Some(Found::Stored(resolved)) => self.get(&resolved),
            None => Err(DiError::not_found(id)),
        }
    }

    /// [`get_modified`](Self::get_modified) and downcast
    pub fn get_modified_as<T: Injectable>(&self, id: &str, overrides: &Overrides) -> Result<Arc<T>> {
        self.get_modified(id, overrides)?
            .downcast::<T>()
            .map_err(|_| DiError::type_mismatch::<T>(id))
    }

    /// Two-pass candidate search.
    ///
    /// Pass 1 only looks at stored entries so a registered identifier
    /// reachable through any rule beats discovery through an earlier rule.
    fn find(&self, id: &str, lookup: Lookup, overrides: &Overrides) -> Result<Option<Found>> {
        let store = &self.inner.store;

        if lookup != Lookup::DiscoveryOnly {
            for candidate in self.inner.prefixes.lookup_candidates(id) {
                let usable = match lookup {
                    Lookup::ExplicitOnly => store.contains(&candidate) && !self.is_discovered(&candidate),
                    _ => store.contains(&candidate),
                };
                if usable {
                    #[cfg(feature = "logging")]
                    trace!(target: "autowire_di", requested = id, candidate = %candidate, "Stored candidate");
                    return Ok(Some(Found::Stored(candidate)));
                }
            }
            if matches!(lookup, Lookup::StoredOnly | Lookup::ExplicitOnly) {
                return Ok(None);
            }
        }

        for candidate in self.inner.prefixes.rewrite(id) {
            if lookup == Lookup::StoredFirst && store.contains(&candidate) {
                return Ok(Some(Found::Stored(candidate)));
            }
            if let Some(built) = self.discover(&candidate, overrides)? {
                return Ok(Some(Found::Built(candidate, built)));
            }
        }

        Ok(None)
    }

    /// Try to auto-wire the class named by `id`, or by its base for
    /// `.factory` identifiers
    fn discover(&self, id: &str, overrides: &Overrides) -> Result<Option<Built>> {
        if let Some(class) = self.lookup_class(&to_class_form(id)) {
            if let Some(autowired) = autowire::try_build_factory(self, &class, Some(id), overrides)? {
                return Ok(Some(Built::Service(autowired)));
            }
        }

        if let Some(base) = id.strip_suffix(FACTORY_SUFFIX) {
            if let Some(class) = self.lookup_class(&to_class_form(base)) {
                if let Some(autowired) =
                    autowire::try_build_factory(self, &class, Some(base), overrides)?
                {
                    return Ok(Some(Built::Factory(autowired)));
                }
            }
        }

        Ok(None)
    }

    /// Whether `id` holds, or aliases to, a shared service registered by
    /// discovery
    fn is_discovered(&self, id: &str) -> bool {
        let mut current = id.to_string();
        let mut followed = Vec::new();
        loop {
            match self.inner.store.get(&current) {
                Some(Entry::Shared(shared)) => return shared.is_discovered(),
                Some(Entry::Alias(alias)) if !followed.contains(&current) => {
                    let next = alias.target().to_string();
                    followed.push(std::mem::replace(&mut current, next));
                }
                _ => return false,
            }
        }
    }

    fn lookup_class(&self, class_name: &str) -> Option<Arc<ClassDescriptor>> {
        if class_name.is_empty() || self.inner.negative_cache.is_miss(class_name) {
            return None;
        }
        let class = self.inner.reflector.reflect(class_name);
        if class.is_none() {
            #[cfg(feature = "logging")]
            trace!(target: "autowire_di", class = class_name, "No such class, recording miss");
            self.inner.negative_cache.mark_miss(class_name);
        }
        class
    }

    // =========================================================================
    // Factories
    // =========================================================================

    /// A factory invoking `f` for every instance
    pub fn create_factory<T, F>(&self, f: F) -> Factory
    where
        T: Injectable,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Factory::new(f)
    }

    /// A factory instantiating `class_name` with its default arguments.
    ///
    /// Fails with `InvalidFactory` if the class is unknown or has a
    /// parameter without a default. Overrides passed to
    /// [`Factory::new_instance_with`] replace defaults by name.
    pub fn create_class_factory(&self, class_name: &str) -> Result<Factory> {
        let class = self
            .inner
            .reflector
            .reflect(class_name)
            .ok_or_else(|| DiError::invalid_factory(class_name, "class not found"))?;

        if let Some(param) = class.parameters().iter().find(|p| !p.has_default()) {
            return Err(DiError::invalid_factory(
                class_name,
                format!("parameter `{}` has no default value", param.name()),
            ));
        }

        Ok(Factory::with_overrides(move |overrides| {
            let values = class
                .parameters()
                .iter()
                .filter_map(|param| {
                    overrides
                        .get_key(param.key())
                        .or_else(|| param.default_value())
                        .cloned()
                })
                .collect();
            class.instantiate(values)
        }))
    }

    /// An auto-wired factory for `class_name`.
    ///
    /// Dependencies are resolved now; each instance is constructed fresh.
    /// Fails with `InvalidFactory` if the class is unknown or its
    /// constructor cannot be satisfied.
    pub fn auto_factory(&self, class_name: &str) -> Result<Factory> {
        let class = self
            .inner
            .reflector
            .reflect(class_name)
            .ok_or_else(|| DiError::invalid_factory(class_name, "class not found"))?;

        match autowire::try_build_factory(self, &class, None, &Overrides::default())? {
            Some(autowired) => Ok(Factory::from_autowired(autowired)),
            None => Err(DiError::invalid_factory(
                class_name,
                "constructor parameters cannot be satisfied",
            )),
        }
    }

    /// A shareable definition whose value is a [`Factory`] calling `f` with
    /// this container on every `new_instance`.
    ///
    /// The factory holds the container weakly and fails with
    /// `ContainerDropped` once it is gone.
    pub fn factory<T, F>(&self, f: F) -> Callable
    where
        T: Injectable,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        let weak = self.downgrade();
        let f = Arc::new(f);
        Callable::new(move |_: &Container| {
            let weak = weak.clone();
            let f = Arc::clone(&f);
            Factory::with_overrides(move |_: &Overrides| {
                let container = weak.upgrade().ok_or(DiError::ContainerDropped)?;
                Ok(erase(f(&container)))
            })
        })
    }

    /// A closure resolving `id` on every call and applying `f` to it.
    ///
    /// The service is looked up lazily, so replacing it is observed by the
    /// next call.
    pub fn service_method<T, A, R, F>(
        &self,
        id: impl Into<String>,
        f: F,
    ) -> impl Fn(A) -> Result<R> + Send + Sync + 'static
    where
        T: Injectable,
        A: 'static,
        R: 'static,
        F: Fn(&T, A) -> R + Send + Sync + 'static,
    {
        let weak = self.downgrade();
        let id = id.into();
        move |args: A| {
            let container = weak.upgrade().ok_or(DiError::ContainerDropped)?;
            let service = container.get_as::<T>(&id)?;
            Ok(f(&service, args))
        }
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Identifiers currently stored, including aliases and discovered services
    pub fn keys(&self) -> Vec<String> {
        self.inner.store.ids()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.store.is_empty()
    }

    #[inline]
    pub fn prefixes(&self) -> &PrefixMap {
        &self.inner.prefixes
    }

    #[inline]
    pub fn policy(&self) -> DefaultPolicy {
        self.inner.policy
    }

    #[inline]
    pub fn negative_cache(&self) -> &NegativeCache {
        &self.inner.negative_cache
    }

    #[inline]
    pub fn reflector(&self) -> &dyn Reflector {
        self.inner.reflector.as_ref()
    }

    /// Non-owning handle
    pub fn downgrade(&self) -> WeakContainer {
        WeakContainer {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Whether both handles point at the same container
    #[inline]
    pub fn ptr_eq(&self, other: &Container) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    #[inline]
    pub(crate) fn store(&self) -> &ServiceStore {
        &self.inner.store
    }

    /// Stable address identifying this container
    #[inline]
    pub(crate) fn identity(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("services", &self.len())
            .field("aliases", &self.inner.aliases.len())
            .field("prefixes", &self.inner.prefixes)
            .field("policy", &self.inner.policy)
            .field("negative_cache", &self.inner.negative_cache)
            .finish()
    }
}
