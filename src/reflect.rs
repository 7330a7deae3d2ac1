//! Constructor introspection
//!
//! Rust has no runtime reflection, so classes describe their constructor
//! up front through a [`ClassDescriptor`]. The container only ever talks to
//! the narrow [`Reflector`] capability: class name in, ordered parameter
//! list out.

use crate::normalize::param_key;
use crate::provider::{erase, AnyService, Injectable};
use crate::{DiError, Result};
use ahash::RandomState;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

/// Type-erased constructor
pub type ConstructFn = Arc<dyn Fn(&mut Arguments) -> Result<AnyService> + Send + Sync>;

/// A constructor parameter
#[derive(Clone)]
pub struct Parameter {
    name: String,
    key: String,
    class: Option<String>,
    default: Option<AnyService>,
}

impl Parameter {
    /// A parameter without a declared class. It can only be satisfied by an
    /// override, a `"{service_id}.{name}"` entry or its default.
    pub fn untyped(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            key: param_key(&name),
            name,
            class: None,
            default: None,
        }
    }

    /// A parameter declaring the class it expects
    pub fn typed(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            class: Some(class.into()),
            ..Self::untyped(name)
        }
    }

    /// A parameter expecting an auto-wireable type
    pub fn of<T: Autowire>(name: impl Into<String>) -> Self {
        Self::typed(name, T::CLASS)
    }

    /// Declare a default value
    pub fn with_default<T: Injectable>(mut self, value: T) -> Self {
        self.default = Some(erase(value));
        self
    }

    /// Declare an already erased default value
    pub fn with_default_erased(mut self, value: AnyService) -> Self {
        self.default = Some(value);
        self
    }

    /// Declared parameter name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized key used for overrides and service-specific lookups
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Declared class, if any
    #[inline]
    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    /// Default value, if any
    #[inline]
    pub fn default_value(&self) -> Option<&AnyService> {
        self.default.as_ref()
    }

    #[inline]
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

impl std::fmt::Debug for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("class", &self.class)
            .field("has_default", &self.has_default())
            .finish()
    }
}

/// Constructor arguments handed to a [`ClassDescriptor`]'s construction closure.
///
/// Values come in parameter order and are consumed sequentially.
pub struct Arguments {
    class: String,
    values: VecDeque<(String, AnyService)>,
}

impl Arguments {
    /// Create from `(parameter name, value)` pairs
    pub fn new(class: impl Into<String>, values: Vec<(String, AnyService)>) -> Self {
        Self {
            class: class.into(),
            values: values.into(),
        }
    }

    /// Take the next argument without downcasting
    pub fn next_erased(&mut self) -> Result<(String, AnyService)> {
        self.values.pop_front().ok_or_else(|| {
            DiError::creation_failed(self.class.clone(), "missing constructor argument")
        })
    }

    /// Take the next argument as `Arc<T>`
    pub fn next<T: Injectable>(&mut self) -> Result<Arc<T>> {
        let (name, value) = self.next_erased()?;
        value
            .downcast::<T>()
            .map_err(|_| DiError::type_mismatch::<T>(format!("{}::{}", self.class, name)))
    }

    /// Take the next argument by value
    pub fn next_cloned<T: Injectable + Clone>(&mut self) -> Result<T> {
        self.next::<T>().map(|value| (*value).clone())
    }

    /// Number of arguments not consumed yet
    #[inline]
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

/// Everything the container needs to know about a class
pub struct ClassDescriptor {
    name: String,
    constructor: Option<Vec<Parameter>>,
    construct: ConstructFn,
}

impl ClassDescriptor {
    /// A class without constructor parameters
    pub fn without_constructor<T, F>(name: impl Into<String>, factory: F) -> Self
    where
        T: Injectable,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            constructor: None,
            construct: Arc::new(move |_: &mut Arguments| Ok(erase(factory()))),
        }
    }

    /// A class whose constructor takes `parameters`, in order
    pub fn with_constructor<T, F>(name: impl Into<String>, parameters: Vec<Parameter>, construct: F) -> Self
    where
        T: Injectable,
        F: Fn(&mut Arguments) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            constructor: Some(parameters),
            construct: Arc::new(move |args: &mut Arguments| construct(args).map(erase)),
        }
    }

    /// Class name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn has_constructor(&self) -> bool {
        self.constructor.is_some()
    }

    /// Constructor parameters; empty when there is no constructor
    #[inline]
    pub fn parameters(&self) -> &[Parameter] {
        self.constructor.as_deref().unwrap_or(&[])
    }

    /// Invoke the constructor with one value per parameter
    pub fn instantiate(&self, values: Vec<AnyService>) -> Result<AnyService> {
        let named = self
            .parameters()
            .iter()
            .map(|p| p.name().to_string())
            .zip(values)
            .collect();
        let mut args = Arguments::new(self.name.clone(), named);

        #[cfg(feature = "logging")]
        trace!(
            target: "autowire_di",
            class = %self.name,
            arguments = args.remaining(),
            "Invoking constructor"
        );

        (self.construct)(&mut args)
    }
}

impl std::fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("name", &self.name)
            .field("constructor", &self.constructor)
            .finish()
    }
}

/// Types that describe their own constructor.
///
/// Usually derived with `#[derive(Autowire)]` (`derive` feature).
pub trait Autowire: Injectable + Sized {
    /// Class name, `::`-separated
    const CLASS: &'static str;

    /// Describe the constructor
    fn descriptor() -> ClassDescriptor;
}

/// Class lookup capability used during discovery
pub trait Reflector: Send + Sync {
    /// Describe `class_name`, or `None` if no such class exists
    fn reflect(&self, class_name: &str) -> Option<Arc<ClassDescriptor>>;
}

impl<R: Reflector + ?Sized> Reflector for Arc<R> {
    #[inline]
    fn reflect(&self, class_name: &str) -> Option<Arc<ClassDescriptor>> {
        (**self).reflect(class_name)
    }
}

/// In-memory [`Reflector`] backed by registered descriptors.
///
/// # Examples
///
/// ```rust
/// use autowire_di::{ClassCatalog, ClassDescriptor, Reflector};
///
/// struct Clock;
///
/// let catalog = ClassCatalog::new();
/// catalog.register(ClassDescriptor::without_constructor("App::Clock", || Clock));
/// assert!(catalog.reflect("App::Clock").is_some());
/// assert!(catalog.reflect("App::Calendar").is_none());
/// ```
pub struct ClassCatalog {
    classes: DashMap<String, Arc<ClassDescriptor>, RandomState>,
}

impl ClassCatalog {
    pub fn new() -> Self {
        Self {
            classes: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8),
        }
    }

    /// Register a descriptor, replacing any previous one with the same name
    pub fn register(&self, descriptor: ClassDescriptor) {
        self.classes
            .insert(descriptor.name().to_string(), Arc::new(descriptor));
    }

    /// Register an [`Autowire`] type
    pub fn register_type<T: Autowire>(&self) {
        self.register(T::descriptor());
    }

    /// Register an [`Autowire`] type and continue the chain
    pub fn with<T: Autowire>(self) -> Self {
        self.register_type::<T>();
        self
    }

    #[inline]
    pub fn contains(&self, class_name: &str) -> bool {
        self.classes.contains_key(class_name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Names of all registered classes
    pub fn names(&self) -> Vec<String> {
        self.classes.iter().map(|r| r.key().clone()).collect()
    }
}

impl Default for ClassCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Reflector for ClassCatalog {
    fn reflect(&self, class_name: &str) -> Option<Arc<ClassDescriptor>> {
        self.classes.get(class_name).map(|r| Arc::clone(r.value()))
    }
}

impl std::fmt::Debug for ClassCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassCatalog")
            .field("count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Point {
        x: i64,
        label: Arc<String>,
    }

    fn point_descriptor() -> ClassDescriptor {
        ClassDescriptor::with_constructor(
            "Geo::Point",
            vec![
                Parameter::untyped("x").with_default(0i64),
                Parameter::typed("label", "Geo::Label"),
            ],
            |args| {
                Ok(Point {
                    x: args.next_cloned::<i64>()?,
                    label: args.next::<String>()?,
                })
            },
        )
    }

    #[test]
    fn test_parameter_keys() {
        let param = Parameter::untyped("otherValue");
        assert_eq!(param.name(), "otherValue");
        assert_eq!(param.key(), "other_value");
        assert!(param.class().is_none());
        assert!(!param.has_default());
    }

    #[test]
    fn test_instantiate() {
        let descriptor = point_descriptor();
        assert!(descriptor.has_constructor());
        assert_eq!(descriptor.parameters().len(), 2);

        let point = descriptor
            .instantiate(vec![erase(7i64), erase(String::from("home"))])
            .unwrap()
            .downcast::<Point>()
            .unwrap();
        assert_eq!(point.x, 7);
        assert_eq!(point.label.as_str(), "home");
    }

    #[test]
    fn test_argument_type_mismatch() {
        let descriptor = point_descriptor();
        let err = descriptor
            .instantiate(vec![erase(String::from("seven")), erase(String::from("home"))])
            .err()
            .unwrap();
        match err {
            DiError::TypeMismatch { id, expected } => {
                assert_eq!(id, "Geo::Point::x");
                assert_eq!(expected, "i64");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_argument() {
        let descriptor = point_descriptor();
        let err = descriptor.instantiate(vec![erase(1i64)]).err().unwrap();
        assert!(matches!(err, DiError::CreationFailed { .. }));
    }

    #[test]
    fn test_catalog_reflect() {
        let catalog = ClassCatalog::new();
        assert!(catalog.is_empty());

        catalog.register(point_descriptor());
        assert!(catalog.contains("Geo::Point"));
        assert_eq!(catalog.len(), 1);

        let shared: Arc<ClassCatalog> = Arc::new(catalog);
        let found = shared.reflect("Geo::Point").unwrap();
        assert_eq!(found.name(), "Geo::Point");
        assert!(shared.reflect("Geo::Line").is_none());
    }
}
