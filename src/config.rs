//! Container configuration
//!
//! [`ContainerConfig`] is the serializable part of a container's setup and
//! can be loaded from JSON. [`ContainerBuilder`] combines it with the parts
//! that only exist in code: the reflector and initial definitions.
//!
//! ```json
//! {
//!     "prefixes": [{"external": "", "internal": "auto_wire."}],
//!     "default_policy": "continue",
//!     "negative_cache": {"path": "var/cache/misses.json", "persist_probability": 0.1}
//! }
//! ```

use crate::factory::Definition;
use crate::negative_cache::NegativeCache;
use crate::prefix::{PrefixMap, PrefixRule};
use crate::provider::Injectable;
use crate::reflect::{Autowire, ClassCatalog, ClassDescriptor, Reflector};
use crate::{Container, DiError, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

/// What auto-wiring does after a parameter fell back to its default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultPolicy {
    /// Keep wiring later parameters normally
    #[default]
    Continue,
    /// Later parameters may only take their own defaults
    Stop,
}

fn default_persist_probability() -> f64 {
    0.1
}

/// Where the negative cache lives and how often it is written
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NegativeCacheConfig {
    pub path: PathBuf,
    #[serde(default = "default_persist_probability")]
    pub persist_probability: f64,
}

impl NegativeCacheConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            persist_probability: default_persist_probability(),
        }
    }

    pub fn with_probability(mut self, persist_probability: f64) -> Self {
        self.persist_probability = persist_probability;
        self
    }

    fn open(&self) -> NegativeCache {
        NegativeCache::with_file(&self.path, self.persist_probability)
    }
}

/// Serializable container settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Prefix rules tried after the identity rule, in order
    pub prefixes: Vec<PrefixRule>,
    pub default_policy: DefaultPolicy,
    /// Persisted negative cache; in-memory when absent
    pub negative_cache: Option<NegativeCacheConfig>,
}

impl ContainerConfig {
    /// Parse from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| DiError::Config(e.to_string()))
    }

    /// Read and parse a JSON file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| DiError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }
}

/// Tries several reflectors in order
struct Layered(Vec<Arc<dyn Reflector>>);

impl Reflector for Layered {
    fn reflect(&self, class_name: &str) -> Option<Arc<ClassDescriptor>> {
        self.0.iter().find_map(|r| r.reflect(class_name))
    }
}

/// Fluent container setup.
///
/// # Examples
///
/// ```rust
/// use autowire_di::{ContainerBuilder, DefaultPolicy};
///
/// let container = ContainerBuilder::new()
///     .prefix("", "app.")
///     .policy(DefaultPolicy::Stop)
///     .value("app.name", String::from("demo"))
///     .build();
///
/// assert_eq!(container.get_as::<String>("name").unwrap().as_str(), "demo");
/// ```
pub struct ContainerBuilder {
    prefixes: PrefixMap,
    policy: DefaultPolicy,
    negative_cache: Option<NegativeCacheConfig>,
    reflector: Option<Arc<dyn Reflector>>,
    catalog: ClassCatalog,
    definitions: Vec<(String, Definition)>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self {
            prefixes: PrefixMap::new(),
            policy: DefaultPolicy::default(),
            negative_cache: None,
            reflector: None,
            catalog: ClassCatalog::new(),
            definitions: Vec::new(),
        }
    }

    /// Start from parsed settings
    pub fn from_config(config: ContainerConfig) -> Self {
        let mut builder = Self::new();
        for rule in config.prefixes {
            builder.prefixes.push(rule);
        }
        builder.policy = config.default_policy;
        builder.negative_cache = config.negative_cache;
        builder
    }

    /// Add a prefix rule
    pub fn prefix(mut self, external: impl Into<String>, internal: impl Into<String>) -> Self {
        self.prefixes.push(PrefixRule::new(external, internal));
        self
    }

    /// Replace all prefix rules
    pub fn prefixes(mut self, prefixes: PrefixMap) -> Self {
        self.prefixes = prefixes;
        self
    }

    pub fn policy(mut self, policy: DefaultPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Persist the negative cache
    pub fn negative_cache(mut self, config: NegativeCacheConfig) -> Self {
        self.negative_cache = Some(config);
        self
    }

    /// Class lookup used during discovery. Classes added with
    /// [`class`](Self::class) are consulted first.
    pub fn reflector<R: Reflector + 'static>(mut self, reflector: R) -> Self {
        self.reflector = Some(Arc::new(reflector));
        self
    }

    /// Make an [`Autowire`] type discoverable
    pub fn class<T: Autowire>(self) -> Self {
        self.catalog.register_type::<T>();
        self
    }

    /// Make a hand-written descriptor discoverable
    pub fn descriptor(self, descriptor: ClassDescriptor) -> Self {
        self.catalog.register(descriptor);
        self
    }

    /// Register an initial value
    pub fn value<T: Injectable>(self, id: impl Into<String>, value: T) -> Self {
        self.definition(id, Definition::value(value))
    }

    /// Register an initial definition
    pub fn definition(mut self, id: impl Into<String>, definition: impl Into<Definition>) -> Self {
        self.definitions.push((id.into(), definition.into()));
        self
    }

    pub fn build(self) -> Container {
        let reflector: Arc<dyn Reflector> = match (self.catalog.is_empty(), self.reflector) {
            (_, None) => Arc::new(self.catalog),
            (true, Some(reflector)) => reflector,
            (false, Some(reflector)) => Arc::new(Layered(vec![Arc::new(self.catalog), reflector])),
        };
        let negative_cache = self
            .negative_cache
            .as_ref()
            .map(NegativeCacheConfig::open)
            .unwrap_or_default();

        let container = Container::from_parts(self.prefixes, self.policy, negative_cache, reflector);
        for (id, definition) in self.definitions {
            container.set(id, definition);
        }
        container
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
