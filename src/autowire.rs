//! Constructor auto-wiring
//!
//! [`try_build_factory`] walks a class's constructor parameters and resolves
//! each one. Each parameter is satisfied by, in order:
//!
//! 1. an override keyed by the normalized parameter name,
//! 2. the service-specific entry `"{service_id}.{param}"`,
//! 3. its default value,
//! 4. the service id derived from its declared class.
//!
//! A parameter that none of these satisfy makes the class not auto-wireable.
//! That outcome is `Ok(None)`, never an error, so discovery can move on to
//! the next candidate.

use crate::normalize::{param_key, to_id_form};
use crate::provider::{erase, erase_arc, AnyService, Injectable};
use crate::reflect::ClassDescriptor;
use crate::{Container, DefaultPolicy, DiError, Result};
use ahash::RandomState;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Constructor arguments supplied by name, bypassing auto-wiring.
///
/// Names are normalized, so `otherValue` and `other_value` are the same key.
///
/// # Examples
///
/// ```rust
/// use autowire_di::Overrides;
///
/// let overrides = Overrides::new().with("otherValue", 1i64);
/// assert!(overrides.get("other_value").is_some());
/// ```
#[derive(Clone, Default)]
pub struct Overrides {
    values: HashMap<String, AnyService, RandomState>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value and continue the chain
    pub fn with<T: Injectable>(mut self, name: &str, value: T) -> Self {
        self.insert_erased(name, erase(value));
        self
    }

    /// Add a value that is already behind an `Arc`, keeping its identity
    pub fn with_arc<T: Injectable>(mut self, name: &str, value: Arc<T>) -> Self {
        self.insert_erased(name, erase_arc(value));
        self
    }

    pub fn insert_erased(&mut self, name: &str, value: AnyService) {
        self.values.insert(param_key(name), value);
    }

    /// Look up by parameter name
    pub fn get(&self, name: &str) -> Option<&AnyService> {
        self.values.get(&param_key(name))
    }

    /// Look up by an already normalized key
    #[inline]
    pub(crate) fn get_key(&self, key: &str) -> Option<&AnyService> {
        self.values.get(key)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl std::fmt::Debug for Overrides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

/// Deferred constructor invocation bound to resolved arguments
#[derive(Clone)]
pub(crate) struct Autowired {
    class: Arc<ClassDescriptor>,
    /// One bound argument per constructor parameter
    arguments: Vec<AnyService>,
}

impl Autowired {
    #[cfg(test)]
    pub(crate) fn class_name(&self) -> &str {
        self.class.name()
    }

    /// Build an instance. `overrides` win over the bound arguments.
    pub(crate) fn invoke(&self, overrides: &Overrides) -> Result<AnyService> {
        let values = self
            .class
            .parameters()
            .iter()
            .zip(&self.arguments)
            .map(|(param, bound)| overrides.get_key(param.key()).unwrap_or(bound).clone())
            .collect();
        self.class.instantiate(values)
    }
}

thread_local! {
    /// Classes whose factory is being built on this thread, with the owning container
    static BUILDING: RefCell<Vec<(usize, String)>> = const { RefCell::new(Vec::new()) };
}

/// Marks a class as being built for as long as it lives
struct BuildGuard;

impl BuildGuard {
    fn enter(container: usize, class: &str) -> Option<Self> {
        BUILDING.with(|building| {
            let mut building = building.borrow_mut();
            if building
                .iter()
                .any(|(owner, name)| *owner == container && name == class)
            {
                return None;
            }
            building.push((container, class.to_string()));
            Some(BuildGuard)
        })
    }
}

impl Drop for BuildGuard {
    fn drop(&mut self) {
        BUILDING.with(|building| {
            building.borrow_mut().pop();
        });
    }
}

/// Try to bind every constructor parameter of `class`.
///
/// `service_id` enables `"{service_id}.{param}"` lookups. Returns `Ok(None)`
/// when some parameter cannot be satisfied.
pub(crate) fn try_build_factory(
    container: &Container,
    class: &Arc<ClassDescriptor>,
    service_id: Option<&str>,
    overrides: &Overrides,
) -> Result<Option<Autowired>> {
    let Some(_guard) = BuildGuard::enter(container.identity(), class.name()) else {
        return Err(DiError::circular(class.name()));
    };

    #[cfg(feature = "logging")]
    trace!(
        target: "autowire_di",
        class = class.name(),
        service = service_id,
        parameters = class.parameters().len(),
        "Auto-wiring constructor"
    );

    let policy = container.policy();
    let mut arguments = Vec::with_capacity(class.parameters().len());
    let mut defaults_only = false;

    for param in class.parameters() {
        if defaults_only {
            match param.default_value() {
                Some(default) => {
                    arguments.push(Arc::clone(default));
                    continue;
                }
                None => {
                    #[cfg(feature = "logging")]
                    debug!(
                        target: "autowire_di",
                        class = class.name(),
                        parameter = param.name(),
                        "Required parameter after a defaulted one, class is not auto-wireable"
                    );
                    return Ok(None);
                }
            }
        }

        if let Some(value) = overrides.get_key(param.key()) {
            arguments.push(Arc::clone(value));
            continue;
        }

        if let Some(service_id) = service_id {
            let dependency = format!("{}.{}", service_id, param.key());
            if container.has(&dependency)? {
                let value = container.get(&dependency).map_err(|e| e.context(&dependency))?;
                arguments.push(value);
                continue;
            }
        }

        if let Some(default) = param.default_value() {
            arguments.push(Arc::clone(default));
            defaults_only = policy == DefaultPolicy::Stop;
            continue;
        }

        let Some(dependency_class) = param.class() else {
            #[cfg(feature = "logging")]
            trace!(
                target: "autowire_di",
                class = class.name(),
                parameter = param.name(),
                "Untyped parameter cannot be inferred"
            );
            return Ok(None);
        };

        let dependency = to_id_form(dependency_class);
        if !container.has(&dependency)? {
            #[cfg(feature = "logging")]
            trace!(
                target: "autowire_di",
                class = class.name(),
                parameter = param.name(),
                dependency = %dependency,
                "Dependency not resolvable"
            );
            return Ok(None);
        }
        let value = container.get(&dependency).map_err(|e| e.context(&dependency))?;
        arguments.push(value);
    }

    Ok(Some(Autowired {
        class: Arc::clone(class),
        arguments,
    }))
}
