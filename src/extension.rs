//! Decorator chains
//!
//! `extend(id, decorator)` stores an [`Extension`] record over whatever was
//! registered under `id`. Resolving the record walks the chain down to the
//! real source, then applies the decorators oldest first.
//!
//! ```text
//! store[id] = Extension(d2) ─base─> Extension(d1) ─base─> v0 (or nothing)
//! get(id)   = d2(d1(v0))
//! ```
//!
//! While the chain is being folded the store temporarily holds the source
//! and then each intermediate value under `id`; the original entry is put
//! back afterwards. A decorator that resolves the id it is extending sees
//! the intermediate value, not the decorated one.

use crate::factory::{Callable, Definition};
use crate::provider::AnyService;
use crate::storage::Entry;
use crate::{Container, Result};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Type-erased decorator
pub type DecoratorFn = Arc<dyn Fn(AnyService, &Container) -> Result<AnyService> + Send + Sync>;

/// One link of a decorator chain
pub struct Extension {
    id: String,
    base: Option<Entry>,
    decorator: DecoratorFn,
}

impl Extension {
    pub(crate) fn new(id: impl Into<String>, base: Option<Entry>, decorator: DecoratorFn) -> Self {
        Self {
            id: id.into(),
            base,
            decorator,
        }
    }

    /// Identifier this extension decorates
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether something was registered under the id when `extend` was called
    #[inline]
    pub fn has_base(&self) -> bool {
        self.base.is_some()
    }

    /// Number of decorators in the chain ending at this link
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut base = self.base.as_ref();
        while let Some(Entry::Extension(link)) = base {
            depth += 1;
            base = link.base.as_ref();
        }
        depth
    }

    /// Resolve the chain ending at this link against `container`
    pub fn resolve(self: &Arc<Self>, container: &Container) -> Result<AnyService> {
        unwind(container, self)
    }
}

impl std::fmt::Debug for Extension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extension")
            .field("id", &self.id)
            .field("has_base", &self.has_base())
            .field("depth", &self.depth())
            .finish()
    }
}

impl From<Arc<Extension>> for Definition {
    /// Share the decorated value: the chain is resolved once and memoized
    fn from(extension: Arc<Extension>) -> Self {
        Callable::erased(move |container| extension.resolve(container)).into()
    }
}

/// Unwind the chain ending at `head` and restore the store afterwards
pub(crate) fn unwind(container: &Container, head: &Arc<Extension>) -> Result<AnyService> {
    let store = container.store();
    let id = head.id();
    let original = store.get(id);

    // Newest link first
    let mut chain = vec![Arc::clone(head)];
    let mut bottom = head.base.clone();
    loop {
        match bottom {
            Some(Entry::Extension(link)) => {
                bottom = link.base.clone();
                chain.push(link);
            }
            other => {
                bottom = other;
                break;
            }
        }
    }

    #[cfg(feature = "logging")]
    debug!(
        target: "autowire_di",
        service = id,
        decorators = chain.len(),
        has_base = bottom.is_some(),
        "Resolving extension chain"
    );

    match bottom {
        Some(entry) => store.insert(id, entry),
        None => {
            store.remove(id);
        }
    }

    let outcome = fold(container, id, &chain);

    match original {
        Some(entry) => store.insert(id, entry),
        None => {
            store.remove(id);
        }
    }

    outcome
}

fn fold(container: &Container, id: &str, chain: &[Arc<Extension>]) -> Result<AnyService> {
    let mut value = container.get(id)?;

    for (step, link) in chain.iter().rev().enumerate() {
        #[cfg(feature = "logging")]
        trace!(target: "autowire_di", service = id, step, "Applying decorator");
        #[cfg(not(feature = "logging"))]
        let _ = step;

        value = (link.decorator)(value, container)?;
        container.store().insert(id, Entry::Value(Arc::clone(&value)));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::erase;
    use crate::DiError;

    fn append(suffix: &'static str) -> DecoratorFn {
        Arc::new(move |inner: AnyService, _: &Container| {
            let inner = inner
                .downcast::<String>()
                .map_err(|_| DiError::type_mismatch::<String>("greeting"))?;
            Ok(erase(format!("{inner}{suffix}")))
        })
    }

    #[test]
    fn test_depth() {
        let first = Arc::new(Extension::new("greeting", None, append("!")));
        let second = Arc::new(Extension::new(
            "greeting",
            Some(Entry::Extension(Arc::clone(&first))),
            append("?"),
        ));
        assert_eq!(first.depth(), 1);
        assert_eq!(second.depth(), 2);
        assert!(!first.has_base());
        assert!(second.has_base());
    }

    #[test]
    fn test_unwind_applies_in_registration_order() {
        let container = Container::new();
        let base = Entry::Value(erase(String::from("hello")));
        let first = Arc::new(Extension::new("greeting", Some(base), append(" world")));
        let second = Arc::new(Extension::new(
            "greeting",
            Some(Entry::Extension(Arc::clone(&first))),
            append("!"),
        ));
        container.store().insert("greeting", Entry::Extension(Arc::clone(&second)));

        let value = second.resolve(&container).unwrap();
        assert_eq!(value.downcast::<String>().unwrap().as_str(), "hello world!");

        // The record is back in place for the next resolution
        assert!(matches!(container.store().get("greeting"), Some(Entry::Extension(_))));
    }

    #[test]
    fn test_unwind_without_source_restores_store() {
        let container = Container::new();
        let link = Arc::new(Extension::new("missing", None, append("!")));
        container.store().insert("missing", Entry::Extension(Arc::clone(&link)));

        let err = link.resolve(&container).err().unwrap();
        assert!(err.is_not_found());
        assert!(matches!(container.store().get("missing"), Some(Entry::Extension(_))));
    }
}
