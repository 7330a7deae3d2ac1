//! Storage for the container
//!
//! String-keyed entries in a `DashMap`. Entries are cloned out on every read
//! so no shard lock is ever held while user code runs.

use crate::alias::AliasTarget;
use crate::extension::Extension;
use crate::factory::SharedFactory;
use crate::provider::AnyService;
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::Arc;

/// A stored service entry
#[derive(Clone)]
pub(crate) enum Entry {
    /// Already constructed, returned as-is
    Value(AnyService),
    /// Created on first access, then memoized
    Shared(Arc<SharedFactory>),
    /// Resolving means resolving the target
    Alias(Arc<AliasTarget>),
    /// Pending decorator chain
    Extension(Arc<Extension>),
}

impl Entry {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Entry::Value(_) => "value",
            Entry::Shared(_) => "shared",
            Entry::Alias(_) => "alias",
            Entry::Extension(_) => "extension",
        }
    }
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entry::Alias(target) => write!(f, "Alias({})", target.target()),
            Entry::Shared(shared) if shared.is_initialized() => f.write_str("shared (initialized)"),
            other => f.write_str(other.kind()),
        }
    }
}

/// Identifier to entry map
pub(crate) struct ServiceStore {
    entries: DashMap<String, Entry, RandomState>,
}

impl ServiceStore {
    /// Create new empty storage.
    ///
    /// Uses 8 shards; containers rarely hold more than a few hundred entries.
    #[inline]
    pub(crate) fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create with pre-allocated capacity.
    #[inline]
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let shard_amount = if capacity <= 64 { 8 } else { 16 };
        Self {
            entries: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                RandomState::new(),
                shard_amount,
            ),
        }
    }

    #[inline]
    pub(crate) fn insert(&self, id: impl Into<String>, entry: Entry) {
        self.entries.insert(id.into(), entry);
    }

    /// Insert unless `id` is already stored. Returns true if inserted.
    #[inline]
    pub(crate) fn insert_if_absent(&self, id: impl Into<String>, entry: Entry) -> bool {
        match self.entries.entry(id.into()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(entry);
                true
            }
        }
    }

    /// Clone the entry out of the map
    #[inline]
    pub(crate) fn get(&self, id: &str) -> Option<Entry> {
        self.entries.get(id).map(|r| r.value().clone())
    }

    #[inline]
    pub(crate) fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    #[inline]
    pub(crate) fn remove(&self, id: &str) -> Option<Entry> {
        self.entries.remove(id).map(|(_, entry)| entry)
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All stored identifiers
    pub(crate) fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|r| r.key().clone()).collect()
    }
}

impl Default for ServiceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServiceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceStore")
            .field("count", &self.len())
            .finish()
    }
}
