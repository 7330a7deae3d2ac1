//! Alias bookkeeping
//!
//! Each `(from, to)` pair remembers the marker it installed. Re-aliasing
//! with the same pair while that exact marker is still live is a no-op;
//! aliasing `from` to another target replaces the entry.

use crate::storage::{Entry, ServiceStore};
use ahash::RandomState;
use dashmap::DashMap;
use std::cell::RefCell;
use std::sync::Arc;

thread_local! {
    // Aliases being followed on this thread, tagged with the owning container
    static FOLLOWING: RefCell<Vec<(usize, String)>> = const { RefCell::new(Vec::new()) };
}

/// Marks an alias as being followed for as long as it lives
pub(crate) struct FollowGuard;

impl FollowGuard {
    /// None if `id` is already being followed, i.e. the aliases form a loop
    pub(crate) fn enter(container: usize, id: &str) -> Option<Self> {
        FOLLOWING.with(|following| {
            let mut following = following.borrow_mut();
            if following
                .iter()
                .any(|(owner, followed)| *owner == container && followed == id)
            {
                return None;
            }
            following.push((container, id.to_string()));
            Some(FollowGuard)
        })
    }
}

impl Drop for FollowGuard {
    fn drop(&mut self) {
        FOLLOWING.with(|following| {
            following.borrow_mut().pop();
        });
    }
}

/// Stored under the alias source; points at the target identifier
#[derive(Debug)]
pub(crate) struct AliasTarget {
    target: String,
}

impl AliasTarget {
    #[inline]
    pub(crate) fn target(&self) -> &str {
        &self.target
    }
}

pub(crate) struct AliasTable {
    pairs: DashMap<(String, String), Arc<AliasTarget>, RandomState>,
}

impl AliasTable {
    pub(crate) fn new() -> Self {
        Self {
            pairs: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8),
        }
    }

    fn recorded(&self, from: &str, to: &str) -> Option<Arc<AliasTarget>> {
        self.pairs
            .get(&(from.to_string(), to.to_string()))
            .map(|r| Arc::clone(r.value()))
    }

    /// Install `from -> to` in `store`. Returns false when nothing changed.
    pub(crate) fn install(&self, store: &ServiceStore, from: &str, to: &str) -> bool {
        if from == to {
            return false;
        }
        if let (Some(Entry::Alias(live)), Some(recorded)) = (store.get(from), self.recorded(from, to)) {
            if Arc::ptr_eq(&live, &recorded) {
                return false;
            }
        }

        let marker = Arc::new(AliasTarget {
            target: to.to_string(),
        });
        self.pairs
            .insert((from.to_string(), to.to_string()), Arc::clone(&marker));
        store.insert(from, Entry::Alias(marker));
        true
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.pairs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::erase;

    #[test]
    fn test_self_alias_is_noop() {
        let store = ServiceStore::new();
        let aliases = AliasTable::new();

        assert!(!aliases.install(&store, "a", "a"));
        assert!(!store.contains("a"));
        assert_eq!(aliases.len(), 0);
    }

    #[test]
    fn test_identical_alias_is_noop() {
        let store = ServiceStore::new();
        let aliases = AliasTable::new();

        assert!(aliases.install(&store, "a", "b"));
        assert!(!aliases.install(&store, "a", "b"));
        assert_eq!(aliases.len(), 1);
    }

    #[test]
    fn test_realias_overwrites() {
        let store = ServiceStore::new();
        let aliases = AliasTable::new();

        aliases.install(&store, "sum", "one");
        aliases.install(&store, "sum", "two");

        match store.get("sum") {
            Some(Entry::Alias(target)) => assert_eq!(target.target(), "two"),
            other => panic!("unexpected entry: {other:?}"),
        }

        // Back to the first target: the recorded marker is no longer live
        assert!(aliases.install(&store, "sum", "one"));
        match store.get("sum") {
            Some(Entry::Alias(target)) => assert_eq!(target.target(), "one"),
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn test_follow_guard_detects_reentry() {
        let outer = FollowGuard::enter(1, "a");
        assert!(outer.is_some());
        assert!(FollowGuard::enter(1, "a").is_none());
        // Another container may follow the same id
        assert!(FollowGuard::enter(2, "a").is_some());

        drop(outer);
        assert!(FollowGuard::enter(1, "a").is_some());
    }

    #[test]
    fn test_alias_over_value_with_same_target_name() {
        let store = ServiceStore::new();
        let aliases = AliasTable::new();

        aliases.install(&store, "a", "b");
        store.insert("a", Entry::Value(erase(1u8)));

        // The recorded marker was clobbered by a value, so the alias is reinstalled
        assert!(aliases.install(&store, "a", "b"));
        assert!(matches!(store.get("a"), Some(Entry::Alias(_))));
    }
}
