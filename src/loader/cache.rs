//! Bounded LRU cache for loaded workspaces (spec §4.H).
//!
//! No crate in this project's dependency stack provides an LRU cache, so —
//! consistent with how the rest of this codebase writes its own small
//! infrastructure rather than reaching for a crate it doesn't already carry
//! — this is a plain hand-rolled one: a map plus a recency-ordered key list.

use std::collections::HashMap;

use crate::workspace::{Workspace, WorkspaceSlot};

pub struct LruCache {
    capacity: usize,
    entries: HashMap<WorkspaceSlot, Workspace>,
    /// Most-recently-used at the back.
    order: Vec<WorkspaceSlot>,
}

impl LruCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        LruCache {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Look up without disturbing recency (used by callers that just need a
    /// peek); prefer `get` for normal access.
    #[must_use]
    pub fn peek(&self, slot: WorkspaceSlot) -> Option<&Workspace> {
        self.entries.get(&slot)
    }

    /// Access a cached entry, promoting it to most-recently-used.
    pub fn get(&mut self, slot: WorkspaceSlot) -> Option<&Workspace> {
        if self.entries.contains_key(&slot) {
            self.touch(slot);
            self.entries.get(&slot)
        } else {
            None
        }
    }

    /// Insert or replace an entry, evicting the least-recently-used entry
    /// first if the cache is at capacity.
    pub fn insert(&mut self, slot: WorkspaceSlot, workspace: Workspace) {
        if !self.entries.contains_key(&slot) && self.entries.len() >= self.capacity {
            if let Some(lru) = self.order.first().copied() {
                self.order.remove(0);
                self.entries.remove(&lru);
            }
        }
        self.entries.insert(slot, workspace);
        self.touch(slot);
    }

    pub fn invalidate(&mut self, slot: WorkspaceSlot) {
        self.entries.remove(&slot);
        self.order.retain(|&s| s != slot);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn touch(&mut self, slot: WorkspaceSlot) {
        self.order.retain(|&s| s != slot);
        self.order.push(slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ws(name: &str) -> Workspace {
        Workspace::new(name.to_string(), 0)
    }

    #[test]
    fn insert_beyond_capacity_evicts_least_recently_used() {
        let mut cache = LruCache::new(2);
        cache.insert(1, ws("a"));
        cache.insert(2, ws("b"));
        cache.insert(3, ws("c"));
        assert!(cache.peek(1).is_none());
        assert!(cache.peek(2).is_some());
        assert!(cache.peek(3).is_some());
    }

    #[test]
    fn access_promotes_to_most_recently_used() {
        let mut cache = LruCache::new(2);
        cache.insert(1, ws("a"));
        cache.insert(2, ws("b"));
        cache.get(1);
        cache.insert(3, ws("c"));
        assert!(cache.peek(1).is_some());
        assert!(cache.peek(2).is_none());
    }

    #[test]
    fn invalidate_removes_entry() {
        let mut cache = LruCache::new(2);
        cache.insert(1, ws("a"));
        cache.invalidate(1);
        assert!(cache.peek(1).is_none());
        assert_eq!(cache.len(), 0);
    }
}
