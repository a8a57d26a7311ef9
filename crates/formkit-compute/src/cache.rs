//! Bounded LRU cache for computation results.
//!
//! Keys combine the computation id with a canonical JSON encoding of the
//! slice of live data the computation depends on (its own source plus its
//! filter's source), so two data states that agree on those dependencies
//! share an entry. The cache is purely an optimization: a hit returns a
//! clone of exactly what a fresh computation would produce.

use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroUsize;

use lru::LruCache;
use serde_json::Value;
use tracing::debug;

use formkit_model::{Computation, FormData};

use crate::engine::{ComputeResult, calculate};

pub const DEFAULT_CACHE_CAPACITY: usize = 200;

pub struct ComputeCache {
    entries: LruCache<String, ComputeResult>,
    /// Computation id -> root data keys it was registered as depending on.
    dependencies: BTreeMap<String, BTreeSet<String>>,
}

impl ComputeCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            dependencies: BTreeMap::new(),
        }
    }

    /// Serve from the cache or compute and remember. Eviction of the oldest
    /// entry happens inline with the insert when the capacity overflows.
    pub fn get_or_compute(&mut self, computation: &Computation, data: &FormData) -> ComputeResult {
        let deps = dependency_keys(computation);
        self.dependencies
            .entry(computation.id.clone())
            .or_insert_with(|| deps.iter().cloned().collect());
        let key = cache_key(computation, data, &deps);
        if let Some(hit) = self.entries.get(&key) {
            return hit.clone();
        }
        let result = calculate(computation, data);
        self.entries.put(key, result.clone());
        result
    }

    /// Drop every entry whose computation may depend on `field_key`.
    ///
    /// Deliberately conservative: when the key is tracked by any registered
    /// computation the whole cache is cleared — the worst failure mode of a
    /// finer scheme would be a stale value, this one's is a recomputation.
    pub fn invalidate(&mut self, field_key: &str) {
        let tracked = self
            .dependencies
            .values()
            .any(|deps| deps.contains(field_key));
        if tracked {
            debug!(field_key, "dependency changed, clearing compute cache");
            self.entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ComputeCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Root data keys a computation reads: its source's table (or field) key
/// plus its filter's source key.
pub fn dependency_keys(computation: &Computation) -> Vec<String> {
    let mut keys = vec![root_key(&computation.source).to_string()];
    if let Some(filter) = &computation.filter {
        let filter_root = root_key(&filter.source).to_string();
        if !keys.contains(&filter_root) {
            keys.push(filter_root);
        }
    }
    keys
}

fn root_key(path: &str) -> &str {
    let head = path.split('.').next().unwrap_or(path);
    head.split('[').next().unwrap_or(head)
}

fn cache_key(computation: &Computation, data: &FormData, deps: &[String]) -> String {
    let subset: BTreeMap<&str, &Value> = deps
        .iter()
        .filter_map(|key| data.get(key).map(|value| (key.as_str(), value)))
        .collect();
    let encoded = serde_json::to_string(&subset).unwrap_or_default();
    format!("{}:{encoded}", computation.id)
}
