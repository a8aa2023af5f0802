//! Bounded memoization of per-molecule featurization.
//!
//! Parsing and featurizing a notation is pure given the batching mode,
//! so repeated notations across batches reuse the cached result. The
//! key carries every option that changes the output, and capacity is
//! bounded with least-recently-used eviction so long-running encoders
//! hold steady memory.

use std::collections::HashMap;
use std::sync::Arc;

use super::{BatchOptions, MolFeatures};

pub(crate) const DEFAULT_CACHE_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    notation: String,
    add_hs: bool,
    three_d: bool,
    virtual_edges: bool,
    embed_seed: u64,
}

impl CacheKey {
    fn new(notation: &str, options: &BatchOptions) -> Self {
        Self {
            notation: notation.to_owned(),
            add_hs: options.add_hs,
            three_d: options.three_d,
            virtual_edges: options.virtual_edges,
            // The seed only matters when a conformer is generated.
            embed_seed: if options.three_d {
                options.embed_seed
            } else {
                0
            },
        }
    }
}

#[derive(Debug)]
pub(crate) struct FeatureCache {
    entries: HashMap<CacheKey, (Arc<MolFeatures>, u64)>,
    capacity: usize,
    tick: u64,
}

impl FeatureCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
            tick: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn get(&mut self, notation: &str, options: &BatchOptions) -> Option<Arc<MolFeatures>> {
        self.tick += 1;
        let key = CacheKey::new(notation, options);
        let (features, stamp) = self.entries.get_mut(&key)?;
        *stamp = self.tick;
        Some(Arc::clone(features))
    }

    pub(crate) fn insert(
        &mut self,
        notation: &str,
        options: &BatchOptions,
        features: Arc<MolFeatures>,
    ) {
        if self.capacity == 0 {
            return;
        }
        self.tick += 1;
        if self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        self.entries
            .insert(CacheKey::new(notation, options), (features, self.tick));
    }

    fn evict_oldest(&mut self) {
        if let Some(key) = self
            .entries
            .iter()
            .min_by_key(|(_, (_, stamp))| *stamp)
            .map(|(key, _)| key.clone())
        {
            self.entries.remove(&key);
        }
    }
}
