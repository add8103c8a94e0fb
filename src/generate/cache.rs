//! Candidate caching
//!
//! Ranking entry/exit pairs is the most repeated piece of work in
//! generation. Callers that generate many puzzles can hand the placement
//! service a cache; the service never decides on its own whether one exists.

use std::collections::HashMap;
use std::sync::Mutex;

use super::placement::EntryExitPair;
use crate::tuning::{Difficulty, SpacingConstraints};

/// Identifies one ranked candidate list
///
/// Carries the effective spacing the list was ranked with, so services
/// built from different tuning tables can share one cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CandidateKey {
    pub difficulty: Difficulty,
    pub grid_size: u32,
    /// Spacing relaxation level the list was computed with
    pub expansion: u32,
    pub min_distance: u32,
    pub preferred_distance: u32,
    pub max_search_attempts: usize,
    /// Corner and edge multipliers as raw bits
    pub multiplier_bits: [u32; 2],
}

impl CandidateKey {
    pub fn new(
        difficulty: Difficulty,
        grid_size: u32,
        expansion: u32,
        spacing: &SpacingConstraints,
    ) -> Self {
        Self {
            difficulty,
            grid_size,
            expansion,
            min_distance: spacing.min_distance,
            preferred_distance: spacing.preferred_distance,
            max_search_attempts: spacing.max_search_attempts,
            multiplier_bits: [
                spacing.corner_multiplier.to_bits(),
                spacing.edge_multiplier.to_bits(),
            ],
        }
    }
}

/// Lookup capability injected into the placement service
pub trait CandidateCache: Send + Sync {
    /// Return the cached list for `key`, computing and storing it if absent
    fn get_or_compute(
        &self,
        key: CandidateKey,
        compute: &dyn Fn() -> Vec<EntryExitPair>,
    ) -> Vec<EntryExitPair>;
}

/// Always recomputes
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl CandidateCache for NoCache {
    fn get_or_compute(
        &self,
        _key: CandidateKey,
        compute: &dyn Fn() -> Vec<EntryExitPair>,
    ) -> Vec<EntryExitPair> {
        compute()
    }
}

/// In-process cache shared between generation workers
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<CandidateKey, Vec<EntryExitPair>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CandidateCache for MemoryCache {
    fn get_or_compute(
        &self,
        key: CandidateKey,
        compute: &dyn Fn() -> Vec<EntryExitPair>,
    ) -> Vec<EntryExitPair> {
        if let Ok(entries) = self.entries.lock()
            && let Some(hit) = entries.get(&key)
        {
            return hit.clone();
        }

        // Compute outside the lock so other workers are not held up
        let computed = compute();
        match self.entries.lock() {
            Ok(mut entries) => entries.entry(key).or_insert(computed).clone(),
            Err(_) => {
                log::warn!("Candidate cache lock poisoned, serving uncached result");
                computed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::Tuning;
    use std::cell::Cell;

    fn key() -> CandidateKey {
        CandidateKey::new(Difficulty::Easy, 6, 0, &Tuning::default().easy.spacing)
    }

    #[test]
    fn test_memory_cache_computes_once() {
        let cache = MemoryCache::new();
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            Vec::new()
        };
        cache.get_or_compute(key(), &compute);
        cache.get_or_compute(key(), &compute);
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.len(), 1);

        let other = CandidateKey {
            expansion: 1,
            ..key()
        };
        cache.get_or_compute(other, &compute);
        assert_eq!(calls.get(), 2);

        let mut spacing = Tuning::default().easy.spacing;
        spacing.edge_multiplier = 0.9;
        cache.get_or_compute(CandidateKey::new(Difficulty::Easy, 6, 0, &spacing), &compute);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_no_cache_always_computes() {
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            Vec::new()
        };
        NoCache.get_or_compute(key(), &compute);
        NoCache.get_or_compute(key(), &compute);
        assert_eq!(calls.get(), 2);
    }
}
