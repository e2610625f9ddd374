//! Bounded elevation cache.
//!
//! Keys are the exact bit patterns of the coordinate; near-duplicate
//! coordinates do not share entries. Once the map grows past its capacity
//! the least recently used entries are evicted.

use dashmap::DashMap;
use std::hash::Hash;
use std::time::Instant;

pub trait CacheEntry {
    fn last_used(&self) -> Instant;
}

/// Evict least recently used entries until `cache` holds at most `max_entries`.
pub fn prune_cache<K, V>(cache: &DashMap<K, V>, max_entries: usize)
where
    K: Clone + Eq + Hash,
    V: CacheEntry,
{
    if cache.len() <= max_entries {
        return;
    }

    let mut entries: Vec<(K, Instant)> = cache
        .iter()
        .map(|entry| (entry.key().clone(), entry.value().last_used()))
        .collect();
    entries.sort_by_key(|(_, last_used)| *last_used);
    for (key, _) in entries {
        if cache.len() <= max_entries {
            break;
        }
        cache.remove(&key);
    }
}

/// Exact `(lat, lon)` key. `-0.0` is folded into `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordKey {
    lat_bits: u64,
    lon_bits: u64,
}

impl CoordKey {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat_bits: (lat + 0.0).to_bits(),
            lon_bits: (lon + 0.0).to_bits(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedElevation {
    elevation_m: f64,
    last_used: Instant,
}

impl CacheEntry for CachedElevation {
    fn last_used(&self) -> Instant {
        self.last_used
    }
}

#[derive(Debug)]
pub struct ElevationCache {
    entries: DashMap<CoordKey, CachedElevation>,
    capacity: usize,
}

impl ElevationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, lat: f64, lon: f64) -> Option<f64> {
        let mut entry = self.entries.get_mut(&CoordKey::new(lat, lon))?;
        entry.last_used = Instant::now();
        Some(entry.elevation_m)
    }

    /// Store a sample. An existing sample for the same key is kept.
    pub fn insert(&self, lat: f64, lon: f64, elevation_m: f64) {
        self.entries
            .entry(CoordKey::new(lat, lon))
            .or_insert(CachedElevation {
                elevation_m,
                last_used: Instant::now(),
            });
        prune_cache(&self.entries, self.capacity);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
