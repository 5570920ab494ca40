//! Content-addressed texture generation cache.
//!
//! Entries are keyed by the canonical hash of the generation request, so
//! equal requests resolve to one entry regardless of which slot asked.
//! Concurrent requests for the same key are coalesced: the first caller
//! leads the generation, later callers wait on a watch channel and share
//! the leader's result. The lock is never held across an await.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use log::debug;
use tokio::sync::watch;

use scenesmith_recipe::hash::request_cache_key;
use scenesmith_recipe::{CacheKey, GenerationRequest, MapSet};

use crate::generate::{GenerateError, TextureGenerator};

/// One resolved cache entry. Immutable after creation.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Canonical key derived from the request.
    pub key: CacheKey,
    /// The request that produced the maps.
    pub request: GenerationRequest,
    /// Paths of the generated maps.
    pub maps: MapSet,
    /// When the entry was created, for diagnostics only.
    pub created_at: Instant,
}

impl CacheEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(key: CacheKey, request: GenerationRequest, maps: MapSet) -> Self {
        Self {
            key,
            request,
            maps,
            created_at: Instant::now(),
        }
    }
}

// Structural equality; creation time is not part of entry identity.
impl PartialEq for CacheEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.request == other.request && self.maps == other.maps
    }
}

/// Hit/miss counters, exposed for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from a stored entry.
    pub hits: u64,
    /// Lookups that had to lead a generation.
    pub misses: u64,
    /// Lookups that joined an in-flight generation instead of starting
    /// their own.
    pub coalesced: u64,
}

type Slot = Option<Result<CacheEntry, GenerateError>>;

#[derive(Default)]
struct CacheInner {
    entries: HashMap<CacheKey, CacheEntry>,
    in_flight: HashMap<CacheKey, watch::Receiver<Slot>>,
    stats: CacheStats,
}

/// What a lookup found while holding the lock.
enum Role {
    Hit(CacheEntry),
    Wait(watch::Receiver<Slot>),
    Lead(watch::Sender<Slot>),
}

/// The session's generation cache. Entries are never evicted; a session's
/// working set of generated textures is small and keys are cheap.
#[derive(Default)]
pub struct GenerationCache {
    inner: Mutex<CacheInner>,
}

impl GenerationCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// True if an entry for `key` is stored.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Current hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    /// Looks up an entry. Does not count against the stats; used by recipe
    /// import to decide between reuse and regeneration.
    pub fn lookup(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.lock().entries.get(key).cloned()
    }

    /// Stores an entry. Idempotent: a structurally equal entry already
    /// present makes this a no-op. A conflicting payload for the same key
    /// is a logic error; first write wins.
    pub fn store(&self, entry: CacheEntry) {
        let mut inner = self.lock();
        if let Some(existing) = inner.entries.get(&entry.key) {
            debug_assert_eq!(existing, &entry, "conflicting payloads for one cache key");
            return;
        }
        inner.entries.insert(entry.key.clone(), entry);
    }

    /// Resolves `request` through the cache.
    ///
    /// A stored entry is returned immediately. Otherwise the caller either
    /// leads the generation or, when another caller already leads the same
    /// key, waits for that result. Either way every caller for one key
    /// observes the same entry or the same error, and the generator runs at
    /// most once per key at a time.
    pub async fn request(
        &self,
        request: &GenerationRequest,
        generator: &dyn TextureGenerator,
    ) -> Result<CacheEntry, GenerateError> {
        let key = request_cache_key(request);
        let role = {
            let mut inner = self.lock();
            if let Some(entry) = inner.entries.get(&key).cloned() {
                inner.stats.hits += 1;
                Role::Hit(entry)
            } else if let Some(rx) = inner.in_flight.get(&key).cloned() {
                inner.stats.coalesced += 1;
                Role::Wait(rx)
            } else {
                inner.stats.misses += 1;
                let (tx, rx) = watch::channel(None);
                inner.in_flight.insert(key.clone(), rx);
                Role::Lead(tx)
            }
        };

        match role {
            Role::Hit(entry) => {
                debug!("cache hit for {}", key.short());
                Ok(entry)
            }
            Role::Wait(rx) => {
                debug!("coalescing onto in-flight generation {}", key.short());
                Self::wait_for_leader(rx).await
            }
            Role::Lead(tx) => {
                debug!("cache miss, generating {}", key.short());
                self.lead_generation(key, request, generator, tx).await
            }
        }
    }

    async fn lead_generation(
        &self,
        key: CacheKey,
        request: &GenerationRequest,
        generator: &dyn TextureGenerator,
        tx: watch::Sender<Slot>,
    ) -> Result<CacheEntry, GenerateError> {
        // If this future is dropped mid-generation the in-flight slot must
        // go with it, or the key could never be led again.
        let mut guard = InFlightGuard {
            cache: self,
            key: key.clone(),
            armed: true,
        };
        let result = generator
            .generate(request)
            .await
            .map(|maps| CacheEntry::new(key.clone(), request.clone(), maps));

        {
            let mut inner = self.lock();
            guard.armed = false;
            inner.in_flight.remove(&key);
            if let Ok(entry) = &result {
                inner.entries.entry(key).or_insert_with(|| entry.clone());
            }
        }
        // Waiters holding a receiver still resolve after this send even
        // though the in-flight slot is already gone.
        let _ = tx.send(Some(result.clone()));
        result
    }

    async fn wait_for_leader(
        mut rx: watch::Receiver<Slot>,
    ) -> Result<CacheEntry, GenerateError> {
        loop {
            if let Some(result) = rx.borrow_and_update().clone() {
                return result;
            }
            if rx.changed().await.is_err() {
                // Leader dropped without resolving. One last borrow in
                // case the final send raced the drop.
                if let Some(result) = rx.borrow().clone() {
                    return result;
                }
                return Err(GenerateError::TaskDropped);
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Clears a leader's in-flight slot if its generation future is dropped
/// before resolving. Waiters already holding the receiver see the sender
/// close and fail with `TaskDropped`; fresh requests lead again.
struct InFlightGuard<'a> {
    cache: &'a GenerationCache,
    key: CacheKey,
    armed: bool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.cache.lock().in_flight.remove(&self.key);
        }
    }
}
