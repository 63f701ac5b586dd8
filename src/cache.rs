//! The bounded-by-bytes LRU cache shared by all three key families:
//! hierarchy public params, per-URI encryption entries, and
//! per-encapsulation decryption entries (spec §4.8).
//!
//! Rather than the byte-string-tagged keys spec.md's source language uses
//! (a single base type wearing two shapes, per spec §9's "Dynamic
//! component polymorphism" note), the key is a Rust sum type —
//! `CacheKey` — which sidesteps both open questions in spec §9 by
//! construction: a `Vec<Vec<u8>>` of URI components can't collide with a
//! `/`-joined string the way a naive byte-concatenation key could, and
//! the decryption-entry key structurally includes the hierarchy id.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::{Mutex, Notify};

use crate::cancel::Cancellation;
use crate::config::EntryByteCosts;
use crate::entry::{DecryptionCacheEntry, EncryptionCacheEntry};
use crate::error::JediError;
use crate::ibe::PublicParams;
use crate::keystore::KeyStoreReader;
use crate::uri::UriPath;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    Params(Vec<u8>),
    Encryption {
        hierarchy: Vec<u8>,
        uri_components: Vec<Option<Vec<u8>>>,
    },
    Decryption {
        hierarchy: Vec<u8>,
        encapsulation: Vec<u8>,
    },
}

impl CacheKey {
    fn encryption(hierarchy: &[u8], uri: &UriPath) -> Self {
        let uri_components = (0..uri.len())
            .map(|i| uri.slot(i).cloned().flatten())
            .collect();
        CacheKey::Encryption {
            hierarchy: hierarchy.to_vec(),
            uri_components,
        }
    }

    fn decryption(hierarchy: &[u8], encapsulation: &[u8]) -> Self {
        CacheKey::Decryption {
            hierarchy: hierarchy.to_vec(),
            encapsulation: encapsulation.to_vec(),
        }
    }
}

#[derive(Clone)]
enum CacheValue {
    Params(Arc<PublicParams>),
    Encryption(Arc<EncryptionCacheEntry>),
    Decryption(Arc<DecryptionCacheEntry>),
}

struct CacheState {
    lru: LruCache<CacheKey, (CacheValue, u64)>,
    used_bytes: u64,
    capacity_bytes: u64,
}

impl CacheState {
    fn insert(&mut self, key: CacheKey, value: CacheValue, cost: u64) {
        if let Some((_, old_cost)) = self.lru.pop(&key) {
            self.used_bytes = self.used_bytes.saturating_sub(old_cost);
        }
        self.lru.put(key, (value, cost));
        self.used_bytes += cost;
        while self.used_bytes > self.capacity_bytes {
            match self.lru.pop_lru() {
                Some((_, (_, evicted_cost))) => {
                    self.used_bytes = self.used_bytes.saturating_sub(evicted_cost);
                    tracing::debug!(evicted_cost, "cache eviction");
                }
                None => break,
            }
        }
    }
}

/// The cache backing a [`crate::client::ClientState`]. Internal
/// synchronization only — the loader for any single missing key runs at
/// most once concurrently (spec §4.8, §5).
pub struct JediCache {
    state: Mutex<CacheState>,
    costs: EntryByteCosts,
    in_flight: Mutex<HashMap<CacheKey, Arc<Notify>>>,
}

impl JediCache {
    pub fn new(capacity_bytes: u64, costs: EntryByteCosts) -> Self {
        JediCache {
            state: Mutex::new(CacheState {
                // Unbounded slot count; eviction is governed by
                // `used_bytes` vs `capacity_bytes`, not entry count.
                lru: LruCache::new(NonZeroUsize::new(usize::MAX).unwrap()),
                used_bytes: 0,
                capacity_bytes,
            }),
            costs,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Look up or load public params for `hierarchy`. Single-flighted and
    /// cancellation-aware since this is the one cache miss that calls out
    /// to an external, possibly I/O-backed reader.
    pub async fn get_or_load_params(
        &self,
        cancel: &Cancellation,
        reader: &dyn KeyStoreReader,
        hierarchy: &[u8],
    ) -> Result<Arc<PublicParams>, JediError> {
        let key = CacheKey::Params(hierarchy.to_vec());
        loop {
            if let Some(params) = self.peek_params(&key).await {
                return Ok(params);
            }

            let (became_loader, notify) = {
                let mut inflight = self.in_flight.lock().await;
                if let Some(n) = inflight.get(&key) {
                    (false, n.clone())
                } else {
                    let n = Arc::new(Notify::new());
                    inflight.insert(key.clone(), n.clone());
                    (true, n)
                }
            };

            if !became_loader {
                notify.notified().await;
                continue;
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(JediError::BackendError("cache load cancelled".to_string())),
                r = reader.params_for_hierarchy(cancel, hierarchy) => r,
            };

            {
                let mut inflight = self.in_flight.lock().await;
                inflight.remove(&key);
            }
            notify.notify_waiters();

            let params = Arc::new(result?);
            let mut state = self.state.lock().await;
            state.insert(
                key,
                CacheValue::Params(params.clone()),
                self.costs.params_entry,
            );
            return Ok(params);
        }
    }

    async fn peek_params(&self, key: &CacheKey) -> Option<Arc<PublicParams>> {
        let mut state = self.state.lock().await;
        match state.lru.get(key) {
            Some((CacheValue::Params(p), _)) => Some(p.clone()),
            _ => None,
        }
    }

    /// Look up or allocate the (uninitialized) encryption entry for a
    /// (hierarchy, URI) pair. Allocation never fails and never blocks on
    /// I/O, so no single-flight is needed beyond the state mutex itself.
    pub async fn get_or_create_encryption_entry(
        &self,
        hierarchy: &[u8],
        uri: &UriPath,
    ) -> Arc<EncryptionCacheEntry> {
        let key = CacheKey::encryption(hierarchy, uri);
        let mut state = self.state.lock().await;
        if let Some((CacheValue::Encryption(e), _)) = state.lru.get(&key) {
            tracing::debug!("encryption cache hit");
            return e.clone();
        }
        tracing::debug!("encryption cache miss, allocating entry");
        let entry = Arc::new(EncryptionCacheEntry::new());
        let cost = self.costs.encryption_entry;
        state.insert(key, CacheValue::Encryption(entry.clone()), cost);
        entry
    }

    /// Look up or allocate the (uninitialized) decryption entry keyed by
    /// `(hierarchy, encapsulation bytes)`.
    pub async fn get_or_create_decryption_entry(
        &self,
        hierarchy: &[u8],
        encapsulation: &[u8],
    ) -> Arc<DecryptionCacheEntry> {
        let key = CacheKey::decryption(hierarchy, encapsulation);
        let mut state = self.state.lock().await;
        if let Some((CacheValue::Decryption(e), _)) = state.lru.get(&key) {
            tracing::debug!("decryption cache hit");
            return e.clone();
        }
        tracing::debug!("decryption cache miss, allocating entry");
        let entry = Arc::new(DecryptionCacheEntry::new());
        let cost = self.costs.decryption_entry;
        state.insert(key, CacheValue::Decryption(entry.clone()), cost);
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EntryByteCosts;
    use async_trait::async_trait;

    struct AlwaysFails;

    #[async_trait]
    impl KeyStoreReader for AlwaysFails {
        async fn params_for_hierarchy(
            &self,
            _cancel: &Cancellation,
            _hierarchy: &[u8],
        ) -> Result<PublicParams, JediError> {
            Err(JediError::BackendError("no such hierarchy".to_string()))
        }

        async fn key_for_pattern(
            &self,
            _cancel: &Cancellation,
            _hierarchy: &[u8],
            _pattern: &crate::pattern::Pattern,
        ) -> Result<(PublicParams, Option<crate::ibe::SecretKey>), JediError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn entries_are_reused_across_lookups() {
        let cache = JediCache::new(1024 * 1024, EntryByteCosts::default());
        let uri = UriPath::parse("a/b").unwrap();
        let e1 = cache.get_or_create_encryption_entry(b"h", &uri).await;
        let e2 = cache.get_or_create_encryption_entry(b"h", &uri).await;
        assert!(Arc::ptr_eq(&e1, &e2));
    }

    #[tokio::test]
    async fn distinct_uris_get_distinct_entries() {
        let cache = JediCache::new(1024 * 1024, EntryByteCosts::default());
        let uri_a = UriPath::parse("a").unwrap();
        let uri_b = UriPath::parse("b").unwrap();
        let e1 = cache.get_or_create_encryption_entry(b"h", &uri_a).await;
        let e2 = cache.get_or_create_encryption_entry(b"h", &uri_b).await;
        assert!(!Arc::ptr_eq(&e1, &e2));
    }

    #[tokio::test]
    async fn backend_error_propagates_and_does_not_poison_cache() {
        let cache = JediCache::new(1024, EntryByteCosts::default());
        let cancel = Cancellation::new();
        let reader = AlwaysFails;
        let err = cache
            .get_or_load_params(&cancel, &reader, b"h")
            .await
            .unwrap_err();
        assert!(matches!(err, JediError::BackendError(_)));
    }
}
