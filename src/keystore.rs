//! The external key store reader (spec §6) — a consumed collaborator,
//! not implemented here in its production form. [`InMemoryKeyStore`] is a
//! test double seeded directly with delegated keys, mirroring the
//! teacher's `StorageBackend`/`InMemoryBackend` pluggable-backend split.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cancel::Cancellation;
use crate::error::JediError;
use crate::ibe::{PublicParams, SecretKey};
use crate::pattern::Pattern;

/// Provides public parameters for a hierarchy, and secret keys whose
/// native pattern matches a requested pattern.
#[async_trait]
pub trait KeyStoreReader: Send + Sync {
    async fn params_for_hierarchy(
        &self,
        cancel: &Cancellation,
        hierarchy: &[u8],
    ) -> Result<PublicParams, JediError>;

    /// Returns a key whose native pattern matches `pattern`, or `None` if
    /// none is held.
    async fn key_for_pattern(
        &self,
        cancel: &Cancellation,
        hierarchy: &[u8],
        pattern: &Pattern,
    ) -> Result<(PublicParams, Option<SecretKey>), JediError>;
}

struct Delegated {
    pattern: Pattern,
    key: SecretKey,
}

struct HierarchyEntry {
    params: PublicParams,
    keys: Vec<Delegated>,
}

/// An in-memory `KeyStoreReader` for tests: seed it with
/// `(hierarchy, params, pattern, key)` tuples and it serves lookups by
/// linear scan using [`Pattern::matches`].
#[derive(Default)]
pub struct InMemoryKeyStore {
    hierarchies: RwLock<std::collections::HashMap<Vec<u8>, HierarchyEntry>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_params(&self, hierarchy: &[u8], params: PublicParams) {
        let mut map = self.hierarchies.write().await;
        map.entry(hierarchy.to_vec())
            .or_insert_with(|| HierarchyEntry {
                params: params.clone(),
                keys: Vec::new(),
            })
            .params = params;
    }

    pub async fn seed_key(&self, hierarchy: &[u8], pattern: Pattern, key: SecretKey) {
        let mut map = self.hierarchies.write().await;
        let entry = map
            .get_mut(hierarchy)
            .expect("seed_params must be called before seed_key for a hierarchy");
        entry.keys.push(Delegated { pattern, key });
    }
}

#[async_trait]
impl KeyStoreReader for InMemoryKeyStore {
    async fn params_for_hierarchy(
        &self,
        cancel: &Cancellation,
        hierarchy: &[u8],
    ) -> Result<PublicParams, JediError> {
        if cancel.is_cancelled() {
            return Err(JediError::BackendError("cancelled".to_string()));
        }
        let map = self.hierarchies.read().await;
        map.get(hierarchy)
            .map(|e| e.params.clone())
            .ok_or_else(|| JediError::BackendError(format!("unknown hierarchy {hierarchy:?}")))
    }

    async fn key_for_pattern(
        &self,
        cancel: &Cancellation,
        hierarchy: &[u8],
        pattern: &Pattern,
    ) -> Result<(PublicParams, Option<SecretKey>), JediError> {
        if cancel.is_cancelled() {
            return Err(JediError::BackendError("cancelled".to_string()));
        }
        let map = self.hierarchies.read().await;
        let entry = map
            .get(hierarchy)
            .ok_or_else(|| JediError::BackendError(format!("unknown hierarchy {hierarchy:?}")))?;
        let found = entry
            .keys
            .iter()
            .find(|d| d.pattern.matches(pattern))
            .map(|d| d.key.clone());
        Ok((entry.params.clone(), found))
    }
}
