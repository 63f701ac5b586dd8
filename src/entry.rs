//! Per-URI encryption cache entries and per-encapsulation decryption cache
//! entries (spec §3, §4.5, §4.6). Both implement the mandatory
//! optimistic-read-then-write pattern (spec §5, §9): acquire read, test
//! applicability, release, acquire write, **re-test**, then mutate. The
//! re-test is what preserves "at most one expensive computation per state
//! transition".

use std::future::Future;

use tokio::sync::RwLock;

use crate::error::JediError;
use crate::ibe::{Encapsulation, PreparedAttributeList, PublicParams, WkdIbeProvider, SYMMETRIC_KEY_LEN};
use crate::pattern::{Attribute, Pattern};

struct EncryptionState {
    pattern: Pattern,
    attrs: Vec<Option<Attribute>>,
    key: [u8; SYMMETRIC_KEY_LEN],
    encapsulation: Encapsulation,
    prep: PreparedAttributeList,
}

/// Holds the last-used pattern, its attribute list, the cached symmetric
/// key, its WKD-IBE encapsulation, and the prepared attribute list for one
/// (hierarchy, URI path) pair. `None` (the initial state) signals
/// "uninitialized" per spec §3.
pub struct EncryptionCacheEntry {
    state: RwLock<Option<EncryptionState>>,
}

impl EncryptionCacheEntry {
    pub fn new() -> Self {
        EncryptionCacheEntry {
            state: RwLock::new(None),
        }
    }

    /// Spec §4.5 steps 3-5. Returns the symmetric key and its WKD-IBE
    /// encapsulation for `pattern`, recomputing only when the pattern has
    /// changed since the last call (and reusing unchanged attribute
    /// hashes via `to_attribute_list_with_reference` when it has).
    pub async fn get_or_update(
        &self,
        pattern: &Pattern,
        params: &PublicParams,
        provider: &dyn WkdIbeProvider,
    ) -> Result<([u8; SYMMETRIC_KEY_LEN], Encapsulation), JediError> {
        {
            let guard = self.state.read().await;
            if let Some(s) = guard.as_ref() {
                if s.pattern.equals(pattern) {
                    return Ok((s.key, s.encapsulation.clone()));
                }
            }
        }

        let mut guard = self.state.write().await;
        if let Some(s) = guard.as_ref() {
            if s.pattern.equals(pattern) {
                return Ok((s.key, s.encapsulation.clone()));
            }
        }

        let (attrs, prep) = match guard.take() {
            None => {
                let attrs = pattern.to_attribute_list();
                let prep = provider.prepare_attribute_list(params, &attrs)?;
                (attrs, prep)
            }
            Some(mut previous) => {
                let (attrs, identical) =
                    pattern.to_attribute_list_with_reference(&previous.pattern, &previous.attrs);
                debug_assert!(
                    !identical,
                    "identical patterns must have returned via the read/re-test above"
                );
                provider.adjust_prepared_attribute_list(
                    &mut previous.prep,
                    params,
                    &previous.attrs,
                    &attrs,
                )?;
                (attrs, previous.prep)
            }
        };

        let elt = provider.random_group_element();
        let key = provider.hash_group_element_to_symmetric_key(&elt);
        let encapsulation = provider.encrypt_prepared(&elt, params, &prep)?;

        *guard = Some(EncryptionState {
            pattern: pattern.clone(),
            attrs,
            key,
            encapsulation: encapsulation.clone(),
            prep,
        });

        Ok((key, encapsulation))
    }
}

impl Default for EncryptionCacheEntry {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds the recovered symmetric key for one encapsulation (spec §3,
/// §4.6). `populated = false` (no key yet) is the initial state.
pub struct DecryptionCacheEntry {
    state: RwLock<Option<[u8; SYMMETRIC_KEY_LEN]>>,
}

impl DecryptionCacheEntry {
    pub fn new() -> Self {
        DecryptionCacheEntry {
            state: RwLock::new(None),
        }
    }

    /// Spec §4.6 steps 3-4. `populate` runs the (potentially expensive,
    /// I/O-bound) unmarshal/key-lookup/qualify/decrypt sequence exactly
    /// once per entry, under the write lock, with the mandatory re-test
    /// on upgrade.
    pub async fn get_or_populate<F, Fut>(&self, populate: F) -> Result<[u8; SYMMETRIC_KEY_LEN], JediError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<[u8; SYMMETRIC_KEY_LEN], JediError>>,
    {
        {
            let guard = self.state.read().await;
            if let Some(key) = *guard {
                return Ok(key);
            }
        }

        let mut guard = self.state.write().await;
        if let Some(key) = *guard {
            return Ok(key);
        }

        let key = populate().await?;
        *guard = Some(key);
        Ok(key)
    }
}

impl Default for DecryptionCacheEntry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ibe::MockWkdIbeProvider;

    #[tokio::test]
    async fn same_pattern_reuses_cached_encapsulation() {
        let provider = MockWkdIbeProvider::with_pepper([2u8; 32]);
        let params = provider.setup(b"h").unwrap();
        let entry = EncryptionCacheEntry::new();
        let pattern = Pattern::from_slots(vec![Some(b"a".to_vec())]);

        let (key1, ct1) = entry.get_or_update(&pattern, &params, &provider).await.unwrap();
        let (key2, ct2) = entry.get_or_update(&pattern, &params, &provider).await.unwrap();
        assert_eq!(key1, key2);
        assert_eq!(ct1, ct2);
    }

    #[tokio::test]
    async fn changed_pattern_recomputes() {
        let provider = MockWkdIbeProvider::with_pepper([2u8; 32]);
        let params = provider.setup(b"h").unwrap();
        let entry = EncryptionCacheEntry::new();
        let p1 = Pattern::from_slots(vec![Some(b"a".to_vec())]);
        let p2 = Pattern::from_slots(vec![Some(b"b".to_vec())]);

        let (_, ct1) = entry.get_or_update(&p1, &params, &provider).await.unwrap();
        let (_, ct2) = entry.get_or_update(&p2, &params, &provider).await.unwrap();
        assert_ne!(ct1, ct2);
    }

    #[tokio::test]
    async fn decryption_entry_populates_once() {
        let entry = DecryptionCacheEntry::new();
        let key = entry
            .get_or_populate(|| async { Ok([5u8; SYMMETRIC_KEY_LEN]) })
            .await
            .unwrap();
        assert_eq!(key, [5u8; SYMMETRIC_KEY_LEN]);
        let key2 = entry
            .get_or_populate(|| async { Ok([9u8; SYMMETRIC_KEY_LEN]) })
            .await
            .unwrap();
        assert_eq!(key2, [5u8; SYMMETRIC_KEY_LEN]);
    }
}
