//! The stateful client engine: `encrypt`, `decrypt`, and `delegate` (spec
//! §4.5–§4.7). Supersedes the teacher's single-shot `Citadel`/`Envelope`
//! orchestration (`lib.rs`'s old `kem_engine` module, `sdk.rs`) with the
//! cache-mediated, lock-guarded flow the hierarchical protocol needs.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::cache::JediCache;
use crate::cancel::Cancellation;
use crate::config::ClientConfig;
use crate::delegation::{build_pattern_list, Delegation};
use crate::encoder::{PatternEncoder, PermissionKind, Permissions};
use crate::error::{JediError, Result};
use crate::ibe::{Encapsulation, WkdIbeProvider, ENCRYPTED_KEY_SIZE};
use crate::keystore::KeyStoreReader;
use crate::symmetric::{self, BLOCK_SIZE};
use crate::time::{self, TimePath};
use crate::uri::UriPath;

/// Shared, concurrency-safe client state: the bounded cache plus the
/// composed encoder, key-store reader, and WKD-IBE provider. Encrypt,
/// decrypt, and delegate may all run concurrently on the same
/// `ClientState` (spec §5).
pub struct ClientState {
    cache: JediCache,
    encoder: Arc<dyn PatternEncoder>,
    key_store: Arc<dyn KeyStoreReader>,
    provider: Arc<dyn WkdIbeProvider>,
}

impl ClientState {
    pub fn new(
        config: ClientConfig,
        encoder: Arc<dyn PatternEncoder>,
        key_store: Arc<dyn KeyStoreReader>,
        provider: Arc<dyn WkdIbeProvider>,
    ) -> Self {
        ClientState {
            cache: JediCache::new(config.cache_capacity_bytes, config.entry_byte_costs),
            encoder,
            key_store,
            provider,
        }
    }

    /// Spec §4.5. Produces a hybrid (WKD-IBE + symmetric) ciphertext:
    /// `encapsulation || CTR-IV || CTR-payload`.
    pub async fn encrypt(
        &self,
        cancel: &Cancellation,
        hierarchy: &[u8],
        uri: &str,
        timestamp: DateTime<Utc>,
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        let uri_path = UriPath::parse(uri)?;
        self.encoder.check_uri_fits(&uri_path)?;
        let time_path = TimePath::parse(timestamp);
        let pattern = self.encoder.encode(&uri_path, &time_path, PermissionKind::Decrypt);

        let params = self
            .cache
            .get_or_load_params(cancel, self.key_store.as_ref(), hierarchy)
            .await?;
        let entry = self
            .cache
            .get_or_create_encryption_entry(hierarchy, &uri_path)
            .await;

        let (key, encapsulation) = entry
            .get_or_update(&pattern, &params, self.provider.as_ref())
            .await?;

        let mut out = Vec::with_capacity(ENCRYPTED_KEY_SIZE + BLOCK_SIZE + plaintext.len());
        out.extend_from_slice(encapsulation.as_bytes());
        out.extend_from_slice(&symmetric::seal(&key, plaintext));
        Ok(out)
    }

    /// Spec §4.6. `envelope` is the full wire-format ciphertext:
    /// `encapsulation || CTR-IV || CTR-payload`.
    ///
    /// Safety warning (spec §4.6): a caller that passes a mismatched
    /// URI/time for the ciphertext it's decrypting gets back *some*
    /// bytes, not an error — integrity of the envelope is the caller's
    /// responsibility, established before calling this.
    pub async fn decrypt(
        &self,
        cancel: &Cancellation,
        hierarchy: &[u8],
        uri: &str,
        timestamp: DateTime<Utc>,
        envelope: &[u8],
    ) -> Result<Vec<u8>> {
        if envelope.len() < ENCRYPTED_KEY_SIZE + BLOCK_SIZE {
            return Err(JediError::CiphertextTooShort {
                have: envelope.len(),
                need: ENCRYPTED_KEY_SIZE + BLOCK_SIZE,
            });
        }
        let (encapsulation_bytes, ciphertext) = envelope.split_at(ENCRYPTED_KEY_SIZE);

        let uri_path = UriPath::parse(uri)?;
        self.encoder.check_uri_fits(&uri_path)?;
        let time_path = TimePath::parse(timestamp);
        let pattern = self.encoder.encode(&uri_path, &time_path, PermissionKind::Decrypt);

        let decryption_entry = self
            .cache
            .get_or_create_decryption_entry(hierarchy, encapsulation_bytes)
            .await;

        let key_store = self.key_store.clone();
        let provider = self.provider.clone();
        let hierarchy_owned = hierarchy.to_vec();
        let encapsulation_owned = encapsulation_bytes.to_vec();
        let cancel_owned = cancel.clone();

        let key = decryption_entry
            .get_or_populate(move || async move {
                let encapsulation = Encapsulation::unmarshal(&encapsulation_owned)?;

                let attrs = pattern.to_attribute_list();
                let (params, secret_key) = key_store
                    .key_for_pattern(&cancel_owned, &hierarchy_owned, &pattern)
                    .await?;
                let secret_key = secret_key.ok_or(JediError::NoKeyForPattern)?;

                let qualified =
                    provider.non_delegable_qualify_key(&params, &secret_key, &attrs)?;
                let elt = provider.decrypt(&encapsulation, &qualified)?;
                Ok(provider.hash_group_element_to_symmetric_key(&elt))
            })
            .await?;

        Ok(symmetric::open(&key, ciphertext))
    }

    /// Spec §4.7. Builds the minimal covering set of secret keys for
    /// `(uri, [start, end], permissions)`.
    pub async fn delegate(
        &self,
        cancel: &Cancellation,
        hierarchy: &[u8],
        uri: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        permissions: Permissions,
    ) -> Result<Delegation> {
        let uri_path = UriPath::parse(uri)?;
        self.encoder.check_uri_fits(&uri_path)?;
        let time_paths = time::range(start, end)?;
        let patterns = build_pattern_list(self.encoder.as_ref(), &uri_path, &time_paths, permissions);

        let mut keys = Vec::with_capacity(patterns.len());
        let mut params_out = None;
        for pattern in &patterns {
            let (params, secret_key) = self
                .key_store
                .key_for_pattern(cancel, hierarchy, pattern)
                .await?;
            let secret_key = secret_key.ok_or(JediError::NoKeyForPattern)?;
            let attrs = pattern.to_attribute_list();
            let qualified = self
                .provider
                .non_delegable_qualify_key(&params, &secret_key, &attrs)?;
            keys.push(qualified);
            params_out.get_or_insert(params);
        }

        Ok(Delegation {
            hierarchy: hierarchy.to_vec(),
            params: params_out.ok_or(JediError::NoKeyForPattern)?,
            patterns,
            keys,
        })
    }
}
