//! The black-box WKD-IBE primitive boundary (spec §1).
//!
//! Everything pairing-related — setup, key generation, attribute-list
//! preparation/adjustment, prepared-encryption, decryption, and
//! non-delegable qualification — is declared out of scope by the spec and
//! consumed here only through the [`WkdIbeProvider`] trait. The crate
//! never names a concrete pairing library.
//!
//! [`MockWkdIbeProvider`] is a deterministic, **non-cryptographic** test
//! double standing in for a real implementation, the same role
//! `InMemoryBackend` plays for `StorageBackend` in a pluggable-storage
//! design: good enough to drive the client-state logic under test, never
//! intended for production use.

use hkdf::Hkdf;
use rand_core::{OsRng, RngCore};
use sha2::Sha256;
use sha3::{Digest, Sha3_256};
use zeroize::Zeroize;

use crate::error::JediError;
use crate::pattern::Attribute;

/// Marshalled size of a WKD-IBE encapsulation. Fixed per spec §6.
pub const ENCRYPTED_KEY_SIZE: usize = 32;
/// Symmetric key length (spec §6).
pub const SYMMETRIC_KEY_LEN: usize = 16;

/// Public parameters for a hierarchy. Opaque to every caller except the
/// provider that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicParams {
    hierarchy: Vec<u8>,
}

impl PublicParams {
    pub fn marshal(&self) -> Vec<u8> {
        self.hierarchy.clone()
    }

    pub fn unmarshal(bytes: &[u8]) -> Self {
        PublicParams {
            hierarchy: bytes.to_vec(),
        }
    }
}

/// A secret key, native to some (possibly wildcarded) pattern. `attrs[i]`
/// is `Some` where the key is bound at position `i`, `None` where it is
/// free (a wildcard slot). [`WkdIbeProvider::non_delegable_qualify_key`]
/// narrows a wildcarded key to an exact pattern.
#[derive(Debug, Clone)]
pub struct SecretKey {
    hierarchy: Vec<u8>,
    attrs: Vec<Option<Attribute>>,
}

impl SecretKey {
    pub fn marshal(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(self.hierarchy.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.hierarchy);
        out.extend_from_slice(&(self.attrs.len() as u32).to_le_bytes());
        for a in &self.attrs {
            match a {
                None => out.push(0),
                Some(bytes) => {
                    out.push(1);
                    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
                    out.extend_from_slice(bytes);
                }
            }
        }
        out
    }

    pub fn unmarshal(bytes: &[u8]) -> Result<Self, JediError> {
        let mut cursor = bytes;
        let hlen = take_u32(&mut cursor)?;
        let hierarchy = take_n(&mut cursor, hlen as usize)?.to_vec();
        let alen = take_u32(&mut cursor)?;
        let mut attrs = Vec::with_capacity(alen as usize);
        for _ in 0..alen {
            let tag = take_n(&mut cursor, 1)?[0];
            if tag == 0 {
                attrs.push(None);
            } else {
                let len = take_u32(&mut cursor)?;
                let bytes = take_n(&mut cursor, len as usize)?.to_vec();
                attrs.push(Some(Attribute::from(bytes.into_boxed_slice())));
            }
        }
        Ok(SecretKey { hierarchy, attrs })
    }
}

fn take_u32(cursor: &mut &[u8]) -> Result<u32, JediError> {
    let bytes = take_n(cursor, 4)?;
    Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
}

fn take_n<'a>(cursor: &mut &'a [u8], n: usize) -> Result<&'a [u8], JediError> {
    if cursor.len() < n {
        return Err(JediError::MarshalError("secret key truncated".to_string()));
    }
    let (head, tail) = cursor.split_at(n);
    *cursor = tail;
    Ok(head)
}

/// A random element of the pairing group, hashed down to a symmetric key
/// at encrypt/decrypt time.
#[derive(Debug, Clone, Zeroize)]
#[zeroize(drop)]
pub struct GroupElement(Vec<u8>);

/// Precomputed intermediate allowing fast re-encryption when the
/// attribute list changes slightly (spec glossary).
#[derive(Debug, Clone)]
pub struct PreparedAttributeList {
    attrs: Vec<Option<Attribute>>,
}

/// The WKD-IBE ciphertext of a symmetric key (spec glossary: encapsulation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encapsulation(Vec<u8>);

impl Encapsulation {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn unmarshal(bytes: &[u8]) -> Result<Self, JediError> {
        if bytes.len() != ENCRYPTED_KEY_SIZE {
            return Err(JediError::MalformedCiphertext);
        }
        Ok(Encapsulation(bytes.to_vec()))
    }
}

/// The black-box WKD-IBE surface named in spec §1.
pub trait WkdIbeProvider: Send + Sync {
    fn setup(&self, hierarchy: &[u8]) -> Result<PublicParams, JediError>;

    /// Generate a secret key native to `attrs` (a `None` entry leaves that
    /// position a wildcard).
    fn keygen(
        &self,
        params: &PublicParams,
        attrs: &[Option<Attribute>],
    ) -> Result<SecretKey, JediError>;

    fn prepare_attribute_list(
        &self,
        params: &PublicParams,
        attrs: &[Option<Attribute>],
    ) -> Result<PreparedAttributeList, JediError>;

    fn adjust_prepared_attribute_list(
        &self,
        prep: &mut PreparedAttributeList,
        params: &PublicParams,
        old_attrs: &[Option<Attribute>],
        new_attrs: &[Option<Attribute>],
    ) -> Result<(), JediError>;

    fn random_group_element(&self) -> GroupElement;

    fn hash_group_element_to_symmetric_key(&self, elt: &GroupElement) -> [u8; SYMMETRIC_KEY_LEN];

    fn encrypt_prepared(
        &self,
        elt: &GroupElement,
        params: &PublicParams,
        prep: &PreparedAttributeList,
    ) -> Result<Encapsulation, JediError>;

    fn decrypt(&self, ct: &Encapsulation, sk: &SecretKey) -> Result<GroupElement, JediError>;

    /// Bind a (possibly wildcarded) key down to an exact pattern so it can
    /// no longer be narrowed and re-delegated (spec glossary:
    /// non-delegable qualification).
    fn non_delegable_qualify_key(
        &self,
        params: &PublicParams,
        sk: &SecretKey,
        target_attrs: &[Option<Attribute>],
    ) -> Result<SecretKey, JediError>;
}

/// A deterministic, **non-cryptographic** stand-in for a real WKD-IBE
/// library.
///
/// Internally it XORs a per-position keyed share into the masked group
/// element, one share per attribute-list position, all derived from a
/// provider-wide pepper via HKDF. This reproduces exactly the observable
/// behavior the client engine depends on — encrypting under one
/// attribute list and decrypting with a key qualified to the *same*
/// attribute list recovers the original element, while a mismatched
/// attribute at any position recovers garbage rather than erroring (spec
/// §8 scenario 7) — but it does **not** implement real wildcard/attribute-
/// based matching cryptography and must never be used outside tests.
pub struct MockWkdIbeProvider {
    pepper: [u8; 32],
}

impl MockWkdIbeProvider {
    pub fn new() -> Self {
        let mut pepper = [0u8; 32];
        OsRng.fill_bytes(&mut pepper);
        MockWkdIbeProvider { pepper }
    }

    /// Construct with a fixed pepper, for reproducible tests.
    pub fn with_pepper(pepper: [u8; 32]) -> Self {
        MockWkdIbeProvider { pepper }
    }

    fn master_secret(&self, hierarchy: &[u8]) -> [u8; 32] {
        let hk = Hkdf::<Sha256>::new(Some(hierarchy), &self.pepper);
        let mut out = [0u8; 32];
        hk.expand(b"jedi-core/mock-wkd-ibe/master", &mut out)
            .expect("32 bytes is a valid HKDF output length");
        out
    }

    fn share(master: &[u8; 32], position: usize, attr: Option<&Attribute>) -> [u8; 32] {
        let mut hasher = Sha3_256::new();
        hasher.update(master);
        hasher.update((position as u32).to_le_bytes());
        match attr {
            Some(bytes) => {
                hasher.update([1u8]);
                hasher.update(bytes.as_ref());
            }
            None => hasher.update([0u8]),
        }
        hasher.finalize().into()
    }

    fn share_sum(master: &[u8; 32], attrs: &[Option<Attribute>]) -> [u8; 32] {
        let mut sum = [0u8; 32];
        for (i, attr) in attrs.iter().enumerate() {
            let s = Self::share(master, i, attr.as_ref());
            for (a, b) in sum.iter_mut().zip(s.iter()) {
                *a ^= b;
            }
        }
        sum
    }
}

impl Default for MockWkdIbeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl WkdIbeProvider for MockWkdIbeProvider {
    fn setup(&self, hierarchy: &[u8]) -> Result<PublicParams, JediError> {
        Ok(PublicParams {
            hierarchy: hierarchy.to_vec(),
        })
    }

    fn keygen(
        &self,
        params: &PublicParams,
        attrs: &[Option<Attribute>],
    ) -> Result<SecretKey, JediError> {
        Ok(SecretKey {
            hierarchy: params.hierarchy.clone(),
            attrs: attrs.to_vec(),
        })
    }

    fn prepare_attribute_list(
        &self,
        _params: &PublicParams,
        attrs: &[Option<Attribute>],
    ) -> Result<PreparedAttributeList, JediError> {
        Ok(PreparedAttributeList {
            attrs: attrs.to_vec(),
        })
    }

    fn adjust_prepared_attribute_list(
        &self,
        prep: &mut PreparedAttributeList,
        _params: &PublicParams,
        _old_attrs: &[Option<Attribute>],
        new_attrs: &[Option<Attribute>],
    ) -> Result<(), JediError> {
        prep.attrs = new_attrs.to_vec();
        Ok(())
    }

    fn random_group_element(&self) -> GroupElement {
        let mut bytes = vec![0u8; ENCRYPTED_KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        GroupElement(bytes)
    }

    fn hash_group_element_to_symmetric_key(&self, elt: &GroupElement) -> [u8; SYMMETRIC_KEY_LEN] {
        let mut hasher = Sha3_256::new();
        hasher.update(&elt.0);
        let digest = hasher.finalize();
        let mut key = [0u8; SYMMETRIC_KEY_LEN];
        key.copy_from_slice(&digest[..SYMMETRIC_KEY_LEN]);
        key
    }

    fn encrypt_prepared(
        &self,
        elt: &GroupElement,
        params: &PublicParams,
        prep: &PreparedAttributeList,
    ) -> Result<Encapsulation, JediError> {
        let master = self.master_secret(&params.hierarchy);
        let mask = Self::share_sum(&master, &prep.attrs);
        let mut out = elt.0.clone();
        for (a, b) in out.iter_mut().zip(mask.iter()) {
            *a ^= b;
        }
        Ok(Encapsulation(out))
    }

    fn decrypt(&self, ct: &Encapsulation, sk: &SecretKey) -> Result<GroupElement, JediError> {
        let master = self.master_secret(&sk.hierarchy);
        let mask = Self::share_sum(&master, &sk.attrs);
        let mut out = ct.0.clone();
        for (a, b) in out.iter_mut().zip(mask.iter()) {
            *a ^= b;
        }
        Ok(GroupElement(out))
    }

    fn non_delegable_qualify_key(
        &self,
        _params: &PublicParams,
        sk: &SecretKey,
        target_attrs: &[Option<Attribute>],
    ) -> Result<SecretKey, JediError> {
        let attrs = sk
            .attrs
            .iter()
            .zip(target_attrs.iter())
            .map(|(own, target)| own.clone().or_else(|| target.clone()))
            .collect();
        Ok(SecretKey {
            hierarchy: sk.hierarchy.clone(),
            attrs,
        })
    }
}
