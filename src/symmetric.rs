//! Bulk symmetric encryption: AES-128-CTR, per spec §6's wire format
//! (`[encapsulation][CTR IV][CTR payload]`, with the encapsulation
//! produced elsewhere). Declared out of scope as a primitive by spec §1;
//! this module is the concrete choice satisfying that boundary, grounded
//! on the RustCrypto `aes`/`ctr` crates already in the teacher's lineage
//! (replacing its AES-256-GCM with raw CTR, since the wire format has no
//! room for an authentication tag).

use aes::cipher::{KeyIvInit, StreamCipher};
use aes::Aes128;
use ctr::Ctr128BE;
use rand_core::{OsRng, RngCore};

use crate::ibe::SYMMETRIC_KEY_LEN;

/// CTR IV / block size for AES.
pub const BLOCK_SIZE: usize = 16;

type Aes128Ctr = Ctr128BE<Aes128>;

/// Encrypt `plaintext` under `key` with a freshly sampled IV, returning
/// `iv || ciphertext`.
pub fn seal(key: &[u8; SYMMETRIC_KEY_LEN], plaintext: &[u8]) -> Vec<u8> {
    let mut iv = [0u8; BLOCK_SIZE];
    OsRng.fill_bytes(&mut iv);

    let mut buf = plaintext.to_vec();
    let mut cipher = Aes128Ctr::new(key.into(), &iv.into());
    cipher.apply_keystream(&mut buf);

    let mut out = Vec::with_capacity(BLOCK_SIZE + buf.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&buf);
    out
}

/// Decrypt `iv || ciphertext` under `key`. The caller has already checked
/// `envelope.len() >= BLOCK_SIZE` (spec §7 `ciphertext_too_short`).
pub fn open(key: &[u8; SYMMETRIC_KEY_LEN], envelope: &[u8]) -> Vec<u8> {
    let (iv, ciphertext) = envelope.split_at(BLOCK_SIZE);
    let mut buf = ciphertext.to_vec();
    let mut cipher = Aes128Ctr::new(key.into(), iv.into());
    cipher.apply_keystream(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let key = [3u8; SYMMETRIC_KEY_LEN];
        let envelope = seal(&key, b"hello, jedi");
        let plaintext = open(&key, &envelope);
        assert_eq!(plaintext, b"hello, jedi");
    }

    #[test]
    fn wrong_key_gives_wrong_plaintext_not_error() {
        let key = [3u8; SYMMETRIC_KEY_LEN];
        let other = [4u8; SYMMETRIC_KEY_LEN];
        let envelope = seal(&key, b"hello, jedi");
        let plaintext = open(&other, &envelope);
        assert_ne!(plaintext, b"hello, jedi");
    }

    #[test]
    fn empty_plaintext_roundtrips() {
        let key = [1u8; SYMMETRIC_KEY_LEN];
        let envelope = seal(&key, b"");
        assert_eq!(envelope.len(), BLOCK_SIZE);
        assert_eq!(open(&key, &envelope), b"");
    }
}
