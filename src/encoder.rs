//! Pluggable pattern encoders. See spec §4.4, §6.

use crate::error::{JediError, Result, UriError};
use crate::pattern::Pattern;
use crate::time::TimePath;
use crate::uri::UriPath;

/// Which capability a pattern is being encoded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionKind {
    Decrypt,
    Sign,
}

impl PermissionKind {
    fn tag(self) -> u8 {
        match self {
            PermissionKind::Decrypt => 0,
            PermissionKind::Sign => 1,
        }
    }
}

/// Bitmask of permissions a delegation grants. Spec §6: `Decrypt = 0x1`,
/// `Sign = 0x2`, combinable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions(u32);

impl Permissions {
    pub const DECRYPT: Permissions = Permissions(0x1);
    pub const SIGN: Permissions = Permissions(0x2);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn from_bits(bits: u32) -> Self {
        Permissions(bits)
    }

    pub fn contains(self, kind: PermissionKind) -> bool {
        match kind {
            PermissionKind::Decrypt => self.0 & Self::DECRYPT.0 != 0,
            PermissionKind::Sign => self.0 & Self::SIGN.0 != 0,
        }
    }

    /// Iterate the requested kinds in canonical order (decrypt, then
    /// sign).
    pub fn kinds(self) -> Vec<PermissionKind> {
        let mut out = Vec::with_capacity(2);
        if self.contains(PermissionKind::Decrypt) {
            out.push(PermissionKind::Decrypt);
        }
        if self.contains(PermissionKind::Sign) {
            out.push(PermissionKind::Sign);
        }
        out
    }
}

impl std::ops::BitOr for Permissions {
    type Output = Permissions;
    fn bitor(self, rhs: Self) -> Self::Output {
        Permissions(self.0 | rhs.0)
    }
}

/// Maps a (URI path, time path, permission kind) triple to a fixed-length
/// pattern.
pub trait PatternEncoder: Send + Sync {
    /// Total pattern length this encoder produces for a URI path of
    /// `uri_len` components (`uri_len + 6`, typically).
    fn pattern_len(&self, uri_len: usize) -> usize;

    /// The widest URI (in slots, including the `$` sentinel for a
    /// non-prefix URI) this encoder can place into a pattern.
    fn max_uri_len(&self) -> usize;

    fn encode(&self, uri: &UriPath, time: &TimePath, kind: PermissionKind) -> Pattern;

    /// Reject a URI that would overflow this encoder's pattern width
    /// instead of letting [`PatternEncoder::encode`] panic on it. Callers
    /// that take a URI from untrusted input must call this before
    /// `encode`.
    fn check_uri_fits(&self, uri: &UriPath) -> Result<()> {
        let have = uri.len();
        let max = self.max_uri_len();
        if have > max {
            return Err(JediError::InvalidUri(UriError::TooManyComponents { have, max }));
        }
        Ok(())
    }
}

/// The default encoder: pattern length is `max_uri_length + 6`; each
/// bound slot (URI or time) is prefixed with a one-byte tag distinguishing
/// decrypt (`0`) from sign (`1`) keys, domain-separating the two
/// permission kinds in the IBE namespace. Free slots stay free.
#[derive(Debug, Clone, Copy)]
pub struct DefaultPatternEncoder {
    max_uri_length: usize,
}

impl DefaultPatternEncoder {
    pub fn new(max_uri_length: usize) -> Self {
        DefaultPatternEncoder { max_uri_length }
    }
}

impl PatternEncoder for DefaultPatternEncoder {
    fn pattern_len(&self, _uri_len: usize) -> usize {
        self.max_uri_length + 6
    }

    fn max_uri_len(&self) -> usize {
        self.max_uri_length
    }

    fn encode(&self, uri: &UriPath, time: &TimePath, kind: PermissionKind) -> Pattern {
        let total = self.pattern_len(uri.len());
        let plain = Pattern::encode(uri, time, total);
        let tag = kind.tag();
        let tagged: Vec<_> = plain
            .slots()
            .iter()
            .map(|slot| slot.as_ref().map(|bytes| {
                let mut tagged = Vec::with_capacity(bytes.len() + 1);
                tagged.push(tag);
                tagged.extend_from_slice(bytes);
                tagged
            }))
            .collect();
        Pattern::from_slots(tagged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrypt_and_sign_tags_differ() {
        let enc = DefaultPatternEncoder::new(4);
        let uri = UriPath::parse("a/b").unwrap();
        let time = TimePath::parse(chrono::Utc::now());
        let p1 = enc.encode(&uri, &time, PermissionKind::Decrypt);
        let p2 = enc.encode(&uri, &time, PermissionKind::Sign);
        assert!(!p1.equals(&p2));
    }

    #[test]
    fn check_uri_fits_rejects_overflow_instead_of_panicking() {
        let enc = DefaultPatternEncoder::new(2);
        let uri = UriPath::parse("a/b/c/d/e/f/g/h").unwrap();
        let err = enc.check_uri_fits(&uri).unwrap_err();
        match err {
            JediError::InvalidUri(UriError::TooManyComponents { have, max }) => {
                assert_eq!(have, uri.len());
                assert_eq!(max, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn permissions_combine() {
        let both = Permissions::DECRYPT | Permissions::SIGN;
        assert!(both.contains(PermissionKind::Decrypt));
        assert!(both.contains(PermissionKind::Sign));
        assert_eq!(both.kinds(), vec![PermissionKind::Decrypt, PermissionKind::Sign]);
    }
}
