//! URI component/path parsing, pattern encode/decode, and marshalling.
//!
//! See spec §3, §4.1. A URI path is an ordered sequence of slots, each
//! either free (`+`, the wildcard) or bound (a name, tagged by its
//! positional index). A non-prefix URI gets a reserved terminal `$`
//! component appended so that a prefix delegation cannot be narrowed into
//! a full-depth one the delegator never intended.

use crate::error::UriError;

/// Reserved sentinel segment name. Never legal as user input.
const SENTINEL: &[u8] = b"$";
/// Byte that terminates each component in the marshalled form. Component
/// names are restricted to printable topic text, so this never collides.
const COMPONENT_TERMINATOR: u8 = 0xFF;

/// A parsed URI, as an ordered sequence of slots.
///
/// `components[i] == None` means the `i`-th slot is free (`+`); `Some(name)`
/// means it is bound to `name`. If the URI was not a prefix URI, the last
/// entry is the reserved `$` sentinel and is not printed back by
/// [`UriPath::to_string`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriPath {
    components: Vec<Option<Vec<u8>>>,
    is_prefix: bool,
}

impl UriPath {
    /// Parse a `/`-separated URI string.
    ///
    /// Empty segments (leading/trailing/doubled `/`) are dropped, not
    /// rejected — matching the teacher-independent, permissive-splitting
    /// behavior spec.md §4.1 describes ("drops empty segments").
    pub fn parse(uri: &str) -> Result<Self, UriError> {
        let raw_segments: Vec<&str> = uri.split('/').filter(|s| !s.is_empty()).collect();

        let mut is_prefix = false;
        let mut components = Vec::with_capacity(raw_segments.len());

        for (idx, seg) in raw_segments.iter().enumerate() {
            let is_last = idx + 1 == raw_segments.len();
            if *seg == "*" {
                if !is_last {
                    return Err(UriError::WildcardNotLast);
                }
                is_prefix = true;
                continue;
            }
            if seg.is_empty() {
                return Err(UriError::EmptySegment);
            }
            if seg.as_bytes() == SENTINEL {
                return Err(UriError::ReservedSegment);
            }
            if *seg == "+" {
                components.push(None);
            } else {
                components.push(Some(seg.as_bytes().to_vec()));
            }
        }

        if !is_prefix {
            components.push(Some(SENTINEL.to_vec()));
        }

        Ok(UriPath {
            components,
            is_prefix,
        })
    }

    /// Number of slots, including the trailing `$` sentinel if present.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn is_prefix(&self) -> bool {
        self.is_prefix
    }

    /// Slot at `index`, or `None` if out of range (treated as free).
    pub fn slot(&self, index: usize) -> Option<&Option<Vec<u8>>> {
        self.components.get(index)
    }

    /// Write this path's components into the first `self.len()` slots of
    /// `into`; any remaining URI slots (up to `into.len()`) are left free.
    ///
    /// Panics if `into.len() < self.len()` — a programmer-contract
    /// violation per spec §4.3.
    pub fn encode_into(&self, into: &mut [Option<Vec<u8>>]) {
        assert!(
            into.len() >= self.components.len(),
            "uri pattern buffer too small: have {} slots, need {}",
            into.len(),
            self.components.len()
        );
        for (slot, comp) in into.iter_mut().zip(self.components.iter()) {
            *slot = comp.clone();
        }
        for slot in into.iter_mut().skip(self.components.len()) {
            *slot = None;
        }
    }

    /// Reconstruct a `UriPath` from the URI portion of a pattern.
    ///
    /// `uri_len` is the number of slots [`UriPath::encode_into`] actually
    /// wrote (i.e. the original `UriPath::len()`). It can't be inferred by
    /// trimming trailing free slots the way the `$`-terminated case can:
    /// an explicit `+` wildcard and unused pattern capacity beyond the
    /// URI both show up as `None`, so blindly trimming loses a trailing
    /// wildcard on a prefix URI (`"a/+/*"` would decode as `"a/*"`).
    ///
    /// A non-prefix URI is unambiguous regardless: it always ends in the
    /// bound `$` sentinel, so if one is found within the first `uri_len`
    /// slots this truncates there and ignores any padding after it.
    ///
    /// Panics if `uri_len > slots.len()` — a programmer-contract
    /// violation (the caller must know its own encode width).
    pub fn decode_from(slots: &[Option<Vec<u8>>], uri_len: usize) -> Self {
        assert!(
            uri_len <= slots.len(),
            "uri_len {uri_len} exceeds pattern width {}",
            slots.len()
        );
        let window = &slots[..uri_len];
        let sentinel_at = window.iter().position(|s| {
            s.as_ref().map(|name| name.as_slice() == SENTINEL).unwrap_or(false)
        });
        match sentinel_at {
            Some(i) => UriPath {
                components: window[..=i].to_vec(),
                is_prefix: false,
            },
            None => UriPath {
                components: window.to_vec(),
                is_prefix: true,
            },
        }
    }

    /// Render back to `/`-separated string form. Drops the `$` sentinel;
    /// appends `*` for prefix URIs.
    pub fn to_uri_string(&self) -> String {
        let mut segments: Vec<String> = Vec::with_capacity(self.components.len() + 1);
        for (idx, comp) in self.components.iter().enumerate() {
            let is_last = idx + 1 == self.components.len();
            match comp {
                None => segments.push("+".to_string()),
                Some(name) => {
                    if is_last && !self.is_prefix && name.as_slice() == SENTINEL {
                        continue;
                    }
                    segments.push(String::from_utf8_lossy(name).into_owned());
                }
            }
        }
        if self.is_prefix {
            segments.push("*".to_string());
        }
        segments.join("/")
    }

    /// Deterministic marshalling: 1-byte component count, then each
    /// component as raw bytes followed by `0xFF`; free slots are
    /// zero-length.
    pub fn marshal(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.components.len() * 4 + 1);
        out.push(self.components.len() as u8);
        for comp in &self.components {
            if let Some(name) = comp {
                out.extend_from_slice(name);
            }
            out.push(COMPONENT_TERMINATOR);
        }
        out
    }

    /// Inverse of [`UriPath::marshal`].
    pub fn unmarshal(bytes: &[u8]) -> Result<Self, UriError> {
        let (count, rest) = bytes
            .split_first()
            .ok_or(UriError::EmptySegment)?;
        let mut components = Vec::with_capacity(*count as usize);
        let mut cursor = rest;
        for _ in 0..*count {
            let term = cursor
                .iter()
                .position(|&b| b == COMPONENT_TERMINATOR)
                .ok_or(UriError::EmptySegment)?;
            let (name, after) = cursor.split_at(term);
            components.push(if name.is_empty() {
                None
            } else {
                Some(name.to_vec())
            });
            cursor = &after[1..];
        }
        let is_prefix = match components.last() {
            Some(Some(name)) => name.as_slice() != SENTINEL,
            _ => true,
        };
        Ok(UriPath {
            components,
            is_prefix,
        })
    }
}

impl std::fmt::Display for UriPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_uri_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_path() {
        let p = UriPath::parse("a/b/c").unwrap();
        assert_eq!(p.len(), 4);
        assert!(!p.is_prefix());
        assert_eq!(p.to_uri_string(), "a/b/c");
    }

    #[test]
    fn parses_wildcard_and_prefix() {
        let p = UriPath::parse("a/+/c/*").unwrap();
        assert_eq!(p.len(), 3);
        assert!(p.is_prefix());
        assert_eq!(p.to_uri_string(), "a/+/c/*");
    }

    #[test]
    fn rejects_reserved_segment() {
        assert_eq!(UriPath::parse("a/$/c").unwrap_err(), UriError::ReservedSegment);
    }

    #[test]
    fn rejects_wildcard_not_last() {
        assert_eq!(
            UriPath::parse("a/*/c").unwrap_err(),
            UriError::WildcardNotLast
        );
    }

    #[test]
    fn marshal_roundtrip() {
        let p = UriPath::parse("a/+/c/*").unwrap();
        let bytes = p.marshal();
        let decoded = UriPath::unmarshal(&bytes).unwrap();
        assert_eq!(p, decoded);
    }

    #[test]
    fn encode_decode_pattern_roundtrip() {
        let p = UriPath::parse("a/b/c").unwrap();
        let mut slots = vec![None; 6];
        p.encode_into(&mut slots);
        let decoded = UriPath::decode_from(&slots, p.len());
        assert_eq!(p, decoded);
    }

    #[test]
    fn encode_decode_preserves_trailing_wildcard_in_prefix_uri() {
        // "a/+/*" has an explicit free slot before the prefix wildcard;
        // trimming trailing free slots blindly would collapse it to "a/*".
        let p = UriPath::parse("a/+/*").unwrap();
        assert_eq!(p.len(), 2);
        let mut slots = vec![None; 6];
        p.encode_into(&mut slots);
        let decoded = UriPath::decode_from(&slots, p.len());
        assert_eq!(p, decoded);
        assert_eq!(decoded.to_uri_string(), "a/+/*");
    }
}
