//! Patterns: the fixed-length slot vector matched against by WKD-IBE keys.
//! See spec §3, §4.3.

use std::sync::Arc;

use sha3::{Digest, Sha3_256};
use subtle::ConstantTimeEq;

use crate::time::TimePath;
use crate::uri::UriPath;

/// A single slot: free (`None`) or bound to an opaque byte string.
pub type Slot = Option<Vec<u8>>;

/// An attribute derived from a bound slot by hashing into the scalar
/// field. Reference-counted so `to_attribute_list_with_reference` can
/// alias unchanged attributes without copying (spec §9, "slot-sharing").
pub type Attribute = Arc<[u8]>;

/// Fixed-length sequence of slots: URI slots followed by exactly six time
/// slots.
#[derive(Debug, Clone)]
pub struct Pattern {
    slots: Vec<Slot>,
}

impl Pattern {
    /// Build an all-free pattern of the given total length (`max_uri_slots
    /// + 6`).
    pub fn empty(len: usize) -> Self {
        Pattern {
            slots: vec![None; len],
        }
    }

    /// Build a pattern directly from a slot vector (used by encoders that
    /// transform an already-encoded pattern, e.g. to add permission tags).
    pub fn from_slots(slots: Vec<Slot>) -> Self {
        Pattern { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, i: usize) -> &Slot {
        &self.slots[i]
    }

    /// Encode `uri` into the first `len(into) - 6` slots and `time` into
    /// the final 6. Panics if the buffer is too small — a
    /// programmer-contract violation per spec §4.3.
    pub fn encode(uri: &UriPath, time: &TimePath, total_len: usize) -> Self {
        assert!(
            total_len >= uri.len() + 6,
            "pattern buffer too small: have {total_len} slots, need {}",
            uri.len() + 6
        );
        let mut slots = vec![None; total_len];
        let uri_len = total_len - 6;
        let (uri_part, time_part) = slots.split_at_mut(uri_len);
        uri.encode_into(uri_part);
        time.encode_into(time_part);
        Pattern { slots }
    }

    /// The asymmetric IBE matching relation: `self matches other` iff
    /// every slot of `self` is free or byte-equal to `other`'s slot.
    ///
    /// Panics if the patterns have different lengths (programmer fault
    /// per spec §4.3 / §7).
    pub fn matches(&self, other: &Pattern) -> bool {
        assert_eq!(
            self.len(),
            other.len(),
            "matches() requires patterns of equal length"
        );
        self.slots.iter().zip(other.slots.iter()).all(|(p, q)| match p {
            None => true,
            Some(pb) => match q {
                Some(qb) => bool::from(pb.as_slice().ct_eq(qb.as_slice())),
                None => false,
            },
        })
    }

    /// Slot-wise equality, including slot freeness. `false` if lengths
    /// differ (unlike `matches`, this never panics).
    pub fn equals(&self, other: &Pattern) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.slots.iter().zip(other.slots.iter()).all(|(p, q)| match (p, q) {
            (None, None) => true,
            (Some(a), Some(b)) => bool::from(a.as_slice().ct_eq(b.as_slice())),
            _ => false,
        })
    }

    fn hash_slot(bytes: &[u8]) -> Attribute {
        let mut hasher = Sha3_256::new();
        hasher.update(bytes);
        Arc::from(hasher.finalize().to_vec().into_boxed_slice())
    }

    /// Hash each bound slot to an attribute; free slots contribute
    /// nothing (the returned vector is indexed by pattern position with
    /// `None` at free slots).
    pub fn to_attribute_list(&self) -> Vec<Option<Attribute>> {
        self.slots
            .iter()
            .map(|s| s.as_ref().map(|b| Self::hash_slot(b)))
            .collect()
    }

    /// Like `to_attribute_list`, but for every index where `self` and
    /// `reference` are bound and byte-equal, reuses `reference_attrs[i]`
    /// instead of re-hashing. Returns `(attributes, equal)` where `equal`
    /// is true iff `self` and `reference` agree on every slot (including
    /// freeness) — i.e. `self.equals(reference)`.
    pub fn to_attribute_list_with_reference(
        &self,
        reference: &Pattern,
        reference_attrs: &[Option<Attribute>],
    ) -> (Vec<Option<Attribute>>, bool) {
        assert_eq!(
            reference.len(),
            reference_attrs.len(),
            "reference attribute list length must match reference pattern length"
        );
        let mut equal = self.len() == reference.len();
        let attrs = self
            .slots
            .iter()
            .enumerate()
            .map(|(i, slot)| match slot {
                None => {
                    if reference.slots.get(i).map(|s| s.is_some()).unwrap_or(true) {
                        equal = false;
                    }
                    None
                }
                Some(bytes) => {
                    let same_as_reference = reference
                        .slots
                        .get(i)
                        .and_then(|s| s.as_ref())
                        .map(|rb| bool::from(bytes.as_slice().ct_eq(rb.as_slice())))
                        .unwrap_or(false);
                    if !same_as_reference {
                        equal = false;
                        Some(Self::hash_slot(bytes))
                    } else {
                        Some(reference_attrs[i].clone().unwrap_or_else(|| Self::hash_slot(bytes)))
                    }
                }
            })
            .collect();
        (attrs, equal)
    }
}
