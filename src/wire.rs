//! Deterministic binary marshalling for patterns and delegations (spec
//! §6). URI and time paths marshal themselves (`UriPath`/`TimePath`); this
//! module covers the two composite wire formats layered on top of them.

use crate::delegation::Delegation;
use crate::error::JediError;
use crate::ibe::{PublicParams, SecretKey};
use crate::pattern::Pattern;

/// Leading type byte for a marshalled pattern.
pub const PATTERN_TYPE: u8 = 0x01;
/// Leading type byte for a marshalled delegation.
pub const DELEGATION_TYPE: u8 = 0x02;

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn take_u32(bytes: &[u8], cursor: &mut usize) -> Result<u32, JediError> {
    if bytes.len() < *cursor + 4 {
        return Err(JediError::MarshalError("truncated u32".to_string()));
    }
    let v = u32::from_le_bytes(bytes[*cursor..*cursor + 4].try_into().unwrap());
    *cursor += 4;
    Ok(v)
}

fn take_bytes<'a>(bytes: &'a [u8], cursor: &mut usize, n: usize) -> Result<&'a [u8], JediError> {
    if bytes.len() < *cursor + n {
        return Err(JediError::MarshalError("truncated field".to_string()));
    }
    let out = &bytes[*cursor..*cursor + n];
    *cursor += n;
    Ok(out)
}

/// `0x01, L:u32, K:u32, then for each bound i in [0, K): i:u32, len:u32,
/// bytes`. `K` is one past the last non-empty slot; unbound slots are
/// omitted entirely.
pub fn marshal_pattern(pattern: &Pattern) -> Vec<u8> {
    let mut out = vec![PATTERN_TYPE];
    put_u32(&mut out, pattern.len() as u32);
    let k = pattern
        .slots()
        .iter()
        .rposition(|s| s.is_some())
        .map(|i| i + 1)
        .unwrap_or(0);
    put_u32(&mut out, k as u32);
    for (i, slot) in pattern.slots().iter().enumerate().take(k) {
        if let Some(bytes) = slot {
            put_u32(&mut out, i as u32);
            put_u32(&mut out, bytes.len() as u32);
            out.extend_from_slice(bytes);
        }
    }
    out
}

pub fn unmarshal_pattern(bytes: &[u8]) -> Result<Pattern, JediError> {
    let mut cursor = 0;
    let tag = *bytes
        .first()
        .ok_or_else(|| JediError::MarshalError("empty pattern bytes".to_string()))?;
    if tag != PATTERN_TYPE {
        return Err(JediError::MarshalError(format!(
            "expected pattern type byte {PATTERN_TYPE:#x}, got {tag:#x}"
        )));
    }
    cursor += 1;
    let len = take_u32(bytes, &mut cursor)? as usize;
    let k = take_u32(bytes, &mut cursor)? as usize;
    let mut slots = vec![None; len];
    for _ in 0..k {
        if cursor >= bytes.len() {
            break;
        }
        let i = take_u32(bytes, &mut cursor)? as usize;
        let l = take_u32(bytes, &mut cursor)? as usize;
        let value = take_bytes(bytes, &mut cursor, l)?.to_vec();
        if i >= len {
            return Err(JediError::MarshalError(format!(
                "slot index {i} out of bounds for pattern length {len}"
            )));
        }
        slots[i] = Some(value);
    }
    Ok(Pattern::from_slots(slots))
}

/// `0x02, hierarchy(len-prefixed), params.marshal (len-prefixed), count:
/// u32, then per entry: pattern (len-prefixed, itself the full
/// `marshal_pattern` bytes), key.marshal (len-prefixed)`.
pub fn marshal_delegation(delegation: &Delegation) -> Vec<u8> {
    let mut out = vec![DELEGATION_TYPE];
    put_u32(&mut out, delegation.hierarchy.len() as u32);
    out.extend_from_slice(&delegation.hierarchy);

    let params_bytes = delegation.params.marshal();
    put_u32(&mut out, params_bytes.len() as u32);
    out.extend_from_slice(&params_bytes);

    put_u32(&mut out, delegation.patterns.len() as u32);
    for (pattern, key) in delegation.patterns.iter().zip(delegation.keys.iter()) {
        let pattern_bytes = marshal_pattern(pattern);
        put_u32(&mut out, pattern_bytes.len() as u32);
        out.extend_from_slice(&pattern_bytes);

        let key_bytes = key.marshal();
        put_u32(&mut out, key_bytes.len() as u32);
        out.extend_from_slice(&key_bytes);
    }
    out
}

pub fn unmarshal_delegation(bytes: &[u8]) -> Result<Delegation, JediError> {
    let mut cursor = 0;
    let tag = *bytes
        .first()
        .ok_or_else(|| JediError::MarshalError("empty delegation bytes".to_string()))?;
    if tag != DELEGATION_TYPE {
        return Err(JediError::MarshalError(format!(
            "expected delegation type byte {DELEGATION_TYPE:#x}, got {tag:#x}"
        )));
    }
    cursor += 1;

    let hlen = take_u32(bytes, &mut cursor)? as usize;
    let hierarchy = take_bytes(bytes, &mut cursor, hlen)?.to_vec();

    let plen = take_u32(bytes, &mut cursor)? as usize;
    let params = PublicParams::unmarshal(take_bytes(bytes, &mut cursor, plen)?);

    let count = take_u32(bytes, &mut cursor)? as usize;
    let mut patterns = Vec::with_capacity(count);
    let mut keys = Vec::with_capacity(count);
    for _ in 0..count {
        let pat_len = take_u32(bytes, &mut cursor)? as usize;
        let pattern = unmarshal_pattern(take_bytes(bytes, &mut cursor, pat_len)?)?;
        patterns.push(pattern);

        let key_len = take_u32(bytes, &mut cursor)? as usize;
        let key = SecretKey::unmarshal(take_bytes(bytes, &mut cursor, key_len)?)?;
        keys.push(key);
    }

    Ok(Delegation {
        hierarchy,
        params,
        patterns,
        keys,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_roundtrip() {
        let pattern = Pattern::from_slots(vec![Some(b"a".to_vec()), None, Some(b"c".to_vec())]);
        let bytes = marshal_pattern(&pattern);
        let decoded = unmarshal_pattern(&bytes).unwrap();
        assert!(pattern.equals(&decoded));
    }

    #[test]
    fn pattern_with_no_bound_slots_roundtrips() {
        let pattern = Pattern::empty(4);
        let bytes = marshal_pattern(&pattern);
        let decoded = unmarshal_pattern(&bytes).unwrap();
        assert!(pattern.equals(&decoded));
    }

    #[test]
    fn rejects_wrong_type_byte() {
        let bytes = vec![0x99, 0, 0, 0, 0];
        assert!(unmarshal_pattern(&bytes).is_err());
    }
}
