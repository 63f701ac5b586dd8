//! The delegation bundle and its builder (spec §3, §4.7).

use crate::encoder::{PatternEncoder, PermissionKind, Permissions};
use crate::ibe::{PublicParams, SecretKey};
use crate::pattern::Pattern;
use crate::time::TimePath;
use crate::uri::UriPath;

/// `{hierarchy-id, public-params, patterns[], secret-keys[]}` with
/// `|patterns| == |keys|`; `keys[i]` is non-delegably qualified to
/// `patterns[i]`.
#[derive(Debug, Clone)]
pub struct Delegation {
    pub hierarchy: Vec<u8>,
    pub params: PublicParams,
    pub patterns: Vec<Pattern>,
    pub keys: Vec<SecretKey>,
}

/// Spec §4.7 step 2: build the ordered pattern list for a set of time
/// paths and requested permissions, interleaved to maximize
/// delta-compressible structure between adjacent entries — for an even
/// time-path index `i`, emit `(decrypt_i, sign_i)`; for odd `i`, emit
/// `(sign_i, decrypt_i)`.
pub fn build_pattern_list(
    encoder: &dyn PatternEncoder,
    uri: &UriPath,
    time_paths: &[TimePath],
    permissions: Permissions,
) -> Vec<Pattern> {
    let requested = permissions.kinds();
    let mut out = Vec::with_capacity(time_paths.len() * requested.len());

    for (i, time) in time_paths.iter().enumerate() {
        let order: Vec<PermissionKind> = if i % 2 == 0 {
            requested.clone()
        } else {
            requested.iter().rev().copied().collect()
        };
        for kind in order {
            out.push(encoder.encode(uri, time, kind));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::DefaultPatternEncoder;

    #[test]
    fn interleaves_permissions_by_parity() {
        let encoder = DefaultPatternEncoder::new(4);
        let uri = UriPath::parse("a/b").unwrap();
        let t0 = TimePath::parse(chrono::Utc::now());
        let t1 = t0.clone();
        let patterns = build_pattern_list(
            &encoder,
            &uri,
            &[t0, t1],
            Permissions::DECRYPT | Permissions::SIGN,
        );
        assert_eq!(patterns.len(), 4);
        // index 0 (even): decrypt, sign
        assert!(!patterns[0].equals(&patterns[1]));
        // index 1 (odd): sign, decrypt -- same two patterns, swapped order
        assert!(patterns[2].equals(&patterns[1]));
        assert!(patterns[3].equals(&patterns[0]));
    }
}
