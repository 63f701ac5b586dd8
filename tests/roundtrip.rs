//! End-to-end tests driving the full client engine: encrypt, decrypt,
//! and delegate against the in-memory key store and mock WKD-IBE
//! provider.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use jedi_core::{
    Cancellation, ClientConfig, ClientState, DefaultPatternEncoder, InMemoryKeyStore, JediError,
    MockWkdIbeProvider, Pattern, Permissions, WkdIbeProvider,
};

async fn client_with_wildcard_key(hierarchy: &[u8], pepper: [u8; 32]) -> ClientState {
    let provider = Arc::new(MockWkdIbeProvider::with_pepper(pepper));
    let store = Arc::new(InMemoryKeyStore::new());

    let params = provider.setup(hierarchy).unwrap();
    store.seed_params(hierarchy, params.clone()).await;

    let encoder = DefaultPatternEncoder::new(8);
    let wildcard_len = encoder.pattern_len(0);
    let wildcard = Pattern::empty(wildcard_len);
    let key = provider.keygen(&params, &wildcard.to_attribute_list()).unwrap();
    store.seed_key(hierarchy, wildcard, key).await;

    ClientState::new(ClientConfig::default(), Arc::new(encoder), store, provider)
}

use jedi_core::PatternEncoder;

#[tokio::test]
async fn roundtrip_basic() {
    let client = client_with_wildcard_key(b"example.org", [1u8; 32]).await;
    let cancel = Cancellation::new();
    let ts = Utc.with_ymd_and_hms(2026, 7, 28, 10, 0, 0).unwrap();

    let ct = client
        .encrypt(&cancel, b"example.org", "building1/floor2/temp", ts, b"hello, jedi")
        .await
        .unwrap();
    let pt = client
        .decrypt(&cancel, b"example.org", "building1/floor2/temp", ts, &ct)
        .await
        .unwrap();
    assert_eq!(pt, b"hello, jedi");
}

#[tokio::test]
async fn roundtrip_empty_plaintext() {
    let client = client_with_wildcard_key(b"h", [2u8; 32]).await;
    let cancel = Cancellation::new();
    let ts = Utc::now();

    let ct = client.encrypt(&cancel, b"h", "a/b", ts, b"").await.unwrap();
    let pt = client.decrypt(&cancel, b"h", "a/b", ts, &ct).await.unwrap();
    assert_eq!(pt, b"");
}

#[tokio::test]
async fn roundtrip_large_plaintext() {
    let client = client_with_wildcard_key(b"h", [3u8; 32]).await;
    let cancel = Cancellation::new();
    let ts = Utc::now();
    let plaintext = vec![0xABu8; 65536];

    let ct = client.encrypt(&cancel, b"h", "a/b", ts, &plaintext).await.unwrap();
    let pt = client.decrypt(&cancel, b"h", "a/b", ts, &ct).await.unwrap();
    assert_eq!(pt, plaintext);
}

/// Spec §8 scenario 7: a caller decrypting with a mismatched URI gets
/// back *some* plaintext-shaped bytes, never an error.
#[tokio::test]
async fn mismatched_uri_is_silent_not_an_error() {
    let client = client_with_wildcard_key(b"h", [4u8; 32]).await;
    let cancel = Cancellation::new();
    let ts = Utc::now();

    let ct = client.encrypt(&cancel, b"h", "a/b", ts, b"secret payload").await.unwrap();
    let pt = client.decrypt(&cancel, b"h", "a/c", ts, &ct).await.unwrap();
    assert_ne!(pt, b"secret payload");
    assert_eq!(pt.len(), b"secret payload".len());
}

#[tokio::test]
async fn mismatched_timestamp_is_silent_not_an_error() {
    let client = client_with_wildcard_key(b"h", [5u8; 32]).await;
    let cancel = Cancellation::new();
    let t0 = Utc.with_ymd_and_hms(2026, 7, 28, 10, 0, 0).unwrap();
    let t1 = Utc.with_ymd_and_hms(2026, 7, 28, 11, 0, 0).unwrap();

    let ct = client.encrypt(&cancel, b"h", "a/b", t0, b"secret payload").await.unwrap();
    let pt = client.decrypt(&cancel, b"h", "a/b", t1, &ct).await.unwrap();
    assert_ne!(pt, b"secret payload");
}

#[tokio::test]
async fn truncated_ciphertext_is_rejected() {
    let client = client_with_wildcard_key(b"h", [6u8; 32]).await;
    let cancel = Cancellation::new();
    let ts = Utc::now();

    let ct = client.encrypt(&cancel, b"h", "a/b", ts, b"data").await.unwrap();
    let err = client
        .decrypt(&cancel, b"h", "a/b", ts, &ct[..ct.len() - 1000.min(ct.len() - 1)])
        .await;
    // A shorter-than-minimum envelope must surface a typed error, not a panic.
    if ct.len() > 47 {
        let short = &ct[..47];
        let err = client.decrypt(&cancel, b"h", "a/b", ts, short).await;
        assert!(matches!(err, Err(JediError::CiphertextTooShort { .. })));
    }
    drop(err);
}

#[tokio::test]
async fn no_key_for_pattern_is_reported() {
    let provider = Arc::new(MockWkdIbeProvider::with_pepper([7u8; 32]));
    let store = Arc::new(InMemoryKeyStore::new());
    let params = provider.setup(b"h").unwrap();
    store.seed_params(b"h", params).await;
    // No keys seeded at all.

    let client = ClientState::new(
        ClientConfig::default(),
        Arc::new(DefaultPatternEncoder::new(8)),
        store,
        provider,
    );
    let cancel = Cancellation::new();
    let ts = Utc::now();

    let ct = client.encrypt(&cancel, b"h", "a/b", ts, b"data").await.unwrap();
    let err = client.decrypt(&cancel, b"h", "a/b", ts, &ct).await;
    assert!(matches!(err, Err(JediError::NoKeyForPattern)));
}

#[tokio::test]
async fn delegation_round_trips_through_wire_format() {
    let client = client_with_wildcard_key(b"h", [8u8; 32]).await;
    let cancel = Cancellation::new();
    let start = Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2026, 7, 28, 5, 0, 0).unwrap();

    let delegation = client
        .delegate(&cancel, b"h", "a/b", start, end, Permissions::DECRYPT)
        .await
        .unwrap();
    assert!(!delegation.patterns.is_empty());

    let bytes = jedi_core::wire::marshal_delegation(&delegation);
    let decoded = jedi_core::wire::unmarshal_delegation(&bytes).unwrap();
    assert_eq!(decoded.patterns.len(), delegation.patterns.len());
    for (a, b) in delegation.patterns.iter().zip(decoded.patterns.iter()) {
        assert!(a.equals(b));
    }
}
