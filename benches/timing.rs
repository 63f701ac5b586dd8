//! Manual timing harness (no criterion harness, matching the teacher's
//! `time_it` shape) demonstrating the cache's core value proposition:
//! repeated encrypt/decrypt calls against the same (URI, pattern) or the
//! same encapsulation amortize away the WKD-IBE cost (spec §4.5/§4.6).

use std::hint::black_box;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use jedi_core::{
    Cancellation, ClientConfig, ClientState, DefaultPatternEncoder, InMemoryKeyStore,
    MockWkdIbeProvider, Pattern, PatternEncoder, Permissions, WkdIbeProvider,
};

fn time_it<F: FnMut()>(label: &str, iters: usize, mut f: F) {
    for _ in 0..(iters / 10).max(10) {
        f();
    }

    let start = Instant::now();
    for _ in 0..iters {
        f();
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / (iters as u32);

    println!("{:<28} total={:?}  per_iter={:?}", label, elapsed, per_iter);
}

async fn seeded_client(hierarchy: &[u8]) -> ClientState {
    let provider = Arc::new(MockWkdIbeProvider::with_pepper([7u8; 32]));
    let store = Arc::new(InMemoryKeyStore::new());

    let params = provider.setup(hierarchy).unwrap();
    store.seed_params(hierarchy, params.clone()).await;

    let encoder = DefaultPatternEncoder::new(8);
    let wildcard = Pattern::empty(encoder.pattern_len(0));
    let key = provider.keygen(&params, &wildcard.to_attribute_list()).unwrap();
    store.seed_key(hierarchy, wildcard, key).await;

    ClientState::new(
        ClientConfig::default(),
        Arc::new(encoder),
        store,
        provider,
    )
}

fn main() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let hierarchy = b"bench.example.org";
    let client = rt.block_on(seeded_client(hierarchy));
    let cancel = Cancellation::new();
    let now = Utc::now();
    let plaintext = vec![0x42u8; 1024];
    let iters = 2_000;

    time_it("encrypt_cache_hit (same uri+ts)", iters, || {
        let envelope = rt
            .block_on(client.encrypt(&cancel, hierarchy, "building1/floor2/temp", now, &plaintext))
            .unwrap();
        black_box(envelope);
    });

    let mut counter = 0u64;
    time_it("encrypt_cache_miss (new uri each call)", iters, || {
        counter += 1;
        let uri = format!("building1/floor2/temp-{counter}");
        let envelope = rt
            .block_on(client.encrypt(&cancel, hierarchy, &uri, now, &plaintext))
            .unwrap();
        black_box(envelope);
    });

    let envelope = rt
        .block_on(client.encrypt(&cancel, hierarchy, "decrypt/bench/fixed", now, &plaintext))
        .unwrap();
    time_it("decrypt_cache_hit (same encapsulation)", iters, || {
        let pt = rt
            .block_on(client.decrypt(&cancel, hierarchy, "decrypt/bench/fixed", now, &envelope))
            .unwrap();
        black_box(pt);
    });

    println!("\nDone.");
    let _ = Permissions::DECRYPT;
}
