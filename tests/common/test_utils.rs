use dedup_bloom_rs::SplitMix64;
use rand::RngCore;
use std::sync::Once;

static TRACING: Once = Once::new();

/// Installs a fmt subscriber once per test binary, filtered by `RUST_LOG`
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Consistent, human readable test elements
#[allow(dead_code)]
pub fn generate_test_items(count: usize) -> Vec<Vec<u8>> {
    (0..count)
        .map(|i| format!("test_item_{:06}", i).into_bytes())
        .collect()
}

/// Reproducible stream of random 8 byte elements
#[allow(dead_code)]
pub fn generate_random_items(seed: u64, count: usize) -> Vec<Vec<u8>> {
    let mut rng = SplitMix64::new(seed);
    (0..count)
        .map(|_| rng.next_u64().to_be_bytes().to_vec())
        .collect()
}
