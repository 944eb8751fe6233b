use rand::{rngs::StdRng, SeedableRng};

/// Create the [`StdRng`] threaded through merging and shuffling.
///
/// The configured seed can be overridden with the `SEED` environment
/// variable. A single generator is built once per run and passed down
/// explicitly, so every random draw is reproducible run-to-run.
pub fn seeded(seed: u64) -> StdRng {
    let seed = std::env::var("SEED")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(seed);
    StdRng::seed_from_u64(seed)
}
