use anyhow::{anyhow, Result};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Build the RNG used for sampling. A fixed seed makes every draw reproducible.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => {
            debug!("Sampling with fixed seed {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    }
}

/// Uniformly pick one index in `0..population`.
pub fn random_index<R: Rng>(rng: &mut R, population: usize) -> Result<usize> {
    if population == 0 {
        return Err(anyhow!("Cannot sample from an empty population"));
    }
    Ok(rng.gen_range(0..population))
}

/// Uniformly pick `count` indices in `0..population`, with replacement.
pub fn sample_indices_with_replacement<R: Rng>(
    rng: &mut R,
    population: usize,
    count: usize,
) -> Result<Vec<usize>> {
    (0..count).map(|_| random_index(rng, population)).collect()
}
