use anyhow::Result;
use rand::rngs::StdRng;
use utils::sampling::{random_index, sample_indices_with_replacement, seeded_rng};

use crate::model::{Centroids, FeatureVector};

/// Draws records uniformly from the full dataset. Only the coordinator owns one.
pub struct Sampler {
    pool: Vec<FeatureVector>,
    rng: StdRng,
}

impl Sampler {
    pub fn new(pool: Vec<FeatureVector>, seed: Option<u64>) -> Self {
        Self {
            pool,
            rng: seeded_rng(seed),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// `k` records drawn with replacement.
    pub fn sample_centroids(&mut self, k: usize) -> Result<Centroids> {
        let indices = sample_indices_with_replacement(&mut self.rng, self.pool.len(), k)?;
        Centroids::new(indices.into_iter().map(|i| self.pool[i].clone()).collect())
    }

    pub fn sample_record(&mut self) -> Result<FeatureVector> {
        let idx = random_index(&mut self.rng, self.pool.len())?;
        Ok(self.pool[idx].clone())
    }
}
