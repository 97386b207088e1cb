use anyhow::{anyhow, Result};
use rayon::iter::{IntoParallelRefMutIterator, ParallelIterator};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::model::{Centroids, FeatureVector, Record};

/// Index of the closest centroid. Ties go to the lowest index.
pub fn nearest_centroid(features: &FeatureVector, centroids: &Centroids) -> usize {
    let mut min_distance = f64::INFINITY;
    let mut nearest = 0;
    for (cluster_id, centroid) in centroids.as_slice().iter().enumerate() {
        let distance = features.distance(centroid);
        if distance < min_distance {
            min_distance = distance;
            nearest = cluster_id;
        }
    }
    nearest
}

/// Relabel one record, returning whether its label changed.
fn relabel(record: &mut Record, centroids: &Centroids) -> bool {
    let nearest = nearest_centroid(&record.features, centroids);
    let changed = record.cluster_id != Some(nearest);
    record.cluster_id = Some(nearest);
    changed
}

/// Single-unit assignment over a local partition.
pub fn assign_sequential(records: &mut [Record], centroids: &Centroids) -> bool {
    let mut changed = false;
    for record in records.iter_mut() {
        changed |= relabel(record, centroids);
    }
    changed
}

/// Fan the assignment out over `pool`. Each unit ORs its own flag and the flags are merged
/// after the parallel phase.
pub fn assign(records: &mut [Record], centroids: &Centroids, pool: &ThreadPool) -> bool {
    // `any` would short-circuit and leave records unlabelled.
    pool.install(|| {
        records
            .par_iter_mut()
            .map(|record| relabel(record, centroids))
            .reduce(|| false, |a, b| a || b)
    })
}

/// A worker's local assignment step, owning the thread pool it fans out to.
pub struct AssignmentEngine {
    num_threads: usize,
    pool: ThreadPool,
}

impl AssignmentEngine {
    pub fn new(num_threads: usize, rank: usize) -> Result<Self> {
        if num_threads == 0 {
            return Err(anyhow!("Assignment needs at least one thread"));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(move |i| format!("worker-{}-assign-{}", rank, i))
            .build()
            .map_err(|e| anyhow!("Failed to build assignment thread pool: {}", e))?;
        Ok(Self { num_threads, pool })
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Label every record with its nearest centroid. Returns true if any label changed.
    pub fn assign(&self, records: &mut [Record], centroids: &Centroids) -> bool {
        if self.num_threads == 1 {
            assign_sequential(records, centroids)
        } else {
            assign(records, centroids, &self.pool)
        }
    }
}
