use anyhow::{anyhow, Result};
use log::debug;

use crate::comm::Communicator;
use crate::model::{Centroids, FeatureVector, Record};
use crate::sampler::Sampler;

/// Per-cluster sums and counts over one worker's partition (or, after merging, over the whole
/// dataset).
#[derive(Debug, Clone, PartialEq)]
pub struct PartialStats {
    pub sums: Vec<FeatureVector>,
    pub counts: Vec<u64>,
}

impl PartialStats {
    pub fn empty(k: usize, dimension: usize) -> Self {
        Self {
            sums: vec![FeatureVector::zeros(dimension); k],
            counts: vec![0; k],
        }
    }

    pub fn k(&self) -> usize {
        self.counts.len()
    }

    /// Sum and count every labelled record. Unlabelled records contribute nothing.
    pub fn from_partition(records: &[Record], k: usize, dimension: usize) -> Result<Self> {
        // Accumulate in place and wrap into feature vectors once at the end.
        let mut sums = vec![vec![0.0f64; dimension]; k];
        let mut counts = vec![0u64; k];
        for record in records {
            let Some(cluster_id) = record.cluster_id else {
                continue;
            };
            if cluster_id >= k {
                return Err(anyhow!(
                    "Record labelled with cluster {} but only {} clusters exist",
                    cluster_id,
                    k
                ));
            }
            let values = record.features.values();
            if values.len() != dimension {
                return Err(anyhow!(
                    "Record has dimension {}, expected {}",
                    values.len(),
                    dimension
                ));
            }
            for (sum, value) in sums[cluster_id].iter_mut().zip(values) {
                *sum += value;
            }
            counts[cluster_id] += 1;
        }
        Ok(Self {
            sums: sums.into_iter().map(FeatureVector::new).collect(),
            counts,
        })
    }

    pub fn merge(&self, other: &PartialStats) -> Result<PartialStats> {
        if self.k() != other.k() {
            return Err(anyhow!(
                "Cannot merge partial stats for {} and {} clusters",
                self.k(),
                other.k()
            ));
        }
        Ok(PartialStats {
            sums: self
                .sums
                .iter()
                .zip(other.sums.iter())
                .map(|(a, b)| a.add(b))
                .collect(),
            counts: self
                .counts
                .iter()
                .zip(other.counts.iter())
                .map(|(a, b)| a + b)
                .collect(),
        })
    }

    /// Turn global totals into new centroids. A cluster with no members is reseeded with a
    /// record drawn from the full dataset.
    pub fn finalize(&self, sampler: &mut Sampler) -> Result<Aggregation> {
        let mut reseeded = vec![];
        let mut centroids = Vec::with_capacity(self.k());
        for (cluster_id, (sum, &count)) in self.sums.iter().zip(self.counts.iter()).enumerate() {
            if count == 0 {
                reseeded.push(cluster_id);
                centroids.push(sampler.sample_record()?);
            } else {
                centroids.push(sum.div_scalar(count as f64));
            }
        }
        Ok(Aggregation {
            centroids: Centroids::new(centroids)?,
            reseeded,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Aggregation {
    pub centroids: Centroids,
    /// Clusters that were empty and got reseeded. Only filled in on the coordinator.
    pub reseeded: Vec<usize>,
}

/// One aggregation step of the round protocol.
///
/// Every worker computes partial stats from `local` and sends them to the coordinator. The
/// coordinator merges them in rank order, finalizes and broadcasts the new centroids. Every
/// worker returns the same centroid set. `previous` supplies k and the dimension, so a worker
/// with an empty partition still sends correctly shaped zeros.
pub fn aggregate<C: Communicator>(
    comm: &C,
    local: &[Record],
    previous: &Centroids,
    sampler: Option<&mut Sampler>,
) -> Result<Aggregation> {
    let partial = PartialStats::from_partition(local, previous.k(), previous.dimension())?;
    debug!("Worker {} partial counts: {:?}", comm.rank(), partial.counts);

    if !comm.is_coordinator() {
        comm.send_partial(partial)?;
        let centroids = comm.broadcast(None)?;
        return Ok(Aggregation {
            centroids,
            reseeded: vec![],
        });
    }

    let sampler = sampler.ok_or_else(|| anyhow!("Coordinator needs a sampler to aggregate"))?;
    let mut total = partial;
    for source in 1..comm.size() {
        let remote = comm.receive_partial(source)?;
        total = total.merge(&remote)?;
    }
    let aggregation = total.finalize(sampler)?;
    if !aggregation.reseeded.is_empty() {
        debug!("Reseeded empty clusters {:?}", aggregation.reseeded);
    }
    let centroids = comm.broadcast(Some(aggregation.centroids))?;
    Ok(Aggregation {
        centroids,
        reseeded: aggregation.reseeded,
    })
}
