use std::thread;

use anyhow::{anyhow, Result};
use config::clustering::ClusteringConfig;
use log::{info, warn};
use metrics::RUN_METRICS;

use crate::comm::local::LocalCluster;
use crate::comm::{Communicator, PeerDisconnected, COORDINATOR_RANK};
use crate::convergence::Termination;
use crate::model::{validate_dimension, Centroids, Record};
use crate::sampler::Sampler;
use crate::worker::{CoordinatorInput, Worker, WorkerOutput};

#[derive(Debug)]
pub struct ClusteringOutcome {
    /// Every input record, in input order, labelled with its cluster.
    pub records: Vec<Record>,
    pub centroids: Centroids,
    pub rounds: usize,
    pub termination: Termination,
    pub num_reseeded: usize,
}

/// Drives a whole run: seeding, launching the worker group, and collecting the coordinator's
/// gathered result.
pub struct Orchestrator {
    config: ClusteringConfig,
}

impl Orchestrator {
    pub fn new(config: ClusteringConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    /// Seed `num_clusters` centroids by sampling records with replacement, then run.
    pub fn run(&self, records: Vec<Record>) -> Result<ClusteringOutcome> {
        let mut sampler = self.sampler_for(&records)?;
        let seeds = sampler.sample_centroids(self.config.num_clusters)?;
        self.execute(records, seeds, sampler)
    }

    /// Run from caller-chosen initial centroids. k is taken from `seeds`.
    pub fn run_with_seeds(
        &self,
        records: Vec<Record>,
        seeds: Centroids,
    ) -> Result<ClusteringOutcome> {
        let sampler = self.sampler_for(&records)?;
        self.execute(records, seeds, sampler)
    }

    fn sampler_for(&self, records: &[Record]) -> Result<Sampler> {
        let first = records
            .first()
            .ok_or_else(|| anyhow!("Cannot cluster an empty dataset"))?;
        validate_dimension(records, first.features.dimension())?;
        let pool = records.iter().map(|r| r.features.clone()).collect();
        Ok(Sampler::new(pool, self.config.seed))
    }

    fn execute(
        &self,
        records: Vec<Record>,
        seeds: Centroids,
        sampler: Sampler,
    ) -> Result<ClusteringOutcome> {
        let dimension = seeds.dimension();
        validate_dimension(&records, dimension)?;
        if seeds.k() > records.len() {
            warn!(
                "{} clusters requested for {} records; some clusters will be reseeded",
                seeds.k(),
                records.len()
            );
        }
        info!(
            "Clustering {} records of dimension {} into {} clusters with {} workers",
            records.len(),
            dimension,
            seeds.k(),
            self.config.num_workers
        );
        RUN_METRICS.num_records_set(records.len() as i64);

        let mut coordinator_input = Some(CoordinatorInput {
            records,
            seeds,
            sampler,
            policy: self.config.remainder_policy,
        });
        let communicators = LocalCluster::create(self.config.num_workers)?;

        let outputs: Vec<(usize, Result<WorkerOutput>)> = thread::scope(|s| {
            let handles: Vec<_> = communicators
                .into_iter()
                .map(|comm| {
                    let rank = comm.rank();
                    let input = if rank == COORDINATOR_RANK {
                        coordinator_input.take()
                    } else {
                        None
                    };
                    let config = &self.config;
                    let handle = s.spawn(move || Worker::new(comm, config)?.run(input));
                    (rank, handle)
                })
                .collect();
            handles
                .into_iter()
                .map(|(rank, handle)| {
                    let output = handle
                        .join()
                        .map_err(|_| anyhow!("Worker {} panicked", rank))
                        .and_then(|output| output);
                    (rank, output)
                })
                .collect()
        });

        let mut coordinator_output = None;
        let mut errors = vec![];
        for (rank, output) in outputs {
            match output {
                Ok(output) if rank == COORDINATOR_RANK => coordinator_output = Some(output),
                Ok(_) => {}
                Err(e) => errors.push((rank, e)),
            }
        }
        if !errors.is_empty() {
            return Err(root_cause(errors));
        }
        let output =
            coordinator_output.ok_or_else(|| anyhow!("Coordinator produced no output"))?;
        let records = output
            .records
            .ok_or_else(|| anyhow!("Coordinator did not gather the dataset"))?;

        info!(
            "Finished after {} rounds: {:?}",
            output.rounds, output.termination
        );
        Ok(ClusteringOutcome {
            records,
            centroids: output.centroids,
            rounds: output.rounds,
            termination: output.termination,
            num_reseeded: output.num_reseeded,
        })
    }
}

/// Pick the error to report for a failed run. One failing worker makes its peers fail with
/// disconnects, so the first error that is not a disconnect is the cause. Every error is logged.
fn root_cause(errors: Vec<(usize, anyhow::Error)>) -> anyhow::Error {
    for (rank, e) in &errors {
        warn!("Worker {} failed: {:#}", rank, e);
    }
    let cause = errors
        .iter()
        .position(|(_, e)| e.downcast_ref::<PeerDisconnected>().is_none())
        .unwrap_or(0);
    let (rank, e) = errors
        .into_iter()
        .nth(cause)
        .unwrap_or_else(|| (COORDINATOR_RANK, anyhow!("Run failed without an error")));
    e.context(format!("Worker {} failed", rank))
}
