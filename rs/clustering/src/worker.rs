use anyhow::{anyhow, Result};
use config::clustering::ClusteringConfig;
use config::enums::RemainderPolicy;
use log::{debug, info, warn};
use metrics::RUN_METRICS;

use crate::aggregation::aggregate;
use crate::assignment::AssignmentEngine;
use crate::comm::Communicator;
use crate::convergence::{ConvergenceCoordinator, Termination};
use crate::model::{Centroids, Record};
use crate::partition::PartitionPlan;
use crate::sampler::Sampler;

/// What only the coordinator brings to a run.
pub struct CoordinatorInput {
    pub records: Vec<Record>,
    pub seeds: Centroids,
    pub sampler: Sampler,
    pub policy: RemainderPolicy,
}

pub struct WorkerOutput {
    pub rank: usize,
    /// The fully labelled dataset in original order. Coordinator only.
    pub records: Option<Vec<Record>>,
    pub centroids: Centroids,
    pub rounds: usize,
    pub termination: Termination,
    pub num_reseeded: usize,
}

/// One member of the worker group, running the full per-worker protocol:
/// plan broadcast, scatter, seed broadcast, the round loop, and the final gather.
pub struct Worker<C: Communicator> {
    comm: C,
    engine: AssignmentEngine,
    max_iterations: usize,
}

impl<C: Communicator> Worker<C> {
    pub fn new(comm: C, config: &ClusteringConfig) -> Result<Self> {
        let engine = AssignmentEngine::new(config.effective_num_threads(), comm.rank())?;
        Ok(Self {
            comm,
            engine,
            max_iterations: config.max_iterations,
        })
    }

    pub fn run(self, input: Option<CoordinatorInput>) -> Result<WorkerOutput> {
        let comm = &self.comm;
        let rank = comm.rank();
        if comm.is_coordinator() != input.is_some() {
            return Err(anyhow!(
                "Worker {}: exactly the coordinator must receive the dataset",
                rank
            ));
        }

        let (chunks, seeds, mut sampler, plan) = match input {
            Some(input) => {
                let plan = PartitionPlan::new(input.records.len(), comm.size(), input.policy)?;
                info!(
                    "Partitioning {} records across {} workers: chunk size {}, remainder {} ({})",
                    plan.num_records(),
                    plan.num_workers(),
                    plan.chunk_size(),
                    plan.remainder(),
                    plan.policy()
                );
                let chunks = plan.split(input.records)?;
                (Some(chunks), Some(input.seeds), Some(input.sampler), Some(plan))
            }
            None => (None, None, None, None),
        };

        let plan = comm.broadcast(plan)?;
        let mut local = comm.scatter(chunks)?;
        if local.len() != plan.chunk_len(rank) {
            return Err(anyhow!(
                "Worker {} received {} records, plan expects {}",
                rank,
                local.len(),
                plan.chunk_len(rank)
            ));
        }
        if local.is_empty() {
            warn!("Worker {} owns an empty partition", rank);
        }
        debug!("Worker {} owns {} records", rank, local.len());
        RUN_METRICS.partition_size_set(rank, local.len() as i64);

        // Round one assigns against the seeds, every later round against fresh means.
        let mut centroids = comm.broadcast(seeds)?;
        let mut convergence = ConvergenceCoordinator::new(self.max_iterations);
        let mut num_reseeded = 0;

        let termination = loop {
            convergence.begin_round()?;
            if convergence.rounds() > 1 {
                let aggregation = aggregate(comm, &local, &centroids, sampler.as_mut())?;
                centroids = aggregation.centroids;
                num_reseeded += aggregation.reseeded.len();
                if comm.is_coordinator() {
                    RUN_METRICS.clusters_reseeded_inc_by(aggregation.reseeded.len() as u64);
                }
            }

            convergence.begin_assignment()?;
            let local_changed = self.engine.assign(&mut local, &centroids);
            let global_changed = convergence.reduce(comm, local_changed)?;

            if comm.is_coordinator() {
                RUN_METRICS.rounds_inc();
                info!(
                    "Round {} finished, assignments changed: {}",
                    convergence.rounds(),
                    global_changed
                );
            }
            if let Some(termination) = convergence.advance(global_changed)? {
                break termination;
            }
        };

        let gathered = comm.gather(local)?;
        let records = match gathered {
            Some(chunks) => {
                let records = plan.reassemble(chunks)?;
                info!(
                    "Gathered {} labelled records after {} rounds ({:?})",
                    records.len(),
                    convergence.rounds(),
                    termination
                );
                RUN_METRICS.converged_set(termination == Termination::Converged);
                Some(records)
            }
            None => None,
        };

        Ok(WorkerOutput {
            rank,
            records,
            centroids,
            rounds: convergence.rounds(),
            termination,
            num_reseeded,
        })
    }
}
