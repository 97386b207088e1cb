use std::ops::Range;

use anyhow::{anyhow, Result};
use config::enums::RemainderPolicy;

use crate::comm::COORDINATOR_RANK;

/// How a dataset of `num_records` rows is split across `num_workers` workers.
///
/// Every worker owns one or two contiguous ranges of the original row order (see
/// [`PartitionPlan::segments`]). The ranges of all workers are disjoint and cover the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionPlan {
    num_records: usize,
    num_workers: usize,
    chunk_size: usize,
    remainder: usize,
    policy: RemainderPolicy,
}

impl PartitionPlan {
    pub fn new(num_records: usize, num_workers: usize, policy: RemainderPolicy) -> Result<Self> {
        if num_workers == 0 {
            return Err(anyhow!("Cannot partition across zero workers"));
        }
        let chunk_size = num_records / num_workers;
        let remainder = num_records - chunk_size * num_workers;
        Ok(Self {
            num_records,
            num_workers,
            chunk_size,
            remainder,
            policy,
        })
    }

    pub fn num_records(&self) -> usize {
        self.num_records
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn remainder(&self) -> usize {
        self.remainder
    }

    pub fn policy(&self) -> RemainderPolicy {
        self.policy
    }

    /// Original-order index ranges owned by `rank`, in the order they appear in its local chunk.
    ///
    /// With `Coordinator`, rank 0 owns its regular share followed by the remainder block at the
    /// tail of the dataset. With `RoundRobin`, the first `remainder` ranks own one extra row and
    /// every range stays contiguous.
    pub fn segments(&self, rank: usize) -> Vec<Range<usize>> {
        if rank >= self.num_workers {
            return vec![];
        }
        match self.policy {
            RemainderPolicy::Coordinator => {
                let start = rank * self.chunk_size;
                let mut segments = vec![start..start + self.chunk_size];
                if rank == COORDINATOR_RANK && self.remainder > 0 {
                    let tail = self.chunk_size * self.num_workers;
                    segments.push(tail..self.num_records);
                }
                segments
            }
            RemainderPolicy::RoundRobin => {
                let start = rank * self.chunk_size + rank.min(self.remainder);
                let len = self.chunk_size + usize::from(rank < self.remainder);
                vec![start..start + len]
            }
        }
    }

    pub fn chunk_len(&self, rank: usize) -> usize {
        self.segments(rank).iter().map(|s| s.len()).sum()
    }

    /// Split the full dataset into one local chunk per rank.
    pub fn split<T>(&self, items: Vec<T>) -> Result<Vec<Vec<T>>> {
        if items.len() != self.num_records {
            return Err(anyhow!(
                "Plan covers {} records but {} were supplied",
                self.num_records,
                items.len()
            ));
        }
        let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
        let mut chunks = Vec::with_capacity(self.num_workers);
        for rank in 0..self.num_workers {
            let mut chunk = Vec::with_capacity(self.chunk_len(rank));
            for segment in self.segments(rank) {
                for idx in segment {
                    let item = slots[idx]
                        .take()
                        .ok_or_else(|| anyhow!("Row {} assigned to more than one worker", idx))?;
                    chunk.push(item);
                }
            }
            chunks.push(chunk);
        }
        Ok(chunks)
    }

    /// Inverse of [`PartitionPlan::split`]: put every local chunk back at its original rows.
    pub fn reassemble<T>(&self, chunks: Vec<Vec<T>>) -> Result<Vec<T>> {
        if chunks.len() != self.num_workers {
            return Err(anyhow!(
                "Expected {} chunks, got {}",
                self.num_workers,
                chunks.len()
            ));
        }
        let mut slots: Vec<Option<T>> = (0..self.num_records).map(|_| None).collect();
        for (rank, chunk) in chunks.into_iter().enumerate() {
            let expected = self.chunk_len(rank);
            if chunk.len() != expected {
                return Err(anyhow!(
                    "Worker {} returned {} records, expected {}",
                    rank,
                    chunk.len(),
                    expected
                ));
            }
            let indices = self.segments(rank).into_iter().flatten();
            for (idx, item) in indices.zip(chunk) {
                slots[idx] = Some(item);
            }
        }
        slots
            .into_iter()
            .enumerate()
            .map(|(idx, slot)| slot.ok_or_else(|| anyhow!("Row {} missing after gather", idx)))
            .collect()
    }
}
