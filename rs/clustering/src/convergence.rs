use anyhow::{anyhow, Result};
use log::debug;

use crate::comm::Communicator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Seeded,
    Aggregating,
    Assigning,
    Reducing,
    Converged,
    Capped,
}

/// How a run ended. Both are successful outcomes; the distinction is diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Converged,
    Capped,
}

/// Owns the round counter and the termination decision of one worker.
///
/// Every worker runs its own coordinator. They all reduce the same global flag, so they make
/// the same decision in the same round.
pub struct ConvergenceCoordinator {
    max_iterations: usize,
    iterations: usize,
    rounds: usize,
    state: RunState,
}

impl ConvergenceCoordinator {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            iterations: 0,
            rounds: 0,
            state: RunState::Seeded,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Number of rounds started so far.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    fn transition(&mut self, to: RunState) -> Result<()> {
        let allowed = matches!(
            (self.state, to),
            (RunState::Seeded, RunState::Aggregating)
                | (RunState::Reducing, RunState::Aggregating)
                | (RunState::Aggregating, RunState::Assigning)
                | (RunState::Assigning, RunState::Reducing)
                | (RunState::Reducing, RunState::Converged)
                | (RunState::Reducing, RunState::Capped)
        );
        if !allowed {
            return Err(anyhow!(
                "Invalid round transition {:?} -> {:?}",
                self.state,
                to
            ));
        }
        self.state = to;
        Ok(())
    }

    pub fn begin_round(&mut self) -> Result<()> {
        self.transition(RunState::Aggregating)?;
        self.rounds += 1;
        Ok(())
    }

    pub fn begin_assignment(&mut self) -> Result<()> {
        self.transition(RunState::Assigning)
    }

    /// OR-reduce this worker's flag with every other worker's.
    pub fn reduce<C: Communicator>(&mut self, comm: &C, local_changed: bool) -> Result<bool> {
        self.transition(RunState::Reducing)?;
        let global_changed = comm.reduce_or(local_changed)?;
        debug!(
            "Worker {} round {}: local changed {}, global changed {}",
            comm.rank(),
            self.rounds,
            local_changed,
            global_changed
        );
        Ok(global_changed)
    }

    /// Decide whether to stop after a reduction. Keeps going while something changed and the
    /// iteration counter is below the cap, so at most `max_iterations + 1` rounds run.
    pub fn advance(&mut self, global_changed: bool) -> Result<Option<Termination>> {
        if self.state != RunState::Reducing {
            return Err(anyhow!("Cannot advance from {:?}", self.state));
        }
        if !global_changed {
            self.transition(RunState::Converged)?;
            return Ok(Some(Termination::Converged));
        }
        if self.iterations >= self.max_iterations {
            self.transition(RunState::Capped)?;
            return Ok(Some(Termination::Capped));
        }
        self.iterations += 1;
        Ok(None)
    }
}
