pub mod local;

use std::fmt;

use anyhow::{anyhow, Result};

use crate::aggregation::PartialStats;
use crate::model::{Centroids, Record};
use crate::partition::PartitionPlan;

/// Rank of the worker that owns external I/O, reduces partial statistics and roots every
/// collective.
pub const COORDINATOR_RANK: usize = 0;

/// A transfer failed because the peer dropped its end of the channel. This is normally a
/// consequence of the peer failing, not a cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerDisconnected {
    pub rank: usize,
    pub peer: usize,
}

impl fmt::Display for PeerDisconnected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Worker {} lost worker {}: peer disconnected",
            self.rank, self.peer
        )
    }
}

impl std::error::Error for PeerDisconnected {}

/// Everything that travels between workers. Values are moved or cloned, never shared.
#[derive(Debug, Clone)]
pub enum Message {
    Plan(PartitionPlan),
    Records(Vec<Record>),
    Centroids(Centroids),
    Partial(PartialStats),
    Flag(bool),
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Plan(_) => "plan",
            Message::Records(_) => "records",
            Message::Centroids(_) => "centroids",
            Message::Partial(_) => "partial",
            Message::Flag(_) => "flag",
        }
    }
}

/// A value that can be carried by a [`Message`].
pub trait Payload: Clone + Sized {
    const KIND: &'static str;

    fn into_message(self) -> Message;

    fn from_message(message: Message) -> Result<Self>;
}

macro_rules! impl_payload {
    ($ty:ty, $variant:ident, $kind:literal) => {
        impl Payload for $ty {
            const KIND: &'static str = $kind;

            fn into_message(self) -> Message {
                Message::$variant(self)
            }

            fn from_message(message: Message) -> Result<Self> {
                match message {
                    Message::$variant(value) => Ok(value),
                    other => Err(anyhow!(
                        "Protocol error: expected {} message, got {}",
                        Self::KIND,
                        other.kind()
                    )),
                }
            }
        }
    };
}

impl_payload!(PartitionPlan, Plan, "plan");
impl_payload!(Vec<Record>, Records, "records");
impl_payload!(Centroids, Centroids, "centroids");
impl_payload!(PartialStats, Partial, "partial");
impl_payload!(bool, Flag, "flag");

/// The worker channel: point-to-point transfer plus the collectives built on top of it.
///
/// `send` must not block. `receive` blocks until a message from `source` arrives, and
/// messages from one source arrive in the order they were sent. Every collective has to be
/// entered by all workers in the same order. That makes each one an implicit barrier.
pub trait Communicator {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    fn send(&self, dest: usize, message: Message) -> Result<()>;

    fn receive(&self, source: usize) -> Result<Message>;

    fn is_coordinator(&self) -> bool {
        self.rank() == COORDINATOR_RANK
    }

    fn send_payload<T: Payload>(&self, dest: usize, value: T) -> Result<()> {
        self.send(dest, value.into_message())
    }

    fn receive_payload<T: Payload>(&self, source: usize) -> Result<T> {
        T::from_message(self.receive(source)?)
    }

    /// The coordinator supplies `value`; every worker returns its own copy of it.
    fn broadcast<T: Payload>(&self, value: Option<T>) -> Result<T> {
        if !self.is_coordinator() {
            return self.receive_payload(COORDINATOR_RANK);
        }
        let value =
            value.ok_or_else(|| anyhow!("Coordinator must supply the {} to broadcast", T::KIND))?;
        for dest in 0..self.size() {
            if dest != COORDINATOR_RANK {
                self.send_payload(dest, value.clone())?;
            }
        }
        Ok(value)
    }

    /// The coordinator supplies one chunk per rank; every worker returns its own chunk.
    fn scatter(&self, chunks: Option<Vec<Vec<Record>>>) -> Result<Vec<Record>> {
        if !self.is_coordinator() {
            return self.receive_payload(COORDINATOR_RANK);
        }
        let chunks = chunks.ok_or_else(|| anyhow!("Coordinator must supply chunks to scatter"))?;
        if chunks.len() != self.size() {
            return Err(anyhow!(
                "Cannot scatter {} chunks across {} workers",
                chunks.len(),
                self.size()
            ));
        }
        let mut own = vec![];
        for (dest, chunk) in chunks.into_iter().enumerate() {
            if dest == COORDINATOR_RANK {
                own = chunk;
            } else {
                self.send_payload(dest, chunk)?;
            }
        }
        Ok(own)
    }

    /// Every worker hands in its chunk; the coordinator gets all of them indexed by rank.
    fn gather(&self, local: Vec<Record>) -> Result<Option<Vec<Vec<Record>>>> {
        if !self.is_coordinator() {
            self.send_payload(COORDINATOR_RANK, local)?;
            return Ok(None);
        }
        let mut chunks = Vec::with_capacity(self.size());
        chunks.push(local);
        for source in 1..self.size() {
            chunks.push(self.receive_payload(source)?);
        }
        Ok(Some(chunks))
    }

    fn send_partial(&self, stats: PartialStats) -> Result<()> {
        self.send_payload(COORDINATOR_RANK, stats)
    }

    fn receive_partial(&self, source: usize) -> Result<PartialStats> {
        self.receive_payload(source)
    }

    /// Logical OR of every worker's flag, returned to every worker.
    fn reduce_or(&self, flag: bool) -> Result<bool> {
        if !self.is_coordinator() {
            self.send_payload(COORDINATOR_RANK, flag)?;
            return self.broadcast(None);
        }
        let mut global = flag;
        for source in 1..self.size() {
            // Drain every flag, even once the result is known.
            let remote: bool = self.receive_payload(source)?;
            global = global || remote;
        }
        self.broadcast(Some(global))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FeatureVector;

    #[test]
    fn test_payload_kind_mismatch() {
        let message = true.into_message();
        assert_eq!(message.kind(), "flag");
        assert!(bool::from_message(message.clone()).unwrap());
        assert!(Centroids::from_message(message).is_err());

        let records = vec![Record::new(FeatureVector::new(vec![1.0]))];
        let message = records.clone().into_message();
        assert_eq!(Vec::<Record>::from_message(message).unwrap(), records);
    }
}
