use anyhow::{anyhow, Result};
use crossbeam::channel::{unbounded, Receiver, Sender};

use super::{Communicator, Message, PeerDisconnected};

/// Builds a group of in-process workers connected by a full mesh of channels.
///
/// There is one unbounded channel per ordered (source, dest) pair, so sends never block and
/// messages from one source are received in order. Each [`LocalCommunicator`] is meant to be
/// moved into its own thread. Dropping it disconnects every channel it sends on. A peer
/// blocked on `receive` from it then gets an error instead of hanging.
pub struct LocalCluster {}

impl LocalCluster {
    pub fn create(size: usize) -> Result<Vec<LocalCommunicator>> {
        if size == 0 {
            return Err(anyhow!("A worker group needs at least one worker"));
        }

        // channels[source][dest]
        let channels: Vec<Vec<(Sender<Message>, Receiver<Message>)>> = (0..size)
            .map(|_| (0..size).map(|_| unbounded()).collect())
            .collect();

        let communicators = (0..size)
            .map(|rank| LocalCommunicator {
                rank,
                size,
                senders: (0..size).map(|dest| channels[rank][dest].0.clone()).collect(),
                receivers: (0..size)
                    .map(|source| channels[source][rank].1.clone())
                    .collect(),
            })
            .collect();
        Ok(communicators)
    }
}

pub struct LocalCommunicator {
    rank: usize,
    size: usize,
    // Indexed by destination rank.
    senders: Vec<Sender<Message>>,
    // Indexed by source rank.
    receivers: Vec<Receiver<Message>>,
}

impl Communicator for LocalCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&self, dest: usize, message: Message) -> Result<()> {
        let sender = self
            .senders
            .get(dest)
            .ok_or_else(|| anyhow!("Worker {} does not exist (group size {})", dest, self.size))?;
        let kind = message.kind();
        sender.send(message).map_err(|_| {
            anyhow::Error::new(PeerDisconnected {
                rank: self.rank,
                peer: dest,
            })
            .context(format!("Failed to send {} to worker {}", kind, dest))
        })
    }

    fn receive(&self, source: usize) -> Result<Message> {
        let receiver = self.receivers.get(source).ok_or_else(|| {
            anyhow!("Worker {} does not exist (group size {})", source, self.size)
        })?;
        receiver.recv().map_err(|_| {
            PeerDisconnected {
                rank: self.rank,
                peer: source,
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::comm::COORDINATOR_RANK;
    use crate::model::{FeatureVector, Record};

    fn records(values: &[f64]) -> Vec<Record> {
        values
            .iter()
            .map(|&v| Record::new(FeatureVector::new(vec![v])))
            .collect()
    }

    /// Run `f` on every worker of a fresh group and collect the results by rank.
    fn run_group<T, F>(size: usize, f: F) -> Vec<Result<T>>
    where
        T: Send,
        F: Fn(LocalCommunicator) -> Result<T> + Sync,
    {
        let communicators = LocalCluster::create(size).unwrap();
        thread::scope(|s| {
            let handles: Vec<_> = communicators
                .into_iter()
                .map(|comm| s.spawn(|| f(comm)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        })
    }

    #[test]
    fn test_create_group() {
        assert!(LocalCluster::create(0).is_err());
        let group = LocalCluster::create(3).unwrap();
        assert_eq!(group.len(), 3);
        for (rank, comm) in group.iter().enumerate() {
            assert_eq!(comm.rank(), rank);
            assert_eq!(comm.size(), 3);
            assert_eq!(comm.is_coordinator(), rank == COORDINATOR_RANK);
        }
    }

    #[test]
    fn test_point_to_point_is_fifo() {
        let group = LocalCluster::create(2).unwrap();
        group[1].send(0, Message::Flag(true)).unwrap();
        group[1].send(0, Message::Flag(false)).unwrap();
        assert!(matches!(group[0].receive(1).unwrap(), Message::Flag(true)));
        assert!(matches!(group[0].receive(1).unwrap(), Message::Flag(false)));
        assert!(group[0].send(5, Message::Flag(true)).is_err());
    }

    #[test]
    fn test_broadcast() {
        let results = run_group(4, |comm| {
            let value = if comm.is_coordinator() { Some(true) } else { None };
            comm.broadcast(value)
        });
        assert!(results.into_iter().all(|r| r.unwrap()));
    }

    #[test]
    fn test_broadcast_without_value_fails_on_coordinator() {
        let group = LocalCluster::create(1).unwrap();
        assert!(group[0].broadcast::<bool>(None).is_err());
    }

    #[test]
    fn test_scatter_gather() {
        let results = run_group(3, |comm| {
            let chunks = if comm.is_coordinator() {
                Some(vec![records(&[0.0, 1.0]), records(&[2.0]), records(&[])])
            } else {
                None
            };
            let local = comm.scatter(chunks)?;
            let local_len = local.len();
            let gathered = comm.gather(local)?;
            Ok((local_len, gathered))
        });

        let results: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(results[0].0, 2);
        assert_eq!(results[1].0, 1);
        assert_eq!(results[2].0, 0);
        assert!(results[1].1.is_none());
        assert!(results[2].1.is_none());
        let gathered = results[0].1.clone().unwrap();
        assert_eq!(
            gathered,
            vec![records(&[0.0, 1.0]), records(&[2.0]), records(&[])]
        );
    }

    #[test]
    fn test_reduce_or() {
        // Only the last worker reports a change; everyone must see it.
        let results = run_group(4, |comm| comm.reduce_or(comm.rank() == 3));
        assert!(results.into_iter().all(|r| r.unwrap()));

        let results = run_group(4, |comm| comm.reduce_or(false));
        assert!(results.into_iter().all(|r| !r.unwrap()));

        let results = run_group(1, |comm| comm.reduce_or(true));
        assert!(results.into_iter().all(|r| r.unwrap()));
    }

    #[test]
    fn test_disconnected_peer_is_an_error() {
        let mut group = LocalCluster::create(2).unwrap();
        let worker = group.pop().unwrap();
        drop(worker);
        let coordinator = group.pop().unwrap();
        let err = coordinator.receive(1).err().unwrap();
        assert_eq!(
            err.downcast_ref::<PeerDisconnected>(),
            Some(&PeerDisconnected { rank: 0, peer: 1 })
        );
        let err = coordinator.send(1, Message::Flag(true)).err().unwrap();
        assert!(err.downcast_ref::<PeerDisconnected>().is_some());
    }
}
