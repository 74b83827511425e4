use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

use crate::{Error, Result, Tour};

/// A batch of migrating tours tagged with its destination.
#[derive(Debug)]
pub struct Envelope {
    pub source_node: usize,
    pub dest_node: usize,
    pub dest_worker: usize,
    pub round: usize,
    pub tours: Vec<Tour>,
}

/// In-process stand-in for the cluster transport: one mailbox per node.
///
/// Delivery is unbounded and FIFO per sender, so a fast node never blocks on a
/// slow neighbour; only the receiving side waits.
#[derive(Debug)]
pub struct MigrationBus {
    senders: Vec<Sender<Envelope>>,
    receivers: Vec<Receiver<Envelope>>,
}

impl MigrationBus {
    pub fn new(nodes: usize) -> Self {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..nodes).map(|_| unbounded()).unzip();
        Self { senders, receivers }
    }

    pub fn nodes(&self) -> usize {
        self.senders.len()
    }

    pub fn send(&self, envelope: Envelope) -> Result<()> {
        let dest = envelope.dest_node;
        let sender = self.senders.get(dest).ok_or_else(|| {
            Error::migration(format!(
                "no mailbox for node {dest} (bus has {})",
                self.nodes()
            ))
        })?;
        sender
            .send(envelope)
            .map_err(|_| Error::migration(format!("mailbox for node {dest} is closed")))
    }

    /// Waits up to `timeout` for the next envelope tagged `(node, worker)`.
    ///
    /// Envelopes tagged for another worker of the node are dropped. `None`
    /// means nothing matching arrived in time.
    pub fn take(&self, node: usize, worker: usize, timeout: Duration) -> Option<Envelope> {
        let receiver = self.receivers.get(node)?;
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match receiver.recv_timeout(remaining) {
                Ok(envelope) if envelope.dest_worker == worker => return Some(envelope),
                Ok(envelope) => {
                    log::warn!(
                        "transport.take: dropped envelope node={node} worker={} expected_worker={worker} from={}",
                        envelope.dest_worker,
                        envelope.source_node
                    );
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None;
                }
            }
        }
    }
}
