//! Message passing between partition workers.
//!
//! Every pair of workers is joined by two bounded channels, one per
//! direction. All workers issue the same sequence of collective calls,
//! so each directed link carries at most one message in flight and a
//! worker can always send to every peer before receiving from any.
//! A worker that aborts drops its endpoints; the next operation of a
//! peer that touches the link fails with [`CommError::PeerAborted`].

use crossbeam_channel::{Receiver, Sender};
use num_complex::Complex64;
use ringsem_core::CommError;

/// Payload of one point-to-point message.
#[derive(Debug)]
pub enum Message {
    /// One value of a collective reduction.
    Scalar(f64),
    /// Boundary contributions. The vector travels back and forth
    /// between the two workers so no step allocates.
    Buffer(Vec<Complex64>),
}

impl Message {
    fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Buffer(_) => "buffer",
        }
    }
}

struct Link {
    tx: Sender<Message>,
    rx: Receiver<Message>,
}

/// One worker's endpoints of the fully connected worker topology.
pub struct Communicator {
    rank: usize,
    size: usize,
    /// Indexed by peer rank; `None` at our own rank.
    links: Vec<Option<Link>>,
}

impl std::fmt::Debug for Communicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Communicator")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .finish()
    }
}

impl Communicator {
    /// A single worker with no peers.
    pub fn solo() -> Self {
        Self {
            rank: 0,
            size: 1,
            links: vec![None],
        }
    }

    /// Endpoints for `size` workers, returned in rank order.
    pub fn mesh(size: usize) -> Vec<Self> {
        let size = size.max(1);
        let mut comms: Vec<Self> = (0..size)
            .map(|rank| Self {
                rank,
                size,
                links: (0..size).map(|_| None).collect(),
            })
            .collect();
        for a in 0..size {
            for b in (a + 1)..size {
                let (tx_ab, rx_ab) = crossbeam_channel::bounded(1);
                let (tx_ba, rx_ba) = crossbeam_channel::bounded(1);
                comms[a].links[b] = Some(Link {
                    tx: tx_ab,
                    rx: rx_ba,
                });
                comms[b].links[a] = Some(Link {
                    tx: tx_ba,
                    rx: rx_ab,
                });
            }
        }
        comms
    }

    /// This worker's rank.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of workers.
    pub fn size(&self) -> usize {
        self.size
    }

    fn link(&self, peer: usize) -> Result<&Link, CommError> {
        self.links
            .get(peer)
            .and_then(Option::as_ref)
            .ok_or_else(|| CommError::ProtocolViolation {
                rank: peer,
                reason: format!("worker {} has no link to {peer}", self.rank),
            })
    }

    /// Send `msg` to `peer`, blocking while the previous message on the
    /// link is unread.
    pub fn send(&self, peer: usize, msg: Message) -> Result<(), CommError> {
        self.link(peer)?
            .tx
            .send(msg)
            .map_err(|_| CommError::PeerAborted { rank: peer })
    }

    /// Receive the next message from `peer`.
    pub fn recv(&self, peer: usize) -> Result<Message, CommError> {
        self.link(peer)?
            .rx
            .recv()
            .map_err(|_| CommError::PeerAborted { rank: peer })
    }

    /// Receive a buffer from `peer`, checking its length.
    pub fn recv_buffer(&self, peer: usize, len: usize) -> Result<Vec<Complex64>, CommError> {
        match self.recv(peer)? {
            Message::Buffer(buf) if buf.len() == len => Ok(buf),
            Message::Buffer(buf) => Err(CommError::ProtocolViolation {
                rank: peer,
                reason: format!("expected {len} coefficients, got {}", buf.len()),
            }),
            other => Err(CommError::ProtocolViolation {
                rank: peer,
                reason: format!("expected a buffer, got a {}", other.kind()),
            }),
        }
    }

    fn all_reduce(&self, value: f64, op: fn(f64, f64) -> f64) -> Result<f64, CommError> {
        for peer in self.peers() {
            self.send(peer, Message::Scalar(value))?;
        }
        // Fold in rank order so every worker computes the same result.
        let mut acc: Option<f64> = None;
        for rank in 0..self.size {
            let v = if rank == self.rank {
                value
            } else {
                match self.recv(rank)? {
                    Message::Scalar(v) => v,
                    other => {
                        return Err(CommError::ProtocolViolation {
                            rank,
                            reason: format!("expected a scalar, got a {}", other.kind()),
                        })
                    }
                }
            };
            acc = Some(acc.map_or(v, |a| op(a, v)));
        }
        Ok(acc.unwrap_or(value))
    }

    /// Global maximum. NaN propagates.
    pub fn all_reduce_max(&self, value: f64) -> Result<f64, CommError> {
        self.all_reduce(value, |a, b| if a.is_nan() || a > b { a } else { b })
    }

    /// Global minimum. NaN propagates.
    pub fn all_reduce_min(&self, value: f64) -> Result<f64, CommError> {
        self.all_reduce(value, |a, b| if a.is_nan() || a < b { a } else { b })
    }

    /// Block until every worker has arrived.
    pub fn barrier(&self) -> Result<(), CommError> {
        self.all_reduce(0.0, f64::max).map(|_| ())
    }

    fn peers(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.size).filter(move |&r| r != self.rank)
    }
}
