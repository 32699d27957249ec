//! Assembly of shared-point forces across partitions.
//!
//! A point on a partition boundary receives element forces on every
//! worker that holds one of its elements. After the local element pass
//! each worker sends its partial force of every shared point to the
//! other holders and replaces the partial by the full sum, added in
//! ascending rank order so that all holders obtain the same bits.

use num_complex::Complex64;
use ringsem_arena::KinematicState;
use ringsem_core::CommError;
use smallvec::SmallVec;

use crate::comm::{Communicator, Message};

/// Contribution of one holder to a shared point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    /// Our own partial force.
    Local,
    /// Offset into the buffer received on the link to `link`.
    Remote { link: usize, offset: usize },
}

#[derive(Clone, Debug, PartialEq)]
struct SharedPoint {
    local: u32,
    /// Holders in ascending rank order.
    holders: SmallVec<[Slot; 4]>,
}

/// Points shared with one peer, in ascending global id order.
#[derive(Clone, Debug, PartialEq)]
struct ExchangeLink {
    peer: usize,
    points: Vec<u32>,
    buffer: Vec<Complex64>,
}

/// The boundary exchange of one point kind on one worker.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExchangePlan {
    links: Vec<ExchangeLink>,
    shared: Vec<SharedPoint>,
}

impl ExchangePlan {
    /// A plan with nothing to exchange.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the plan for this worker.
    ///
    /// `shared` lists, for every local point held by other workers too,
    /// its local index, its global id and the ranks of all holders
    /// (including `rank`). Both sides of a link must list the same
    /// global ids. `coeffs(local)` is the number of coefficients the
    /// point stores.
    pub fn new(
        rank: usize,
        shared: &[(u32, u32, Vec<usize>)],
        coeffs: impl Fn(u32) -> usize,
    ) -> Self {
        let mut entries: Vec<&(u32, u32, Vec<usize>)> = shared.iter().collect();
        entries.sort_by_key(|(_, global, _)| *global);

        let mut peers: Vec<usize> = entries
            .iter()
            .flat_map(|(_, _, holders)| holders.iter().copied())
            .filter(|&r| r != rank)
            .collect();
        peers.sort_unstable();
        peers.dedup();

        let mut links: Vec<ExchangeLink> = peers
            .iter()
            .map(|&peer| ExchangeLink {
                peer,
                points: Vec::new(),
                buffer: Vec::new(),
            })
            .collect();

        let mut points = Vec::with_capacity(entries.len());
        for (local, _, holders) in entries {
            let mut ranks = holders.clone();
            ranks.sort_unstable();
            ranks.dedup();
            let mut slots = SmallVec::new();
            for r in ranks {
                if r == rank {
                    slots.push(Slot::Local);
                    continue;
                }
                // `peers` is sorted and contains every remote holder.
                let Ok(link) = peers.binary_search(&r) else {
                    continue;
                };
                let offset = links[link].buffer.len();
                links[link].points.push(*local);
                links[link]
                    .buffer
                    .resize(offset + coeffs(*local), Complex64::new(0.0, 0.0));
                slots.push(Slot::Remote { link, offset });
            }
            points.push(SharedPoint {
                local: *local,
                holders: slots,
            });
        }
        Self {
            links,
            shared: points,
        }
    }

    /// Whether no point is shared.
    pub fn is_empty(&self) -> bool {
        self.shared.is_empty()
    }

    /// Number of shared points.
    pub fn shared_points(&self) -> usize {
        self.shared.len()
    }

    /// Ranks this worker exchanges with.
    pub fn peers(&self) -> impl Iterator<Item = usize> + '_ {
        self.links.iter().map(|l| l.peer)
    }

    /// Memory held by the link buffers in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.links
            .iter()
            .map(|l| l.buffer.capacity() * std::mem::size_of::<Complex64>() + l.points.len() * 4)
            .sum()
    }

    /// Replace the partial force of every shared point by its sum over
    /// all holders.
    pub fn assemble(
        &mut self,
        comm: &Communicator,
        state: &mut KinematicState,
    ) -> Result<(), CommError> {
        if self.links.is_empty() {
            return Ok(());
        }
        let (layout, _, force) = state.stiffness_view();
        for link in &mut self.links {
            let mut at = 0;
            for &p in &link.points {
                let range = layout.range(p as usize);
                let n = range.len();
                link.buffer[at..at + n].copy_from_slice(&force[range]);
                at += n;
            }
            comm.send(link.peer, Message::Buffer(std::mem::take(&mut link.buffer)))?;
        }
        for link in &mut self.links {
            let len = link.points.iter().map(|&p| layout.range(p as usize).len()).sum();
            link.buffer = comm.recv_buffer(link.peer, len)?;
        }

        let zero = Complex64::new(0.0, 0.0);
        for point in &self.shared {
            let range = layout.range(point.local as usize);
            let base = range.start;
            for i in 0..range.len() {
                let mut acc = zero;
                for slot in &point.holders {
                    acc += match *slot {
                        Slot::Local => force[base + i],
                        Slot::Remote { link, offset } => self.links[link].buffer[offset + i],
                    };
                }
                force[base + i] = acc;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringsem_arena::FieldLayout;
    use std::thread;

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    #[test]
    fn empty_plan_is_a_no_op() {
        let mut plan = ExchangePlan::empty();
        let mut state = KinematicState::new(FieldLayout::new(1, vec![1]));
        state.force[0] = c(2.0);
        plan.assemble(&Communicator::solo(), &mut state).unwrap();
        assert_eq!(state.force[0], c(2.0));
    }

    #[test]
    fn three_workers_agree_bit_for_bit() {
        // Global point 7 is held by all three workers, point 3 by 0 and 1.
        let comms = Communicator::mesh(3);
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| {
                thread::spawn(move || {
                    let rank = comm.rank();
                    let layout = FieldLayout::new(3, vec![2, 2]);
                    let mut state = KinematicState::new(layout);
                    let mut shared = vec![(0u32, 7u32, vec![0, 1, 2])];
                    if rank < 2 {
                        shared.push((1, 3, vec![0, 1]));
                    }
                    let mut plan = ExchangePlan::new(rank, &shared, |_| 6);
                    for (i, f) in state.force.iter_mut().enumerate() {
                        *f = Complex64::new(0.1 * (rank + 1) as f64 + i as f64 * 1e-3, 0.3);
                    }
                    plan.assemble(&comm, &mut state).unwrap();
                    (rank, state.force)
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let p7: Vec<_> = results.iter().map(|(_, f)| f[0..6].to_vec()).collect();
        assert_eq!(p7[0], p7[1]);
        assert_eq!(p7[1], p7[2]);
        assert!((p7[0][0].re - 0.6).abs() < 1e-15);
        assert!((p7[0][0].im - 0.9).abs() < 1e-15);

        let p3: Vec<_> = results
            .iter()
            .filter(|(r, _)| *r < 2)
            .map(|(_, f)| f[6..12].to_vec())
            .collect();
        assert_eq!(p3[0], p3[1]);
        // Worker 2 does not hold point 3; its value is untouched.
        assert_eq!(results[2].1[6].re, 0.1 * 3.0 + 6.0 * 1e-3);
    }

    #[test]
    fn repeated_exchange_reuses_buffers() {
        let comms = Communicator::mesh(2);
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| {
                thread::spawn(move || {
                    let rank = comm.rank();
                    let mut state = KinematicState::new(FieldLayout::new(1, vec![3]));
                    let mut plan = ExchangePlan::new(rank, &[(0, 0, vec![0, 1])], |_| 3);
                    let before = plan.memory_bytes();
                    for _ in 0..50 {
                        state.force.fill(c(1.0));
                        plan.assemble(&comm, &mut state).unwrap();
                    }
                    assert_eq!(plan.memory_bytes(), before);
                    state.force
                })
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap().iter().all(|f| *f == c(2.0)));
        }
    }
}
