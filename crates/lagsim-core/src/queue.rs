//! Delay queue.
//!
//! One queue exists per (direction, channel class). Packets leave from the
//! front in queue order, and draining stops at the first packet that is not
//! yet due. A later packet with an earlier release time therefore waits for
//! the head, which preserves every ordering the policy did not perturb.
//!
//! ## States
//!
//! `Empty → Holding(n ≥ 1) → Empty`. Pushes never fail and the queue is
//! never capped; [`DelayQueue::len`] is the observability hook for runaway
//! buffering.

use std::collections::VecDeque;

use crate::packet::Packet;

/// FIFO of pending packets with a single-slot reorder insert.
#[derive(Debug, Clone)]
pub struct DelayQueue<I> {
    packets: VecDeque<Packet<I>>,
}

impl<I> Default for DelayQueue<I> {
    fn default() -> Self {
        Self { packets: VecDeque::new() }
    }
}

impl<I: Copy + Ord> DelayQueue<I> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending packets.
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// Whether the queue holds no packets.
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Release time of the head packet, if any.
    pub fn next_release(&self) -> Option<I> {
        self.packets.front().map(|p| p.release_at)
    }

    /// Append in arrival order.
    pub fn push(&mut self, packet: Packet<I>) {
        self.packets.push_back(packet);
    }

    /// Insert immediately before the current last packet, so `packet`
    /// overtakes exactly one predecessor. Appends when the queue is empty.
    pub fn insert_before_last(&mut self, packet: Packet<I>) {
        let index = self.packets.len().saturating_sub(1);
        self.packets.insert(index, packet);
    }

    /// Pop the head packet if it is due at `now`.
    pub fn pop_due(&mut self, now: I) -> Option<Packet<I>> {
        if self.packets.front()?.is_due(now) { self.packets.pop_front() } else { None }
    }

    /// Discard every pending packet, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let discarded = self.packets.len();
        self.packets.clear();
        discarded
    }

    /// Pending packets in queue order.
    pub fn iter(&self) -> impl Iterator<Item = &Packet<I>> {
        self.packets.iter()
    }
}
