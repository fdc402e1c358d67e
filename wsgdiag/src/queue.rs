//! Receive message queue
//!
//! Fixed-capacity ring of complete lines between the link's poller thread
//! (single producer) and the scheduler (single consumer). Writes never block
//! and never fail: on a full ring the oldest unread line is overwritten.
//!
//! Cursors are kept as running sequence numbers and reduced modulo the
//! capacity only to address a slot, so occupancy is always
//! `write - read` and an empty ring can never be mistaken for a full one.

use std::sync::{Mutex, MutexGuard};

/// Default number of slots.
pub const DEFAULT_CAPACITY: usize = 200;

/// Slots that must remain free before the near-full warning fires.
pub const ALMOST_FULL_MARGIN: usize = 25;

/// Occupancy threshold crossed by an `enqueue`, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Watermark {
    Normal,
    HalfFull,
    AlmostFull,
}

struct Ring {
    slots: Vec<Option<String>>,
    write: u64,
    read: u64,
    overwritten: u64,
}

impl Ring {
    fn count(&self) -> usize {
        (self.write - self.read) as usize
    }

    fn slot(&self, seq: u64) -> usize {
        (seq % self.slots.len() as u64) as usize
    }
}

pub struct MessageQueue {
    ring: Mutex<Ring>,
    capacity: usize,
}

impl MessageQueue {
    /// Returns an empty queue with `capacity` slots. A zero capacity is
    /// bumped to one.
    pub fn new(capacity: usize) -> MessageQueue {
        let capacity = capacity.max(1);
        MessageQueue {
            ring: Mutex::new(Ring {
                slots: vec![None; capacity],
                write: 0,
                read: 0,
                overwritten: 0,
            }),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Ring> {
        // A panic while holding the lock cannot leave the cursors torn,
        // every update below is a plain integer store.
        self.ring.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Appends a line. If the ring is full, the oldest unread line is lost
    /// and both cursors advance.
    pub fn enqueue(&self, line: String) -> Watermark {
        let mut ring = self.lock();
        if ring.count() == self.capacity {
            ring.read += 1;
            ring.overwritten += 1;
        }
        let idx = ring.slot(ring.write);
        ring.slots[idx] = Some(line);
        ring.write += 1;

        let count = ring.count();
        if count > self.capacity.saturating_sub(ALMOST_FULL_MARGIN) {
            Watermark::AlmostFull
        } else if count == self.capacity / 2 {
            Watermark::HalfFull
        } else {
            Watermark::Normal
        }
    }

    /// Removes and returns every pending line, oldest first.
    pub fn dequeue_all(&self) -> Vec<String> {
        let mut ring = self.lock();
        let mut lines = Vec::with_capacity(ring.count());
        while ring.read != ring.write {
            let idx = ring.slot(ring.read);
            if let Some(line) = ring.slots[idx].take() {
                lines.push(line);
            }
            ring.read += 1;
        }
        lines
    }

    /// Number of lines waiting to be drained.
    pub fn count(&self) -> usize {
        self.lock().count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Total lines lost to overwrites since creation.
    pub fn overwritten(&self) -> u64 {
        self.lock().overwritten
    }
}

impl Default for MessageQueue {
    fn default() -> MessageQueue {
        MessageQueue::new(DEFAULT_CAPACITY)
    }
}
