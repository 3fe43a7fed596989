//! Rolling sample buffer shared between the sampling task and readers.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::utils::CachePadded;
use ringbuf::traits::{Consumer, Observer, RingBuffer};
use ringbuf::HeapRb;

/// Fixed-capacity rolling window of raw sample bytes.
///
/// The sampling task is the only writer. Writes past capacity overwrite the
/// oldest bytes, so occupancy never exceeds the declared capacity.
pub struct AudioRing {
    ring: HeapRb<u8>,

    /// Set once the first nonempty write cycle lands.
    ready: bool,

    stats: CachePadded<RingStats>,
}

#[derive(Default)]
struct RingStats {
    bytes_written: AtomicU64,
    bytes_overwritten: AtomicU64,
}

impl AudioRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: HeapRb::new(capacity),
            ready: false,
            stats: CachePadded::new(RingStats::default()),
        }
    }

    /// Append sample bytes, overwriting the oldest on overflow.
    pub fn push(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }

        let overwritten = data.len().saturating_sub(self.ring.vacant_len());
        self.ring.push_slice_overwrite(data);

        self.stats
            .bytes_written
            .fetch_add(data.len() as u64, Ordering::Relaxed);
        if overwritten > 0 {
            self.stats
                .bytes_overwritten
                .fetch_add(overwritten as u64, Ordering::Relaxed);
        }
        self.ready = true;
    }

    /// Copy of the current window, oldest byte first.
    pub fn snapshot(&self) -> Vec<u8> {
        let (head, tail) = self.ring.as_slices();
        let mut out = Vec::with_capacity(head.len() + tail.len());
        out.extend_from_slice(head);
        out.extend_from_slice(tail);
        out
    }

    pub fn len(&self) -> usize {
        self.ring.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn free(&self) -> usize {
        self.ring.vacant_len()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity().get()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn stats(&self) -> (u64, u64) {
        (
            self.stats.bytes_written.load(Ordering::Relaxed),
            self.stats.bytes_overwritten.load(Ordering::Relaxed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occupancy_never_exceeds_capacity() {
        let mut ring = AudioRing::new(64);

        for burst in [10usize, 64, 100, 3, 500] {
            let data = vec![0xA5u8; burst];
            ring.push(&data);
            assert!(ring.len() <= ring.capacity());
        }
        assert_eq!(ring.len(), ring.capacity());
    }

    #[test]
    fn overflow_keeps_newest_bytes() {
        let mut ring = AudioRing::new(4);
        ring.push(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(ring.snapshot(), vec![3, 4, 5, 6]);

        let (written, overwritten) = ring.stats();
        assert_eq!(written, 6);
        assert_eq!(overwritten, 2);
    }

    #[test]
    fn ready_flag_flips_on_first_write() {
        let mut ring = AudioRing::new(8);
        assert!(!ring.is_ready());

        ring.push(&[]);
        assert!(!ring.is_ready());

        ring.push(&[1]);
        assert!(ring.is_ready());
    }
}
