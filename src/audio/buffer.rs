//! Audio frame buffers
//!
//! An SPSC ring buffer carries captured frames from the cpal callback to
//! the encode worker, and a sequence-indexed jitter buffer reorders
//! decoded frames on the playout side.

use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One frame of mono f32 samples
#[derive(Clone)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    /// RTP sequence number on the receive side, a running counter on
    /// the capture side
    pub sequence: u16,
}

impl AudioFrame {
    pub fn new(samples: Vec<f32>, sequence: u16) -> Self {
        Self { samples, sequence }
    }
}

/// Lock-free ring buffer for audio frames
pub struct RingBuffer {
    queue: ArrayQueue<AudioFrame>,
    overflow_count: AtomicUsize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
            overflow_count: AtomicUsize::new(0),
        }
    }

    /// Push a frame; returns false on overflow.
    pub fn push(&self, frame: AudioFrame) -> bool {
        match self.queue.push(frame) {
            Ok(()) => true,
            Err(_) => {
                self.overflow_count.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn try_pop(&self) -> Option<AudioFrame> {
        self.queue.pop()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn overflow_count(&self) -> usize {
        self.overflow_count.load(Ordering::Relaxed)
    }
}

/// Thread-safe handle to a ring buffer
pub type SharedRingBuffer = Arc<RingBuffer>;

pub fn create_shared_buffer(capacity: usize) -> SharedRingBuffer {
    Arc::new(RingBuffer::new(capacity))
}

/// Jitter buffer reordering frames by RTP sequence number
///
/// Slots are indexed by sequence modulo capacity; u16 wrap-around is
/// handled by signed distance comparison.
pub struct JitterBuffer {
    slots: Vec<Option<AudioFrame>>,
    /// Must be a power of 2
    capacity: usize,
    mask: usize,
    /// Next sequence to play out; taken from the first inserted frame
    next_sequence: Option<u16>,
    /// Set once the first frame has been consumed; until then an
    /// earlier arrival may still move the base back
    started: bool,
    /// Frames that must accumulate before playout starts
    min_delay: usize,
    level: usize,
    received: usize,
    lost: usize,
    late: usize,
}

impl JitterBuffer {
    pub fn new(capacity: usize, min_delay: usize) -> Self {
        assert!(capacity.is_power_of_two(), "capacity must be power of 2");
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);

        Self {
            slots,
            capacity,
            mask: capacity - 1,
            next_sequence: None,
            started: false,
            min_delay,
            level: 0,
            received: 0,
            lost: 0,
            late: 0,
        }
    }

    /// Insert a frame; returns false if it arrived too late to play.
    pub fn insert(&mut self, frame: AudioFrame) -> bool {
        let seq = frame.sequence;
        let next = *self.next_sequence.get_or_insert(seq);

        // Signed distance handles wrap-around at 65535
        let distance = seq.wrapping_sub(next) as i16;
        if distance < 0 {
            if self.started {
                self.late += 1;
                return false;
            }
            // Playout has not begun; an earlier frame moves the base back
            self.next_sequence = Some(seq);
        } else if distance as usize >= self.capacity {
            // Too far ahead, resync to the new position
            self.reset();
            self.next_sequence = Some(seq);
        }

        let index = (seq as usize) & self.mask;
        if self.slots[index].is_none() {
            self.level += 1;
        }
        self.slots[index] = Some(frame);
        self.received += 1;
        true
    }

    /// Next in-order frame, or None while the buffer is still filling
    /// or the expected frame was lost.
    pub fn get_next(&mut self) -> Option<AudioFrame> {
        let next = self.next_sequence?;
        if self.level < self.min_delay {
            return None;
        }

        let index = (next as usize) & self.mask;
        let frame = self.slots[index].take();

        if frame.is_some() {
            self.level -= 1;
        } else {
            self.lost += 1;
        }

        self.started = true;
        self.next_sequence = Some(next.wrapping_add(1));
        frame
    }

    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.next_sequence = None;
        self.started = false;
        self.level = 0;
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn stats(&self) -> JitterStats {
        JitterStats {
            received: self.received,
            lost: self.lost,
            late: self.late,
        }
    }
}

/// Jitter buffer counters
#[derive(Debug, Clone, Copy)]
pub struct JitterStats {
    pub received: usize,
    pub lost: usize,
    pub late: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_basic() {
        let buffer = RingBuffer::new(4);

        assert!(buffer.push(AudioFrame::new(vec![0.0; 480], 0)));
        assert!(buffer.push(AudioFrame::new(vec![1.0; 480], 1)));
        assert_eq!(buffer.len(), 2);

        assert_eq!(buffer.try_pop().unwrap().sequence, 0);
        assert_eq!(buffer.try_pop().unwrap().sequence, 1);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_ring_buffer_overflow() {
        let buffer = RingBuffer::new(2);
        assert!(buffer.push(AudioFrame::new(vec![], 0)));
        assert!(buffer.push(AudioFrame::new(vec![], 1)));
        assert!(!buffer.push(AudioFrame::new(vec![], 2)));
        assert_eq!(buffer.overflow_count(), 1);
    }

    #[test]
    fn test_jitter_reorders() {
        let mut jitter = JitterBuffer::new(16, 2);

        jitter.insert(AudioFrame::new(vec![], 102));
        jitter.insert(AudioFrame::new(vec![], 100));
        jitter.insert(AudioFrame::new(vec![], 101));

        assert_eq!(jitter.get_next().unwrap().sequence, 100);
        assert_eq!(jitter.get_next().unwrap().sequence, 101);
        // Level dropped below min_delay
        assert!(jitter.get_next().is_none());
    }

    #[test]
    fn test_jitter_late_packet_dropped() {
        let mut jitter = JitterBuffer::new(16, 0);

        jitter.insert(AudioFrame::new(vec![], 10));
        assert_eq!(jitter.get_next().unwrap().sequence, 10);

        assert!(!jitter.insert(AudioFrame::new(vec![], 9)));
        assert_eq!(jitter.stats().late, 1);
    }

    #[test]
    fn test_jitter_sequence_wrap() {
        let mut jitter = JitterBuffer::new(16, 0);

        jitter.insert(AudioFrame::new(vec![], 65535));
        jitter.insert(AudioFrame::new(vec![], 0));

        assert_eq!(jitter.get_next().unwrap().sequence, 65535);
        assert_eq!(jitter.get_next().unwrap().sequence, 0);
    }

    #[test]
    fn test_jitter_loss_counted() {
        let mut jitter = JitterBuffer::new(16, 0);

        jitter.insert(AudioFrame::new(vec![], 0));
        jitter.insert(AudioFrame::new(vec![], 2));

        assert_eq!(jitter.get_next().unwrap().sequence, 0);
        assert!(jitter.get_next().is_none()); // seq 1 lost
        assert_eq!(jitter.get_next().unwrap().sequence, 2);
        assert_eq!(jitter.stats().lost, 1);
    }
}
