//! Bounded byte history for link diagnostics.

use std::collections::VecDeque;

use crate::protocol::constants::TRACE_CAPACITY;

/// Fixed-capacity byte history, most recent first.
///
/// Appending to a full buffer evicts the oldest byte.
#[derive(Debug, Clone)]
pub struct TraceBuffer {
    bytes: VecDeque<u8>,
    capacity: usize,
}

impl TraceBuffer {
    pub fn new() -> Self {
        Self::with_capacity(TRACE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record `byte` as the most recent entry.
    pub fn append(&mut self, byte: u8) {
        if self.capacity == 0 {
            return;
        }
        if self.bytes.len() == self.capacity {
            self.bytes.pop_back();
        }
        self.bytes.push_front(byte);
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.append(b);
        }
    }

    /// Current contents, most recent first.
    pub fn snapshot(&self) -> Vec<u8> {
        self.bytes.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Default for TraceBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_recent_first() {
        let mut trace = TraceBuffer::new();
        trace.extend(&[1, 2, 3]);
        assert_eq!(trace.snapshot(), vec![3, 2, 1]);
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let mut trace = TraceBuffer::new();
        for b in 0..20u8 {
            trace.append(b);
        }
        assert_eq!(trace.len(), TRACE_CAPACITY);
        assert_eq!(trace.snapshot(), vec![19, 18, 17, 16, 15, 14, 13, 12]);
    }

    #[test]
    fn test_exact_capacity_keeps_everything() {
        let mut trace = TraceBuffer::new();
        trace.extend(&[0xA0, 0x01, 0x00, 0xA1, 0xA0, 0x02, 0x00, 0xA2]);
        assert_eq!(
            trace.snapshot(),
            vec![0xA2, 0x00, 0x02, 0xA0, 0xA1, 0x00, 0x01, 0xA0]
        );
    }

    #[test]
    fn test_zero_capacity_stays_empty() {
        let mut trace = TraceBuffer::with_capacity(0);
        trace.append(7);
        assert!(trace.is_empty());
    }
}
