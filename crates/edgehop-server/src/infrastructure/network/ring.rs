//! A growable byte queue with a hangup marker.
//!
//! # What is a ring buffer here? (for beginners)
//!
//! Each connection owns two of these: one the I/O task fills with bytes read
//! from the socket (drained by the protocol interpreter), and one the
//! dispatcher fills with encoded messages (drained by the I/O task).  The
//! queue itself knows nothing about threads or sockets: it only stores
//! bytes in arrival order and remembers whether its producer has hung up.
//! All locking and waking lives one layer up in the buffered stream pair.
//!
//! Bytes are kept as a queue of chunks rather than one contiguous
//! allocation, so a push never has to shift existing data and a pop only
//! copies what it returns.

use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct ByteRing {
    chunks: VecDeque<Vec<u8>>,
    /// Read offset into the front chunk.
    head: usize,
    /// Total unread bytes across all chunks.
    len: usize,
    hungup: bool,
}

impl ByteRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unread bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends bytes to the tail.  Pushes after [`hangup`](Self::hangup)
    /// are discarded.
    pub fn push(&mut self, bytes: &[u8]) {
        if self.hungup || bytes.is_empty() {
            return;
        }
        self.len += bytes.len();
        self.chunks.push_back(bytes.to_vec());
    }

    /// Copies up to `n` bytes from the head without consuming them.
    pub fn peek(&self, n: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(n.min(self.len));
        let mut skip = self.head;
        for chunk in &self.chunks {
            if out.len() == n {
                break;
            }
            let avail = &chunk[skip..];
            let take = avail.len().min(n - out.len());
            out.extend_from_slice(&avail[..take]);
            skip = 0;
        }
        out
    }

    /// Removes and returns exactly `n` bytes, or `None` when fewer are
    /// buffered (nothing is consumed in that case).
    pub fn pop(&mut self, n: usize) -> Option<Vec<u8>> {
        if self.len < n {
            return None;
        }
        Some(self.take(n))
    }

    /// Removes and returns up to `n` bytes; empty when nothing is buffered.
    pub fn pop_up_to(&mut self, n: usize) -> Vec<u8> {
        self.take(n.min(self.len))
    }

    fn take(&mut self, n: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            let front = self.chunks.front().expect("len accounting broken");
            let avail = front.len() - self.head;
            let want = n - out.len();
            if avail > want {
                out.extend_from_slice(&front[self.head..self.head + want]);
                self.head += want;
            } else {
                out.extend_from_slice(&front[self.head..]);
                self.head = 0;
                self.chunks.pop_front();
            }
        }
        self.len -= n;
        out
    }

    /// Marks end of stream: buffered bytes stay readable, further pushes
    /// are dropped.
    pub fn hangup(&mut self) {
        self.hungup = true;
    }

    pub fn is_hungup(&self) -> bool {
        self.hungup
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ring_is_empty() {
        let ring = ByteRing::new();
        assert!(ring.is_empty());
        assert_eq!(ring.len(), 0);
        assert!(!ring.is_hungup());
    }

    #[test]
    fn test_push_then_pop_preserves_order_across_chunks() {
        let mut ring = ByteRing::new();
        ring.push(b"hel");
        ring.push(b"lo ");
        ring.push(b"world");

        assert_eq!(ring.pop(8), Some(b"hello wo".to_vec()));
        assert_eq!(ring.pop(3), Some(b"rld".to_vec()));
        assert!(ring.is_empty());
    }

    #[test]
    fn test_pop_more_than_buffered_consumes_nothing() {
        let mut ring = ByteRing::new();
        ring.push(b"abc");

        assert_eq!(ring.pop(4), None);
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.pop(3), Some(b"abc".to_vec()));
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut ring = ByteRing::new();
        ring.push(b"abcdef");

        assert_eq!(ring.peek(4), b"abcd".to_vec());
        assert_eq!(ring.len(), 6);
        assert_eq!(ring.pop(6), Some(b"abcdef".to_vec()));
    }

    #[test]
    fn test_peek_spans_chunks_and_clips_to_length() {
        let mut ring = ByteRing::new();
        ring.push(b"ab");
        ring.push(b"cd");

        assert_eq!(ring.peek(10), b"abcd".to_vec());
    }

    #[test]
    fn test_partial_pop_leaves_offset_in_front_chunk() {
        let mut ring = ByteRing::new();
        ring.push(b"abcdef");

        assert_eq!(ring.pop(2), Some(b"ab".to_vec()));
        assert_eq!(ring.peek(2), b"cd".to_vec());
        assert_eq!(ring.pop_up_to(100), b"cdef".to_vec());
    }

    #[test]
    fn test_pop_up_to_on_empty_ring_returns_empty() {
        let mut ring = ByteRing::new();
        assert_eq!(ring.pop_up_to(16), Vec::<u8>::new());
    }

    #[test]
    fn test_push_after_hangup_is_dropped_but_buffered_bytes_remain() {
        let mut ring = ByteRing::new();
        ring.push(b"keep");
        ring.hangup();
        ring.push(b"drop");

        assert!(ring.is_hungup());
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.pop(4), Some(b"keep".to_vec()));
    }
}
