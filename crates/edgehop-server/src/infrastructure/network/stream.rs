//! The buffered stream pair shared by a connection's I/O task and its
//! protocol interpreter.
//!
//! One [`ConnectionBuffers`] holds both directions of a connection behind a
//! single lock: an input ring the I/O task fills from the socket and the
//! interpreter drains, and an output ring the dispatcher fills and the I/O
//! task drains to the socket.  Reads await until enough bytes arrive (or
//! the producer hangs up); writes never block, they queue bytes and wake
//! the I/O task.  [`flush`](ConnectionBuffers::flush) awaits until the I/O
//! task has taken everything queued so far.
//!
//! # Wakeup discipline
//!
//! Every awaiting method creates its `Notified` future *before* inspecting
//! the shared state and re-checks in a loop.  Combined with
//! `Notify::notify_one`'s stored permit, a notification landing between the
//! check and the await cannot be lost.

use crate::infrastructure::network::ring::ByteRing;
use std::sync::Mutex;
use tokio::sync::Notify;

/// Bytes handed to the I/O task per wakeup; matches the socket read buffer.
pub const IO_CHUNK: usize = 4096;

#[derive(Debug, Default)]
struct Pair {
    input: ByteRing,
    output: ByteRing,
    output_closed: bool,
}

/// One connection's input/output rings behind a shared lock.
#[derive(Debug, Default)]
pub struct ConnectionBuffers {
    inner: Mutex<Pair>,
    /// Input bytes arrived, or the input hung up.
    input_ready: Notify,
    /// Output bytes queued, or the output closed.
    output_ready: Notify,
    /// The output ring became empty, or the output closed.
    output_drained: Notify,
}

impl ConnectionBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Input side ────────────────────────────────────────────────────────────

    /// Called by the I/O task with bytes read off the socket.  Never blocks.
    pub fn fill_input(&self, bytes: &[u8]) {
        {
            let mut pair = self.inner.lock().expect("buffer lock poisoned");
            pair.input.push(bytes);
        }
        self.input_ready.notify_one();
    }

    /// Marks the input as ended (peer hung up or the connection is being
    /// torn down).  Buffered bytes stay readable.
    pub fn hangup_input(&self) {
        {
            let mut pair = self.inner.lock().expect("buffer lock poisoned");
            pair.input.hangup();
        }
        self.input_ready.notify_one();
    }

    /// Awaits exactly `n` input bytes.
    ///
    /// Returns `None` when the input hangs up before `n` bytes are
    /// available; whatever partial data was buffered is left unconsumed so
    /// the caller can treat the condition purely as end of stream.
    pub async fn read_exact(&self, n: usize) -> Option<Vec<u8>> {
        loop {
            let notified = self.input_ready.notified();
            {
                let mut pair = self.inner.lock().expect("buffer lock poisoned");
                if pair.input.len() >= n {
                    return pair.input.pop(n);
                }
                if pair.input.is_hungup() {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Number of unread input bytes (diagnostics and tests).
    pub fn input_len(&self) -> usize {
        self.inner.lock().expect("buffer lock poisoned").input.len()
    }

    // ── Output side ───────────────────────────────────────────────────────────

    /// Queues bytes for the socket.  Never blocks.  One call is one atomic
    /// append, so concurrent writers cannot interleave inside a frame.
    ///
    /// Returns `false` once the output has been closed (the bytes are
    /// dropped, matching a connection that is already going away).
    pub fn write_output(&self, bytes: &[u8]) -> bool {
        {
            let mut pair = self.inner.lock().expect("buffer lock poisoned");
            if pair.output_closed {
                return false;
            }
            pair.output.push(bytes);
        }
        self.output_ready.notify_one();
        true
    }

    /// Awaits until the I/O task has drained everything queued so far (or
    /// the output was closed).
    pub async fn flush(&self) {
        loop {
            let notified = self.output_drained.notified();
            {
                let pair = self.inner.lock().expect("buffer lock poisoned");
                if pair.output.is_empty() || pair.output_closed {
                    return;
                }
            }
            notified.await;
        }
    }

    /// Closes the output: queued bytes will still be delivered, further
    /// writes are refused, and the I/O task's writer half exits after the
    /// drain.
    pub fn close_output(&self) {
        {
            let mut pair = self.inner.lock().expect("buffer lock poisoned");
            pair.output_closed = true;
        }
        self.output_ready.notify_one();
        self.output_drained.notify_one();
    }

    /// Awaits the next chunk of outbound bytes (up to [`IO_CHUNK`]).
    ///
    /// Returns `None` once the output is closed **and** drained, which is
    /// the I/O task's signal to half-close the socket.  Called only by the I/O
    /// task.
    pub async fn next_outbound(&self) -> Option<Vec<u8>> {
        loop {
            let notified = self.output_ready.notified();
            {
                let mut pair = self.inner.lock().expect("buffer lock poisoned");
                if !pair.output.is_empty() {
                    let chunk = pair.output.pop_up_to(IO_CHUNK);
                    if pair.output.is_empty() {
                        self.output_drained.notify_one();
                    }
                    return Some(chunk);
                }
                if pair.output_closed {
                    return None;
                }
            }
            notified.await;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
