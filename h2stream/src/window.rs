use std::sync::atomic::AtomicI32;
use std::sync::atomic::Ordering;

/// Per-stream flow control accounting: two independent signed windows.
///
/// Pure arithmetic, no clamping. The windows may legitimately go negative;
/// a receive window below zero on frame arrival means the peer overran its
/// credit, which the stream escalates as a connection-level violation.
/// Validation against the 31-bit protocol limit is the session's job.
pub struct FlowControlWindow {
    send: AtomicI32,
    recv: AtomicI32,
}

impl FlowControlWindow {
    /// Both windows start at zero; the session seeds them with the
    /// negotiated initial window size.
    pub fn new() -> FlowControlWindow {
        FlowControlWindow {
            send: AtomicI32::new(0),
            recv: AtomicI32::new(0),
        }
    }

    pub fn send_window(&self) -> i32 {
        self.send.load(Ordering::SeqCst)
    }

    pub fn recv_window(&self) -> i32 {
        self.recv.load(Ordering::SeqCst)
    }

    /// Add `delta` to the send window, returning the previous value. The
    /// session watches the sign of the previous value to learn when a
    /// stalled stream becomes writable again.
    pub fn update_send_window(&self, delta: i32) -> i32 {
        self.send.fetch_add(delta, Ordering::SeqCst)
    }

    /// Add `delta` to the receive window, returning the previous value.
    pub fn update_recv_window(&self, delta: i32) -> i32 {
        self.recv.fetch_add(delta, Ordering::SeqCst)
    }
}
