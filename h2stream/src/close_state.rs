//! The close handshake of one stream.
//!
//! RFC 7540 section 5.1 closes each direction independently: the stream is
//! gone only when both the local and the remote END_STREAM took effect.
//! The local direction additionally distinguishes "queued" from "flushed",
//! which is where the `LocallyClosing` and `Closing` states come from.

use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;

/// Close-handshake state of one stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CloseState {
    /// Neither side signalled END_STREAM.
    NotClosed,
    /// The local END_STREAM frame is queued but not flushed yet.
    LocallyClosing,
    /// The local END_STREAM frame is on the wire.
    LocallyClosed,
    /// The peer's END_STREAM arrived.
    RemotelyClosed,
    /// The peer closed, and the local END_STREAM is queued but not flushed.
    Closing,
    /// Both directions closed. Terminal.
    Closed,
}

/// What moved the close state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CloseEvent {
    /// An END_STREAM-bearing frame arrived from the peer.
    Received,
    /// The local endpoint queued an END_STREAM-bearing frame.
    BeforeSend,
    /// The session flushed the local END_STREAM-bearing frame.
    AfterSend,
}

/// Side effect the caller owes after a transition.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum CloseUpdate {
    NoChange,
    /// The stream entered `Closing`: the session's closing-streams counter
    /// must be incremented.
    EnteredClosing,
    /// Both directions are now closed: the caller must run the full-close
    /// side effects.
    FullClose,
}

fn decode(value: u8) -> CloseState {
    match value {
        0 => CloseState::NotClosed,
        1 => CloseState::LocallyClosing,
        2 => CloseState::LocallyClosed,
        3 => CloseState::RemotelyClosed,
        4 => CloseState::Closing,
        5 => CloseState::Closed,
        _ => unreachable!("invalid close state: {}", value),
    }
}

/// Atomic cell holding the close state.
///
/// Transitions are compare-and-retry loops so the connection's read side
/// and the application's write side can race without lost updates. The
/// cell is pure: side effects are reported through [`CloseUpdate`] and
/// performed by the stream.
pub(crate) struct CloseCell(AtomicU8);

impl CloseCell {
    pub fn new() -> CloseCell {
        CloseCell(AtomicU8::new(CloseState::NotClosed as u8))
    }

    pub fn get(&self) -> CloseState {
        decode(self.0.load(Ordering::SeqCst))
    }

    fn cas(&self, current: CloseState, next: CloseState) -> bool {
        self.0
            .compare_exchange(
                current as u8,
                next as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Apply one close event, retrying on contention.
    pub fn update(&self, event: CloseEvent) -> CloseUpdate {
        match event {
            CloseEvent::Received => self.update_after_received(),
            CloseEvent::BeforeSend => self.update_before_send(),
            CloseEvent::AfterSend => self.update_after_send(),
        }
    }

    fn update_after_received(&self) -> CloseUpdate {
        loop {
            let current = self.get();
            match current {
                CloseState::NotClosed => {
                    if self.cas(current, CloseState::RemotelyClosed) {
                        return CloseUpdate::NoChange;
                    }
                }
                CloseState::LocallyClosing => {
                    if self.cas(current, CloseState::Closing) {
                        return CloseUpdate::EnteredClosing;
                    }
                }
                CloseState::LocallyClosed => return CloseUpdate::FullClose,
                _ => return CloseUpdate::NoChange,
            }
        }
    }

    fn update_before_send(&self) -> CloseUpdate {
        loop {
            let current = self.get();
            match current {
                CloseState::NotClosed => {
                    if self.cas(current, CloseState::LocallyClosing) {
                        return CloseUpdate::NoChange;
                    }
                }
                CloseState::RemotelyClosed => {
                    if self.cas(current, CloseState::Closing) {
                        return CloseUpdate::EnteredClosing;
                    }
                }
                _ => return CloseUpdate::NoChange,
            }
        }
    }

    fn update_after_send(&self) -> CloseUpdate {
        loop {
            let current = self.get();
            match current {
                CloseState::NotClosed | CloseState::LocallyClosing => {
                    if self.cas(current, CloseState::LocallyClosed) {
                        return CloseUpdate::NoChange;
                    }
                }
                CloseState::RemotelyClosed | CloseState::Closing => {
                    return CloseUpdate::FullClose;
                }
                _ => return CloseUpdate::NoChange,
            }
        }
    }

    /// Swap to `Closed`. The single winner gets the previous state back to
    /// apply the full-close side effects; everyone else gets `None`.
    pub fn force_close(&self) -> Option<CloseState> {
        let previous = decode(self.0.swap(CloseState::Closed as u8, Ordering::SeqCst));
        if previous == CloseState::Closed {
            None
        } else {
            Some(previous)
        }
    }
}
