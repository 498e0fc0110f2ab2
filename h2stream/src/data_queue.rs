//! Demand-gated FIFO of inbound DATA frames.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use crate::callback::CallbackBox;
use crate::error::Error;
use crate::solicit::frame::DataFrame;

/// One inbound DATA frame waiting for application demand. The callback is
/// completed when the application consumed the payload, which is when the
/// session may release flow control credit for it.
pub(crate) struct DataEntry {
    pub frame: DataFrame,
    pub callback: CallbackBox,
}

/// Outcome of queueing an inbound frame.
pub(crate) enum Offer {
    /// Entry queued. `initial` is set for the first frame the stream ever
    /// queued: the caller owes the one-time before-data notification and
    /// must reconcile afterwards with [`DataDemandQueue::resume_after_initial`].
    /// `proceed` means this call took the processing token and the caller
    /// must drain.
    Queued { initial: bool, proceed: bool },
    /// A permanent failure was recorded earlier. The entry comes back so
    /// the caller can fail its callback outside the lock.
    Rejected(DataEntry, Arc<Error>),
}

struct QueueState {
    queue: VecDeque<DataEntry>,
    /// How many entries the application is ready to receive.
    demand: u64,
    /// No frame was ever queued yet.
    initial: bool,
    /// The processing token: set while some thread is draining (or about
    /// to drain) the queue. At most one holder at any time.
    process: bool,
    failure: Option<Arc<Error>>,
}

/// Queue, demand counter, processing token and recorded failure form one
/// mutex domain: they must change together for delivery to stay FIFO and
/// never concurrent. The lock is only ever held for O(1) bookkeeping;
/// completing callbacks and notifying listeners is the caller's job, after
/// the lock is released.
pub(crate) struct DataDemandQueue {
    state: Mutex<QueueState>,
}

impl DataDemandQueue {
    pub fn new() -> DataDemandQueue {
        DataDemandQueue {
            state: Mutex::new(QueueState {
                queue: VecDeque::new(),
                demand: 0,
                initial: true,
                process: false,
                failure: None,
            }),
        }
    }

    pub fn offer(&self, entry: DataEntry) -> Offer {
        let mut state = self.state.lock().unwrap();
        if let Some(failure) = &state.failure {
            let failure = failure.clone();
            return Offer::Rejected(entry, failure);
        }
        state.queue.push_back(entry);
        let initial = state.initial;
        let mut proceed = false;
        if initial {
            state.initial = false;
            // Hold the token across the before-data notification so a
            // racing demand() cannot start draining before the
            // application had its chance to register demand.
            state.process = true;
        } else if !state.process {
            proceed = state.demand > 0;
            state.process = proceed;
        }
        Offer::Queued { initial, proceed }
    }

    /// Reconcile the token after the one-time before-data notification:
    /// keep it if the notification produced demand, release it otherwise.
    pub fn resume_after_initial(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        let proceed = state.demand > 0;
        state.process = proceed;
        proceed
    }

    /// Pop the next deliverable entry, spending one unit of demand.
    ///
    /// Returns `None` and releases the processing token when the queue is
    /// empty or demand is exhausted; the next `offer` or `add_demand`
    /// restarts the drain.
    pub fn next(&self) -> Option<DataEntry> {
        let mut state = self.state.lock().unwrap();
        if state.queue.is_empty() || state.demand == 0 {
            state.process = false;
            return None;
        }
        state.demand -= 1;
        state.queue.pop_front()
    }

    /// Saturating-add application demand.
    ///
    /// `None` when a failure was recorded: demanding from a failed stream
    /// is unobservable. Otherwise the new total and whether this call took
    /// the processing token.
    pub fn add_demand(&self, n: u64) -> Option<(u64, bool)> {
        let mut state = self.state.lock().unwrap();
        if state.failure.is_some() {
            return None;
        }
        state.demand = state.demand.saturating_add(n);
        let mut proceed = false;
        if !state.process {
            proceed = !state.queue.is_empty();
            state.process = proceed;
        }
        Some((state.demand, proceed))
    }

    /// Record a permanent failure, zero the demand and empty the queue.
    ///
    /// The caller fails the returned backlog outside the lock, in FIFO
    /// order.
    pub fn fail(&self, error: Error) -> (Arc<Error>, Vec<DataEntry>) {
        let mut state = self.state.lock().unwrap();
        let error = Arc::new(error);
        state.demand = 0;
        state.failure = Some(error.clone());
        let backlog = state.queue.drain(..).collect();
        (error, backlog)
    }

    /// Demand snapshot, for diagnostics.
    pub fn demand(&self) -> u64 {
        self.state.lock().unwrap().demand
    }
}
