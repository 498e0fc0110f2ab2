use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use bytes::Bytes;

use h2stream::CallbackBox;
use h2stream::DataFrame;
use h2stream::Error;
use h2stream::ErrorCode;
use h2stream::H2Stream;
use h2stream::RstStreamFrame;
use h2stream::StreamListener;

/// Records the completions of one engine callback.
#[derive(Clone, Default)]
pub struct CallbackState {
    outcomes: Arc<Mutex<Vec<h2stream::Result<()>>>>,
}

impl CallbackState {
    pub fn new() -> CallbackState {
        Default::default()
    }

    /// The callback half to hand to the engine.
    pub fn callback(&self) -> CallbackBox {
        let outcomes = self.outcomes.clone();
        Box::new(move |result: h2stream::Result<()>| {
            outcomes.lock().unwrap().push(result);
        })
    }

    pub fn completions(&self) -> usize {
        self.outcomes.lock().unwrap().len()
    }

    pub fn pending(&self) -> bool {
        self.completions() == 0
    }

    /// Completed exactly once, successfully.
    pub fn succeeded(&self) -> bool {
        matches!(self.outcomes.lock().unwrap().as_slice(), [Ok(())])
    }

    /// Completed exactly once, with any error.
    pub fn failed(&self) -> bool {
        matches!(self.outcomes.lock().unwrap().as_slice(), [Err(_)])
    }

    /// Completed exactly once, with an error matching `predicate`.
    pub fn failed_with(&self, predicate: impl FnOnce(&Error) -> bool) -> bool {
        match self.outcomes.lock().unwrap().as_slice() {
            [Err(e)] => predicate(e),
            _ => false,
        }
    }
}

/// Listener recording everything the engine tells the application.
///
/// `demand_before` is requested when data processing starts and
/// `demand_per_entry` after each delivery; zero leaves demand entirely to
/// the test body.
pub struct RecordingListener {
    demand_before: u64,
    demand_per_entry: u64,
    idle_fatal: bool,
    delivering: AtomicBool,
    pub overlapping_deliveries: AtomicUsize,
    pub new_streams: AtomicUsize,
    pub before_data: AtomicUsize,
    pub closed: AtomicUsize,
    pub idle_timeouts: AtomicUsize,
    pub delivered: Mutex<Vec<(Bytes, bool)>>,
    pub resets: Mutex<Vec<RstStreamFrame>>,
    pub failures: Mutex<Vec<(ErrorCode, String)>>,
}

impl RecordingListener {
    fn with_demand(demand_before: u64, demand_per_entry: u64, idle_fatal: bool) -> Arc<Self> {
        Arc::new(RecordingListener {
            demand_before,
            demand_per_entry,
            idle_fatal,
            delivering: AtomicBool::new(false),
            overlapping_deliveries: AtomicUsize::new(0),
            new_streams: AtomicUsize::new(0),
            before_data: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
            idle_timeouts: AtomicUsize::new(0),
            delivered: Mutex::new(Vec::new()),
            resets: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
        })
    }

    /// No demand requested by the listener; the test drives it.
    pub fn manual_demand() -> Arc<RecordingListener> {
        RecordingListener::with_demand(0, 0, true)
    }

    /// One unit up front, one after each delivery: steady consumption.
    pub fn auto_demand() -> Arc<RecordingListener> {
        RecordingListener::with_demand(1, 1, true)
    }

    /// Vetoes every idle timeout.
    pub fn vetoing_idle() -> Arc<RecordingListener> {
        RecordingListener::with_demand(0, 0, false)
    }

    pub fn delivered_payloads(&self) -> Vec<Bytes> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|(data, _)| data.clone())
            .collect()
    }

    pub fn delivered_count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

impl StreamListener for RecordingListener {
    fn on_new_stream(&self, _stream: &H2Stream) {
        self.new_streams.fetch_add(1, Ordering::SeqCst);
    }

    fn on_before_data(&self, stream: &H2Stream) {
        self.before_data.fetch_add(1, Ordering::SeqCst);
        if self.demand_before > 0 {
            stream.demand(self.demand_before);
        }
    }

    fn on_data_demanded(&self, stream: &H2Stream, frame: DataFrame, callback: CallbackBox) {
        // Deliveries must never overlap; any overlap is recorded and
        // failed by the test.
        if self.delivering.swap(true, Ordering::SeqCst) {
            self.overlapping_deliveries.fetch_add(1, Ordering::SeqCst);
        }
        self.delivered
            .lock()
            .unwrap()
            .push((frame.data.clone(), frame.is_end_stream()));
        callback.succeeded();
        if self.demand_per_entry > 0 {
            stream.demand(self.demand_per_entry);
        }
        self.delivering.store(false, Ordering::SeqCst);
    }

    fn on_reset(&self, _stream: &H2Stream, frame: RstStreamFrame, callback: CallbackBox) {
        self.resets.lock().unwrap().push(frame);
        callback.succeeded();
    }

    fn on_idle_timeout(&self, _stream: &H2Stream, _cause: &Error) -> bool {
        self.idle_timeouts.fetch_add(1, Ordering::SeqCst);
        self.idle_fatal
    }

    fn on_failure(
        &self,
        _stream: &H2Stream,
        error_code: ErrorCode,
        reason: &str,
        callback: CallbackBox,
    ) {
        self.failures
            .lock()
            .unwrap()
            .push((error_code, reason.to_owned()));
        callback.succeeded();
    }

    fn on_closed(&self, _stream: &H2Stream) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Listener whose data path always panics; exercises the engine's panic
/// boundary.
pub struct PanickingListener;

impl StreamListener for PanickingListener {
    fn on_data_demanded(&self, _stream: &H2Stream, _frame: DataFrame, _callback: CallbackBox) {
        panic!("listener bug");
    }
}
