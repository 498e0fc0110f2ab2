//! The per-stream engine: one `H2Stream` per HTTP/2 stream id, owned by
//! the session and shared with the application.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use tokio::runtime::Handle;

use crate::callback;
use crate::callback::CallbackBox;
use crate::callback::FusedCallback;
use crate::close_state::CloseCell;
use crate::close_state::CloseEvent;
use crate::close_state::CloseState;
use crate::close_state::CloseUpdate;
use crate::data_queue::DataDemandQueue;
use crate::data_queue::DataEntry;
use crate::data_queue::Offer;
use crate::error::Error;
use crate::idle_timeout::IdleTimeout;
use crate::listener::StreamListener;
use crate::misc::any_to_string;
use crate::session::Session;
use crate::solicit::error_code::ErrorCode;
use crate::solicit::frame::DataFrame;
use crate::solicit::frame::FailureFrame;
use crate::solicit::frame::HeadersFrame;
use crate::solicit::frame::HeadersPlace;
use crate::solicit::frame::PushPromiseFrame;
use crate::solicit::frame::RstStreamFrame;
use crate::solicit::frame::StreamFrame;
use crate::solicit::frame::WindowUpdateFrame;
use crate::solicit::header::Headers;
use crate::solicit::stream_id::StreamId;
use crate::window::FlowControlWindow;
use crate::write_guard::WriteGuard;

/// Promise completed by the session with the pushed stream, or with the
/// error that prevented the push.
pub type StreamPromise = Box<dyn FnOnce(crate::Result<Arc<H2Stream>>) + Send + 'static>;

/// No content-length was declared.
const NO_DATA_LENGTH: i64 = i64::MIN;

/// State of one HTTP/2 stream.
///
/// Every method takes `&self`: the stream is shared between the session's
/// read loop, the session's writer and the application, and synchronizes
/// internally with narrow locks plus atomics. Frames come in through
/// [`H2Stream::process`]; writes go out through [`H2Stream::headers`],
/// [`H2Stream::data`] and [`H2Stream::reset`].
pub struct H2Stream {
    stream_id: StreamId,
    session: Arc<dyn Session>,
    /// The request that opened the stream (the promised request for pushed
    /// streams). Both directions consult its method for the CONNECT
    /// content-length exemption.
    request: Headers,
    /// Locally initiated, as opposed to accepted from the peer.
    local: bool,
    window: FlowControlWindow,
    close_cell: CloseCell,
    data_queue: DataDemandQueue,
    write_guard: Arc<WriteGuard>,
    idle: IdleTimeout,
    listener: Mutex<Option<Arc<dyn StreamListener>>>,
    local_reset: AtomicBool,
    remote_reset: AtomicBool,
    /// Remaining bytes of the declared content-length, `NO_DATA_LENGTH`
    /// when none was declared.
    data_length: AtomicI64,
    attachment: Mutex<Option<Arc<dyn Any + Send + Sync>>>,
    attributes: Mutex<Option<HashMap<String, Arc<dyn Any + Send + Sync>>>>,
    created: Instant,
}

impl H2Stream {
    /// A new stream in its initial state: not closed, windows at zero
    /// (the session seeds them with the negotiated initial size), no
    /// listener, idle timer disabled.
    pub fn new(
        scheduler: Handle,
        session: Arc<dyn Session>,
        stream_id: StreamId,
        request: Headers,
        local: bool,
    ) -> Arc<H2Stream> {
        let stream = Arc::new(H2Stream {
            stream_id,
            session,
            request,
            local,
            window: FlowControlWindow::new(),
            close_cell: CloseCell::new(),
            data_queue: DataDemandQueue::new(),
            write_guard: Arc::new(WriteGuard::new()),
            idle: IdleTimeout::new(scheduler),
            listener: Mutex::new(None),
            local_reset: AtomicBool::new(false),
            remote_reset: AtomicBool::new(false),
            data_length: AtomicI64::new(NO_DATA_LENGTH),
            attachment: Mutex::new(None),
            attributes: Mutex::new(None),
            created: Instant::now(),
        });
        let weak = Arc::downgrade(&stream);
        stream.idle.set_on_expired(Arc::new(move || {
            if let Some(stream) = weak.upgrade() {
                stream.on_idle_expired();
            }
        }));
        stream
    }

    pub fn id(&self) -> StreamId {
        self.stream_id
    }

    pub fn session(&self) -> Arc<dyn Session> {
        self.session.clone()
    }

    pub fn request(&self) -> &Headers {
        &self.request
    }

    pub fn is_local(&self) -> bool {
        self.local
    }

    /// Attach the application listener. Set once, before the session
    /// dispatches the first frame; without it the stream runs the
    /// self-driving defaults.
    pub fn set_listener(&self, listener: Arc<dyn StreamListener>) {
        *self.listener.lock().unwrap() = Some(listener);
    }

    pub fn listener(&self) -> Option<Arc<dyn StreamListener>> {
        self.listener.lock().unwrap().clone()
    }

    pub fn send_window(&self) -> i32 {
        self.window.send_window()
    }

    pub fn recv_window(&self) -> i32 {
        self.window.recv_window()
    }

    /// Add `delta` to the send window, returning the previous value.
    pub fn update_send_window(&self, delta: i32) -> i32 {
        self.window.update_send_window(delta)
    }

    /// Add `delta` to the receive window, returning the previous value.
    pub fn update_recv_window(&self, delta: i32) -> i32 {
        self.window.update_recv_window(delta)
    }

    pub fn close_state(&self) -> CloseState {
        self.close_cell.get()
    }

    pub fn is_closed(&self) -> bool {
        self.close_cell.get() == CloseState::Closed
    }

    pub fn is_open(&self) -> bool {
        !self.is_closed()
    }

    pub fn is_remotely_closed(&self) -> bool {
        let state = self.close_cell.get();
        state == CloseState::RemotelyClosed || state == CloseState::Closing
    }

    pub fn is_locally_closed(&self) -> bool {
        self.close_cell.get() == CloseState::LocallyClosed
    }

    pub fn is_reset(&self) -> bool {
        self.local_reset.load(Ordering::SeqCst) || self.remote_reset.load(Ordering::SeqCst)
    }

    /// Zero disables the timer.
    pub fn set_idle_timeout(&self, timeout: Duration) {
        self.idle.set_timeout(timeout);
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle.timeout()
    }

    /// Dispatch one inbound frame. Called by the session's read loop;
    /// `callback` is completed when the stream, or the application behind
    /// it, is done with the frame.
    pub fn process(&self, frame: StreamFrame, callback: CallbackBox) {
        self.idle.not_idle();
        match frame {
            StreamFrame::Preface(_) => self.on_new_stream(callback),
            StreamFrame::Headers(frame) => self.on_headers(frame, callback),
            StreamFrame::Data(frame) => self.on_data(frame, callback),
            StreamFrame::RstStream(frame) => self.on_reset(frame, callback),
            StreamFrame::PushPromise(frame) => self.on_push(frame, callback),
            StreamFrame::WindowUpdate(frame) => self.on_window_update(frame, callback),
            StreamFrame::Failure(frame) => self.on_failure(frame, callback),
            StreamFrame::Priority(frame) => {
                panic!("PRIORITY is the session scheduler's business: {:?}", frame)
            }
        }
    }

    /// Send a HEADERS frame. At most one write may be outstanding; a
    /// second one fails with [`Error::WritePending`] and closes the stream.
    pub fn headers(&self, frame: HeadersFrame, callback: CallbackBox) {
        if self.start_write(callback) {
            let completion = self.write_guard.completion();
            self.session
                .frames(self, completion, vec![StreamFrame::Headers(frame)]);
        }
    }

    /// Send a DATA frame, under the same single-write rule as
    /// [`H2Stream::headers`].
    pub fn data(&self, frame: DataFrame, callback: CallbackBox) {
        if self.start_write(callback) {
            let completion = self.write_guard.completion();
            self.session.data(self, completion, frame);
        }
    }

    /// Send `RST_STREAM`, cancelling the stream.
    ///
    /// A no-op if the stream is already reset: the frame is not sent and
    /// the callback is dropped. Resets bypass the write slot, so an
    /// outstanding write keeps its own completion.
    pub fn reset(&self, frame: RstStreamFrame, callback: CallbackBox) {
        if self.remote_reset.load(Ordering::SeqCst) || self.local_reset.swap(true, Ordering::SeqCst)
        {
            return;
        }
        self.idle.not_idle();
        self.session
            .frames(self, callback, vec![StreamFrame::RstStream(frame)]);
    }

    /// Reserve a pushed stream rooted at this one. The session allocates
    /// the id, transmits the promise and completes `promise` with the new
    /// stream.
    pub fn push(
        &self,
        frame: PushPromiseFrame,
        promise: StreamPromise,
        listener: Arc<dyn StreamListener>,
    ) {
        self.session.push(self, promise, frame, listener);
    }

    fn start_write(&self, callback: CallbackBox) -> bool {
        self.idle.not_idle();
        match self.write_guard.claim(callback) {
            Ok(()) => true,
            Err(callback) => {
                self.close();
                callback.failed(Error::WritePending(self.stream_id));
                false
            }
        }
    }

    /// Grant demand for `n` more DATA deliveries.
    ///
    /// Panics when `n` is zero. After [`H2Stream::fail`] the call is a
    /// silent no-op.
    pub fn demand(&self, n: u64) {
        assert!(n != 0, "invalid demand {}", n);
        let (total, proceed) = match self.data_queue.add_demand(n) {
            Some(r) => r,
            None => return,
        };
        debug!(
            "demand {}/{}, {} data processing for {:?}",
            n,
            total,
            if proceed { "proceeding" } else { "stalling" },
            self
        );
        if proceed {
            self.process_data_entries();
        }
    }

    /// Record a permanent failure: queued and future DATA callbacks all
    /// fail with a shared handle to `error`.
    ///
    /// The close state is deliberately left alone; the failure models an
    /// external abort layered on top of the close handshake.
    pub fn fail(&self, error: Error) {
        debug!("failing {:?}: {}", self, error);
        let (failure, backlog) = self.data_queue.fail(error);
        for entry in backlog {
            entry.callback.failed(Error::StreamFailed(failure.clone()));
        }
    }

    /// Apply one close-handshake event when `update` is set (the frame
    /// carried END_STREAM).
    ///
    /// Returns true when the event fully closed the stream; the caller
    /// must then drop the stream from the session's table.
    pub fn update_close(&self, update: bool, event: CloseEvent) -> bool {
        debug!(
            "update close for {:?} update={} event={:?}",
            self, update, event
        );
        if !update {
            return false;
        }
        match self.close_cell.update(event) {
            CloseUpdate::NoChange => false,
            CloseUpdate::EnteredClosing => {
                self.session.update_stream_count(self.local, 0, 1);
                false
            }
            CloseUpdate::FullClose => {
                self.close();
                true
            }
        }
    }

    /// Force the terminal state. Idempotent: the single winner adjusts the
    /// session's counters, stops the idle timer and fires the closed
    /// notification, exactly once.
    pub fn close(&self) {
        if let Some(previous) = self.close_cell.force_close() {
            let delta_closing = if previous == CloseState::Closing { -1 } else { 0 };
            self.session
                .update_stream_count(self.local, -1, delta_closing);
            self.idle.stop();
            self.notify_closed();
        }
    }

    fn on_new_stream(&self, callback: CallbackBox) {
        self.notify_new_stream();
        callback.succeeded();
    }

    fn on_headers(&self, frame: HeadersFrame, callback: CallbackBox) {
        if let HeadersPlace::Initial = frame.place {
            // CONNECT exchanges carry tunnelled bytes with no meaningful
            // content-length (RFC 7540 section 8.3).
            let declared = if self.request.method() == Some("CONNECT") {
                None
            } else {
                frame.headers.content_length()
            };
            self.data_length.store(
                declared.map(|l| l as i64).unwrap_or(NO_DATA_LENGTH),
                Ordering::SeqCst,
            );
        }

        if self.update_close(frame.is_end_stream(), CloseEvent::Received) {
            self.session.remove_stream(self);
        }
        callback.succeeded();
    }

    fn on_data(&self, frame: DataFrame, callback: CallbackBox) {
        // A peer that ignores the window does not deserve a mere stream
        // reset: tear the whole connection down.
        if self.recv_window() < 0 {
            self.session
                .on_connection_failure(ErrorCode::FlowControlError, "stream_window_exceeded");
            callback.failed(Error::StreamWindowExceeded(self.stream_id));
            return;
        }

        // DATA after the peer's END_STREAM is answered with a reset
        // (RFC 7540 section 5.1).
        if self.is_remotely_closed() {
            self.reset(
                RstStreamFrame::new(self.stream_id, ErrorCode::StreamClosed),
                callback::noop(),
            );
            callback.failed(Error::DataOnClosedStream(self.stream_id));
            return;
        }

        // On a reset stream the frame is dropped without an answer;
        // answering every straggler would feed a reset storm.
        if self.is_reset() {
            callback.failed(Error::StreamReset(self.stream_id));
            return;
        }

        if self.data_length.load(Ordering::SeqCst) != NO_DATA_LENGTH {
            let remaining = self
                .data_length
                .fetch_sub(frame.payload_len() as i64, Ordering::SeqCst)
                - frame.payload_len() as i64;
            if frame.is_end_stream() && remaining != 0 {
                self.reset(
                    RstStreamFrame::new(self.stream_id, ErrorCode::ProtocolError),
                    callback::noop(),
                );
                callback.failed(Error::InvalidDataLength(self.stream_id));
                return;
            }
        }

        let entry = DataEntry { frame, callback };
        let (initial, mut proceed) = match self.data_queue.offer(entry) {
            Offer::Rejected(entry, failure) => {
                entry.callback.failed(Error::StreamFailed(failure));
                return;
            }
            Offer::Queued { initial, proceed } => (initial, proceed),
        };
        if initial {
            debug!("starting data processing for {:?}", self);
            self.notify_before_data();
            proceed = self.data_queue.resume_after_initial();
        }
        debug!(
            "{} data processing for {:?}",
            if proceed { "proceeding" } else { "stalling" },
            self
        );
        if proceed {
            self.process_data_entries();
        }
    }

    /// Drain the queue while demand lasts. The caller holds the processing
    /// token; [`DataDemandQueue::next`] releases it when the drain stalls.
    fn process_data_entries(&self) {
        loop {
            let entry = match self.data_queue.next() {
                Some(entry) => entry,
                None => {
                    debug!("stalling data processing for {:?}", self);
                    return;
                }
            };
            let DataEntry { frame, callback } = entry;
            if self.update_close(frame.is_end_stream(), CloseEvent::Received) {
                self.session.remove_stream(self);
            }
            self.notify_data_demanded(frame, callback);
        }
    }

    fn on_reset(&self, frame: RstStreamFrame, callback: CallbackBox) {
        self.remote_reset.store(true, Ordering::SeqCst);
        self.close();
        self.session.remove_stream(self);
        self.notify_reset(frame, callback);
    }

    fn on_push(&self, _frame: PushPromiseFrame, callback: CallbackBox) {
        // A pushed stream is implicitly locally closed; it fully closes
        // when the end-stream DATA frame arrives.
        self.update_close(true, CloseEvent::AfterSend);
        callback.succeeded();
    }

    fn on_window_update(&self, _frame: WindowUpdateFrame, callback: CallbackBox) {
        // The session already applied the increment to the send window.
        callback.succeeded();
    }

    fn on_failure(&self, frame: FailureFrame, callback: CallbackBox) {
        self.notify_failure(frame, callback);
    }

    fn on_idle_expired(&self) {
        let timeout = self.idle.timeout();
        debug!("idle timeout {:?} expired on {:?}", timeout, self);
        let cause = Error::IdleTimeoutExpired(timeout);
        // The application may veto the cancellation.
        if self.notify_idle_timeout(&cause) {
            // Tell the peer we timed out; the ordinary reset path keeps
            // the bookkeeping uniform.
            self.reset(
                RstStreamFrame::new(self.stream_id, ErrorCode::Cancel),
                callback::noop(),
            );
        }
    }

    /// Opaque single-slot attachment.
    pub fn attachment(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.attachment.lock().unwrap().clone()
    }

    pub fn set_attachment(&self, attachment: Option<Arc<dyn Any + Send + Sync>>) {
        *self.attachment.lock().unwrap() = attachment;
    }

    /// Named attributes; the map is allocated on first use.
    pub fn attribute(&self, key: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        match &*self.attributes.lock().unwrap() {
            Some(attributes) => attributes.get(key).cloned(),
            None => None,
        }
    }

    pub fn set_attribute(&self, key: impl Into<String>, value: Arc<dyn Any + Send + Sync>) {
        self.attributes
            .lock()
            .unwrap()
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value);
    }

    pub fn remove_attribute(&self, key: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        match &mut *self.attributes.lock().unwrap() {
            Some(attributes) => attributes.remove(key),
            None => None,
        }
    }

    fn notify_new_stream(&self) {
        if let Some(listener) = self.listener() {
            let r = panic::catch_unwind(panic::AssertUnwindSafe(|| listener.on_new_stream(self)));
            if let Err(e) = r {
                warn!("listener panicked in on_new_stream: {}", any_to_string(e));
            }
        }
    }

    fn notify_before_data(&self) {
        match self.listener() {
            Some(listener) => {
                let r =
                    panic::catch_unwind(panic::AssertUnwindSafe(|| listener.on_before_data(self)));
                if let Err(e) = r {
                    warn!("listener panicked in on_before_data: {}", any_to_string(e));
                }
            }
            None => self.demand(1),
        }
    }

    fn notify_data_demanded(&self, frame: DataFrame, callback: CallbackBox) {
        match self.listener() {
            Some(listener) => {
                let fused = FusedCallback::new(callback);
                let callback = fused.to_box();
                let r = panic::catch_unwind(panic::AssertUnwindSafe(move || {
                    listener.on_data_demanded(self, frame, callback)
                }));
                if let Err(e) = r {
                    let message = any_to_string(e);
                    warn!("listener panicked in on_data_demanded: {}", message);
                    fused.failed(Error::HandlerPanicked(message));
                }
            }
            None => {
                callback.succeeded();
                self.demand(1);
            }
        }
    }

    fn notify_reset(&self, frame: RstStreamFrame, callback: CallbackBox) {
        match self.listener() {
            Some(listener) => {
                let fused = FusedCallback::new(callback);
                let callback = fused.to_box();
                let r = panic::catch_unwind(panic::AssertUnwindSafe(move || {
                    listener.on_reset(self, frame, callback)
                }));
                if let Err(e) = r {
                    let message = any_to_string(e);
                    warn!("listener panicked in on_reset: {}", message);
                    fused.failed(Error::HandlerPanicked(message));
                }
            }
            None => callback.succeeded(),
        }
    }

    fn notify_idle_timeout(&self, cause: &Error) -> bool {
        let listener = match self.listener() {
            Some(listener) => listener,
            None => return true,
        };
        let r = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            listener.on_idle_timeout(self, cause)
        }));
        match r {
            Ok(fatal) => fatal,
            Err(e) => {
                warn!("listener panicked in on_idle_timeout: {}", any_to_string(e));
                true
            }
        }
    }

    fn notify_failure(&self, frame: FailureFrame, callback: CallbackBox) {
        match self.listener() {
            Some(listener) => {
                let fused = FusedCallback::new(callback);
                let callback = fused.to_box();
                let FailureFrame {
                    error_code, reason, ..
                } = frame;
                let r = panic::catch_unwind(panic::AssertUnwindSafe(move || {
                    listener.on_failure(self, error_code, &reason, callback)
                }));
                if let Err(e) = r {
                    let message = any_to_string(e);
                    warn!("listener panicked in on_failure: {}", message);
                    fused.failed(Error::HandlerPanicked(message));
                }
            }
            None => callback.succeeded(),
        }
    }

    fn notify_closed(&self) {
        if let Some(listener) = self.listener() {
            let r = panic::catch_unwind(panic::AssertUnwindSafe(|| listener.on_closed(self)));
            if let Err(e) = r {
                warn!("listener panicked in on_closed: {}", any_to_string(e));
            }
        }
    }
}

impl fmt::Debug for H2Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "H2Stream#{}{{send_window={},recv_window={},demand={},reset={}/{},{:?},age={}ms}}",
            self.stream_id,
            self.window.send_window(),
            self.window.recv_window(),
            self.data_queue.demand(),
            self.local_reset.load(Ordering::SeqCst),
            self.remote_reset.load(Ordering::SeqCst),
            self.close_cell.get(),
            self.created.elapsed().as_millis(),
        )
    }
}
