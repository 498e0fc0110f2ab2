use std::sync::Arc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use bytes::Bytes;
use tokio::runtime::Runtime;

use h2stream::DataFrame;
use h2stream::EndStream;
use h2stream::ErrorCode;
use h2stream::FailureFrame;
use h2stream::H2Stream;
use h2stream::Headers;
use h2stream::HeadersFrame;
use h2stream::HeadersPlace;
use h2stream::PrefaceFrame;
use h2stream::PushPromiseFrame;
use h2stream::RstStreamFrame;
use h2stream::StreamFrame;
use h2stream::StreamId;
use h2stream::WindowUpdateFrame;
use h2stream::DEFAULT_INITIAL_WINDOW_SIZE;

use crate::callbacks::CallbackState;
use crate::session::TestSession;

pub const TEST_STREAM_ID: StreamId = 1;

/// A runtime, a recording session and one stream under test, wired
/// together the way a live connection would.
pub struct StreamHarness {
    /// Kept alive for the stream's idle checker.
    pub runtime: Runtime,
    pub session: Arc<TestSession>,
    pub stream: Arc<H2Stream>,
}

impl StreamHarness {
    pub fn new() -> StreamHarness {
        StreamHarness::with_request(Headers::new_get("/fortytwo"))
    }

    pub fn with_request(request: Headers) -> StreamHarness {
        let runtime = Runtime::new().expect("runtime");
        let session = TestSession::new();
        let stream = H2Stream::new(
            runtime.handle().clone(),
            session.clone(),
            TEST_STREAM_ID,
            request,
            false,
        );
        // Seed the windows the way a session does after SETTINGS.
        stream.update_send_window(DEFAULT_INITIAL_WINDOW_SIZE as i32);
        stream.update_recv_window(DEFAULT_INITIAL_WINDOW_SIZE as i32);
        debug!("harness stream ready: {:?}", stream);
        StreamHarness {
            runtime,
            session,
            stream,
        }
    }

    /// Deliver a DATA frame the way the session's read loop would:
    /// account it against the receive window first, then dispatch.
    pub fn recv_data(&self, payload: &[u8], end_stream: bool) -> CallbackState {
        let callback = CallbackState::new();
        self.stream.update_recv_window(-(payload.len() as i32));
        let frame = DataFrame::new(
            self.stream.id(),
            Bytes::copy_from_slice(payload),
            EndStream::from_bool(end_stream),
        );
        self.stream
            .process(StreamFrame::Data(frame), callback.callback());
        callback
    }

    pub fn recv_headers(&self, headers: Headers, end_stream: bool) -> CallbackState {
        let callback = CallbackState::new();
        let frame = HeadersFrame::new(
            self.stream.id(),
            headers,
            HeadersPlace::Initial,
            EndStream::from_bool(end_stream),
        );
        self.stream
            .process(StreamFrame::Headers(frame), callback.callback());
        callback
    }

    /// Trailers always end the stream.
    pub fn recv_trailers(&self, headers: Headers) -> CallbackState {
        let callback = CallbackState::new();
        let frame = HeadersFrame::new(
            self.stream.id(),
            headers,
            HeadersPlace::Trailing,
            EndStream::Yes,
        );
        self.stream
            .process(StreamFrame::Headers(frame), callback.callback());
        callback
    }

    pub fn recv_preface(&self) -> CallbackState {
        let callback = CallbackState::new();
        let frame = PrefaceFrame::new(self.stream.id());
        self.stream
            .process(StreamFrame::Preface(frame), callback.callback());
        callback
    }

    pub fn recv_rst(&self, error_code: ErrorCode) -> CallbackState {
        let callback = CallbackState::new();
        let frame = RstStreamFrame::new(self.stream.id(), error_code);
        self.stream
            .process(StreamFrame::RstStream(frame), callback.callback());
        callback
    }

    /// Deliver a stream-level WINDOW_UPDATE: the session applies the
    /// increment to the send window before dispatching.
    pub fn recv_window_update(&self, increment: u32) -> CallbackState {
        let callback = CallbackState::new();
        self.stream.update_send_window(increment as i32);
        let frame = WindowUpdateFrame::for_stream(self.stream.id(), increment);
        self.stream
            .process(StreamFrame::WindowUpdate(frame), callback.callback());
        callback
    }

    /// Deliver a PUSH_PROMISE to this stream, as if it were the stream the
    /// promise reserved.
    pub fn recv_push_promise(&self, parent_stream_id: StreamId, request: Headers) -> CallbackState {
        let callback = CallbackState::new();
        let frame = PushPromiseFrame::new(parent_stream_id, self.stream.id(), request);
        self.stream
            .process(StreamFrame::PushPromise(frame), callback.callback());
        callback
    }

    pub fn recv_failure(&self, error_code: ErrorCode, reason: &str) -> CallbackState {
        let callback = CallbackState::new();
        let frame = FailureFrame::new(self.stream.id(), error_code, reason);
        self.stream
            .process(StreamFrame::Failure(frame), callback.callback());
        callback
    }
}

/// Poll `condition` until it holds or `timeout` passes.
pub fn wait_for(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
