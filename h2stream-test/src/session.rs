use std::sync::Arc;
use std::sync::Mutex;

use h2stream::CallbackBox;
use h2stream::DataFrame;
use h2stream::ErrorCode;
use h2stream::H2Stream;
use h2stream::PushPromiseFrame;
use h2stream::RstStreamFrame;
use h2stream::Session;
use h2stream::StreamFrame;
use h2stream::StreamId;
use h2stream::StreamListener;
use h2stream::StreamPromise;

#[derive(Default)]
struct TestSessionState {
    frames: Vec<StreamFrame>,
    data: Vec<DataFrame>,
    pushes: Vec<PushPromiseFrame>,
    removed: Vec<StreamId>,
    stream_counts: Vec<(bool, i32, i32)>,
    connection_failures: Vec<(ErrorCode, String)>,
    pending_writes: Vec<CallbackBox>,
}

/// Recording `Session` fake: captures everything the stream under test
/// asks the connection to do, and lets tests complete writes by hand the
/// way a transport would.
pub struct TestSession {
    state: Mutex<TestSessionState>,
}

impl TestSession {
    pub fn new() -> Arc<TestSession> {
        Arc::new(TestSession {
            state: Mutex::new(TestSessionState::default()),
        })
    }

    pub fn sent_frames(&self) -> Vec<StreamFrame> {
        self.state.lock().unwrap().frames.clone()
    }

    /// The RST_STREAM frames among the sent frames, in order.
    pub fn sent_resets(&self) -> Vec<RstStreamFrame> {
        self.state
            .lock()
            .unwrap()
            .frames
            .iter()
            .filter_map(|frame| match frame {
                StreamFrame::RstStream(frame) => Some(frame.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn sent_data(&self) -> Vec<DataFrame> {
        self.state.lock().unwrap().data.clone()
    }

    pub fn pushes(&self) -> Vec<PushPromiseFrame> {
        self.state.lock().unwrap().pushes.clone()
    }

    /// Ids passed to `remove_stream`, in order (removal is idempotent, so
    /// duplicates are possible and recorded as-is).
    pub fn removed(&self) -> Vec<StreamId> {
        self.state.lock().unwrap().removed.clone()
    }

    /// Raw `update_stream_count` calls: `(local, delta_stream, delta_closing)`.
    pub fn stream_counts(&self) -> Vec<(bool, i32, i32)> {
        self.state.lock().unwrap().stream_counts.clone()
    }

    pub fn connection_failures(&self) -> Vec<(ErrorCode, String)> {
        self.state.lock().unwrap().connection_failures.clone()
    }

    pub fn pending_writes(&self) -> usize {
        self.state.lock().unwrap().pending_writes.len()
    }

    /// Complete the oldest pending write, the way the transport's flush
    /// would. Panics if nothing is pending.
    pub fn complete_next_write(&self, result: h2stream::Result<()>) {
        let callback = self.state.lock().unwrap().pending_writes.remove(0);
        match result {
            Ok(()) => callback.succeeded(),
            Err(e) => callback.failed(e),
        }
    }
}

impl Session for TestSession {
    fn frames(&self, _stream: &H2Stream, callback: CallbackBox, frames: Vec<StreamFrame>) {
        let mut state = self.state.lock().unwrap();
        state.frames.extend(frames);
        state.pending_writes.push(callback);
    }

    fn data(&self, _stream: &H2Stream, callback: CallbackBox, frame: DataFrame) {
        let mut state = self.state.lock().unwrap();
        state.data.push(frame);
        state.pending_writes.push(callback);
    }

    fn push(
        &self,
        _stream: &H2Stream,
        _promise: StreamPromise,
        frame: PushPromiseFrame,
        _listener: Arc<dyn StreamListener>,
    ) {
        self.state.lock().unwrap().pushes.push(frame);
    }

    fn remove_stream(&self, stream: &H2Stream) {
        self.state.lock().unwrap().removed.push(stream.id());
    }

    fn update_stream_count(&self, local: bool, delta_stream: i32, delta_closing: i32) {
        self.state
            .lock()
            .unwrap()
            .stream_counts
            .push((local, delta_stream, delta_closing));
    }

    fn on_connection_failure(&self, error_code: ErrorCode, reason: &str) {
        self.state
            .lock()
            .unwrap()
            .connection_failures
            .push((error_code, reason.to_owned()));
    }
}
