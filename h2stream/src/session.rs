use std::sync::Arc;

use crate::callback::CallbackBox;
use crate::listener::StreamListener;
use crate::solicit::error_code::ErrorCode;
use crate::solicit::frame::DataFrame;
use crate::solicit::frame::PushPromiseFrame;
use crate::solicit::frame::StreamFrame;
use crate::stream::H2Stream;
use crate::stream::StreamPromise;

/// Connection side of a stream: the multiplexer that owns the socket, the
/// frame scheduler and the stream table.
///
/// The stream only ever asks the session to transmit, to account, or to
/// tear the connection down. Transmissions must complete the given
/// callback exactly once, on whatever thread the transport uses. The
/// session is also the one applying [`CloseEvent::BeforeSend`] and
/// [`CloseEvent::AfterSend`] around frames it actually flushes, via
/// [`H2Stream::update_close`].
///
/// [`CloseEvent::BeforeSend`]: crate::CloseEvent::BeforeSend
/// [`CloseEvent::AfterSend`]: crate::CloseEvent::AfterSend
pub trait Session: Send + Sync + 'static {
    /// Queue control frames (HEADERS, RST_STREAM, ...) for transmission.
    fn frames(&self, stream: &H2Stream, callback: CallbackBox, frames: Vec<StreamFrame>);

    /// Queue one DATA frame for transmission, subject to flow control.
    fn data(&self, stream: &H2Stream, callback: CallbackBox, frame: DataFrame);

    /// Reserve a pushed stream rooted at `stream`, transmit the promise
    /// and complete `promise` with the new stream.
    fn push(
        &self,
        stream: &H2Stream,
        promise: StreamPromise,
        frame: PushPromiseFrame,
        listener: Arc<dyn StreamListener>,
    );

    /// Drop a fully closed stream from the stream table. A reset racing a
    /// graceful close may report the same stream twice; removal must be
    /// idempotent.
    fn remove_stream(&self, stream: &H2Stream);

    /// Adjust the connection-wide stream counters: `delta_stream` for
    /// streams alive, `delta_closing` for streams in the `Closing` state.
    fn update_stream_count(&self, local: bool, delta_stream: i32, delta_closing: i32);

    /// A peer violation poisoned the whole connection; the session must
    /// start tearing it down (GOAWAY).
    fn on_connection_failure(&self, error_code: ErrorCode, reason: &str);
}
