use crate::callback::CallbackBox;
use crate::error::Error;
use crate::solicit::error_code::ErrorCode;
use crate::solicit::frame::DataFrame;
use crate::solicit::frame::RstStreamFrame;
use crate::stream::H2Stream;

/// Application side of one stream.
///
/// Registered once, before the first frame is dispatched. Every method is
/// invoked outside the engine's locks and behind a panic boundary: a
/// panicking listener is logged, its callback failed, and the connection
/// keeps running.
///
/// A stream without a listener drives itself: demand is granted one unit
/// at a time and data callbacks succeed immediately, so nothing ever
/// queues up.
pub trait StreamListener: Send + Sync + 'static {
    /// The session installed this stream into its table.
    fn on_new_stream(&self, _stream: &H2Stream) {}

    /// The first DATA frame was queued. Runs once per stream, before any
    /// delivery: the place to register initial demand.
    fn on_before_data(&self, stream: &H2Stream) {
        stream.demand(1);
    }

    /// One DATA frame delivered against one unit of demand. Complete
    /// `callback` once the payload is consumed, and call
    /// [`H2Stream::demand`] again for more.
    fn on_data_demanded(&self, stream: &H2Stream, frame: DataFrame, callback: CallbackBox);

    /// The peer reset the stream.
    fn on_reset(&self, _stream: &H2Stream, _frame: RstStreamFrame, callback: CallbackBox) {
        callback.succeeded();
    }

    /// The stream idled past its timeout. Return true to cancel the stream
    /// with a reset, false to keep it alive for another period.
    fn on_idle_timeout(&self, _stream: &H2Stream, _cause: &Error) -> bool {
        true
    }

    /// Out-of-band failure: the connection is dying and takes the stream
    /// with it.
    fn on_failure(
        &self,
        _stream: &H2Stream,
        _error_code: ErrorCode,
        _reason: &str,
        callback: CallbackBox,
    ) {
        callback.succeeded();
    }

    /// The stream reached its terminal state.
    fn on_closed(&self, _stream: &H2Stream) {}
}
