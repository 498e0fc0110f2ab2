use std::io;
use std::sync::Arc;
use std::time::Duration;

use crate::assert_types::*;
use crate::solicit::error_code::ErrorCode;
use crate::solicit::stream_id::StreamId;

/// An enum representing errors that can arise on a single HTTP/2 stream.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error, reported by the session when a write hits the transport.
    #[error("I/O error: {0}")]
    IoError(#[source] io::Error),

    /// The peer sent more DATA than the stream's receive window allowed.
    #[error("stream {0} exceeded its receive window")]
    StreamWindowExceeded(StreamId),

    /// DATA arrived after the peer already half-closed the stream.
    #[error("DATA on remotely closed stream {0}")]
    DataOnClosedStream(StreamId),

    /// The frame was dropped because the stream is reset.
    #[error("stream {0} was reset")]
    StreamReset(StreamId),

    /// The DATA total does not match the declared `content-length`.
    #[error("DATA on stream {0} does not match the declared content-length")]
    InvalidDataLength(StreamId),

    /// A write was started while another was still in flight.
    #[error("write already pending on stream {0}")]
    WritePending(StreamId),

    /// The stream failed earlier; the original error is shared.
    #[error("stream failed: {0}")]
    StreamFailed(Arc<Error>),

    /// `RST_STREAM` received.
    #[error("RST_STREAM received")]
    RstStreamReceived(ErrorCode),

    /// A stream listener panicked; the panic message is preserved.
    #[error("listener panicked: {0}")]
    HandlerPanicked(String),

    /// The stream idled past its configured timeout.
    #[error("idle timeout {0:?} expired")]
    IdleTimeoutExpired(Duration),

    #[error("internal error: {0}")]
    InternalError(String),
}

fn _assert_error_sync_send() {
    assert_send::<Error>();
    assert_sync::<Error>();
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IoError(err)
    }
}
