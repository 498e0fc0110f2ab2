use crate::solicit::error_code::ErrorCode;
use crate::solicit::stream_id::StreamId;

/// Pseudo-frame carrying an out-of-band failure into the stream.
///
/// The session dispatches it when the connection dies for a reason the
/// stream never saw on the wire: an I/O error, a GOAWAY teardown.
#[derive(Clone, Debug, PartialEq)]
pub struct FailureFrame {
    pub stream_id: StreamId,
    pub error_code: ErrorCode,
    pub reason: String,
}

impl FailureFrame {
    pub fn new(stream_id: StreamId, error_code: ErrorCode, reason: &str) -> FailureFrame {
        FailureFrame {
            stream_id,
            error_code,
            reason: reason.to_owned(),
        }
    }
}
