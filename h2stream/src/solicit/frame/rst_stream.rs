use crate::solicit::error_code::ErrorCode;
use crate::solicit::stream_id::StreamId;

/// The struct represents the `RST_STREAM` HTTP/2 frame.
#[derive(Clone, Debug, PartialEq)]
pub struct RstStreamFrame {
    pub stream_id: StreamId,
    raw_error_code: u32,
}

impl RstStreamFrame {
    pub fn new(stream_id: StreamId, error_code: ErrorCode) -> RstStreamFrame {
        RstStreamFrame {
            stream_id,
            raw_error_code: error_code.into(),
        }
    }

    /// Constructs an `RstStreamFrame` with the given raw error code.
    pub fn with_raw_error_code(stream_id: StreamId, raw_error_code: u32) -> RstStreamFrame {
        RstStreamFrame {
            stream_id,
            raw_error_code,
        }
    }

    /// Returns the error code, falling back to `InternalError` for codes
    /// this implementation does not know.
    pub fn error_code(&self) -> ErrorCode {
        self.raw_error_code.into()
    }

    /// Returns the original raw error code.
    pub fn raw_error_code(&self) -> u32 {
        self.raw_error_code
    }
}
