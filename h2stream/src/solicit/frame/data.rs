use bytes::Bytes;

use crate::solicit::end_stream::EndStream;
use crate::solicit::stream_id::StreamId;

/// The struct represents the `DATA` HTTP/2 frame.
///
/// Carries the payload only; padding is stripped by the connection's codec
/// before the frame reaches the stream.
#[derive(Clone, Debug, PartialEq)]
pub struct DataFrame {
    pub stream_id: StreamId,
    pub data: Bytes,
    pub end_stream: EndStream,
}

impl DataFrame {
    pub fn new(stream_id: StreamId, data: Bytes, end_stream: EndStream) -> DataFrame {
        DataFrame {
            stream_id,
            data,
            end_stream,
        }
    }

    /// Payload size in bytes, as accounted by flow control.
    pub fn payload_len(&self) -> usize {
        self.data.len()
    }

    pub fn is_end_stream(&self) -> bool {
        self.end_stream == EndStream::Yes
    }
}
