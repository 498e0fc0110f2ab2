use crate::solicit::stream_id::StreamId;

/// The struct represents the `WINDOW_UPDATE` HTTP/2 frame.
///
/// Stream-scoped only: connection-level window updates (stream 0) never
/// reach a stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowUpdateFrame {
    pub stream_id: StreamId,
    pub increment: u32,
}

impl WindowUpdateFrame {
    pub fn for_stream(stream_id: StreamId, increment: u32) -> WindowUpdateFrame {
        WindowUpdateFrame {
            stream_id,
            increment,
        }
    }
}
