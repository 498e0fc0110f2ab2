use crate::solicit::stream_id::StreamId;

/// Pseudo-frame dispatched once when the session installs a new stream.
///
/// Not an RFC 7540 wire frame: the session fabricates it so the new-stream
/// notification travels the same dispatch path as real frames.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrefaceFrame {
    pub stream_id: StreamId,
}

impl PrefaceFrame {
    pub fn new(stream_id: StreamId) -> PrefaceFrame {
        PrefaceFrame { stream_id }
    }
}
