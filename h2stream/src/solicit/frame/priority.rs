use crate::solicit::stream_id::StreamId;

/// The struct represents the `PRIORITY` HTTP/2 frame.
///
/// Prioritization belongs to the session's frame scheduler; the frame is
/// part of the stream vocabulary only so that a mis-dispatch fails loudly.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct PriorityFrame {
    pub stream_id: StreamId,
    pub exclusive: bool,
    pub stream_dep: StreamId,
    pub weight: u8,
}

impl PriorityFrame {
    pub fn new(
        stream_id: StreamId,
        exclusive: bool,
        stream_dep: StreamId,
        weight: u8,
    ) -> PriorityFrame {
        PriorityFrame {
            stream_id,
            exclusive,
            stream_dep,
            weight,
        }
    }
}
