use crate::solicit::header::Headers;
use crate::solicit::stream_id::StreamId;

/// The struct represents the `PUSH_PROMISE` HTTP/2 frame.
///
/// The session dispatches it to the *promised* stream, which is half-closed
/// locally from birth: a pushed resource only ever flows server to client.
#[derive(Clone, Debug, PartialEq)]
pub struct PushPromiseFrame {
    /// The stream the promise was sent on.
    pub stream_id: StreamId,
    /// The stream reserved for the pushed resource.
    pub promised_stream_id: StreamId,
    /// The promised request, already decoded.
    pub headers: Headers,
}

impl PushPromiseFrame {
    pub fn new(
        stream_id: StreamId,
        promised_stream_id: StreamId,
        headers: Headers,
    ) -> PushPromiseFrame {
        PushPromiseFrame {
            stream_id,
            promised_stream_id,
            headers,
        }
    }
}
