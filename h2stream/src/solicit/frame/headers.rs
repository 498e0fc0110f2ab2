use crate::solicit::end_stream::EndStream;
use crate::solicit::header::Headers;
use crate::solicit::stream_id::StreamId;

/// Where a header block appears on the stream.
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum HeadersPlace {
    /// The block carries a request or a response.
    Initial,
    /// The block carries trailers; it never declares a content-length.
    Trailing,
}

/// The struct represents the `HEADERS` HTTP/2 frame.
///
/// The header block arrives here already decoded; HPACK and CONTINUATION
/// assembly are the codec's business.
#[derive(Clone, Debug, PartialEq)]
pub struct HeadersFrame {
    pub stream_id: StreamId,
    pub headers: Headers,
    pub place: HeadersPlace,
    pub end_stream: EndStream,
}

impl HeadersFrame {
    pub fn new(
        stream_id: StreamId,
        headers: Headers,
        place: HeadersPlace,
        end_stream: EndStream,
    ) -> HeadersFrame {
        HeadersFrame {
            stream_id,
            headers,
            place,
            end_stream,
        }
    }

    pub fn is_end_stream(&self) -> bool {
        self.end_stream == EndStream::Yes
    }
}
