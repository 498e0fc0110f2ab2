//! Frames (and session pseudo-frames) dispatched to a single stream.
//!
//! All frames arrive decoded; wire parsing lives in the connection next to
//! HPACK. Connection-scoped frames (SETTINGS, PING, GOAWAY) are not
//! representable here.

pub(crate) mod data;
pub(crate) mod failure;
pub(crate) mod headers;
pub(crate) mod preface;
pub(crate) mod priority;
pub(crate) mod push_promise;
pub(crate) mod rst_stream;
pub(crate) mod window_update;

pub use self::data::DataFrame;
pub use self::failure::FailureFrame;
pub use self::headers::HeadersFrame;
pub use self::headers::HeadersPlace;
pub use self::preface::PrefaceFrame;
pub use self::priority::PriorityFrame;
pub use self::push_promise::PushPromiseFrame;
pub use self::rst_stream::RstStreamFrame;
pub use self::window_update::WindowUpdateFrame;

use crate::solicit::stream_id::StreamId;

/// An enum over every frame kind a session dispatches to one stream.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamFrame {
    Preface(PrefaceFrame),
    Headers(HeadersFrame),
    Data(DataFrame),
    Priority(PriorityFrame),
    RstStream(RstStreamFrame),
    PushPromise(PushPromiseFrame),
    WindowUpdate(WindowUpdateFrame),
    Failure(FailureFrame),
}

impl StreamFrame {
    /// The stream the frame belongs to.
    pub fn stream_id(&self) -> StreamId {
        match self {
            StreamFrame::Preface(f) => f.stream_id,
            StreamFrame::Headers(f) => f.stream_id,
            StreamFrame::Data(f) => f.stream_id,
            StreamFrame::Priority(f) => f.stream_id,
            StreamFrame::RstStream(f) => f.stream_id,
            StreamFrame::PushPromise(f) => f.stream_id,
            StreamFrame::WindowUpdate(f) => f.stream_id,
            StreamFrame::Failure(f) => f.stream_id,
        }
    }
}

impl From<PrefaceFrame> for StreamFrame {
    fn from(frame: PrefaceFrame) -> StreamFrame {
        StreamFrame::Preface(frame)
    }
}

impl From<HeadersFrame> for StreamFrame {
    fn from(frame: HeadersFrame) -> StreamFrame {
        StreamFrame::Headers(frame)
    }
}

impl From<DataFrame> for StreamFrame {
    fn from(frame: DataFrame) -> StreamFrame {
        StreamFrame::Data(frame)
    }
}

impl From<PriorityFrame> for StreamFrame {
    fn from(frame: PriorityFrame) -> StreamFrame {
        StreamFrame::Priority(frame)
    }
}

impl From<RstStreamFrame> for StreamFrame {
    fn from(frame: RstStreamFrame) -> StreamFrame {
        StreamFrame::RstStream(frame)
    }
}

impl From<PushPromiseFrame> for StreamFrame {
    fn from(frame: PushPromiseFrame) -> StreamFrame {
        StreamFrame::PushPromise(frame)
    }
}

impl From<WindowUpdateFrame> for StreamFrame {
    fn from(frame: WindowUpdateFrame) -> StreamFrame {
        StreamFrame::WindowUpdate(frame)
    }
}

impl From<FailureFrame> for StreamFrame {
    fn from(frame: FailureFrame) -> StreamFrame {
        StreamFrame::Failure(frame)
    }
}
