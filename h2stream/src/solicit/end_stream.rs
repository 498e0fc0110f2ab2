/// An enum indicating whether the HTTP/2 frame bears the END_STREAM flag.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum EndStream {
    /// The frame ends the stream in its direction.
    Yes,
    /// The frame does not end the stream.
    No,
}

impl EndStream {
    pub fn from_bool(end_stream: bool) -> EndStream {
        if end_stream {
            EndStream::Yes
        } else {
            EndStream::No
        }
    }
}
