/// An alias for the type that represents the ID of an HTTP/2 stream.
pub type StreamId = u32;
