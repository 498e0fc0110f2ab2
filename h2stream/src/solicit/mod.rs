//! Protocol vocabulary of the stream layer: frames, error codes, header
//! containers. No wire codec here; parsing and serialization live in the
//! connection, next to HPACK.

pub(crate) mod end_stream;
pub(crate) mod error_code;
pub mod frame;
pub(crate) mod header;
pub(crate) mod stream_id;

/// Default per-stream flow control window (RFC 7540 section 6.5.2).
/// Sessions seed new streams with this unless SETTINGS negotiated
/// another value.
pub const DEFAULT_INITIAL_WINDOW_SIZE: u32 = 65_535;
