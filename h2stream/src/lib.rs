//! Per-stream half of a multiplexed HTTP/2 connection.
//!
//! One [`H2Stream`] tracks a single request/response (or pushed resource)
//! exchange: the half-duplex close handshake of RFC 7540 section 5.1, the
//! per-stream flow control windows, and pull-based delivery of inbound
//! DATA frames driven by application demand. An idle timer, scheduled on a
//! caller-supplied tokio runtime handle, cancels streams nobody touches.
//!
//! The connection side (sockets, codec, HPACK, frame scheduling) lives
//! behind the [`Session`] trait; the application side behind
//! [`StreamListener`]. This crate implements neither: it is the state
//! engine between them.

#![deny(broken_intra_doc_links)]

#[macro_use]
extern crate log;

pub use crate::callback::noop;
pub use crate::callback::CallbackBox;
pub use crate::callback::StreamCallback;
pub use crate::close_state::CloseEvent;
pub use crate::close_state::CloseState;
pub use crate::error::Error;
pub use crate::listener::StreamListener;
pub use crate::result::Result;
pub use crate::session::Session;
pub use crate::solicit::end_stream::EndStream;
pub use crate::solicit::error_code::ErrorCode;
pub use crate::solicit::frame::DataFrame;
pub use crate::solicit::frame::FailureFrame;
pub use crate::solicit::frame::HeadersFrame;
pub use crate::solicit::frame::HeadersPlace;
pub use crate::solicit::frame::PrefaceFrame;
pub use crate::solicit::frame::PriorityFrame;
pub use crate::solicit::frame::PushPromiseFrame;
pub use crate::solicit::frame::RstStreamFrame;
pub use crate::solicit::frame::StreamFrame;
pub use crate::solicit::frame::WindowUpdateFrame;
pub use crate::solicit::header::Header;
pub use crate::solicit::header::Headers;
pub use crate::solicit::stream_id::StreamId;
pub use crate::solicit::DEFAULT_INITIAL_WINDOW_SIZE;
pub use crate::stream::H2Stream;
pub use crate::stream::StreamPromise;

mod solicit;

mod error;
mod result;

mod callback;
mod close_state;
mod data_queue;
mod idle_timeout;
mod listener;
mod session;
mod stream;
mod window;
mod write_guard;

mod assert_types;
mod misc;
