use crate::error;

/// A convenience `Result` type with the error variant pinned to
/// [`Error`](error::Error).
pub type Result<T> = std::result::Result<T, error::Error>;
