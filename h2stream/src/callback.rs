//! Completion callbacks for stream operations.

use std::sync::Arc;
use std::sync::Mutex;

use crate::error::Error;

/// Completion callback of a single stream operation.
///
/// Completed exactly once, on whatever thread finished the operation.
pub trait StreamCallback: Send + 'static {
    /// The operation completed.
    fn succeeded(self: Box<Self>);
    /// The operation failed.
    fn failed(self: Box<Self>, error: Error);
}

/// Boxed callback, the form every engine entry point takes.
pub type CallbackBox = Box<dyn StreamCallback>;

impl<F> StreamCallback for F
where
    F: FnOnce(crate::Result<()>) + Send + 'static,
{
    fn succeeded(self: Box<Self>) {
        (*self)(Ok(()))
    }

    fn failed(self: Box<Self>, error: Error) {
        (*self)(Err(error))
    }
}

/// Callback that ignores the outcome.
pub fn noop() -> CallbackBox {
    Box::new(|_: crate::Result<()>| {})
}

/// One completion slot shared between application code and the engine.
///
/// The callback handed to a listener and the engine's post-panic cleanup
/// complete through the same slot: whichever side runs first wins, the
/// other becomes a no-op.
#[derive(Clone)]
pub(crate) struct FusedCallback {
    slot: Arc<Mutex<Option<CallbackBox>>>,
}

impl FusedCallback {
    pub fn new(callback: CallbackBox) -> FusedCallback {
        FusedCallback {
            slot: Arc::new(Mutex::new(Some(callback))),
        }
    }

    fn take(&self) -> Option<CallbackBox> {
        self.slot.lock().unwrap().take()
    }

    /// The half to pass into application code.
    pub fn to_box(&self) -> CallbackBox {
        let fused = self.clone();
        Box::new(move |result: crate::Result<()>| match (fused.take(), result) {
            (Some(callback), Ok(())) => callback.succeeded(),
            (Some(callback), Err(e)) => callback.failed(e),
            (None, _) => {}
        })
    }

    /// Fail the underlying callback unless application code already
    /// completed it.
    pub fn failed(&self, error: Error) {
        if let Some(callback) = self.take() {
            callback.failed(error);
        }
    }
}
