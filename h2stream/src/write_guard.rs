use std::sync::Arc;
use std::sync::Mutex;

use crate::callback::CallbackBox;

/// Single outstanding-write slot of one stream.
///
/// A stream allows one write in flight at a time; claiming an occupied
/// slot is a caller programming error, answered by tearing the stream
/// down. The slot is emptied only when the session completes the guarded
/// write, so the caller's callback is delivered exactly once whatever
/// thread the completion lands on.
pub(crate) struct WriteGuard {
    writing: Mutex<Option<CallbackBox>>,
}

impl WriteGuard {
    pub fn new() -> WriteGuard {
        WriteGuard {
            writing: Mutex::new(None),
        }
    }

    /// Claim the slot for a write. On conflict the callback is handed back
    /// so the caller can fail it.
    pub fn claim(&self, callback: CallbackBox) -> Result<(), CallbackBox> {
        let mut slot = self.writing.lock().unwrap();
        if slot.is_some() {
            return Err(callback);
        }
        *slot = Some(callback);
        Ok(())
    }

    /// Empty the slot. `None` when no write was outstanding, which makes a
    /// duplicate completion harmless.
    pub fn end_write(&self) -> Option<CallbackBox> {
        self.writing.lock().unwrap().take()
    }

    /// The callback handed to the session along with a guarded write: it
    /// empties the slot and forwards the outcome to the original caller.
    pub fn completion(self: &Arc<Self>) -> CallbackBox {
        let guard = self.clone();
        Box::new(
            move |result: crate::Result<()>| match (guard.end_write(), result) {
                (Some(callback), Ok(())) => callback.succeeded(),
                (Some(callback), Err(e)) => callback.failed(e),
                (None, _) => {}
            },
        )
    }
}
