//! Support code for h2stream tests: a recording session, scripted
//! listeners and a harness wiring one stream to a runtime.

#[macro_use]
extern crate log;

use std::sync::Once;

mod callbacks;
mod harness;
mod session;

pub use self::callbacks::*;
pub use self::harness::*;
pub use self::session::*;

/// Initialize logger for tests. Must be called first in each test.
pub fn init_logger() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        env_logger::init();
    });
}
