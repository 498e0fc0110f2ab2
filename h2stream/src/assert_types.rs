//! Utilities to assert types implement certain traits.

#[allow(dead_code)]
pub fn assert_send<T: Send>() {}

#[allow(dead_code)]
pub fn assert_sync<T: Sync>() {}
