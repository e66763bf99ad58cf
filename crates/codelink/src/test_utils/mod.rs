//! In-memory host implementations for tests.
//!
//! Available in test builds and with the `test-support` feature, so integration
//! tests can drive a full service without an editor or diagram host.

pub mod fakes;
