// lib.rs - Links between diagram nodes and source code locations.
//
// Selecting a diagram node reveals the code it points at, either through link
// data stored on the node or by resolving a `#tag` in its label against the
// workspace symbol index. A code selection can be attached to the selected node.

pub mod activation;
pub mod config;
pub mod error;
pub mod host;
pub mod position_codec;
pub mod reveal;
pub mod service;
pub mod session;
pub mod symbol_resolver;
// test_utils is available in test builds and when the `test-support` feature is enabled.
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use error::{CodeLinkError, Precondition};
pub use position_codec::{CodeLocation, SerializedLink};
pub use service::{Action, CodeLinkService};
