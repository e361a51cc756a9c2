//! Sync layer: transports that bind the `RemoteStore` contract to a hosted table.

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{RestError, RestStore};
