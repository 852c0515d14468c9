//! Offline-first request handling for the application's own resources.
//!
//! Same-origin GET requests are answered from a version-tagged response
//! cache when possible, fetched and stored otherwise, and answered with a
//! synthetic 503 when the network is gone and nothing is cached. Everything
//! else goes straight to the network.

mod layer;
mod network;

pub use layer::{InterceptHandle, Lifecycle};
pub use network::{FetchError, HttpNetwork, Network, Request};
