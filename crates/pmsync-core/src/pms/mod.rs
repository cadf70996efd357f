//! PMS client layer
//!
//! - `client`: the `PmsClient` capability injected into the reconciler
//! - `http`: generic REST adapter driven by `PmsConfig`
//! - `error`: `PmsError` and its classification

pub mod client;
pub mod error;
pub mod http;

pub use client::PmsClient;
pub use error::{PmsError, PmsErrorCode};
pub use http::HttpPmsClient;
