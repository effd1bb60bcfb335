//! Transport layer for emolet.
//!
//! Currently provides HTTP transport via axum; the reconciliation pattern
//! generalizes to any request/response boundary.

pub mod http;

pub use http::{ServerConfig, serve};
