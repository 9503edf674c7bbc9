//! HTTP front end for mmrag: upload, query, source listing and health
//! routes over a shared document store.

/// HTTP error responses.
pub mod error;
/// Routes, handlers and shared state.
pub mod server;

pub use error::ApiError;
pub use server::{AppState, GatewayServer, QueryRequest, ServerConfig};
