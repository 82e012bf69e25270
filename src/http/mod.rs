//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, routes, middleware)
//!     → handlers.rs (inbound logging, path tokens, query)
//!     → forward.rs (outbound path, query passthrough, header copy)
//!     → [upstream client sends the GET]
//!     → response.rs (relay status + body, map local failures)
//!     → Send to client
//! ```

pub mod forward;
pub mod handlers;
pub mod response;
pub mod server;

pub use forward::{copy_headers, ForwardRequest, Pagination};
pub use response::ForwardError;
pub use server::{AppState, HttpServer};
