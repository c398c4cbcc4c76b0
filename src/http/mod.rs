//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers)
//!     → request.rs (request id in, request id out)
//!     → [no handler for path] → response.rs (404)
//!     → kernel.rs (requirements lookup, body buffering, security pipeline)
//!     → handlers.rs (probes, echoes)
//!     → Send to client
//! ```

pub mod handlers;
pub mod kernel;
pub mod request;
pub mod response;
pub mod server;

pub use request::RequestContext;
pub use response::GatewayError;
pub use server::{AppState, GatewayServer, SharedState};
