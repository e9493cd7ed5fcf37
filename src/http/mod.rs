//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, single catch-all route)
//!     → security::auth (bearer gate, may answer 401)
//!     → capture.rs (read body, build Record, insert)
//!     → response.rs (fixed 200/500 bodies)
//!     → Send to client
//! ```

pub mod capture;
pub mod response;
pub mod server;

pub use capture::{capture_handler, CaptureState};
pub use response::CaptureError;
pub use server::HttpServer;
