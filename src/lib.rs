//! HTTP request capture service library.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod storage;

pub use config::schema::CaptureConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
