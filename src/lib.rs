//! static-httpd - a small concurrent HTTP/1.x static file server
//!
//! Serves GET and HEAD from a sandboxed document root, with opt-in
//! keep-alive negotiation.

pub mod config;
pub mod http;
pub mod server;
