//! HTTP/1.x static file serving.
//!
//! # Architecture
//!
//! - **`connection`**: the per-connection request/response loop
//! - **`parser`**: parses request heads from byte buffers
//! - **`request`**: request representation and case-insensitive headers
//! - **`path`**: maps request targets into the document root
//! - **`keep_alive`**: persistent connection negotiation
//! - **`response`**: response representation with builder pattern
//! - **`writer`**: serializes responses and streams file bodies
//! - **`mime`**: content type lookup
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌──────────────────┐
//!        │ AwaitingRequest  │ ← Read and parse a request head
//!        └──────┬───────────┘
//!               │ Request parsed
//!               ▼
//!        ┌──────────────────┐
//!        │   Responding     │ ← Resolve, negotiate, write
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ 200 and keep-alive → AwaitingRequest
//!               └─ otherwise          → Closed
//! ```
//!
//! Idle timeouts and peer EOF while awaiting a request close the connection
//! without a response. Malformed heads are answered with 400 and close it.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use static_httpd::http::connection::{serve_connection, SessionSettings};
//! use static_httpd::http::path::PathResolver;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Arc::new(SessionSettings::new(PathResolver::new("public")?));
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         tokio::spawn(serve_connection(socket, settings.clone()));
//!     }
//! }
//! ```

pub mod connection;
pub mod keep_alive;
pub mod mime;
pub mod parser;
pub mod path;
pub mod request;
pub mod response;
pub mod writer;
