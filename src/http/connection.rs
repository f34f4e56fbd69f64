use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::keep_alive::{self, KeepAliveDecision};
use crate::http::mime::{ExtensionMime, MimeLookup};
use crate::http::parser::{ParseError, parse_http_request, parse_http_request_at_eof};
use crate::http::path::{PathResolver, ResolveError};
use crate::http::request::{Method, Request};
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::http::writer::ResponseWriter;

/// Default limit for the size of a request head.
pub const DEFAULT_MAX_HEADER_BYTES: usize = 8 * 1024;

const READ_CHUNK: usize = 4096;

/// Everything a session needs besides its stream. Shared read-only between
/// all sessions.
pub struct SessionSettings {
    pub resolver: PathResolver,
    pub mime: Arc<dyn MimeLookup>,
    /// Read timeout in effect before any client asks for another one.
    pub idle_timeout: Option<Duration>,
    pub max_header_bytes: usize,
}

impl SessionSettings {
    pub fn new(resolver: PathResolver) -> Self {
        Self {
            resolver,
            mime: Arc::new(ExtensionMime),
            idle_timeout: None,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
        }
    }

    pub fn with_mime(mut self, mime: Arc<dyn MimeLookup>) -> Self {
        self.mime = mime;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_max_header_bytes(mut self, limit: usize) -> Self {
        self.max_header_bytes = limit;
        self
    }
}

/// Why a request did not get a 200.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error(transparent)]
    BadRequest(#[from] ParseError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("no file at {}", .0.display())]
    NotFound(PathBuf),
    #[error("method {0} not implemented")]
    UnsupportedMethod(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ServeError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServeError::BadRequest(ParseError::UnknownMethod(_)) => StatusCode::NotImplemented,
            ServeError::BadRequest(_) | ServeError::Resolve(_) => StatusCode::BadRequest,
            ServeError::NotFound(_) => StatusCode::NotFound,
            ServeError::UnsupportedMethod(_) => StatusCode::NotImplemented,
            ServeError::Io(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
                ) =>
            {
                StatusCode::NotFound
            }
            ServeError::Io(_) => StatusCode::InternalServerError,
        }
    }
}

pub enum ConnectionState {
    AwaitingRequest,
    Responding(Request),
    Closed,
}

enum ReadOutcome {
    Request(Request),
    Malformed(ParseError),
    PeerClosed,
    TimedOut,
}

/// One accepted connection and its request/response loop.
pub struct Connection<S> {
    stream: S,
    buffer: BytesMut,
    state: ConnectionState,
    request_count: u64,
    read_timeout: Option<Duration>,
    settings: Arc<SessionSettings>,
}

/// Runs the whole session on `stream` and shuts the stream down afterwards,
/// however the loop ended.
pub async fn serve_connection<S>(stream: S, settings: Arc<SessionSettings>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut conn = Connection::new(stream, settings);
    if let Err(e) = conn.run().await {
        tracing::warn!(error = %e, "Connection error");
    }
    conn.close().await;
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, settings: Arc<SessionSettings>) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            state: ConnectionState::AwaitingRequest,
            request_count: 1,
            read_timeout: settings.idle_timeout,
            settings,
        }
    }

    /// Number of the request currently being (or next to be) serviced.
    pub fn request_count(&self) -> u64 {
        self.request_count
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// Drives the request/response loop until the connection should close.
    ///
    /// Errors are I/O failures while reading; every other failure has already
    /// been answered with an error response.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::AwaitingRequest => match self.read_request().await? {
                    ReadOutcome::Request(request) => {
                        self.state = ConnectionState::Responding(request);
                    }
                    ReadOutcome::Malformed(e) => {
                        let version = e.response_version();
                        self.respond_with_error(&ServeError::from(e), version).await;
                    }
                    ReadOutcome::PeerClosed => {
                        tracing::debug!(request_count = self.request_count, "Peer closed connection");
                    }
                    ReadOutcome::TimedOut => {
                        tracing::info!(
                            timeout = ?self.read_timeout,
                            request_count = self.request_count,
                            "Socket timed out, closing"
                        );
                    }
                },

                ConnectionState::Responding(request) => {
                    if self.respond(request).await {
                        self.request_count += 1;
                        self.state = ConnectionState::AwaitingRequest;
                    }
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Shuts the stream down and drops it.
    pub async fn close(mut self) {
        if let Err(e) = self.stream.shutdown().await {
            tracing::debug!(error = %e, "Error shutting down stream");
        }
    }

    async fn read_request(&mut self) -> io::Result<ReadOutcome> {
        loop {
            if !self.buffer.is_empty() {
                match parse_http_request(&self.buffer) {
                    Ok((request, consumed)) => {
                        if let Some(outcome) = self.head_too_large(consumed) {
                            return Ok(outcome);
                        }
                        self.buffer.advance(consumed);
                        return Ok(ReadOutcome::Request(request));
                    }
                    Err(ParseError::Incomplete) => {}
                    Err(e) => return Ok(ReadOutcome::Malformed(e)),
                }

                if let Some(outcome) = self.head_too_large(self.buffer.len()) {
                    return Ok(outcome);
                }
            }

            self.buffer.reserve(READ_CHUNK);
            let read = self.stream.read_buf(&mut self.buffer);
            let n = match self.read_timeout {
                Some(limit) => match tokio::time::timeout(limit, read).await {
                    Ok(res) => res?,
                    Err(_) => return Ok(ReadOutcome::TimedOut),
                },
                None => read.await?,
            };

            if n == 0 {
                return Ok(self.read_at_eof());
            }
        }
    }

    fn read_at_eof(&mut self) -> ReadOutcome {
        if self.buffer.iter().all(|b| matches!(b, b'\r' | b'\n')) {
            return ReadOutcome::PeerClosed;
        }

        match parse_http_request_at_eof(&self.buffer) {
            Ok((request, consumed)) => {
                if let Some(outcome) = self.head_too_large(consumed) {
                    return outcome;
                }
                self.buffer.advance(consumed);
                ReadOutcome::Request(request)
            }
            Err(e) => ReadOutcome::Malformed(e),
        }
    }

    /// Rejects a head of `len` bytes if it is over the configured limit,
    /// whether or not it is complete yet.
    fn head_too_large(&self, len: usize) -> Option<ReadOutcome> {
        let limit = self.settings.max_header_bytes;
        (len > limit).then(|| ReadOutcome::Malformed(ParseError::HeadTooLarge(limit)))
    }

    /// Answers one request. Returns whether the connection stays open.
    async fn respond(&mut self, request: Request) -> bool {
        tracing::info!(
            method = request.method().as_str(),
            request_target = request.target(),
            version = request.version(),
            request_count = self.request_count,
            "Request received"
        );

        let version = request.response_version();
        let (response, keep_alive) = match self.handle_request(&request).await {
            Ok((response, decision)) => {
                if let Some(timeout) = decision.socket_timeout {
                    tracing::debug!(?timeout, "Applying Keep-Alive idle timeout");
                    self.read_timeout = Some(timeout);
                }
                (response, decision.enabled)
            }
            Err(e) => {
                tracing::warn!(
                    method = request.method().as_str(),
                    request_target = request.target(),
                    error = %e,
                    "Request failed"
                );
                (Response::error(e.status()), false)
            }
        };

        let status = response.status;
        if let Err(e) = ResponseWriter::new(response, version)
            .write_to_stream(&mut self.stream)
            .await
        {
            tracing::warn!(status = status.as_u16(), error = %e, "Failed to write response");
            return false;
        }

        tracing::info!(status = status.as_u16(), keep_alive, "Response sent");
        keep_alive
    }

    async fn respond_with_error(&mut self, error: &ServeError, version: &str) {
        tracing::warn!(error = %error, "Rejecting request");

        let status = error.status();
        if let Err(e) = ResponseWriter::new(Response::error(status), version)
            .write_to_stream(&mut self.stream)
            .await
        {
            tracing::warn!(status = status.as_u16(), error = %e, "Failed to write response");
        }
    }

    async fn handle_request(
        &self,
        request: &Request,
    ) -> Result<(Response, KeepAliveDecision), ServeError> {
        let method = request.method();
        if !matches!(method, Method::GET | Method::HEAD) {
            return Err(ServeError::UnsupportedMethod(method.as_str().to_string()));
        }

        let path = self.settings.resolver.resolve(request.target())?;

        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ServeError::NotFound(path));
            }
            Err(e) => return Err(e.into()),
        };
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(ServeError::NotFound(path));
        }

        let decision = keep_alive::negotiate(request, self.request_count, self.read_timeout);

        let len = metadata.len();
        let content_type = self.settings.mime.content_type(&path);
        tracing::debug!(
            path = %path.display(),
            content_type = %content_type,
            content_length = len,
            "Serving file"
        );

        let builder = ResponseBuilder::new(StatusCode::Ok)
            .header("Content-Type", content_type)
            .header("Content-Length", len.to_string())
            .header("Date", httpdate::fmt_http_date(SystemTime::now()))
            .header("Connection", decision.connection_header());

        let response = match method {
            Method::GET => builder.file(file, len).build(),
            _ => builder.build(),
        };

        Ok((response, decision))
    }
}
