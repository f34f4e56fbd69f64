/// HTTP status codes produced by the server.
///
/// - `Ok` (200): file served
/// - `BadRequest` (400): malformed request or rejected target
/// - `NotFound` (404): no regular file at the target
/// - `InternalServerError` (500): anything unclassified
/// - `NotImplemented` (501): method other than GET or HEAD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
    /// 500 Internal Server Error
    InternalServerError,
    /// 501 Not Implemented
    NotImplemented,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// ```
    /// # use static_httpd::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotImplemented.as_u16(), 501);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::InternalServerError => 500,
            StatusCode::NotImplemented => 501,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
        }
    }
}

/// Response payload.
#[derive(Debug)]
pub enum Body {
    /// No payload, e.g. for HEAD.
    Empty,
    /// Small in-memory payload.
    Bytes(Vec<u8>),
    /// An opened file streamed to the client.
    File(tokio::fs::File, u64),
}

impl Body {
    pub fn len(&self) -> u64 {
        match self {
            Body::Empty => 0,
            Body::Bytes(b) => b.len() as u64,
            Body::File(_, len) => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A complete HTTP response ready to be written.
///
/// Headers keep their insertion order on the wire.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl Response {
    /// Looks up a header value by name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// An error response that closes the connection.
    ///
    /// The body is a one-line plain text rendition of the status.
    pub fn error(status: StatusCode) -> Self {
        let body = format!("{} {}", status.as_u16(), status.reason_phrase());
        ResponseBuilder::new(status)
            .header("Content-Type", "text/plain")
            .header("Connection", "close")
            .body(body.into_bytes())
            .build()
    }
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "text/html")
///     .body(b"<p>hi</p>".to_vec())
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Body,
}

impl ResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Body::Empty,
        }
    }

    /// Adds a header, replacing any earlier header of the same name.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
        {
            Some(slot) => slot.1 = value,
            None => self.headers.push((key, value)),
        }
        self
    }

    /// Sets an in-memory body.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Body::Bytes(body);
        self
    }

    /// Streams `len` bytes of `file` as the body.
    pub fn file(mut self, file: tokio::fs::File, len: u64) -> Self {
        self.body = Body::File(file, len);
        self
    }

    /// Builds the final Response.
    ///
    /// Adds `Content-Length` from the body size unless one was set explicitly,
    /// which is how HEAD responses advertise the length of a body they omit.
    pub fn build(mut self) -> Response {
        if !self
            .headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case("Content-Length"))
        {
            let len = self.body.len().to_string();
            self.headers.push(("Content-Length".to_string(), len));
        }

        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}
