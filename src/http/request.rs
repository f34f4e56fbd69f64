use std::collections::HashMap;

/// HTTP request methods.
///
/// The parser accepts every method in this set; which ones are actually
/// served is decided by the connection loop (GET and HEAD only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// PATCH - Partial modification of a resource
    PATCH,
    /// CONNECT - Establish a tunnel
    CONNECT,
    /// TRACE - Loop-back test
    TRACE,
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// Method tokens are case-sensitive, so `"get"` is not a method.
    ///
    /// ```
    /// # use static_httpd::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("get"), None);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "HEAD" => Some(Method::HEAD),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "OPTIONS" => Some(Method::OPTIONS),
            "PATCH" => Some(Method::PATCH),
            "CONNECT" => Some(Method::CONNECT),
            "TRACE" => Some(Method::TRACE),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::CONNECT => "CONNECT",
            Method::TRACE => "TRACE",
        }
    }
}

/// Request header map with case-insensitive names.
///
/// Names are folded to lowercase on insert and lookup. A repeated header
/// replaces the earlier value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    inner: HashMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.inner.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .get(&name.to_ascii_lowercase())
            .map(|v| v.as_str())
    }
}

/// A parsed HTTP request head.
///
/// Built once by the parser and never mutated afterwards; the connection loop
/// drops it as soon as the matching response has been written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    target: String,
    version: String,
    headers: Headers,
}

impl Request {
    pub(crate) fn new(method: Method, target: String, version: String, headers: Headers) -> Self {
        Self {
            method,
            target,
            version,
            headers,
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// The raw request target exactly as it appeared on the request line.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The protocol version token, e.g. `"HTTP/1.1"`.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Retrieves a header value by name, case-insensitively.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    /// Major and minor protocol version numbers.
    ///
    /// The parser only admits `HTTP/<digit>.<digit>`, so this never fails for
    /// parsed requests; hand-built requests with odd versions map to `(0, 0)`.
    pub fn version_numbers(&self) -> (u8, u8) {
        let digits = self.version.strip_prefix("HTTP/").unwrap_or("");
        match digits.as_bytes() {
            [major, b'.', minor] if major.is_ascii_digit() && minor.is_ascii_digit() => {
                (major - b'0', minor - b'0')
            }
            _ => (0, 0),
        }
    }

    /// Whether the protocol version is older than HTTP/1.1.
    pub fn is_legacy_version(&self) -> bool {
        self.version_numbers() < (1, 1)
    }

    /// The version to put on the status line of the response.
    pub fn response_version(&self) -> &'static str {
        if self.version_numbers() == (1, 0) {
            "HTTP/1.0"
        } else {
            "HTTP/1.1"
        }
    }
}

/// Builder for constructing Request objects outside the parser.
pub struct RequestBuilder {
    method: Option<Method>,
    target: Option<String>,
    version: Option<String>,
    headers: Headers,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            target: None,
            version: None,
            headers: Headers::new(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        Ok(Request {
            method: self.method.ok_or("method missing")?,
            target: self.target.ok_or("target missing")?,
            version: self.version.unwrap_or_else(|| "HTTP/1.1".to_string()),
            headers: self.headers,
        })
    }
}
