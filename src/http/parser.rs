use crate::http::request::{Headers, Method, Request};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("malformed request line")]
    MalformedRequestLine,
    #[error("unknown method {0:?}")]
    UnknownMethod(String),
    /// Carries the version from the request line, which did parse.
    #[error("malformed header line")]
    MalformedHeaderLine(String),
    #[error("request head exceeds {0} bytes")]
    HeadTooLarge(usize),
    #[error("incomplete request head")]
    Incomplete,
}

impl ParseError {
    /// The version to answer the rejected request with.
    pub fn response_version(&self) -> &'static str {
        match self {
            ParseError::MalformedHeaderLine(version) if version == "HTTP/1.0" => "HTTP/1.0",
            _ => "HTTP/1.1",
        }
    }
}

/// Parses one request head (request line, headers, empty line) from `buf`.
///
/// Returns the request and the number of bytes consumed, or
/// `ParseError::Incomplete` when the terminating empty line has not arrived.
pub fn parse_http_request(buf: &[u8]) -> Result<(Request, usize), ParseError> {
    parse_head(buf, false)
}

/// Like [`parse_http_request`], but the peer has closed its side: whatever is
/// buffered is the whole head, even without a terminating empty line.
pub fn parse_http_request_at_eof(buf: &[u8]) -> Result<(Request, usize), ParseError> {
    parse_head(buf, true)
}

fn parse_head(buf: &[u8], at_eof: bool) -> Result<(Request, usize), ParseError> {
    let mut pos = skip_empty_lines(buf);

    let request_line = match next_line(buf, pos) {
        Some((line, next)) => {
            pos = next;
            line
        }
        None if at_eof && pos < buf.len() => {
            let line = trim_cr(&buf[pos..]);
            pos = buf.len();
            line
        }
        None if at_eof => return Err(ParseError::MalformedRequestLine),
        None => return Err(ParseError::Incomplete),
    };

    let (method, target, version) = parse_request_line(request_line)?;

    let mut headers = Headers::new();
    loop {
        match next_line(buf, pos) {
            Some((line, next)) => {
                pos = next;
                if line.is_empty() {
                    break;
                }
                parse_header_line(line, &version, &mut headers)?;
            }
            None if at_eof => {
                let rest = trim_cr(&buf[pos..]);
                if !rest.is_empty() {
                    parse_header_line(rest, &version, &mut headers)?;
                }
                pos = buf.len();
                break;
            }
            None => return Err(ParseError::Incomplete),
        }
    }

    Ok((Request::new(method, target, version, headers), pos))
}

fn parse_request_line(line: &[u8]) -> Result<(Method, String, String), ParseError> {
    let line = std::str::from_utf8(line).map_err(|_| ParseError::MalformedRequestLine)?;

    let parts: Vec<&str> = line.split(' ').collect();
    let [method_str, target, version] = parts.as_slice() else {
        return Err(ParseError::MalformedRequestLine);
    };

    if method_str.is_empty() || target.is_empty() || !is_http_version(version) {
        return Err(ParseError::MalformedRequestLine);
    }
    if !method_str.bytes().all(is_token_byte) {
        return Err(ParseError::MalformedRequestLine);
    }

    let method = Method::from_str(method_str)
        .ok_or_else(|| ParseError::UnknownMethod(method_str.to_string()))?;

    Ok((method, target.to_string(), version.to_string()))
}

fn parse_header_line(line: &[u8], version: &str, headers: &mut Headers) -> Result<(), ParseError> {
    let malformed = || ParseError::MalformedHeaderLine(version.to_string());

    let line = std::str::from_utf8(line).map_err(|_| malformed())?;

    let (name, value) = line.split_once(':').ok_or_else(malformed)?;

    if name.is_empty() || !name.bytes().all(is_token_byte) {
        return Err(malformed());
    }

    headers.insert(name, value.trim());
    Ok(())
}

fn is_http_version(s: &str) -> bool {
    match s.strip_prefix("HTTP/").map(str::as_bytes) {
        Some([major, b'.', minor]) => major.is_ascii_digit() && minor.is_ascii_digit(),
        _ => false,
    }
}

// RFC 7230 tchar
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

/// Returns the line starting at `pos` without its terminator, and the offset
/// just past the terminating LF. Accepts CRLF and bare LF.
fn next_line(buf: &[u8], pos: usize) -> Option<(&[u8], usize)> {
    let rest = buf.get(pos..)?;
    let lf = rest.iter().position(|&b| b == b'\n')?;
    Some((trim_cr(&rest[..lf]), pos + lf + 1))
}

fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn skip_empty_lines(buf: &[u8]) -> usize {
    let mut pos = 0;
    while let Some((line, next)) = next_line(buf, pos) {
        if !line.is_empty() {
            break;
        }
        pos = next;
    }
    pos
}
