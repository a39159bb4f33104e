//! A minimal HTTP/1.1 request writer and response reader.
//!
//! Only what the handshake needs is supported: one request in flight, bodies delimited by
//! `Content-Length` or by the end of the stream, and no transfer encodings.


use std::fmt;
use std::io::{self, BufRead, Read, Write};

use tracing::trace;

use crate::error::{Error, ProtocolError};


/// The authentication scheme name used in `Authorization` and `WWW-Authenticate` headers.
pub const AUTH_SCHEME: &str = "NTLM";

/// The longest status or header line accepted, excluding the line terminator.
pub const MAX_LINE_LEN: usize = 8 * 1024;

/// The size of the window in which bodies are read.
const BODY_CHUNK_LEN: usize = 1024;


/// The request methods supported by a [`Connection`](crate::Connection).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Method {
    Get,
    Post,
    Head,
}
impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Head => "HEAD",
        }
    }

    /// Whether a response to this method carries a body.
    pub fn expects_response_body(&self) -> bool {
        !matches!(self, Self::Head)
    }
}
impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


/// HTTP header fields.
///
/// Names are compared case-insensitively but written as they were first given; a field may have
/// multiple values, each of which is written on its own line. Fields keep their insertion order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}
impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Sets the field to a single value, replacing any previous values.
    pub fn insert(&mut self, name: &str, value: &str) {
        match self.position(name) {
            Some(i) => self.entries[i].1 = vec![value.to_owned()],
            None => self.entries.push((name.to_owned(), vec![value.to_owned()])),
        }
    }

    /// Adds a value to the field, keeping any previous values.
    pub fn append(&mut self, name: &str, value: &str) {
        match self.position(name) {
            Some(i) => self.entries[i].1.push(value.to_owned()),
            None => self.entries.push((name.to_owned(), vec![value.to_owned()])),
        }
    }

    /// Removes the field, returning its values.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.position(name)
            .map(|i| self.entries.remove(i).1)
    }

    /// Returns the first value of the field.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first()
            .map(|v| v.as_str())
    }

    /// Returns all values of the field.
    pub fn get_all(&self, name: &str) -> &[String] {
        match self.position(name) {
            Some(i) => &self.entries[i].1,
            None => &[],
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Iterates over the fields and their values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter()
            .map(|(n, vs)| (n.as_str(), vs.as_slice()))
    }

    /// The number of distinct fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
impl<N: AsRef<str>, V: AsRef<str>> FromIterator<(N, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.append(name.as_ref(), value.as_ref());
        }
        headers
    }
}


/// An HTTP request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Request {
    pub method: Method,

    /// Path and query of the requested resource.
    pub target: String,

    pub headers: Headers,

    /// The body; if present, a `Content-Length` header is sent, even for an empty body.
    pub body: Option<Vec<u8>>,
}
impl Request {
    pub fn new(method: Method, target: &str) -> Self {
        Self {
            method,
            target: target.to_owned(),
            headers: Headers::new(),
            body: None,
        }
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}


/// An HTTP response.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: Headers,

    /// The body; empty for responses to HEAD requests and responses with `Content-Length: 0`.
    pub body: Vec<u8>,

    /// The NTLM token from a `WWW-Authenticate: NTLM <token>` header, if any.
    pub challenge: Option<String>,
}


/// Writes a request onto the stream.
///
/// `host` is sent in the `Host` header and the body length in the `Content-Length` header;
/// values for these fields in `request.headers` are ignored.
pub fn write_request<W: Write>(writer: &mut W, host: &str, request: &Request) -> io::Result<()> {
    let mut head = String::new();
    head.push_str(&format!("{} {} HTTP/1.1\r\n", request.method, request.target));
    head.push_str(&format!("Host: {}\r\n", host));
    for (name, values) in request.headers.iter() {
        if name.eq_ignore_ascii_case("Host") || name.eq_ignore_ascii_case("Content-Length") {
            continue;
        }
        for value in values {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
    }
    if let Some(body) = &request.body {
        head.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    head.push_str("\r\n");

    trace!(method = %request.method, target = %request.target, header_count = request.headers.len(), "sending request");

    writer.write_all(head.as_bytes())?;
    if let Some(body) = &request.body {
        writer.write_all(body)?;
    }
    writer.flush()
}


/// Reads a single line, without its terminator. Returns `None` at the end of the stream.
fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<String>, Error> {
    let mut buf = Vec::new();
    let limit = (MAX_LINE_LEN + 2) as u64;
    let read = reader.by_ref()
        .take(limit)
        .read_until(b'\n', &mut buf)?;
    if read == 0 {
        return Ok(None);
    }

    if buf.ends_with(b"\n") {
        buf.pop();
        if buf.ends_with(b"\r") {
            buf.pop();
        }
    }
    if buf.len() > MAX_LINE_LEN {
        return Err(ProtocolError::LineTooLong { limit: MAX_LINE_LEN }.into());
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

/// Extracts the token from a `WWW-Authenticate` value of the form `NTLM <token>`.
fn challenge_token(value: &str) -> Option<String> {
    let (scheme, rest) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case(AUTH_SCHEME) {
        return None;
    }
    let token = rest.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_owned())
    }
}

fn read_body<R: Read>(reader: &mut R, content_length: Option<u64>) -> io::Result<Vec<u8>> {
    let mut body = Vec::new();
    let mut chunk = [0u8; BODY_CHUNK_LEN];
    loop {
        let want = match content_length {
            Some(length) => {
                let remaining = length.saturating_sub(body.len() as u64);
                if remaining == 0 {
                    break;
                }
                remaining.min(BODY_CHUNK_LEN as u64) as usize
            },
            None => BODY_CHUNK_LEN,
        };

        let read = match reader.read(&mut chunk[..want]) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if read == 0 {
            if let Some(length) = content_length {
                trace!(expected = length, obtained = body.len(), "stream ended before the declared body length");
            }
            break;
        }
        body.extend_from_slice(&chunk[..read]);
    }
    Ok(body)
}


/// Reads a response from the stream.
///
/// The body is only read if `expect_body` is set and the response does not declare a length of
/// zero; without a declared length, it extends to the end of the stream.
pub fn read_response<R: BufRead>(reader: &mut R, expect_body: bool) -> Result<Response, Error> {
    let status_line = read_line(reader)?
        .ok_or(ProtocolError::ConnectionClosed)?;
    let status: u16 = status_line.split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| ProtocolError::InvalidStatusLine { line: status_line.clone() })?;
    trace!(status, "received status line");

    let mut headers = Headers::new();
    let mut challenge = None;
    while let Some(line) = read_line(reader)? {
        if line.is_empty() {
            break;
        }
        let (name, value) = line.split_once(": ")
            .or_else(|| line.split_once(':'))
            .ok_or_else(|| ProtocolError::MalformedHeader { line: line.clone() })?;
        let value = value.trim();

        if name.eq_ignore_ascii_case("WWW-Authenticate") && challenge.is_none() {
            challenge = challenge_token(value);
        }
        headers.append(name, value);
    }
    trace!(header_count = headers.len(), has_challenge = challenge.is_some(), "received headers");

    let body = if expect_body {
        let content_length = match headers.get("Content-Length") {
            Some(value) => Some(
                value.trim().parse::<u64>()
                    .map_err(|_| ProtocolError::InvalidContentLength { value: value.to_owned() })?
            ),
            None => None,
        };
        if content_length == Some(0) {
            Vec::new()
        } else {
            if let Some(encoding) = headers.get("Transfer-Encoding") {
                if !encoding.trim().eq_ignore_ascii_case("identity") {
                    return Err(ProtocolError::UnsupportedTransferEncoding { value: encoding.to_owned() }.into());
                }
            }
            read_body(reader, content_length)?
        }
    } else {
        Vec::new()
    };

    Ok(Response {
        status,
        headers,
        body,
        challenge,
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read(raw: &str, expect_body: bool) -> Result<Response, Error> {
        let mut cursor = Cursor::new(raw.as_bytes().to_vec());
        read_response(&mut cursor, expect_body)
    }

    #[test]
    fn request_line_host_and_headers() {
        let mut headers = Headers::new();
        headers.insert("Content-Type", "text/xml");
        headers.append("Accept", "text/xml");
        headers.append("accept", "application/xml");
        headers.insert("Host", "ignored.example");
        let request = Request::new(Method::Get, "/sites/a/_vti_bin/Lists.asmx?WSDL")
            .with_headers(headers);

        let mut out = Vec::new();
        write_request(&mut out, "sp.example", &request).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "GET /sites/a/_vti_bin/Lists.asmx?WSDL HTTP/1.1\r\n\
             Host: sp.example\r\n\
             Content-Type: text/xml\r\n\
             Accept: text/xml\r\n\
             Accept: application/xml\r\n\
             \r\n",
        );
    }

    #[test]
    fn body_gets_computed_content_length() {
        let mut headers = Headers::new();
        headers.insert("Content-Length", "999");
        let request = Request::new(Method::Post, "/x")
            .with_headers(headers)
            .with_body(b"hello".to_vec());

        let mut out = Vec::new();
        write_request(&mut out, "h", &request).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "POST /x HTTP/1.1\r\nHost: h\r\nContent-Length: 5\r\n\r\nhello",
        );

        let probe = Request::new(Method::Post, "/x").with_body(Vec::new());
        let mut out = Vec::new();
        write_request(&mut out, "h", &probe).unwrap();
        assert!(String::from_utf8(out).unwrap().ends_with("Content-Length: 0\r\n\r\n"));
    }

    #[test]
    fn response_with_length_delimited_body() {
        let response = read(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\n\r\nhelloEXTRA",
            true,
        ).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.headers.get("content-type"), Some("text/plain"));
        assert_eq!(response.body, b"hello".to_vec());
        assert_eq!(response.challenge, None);
    }

    #[test]
    fn response_body_until_end_of_stream() {
        let body = "x".repeat(3000);
        let raw = format!("HTTP/1.0 200 OK\r\nConnection: close\r\n\r\n{}", body);
        let response = read(&raw, true).unwrap();
        assert_eq!(response.body.len(), 3000);
    }

    #[test]
    fn zero_content_length_means_empty_body() {
        for expect_body in [true, false] {
            let response = read("HTTP/1.1 204 No Content\r\nContent-Length: 0\r\n\r\ntrailing", expect_body).unwrap();
            assert!(response.body.is_empty());
        }
    }

    #[test]
    fn head_response_body_is_not_read() {
        let raw = "HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nHTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n";
        let mut cursor = Cursor::new(raw.as_bytes().to_vec());
        let head = read_response(&mut cursor, false).unwrap();
        assert_eq!(head.status, 200);
        assert!(head.body.is_empty());
        assert_eq!(head.headers.get("Content-Length"), Some("5"));

        // the next response starts immediately after the headers
        let next = read_response(&mut cursor, true).unwrap();
        assert_eq!(next.status, 404);
    }

    #[test]
    fn repeated_headers_accumulate() {
        let response = read(
            "HTTP/1.1 401 Unauthorized\r\nWWW-Authenticate: Negotiate\r\nWWW-Authenticate: NTLM\r\nContent-Length: 0\r\n\r\n",
            true,
        ).unwrap();
        assert_eq!(response.status, 401);
        assert_eq!(response.headers.get_all("www-authenticate"), &["Negotiate".to_owned(), "NTLM".to_owned()]);
        assert_eq!(response.challenge, None);
    }

    #[test]
    fn challenge_token_is_captured() {
        let response = read(
            "HTTP/1.1 401 Unauthorized\r\nWWW-Authenticate: Negotiate\r\nWww-Authenticate: NTLM TlRMTVNTUAACAAAA\r\nContent-Length: 0\r\n\r\n",
            true,
        ).unwrap();
        assert_eq!(response.challenge.as_deref(), Some("TlRMTVNTUAACAAAA"));
    }

    #[test]
    fn bad_status_lines_are_rejected() {
        assert!(matches!(
            read("HTTP/1.1 OK\r\n\r\n", true),
            Err(Error::Protocol(ProtocolError::InvalidStatusLine { .. })),
        ));
        assert!(matches!(
            read("HTTP/1.1\r\n\r\n", true),
            Err(Error::Protocol(ProtocolError::InvalidStatusLine { .. })),
        ));
        assert!(matches!(
            read("", true),
            Err(Error::Protocol(ProtocolError::ConnectionClosed)),
        ));
    }

    #[test]
    fn malformed_header_is_rejected() {
        assert!(matches!(
            read("HTTP/1.1 200 OK\r\nnot a header\r\n\r\n", true),
            Err(Error::Protocol(ProtocolError::MalformedHeader { .. })),
        ));
    }

    #[test]
    fn overlong_line_is_rejected() {
        let raw = format!("HTTP/1.1 200 OK\r\nX-Long: {}\r\n\r\n", "a".repeat(MAX_LINE_LEN));
        assert!(matches!(
            read(&raw, true),
            Err(Error::Protocol(ProtocolError::LineTooLong { .. })),
        ));
    }

    #[test]
    fn chunked_encoding_is_unsupported() {
        let raw = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n";
        assert!(matches!(
            read(raw, true),
            Err(Error::Protocol(ProtocolError::UnsupportedTransferEncoding { .. })),
        ));

        // nothing has to be decoded for a HEAD request
        assert!(read(raw, false).is_ok());
    }

    #[test]
    fn invalid_content_length_is_rejected() {
        assert!(matches!(
            read("HTTP/1.1 200 OK\r\nContent-Length: lots\r\n\r\n", true),
            Err(Error::Protocol(ProtocolError::InvalidContentLength { .. })),
        ));
    }

    #[test]
    fn headers_lookup_is_case_insensitive() {
        let mut headers: Headers = vec![("X-One", "1"), ("x-one", "2"), ("X-Two", "3")]
            .into_iter()
            .collect();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("X-ONE"), Some("1"));
        assert_eq!(headers.get_all("x-one").len(), 2);
        headers.insert("X-ONE", "only");
        assert_eq!(headers.get_all("x-one"), &["only".to_owned()]);
        assert_eq!(headers.remove("x-two"), Some(vec!["3".to_owned()]));
        assert!(!headers.contains("X-Two"));
    }
}
