use std::fmt;
use std::io;

use crate::message::{ParsingError, StoringError};


/// An error that may occur while performing a request.
#[derive(Debug)]
pub enum Error {
    /// Reading from or writing to the transport failed.
    Io(io::Error),

    /// The server's response could not be understood.
    Protocol(ProtocolError),

    /// The authentication handshake could not be completed.
    Auth(AuthError),

    /// The final response, after any authentication, reported an error status.
    Response { status: u16, body: Vec<u8> },

    /// The connection could not be set up as requested.
    Config(ConfigError),
}
impl Error {
    /// Returns the HTTP status code if this is an error response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Response { status, .. } => Some(*status),
            _ => None,
        }
    }
}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e)
                => write!(f, "I/O error: {}", e),
            Self::Protocol(e)
                => write!(f, "protocol error: {}", e),
            Self::Auth(e)
                => write!(f, "authentication error: {}", e),
            Self::Response { status, body }
                => write!(f, "server responded with status {} ({} bytes of body)", status, body.len()),
            Self::Config(e)
                => write!(f, "configuration error: {}", e),
        }
    }
}
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Protocol(e) => Some(e),
            Self::Auth(e) => Some(e),
            Self::Response { .. } => None,
            Self::Config(e) => Some(e),
        }
    }
}
impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}
impl From<AuthError> for Error {
    fn from(e: AuthError) -> Self {
        Self::Auth(e)
    }
}
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}


/// Malformed framing of a response or of an NTLM message received from the server.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum ProtocolError {
    /// The stream ended before a status line was received.
    ConnectionClosed,

    /// The status line does not contain a numeric status code.
    InvalidStatusLine { line: String },

    /// A header line is not of the form `Name: value`.
    MalformedHeader { line: String },

    /// A line exceeds the maximum accepted length.
    LineTooLong { limit: usize },

    /// The `Content-Length` header is not a number.
    InvalidContentLength { value: String },

    /// The response uses a transfer encoding that is not supported.
    UnsupportedTransferEncoding { value: String },

    /// The challenge sent by the server is not a valid NTLM Challenge message.
    Message(ParsingError),
}
impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionClosed
                => write!(f, "connection closed before a response was received"),
            Self::InvalidStatusLine { line }
                => write!(f, "invalid status line {:?}", line),
            Self::MalformedHeader { line }
                => write!(f, "malformed header line {:?}", line),
            Self::LineTooLong { limit }
                => write!(f, "line longer than {} bytes", limit),
            Self::InvalidContentLength { value }
                => write!(f, "invalid Content-Length {:?}", value),
            Self::UnsupportedTransferEncoding { value }
                => write!(f, "unsupported Transfer-Encoding {:?}", value),
            Self::Message(e)
                => write!(f, "invalid NTLM message: {}", e),
        }
    }
}
impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Message(e) => Some(e),
            _ => None,
        }
    }
}
impl From<ParsingError> for ProtocolError {
    fn from(e: ParsingError) -> Self {
        Self::Message(e)
    }
}


/// Failure to complete the NTLM handshake.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum AuthError {
    /// The server demanded authentication but did not answer the Negotiate message with a
    /// challenge.
    NoChallengeOffered,

    /// The credentials could not be encoded into an NTLM message.
    Encoding(StoringError),
}
impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoChallengeOffered
                => write!(f, "server did not offer an NTLM challenge"),
            Self::Encoding(e)
                => write!(f, "failed to encode NTLM message: {}", e),
        }
    }
}
impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Encoding(e) => Some(e),
            _ => None,
        }
    }
}
impl From<StoringError> for AuthError {
    fn from(e: StoringError) -> Self {
        Self::Encoding(e)
    }
}


/// Invalid connection settings.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// The URL uses a scheme other than `http` or `https`.
    UnknownScheme { scheme: String },

    /// The URL does not name a host.
    MissingHost { url: String },

    /// The port in the URL is not a number between 0 and 65535.
    InvalidPort { url: String },

    /// The URL cannot be parsed for another reason.
    InvalidUrl { url: String, reason: url::ParseError },

    /// A plain TCP connection was requested for an endpoint that requires TLS.
    SecureTransportRequired { host: String },
}
impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownScheme { scheme }
                => write!(f, "unknown protocol {:?}", scheme),
            Self::MissingHost { url }
                => write!(f, "no host in URL {:?}", url),
            Self::InvalidPort { url }
                => write!(f, "invalid port in URL {:?}", url),
            Self::InvalidUrl { url, reason }
                => write!(f, "invalid URL {:?}: {}", url, reason),
            Self::SecureTransportRequired { host }
                => write!(f, "{} requires TLS; wrap the stream and use Connection::new", host),
        }
    }
}
impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidUrl { reason, .. } => Some(reason),
            _ => None,
        }
    }
}
