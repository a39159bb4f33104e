//! Where to connect and how.


use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;
use url::{Host, ParseError, Url};

use crate::error::ConfigError;


const HTTP_PORT: u16 = 80;
const HTTPS_PORT: u16 = 443;


/// The host and port a connection is bound to.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,

    /// Whether the port expects TLS.
    pub secure: bool,
}
impl Endpoint {
    pub fn new(host: &str, port: u16, secure: bool) -> Self {
        Self {
            host: host.to_owned(),
            port,
            secure,
        }
    }

    /// Derives the endpoint from a URL such as `https://sharepoint.example/sites/Project/`.
    ///
    /// A missing scheme is taken to be `http`. Without an explicit port, `http` uses port 80 and
    /// `https` uses port 443.
    pub fn from_url(url: &str) -> Result<Self, ConfigError> {
        let parsed = parse_url(&with_scheme(url))?;

        let secure = match parsed.scheme() {
            "http" => false,
            "https" => true,
            other => return Err(ConfigError::UnknownScheme { scheme: other.to_owned() }),
        };
        let host = match parsed.host() {
            // without brackets, as needed for resolving
            Some(Host::Ipv6(addr)) => addr.to_string(),
            Some(host) => host.to_string(),
            None => return Err(ConfigError::MissingHost { url: url.to_owned() }),
        };
        let port = parsed.port_or_known_default()
            .unwrap_or(if secure { HTTPS_PORT } else { HTTP_PORT });

        Ok(Self {
            host,
            port,
            secure,
        })
    }

    /// The value of the `Host` header for requests to this endpoint.
    ///
    /// The port is only included if it is not the default port for the scheme.
    pub fn host_header(&self) -> String {
        let default_port = if self.secure { HTTPS_PORT } else { HTTP_PORT };
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        if self.port == default_port {
            host
        } else {
            format!("{}:{}", host, self.port)
        }
    }
}


/// Prefixes `http://` if the URL has no scheme.
fn with_scheme(url: &str) -> String {
    if url.contains("://") {
        url.to_owned()
    } else {
        format!("http://{}", url)
    }
}

fn parse_url(url: &str) -> Result<Url, ConfigError> {
    Url::parse(url)
        .map_err(|e| match e {
            ParseError::EmptyHost => ConfigError::MissingHost { url: url.to_owned() },
            ParseError::InvalidPort => ConfigError::InvalidPort { url: url.to_owned() },
            reason => ConfigError::InvalidUrl { url: url.to_owned(), reason },
        })
}


/// Returns the request target (path and query) for a URL.
///
/// The path and query are percent-encoded as needed, doubled slashes are collapsed and the
/// fragment is dropped. A bare path without scheme and host is accepted as well.
pub fn request_target(url: &str) -> Result<String, ConfigError> {
    let parsed = if url.contains("://") {
        parse_url(url)?
    } else {
        // only the path matters; any host will do
        parse_url(&format!("http://localhost/{}", url.trim_start_matches('/')))?
    };

    let path = parsed.path();
    let mut target = String::with_capacity(path.len() + 1);
    for c in path.chars() {
        if c == '/' && target.ends_with('/') {
            continue;
        }
        target.push(c);
    }
    if target.is_empty() {
        target.push('/');
    }
    if let Some(query) = parsed.query() {
        target.push('?');
        target.push_str(query);
    }
    Ok(target)
}


/// Socket settings for connections opened by the library.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ConnectionConfig {
    /// How long to wait for the TCP connection to be established.
    pub connect_timeout: Option<Duration>,

    /// How long a single read may block; `None` blocks indefinitely.
    pub read_timeout: Option<Duration>,

    /// How long a single write may block; `None` blocks indefinitely.
    pub write_timeout: Option<Duration>,
}
impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(30)),
            read_timeout: None,
            write_timeout: None,
        }
    }
}


/// Opens a TCP connection to the endpoint, trying each resolved address in turn.
///
/// TLS is not applied, even if the endpoint is secure.
pub fn connect_tcp(endpoint: &Endpoint, config: &ConnectionConfig) -> io::Result<TcpStream> {
    let mut last_error = None;
    for addr in (endpoint.host.as_str(), endpoint.port).to_socket_addrs()? {
        debug!(host = %endpoint.host, %addr, "connecting");
        let attempt = match config.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => {
                stream.set_read_timeout(config.read_timeout)?;
                stream.set_write_timeout(config.write_timeout)?;
                return Ok(stream);
            },
            Err(e) => {
                debug!(%addr, error = %e, "connection attempt failed");
                last_error = Some(e);
            },
        }
    }
    Err(last_error.unwrap_or_else(|| io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} did not resolve to any address", endpoint.host),
    )))
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn scheme_selects_default_port() {
        assert_eq!(
            Endpoint::from_url("http://sp.example/sites/Project Site/").unwrap(),
            Endpoint::new("sp.example", 80, false),
        );
        assert_eq!(
            Endpoint::from_url("HTTPS://sp.example").unwrap(),
            Endpoint::new("sp.example", 443, true),
        );
        assert_eq!(
            Endpoint::from_url("sp.example/sites").unwrap(),
            Endpoint::new("sp.example", 80, false),
        );
    }

    #[test]
    fn explicit_port_and_user_info() {
        assert_eq!(
            Endpoint::from_url("https://user:pw@sp.example:8443/x?y").unwrap(),
            Endpoint::new("sp.example", 8443, true),
        );
        assert_eq!(
            Endpoint::from_url("http://[::1]:8080/").unwrap(),
            Endpoint::new("::1", 8080, false),
        );
    }

    #[test]
    fn invalid_urls_are_rejected() {
        assert_eq!(
            Endpoint::from_url("ftp://sp.example/"),
            Err(ConfigError::UnknownScheme { scheme: "ftp".to_owned() }),
        );
        assert_eq!(
            Endpoint::from_url("http://"),
            Err(ConfigError::MissingHost { url: "http://".to_owned() }),
        );
        assert_eq!(
            Endpoint::from_url("http://sp.example:http/"),
            Err(ConfigError::InvalidPort { url: "http://sp.example:http/".to_owned() }),
        );
        assert_eq!(
            Endpoint::from_url("http://sp.example:99999/"),
            Err(ConfigError::InvalidPort { url: "http://sp.example:99999/".to_owned() }),
        );
        assert!(matches!(
            Endpoint::from_url("http://sp example/"),
            Err(ConfigError::InvalidUrl { .. }),
        ));
    }

    #[test]
    fn host_header_omits_default_port() {
        assert_eq!(Endpoint::new("sp.example", 80, false).host_header(), "sp.example");
        assert_eq!(Endpoint::new("sp.example", 443, true).host_header(), "sp.example");
        assert_eq!(Endpoint::new("sp.example", 8080, false).host_header(), "sp.example:8080");
        assert_eq!(Endpoint::new("::1", 8080, false).host_header(), "[::1]:8080");
    }

    #[test]
    fn request_target_from_url() {
        assert_eq!(
            request_target("http://sp.example/sites/Test Site//_vti_bin/Lists.asmx?WSDL#top").unwrap(),
            "/sites/Test%20Site/_vti_bin/Lists.asmx?WSDL",
        );
        assert_eq!(request_target("http://sp.example").unwrap(), "/");
        assert_eq!(request_target("http://sp.example?a=b").unwrap(), "/?a=b");
        assert_eq!(request_target("/already/a/path").unwrap(), "/already/a/path");
        assert_eq!(request_target("no/leading/slash").unwrap(), "/no/leading/slash");
    }

    #[test]
    fn request_target_is_always_ascii() {
        let target = request_target("http://sp.example/Shared Documents/Bericht \u{e4}\t\"x\".docx?q=\u{fc} b").unwrap();
        assert!(target.is_ascii(), "{:?}", target);
        assert!(!target.contains([' ', '\t', '"']), "{:?}", target);
        assert!(target.starts_with("/Shared%20Documents/Bericht%20%C3%A4"), "{:?}", target);
        assert!(target.ends_with("?q=%C3%BC%20b"), "{:?}", target);
    }

    #[test]
    fn connect_tcp_reaches_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = ConnectionConfig {
            read_timeout: Some(Duration::from_secs(5)),
            ..ConnectionConfig::default()
        };
        let stream = connect_tcp(&Endpoint::new("127.0.0.1", port, false), &config).unwrap();
        assert_eq!(stream.read_timeout().unwrap(), Some(Duration::from_secs(5)));
    }
}
