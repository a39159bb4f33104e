//! HTTP/1.1 connections with transparent NTLM authentication.
//!
//! Servers such as SharePoint demand NTLM authentication, which is negotiated per connection in a
//! challenge-response handshake: the client sends a Negotiate message, the server answers with a
//! Challenge message and the client proves knowledge of the password in an Authenticate message.
//! All three messages travel in HTTP headers of requests on the same connection. A [`Connection`]
//! therefore owns its stream and speaks HTTP itself, injecting the `Authorization` header as the
//! handshake requires.
//!
//! Sample usage:
//! ```no_run
//! use ntlmhttp::{Connection, ConnectionConfig, Credentials, Endpoint, Headers};
//!
//! fn fetch_wsdl() -> Result<Vec<u8>, ntlmhttp::Error> {
//!     let site = "http://sharepoint.example/sites/Project Site/";
//!     let endpoint = Endpoint::from_url(site)?;
//!     let creds = Credentials::new("alice@CORP", "SecREt01")
//!         .with_workstation("PC01");
//!
//!     let mut conn = Connection::open(&endpoint, creds, &ConnectionConfig::default())?;
//!     let target = ntlmhttp::request_target(&format!("{}/_vti_bin/Lists.asmx?WSDL", site))?;
//!     let response = conn.get(&target, &Headers::new())?;
//!
//!     // later requests on the same connection reuse the authentication
//!     let _ = conn.head(&target, &Headers::new())?;
//!     Ok(response.body)
//! }
//! ```


pub mod connection;
pub mod credentials;
mod encoding;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod message;
pub mod response;


pub use crate::connection::{AuthState, Connection};
pub use crate::credentials::Credentials;
pub use crate::endpoint::{connect_tcp, request_target, ConnectionConfig, Endpoint};
pub use crate::error::{AuthError, ConfigError, Error, ProtocolError};
pub use crate::http::{Headers, Method, Request, Response};
pub use crate::message::{
    AuthenticateMessage, ChallengeMessage, Flags, Message, NegotiateMessage, ParsingError,
    SecurityBuffer, StoringError,
};
pub use crate::response::{
    legacy_response, modern_response, password_hash, respond_challenge, ChallengeResponse,
};
