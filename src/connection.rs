//! A single HTTP connection that authenticates itself using NTLM when the server demands it.


use std::io::{BufReader, Read, Write};
use std::net::TcpStream;

use tracing::debug;

use crate::credentials::Credentials;
use crate::endpoint::{connect_tcp, ConnectionConfig, Endpoint};
use crate::error::{AuthError, ConfigError, Error, ProtocolError};
use crate::http::{read_response, write_request, Headers, Method, Request, Response, AUTH_SCHEME};
use crate::message::{ChallengeMessage, Message, NegotiateMessage};
use crate::response::respond_challenge;


/// How far the connection has come in authenticating itself.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum AuthState {
    /// No authentication has been attempted.
    Idle,

    /// The server rejected the request; a challenge is required.
    AwaitingChallenge,

    /// An Authenticate token is cached and sent with every request.
    Authenticated,
}


/// An HTTP connection to one host over one stream.
///
/// Requests are sent one at a time. If the server answers with `401 Unauthorized`, the NTLM
/// handshake is performed on the same stream and the request is repeated. The resulting
/// Authenticate token is kept and sent proactively with subsequent requests.
///
/// The stream is closed when the connection is dropped.
#[derive(Debug)]
pub struct Connection<S: Read + Write> {
    stream: BufReader<S>,
    host: String,
    credentials: Credentials,
    negotiate_token: Option<String>,
    authenticate_token: Option<String>,
    state: AuthState,
}

impl Connection<TcpStream> {
    /// Opens a plain TCP connection to the endpoint.
    ///
    /// Fails for secure endpoints; wrap a stream in TLS yourself and pass it to
    /// [`Connection::new`] instead.
    pub fn open(endpoint: &Endpoint, credentials: Credentials, config: &ConnectionConfig) -> Result<Self, Error> {
        if endpoint.secure {
            return Err(ConfigError::SecureTransportRequired { host: endpoint.host.clone() }.into());
        }
        let stream = connect_tcp(endpoint, config)?;
        Ok(Self::new(stream, &endpoint.host_header(), credentials))
    }
}

impl<S: Read + Write> Connection<S> {
    /// Wraps an established stream. `host` is sent in the `Host` header of every request.
    pub fn new(stream: S, host: &str, credentials: Credentials) -> Self {
        Self {
            stream: BufReader::new(stream),
            host: host.to_owned(),
            credentials,
            negotiate_token: None,
            authenticate_token: None,
            state: AuthState::Idle,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    /// The cached Authenticate token, if the handshake has been completed.
    pub fn authenticate_token(&self) -> Option<&str> {
        self.authenticate_token.as_deref()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn get_ref(&self) -> &S {
        self.stream.get_ref()
    }

    pub fn get_mut(&mut self) -> &mut S {
        self.stream.get_mut()
    }

    /// Closes the connection, returning the underlying stream.
    ///
    /// Buffered data that has been received but not consumed is discarded.
    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }

    pub fn get(&mut self, target: &str, headers: &Headers) -> Result<Response, Error> {
        let request = Request::new(Method::Get, target)
            .with_headers(headers.clone());
        self.request(&request)
    }

    pub fn post(&mut self, target: &str, body: Vec<u8>, headers: &Headers) -> Result<Response, Error> {
        let request = Request::new(Method::Post, target)
            .with_headers(headers.clone())
            .with_body(body);
        self.request(&request)
    }

    pub fn head(&mut self, target: &str, headers: &Headers) -> Result<Response, Error> {
        let request = Request::new(Method::Head, target)
            .with_headers(headers.clone());
        self.request(&request)
    }

    /// Performs a request, authenticating if necessary.
    ///
    /// Fails with [`Error::Response`] if the final status is 400 or above.
    pub fn request(&mut self, request: &Request) -> Result<Response, Error> {
        let cached_token = self.authenticate_token.clone();
        let mut response = match cached_token {
            Some(token) => {
                let authorization = format!("{} {}", AUTH_SCHEME, token);
                self.round_trip(&with_authorization(request, &authorization, request.body.clone()))?
            },
            None => self.round_trip(request)?,
        };

        if response.status == 401 {
            if self.authenticate_token.take().is_some() {
                debug!(host = %self.host, "cached authentication rejected");
            }
            self.state = AuthState::AwaitingChallenge;

            let challenge_token = match response.challenge.take() {
                Some(token) => token,
                None => {
                    let authorization = format!("{} {}", AUTH_SCHEME, self.negotiate_token()?);
                    let probe_body = request.body.as_ref().map(|_| Vec::new());
                    debug!(host = %self.host, "sending negotiate message");
                    let probe_response = self.round_trip(&with_authorization(request, &authorization, probe_body))?;
                    probe_response.challenge
                        .ok_or(AuthError::NoChallengeOffered)?
                },
            };
            debug!(host = %self.host, "received challenge");

            let authenticate_token = self.respond(&challenge_token)?;
            let authorization = format!("{} {}", AUTH_SCHEME, authenticate_token);
            response = self.round_trip(&with_authorization(request, &authorization, request.body.clone()))?;

            // the handshake itself has succeeded, even if access is denied
            self.authenticate_token = Some(authenticate_token);
            self.state = AuthState::Authenticated;
            debug!(host = %self.host, status = response.status, "authentication completed");
        }

        if response.status >= 400 {
            return Err(Error::Response {
                status: response.status,
                body: response.body,
            });
        }
        Ok(response)
    }

    /// Returns the Negotiate token, calculating it on first use.
    fn negotiate_token(&mut self) -> Result<String, Error> {
        if let Some(token) = &self.negotiate_token {
            return Ok(token.clone());
        }
        let message = Message::Negotiate(NegotiateMessage::new(
            &self.credentials.domain,
            &self.credentials.workstation,
        ));
        let token = message.to_token()
            .map_err(AuthError::from)?;
        self.negotiate_token = Some(token.clone());
        Ok(token)
    }

    /// Calculates the Authenticate token answering the server's Challenge token.
    fn respond(&self, challenge_token: &str) -> Result<String, Error> {
        let challenge = ChallengeMessage::from_token(challenge_token)
            .map_err(ProtocolError::from)?;
        let response = respond_challenge(challenge.challenge, &self.credentials);
        let token = response.to_message(&self.credentials)
            .to_token()
            .map_err(AuthError::from)?;
        Ok(token)
    }

    fn round_trip(&mut self, request: &Request) -> Result<Response, Error> {
        write_request(self.stream.get_mut(), &self.host, request)?;
        read_response(&mut self.stream, request.method.expects_response_body())
    }
}


/// Copies the request, setting the `Authorization` header and replacing the body.
fn with_authorization(request: &Request, authorization: &str, body: Option<Vec<u8>>) -> Request {
    let mut headers = request.headers.clone();
    headers.insert("Authorization", authorization);
    Request {
        method: request.method,
        target: request.target.clone(),
        headers,
        body,
    }
}
