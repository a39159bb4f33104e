//! Binary layout of the three NTLM messages.
//!
//! Every message starts with the magic value `NTLMSSP\0` and a 32-bit message number, followed by
//! a fixed-size header. Variable-length fields live in a payload area after the header and are
//! referenced from the header by [`SecurityBuffer`]s. On the HTTP wire, messages travel as base64
//! tokens.


use std::fmt;

use base64::prelude::{BASE64_STANDARD, Engine};
use bitflags::bitflags;
use tracing::warn;

use crate::encoding::{oem_to_string, string_to_oem, string_to_utf16_le, utf16_le_to_string};


/// The magic value at the start of every NTLMSSP data packet.
pub const NTLMSSP_MAGIC: [u8; 8] = *b"NTLMSSP\0";

/// Length of magic value and message number, which precede every message body.
const PREAMBLE_LEN: usize = 8 + 4;

/// Length of the fixed part of a Negotiate message.
pub const NEGOTIATE_HEADER_LEN: u32
    = 8 // magic
    + 4 // message type
    + 4 // flags
    + 8 // supplied domain secbuffer
    + 8 // supplied workstation secbuffer
    ;

/// Length of the fixed part of a Challenge message as written by [`ChallengeMessage::to_bytes`].
pub const CHALLENGE_HEADER_LEN: u32
    = 8 // magic
    + 4 // message type
    + 8 // target name secbuffer
    + 4 // flags
    + 8 // challenge
    + 8 // context
    + 8 // target information secbuffer
    ;

/// The shortest Challenge message that still contains the server challenge.
pub const CHALLENGE_MIN_LEN: usize = 32;

/// Length of the fixed part of an Authenticate message.
pub const AUTHENTICATE_HEADER_LEN: u32
    = 8 // magic
    + 4 // message type
    + 8 // LM response secbuffer
    + 8 // NTLM response secbuffer
    + 8 // domain name secbuffer
    + 8 // user name secbuffer
    + 8 // workstation name secbuffer
    + 8 // session key secbuffer
    + 4 // flags
    ;


bitflags! {
    /// NTLM operation flags.
    ///
    /// Only the flags this crate sends or interprets are named; others are kept as unnamed bits.
    #[derive(Clone, Copy, Debug, Default, Hash, Eq, Ord, PartialEq, PartialOrd)]
    pub struct Flags: u32 {
        const NEGOTIATE_UNICODE = 0x0000_0001;
        const NEGOTIATE_OEM = 0x0000_0002;
        const REQUEST_TARGET = 0x0000_0004;
        const NEGOTIATE_NTLM = 0x0000_0200;
        const NEGOTIATE_DOMAIN_SUPPLIED = 0x0000_1000;
        const NEGOTIATE_WORKSTATION_SUPPLIED = 0x0000_2000;
    }
}


/// An error that may occur while parsing NTLM messages.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ParsingError {
    /// The token is not valid base64.
    InvalidBase64,

    /// The message is shorter than its fixed header.
    ShortHeader { expected_min_len: usize, obtained_len: usize },

    /// The magic value does not match the expected one.
    MagicMismatch { expected: [u8; 8], obtained: Vec<u8> },

    /// A message of a different type was expected.
    UnexpectedMessageType { expected: u32, obtained: u32 },

    /// An internal item has a different length than expected.
    ItemLengthMismatch { expected: usize, obtained: usize },

    /// A byte string cannot be decoded using the OEM encoding.
    InvalidOemEncoding { value: Vec<u8> },

    /// A byte string cannot be decoded as UTF-16.
    InvalidUtf16 { value: Vec<u8> },

    /// A security buffer starts outside of the message payload.
    StartOutOfRange { start: u32, length: usize },

    /// A security buffer ends outside of the message.
    EndOutOfRange { end: u64, length: usize },

    /// Neither Unicode nor OEM encoding was selected.
    NeitherUnicodeNorOem,
}
impl fmt::Display for ParsingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBase64
                => write!(f, "token is not valid base64"),
            Self::ShortHeader { expected_min_len, obtained_len }
                => write!(f, "header too short (expected at least {} bytes, obtained {})", expected_min_len, obtained_len),
            Self::MagicMismatch { expected, obtained }
                => write!(f, "mismatched magic (expected {:?}, obtained {:?})", expected, obtained),
            Self::UnexpectedMessageType { expected, obtained }
                => write!(f, "unexpected message type (expected {}, obtained {})", expected, obtained),
            Self::ItemLengthMismatch { expected, obtained }
                => write!(f, "wrong length for an internal item (expected {}, obtained {})", expected, obtained),
            Self::InvalidOemEncoding { value }
                => write!(f, "failed to decode value with the OEM encoding: {:?}", value),
            Self::InvalidUtf16 { value }
                => write!(f, "failed to decode value as UTF-16: {:?}", value),
            Self::StartOutOfRange { start, length }
                => write!(f, "start ({}) out of range (message has {} bytes)", start, length),
            Self::EndOutOfRange { end, length }
                => write!(f, "end ({}) out of range (message has {} bytes)", end, length),
            Self::NeitherUnicodeNorOem
                => write!(f, "neither Unicode nor OEM encoding was selected"),
        }
    }
}
impl std::error::Error for ParsingError {
}

/// An error that may occur while writing an NTLM message.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum StoringError {
    /// A field is too long to be described by a security buffer.
    BufferTooLong { length: usize },

    /// Neither Unicode nor OEM encoding was selected.
    NeitherUnicodeNorOem,
}
impl fmt::Display for StoringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooLong { length }
                => write!(f, "field of {} bytes does not fit into a security buffer", length),
            Self::NeitherUnicodeNorOem
                => write!(f, "neither Unicode nor OEM encoding was selected"),
        }
    }
}
impl std::error::Error for StoringError {
}


/// An NTLM message.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Message {
    Negotiate(NegotiateMessage),
    Challenge(ChallengeMessage),
    Authenticate(AuthenticateMessage),
    Other(u32, Vec<u8>),
}
impl Message {
    /// Returns the 32-bit message number identifying the type of this message.
    pub fn message_number(&self) -> u32 {
        match self {
            Self::Negotiate(_) => 0x0000_0001,
            Self::Challenge(_) => 0x0000_0002,
            Self::Authenticate(_) => 0x0000_0003,
            Self::Other(t, _data) => *t,
        }
    }
}

/// The contents of an NTLM Negotiate message.
///
/// The Negotiate message is the first message in an NTLM challenge-response process and is sent by
/// the client to the server; the server is expected to respond with a Challenge message.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NegotiateMessage {
    /// Stores which information has been specified and which NTLM behavior should be negotiated.
    pub flags: Flags,

    /// The domain against which the client wishes to authenticate.
    pub supplied_domain: String,

    /// The NT hostname of the client.
    pub supplied_workstation: String,
}

/// The contents of an NTLM Challenge message.
///
/// The Challenge message is sent by the server in response to the client's Negotiate message; the
/// client is expected to respond with an Authenticate message.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ChallengeMessage {
    /// The host or domain against which the client is authenticating.
    pub target_name: String,

    /// Stores which NTLM behavior has been accepted by the server from the client's request.
    pub flags: Flags,

    /// The server challenge (nonce).
    pub challenge: [u8; 8],

    /// The context value; all zeroes if the server sent a short message.
    pub context: [u8; 8],

    /// Raw target information; empty if the server sent none.
    pub target_information: Vec<u8>,
}

/// The contents of an NTLM Authenticate message.
///
/// The Authenticate message is sent by the client in response to the server's Challenge message;
/// once it is accepted by the server, the authentication has succeeded. The session key buffer is
/// always written empty.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct AuthenticateMessage {
    pub lm_response: Vec<u8>,
    pub ntlm_response: Vec<u8>,
    pub domain_name: String,
    pub user_name: String,
    pub workstation_name: String,
    pub flags: Flags,
}

/// An NTLM security buffer, pointing to data contained later in the message.
///
/// Offsets are counted from the start of the message (the first byte of the magic value). An
/// empty field has length and offset 0.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SecurityBuffer {
    pub length: u16,
    pub capacity: u16,
    pub offset: u32,
}


/// Collects the variable-length fields of a message behind its fixed-size header.
///
/// Each call to [`PayloadBuilder::append`] places the data directly after the previously appended
/// data and returns the security buffer describing it, so the payload has no gaps and every
/// offset points past the header.
#[derive(Clone, Debug)]
pub struct PayloadBuilder {
    header_len: u32,
    data: Vec<u8>,
}
impl PayloadBuilder {
    /// Creates a builder for a message whose fixed part (including magic and message number) is
    /// `header_len` bytes long.
    pub fn new(header_len: u32) -> Self {
        Self {
            header_len,
            data: Vec::new(),
        }
    }

    /// Appends data to the payload and returns the security buffer pointing to it.
    pub fn append(&mut self, data: &[u8]) -> Result<SecurityBuffer, StoringError> {
        if data.is_empty() {
            return Ok(SecurityBuffer::default());
        }

        let too_long = || StoringError::BufferTooLong { length: data.len() };
        let length: u16 = data.len().try_into().map_err(|_| too_long())?;
        let data_len: u32 = self.data.len().try_into().map_err(|_| too_long())?;
        let offset = self.header_len.checked_add(data_len).ok_or_else(too_long)?;

        self.data.extend_from_slice(data);
        Ok(SecurityBuffer {
            length,
            capacity: length,
            offset,
        })
    }

    /// Appends a string to the payload, encoding it as selected by `flags`.
    pub fn append_string(&mut self, flags: Flags, string: &str) -> Result<SecurityBuffer, StoringError> {
        let bytes = if flags.contains(Flags::NEGOTIATE_UNICODE) {
            string_to_utf16_le(string)
        } else if flags.contains(Flags::NEGOTIATE_OEM) {
            string_to_oem(string)
        } else {
            return Err(StoringError::NeitherUnicodeNorOem);
        };
        self.append(&bytes)
    }

    /// Places the payload after the message body header (the fixed part without magic and message
    /// number).
    pub fn finish(self, mut body_header: Vec<u8>) -> Vec<u8> {
        debug_assert_eq!(body_header.len() + PREAMBLE_LEN, self.header_len as usize);
        body_header.extend_from_slice(&self.data);
        body_header
    }
}


// serialization and deserialization code


/// Converts a string into a Rust string, using OEM or UTF-16 encoding depending on the `flags`.
fn ntlm_bytes_to_string(flags: Flags, bytes: &[u8]) -> Result<String, ParsingError> {
    if flags.contains(Flags::NEGOTIATE_UNICODE) {
        utf16_le_to_string(bytes)
            .ok_or_else(|| ParsingError::InvalidUtf16 { value: Vec::from(bytes) })
    } else if flags.contains(Flags::NEGOTIATE_OEM) {
        oem_to_string(bytes)
            .ok_or_else(|| ParsingError::InvalidOemEncoding { value: Vec::from(bytes) })
    } else {
        Err(ParsingError::NeitherUnicodeNorOem)
    }
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn read_array8(bytes: &[u8], at: usize) -> [u8; 8] {
    let mut ret = [0u8; 8];
    ret.copy_from_slice(&bytes[at..at + 8]);
    ret
}

fn read_sec_buffer(body: &[u8], at: usize) -> Result<SecurityBuffer, ParsingError> {
    SecurityBuffer::try_from(&body[at..at + 8])
}

fn check_min_len(body: &[u8], min_body_len: usize) -> Result<(), ParsingError> {
    if body.len() < min_body_len {
        Err(ParsingError::ShortHeader {
            expected_min_len: min_body_len + PREAMBLE_LEN,
            obtained_len: body.len() + PREAMBLE_LEN,
        })
    } else {
        Ok(())
    }
}

impl Message {
    /// Serializes the NTLM message into bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StoringError> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&NTLMSSP_MAGIC);
        buf.extend_from_slice(&self.message_number().to_le_bytes());
        match self {
            Message::Negotiate(t1m) => {
                buf.extend_from_slice(&t1m.to_bytes()?);
            },
            Message::Challenge(t2m) => {
                buf.extend_from_slice(&t2m.to_bytes()?);
            },
            Message::Authenticate(t3m) => {
                buf.extend_from_slice(&t3m.to_bytes()?);
            },
            Message::Other(_msg_num, data) => {
                buf.extend_from_slice(data);
            },
        }
        Ok(buf)
    }

    /// Serializes the NTLM message into a base64 token as carried in HTTP headers.
    pub fn to_token(&self) -> Result<String, StoringError> {
        Ok(BASE64_STANDARD.encode(self.to_bytes()?))
    }

    /// Deserializes an NTLM message from a base64 token as carried in HTTP headers.
    pub fn from_token(token: &str) -> Result<Self, ParsingError> {
        let bytes = BASE64_STANDARD.decode(token.trim())
            .map_err(|_| ParsingError::InvalidBase64)?;
        Message::try_from(bytes.as_slice())
    }
}
impl TryFrom<&[u8]> for Message {
    type Error = ParsingError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        if value.len() < PREAMBLE_LEN {
            return Err(ParsingError::ShortHeader { expected_min_len: PREAMBLE_LEN, obtained_len: value.len() });
        }
        if value[0..8] != NTLMSSP_MAGIC {
            return Err(ParsingError::MagicMismatch { expected: NTLMSSP_MAGIC, obtained: Vec::from(&value[0..8]) });
        }
        let message_type = read_u32(value, 8);
        let body = &value[PREAMBLE_LEN..];
        match message_type {
            0x0000_0001 => NegotiateMessage::try_from(body)
                .map(Message::Negotiate),
            0x0000_0002 => ChallengeMessage::try_from(body)
                .map(Message::Challenge),
            0x0000_0003 => AuthenticateMessage::try_from(body)
                .map(Message::Authenticate),
            other_type => Ok(Message::Other(other_type, Vec::from(body))),
        }
    }
}

impl NegotiateMessage {
    /// Creates the Negotiate message for the given domain and workstation names.
    ///
    /// Unicode, OEM, target request and NTLM are always negotiated; the domain and workstation
    /// flags are only set if the respective name is not empty.
    pub fn new(domain: &str, workstation: &str) -> Self {
        let mut flags
            = Flags::NEGOTIATE_UNICODE
            | Flags::NEGOTIATE_OEM
            | Flags::REQUEST_TARGET
            | Flags::NEGOTIATE_NTLM
            ;
        if !domain.is_empty() {
            flags |= Flags::NEGOTIATE_DOMAIN_SUPPLIED;
        }
        if !workstation.is_empty() {
            flags |= Flags::NEGOTIATE_WORKSTATION_SUPPLIED;
        }
        Self {
            flags,
            supplied_domain: domain.to_owned(),
            supplied_workstation: workstation.to_owned(),
        }
    }

    /// Serializes the Negotiate message body into bytes.
    ///
    /// Domain and workstation are always sent in the OEM encoding. The workstation name precedes
    /// the domain name in the payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StoringError> {
        let mut payload = PayloadBuilder::new(NEGOTIATE_HEADER_LEN);
        let workstation_secbuf = payload.append(&string_to_oem(&self.supplied_workstation))?;
        let domain_secbuf = payload.append(&string_to_oem(&self.supplied_domain))?;

        let mut ret = Vec::new();
        ret.extend_from_slice(&self.flags.bits().to_le_bytes());
        ret.extend_from_slice(&domain_secbuf.to_bytes());
        ret.extend_from_slice(&workstation_secbuf.to_bytes());
        Ok(payload.finish(ret))
    }
}
impl TryFrom<&[u8]> for NegotiateMessage {
    type Error = ParsingError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        // magic and message type have already been sliced away
        check_min_len(value, NEGOTIATE_HEADER_LEN as usize - PREAMBLE_LEN)?;

        let flags = Flags::from_bits_retain(read_u32(value, 0));
        let supplied_domain_secbuf = read_sec_buffer(value, 4)?;
        let supplied_workstation_secbuf = read_sec_buffer(value, 12)?;

        let supplied_domain_bytes = supplied_domain_secbuf.apply_to_body(value)?;
        let supplied_workstation_bytes = supplied_workstation_secbuf.apply_to_body(value)?;

        let supplied_domain = oem_to_string(supplied_domain_bytes)
            .ok_or_else(|| ParsingError::InvalidOemEncoding { value: Vec::from(supplied_domain_bytes) })?;
        let supplied_workstation = oem_to_string(supplied_workstation_bytes)
            .ok_or_else(|| ParsingError::InvalidOemEncoding { value: Vec::from(supplied_workstation_bytes) })?;

        Ok(Self {
            flags,
            supplied_domain,
            supplied_workstation,
        })
    }
}

impl ChallengeMessage {
    /// Decodes a complete Challenge message, including magic and message number.
    ///
    /// Fails unless the message starts with the NTLMSSP magic and is of type 2.
    pub fn decode(bytes: &[u8]) -> Result<Self, ParsingError> {
        match Message::try_from(bytes)? {
            Message::Challenge(c) => Ok(c),
            other => Err(ParsingError::UnexpectedMessageType { expected: 2, obtained: other.message_number() }),
        }
    }

    /// Decodes a Challenge message from a base64 token.
    pub fn from_token(token: &str) -> Result<Self, ParsingError> {
        let bytes = BASE64_STANDARD.decode(token.trim())
            .map_err(|_| ParsingError::InvalidBase64)?;
        Self::decode(&bytes)
    }

    /// Serializes the Challenge message body into bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StoringError> {
        let mut payload = PayloadBuilder::new(CHALLENGE_HEADER_LEN);
        let target_name_secbuf = payload.append_string(self.flags, &self.target_name)?;
        let target_info_secbuf = payload.append(&self.target_information)?;

        let mut ret = Vec::new();
        ret.extend_from_slice(&target_name_secbuf.to_bytes());
        ret.extend_from_slice(&self.flags.bits().to_le_bytes());
        ret.extend_from_slice(&self.challenge);
        ret.extend_from_slice(&self.context);
        ret.extend_from_slice(&target_info_secbuf.to_bytes());
        Ok(payload.finish(ret))
    }
}
impl TryFrom<&[u8]> for ChallengeMessage {
    type Error = ParsingError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        // magic and message type have already been sliced away
        check_min_len(value, CHALLENGE_MIN_LEN - PREAMBLE_LEN)?;

        let target_name_secbuf = read_sec_buffer(value, 0)?;
        let flags = Flags::from_bits_retain(read_u32(value, 8));
        let challenge = read_array8(value, 12);

        // older servers send a short header and start the payload right after the challenge;
        // the optional fields only exist if the header extends that far
        let header_end = if target_name_secbuf.length > 0 {
            (target_name_secbuf.offset as usize).min(value.len() + PREAMBLE_LEN)
        } else {
            value.len() + PREAMBLE_LEN
        };
        let context = if header_end >= 40 {
            read_array8(value, 20)
        } else {
            [0u8; 8]
        };

        // only the challenge is needed; unreadable optional fields are left empty
        let target_information = if header_end >= 48 {
            let target_info_secbuf = read_sec_buffer(value, 28)?;
            match target_info_secbuf.apply_to_body(value) {
                Ok(bytes) => Vec::from(bytes),
                Err(e) => {
                    warn!(error = %e, "ignoring invalid target information in challenge");
                    Vec::new()
                },
            }
        } else {
            Vec::new()
        };

        let target_name = match target_name_secbuf.apply_to_body(value)
            .and_then(|bytes| ntlm_bytes_to_string(flags, bytes))
        {
            Ok(name) => name,
            Err(e) => {
                warn!(error = %e, "ignoring invalid target name in challenge");
                String::new()
            },
        };

        Ok(Self {
            target_name,
            flags,
            challenge,
            context,
            target_information,
        })
    }
}

impl AuthenticateMessage {
    /// Serializes the Authenticate message body into bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StoringError> {
        let mut payload = PayloadBuilder::new(AUTHENTICATE_HEADER_LEN);
        let lm_response_secbuf = payload.append(&self.lm_response)?;
        let ntlm_response_secbuf = payload.append(&self.ntlm_response)?;
        let domain_name_secbuf = payload.append_string(self.flags, &self.domain_name)?;
        let user_name_secbuf = payload.append_string(self.flags, &self.user_name)?;
        let workstation_name_secbuf = payload.append_string(self.flags, &self.workstation_name)?;
        let session_key_secbuf = SecurityBuffer::default();

        let mut ret = Vec::new();
        ret.extend_from_slice(&lm_response_secbuf.to_bytes());
        ret.extend_from_slice(&ntlm_response_secbuf.to_bytes());
        ret.extend_from_slice(&domain_name_secbuf.to_bytes());
        ret.extend_from_slice(&user_name_secbuf.to_bytes());
        ret.extend_from_slice(&workstation_name_secbuf.to_bytes());
        ret.extend_from_slice(&session_key_secbuf.to_bytes());
        ret.extend_from_slice(&self.flags.bits().to_le_bytes());
        Ok(payload.finish(ret))
    }
}
impl TryFrom<&[u8]> for AuthenticateMessage {
    type Error = ParsingError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        // magic and message type have already been sliced away
        check_min_len(value, AUTHENTICATE_HEADER_LEN as usize - PREAMBLE_LEN)?;

        let lm_response_secbuf = read_sec_buffer(value, 0)?;
        let ntlm_response_secbuf = read_sec_buffer(value, 8)?;
        let domain_name_secbuf = read_sec_buffer(value, 16)?;
        let user_name_secbuf = read_sec_buffer(value, 24)?;
        let workstation_name_secbuf = read_sec_buffer(value, 32)?;
        // 40..48 is the session key, which is never used
        let flags = Flags::from_bits_retain(read_u32(value, 48));

        let lm_response = Vec::from(lm_response_secbuf.apply_to_body(value)?);
        let ntlm_response = Vec::from(ntlm_response_secbuf.apply_to_body(value)?);
        let domain_name = ntlm_bytes_to_string(flags, domain_name_secbuf.apply_to_body(value)?)?;
        let user_name = ntlm_bytes_to_string(flags, user_name_secbuf.apply_to_body(value)?)?;
        let workstation_name = ntlm_bytes_to_string(flags, workstation_name_secbuf.apply_to_body(value)?)?;

        Ok(Self {
            lm_response,
            ntlm_response,
            domain_name,
            user_name,
            workstation_name,
            flags,
        })
    }
}

impl SecurityBuffer {
    /// Serializes the security buffer into bytes.
    pub fn to_bytes(&self) -> [u8; 8] {
        let mut ret = [0u8; 8];
        ret[0..2].copy_from_slice(&self.length.to_le_bytes());
        ret[2..4].copy_from_slice(&self.capacity.to_le_bytes());
        ret[4..8].copy_from_slice(&self.offset.to_le_bytes());
        ret
    }

    /// Applies the security buffer to a message body, extracting the data itself.
    ///
    /// `body` is the message without magic and message number, while the offset is counted from
    /// the start of the full message.
    pub fn apply_to_body<'a>(&self, body: &'a [u8]) -> Result<&'a [u8], ParsingError> {
        if self.length == 0 {
            // short-circuit
            return Ok(&body[0..0]);
        }

        let full_len = body.len() + PREAMBLE_LEN;
        let start = (self.offset as usize).checked_sub(PREAMBLE_LEN)
            .ok_or(ParsingError::StartOutOfRange { start: self.offset, length: full_len })?;
        let end = start + usize::from(self.length);

        if start >= body.len() {
            return Err(ParsingError::StartOutOfRange { start: self.offset, length: full_len });
        }
        if end > body.len() {
            return Err(ParsingError::EndOutOfRange { end: u64::from(self.offset) + u64::from(self.length), length: full_len });
        }

        Ok(&body[start..end])
    }
}
impl TryFrom<&[u8]> for SecurityBuffer {
    type Error = ParsingError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        if value.len() != 8 {
            return Err(ParsingError::ItemLengthMismatch { expected: 8, obtained: value.len() });
        }

        let length = u16::from_le_bytes([value[0], value[1]]);
        let capacity = u16::from_le_bytes([value[2], value[3]]);
        let offset = read_u32(value, 4);

        Ok(Self {
            length,
            capacity,
            offset,
        })
    }
}
