//! Calculation of the responses proving knowledge of the password.
//!
//! Only the NTLMv1 response is calculated. The LanManager response is always sent empty, which
//! servers accept as long as they permit NTLM at all.


use cipher::{BlockEncrypt, KeyInit};
use cipher::generic_array::GenericArray;
use des::Des;
use digest::Digest;
use md4::Md4;

use crate::credentials::Credentials;
use crate::encoding::string_to_utf16_le;
use crate::message::{AuthenticateMessage, Flags, Message};


/// The flags announced in every Authenticate message.
pub const AUTHENTICATE_FLAGS: Flags = Flags::NEGOTIATE_UNICODE
    .union(Flags::NEGOTIATE_NTLM)
    .union(Flags::REQUEST_TARGET);


/// The response to an NTLM challenge.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ChallengeResponse {
    /// The classic LanManager (LM) response; always empty.
    pub lm_response: Vec<u8>,

    /// The NT LanManager (NTLM) response.
    pub ntlm_response: Vec<u8>,
}


/// Derives the encryption key from a password according to the NTLMv1 scheme.
///
/// The NTLMv1 scheme encodes the password as UTF-16 in little-endian byte order (without the Byte
/// Order Mark) and hashes it using MD4.
pub fn password_hash(password: &str) -> [u8; 16] {
    let password_bytes = string_to_utf16_le(password);
    let mut md4_state = <Md4 as Digest>::new();
    md4_state.update(&password_bytes);

    let mut ret = [0u8; 16];
    ret.copy_from_slice(md4_state.finalize().as_slice());
    ret
}


/// Expands a 56-bit key into a 64-bit DES key.
///
/// Each group of seven key bits is followed by a bit that gives the resulting byte odd parity.
pub fn expand_des_key(key: [u8; 7]) -> [u8; 8] {
    let bits = key.iter()
        .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));

    let mut ret = [0u8; 8];
    for (i, byte) in ret.iter_mut().enumerate() {
        let seven = ((bits >> (49 - 7 * i)) & 0x7F) as u8;
        let parity = if seven.count_ones() % 2 == 0 { 1 } else { 0 };
        *byte = (seven << 1) | parity;
    }
    ret
}


/// Encrypts `data` with DES in ECB mode, once with each of three keys derived from `key`.
///
/// The 16-byte key is padded to 21 bytes with zeroes and split into three 7-byte parts, each of
/// which is expanded into a DES key. The three 8-byte ciphertexts are concatenated.
pub fn des_long(key: [u8; 16], data: [u8; 8]) -> [u8; 24] {
    let mut padded_key = [0u8; 21];
    padded_key[0..16].copy_from_slice(&key);

    let mut ret = [0u8; 24];
    for (key_part, output) in padded_key.chunks_exact(7).zip(ret.chunks_exact_mut(8)) {
        let mut key7 = [0u8; 7];
        key7.copy_from_slice(key_part);
        let des_state = Des::new(&GenericArray::from(expand_des_key(key7)));

        let mut block = GenericArray::from(data);
        des_state.encrypt_block(&mut block);
        output.copy_from_slice(block.as_slice());
    }
    ret
}


/// Calculates the NTLMv1 response from the password hash and the server challenge.
///
/// The result depends only on the inputs.
pub fn modern_response(password_hash: [u8; 16], server_challenge: [u8; 8]) -> [u8; 24] {
    des_long(password_hash, server_challenge)
}


/// Returns the LanManager response, which is never calculated and therefore always empty.
pub fn legacy_response() -> Vec<u8> {
    Vec::new()
}


/// Calculates the response to the given server challenge.
pub fn respond_challenge(server_challenge: [u8; 8], creds: &Credentials) -> ChallengeResponse {
    let ntlm_key = password_hash(&creds.password);
    ChallengeResponse {
        lm_response: legacy_response(),
        ntlm_response: Vec::from(modern_response(ntlm_key, server_challenge)),
    }
}


impl ChallengeResponse {
    /// Converts this response to a challenge into a full-blown Authenticate NTLM message.
    pub fn to_message(&self, creds: &Credentials) -> Message {
        Message::Authenticate(AuthenticateMessage {
            lm_response: self.lm_response.clone(),
            ntlm_response: self.ntlm_response.clone(),
            domain_name: creds.domain.clone(),
            user_name: creds.username.clone(),
            workstation_name: creds.workstation.clone(),
            flags: AUTHENTICATE_FLAGS,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    const CHALLENGE: [u8; 8] = [0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef];

    #[test]
    fn password_hash_known_answers() {
        assert_eq!(hex(&password_hash("SecREt01")), "cd06ca7c7e10c99b1d33b7485a2ed808");
        assert_eq!(hex(&password_hash("Password")), "a4f49c406510bdcab6824ee7c30fd852");
    }

    #[test]
    fn des_key_expansion_sets_odd_parity() {
        assert_eq!(expand_des_key([0; 7]), [0x01; 8]);
        assert_eq!(expand_des_key([0xFF; 7]), [0xFE; 8]);
        assert_eq!(
            hex(&expand_des_key([0xcd, 0x06, 0xca, 0x7c, 0x7e, 0x10, 0xc9])),
            "cd83b34fc7f14392",
        );
        for b in expand_des_key([0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde]) {
            assert_eq!(b.count_ones() % 2, 1);
        }
    }

    #[test]
    fn modern_response_known_answers() {
        assert_eq!(
            hex(&modern_response(password_hash("SecREt01"), CHALLENGE)),
            "25a98c1c31e81847466b29b2df4680f39958fb8c213a9cc6",
        );
        assert_eq!(
            hex(&modern_response(password_hash("Password"), CHALLENGE)),
            "67c43011f30298a2ad35ece64f16331c44bdbed927841f94",
        );
    }

    #[test]
    fn modern_response_is_deterministic() {
        let hash = password_hash("correct horse");
        let first = modern_response(hash, [9; 8]);
        let second = modern_response(hash, [9; 8]);
        assert_eq!(first, second);
        assert_eq!(first.len(), 24);
        assert_ne!(first, modern_response(hash, [8; 8]));
    }

    #[test]
    fn respond_challenge_leaves_legacy_response_empty() {
        let creds = Credentials::new("alice@CORP", "SecREt01").with_workstation("PC01");
        let response = respond_challenge(CHALLENGE, &creds);
        assert!(response.lm_response.is_empty());
        assert_eq!(response.ntlm_response.len(), 24);
        assert_eq!(legacy_response().len(), 0);

        match response.to_message(&creds) {
            Message::Authenticate(auth) => {
                assert_eq!(auth.user_name, "alice");
                assert_eq!(auth.domain_name, "CORP");
                assert_eq!(auth.workstation_name, "PC01");
                assert_eq!(auth.flags, Flags::NEGOTIATE_UNICODE | Flags::NEGOTIATE_NTLM | Flags::REQUEST_TARGET);
                assert_eq!(auth.ntlm_response, response.ntlm_response);
            },
            other => panic!("unexpected message {:?}", other),
        }
    }
}
