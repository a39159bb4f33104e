//! String encodings used inside NTLM messages.
//!
//! Strings travel either as UTF-16 in little-endian byte order (when Unicode has been negotiated)
//! or in the OEM character set. There is no portable notion of an OEM code page, so OEM strings are
//! passed through as their literal UTF-8 bytes, which is what servers receive from the usual
//! non-Windows clients as well.


/// Encodes a string as UTF-16 in little-endian byte order, without a Byte Order Mark.
pub fn string_to_utf16_le(string: &str) -> Vec<u8> {
    string.encode_utf16()
        .flat_map(|w| w.to_le_bytes())
        .collect()
}


/// Decodes UTF-16 values stored as bytes in little-endian order into a string.
///
/// Returns `None` if the byte count is odd or the values are not valid UTF-16.
pub fn utf16_le_to_string(bytes: &[u8]) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes.chunks_exact(2)
        .map(|chk| u16::from_le_bytes([chk[0], chk[1]]))
        .collect();
    String::from_utf16(&units).ok()
}


/// Converts a string into its OEM byte representation.
pub fn string_to_oem(string: &str) -> Vec<u8> {
    Vec::from(string.as_bytes())
}


/// Converts OEM bytes into a string.
pub fn oem_to_string(bytes: &[u8]) -> Option<String> {
    String::from_utf8(Vec::from(bytes)).ok()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf16_le_has_two_bytes_per_unit() {
        assert_eq!(string_to_utf16_le("Ab"), vec![0x41, 0x00, 0x62, 0x00]);
        assert_eq!(string_to_utf16_le(""), Vec::<u8>::new());
        assert_eq!(string_to_utf16_le("\u{00E4}"), vec![0xE4, 0x00]);
    }

    #[test]
    fn utf16_le_decoding_rejects_odd_lengths() {
        assert_eq!(utf16_le_to_string(&[0x41, 0x00, 0x42]), None);
        assert_eq!(utf16_le_to_string(&[0x41, 0x00, 0x42, 0x00]).as_deref(), Some("AB"));
    }

    #[test]
    fn oem_is_literal() {
        assert_eq!(string_to_oem("WORKSTATION"), b"WORKSTATION".to_vec());
        assert_eq!(oem_to_string(b"DOMAIN").as_deref(), Some("DOMAIN"));
        assert_eq!(oem_to_string(&[0xFF, 0xFE]), None);
    }
}
