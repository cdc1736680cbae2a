use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::bail;
use crate::error::{ApplyResult, ErrorKind};
use crate::types::BinaryEncoding;

/// Decodes a binary column value from its batch text encoding into raw bytes.
///
/// With [`BinaryEncoding::None`] the value's bytes are taken verbatim;
/// otherwise the text is interpreted as hex or base64. Malformed input fails
/// with a conversion error so the enclosing write aborts instead of loading
/// a corrupted value.
pub fn decode_binary(value: &str, encoding: BinaryEncoding) -> ApplyResult<Vec<u8>> {
    match encoding {
        BinaryEncoding::None => Ok(value.as_bytes().to_vec()),
        BinaryEncoding::Hex => decode_hex(value),
        BinaryEncoding::Base64 => Ok(STANDARD.decode(value)?),
    }
}

/// Converts a hex string to a byte array.
///
/// Each pair of hex digits represents one byte in the output array.
fn decode_hex(hex_string: &str) -> ApplyResult<Vec<u8>> {
    // Non-ASCII input can never be valid hex, and rejecting it here keeps
    // the pairwise byte slicing below on char boundaries.
    if !hex_string.is_ascii() {
        bail!(
            ErrorKind::ConversionError,
            "Could not convert from hex string to byte array",
            "The string contains non-ASCII characters"
        );
    }

    if hex_string.len() % 2 != 0 {
        bail!(
            ErrorKind::ConversionError,
            "Could not convert from hex string to byte array",
            "The number of digits is odd"
        );
    }

    let mut result = Vec::with_capacity(hex_string.len() / 2);

    for i in (0..hex_string.len()).step_by(2) {
        let val = u8::from_str_radix(&hex_string[i..i + 2], 16)?;
        result.push(val);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn decode_hex_empty() {
        let result = decode_binary("", BinaryEncoding::Hex).unwrap();
        assert_eq!(result, Vec::<u8>::new());
    }

    #[test]
    fn decode_hex_single_byte() {
        let result = decode_binary("41", BinaryEncoding::Hex).unwrap();
        assert_eq!(result, vec![0x41]);
    }

    #[test]
    fn decode_hex_multiple_bytes() {
        let result = decode_binary("48656c6c6f", BinaryEncoding::Hex).unwrap();
        assert_eq!(result, b"Hello");
    }

    #[test]
    fn decode_hex_mixed_case() {
        let result = decode_binary("aBcD", BinaryEncoding::Hex).unwrap();
        assert_eq!(result, vec![0xab, 0xcd]);
    }

    #[test]
    fn decode_hex_binary_data() {
        let result = decode_binary("00010203ff", BinaryEncoding::Hex).unwrap();
        assert_eq!(result, vec![0, 1, 2, 3, 0xff]);
    }

    #[test]
    fn decode_hex_odd_length() {
        let result = decode_binary("4", BinaryEncoding::Hex);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ConversionError));
        assert!(err.to_string().contains("number of digits is odd"));
    }

    #[test]
    fn decode_hex_invalid_digit() {
        let result = decode_binary("4g", BinaryEncoding::Hex);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ConversionError));
        assert!(err.to_string().contains("invalid digit"));
    }

    #[test]
    fn decode_hex_non_ascii() {
        assert!(decode_binary("4🤔", BinaryEncoding::Hex).is_err());
    }

    #[test]
    fn decode_hex_non_ascii_even_byte_length() {
        // Two 4-byte chars: even byte count, so only the ASCII check
        // rejects this before the pairwise slicing.
        let result = decode_binary("🤔🤔", BinaryEncoding::Hex);
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err().kind(),
            ErrorKind::ConversionError
        ));
    }

    #[test]
    fn decode_base64_roundtrip() {
        let result = decode_binary("SGVsbG8=", BinaryEncoding::Base64).unwrap();
        assert_eq!(result, b"Hello");
    }

    #[test]
    fn decode_base64_invalid_input() {
        let result = decode_binary("not base64!!", BinaryEncoding::Base64);
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err().kind(),
            ErrorKind::ConversionError
        ));
    }

    #[test]
    fn decode_none_passes_text_through() {
        let result = decode_binary("raw", BinaryEncoding::None).unwrap();
        assert_eq!(result, b"raw");
    }
}
