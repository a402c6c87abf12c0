//! Fixed-width float codec
//!
//! A float travels as exactly [`FLOAT_LEN`] characters: the standard base64
//! alphabet applied to its four little-endian bytes, without padding. The
//! 36 encoded bits carry the 32 float bits followed by four zero bits.

/// Encoded width of one float in characters
pub const FLOAT_LEN: usize = 6;

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Errors that can occur while decoding command arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Float field is short, malformed or not finite
    BadFloat,
    /// Arguments are structurally invalid
    InvalidArguments,
}

/// Errors that can occur while encoding a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// Output buffer is full
    BufferTooSmall,
    /// Value cannot be represented on the wire
    InvalidValue,
}

fn sextet(c: u8) -> Option<u64> {
    let value = match c {
        b'A'..=b'Z' => c - b'A',
        b'a'..=b'z' => c - b'a' + 26,
        b'0'..=b'9' => c - b'0' + 52,
        b'+' => 62,
        b'/' => 63,
        _ => return None,
    };
    Some(value as u64)
}

/// Decode one float from the start of `input`
///
/// Only the first [`FLOAT_LEN`] bytes are examined.
pub fn decode_float(input: &[u8]) -> Result<f32, DecodeError> {
    if input.len() < FLOAT_LEN {
        return Err(DecodeError::BadFloat);
    }

    let mut bits: u64 = 0;
    for &c in &input[..FLOAT_LEN] {
        bits = (bits << 6) | sextet(c).ok_or(DecodeError::BadFloat)?;
    }

    // Trailing pad bits must be clear
    if bits & 0xF != 0 {
        return Err(DecodeError::BadFloat);
    }

    let bytes = ((bits >> 4) as u32).to_be_bytes();
    let value = f32::from_le_bytes(bytes);

    if !value.is_finite() {
        return Err(DecodeError::BadFloat);
    }

    Ok(value)
}

/// Encode a float into its wire characters
pub fn encode_float(value: f32) -> Result<[u8; FLOAT_LEN], EncodeError> {
    if !value.is_finite() {
        return Err(EncodeError::InvalidValue);
    }

    let bits = (u32::from_be_bytes(value.to_le_bytes()) as u64) << 4;

    let mut out = [0u8; FLOAT_LEN];
    for (i, slot) in out.iter_mut().enumerate() {
        let shift = 30 - 6 * i;
        *slot = ALPHABET[((bits >> shift) & 0x3F) as usize];
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(&encode_float(0.0).unwrap(), b"AAAAAA");
        assert_eq!(&encode_float(1.0).unwrap(), b"AACAPw");
        assert_eq!(decode_float(b"AACAPw").unwrap(), 1.0);
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        assert_eq!(decode_float(b"AACAPwxyz").unwrap(), 1.0);
    }

    #[test]
    fn test_short_input() {
        assert_eq!(decode_float(b"AACAP"), Err(DecodeError::BadFloat));
        assert_eq!(decode_float(b""), Err(DecodeError::BadFloat));
    }

    #[test]
    fn test_bad_character() {
        assert_eq!(decode_float(b"AAC=Pw"), Err(DecodeError::BadFloat));
        assert_eq!(decode_float(b"AAC Pw"), Err(DecodeError::BadFloat));
    }

    #[test]
    fn test_nonzero_pad_bits() {
        // Last character 'x' sets pad bits that 'w' leaves clear
        assert_eq!(decode_float(b"AACAPx"), Err(DecodeError::BadFloat));
    }

    #[test]
    fn test_non_finite_rejected() {
        assert_eq!(encode_float(f32::NAN), Err(EncodeError::InvalidValue));
        assert_eq!(encode_float(f32::INFINITY), Err(EncodeError::InvalidValue));

        // Hand-built infinity: bytes 00 00 80 7F
        assert_eq!(decode_float(b"AACAfw"), Err(DecodeError::BadFloat));
    }

    #[test]
    fn test_negative_values() {
        let encoded = encode_float(-2.5).unwrap();
        assert_eq!(decode_float(&encoded).unwrap(), -2.5);
    }
}
