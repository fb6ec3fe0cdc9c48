use crate::{HashError, DIGEST_LEN, HEX_LEN};

/// Lookup table: ASCII byte → nibble value (255 = invalid).
const HEX_DECODE: [u8; 256] = {
    let mut table = [255u8; 256];
    let mut i = 0u8;
    loop {
        match i {
            b'0'..=b'9' => table[i as usize] = i - b'0',
            b'a'..=b'f' => table[i as usize] = i - b'a' + 10,
            b'A'..=b'F' => table[i as usize] = i - b'A' + 10,
            _ => {}
        }
        if i == 255 {
            break;
        }
        i += 1;
    }
    table
};

const HEX_ENCODE: &[u8; 16] = b"0123456789abcdef";

/// Hex-encode a 20-byte digest to its 40-character lowercase form.
pub fn encode(digest: &[u8; DIGEST_LEN]) -> String {
    let mut buf = [0u8; HEX_LEN];
    for (i, &b) in digest.iter().enumerate() {
        buf[i * 2] = HEX_ENCODE[(b >> 4) as usize];
        buf[i * 2 + 1] = HEX_ENCODE[(b & 0x0f) as usize];
    }
    // Only ASCII hex digits were written.
    unsafe { String::from_utf8_unchecked(buf.to_vec()) }
}

/// Decode a 40-character hex string to a 20-byte digest.
///
/// Accepts upper and lower case; rejects any other length or character.
pub fn decode(hex: &str) -> Result<[u8; DIGEST_LEN], HashError> {
    let hex = hex.as_bytes();
    if hex.len() != HEX_LEN {
        return Err(HashError::InvalidHexLength {
            expected: HEX_LEN,
            actual: hex.len(),
        });
    }
    let mut out = [0u8; DIGEST_LEN];
    for (i, slot) in out.iter_mut().enumerate() {
        let hi = HEX_DECODE[hex[i * 2] as usize];
        let lo = HEX_DECODE[hex[i * 2 + 1] as usize];
        if hi == 255 {
            return Err(HashError::InvalidHex {
                position: i * 2,
                character: hex[i * 2] as char,
            });
        }
        if lo == 255 {
            return Err(HashError::InvalidHex {
                position: i * 2 + 1,
                character: hex[i * 2 + 1] as char,
            });
        }
        *slot = (hi << 4) | lo;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: [u8; DIGEST_LEN] = [
        0xda, 0x39, 0xa3, 0xee, 0x5e, 0x6b, 0x4b, 0x0d, 0x32, 0x55, 0xbf, 0xef, 0x95, 0x60,
        0x18, 0x90, 0xaf, 0xd8, 0x07, 0x09,
    ];

    #[test]
    fn encode_decode_roundtrip() {
        let hex = encode(&SAMPLE);
        assert_eq!(hex, "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(decode(&hex).unwrap(), SAMPLE);
    }

    #[test]
    fn decode_uppercase() {
        let digest = decode("DA39A3EE5E6B4B0D3255BFEF95601890AFD80709").unwrap();
        assert_eq!(digest, SAMPLE);
    }

    #[test]
    fn decode_invalid_char() {
        let err = decode("zz39a3ee5e6b4b0d3255bfef95601890afd80709").unwrap_err();
        match err {
            HashError::InvalidHex {
                position: 0,
                character: 'z',
            } => {}
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn decode_wrong_length() {
        let err = decode("abcd").unwrap_err();
        assert!(matches!(
            err,
            HashError::InvalidHexLength {
                expected: 40,
                actual: 4
            }
        ));
    }
}
