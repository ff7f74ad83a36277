//! Syncsafe integers: big-endian, 7 significant bits per byte, high bit 0.
//!
//! The 4-byte form carries 28 bits and appears in the outer tag size, the
//! v2.4 frame size, the v2.4 extended header size and the data-length
//! indicator.  The 5-byte form carries the 32-bit CRC in a v2.4 extended
//! header (35 bits of room, top 3 unused).

use crate::error::{Id3Error, Result};

/// Largest value representable in 4 syncsafe bytes.
pub const MAX_SYNCSAFE_U28: u32 = 0x0FFF_FFFF;

/// Decode 4 syncsafe bytes.  Any byte with its high bit set is rejected.
pub fn decode_u28(bytes: [u8; 4]) -> Result<u32> {
    let mut value = 0u32;
    for (index, &byte) in bytes.iter().enumerate() {
        if byte & 0x80 != 0 {
            return Err(Id3Error::InvalidSyncsafeByte { index, byte });
        }
        value = (value << 7) | u32::from(byte);
    }
    Ok(value)
}

/// Encode `value` as 4 syncsafe bytes.  Bits above 28 are an error, not
/// silently truncated.
pub fn encode_u28(value: u32) -> Result<[u8; 4]> {
    if value > MAX_SYNCSAFE_U28 {
        return Err(Id3Error::TagTooLarge { size: value as usize });
    }
    Ok([
        ((value >> 21) & 0x7F) as u8,
        ((value >> 14) & 0x7F) as u8,
        ((value >> 7) & 0x7F) as u8,
        (value & 0x7F) as u8,
    ])
}

/// Decode the 5-byte syncsafe form used for the v2.4 extended-header CRC.
pub fn decode_u35(bytes: [u8; 5]) -> Result<u32> {
    let mut value = 0u64;
    for (index, &byte) in bytes.iter().enumerate() {
        if byte & 0x80 != 0 {
            return Err(Id3Error::InvalidSyncsafeByte { index, byte });
        }
        value = (value << 7) | u64::from(byte);
    }
    u32::try_from(value).map_err(|_| Id3Error::FieldOverflow { field: "crc" })
}

/// Encode a 32-bit value in the 5-byte syncsafe form.
pub fn encode_u35(value: u32) -> [u8; 5] {
    let v = u64::from(value);
    [
        ((v >> 28) & 0x7F) as u8,
        ((v >> 21) & 0x7F) as u8,
        ((v >> 14) & 0x7F) as u8,
        ((v >> 7) & 0x7F) as u8,
        (v & 0x7F) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_values() {
        assert_eq!(encode_u28(0).unwrap(), [0, 0, 0, 0]);
        assert_eq!(encode_u28(127).unwrap(), [0, 0, 0, 0x7F]);
        assert_eq!(encode_u28(128).unwrap(), [0, 0, 1, 0]);
        assert_eq!(encode_u28(23).unwrap(), [0, 0, 0, 23]);
        assert_eq!(encode_u28(MAX_SYNCSAFE_U28).unwrap(), [0x7F; 4]);
        assert_eq!(decode_u28([0, 0, 0x02, 0x01]).unwrap(), 257);
    }

    #[test]
    fn rejects_high_bit() {
        match decode_u28([0, 0x80, 0, 0]) {
            Err(Id3Error::InvalidSyncsafeByte { index: 1, byte: 0x80 }) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn rejects_values_above_28_bits() {
        assert!(matches!(encode_u28(0x1000_0000), Err(Id3Error::TagTooLarge { .. })));
    }

    #[test]
    fn crc_form_holds_full_u32() {
        let bytes = encode_u35(u32::MAX);
        assert!(bytes.iter().all(|b| b & 0x80 == 0));
        assert_eq!(decode_u35(bytes).unwrap(), u32::MAX);
    }

    proptest! {
        #[test]
        fn u28_roundtrip(n in 0u32..=MAX_SYNCSAFE_U28) {
            prop_assert_eq!(decode_u28(encode_u28(n).unwrap()).unwrap(), n);
        }

        #[test]
        fn u35_roundtrip(n in any::<u32>()) {
            prop_assert_eq!(decode_u35(encode_u35(n)).unwrap(), n);
        }
    }
}
