// dryrun/core/storage/src/codec.rs

// Integer encoding used for counters and balances kept in storage slots.
//
// Values are little-endian two's complement with the minimal number of bytes
// that preserves the sign; zero encodes as the empty byte string.
use crate::error::StorageError;

/// Widest integer the sandbox stores
const MAX_INTEGER_BYTES: usize = 16;

pub fn encode_integer(value: i128) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let bytes = value.to_le_bytes();
    let mut len = bytes.len();
    // Trim redundant sign-extension bytes
    while len > 1 {
        let last = bytes[len - 1];
        let prev_negative = bytes[len - 2] & 0x80 != 0;
        if (last == 0x00 && !prev_negative) || (last == 0xff && prev_negative) {
            len -= 1;
        } else {
            break;
        }
    }
    bytes[..len].to_vec()
}

pub fn decode_integer(bytes: &[u8]) -> Result<i128, StorageError> {
    if bytes.is_empty() {
        return Ok(0);
    }
    if bytes.len() > MAX_INTEGER_BYTES {
        return Err(StorageError::IntegerOverflow(bytes.len()));
    }
    let negative = bytes[bytes.len() - 1] & 0x80 != 0;
    let mut buf = if negative { [0xffu8; 16] } else { [0u8; 16] };
    buf[..bytes.len()].copy_from_slice(bytes);
    Ok(i128::from_le_bytes(buf))
}
