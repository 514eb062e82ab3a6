//! Fixed-width, native-endian record codec
//!
//! Records cross the producer/consumer boundary as plain `#[repr(C)]` bytes on
//! the same host, so integers are encoded at their full width in native byte
//! order with no length prefixes. Trailing bytes are ignored on decode, which
//! lets a consumer read a smaller type out of a larger record.

use bincode::Options;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Result, RingprobeError};

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_native_endian()
        .allow_trailing_bytes()
}

/// Number of bytes `value` occupies on the wire
pub fn encoded_size<T: Serialize + ?Sized>(value: &T) -> Result<usize> {
    Ok(options().serialized_size(value)? as usize)
}

/// Encode `value` into the front of `buf`, returning the number of bytes written
pub fn encode_into<T: Serialize + ?Sized>(value: &T, buf: &mut [u8]) -> Result<usize> {
    let size = encoded_size(value)?;
    if size > buf.len() {
        return Err(RingprobeError::serialization(format!(
            "value needs {} bytes, buffer holds {}",
            size,
            buf.len()
        )));
    }
    options().serialize_into(&mut buf[..size], value)?;
    Ok(size)
}

/// Encode `value` into a fresh byte vector
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    Ok(options().serialize(value)?)
}

/// Decode a `T` from the front of `bytes`
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(options().deserialize(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u64_is_native_width() {
        let bytes = encode(&0x0102_0304_0506_0708u64).unwrap();
        assert_eq!(bytes, 0x0102_0304_0506_0708u64.to_ne_bytes());
    }

    #[test]
    fn test_encode_into_short_buffer() {
        let mut buf = [0u8; 4];
        let err = encode_into(&7u64, &mut buf).unwrap_err();
        assert!(matches!(err, RingprobeError::Serialization { .. }));
        assert!(!err.is_no_space());
    }

    #[test]
    fn test_decode_short_input() {
        let err = decode::<u64>(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, RingprobeError::Serialization { .. }));
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut bytes = 9u32.to_ne_bytes().to_vec();
        bytes.extend_from_slice(&[0xAA; 12]);
        assert_eq!(decode::<u32>(&bytes).unwrap(), 9);
    }
}
