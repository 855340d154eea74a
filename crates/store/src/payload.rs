//! Encoded payload, encoding version 0.
//!
//! - begins with a 32 byte header = [0x00, version byte 0, uint32 len of data, 0x00, ..., 0x00]
//! - followed by the encoded data [0x00, 31 bytes of data, 0x00, 31 bytes of data, ...]
//! - zero padded up to a power of 2 number of field elements
//!
//! The zero byte heading each 32 byte chunk keeps every chunk below the bn254 modulus.
use alloy_primitives::Bytes;

pub const PAYLOAD_ENCODING_VERSION_0: u8 = 0x0;
/// Number of bytes per bn254 field element
pub const BYTES_PER_FIELD_ELEMENT: usize = 32;
/// Encoded payload header length in bytes (first field element)
pub const ENCODED_PAYLOAD_HEADER_LEN_BYTES: usize = 32;
const BYTES_PER_CHUNK: usize = BYTES_PER_FIELD_ELEMENT - 1;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum EncodedPayloadDecodingError {
    #[error("invalid number of bytes in the encoded payload {0}, that is not multiple of bytes per field element")]
    InvalidLengthEncodedPayload(u64),
    #[error("encoded payload must be a power of 2 field elements (32 bytes chunks), but got {0} field elements")]
    InvalidPowerOfTwoLength(usize),
    #[error("encoded payload header first byte must be 0x00, but got {0:#04x}")]
    InvalidHeaderFirstByte(u8),
    #[error("encoded payload must be at least {expected} bytes long to contain a header, but got {actual} bytes")]
    PayloadTooShortForHeader { expected: usize, actual: usize },
    #[error("unknown encoded payload header version: {0}")]
    UnknownEncodingVersion(u8),
    #[error("length of unpadded data {actual} is less than length claimed in encoded payload header {claimed}")]
    UnpaddedDataTooShort { actual: usize, claimed: u32 },
}

/// Largest payload whose encoding fits in a blob of `max_blob_size_bytes`.
pub fn max_payload_size(max_blob_size_bytes: usize) -> usize {
    let field_elements = max_blob_size_bytes / BYTES_PER_FIELD_ELEMENT;
    if field_elements < 2 {
        return 0;
    }
    // largest power of two not above field_elements
    let blob_field_elements = 1usize << (usize::BITS - 1 - field_elements.leading_zeros());
    (blob_field_elements - 1) * BYTES_PER_CHUNK
}

pub fn encode_payload(payload: &[u8]) -> Bytes {
    let chunks = payload.len().div_ceil(BYTES_PER_CHUNK);
    let field_elements = (1 + chunks).next_power_of_two();
    let mut encoded = vec![0u8; field_elements * BYTES_PER_FIELD_ELEMENT];

    encoded[1] = PAYLOAD_ENCODING_VERSION_0;
    // payloads are bounded by the blob size, far below u32::MAX
    let len = payload.len() as u32;
    encoded[2..6].copy_from_slice(&len.to_be_bytes());

    for (i, chunk) in payload.chunks(BYTES_PER_CHUNK).enumerate() {
        let start = ENCODED_PAYLOAD_HEADER_LEN_BYTES + i * BYTES_PER_FIELD_ELEMENT + 1;
        encoded[start..start + chunk.len()].copy_from_slice(chunk);
    }
    encoded.into()
}

pub fn decode_payload(encoded: &[u8]) -> Result<Bytes, EncodedPayloadDecodingError> {
    if encoded.len() % BYTES_PER_FIELD_ELEMENT != 0 {
        return Err(EncodedPayloadDecodingError::InvalidLengthEncodedPayload(
            encoded.len() as u64,
        ));
    }
    if encoded.len() < ENCODED_PAYLOAD_HEADER_LEN_BYTES {
        return Err(EncodedPayloadDecodingError::PayloadTooShortForHeader {
            expected: ENCODED_PAYLOAD_HEADER_LEN_BYTES,
            actual: encoded.len(),
        });
    }
    let field_elements = encoded.len() / BYTES_PER_FIELD_ELEMENT;
    if !field_elements.is_power_of_two() {
        return Err(EncodedPayloadDecodingError::InvalidPowerOfTwoLength(
            field_elements,
        ));
    }
    if encoded[0] != 0x00 {
        return Err(EncodedPayloadDecodingError::InvalidHeaderFirstByte(
            encoded[0],
        ));
    }
    if encoded[1] != PAYLOAD_ENCODING_VERSION_0 {
        return Err(EncodedPayloadDecodingError::UnknownEncodingVersion(
            encoded[1],
        ));
    }
    let claimed = u32::from_be_bytes([encoded[2], encoded[3], encoded[4], encoded[5]]);

    let body = &encoded[ENCODED_PAYLOAD_HEADER_LEN_BYTES..];
    let mut payload = Vec::with_capacity(body.len() / BYTES_PER_FIELD_ELEMENT * BYTES_PER_CHUNK);
    for fe in body.chunks_exact(BYTES_PER_FIELD_ELEMENT) {
        payload.extend_from_slice(&fe[1..]);
    }
    if payload.len() < claimed as usize {
        return Err(EncodedPayloadDecodingError::UnpaddedDataTooShort {
            actual: payload.len(),
            claimed,
        });
    }
    payload.truncate(claimed as usize);
    Ok(payload.into())
}
