//! Common utilities for the mirror importer crates
//!
//! Provides conversions between ledger identifiers and their EVM/storage encodings,
//! and small hashing/encoding helpers shared by the projection core and the tools.

use chrono::{DateTime, SecondsFormat, Utc};
use prost::Message;

/// Length of an EVM word (storage slot, log topic).
pub const WORD_LEN: usize = 32;

/// Length of an EVM address.
pub const EVM_ADDRESS_LEN: usize = 20;

const NANOS_PER_SECOND: i64 = 1_000_000_000;
const SECONDS_PER_DAY: i64 = 86_400;

// ===== Word padding =====

/// Left-pad bytes to a 32-byte big-endian word (returns None if > 32 bytes)
pub fn left_pad_32(bytes: &[u8]) -> Option<[u8; WORD_LEN]> {
    if bytes.len() > WORD_LEN {
        return None;
    }
    let mut word = [0u8; WORD_LEN];
    // Right-align for big-endian (pad zeros on the left)
    word[WORD_LEN - bytes.len()..].copy_from_slice(bytes);
    Some(word)
}

/// Encode a signed integer as a 32-byte big-endian word (two's complement sign extension)
pub fn i64_to_word(value: i64) -> [u8; WORD_LEN] {
    let fill = if value < 0 { 0xff } else { 0x00 };
    let mut word = [fill; WORD_LEN];
    word[WORD_LEN - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Encode a boolean as a 32-byte word (ABI encoding of `bool`)
pub fn bool_to_word(value: bool) -> [u8; WORD_LEN] {
    let mut word = [0u8; WORD_LEN];
    word[WORD_LEN - 1] = u8::from(value);
    word
}

/// Drop leading zero bytes, keeping at least one byte for a non-empty input
pub fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b != 0) {
        Some(start) => &bytes[start..],
        None if bytes.is_empty() => bytes,
        None => &bytes[bytes.len() - 1..],
    }
}

// ===== Hashing =====

/// Keccak-256 digest as used by the EVM
pub fn keccak256(bytes: &[u8]) -> [u8; WORD_LEN] {
    alloy_primitives::keccak256(bytes).0
}

/// Keccak-256 over the concatenation of several byte strings
pub fn keccak256_concat(parts: &[&[u8]]) -> [u8; WORD_LEN] {
    let total = parts.iter().map(|part| part.len()).sum();
    let mut buffer = Vec::with_capacity(total);
    for part in parts {
        buffer.extend_from_slice(part);
    }
    keccak256(&buffer)
}

// ===== Long-zero EVM addresses =====

/// Encode a `shard.realm.num` id as a 20-byte "long-zero" EVM address.
///
/// Layout: 4 bytes shard, 8 bytes realm, 8 bytes num (all big-endian).
pub fn long_zero_address(shard: i64, realm: i64, num: i64) -> [u8; EVM_ADDRESS_LEN] {
    let mut address = [0u8; EVM_ADDRESS_LEN];
    address[..4].copy_from_slice(&(shard as i32).to_be_bytes());
    address[4..12].copy_from_slice(&realm.to_be_bytes());
    address[12..].copy_from_slice(&num.to_be_bytes());
    address
}

/// Decode a long-zero EVM address into `(shard, realm, num)`.
///
/// Returns None when the input is not 20 bytes long. Whether the decoded shard and realm
/// are acceptable is up to the caller.
pub fn decode_long_zero_address(bytes: &[u8]) -> Option<(i64, i64, i64)> {
    if bytes.len() != EVM_ADDRESS_LEN {
        return None;
    }
    let shard = i32::from_be_bytes(bytes[..4].try_into().ok()?);
    let realm = i64::from_be_bytes(bytes[4..12].try_into().ok()?);
    let num = i64::from_be_bytes(bytes[12..].try_into().ok()?);
    Some((i64::from(shard), realm, num))
}

// ===== Protobuf key lists =====

/// Wire shape of the protocol `KeyList` message.
///
/// Each entry is an already-serialized `Key` message; a repeated bytes field with tag 1
/// is byte-identical to a repeated embedded `Key` field.
#[derive(Clone, PartialEq, Message)]
struct KeyList {
    #[prost(bytes = "vec", repeated, tag = "1")]
    keys: Vec<Vec<u8>>,
}

/// Serialize a list of serialized keys as a protobuf `KeyList`.
///
/// An empty list serializes to an empty (non-null) byte string.
pub fn encode_key_list(keys: &[Vec<u8>]) -> Vec<u8> {
    KeyList {
        keys: keys.to_vec(),
    }
    .encode_to_vec()
}

/// Parse a serialized `KeyList` back into its serialized keys
pub fn decode_key_list(bytes: &[u8]) -> Option<Vec<Vec<u8>>> {
    KeyList::decode(bytes).ok().map(|list| list.keys)
}

// ===== Formatting =====

/// Format bytes as 0x-prefixed lowercase hex
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Render a consensus timestamp (nanoseconds since epoch) as RFC 3339
pub fn format_timestamp(nanos: i64) -> String {
    let seconds = nanos.div_euclid(NANOS_PER_SECOND);
    let subsec = nanos.rem_euclid(NANOS_PER_SECOND) as u32;
    DateTime::<Utc>::from_timestamp(seconds, subsec).map_or_else(
        || nanos.to_string(),
        |time| time.to_rfc3339_opts(SecondsFormat::Nanos, true),
    )
}

/// Days since epoch for a nanosecond timestamp
pub fn epoch_day(nanos: i64) -> i64 {
    nanos.div_euclid(NANOS_PER_SECOND).div_euclid(SECONDS_PER_DAY)
}

/// Convert a `(seconds, nanos)` protocol timestamp to nanoseconds since epoch, saturating
pub fn timestamp_to_nanos(seconds: i64, nanos: i32) -> i64 {
    seconds
        .saturating_mul(NANOS_PER_SECOND)
        .saturating_add(i64::from(nanos))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_left_pad_32() {
        let word = left_pad_32(&[0x01, 0x02]).unwrap();
        assert_eq!(word[30], 0x01);
        assert_eq!(word[31], 0x02);
        assert!(word[..30].iter().all(|&b| b == 0));

        assert_eq!(left_pad_32(&[]).unwrap(), [0u8; 32]);
        assert!(left_pad_32(&[0u8; 33]).is_none());
    }

    #[test]
    fn test_i64_to_word_sign_extension() {
        assert_eq!(i64_to_word(1)[31], 1);
        assert!(i64_to_word(1)[..31].iter().all(|&b| b == 0));
        assert_eq!(i64_to_word(-1), [0xff; 32]);
    }

    #[test]
    fn test_trim_leading_zeros() {
        assert_eq!(trim_leading_zeros(&[0, 0, 5, 0]), &[5, 0]);
        assert_eq!(trim_leading_zeros(&[0, 0]), &[0]);
        assert_eq!(trim_leading_zeros(&[]), &[] as &[u8]);
    }

    #[test]
    fn test_keccak256_empty() {
        assert_eq!(
            hex::encode(keccak256(&[])),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_keccak256_concat_matches_single_buffer() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        let mut joined = a.to_vec();
        joined.extend_from_slice(&b);
        assert_eq!(keccak256_concat(&[&a, &b]), keccak256(&joined));
    }

    #[test]
    fn test_long_zero_address() {
        let address = long_zero_address(0, 0, 1234);
        assert!(address[..12].iter().all(|&b| b == 0));
        assert_eq!(decode_long_zero_address(&address), Some((0, 0, 1234)));

        let address = long_zero_address(1, 2, 3);
        assert_eq!(decode_long_zero_address(&address), Some((1, 2, 3)));
        assert_eq!(decode_long_zero_address(&address[1..]), None);
    }

    #[test]
    fn test_encode_key_list() {
        assert!(encode_key_list(&[]).is_empty());

        let keys = vec![vec![0x0a, 0x01, 0xff], vec![0x12, 0x00]];
        let encoded = encode_key_list(&keys);
        assert_eq!(
            encoded,
            vec![0x0a, 0x03, 0x0a, 0x01, 0xff, 0x0a, 0x02, 0x12, 0x00]
        );
        assert_eq!(decode_key_list(&encoded), Some(keys));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00.000000000Z");
        assert_eq!(
            format_timestamp(1_500_000_000_000_000_001),
            "2017-07-14T02:40:00.000000001Z"
        );
    }

    #[test]
    fn test_epoch_day() {
        assert_eq!(epoch_day(0), 0);
        assert_eq!(epoch_day(86_400 * NANOS_PER_SECOND + 1), 1);
        assert_eq!(timestamp_to_nanos(2, 5), 2_000_000_005);
    }
}
