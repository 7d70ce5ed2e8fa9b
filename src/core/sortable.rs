//! Order-preserving serialization of `f64` values.
//!
//! The wire codec and float value slots share one 8-byte encoding whose
//! unsigned byte order matches numeric order, so value-range queries and
//! value sorting work on raw bytes.

/// Width of a serialized double in bytes
pub const SORTABLE_LEN: usize = 8;

/// Serialize a double into its sortable byte form.
///
/// Non-negative numbers get the sign bit flipped, negative numbers get
/// every bit flipped. The result is written big-endian.
pub fn serialise(value: f64) -> [u8; SORTABLE_LEN] {
    // -0.0 and 0.0 compare equal, so they share one key
    let value = if value == 0.0 { 0.0 } else { value };
    let bits = value.to_bits();
    let key = if bits >> 63 == 0 {
        bits ^ (1 << 63)
    } else {
        !bits
    };
    key.to_be_bytes()
}

/// Inverse of [`serialise`].
///
/// Slots that hold something shorter than eight bytes (usually an empty
/// value) read as `0.0`, matching how a missing value is reported.
pub fn unserialise(bytes: &[u8]) -> f64 {
    if bytes.len() < SORTABLE_LEN {
        return 0.0;
    }
    let mut raw = [0u8; SORTABLE_LEN];
    raw.copy_from_slice(&bytes[..SORTABLE_LEN]);
    let key = u64::from_be_bytes(raw);
    let bits = if key >> 63 == 1 {
        key ^ (1 << 63)
    } else {
        !key
    };
    f64::from_bits(bits)
}
