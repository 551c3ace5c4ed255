//! Timing-safe equality used by every signature check.
//!
//! Leaking the *length* of a signature is accepted; leaking the position of
//! the first differing byte is not.

use subtle::ConstantTimeEq;

/// Constant-time comparison to prevent timing attacks
///
/// Uses the `subtle` crate which provides compiler-optimization-resistant
/// constant-time operations. This prevents attackers from using timing
/// information to guess valid signatures byte-by-byte.
///
/// Inputs of different length compare unequal without their contents being
/// inspected.
pub fn timing_safe_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.ct_eq(b).into()
}

/// Compare two hex-encoded values after decoding them to bytes
///
/// Decoding is case-insensitive. If either side is not valid hex the values
/// are reported as unequal; this never errors or panics.
pub fn timing_safe_eq_hex(a: &str, b: &str) -> bool {
    match (hex::decode(a.trim()), hex::decode(b.trim())) {
        (Ok(a), Ok(b)) => timing_safe_eq(&a, &b),
        _ => false,
    }
}

/// Compare two strings byte-for-byte in constant time
pub fn timing_safe_eq_str(a: &str, b: &str) -> bool {
    timing_safe_eq(a.as_bytes(), b.as_bytes())
}
