//! Constant-time equality for secret material of arbitrary length.

// crates.io
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Compares two byte strings without leaking where (or whether by length) they differ.
///
/// Both inputs are first reduced to SHA-256 digests, so the constant-time comparison always
/// runs over two 32-byte buffers. Inputs of different lengths cost the same as equal-length
/// ones and yield `false`.
pub fn timing_safe_eq(a: &[u8], b: &[u8]) -> bool {
	let left = Sha256::digest(a);
	let right = Sha256::digest(b);

	bool::from(left.as_slice().ct_eq(right.as_slice()))
}

/// String convenience over [`timing_safe_eq`].
pub fn timing_safe_eq_str(a: &str, b: &str) -> bool {
	timing_safe_eq(a.as_bytes(), b.as_bytes())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn equal_inputs_match() {
		assert!(timing_safe_eq(b"order-secret", b"order-secret"));
		assert!(timing_safe_eq(b"", b""));
	}

	#[test]
	fn differing_inputs_do_not_match() {
		assert!(!timing_safe_eq(b"order-secret", b"order-secreT"));
		assert!(!timing_safe_eq(b"order-secret", b"order-secret "));
		assert!(!timing_safe_eq(b"", b"x"));
		assert!(!timing_safe_eq_str("abc", "abd"));
	}
}
