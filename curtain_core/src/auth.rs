//! Shared API-key check applied to every request.

/// Compare `token` against `expected` without early exit on the first
/// mismatching byte.
pub fn verify_api_key(expected: &str, token: &str) -> bool {
    let a = expected.as_bytes();
    let b = token.as_bytes();
    let mut diff = (a.len() ^ b.len()) as u8 | u8::from(a.len() != b.len());
    for (i, x) in a.iter().enumerate() {
        let y = b.get(i).copied().unwrap_or(0);
        diff |= x ^ y;
    }
    diff == 0 && !a.is_empty()
}
