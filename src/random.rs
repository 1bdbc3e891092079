//! Random value primitives shared by every field generator.

use rand::Rng;

/// Characters used by [`random_string`]: lowercase ASCII letters and digits.
pub const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Build a string of exactly `len` characters drawn uniformly from [`ALPHABET`].
pub fn random_string<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Append `len` random [`ALPHABET`] characters to `out` without an
/// intermediate allocation.
pub fn push_random<R: Rng + ?Sized>(rng: &mut R, out: &mut String, len: usize) {
    out.reserve(len);
    for _ in 0..len {
        out.push(ALPHABET[rng.random_range(0..ALPHABET.len())] as char);
    }
}

/// An identifier shaped like a UUID (`8-4-4-4-12`).
///
/// The groups come from [`random_string`], so the result is neither hex nor
/// RFC 4122 compliant. Ingestion backends only ever see it as an opaque
/// label value.
pub fn uuid_like<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut id = String::with_capacity(36);
    for (i, len) in [8, 4, 4, 4, 12].into_iter().enumerate() {
        if i > 0 {
            id.push('-');
        }
        push_random(rng, &mut id, len);
    }
    id
}

/// A uniformly random IPv4 octet.
pub fn random_octet<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    rng.random()
}
