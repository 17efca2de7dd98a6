//! CSPRNG-backed generation of locators and one-time secrets.
//!
//! All randomness comes from `getrandom` (OS-level cryptographic
//! randomness, e.g. /dev/urandom on Linux). General-purpose RNGs are
//! never used for security material.

/// Length of a document locator in characters.
pub const LOCATOR_LEN: usize = 16;

/// URL-safe alphabet for locators. 64 symbols, so each random byte maps
/// uniformly onto one symbol via a 6-bit mask.
const LOCATOR_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Fill a buffer with OS cryptographic randomness.
///
/// # Panics
///
/// Panics if the OS RNG fails. This is intentional - a vault without
/// functioning cryptographic randomness cannot operate securely, and RNG
/// failure indicates OS-level breakage.
#[allow(clippy::expect_used)]
pub(crate) fn fill_random(buffer: &mut [u8]) {
    getrandom::fill(buffer)
        .expect("invariant: OS RNG failure is unrecoverable - vault cannot operate securely");
}

/// Generate an unguessable document locator.
///
/// 16 characters from a 64-symbol URL-safe alphabet: 96 bits of entropy,
/// collision-free in practice. Locator collisions on insert are treated
/// as fatal by the controller, not retried.
pub fn generate_locator() -> String {
    let mut raw = [0u8; LOCATOR_LEN];
    fill_random(&mut raw);
    raw.iter().map(|byte| char::from(LOCATOR_ALPHABET[usize::from(byte & 63)])).collect()
}

/// Generate a 6-digit one-time secret, uniform over [100000, 999999].
///
/// Rejection sampling avoids modulo bias: draws above the largest
/// multiple of the range are discarded and redrawn.
pub fn generate_one_time_secret() -> String {
    const RANGE: u32 = 900_000;
    const LIMIT: u32 = u32::MAX - (u32::MAX % RANGE);

    loop {
        let mut raw = [0u8; 4];
        fill_random(&mut raw);
        let draw = u32::from_be_bytes(raw);
        if draw < LIMIT {
            return (100_000 + draw % RANGE).to_string();
        }
    }
}
