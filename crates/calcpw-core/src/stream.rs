//! Deterministic keystream for password derivation.
//!
//! All randomness a derivation consumes comes from one [`KeyStream`], built
//! from the two secrets and the context string:
//!
//! ```text
//! secret1 / secret2 / context ──► length framing ──► HKDF-SHA256 ──► seed
//! seed ──► HMAC-SHA256(seed, counter) ──► byte stream ──► rejection sampling ──► indices
//! ```
//!
//! The stream is ephemeral: it lives inside a single derivation call, is
//! consumed strictly in order, and zeroizes its buffered block on drop.
//! Identical inputs always rebuild the identical stream.

use std::fmt;

use ring::{hkdf, hmac};
use zeroize::{Zeroize, Zeroizing};

use crate::error::DeriveError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// HKDF salt for seed extraction (domain separation).
const SEED_SALT: &[u8] = b"calcpw-seed-v1";

/// HKDF info string for the keystream seed.
const SEED_INFO: &[u8] = b"password-keystream";

/// Seed length in bytes (256 bits).
const SEED_LEN: usize = 32;

/// Bytes per keystream block (SHA-256 output size).
const BLOCK_LEN: usize = 32;

/// Consecutive rejected draws before [`KeyStream::next_index`] reports an
/// internal failure. Each draw is accepted with probability above one half,
/// so hitting this bound means the primitive is broken, not unlucky.
const MAX_REJECTED_DRAWS: usize = 4096;

// ---------------------------------------------------------------------------
// HKDF key type
// ---------------------------------------------------------------------------

/// Marker type for `ring::hkdf::Prk::expand` — requests 32-byte output.
struct SeedKeyType;

impl hkdf::KeyType for SeedKeyType {
    fn len(&self) -> usize {
        SEED_LEN
    }
}

// ---------------------------------------------------------------------------
// Key material framing
// ---------------------------------------------------------------------------

/// Assemble the framed key-material buffer fed into HKDF extraction.
///
/// Each field is preceded by its byte length as a big-endian `u64`, in the
/// fixed order secret1, secret2, context. The prefixes keep field boundaries
/// unambiguous: inputs that merely shift bytes across a boundary frame to
/// different buffers.
fn frame_key_material(secret1: &[u8], secret2: &[u8], context: &str) -> Zeroizing<Vec<u8>> {
    let fields: [&[u8]; 3] = [secret1, secret2, context.as_bytes()];

    let mut framed = Zeroizing::new(Vec::new());
    for field in fields {
        framed.extend_from_slice(&(field.len() as u64).to_be_bytes());
        framed.extend_from_slice(field);
    }
    framed
}

/// Smallest byte width `k` with `256^k >= n`, or `None` past the supported
/// four-byte maximum.
const fn byte_width(n: u64) -> Option<usize> {
    match n {
        0 => None,
        1..=256 => Some(1),
        257..=65_536 => Some(2),
        65_537..=16_777_216 => Some(3),
        16_777_217..=4_294_967_296 => Some(4),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// KeyStream
// ---------------------------------------------------------------------------

/// Counter-mode HMAC-SHA256 keystream over an HKDF-extracted seed.
///
/// Block `i` is `HMAC-SHA256(seed, BE64(i))` with `i` starting at zero;
/// bytes are handed out in block order, then in byte order within a block.
/// The counter gives the stream an effectively unlimited supply, so a single
/// stream covers generation and the enforcement pass of any request.
pub struct KeyStream {
    key: hmac::Key,
    counter: u64,
    block: [u8; BLOCK_LEN],
    used: usize,
}

impl KeyStream {
    /// Build the keystream for one derivation.
    ///
    /// The seed is extracted from the framed key material with HKDF-SHA256
    /// under a fixed application salt, then expanded once into the 256-bit
    /// HMAC key that drives the counter blocks.
    ///
    /// # Errors
    ///
    /// Returns [`DeriveError::InternalCryptoFailure`] if HKDF extraction or
    /// expansion fails.
    pub fn new(secret1: &[u8], secret2: &[u8], context: &str) -> Result<Self, DeriveError> {
        let framed = frame_key_material(secret1, secret2, context);

        let salt = hkdf::Salt::new(hkdf::HKDF_SHA256, SEED_SALT);
        let prk = salt.extract(&framed);
        let okm = prk
            .expand(&[SEED_INFO], SeedKeyType)
            .map_err(|_| DeriveError::InternalCryptoFailure("HKDF expand failed".into()))?;

        let mut seed = [0u8; SEED_LEN];
        okm.fill(&mut seed)
            .map_err(|_| DeriveError::InternalCryptoFailure("HKDF fill failed".into()))?;

        let key = hmac::Key::new(hmac::HMAC_SHA256, &seed);
        seed.zeroize();

        Ok(Self {
            key,
            counter: 0,
            block: [0u8; BLOCK_LEN],
            used: BLOCK_LEN, // forces a refill on the first draw
        })
    }

    /// Next byte of the stream.
    ///
    /// # Errors
    ///
    /// Returns [`DeriveError::InternalCryptoFailure`] if the block counter
    /// is exhausted (2^64 blocks consumed).
    pub fn next_byte(&mut self) -> Result<u8, DeriveError> {
        if self.used == BLOCK_LEN {
            self.refill()?;
        }
        let byte = self.block[self.used];
        self.used = self.used.wrapping_add(1);
        Ok(byte)
    }

    /// Draw an index uniformly from `0..n` by rejection sampling.
    ///
    /// Reads the smallest byte width `k` with `256^k >= n` per draw and
    /// rejects values at or above the largest multiple of `n` that fits, so
    /// the final remainder is exactly uniform. Rejected draws are discarded
    /// whole; their bytes are never reused.
    ///
    /// # Errors
    ///
    /// Returns [`DeriveError::InternalCryptoFailure`] if `n` is zero or
    /// larger than the four-byte sampler width, if the stream is exhausted,
    /// or if the rejection bound is hit.
    pub fn next_index(&mut self, n: usize) -> Result<usize, DeriveError> {
        let range = u64::try_from(n)
            .ok()
            .filter(|&r| r > 0)
            .ok_or_else(|| {
                DeriveError::InternalCryptoFailure(format!("unsupported index range {n}"))
            })?;
        let width = byte_width(range).ok_or_else(|| {
            DeriveError::InternalCryptoFailure(format!("unsupported index range {n}"))
        })?;

        // span = 256^width for the supported widths.
        let span: u64 = match width {
            1 => 256,
            2 => 65_536,
            3 => 16_777_216,
            _ => 4_294_967_296,
        };
        // range >= 1 keeps the remainder defined, and it never exceeds span.
        #[allow(clippy::arithmetic_side_effects)]
        let limit = span - (span % range);

        for _ in 0..MAX_REJECTED_DRAWS {
            let mut value = 0u64;
            for _ in 0..width {
                // width <= 4, so value < 2^24 before the shift: no overflow.
                #[allow(clippy::arithmetic_side_effects)]
                {
                    value = (value << 8) | u64::from(self.next_byte()?);
                }
            }
            if value < limit {
                // limit is a multiple of range, so the remainder is uniform.
                #[allow(clippy::arithmetic_side_effects)]
                let index = value % range;
                return usize::try_from(index).map_err(|_| {
                    DeriveError::InternalCryptoFailure(
                        "sampled index exceeds the address width".to_string(),
                    )
                });
            }
        }

        Err(DeriveError::InternalCryptoFailure(
            "rejection sampling exhausted its draw bound".to_string(),
        ))
    }

    /// Compute the next counter block into the internal buffer.
    fn refill(&mut self) -> Result<(), DeriveError> {
        let tag = hmac::sign(&self.key, &self.counter.to_be_bytes());
        self.block.copy_from_slice(tag.as_ref());
        self.counter = self.counter.checked_add(1).ok_or_else(|| {
            DeriveError::InternalCryptoFailure("keystream counter exhausted".to_string())
        })?;
        self.used = 0;
        Ok(())
    }
}

impl fmt::Debug for KeyStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyStream(***)")
    }
}

impl Drop for KeyStream {
    fn drop(&mut self) {
        self.block.zeroize();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
