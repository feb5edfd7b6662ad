//! Deterministic password derivation.
//!
//! This module provides:
//! - [`derive`] — typed entry point: two secrets + context + [`OutputPolicy`] → password
//! - [`calcpw`] — the all-strings boundary the surrounding application calls
//! - [`OutputPolicy`] — serializable length/charset/enforcement request
//!
//! Derivation is pure: no storage, no clock, no external randomness.
//! Identical inputs reproduce the identical password on every call and on
//! every machine, which is what lets the application store nothing.

use crate::charset::Charset;
use crate::error::DeriveError;
use crate::stream::KeyStream;
use serde::{Deserialize, Serialize};

/// Default password length.
pub const DEFAULT_LENGTH: u32 = 16;

/// Default enforcement flag.
///
/// Off by default: the 62-symbol default charset is wider than the default
/// length, so enforcement over both defaults would be infeasible.
pub const DEFAULT_ENFORCE: bool = false;

/// Stream draws allowed per enforcement placement, as a multiple of the
/// password length. While a placement is pending at least two positions hold
/// repeated symbols, so each draw succeeds with probability at least
/// 2/length; a bound of 64x the length fails with probability under e^-128.
const PLACEMENT_DRAW_FACTOR: usize = 64;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Shape of the derived output: length, alphabet, coverage enforcement.
///
/// The surrounding application persists one of these as its defaults and
/// sends a copy with every request; the engine itself keeps no state between
/// calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputPolicy {
    /// Number of symbols in the derived password.
    pub length: u32,
    /// Ordered set of eligible symbols.
    pub charset: Charset,
    /// Require every charset symbol to appear at least once.
    pub enforce: bool,
}

impl Default for OutputPolicy {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
            charset: Charset::default(),
            enforce: DEFAULT_ENFORCE,
        }
    }
}

// ---------------------------------------------------------------------------
// Core derivation
// ---------------------------------------------------------------------------

/// Derive a password from two secrets and a context string under `policy`.
///
/// The secrets and the context feed the keystream; the policy only shapes
/// what is drawn from it. The full request is validated before any key
/// material is touched, and no partial password is ever returned.
///
/// # Errors
///
/// - [`DeriveError::InvalidInput`] — empty secret or context, zero length,
///   or a length beyond the platform address width
/// - [`DeriveError::InfeasibleConstraint`] — fewer than two charset symbols,
///   or enforcement over more symbols than positions
/// - [`DeriveError::InternalCryptoFailure`] — keystream failure (defensive)
pub fn derive(
    secret1: &[u8],
    secret2: &[u8],
    context: &str,
    policy: &OutputPolicy,
) -> Result<String, DeriveError> {
    if secret1.is_empty() {
        return Err(DeriveError::InvalidInput(
            "secret1 must not be empty".to_string(),
        ));
    }
    if secret2.is_empty() {
        return Err(DeriveError::InvalidInput(
            "secret2 must not be empty".to_string(),
        ));
    }
    if context.is_empty() {
        return Err(DeriveError::InvalidInput(
            "context must not be empty".to_string(),
        ));
    }
    if policy.length == 0 {
        return Err(DeriveError::InvalidInput(
            "length must be at least 1".to_string(),
        ));
    }
    let length = usize::try_from(policy.length).map_err(|_| {
        DeriveError::InvalidInput(format!(
            "length {} exceeds the platform address width",
            policy.length
        ))
    })?;

    let symbol_count = policy.charset.len();
    if symbol_count < 2 {
        return Err(DeriveError::InfeasibleConstraint(format!(
            "character set has {symbol_count} symbol(s), minimum 2"
        )));
    }
    if policy.enforce && length < symbol_count {
        return Err(DeriveError::InfeasibleConstraint(format!(
            "cannot place {symbol_count} distinct symbols into {length} positions"
        )));
    }

    let mut stream = KeyStream::new(secret1, secret2, context)?;

    // The candidate is built as charset indices; symbols materialize last.
    let mut counts = vec![0_usize; symbol_count];
    let mut candidate: Vec<usize> = Vec::with_capacity(length);
    for _ in 0..length {
        let index = stream.next_index(symbol_count)?;
        counts[index] = counts[index].saturating_add(1);
        candidate.push(index);
    }

    if policy.enforce {
        enforce_coverage(&mut stream, &mut candidate, &mut counts)?;
    }

    let symbols = policy.charset.symbols();
    let mut password = String::with_capacity(length);
    for &index in &candidate {
        password.push(symbols[index]);
    }
    Ok(password)
}

/// Substitute missing symbols into stream-selected positions.
///
/// Missing symbols are processed in charset order. Each one draws positions
/// from the stream until it lands on a symbol that still occurs at least
/// twice, then takes that position over. Present symbols therefore stay
/// present, and every placement shrinks the missing set by exactly one.
fn enforce_coverage(
    stream: &mut KeyStream,
    candidate: &mut [usize],
    counts: &mut [usize],
) -> Result<(), DeriveError> {
    let length = candidate.len();
    let draw_bound = length.saturating_mul(PLACEMENT_DRAW_FACTOR);

    for missing in 0..counts.len() {
        if counts[missing] > 0 {
            continue;
        }

        let mut placed = false;
        for _ in 0..draw_bound {
            let position = stream.next_index(length)?;
            let occupant = candidate[position];
            if counts[occupant] >= 2 {
                counts[occupant] = counts[occupant].saturating_sub(1);
                counts[missing] = 1;
                candidate[position] = missing;
                placed = true;
                break;
            }
        }

        if !placed {
            return Err(DeriveError::InternalCryptoFailure(
                "coverage placement exhausted its draw bound".to_string(),
            ));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// String boundary
// ---------------------------------------------------------------------------

/// Derive a password at the string boundary.
///
/// Every input arrives as a string and the result is `(text, success)`: on
/// success the text is the derived password, on failure it is a description
/// of what was rejected and never a partial password. Callers display the
/// text either way and branch on the flag.
///
/// `length` must be plain decimal digits; `characterset` is parsed by
/// [`Charset::new`].
#[must_use]
pub fn calcpw(
    secret1: &str,
    secret2: &str,
    context: &str,
    length: &str,
    characterset: &str,
    enforce: bool,
) -> (String, bool) {
    match derive_from_strings(secret1, secret2, context, length, characterset, enforce) {
        Ok(password) => (password, true),
        Err(err) => (err.to_string(), false),
    }
}

/// Parse the string request and run [`derive`].
fn derive_from_strings(
    secret1: &str,
    secret2: &str,
    context: &str,
    length: &str,
    characterset: &str,
    enforce: bool,
) -> Result<String, DeriveError> {
    let length = parse_length(length)?;
    let charset = Charset::new(characterset)?;
    let policy = OutputPolicy {
        length,
        charset,
        enforce,
    };
    derive(secret1.as_bytes(), secret2.as_bytes(), context, &policy)
}

/// Parse a password length: decimal digits only, no signs, no whitespace.
fn parse_length(length: &str) -> Result<u32, DeriveError> {
    if length.is_empty() || !length.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DeriveError::InvalidInput(format!(
            "length {length:?} is not a decimal integer"
        )));
    }
    length
        .parse()
        .map_err(|_| DeriveError::InvalidInput(format!("length {length:?} is out of range")))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
