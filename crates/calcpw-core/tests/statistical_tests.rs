#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Distribution quality tests for derived passwords.
//!
//! Validates that the keystream-to-symbol mapping produces uniform symbol
//! frequencies and that every input bit reaches the output. These are smoke
//! tests against degenerate behavior (stuck counter, biased remainder map,
//! dead input bytes), not a substitute for cryptanalysis of HMAC-SHA256.
//!
//! **Statistical context:** symbol counts over many derivations follow a
//! multinomial; Pearson's chi-squared statistic against the uniform
//! expectation is asymptotically chi-squared distributed. Thresholds are set
//! far into the tail so a healthy implementation practically never trips
//! them:
//!
//! | Test                    | Cells | Samples | dof | Threshold | Tail odds |
//! |-------------------------|-------|---------|-----|-----------|-----------|
//! | symbol frequencies      | 16    | 25,600  | 15  | 100       | < 1e-12   |
//! | leading position        | 16    | 2,000   | 15  | 100       | < 1e-12   |
//! | rejection-boundary set  | 255   | 25,600  | 254 | 450       | < 1e-10   |
//! | raw keystream bytes     | 256   | 65,536  | 255 | 450       | < 1e-10   |
//!
//! The avalanche tests flip one input bit (or edit one context byte) and
//! require the output to change; with 64 symbols over a 16-symbol alphabet,
//! two unrelated outputs agree on fewer than 32 positions except with
//! probability far below 2^-60.

use std::collections::HashMap;

use calcpw_core::{derive, Charset, KeyStream, OutputPolicy};

const SECRET1: &[u8] = b"statistical-secret-one";
const SECRET2: &[u8] = b"statistical-secret-two";
const HEX: &str = "0123456789abcdef";

/// Pearson chi-squared statistic against a uniform expectation.
#[allow(clippy::cast_precision_loss)]
fn chi_squared(observed: &[u64], total: u64) -> f64 {
    let cells = observed.len() as f64;
    let expected = total as f64 / cells;
    observed
        .iter()
        .map(|&count| {
            let diff = count as f64 - expected;
            diff * diff / expected
        })
        .sum()
}

/// Count positions where two equal-length passwords agree.
fn matching_positions(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).filter(|(x, y)| x == y).count()
}

fn hex_policy(length: u32) -> OutputPolicy {
    OutputPolicy {
        length,
        charset: Charset::new(HEX).unwrap(),
        enforce: false,
    }
}

/// Symbol frequencies across 400 contexts — threshold 100 at 15 dof.
#[test]
fn symbol_frequencies_are_uniform() {
    let policy = hex_policy(64);
    let index_of: HashMap<char, usize> = policy
        .charset
        .symbols()
        .iter()
        .enumerate()
        .map(|(index, &symbol)| (symbol, index))
        .collect();

    let mut counts = vec![0_u64; 16];
    for i in 0..400 {
        let context = format!("site-{i}.example.com");
        let password = derive(SECRET1, SECRET2, &context, &policy).unwrap();
        for symbol in password.chars() {
            counts[index_of[&symbol]] += 1;
        }
    }

    let stat = chi_squared(&counts, 400 * 64);
    assert!(
        stat < 100.0,
        "symbol frequencies too skewed: chi-squared {stat:.2} (threshold 100)"
    );
}

/// The first output symbol is as uniform as the rest — threshold 100 at 15 dof.
#[test]
fn leading_position_is_uniform() {
    let policy = hex_policy(1);
    let index_of: HashMap<char, usize> = policy
        .charset
        .symbols()
        .iter()
        .enumerate()
        .map(|(index, &symbol)| (symbol, index))
        .collect();

    let mut counts = vec![0_u64; 16];
    for i in 0..2000 {
        let context = format!("site-{i}.example.com");
        let password = derive(SECRET1, SECRET2, &context, &policy).unwrap();
        let first = password.chars().next().unwrap();
        counts[index_of[&first]] += 1;
    }

    let stat = chi_squared(&counts, 2000);
    assert!(
        stat < 100.0,
        "leading position too skewed: chi-squared {stat:.2} (threshold 100)"
    );
}

/// A 255-symbol charset forces the sampler to reject one value in 256; the
/// surviving remainder map must stay uniform — threshold 450 at 254 dof.
#[test]
fn rejection_boundary_charset_is_uniform() {
    let symbols: String = (0x100_u32..0x1FF).map(|cp| char::from_u32(cp).unwrap()).collect();
    let policy = OutputPolicy {
        length: 128,
        charset: Charset::new(&symbols).unwrap(),
        enforce: false,
    };
    assert_eq!(policy.charset.len(), 255);

    let index_of: HashMap<char, usize> = policy
        .charset
        .symbols()
        .iter()
        .enumerate()
        .map(|(index, &symbol)| (symbol, index))
        .collect();

    let mut counts = vec![0_u64; 255];
    for i in 0..200 {
        let context = format!("site-{i}.example.com");
        let password = derive(SECRET1, SECRET2, &context, &policy).unwrap();
        for symbol in password.chars() {
            counts[index_of[&symbol]] += 1;
        }
    }

    let stat = chi_squared(&counts, 200 * 128);
    assert!(
        stat < 450.0,
        "rejection-boundary frequencies too skewed: chi-squared {stat:.2} (threshold 450)"
    );
}

/// Raw keystream bytes are uniform over 0..=255 — threshold 450 at 255 dof.
#[test]
fn keystream_bytes_are_uniform() {
    let mut stream = KeyStream::new(SECRET1, SECRET2, "example.com").unwrap();
    let mut counts = vec![0_u64; 256];
    for _ in 0..65_536 {
        counts[usize::from(stream.next_byte().unwrap())] += 1;
    }

    let stat = chi_squared(&counts, 65_536);
    assert!(
        stat < 450.0,
        "keystream bytes too skewed: chi-squared {stat:.2} (threshold 450)"
    );
}

/// Every bit of secret1 reaches the output.
#[test]
fn bit_flips_in_secret1_avalanche() {
    let policy = hex_policy(64);
    let base = derive(SECRET1, SECRET2, "example.com", &policy).unwrap();

    for byte in 0..SECRET1.len() {
        for bit in 0..8 {
            let mut flipped = SECRET1.to_vec();
            flipped[byte] ^= 1 << bit;
            let variant = derive(&flipped, SECRET2, "example.com", &policy).unwrap();
            assert_ne!(variant, base, "flip at byte {byte} bit {bit} ignored");
            let matches = matching_positions(&variant, &base);
            assert!(
                matches < 32,
                "flip at byte {byte} bit {bit} left {matches}/64 positions unchanged"
            );
        }
    }
}

/// Every bit of secret2 reaches the output.
#[test]
fn bit_flips_in_secret2_avalanche() {
    let policy = hex_policy(64);
    let base = derive(SECRET1, SECRET2, "example.com", &policy).unwrap();

    for byte in 0..SECRET2.len() {
        for bit in 0..8 {
            let mut flipped = SECRET2.to_vec();
            flipped[byte] ^= 1 << bit;
            let variant = derive(SECRET1, &flipped, "example.com", &policy).unwrap();
            assert_ne!(variant, base, "flip at byte {byte} bit {bit} ignored");
            let matches = matching_positions(&variant, &base);
            assert!(
                matches < 32,
                "flip at byte {byte} bit {bit} left {matches}/64 positions unchanged"
            );
        }
    }
}

/// Every byte of the context reaches the output.
#[test]
fn byte_edits_in_context_avalanche() {
    let policy = hex_policy(64);
    let context = "login.example.com";
    let base = derive(SECRET1, SECRET2, context, &policy).unwrap();

    for position in 0..context.len() {
        let mut edited: Vec<u8> = context.as_bytes().to_vec();
        edited[position] = if edited[position] == b'x' { b'y' } else { b'x' };
        let edited = String::from_utf8(edited).unwrap();
        let variant = derive(SECRET1, SECRET2, &edited, &policy).unwrap();
        assert_ne!(variant, base, "edit at byte {position} ignored");
        let matches = matching_positions(&variant, &base);
        assert!(
            matches < 32,
            "edit at byte {position} left {matches}/64 positions unchanged"
        );
    }
}
