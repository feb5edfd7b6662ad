//! Ordered character sets for derived passwords.
//!
//! A [`Charset`] is the eligible-symbol alphabet of a derivation. Its string
//! form lists the symbols in order; that order defines the index-to-symbol
//! mapping the engine samples against, so two charsets with the same symbols
//! in a different order are different charsets.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DeriveError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default character set: uppercase, lowercase, digits (62 symbols).
pub const DEFAULT_CHARACTERSET: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Ordered, duplicate-free set of symbols eligible for a derived password.
///
/// Symbols are Unicode scalar values. Duplicates are rejected at parse time
/// so every symbol has exactly one index and uniform index sampling stays
/// uniform over symbols.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Charset {
    symbols: Vec<char>,
}

impl Charset {
    /// Parse a character set from its string form.
    ///
    /// # Errors
    ///
    /// Returns [`DeriveError::InvalidInput`] if the string is empty or
    /// contains the same symbol twice.
    pub fn new(characterset: &str) -> Result<Self, DeriveError> {
        if characterset.is_empty() {
            return Err(DeriveError::InvalidInput(
                "character set must not be empty".to_string(),
            ));
        }

        let symbols: Vec<char> = characterset.chars().collect();
        let mut seen: HashSet<char> = HashSet::with_capacity(symbols.len());
        for &symbol in &symbols {
            if !seen.insert(symbol) {
                return Err(DeriveError::InvalidInput(format!(
                    "character set contains duplicate symbol {symbol:?}"
                )));
            }
        }

        Ok(Self { symbols })
    }

    /// Number of symbols in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns `true` if the set has no symbols.
    ///
    /// Construction rejects empty sets, so this is always `false` for a
    /// parsed value; it exists for API completeness.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbol at `index` in mapping order, or `None` past the end.
    #[must_use]
    pub fn symbol(&self, index: usize) -> Option<char> {
        self.symbols.get(index).copied()
    }

    /// The symbols in mapping order.
    #[must_use]
    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }

    /// Returns `true` if `symbol` is a member of the set.
    #[must_use]
    pub fn contains(&self, symbol: char) -> bool {
        self.symbols.contains(&symbol)
    }
}

impl Default for Charset {
    /// The 62-symbol alphanumeric set ([`DEFAULT_CHARACTERSET`]).
    fn default() -> Self {
        Self {
            symbols: DEFAULT_CHARACTERSET.chars().collect(),
        }
    }
}

impl FromStr for Charset {
    type Err = DeriveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Charset {
    type Error = DeriveError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<Charset> for String {
    fn from(charset: Charset) -> Self {
        charset.symbols.into_iter().collect()
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for symbol in &self.symbols {
            write!(f, "{symbol}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
