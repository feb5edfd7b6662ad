//! Error types for `calcpw-core`.

use thiserror::Error;

/// Errors produced by the derivation engine.
///
/// Every failure is terminal for the request that raised it: the engine
/// never emits a partially derived password.
#[derive(Debug, Error)]
pub enum DeriveError {
    /// A request field failed validation (empty secret or context, zero
    /// length, malformed length string, empty or duplicated character set).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The request is well-formed but impossible to satisfy (character set
    /// too small, enforcement over more symbols than positions).
    #[error("infeasible constraint: {0}")]
    InfeasibleConstraint(String),

    /// An underlying primitive or internal bound failed. Defensive: not
    /// reachable through the public API under normal operation.
    #[error("internal crypto failure: {0}")]
    InternalCryptoFailure(String),
}
