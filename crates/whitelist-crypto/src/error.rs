use thiserror::Error;

/// Errors raised while building trees or requesting proofs.
///
/// Verification itself never errors; it returns `false`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MerkleError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

