//! Error types for HashLedger
//!
//! Two families live here. [`ChainError`] is a hard failure propagated to the
//! caller with `?`. [`ValidationFailure`] is the soft result of a validity
//! check: boolean APIs fold it into `false`, `validate` APIs hand it back so the
//! caller can see which check failed.

use crate::blockchain::BlockId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChainError {
    #[error("Negative amount: {0}")]
    NegativeAmount(String),
    #[error("Amount overflow: {0}")]
    AmountOverflow(String),
    #[error("Unknown block: {0}")]
    UnknownBlock(BlockId),
    #[error("Mining cancelled after {attempts} attempts")]
    MiningCancelled { attempts: u64 },
    #[error("Mining timed out after {attempts} attempts")]
    MiningTimeout { attempts: u64 },
    #[error("Nonce space exhausted after {attempts} attempts")]
    NonceSpaceExhausted { attempts: u64 },
    #[error("Block {0} already carries a nonce")]
    AlreadyMined(BlockId),
    #[error("Difficulty {0} cannot be met by a 32-byte digest")]
    UnreachableDifficulty(u32),
    #[error("Cryptographic error: {0}")]
    CryptoError(String),
    #[error("Transport error: {0}")]
    TransportError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for ChainError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        ChainError::SerializationError(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::ConfigError(err.to_string())
    }
}

/// Why a transaction or block failed validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationFailure {
    #[error("Not signed by all required parties: {signatures} signatures for {required} required signers")]
    SignatureCountMismatch { signatures: usize, required: usize },
    #[error("Missing signature from required signer {0}")]
    MissingSignature(String),
    #[error("Invalid signature from signer {0}")]
    InvalidSignature(String),
    #[error("Amount overflow: {0}")]
    AmountOverflow(String),
    #[error("Insufficient input: {input} in, {output} out")]
    InsufficientInput { input: String, output: String },
    #[error("Broken hash link between block {block} and its predecessor {previous}")]
    BrokenHashLink { block: BlockId, previous: BlockId },
    #[error("Transaction {index} is invalid: {reason}")]
    InvalidTransaction {
        index: usize,
        reason: Box<ValidationFailure>,
    },
    #[error("Block carries {found} reward transactions (max {max})")]
    TooManyRewardTransactions { found: usize, max: usize },
    #[error("Block output {output} exceeds input {input} plus reward {reward}")]
    RewardExceeded {
        input: String,
        output: String,
        reward: String,
    },
    #[error("Block {block} claims difficulty {difficulty}, below the required {required}")]
    InsufficientDifficulty {
        block: BlockId,
        difficulty: u32,
        required: u32,
    },
    #[error("Block {0} does not carry a valid proof of work")]
    InvalidProofOfWork(BlockId),
    #[error("Unknown block: {0}")]
    UnknownBlock(BlockId),
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
