//! HashLedger - A hash-linked ledger with multi-signature transactions and proof of work
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Block arena, tamper detection and block validation
//! - [`transaction`] - Multi-input, multi-output transactions and their signatures
//! - [`hashing`] - Canonical payload encoding and hash links
//!
//! ## Consensus
//! - [`miner`] - Proof-of-work nonce search with cancellation
//!
//! ## Cryptography
//! - [`crypto`] - Identities and signatures (secp256k1)
//!
//! ## Transport
//! - [`wire`] - Byte-level encoding of transactions and ledgers
//! - [`transport`] - Shipping blocks between processes over TCP
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - [`scenarios`] - Canned transactions and chains

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod hashing;
pub mod transaction;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod miner;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Transport
// ============================================================================
pub mod transport;
pub mod wire;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
pub mod scenarios;
