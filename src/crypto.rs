//! Signing service for HashLedger (secp256k1 ECDSA over SHA-256 digests)

use crate::error::ChainError;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, PUBLIC_KEY_SIZE},
    ecdsa::Signature,
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::fmt;

/// A thread-safe, lazily initialized Secp256k1 context.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Canonical transport size of an identity (compressed SEC1 public key).
pub const IDENTITY_SIZE: usize = PUBLIC_KEY_SIZE;

/// A party on the ledger: payer, payee or required signer.
///
/// Holds the parsed key object. Crossing a process boundary goes through
/// [`Identity::to_bytes`] and [`Identity::from_bytes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity(PublicKey);

impl Identity {
    pub fn public_key(&self) -> &PublicKey {
        &self.0
    }

    pub fn to_bytes(&self) -> [u8; IDENTITY_SIZE] {
        self.0.serialize()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ChainError> {
        if bytes.len() != IDENTITY_SIZE {
            return Err(ChainError::CryptoError(format!(
                "Identity must be exactly {} bytes (compressed), got {}",
                IDENTITY_SIZE,
                bytes.len()
            )));
        }
        PublicKey::from_slice(bytes)
            .map(Identity)
            .map_err(|e| ChainError::CryptoError(format!("Invalid public key: {}", e)))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

impl From<PublicKey> for Identity {
    fn from(key: PublicKey) -> Self {
        Identity(key)
    }
}

impl Ord for Identity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_bytes().cmp(&other.to_bytes())
    }
}

impl PartialOrd for Identity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "{}…{}", &hex[..8], &hex[hex.len() - 6..])
    }
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Result<Self, ChainError> {
        let secret_key = SecretKey::new(&mut OsRng);
        Ok(Self::from_secret_key(secret_key))
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    /// The public half as a ledger identity.
    pub fn identity(&self) -> Identity {
        Identity(self.public_key)
    }

    /// Signs a message (which is first hashed using SHA-256) and returns the compact signature bytes.
    pub fn sign(&self, message: &[u8]) -> Result<[u8; COMPACT_SIGNATURE_SIZE], ChainError> {
        let digest = Sha256::digest(message);
        let message = Message::from_digest_slice(&digest)
            .map_err(|e| ChainError::CryptoError(format!("Failed to create message: {}", e)))?;

        let signature = SECP256K1_CONTEXT.sign_ecdsa(&message, &self.secret_key);
        Ok(signature.serialize_compact())
    }
}

/// Verifies an ECDSA signature against an identity.
pub fn verify_signature(
    identity: &Identity,
    message: &[u8],
    signature_bytes: &[u8],
) -> Result<(), ChainError> {
    if signature_bytes.len() != COMPACT_SIGNATURE_SIZE {
        return Err(ChainError::CryptoError(format!(
            "Signature must be exactly {} bytes (compact), got {}",
            COMPACT_SIGNATURE_SIZE,
            signature_bytes.len()
        )));
    }

    let digest = Sha256::digest(message);
    let message = Message::from_digest_slice(&digest)
        .map_err(|e| ChainError::CryptoError(format!("Failed to create message: {}", e)))?;

    let signature = Signature::from_compact(signature_bytes)
        .map_err(|e| ChainError::CryptoError(format!("Invalid signature: {}", e)))?;

    SECP256K1_CONTEXT
        .verify_ecdsa(&message, &signature, identity.public_key())
        .map_err(|_| ChainError::CryptoError("Signature verification failed".to_string()))
}

/// The signing collaborator used by transactions.
///
/// `verify` must never fail loudly: a malformed signature, a wrong key and a
/// tampered message all come back as `false`.
pub trait SigningService {
    fn generate_key_pair(&self) -> Result<KeyPair, ChainError>;
    fn sign(&self, message: &[u8], key: &KeyPair) -> Result<Vec<u8>, ChainError>;
    fn verify(&self, message: &[u8], signature: &[u8], identity: &Identity) -> bool;
}

/// Default [`SigningService`] backed by secp256k1.
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Signer;

impl SigningService for Secp256k1Signer {
    fn generate_key_pair(&self) -> Result<KeyPair, ChainError> {
        KeyPair::generate()
    }

    fn sign(&self, message: &[u8], key: &KeyPair) -> Result<Vec<u8>, ChainError> {
        Ok(key.sign(message)?.to_vec())
    }

    fn verify(&self, message: &[u8], signature: &[u8], identity: &Identity) -> bool {
        verify_signature(identity, message, signature).is_ok()
    }
}
