//! Hash linking between a block and its predecessor
//!
//! A block's hash is `SHA-256(canonical(payload) || previous_hash)`, with the
//! root's previous hash being the empty byte string. Proof of work appends the
//! nonce to the same digest input.

use sha2::{Digest, Sha256};

pub type Sha256Hash = [u8; 32];

/// Content a block can carry.
///
/// Implementations must be reproducible: the same logical value always yields
/// the same bytes, on any platform.
pub trait Payload {
    fn canonical_bytes(&self) -> Vec<u8>;
}

impl Payload for str {
    fn canonical_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl Payload for String {
    fn canonical_bytes(&self) -> Vec<u8> {
        self.as_str().canonical_bytes()
    }
}

impl Payload for u64 {
    fn canonical_bytes(&self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }
}

impl Payload for i64 {
    fn canonical_bytes(&self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }
}

/// Length-prefixed so that `["ab", "c"]` and `["a", "bc"]` differ.
impl<T: Payload> Payload for Vec<T> {
    fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(self.len() as u32).to_le_bytes());
        for item in self {
            let item_bytes = item.canonical_bytes();
            bytes.extend_from_slice(&(item_bytes.len() as u32).to_le_bytes());
            bytes.extend_from_slice(&item_bytes);
        }
        bytes
    }
}

impl<T: Payload + ?Sized> Payload for &T {
    fn canonical_bytes(&self) -> Vec<u8> {
        (**self).canonical_bytes()
    }
}

/// Digest state primed with `(payload, previous_hash)`.
///
/// Mining clones this once per candidate nonce instead of re-serializing the
/// payload on every attempt.
#[derive(Clone)]
pub struct LinkHasher {
    primed: Sha256,
}

impl LinkHasher {
    pub fn new<P: Payload + ?Sized>(payload: &P, previous_hash: Option<&Sha256Hash>) -> Self {
        let mut primed = Sha256::new();
        primed.update(payload.canonical_bytes());
        primed.update(previous_hash.map(|h| &h[..]).unwrap_or(&[]));
        LinkHasher { primed }
    }

    pub fn digest(&self) -> Sha256Hash {
        self.primed.clone().finalize().into()
    }

    pub fn digest_with_nonce(&self, nonce: &[u8]) -> Sha256Hash {
        let mut hasher = self.primed.clone();
        hasher.update(nonce);
        hasher.finalize().into()
    }
}

/// `hash(payload, previous_hash)`.
pub fn hash_link<P: Payload + ?Sized>(payload: &P, previous_hash: Option<&Sha256Hash>) -> Sha256Hash {
    LinkHasher::new(payload, previous_hash).digest()
}

/// `hash(payload, previous_hash, nonce)`, the proof-of-work digest.
pub fn hash_with_nonce<P: Payload + ?Sized>(
    payload: &P,
    previous_hash: Option<&Sha256Hash>,
    nonce: &[u8],
) -> Sha256Hash {
    LinkHasher::new(payload, previous_hash).digest_with_nonce(nonce)
}
