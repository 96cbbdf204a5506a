/// Transaction types for HashLedger
use crate::crypto::{Identity, KeyPair, Secp256k1Signer, SigningService};
use crate::error::ChainError;
use crate::hashing::{Payload, Sha256Hash};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Fixed-point ledger amount. Addition is exact, so conservation checks never
/// suffer from float rounding.
pub type Amount = fixed::types::I32F32;

/// Domain tag prepended to every signing message.
pub const SIGNING_TAG: &[u8] = b"HASHLEDGER-TX";

/// Sum without wrapping or panicking; `None` on overflow.
pub fn checked_sum(amounts: impl IntoIterator<Item = Amount>) -> Option<Amount> {
    amounts
        .into_iter()
        .try_fold(Amount::ZERO, |total, amount| total.checked_add(amount))
}

/// One side of a transfer: who pays (input) or who is paid (output), and how much.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxEntry {
    pub identity: Identity,
    pub amount: Amount,
}

/// A value transfer with multi-party signature requirements.
///
/// Built incrementally with [`add_input`](Transaction::add_input),
/// [`add_output`](Transaction::add_output),
/// [`add_required`](Transaction::add_required) and [`sign`](Transaction::sign).
/// Amounts are never negative: the adders reject them before touching any field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    pub(crate) inputs: Vec<TxEntry>,
    pub(crate) outputs: Vec<TxEntry>,
    pub(crate) required_signers: Vec<Identity>,
    pub(crate) signatures: BTreeMap<Identity, Vec<u8>>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take `amount` from `identity`. The payer becomes a required signer.
    pub fn add_input(&mut self, identity: Identity, amount: Amount) -> Result<(), ChainError> {
        Self::check_amount(amount)?;
        self.inputs.push(TxEntry { identity, amount });
        self.add_required(identity);
        Ok(())
    }

    /// Send `amount` to `identity`.
    pub fn add_output(&mut self, identity: Identity, amount: Amount) -> Result<(), ChainError> {
        Self::check_amount(amount)?;
        self.outputs.push(TxEntry { identity, amount });
        Ok(())
    }

    /// Require a co-signature (escrow arbiter) without adding an input.
    /// An identity already required is not listed twice.
    pub fn add_required(&mut self, identity: Identity) {
        if !self.required_signers.contains(&identity) {
            self.required_signers.push(identity);
        }
    }

    fn check_amount(amount: Amount) -> Result<(), ChainError> {
        if amount < Amount::ZERO {
            return Err(ChainError::NegativeAmount(format!(
                "amount {} is below zero",
                amount
            )));
        }
        Ok(())
    }

    pub fn inputs(&self) -> &[TxEntry] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TxEntry] {
        &self.outputs
    }

    pub fn required_signers(&self) -> &[Identity] {
        &self.required_signers
    }

    pub fn signatures(&self) -> &BTreeMap<Identity, Vec<u8>> {
        &self.signatures
    }

    /// `None` when the inputs do not fit in an [`Amount`].
    pub fn total_input(&self) -> Option<Amount> {
        checked_sum(self.inputs.iter().map(|entry| entry.amount))
    }

    /// `None` when the outputs do not fit in an [`Amount`].
    pub fn total_output(&self) -> Option<Amount> {
        checked_sum(self.outputs.iter().map(|entry| entry.amount))
    }

    /// `total_input - total_output`; negative for reward transactions.
    pub fn fee(&self) -> Option<Amount> {
        self.total_input()?.checked_sub(self.total_output()?)
    }

    /// A transaction with outputs funded by nothing but the block reward.
    pub fn is_reward(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Canonical bytes of `(inputs, outputs, required_signers)`.
    pub fn signable_message(&self) -> Vec<u8> {
        let mut message = Vec::new();
        message.extend_from_slice(SIGNING_TAG);
        for entries in [&self.inputs, &self.outputs] {
            message.extend_from_slice(&(entries.len() as u32).to_le_bytes());
            for entry in entries {
                message.extend_from_slice(&entry.identity.to_bytes());
                message.extend_from_slice(&entry.amount.to_le_bytes());
            }
        }
        message.extend_from_slice(&(self.required_signers.len() as u32).to_le_bytes());
        for signer in &self.required_signers {
            message.extend_from_slice(&signer.to_bytes());
        }
        message
    }

    /// Sign with the default secp256k1 service.
    pub fn sign(&mut self, key: &KeyPair) -> Result<(), ChainError> {
        self.sign_with(&Secp256k1Signer, key)
    }

    /// Record `key`'s signature over the signing message. Signing again with
    /// the same key replaces its previous signature.
    pub fn sign_with<S: SigningService + ?Sized>(
        &mut self,
        service: &S,
        key: &KeyPair,
    ) -> Result<(), ChainError> {
        let signature = service.sign(&self.signable_message(), key)?;
        self.signatures.insert(key.identity(), signature);
        Ok(())
    }

    pub fn hash(&self) -> Sha256Hash {
        Sha256::digest(self.canonical_bytes()).into()
    }

    pub fn hash_str(&self) -> String {
        hex::encode(self.hash())
    }
}

/// Signing message followed by every `(signer, signature)` pair, so that a
/// forged or stripped signature changes the enclosing block's hash.
impl Payload for Transaction {
    fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = self.signable_message();
        bytes.extend_from_slice(&(self.signatures.len() as u32).to_le_bytes());
        for (signer, signature) in &self.signatures {
            bytes.extend_from_slice(&signer.to_bytes());
            bytes.extend_from_slice(&(signature.len() as u32).to_le_bytes());
            bytes.extend_from_slice(signature);
        }
        bytes
    }
}
