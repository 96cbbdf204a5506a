//! Transport encoding of transactions and ledgers
//!
//! In memory, identities are parsed key objects. On the wire they travel as
//! their 33-byte compressed encoding, and amounts as raw fixed-point bits.
//! Conversion is explicit: [`Transaction::to_wire`] before sending,
//! [`WireTransaction::restore`] after receiving and before any validation.

use crate::blockchain::{Block, BlockId, Ledger, LedgerPayload, Sha256Hash};
use crate::crypto::Identity;
use crate::error::ChainError;
use crate::transaction::{Amount, Transaction, TxEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEntry {
    pub identity: Vec<u8>,
    pub amount_bits: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireTransaction {
    pub inputs: Vec<WireEntry>,
    pub outputs: Vec<WireEntry>,
    pub required_signers: Vec<Vec<u8>>,
    pub signatures: Vec<(Vec<u8>, Vec<u8>)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireBlock {
    pub transactions: Vec<WireTransaction>,
    pub previous: Option<BlockId>,
    pub previous_hash: Option<Sha256Hash>,
    pub difficulty: u32,
    pub nonce: Option<String>,
}

/// A ledger prefix in arena order. The block being shipped is the last one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireLedger {
    pub difficulty: u32,
    pub blocks: Vec<WireBlock>,
}

impl TxEntry {
    fn to_wire(self) -> WireEntry {
        WireEntry {
            identity: self.identity.to_bytes().to_vec(),
            amount_bits: self.amount.to_bits(),
        }
    }
}

impl WireEntry {
    fn restore(&self) -> Result<TxEntry, ChainError> {
        let amount = Amount::from_bits(self.amount_bits);
        if amount < Amount::ZERO {
            return Err(ChainError::NegativeAmount(format!(
                "amount {} received from transport",
                amount
            )));
        }
        Ok(TxEntry {
            identity: restore_identity(&self.identity)?,
            amount,
        })
    }
}

fn restore_identity(bytes: &[u8]) -> Result<Identity, ChainError> {
    Identity::from_bytes(bytes)
        .map_err(|e| ChainError::TransportError(format!("Cannot restore identity: {}", e)))
}

impl Transaction {
    /// Convert every identity to its canonical byte encoding.
    pub fn to_wire(&self) -> WireTransaction {
        WireTransaction {
            inputs: self.inputs.iter().map(|e| e.to_wire()).collect(),
            outputs: self.outputs.iter().map(|e| e.to_wire()).collect(),
            required_signers: self
                .required_signers
                .iter()
                .map(|s| s.to_bytes().to_vec())
                .collect(),
            signatures: self
                .signatures
                .iter()
                .map(|(signer, signature)| (signer.to_bytes().to_vec(), signature.clone()))
                .collect(),
        }
    }
}

impl WireTransaction {
    /// Parse identities back into key objects. Input order, output order and
    /// required-signer order are kept exactly as sent.
    pub fn restore(&self) -> Result<Transaction, ChainError> {
        let inputs = self
            .inputs
            .iter()
            .map(WireEntry::restore)
            .collect::<Result<Vec<_>, _>>()?;
        let outputs = self
            .outputs
            .iter()
            .map(WireEntry::restore)
            .collect::<Result<Vec<_>, _>>()?;
        let required_signers = self
            .required_signers
            .iter()
            .map(|bytes| restore_identity(bytes))
            .collect::<Result<Vec<_>, _>>()?;
        let signatures = self
            .signatures
            .iter()
            .map(|(signer, signature)| {
                restore_identity(signer).map(|identity| (identity, signature.clone()))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(Transaction {
            inputs,
            outputs,
            required_signers,
            signatures,
        })
    }
}

impl Block<LedgerPayload> {
    pub fn to_wire(&self) -> WireBlock {
        WireBlock {
            transactions: self.payload.transactions().iter().map(Transaction::to_wire).collect(),
            previous: self.previous,
            previous_hash: self.previous_hash,
            difficulty: self.difficulty,
            nonce: self.nonce.clone(),
        }
    }
}

impl WireBlock {
    /// Restores transactions and recomputes the payload totals. The stored
    /// link is kept as sent so that validation can still catch a mismatch.
    pub fn restore(&self) -> Result<Block<LedgerPayload>, ChainError> {
        let payload = self
            .transactions
            .iter()
            .map(WireTransaction::restore)
            .collect::<Result<LedgerPayload, _>>()?;
        if payload.total_input().is_none() || payload.total_output().is_none() {
            return Err(ChainError::TransportError(
                "Block totals overflow the amount range".to_string(),
            ));
        }

        Ok(Block {
            payload,
            previous: self.previous,
            previous_hash: self.previous_hash,
            difficulty: self.difficulty,
            nonce: self.nonce.clone(),
        })
    }
}

impl Ledger {
    /// Every block up to and including `id`, ready for transport.
    pub fn to_wire_through(&self, id: BlockId) -> Result<WireLedger, ChainError> {
        self.block(id)?;
        Ok(WireLedger {
            difficulty: self.difficulty(),
            blocks: self
                .iter()
                .take(id.0 + 1)
                .map(|(_, block)| block.to_wire())
                .collect(),
        })
    }

    pub fn to_wire(&self) -> WireLedger {
        WireLedger {
            difficulty: self.difficulty(),
            blocks: self.iter().map(|(_, block)| block.to_wire()).collect(),
        }
    }
}

impl WireLedger {
    pub fn tip(&self) -> Option<BlockId> {
        self.blocks.len().checked_sub(1).map(BlockId)
    }

    /// Rebuild the arena. Every predecessor must point strictly backwards.
    pub fn restore(&self) -> Result<Ledger, ChainError> {
        let mut blocks = Vec::with_capacity(self.blocks.len());
        for (index, wire_block) in self.blocks.iter().enumerate() {
            if let Some(previous) = wire_block.previous {
                if previous.0 >= index {
                    return Err(ChainError::TransportError(format!(
                        "Block #{} links forward to {}",
                        index, previous
                    )));
                }
            }
            blocks.push(wire_block.restore()?);
        }
        Ok(Ledger::from_blocks(blocks, self.difficulty))
    }

    pub fn encode(&self) -> Result<Vec<u8>, ChainError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ChainError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{BlockValidator, ValidationRules};
    use crate::crypto::KeyPair;
    use crate::error::ValidationFailure;
    use crate::miner::{CancelToken, Miner};

    fn signed_transfer(payer: &KeyPair, payee: &KeyPair) -> Transaction {
        let mut tx = Transaction::new();
        tx.add_input(payer.identity(), Amount::from_num(1.1)).unwrap();
        tx.add_output(payee.identity(), Amount::from_num(1)).unwrap();
        tx.sign(payer).unwrap();
        tx
    }

    #[test]
    fn test_restored_transaction_still_verifies() {
        let payer = KeyPair::generate().unwrap();
        let payee = KeyPair::generate().unwrap();
        let tx = signed_transfer(&payer, &payee);

        let wire = tx.to_wire();
        assert_eq!(wire.required_signers, vec![payer.identity().to_bytes().to_vec()]);

        let restored = wire.restore().unwrap();
        assert_eq!(restored, tx);
        assert!(restored.is_valid());
    }

    #[test]
    fn test_malformed_identity_is_rejected() {
        let payer = KeyPair::generate().unwrap();
        let payee = KeyPair::generate().unwrap();
        let mut wire = signed_transfer(&payer, &payee).to_wire();
        wire.outputs[0].identity.truncate(10);

        assert!(matches!(wire.restore(), Err(ChainError::TransportError(_))));
    }

    #[test]
    fn test_negative_wire_amount_is_rejected() {
        let payer = KeyPair::generate().unwrap();
        let payee = KeyPair::generate().unwrap();
        let mut wire = signed_transfer(&payer, &payee).to_wire();
        wire.inputs[0].amount_bits = Amount::from_num(-3).to_bits();

        assert!(matches!(wire.restore(), Err(ChainError::NegativeAmount(_))));
    }

    #[test]
    fn test_ledger_survives_encoding() {
        let payer = KeyPair::generate().unwrap();
        let payee = KeyPair::generate().unwrap();

        let mut ledger = Ledger::new();
        let genesis = ledger.append(vec![signed_transfer(&payer, &payee)].into_iter().collect());
        let tip = ledger.append(vec![signed_transfer(&payee, &payer)].into_iter().collect());

        let bytes = ledger.to_wire_through(tip).unwrap().encode().unwrap();
        let received = WireLedger::decode(&bytes).unwrap().restore().unwrap();

        assert_eq!(received.len(), 2);
        assert_eq!(
            received.block(genesis).unwrap().payload,
            ledger.block(genesis).unwrap().payload
        );
        assert_eq!(received.block(tip).unwrap().hash(), ledger.block(tip).unwrap().hash());
        assert!(received.detect_tampering(tip).unwrap().is_clean());
    }

    #[test]
    fn test_forward_link_is_rejected() {
        let mut ledger = Ledger::new();
        ledger.append(LedgerPayload::new());
        let mut wire = ledger.to_wire();
        wire.blocks[0].previous = Some(BlockId(0));

        assert!(matches!(wire.restore(), Err(ChainError::TransportError(_))));
    }

    #[test]
    fn test_overflowing_wire_totals_are_rejected() {
        let payer = KeyPair::generate().unwrap();
        let payee = KeyPair::generate().unwrap();

        let mut ledger = Ledger::new();
        ledger.append(vec![signed_transfer(&payer, &payee)].into_iter().collect());
        let mut wire = ledger.to_wire();
        let mut output = wire.blocks[0].transactions[0].outputs[0].clone();
        output.amount_bits = i64::MAX;
        wire.blocks[0].transactions[0].outputs = vec![output.clone(), output];

        let bytes = wire.encode().unwrap();
        let result = WireLedger::decode(&bytes).unwrap().restore();
        assert!(matches!(result, Err(ChainError::TransportError(_))));
    }

    #[test]
    fn test_forged_low_difficulty_fails_strict_validation() {
        let payer = KeyPair::generate().unwrap();
        let payee = KeyPair::generate().unwrap();

        let mut ledger = Ledger::with_difficulty(2);
        let tip = ledger.append(vec![signed_transfer(&payer, &payee)].into_iter().collect());
        let mut wire = ledger.to_wire_through(tip).unwrap();
        wire.blocks[0].difficulty = 0;
        wire.blocks[0].nonce = Some("x".to_string());

        let received = wire.restore().unwrap();
        let strict = BlockValidator::new(ValidationRules {
            require_proof_of_work: true,
            ..ValidationRules::default()
        });
        assert!(!strict.is_valid(&received, tip));
        assert!(matches!(
            strict.validate(&received, tip),
            Err(ValidationFailure::InsufficientDifficulty { .. })
        ));
    }

    #[test]
    fn test_altered_nonce_fails_after_transport() {
        let payer = KeyPair::generate().unwrap();
        let payee = KeyPair::generate().unwrap();

        let mut ledger = Ledger::with_difficulty(2);
        let tip = ledger.append(vec![signed_transfer(&payer, &payee)].into_iter().collect());
        ledger.mine(tip, &Miner::new(16), &CancelToken::new()).unwrap();

        let mut wire = ledger.to_wire();
        assert!(wire.restore().unwrap().verify_pow(tip));

        let mined = wire.blocks[0].nonce.clone().unwrap();
        wire.blocks[0].nonce = Some(format!("{}-altered", mined));
        assert!(!wire.restore().unwrap().verify_pow(tip));
    }
}
