use crate::error::ChainError;
use crate::hashing::Payload;
use crate::transaction::{checked_sum, Amount, Transaction};

use super::chain::{BlockId, Chain};

/// A chain whose blocks carry transactions.
pub type Ledger = Chain<LedgerPayload>;

/// The transactions of one block plus running totals over them.
///
/// The totals are maintained by [`add_transaction`](LedgerPayload::add_transaction)
/// so block validation does not re-sum every transaction. They are derived
/// data: only the transactions go into the block hash and onto the wire.
/// A total that no longer fits in an [`Amount`] stays `None` from then on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerPayload {
    transactions: Vec<Transaction>,
    total_input: Option<Amount>,
    total_output: Option<Amount>,
}

impl Default for LedgerPayload {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerPayload {
    pub fn new() -> Self {
        LedgerPayload {
            transactions: Vec::new(),
            total_input: Some(Amount::ZERO),
            total_output: Some(Amount::ZERO),
        }
    }

    pub fn add_transaction(&mut self, tx: Transaction) {
        self.total_input = self
            .total_input
            .zip(tx.total_input())
            .and_then(|(total, input)| total.checked_add(input));
        self.total_output = self
            .total_output
            .zip(tx.total_output())
            .and_then(|(total, output)| total.checked_add(output));
        self.transactions.push(tx);
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn total_input(&self) -> Option<Amount> {
        self.total_input
    }

    pub fn total_output(&self) -> Option<Amount> {
        self.total_output
    }

    /// Fees offered by the non-reward transactions, i.e. what a miner may
    /// add on top of the block reward.
    pub fn collectable_fees(&self) -> Option<Amount> {
        self.transactions
            .iter()
            .filter(|tx| !tx.is_reward())
            .map(Transaction::fee)
            .collect::<Option<Vec<_>>>()
            .and_then(checked_sum)
    }

    pub fn reward_transactions(&self) -> usize {
        self.transactions.iter().filter(|tx| tx.is_reward()).count()
    }
}

impl FromIterator<Transaction> for LedgerPayload {
    fn from_iter<I: IntoIterator<Item = Transaction>>(iter: I) -> Self {
        let mut payload = LedgerPayload::new();
        for tx in iter {
            payload.add_transaction(tx);
        }
        payload
    }
}

impl Payload for LedgerPayload {
    fn canonical_bytes(&self) -> Vec<u8> {
        self.transactions.canonical_bytes()
    }
}

impl Ledger {
    /// Append `tx` to block `id`'s payload.
    pub fn add_transaction(&mut self, id: BlockId, tx: Transaction) -> Result<(), ChainError> {
        self.block_mut(id)?.payload.add_transaction(tx);
        Ok(())
    }
}
