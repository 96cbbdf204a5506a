//! Canned transactions and chains used by the demo binary and the tests
//!
//! Every builder takes the participating key pairs as parameters.

use crate::blockchain::{BlockId, Chain, Ledger, LedgerPayload};
use crate::crypto::KeyPair;
use crate::error::ChainError;
use crate::transaction::{Amount, Transaction};

/// Four independent parties.
#[derive(Debug, Clone)]
pub struct Parties {
    pub alice: KeyPair,
    pub bob: KeyPair,
    pub carol: KeyPair,
    pub dave: KeyPair,
}

impl Parties {
    pub fn generate() -> Result<Self, ChainError> {
        Ok(Parties {
            alice: KeyPair::generate()?,
            bob: KeyPair::generate()?,
            carol: KeyPair::generate()?,
            dave: KeyPair::generate()?,
        })
    }
}

/// `payer` sends `amount` to `payee` and signs.
pub fn simple_transfer(payer: &KeyPair, payee: &KeyPair, amount: Amount) -> Result<Transaction, ChainError> {
    let mut tx = Transaction::new();
    tx.add_input(payer.identity(), amount)?;
    tx.add_output(payee.identity(), amount)?;
    tx.sign(payer)?;
    Ok(tx)
}

/// One input of 2 split into two outputs of 1.
pub fn split_transfer(payer: &KeyPair, first: &KeyPair, second: &KeyPair) -> Result<Transaction, ChainError> {
    let mut tx = Transaction::new();
    tx.add_input(payer.identity(), Amount::from_num(2))?;
    tx.add_output(first.identity(), Amount::from_num(1))?;
    tx.add_output(second.identity(), Amount::from_num(1))?;
    tx.sign(payer)?;
    Ok(tx)
}

/// 1.2 in, 1.1 out, co-signed by `arbiter` when `arbiter_signs` is set.
pub fn escrow_transfer(
    payer: &KeyPair,
    payee: &KeyPair,
    arbiter: &KeyPair,
    arbiter_signs: bool,
) -> Result<Transaction, ChainError> {
    let mut tx = Transaction::new();
    tx.add_input(payer.identity(), Amount::from_num(1.2))?;
    tx.add_output(payee.identity(), Amount::from_num(1.1))?;
    tx.add_required(arbiter.identity());
    tx.sign(payer)?;
    if arbiter_signs {
        tx.sign(arbiter)?;
    }
    Ok(tx)
}

/// A transfer out of `payer` signed with `signer`'s key instead.
pub fn wrongly_signed_transfer(payer: &KeyPair, payee: &KeyPair, signer: &KeyPair) -> Result<Transaction, ChainError> {
    let mut tx = Transaction::new();
    tx.add_input(payer.identity(), Amount::from_num(1))?;
    tx.add_output(payee.identity(), Amount::from_num(1))?;
    tx.sign(signer)?;
    Ok(tx)
}

/// 1 in, 2 out, correctly signed.
pub fn overspending_transfer(payer: &KeyPair, payee: &KeyPair) -> Result<Transaction, ChainError> {
    let mut tx = Transaction::new();
    tx.add_input(payer.identity(), Amount::from_num(1))?;
    tx.add_output(payee.identity(), Amount::from_num(2))?;
    tx.sign(payer)?;
    Ok(tx)
}

/// 1.1 in, 1.0 out: leaves a fee of 0.1 for the miner.
pub fn fee_paying_transfer(payer: &KeyPair, payee: &KeyPair) -> Result<Transaction, ChainError> {
    let mut tx = Transaction::new();
    tx.add_input(payer.identity(), Amount::from_num(1.1))?;
    tx.add_output(payee.identity(), Amount::from_num(1))?;
    tx.sign(payer)?;
    Ok(tx)
}

/// Pays `miner` the block reward plus `fees`, with no inputs.
pub fn reward_transaction(miner: &KeyPair, reward: Amount, fees: Amount) -> Result<Transaction, ChainError> {
    let total = reward
        .checked_add(fees)
        .ok_or_else(|| ChainError::AmountOverflow(format!("reward {} plus fees {}", reward, fees)))?;
    let mut tx = Transaction::new();
    tx.add_output(miner.identity(), total)?;
    Ok(tx)
}

/// A block of fee-paying transfers closed by a reward transaction that
/// collects exactly the reward plus those fees.
pub fn rewarded_block(parties: &Parties, reward: Amount) -> Result<LedgerPayload, ChainError> {
    let mut payload = LedgerPayload::new();
    payload.add_transaction(fee_paying_transfer(&parties.alice, &parties.bob)?);
    let fees = payload
        .collectable_fees()
        .ok_or_else(|| ChainError::AmountOverflow("block fees".to_string()))?;
    payload.add_transaction(reward_transaction(&parties.dave, reward, fees)?);
    Ok(payload)
}

/// Genesis with one transfer, a block with two, a block with one.
pub fn transfer_ledger(parties: &Parties) -> Result<(Ledger, BlockId), ChainError> {
    let unit = Amount::from_num(1);
    let mut ledger = Ledger::new();

    ledger.append(vec![simple_transfer(&parties.alice, &parties.bob, unit)?].into_iter().collect());
    ledger.append(
        vec![
            simple_transfer(&parties.bob, &parties.carol, unit)?,
            simple_transfer(&parties.carol, &parties.alice, unit)?,
        ]
        .into_iter()
        .collect(),
    );
    let tip = ledger.append(vec![simple_transfer(&parties.alice, &parties.dave, unit)?].into_iter().collect());
    Ok((ledger, tip))
}

/// Blocks whose payloads are plain text.
pub fn text_chain(payloads: &[&str]) -> Chain<String> {
    let mut chain = Chain::new();
    for payload in payloads {
        chain.append(payload.to_string());
    }
    chain
}
