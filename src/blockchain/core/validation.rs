use crate::config::Config;
use crate::crypto::{Secp256k1Signer, SigningService};
use crate::error::ValidationFailure;
use crate::transaction::Amount;
use tracing::debug;

use super::chain::{BlockId, DEFAULT_DIFFICULTY};
use super::ledger::Ledger;

/// Block-level rules applied on top of per-transaction validity.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationRules {
    /// Output a block may create beyond what its inputs cover.
    pub block_reward: Amount,
    /// Cap on input-less (reward) transactions per block; `None` for no cap.
    pub max_reward_transactions: Option<usize>,
    /// Reject blocks without an admissible nonce.
    pub require_proof_of_work: bool,
    /// Lowest difficulty a block may claim when proof of work is required.
    pub min_difficulty: u32,
}

impl Default for ValidationRules {
    fn default() -> Self {
        ValidationRules {
            block_reward: Amount::from_num(25),
            max_reward_transactions: Some(1),
            require_proof_of_work: false,
            min_difficulty: DEFAULT_DIFFICULTY,
        }
    }
}

impl From<&Config> for ValidationRules {
    /// Expects a config that passed `load_config` validation; an
    /// unrepresentable reward falls back to zero. The miner's difficulty is
    /// the floor received blocks are held to.
    fn from(config: &Config) -> Self {
        ValidationRules {
            block_reward: config.ledger.block_reward_amount().unwrap_or(Amount::ZERO),
            max_reward_transactions: config.ledger.max_reward_transactions,
            require_proof_of_work: config.ledger.require_proof_of_work,
            min_difficulty: config.miner.difficulty,
        }
    }
}

/// Re-derives everything about a ledger block: its hash link, every
/// signature, and value conservation. Nothing computed by the sender is
/// trusted.
#[derive(Debug, Clone)]
pub struct BlockValidator<S = Secp256k1Signer> {
    rules: ValidationRules,
    signer: S,
}

impl BlockValidator<Secp256k1Signer> {
    pub fn new(rules: ValidationRules) -> Self {
        Self::with_signer(rules, Secp256k1Signer)
    }
}

impl Default for BlockValidator<Secp256k1Signer> {
    fn default() -> Self {
        Self::new(ValidationRules::default())
    }
}

impl<S: SigningService> BlockValidator<S> {
    pub fn with_signer(rules: ValidationRules, signer: S) -> Self {
        BlockValidator { rules, signer }
    }

    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    pub fn validate(&self, ledger: &Ledger, id: BlockId) -> Result<(), ValidationFailure> {
        let result = self.check_block(ledger, id);
        if let Err(failure) = &result {
            debug!(block = %id, reason = %failure, "Block failed validation");
        }
        result
    }

    pub fn is_valid(&self, ledger: &Ledger, id: BlockId) -> bool {
        self.validate(ledger, id).is_ok()
    }

    /// Validate every block in arena order, stopping at the first failure.
    pub fn validate_chain(&self, ledger: &Ledger) -> Result<(), ValidationFailure> {
        ledger.iter().try_for_each(|(id, _)| self.validate(ledger, id))
    }

    fn check_block(&self, ledger: &Ledger, id: BlockId) -> Result<(), ValidationFailure> {
        let block = ledger.get(id).ok_or(ValidationFailure::UnknownBlock(id))?;

        ledger.check_link(id)?;

        if self.rules.require_proof_of_work {
            if block.difficulty() < self.rules.min_difficulty {
                return Err(ValidationFailure::InsufficientDifficulty {
                    block: id,
                    difficulty: block.difficulty(),
                    required: self.rules.min_difficulty,
                });
            }
            if !ledger.verify_pow(id) {
                return Err(ValidationFailure::InvalidProofOfWork(id));
            }
        }

        for (index, tx) in block.payload.transactions().iter().enumerate() {
            tx.validate_with(&self.signer)
                .map_err(|reason| ValidationFailure::InvalidTransaction {
                    index,
                    reason: Box::new(reason),
                })?;
        }

        if let Some(max) = self.rules.max_reward_transactions {
            let found = block.payload.reward_transactions();
            if found > max {
                return Err(ValidationFailure::TooManyRewardTransactions { found, max });
            }
        }

        let (Some(input), Some(output)) = (block.payload.total_input(), block.payload.total_output())
        else {
            return Err(ValidationFailure::AmountOverflow(format!(
                "totals of block {} do not fit",
                id
            )));
        };
        // An unrepresentable limit is above every representable output.
        let limit = input.checked_add(self.rules.block_reward);
        if limit.is_some_and(|limit| output > limit) {
            return Err(ValidationFailure::RewardExceeded {
                input: input.to_string(),
                output: output.to_string(),
                reward: self.rules.block_reward.to_string(),
            });
        }

        Ok(())
    }
}
