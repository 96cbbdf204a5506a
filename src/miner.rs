//! Proof-of-work mining
//!
//! A block is admissible when `hash(payload, previous_hash, nonce)` starts with
//! `difficulty` zero bytes. Each extra byte multiplies the expected number of
//! attempts by 256. The search has no upper bound of its own; callers bound it
//! through a [`CancelToken`].

use crate::blockchain::Block;
use crate::config::MinerConfig;
use crate::error::ChainError;
use crate::hashing::{LinkHasher, Payload, Sha256Hash};
use rand::distributions::Alphanumeric;
use rand::Rng;
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Size of the nonce alphabet (`[A-Za-z0-9]`).
const ALPHABET_SIZE: u64 = 62;
/// Cancellation and deadline are polled once per this many draws.
const CHECK_INTERVAL: u64 = 256;
/// Nonce spaces up to this size remember every draw so exhaustion can be
/// reported. Larger spaces draw without memory.
const TRACKED_SPACE_LIMIT: u64 = 1 << 20;

/// True iff the first `difficulty` bytes of `hash` are zero.
pub fn is_admissible(hash: &Sha256Hash, difficulty: u32) -> bool {
    let difficulty = difficulty as usize;
    difficulty <= hash.len() && hash[..difficulty].iter().all(|b| *b == 0)
}

/// Recompute the proof-of-work digest for the block's own nonce. Unmined
/// blocks never validate.
pub fn validate<P: Payload>(block: &Block<P>) -> bool {
    let Some(nonce) = block.nonce() else {
        return false;
    };
    let hash = LinkHasher::new(&block.payload, block.previous_hash()).digest_with_nonce(nonce.as_bytes());
    is_admissible(&hash, block.difficulty())
}

/// Caller-side handle for stopping a search: an explicit flag shared across
/// clones, plus an optional deadline.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        CancelToken {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn check(&self, attempts: u64) -> Result<(), ChainError> {
        if self.is_cancelled() {
            return Err(ChainError::MiningCancelled { attempts });
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(ChainError::MiningTimeout { attempts });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Miner {
    nonce_length: usize,
    threads: usize,
}

impl Miner {
    pub fn new(nonce_length: usize) -> Self {
        Miner {
            nonce_length: nonce_length.max(1),
            threads: 1,
        }
    }

    pub fn from_config(config: &MinerConfig) -> Self {
        Self::new(config.nonce_length).with_threads(config.threads)
    }

    /// Race `threads` workers; the first admissible nonce wins.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Number of distinct nonces, saturating at `u64::MAX`.
    fn nonce_space(&self) -> u64 {
        u32::try_from(self.nonce_length)
            .ok()
            .and_then(|len| ALPHABET_SIZE.checked_pow(len))
            .unwrap_or(u64::MAX)
    }

    fn tracks_tried(&self) -> bool {
        self.nonce_space() <= TRACKED_SPACE_LIMIT
    }

    fn random_nonce(&self, rng: &mut impl Rng) -> String {
        rng.sample_iter(&Alphanumeric)
            .take(self.nonce_length)
            .map(char::from)
            .collect()
    }

    /// Find a nonce that makes `block` admissible at its own difficulty.
    pub fn mine<P: Payload>(&self, block: &Block<P>, cancel: &CancelToken) -> Result<String, ChainError> {
        let difficulty = block.difficulty();
        if difficulty as usize > std::mem::size_of::<Sha256Hash>() {
            return Err(ChainError::UnreachableDifficulty(difficulty));
        }

        let hasher = LinkHasher::new(&block.payload, block.previous_hash());
        let started = Instant::now();

        let nonce = if self.threads == 1 {
            self.search(&hasher, difficulty, cancel, &AtomicBool::new(false))?
        } else {
            self.search_parallel(&hasher, difficulty, cancel)?
        };

        info!(
            difficulty,
            nonce = %nonce,
            elapsed_ms = %started.elapsed().as_millis(),
            "Mined block"
        );
        Ok(nonce)
    }

    fn search_parallel(
        &self,
        hasher: &LinkHasher,
        difficulty: u32,
        cancel: &CancelToken,
    ) -> Result<String, ChainError> {
        let found = AtomicBool::new(false);
        let outcomes: Vec<Result<String, ChainError>> = (0..self.threads)
            .into_par_iter()
            .map(|worker| {
                let outcome = self.search(hasher, difficulty, cancel, &found);
                if outcome.is_ok() {
                    found.store(true, Ordering::SeqCst);
                    debug!(worker, "Worker found admissible nonce");
                }
                outcome
            })
            .collect();

        let mut first_error = None;
        for outcome in outcomes {
            match outcome {
                Ok(nonce) => return Ok(nonce),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        Err(first_error.unwrap_or(ChainError::MiningCancelled { attempts: 0 }))
    }

    /// One worker's loop. `found` is raised by a sibling that already won.
    fn search(
        &self,
        hasher: &LinkHasher,
        difficulty: u32,
        cancel: &CancelToken,
        found: &AtomicBool,
    ) -> Result<String, ChainError> {
        let mut rng = rand::thread_rng();
        let space = self.nonce_space();
        let mut tried = self.tracks_tried().then(HashSet::new);
        let mut attempts: u64 = 0;
        let mut draws: u64 = 0;

        loop {
            if draws % CHECK_INTERVAL == 0 {
                cancel.check(attempts)?;
                if found.load(Ordering::SeqCst) {
                    return Err(ChainError::MiningCancelled { attempts });
                }
            }
            draws += 1;

            let nonce = self.random_nonce(&mut rng);
            if let Some(tried) = tried.as_mut() {
                if tried.len() as u64 >= space {
                    return Err(ChainError::NonceSpaceExhausted { attempts });
                }
                if !tried.insert(nonce.clone()) {
                    continue;
                }
            }
            attempts += 1;

            if is_admissible(&hasher.digest_with_nonce(nonce.as_bytes()), difficulty) {
                debug!(attempts, "Admissible nonce found");
                return Ok(nonce);
            }
        }
    }
}

impl Default for Miner {
    fn default() -> Self {
        Self::from_config(&MinerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{BlockId, Chain};

    fn unmined_block(difficulty: u32) -> Chain<String> {
        let mut chain = Chain::with_difficulty(difficulty);
        chain.append("000".to_string());
        chain.append("111".to_string());
        chain
    }

    #[test]
    fn test_admissibility_predicate() {
        let mut hash = [0xffu8; 32];
        assert!(is_admissible(&hash, 0));
        assert!(!is_admissible(&hash, 1));

        hash[0] = 0;
        hash[1] = 0;
        assert!(is_admissible(&hash, 1));
        assert!(is_admissible(&hash, 2));
        assert!(!is_admissible(&hash, 3));
        assert!(!is_admissible(&[0u8; 32], 33));
    }

    #[test]
    fn test_mined_nonce_validates() {
        let mut chain = unmined_block(1);
        let tip = chain.tip().unwrap();
        let nonce = Miner::new(12).mine(chain.block(tip).unwrap(), &CancelToken::new()).unwrap();
        assert_eq!(nonce.len(), 12);

        chain.block_mut(tip).unwrap().nonce = Some(nonce);
        assert!(validate(chain.block(tip).unwrap()));
    }

    #[test]
    fn test_parallel_mining_finds_a_nonce() {
        let mut chain = unmined_block(1);
        let tip = chain.tip().unwrap();
        let miner = Miner::new(10).with_threads(4);
        chain.mine(tip, &miner, &CancelToken::new()).unwrap();
        assert!(chain.verify_pow(tip));
    }

    #[test]
    fn test_altered_payload_invalidates_nonce() {
        let mut chain = unmined_block(2);
        let tip = chain.tip().unwrap();
        chain.mine(tip, &Miner::new(16), &CancelToken::new()).unwrap();
        chain.block_mut(tip).unwrap().payload.push('!');
        assert!(!chain.verify_pow(tip));
    }

    #[test]
    fn test_cancelled_search_returns() {
        let chain = unmined_block(32);
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = Miner::new(16).mine(chain.block(BlockId(1)).unwrap(), &cancel);
        assert!(matches!(result, Err(ChainError::MiningCancelled { .. })));
    }

    #[test]
    fn test_timeout_bounds_search() {
        let chain = unmined_block(32);
        let cancel = CancelToken::with_timeout(Duration::from_millis(50));
        let result = Miner::new(16)
            .with_threads(2)
            .mine(chain.block(BlockId(1)).unwrap(), &cancel);
        assert!(matches!(result, Err(ChainError::MiningTimeout { .. })));
    }

    #[test]
    fn test_unreachable_difficulty_is_rejected() {
        let chain = unmined_block(33);
        let result = Miner::new(8).mine(chain.block(BlockId(1)).unwrap(), &CancelToken::new());
        assert_eq!(result, Err(ChainError::UnreachableDifficulty(33)));
    }

    #[test]
    fn test_only_small_nonce_spaces_are_tracked() {
        assert!(Miner::new(1).tracks_tried());
        assert!(Miner::new(3).tracks_tried());
        assert!(!Miner::new(4).tracks_tried());
        assert!(!Miner::default().tracks_tried());
    }

    #[test]
    fn test_cancel_is_honoured_in_small_nonce_space() {
        let chain = unmined_block(32);
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = Miner::new(1).mine(chain.block(BlockId(1)).unwrap(), &cancel);
        assert!(matches!(result, Err(ChainError::MiningCancelled { .. })));
    }

    #[test]
    fn test_replaced_nonce_fails_validation() {
        let mut chain = unmined_block(2);
        let tip = chain.tip().unwrap();
        chain.mine(tip, &Miner::new(16), &CancelToken::new()).unwrap();
        assert!(chain.verify_pow(tip));

        let block = chain.block_mut(tip).unwrap();
        let mined = block.nonce.clone().unwrap();
        block.nonce = Some(format!("{}-altered", mined));
        assert!(!chain.verify_pow(tip));
    }

    #[test]
    fn test_tiny_nonce_space_is_exhausted() {
        let chain = unmined_block(32);
        let result = Miner::new(1).mine(chain.block(BlockId(1)).unwrap(), &CancelToken::new());
        assert!(matches!(result, Err(ChainError::NonceSpaceExhausted { .. })));
    }
}
