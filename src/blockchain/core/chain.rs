use crate::error::{ChainError, ValidationFailure};
use crate::hashing::{hash_link, Payload};
use crate::miner::{self, CancelToken, Miner};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

pub use crate::hashing::Sha256Hash;

/// Leading zero bytes required by default when a chain does not specify one.
pub const DEFAULT_DIFFICULTY: u32 = 2;

/// Position of a block in its chain's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub usize);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A payload linked to its predecessor by the predecessor's hash.
///
/// `previous_hash` is captured once, when the block is pushed. Everything that
/// checks it later recomputes the predecessor's hash from scratch, so
/// rewriting an ancestor's payload after the fact is visible to every
/// descendant.
#[derive(Debug, Clone, PartialEq)]
pub struct Block<P> {
    pub payload: P,
    pub(crate) previous: Option<BlockId>,
    pub(crate) previous_hash: Option<Sha256Hash>,
    pub(crate) difficulty: u32,
    pub(crate) nonce: Option<String>,
}

impl<P: Payload> Block<P> {
    /// `hash(payload, previous_hash)`, the value a successor links to.
    pub fn hash(&self) -> Sha256Hash {
        hash_link(&self.payload, self.previous_hash.as_ref())
    }

    pub fn previous(&self) -> Option<BlockId> {
        self.previous
    }

    pub fn previous_hash(&self) -> Option<&Sha256Hash> {
        self.previous_hash.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.previous.is_none()
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn nonce(&self) -> Option<&str> {
        self.nonce.as_deref()
    }

    pub fn is_mined(&self) -> bool {
        self.nonce.is_some()
    }

    /// Drops the mined nonce, returning the block to the unmined state.
    pub fn clear_nonce(&mut self) {
        self.nonce = None;
    }
}

/// Outcome of a backward tamper-detection walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TamperReport {
    /// Every link from the start block down to `root` recomputed correctly.
    Clean { root: BlockId, blocks_checked: usize },
    /// `block`'s stored link no longer matches `ancestor`'s recomputed hash,
    /// meaning `ancestor` was modified after `block` was built on it.
    Tampered { block: BlockId, ancestor: BlockId },
}

impl TamperReport {
    pub fn is_clean(&self) -> bool {
        matches!(self, TamperReport::Clean { .. })
    }
}

impl fmt::Display for TamperReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TamperReport::Clean { root, blocks_checked } => write!(
                f,
                "No tampering detected: reached root {} after {} blocks",
                root, blocks_checked
            ),
            TamperReport::Tampered { block, ancestor } => write!(
                f,
                "Tampering detected on block {} (link from {} is broken)",
                ancestor, block
            ),
        }
    }
}

/// Append-only arena of hash-linked blocks.
///
/// Blocks reference their predecessor by [`BlockId`]; a predecessor must
/// already exist when a block is pushed, so the links never form a cycle.
#[derive(Debug, Clone)]
pub struct Chain<P> {
    blocks: Vec<Block<P>>,
    difficulty: u32,
}

impl<P: Payload> Default for Chain<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Payload> Chain<P> {
    pub fn new() -> Self {
        Self::with_difficulty(DEFAULT_DIFFICULTY)
    }

    /// Difficulty stamped on every block pushed from now on.
    pub fn with_difficulty(difficulty: u32) -> Self {
        Chain {
            blocks: Vec::new(),
            difficulty,
        }
    }

    pub(crate) fn from_blocks(blocks: Vec<Block<P>>, difficulty: u32) -> Self {
        Chain { blocks, difficulty }
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The most recently pushed block.
    pub fn tip(&self) -> Option<BlockId> {
        self.blocks.len().checked_sub(1).map(BlockId)
    }

    pub fn get(&self, id: BlockId) -> Option<&Block<P>> {
        self.blocks.get(id.0)
    }

    pub fn block(&self, id: BlockId) -> Result<&Block<P>, ChainError> {
        self.get(id).ok_or(ChainError::UnknownBlock(id))
    }

    pub fn block_mut(&mut self, id: BlockId) -> Result<&mut Block<P>, ChainError> {
        self.blocks.get_mut(id.0).ok_or(ChainError::UnknownBlock(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockId, &Block<P>)> {
        self.blocks.iter().enumerate().map(|(i, b)| (BlockId(i), b))
    }

    /// Build a block on `previous` (or a new root), capturing the
    /// predecessor's hash at this instant.
    pub fn push(&mut self, payload: P, previous: Option<BlockId>) -> Result<BlockId, ChainError> {
        let previous_hash = match previous {
            Some(id) => Some(self.block(id)?.hash()),
            None => None,
        };

        let id = BlockId(self.blocks.len());
        self.blocks.push(Block {
            payload,
            previous,
            previous_hash,
            difficulty: self.difficulty,
            nonce: None,
        });
        debug!(block = %id, previous = ?previous.map(|p| p.0), "chain.push");
        Ok(id)
    }

    /// Build a block on the current tip, or a root if the chain is empty.
    pub fn append(&mut self, payload: P) -> BlockId {
        let id = BlockId(self.blocks.len());
        let previous = self.tip();
        let previous_hash = previous.map(|p| self.blocks[p.0].hash());
        self.blocks.push(Block {
            payload,
            previous,
            previous_hash,
            difficulty: self.difficulty,
            nonce: None,
        });
        id
    }

    /// Recompute the predecessor's hash and compare it with the stored link.
    pub fn check_link(&self, id: BlockId) -> Result<(), ValidationFailure> {
        let block = self.get(id).ok_or(ValidationFailure::UnknownBlock(id))?;
        let Some(previous) = block.previous else {
            return Ok(());
        };
        let predecessor = self
            .get(previous)
            .ok_or(ValidationFailure::UnknownBlock(previous))?;

        if block.previous_hash != Some(predecessor.hash()) {
            return Err(ValidationFailure::BrokenHashLink {
                block: id,
                previous,
            });
        }
        Ok(())
    }

    /// Root blocks are trivially valid.
    pub fn is_structurally_valid(&self, id: BlockId) -> bool {
        self.check_link(id).is_ok()
    }

    /// Walk predecessor links from `from` toward the root, stopping at the
    /// first link that no longer recomputes.
    pub fn detect_tampering(&self, from: BlockId) -> Result<TamperReport, ChainError> {
        let mut current = from;
        let mut blocks_checked = 0;

        loop {
            let block = self.block(current)?;
            blocks_checked += 1;

            let Some(previous) = block.previous else {
                info!(root = %current, blocks_checked, "No tampering detected, reached root");
                return Ok(TamperReport::Clean {
                    root: current,
                    blocks_checked,
                });
            };

            if !self.is_structurally_valid(current) {
                warn!(block = %current, ancestor = %previous, "Tampering detected");
                return Ok(TamperReport::Tampered {
                    block: current,
                    ancestor: previous,
                });
            }
            current = previous;
        }
    }

    /// Search for an admissible nonce for `id` and store it on the block.
    /// A block that already carries a nonce is refused; clear it first to
    /// mine again.
    pub fn mine(&mut self, id: BlockId, miner: &Miner, cancel: &CancelToken) -> Result<String, ChainError> {
        let block = self.block(id)?;
        if block.is_mined() {
            warn!(block = %id, "Refusing to mine a block that already has a nonce");
            return Err(ChainError::AlreadyMined(id));
        }
        let nonce = miner.mine(block, cancel)?;
        self.block_mut(id)?.nonce = Some(nonce.clone());
        Ok(nonce)
    }

    /// Check the nonce claimed by `id` without searching.
    pub fn verify_pow(&self, id: BlockId) -> bool {
        self.get(id).is_some_and(miner::validate)
    }
}
