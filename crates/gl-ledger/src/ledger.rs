use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tracing::{debug, info, warn};

use gl_crypto::HashChainVerifier;
use gl_store::{LedgerStore, RecordStore};
use gl_types::Timestamp;

use crate::block::{Block, OperationTag, Payload};
use crate::error::LedgerError;
use crate::verification::Verification;

/// User-facing counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    /// Active records in the record table.
    pub active_record_count: usize,
    /// Blocks in the chain, genesis excluded.
    pub block_count: usize,
}

/// Single-writer hash chain mirrored to a [`LedgerStore`].
///
/// The full chain is held in memory. Appends take the write lock for the
/// whole read-tail, hash, persist, push sequence, so two concurrent appends
/// can never both build on the same tail. Verification and reads share the
/// read lock.
pub struct Ledger<S> {
    store: S,
    chain: RwLock<Vec<Block>>,
}

impl<S: LedgerStore> Ledger<S> {
    /// Load the persisted chain, creating the genesis block if the store is
    /// empty.
    ///
    /// Fails if the store cannot be read; an empty store is not an error.
    pub fn open(store: S) -> Result<Self, LedgerError> {
        let ledger = Self {
            store,
            chain: RwLock::new(Vec::new()),
        };
        ledger.initialize()?;
        Ok(ledger)
    }

    /// Reload the chain from the store, creating genesis if none exists.
    ///
    /// Stored rows must start with a genesis block and carry the indices
    /// 0, 1, 2, ... without gaps. On any failure the chain is left empty and
    /// appends are refused until a later call succeeds.
    pub fn initialize(&self) -> Result<(), LedgerError> {
        let mut chain = self.write_chain()?;
        self.load_into(&mut chain)
    }

    fn load_into(&self, chain: &mut Vec<Block>) -> Result<(), LedgerError> {
        chain.clear();
        let rows = self.store.load_all().map_err(LedgerError::Load)?;
        let blocks: Vec<Block> = rows.into_iter().map(Block::from_row).collect();
        check_contiguous(&blocks)?;
        *chain = blocks;

        if chain.is_empty() {
            let genesis = Block::genesis(Timestamp::now())?;
            // Genesis content is fixed apart from its timestamp; a failed
            // write here is treated as a row that already exists.
            match self.store.append_block(&genesis.to_row()?) {
                Ok(()) => info!(hash = %genesis.hash(), "genesis block created"),
                Err(e) => warn!(error = %e, "genesis block not persisted; assuming it already exists"),
            }
            chain.push(genesis);
        }

        debug!(blocks = chain.len(), "ledger loaded");
        Ok(())
    }

    /// Append a block for `payload` and persist it.
    ///
    /// The index, timestamp, and previous hash are assigned here. If the
    /// store rejects the block the in-memory chain is left unchanged.
    pub fn append(&self, payload: Payload, operation_tag: OperationTag) -> Result<Block, LedgerError> {
        let mut chain = self.write_chain()?;

        let previous_hash = chain
            .last()
            .map(|b| b.hash().to_string())
            .ok_or(LedgerError::Uninitialized)?;
        let index = chain.len() as u64;

        let block = Block::seal(index, Timestamp::now(), payload, previous_hash, operation_tag)?;
        self.store
            .append_block(&block.to_row()?)
            .map_err(|source| LedgerError::Persist { index, source })?;
        chain.push(block.clone());

        debug!(index, tag = %block.operation_tag(), hash = %block.hash(), "block appended");
        Ok(block)
    }

    /// Check every block after genesis: recomputed hash first, then the
    /// link to its predecessor. The first failure is reported.
    pub fn verify(&self) -> Result<Verification, LedgerError> {
        let chain = self.read_chain()?;
        if chain.len() <= 1 {
            return Ok(Verification::trivial());
        }

        let verification = match HashChainVerifier::verify_chain(chain.as_slice()) {
            Ok(()) => Verification::intact(),
            Err(err) => {
                warn!(index = err.index(), error = %err, "ledger integrity violation");
                Verification::from(err)
            }
        };
        Ok(verification)
    }

    /// Active record count and block count (genesis excluded).
    pub fn stats<R: RecordStore + ?Sized>(&self, records: &R) -> Result<LedgerStats, LedgerError> {
        let active_record_count = records.query_active().map_err(LedgerError::Records)?.len();
        let block_count = self.read_chain()?.len().saturating_sub(1);
        Ok(LedgerStats {
            active_record_count,
            block_count,
        })
    }

    /// Erase the block log and the record table, then start a fresh chain.
    ///
    /// The block log goes first: if it cannot be cleared nothing has changed.
    /// Once it is cleared the old chain is gone, and any later failure leaves
    /// the ledger uninitialized rather than holding blocks for erased records.
    ///
    /// Irreversible. Callers are responsible for any confirmation step.
    pub fn reset<R: RecordStore + ?Sized>(&self, records: &R) -> Result<(), LedgerError> {
        let mut chain = self.write_chain()?;

        self.store.delete_all().map_err(LedgerError::Clear)?;
        chain.clear();
        records.delete_all().map_err(LedgerError::Records)?;

        info!("ledger reset");
        self.load_into(&mut chain)
    }

    /// Number of blocks, genesis included.
    pub fn len(&self) -> Result<usize, LedgerError> {
        Ok(self.read_chain()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.read_chain()?.is_empty())
    }

    /// A copy of the full chain, genesis first.
    pub fn blocks(&self) -> Result<Vec<Block>, LedgerError> {
        Ok(self.read_chain()?.clone())
    }

    pub fn block(&self, index: u64) -> Result<Option<Block>, LedgerError> {
        let chain = self.read_chain()?;
        Ok(usize::try_from(index).ok().and_then(|i| chain.get(i)).cloned())
    }

    /// The most recently appended block.
    pub fn tail(&self) -> Result<Option<Block>, LedgerError> {
        Ok(self.read_chain()?.last().cloned())
    }

    /// The backing block store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn read_chain(&self) -> Result<RwLockReadGuard<'_, Vec<Block>>, LedgerError> {
        self.chain.read().map_err(|_| LedgerError::LockPoisoned)
    }

    fn write_chain(&self) -> Result<RwLockWriteGuard<'_, Vec<Block>>, LedgerError> {
        self.chain.write().map_err(|_| LedgerError::LockPoisoned)
    }
}

/// Position 0 must hold genesis and every block must sit at its own index.
fn check_contiguous(blocks: &[Block]) -> Result<(), LedgerError> {
    if let Some(first) = blocks.first() {
        if !first.is_genesis() {
            return Err(LedgerError::MissingGenesis {
                first_index: first.index(),
            });
        }
    }
    for (position, block) in blocks.iter().enumerate() {
        let expected = position as u64;
        if block.index() != expected {
            return Err(LedgerError::Discontinuous {
                expected,
                found: block.index(),
            });
        }
    }
    Ok(())
}
