/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! In-memory store implementations.
//!
//! [`MemoryStore`] keeps outbound frames in a `BTreeMap` bounded by a message
//! count; [`MemorySequenceStore`] keeps the counters in memory for tests and
//! sessions that do not need durability.

use crate::traits::{MessageStore, SequenceNumbers, SequenceStore, StoredMessage};
use async_trait::async_trait;
use bytes::Bytes;
use fixgate_core::error::StoreError;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Default number of outbound frames retained for resends.
pub const DEFAULT_RETENTION: usize = 50_000;

/// Count-bounded in-memory message store.
///
/// Once more than `capacity` frames are held, the lowest sequence numbers are
/// evicted. Evicted sequences are answered with gap-fills on resend.
#[derive(Debug)]
pub struct MemoryStore {
    messages: RwLock<BTreeMap<u64, Bytes>>,
    capacity: usize,
    evicted: AtomicU64,
}

impl MemoryStore {
    /// Creates a store with [`DEFAULT_RETENTION`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_RETENTION)
    }

    /// Creates a store retaining at most `capacity` frames (minimum 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            messages: RwLock::new(BTreeMap::new()),
            capacity: capacity.max(1),
            evicted: AtomicU64::new(0),
        }
    }

    /// Checks if a frame with the given sequence number is retained.
    #[must_use]
    pub fn contains(&self, seq_num: u64) -> bool {
        self.messages.read().contains_key(&seq_num)
    }

    /// Returns how many frames have been evicted so far.
    #[must_use]
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn store(&self, seq_num: u64, frame: Bytes) -> Result<(), StoreError> {
        let mut messages = self.messages.write();
        messages.insert(seq_num, frame);
        while messages.len() > self.capacity {
            if messages.pop_first().is_some() {
                self.evicted.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    async fn get_range(&self, begin: u64, end: u64) -> Result<Vec<StoredMessage>, StoreError> {
        let end = if end == 0 { u64::MAX } else { end };
        if begin > end {
            return Ok(Vec::new());
        }
        let messages = self.messages.read();
        Ok(messages
            .range(begin..=end)
            .map(|(seq_num, frame)| StoredMessage {
                seq_num: *seq_num,
                frame: frame.clone(),
            })
            .collect())
    }

    async fn reset(&self) -> Result<(), StoreError> {
        self.messages.write().clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.messages.read().len()
    }
}

/// Sequence counters held in memory.
#[derive(Debug, Default)]
pub struct MemorySequenceStore {
    seqs: Mutex<SequenceNumbers>,
    saves: AtomicU64,
}

impl MemorySequenceStore {
    /// Creates a store starting from `seqs`.
    #[must_use]
    pub fn with_initial(seqs: SequenceNumbers) -> Self {
        Self {
            seqs: Mutex::new(seqs),
            saves: AtomicU64::new(0),
        }
    }

    /// Returns how many times [`SequenceStore::save`] was called.
    #[must_use]
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SequenceStore for MemorySequenceStore {
    async fn load(&self) -> Result<SequenceNumbers, StoreError> {
        Ok(*self.seqs.lock())
    }

    async fn save(&self, seqs: SequenceNumbers) -> Result<(), StoreError> {
        *self.seqs.lock() = seqs;
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
