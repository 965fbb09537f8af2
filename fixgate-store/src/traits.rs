/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Store trait definitions.
//!
//! A session owns one [`MessageStore`] (outbound frames kept for resends) and
//! one [`SequenceStore`] (the durable `(out, in)` pair).

use async_trait::async_trait;
use bytes::Bytes;
use fixgate_core::error::StoreError;
use serde::{Deserialize, Serialize};

/// An outbound frame retained for resend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    /// MsgSeqNum the frame was sent with.
    pub seq_num: u64,
    /// Complete frame as transmitted.
    pub frame: Bytes,
}

/// Abstract interface for outbound message retention.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Retains a transmitted frame under its sequence number.
    ///
    /// # Errors
    /// Returns `StoreError` if the frame cannot be stored.
    async fn store(&self, seq_num: u64, frame: Bytes) -> Result<(), StoreError>;

    /// Returns the retained frames with `begin <= seq <= end`, ascending.
    ///
    /// `end == 0` means "through the newest". Missing sequences are simply
    /// absent from the result; callers fill the holes.
    ///
    /// # Errors
    /// Returns `StoreError` if the store cannot be read.
    async fn get_range(&self, begin: u64, end: u64) -> Result<Vec<StoredMessage>, StoreError>;

    /// Drops every retained frame.
    ///
    /// # Errors
    /// Returns `StoreError` if the reset fails.
    async fn reset(&self) -> Result<(), StoreError>;

    /// Returns the number of retained frames.
    fn len(&self) -> usize;

    /// Returns true if nothing is retained.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Durable pair of sequence counters.
///
/// `out_seq` is the last MsgSeqNum sent, `in_seq` the last one accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceNumbers {
    /// Last outbound sequence number used.
    pub out_seq: u64,
    /// Last inbound sequence number accepted.
    pub in_seq: u64,
}

/// Abstract interface for durable sequence counters.
#[async_trait]
pub trait SequenceStore: Send + Sync {
    /// Loads the persisted pair; a store never written yields zeros.
    ///
    /// # Errors
    /// `Corrupted` if persisted state cannot be parsed, `Io` on read failure.
    async fn load(&self) -> Result<SequenceNumbers, StoreError>;

    /// Durably replaces the persisted pair.
    ///
    /// # Errors
    /// Returns `StoreError` if the write does not complete.
    async fn save(&self, seqs: SequenceNumbers) -> Result<(), StoreError>;
}
