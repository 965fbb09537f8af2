/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Sequence number management.
//!
//! Both counters hold the *last* number used: `out_seq` is the MsgSeqNum of
//! the last frame sent, `in_seq` the last one accepted. A fresh session
//! starts at `(0, 0)`, so its first Logon goes out as 1 and expects 1.

use fixgate_store::SequenceNumbers;
use std::sync::atomic::{AtomicU64, Ordering};

/// Manages the sequence counters of one session.
///
/// Outbound allocation is only performed under the session's writer lock,
/// so the atomics never race on `out_seq`; they let readers snapshot the
/// counters without taking that lock.
#[derive(Debug, Default)]
pub struct SequenceManager {
    out_seq: AtomicU64,
    in_seq: AtomicU64,
}

impl SequenceManager {
    /// Creates a manager at `(0, 0)`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a manager from persisted counters.
    #[must_use]
    pub fn with_initial(seqs: SequenceNumbers) -> Self {
        Self {
            out_seq: AtomicU64::new(seqs.out_seq),
            in_seq: AtomicU64::new(seqs.in_seq),
        }
    }

    /// Returns the last outbound sequence number used.
    #[inline]
    #[must_use]
    pub fn out_seq(&self) -> u64 {
        self.out_seq.load(Ordering::SeqCst)
    }

    /// Returns the last inbound sequence number accepted.
    #[inline]
    #[must_use]
    pub fn in_seq(&self) -> u64 {
        self.in_seq.load(Ordering::SeqCst)
    }

    /// Returns the next inbound sequence number expected.
    #[inline]
    #[must_use]
    pub fn expected_in(&self) -> u64 {
        self.in_seq() + 1
    }

    /// Consumes and returns the next outbound sequence number.
    #[inline]
    pub fn allocate_out(&self) -> u64 {
        self.out_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Records `seq` as the last accepted inbound number.
    #[inline]
    pub fn set_in(&self, seq: u64) {
        self.in_seq.store(seq, Ordering::SeqCst);
    }

    /// Overwrites the last outbound number.
    #[inline]
    pub fn set_out(&self, seq: u64) {
        self.out_seq.store(seq, Ordering::SeqCst);
    }

    /// Resets both counters to zero.
    pub fn reset(&self) {
        self.out_seq.store(0, Ordering::SeqCst);
        self.in_seq.store(0, Ordering::SeqCst);
    }

    /// Returns both counters as a persistable pair.
    #[must_use]
    pub fn snapshot(&self) -> SequenceNumbers {
        SequenceNumbers {
            out_seq: self.out_seq(),
            in_seq: self.in_seq(),
        }
    }

    /// Classifies an inbound MsgSeqNum against the expected value.
    ///
    /// Does not change any counter; callers apply the outcome once the message
    /// has been processed.
    #[must_use]
    pub fn validate_incoming(&self, received: u64, poss_dup: bool) -> SequenceCheck {
        let expected = self.expected_in();
        if received == expected {
            SequenceCheck::InOrder
        } else if received > expected {
            SequenceCheck::Gap { expected, received }
        } else if poss_dup {
            SequenceCheck::PossDuplicate
        } else {
            SequenceCheck::TooLow { expected, received }
        }
    }
}

/// Outcome of inbound sequence validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceCheck {
    /// Exactly the expected number.
    InOrder,
    /// Higher than expected: `expected..received` are missing.
    Gap {
        /// First missing number.
        expected: u64,
        /// Number carried by the message.
        received: u64,
    },
    /// Lower than expected with PossDupFlag=Y: a resend.
    PossDuplicate,
    /// Lower than expected without PossDupFlag.
    TooLow {
        /// Number that was expected.
        expected: u64,
        /// Number carried by the message.
        received: u64,
    },
}

impl SequenceCheck {
    /// Returns the `(begin, end)` range to request, if this is a gap.
    #[must_use]
    pub const fn resend_range(&self) -> Option<(u64, u64)> {
        match *self {
            Self::Gap { expected, received } => Some((expected, received - 1)),
            _ => None,
        }
    }

    /// Returns the inbound counter value after the message is processed, or
    /// `None` if it must stay unchanged.
    #[must_use]
    pub const fn next_in_seq(&self, received: u64) -> Option<u64> {
        match self {
            Self::InOrder | Self::Gap { .. } => Some(received),
            Self::PossDuplicate | Self::TooLow { .. } => None,
        }
    }
}
