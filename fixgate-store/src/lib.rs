/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # FixGate Store
//!
//! Session persistence for the FixGate gateway.
//!
//! This crate provides:
//! - **MessageStore trait**: outbound frames retained for resend requests
//! - **SequenceStore trait**: the durable `(out, in)` sequence pair
//! - **MemoryStore**: count-bounded in-memory message retention
//! - **FileSequenceStore**: crash-safe JSON file per session

pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileSequenceStore;
pub use memory::{DEFAULT_RETENTION, MemorySequenceStore, MemoryStore};
pub use traits::{MessageStore, SequenceNumbers, SequenceStore, StoredMessage};
