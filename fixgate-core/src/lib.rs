/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # FixGate Core
//!
//! Core types and error definitions shared by every FixGate crate:
//! - **Error types**: one `thiserror` enum per layer, unified by [`FixError`]
//! - **Field and message views**: [`FieldRef`], [`RawMessage`], [`Group`]
//! - **Core types**: [`Timestamp`], [`CompId`], [`MsgType`] and the
//!   single-character code enums behind [`FixChar`]
//! - **Tags**: named FIX 4.4 tag numbers in [`tags`]
//!
//! Inbound frames are never copied: views borrow the decoded buffer and
//! convert values on access.

pub mod error;
pub mod field;
pub mod message;
pub mod tags;
pub mod types;

pub use error::{
    DecodeError, EncodeError, FixError, Result, SessionError, StoreError, TransportError,
};
pub use field::FieldRef;
pub use message::{Group, MsgType, RawMessage};
pub use types::{
    CompId, ExecType, FixChar, MdEntryType, MdUpdateAction, OrdStatus, OrdType, Side,
    SubscriptionRequestType, TimeInForce, Timestamp,
};
