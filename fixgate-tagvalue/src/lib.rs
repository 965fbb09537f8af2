/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # FixGate Tag-Value
//!
//! Tag=value wire codec for the FixGate gateway.
//!
//! - **Decoding**: single pass, zero-copy; values reference the input frame
//! - **Validation**: checksum and BodyLength checks, usable separately
//! - **Encoding**: builder that writes the standard header and computes
//!   BodyLength and Checksum on completion

pub mod checksum;
pub mod decoder;
pub mod encoder;

pub use checksum::{calculate_checksum, validate_checksum};
pub use decoder::{Decoder, SOH, decode, validate_body_length};
pub use encoder::{Encoder, Header};
pub use fixgate_core::message::RawMessage;
