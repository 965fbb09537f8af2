/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Error types for the FixGate gateway.
//!
//! Every layer owns a `thiserror` enum; [`FixError`] unifies them so callers
//! can propagate any failure with `?`.

use std::ops::Range;
use thiserror::Error;

/// Result type alias using [`FixError`] as the error type.
pub type Result<T> = std::result::Result<T, FixError>;

/// Top-level error type for all gateway operations.
#[derive(Debug, Error)]
pub enum FixError {
    /// Error during frame decoding or validation.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Error during frame encoding.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Error in session layer operations.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Error in message or sequence store operations.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Error while establishing or using the byte stream.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration could not be loaded or is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error from underlying transport.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that occur while parsing or validating an inbound frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Frame buffer is incomplete, need more data.
    #[error("incomplete message, need more data")]
    Incomplete,

    /// A mandatory framing tag (8, 9, 35 or 10) is absent or out of place.
    #[error("malformed message: {reason}")]
    Malformed {
        /// What made the frame unusable.
        reason: String,
    },

    /// Checksum mismatch between calculated and declared values.
    #[error("checksum mismatch: calculated {calculated}, declared {declared}")]
    ChecksumMismatch {
        /// Calculated checksum value.
        calculated: u8,
        /// Declared checksum value in message.
        declared: u8,
    },

    /// Declared BodyLength does not match the bytes between tag 9 and tag 10.
    #[error("body length mismatch: declared {declared}, actual {actual}")]
    BodyLengthMismatch {
        /// BodyLength value carried in the frame.
        declared: usize,
        /// Bytes actually present between the BodyLength value and the checksum tag.
        actual: usize,
    },

    /// Missing required field.
    #[error("missing required field: tag {tag}")]
    MissingRequiredField {
        /// The tag number of the missing field.
        tag: u32,
    },

    /// Invalid field value for the expected type.
    #[error("invalid field value for tag {tag}: {reason}")]
    InvalidFieldValue {
        /// The tag number of the field.
        tag: u32,
        /// Description of why the value is invalid.
        reason: String,
    },

    /// Invalid UTF-8 in string field.
    #[error("invalid utf-8 in field: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// Message exceeds maximum allowed size.
    #[error("message too large: {size} bytes exceeds maximum {max_size}")]
    MessageTooLarge {
        /// Actual message size in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max_size: usize,
    },
}

impl DecodeError {
    /// Shorthand for a [`DecodeError::Malformed`] with the given reason.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

/// Errors that occur during frame encoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Missing required field during encoding.
    #[error("missing required field: tag {tag}")]
    MissingRequiredField {
        /// The tag number of the missing field.
        tag: u32,
    },

    /// Field value contains the SOH delimiter and cannot be framed.
    #[error("field value for tag {tag} contains the field delimiter")]
    EmbeddedDelimiter {
        /// The tag number of the field.
        tag: u32,
    },
}

/// Errors in FIX session layer operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Session is not in the correct state for the operation.
    #[error("invalid session state: expected {expected}, current {current}")]
    InvalidState {
        /// Expected state for the operation.
        expected: String,
        /// Current session state.
        current: String,
    },

    /// An application command was issued while the session is not logged in.
    #[error("session {session_id} is not logged in")]
    NotLoggedIn {
        /// The session the command targeted.
        session_id: String,
    },

    /// No session is registered under the given id.
    #[error("unknown session: {0}")]
    UnknownSession(String),

    /// Logon was answered with Logout/Reject.
    #[error("logon rejected: {reason}")]
    LogonRejected {
        /// Text carried by the counterparty's reply.
        reason: String,
    },

    /// No Logon reply arrived within the handshake deadline.
    #[error("logon timed out after {elapsed_ms} milliseconds")]
    LogonTimeout {
        /// The deadline that elapsed.
        elapsed_ms: u64,
    },

    /// Heartbeat timeout - no response to TestRequest.
    #[error("heartbeat timeout after {elapsed_ms} milliseconds")]
    HeartbeatTimeout {
        /// Elapsed time in milliseconds since the TestRequest was sent.
        elapsed_ms: u64,
    },

    /// Sequence number too low without PossDupFlag.
    #[error("sequence too low: expected >= {expected}, received {received}")]
    SequenceTooLow {
        /// Minimum expected sequence number.
        expected: u64,
        /// Received sequence number.
        received: u64,
    },

    /// A market data subscription was rejected by the counterparty.
    #[error("subscription {md_req_id} rejected: {reason}")]
    SubscriptionRejected {
        /// MDReqID of the rejected request.
        md_req_id: String,
        /// Reason text or code.
        reason: String,
    },

    /// An outbound write did not complete within its deadline.
    #[error("write timed out after {elapsed_ms} milliseconds")]
    WriteTimeout {
        /// The deadline that elapsed.
        elapsed_ms: u64,
    },

    /// The connection was closed by the peer or locally.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Errors raised while establishing the byte stream for a session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// TCP dial failed.
    #[error("connect to {addr} failed: {reason}")]
    Connect {
        /// Address that was dialled.
        addr: String,
        /// Underlying failure.
        reason: String,
    },

    /// A connection stage did not finish in time.
    #[error("{stage} timed out after {elapsed_ms} milliseconds")]
    Timeout {
        /// Stage that stalled (dial, socks5, http-connect, tls).
        stage: &'static str,
        /// The deadline that elapsed.
        elapsed_ms: u64,
    },

    /// SOCKS5 negotiation failed.
    #[error("socks5 handshake failed: {0}")]
    Socks5(String),

    /// HTTP CONNECT tunnel failed.
    #[error("http connect failed: {0}")]
    HttpConnect(String),

    /// Both proxy tunnelling strategies failed.
    #[error("proxy tunnel failed (socks5: {socks5}; http connect: {http})")]
    ProxyExhausted {
        /// Failure of the SOCKS5 attempt.
        socks5: String,
        /// Failure of the HTTP CONNECT attempt.
        http: String,
    },

    /// TLS configuration or handshake failed.
    #[error("tls error: {0}")]
    Tls(String),

    /// Other I/O failure on the stream.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Errors in message and sequence store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Message not found in store.
    #[error("message not found: seq={seq_num}")]
    NotFound {
        /// Sequence number of the missing message.
        seq_num: u64,
    },

    /// Range of messages not available.
    #[error("messages not available for range: {range:?}")]
    RangeNotAvailable {
        /// The requested range of sequence numbers.
        range: Range<u64>,
    },

    /// Persisted state could not be interpreted.
    #[error("store corrupted: {reason}")]
    Corrupted {
        /// Description of the corruption.
        reason: String,
    },

    /// I/O error in persistent store.
    #[error("store i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
