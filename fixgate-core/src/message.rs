/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Message views for FIX 4.4 frames.
//!
//! This module provides:
//! - [`MsgType`]: closed enumeration of the message kinds the gateway speaks
//! - [`RawMessage`]: zero-copy, tag-indexed view of a decoded frame
//! - [`Group`]: one entry of a repeating group inside a [`RawMessage`]

use crate::error::DecodeError;
use crate::field::FieldRef;
use crate::tags;
use crate::types::{FixChar, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::ops::Range;

/// FIX 4.4 message types handled by the gateway.
///
/// Anything else decodes to [`MsgType::Unknown`] and is logged by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MsgType {
    /// Heartbeat (0).
    Heartbeat,
    /// Test Request (1).
    TestRequest,
    /// Resend Request (2).
    ResendRequest,
    /// Reject (3).
    Reject,
    /// Sequence Reset (4).
    SequenceReset,
    /// Logout (5).
    Logout,
    /// Logon (A).
    Logon,
    /// Business Message Reject (j).
    BusinessMessageReject,
    /// Execution Report (8).
    ExecutionReport,
    /// Order Cancel Reject (9).
    OrderCancelReject,
    /// New Order Single (D).
    NewOrderSingle,
    /// Order Cancel Request (F).
    OrderCancelRequest,
    /// Order Status Request (H).
    OrderStatusRequest,
    /// Order Mass Status Request (AF).
    OrderMassStatusRequest,
    /// Market Data Request (V).
    MarketDataRequest,
    /// Market Data Snapshot/Full Refresh (W).
    MarketDataSnapshot,
    /// Market Data Incremental Refresh (X).
    MarketDataIncrementalRefresh,
    /// Market Data Request Reject (Y).
    MarketDataRequestReject,
    /// Request For Positions (AN).
    RequestForPositions,
    /// Request For Positions Ack (AO).
    RequestForPositionsAck,
    /// Position Report (AP).
    PositionReport,
    /// Trade Capture Report Request (AD).
    TradeCaptureReportRequest,
    /// Trade Capture Report (AE).
    TradeCaptureReport,
    /// Trade Capture Report Request Ack (AQ).
    TradeCaptureReportRequestAck,
    /// Security Definition Request (c).
    SecurityDefinitionRequest,
    /// Security Definition (d).
    SecurityDefinition,
    /// Security List Request (x).
    SecurityListRequest,
    /// Security List (y).
    SecurityList,
    /// Any other message type, kept verbatim.
    Unknown(String),
}

impl std::str::FromStr for MsgType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "0" => Self::Heartbeat,
            "1" => Self::TestRequest,
            "2" => Self::ResendRequest,
            "3" => Self::Reject,
            "4" => Self::SequenceReset,
            "5" => Self::Logout,
            "A" => Self::Logon,
            "j" => Self::BusinessMessageReject,
            "8" => Self::ExecutionReport,
            "9" => Self::OrderCancelReject,
            "D" => Self::NewOrderSingle,
            "F" => Self::OrderCancelRequest,
            "H" => Self::OrderStatusRequest,
            "AF" => Self::OrderMassStatusRequest,
            "V" => Self::MarketDataRequest,
            "W" => Self::MarketDataSnapshot,
            "X" => Self::MarketDataIncrementalRefresh,
            "Y" => Self::MarketDataRequestReject,
            "AN" => Self::RequestForPositions,
            "AO" => Self::RequestForPositionsAck,
            "AP" => Self::PositionReport,
            "AD" => Self::TradeCaptureReportRequest,
            "AE" => Self::TradeCaptureReport,
            "AQ" => Self::TradeCaptureReportRequestAck,
            "c" => Self::SecurityDefinitionRequest,
            "d" => Self::SecurityDefinition,
            "x" => Self::SecurityListRequest,
            "y" => Self::SecurityList,
            other => Self::Unknown(other.to_string()),
        })
    }
}

impl MsgType {
    /// Returns the wire value of this message type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Heartbeat => "0",
            Self::TestRequest => "1",
            Self::ResendRequest => "2",
            Self::Reject => "3",
            Self::SequenceReset => "4",
            Self::Logout => "5",
            Self::Logon => "A",
            Self::BusinessMessageReject => "j",
            Self::ExecutionReport => "8",
            Self::OrderCancelReject => "9",
            Self::NewOrderSingle => "D",
            Self::OrderCancelRequest => "F",
            Self::OrderStatusRequest => "H",
            Self::OrderMassStatusRequest => "AF",
            Self::MarketDataRequest => "V",
            Self::MarketDataSnapshot => "W",
            Self::MarketDataIncrementalRefresh => "X",
            Self::MarketDataRequestReject => "Y",
            Self::RequestForPositions => "AN",
            Self::RequestForPositionsAck => "AO",
            Self::PositionReport => "AP",
            Self::TradeCaptureReportRequest => "AD",
            Self::TradeCaptureReport => "AE",
            Self::TradeCaptureReportRequestAck => "AQ",
            Self::SecurityDefinitionRequest => "c",
            Self::SecurityDefinition => "d",
            Self::SecurityListRequest => "x",
            Self::SecurityList => "y",
            Self::Unknown(s) => s.as_str(),
        }
    }

    /// Returns true for session-level (administrative) messages.
    ///
    /// BusinessMessageReject is application-level in FIX 4.4 but the gateway
    /// treats it alongside session rejects.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Self::Heartbeat
                | Self::TestRequest
                | Self::ResendRequest
                | Self::Reject
                | Self::SequenceReset
                | Self::Logout
                | Self::Logon
                | Self::BusinessMessageReject
        )
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Zero-copy view into a decoded FIX frame.
///
/// Field values are slices of the original buffer; every tag is indexed in
/// arrival order so repeating groups keep their layout.
#[derive(Debug, Clone)]
pub struct RawMessage<'a> {
    buffer: &'a [u8],
    begin_string: Range<usize>,
    body: Range<usize>,
    msg_type: MsgType,
    fields: SmallVec<[FieldRef<'a>; 32]>,
}

impl<'a> RawMessage<'a> {
    /// Assembles a view from decoder output.
    ///
    /// `body` spans from the byte after the BodyLength delimiter up to (not
    /// including) the `10=` checksum tag.
    #[must_use]
    pub fn new(
        buffer: &'a [u8],
        begin_string: Range<usize>,
        body: Range<usize>,
        msg_type: MsgType,
        fields: SmallVec<[FieldRef<'a>; 32]>,
    ) -> Self {
        Self {
            buffer,
            begin_string,
            body,
            msg_type,
            fields,
        }
    }

    /// Returns the complete frame.
    #[inline]
    #[must_use]
    pub const fn buffer(&self) -> &'a [u8] {
        self.buffer
    }

    /// Returns the BeginString value (e.g., "FIX.4.4").
    #[must_use]
    pub fn begin_string(&self) -> &'a str {
        std::str::from_utf8(&self.buffer[self.begin_string.clone()]).unwrap_or("")
    }

    /// Returns the message type.
    #[inline]
    #[must_use]
    pub fn msg_type(&self) -> &MsgType {
        &self.msg_type
    }

    /// Returns the body byte range (the span BodyLength counts).
    #[inline]
    #[must_use]
    pub fn body_range(&self) -> Range<usize> {
        self.body.clone()
    }

    /// Returns all fields in wire order.
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &[FieldRef<'a>] {
        &self.fields
    }

    /// Returns the first field with `tag`, if present.
    #[must_use]
    pub fn get_field(&self, tag: u32) -> Option<&FieldRef<'a>> {
        self.fields.iter().find(|f| f.tag == tag)
    }

    /// Returns true if `tag` occurs in the frame.
    #[must_use]
    pub fn has_field(&self, tag: u32) -> bool {
        self.get_field(tag).is_some()
    }

    fn require(&self, tag: u32) -> Result<&FieldRef<'a>, DecodeError> {
        self.get_field(tag)
            .ok_or(DecodeError::MissingRequiredField { tag })
    }

    /// Returns the value of `tag` as a string.
    ///
    /// # Errors
    /// `MissingRequiredField` if absent, `InvalidUtf8` if not UTF-8.
    pub fn get_str(&self, tag: u32) -> Result<&'a str, DecodeError> {
        self.require(tag)?.as_str()
    }

    /// Returns the value of `tag` as a string, or `None` if absent or invalid.
    #[must_use]
    pub fn field_str(&self, tag: u32) -> Option<&'a str> {
        self.get_field(tag).and_then(|f| f.as_str().ok())
    }

    /// Returns the value of `tag` as an unsigned integer.
    ///
    /// # Errors
    /// `MissingRequiredField` if absent, `InvalidFieldValue` if not an integer.
    pub fn get_u64(&self, tag: u32) -> Result<u64, DecodeError> {
        self.require(tag)?.as_u64()
    }

    /// Returns the value of `tag` as a signed integer.
    ///
    /// # Errors
    /// `MissingRequiredField` if absent, `InvalidFieldValue` if not an integer.
    pub fn get_i64(&self, tag: u32) -> Result<i64, DecodeError> {
        self.require(tag)?.as_i64()
    }

    /// Returns the value of `tag` as a decimal.
    ///
    /// # Errors
    /// `MissingRequiredField` if absent, `InvalidFieldValue` if not numeric.
    pub fn get_decimal(&self, tag: u32) -> Result<Decimal, DecodeError> {
        self.require(tag)?.as_decimal()
    }

    /// Returns the value of `tag` as a float.
    ///
    /// # Errors
    /// `MissingRequiredField` if absent, `InvalidFieldValue` if not numeric.
    pub fn get_f64(&self, tag: u32) -> Result<f64, DecodeError> {
        self.require(tag)?.as_f64()
    }

    /// Returns the value of `tag` as a `Y`/`N` boolean.
    ///
    /// # Errors
    /// `MissingRequiredField` if absent, `InvalidFieldValue` otherwise.
    pub fn get_bool(&self, tag: u32) -> Result<bool, DecodeError> {
        self.require(tag)?.as_bool()
    }

    /// Returns the value of `tag` as a UTC timestamp.
    ///
    /// # Errors
    /// `MissingRequiredField` if absent, `InvalidFieldValue` if malformed.
    pub fn get_timestamp(&self, tag: u32) -> Result<Timestamp, DecodeError> {
        self.require(tag)?.as_timestamp()
    }

    /// Decodes a single-character enum field.
    ///
    /// # Errors
    /// `MissingRequiredField` if absent, `InvalidFieldValue` for unknown codes.
    pub fn get_enum<T: FixChar>(&self, tag: u32) -> Result<T, DecodeError> {
        let field = self.require(tag)?;
        match field.value {
            [byte] => T::from_byte(*byte),
            _ => None,
        }
        .ok_or_else(|| DecodeError::InvalidFieldValue {
            tag,
            reason: format!("unknown code '{}'", String::from_utf8_lossy(field.value)),
        })
    }

    /// Returns MsgSeqNum (34).
    ///
    /// # Errors
    /// `MissingRequiredField` if absent, `InvalidFieldValue` if not an integer.
    pub fn msg_seq_num(&self) -> Result<u64, DecodeError> {
        self.get_u64(tags::MSG_SEQ_NUM)
    }

    /// Returns true when PossDupFlag (43) is `Y`. Absence means not a duplicate.
    #[must_use]
    pub fn poss_dup(&self) -> bool {
        self.get_field(tags::POSS_DUP_FLAG)
            .is_some_and(|f| f.value == b"Y")
    }

    /// Iterates the entries of a repeating group.
    ///
    /// Each entry starts at an occurrence of `delimiter` that follows the
    /// `count_tag` field and runs until the next delimiter or the checksum.
    /// Frames without `count_tag` yield no entries.
    pub fn groups(&self, count_tag: u32, delimiter: u32) -> impl Iterator<Item = Group<'_, 'a>> {
        let start = self
            .fields
            .iter()
            .position(|f| f.tag == count_tag)
            .map_or(self.fields.len(), |i| i + 1);
        let scope = &self.fields[start..];
        let end = scope
            .iter()
            .position(|f| f.tag == tags::CHECKSUM)
            .unwrap_or(scope.len());
        let scope = &scope[..end];

        let mut cursor = scope.iter().position(|f| f.tag == delimiter);
        std::iter::from_fn(move || {
            let begin = cursor?;
            let next = scope[begin + 1..]
                .iter()
                .position(|f| f.tag == delimiter)
                .map(|offset| begin + 1 + offset);
            cursor = next;
            Some(Group {
                fields: &scope[begin..next.unwrap_or(scope.len())],
            })
        })
    }

    /// Returns the frame length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if the frame is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// One entry of a repeating group.
#[derive(Debug, Clone, Copy)]
pub struct Group<'m, 'a> {
    fields: &'m [FieldRef<'a>],
}

impl<'a> Group<'_, 'a> {
    /// Returns the first field with `tag` inside this entry.
    #[must_use]
    pub fn get(&self, tag: u32) -> Option<&FieldRef<'a>> {
        self.fields.iter().find(|f| f.tag == tag)
    }

    /// Returns the value of `tag` as a string, if present and valid.
    #[must_use]
    pub fn str(&self, tag: u32) -> Option<&'a str> {
        self.get(tag).and_then(|f| f.as_str().ok())
    }

    /// Returns the value of `tag` as a decimal, if present and numeric.
    #[must_use]
    pub fn decimal(&self, tag: u32) -> Option<Decimal> {
        self.get(tag).and_then(|f| f.as_decimal().ok())
    }

    /// Decodes a single-character enum inside this entry.
    #[must_use]
    pub fn enumeration<T: FixChar>(&self, tag: u32) -> Option<T> {
        match self.get(tag)?.value {
            [byte] => T::from_byte(*byte),
            _ => None,
        }
    }

    /// Returns the fields of this entry in wire order.
    #[must_use]
    pub fn fields(&self) -> &[FieldRef<'a>] {
        self.fields
    }
}
