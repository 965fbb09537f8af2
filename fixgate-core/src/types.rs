/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Core types for FIX protocol operations.
//!
//! - [`Timestamp`]: UTC timestamp rendered in FIX `SendingTime` layout
//! - [`CompId`]: Component identifier (SenderCompID, TargetCompID)
//! - Single-character code enums ([`Side`], [`OrdType`], [`TimeInForce`],
//!   [`ExecType`], [`OrdStatus`], [`MdEntryType`], [`MdUpdateAction`],
//!   [`SubscriptionRequestType`]) sharing the [`FixChar`] conversions.

use arrayvec::ArrayString;
use chrono::{DateTime, Utc};
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length for CompID strings in bytes.
pub const COMP_ID_MAX_LEN: usize = 32;

/// FIX protocol timestamp with nanosecond precision.
///
/// Rendered on the wire as `YYYYMMDD-HH:MM:SS.sss`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// Nanoseconds since Unix epoch (1970-01-01 00:00:00 UTC).
    nanos_since_epoch: u64,
}

impl Timestamp {
    /// Creates a timestamp from milliseconds since Unix epoch.
    #[inline]
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self {
            nanos_since_epoch: millis * 1_000_000,
        }
    }

    /// Returns the current UTC timestamp.
    #[inline]
    #[must_use]
    pub fn now() -> Self {
        Self::from(Utc::now())
    }

    /// Returns milliseconds since Unix epoch.
    #[inline]
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.nanos_since_epoch / 1_000_000
    }

    /// Converts to a chrono `DateTime<Utc>`.
    #[must_use]
    pub fn to_datetime(self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.nanos_since_epoch as i64)
    }

    /// Formats the timestamp in FIX format with millisecond precision.
    ///
    /// Format: `YYYYMMDD-HH:MM:SS.sss`
    #[must_use]
    pub fn format_millis(self) -> ArrayString<21> {
        let dt = self.to_datetime();
        let mut buf = ArrayString::new();
        let _ = std::fmt::write(
            &mut buf,
            format_args!("{}", dt.format("%Y%m%d-%H:%M:%S%.3f")),
        );
        buf
    }

    /// Formats the date part only (`YYYYMMDD`), as used by business-date fields.
    #[must_use]
    pub fn format_date(self) -> ArrayString<8> {
        let dt = self.to_datetime();
        let mut buf = ArrayString::new();
        let _ = std::fmt::write(&mut buf, format_args!("{}", dt.format("%Y%m%d")));
        buf
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self {
            nanos_since_epoch: dt.timestamp_nanos_opt().unwrap_or(0) as u64,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_millis())
    }
}

/// Component identifier for FIX sessions.
///
/// Used for SenderCompID (tag 49) and TargetCompID (tag 56).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct CompId(ArrayString<COMP_ID_MAX_LEN>);

impl CompId {
    /// Creates a new CompId, or `None` if the string exceeds [`COMP_ID_MAX_LEN`].
    #[must_use]
    pub fn new(s: &str) -> Option<Self> {
        ArrayString::from(s).ok().map(Self)
    }

    /// Returns the CompId as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for CompId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for CompId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CompId {
    type Err = arrayvec::CapacityError<()>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArrayString::try_from(s)
            .map(Self)
            .map_err(|_| arrayvec::CapacityError::new(()))
    }
}

/// Conversions shared by enums whose wire form is a single ASCII character.
///
/// Each implementor is `#[repr(u8)]` with the character as discriminant, so the
/// `num-derive` primitive conversions double as the wire mapping.
pub trait FixChar: Sized + Copy + FromPrimitive + ToPrimitive {
    /// Decodes the wire byte.
    #[inline]
    fn from_byte(byte: u8) -> Option<Self> {
        Self::from_u8(byte)
    }

    /// Returns the wire character.
    #[inline]
    fn as_char(self) -> char {
        self.to_u8().map_or('?', char::from)
    }

    /// Returns the wire byte.
    #[inline]
    fn as_byte(self) -> u8 {
        self.to_u8().unwrap_or(b'?')
    }
}

/// Order side (tag 54).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromPrimitive, ToPrimitive,
)]
#[repr(u8)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy.
    Buy = b'1',
    /// Sell.
    Sell = b'2',
}

impl FixChar for Side {}

/// Order type (tag 40).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromPrimitive, ToPrimitive,
)]
#[repr(u8)]
pub enum OrdType {
    /// Market.
    Market = b'1',
    /// Limit.
    Limit = b'2',
    /// Stop.
    Stop = b'3',
    /// Stop limit.
    StopLimit = b'4',
}

impl FixChar for OrdType {}

/// Time in force (tag 59).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromPrimitive, ToPrimitive,
)]
#[repr(u8)]
pub enum TimeInForce {
    /// Day.
    Day = b'0',
    /// Good till cancel.
    GoodTillCancel = b'1',
    /// Immediate or cancel.
    ImmediateOrCancel = b'3',
    /// Fill or kill.
    FillOrKill = b'4',
    /// Good till date.
    GoodTillDate = b'6',
}

impl FixChar for TimeInForce {}

/// Execution type (tag 150).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromPrimitive, ToPrimitive,
)]
#[repr(u8)]
pub enum ExecType {
    New = b'0',
    DoneForDay = b'3',
    Canceled = b'4',
    Replaced = b'5',
    PendingCancel = b'6',
    Stopped = b'7',
    Rejected = b'8',
    Suspended = b'9',
    PendingNew = b'A',
    Calculated = b'B',
    Expired = b'C',
    Restated = b'D',
    PendingReplace = b'E',
    Trade = b'F',
    TradeCorrect = b'G',
    TradeCancel = b'H',
    /// Response to an OrderStatusRequest or OrderMassStatusRequest.
    OrderStatus = b'I',
}

impl FixChar for ExecType {}

/// Order status (tag 39).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromPrimitive, ToPrimitive,
)]
#[repr(u8)]
pub enum OrdStatus {
    New = b'0',
    PartiallyFilled = b'1',
    Filled = b'2',
    DoneForDay = b'3',
    Canceled = b'4',
    PendingCancel = b'6',
    Stopped = b'7',
    Rejected = b'8',
    Suspended = b'9',
    PendingNew = b'A',
    Calculated = b'B',
    Expired = b'C',
    AcceptedForBidding = b'D',
    PendingReplace = b'E',
}

impl FixChar for OrdStatus {}

/// Market data entry type (tag 269).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromPrimitive, ToPrimitive,
)]
#[repr(u8)]
pub enum MdEntryType {
    /// Bid side.
    Bid = b'0',
    /// Offer (ask) side.
    Offer = b'1',
    /// Last trade.
    Trade = b'2',
}

impl FixChar for MdEntryType {}

/// Market data update action (tag 279).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromPrimitive, ToPrimitive,
)]
#[repr(u8)]
pub enum MdUpdateAction {
    New = b'0',
    Change = b'1',
    Delete = b'2',
}

impl FixChar for MdUpdateAction {}

/// Subscription request type (tag 263).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromPrimitive, ToPrimitive,
)]
#[repr(u8)]
pub enum SubscriptionRequestType {
    /// One-off snapshot.
    Snapshot = b'0',
    /// Snapshot followed by streaming updates.
    SnapshotAndUpdates = b'1',
    /// Cancel a previous snapshot+updates request.
    Unsubscribe = b'2',
}

impl FixChar for SubscriptionRequestType {}
