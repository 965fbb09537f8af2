/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FIX frame builder.
//!
//! Fields are appended to a body buffer in caller order; [`Encoder::finish`]
//! prefixes BeginString and the exact BodyLength and appends the checksum.

use crate::checksum::{calculate_checksum, format_checksum};
use bytes::{BufMut, BytesMut};
use fixgate_core::error::EncodeError;
use fixgate_core::message::MsgType;
use fixgate_core::tags;
use fixgate_core::types::{FixChar, Timestamp};
use rust_decimal::Decimal;

/// SOH (Start of Header) delimiter used in FIX messages.
pub const SOH: u8 = 0x01;

/// Standard header values written right after MsgType.
#[derive(Debug, Clone, Copy)]
pub struct Header<'h> {
    /// SenderCompID (49).
    pub sender_comp_id: &'h str,
    /// TargetCompID (56).
    pub target_comp_id: &'h str,
    /// MsgSeqNum (34).
    pub msg_seq_num: u64,
    /// SendingTime (52).
    pub sending_time: Timestamp,
}

/// FIX frame builder.
#[derive(Debug)]
pub struct Encoder<'b> {
    body: BytesMut,
    begin_string: &'b str,
    embedded_soh: Option<u32>,
}

impl<'b> Encoder<'b> {
    /// Creates an empty encoder for the given BeginString.
    #[must_use]
    pub fn new(begin_string: &'b str) -> Self {
        Self {
            body: BytesMut::with_capacity(256),
            begin_string,
            embedded_soh: None,
        }
    }

    /// Starts a frame with MsgType followed by the standard header fields.
    #[must_use]
    pub fn with_header(begin_string: &'b str, msg_type: &MsgType, header: &Header<'_>) -> Self {
        let mut encoder = Self::new(begin_string);
        encoder.put_str(tags::MSG_TYPE, msg_type.as_str());
        encoder.put_str(tags::SENDER_COMP_ID, header.sender_comp_id);
        encoder.put_str(tags::TARGET_COMP_ID, header.target_comp_id);
        encoder.put_uint(tags::MSG_SEQ_NUM, header.msg_seq_num);
        encoder.put_timestamp(tags::SENDING_TIME, header.sending_time);
        encoder
    }

    /// Appends a string field.
    #[inline]
    pub fn put_str(&mut self, tag: u32, value: &str) {
        self.put_raw(tag, value.as_bytes());
    }

    /// Appends a signed integer field.
    #[inline]
    pub fn put_int(&mut self, tag: u32, value: i64) {
        let mut buf = itoa::Buffer::new();
        self.put_raw(tag, buf.format(value).as_bytes());
    }

    /// Appends an unsigned integer field.
    #[inline]
    pub fn put_uint(&mut self, tag: u32, value: u64) {
        let mut buf = itoa::Buffer::new();
        self.put_raw(tag, buf.format(value).as_bytes());
    }

    /// Appends a `Y`/`N` field.
    #[inline]
    pub fn put_bool(&mut self, tag: u32, value: bool) {
        self.put_raw(tag, if value { b"Y" } else { b"N" });
    }

    /// Appends a decimal field in its plain (non-scientific) form.
    #[inline]
    pub fn put_decimal(&mut self, tag: u32, value: Decimal) {
        self.put_str(tag, &value.normalize().to_string());
    }

    /// Appends a UTCTimestamp field with millisecond precision.
    #[inline]
    pub fn put_timestamp(&mut self, tag: u32, value: Timestamp) {
        self.put_str(tag, value.format_millis().as_str());
    }

    /// Appends a single-character code field.
    #[inline]
    pub fn put_enum<T: FixChar>(&mut self, tag: u32, value: T) {
        self.put_raw(tag, &[value.as_byte()]);
    }

    /// Appends a field with raw bytes.
    ///
    /// A value containing SOH is recorded and reported by [`Encoder::finish`].
    #[inline]
    pub fn put_raw(&mut self, tag: u32, value: &[u8]) {
        if self.embedded_soh.is_none() && value.contains(&SOH) {
            self.embedded_soh = Some(tag);
        }
        let mut tag_buf = itoa::Buffer::new();
        self.body.put_slice(tag_buf.format(tag).as_bytes());
        self.body.put_u8(b'=');
        self.body.put_slice(value);
        self.body.put_u8(SOH);
    }

    /// Returns the current body length.
    #[inline]
    #[must_use]
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Completes the frame: `8=..|9=<body len>|<body>10=NNN|`.
    ///
    /// # Errors
    /// `EmbeddedDelimiter` if any appended value contained SOH.
    pub fn finish(self) -> Result<BytesMut, EncodeError> {
        if let Some(tag) = self.embedded_soh {
            return Err(EncodeError::EmbeddedDelimiter { tag });
        }
        let mut len_buf = itoa::Buffer::new();
        let body_len = len_buf.format(self.body.len());

        let mut frame =
            BytesMut::with_capacity(self.begin_string.len() + body_len.len() + self.body.len() + 14);
        frame.put_slice(b"8=");
        frame.put_slice(self.begin_string.as_bytes());
        frame.put_u8(SOH);
        frame.put_slice(b"9=");
        frame.put_slice(body_len.as_bytes());
        frame.put_u8(SOH);
        frame.put_slice(&self.body);

        let checksum = format_checksum(calculate_checksum(&frame));
        frame.put_slice(b"10=");
        frame.put_slice(&checksum);
        frame.put_u8(SOH);
        Ok(frame)
    }
}
