/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Zero-copy FIX frame decoder.
//!
//! One pass over the frame splits it on SOH and records every field as a slice
//! of the input. The framing tags are checked positionally: BeginString(8),
//! BodyLength(9) and MsgType(35) must lead the frame and Checksum(10) must
//! close it.

use crate::checksum::validate_checksum;
use fixgate_core::error::DecodeError;
use fixgate_core::field::FieldRef;
use fixgate_core::message::{MsgType, RawMessage};
use fixgate_core::tags;
use memchr::memchr;
use smallvec::SmallVec;

/// SOH (Start of Header) delimiter used in FIX messages.
pub const SOH: u8 = 0x01;

/// Equals sign delimiter between tag and value.
pub const EQUALS: u8 = b'=';

/// Zero-copy FIX frame decoder.
#[derive(Debug)]
pub struct Decoder<'a> {
    input: &'a [u8],
    offset: usize,
    validate_checksum: bool,
    validate_body_length: bool,
}

impl<'a> Decoder<'a> {
    /// Creates a decoder that validates both checksum and body length.
    #[inline]
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            offset: 0,
            validate_checksum: true,
            validate_body_length: true,
        }
    }

    /// Sets whether to validate checksums during decoding.
    #[inline]
    #[must_use]
    pub const fn with_checksum_validation(mut self, validate: bool) -> Self {
        self.validate_checksum = validate;
        self
    }

    /// Sets whether to validate the declared BodyLength during decoding.
    #[inline]
    #[must_use]
    pub const fn with_body_length_validation(mut self, validate: bool) -> Self {
        self.validate_body_length = validate;
        self
    }

    /// Decodes the next complete frame from the buffer.
    ///
    /// # Errors
    /// - `Malformed` if a framing tag is missing, out of place, or a field is unparseable
    /// - `BodyLengthMismatch` / `ChecksumMismatch` when validation is enabled
    pub fn decode(&mut self) -> Result<RawMessage<'a>, DecodeError> {
        let start = self.offset;
        let mut fields: SmallVec<[FieldRef<'a>; 32]> = SmallVec::new();
        let mut body_start = None;
        let mut checksum_start = None;

        while self.offset < self.input.len() {
            let field_start = self.offset;
            let field = self.next_field().ok_or_else(|| {
                DecodeError::malformed(format!("unparseable field at byte {field_start}"))
            })?;
            match (fields.len(), field.tag) {
                (0, tags::BEGIN_STRING) | (2, tags::MSG_TYPE) => {}
                (0, _) => return Err(DecodeError::malformed("BeginString(8) must be first")),
                (1, tags::BODY_LENGTH) => body_start = Some(self.offset),
                (1, _) => return Err(DecodeError::malformed("BodyLength(9) must be second")),
                (2, _) => return Err(DecodeError::malformed("MsgType(35) must be third")),
                (_, tags::CHECKSUM) => checksum_start = Some(field_start),
                _ => {}
            }
            fields.push(field);
            if checksum_start.is_some() {
                break;
            }
        }

        if fields.len() < 3 {
            return Err(DecodeError::malformed(
                "frame lacks BeginString(8), BodyLength(9) and MsgType(35)",
            ));
        }
        let (Some(body_start), Some(checksum_start)) = (body_start, checksum_start) else {
            return Err(DecodeError::malformed("missing Checksum(10)"));
        };

        let frame = &self.input[start..self.offset];
        let begin_string = offset_in(frame, fields[0].value);
        let msg_type: MsgType = fields[2]
            .as_str()?
            .parse()
            .unwrap_or_else(|never: std::convert::Infallible| match never {});
        let body = (body_start - start)..(checksum_start - start);
        let msg = RawMessage::new(frame, begin_string, body, msg_type, fields);

        if self.validate_body_length {
            validate_body_length(&msg)?;
        }
        if self.validate_checksum {
            validate_checksum(&msg)?;
        }
        Ok(msg)
    }

    /// Parses the next field from the buffer.
    ///
    /// Returns `None` if the buffer is exhausted or the next field is not
    /// `<digits>=<value>SOH`.
    #[inline]
    pub fn next_field(&mut self) -> Option<FieldRef<'a>> {
        let remaining = self.input.get(self.offset..)?;
        let eq_pos = memchr(EQUALS, remaining)?;
        let tag = parse_tag(&remaining[..eq_pos])?;

        let value_start = eq_pos + 1;
        let soh_pos = memchr(SOH, &remaining[value_start..])?;
        let value = &remaining[value_start..value_start + soh_pos];

        self.offset += value_start + soh_pos + 1;
        Some(FieldRef::new(tag, value))
    }
}

/// Decodes a single frame with full validation.
///
/// # Errors
/// See [`Decoder::decode`].
pub fn decode(frame: &[u8]) -> Result<RawMessage<'_>, DecodeError> {
    Decoder::new(frame).decode()
}

/// Compares BodyLength(9) with the bytes between its delimiter and `10=`.
///
/// # Errors
/// `BodyLengthMismatch` if they differ, `InvalidFieldValue` if tag 9 is not a number.
pub fn validate_body_length(msg: &RawMessage<'_>) -> Result<(), DecodeError> {
    let declared = msg.get_u64(tags::BODY_LENGTH)? as usize;
    let actual = msg.body_range().len();
    if declared == actual {
        Ok(())
    } else {
        Err(DecodeError::BodyLengthMismatch { declared, actual })
    }
}

fn offset_in(frame: &[u8], value: &[u8]) -> std::ops::Range<usize> {
    let start = value.as_ptr() as usize - frame.as_ptr() as usize;
    start..start + value.len()
}

/// Parses a tag number from ASCII digits.
#[inline]
fn parse_tag(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() || bytes.len() > 10 {
        return None;
    }
    bytes.iter().try_fold(0u32, |acc, &b| {
        if b.is_ascii_digit() {
            acc.checked_mul(10)?.checked_add(u32::from(b - b'0'))
        } else {
            None
        }
    })
}
