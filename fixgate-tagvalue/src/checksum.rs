/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FIX checksum calculation and validation.
//!
//! The checksum is the byte sum, modulo 256, of everything up to and including
//! the delimiter that precedes the `10=` tag, rendered as three zero-padded digits.

use fixgate_core::error::DecodeError;
use fixgate_core::message::RawMessage;
use fixgate_core::tags;

/// Calculates the FIX checksum for the given data.
///
/// # Example
/// ```
/// use fixgate_tagvalue::calculate_checksum;
///
/// assert_eq!(calculate_checksum(b"ABC"), 198);
/// ```
#[inline]
#[must_use]
pub fn calculate_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Formats a checksum value as a 3-digit zero-padded string.
#[inline]
#[must_use]
pub fn format_checksum(checksum: u8) -> [u8; 3] {
    [
        b'0' + checksum / 100,
        b'0' + (checksum / 10) % 10,
        b'0' + checksum % 10,
    ]
}

/// Parses a 3-digit checksum value.
///
/// Returns `None` unless `bytes` is exactly three ASCII digits no greater than 255.
#[inline]
#[must_use]
pub fn parse_checksum(bytes: &[u8]) -> Option<u8> {
    let [d0, d1, d2] = bytes else {
        return None;
    };
    if !(d0.is_ascii_digit() && d1.is_ascii_digit() && d2.is_ascii_digit()) {
        return None;
    }
    let value = u16::from(d0 - b'0') * 100 + u16::from(d1 - b'0') * 10 + u16::from(d2 - b'0');
    u8::try_from(value).ok()
}

/// Recomputes the checksum of a decoded frame and compares it to tag 10.
///
/// # Errors
/// `MissingRequiredField` if the frame has no checksum, `InvalidFieldValue` if
/// it is not three digits, `ChecksumMismatch` if the sums disagree.
pub fn validate_checksum(msg: &RawMessage<'_>) -> Result<(), DecodeError> {
    let field = msg
        .get_field(tags::CHECKSUM)
        .ok_or(DecodeError::MissingRequiredField {
            tag: tags::CHECKSUM,
        })?;
    let declared = parse_checksum(field.value).ok_or_else(|| DecodeError::InvalidFieldValue {
        tag: tags::CHECKSUM,
        reason: "checksum must be three digits".to_string(),
    })?;
    let calculated = calculate_checksum(&msg.buffer()[..msg.body_range().end]);
    if calculated == declared {
        Ok(())
    } else {
        Err(DecodeError::ChecksumMismatch {
            calculated,
            declared,
        })
    }
}
