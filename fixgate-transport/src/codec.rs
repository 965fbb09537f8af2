/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Tokio codec for FIX message framing.
//!
//! The codec only cuts the byte stream into frames; checksum and BodyLength
//! validation happen per frame in the session so a bad frame can be logged
//! and skipped without tearing the stream down. Frames are located with the
//! declared BodyLength; when that does not land on a `10=NNN` trailer the
//! codec scans for the trailer instead. Bytes before a `8=` are discarded.

use bytes::BytesMut;
use memchr::memmem;
use thiserror::Error;
use tokio_util::codec::Decoder;
use tracing::warn;

/// Errors that can occur during codec operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Message exceeds maximum size.
    #[error("message too large: {size} bytes exceeds maximum {max_size}")]
    MessageTooLarge {
        /// Bytes buffered for the frame so far.
        size: usize,
        /// Maximum allowed size.
        max_size: usize,
    },

    /// I/O error.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

const SOH: u8 = 0x01;
const BEGIN: &[u8] = b"8=";
/// `SOH 10=NNN SOH`
const TRAILER_LEN: usize = 8;

/// Tokio codec for FIX message framing.
#[derive(Debug, Clone)]
pub struct FixCodec {
    max_message_size: usize,
}

impl FixCodec {
    /// Creates a codec with a 1 MiB frame limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_message_size: 1024 * 1024,
        }
    }

    /// Sets the maximum frame size.
    #[must_use]
    pub const fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }
}

impl Default for FixCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns true if `bytes` starts with `SOH 10=DDD SOH`.
fn is_trailer(bytes: &[u8]) -> bool {
    matches!(
        bytes,
        [SOH, b'1', b'0', b'=', d0, d1, d2, SOH, ..]
            if d0.is_ascii_digit() && d1.is_ascii_digit() && d2.is_ascii_digit()
    )
}

/// Finds the end of the first frame in `src` (which starts with `8=`).
///
/// `Ok(None)` means more bytes are needed.
fn frame_end(src: &[u8]) -> Option<usize> {
    let first_soh = memchr::memchr(SOH, src)?;
    let length_field = &src[first_soh + 1..];
    if length_field.len() >= 2 && &length_field[..2] == b"9=" {
        let length_soh = first_soh + 1 + memchr::memchr(SOH, length_field)?;
        let declared = std::str::from_utf8(&src[first_soh + 3..length_soh])
            .ok()
            .and_then(|s| s.parse::<usize>().ok());
        if let Some(body_length) = declared {
            // trailer begins on the SOH that ends the last body field
            let trailer = length_soh + body_length;
            if src.len() < trailer + TRAILER_LEN {
                // not enough data yet, unless a trailer already shows up earlier
                return scan_trailer(src, first_soh);
            }
            if is_trailer(&src[trailer..]) {
                return Some(trailer + TRAILER_LEN);
            }
        }
    }
    scan_trailer(src, first_soh)
}

fn scan_trailer(src: &[u8], from: usize) -> Option<usize> {
    let finder = memmem::Finder::new(b"\x0110=");
    let mut offset = from;
    while let Some(pos) = finder.find(&src[offset..]) {
        let at = offset + pos;
        if src.len() < at + TRAILER_LEN {
            return None;
        }
        if is_trailer(&src[at..]) {
            return Some(at + TRAILER_LEN);
        }
        offset = at + 1;
    }
    None
}

impl Decoder for FixCodec {
    type Item = BytesMut;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match memmem::find(src, BEGIN) {
            Some(0) => {}
            Some(junk) => {
                warn!(bytes = junk, "discarding bytes before BeginString");
                let _ = src.split_to(junk);
            }
            None => {
                // keep a trailing '8' that may start the next frame
                let keep = usize::from(src.last() == Some(&b'8'));
                let discard = src.len() - keep;
                if discard > 0 {
                    warn!(bytes = discard, "discarding bytes without BeginString");
                    let _ = src.split_to(discard);
                }
                return Ok(None);
            }
        }

        match frame_end(src) {
            Some(end) => Ok(Some(src.split_to(end))),
            None if src.len() > self.max_message_size => Err(CodecError::MessageTooLarge {
                size: src.len(),
                max_size: self.max_message_size,
            }),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_fix_message(body: &str) -> Vec<u8> {
        let header = format!("8=FIX.4.4\x019={}\x01", body.len());
        let without_checksum = format!("{header}{body}");
        let checksum = without_checksum
            .bytes()
            .fold(0u8, |acc, b| acc.wrapping_add(b));
        format!("{without_checksum}10={checksum:03}\x01").into_bytes()
    }

    #[test]
    fn test_codec_decode_complete_message() {
        let mut codec = FixCodec::new();
        let msg = make_fix_message("35=0\x0134=1\x01");
        let mut buf = BytesMut::from(&msg[..]);

        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame[..], &msg[..]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_codec_decode_incomplete() {
        let mut codec = FixCodec::new();
        let msg = make_fix_message("35=0\x01");
        let mut buf = BytesMut::from(&msg[..msg.len() - 5]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_codec_two_frames_back_to_back() {
        let mut codec = FixCodec::new();
        let first = make_fix_message("35=0\x0134=1\x01");
        let second = make_fix_message("35=1\x0134=2\x01112=X\x01");
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&first);
        buf.extend_from_slice(&second);

        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], &first[..]);
        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], &second[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_codec_wrong_body_length_still_frames() {
        let mut codec = FixCodec::new();
        let mut buf = BytesMut::from(&b"8=FIX.4.4\x019=3\x0135=0\x0134=1\x0110=000\x01"[..]);
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert!(frame.ends_with(b"10=000\x01"));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_codec_skips_leading_garbage() {
        let mut codec = FixCodec::new();
        let msg = make_fix_message("35=0\x01");
        let mut buf = BytesMut::from(&b"xx\x01"[..]);
        buf.extend_from_slice(&msg);
        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], &msg[..]);
    }

    #[test]
    fn test_codec_rejects_oversized() {
        let mut codec = FixCodec::new().with_max_message_size(32);
        let mut buf = BytesMut::from(&b"8=FIX.4.4\x019=999\x0135=0\x0158="[..]);
        buf.extend_from_slice(&[b'a'; 64]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::MessageTooLarge { .. })
        ));
    }
}
