/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Answering inbound ResendRequests.
//!
//! [`plan_resend`] walks the requested range against what the message store
//! still holds. Retained frames are replayed through [`rewrite_for_resend`];
//! every run of missing numbers becomes one gap-fill built by [`gap_fill`].

use bytes::BytesMut;
use fixgate_core::error::FixError;
use fixgate_core::message::MsgType;
use fixgate_core::tags;
use fixgate_core::types::Timestamp;
use fixgate_store::StoredMessage;
use fixgate_tagvalue::{Encoder, Header, decode};

/// One step of a resend answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResendStep {
    /// Retransmit a retained frame.
    Replay(StoredMessage),
    /// Skip `begin..new_seq_no` with a SequenceReset in gap-fill mode.
    GapFill {
        /// MsgSeqNum of the gap-fill (first missing number).
        begin: u64,
        /// NewSeqNo: first number after the hole.
        new_seq_no: u64,
    },
}

/// Plans the answer to `ResendRequest(begin, end)`.
///
/// `end == 0` or `end > out_seq` is read as "through `out_seq`". `stored`
/// must be ascending, as returned by `MessageStore::get_range`.
#[must_use]
pub fn plan_resend(begin: u64, end: u64, out_seq: u64, stored: Vec<StoredMessage>) -> Vec<ResendStep> {
    let end = if end == 0 || end > out_seq { out_seq } else { end };
    let begin = begin.max(1);
    if begin > end {
        return Vec::new();
    }

    let mut steps = Vec::new();
    let mut next = begin;
    for message in stored {
        if message.seq_num < next || message.seq_num > end {
            continue;
        }
        if message.seq_num > next {
            steps.push(ResendStep::GapFill {
                begin: next,
                new_seq_no: message.seq_num,
            });
        }
        next = message.seq_num + 1;
        steps.push(ResendStep::Replay(message));
    }
    if next <= end {
        steps.push(ResendStep::GapFill {
            begin: next,
            new_seq_no: end + 1,
        });
    }
    steps
}

/// Rebuilds a retained frame for retransmission.
///
/// The original MsgSeqNum is kept; SendingTime is replaced with
/// `sending_time`, followed by PossDupFlag=Y and OrigSendingTime carrying the
/// original SendingTime. BodyLength and Checksum are recomputed.
///
/// # Errors
/// `FixError::Decode` if the stored frame no longer parses, `FixError::Encode`
/// if it cannot be re-framed.
pub fn rewrite_for_resend(frame: &[u8], sending_time: Timestamp) -> Result<BytesMut, FixError> {
    let msg = decode(frame)?;
    let original_sending_time = msg.field_str(tags::SENDING_TIME);

    let mut enc = Encoder::new(msg.begin_string());
    for field in msg.fields() {
        match field.tag {
            tags::BEGIN_STRING
            | tags::BODY_LENGTH
            | tags::CHECKSUM
            | tags::POSS_DUP_FLAG
            | tags::ORIG_SENDING_TIME => {}
            tags::SENDING_TIME => {
                enc.put_timestamp(tags::SENDING_TIME, sending_time);
                enc.put_bool(tags::POSS_DUP_FLAG, true);
                if let Some(original) = original_sending_time {
                    enc.put_str(tags::ORIG_SENDING_TIME, original);
                }
            }
            tag => enc.put_raw(tag, field.value),
        }
    }
    Ok(enc.finish()?)
}

/// Builds a SequenceReset-GapFill frame.
///
/// `header.msg_seq_num` must be the first missing number; the counterparty
/// moves its expectation to `new_seq_no`.
///
/// # Errors
/// `FixError::Encode` if a header value cannot be framed.
pub fn gap_fill(begin_string: &str, header: &Header<'_>, new_seq_no: u64) -> Result<BytesMut, FixError> {
    let mut enc = Encoder::new(begin_string);
    enc.put_str(tags::MSG_TYPE, MsgType::SequenceReset.as_str());
    enc.put_str(tags::SENDER_COMP_ID, header.sender_comp_id);
    enc.put_str(tags::TARGET_COMP_ID, header.target_comp_id);
    enc.put_uint(tags::MSG_SEQ_NUM, header.msg_seq_num);
    enc.put_bool(tags::POSS_DUP_FLAG, true);
    enc.put_timestamp(tags::SENDING_TIME, header.sending_time);
    enc.put_timestamp(tags::ORIG_SENDING_TIME, header.sending_time);
    enc.put_bool(tags::GAP_FILL_FLAG, true);
    enc.put_uint(tags::NEW_SEQ_NO, new_seq_no);
    Ok(enc.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use fixgate_tagvalue::{validate_body_length, validate_checksum};

    fn stored(seq: u64) -> StoredMessage {
        StoredMessage {
            seq_num: seq,
            frame: Bytes::from(format!("frame{seq}")),
        }
    }

    fn header(seq: u64) -> Header<'static> {
        Header {
            sender_comp_id: "GW",
            target_comp_id: "LP",
            msg_seq_num: seq,
            sending_time: Timestamp::from_millis(1_700_000_000_000),
        }
    }

    #[test]
    fn test_plan_all_present() {
        let steps = plan_resend(2, 3, 5, vec![stored(2), stored(3)]);
        assert_eq!(
            steps,
            vec![ResendStep::Replay(stored(2)), ResendStep::Replay(stored(3))]
        );
    }

    #[test]
    fn test_plan_coalesces_holes() {
        let steps = plan_resend(1, 0, 8, vec![stored(3), stored(4), stored(7)]);
        assert_eq!(
            steps,
            vec![
                ResendStep::GapFill {
                    begin: 1,
                    new_seq_no: 3
                },
                ResendStep::Replay(stored(3)),
                ResendStep::Replay(stored(4)),
                ResendStep::GapFill {
                    begin: 5,
                    new_seq_no: 7
                },
                ResendStep::Replay(stored(7)),
                ResendStep::GapFill {
                    begin: 8,
                    new_seq_no: 9
                },
            ]
        );
    }

    #[test]
    fn test_plan_empty_store_and_bad_range() {
        assert_eq!(
            plan_resend(4, 6, 10, Vec::new()),
            vec![ResendStep::GapFill {
                begin: 4,
                new_seq_no: 7
            }]
        );
        assert!(plan_resend(9, 5, 10, Vec::new()).is_empty());
        assert!(plan_resend(11, 0, 10, Vec::new()).is_empty());
    }

    #[test]
    fn test_rewrite_for_resend() {
        let mut enc = Encoder::with_header("FIX.4.4", &MsgType::NewOrderSingle, &header(12));
        enc.put_str(tags::CL_ORD_ID, "ORD-1");
        let original = enc.finish().unwrap();

        let later = Timestamp::from_millis(1_700_000_060_000);
        let resent = rewrite_for_resend(&original, later).unwrap();
        let msg = decode(&resent).unwrap();

        assert!(validate_checksum(&msg).is_ok());
        assert!(validate_body_length(&msg).is_ok());
        assert_eq!(msg.msg_seq_num().unwrap(), 12);
        assert!(msg.poss_dup());
        assert_eq!(
            msg.get_str(tags::SENDING_TIME).unwrap(),
            "20231114-22:14:20.000"
        );
        assert_eq!(
            msg.get_str(tags::ORIG_SENDING_TIME).unwrap(),
            "20231114-22:13:20.000"
        );
        assert_eq!(msg.get_str(tags::CL_ORD_ID).unwrap(), "ORD-1");
        assert_eq!(msg.msg_type(), &MsgType::NewOrderSingle);
    }

    #[test]
    fn test_gap_fill_frame() {
        let frame = gap_fill("FIX.4.4", &header(5), 7).unwrap();
        let msg = decode(&frame).unwrap();
        assert_eq!(msg.msg_type(), &MsgType::SequenceReset);
        assert_eq!(msg.msg_seq_num().unwrap(), 5);
        assert!(msg.get_bool(tags::GAP_FILL_FLAG).unwrap());
        assert!(msg.poss_dup());
        assert_eq!(msg.get_u64(tags::NEW_SEQ_NO).unwrap(), 7);
    }
}
