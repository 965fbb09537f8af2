/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Body writers for session-level messages.
//!
//! Each function appends the body fields of one admin message to an
//! [`Encoder`] that already carries the standard header.

use crate::config::SessionConfig;
use fixgate_core::tags;
use fixgate_tagvalue::Encoder;

/// Logon (A): EncryptMethod=0, HeartBtInt, optional reset flag and credentials.
pub fn logon(enc: &mut Encoder<'_>, config: &SessionConfig) {
    enc.put_uint(tags::ENCRYPT_METHOD, 0);
    enc.put_uint(tags::HEART_BT_INT, config.heartbeat_interval_secs());
    if config.reset_seq_num_on_logon {
        enc.put_bool(tags::RESET_SEQ_NUM_FLAG, true);
    }
    if let Some(username) = &config.username {
        enc.put_str(tags::USERNAME, username);
    }
    if let Some(password) = &config.password {
        enc.put_str(tags::PASSWORD, password);
    }
}

/// Heartbeat (0), echoing a TestReqID when answering a TestRequest.
pub fn heartbeat(enc: &mut Encoder<'_>, test_req_id: Option<&str>) {
    if let Some(id) = test_req_id {
        enc.put_str(tags::TEST_REQ_ID, id);
    }
}

/// TestRequest (1).
pub fn test_request(enc: &mut Encoder<'_>, test_req_id: &str) {
    enc.put_str(tags::TEST_REQ_ID, test_req_id);
}

/// ResendRequest (2); `end == 0` asks for everything from `begin` on.
pub fn resend_request(enc: &mut Encoder<'_>, begin: u64, end: u64) {
    enc.put_uint(tags::BEGIN_SEQ_NO, begin);
    enc.put_uint(tags::END_SEQ_NO, end);
}

/// Logout (5) with optional text.
pub fn logout(enc: &mut Encoder<'_>, text: Option<&str>) {
    if let Some(text) = text {
        enc.put_str(tags::TEXT, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixgate_core::message::MsgType;
    use fixgate_core::types::{CompId, Timestamp};
    use fixgate_tagvalue::{Header, decode};

    fn header(seq: u64) -> Header<'static> {
        Header {
            sender_comp_id: "GW",
            target_comp_id: "LP",
            msg_seq_num: seq,
            sending_time: Timestamp::now(),
        }
    }

    #[test]
    fn test_logon_body() {
        let config = SessionConfig::new(
            "lp1",
            "h",
            1,
            CompId::new("GW").unwrap(),
            CompId::new("LP").unwrap(),
        )
        .with_credentials("user", "pass")
        .with_reset_on_logon(true);

        let mut enc = Encoder::with_header("FIX.4.4", &MsgType::Logon, &header(1));
        logon(&mut enc, &config);
        let frame = enc.finish().unwrap();
        let msg = decode(&frame).unwrap();

        assert_eq!(msg.get_u64(tags::ENCRYPT_METHOD).unwrap(), 0);
        assert_eq!(msg.get_u64(tags::HEART_BT_INT).unwrap(), 30);
        assert!(msg.get_bool(tags::RESET_SEQ_NUM_FLAG).unwrap());
        assert_eq!(msg.get_str(tags::USERNAME).unwrap(), "user");
        assert_eq!(msg.get_str(tags::PASSWORD).unwrap(), "pass");
    }

    #[test]
    fn test_logon_without_optional_fields() {
        let config = SessionConfig::new(
            "lp1",
            "h",
            1,
            CompId::new("GW").unwrap(),
            CompId::new("LP").unwrap(),
        );
        let mut enc = Encoder::with_header("FIX.4.4", &MsgType::Logon, &header(1));
        logon(&mut enc, &config);
        let frame = enc.finish().unwrap();
        let msg = decode(&frame).unwrap();
        assert!(!msg.has_field(tags::RESET_SEQ_NUM_FLAG));
        assert!(!msg.has_field(tags::USERNAME));
    }

    #[test]
    fn test_resend_request_body() {
        let mut enc = Encoder::with_header("FIX.4.4", &MsgType::ResendRequest, &header(9));
        resend_request(&mut enc, 6, 7);
        let frame = enc.finish().unwrap();
        let msg = decode(&frame).unwrap();
        assert_eq!(msg.get_u64(tags::BEGIN_SEQ_NO).unwrap(), 6);
        assert_eq!(msg.get_u64(tags::END_SEQ_NO).unwrap(), 7);
    }
}
