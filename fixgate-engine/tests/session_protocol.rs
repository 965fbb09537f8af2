/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Session behaviour against a scripted counterparty.

mod common;

use common::{
    Counterparty, WAIT, next_event, printable, session_config, start, start_with_capacity,
    temp_store_dir, wait_until,
};
use fixgate_core::error::{FixError, SessionError};
use fixgate_core::message::MsgType;
use fixgate_core::tags;
use fixgate_core::types::{ExecType, Side};
use fixgate_engine::{Gateway, GatewayBuilder, NewOrder, OrderStatusSource};
use fixgate_session::{SessionConfig, SessionStatus, TooLowPolicy};
use fixgate_store::SequenceNumbers;
use fixgate_tagvalue::decode;
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::timeout;

async fn in_memory(config: SessionConfig) -> Gateway {
    GatewayBuilder::new()
        .add_session(config)
        .with_in_memory_sequences(true)
        .build()
        .await
        .unwrap()
}

async fn logged_in(gateway: &Gateway) -> Counterparty {
    let (mut lp, _task) = start(gateway, "lp1");
    lp.accept_logon().await;
    wait_until(|| {
        let status = gateway.session_status("lp1").unwrap();
        status.status == SessionStatus::LoggedIn && status.in_seq == 1
    })
    .await;
    lp
}

fn persisted(dir: &Path, session_id: &str) -> SequenceNumbers {
    let raw = std::fs::read(dir.join(format!("{session_id}.seqnums"))).unwrap();
    serde_json::from_slice(&raw).unwrap()
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[tokio::test]
async fn test_logon_handshake() {
    let gateway = in_memory(session_config("lp1")).await;
    let (mut lp, _task) = start(&gateway, "lp1");

    let frame = lp.accept_logon().await;
    let logon = decode(&frame).unwrap();
    assert_eq!(logon.msg_seq_num().unwrap(), 1);
    assert_eq!(logon.get_str(tags::ENCRYPT_METHOD).unwrap(), "0");
    assert_eq!(logon.get_str(tags::HEART_BT_INT).unwrap(), "30");
    assert_eq!(logon.get_str(tags::USERNAME).unwrap(), "user");
    assert_eq!(logon.get_str(tags::PASSWORD).unwrap(), "secret");
    assert!(!logon.has_field(tags::RESET_SEQ_NUM_FLAG));

    wait_until(|| gateway.session_status("lp1").unwrap().in_seq == 1).await;
    let status = gateway.session_status("lp1").unwrap();
    assert_eq!(status.status, SessionStatus::LoggedIn);
    assert_eq!(status.out_seq, 1);
    assert!(status.connected_since.is_some());
}

#[tokio::test]
async fn test_logon_rejected_surfaces_text() {
    let gateway = in_memory(session_config("lp1")).await;
    let (mut lp, task) = start(&gateway, "lp1");

    lp.expect(MsgType::Logon).await;
    lp.send(MsgType::Logout, |enc| enc.put_str(tags::TEXT, "invalid password"))
        .await;

    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        FixError::Session(SessionError::LogonRejected { ref reason }) if reason == "invalid password"
    ));
    assert_eq!(gateway.session_status("lp1").unwrap().status, SessionStatus::Disconnected);
}

#[tokio::test]
async fn test_second_connect_rejected_while_running() {
    let gateway = in_memory(session_config("lp1")).await;
    let _lp = logged_in(&gateway).await;
    assert!(matches!(
        gateway.connect("lp1"),
        Err(FixError::Session(SessionError::InvalidState { .. }))
    ));
}

#[tokio::test]
async fn test_gap_requests_resend_once_and_processes_message() {
    let gateway = in_memory(session_config("lp1")).await;
    let mut lp = logged_in(&gateway).await;

    for _ in 2..=5 {
        lp.send(MsgType::Heartbeat, |_| {}).await;
    }
    wait_until(|| gateway.session_status("lp1").unwrap().in_seq == 5).await;

    lp.seq = 8;
    lp.send_at(8, false, MsgType::Heartbeat, |_| {}).await;

    let frame = lp.expect(MsgType::ResendRequest).await;
    let resend = decode(&frame).unwrap();
    assert_eq!(resend.get_u64(tags::BEGIN_SEQ_NO).unwrap(), 6);
    assert_eq!(resend.get_u64(tags::END_SEQ_NO).unwrap(), 7);
    wait_until(|| gateway.session_status("lp1").unwrap().in_seq == 8).await;

    // the next outbound frame is the TestRequest answer, not another resend
    lp.send(MsgType::TestRequest, |enc| enc.put_str(tags::TEST_REQ_ID, "after-gap"))
        .await;
    let frame = lp.expect(MsgType::Heartbeat).await;
    assert_eq!(decode(&frame).unwrap().get_str(tags::TEST_REQ_ID).unwrap(), "after-gap");
}

#[tokio::test]
async fn test_poss_dup_resend_leaves_inbound_sequence() {
    let gateway = in_memory(session_config("lp1")).await;
    let mut lp = logged_in(&gateway).await;
    lp.send(MsgType::Heartbeat, |_| {}).await;
    lp.send(MsgType::Heartbeat, |_| {}).await;
    wait_until(|| gateway.session_status("lp1").unwrap().in_seq == 3).await;

    lp.send_at(2, true, MsgType::TestRequest, |enc| enc.put_str(tags::TEST_REQ_ID, "dup"))
        .await;
    lp.expect(MsgType::Heartbeat).await;
    assert_eq!(gateway.session_status("lp1").unwrap().in_seq, 3);
}

#[tokio::test]
async fn test_too_low_without_poss_dup_disconnects_when_configured() {
    let config = session_config("lp1").with_too_low_policy(TooLowPolicy::Disconnect);
    let gateway = in_memory(config).await;
    let (mut lp, task) = start(&gateway, "lp1");
    lp.accept_logon().await;

    lp.send_at(1, false, MsgType::Heartbeat, |_| {}).await;
    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        FixError::Session(SessionError::SequenceTooLow { expected: 2, received: 1 })
    ));
}

#[tokio::test]
async fn test_outbound_sequence_is_persisted_before_send() {
    let dir = temp_store_dir();
    let gateway = GatewayBuilder::new()
        .add_session(session_config("lp1"))
        .with_store_dir(&dir)
        .build()
        .await
        .unwrap();
    let mut lp = logged_in(&gateway).await;
    wait_until(|| persisted(&dir, "lp1") == SequenceNumbers { out_seq: 1, in_seq: 1 }).await;

    for (expected_seq, symbol) in (2u64..).zip(["EURUSD", "GBPUSD", "USDJPY"]) {
        gateway.subscribe("lp1", symbol).await.unwrap();
        let frame = lp.expect(MsgType::MarketDataRequest).await;
        assert_eq!(decode(&frame).unwrap().msg_seq_num().unwrap(), expected_seq);
        assert_eq!(persisted(&dir, "lp1").out_seq, expected_seq);
        assert_eq!(gateway.session_status("lp1").unwrap().out_seq, expected_seq);
    }
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_logon_resumes_persisted_sequences() {
    let dir = temp_store_dir();
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("lp1.seqnums"), r#"{"out_seq":41,"in_seq":17}"#).unwrap();
    let gateway = GatewayBuilder::new()
        .add_session(session_config("lp1"))
        .with_store_dir(&dir)
        .build()
        .await
        .unwrap();

    let (mut lp, _task) = start(&gateway, "lp1");
    lp.seq = 17;
    let frame = lp.accept_logon().await;
    assert_eq!(decode(&frame).unwrap().msg_seq_num().unwrap(), 42);
    wait_until(|| persisted(&dir, "lp1") == SequenceNumbers { out_seq: 42, in_seq: 18 }).await;
    assert_eq!(gateway.session_status("lp1").unwrap().status, SessionStatus::LoggedIn);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_reset_on_logon_restarts_numbering() {
    let dir = temp_store_dir();
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("lp1.seqnums"), r#"{"out_seq":41,"in_seq":17}"#).unwrap();
    let gateway = GatewayBuilder::new()
        .add_session(session_config("lp1").with_reset_on_logon(true))
        .with_store_dir(&dir)
        .build()
        .await
        .unwrap();

    let (mut lp, _task) = start(&gateway, "lp1");
    let frame = lp.accept_logon().await;
    let logon = decode(&frame).unwrap();
    assert_eq!(logon.msg_seq_num().unwrap(), 1);
    assert_eq!(logon.get_str(tags::RESET_SEQ_NUM_FLAG).unwrap(), "Y");
    wait_until(|| gateway.session_status("lp1").unwrap().in_seq == 1).await;
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_resend_request_replays_and_gap_fills() {
    let gateway = in_memory(session_config("lp1")).await;
    let mut lp = logged_in(&gateway).await;

    let eur = gateway.subscribe("lp1", "EURUSD").await.unwrap();
    lp.expect(MsgType::MarketDataRequest).await;
    gateway.subscribe("lp1", "GBPUSD").await.unwrap();
    lp.expect(MsgType::MarketDataRequest).await;

    lp.send(MsgType::ResendRequest, |enc| {
        enc.put_uint(tags::BEGIN_SEQ_NO, 1);
        enc.put_uint(tags::END_SEQ_NO, 0);
    })
    .await;

    // seq 1 was the Logon, which is never retained
    let frame = lp.expect(MsgType::SequenceReset).await;
    let fill = decode(&frame).unwrap();
    assert_eq!(fill.msg_seq_num().unwrap(), 1);
    assert_eq!(fill.get_str(tags::GAP_FILL_FLAG).unwrap(), "Y");
    assert_eq!(fill.get_u64(tags::NEW_SEQ_NO).unwrap(), 2);

    let frame = lp.expect(MsgType::MarketDataRequest).await;
    let replay = decode(&frame).unwrap();
    assert_eq!(replay.msg_seq_num().unwrap(), 2);
    assert!(replay.poss_dup(), "{}", printable(&frame));
    assert!(replay.has_field(tags::ORIG_SENDING_TIME));
    assert_eq!(replay.get_str(tags::MD_REQ_ID).unwrap(), eur);

    let frame = lp.expect(MsgType::MarketDataRequest).await;
    let replay = decode(&frame).unwrap();
    assert_eq!(replay.msg_seq_num().unwrap(), 3);
    assert_eq!(replay.get_str(tags::SYMBOL).unwrap(), "GBPUSD");

    assert_eq!(gateway.session_status("lp1").unwrap().out_seq, 3);
}

#[tokio::test]
async fn test_sequence_reset_advances_inbound() {
    let gateway = in_memory(session_config("lp1")).await;
    let mut lp = logged_in(&gateway).await;

    lp.send_at(2, false, MsgType::SequenceReset, |enc| {
        enc.put_bool(tags::GAP_FILL_FLAG, true);
        enc.put_uint(tags::NEW_SEQ_NO, 10);
    })
    .await;
    wait_until(|| gateway.session_status("lp1").unwrap().in_seq == 9).await;

    lp.seq = 9;
    lp.send(MsgType::TestRequest, |enc| enc.put_str(tags::TEST_REQ_ID, "t10"))
        .await;
    lp.expect(MsgType::Heartbeat).await;
    assert_eq!(gateway.session_status("lp1").unwrap().in_seq, 10);
}

#[tokio::test]
async fn test_test_request_is_echoed() {
    let gateway = in_memory(session_config("lp1")).await;
    let mut lp = logged_in(&gateway).await;

    lp.send(MsgType::TestRequest, |enc| enc.put_str(tags::TEST_REQ_ID, "PING-1"))
        .await;
    let frame = lp.expect(MsgType::Heartbeat).await;
    let heartbeat = decode(&frame).unwrap();
    assert_eq!(heartbeat.get_str(tags::TEST_REQ_ID).unwrap(), "PING-1");
    assert_eq!(heartbeat.msg_seq_num().unwrap(), 2);
}

#[tokio::test]
async fn test_eurusd_quote_merge_end_to_end() {
    let gateway = in_memory(session_config("lp1")).await;
    let events = gateway.events();
    let mut lp = logged_in(&gateway).await;

    let md_req_id = gateway.subscribe("lp1", "EURUSD").await.unwrap();
    let frame = lp.expect(MsgType::MarketDataRequest).await;
    let request = decode(&frame).unwrap();
    assert_eq!(request.get_str(tags::MD_REQ_ID).unwrap(), md_req_id);
    assert_eq!(request.get_str(tags::SUBSCRIPTION_REQUEST_TYPE).unwrap(), "1");
    assert_eq!(gateway.subscribe("lp1", "EURUSD").await.unwrap(), md_req_id);

    let id = md_req_id.clone();
    lp.send(MsgType::MarketDataSnapshot, |enc| {
        enc.put_str(tags::MD_REQ_ID, &id);
        enc.put_str(tags::SYMBOL, "EURUSD");
        enc.put_uint(tags::NO_MD_ENTRIES, 2);
        enc.put_str(tags::MD_ENTRY_TYPE, "0");
        enc.put_str(tags::MD_ENTRY_PX, "1.1000");
        enc.put_str(tags::MD_ENTRY_SIZE, "1000000");
        enc.put_str(tags::MD_ENTRY_TYPE, "1");
        enc.put_str(tags::MD_ENTRY_PX, "1.1002");
        enc.put_str(tags::MD_ENTRY_SIZE, "2000000");
    })
    .await;
    let quote = next_event(&events.quotes).await;
    assert_eq!((quote.bid, quote.ask), (dec("1.1000"), dec("1.1002")));

    lp.send(MsgType::MarketDataIncrementalRefresh, |enc| {
        enc.put_str(tags::MD_REQ_ID, &id);
        enc.put_uint(tags::NO_MD_ENTRIES, 1);
        enc.put_str(tags::MD_UPDATE_ACTION, "1");
        enc.put_str(tags::MD_ENTRY_TYPE, "0");
        enc.put_str(tags::SYMBOL, "EURUSD");
        enc.put_str(tags::MD_ENTRY_PX, "1.1001");
        enc.put_str(tags::MD_ENTRY_SIZE, "500000");
    })
    .await;
    let quote = next_event(&events.quotes).await;
    assert_eq!((quote.bid, quote.ask), (dec("1.1001"), dec("1.1002")));
    assert_eq!(quote.ask_size, dec("2000000"));

    let cached = gateway.quote("lp1", "EURUSD").unwrap().unwrap();
    assert_eq!(cached, quote);
    assert_eq!(gateway.subscribed_symbols("lp1").unwrap(), vec!["EURUSD"]);

    let stats = gateway.event_stats();
    assert_eq!(stats.quotes.published, 2);
    assert_eq!(stats.quotes.dropped, 0);

    assert!(gateway.unsubscribe("lp1", &md_req_id).await.unwrap());
    let frame = lp.expect(MsgType::MarketDataRequest).await;
    assert_eq!(
        decode(&frame).unwrap().get_str(tags::SUBSCRIPTION_REQUEST_TYPE).unwrap(),
        "2"
    );
    assert!(!gateway.is_symbol_subscribed("lp1", "EURUSD").unwrap());
    assert!(gateway.quote("lp1", "EURUSD").unwrap().is_none());
}

#[tokio::test]
async fn test_market_data_reject_forwarded() {
    let gateway = in_memory(session_config("lp1")).await;
    let events = gateway.events();
    let mut lp = logged_in(&gateway).await;

    let md_req_id = gateway.subscribe("lp1", "XAUUSD").await.unwrap();
    lp.expect(MsgType::MarketDataRequest).await;
    let id = md_req_id.clone();
    lp.send(MsgType::MarketDataRequestReject, |enc| {
        enc.put_str(tags::MD_REQ_ID, &id);
        enc.put_str(tags::MD_REQ_REJ_REASON, "0");
        enc.put_str(tags::TEXT, "unknown symbol");
    })
    .await;

    let reject = next_event(&events.md_rejects).await;
    assert_eq!(reject.md_req_id, md_req_id);
    assert_eq!(reject.text.as_deref(), Some("unknown symbol"));
    assert!(!gateway.is_symbol_subscribed("lp1", "XAUUSD").unwrap());
}

#[tokio::test]
async fn test_orders_and_execution_routing() {
    let gateway = in_memory(session_config("lp1")).await;
    let events = gateway.events();
    let mut lp = logged_in(&gateway).await;

    let cl_ord_id = gateway
        .send_market_order("lp1", "EURUSD", Side::Buy, dec("100000"))
        .await
        .unwrap();
    let frame = lp.expect(MsgType::NewOrderSingle).await;
    let order = decode(&frame).unwrap();
    assert_eq!(order.get_str(tags::CL_ORD_ID).unwrap(), cl_ord_id);
    assert_eq!(order.get_str(tags::ORD_TYPE).unwrap(), "1");
    assert_eq!(order.get_str(tags::ACCOUNT).unwrap(), "ACC-7");
    assert!(!order.has_field(tags::PRICE));

    let id = cl_ord_id.clone();
    lp.send(MsgType::ExecutionReport, |enc| {
        enc.put_str(tags::ORDER_ID, "O-1");
        enc.put_str(tags::CL_ORD_ID, &id);
        enc.put_str(tags::EXEC_ID, "E-1");
        enc.put_str(tags::EXEC_TYPE, "F");
        enc.put_str(tags::ORD_STATUS, "2");
        enc.put_str(tags::SYMBOL, "EURUSD");
        enc.put_str(tags::SIDE, "1");
        enc.put_str(tags::LAST_QTY, "100000");
        enc.put_str(tags::LAST_PX, "1.1002");
    })
    .await;
    let report = next_event(&events.executions).await;
    assert_eq!(report.exec_type, ExecType::Trade);
    assert_eq!(report.cl_ord_id.as_deref(), Some(cl_ord_id.as_str()));
    assert_eq!(report.last_px, Some(dec("1.1002")));

    gateway
        .request_order_status("lp1", &cl_ord_id, "EURUSD", Side::Buy)
        .await
        .unwrap();
    lp.expect(MsgType::OrderStatusRequest).await;
    lp.send(MsgType::ExecutionReport, |enc| {
        enc.put_str(tags::ORDER_ID, "O-1");
        enc.put_str(tags::CL_ORD_ID, &id);
        enc.put_str(tags::EXEC_TYPE, "I");
        enc.put_str(tags::ORD_STATUS, "2");
    })
    .await;
    let status = next_event(&events.order_statuses).await;
    assert_eq!(status.source, OrderStatusSource::StatusRequest);
    assert_eq!(status.cl_ord_id.as_deref(), Some(cl_ord_id.as_str()));
    assert_eq!(gateway.event_stats().executions.published, 1);
}

#[tokio::test]
async fn test_incoming_logout_is_answered() {
    let gateway = in_memory(session_config("lp1")).await;
    let (mut lp, task) = start(&gateway, "lp1");
    lp.accept_logon().await;
    wait_until(|| gateway.session_status("lp1").unwrap().status == SessionStatus::LoggedIn).await;

    lp.send(MsgType::Logout, |enc| enc.put_str(tags::TEXT, "end of day"))
        .await;
    lp.expect(MsgType::Logout).await;
    task.await.unwrap().unwrap();
    assert_eq!(gateway.session_status("lp1").unwrap().status, SessionStatus::Disconnected);
}

#[tokio::test]
async fn test_disconnect_sends_logout_and_is_idempotent() {
    let gateway = in_memory(session_config("lp1")).await;
    let (mut lp, task) = start(&gateway, "lp1");
    lp.accept_logon().await;
    wait_until(|| gateway.session_status("lp1").unwrap().status == SessionStatus::LoggedIn).await;

    gateway.disconnect("lp1").await.unwrap();
    lp.expect(MsgType::Logout).await;
    gateway.disconnect("lp1").await.unwrap();
    task.await.unwrap().unwrap();

    let status = gateway.session_status("lp1").unwrap();
    assert_eq!(status.status, SessionStatus::Disconnected);
    assert!(matches!(
        gateway.subscribe("lp1", "EURUSD").await,
        Err(FixError::Session(SessionError::NotLoggedIn { .. }))
    ));
}

#[tokio::test]
async fn test_too_low_is_skipped_under_default_policy() {
    let gateway = in_memory(session_config("lp1")).await;
    let mut lp = logged_in(&gateway).await;
    lp.send(MsgType::Heartbeat, |_| {}).await;
    wait_until(|| gateway.session_status("lp1").unwrap().in_seq == 2).await;

    lp.send_at(1, false, MsgType::TestRequest, |enc| enc.put_str(tags::TEST_REQ_ID, "stale"))
        .await;
    lp.send(MsgType::TestRequest, |enc| enc.put_str(tags::TEST_REQ_ID, "fresh"))
        .await;

    // the stale TestRequest got no answer
    let frame = lp.expect(MsgType::Heartbeat).await;
    assert_eq!(decode(&frame).unwrap().get_str(tags::TEST_REQ_ID).unwrap(), "fresh");
    wait_until(|| gateway.session_status("lp1").unwrap().in_seq == 3).await;
    assert_eq!(gateway.session_status("lp1").unwrap().status, SessionStatus::LoggedIn);
}

#[tokio::test]
async fn test_logon_timeout_ends_disconnected() {
    let config = session_config("lp1").with_logon_timeout(Duration::from_millis(200));
    let gateway = in_memory(config).await;
    let (mut lp, task) = start(&gateway, "lp1");
    lp.expect(MsgType::Logon).await;

    let err = timeout(WAIT, task).await.unwrap().unwrap().unwrap_err();
    assert!(matches!(
        err,
        FixError::Session(SessionError::LogonTimeout { elapsed_ms: 200 })
    ));
    let status = gateway.session_status("lp1").unwrap();
    assert_eq!(status.status, SessionStatus::Disconnected);
    assert!(status.connected_since.is_none());
}

#[tokio::test]
async fn test_silent_counterparty_gets_heartbeat_then_test_request() {
    let config = session_config("lp1").with_heartbeat_interval(Duration::from_secs(1));
    let gateway = in_memory(config).await;
    let (mut lp, task) = start(&gateway, "lp1");
    let logon = lp.accept_logon().await;
    assert_eq!(decode(&logon).unwrap().get_str(tags::HEART_BT_INT).unwrap(), "1");

    let frame = lp.expect(MsgType::Heartbeat).await;
    assert!(!decode(&frame).unwrap().has_field(tags::TEST_REQ_ID));

    let mut test_req_id = None;
    for _ in 0..4 {
        let frame = lp.recv().await;
        let msg = decode(&frame).unwrap();
        match msg.msg_type() {
            MsgType::Heartbeat => {}
            MsgType::TestRequest => {
                test_req_id = Some(msg.get_str(tags::TEST_REQ_ID).unwrap().to_string());
                break;
            }
            other => panic!("unexpected {other}: {}", printable(&frame)),
        }
    }
    let test_req_id = test_req_id.expect("no TestRequest after the link went quiet");
    assert!(test_req_id.starts_with("TEST"));

    // left unanswered, the TestRequest ends the session
    timeout(WAIT, task).await.unwrap().unwrap().unwrap();
    assert_eq!(gateway.session_status("lp1").unwrap().status, SessionStatus::Disconnected);
}

#[tokio::test]
async fn test_stalled_write_forces_disconnect() {
    let gateway = in_memory(session_config("lp1")).await;
    let (mut lp, task) = start_with_capacity(&gateway, "lp1", 512);
    lp.accept_logon().await;
    wait_until(|| gateway.session_status("lp1").unwrap().status == SessionStatus::LoggedIn).await;

    // the counterparty stops reading, so the pipe fills up
    let order = NewOrder::market("EURUSD", Side::Buy, dec("1000000"));
    let mut failure = None;
    for _ in 0..64 {
        if let Err(err) = gateway.send_order("lp1", &order).await {
            failure = Some(err);
            break;
        }
    }
    let err = failure.expect("writes never stalled");
    assert!(
        matches!(err, FixError::Session(SessionError::WriteTimeout { .. })),
        "{err}"
    );
    assert_eq!(gateway.session_status("lp1").unwrap().status, SessionStatus::Disconnected);
    timeout(WAIT, task).await.unwrap().unwrap().unwrap();
    assert!(matches!(
        gateway.send_order("lp1", &order).await,
        Err(FixError::Session(SessionError::NotLoggedIn { .. }))
    ));
    drop(lp);
}

#[tokio::test]
async fn test_reconnect_right_after_disconnect() {
    let gateway = in_memory(session_config("lp1")).await;
    let (mut old_lp, old_task) = start(&gateway, "lp1");
    old_lp.accept_logon().await;
    wait_until(|| gateway.session_status("lp1").unwrap().status == SessionStatus::LoggedIn).await;

    gateway.disconnect("lp1").await.unwrap();
    let (mut lp, _task) = start(&gateway, "lp1");
    old_lp.expect(MsgType::Logout).await;

    lp.seq = 1;
    let frame = lp.accept_logon().await;
    assert_eq!(decode(&frame).unwrap().msg_seq_num().unwrap(), 3);
    timeout(WAIT, old_task).await.unwrap().unwrap().unwrap();

    wait_until(|| {
        let status = gateway.session_status("lp1").unwrap();
        status.status == SessionStatus::LoggedIn && status.in_seq == 2
    })
    .await;
    let md_req_id = gateway.subscribe("lp1", "EURUSD").await.unwrap();
    let frame = lp.expect(MsgType::MarketDataRequest).await;
    assert_eq!(decode(&frame).unwrap().get_str(tags::MD_REQ_ID).unwrap(), md_req_id);
    assert_eq!(gateway.session_status("lp1").unwrap().status, SessionStatus::LoggedIn);
}
