/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Scripted counterparty and polling helpers shared by the session tests.

#![allow(dead_code)]

use bytes::BytesMut;
use crossbeam_channel::{Receiver, TryRecvError};
use fixgate_core::message::MsgType;
use fixgate_core::tags;
use fixgate_core::types::{CompId, Timestamp};
use fixgate_engine::{Gateway, SessionTask};
use fixgate_session::SessionConfig;
use fixgate_tagvalue::{Encoder, Header, decode};
use fixgate_transport::FixCodec;
use futures_util::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf, duplex};
use tokio::time::{Instant, sleep, timeout};
use tokio_util::codec::FramedRead;

pub const WAIT: Duration = Duration::from_secs(5);

pub fn session_config(id: &str) -> SessionConfig {
    SessionConfig::new(
        id,
        "127.0.0.1",
        9876,
        CompId::new("GW").unwrap(),
        CompId::new("LP").unwrap(),
    )
    .with_credentials("user", "secret")
    .with_trading_account("ACC-7")
}

pub fn temp_store_dir() -> PathBuf {
    std::env::temp_dir().join(format!("fixgate-test-{}", uuid::Uuid::new_v4().simple()))
}

/// Renders a frame with `|` in place of SOH.
pub fn printable(frame: &[u8]) -> String {
    String::from_utf8_lossy(frame).replace('\x01', "|")
}

/// The far end of a session, speaking as TargetCompID `LP`.
pub struct Counterparty {
    frames: FramedRead<ReadHalf<DuplexStream>, FixCodec>,
    writer: WriteHalf<DuplexStream>,
    /// Last MsgSeqNum sent.
    pub seq: u64,
}

impl Counterparty {
    pub fn new(stream: DuplexStream) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            frames: FramedRead::new(reader, FixCodec::new()),
            writer,
            seq: 0,
        }
    }

    pub async fn recv(&mut self) -> BytesMut {
        timeout(WAIT, self.frames.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("session closed the stream")
            .expect("unframeable bytes from session")
    }

    /// Receives the next frame and checks its type.
    pub async fn expect(&mut self, msg_type: MsgType) -> BytesMut {
        let frame = self.recv().await;
        let actual = decode(&frame).unwrap().msg_type().clone();
        assert_eq!(actual, msg_type, "got {}", printable(&frame));
        frame
    }

    /// Sends a message with the next sequence number.
    pub async fn send<F>(&mut self, msg_type: MsgType, body: F)
    where
        F: FnOnce(&mut Encoder<'_>),
    {
        self.seq += 1;
        self.send_at(self.seq, false, msg_type, body).await;
    }

    /// Sends a message with an explicit sequence number, leaving `seq` alone.
    pub async fn send_at<F>(&mut self, seq: u64, poss_dup: bool, msg_type: MsgType, body: F)
    where
        F: FnOnce(&mut Encoder<'_>),
    {
        let header = Header {
            sender_comp_id: "LP",
            target_comp_id: "GW",
            msg_seq_num: seq,
            sending_time: Timestamp::now(),
        };
        let mut enc = Encoder::with_header("FIX.4.4", &msg_type, &header);
        if poss_dup {
            enc.put_bool(tags::POSS_DUP_FLAG, true);
        }
        body(&mut enc);
        let frame = enc.finish().unwrap();
        self.writer.write_all(&frame).await.unwrap();
    }

    /// Answers the session's Logon.
    pub async fn accept_logon(&mut self) -> BytesMut {
        let logon = self.expect(MsgType::Logon).await;
        self.send(MsgType::Logon, |enc| {
            enc.put_uint(tags::ENCRYPT_METHOD, 0);
            enc.put_uint(tags::HEART_BT_INT, 30);
        })
        .await;
        logon
    }
}

/// Starts `session_id` over an in-memory pipe.
pub fn start(gateway: &Gateway, session_id: &str) -> (Counterparty, SessionTask) {
    start_with_capacity(gateway, session_id, 64 * 1024)
}

/// Starts `session_id` over a pipe buffering at most `capacity` bytes each way.
pub fn start_with_capacity(
    gateway: &Gateway,
    session_id: &str,
    capacity: usize,
) -> (Counterparty, SessionTask) {
    let (client, server) = duplex(capacity);
    let task = gateway.connect_with(session_id, Box::new(client)).unwrap();
    (Counterparty::new(server), task)
}

/// Polls `condition` until it holds.
pub async fn wait_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + WAIT;
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        sleep(Duration::from_millis(10)).await;
    }
}

/// Waits for the next event without blocking the runtime.
pub async fn next_event<T>(rx: &Receiver<T>) -> T {
    let deadline = Instant::now() + WAIT;
    loop {
        match rx.try_recv() {
            Ok(event) => return event,
            Err(TryRecvError::Empty) => {
                assert!(Instant::now() < deadline, "no event in time");
                sleep(Duration::from_millis(10)).await;
            }
            Err(TryRecvError::Disconnected) => panic!("event stream closed"),
        }
    }
}
