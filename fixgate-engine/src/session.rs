/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Runtime of one counterparty session.
//!
//! A connected session owns two tasks: the read task, which decodes frames in
//! arrival order, validates inbound sequence numbers and dispatches, and the
//! heartbeat task. Both share the writer behind an async mutex. Every
//! outbound frame is numbered, persisted and (for application messages)
//! retained while that mutex is held, then written under the write deadline.

use crate::dispatch::{Handler, handler_for};
use crate::events::{
    EventBus, ExecutionReport, OrderStatusReport, OrderStatusSource, PositionReport,
    SecurityEvent, TradeCapture,
};
use crate::marketdata::{MarketDataBook, Quote, write_request};
use crate::orders::{self, NewOrder, new_request_id};
use bytes::Bytes;
use fixgate_core::error::{DecodeError, EncodeError, FixError, SessionError, TransportError};
use fixgate_core::message::{MsgType, RawMessage};
use fixgate_core::tags;
use fixgate_core::types::{ExecType, OrdType, Side, SubscriptionRequestType, Timestamp};
use fixgate_session::{
    HeartbeatAction, HeartbeatManager, ResendStep, SequenceCheck, SequenceManager, SessionConfig,
    SessionStatus, StatusTracker, TooLowPolicy, admin, gap_fill, plan_resend, rewrite_for_resend,
};
use fixgate_store::{MemoryStore, MessageStore, SequenceStore};
use fixgate_tagvalue::{Encoder, Header, decode};
use fixgate_transport::{BoxedStream, CodecError, Connector, FixCodec};
use futures_util::StreamExt;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at, timeout};
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

type Frames = FramedRead<ReadHalf<BoxedStream>, FixCodec>;
type Writer = Option<WriteHalf<BoxedStream>>;

/// Whether the read task keeps going after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Identity of the live connection.
///
/// The generation is bumped when a connection starts and again when it is
/// torn down, so tasks of a retired connection cannot touch its successor.
#[derive(Debug, Default)]
struct Link {
    generation: u64,
    cancel: CancellationToken,
}

/// Point-in-time view of a session for supervisors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// Session id.
    pub id: String,
    /// Counterparty name.
    pub name: String,
    /// Current status.
    pub status: SessionStatus,
    /// Last outbound sequence number used.
    pub out_seq: u64,
    /// Last inbound sequence number accepted.
    pub in_seq: u64,
    /// Time of the last inbound Heartbeat.
    pub last_heartbeat: Option<Timestamp>,
    /// Counterparty host.
    pub host: String,
    /// Counterparty port.
    pub port: u16,
    /// SenderCompID.
    pub sender_comp_id: String,
    /// TargetCompID.
    pub target_comp_id: String,
    /// Trading account, if configured.
    pub trading_account: Option<String>,
    /// When the transport came up, if it is up.
    pub connected_since: Option<Timestamp>,
}

/// One counterparty session.
pub struct Session {
    config: SessionConfig,
    status: StatusTracker,
    sequences: SequenceManager,
    seq_store: Arc<dyn SequenceStore>,
    persist_lock: tokio::sync::Mutex<()>,
    messages: Arc<dyn MessageStore>,
    heartbeat: Mutex<HeartbeatManager>,
    writer: tokio::sync::Mutex<Writer>,
    link: Mutex<Link>,
    market_data: MarketDataBook,
    events: Arc<EventBus>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.config.id)
            .field("status", &self.status.get())
            .field("sequences", &self.sequences.snapshot())
            .finish_non_exhaustive()
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn codec_error(err: CodecError) -> FixError {
    match err {
        CodecError::MessageTooLarge { size, max_size } => {
            DecodeError::MessageTooLarge { size, max_size }.into()
        }
        CodecError::Io(reason) => TransportError::Io(reason).into(),
    }
}

impl Session {
    /// Creates a disconnected session, restoring its sequence numbers.
    ///
    /// # Errors
    /// `FixError::Store` if the persisted counters cannot be read.
    pub async fn open(
        config: SessionConfig,
        seq_store: Arc<dyn SequenceStore>,
        events: Arc<EventBus>,
    ) -> Result<Arc<Self>, FixError> {
        let seqs = seq_store.load().await?;
        info!(
            session = %config.id,
            out_seq = seqs.out_seq,
            in_seq = seqs.in_seq,
            "sequence numbers restored"
        );
        Ok(Arc::new(Self {
            status: StatusTracker::new(),
            sequences: SequenceManager::with_initial(seqs),
            seq_store,
            persist_lock: tokio::sync::Mutex::new(()),
            messages: Arc::new(MemoryStore::with_capacity(config.message_store_capacity)),
            heartbeat: Mutex::new(HeartbeatManager::new(config.heartbeat_interval)),
            writer: tokio::sync::Mutex::new(None),
            link: Mutex::new(Link::default()),
            market_data: MarketDataBook::new(),
            events,
            config,
        }))
    }

    /// Session id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.config.id
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status.get()
    }

    /// Subscriptions and quotes of this session.
    #[must_use]
    pub const fn market_data(&self) -> &MarketDataBook {
        &self.market_data
    }

    /// Returns the observable state of the session.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let seqs = self.sequences.snapshot();
        SessionSnapshot {
            id: self.config.id.clone(),
            name: self.config.name.clone(),
            status: self.status.get(),
            out_seq: seqs.out_seq,
            in_seq: seqs.in_seq,
            last_heartbeat: self.heartbeat.lock().last_heartbeat_at(),
            host: self.config.host.clone(),
            port: self.config.port,
            sender_comp_id: self.config.sender_comp_id.to_string(),
            target_comp_id: self.config.target_comp_id.to_string(),
            trading_account: self.config.trading_account.clone(),
            connected_since: self.status.connected_since(),
        }
    }

    /// Dials the counterparty and runs the session on a new task.
    ///
    /// The returned handle resolves when the session ends; transport and
    /// logon failures surface there.
    ///
    /// # Errors
    /// `InvalidState` unless the session is disconnected.
    pub fn connect(self: &Arc<Self>) -> Result<JoinHandle<Result<(), FixError>>, FixError> {
        let generation = self.begin_connection()?;
        info!(session = %self.config.id, host = %self.config.host, port = self.config.port, "connecting");
        Ok(tokio::spawn(Arc::clone(self).establish(None, generation)))
    }

    /// Runs the session over an already established stream.
    ///
    /// # Errors
    /// `InvalidState` unless the session is disconnected.
    pub fn connect_with(
        self: &Arc<Self>,
        stream: BoxedStream,
    ) -> Result<JoinHandle<Result<(), FixError>>, FixError> {
        let generation = self.begin_connection()?;
        Ok(tokio::spawn(Arc::clone(self).establish(Some(stream), generation)))
    }

    fn begin_connection(&self) -> Result<u64, FixError> {
        let mut link = self.link.lock();
        self.status.transition(SessionStatus::Connecting)?;
        link.generation += 1;
        Ok(link.generation)
    }

    fn generation(&self) -> u64 {
        self.link.lock().generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    /// Ends `generation` if it is still the live connection.
    ///
    /// Callers hold the writer lock.
    fn retire(&self, generation: u64) -> bool {
        let mut link = self.link.lock();
        if link.generation != generation {
            return false;
        }
        link.generation += 1;
        link.cancel.cancel();
        self.status.disconnect();
        true
    }

    async fn establish(self: Arc<Self>, stream: Option<BoxedStream>, generation: u64) -> Result<(), FixError> {
        let stream = match stream {
            Some(stream) => stream,
            None => match Connector::new(&self.config).connect().await {
                Ok(connection) => {
                    info!(
                        session = %self.config.id,
                        route = %connection.route,
                        tls = connection.tls,
                        "transport established"
                    );
                    connection.stream
                }
                Err(err) => {
                    error!(session = %self.config.id, error = %err, "connect failed");
                    self.close_transport(generation).await;
                    return Err(err.into());
                }
            },
        };

        let result = self.serve(stream, generation).await;
        match &result {
            Ok(()) => info!(session = %self.config.id, "session ended"),
            Err(err) => warn!(session = %self.config.id, error = %err, "session ended with error"),
        }
        result
    }

    async fn serve(self: &Arc<Self>, stream: BoxedStream, generation: u64) -> Result<(), FixError> {
        let (reader, writer) = tokio::io::split(stream);
        let mut frames = FramedRead::new(reader, FixCodec::new());
        let token = match self.attach(generation, writer).await {
            Ok(token) => token,
            Err(err) => {
                self.close_transport(generation).await;
                return Err(err);
            }
        };

        let result = match self.logon(&mut frames, generation).await {
            Ok(()) => {
                let heartbeat =
                    tokio::spawn(Arc::clone(self).heartbeat_loop(token.clone(), generation));
                let result = self.read_loop(&mut frames, &token, generation).await;
                token.cancel();
                if let Err(err) = heartbeat.await {
                    warn!(session = %self.config.id, error = %err, "heartbeat task failed");
                }
                result
            }
            Err(err) => Err(err),
        };
        token.cancel();
        self.close_transport(generation).await;
        result
    }

    /// Installs the writer of `generation` and moves to `Connected`.
    async fn attach(
        &self,
        generation: u64,
        writer: WriteHalf<BoxedStream>,
    ) -> Result<CancellationToken, FixError> {
        let mut slot = self.writer.lock().await;
        let mut link = self.link.lock();
        if link.generation != generation {
            debug!(session = %self.config.id, generation, "connection retired before it came up");
            return Err(SessionError::ConnectionClosed.into());
        }
        self.status.transition(SessionStatus::Connected)?;
        link.cancel = CancellationToken::new();
        *slot = Some(writer);
        Ok(link.cancel.clone())
    }

    async fn logon(&self, frames: &mut Frames, generation: u64) -> Result<(), FixError> {
        if self.config.reset_seq_num_on_logon {
            self.sequences.reset();
            self.persist().await?;
            self.messages.reset().await?;
            info!(session = %self.config.id, "sequence numbers reset for logon");
        }
        self.heartbeat.lock().reset();
        self.send_on(generation, MsgType::Logon, |enc| admin::logon(enc, &self.config))
            .await?;

        let deadline = self.config.logon_timeout;
        let frame = match timeout(deadline, frames.next()).await {
            Err(_) => {
                return Err(SessionError::LogonTimeout {
                    elapsed_ms: millis(deadline),
                }
                .into());
            }
            Ok(None) => return Err(SessionError::ConnectionClosed.into()),
            Ok(Some(Err(err))) => return Err(codec_error(err)),
            Ok(Some(Ok(frame))) => frame,
        };
        let msg = decode(&frame)?;

        match msg.msg_type() {
            MsgType::Logon => {
                self.status.transition(SessionStatus::LoggedIn)?;
                self.heartbeat.lock().on_message_received(false, None);
                let received = msg.msg_seq_num()?;
                info!(session = %self.config.id, seq = received, "logged in");
                let check = self.check_sequence(received, msg.poss_dup(), generation).await?;
                self.commit_inbound(check, received).await
            }
            MsgType::Logout | MsgType::Reject => {
                let reason = msg.field_str(tags::TEXT).unwrap_or("no reason given");
                warn!(session = %self.config.id, msg_type = %msg.msg_type(), reason, "logon rejected");
                Err(SessionError::LogonRejected {
                    reason: reason.to_string(),
                }
                .into())
            }
            other => Err(SessionError::LogonRejected {
                reason: format!("unexpected {other} during logon"),
            }
            .into()),
        }
    }

    async fn read_loop(
        &self,
        frames: &mut Frames,
        token: &CancellationToken,
        generation: u64,
    ) -> Result<(), FixError> {
        loop {
            let next = tokio::select! {
                () = token.cancelled() => return Ok(()),
                next = frames.next() => next,
            };
            let frame = match next {
                Some(Ok(frame)) => frame,
                Some(Err(err)) => return Err(codec_error(err)),
                None => {
                    info!(session = %self.config.id, "connection closed by counterparty");
                    return Err(SessionError::ConnectionClosed.into());
                }
            };
            if self.handle_frame(&frame, generation).await? == Flow::Stop {
                return Ok(());
            }
        }
    }

    async fn handle_frame(&self, frame: &[u8], generation: u64) -> Result<Flow, FixError> {
        if !self.is_current(generation) {
            return Ok(Flow::Stop);
        }
        let msg = match decode(frame) {
            Ok(msg) => msg,
            Err(err) => {
                warn!(session = %self.config.id, error = %err, "dropping invalid frame");
                return Ok(Flow::Continue);
            }
        };
        let handler = handler_for(msg.msg_type());
        self.heartbeat.lock().on_message_received(
            handler == Handler::Heartbeat,
            msg.field_str(tags::TEST_REQ_ID),
        );
        let received = match msg.msg_seq_num() {
            Ok(seq) => seq,
            Err(err) => {
                warn!(session = %self.config.id, error = %err, "dropping frame without MsgSeqNum");
                return Ok(Flow::Continue);
            }
        };
        debug!(session = %self.config.id, msg_type = %msg.msg_type(), seq = received, "received");

        let check = if handler.validates_sequence() {
            let check = self.check_sequence(received, msg.poss_dup(), generation).await?;
            if matches!(check, SequenceCheck::TooLow { .. }) {
                return Ok(Flow::Continue);
            }
            Some(check)
        } else {
            None
        };

        let flow = self.dispatch(handler, &msg, generation).await?;
        if let Some(check) = check {
            self.commit_inbound(check, received).await?;
        }
        Ok(flow)
    }

    async fn check_sequence(
        &self,
        received: u64,
        poss_dup: bool,
        generation: u64,
    ) -> Result<SequenceCheck, FixError> {
        let check = self.sequences.validate_incoming(received, poss_dup);
        if let Some((begin, end)) = check.resend_range() {
            warn!(session = %self.config.id, begin, end, received, "inbound gap, requesting resend");
            self.send_on(generation, MsgType::ResendRequest, |enc| {
                admin::resend_request(enc, begin, end);
            })
            .await?;
        }
        match check {
            SequenceCheck::InOrder | SequenceCheck::PossDuplicate | SequenceCheck::Gap { .. } => {}
            SequenceCheck::TooLow { expected, received } => match self.config.sequence_too_low {
                TooLowPolicy::Log => {
                    warn!(session = %self.config.id, expected, received, "sequence number too low, message ignored");
                }
                TooLowPolicy::Disconnect => {
                    error!(session = %self.config.id, expected, received, "sequence number too low");
                    return Err(SessionError::SequenceTooLow { expected, received }.into());
                }
            },
        }
        Ok(check)
    }

    async fn commit_inbound(&self, check: SequenceCheck, received: u64) -> Result<(), FixError> {
        if let Some(next) = check.next_in_seq(received) {
            self.sequences.set_in(next);
            self.persist().await?;
        }
        Ok(())
    }

    async fn dispatch(
        &self,
        handler: Handler,
        msg: &RawMessage<'_>,
        generation: u64,
    ) -> Result<Flow, FixError> {
        let id = self.config.id.as_str();
        match handler {
            Handler::Logon => warn!(session = %id, "unexpected Logon on an established session"),
            Handler::Heartbeat => trace!(session = %id, "heartbeat"),
            Handler::TestRequest => {
                let test_req_id = msg.field_str(tags::TEST_REQ_ID);
                self.send_on(generation, MsgType::Heartbeat, |enc| {
                    admin::heartbeat(enc, test_req_id);
                })
                .await?;
            }
            Handler::ResendRequest => {
                match (msg.get_u64(tags::BEGIN_SEQ_NO), msg.get_u64(tags::END_SEQ_NO)) {
                    (Ok(begin), Ok(end)) => self.answer_resend(begin, end, generation).await?,
                    _ => warn!(session = %id, "resend request without a valid range ignored"),
                }
            }
            Handler::SequenceReset => self.apply_sequence_reset(msg).await?,
            Handler::Logout => {
                info!(session = %id, text = msg.field_str(tags::TEXT), "counterparty logged out");
                if let Err(err) = self
                    .send_on(generation, MsgType::Logout, |enc| admin::logout(enc, None))
                    .await
                {
                    debug!(session = %id, error = %err, "logout reply not sent");
                }
                return Ok(Flow::Stop);
            }
            Handler::SessionReject => warn!(
                session = %id,
                ref_seq_num = msg.field_str(tags::REF_SEQ_NUM),
                ref_tag = msg.field_str(tags::REF_TAG_ID),
                reason = msg.field_str(tags::SESSION_REJECT_REASON),
                text = msg.field_str(tags::TEXT),
                "session reject received"
            ),
            Handler::BusinessReject => warn!(
                session = %id,
                ref_seq_num = msg.field_str(tags::REF_SEQ_NUM),
                ref_msg_type = msg.field_str(tags::REF_MSG_TYPE),
                reason = msg.field_str(tags::BUSINESS_REJECT_REASON),
                text = msg.field_str(tags::TEXT),
                "business reject received"
            ),
            Handler::ExecutionReport => match ExecutionReport::from_message(id, msg) {
                Ok(report) if report.exec_type == ExecType::OrderStatus => {
                    let status =
                        OrderStatusReport::from_message(id, OrderStatusSource::StatusRequest, msg);
                    self.events.order_statuses.publish(status);
                }
                Ok(report) => {
                    debug!(
                        session = %id,
                        cl_ord_id = report.cl_ord_id.as_deref(),
                        exec_type = ?report.exec_type,
                        "execution report"
                    );
                    self.events.executions.publish(report);
                }
                Err(err) => warn!(session = %id, error = %err, "unusable execution report"),
            },
            Handler::CancelReject => {
                let status = OrderStatusReport::from_message(id, OrderStatusSource::CancelReject, msg);
                warn!(
                    session = %id,
                    cl_ord_id = status.cl_ord_id.as_deref(),
                    reason = status.reject_reason.as_deref(),
                    "cancel rejected"
                );
                self.events.order_statuses.publish(status);
            }
            Handler::MarketDataSnapshot => {
                if let Some(quote) = self.market_data.apply_snapshot(id, msg) {
                    self.events.quotes.publish(quote);
                }
            }
            Handler::MarketDataIncremental => {
                for quote in self.market_data.apply_incremental(id, msg) {
                    self.events.quotes.publish(quote);
                }
            }
            Handler::MarketDataReject => {
                let reject = self.market_data.apply_reject(id, msg);
                self.events.md_rejects.publish(reject);
            }
            Handler::PositionAck => info!(
                session = %id,
                pos_req_id = msg.field_str(tags::POS_REQ_ID),
                result = msg.field_str(tags::POS_REQ_RESULT),
                status = msg.field_str(tags::POS_REQ_STATUS),
                total = msg.field_str(tags::TOTAL_NUM_POS_REPORTS),
                text = msg.field_str(tags::TEXT),
                "positions request acknowledged"
            ),
            Handler::PositionReport => {
                if let Some(report) = PositionReport::from_message(id, msg) {
                    self.events.positions.publish(report);
                }
            }
            Handler::TradeCaptureAck => info!(
                session = %id,
                trade_request_id = msg.field_str(tags::TRADE_REQUEST_ID),
                result = msg.field_str(tags::TRADE_REQUEST_RESULT),
                status = msg.field_str(tags::TRADE_REQUEST_STATUS),
                text = msg.field_str(tags::TEXT),
                "trade capture request acknowledged"
            ),
            Handler::TradeCapture => {
                self.events.trade_captures.publish(TradeCapture::from_message(id, msg));
            }
            Handler::Security => {
                self.events.securities.publish(SecurityEvent::from_message(id, msg));
            }
            Handler::OutboundOnly => warn!(
                session = %id,
                msg_type = %msg.msg_type(),
                "counterparty sent a request type this gateway only sends"
            ),
            Handler::Unknown => debug!(session = %id, msg_type = %msg.msg_type(), "unhandled message type"),
        }
        Ok(Flow::Continue)
    }

    async fn apply_sequence_reset(&self, msg: &RawMessage<'_>) -> Result<(), FixError> {
        let new_seq_no = match msg.get_u64(tags::NEW_SEQ_NO) {
            Ok(seq) => seq,
            Err(err) => {
                warn!(session = %self.config.id, error = %err, "sequence reset without NewSeqNo ignored");
                return Ok(());
            }
        };
        let gap_fill = msg.get_bool(tags::GAP_FILL_FLAG).unwrap_or(false);
        let expected = self.sequences.expected_in();
        if new_seq_no > expected {
            info!(session = %self.config.id, expected, new_seq_no, gap_fill, "inbound sequence advanced");
            self.sequences.set_in(new_seq_no - 1);
            self.persist().await?;
        } else {
            debug!(session = %self.config.id, expected, new_seq_no, gap_fill, "sequence reset does not advance, ignored");
        }
        Ok(())
    }

    async fn answer_resend(&self, begin: u64, end: u64, generation: u64) -> Result<(), FixError> {
        let mut writer = self.writer.lock().await;
        if !self.is_current(generation) {
            return Err(SessionError::ConnectionClosed.into());
        }
        let out_seq = self.sequences.out_seq();
        let stored = self.messages.get_range(begin, end).await?;
        let steps = plan_resend(begin, end, out_seq, stored);
        info!(session = %self.config.id, begin, end, steps = steps.len(), "answering resend request");

        let now = Timestamp::now();
        for step in steps {
            let frame = match step {
                ResendStep::Replay(message) => match rewrite_for_resend(&message.frame, now) {
                    Ok(frame) => frame,
                    Err(err) => {
                        warn!(session = %self.config.id, seq = message.seq_num, error = %err, "stored frame unusable, gap-filling");
                        gap_fill(
                            &self.config.begin_string,
                            &self.header(message.seq_num, now),
                            message.seq_num + 1,
                        )?
                    }
                },
                ResendStep::GapFill { begin, new_seq_no } => {
                    gap_fill(&self.config.begin_string, &self.header(begin, now), new_seq_no)?
                }
            };
            self.write_frame(&mut writer, &frame).await?;
        }
        Ok(())
    }

    async fn heartbeat_loop(self: Arc<Self>, token: CancellationToken, generation: u64) {
        let period = self.config.heartbeat_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        loop {
            tokio::select! {
                biased;
                () = token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let action = self.heartbeat.lock().poll();
            let sent = match action {
                HeartbeatAction::SendHeartbeat => {
                    self.send_on(generation, MsgType::Heartbeat, |enc| admin::heartbeat(enc, None))
                        .await
                }
                HeartbeatAction::SendTestRequest(test_req_id) => {
                    debug!(session = %self.config.id, test_req_id, "counterparty silent, sending test request");
                    self.send_on(generation, MsgType::TestRequest, |enc| {
                        admin::test_request(enc, &test_req_id);
                    })
                    .await
                }
                HeartbeatAction::Disconnect { elapsed } => {
                    let err = SessionError::HeartbeatTimeout {
                        elapsed_ms: millis(elapsed),
                    };
                    error!(session = %self.config.id, error = %err, "disconnecting");
                    token.cancel();
                    break;
                }
            };
            if let Err(err) = sent {
                error!(session = %self.config.id, error = %err, "heartbeat send failed");
                token.cancel();
                break;
            }
        }
    }

    fn header(&self, msg_seq_num: u64, sending_time: Timestamp) -> Header<'_> {
        Header {
            sender_comp_id: self.config.sender_comp_id.as_str(),
            target_comp_id: self.config.target_comp_id.as_str(),
            msg_seq_num,
            sending_time,
        }
    }

    async fn send_with<F>(&self, msg_type: MsgType, body: F) -> Result<u64, FixError>
    where
        F: FnOnce(&mut Encoder<'_>) + Send,
    {
        self.transmit(None, msg_type, body).await
    }

    /// Sends on behalf of the tasks of `generation` only.
    async fn send_on<F>(&self, generation: u64, msg_type: MsgType, body: F) -> Result<u64, FixError>
    where
        F: FnOnce(&mut Encoder<'_>) + Send,
    {
        self.transmit(Some(generation), msg_type, body).await
    }

    /// Numbers, persists, retains and writes one message.
    ///
    /// Encoding or persistence failures give the sequence number back.
    async fn transmit<F>(
        &self,
        generation: Option<u64>,
        msg_type: MsgType,
        body: F,
    ) -> Result<u64, FixError>
    where
        F: FnOnce(&mut Encoder<'_>) + Send,
    {
        let mut writer = self.writer.lock().await;
        if writer.is_none() || generation.is_some_and(|generation| !self.is_current(generation)) {
            return Err(SessionError::ConnectionClosed.into());
        }

        let seq = self.sequences.allocate_out();
        let frame = match self.prepare(&msg_type, seq, body).await {
            Ok(frame) => frame,
            Err(err) => {
                self.sequences.set_out(seq - 1);
                return Err(err);
            }
        };
        self.write_frame(&mut writer, &frame).await?;
        debug!(session = %self.config.id, msg_type = %msg_type, seq, "sent");
        Ok(seq)
    }

    async fn prepare<F>(&self, msg_type: &MsgType, seq: u64, body: F) -> Result<Bytes, FixError>
    where
        F: FnOnce(&mut Encoder<'_>) + Send,
    {
        let header = self.header(seq, Timestamp::now());
        let mut enc = Encoder::with_header(&self.config.begin_string, msg_type, &header);
        body(&mut enc);
        let frame = enc.finish()?.freeze();

        self.persist().await?;
        if !msg_type.is_admin() {
            self.messages.store(seq, frame.clone()).await?;
        }
        Ok(frame)
    }

    async fn write_frame(&self, writer: &mut Writer, frame: &[u8]) -> Result<(), FixError> {
        let Some(stream) = writer.as_mut() else {
            return Err(SessionError::ConnectionClosed.into());
        };
        let deadline = self.config.effective_write_timeout();
        let outcome = timeout(deadline, async {
            stream.write_all(frame).await?;
            stream.flush().await?;
            Ok::<(), std::io::Error>(())
        })
        .await;

        let err: FixError = match outcome {
            Ok(Ok(())) => {
                self.heartbeat.lock().on_message_sent();
                return Ok(());
            }
            Ok(Err(err)) => TransportError::from(err).into(),
            Err(_) => SessionError::WriteTimeout {
                elapsed_ms: millis(deadline),
            }
            .into(),
        };
        error!(session = %self.config.id, error = %err, "write failed, disconnecting");
        writer.take();
        self.retire(self.generation());
        Err(err)
    }

    async fn persist(&self) -> Result<(), FixError> {
        let _guard = self.persist_lock.lock().await;
        self.seq_store.save(self.sequences.snapshot()).await?;
        Ok(())
    }

    async fn close_transport(&self, generation: u64) {
        let writer = {
            let mut slot = self.writer.lock().await;
            if !self.retire(generation) {
                debug!(session = %self.config.id, generation, "connection already retired");
                return;
            }
            slot.take()
        };
        if let Some(mut writer) = writer
            && let Err(err) = timeout(self.config.effective_write_timeout(), writer.shutdown())
                .await
                .unwrap_or(Ok(()))
        {
            debug!(session = %self.config.id, error = %err, "transport shutdown failed");
        }
    }

    /// Logs out if logged in, then closes the transport. Idempotent.
    pub async fn disconnect(&self) {
        let generation = self.generation();
        if self.status.get() == SessionStatus::LoggedIn
            && let Err(err) = self
                .send_with(MsgType::Logout, |enc| admin::logout(enc, None))
                .await
        {
            debug!(session = %self.config.id, error = %err, "logout not sent");
        }
        self.close_transport(generation).await;
        info!(session = %self.config.id, "disconnected");
    }

    /// Resets both counters to zero and drops retained frames.
    ///
    /// # Errors
    /// `InvalidState` unless disconnected, `FixError::Store` if the reset
    /// cannot be persisted.
    pub async fn reset_sequences(&self) -> Result<(), FixError> {
        let status = self.status.get();
        if status != SessionStatus::Disconnected {
            return Err(SessionError::InvalidState {
                expected: SessionStatus::Disconnected.to_string(),
                current: status.to_string(),
            }
            .into());
        }
        self.sequences.reset();
        self.persist().await?;
        self.messages.reset().await?;
        info!(session = %self.config.id, "sequence numbers reset");
        Ok(())
    }

    async fn send_app<F>(&self, msg_type: MsgType, body: F) -> Result<u64, FixError>
    where
        F: FnOnce(&mut Encoder<'_>) + Send,
    {
        self.status.require_logged_in(&self.config.id)?;
        self.send_with(msg_type, body).await
    }

    /// Subscribes to two-sided quotes for `symbol` and returns the MDReqID.
    ///
    /// An already subscribed symbol returns its existing MDReqID without a new
    /// request.
    ///
    /// # Errors
    /// `NotLoggedIn`, or the send failure.
    pub async fn subscribe(&self, symbol: &str) -> Result<String, FixError> {
        self.status.require_logged_in(&self.config.id)?;
        let subscriptions = self.market_data.subscriptions();
        if let Some(existing) = subscriptions.id_for(symbol) {
            debug!(session = %self.config.id, symbol, md_req_id = %existing, "already subscribed");
            return Ok(existing);
        }

        let md_req_id = new_request_id("MD");
        subscriptions.insert(&md_req_id, symbol);
        let sent = self
            .send_with(MsgType::MarketDataRequest, |enc| {
                write_request(enc, &md_req_id, symbol, SubscriptionRequestType::SnapshotAndUpdates);
            })
            .await;
        if let Err(err) = sent {
            subscriptions.remove(&md_req_id);
            return Err(err);
        }
        info!(session = %self.config.id, symbol, md_req_id = %md_req_id, "subscribed");
        Ok(md_req_id)
    }

    /// Cancels a subscription by MDReqID.
    ///
    /// The mapping and cached quote are dropped before the request is sent.
    /// Returns false if the id was not subscribed.
    ///
    /// # Errors
    /// `NotLoggedIn`, or the send failure.
    pub async fn unsubscribe(&self, md_req_id: &str) -> Result<bool, FixError> {
        self.status.require_logged_in(&self.config.id)?;
        let Some(symbol) = self.market_data.unsubscribe(md_req_id) else {
            debug!(session = %self.config.id, md_req_id, "unsubscribe for unknown request ignored");
            return Ok(false);
        };
        self.send_with(MsgType::MarketDataRequest, |enc| {
            write_request(enc, md_req_id, &symbol, SubscriptionRequestType::Unsubscribe);
        })
        .await?;
        info!(session = %self.config.id, symbol = %symbol, md_req_id, "unsubscribed");
        Ok(true)
    }

    /// Cancels the subscription of `symbol`, if any.
    ///
    /// # Errors
    /// `NotLoggedIn`, or the send failure.
    pub async fn unsubscribe_symbol(&self, symbol: &str) -> Result<bool, FixError> {
        match self.market_data.subscriptions().id_for(symbol) {
            Some(md_req_id) => self.unsubscribe(&md_req_id).await,
            None => Ok(false),
        }
    }

    /// Latest quote for `symbol`.
    #[must_use]
    pub fn quote(&self, symbol: &str) -> Option<Quote> {
        self.market_data.quotes().get(symbol)
    }

    /// Sends a NewOrderSingle and returns its ClOrdID.
    ///
    /// # Errors
    /// `NotLoggedIn`, `Encode` for a limit order without price, or the send
    /// failure.
    pub async fn send_order(&self, order: &NewOrder) -> Result<String, FixError> {
        if order.ord_type != OrdType::Market && order.price.is_none() {
            return Err(EncodeError::MissingRequiredField { tag: tags::PRICE }.into());
        }
        let cl_ord_id = new_request_id("ORD");
        let account = self.config.trading_account.as_deref();
        self.send_app(MsgType::NewOrderSingle, |enc| {
            orders::write_new_order(enc, order, &cl_ord_id, account, Timestamp::now());
        })
        .await?;
        info!(
            session = %self.config.id,
            cl_ord_id = %cl_ord_id,
            symbol = %order.symbol,
            side = ?order.side,
            quantity = %order.quantity,
            "order sent"
        );
        Ok(cl_ord_id)
    }

    /// Sends an OrderCancelRequest and returns the new ClOrdID.
    ///
    /// # Errors
    /// `NotLoggedIn`, or the send failure.
    pub async fn cancel_order(
        &self,
        orig_cl_ord_id: &str,
        symbol: &str,
        side: Side,
    ) -> Result<String, FixError> {
        let cl_ord_id = new_request_id("CXL");
        let account = self.config.trading_account.as_deref();
        self.send_app(MsgType::OrderCancelRequest, |enc| {
            orders::write_cancel(enc, &cl_ord_id, orig_cl_ord_id, symbol, side, account, Timestamp::now());
        })
        .await?;
        info!(session = %self.config.id, cl_ord_id = %cl_ord_id, orig_cl_ord_id, "cancel sent");
        Ok(cl_ord_id)
    }

    /// Sends an OrderStatusRequest for `cl_ord_id`.
    ///
    /// # Errors
    /// `NotLoggedIn`, or the send failure.
    pub async fn request_order_status(
        &self,
        cl_ord_id: &str,
        symbol: &str,
        side: Side,
    ) -> Result<(), FixError> {
        let account = self.config.trading_account.as_deref();
        self.send_app(MsgType::OrderStatusRequest, |enc| {
            orders::write_order_status(enc, cl_ord_id, symbol, side, account);
        })
        .await?;
        Ok(())
    }

    /// Sends an OrderMassStatusRequest and returns its MassStatusReqID.
    ///
    /// # Errors
    /// `NotLoggedIn`, or the send failure.
    pub async fn request_mass_status(&self) -> Result<String, FixError> {
        let request_id = new_request_id("MSR");
        let account = self.config.trading_account.as_deref();
        self.send_app(MsgType::OrderMassStatusRequest, |enc| {
            orders::write_mass_status(enc, &request_id, account);
        })
        .await?;
        Ok(request_id)
    }

    /// Sends a RequestForPositions and returns its PosReqID.
    ///
    /// # Errors
    /// `NotLoggedIn`, or the send failure.
    pub async fn request_positions(&self, symbol: Option<&str>) -> Result<String, FixError> {
        let request_id = new_request_id("POS");
        let account = self.config.trading_account.as_deref();
        self.send_app(MsgType::RequestForPositions, |enc| {
            orders::write_positions_request(enc, &request_id, account, symbol, Timestamp::now());
        })
        .await?;
        Ok(request_id)
    }

    /// Sends a TradeCaptureReportRequest for `[from, to]` and returns its
    /// TradeRequestID.
    ///
    /// # Errors
    /// `NotLoggedIn`, or the send failure.
    pub async fn request_trade_captures(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<String, FixError> {
        let request_id = new_request_id("TRD");
        let account = self.config.trading_account.as_deref();
        self.send_app(MsgType::TradeCaptureReportRequest, |enc| {
            orders::write_trade_capture_request(enc, &request_id, account, from, to);
        })
        .await?;
        Ok(request_id)
    }

    /// Sends a SecurityListRequest and returns its SecurityReqID.
    ///
    /// # Errors
    /// `NotLoggedIn`, or the send failure.
    pub async fn request_security_list(&self) -> Result<String, FixError> {
        let request_id = new_request_id("SEC");
        self.send_app(MsgType::SecurityListRequest, |enc| {
            orders::write_security_list_request(enc, &request_id);
        })
        .await?;
        Ok(request_id)
    }

    /// Sends a SecurityDefinitionRequest for `symbol` and returns its
    /// SecurityReqID.
    ///
    /// # Errors
    /// `NotLoggedIn`, or the send failure.
    pub async fn request_security_definition(&self, symbol: &str) -> Result<String, FixError> {
        let request_id = new_request_id("SEC");
        self.send_app(MsgType::SecurityDefinitionRequest, |enc| {
            orders::write_security_definition_request(enc, &request_id, symbol);
        })
        .await?;
        Ok(request_id)
    }
}
