/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Typed outbound events and the bounded queues that carry them.
//!
//! Every stream is an independent `crossbeam-channel` bounded queue. Publishing
//! never blocks the read task: a full queue drops the event and bumps the
//! stream's drop counter, reported through [`EventStats`].

use crate::marketdata::Quote;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use fixgate_core::error::DecodeError;
use fixgate_core::message::RawMessage;
use fixgate_core::tags;
use fixgate_core::types::{ExecType, OrdStatus, OrdType, Side, Timestamp};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

fn owned(msg: &RawMessage<'_>, tag: u32) -> Option<String> {
    msg.field_str(tag).map(str::to_string)
}

fn decimal(msg: &RawMessage<'_>, tag: u32) -> Option<Decimal> {
    msg.get_decimal(tag).ok()
}

/// Execution report (35=8) for an order placed through the gateway.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionReport {
    /// Session the report arrived on.
    pub session_id: String,
    /// ClOrdID (11) of the originating request.
    pub cl_ord_id: Option<String>,
    /// Counterparty OrderID (37).
    pub order_id: Option<String>,
    /// ExecID (17).
    pub exec_id: Option<String>,
    /// ExecType (150).
    pub exec_type: ExecType,
    /// OrdStatus (39).
    pub ord_status: Option<OrdStatus>,
    /// Symbol (55).
    pub symbol: Option<String>,
    /// Side (54).
    pub side: Option<Side>,
    /// LastQty (32).
    pub last_qty: Option<Decimal>,
    /// LastPx (31).
    pub last_px: Option<Decimal>,
    /// CumQty (14).
    pub cum_qty: Option<Decimal>,
    /// LeavesQty (151).
    pub leaves_qty: Option<Decimal>,
    /// AvgPx (6).
    pub avg_px: Option<Decimal>,
    /// Text (58).
    pub text: Option<String>,
    /// Local receive time.
    pub received_at: Timestamp,
}

impl ExecutionReport {
    /// Extracts a report from a decoded 35=8 frame.
    ///
    /// # Errors
    /// `DecodeError` if ExecType is absent or not a known code.
    pub fn from_message(session_id: &str, msg: &RawMessage<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            session_id: session_id.to_string(),
            cl_ord_id: owned(msg, tags::CL_ORD_ID),
            order_id: owned(msg, tags::ORDER_ID),
            exec_id: owned(msg, tags::EXEC_ID),
            exec_type: msg.get_enum(tags::EXEC_TYPE)?,
            ord_status: msg.get_enum(tags::ORD_STATUS).ok(),
            symbol: owned(msg, tags::SYMBOL),
            side: msg.get_enum(tags::SIDE).ok(),
            last_qty: decimal(msg, tags::LAST_QTY),
            last_px: decimal(msg, tags::LAST_PX),
            cum_qty: decimal(msg, tags::CUM_QTY),
            leaves_qty: decimal(msg, tags::LEAVES_QTY),
            avg_px: decimal(msg, tags::AVG_PX),
            text: owned(msg, tags::TEXT),
            received_at: Timestamp::now(),
        })
    }
}

/// Where an [`OrderStatusReport`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderStatusSource {
    /// ExecutionReport with ExecType=I, answering a status request.
    StatusRequest,
    /// OrderCancelReject (35=9).
    CancelReject,
}

/// Current state of an order, as answered by the counterparty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderStatusReport {
    /// Session the report arrived on.
    pub session_id: String,
    /// What produced the report.
    pub source: OrderStatusSource,
    /// ClOrdID (11).
    pub cl_ord_id: Option<String>,
    /// OrigClOrdID (41), set on cancel rejects.
    pub orig_cl_ord_id: Option<String>,
    /// Counterparty OrderID (37).
    pub order_id: Option<String>,
    /// OrdStatus (39).
    pub ord_status: Option<OrdStatus>,
    /// OrdType (40).
    pub ord_type: Option<OrdType>,
    /// Symbol (55).
    pub symbol: Option<String>,
    /// Side (54).
    pub side: Option<Side>,
    /// Price (44).
    pub price: Option<Decimal>,
    /// OrderQty (38).
    pub order_qty: Option<Decimal>,
    /// CumQty (14).
    pub cum_qty: Option<Decimal>,
    /// LeavesQty (151).
    pub leaves_qty: Option<Decimal>,
    /// AvgPx (6).
    pub avg_px: Option<Decimal>,
    /// CxlRejReason (102), set on cancel rejects.
    pub reject_reason: Option<String>,
    /// Text (58).
    pub text: Option<String>,
    /// Local receive time.
    pub received_at: Timestamp,
}

impl OrderStatusReport {
    /// Extracts a status from an ExecutionReport or OrderCancelReject.
    #[must_use]
    pub fn from_message(session_id: &str, source: OrderStatusSource, msg: &RawMessage<'_>) -> Self {
        Self {
            session_id: session_id.to_string(),
            source,
            cl_ord_id: owned(msg, tags::CL_ORD_ID),
            orig_cl_ord_id: owned(msg, tags::ORIG_CL_ORD_ID),
            order_id: owned(msg, tags::ORDER_ID),
            ord_status: msg.get_enum(tags::ORD_STATUS).ok(),
            ord_type: msg.get_enum(tags::ORD_TYPE).ok(),
            symbol: owned(msg, tags::SYMBOL),
            side: msg.get_enum(tags::SIDE).ok(),
            price: decimal(msg, tags::PRICE),
            order_qty: decimal(msg, tags::ORDER_QTY),
            cum_qty: decimal(msg, tags::CUM_QTY),
            leaves_qty: decimal(msg, tags::LEAVES_QTY),
            avg_px: decimal(msg, tags::AVG_PX),
            reject_reason: owned(msg, tags::CXL_REJ_REASON),
            text: owned(msg, tags::TEXT),
            received_at: Timestamp::now(),
        }
    }
}

/// A rejected market data subscription (35=Y).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketDataReject {
    /// Session the reject arrived on.
    pub session_id: String,
    /// MDReqID (262) of the rejected request.
    pub md_req_id: String,
    /// Symbol the request was for, if it was still mapped.
    pub symbol: Option<String>,
    /// MDReqRejReason (281).
    pub reason: Option<String>,
    /// Text (58).
    pub text: Option<String>,
}

/// One position line (35=AP).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionReport {
    /// Session the report arrived on.
    pub session_id: String,
    /// PosReqID (710).
    pub pos_req_id: Option<String>,
    /// PosMaintRptID (721).
    pub report_id: Option<String>,
    /// Account (1).
    pub account: Option<String>,
    /// Symbol (55).
    pub symbol: Option<String>,
    /// Buy for a long position, Sell for a short one.
    pub side: Option<Side>,
    /// LongQty (704) or ShortQty (705), whichever is non-zero.
    pub quantity: Decimal,
    /// SettlPrice (730).
    pub settl_price: Option<Decimal>,
    /// Local receive time.
    pub received_at: Timestamp,
}

impl PositionReport {
    /// Extracts a position; `None` for a "no positions" answer (728=2).
    #[must_use]
    pub fn from_message(session_id: &str, msg: &RawMessage<'_>) -> Option<Self> {
        if msg.field_str(tags::POS_REQ_RESULT) == Some("2") {
            return None;
        }
        let long = decimal(msg, tags::LONG_QTY).filter(|q| !q.is_zero());
        let short = decimal(msg, tags::SHORT_QTY).filter(|q| !q.is_zero());
        let (side, quantity) = match (long, short) {
            (Some(q), _) => (Some(Side::Buy), q),
            (None, Some(q)) => (Some(Side::Sell), q),
            (None, None) => (None, Decimal::ZERO),
        };
        Some(Self {
            session_id: session_id.to_string(),
            pos_req_id: owned(msg, tags::POS_REQ_ID),
            report_id: owned(msg, tags::POS_MAINT_RPT_ID),
            account: owned(msg, tags::ACCOUNT),
            symbol: owned(msg, tags::SYMBOL),
            side,
            quantity,
            settl_price: decimal(msg, tags::SETTL_PRICE),
            received_at: Timestamp::now(),
        })
    }
}

/// A historical trade (35=AE).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeCapture {
    /// Session the report arrived on.
    pub session_id: String,
    /// TradeRequestID (568).
    pub trade_request_id: Option<String>,
    /// ExecID (17).
    pub exec_id: Option<String>,
    /// OrderID (37).
    pub order_id: Option<String>,
    /// ClOrdID (11).
    pub cl_ord_id: Option<String>,
    /// Symbol (55).
    pub symbol: Option<String>,
    /// Side (54).
    pub side: Option<Side>,
    /// LastQty (32).
    pub quantity: Option<Decimal>,
    /// LastPx (31).
    pub price: Option<Decimal>,
    /// Account (1).
    pub account: Option<String>,
    /// TradeDate (75), `YYYYMMDD`.
    pub trade_date: Option<String>,
    /// TransactTime (60), when present and parseable.
    pub transact_time: Option<Timestamp>,
    /// Local receive time.
    pub received_at: Timestamp,
}

impl TradeCapture {
    /// Extracts a trade from a decoded 35=AE frame.
    #[must_use]
    pub fn from_message(session_id: &str, msg: &RawMessage<'_>) -> Self {
        Self {
            session_id: session_id.to_string(),
            trade_request_id: owned(msg, tags::TRADE_REQUEST_ID),
            exec_id: owned(msg, tags::EXEC_ID),
            order_id: owned(msg, tags::ORDER_ID),
            cl_ord_id: owned(msg, tags::CL_ORD_ID),
            symbol: owned(msg, tags::SYMBOL),
            side: msg.get_enum(tags::SIDE).ok(),
            quantity: decimal(msg, tags::LAST_QTY),
            price: decimal(msg, tags::LAST_PX),
            account: owned(msg, tags::ACCOUNT),
            trade_date: owned(msg, tags::TRADE_DATE),
            transact_time: msg.get_timestamp(tags::TRANSACT_TIME).ok(),
            received_at: Timestamp::now(),
        }
    }
}

/// Instrument reference data (35=d or 35=y).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityEvent {
    /// Session the answer arrived on.
    pub session_id: String,
    /// SecurityReqID (320).
    pub security_req_id: Option<String>,
    /// Symbols named by the answer.
    pub symbols: Vec<String>,
    /// Text (58).
    pub text: Option<String>,
}

impl SecurityEvent {
    /// Extracts the symbols of a SecurityDefinition or SecurityList.
    #[must_use]
    pub fn from_message(session_id: &str, msg: &RawMessage<'_>) -> Self {
        let symbols = msg
            .fields()
            .iter()
            .filter(|f| f.tag == tags::SYMBOL)
            .filter_map(|f| f.as_str().ok())
            .map(str::to_string)
            .collect();
        Self {
            session_id: session_id.to_string(),
            security_req_id: owned(msg, tags::SECURITY_REQ_ID),
            symbols,
            text: owned(msg, tags::TEXT),
        }
    }
}

/// Publish/drop counters of one stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Events accepted by the queue.
    pub published: u64,
    /// Events dropped because the queue was full.
    pub dropped: u64,
    /// Events waiting to be drained.
    pub pending: usize,
}

/// A bounded, non-blocking event queue with drop accounting.
#[derive(Debug)]
pub struct EventQueue<T> {
    name: &'static str,
    tx: Sender<T>,
    rx: Receiver<T>,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl<T> EventQueue<T> {
    /// Creates a queue holding at most `capacity` undrained events.
    #[must_use]
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        Self {
            name,
            tx,
            rx,
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Enqueues `event`, dropping it if the queue is full.
    ///
    /// Returns true if the event was accepted.
    pub fn publish(&self, event: T) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => {
                self.published.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(stream = self.name, dropped, "event queue full, dropping event");
                false
            }
        }
    }

    /// Returns a receiver; all receivers share the same queue.
    #[must_use]
    pub fn receiver(&self) -> Receiver<T> {
        self.rx.clone()
    }

    /// Returns the stream's counters.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            published: self.published.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            pending: self.rx.len(),
        }
    }
}

/// Counters for every event stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventStats {
    /// Execution reports.
    pub executions: QueueStats,
    /// Quotes.
    pub quotes: QueueStats,
    /// Market data rejects.
    pub md_rejects: QueueStats,
    /// Position reports.
    pub positions: QueueStats,
    /// Trade captures.
    pub trade_captures: QueueStats,
    /// Order statuses.
    pub order_statuses: QueueStats,
    /// Security definitions and lists.
    pub securities: QueueStats,
}

/// The gateway's outbound event streams, shared by all sessions.
#[derive(Debug)]
pub struct EventBus {
    /// Execution reports.
    pub executions: EventQueue<ExecutionReport>,
    /// Full two-sided quotes after every snapshot or incremental.
    pub quotes: EventQueue<Quote>,
    /// Market data rejects.
    pub md_rejects: EventQueue<MarketDataReject>,
    /// Position reports.
    pub positions: EventQueue<PositionReport>,
    /// Trade captures.
    pub trade_captures: EventQueue<TradeCapture>,
    /// Order statuses.
    pub order_statuses: EventQueue<OrderStatusReport>,
    /// Security definitions and lists.
    pub securities: EventQueue<SecurityEvent>,
}

impl EventBus {
    /// Creates every stream with the same capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            executions: EventQueue::new("executions", capacity),
            quotes: EventQueue::new("quotes", capacity),
            md_rejects: EventQueue::new("md_rejects", capacity),
            positions: EventQueue::new("positions", capacity),
            trade_captures: EventQueue::new("trade_captures", capacity),
            order_statuses: EventQueue::new("order_statuses", capacity),
            securities: EventQueue::new("securities", capacity),
        }
    }

    /// Returns receivers for every stream.
    #[must_use]
    pub fn receivers(&self) -> EventReceivers {
        EventReceivers {
            executions: self.executions.receiver(),
            quotes: self.quotes.receiver(),
            md_rejects: self.md_rejects.receiver(),
            positions: self.positions.receiver(),
            trade_captures: self.trade_captures.receiver(),
            order_statuses: self.order_statuses.receiver(),
            securities: self.securities.receiver(),
        }
    }

    /// Snapshot of every stream's counters.
    #[must_use]
    pub fn stats(&self) -> EventStats {
        EventStats {
            executions: self.executions.stats(),
            quotes: self.quotes.stats(),
            md_rejects: self.md_rejects.stats(),
            positions: self.positions.stats(),
            trade_captures: self.trade_captures.stats(),
            order_statuses: self.order_statuses.stats(),
            securities: self.securities.stats(),
        }
    }
}

/// Independently drainable receiving ends of the event streams.
#[derive(Debug, Clone)]
pub struct EventReceivers {
    /// Execution reports.
    pub executions: Receiver<ExecutionReport>,
    /// Quotes.
    pub quotes: Receiver<Quote>,
    /// Market data rejects.
    pub md_rejects: Receiver<MarketDataReject>,
    /// Position reports.
    pub positions: Receiver<PositionReport>,
    /// Trade captures.
    pub trade_captures: Receiver<TradeCapture>,
    /// Order statuses.
    pub order_statuses: Receiver<OrderStatusReport>,
    /// Security definitions and lists.
    pub securities: Receiver<SecurityEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixgate_tagvalue::decode;

    fn frame(body: &str) -> Vec<u8> {
        let head = format!("8=FIX.4.4\x019={}\x01", body.len());
        let sum = head
            .bytes()
            .chain(body.bytes())
            .fold(0u8, |acc, b| acc.wrapping_add(b));
        format!("{head}{body}10={sum:03}\x01").into_bytes()
    }

    #[test]
    fn test_queue_drops_when_full() {
        let queue = EventQueue::new("test", 2);
        assert!(queue.publish(1));
        assert!(queue.publish(2));
        assert!(!queue.publish(3));

        let stats = queue.stats();
        assert_eq!(stats.published, 2);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.pending, 2);

        let rx = queue.receiver();
        assert_eq!(rx.try_recv().unwrap(), 1);
        assert!(queue.publish(4));
        assert_eq!(queue.stats().pending, 2);
    }

    #[test]
    fn test_execution_report_fields() {
        let bytes = frame(
            "35=8\x0134=7\x0111=GW-1\x0137=LP-9\x0117=E1\x01150=F\x0139=2\x0155=EURUSD\x0154=1\x0132=100000\x0131=1.10015\x01",
        );
        let msg = decode(&bytes).unwrap();
        let report = ExecutionReport::from_message("lp", &msg).unwrap();
        assert_eq!(report.exec_type, ExecType::Trade);
        assert_eq!(report.ord_status, Some(OrdStatus::Filled));
        assert_eq!(report.side, Some(Side::Buy));
        assert_eq!(report.cl_ord_id.as_deref(), Some("GW-1"));
        assert_eq!(report.last_px, Some(Decimal::new(110_015, 5)));
        assert_eq!(report.leaves_qty, None);
    }

    #[test]
    fn test_execution_report_requires_exec_type() {
        let bytes = frame("35=8\x0134=7\x0111=GW-1\x01");
        let msg = decode(&bytes).unwrap();
        assert!(ExecutionReport::from_message("lp", &msg).is_err());
    }

    #[test]
    fn test_position_report_sides() {
        let short = frame("35=AP\x0134=3\x01710=POS-1\x0155=GBPUSD\x01704=0\x01705=2500\x01730=1.27\x01");
        let msg = decode(&short).unwrap();
        let report = PositionReport::from_message("lp", &msg).unwrap();
        assert_eq!(report.side, Some(Side::Sell));
        assert_eq!(report.quantity, Decimal::new(2500, 0));

        let none = frame("35=AP\x0134=4\x01710=POS-1\x01728=2\x01");
        let msg = decode(&none).unwrap();
        assert!(PositionReport::from_message("lp", &msg).is_none());
    }

    #[test]
    fn test_security_list_symbols() {
        let bytes = frame("35=y\x0134=2\x01320=SEC-1\x01146=2\x0155=EURUSD\x0155=USDJPY\x01");
        let msg = decode(&bytes).unwrap();
        let event = SecurityEvent::from_message("lp", &msg);
        assert_eq!(event.symbols, vec!["EURUSD", "USDJPY"]);
        assert_eq!(event.security_req_id.as_deref(), Some("SEC-1"));
    }
}
