/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Inbound routing table.
//!
//! Every [`MsgType`] maps to exactly one [`Handler`]; the match is exhaustive,
//! so adding a message type fails to compile until it is routed.

use fixgate_core::message::MsgType;

/// What the session does with an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handler {
    /// Logon after the handshake; logged and ignored.
    Logon,
    /// Liveness only.
    Heartbeat,
    /// Answer with a Heartbeat echoing TestReqID.
    TestRequest,
    /// Replay or gap-fill the requested range.
    ResendRequest,
    /// Move the inbound sequence forward.
    SequenceReset,
    /// Acknowledge and stop the session.
    Logout,
    /// Session-level Reject (3).
    SessionReject,
    /// BusinessMessageReject (j).
    BusinessReject,
    /// ExecutionReport (8).
    ExecutionReport,
    /// OrderCancelReject (9).
    CancelReject,
    /// Full refresh (W).
    MarketDataSnapshot,
    /// Incremental refresh (X).
    MarketDataIncremental,
    /// MarketDataRequestReject (Y).
    MarketDataReject,
    /// RequestForPositionsAck (AO).
    PositionAck,
    /// PositionReport (AP).
    PositionReport,
    /// TradeCaptureReportRequestAck (AQ).
    TradeCaptureAck,
    /// TradeCaptureReport (AE).
    TradeCapture,
    /// SecurityDefinition (d) or SecurityList (y).
    Security,
    /// A type this gateway only ever sends.
    OutboundOnly,
    /// Not a FIX 4.4 type the gateway knows.
    Unknown,
}

impl Handler {
    /// SequenceReset carries its own numbering and bypasses the inbound check.
    #[must_use]
    pub const fn validates_sequence(self) -> bool {
        !matches!(self, Self::SequenceReset)
    }
}

/// Routes a message type.
#[must_use]
pub fn handler_for(msg_type: &MsgType) -> Handler {
    match msg_type {
        MsgType::Logon => Handler::Logon,
        MsgType::Heartbeat => Handler::Heartbeat,
        MsgType::TestRequest => Handler::TestRequest,
        MsgType::ResendRequest => Handler::ResendRequest,
        MsgType::SequenceReset => Handler::SequenceReset,
        MsgType::Logout => Handler::Logout,
        MsgType::Reject => Handler::SessionReject,
        MsgType::BusinessMessageReject => Handler::BusinessReject,
        MsgType::ExecutionReport => Handler::ExecutionReport,
        MsgType::OrderCancelReject => Handler::CancelReject,
        MsgType::MarketDataSnapshot => Handler::MarketDataSnapshot,
        MsgType::MarketDataIncrementalRefresh => Handler::MarketDataIncremental,
        MsgType::MarketDataRequestReject => Handler::MarketDataReject,
        MsgType::RequestForPositionsAck => Handler::PositionAck,
        MsgType::PositionReport => Handler::PositionReport,
        MsgType::TradeCaptureReportRequestAck => Handler::TradeCaptureAck,
        MsgType::TradeCaptureReport => Handler::TradeCapture,
        MsgType::SecurityDefinition | MsgType::SecurityList => Handler::Security,
        MsgType::NewOrderSingle
        | MsgType::OrderCancelRequest
        | MsgType::OrderStatusRequest
        | MsgType::OrderMassStatusRequest
        | MsgType::MarketDataRequest
        | MsgType::RequestForPositions
        | MsgType::TradeCaptureReportRequest
        | MsgType::SecurityDefinitionRequest
        | MsgType::SecurityListRequest => Handler::OutboundOnly,
        MsgType::Unknown(_) => Handler::Unknown,
    }
}
