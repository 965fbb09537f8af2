/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # FixGate Engine
//!
//! Runtime of the FixGate gateway.
//!
//! This crate provides:
//! - **Gateway**: registry of counterparty sessions and the command surface
//! - **Session**: per-session read and heartbeat tasks with durable sequencing
//! - **Dispatch**: closed routing table from message type to handler
//! - **Market data**: subscription registry and two-sided quote cache
//! - **Orders**: trading and query request bodies
//! - **Events**: bounded, drop-counting event streams for consumers

pub mod builder;
pub mod dispatch;
pub mod events;
pub mod gateway;
pub mod marketdata;
pub mod orders;
pub mod session;

pub use builder::GatewayBuilder;
pub use dispatch::{Handler, handler_for};
pub use events::{
    EventBus, EventReceivers, EventStats, ExecutionReport, MarketDataReject, OrderStatusReport,
    OrderStatusSource, PositionReport, QueueStats, SecurityEvent, TradeCapture,
};
pub use gateway::{Gateway, SessionTask};
pub use marketdata::{MarketDataBook, Quote, QuoteCache, SubscriptionRegistry};
pub use orders::{NewOrder, new_request_id};
pub use session::{Session, SessionSnapshot};
