/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # FixGate
//!
//! A FIX 4.4 trading gateway for Rust.
//!
//! FixGate keeps one session per liquidity provider, each with durable
//! sequence numbers, gap recovery and heartbeat supervision, and exposes a
//! single command surface for market data subscriptions, orders and
//! account queries. Inbound business messages are published on bounded
//! event streams that count what they drop.
//!
//! ## Features
//!
//! - **Zero-copy parsing**: decoded fields borrow the received frame
//! - **Durable sequencing**: counters are persisted before a frame is written
//! - **Gap recovery**: ResendRequest on gaps, replay or gap-fill on request
//! - **Transports**: plain TCP, TLS, SOCKS5 and HTTP CONNECT proxies
//! - **Async**: built on Tokio, one read task and one heartbeat task per session
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fixgate::prelude::*;
//!
//! let gateway = GatewayBuilder::new()
//!     .add_session(
//!         SessionConfig::new("lp1", "fix.example.com", 9876,
//!             CompId::new("GW").unwrap(), CompId::new("LP").unwrap())
//!             .with_credentials("user", "secret"),
//!     )
//!     .build()
//!     .await?;
//! let task = gateway.connect("lp1")?;
//! let md_req_id = gateway.subscribe("lp1", "EURUSD").await?;
//! let quotes = gateway.events().quotes;
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`]: field types, message types and error definitions
//! - [`tagvalue`]: zero-copy tag=value encoding and decoding
//! - [`session`]: configuration, sequencing, heartbeats and recovery planning
//! - [`store`]: sequence persistence and outbound message retention
//! - [`transport`]: framing codec and connection establishment
//! - [`engine`]: the gateway, its sessions and event streams

pub mod core {
    //! Field types, message types and error definitions.
    pub use fixgate_core::*;
}

pub mod tagvalue {
    //! Zero-copy tag=value encoding and decoding.
    pub use fixgate_tagvalue::*;
}

pub mod session {
    //! Session configuration, sequencing, heartbeats and recovery planning.
    pub use fixgate_session::*;
}

pub mod store {
    //! Sequence persistence and outbound message retention.
    pub use fixgate_store::*;
}

pub mod transport {
    //! Framing codec and connection establishment.
    pub use fixgate_transport::*;
}

pub mod engine {
    //! The gateway, its sessions and event streams.
    pub use fixgate_engine::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Core types
    pub use fixgate_core::{
        CompId, ExecType, FixError, MsgType, OrdStatus, OrdType, RawMessage, Result,
        SessionError, Side, TimeInForce, Timestamp,
    };

    // Tag-value encoding
    pub use fixgate_tagvalue::{Encoder, decode};

    // Session
    pub use fixgate_session::{GatewayConfig, ProxyConfig, SessionConfig, SessionStatus, TooLowPolicy};

    // Store
    pub use fixgate_store::{FileSequenceStore, MemorySequenceStore, SequenceNumbers};

    // Engine
    pub use fixgate_engine::{
        EventReceivers, EventStats, ExecutionReport, Gateway, GatewayBuilder, NewOrder, Quote,
        SessionSnapshot, SessionTask,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_imports() {
        let _ts = Timestamp::now();
        let _side = Side::Buy;
        let config = SessionConfig::new(
            "lp1",
            "127.0.0.1",
            9876,
            CompId::new("GW").unwrap(),
            CompId::new("LP").unwrap(),
        );
        assert_eq!(config.begin_string, "FIX.4.4");
    }

    #[test]
    fn test_builder_reachable() {
        let builder = GatewayBuilder::new();
        assert!(builder.sessions().is_empty());
    }
}
