/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # FixGate Session
//!
//! FIX 4.4 session-layer protocol logic, free of I/O.
//!
//! This crate provides:
//! - **Configuration**: gateway and per-session settings loaded from JSON
//! - **Status machine**: `Disconnected -> Connecting -> Connected -> LoggedIn`
//! - **Sequence management**: counters and inbound gap/duplicate classification
//! - **Heartbeat handling**: Heartbeat/TestRequest timing
//! - **Recovery**: resend planning, PossDup rewriting and gap-fill frames
//! - **Admin messages**: body writers for Logon, Logout, Heartbeat and friends

pub mod admin;
pub mod config;
pub mod heartbeat;
pub mod recovery;
pub mod sequence;
pub mod state;

pub use config::{GatewayConfig, ProxyConfig, SessionConfig, TooLowPolicy};
pub use heartbeat::{HeartbeatAction, HeartbeatManager};
pub use recovery::{ResendStep, gap_fill, plan_resend, rewrite_for_resend};
pub use sequence::{SequenceCheck, SequenceManager};
pub use state::{SessionStatus, StatusTracker};
