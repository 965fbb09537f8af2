/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Heartbeat and TestRequest management.
//!
//! The heartbeat task calls [`HeartbeatManager::poll`] once per interval and
//! acts on the returned [`HeartbeatAction`]:
//! - a TestRequest left unanswered for a full interval disconnects
//! - silence from the counterparty for interval + grace triggers a TestRequest
//! - otherwise a Heartbeat goes out
//!
//! Any inbound frame answers a pending TestRequest.

use fixgate_core::types::Timestamp;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Extra silence tolerated before a TestRequest is sent.
pub const TEST_REQUEST_GRACE: Duration = Duration::from_secs(1);

/// What the heartbeat task should do on this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatAction {
    /// Send a plain Heartbeat.
    SendHeartbeat,
    /// Ask the counterparty for a Heartbeat with a TestRequest carrying this id.
    SendTestRequest(String),
    /// The counterparty failed to answer a TestRequest in time.
    Disconnect {
        /// Time since the TestRequest was sent.
        elapsed: Duration,
    },
}

/// Manages heartbeat timing for a session.
#[derive(Debug)]
pub struct HeartbeatManager {
    interval: Duration,
    grace: Duration,
    last_sent: Instant,
    last_received: Instant,
    last_received_at: Option<Timestamp>,
    last_heartbeat_at: Option<Timestamp>,
    test_request_pending: Option<String>,
    test_request_sent_at: Option<Instant>,
}

impl HeartbeatManager {
    /// Creates a manager for the given interval.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            interval,
            grace: TEST_REQUEST_GRACE,
            last_sent: now,
            last_received: now,
            last_received_at: None,
            last_heartbeat_at: None,
            test_request_pending: None,
            test_request_sent_at: None,
        }
    }

    /// Overrides the TestRequest grace period.
    #[must_use]
    pub const fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Records that a frame was sent.
    #[inline]
    pub fn on_message_sent(&mut self) {
        self.last_sent = Instant::now();
    }

    /// Records that a frame was received and clears any pending TestRequest.
    ///
    /// `test_req_id` is the TestReqID carried by the frame, if any.
    pub fn on_message_received(&mut self, is_heartbeat: bool, test_req_id: Option<&str>) {
        self.last_received = Instant::now();
        self.last_received_at = Some(Timestamp::now());
        if is_heartbeat {
            self.last_heartbeat_at = self.last_received_at;
        }

        if let Some(pending) = self.test_request_pending.take() {
            self.test_request_sent_at = None;
            let echoed = is_heartbeat && test_req_id == Some(pending.as_str());
            debug!(test_req_id = %pending, echoed, "test request answered");
        }
    }

    /// Decides the action for this tick and records a TestRequest if one is due.
    pub fn poll(&mut self) -> HeartbeatAction {
        if let Some(sent_at) = self.test_request_sent_at {
            let elapsed = sent_at.elapsed();
            if elapsed >= self.interval {
                warn!(
                    test_req_id = self.test_request_pending.as_deref(),
                    elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    "test request unanswered"
                );
                return HeartbeatAction::Disconnect { elapsed };
            }
        }
        if self.test_request_pending.is_none()
            && self.last_received.elapsed() >= self.interval + self.grace
        {
            let id = generate_test_req_id();
            debug!(
                test_req_id = %id,
                silent_ms = u64::try_from(self.last_received.elapsed().as_millis()).unwrap_or(u64::MAX),
                "counterparty silent"
            );
            self.test_request_pending = Some(id.clone());
            self.test_request_sent_at = Some(Instant::now());
            return HeartbeatAction::SendTestRequest(id);
        }
        HeartbeatAction::SendHeartbeat
    }

    /// Returns the pending TestRequest ID, if any.
    #[must_use]
    pub fn pending_test_request(&self) -> Option<&str> {
        self.test_request_pending.as_deref()
    }

    /// Returns the wall-clock time of the last inbound frame.
    #[must_use]
    pub const fn last_received_at(&self) -> Option<Timestamp> {
        self.last_received_at
    }

    /// Returns the wall-clock time of the last inbound Heartbeat.
    #[must_use]
    pub const fn last_heartbeat_at(&self) -> Option<Timestamp> {
        self.last_heartbeat_at
    }

    /// Returns the time since the last frame was sent.
    #[must_use]
    pub fn time_since_last_sent(&self) -> Duration {
        self.last_sent.elapsed()
    }

    /// Returns the heartbeat interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Restarts all timers, as after a fresh Logon.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.last_sent = now;
        self.last_received = now;
        self.test_request_pending = None;
        self.test_request_sent_at = None;
    }
}

/// Generates a TestReqID from the current time in nanoseconds.
#[must_use]
pub fn generate_test_req_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("TEST{nanos}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_quiet_link_sends_heartbeat() {
        let mut mgr = HeartbeatManager::new(Duration::from_secs(30));
        assert_eq!(mgr.poll(), HeartbeatAction::SendHeartbeat);
        assert!(mgr.pending_test_request().is_none());
    }

    #[test]
    fn test_silence_triggers_test_request_then_disconnect() {
        let mut mgr =
            HeartbeatManager::new(Duration::from_millis(20)).with_grace(Duration::from_millis(5));
        sleep(Duration::from_millis(30));

        let HeartbeatAction::SendTestRequest(id) = mgr.poll() else {
            panic!("expected a TestRequest");
        };
        assert_eq!(mgr.pending_test_request(), Some(id.as_str()));
        assert_eq!(mgr.poll(), HeartbeatAction::SendHeartbeat);

        sleep(Duration::from_millis(25));
        assert!(matches!(mgr.poll(), HeartbeatAction::Disconnect { .. }));
    }

    #[test]
    fn test_matching_heartbeat_clears_test_request() {
        let mut mgr =
            HeartbeatManager::new(Duration::from_millis(20)).with_grace(Duration::from_millis(5));
        sleep(Duration::from_millis(30));
        let HeartbeatAction::SendTestRequest(id) = mgr.poll() else {
            panic!("expected a TestRequest");
        };

        mgr.on_message_received(true, Some(&id));
        assert!(mgr.pending_test_request().is_none());
        assert!(mgr.last_heartbeat_at().is_some());
        assert_eq!(mgr.poll(), HeartbeatAction::SendHeartbeat);
    }

    #[test]
    fn test_inbound_traffic_clears_pending_test_request() {
        let mut mgr =
            HeartbeatManager::new(Duration::from_millis(20)).with_grace(Duration::from_millis(5));
        sleep(Duration::from_millis(30));
        assert!(matches!(mgr.poll(), HeartbeatAction::SendTestRequest(_)));

        // an execution report answers as well as a Heartbeat would
        mgr.on_message_received(false, None);
        assert!(mgr.pending_test_request().is_none());
        assert!(mgr.last_heartbeat_at().is_none());
        assert_eq!(mgr.poll(), HeartbeatAction::SendHeartbeat);
    }

    #[test]
    fn test_generate_test_req_id() {
        let id = generate_test_req_id();
        assert!(id.starts_with("TEST"));
        assert!(id.len() > 4);
    }
}
