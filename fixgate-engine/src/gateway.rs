/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Multi-session gateway.
//!
//! The registry lock only guards lookups: every operation clones the
//! session's `Arc` and releases the lock before touching the network.

use crate::events::{EventBus, EventReceivers, EventStats};
use crate::marketdata::Quote;
use crate::orders::NewOrder;
use crate::session::{Session, SessionSnapshot};
use fixgate_core::error::{FixError, SessionError};
use fixgate_core::types::{Side, Timestamp};
use fixgate_session::GatewayConfig;
use fixgate_store::{FileSequenceStore, SequenceStore};
use fixgate_transport::BoxedStream;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Handle of a running session task.
pub type SessionTask = JoinHandle<Result<(), FixError>>;

/// Registry of counterparty sessions sharing one set of event streams.
#[derive(Debug)]
pub struct Gateway {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    events: Arc<EventBus>,
}

impl Gateway {
    /// Builds a gateway with file-backed sequence numbers under
    /// `config.store_dir`.
    ///
    /// # Errors
    /// `FixError::Config` for an invalid configuration, `FixError::Store` if
    /// persisted sequence numbers cannot be read.
    pub async fn new(config: GatewayConfig) -> Result<Self, FixError> {
        let store_dir = config.store_dir.clone();
        Self::with_sequence_stores(config, |id| {
            Arc::new(FileSequenceStore::new(&store_dir, id)) as Arc<dyn SequenceStore>
        })
        .await
    }

    pub(crate) async fn with_sequence_stores<F>(
        config: GatewayConfig,
        mut store_for: F,
    ) -> Result<Self, FixError>
    where
        F: FnMut(&str) -> Arc<dyn SequenceStore>,
    {
        config.validate()?;
        let events = Arc::new(EventBus::new(config.event_queue_capacity));
        let mut sessions = HashMap::with_capacity(config.sessions.len());
        for session_config in config.sessions {
            let store = store_for(&session_config.id);
            let session = Session::open(session_config, store, Arc::clone(&events)).await?;
            sessions.insert(session.id().to_string(), session);
        }
        info!(sessions = sessions.len(), "gateway ready");
        Ok(Self {
            sessions: RwLock::new(sessions),
            events,
        })
    }

    /// Looks up a session.
    ///
    /// # Errors
    /// `UnknownSession` if no session has this id.
    pub fn session(&self, session_id: &str) -> Result<Arc<Session>, FixError> {
        self.sessions
            .read()
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()).into())
    }

    /// Configured session ids, sorted.
    #[must_use]
    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn all_sessions(&self) -> Vec<Arc<Session>> {
        let mut sessions: Vec<Arc<Session>> = self.sessions.read().values().cloned().collect();
        sessions.sort_by(|a, b| a.id().cmp(b.id()));
        sessions
    }

    /// Starts connecting a session; the task ends when the session does.
    ///
    /// # Errors
    /// `UnknownSession`, or `InvalidState` unless the session is disconnected.
    pub fn connect(&self, session_id: &str) -> Result<SessionTask, FixError> {
        self.session(session_id)?.connect()
    }

    /// Runs a session over a caller-provided stream.
    ///
    /// # Errors
    /// `UnknownSession`, or `InvalidState` unless the session is disconnected.
    pub fn connect_with(&self, session_id: &str, stream: BoxedStream) -> Result<SessionTask, FixError> {
        self.session(session_id)?.connect_with(stream)
    }

    /// Starts every disconnected session.
    #[must_use]
    pub fn connect_all(&self) -> Vec<(String, Result<SessionTask, FixError>)> {
        self.all_sessions()
            .into_iter()
            .map(|session| (session.id().to_string(), session.connect()))
            .collect()
    }

    /// Logs out and closes a session. Disconnecting twice is harmless.
    ///
    /// # Errors
    /// `UnknownSession`.
    pub async fn disconnect(&self, session_id: &str) -> Result<(), FixError> {
        self.session(session_id)?.disconnect().await;
        Ok(())
    }

    /// Disconnects every session.
    pub async fn disconnect_all(&self) {
        for session in self.all_sessions() {
            session.disconnect().await;
        }
    }

    /// Snapshots of every session, sorted by id.
    #[must_use]
    pub fn status(&self) -> Vec<SessionSnapshot> {
        self.all_sessions().iter().map(|s| s.snapshot()).collect()
    }

    /// Snapshot of one session.
    ///
    /// # Errors
    /// `UnknownSession`.
    pub fn session_status(&self, session_id: &str) -> Result<SessionSnapshot, FixError> {
        Ok(self.session(session_id)?.snapshot())
    }

    /// Subscribes `symbol` on a session and returns the MDReqID.
    ///
    /// # Errors
    /// `UnknownSession`, `NotLoggedIn`, or the send failure.
    pub async fn subscribe(&self, session_id: &str, symbol: &str) -> Result<String, FixError> {
        self.session(session_id)?.subscribe(symbol).await
    }

    /// Cancels a subscription by MDReqID; false if it was not active.
    ///
    /// # Errors
    /// `UnknownSession`, `NotLoggedIn`, or the send failure.
    pub async fn unsubscribe(&self, session_id: &str, md_req_id: &str) -> Result<bool, FixError> {
        self.session(session_id)?.unsubscribe(md_req_id).await
    }

    /// Cancels the subscription of `symbol`; false if it was not subscribed.
    ///
    /// # Errors
    /// `UnknownSession`, `NotLoggedIn`, or the send failure.
    pub async fn unsubscribe_symbol(&self, session_id: &str, symbol: &str) -> Result<bool, FixError> {
        self.session(session_id)?.unsubscribe_symbol(symbol).await
    }

    /// Whether `symbol` has an active subscription on the session.
    ///
    /// # Errors
    /// `UnknownSession`.
    pub fn is_symbol_subscribed(&self, session_id: &str, symbol: &str) -> Result<bool, FixError> {
        Ok(self
            .session(session_id)?
            .market_data()
            .subscriptions()
            .is_subscribed(symbol))
    }

    /// Subscribed symbols of the session, sorted.
    ///
    /// # Errors
    /// `UnknownSession`.
    pub fn subscribed_symbols(&self, session_id: &str) -> Result<Vec<String>, FixError> {
        Ok(self.session(session_id)?.market_data().subscriptions().symbols())
    }

    /// Latest quote for `symbol` on the session.
    ///
    /// # Errors
    /// `UnknownSession`.
    pub fn quote(&self, session_id: &str, symbol: &str) -> Result<Option<Quote>, FixError> {
        Ok(self.session(session_id)?.quote(symbol))
    }

    /// Every cached quote of the session, sorted by symbol.
    ///
    /// # Errors
    /// `UnknownSession`.
    pub fn quotes(&self, session_id: &str) -> Result<Vec<Quote>, FixError> {
        Ok(self.session(session_id)?.market_data().quotes().all())
    }

    /// Sends an order and returns its ClOrdID.
    ///
    /// # Errors
    /// `UnknownSession`, `NotLoggedIn`, or the send failure.
    pub async fn send_order(&self, session_id: &str, order: &NewOrder) -> Result<String, FixError> {
        self.session(session_id)?.send_order(order).await
    }

    /// Sends a market order and returns its ClOrdID.
    ///
    /// # Errors
    /// `UnknownSession`, `NotLoggedIn`, or the send failure.
    pub async fn send_market_order(
        &self,
        session_id: &str,
        symbol: &str,
        side: Side,
        quantity: Decimal,
    ) -> Result<String, FixError> {
        let order = NewOrder::market(symbol, side, quantity);
        self.send_order(session_id, &order).await
    }

    /// Cancels an order and returns the cancel's ClOrdID.
    ///
    /// # Errors
    /// `UnknownSession`, `NotLoggedIn`, or the send failure.
    pub async fn cancel_order(
        &self,
        session_id: &str,
        orig_cl_ord_id: &str,
        symbol: &str,
        side: Side,
    ) -> Result<String, FixError> {
        self.session(session_id)?
            .cancel_order(orig_cl_ord_id, symbol, side)
            .await
    }

    /// Requests the status of one order.
    ///
    /// # Errors
    /// `UnknownSession`, `NotLoggedIn`, or the send failure.
    pub async fn request_order_status(
        &self,
        session_id: &str,
        cl_ord_id: &str,
        symbol: &str,
        side: Side,
    ) -> Result<(), FixError> {
        self.session(session_id)?
            .request_order_status(cl_ord_id, symbol, side)
            .await
    }

    /// Requests the status of every order; returns the MassStatusReqID.
    ///
    /// # Errors
    /// `UnknownSession`, `NotLoggedIn`, or the send failure.
    pub async fn request_mass_status(&self, session_id: &str) -> Result<String, FixError> {
        self.session(session_id)?.request_mass_status().await
    }

    /// Requests open positions, optionally for one symbol; returns the PosReqID.
    ///
    /// # Errors
    /// `UnknownSession`, `NotLoggedIn`, or the send failure.
    pub async fn request_positions(
        &self,
        session_id: &str,
        symbol: Option<&str>,
    ) -> Result<String, FixError> {
        self.session(session_id)?.request_positions(symbol).await
    }

    /// Requests trades in `[from, to]`; returns the TradeRequestID.
    ///
    /// # Errors
    /// `UnknownSession`, `NotLoggedIn`, or the send failure.
    pub async fn request_trade_captures(
        &self,
        session_id: &str,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<String, FixError> {
        self.session(session_id)?.request_trade_captures(from, to).await
    }

    /// Requests the security list; returns the SecurityReqID.
    ///
    /// # Errors
    /// `UnknownSession`, `NotLoggedIn`, or the send failure.
    pub async fn request_security_list(&self, session_id: &str) -> Result<String, FixError> {
        self.session(session_id)?.request_security_list().await
    }

    /// Requests the definition of `symbol`; returns the SecurityReqID.
    ///
    /// # Errors
    /// `UnknownSession`, `NotLoggedIn`, or the send failure.
    pub async fn request_security_definition(
        &self,
        session_id: &str,
        symbol: &str,
    ) -> Result<String, FixError> {
        self.session(session_id)?
            .request_security_definition(symbol)
            .await
    }

    /// Receivers for every event stream.
    #[must_use]
    pub fn events(&self) -> EventReceivers {
        self.events.receivers()
    }

    /// Published and dropped counters per event stream.
    #[must_use]
    pub fn event_stats(&self) -> EventStats {
        self.events.stats()
    }

    /// Resets a disconnected session's sequence numbers to zero.
    ///
    /// # Errors
    /// `UnknownSession`, `InvalidState` unless disconnected, or the
    /// persistence failure.
    pub async fn reset_sequences(&self, session_id: &str) -> Result<(), FixError> {
        self.session(session_id)?.reset_sequences().await
    }
}
