/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Market data subscriptions and the per-session quote cache.
//!
//! [`SubscriptionRegistry`] keeps the MDReqID ↔ symbol mapping, at most one
//! active id per symbol. [`QuoteCache`] holds the last full quote per symbol.
//! [`MarketDataBook`] composes the two and applies W/X/Y messages:
//! snapshots replace a quote, incrementals merge only the sides they name,
//! rejects drop the mapping.

use crate::events::MarketDataReject;
use fixgate_core::message::{Group, RawMessage};
use fixgate_core::tags;
use fixgate_core::types::{MdEntryType, MdUpdateAction, SubscriptionRequestType, Timestamp};
use fixgate_tagvalue::Encoder;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Top-of-book quote for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    /// Session the quote came from.
    pub session_id: String,
    /// Instrument symbol.
    pub symbol: String,
    /// MDReqID of the subscription that produced it.
    pub md_req_id: Option<String>,
    /// Best bid price.
    pub bid: Decimal,
    /// Best ask price.
    pub ask: Decimal,
    /// Size at the bid.
    pub bid_size: Decimal,
    /// Size at the ask.
    pub ask_size: Decimal,
    /// Local time of the last update.
    pub updated_at: Timestamp,
}

impl Quote {
    /// A zero-valued quote, the starting point for incrementals.
    #[must_use]
    pub fn empty(session_id: &str, symbol: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            symbol: symbol.to_string(),
            md_req_id: None,
            bid: Decimal::ZERO,
            ask: Decimal::ZERO,
            bid_size: Decimal::ZERO,
            ask_size: Decimal::ZERO,
            updated_at: Timestamp::now(),
        }
    }

    fn set_side(&mut self, side: MdEntryType, price: Decimal, size: Decimal) {
        match side {
            MdEntryType::Bid => {
                self.bid = price;
                self.bid_size = size;
            }
            MdEntryType::Offer => {
                self.ask = price;
                self.ask_size = size;
            }
            MdEntryType::Trade => {}
        }
    }
}

#[derive(Debug, Default)]
struct Mappings {
    by_id: HashMap<String, String>,
    by_symbol: HashMap<String, String>,
}

/// Bidirectional MDReqID ↔ symbol mapping.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    inner: RwLock<Mappings>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `md_req_id` for `symbol`, replacing any previous mapping for
    /// the symbol. Returns the replaced id.
    pub fn insert(&self, md_req_id: &str, symbol: &str) -> Option<String> {
        let mut inner = self.inner.write();
        let previous = inner
            .by_symbol
            .insert(symbol.to_string(), md_req_id.to_string());
        if let Some(old) = &previous {
            inner.by_id.remove(old);
        }
        inner
            .by_id
            .insert(md_req_id.to_string(), symbol.to_string());
        previous
    }

    /// Removes the mapping for `md_req_id`, returning its symbol.
    pub fn remove(&self, md_req_id: &str) -> Option<String> {
        let mut inner = self.inner.write();
        let symbol = inner.by_id.remove(md_req_id)?;
        if inner.by_symbol.get(&symbol).is_some_and(|id| id == md_req_id) {
            inner.by_symbol.remove(&symbol);
        }
        Some(symbol)
    }

    /// Returns the symbol subscribed under `md_req_id`.
    #[must_use]
    pub fn symbol_for(&self, md_req_id: &str) -> Option<String> {
        self.inner.read().by_id.get(md_req_id).cloned()
    }

    /// Returns the active MDReqID for `symbol`.
    #[must_use]
    pub fn id_for(&self, symbol: &str) -> Option<String> {
        self.inner.read().by_symbol.get(symbol).cloned()
    }

    /// Returns true if `symbol` has an active subscription.
    #[must_use]
    pub fn is_subscribed(&self, symbol: &str) -> bool {
        self.inner.read().by_symbol.contains_key(symbol)
    }

    /// Returns the subscribed symbols, sorted.
    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.inner.read().by_symbol.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Number of active subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    /// Returns true if nothing is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Last known quote per symbol.
#[derive(Debug, Default)]
pub struct QuoteCache {
    quotes: RwLock<HashMap<String, Quote>>,
}

impl QuoteCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached quote for `symbol`.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<Quote> {
        self.quotes.read().get(symbol).cloned()
    }

    /// Returns every cached quote, ordered by symbol.
    #[must_use]
    pub fn all(&self) -> Vec<Quote> {
        let mut quotes: Vec<Quote> = self.quotes.read().values().cloned().collect();
        quotes.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        quotes
    }

    /// Stores `quote`, replacing whatever was cached for its symbol.
    pub fn replace(&self, quote: Quote) {
        self.quotes.write().insert(quote.symbol.clone(), quote);
    }

    /// Overwrites one side of the cached quote (zero-valued if absent) and
    /// returns the resulting full quote.
    pub fn merge_side(
        &self,
        session_id: &str,
        symbol: &str,
        md_req_id: Option<&str>,
        side: MdEntryType,
        price: Decimal,
        size: Decimal,
    ) -> Quote {
        let mut quotes = self.quotes.write();
        let quote = quotes
            .entry(symbol.to_string())
            .or_insert_with(|| Quote::empty(session_id, symbol));
        quote.set_side(side, price, size);
        if let Some(id) = md_req_id {
            quote.md_req_id = Some(id.to_string());
        }
        quote.updated_at = Timestamp::now();
        quote.clone()
    }

    /// Drops the quote for `symbol`.
    pub fn remove(&self, symbol: &str) -> Option<Quote> {
        self.quotes.write().remove(symbol)
    }
}

/// Writes a MarketDataRequest (V) body for top-of-book bid and offer.
pub fn write_request(
    enc: &mut Encoder<'_>,
    md_req_id: &str,
    symbol: &str,
    request_type: SubscriptionRequestType,
) {
    enc.put_str(tags::MD_REQ_ID, md_req_id);
    enc.put_enum(tags::SUBSCRIPTION_REQUEST_TYPE, request_type);
    enc.put_uint(tags::MARKET_DEPTH, 1);
    if request_type == SubscriptionRequestType::SnapshotAndUpdates {
        // incremental refresh
        enc.put_uint(tags::MD_UPDATE_TYPE, 1);
    }
    enc.put_uint(tags::NO_MD_ENTRY_TYPES, 2);
    enc.put_enum(tags::MD_ENTRY_TYPE, MdEntryType::Bid);
    enc.put_enum(tags::MD_ENTRY_TYPE, MdEntryType::Offer);
    enc.put_uint(tags::NO_RELATED_SYM, 1);
    enc.put_str(tags::SYMBOL, symbol);
}

/// Subscriptions and quotes of one session.
#[derive(Debug, Default)]
pub struct MarketDataBook {
    subscriptions: SubscriptionRegistry,
    quotes: QuoteCache,
}

impl MarketDataBook {
    /// Creates an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The subscription registry.
    #[must_use]
    pub const fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.subscriptions
    }

    /// The quote cache.
    #[must_use]
    pub const fn quotes(&self) -> &QuoteCache {
        &self.quotes
    }

    /// Drops the mapping for `md_req_id` and the quote of its symbol.
    pub fn unsubscribe(&self, md_req_id: &str) -> Option<String> {
        let symbol = self.subscriptions.remove(md_req_id)?;
        self.quotes.remove(&symbol);
        Some(symbol)
    }

    /// Resolves the symbol a W/X entry applies to, or `None` if the
    /// subscription is no longer active.
    fn active_symbol(&self, md_req_id: Option<&str>, symbol: Option<&str>) -> Option<String> {
        match md_req_id {
            Some(id) => self.subscriptions.symbol_for(id),
            None => symbol
                .filter(|s| self.subscriptions.is_subscribed(s))
                .map(str::to_string),
        }
    }

    /// Applies a snapshot (W), replacing the cached quote.
    pub fn apply_snapshot(&self, session_id: &str, msg: &RawMessage<'_>) -> Option<Quote> {
        let md_req_id = msg.field_str(tags::MD_REQ_ID);
        let Some(symbol) = self.active_symbol(md_req_id, msg.field_str(tags::SYMBOL)) else {
            debug!(session = %session_id, md_req_id, "snapshot for inactive subscription ignored");
            return None;
        };

        let mut quote = Quote::empty(session_id, &symbol);
        quote.md_req_id = md_req_id.map(str::to_string);
        for entry in msg.groups(tags::NO_MD_ENTRIES, tags::MD_ENTRY_TYPE) {
            if let (Some(side), Some(price)) = (
                entry.enumeration::<MdEntryType>(tags::MD_ENTRY_TYPE),
                entry.decimal(tags::MD_ENTRY_PX),
            ) {
                quote.set_side(side, price, entry_size(&entry));
            }
        }
        self.quotes.replace(quote.clone());
        Some(quote)
    }

    /// Applies an incremental refresh (X), returning one full quote per
    /// applied entry. Delete actions are skipped.
    pub fn apply_incremental(&self, session_id: &str, msg: &RawMessage<'_>) -> Vec<Quote> {
        let top_req_id = msg.field_str(tags::MD_REQ_ID);
        let mut entries: Vec<Group<'_, '_>> = msg
            .groups(tags::NO_MD_ENTRIES, tags::MD_UPDATE_ACTION)
            .collect();
        if entries.is_empty() {
            entries = msg
                .groups(tags::NO_MD_ENTRIES, tags::MD_ENTRY_TYPE)
                .collect();
        }

        let mut updated = Vec::with_capacity(entries.len());
        let mut last_symbol: Option<&str> = None;
        for entry in &entries {
            let entry_symbol = entry.str(tags::SYMBOL).or(last_symbol);
            last_symbol = entry_symbol;

            if entry.enumeration::<MdUpdateAction>(tags::MD_UPDATE_ACTION)
                == Some(MdUpdateAction::Delete)
            {
                continue;
            }
            let (Some(side), Some(price)) = (
                entry.enumeration::<MdEntryType>(tags::MD_ENTRY_TYPE),
                entry.decimal(tags::MD_ENTRY_PX),
            ) else {
                continue;
            };
            if price <= Decimal::ZERO || side == MdEntryType::Trade {
                continue;
            }

            let md_req_id = entry.str(tags::MD_REQ_ID).or(top_req_id);
            let Some(symbol) = self.active_symbol(md_req_id, entry_symbol) else {
                debug!(session = %session_id, md_req_id, "incremental for inactive subscription ignored");
                continue;
            };
            updated.push(self.quotes.merge_side(
                session_id,
                &symbol,
                md_req_id,
                side,
                price,
                entry_size(entry),
            ));
        }
        updated
    }

    /// Applies a MarketDataRequestReject (Y): the mapping is removed and the
    /// reject is returned for forwarding.
    pub fn apply_reject(&self, session_id: &str, msg: &RawMessage<'_>) -> MarketDataReject {
        let md_req_id = msg.field_str(tags::MD_REQ_ID).unwrap_or_default();
        let symbol = self.subscriptions.remove(md_req_id);
        let reject = MarketDataReject {
            session_id: session_id.to_string(),
            md_req_id: md_req_id.to_string(),
            symbol,
            reason: msg.field_str(tags::MD_REQ_REJ_REASON).map(str::to_string),
            text: msg.field_str(tags::TEXT).map(str::to_string),
        };
        warn!(
            session = %session_id,
            md_req_id = %reject.md_req_id,
            symbol = ?reject.symbol,
            reason = ?reject.reason,
            text = ?reject.text,
            "market data request rejected"
        );
        reject
    }
}

fn entry_size(entry: &Group<'_, '_>) -> Decimal {
    entry.decimal(tags::MD_ENTRY_SIZE).unwrap_or(Decimal::ZERO)
}
