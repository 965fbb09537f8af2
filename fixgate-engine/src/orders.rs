/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Trading and query request bodies.
//!
//! Each writer fills an [`Encoder`] that already carries the standard header.
//! The caller generates the correlation id with [`new_request_id`] and gets it
//! back from the gateway; outcomes arrive later on the event streams.

use fixgate_core::tags;
use fixgate_core::types::{OrdType, Side, TimeInForce, Timestamp};
use fixgate_tagvalue::Encoder;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Returns a unique correlation id such as `ORD-1f0c…`.
#[must_use]
pub fn new_request_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

/// A new order (35=D).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    /// Instrument symbol.
    pub symbol: String,
    /// Buy or sell.
    pub side: Side,
    /// OrderQty.
    pub quantity: Decimal,
    /// Order type; limit orders carry `price`.
    pub ord_type: OrdType,
    /// Limit price.
    pub price: Option<Decimal>,
    /// Optional TimeInForce.
    pub time_in_force: Option<TimeInForce>,
}

impl NewOrder {
    /// A limit order.
    #[must_use]
    pub fn limit(symbol: impl Into<String>, side: Side, quantity: Decimal, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            quantity,
            ord_type: OrdType::Limit,
            price: Some(price),
            time_in_force: None,
        }
    }

    /// A market order.
    #[must_use]
    pub fn market(symbol: impl Into<String>, side: Side, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            quantity,
            ord_type: OrdType::Market,
            price: None,
            time_in_force: None,
        }
    }

    /// Sets TimeInForce.
    #[must_use]
    pub const fn with_time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = Some(tif);
        self
    }
}

/// Writes a NewOrderSingle (D) body.
pub fn write_new_order(
    enc: &mut Encoder<'_>,
    order: &NewOrder,
    cl_ord_id: &str,
    account: Option<&str>,
    transact_time: Timestamp,
) {
    enc.put_str(tags::CL_ORD_ID, cl_ord_id);
    enc.put_str(tags::SYMBOL, &order.symbol);
    enc.put_enum(tags::SIDE, order.side);
    enc.put_decimal(tags::ORDER_QTY, order.quantity);
    enc.put_enum(tags::ORD_TYPE, order.ord_type);
    if let Some(price) = order.price
        && order.ord_type != OrdType::Market
    {
        enc.put_decimal(tags::PRICE, price);
    }
    if let Some(tif) = order.time_in_force {
        enc.put_enum(tags::TIME_IN_FORCE, tif);
    }
    enc.put_timestamp(tags::TRANSACT_TIME, transact_time);
    // automated execution, no broker intervention
    enc.put_str(tags::HANDL_INST, "1");
    if let Some(account) = account {
        enc.put_str(tags::ACCOUNT, account);
    }
}

/// Writes an OrderCancelRequest (F) body.
pub fn write_cancel(
    enc: &mut Encoder<'_>,
    cl_ord_id: &str,
    orig_cl_ord_id: &str,
    symbol: &str,
    side: Side,
    account: Option<&str>,
    transact_time: Timestamp,
) {
    enc.put_str(tags::CL_ORD_ID, cl_ord_id);
    enc.put_str(tags::ORIG_CL_ORD_ID, orig_cl_ord_id);
    enc.put_str(tags::SYMBOL, symbol);
    enc.put_enum(tags::SIDE, side);
    enc.put_timestamp(tags::TRANSACT_TIME, transact_time);
    if let Some(account) = account {
        enc.put_str(tags::ACCOUNT, account);
    }
}

/// Writes an OrderStatusRequest (H) body.
pub fn write_order_status(
    enc: &mut Encoder<'_>,
    cl_ord_id: &str,
    symbol: &str,
    side: Side,
    account: Option<&str>,
) {
    enc.put_str(tags::CL_ORD_ID, cl_ord_id);
    enc.put_str(tags::SYMBOL, symbol);
    enc.put_enum(tags::SIDE, side);
    if let Some(account) = account {
        enc.put_str(tags::ACCOUNT, account);
    }
}

/// Writes an OrderMassStatusRequest (AF) body asking for all orders.
pub fn write_mass_status(enc: &mut Encoder<'_>, mass_status_req_id: &str, account: Option<&str>) {
    enc.put_str(tags::MASS_STATUS_REQ_ID, mass_status_req_id);
    enc.put_uint(tags::MASS_STATUS_REQ_TYPE, 7);
    if let Some(account) = account {
        enc.put_str(tags::ACCOUNT, account);
    }
}

/// Writes a RequestForPositions (AN) snapshot body.
pub fn write_positions_request(
    enc: &mut Encoder<'_>,
    pos_req_id: &str,
    account: Option<&str>,
    symbol: Option<&str>,
    now: Timestamp,
) {
    enc.put_str(tags::POS_REQ_ID, pos_req_id);
    enc.put_uint(tags::POS_REQ_TYPE, 0);
    enc.put_uint(tags::SUBSCRIPTION_REQUEST_TYPE, 0);
    if let Some(account) = account {
        enc.put_str(tags::ACCOUNT, account);
    }
    enc.put_uint(tags::ACCOUNT_TYPE, 1);
    enc.put_str(tags::CLEARING_BUSINESS_DATE, &now.format_date());
    enc.put_timestamp(tags::TRANSACT_TIME, now);
    if let Some(symbol) = symbol {
        enc.put_str(tags::SYMBOL, symbol);
    }
}

/// Writes a TradeCaptureReportRequest (AD) body for matched trades in
/// `[from, to]`.
pub fn write_trade_capture_request(
    enc: &mut Encoder<'_>,
    trade_request_id: &str,
    account: Option<&str>,
    from: Timestamp,
    to: Timestamp,
) {
    enc.put_str(tags::TRADE_REQUEST_ID, trade_request_id);
    enc.put_uint(tags::TRADE_REQUEST_TYPE, 1);
    enc.put_uint(tags::SUBSCRIPTION_REQUEST_TYPE, 0);
    if let Some(account) = account {
        enc.put_str(tags::ACCOUNT, account);
    }
    enc.put_uint(tags::NO_DATES, 2);
    enc.put_timestamp(tags::TRANSACT_TIME, from);
    enc.put_timestamp(tags::TRANSACT_TIME, to);
}

/// Writes a SecurityListRequest (x) body asking for every security.
pub fn write_security_list_request(enc: &mut Encoder<'_>, security_req_id: &str) {
    enc.put_str(tags::SECURITY_REQ_ID, security_req_id);
    enc.put_uint(tags::SECURITY_LIST_REQUEST_TYPE, 4);
}

/// Writes a SecurityDefinitionRequest (c) body for one FX spot symbol.
pub fn write_security_definition_request(enc: &mut Encoder<'_>, security_req_id: &str, symbol: &str) {
    enc.put_str(tags::SECURITY_REQ_ID, security_req_id);
    enc.put_uint(tags::SECURITY_REQUEST_TYPE, 0);
    enc.put_str(tags::SYMBOL, symbol);
    enc.put_str(tags::SECURITY_TYPE, "FXSPOT");
    enc.put_uint(tags::PRODUCT, 4);
}
