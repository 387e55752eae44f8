//! Internal order vocabulary
//!
//! Status and delivery enums for the seller-side order projection, plus the
//! number helpers that translate between marketplace posting numbers and
//! internal order numbers.

use serde::{Deserialize, Serialize};

/// Prefix stamped onto marketplace posting numbers when they become internal
/// order numbers. Disambiguates Ozon orders from other marketplaces in the
/// shared order table.
pub const NUMBER_PREFIX: &str = "O-";

/// Internal order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Freshly ingested, awaiting processing
    New,
    /// Awaiting payment
    Unpaid,
    /// Being packaged into shipments
    Package,
    /// Handed to the delivery service
    Delivery,
    /// Ready for pickup by the buyer (DBS)
    Extradition,
    /// Delivered and closed
    Completed,
    /// Cancelled
    Canceled,
}

impl OrderStatus {
    /// Terminal states cannot regress
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Canceled | OrderStatus::Completed)
    }
}

/// How the order is delivered to the buyer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryKind {
    /// Ozon's own logistics pick up the packaged shipment (FBS)
    FbsOzon,
    /// The seller delivers to the buyer directly (DBS)
    DbsOzon,
}

/// Mark a marketplace posting number as an internal order number
pub fn internal_number(posting_number: &str) -> String {
    format!("{NUMBER_PREFIX}{posting_number}")
}

/// Strip the internal prefix, returning the raw marketplace number.
///
/// Safe on already-raw numbers.
pub fn marketplace_number(number: &str) -> &str {
    number.strip_prefix(NUMBER_PREFIX).unwrap_or(number)
}

/// Strip the trailing `-<sequence>` component of a posting number, yielding
/// the logical order number shared by all sibling postings.
///
/// Before an order is split into postings the marketplace may briefly expose
/// several postings of the same order; keying dedup on the root prevents a
/// double ingestion in that window.
pub fn order_root(posting_number: &str) -> &str {
    let raw = marketplace_number(posting_number);
    match raw.rfind('-') {
        Some(idx) if idx > 0 => &raw[..idx],
        _ => raw,
    }
}
