//! Posting translation
//!
//! Pure mapping from marketplace posting payloads to internal commands. The
//! rest of the service never touches wire shapes directly.

use chrono::Utc;
use ozon_api::types::{Posting, PostingStatus};
use shared::ids::{ProfileId, TokenId};
use shared::order::{internal_number, DeliveryKind, OrderStatus};

use super::store::{NewOrderCommand, NewOrderProduct};

/// Cancellation command for one posting
#[derive(Debug, Clone)]
pub struct CancelOrderCommand {
    /// Internal order number
    pub number: String,
    /// Marketplace cancellation reason, if reported
    pub reason: Option<String>,
    pub profile: ProfileId,
}

/// Parse a marketplace decimal price string into minor currency units.
///
/// `"1390.0000"` -> `139000`. Unparseable prices degrade to zero rather than
/// failing the order — price is informational for this service.
fn price_minor_units(price: &str) -> i64 {
    price
        .parse::<f64>()
        .map(|p| (p * 100.0).round() as i64)
        .unwrap_or(0)
}

/// Map a posting status to the status the internal order starts in
fn initial_status(status: PostingStatus) -> OrderStatus {
    match status {
        PostingStatus::Cancelled => OrderStatus::Canceled,
        PostingStatus::Delivering | PostingStatus::DriverPickup => OrderStatus::Delivery,
        _ => OrderStatus::New,
    }
}

/// Build a creation command from a posting.
///
/// Delivery address and buyer fields are filled in later by the scheduler
/// (warehouse GPS for FBS, geocoded buyer address for DBS). Product lines
/// are deduplicated by article; the marketplace occasionally repeats a line.
pub fn new_order_command(posting: &Posting, profile: ProfileId, token: TokenId) -> NewOrderCommand {
    let delivery = if posting.is_ozon_fulfilled() {
        DeliveryKind::FbsOzon
    } else {
        DeliveryKind::DbsOzon
    };

    let comment = posting
        .delivery_method
        .as_ref()
        .filter(|m| !m.name.is_empty())
        .map(|m| m.name.clone());

    let mut products: Vec<NewOrderProduct> = Vec::new();
    for item in &posting.products {
        if products.iter().any(|p| p.article == item.offer_id) {
            continue;
        }
        products.push(NewOrderProduct {
            article: item.offer_id.clone(),
            sku: item.sku,
            price: price_minor_units(&item.price),
            currency: item.currency_code.clone(),
            quantity: item.quantity,
        });
    }

    NewOrderCommand {
        number: internal_number(&posting.posting_number),
        status: initial_status(posting.status),
        delivery,
        profile,
        token,
        created_at: posting.in_process_at.unwrap_or_else(Utc::now),
        shipment_due: posting.shipment_date,
        address: None,
        buyer_name: posting.addressee.as_ref().and_then(|a| a.name.clone()),
        buyer_phone: posting.addressee.as_ref().and_then(|a| a.phone.clone()),
        comment,
        products,
    }
}

/// Build a cancellation command from a cancelled posting
pub fn cancel_command(posting: &Posting, profile: ProfileId) -> CancelOrderCommand {
    CancelOrderCommand {
        number: internal_number(&posting.posting_number),
        reason: posting
            .cancellation
            .as_ref()
            .and_then(|c| c.cancel_reason.clone()),
        profile,
    }
}
