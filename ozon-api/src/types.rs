//! Wire DTOs for the Seller API
//!
//! Every response shape the service consumes is declared here; raw JSON maps
//! never travel past this crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Posting (shipment unit) status on the marketplace side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostingStatus {
    AwaitingRegistration,
    AcceptanceInProgress,
    AwaitingApprove,
    AwaitingPackaging,
    AwaitingDeliver,
    Arbitration,
    ClientArbitration,
    Delivering,
    DriverPickup,
    Delivered,
    Cancelled,
    NotAccepted,
    SentBySeller,
    #[serde(other)]
    Unknown,
}

impl PostingStatus {
    /// Filter value for the list endpoint
    pub fn as_filter(&self) -> &'static str {
        match self {
            PostingStatus::AwaitingRegistration => "awaiting_registration",
            PostingStatus::AcceptanceInProgress => "acceptance_in_progress",
            PostingStatus::AwaitingApprove => "awaiting_approve",
            PostingStatus::AwaitingPackaging => "awaiting_packaging",
            PostingStatus::AwaitingDeliver => "awaiting_deliver",
            PostingStatus::Arbitration => "arbitration",
            PostingStatus::ClientArbitration => "client_arbitration",
            PostingStatus::Delivering => "delivering",
            PostingStatus::DriverPickup => "driver_pickup",
            PostingStatus::Delivered => "delivered",
            PostingStatus::Cancelled => "cancelled",
            PostingStatus::NotAccepted => "not_accepted",
            PostingStatus::SentBySeller => "sent_by_seller",
            PostingStatus::Unknown => "unknown",
        }
    }
}

/// Delivery method block of a posting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryMethod {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub warehouse_id: Option<i64>,
    #[serde(default)]
    pub warehouse: Option<String>,
    #[serde(default)]
    pub tpl_provider: Option<String>,
    /// `ozon` for marketplace-fulfilled delivery, `non_integrated` for
    /// merchant-fulfilled delivery
    #[serde(default)]
    pub tpl_integration_type: Option<String>,
}

/// One product line of a posting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostingProduct {
    /// Seller's article (offer id) used for catalog resolution
    pub offer_id: String,
    /// Marketplace product identifier, used in packaging requests
    #[serde(default)]
    pub sku: i64,
    /// Unit price as reported by the marketplace (decimal string)
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub currency_code: String,
    pub quantity: u32,
    #[serde(default)]
    pub name: Option<String>,
}

/// Buyer block, present for merchant-fulfilled postings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Addressee {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Customer address block, present for merchant-fulfilled postings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerAddress {
    #[serde(default)]
    pub address_tail: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<CustomerAddress>,
}

/// Cancellation block of a cancelled posting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cancellation {
    #[serde(default)]
    pub cancel_reason: Option<String>,
    #[serde(default)]
    pub cancel_reason_id: Option<i64>,
    #[serde(default)]
    pub cancellation_initiator: Option<String>,
}

/// Sibling postings produced by a prior split
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelatedPostings {
    #[serde(default)]
    pub related_posting_numbers: Vec<String>,
}

/// One shipment unit as returned by `/v3/posting/fbs/list` and
/// `/v3/posting/fbs/get`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Posting {
    pub posting_number: String,
    #[serde(default)]
    pub order_number: String,
    pub status: PostingStatus,
    #[serde(default)]
    pub tpl_integration_type: Option<String>,
    #[serde(default)]
    pub delivery_method: Option<DeliveryMethod>,
    /// When the marketplace started processing the posting
    #[serde(default)]
    pub in_process_at: Option<DateTime<Utc>>,
    /// When the posting must be handed over for shipment
    #[serde(default)]
    pub shipment_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub products: Vec<PostingProduct>,
    #[serde(default)]
    pub addressee: Option<Addressee>,
    #[serde(default)]
    pub customer: Option<Customer>,
    #[serde(default)]
    pub cancellation: Option<Cancellation>,
    #[serde(default)]
    pub related_postings: Option<RelatedPostings>,
}

impl Posting {
    /// Integration type, preferring the delivery-method block when the
    /// top-level field is absent
    pub fn integration_type(&self) -> Option<&str> {
        self.tpl_integration_type
            .as_deref()
            .or_else(|| {
                self.delivery_method
                    .as_ref()
                    .and_then(|d| d.tpl_integration_type.as_deref())
            })
    }

    /// Marketplace-fulfilled delivery (Ozon logistics)
    pub fn is_ozon_fulfilled(&self) -> bool {
        self.integration_type() == Some("ozon")
    }

    /// Total ordered units across all product lines
    pub fn total_quantity(&self) -> u32 {
        self.products.iter().map(|p| p.quantity).sum()
    }

    /// Sibling posting numbers from a prior split
    pub fn related_posting_numbers(&self) -> &[String] {
        self.related_postings
            .as_ref()
            .map(|r| r.related_posting_numbers.as_slice())
            .unwrap_or(&[])
    }
}

/// Filter for the posting list endpoint
#[derive(Debug, Clone)]
pub struct ListPostingsRequest {
    pub status: PostingStatus,
    pub since: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub warehouse_id: Option<i64>,
}

/// One physical package in a ship (split) request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub products: Vec<PackageProduct>,
}

/// One product slice inside a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageProduct {
    pub product_id: i64,
    pub quantity: u32,
}

/// Packaging submission for `/v4/posting/fbs/ship`
#[derive(Debug, Clone)]
pub struct ShipRequest {
    pub posting_number: String,
    pub packages: Vec<Package>,
}

/// Per-posting metadata returned alongside the ship result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipAdditionalPosting {
    pub posting_number: String,
    #[serde(default)]
    pub products: Vec<ShipAdditionalProduct>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipAdditionalProduct {
    #[serde(default)]
    pub sku: i64,
    #[serde(default)]
    pub quantity: u32,
}

/// Result of a successful ship call: the newly created posting numbers and
/// the per-posting product metadata used to match postings back to order
/// lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipResult {
    #[serde(default)]
    pub result: Vec<String>,
    #[serde(default)]
    pub additional_data: Vec<ShipAdditionalPosting>,
}

impl ShipResult {
    /// Postings whose first product carries the given SKU
    pub fn postings_for_sku(&self, sku: i64) -> Vec<&ShipAdditionalPosting> {
        self.additional_data
            .iter()
            .filter(|p| p.products.first().is_some_and(|prd| prd.sku == sku))
            .collect()
    }
}

/// State of an asynchronous label-generation task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelTaskStatus {
    /// The file is not ready yet; poll again later
    Pending,
    /// The label file can be downloaded
    Completed { file_url: String },
}

/// Exemplar (marking code) readiness for a posting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExemplarState {
    /// The posting can be moved to shipment without further exemplar data
    pub ship_available: bool,
    #[serde(default)]
    pub products: Vec<ExemplarProduct>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExemplarProduct {
    pub product_id: i64,
    #[serde(default)]
    pub exemplars: Vec<Exemplar>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Exemplar {
    #[serde(default)]
    pub gtd: Option<String>,
    #[serde(default)]
    pub marks: Vec<ExemplarMark>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExemplarMark {
    pub mark: String,
    pub mark_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posting_deserializes_list_payload() {
        let json = serde_json::json!({
            "posting_number": "75119001-0020-1",
            "order_number": "75119001-0020",
            "status": "awaiting_packaging",
            "tpl_integration_type": "ozon",
            "in_process_at": "2024-11-03T11:47:39Z",
            "shipment_date": "2024-11-05T10:00:00Z",
            "delivery_method": {"name": "Ozon Логистика", "warehouse_id": 1020000089903000i64},
            "products": [
                {"offer_id": "ART-1", "sku": 123456, "price": "1390.0000",
                 "currency_code": "RUB", "quantity": 2}
            ]
        });

        let posting: Posting = serde_json::from_value(json).unwrap();
        assert_eq!(posting.status, PostingStatus::AwaitingPackaging);
        assert!(posting.is_ozon_fulfilled());
        assert_eq!(posting.total_quantity(), 2);
        assert_eq!(posting.products[0].sku, 123456);
    }

    #[test]
    fn test_unknown_status_tolerated() {
        let json = serde_json::json!({
            "posting_number": "1-1-1",
            "status": "some_future_status"
        });
        let posting: Posting = serde_json::from_value(json).unwrap();
        assert_eq!(posting.status, PostingStatus::Unknown);
    }

    #[test]
    fn test_ship_result_sku_matching() {
        let result = ShipResult {
            result: vec!["1-1-1".into(), "1-1-2".into()],
            additional_data: vec![
                ShipAdditionalPosting {
                    posting_number: "1-1-1".into(),
                    products: vec![ShipAdditionalProduct { sku: 10, quantity: 1 }],
                },
                ShipAdditionalPosting {
                    posting_number: "1-1-2".into(),
                    products: vec![ShipAdditionalProduct { sku: 20, quantity: 1 }],
                },
            ],
        };

        let matched = result.postings_for_sku(10);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].posting_number, "1-1-1");
        assert!(result.postings_for_sku(30).is_empty());
    }
}
