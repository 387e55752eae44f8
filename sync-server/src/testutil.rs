//! Shared test fixtures: a scripted marketplace, a recording queue, and
//! posting/order builders.

use async_trait::async_trait;
use ozon_api::client::ApiToken;
use ozon_api::error::{Outcome, OzonError, OzonResult};
use ozon_api::types::{
    ExemplarState, LabelTaskStatus, ListPostingsRequest, Posting, ShipAdditionalPosting,
    ShipAdditionalProduct, ShipRequest, ShipResult,
};
use ozon_api::OzonApi;
use shared::ids::{ProfileId, TokenId};
use shared::message::{Lane, QueueMessage};
use shared::order::order_root;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::orders::store::{NewOrderCommand, NewOrderProduct, OrderStore};
use crate::queue::{DispatchError, MessageDispatch};
use crate::services::{CatalogProduct, CatalogResolver, FileCatalog, ProfileToken, TokenProvider};
use shared::order::OrderStatus;

// ========== Queue ==========

/// Captures every dispatched message instead of delivering it
#[derive(Default)]
pub struct RecordingDispatch {
    entries: Mutex<Vec<(QueueMessage, Option<Duration>, Lane)>>,
}

impl RecordingDispatch {
    pub fn messages(&self) -> Vec<QueueMessage> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|(m, _, _)| m.clone())
            .collect()
    }

    pub fn entries(&self) -> Vec<(QueueMessage, Option<Duration>, Lane)> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageDispatch for RecordingDispatch {
    async fn dispatch(
        &self,
        message: QueueMessage,
        delay: Option<Duration>,
        lane: Lane,
    ) -> Result<(), DispatchError> {
        self.entries.lock().unwrap().push((message, delay, lane));
        Ok(())
    }
}

// ========== Tokens / catalog ==========

/// Single-token provider for tests
pub struct StaticTokens {
    pub profile: ProfileId,
    pub token: ProfileToken,
}

impl TokenProvider for StaticTokens {
    fn profiles(&self) -> Vec<ProfileId> {
        vec![self.profile]
    }

    fn tokens_for(&self, profile: ProfileId) -> Vec<ProfileToken> {
        if profile == self.profile {
            vec![self.token.clone()]
        } else {
            Vec::new()
        }
    }

    fn token(&self, id: TokenId) -> Option<ProfileToken> {
        (id == self.token.id).then(|| self.token.clone())
    }
}

pub fn test_tokens() -> (Arc<StaticTokens>, ProfileId) {
    let profile = ProfileId::new();
    let token = ProfileToken {
        id: TokenId::new(),
        profile,
        api: ApiToken {
            client_id: "12345".to_string(),
            api_key: "test-key".to_string(),
            warehouse_id: 777,
        },
        active: true,
    };
    (Arc::new(StaticTokens { profile, token }), profile)
}

/// Catalog resolving the given articles with capacity 2 each
pub fn test_catalog(articles: &[&str]) -> Arc<dyn CatalogResolver> {
    test_catalog_with_capacity(articles, 2)
}

pub fn test_catalog_with_capacity(articles: &[&str], capacity: u32) -> Arc<dyn CatalogResolver> {
    let map: HashMap<String, CatalogProduct> = articles
        .iter()
        .map(|a| {
            (
                a.to_string(),
                CatalogProduct {
                    product: uuid::Uuid::new_v4(),
                    offer: None,
                    variation: None,
                    modification: None,
                    package_capacity: capacity,
                },
            )
        })
        .collect();
    Arc::new(FileCatalog::from_map(map))
}

// ========== Postings ==========

/// Marketplace-fulfilled posting with the given product lines
pub fn fbs_posting(number: &str, products: &[(&str, i64, u32)]) -> Posting {
    posting_with_status(number, "awaiting_packaging", "ozon", products)
}

/// Cancelled posting carrying a cancellation reason
pub fn cancelled_posting(number: &str, reason: &str) -> Posting {
    let mut posting = posting_with_status(number, "cancelled", "ozon", &[("ART-1", 10, 1)]);
    posting.cancellation = Some(ozon_api::types::Cancellation {
        cancel_reason: Some(reason.to_string()),
        cancel_reason_id: None,
        cancellation_initiator: None,
    });
    posting
}

pub fn posting_with_status(
    number: &str,
    status: &str,
    integration: &str,
    products: &[(&str, i64, u32)],
) -> Posting {
    let products: Vec<serde_json::Value> = products
        .iter()
        .map(|(article, sku, quantity)| {
            serde_json::json!({
                "offer_id": article,
                "sku": sku,
                "price": "1000.0000",
                "currency_code": "RUB",
                "quantity": quantity,
            })
        })
        .collect();

    serde_json::from_value(serde_json::json!({
        "posting_number": number,
        "order_number": order_root(number),
        "status": status,
        "tpl_integration_type": integration,
        "in_process_at": "2025-06-15T10:00:00Z",
        "shipment_date": "2025-06-17T10:00:00Z",
        "delivery_method": {"name": "Ozon Логистика", "warehouse_id": 777},
        "products": products,
    }))
    .unwrap()
}

// ========== Orders ==========

pub fn seed_order(store: &OrderStore, number: &str, status: OrderStatus) {
    seed_order_full(store, number, status, ProfileId::new(), Some(TokenId::new()), &[("ART-1", 10, 1)]);
}

pub fn seed_order_full(
    store: &OrderStore,
    number: &str,
    status: OrderStatus,
    profile: ProfileId,
    token: Option<TokenId>,
    products: &[(&str, i64, u32)],
) -> crate::orders::OrderRecord {
    let command = NewOrderCommand {
        number: number.to_string(),
        status: OrderStatus::New,
        delivery: shared::order::DeliveryKind::FbsOzon,
        profile,
        token: token.unwrap_or_else(TokenId::new),
        created_at: chrono::Utc::now(),
        shipment_due: None,
        address: None,
        buyer_name: None,
        buyer_phone: None,
        comment: None,
        products: products
            .iter()
            .map(|(article, sku, quantity)| NewOrderProduct {
                article: article.to_string(),
                sku: *sku,
                price: 100_000,
                currency: "RUB".to_string(),
                quantity: *quantity,
            })
            .collect(),
    };

    store.create(&command).unwrap();
    if status != OrderStatus::New {
        store.set_status(number, status).unwrap();
    }
    store.find_by_number(number).unwrap().unwrap()
}

// ========== Scripted marketplace ==========

/// Scripted ship outcome
pub enum ShipScript {
    /// Echo a split: one posting per package, additional data by SKU
    Echo,
    Benign,
    Fail,
}

/// Scripted label-task creation outcome
pub enum LabelCreateScript {
    Ok,
    RateLimited,
    Benign,
    Fail,
}

/// Scripted label batch outcome
pub enum LabelBatchScript {
    Ok,
    Fail,
}

/// Marketplace fake: fixed listing, scripted mutation outcomes, call log
#[derive(Default)]
pub struct FakeOzon {
    listing: Vec<Posting>,
    details: Mutex<HashMap<String, Posting>>,
    ship_scripts: Mutex<VecDeque<ShipScript>>,
    label_create_scripts: Mutex<VecDeque<LabelCreateScript>>,
    label_task_scripts: Mutex<VecDeque<LabelTaskStatus>>,
    label_batch_scripts: Mutex<VecDeque<LabelBatchScript>>,
    label_bytes: Mutex<Vec<u8>>,
    task_counter: AtomicI64,
    pub ship_calls: Mutex<Vec<ShipRequest>>,
    pub transition_calls: Mutex<Vec<(String, String)>>,
    pub label_create_calls: Mutex<Vec<String>>,
    pub label_batch_calls: Mutex<Vec<Vec<String>>>,
    exemplar_unavailable: Mutex<bool>,
}

impl FakeOzon {
    pub fn with_listing(mut self, postings: Vec<Posting>) -> Self {
        for posting in &postings {
            self.details
                .lock()
                .unwrap()
                .insert(posting.posting_number.clone(), posting.clone());
        }
        self.listing = postings;
        self
    }

    pub fn with_detail(self, posting: Posting) -> Self {
        self.details
            .lock()
            .unwrap()
            .insert(posting.posting_number.clone(), posting.clone());
        self
    }

    pub fn with_ship(self, script: ShipScript) -> Self {
        self.ship_scripts.lock().unwrap().push_back(script);
        self
    }

    pub fn with_label_create(self, script: LabelCreateScript) -> Self {
        self.label_create_scripts.lock().unwrap().push_back(script);
        self
    }

    pub fn with_label_task(self, status: LabelTaskStatus) -> Self {
        self.label_task_scripts.lock().unwrap().push_back(status);
        self
    }

    pub fn with_label_batch(self, script: LabelBatchScript) -> Self {
        self.label_batch_scripts.lock().unwrap().push_back(script);
        self
    }

    pub fn with_label_bytes(self, bytes: Vec<u8>) -> Self {
        *self.label_bytes.lock().unwrap() = bytes;
        self
    }

    pub fn with_exemplar_unavailable(self) -> Self {
        *self.exemplar_unavailable.lock().unwrap() = true;
        self
    }

    fn echo_ship(&self, request: &ShipRequest) -> ShipResult {
        let root = order_root(&request.posting_number).to_string();
        let mut result = Vec::new();
        let mut additional_data = Vec::new();

        for (i, package) in request.packages.iter().enumerate() {
            let number = format!("{root}-{}", i + 2);
            result.push(number.clone());
            additional_data.push(ShipAdditionalPosting {
                posting_number: number,
                products: package
                    .products
                    .iter()
                    .map(|p| ShipAdditionalProduct {
                        sku: p.product_id,
                        quantity: p.quantity,
                    })
                    .collect(),
            });
        }

        ShipResult {
            result,
            additional_data,
        }
    }
}

impl Default for ShipScript {
    fn default() -> Self {
        ShipScript::Echo
    }
}

#[async_trait]
impl OzonApi for FakeOzon {
    async fn list_postings(
        &self,
        _token: &ApiToken,
        request: &ListPostingsRequest,
    ) -> OzonResult<Vec<Posting>> {
        Ok(self
            .listing
            .iter()
            .filter(|p| p.status == request.status)
            .cloned()
            .collect())
    }

    async fn get_posting(&self, _token: &ApiToken, posting_number: &str) -> OzonResult<Posting> {
        self.details
            .lock()
            .unwrap()
            .get(shared::order::marketplace_number(posting_number))
            .cloned()
            .ok_or_else(|| OzonError::InvalidResponse(format!("no posting {posting_number}")))
    }

    async fn ship(&self, _token: &ApiToken, request: &ShipRequest) -> OzonResult<Outcome<ShipResult>> {
        self.ship_calls.lock().unwrap().push(request.clone());

        let script = self
            .ship_scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();

        match script {
            ShipScript::Echo => Ok(Outcome::Success(self.echo_ship(request))),
            ShipScript::Benign => Ok(Outcome::Benign),
            ShipScript::Fail => Err(OzonError::Api {
                code: 500,
                message: "SHIP_FAILED".to_string(),
            }),
        }
    }

    async fn awaiting_delivery(
        &self,
        _token: &ApiToken,
        posting_number: &str,
    ) -> OzonResult<Outcome<()>> {
        self.transition_calls
            .lock()
            .unwrap()
            .push(("awaiting_delivery".to_string(), posting_number.to_string()));
        Ok(Outcome::Success(()))
    }

    async fn delivering(&self, _token: &ApiToken, posting_number: &str) -> OzonResult<Outcome<()>> {
        self.transition_calls
            .lock()
            .unwrap()
            .push(("delivering".to_string(), posting_number.to_string()));
        Ok(Outcome::Success(()))
    }

    async fn delivered(&self, _token: &ApiToken, posting_number: &str) -> OzonResult<Outcome<()>> {
        self.transition_calls
            .lock()
            .unwrap()
            .push(("delivered".to_string(), posting_number.to_string()));
        Ok(Outcome::Success(()))
    }

    async fn create_label_task(
        &self,
        _token: &ApiToken,
        posting_number: &str,
    ) -> OzonResult<Outcome<i64>> {
        self.label_create_calls
            .lock()
            .unwrap()
            .push(posting_number.to_string());

        let script = self
            .label_create_scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(LabelCreateScript::Ok);

        match script {
            LabelCreateScript::Ok => Ok(Outcome::Success(
                self.task_counter.fetch_add(1, Ordering::SeqCst) + 1,
            )),
            LabelCreateScript::RateLimited => Err(OzonError::RateLimited),
            LabelCreateScript::Benign => Ok(Outcome::Benign),
            LabelCreateScript::Fail => Err(OzonError::Api {
                code: 500,
                message: "LABEL_CREATE_FAILED".to_string(),
            }),
        }
    }

    async fn get_label_task(&self, _token: &ApiToken, _task_id: i64) -> OzonResult<LabelTaskStatus> {
        Ok(self
            .label_task_scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(LabelTaskStatus::Completed {
                file_url: "https://files.test/label.pdf".to_string(),
            }))
    }

    async fn label_batch(
        &self,
        _token: &ApiToken,
        posting_numbers: &[String],
    ) -> OzonResult<Outcome<Vec<u8>>> {
        self.label_batch_calls
            .lock()
            .unwrap()
            .push(posting_numbers.to_vec());

        let script = self
            .label_batch_scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(LabelBatchScript::Ok);

        match script {
            LabelBatchScript::Ok => Ok(Outcome::Success(self.label_bytes.lock().unwrap().clone())),
            LabelBatchScript::Fail => Err(OzonError::Api {
                code: 500,
                message: "NOT_READY".to_string(),
            }),
        }
    }

    async fn download(&self, _url: &str) -> OzonResult<Vec<u8>> {
        Ok(self.label_bytes.lock().unwrap().clone())
    }

    async fn exemplar_status(
        &self,
        _token: &ApiToken,
        _posting_number: &str,
    ) -> OzonResult<ExemplarState> {
        Ok(ExemplarState {
            ship_available: !*self.exemplar_unavailable.lock().unwrap(),
            products: Vec::new(),
        })
    }

    async fn exemplar_set(
        &self,
        _token: &ApiToken,
        _posting_number: &str,
        _state: &ExemplarState,
    ) -> OzonResult<Outcome<()>> {
        Ok(Outcome::Success(()))
    }
}

/// Valid PNG bytes with a black/white pattern, for readability checks
pub fn png_bytes() -> Vec<u8> {
    let mut img = image::GrayImage::new(32, 32);
    for (x, _y, pixel) in img.enumerate_pixels_mut() {
        *pixel = image::Luma([if x % 2 == 0 { 0u8 } else { 255u8 }]);
    }

    let mut bytes = Vec::new();
    img.write_to(
        &mut std::io::Cursor::new(&mut bytes),
        image::ImageFormat::Png,
    )
    .unwrap();
    bytes
}
