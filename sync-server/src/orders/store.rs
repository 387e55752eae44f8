//! redb-based order projection store
//!
//! Orders are keyed by their internal number (`O-` + posting number); a
//! second table indexes by order id. Creation is idempotent by number — the
//! invariant is exactly one internal order per marketplace order, and a
//! duplicate create returns the existing record instead of erroring.

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use shared::ids::{OrderId, OrderProductId, ProfileId, TokenId};
use shared::order::{DeliveryKind, OrderStatus};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Orders: internal number -> JSON record
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Index: order id (uuid string) -> internal number
const ORDERS_BY_ID_TABLE: TableDefinition<&str, &str> = TableDefinition::new("orders_by_id");

#[derive(Debug, Error)]
pub enum OrderStoreError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Order not found: {0}")]
    NotFound(String),
}

pub type OrderStoreResult<T> = Result<T, OrderStoreError>;

/// One product line of an internal order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderProductRecord {
    pub id: OrderProductId,
    /// Seller article the line was resolved from
    pub article: String,
    /// Marketplace SKU
    pub sku: i64,
    /// Unit price in minor currency units
    pub price: i64,
    pub currency: String,
    pub quantity: u32,
    /// Posting numbers attached after the packaging split
    #[serde(default)]
    pub postings: Vec<String>,
}

/// Internal order record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    /// Internal number (`O-` + marketplace posting number)
    pub number: String,
    pub status: OrderStatus,
    pub delivery: DeliveryKind,
    pub profile: ProfileId,
    /// Authorization token the order was ingested with; absent when the
    /// order was created by other means
    pub token: Option<TokenId>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub shipment_due: Option<DateTime<Utc>>,
    /// Delivery address (warehouse GPS for FBS, buyer address for DBS)
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub buyer_name: Option<String>,
    #[serde(default)]
    pub buyer_phone: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    /// Flagged for manual review (late cancellation)
    #[serde(default)]
    pub flagged: bool,
    pub products: Vec<OrderProductRecord>,
}

/// Product line of a creation command
#[derive(Debug, Clone)]
pub struct NewOrderProduct {
    pub article: String,
    pub sku: i64,
    pub price: i64,
    pub currency: String,
    pub quantity: u32,
}

/// Creation command produced by the translator and enriched by the scheduler
#[derive(Debug, Clone)]
pub struct NewOrderCommand {
    pub number: String,
    pub status: OrderStatus,
    pub delivery: DeliveryKind,
    pub profile: ProfileId,
    pub token: TokenId,
    pub created_at: DateTime<Utc>,
    pub shipment_due: Option<DateTime<Utc>>,
    pub address: Option<String>,
    pub buyer_name: Option<String>,
    pub buyer_phone: Option<String>,
    pub comment: Option<String>,
    pub products: Vec<NewOrderProduct>,
}

/// Result of an order creation
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    /// A new order was persisted
    Created(OrderRecord),
    /// The number already existed; nothing was written
    Exists(OrderRecord),
}

impl CreateOutcome {
    pub fn record(&self) -> &OrderRecord {
        match self {
            CreateOutcome::Created(record) | CreateOutcome::Exists(record) => record,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, CreateOutcome::Created(_))
    }
}

/// Order projection storage
#[derive(Clone)]
pub struct OrderStore {
    db: Arc<Database>,
}

impl OrderStore {
    /// Open or create the store
    pub fn open(path: impl AsRef<Path>) -> OrderStoreResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// In-memory store for tests
    #[cfg(test)]
    pub fn open_in_memory() -> OrderStoreResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> OrderStoreResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(ORDERS_BY_ID_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Create an order unless the number already exists.
    ///
    /// The existence check and the insert run inside one write transaction,
    /// so two concurrent creates for the same number cannot both succeed.
    pub fn create(&self, command: &NewOrderCommand) -> OrderStoreResult<CreateOutcome> {
        let write_txn = self.db.begin_write()?;

        let outcome = {
            let mut table = write_txn.open_table(ORDERS_TABLE)?;

            let existing = match table.get(command.number.as_str())? {
                Some(guard) => Some(serde_json::from_slice::<OrderRecord>(guard.value())?),
                None => None,
            };

            if let Some(existing) = existing {
                CreateOutcome::Exists(existing)
            } else {
                let record = OrderRecord {
                    id: OrderId::new(),
                    number: command.number.clone(),
                    status: command.status,
                    delivery: command.delivery,
                    profile: command.profile,
                    token: Some(command.token),
                    created_at: command.created_at,
                    shipment_due: command.shipment_due,
                    address: command.address.clone(),
                    buyer_name: command.buyer_name.clone(),
                    buyer_phone: command.buyer_phone.clone(),
                    comment: command.comment.clone(),
                    flagged: false,
                    products: command
                        .products
                        .iter()
                        .map(|p| OrderProductRecord {
                            id: OrderProductId::new(),
                            article: p.article.clone(),
                            sku: p.sku,
                            price: p.price,
                            currency: p.currency.clone(),
                            quantity: p.quantity,
                            postings: Vec::new(),
                        })
                        .collect(),
                };

                let value = serde_json::to_vec(&record)?;
                table.insert(record.number.as_str(), value.as_slice())?;

                let mut idx_table = write_txn.open_table(ORDERS_BY_ID_TABLE)?;
                idx_table.insert(record.id.to_string().as_str(), record.number.as_str())?;

                CreateOutcome::Created(record)
            }
        };

        write_txn.commit()?;
        Ok(outcome)
    }

    /// Whether an order with the number exists
    pub fn exists_number(&self, number: &str) -> OrderStoreResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        Ok(table.get(number)?.is_some())
    }

    /// Find an order by its internal number
    pub fn find_by_number(&self, number: &str) -> OrderStoreResult<Option<OrderRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        match table.get(number)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Find an order by id
    pub fn find_by_id(&self, id: OrderId) -> OrderStoreResult<Option<OrderRecord>> {
        let number = {
            let read_txn = self.db.begin_read()?;
            let idx_table = read_txn.open_table(ORDERS_BY_ID_TABLE)?;
            match idx_table.get(id.to_string().as_str())? {
                Some(guard) => guard.value().to_string(),
                None => return Ok(None),
            }
        };

        self.find_by_number(&number)
    }

    /// Apply a mutation to an order, returning the updated record
    pub fn update<F>(&self, number: &str, mutate: F) -> OrderStoreResult<OrderRecord>
    where
        F: FnOnce(&mut OrderRecord),
    {
        let write_txn = self.db.begin_write()?;

        let record = {
            let mut table = write_txn.open_table(ORDERS_TABLE)?;

            let bytes = {
                let guard = table
                    .get(number)?
                    .ok_or_else(|| OrderStoreError::NotFound(number.to_string()))?;
                guard.value().to_vec()
            };

            let mut record: OrderRecord = serde_json::from_slice(&bytes)?;
            mutate(&mut record);

            let value = serde_json::to_vec(&record)?;
            table.insert(number, value.as_slice())?;
            record
        };

        write_txn.commit()?;
        Ok(record)
    }

    /// Set the order status
    pub fn set_status(&self, number: &str, status: OrderStatus) -> OrderStoreResult<OrderRecord> {
        self.update(number, |record| record.status = status)
    }

    /// Attach a posting number to one product line.
    ///
    /// Returns `false` when the product line is not part of the order — the
    /// caller treats that as a data-integrity failure.
    pub fn attach_posting(
        &self,
        number: &str,
        product: OrderProductId,
        posting_number: &str,
    ) -> OrderStoreResult<bool> {
        let mut matched = false;

        self.update(number, |record| {
            if let Some(line) = record.products.iter_mut().find(|p| p.id == product) {
                if !line.postings.iter().any(|p| p == posting_number) {
                    line.postings.push(posting_number.to_string());
                }
                matched = true;
            }
        })?;

        Ok(matched)
    }
}
