//! Shared application state
//!
//! Everything the dispatchers need, composed once at startup. All services
//! are behind `Arc` so the state clones cheaply into workers.

use ozon_api::{OzonApi, OzonClient};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::config::Config;
use crate::bus::EventBus;
use crate::dedup::DedupStore;
use crate::orders::OrderStore;
use crate::queue::MessageDispatch;
use crate::services::{
    CatalogResolver, FileCatalog, FileTokens, Geocoder, NoopGeocoder, SignRepository,
    StaticSigns, StaticWarehouses, TokenProvider, WarehouseLocator,
};
use crate::stickers::{ImageVerifier, LabelRenderer, PngRenderer, StickerCache, StickerVerifier};

/// Composed service state
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderStore>,
    pub dedup: Arc<DedupStore>,
    pub stickers: StickerCache,
    pub api: Arc<dyn OzonApi>,
    pub queue: Arc<dyn MessageDispatch>,
    pub bus: EventBus,
    pub tokens: Arc<dyn TokenProvider>,
    pub catalog: Arc<dyn CatalogResolver>,
    pub warehouses: Arc<dyn WarehouseLocator>,
    pub geocoder: Arc<dyn Geocoder>,
    pub signs: Arc<dyn SignRepository>,
    pub renderer: Arc<dyn LabelRenderer>,
    pub verifier: Arc<dyn StickerVerifier>,
    pub new_orders_period: Duration,
    pub cancel_period: Duration,
}

impl AppState {
    /// Open the stores and load the collaborator registries
    pub fn initialize(config: &Config, queue: Arc<dyn MessageDispatch>) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;

        let orders = Arc::new(OrderStore::open(format!("{}/orders.redb", config.work_dir))?);
        let dedup = Arc::new(DedupStore::open(format!("{}/dedup.redb", config.work_dir))?);
        let stickers = StickerCache::open(format!("{}/stickers.redb", config.work_dir))?;

        let api: Arc<dyn OzonApi> = Arc::new(OzonClient::with_base_url(
            &config.ozon_base_url,
            config.is_production(),
        ));

        let tokens: Arc<dyn TokenProvider> = Arc::new(FileTokens::load(&config.tokens_path)?);
        let catalog: Arc<dyn CatalogResolver> = Arc::new(FileCatalog::load(&config.catalog_path)?);

        Ok(Self {
            orders,
            dedup,
            stickers,
            api,
            queue,
            bus: EventBus::default(),
            tokens,
            catalog,
            // Warehouse coordinates come from the profile registry of the
            // surrounding system; the standalone deployment starts empty
            warehouses: Arc::new(StaticWarehouses::new(HashMap::new())),
            geocoder: Arc::new(NoopGeocoder),
            signs: Arc::new(StaticSigns::default()),
            renderer: Arc::new(PngRenderer),
            verifier: Arc::new(ImageVerifier::default()),
            new_orders_period: Duration::from_secs(config.new_orders_poll_secs),
            cancel_period: Duration::from_secs(config.cancel_poll_secs),
        })
    }
}
