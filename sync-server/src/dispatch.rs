//! Message router
//!
//! One handler per message kind; an order-status change fans out to every
//! status-reactive dispatcher, mirroring how several independent handlers
//! subscribe to the order message in the surrounding system.

use async_trait::async_trait;
use shared::message::QueueMessage;
use std::sync::Arc;

use crate::core::AppState;
use crate::dedup::Deduplicator;
use crate::orders::{CancelOrderHandler, NewOrderHandler};
use crate::packaging::{PackageOrderDispatcher, SplitOrderDispatcher};
use crate::queue::MessageHandler;
use crate::schedule::{CancelOrdersDispatcher, NewOrdersDispatcher};
use crate::status::{
    DeliveredDbsDispatcher, DeliveryDbsDispatcher, ExemplarInfoDispatcher,
    WaitingShipmentDispatcher,
};
use crate::stickers::{
    CreateLabelTaskDispatcher, FetchLabelDispatcher, LabelTaskDispatcher, OrderStickersDispatcher,
};

/// All workflow dispatchers, routed by message kind
pub struct Dispatchers {
    new_orders: NewOrdersDispatcher,
    cancel_orders: CancelOrdersDispatcher,
    split_order: SplitOrderDispatcher,
    package_order: PackageOrderDispatcher,
    order_stickers: OrderStickersDispatcher,
    create_label: CreateLabelTaskDispatcher,
    poll_label: LabelTaskDispatcher,
    fetch_label: FetchLabelDispatcher,
    delivered_dbs: DeliveredDbsDispatcher,
    delivery_dbs: DeliveryDbsDispatcher,
    waiting_shipment: WaitingShipmentDispatcher,
    exemplar_info: ExemplarInfoDispatcher,
}

impl Dispatchers {
    pub fn new(state: &AppState) -> Self {
        let dedup = Deduplicator::new(state.dedup.clone());

        let new_order_handler = Arc::new(NewOrderHandler::new(
            state.orders.clone(),
            state.queue.clone(),
        ));
        let cancel_handler = Arc::new(CancelOrderHandler::new(
            state.orders.clone(),
            state.bus.clone(),
        ));

        Self {
            new_orders: NewOrdersDispatcher::new(
                dedup.clone(),
                state.queue.clone(),
                state.api.clone(),
                state.tokens.clone(),
                state.catalog.clone(),
                state.warehouses.clone(),
                state.geocoder.clone(),
                new_order_handler,
                state.new_orders_period,
            ),
            cancel_orders: CancelOrdersDispatcher::new(
                dedup.clone(),
                state.api.clone(),
                state.tokens.clone(),
                cancel_handler,
                state.cancel_period,
            ),
            split_order: SplitOrderDispatcher::new(
                dedup.clone(),
                state.queue.clone(),
                state.api.clone(),
                state.tokens.clone(),
            ),
            package_order: PackageOrderDispatcher::new(
                dedup.clone(),
                state.queue.clone(),
                state.api.clone(),
                state.tokens.clone(),
                state.catalog.clone(),
                state.orders.clone(),
            ),
            order_stickers: OrderStickersDispatcher::new(
                dedup.clone(),
                state.queue.clone(),
                state.api.clone(),
                state.tokens.clone(),
                state.orders.clone(),
            ),
            create_label: CreateLabelTaskDispatcher::new(
                state.queue.clone(),
                state.api.clone(),
                state.tokens.clone(),
            ),
            poll_label: LabelTaskDispatcher::new(
                state.queue.clone(),
                state.api.clone(),
                state.tokens.clone(),
                state.stickers.clone(),
                state.renderer.clone(),
            ),
            fetch_label: FetchLabelDispatcher::new(
                state.queue.clone(),
                state.api.clone(),
                state.tokens.clone(),
                state.stickers.clone(),
                state.renderer.clone(),
                state.verifier.clone(),
            ),
            delivered_dbs: DeliveredDbsDispatcher::new(
                state.api.clone(),
                state.tokens.clone(),
                state.orders.clone(),
            ),
            delivery_dbs: DeliveryDbsDispatcher::new(
                dedup,
                state.api.clone(),
                state.tokens.clone(),
                state.orders.clone(),
            ),
            waiting_shipment: WaitingShipmentDispatcher::new(
                state.queue.clone(),
                state.api.clone(),
                state.tokens.clone(),
                state.orders.clone(),
            ),
            exemplar_info: ExemplarInfoDispatcher::new(
                state.queue.clone(),
                state.api.clone(),
                state.tokens.clone(),
                state.orders.clone(),
                state.signs.clone(),
            ),
        }
    }
}

#[async_trait]
impl MessageHandler for Dispatchers {
    async fn handle(&self, message: QueueMessage) {
        match &message {
            QueueMessage::NewOrdersPoll(msg) => self.new_orders.handle(msg).await,
            QueueMessage::CancelOrdersPoll(msg) => self.cancel_orders.handle(msg).await,
            QueueMessage::SplitOrder(msg) => self.split_order.handle(msg).await,
            QueueMessage::OrderStatus(msg) => {
                // Several independent reactions to one status change; each
                // dispatcher applies its own guards
                self.package_order.handle(msg).await;
                self.order_stickers.handle(msg).await;
                self.delivery_dbs.handle(msg).await;
                self.delivered_dbs.handle(msg).await;
            }
            QueueMessage::CreateLabelTask(msg) => self.create_label.handle(msg).await,
            QueueMessage::PollLabelTask(msg) => self.poll_label.handle(msg).await,
            QueueMessage::FetchLabel(msg) => self.fetch_label.handle(msg).await,
            QueueMessage::ExemplarInfo(msg) => self.exemplar_info.handle(msg).await,
            QueueMessage::WaitingShipment(msg) => self.waiting_shipment.handle(msg).await,
        }
    }
}
