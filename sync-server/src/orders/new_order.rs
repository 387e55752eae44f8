//! Order ingestion use-case

use shared::message::{Lane, OrderStatusMessage, QueueMessage};
use shared::order::OrderStatus;
use std::sync::Arc;

use super::store::{CreateOutcome, NewOrderCommand, OrderStore, OrderStoreError};
use crate::queue::MessageDispatch;

/// Result of handling one creation command
#[derive(Debug)]
pub enum NewOrderOutcome {
    /// The order was created and the status message dispatched
    Created,
    /// The number already existed; nothing happened
    AlreadyExists,
    /// The command was not in the ingestible status
    NotNew,
}

/// Creates internal orders from translated commands.
///
/// Creation is idempotent by number; the status message is only dispatched
/// for genuinely new orders.
pub struct NewOrderHandler {
    store: Arc<OrderStore>,
    queue: Arc<dyn MessageDispatch>,
}

impl NewOrderHandler {
    pub fn new(store: Arc<OrderStore>, queue: Arc<dyn MessageDispatch>) -> Self {
        Self { store, queue }
    }

    pub async fn handle(&self, command: &NewOrderCommand) -> Result<NewOrderOutcome, OrderStoreError> {
        if command.status != OrderStatus::New {
            tracing::warn!(
                number = %command.number,
                status = ?command.status,
                "Refusing to ingest order that is not new"
            );
            return Ok(NewOrderOutcome::NotNew);
        }

        match self.store.create(command)? {
            CreateOutcome::Exists(_) => Ok(NewOrderOutcome::AlreadyExists),
            CreateOutcome::Created(record) => {
                tracing::info!(number = %record.number, "Created order");

                let _ = self
                    .queue
                    .dispatch(
                        QueueMessage::OrderStatus(OrderStatusMessage { order: record.id }),
                        None,
                        Lane::profile(record.profile),
                    )
                    .await;

                Ok(NewOrderOutcome::Created)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::RecordingDispatch;
    use chrono::Utc;
    use shared::ids::{ProfileId, TokenId};
    use shared::order::DeliveryKind;

    fn command(number: &str, status: OrderStatus) -> NewOrderCommand {
        NewOrderCommand {
            number: number.to_string(),
            status,
            delivery: DeliveryKind::FbsOzon,
            profile: ProfileId::new(),
            token: TokenId::new(),
            created_at: Utc::now(),
            shipment_due: None,
            address: None,
            buyer_name: None,
            buyer_phone: None,
            comment: None,
            products: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_ingestion_is_noop() {
        let store = Arc::new(OrderStore::open_in_memory().unwrap());
        let queue = Arc::new(RecordingDispatch::default());
        let handler = NewOrderHandler::new(store.clone(), queue.clone());

        let cmd = command("O-1-1-1", OrderStatus::New);
        assert!(matches!(
            handler.handle(&cmd).await.unwrap(),
            NewOrderOutcome::Created
        ));
        assert!(matches!(
            handler.handle(&cmd).await.unwrap(),
            NewOrderOutcome::AlreadyExists
        ));

        // Only the first ingestion announced a status change
        assert_eq!(queue.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_non_new_status_is_rejected() {
        let store = Arc::new(OrderStore::open_in_memory().unwrap());
        let queue = Arc::new(RecordingDispatch::default());
        let handler = NewOrderHandler::new(store.clone(), queue.clone());

        let cmd = command("O-1-1-1", OrderStatus::Canceled);
        assert!(matches!(
            handler.handle(&cmd).await.unwrap(),
            NewOrderOutcome::NotNew
        ));
        assert!(!store.exists_number("O-1-1-1").unwrap());
    }
}
