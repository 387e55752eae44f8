//! Client seam
//!
//! The dispatchers depend on this trait rather than the concrete client so
//! tests can substitute a scripted marketplace.

use async_trait::async_trait;

use crate::client::{ApiToken, OzonClient};
use crate::error::{Outcome, OzonResult};
use crate::types::{ExemplarState, LabelTaskStatus, ListPostingsRequest, Posting, ShipRequest, ShipResult};

/// Seller API surface used by the synchronization workflows
#[async_trait]
pub trait OzonApi: Send + Sync {
    async fn list_postings(
        &self,
        token: &ApiToken,
        request: &ListPostingsRequest,
    ) -> OzonResult<Vec<Posting>>;

    async fn get_posting(&self, token: &ApiToken, posting_number: &str) -> OzonResult<Posting>;

    async fn ship(&self, token: &ApiToken, request: &ShipRequest) -> OzonResult<Outcome<ShipResult>>;

    async fn awaiting_delivery(
        &self,
        token: &ApiToken,
        posting_number: &str,
    ) -> OzonResult<Outcome<()>>;

    async fn delivering(&self, token: &ApiToken, posting_number: &str) -> OzonResult<Outcome<()>>;

    async fn delivered(&self, token: &ApiToken, posting_number: &str) -> OzonResult<Outcome<()>>;

    async fn create_label_task(
        &self,
        token: &ApiToken,
        posting_number: &str,
    ) -> OzonResult<Outcome<i64>>;

    async fn get_label_task(&self, token: &ApiToken, task_id: i64) -> OzonResult<LabelTaskStatus>;

    async fn label_batch(
        &self,
        token: &ApiToken,
        posting_numbers: &[String],
    ) -> OzonResult<Outcome<Vec<u8>>>;

    async fn download(&self, url: &str) -> OzonResult<Vec<u8>>;

    async fn exemplar_status(
        &self,
        token: &ApiToken,
        posting_number: &str,
    ) -> OzonResult<ExemplarState>;

    async fn exemplar_set(
        &self,
        token: &ApiToken,
        posting_number: &str,
        state: &ExemplarState,
    ) -> OzonResult<Outcome<()>>;
}

#[async_trait]
impl OzonApi for OzonClient {
    async fn list_postings(
        &self,
        token: &ApiToken,
        request: &ListPostingsRequest,
    ) -> OzonResult<Vec<Posting>> {
        OzonClient::list_postings(self, token, request).await
    }

    async fn get_posting(&self, token: &ApiToken, posting_number: &str) -> OzonResult<Posting> {
        OzonClient::get_posting(self, token, posting_number).await
    }

    async fn ship(&self, token: &ApiToken, request: &ShipRequest) -> OzonResult<Outcome<ShipResult>> {
        OzonClient::ship(self, token, request).await
    }

    async fn awaiting_delivery(
        &self,
        token: &ApiToken,
        posting_number: &str,
    ) -> OzonResult<Outcome<()>> {
        OzonClient::awaiting_delivery(self, token, posting_number).await
    }

    async fn delivering(&self, token: &ApiToken, posting_number: &str) -> OzonResult<Outcome<()>> {
        OzonClient::delivering(self, token, posting_number).await
    }

    async fn delivered(&self, token: &ApiToken, posting_number: &str) -> OzonResult<Outcome<()>> {
        OzonClient::delivered(self, token, posting_number).await
    }

    async fn create_label_task(
        &self,
        token: &ApiToken,
        posting_number: &str,
    ) -> OzonResult<Outcome<i64>> {
        OzonClient::create_label_task(self, token, posting_number).await
    }

    async fn get_label_task(&self, token: &ApiToken, task_id: i64) -> OzonResult<LabelTaskStatus> {
        OzonClient::get_label_task(self, token, task_id).await
    }

    async fn label_batch(
        &self,
        token: &ApiToken,
        posting_numbers: &[String],
    ) -> OzonResult<Outcome<Vec<u8>>> {
        OzonClient::label_batch(self, token, posting_numbers).await
    }

    async fn download(&self, url: &str) -> OzonResult<Vec<u8>> {
        OzonClient::download(self, url).await
    }

    async fn exemplar_status(
        &self,
        token: &ApiToken,
        posting_number: &str,
    ) -> OzonResult<ExemplarState> {
        OzonClient::exemplar_status(self, token, posting_number).await
    }

    async fn exemplar_set(
        &self,
        token: &ApiToken,
        posting_number: &str,
        state: &ExemplarState,
    ) -> OzonResult<Outcome<()>> {
        OzonClient::exemplar_set(self, token, posting_number, state).await
    }
}
