//! Posting endpoints: list, detail, packaging, status transitions
//!
//! Each wrapper performs exactly one HTTP call and maps the marketplace's
//! domain error codes to success-equivalent outcomes where the operation is
//! already done on the remote side.

use chrono::SecondsFormat;
use reqwest::StatusCode;
use serde_json::json;

use crate::client::{ApiToken, OzonClient};
use crate::error::{
    ApiErrorBody, Outcome, OzonError, OzonResult, EXEMPLAR_INFO_NOT_FILLED, HAS_INCORRECT_STATUS,
    POSTING_ALREADY_CANCELLED, POSTING_ALREADY_SHIPPED,
};
use crate::types::{ExemplarState, ListPostingsRequest, Posting, ShipRequest, ShipResult};
use shared::order::marketplace_number;

/// Maximum page size of the list endpoint
const LIST_LIMIT: u32 = 1000;

impl OzonClient {
    /// Fetch postings filtered by status and time window.
    ///
    /// `POST /v3/posting/fbs/list`, single page of up to 1000 entries per
    /// poll (`dir=DESC`).
    pub async fn list_postings(
        &self,
        token: &ApiToken,
        request: &ListPostingsRequest,
    ) -> OzonResult<Vec<Posting>> {
        let mut filter = json!({
            "since": request.since.to_rfc3339_opts(SecondsFormat::Secs, true),
            "to": request.to.to_rfc3339_opts(SecondsFormat::Secs, true),
            "status": request.status.as_filter(),
        });

        if let Some(warehouse) = request.warehouse_id {
            filter["warehouse_id"] = json!([warehouse]);
        }

        let body = json!({
            "dir": "DESC",
            "limit": LIST_LIMIT,
            "filter": filter,
        });

        let (status, value) = self.post(token, "/v3/posting/fbs/list", &body).await?;

        if status != StatusCode::OK {
            let error = ApiErrorBody::parse(&value);
            tracing::error!(
                code = error.code,
                message = %error.message,
                status = %request.status.as_filter(),
                "Failed to list postings"
            );
            return Err(OzonError::Api {
                code: error.code,
                message: error.message,
            });
        }

        let postings = value
            .get("result")
            .and_then(|r| r.get("postings"))
            .cloned()
            .ok_or_else(|| OzonError::InvalidResponse("missing result.postings".into()))?;

        Ok(serde_json::from_value(postings)?)
    }

    /// Fetch the canonical detail of one posting.
    ///
    /// `POST /v3/posting/fbs/get`
    pub async fn get_posting(&self, token: &ApiToken, posting_number: &str) -> OzonResult<Posting> {
        let body = json!({
            "posting_number": marketplace_number(posting_number),
        });

        let (status, value) = self.post(token, "/v3/posting/fbs/get", &body).await?;

        if status != StatusCode::OK {
            let error = ApiErrorBody::parse(&value);
            tracing::error!(
                code = error.code,
                message = %error.message,
                posting = %posting_number,
                "Failed to fetch posting detail"
            );
            return Err(OzonError::Api {
                code: error.code,
                message: error.message,
            });
        }

        let result = value
            .get("result")
            .cloned()
            .ok_or_else(|| OzonError::InvalidResponse("missing result".into()))?;

        Ok(serde_json::from_value(result)?)
    }

    /// Split an order into packages and move it to `awaiting_deliver`.
    ///
    /// `POST /v4/posting/fbs/ship`. "Already shipped", "already cancelled",
    /// "incorrect status" and "exemplar info not filled" responses mean the
    /// split exists remotely and are reported as [`Outcome::Benign`].
    pub async fn ship(
        &self,
        token: &ApiToken,
        request: &ShipRequest,
    ) -> OzonResult<Outcome<ShipResult>> {
        if !self.execute {
            return Ok(Outcome::Benign);
        }

        if request.packages.is_empty() {
            return Err(OzonError::InvalidArgument("ship called without packages"));
        }

        let body = json!({
            "packages": request.packages,
            "posting_number": marketplace_number(&request.posting_number),
            "with": {"additional_data": true},
        });

        let (status, value) = self.post(token, "/v4/posting/fbs/ship", &body).await?;

        if status != StatusCode::OK {
            let error = ApiErrorBody::parse(&value);

            if matches!(
                error.message.as_str(),
                POSTING_ALREADY_SHIPPED
                    | POSTING_ALREADY_CANCELLED
                    | EXEMPLAR_INFO_NOT_FILLED
                    | HAS_INCORRECT_STATUS
            ) {
                tracing::warn!(
                    posting = %request.posting_number,
                    message = %error.message,
                    "Ship already applied remotely"
                );
                return Ok(Outcome::Benign);
            }

            tracing::error!(
                code = error.code,
                message = %error.message,
                posting = %request.posting_number,
                "Failed to ship posting"
            );
            return Err(OzonError::Api {
                code: error.code,
                message: error.message,
            });
        }

        if value.get("result").is_none() {
            return Err(OzonError::InvalidResponse("ship response without result".into()));
        }

        Ok(Outcome::Success(serde_json::from_value(value)?))
    }

    /// Move a posting to the awaiting-shipment state.
    ///
    /// `POST /v2/posting/fbs/awaiting-delivery`
    pub async fn awaiting_delivery(
        &self,
        token: &ApiToken,
        posting_number: &str,
    ) -> OzonResult<Outcome<()>> {
        self.posting_transition(token, "/v2/posting/fbs/awaiting-delivery", posting_number)
            .await
    }

    /// Report a merchant-delivered posting as in delivery.
    ///
    /// `POST /v2/fbs/posting/delivering`
    pub async fn delivering(
        &self,
        token: &ApiToken,
        posting_number: &str,
    ) -> OzonResult<Outcome<()>> {
        self.posting_transition(token, "/v2/fbs/posting/delivering", posting_number)
            .await
    }

    /// Report a merchant-delivered posting as delivered.
    ///
    /// `POST /v2/fbs/posting/delivered`
    pub async fn delivered(
        &self,
        token: &ApiToken,
        posting_number: &str,
    ) -> OzonResult<Outcome<()>> {
        self.posting_transition(token, "/v2/fbs/posting/delivered", posting_number)
            .await
    }

    /// Shared shape of the posting status-transition endpoints: a list with
    /// one posting number, benign already-shipped/cancelled mapping.
    async fn posting_transition(
        &self,
        token: &ApiToken,
        path: &str,
        posting_number: &str,
    ) -> OzonResult<Outcome<()>> {
        if !self.execute {
            tracing::debug!(posting = %posting_number, path, "Skipping mutating call outside production");
            return Ok(Outcome::Benign);
        }

        let body = json!({
            "posting_number": [marketplace_number(posting_number)],
        });

        let (status, value) = self.post(token, path, &body).await?;

        if status != StatusCode::OK {
            let error = ApiErrorBody::parse(&value);

            if matches!(
                error.message.as_str(),
                POSTING_ALREADY_SHIPPED | POSTING_ALREADY_CANCELLED | HAS_INCORRECT_STATUS
            ) {
                return Ok(Outcome::Benign);
            }

            tracing::error!(
                code = error.code,
                message = %error.message,
                posting = %posting_number,
                path,
                "Posting status transition failed"
            );
            return Err(OzonError::Api {
                code: error.code,
                message: error.message,
            });
        }

        Ok(Outcome::Success(()))
    }

    /// Fetch the exemplar (marking code) readiness of a posting.
    ///
    /// `POST /v4/fbs/posting/product/exemplar/status`
    pub async fn exemplar_status(
        &self,
        token: &ApiToken,
        posting_number: &str,
    ) -> OzonResult<ExemplarState> {
        let body = json!({
            "posting_number": marketplace_number(posting_number),
        });

        let (status, value) = self
            .post(token, "/v4/fbs/posting/product/exemplar/status", &body)
            .await?;

        if status != StatusCode::OK {
            let error = ApiErrorBody::parse(&value);
            return Err(OzonError::Api {
                code: error.code,
                message: error.message,
            });
        }

        let result = value
            .get("result")
            .cloned()
            .ok_or_else(|| OzonError::InvalidResponse("missing result".into()))?;

        let ship_available = result
            .get("status")
            .and_then(|s| s.as_str())
            .map(|s| s == "ship_available")
            .unwrap_or(false);

        let products = result
            .get("products")
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default();

        Ok(ExemplarState {
            ship_available,
            products,
        })
    }

    /// Push exemplar data (GTD and marking codes) for a posting.
    ///
    /// `POST /v4/fbs/posting/product/exemplar/set`
    pub async fn exemplar_set(
        &self,
        token: &ApiToken,
        posting_number: &str,
        state: &ExemplarState,
    ) -> OzonResult<Outcome<()>> {
        if !self.execute {
            return Ok(Outcome::Benign);
        }

        let body = json!({
            "posting_number": marketplace_number(posting_number),
            "products": state.products,
        });

        let (status, value) = self
            .post(token, "/v4/fbs/posting/product/exemplar/set", &body)
            .await?;

        if status != StatusCode::OK {
            let error = ApiErrorBody::parse(&value);

            if error.message == HAS_INCORRECT_STATUS {
                return Ok(Outcome::Benign);
            }

            return Err(OzonError::Api {
                code: error.code,
                message: error.message,
            });
        }

        Ok(Outcome::Success(()))
    }
}
