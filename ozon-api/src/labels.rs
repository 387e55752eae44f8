//! Label endpoints: asynchronous task create/poll and the direct batch label
//!
//! Label generation is rate-limited aggressively by the marketplace; a 429
//! surfaces as [`OzonError::RateLimited`] so the dispatcher can re-enqueue
//! the whole message after the back-off window instead of blocking a worker.

use reqwest::StatusCode;
use serde_json::json;

use crate::client::{ApiToken, OzonClient};
use crate::error::{
    ApiErrorBody, Outcome, OzonError, OzonResult, NO_POSTINGS_FOR_BATCH_DOWNLOAD,
    POSTING_NUMBERS_INCORRECT_FOR_COMPANY,
};
use crate::types::LabelTaskStatus;
use shared::order::marketplace_number;

/// The direct label endpoint accepts at most this many posting numbers
const LABEL_BATCH_LIMIT: usize = 20;

impl OzonClient {
    /// Create an asynchronous label-generation task for one posting.
    ///
    /// `POST /v2/posting/fbs/package-label/create`. Returns the task id; a
    /// posting that no longer belongs to the company or has no postings left
    /// (cancelled order) is benign.
    pub async fn create_label_task(
        &self,
        token: &ApiToken,
        posting_number: &str,
    ) -> OzonResult<Outcome<i64>> {
        let body = json!({
            "posting_number": [marketplace_number(posting_number)],
        });

        let (status, value) = self
            .post(token, "/v2/posting/fbs/package-label/create", &body)
            .await?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(OzonError::RateLimited);
        }

        if status != StatusCode::OK {
            let error = ApiErrorBody::parse(&value);

            if matches!(
                error.message.as_str(),
                POSTING_NUMBERS_INCORRECT_FOR_COMPANY | NO_POSTINGS_FOR_BATCH_DOWNLOAD
            ) {
                tracing::warn!(
                    posting = %posting_number,
                    message = %error.message,
                    "No label to generate for posting"
                );
                return Ok(Outcome::Benign);
            }

            tracing::warn!(
                code = error.code,
                message = %error.message,
                posting = %posting_number,
                "Failed to create label task"
            );
            return Err(OzonError::Api {
                code: error.code,
                message: error.message,
            });
        }

        let task_id = value
            .get("result")
            .and_then(|r| r.get("tasks"))
            .and_then(|t| t.as_array())
            .and_then(|t| t.first())
            .and_then(|t| t.get("task_id"))
            .and_then(|id| id.as_i64())
            .ok_or_else(|| OzonError::InvalidResponse("label create without task id".into()))?;

        Ok(Outcome::Success(task_id))
    }

    /// Poll a label-generation task.
    ///
    /// `POST /v1/posting/fbs/package-label/get`
    pub async fn get_label_task(
        &self,
        token: &ApiToken,
        task_id: i64,
    ) -> OzonResult<LabelTaskStatus> {
        let body = json!({"task_id": task_id});

        let (status, value) = self
            .post(token, "/v1/posting/fbs/package-label/get", &body)
            .await?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(OzonError::RateLimited);
        }

        if status != StatusCode::OK {
            let error = ApiErrorBody::parse(&value);
            tracing::warn!(
                code = error.code,
                message = %error.message,
                task = task_id,
                "Failed to poll label task"
            );
            return Err(OzonError::Api {
                code: error.code,
                message: error.message,
            });
        }

        let result = value
            .get("result")
            .ok_or_else(|| OzonError::InvalidResponse("missing result".into()))?;

        let task_status = result.get("status").and_then(|s| s.as_str()).unwrap_or("");

        if task_status == "completed" {
            let file_url = result
                .get("file_url")
                .and_then(|u| u.as_str())
                .ok_or_else(|| OzonError::InvalidResponse("completed task without file_url".into()))?;

            return Ok(LabelTaskStatus::Completed {
                file_url: file_url.to_string(),
            });
        }

        Ok(LabelTaskStatus::Pending)
    }

    /// Generate the label PDF for up to 20 postings in one call.
    ///
    /// `POST /v2/posting/fbs/package-label`. The marketplace recommends
    /// requesting 45-60 seconds after packaging; "not ready" responses are
    /// plain errors the caller retries later.
    pub async fn label_batch(
        &self,
        token: &ApiToken,
        posting_numbers: &[String],
    ) -> OzonResult<Outcome<Vec<u8>>> {
        if posting_numbers.is_empty() || posting_numbers.len() > LABEL_BATCH_LIMIT {
            return Err(OzonError::InvalidArgument(
                "label_batch takes between 1 and 20 posting numbers",
            ));
        }

        let numbers: Vec<&str> = posting_numbers
            .iter()
            .map(|n| marketplace_number(n))
            .collect();
        let body = json!({"posting_number": numbers});

        let (status, bytes) = self
            .post_bytes(token, "/v2/posting/fbs/package-label", &body)
            .await?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(OzonError::RateLimited);
        }

        if status != StatusCode::OK {
            let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap_or_default();
            let error = ApiErrorBody::parse(&value);

            if error.message == NO_POSTINGS_FOR_BATCH_DOWNLOAD {
                return Ok(Outcome::Benign);
            }

            tracing::warn!(
                code = error.code,
                message = %error.message,
                "Failed to download batch label"
            );
            return Err(OzonError::Api {
                code: error.code,
                message: error.message,
            });
        }

        Ok(Outcome::Success(bytes))
    }
}
