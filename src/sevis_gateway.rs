// src/sevis_gateway.rs

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::domain::sevis::SevisBatch;

#[derive(Debug, Error)]
pub enum SevisError {
    #[error("SEVIS endpoint is not configured")]
    NotConfigured,
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("API error: {0}")]
    ApiError(String),
}

/// One participant record as sent to SEVIS.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SevisRecord {
    pub participant_id: String,
    pub student_id: String,
    pub sevis_id: Option<String>,
    pub processing_type: String,
    pub field_path: String,
    pub new_value: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchPayload<'a> {
    batch_id: &'a str,
    batch_name: &'a str,
    records: &'a [SevisRecord],
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOutcome {
    pub participant_id: String,
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize)]
struct BatchResponse {
    results: Vec<RecordOutcome>,
}

/// Where SEVIS batches go. Production uses [`HttpSevisGateway`].
pub trait SevisGateway: Send + Sync {
    fn submit(&self, batch: &SevisBatch, records: &[SevisRecord]) -> Result<Vec<RecordOutcome>, SevisError>;
}

pub struct HttpSevisGateway {
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpSevisGateway {
    pub fn new(endpoint: String, api_key: Option<String>) -> Result<Self, SevisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| SevisError::RequestFailed(e.to_string()))?;
        Ok(Self {
            endpoint,
            api_key,
            client,
        })
    }
}

impl SevisGateway for HttpSevisGateway {
    fn submit(&self, batch: &SevisBatch, records: &[SevisRecord]) -> Result<Vec<RecordOutcome>, SevisError> {
        let payload = BatchPayload {
            batch_id: &batch.id,
            batch_name: &batch.name,
            records,
        };

        let mut req = self
            .client
            .post(format!("{}/batches", self.endpoint.trim_end_matches('/')))
            .header("Content-Type", "application/json")
            .json(&payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .map_err(|e| SevisError::RequestFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_body = resp.text().unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SevisError::ApiError(format!("{status}: {error_body}")));
        }

        let parsed: BatchResponse = resp
            .json()
            .map_err(|e| SevisError::ApiError(format!("unreadable response: {e}")))?;
        Ok(parsed.results)
    }
}
