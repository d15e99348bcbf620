//! PostgREST client for the `payments` table.

use async_trait::async_trait;
use chanda_core::{
    BackendError, ChandaResult, ConfigError, NewPayment, PaymentId, PaymentPatch, PaymentRow,
    StoreSettings, PAYMENT_COLUMNS,
};
use chanda_storage::PaymentStore;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

const PREFER_REPRESENTATION: &str = "return=representation";
/// Asks PostgREST for a single object instead of a one-element array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// HTTP payment store.
#[derive(Clone)]
pub struct RestStore {
    client: reqwest::Client,
    table_url: String,
    auth_headers: HeaderMap,
}

impl std::fmt::Debug for RestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestStore")
            .field("table_url", &self.table_url)
            .finish_non_exhaustive()
    }
}

impl RestStore {
    /// Build a client from validated settings.
    pub fn new(settings: &StoreSettings) -> ChandaResult<Self> {
        settings.validate()?;

        let api_key = SecretString::from(settings.api_key.clone());
        let auth_headers = build_auth_headers(&api_key)?;
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "store".to_string(),
                value: settings.base_url.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            table_url: table_url(&settings.base_url, &settings.table),
            auth_headers,
        })
    }

    pub fn table_url(&self) -> &str {
        &self.table_url
    }

    /// Send a mutation filtered to one id and fail when nothing matched.
    async fn mutate_one(
        &self,
        request: reqwest::RequestBuilder,
        id: &PaymentId,
    ) -> Result<(), BackendError> {
        let response = request
            .headers(self.auth_headers.clone())
            .header("prefer", PREFER_REPRESENTATION)
            .query(&[id_filter(id), ("select", "id".to_string())])
            .send()
            .await
            .map_err(transport_error)?;
        let affected: Vec<serde_json::Value> = parse_response(response).await?;
        if affected.is_empty() {
            return Err(not_found(id));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for RestStore {
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<PaymentRow>, BackendError> {
        tracing::debug!(url = %self.table_url, limit, "GET payments");
        let response = self
            .client
            .get(&self.table_url)
            .headers(self.auth_headers.clone())
            .query(&list_query(limit))
            .send()
            .await
            .map_err(transport_error)?;
        parse_response(response).await
    }

    async fn insert(&self, payment: &NewPayment) -> Result<PaymentRow, BackendError> {
        tracing::debug!(url = %self.table_url, "POST payment");
        let response = self
            .client
            .post(&self.table_url)
            .headers(self.auth_headers.clone())
            .header("prefer", PREFER_REPRESENTATION)
            .header(ACCEPT, SINGLE_OBJECT)
            .query(&[("select", PAYMENT_COLUMNS)])
            .json(&InsertBody::from(payment))
            .send()
            .await
            .map_err(transport_error)?;
        parse_response(response).await
    }

    async fn update(&self, id: &PaymentId, patch: &PaymentPatch) -> Result<(), BackendError> {
        tracing::debug!(url = %self.table_url, id = %id, "PATCH payment");
        let request = self.client.patch(&self.table_url).json(&PatchBody::from(patch));
        self.mutate_one(request, id).await
    }

    async fn delete(&self, id: &PaymentId) -> Result<(), BackendError> {
        tracing::debug!(url = %self.table_url, id = %id, "DELETE payment");
        let request = self.client.delete(&self.table_url);
        self.mutate_one(request, id).await
    }
}

// ============================================================================
// REQUEST SHAPES
// ============================================================================

#[derive(Debug, Serialize)]
struct InsertBody<'a> {
    name: &'a str,
    amount: f64,
    branch: &'a str,
    screenshot_url: &'a str,
}

impl<'a> From<&'a NewPayment> for InsertBody<'a> {
    fn from(payment: &'a NewPayment) -> Self {
        Self {
            name: &payment.name,
            amount: payment.amount.value(),
            branch: &payment.branch,
            screenshot_url: &payment.screenshot,
        }
    }
}

/// Only present fields are serialized, so absent columns stay untouched.
#[derive(Debug, Serialize)]
struct PatchBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    screenshot_url: Option<&'a str>,
}

impl<'a> From<&'a PaymentPatch> for PatchBody<'a> {
    fn from(patch: &'a PaymentPatch) -> Self {
        Self {
            name: patch.name.as_deref(),
            amount: patch.amount.map(|a| a.value()),
            branch: patch.branch.as_deref(),
            screenshot_url: patch.screenshot.as_deref(),
        }
    }
}

/// PostgREST error body.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

fn table_url(base_url: &str, table: &str) -> String {
    format!("{}/rest/v1/{}", base_url.trim().trim_end_matches('/'), table)
}

fn list_query(limit: usize) -> [(&'static str, String); 3] {
    [
        ("select", PAYMENT_COLUMNS.to_string()),
        ("order", "created_at.desc".to_string()),
        ("limit", limit.to_string()),
    ]
}

fn id_filter(id: &PaymentId) -> (&'static str, String) {
    ("id", format!("eq.{}", id))
}

fn build_auth_headers(api_key: &SecretString) -> Result<HeaderMap, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        field: "store.api_key".to_string(),
        value: "[REDACTED]".to_string(),
        reason,
    };

    let mut apikey = HeaderValue::from_str(api_key.expose_secret())
        .map_err(|e| invalid(e.to_string()))?;
    apikey.set_sensitive(true);
    let mut bearer = HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
        .map_err(|e| invalid(e.to_string()))?;
    bearer.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static("apikey"), apikey);
    headers.insert(AUTHORIZATION, bearer);
    Ok(headers)
}

// ============================================================================
// RESPONSES
// ============================================================================

async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, BackendError> {
    let status = response.status();
    let text = response.text().await.map_err(transport_error)?;
    if status.is_success() {
        serde_json::from_str(&text).map_err(|e| {
            BackendError::with_status(status.as_u16(), format!("Unexpected response: {}", e))
        })
    } else {
        Err(error_from_body(status.as_u16(), &text))
    }
}

/// Decode an error response into a [`BackendError`].
fn error_from_body(status: u16, body: &str) -> BackendError {
    match serde_json::from_str::<PostgrestError>(body) {
        Ok(err) => {
            tracing::debug!(
                status,
                code = err.code.as_deref().unwrap_or(""),
                details = err.details.as_deref().unwrap_or(""),
                hint = err.hint.as_deref().unwrap_or(""),
                "Store rejected request"
            );
            BackendError::with_status(status, err.message)
        }
        Err(_) => BackendError::with_status(status, format!("HTTP {}: {}", status, body)),
    }
}

fn transport_error(err: reqwest::Error) -> BackendError {
    BackendError {
        status: err.status().map(|s| s.as_u16()),
        message: err.to_string(),
    }
}

fn not_found(id: &PaymentId) -> BackendError {
    BackendError::with_status(404, format!("no payment with id {}", id))
}
