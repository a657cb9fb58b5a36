use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::CloudflareConfig;
use super::ApiResult;

pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Management API client for a single zone. Auth headers are fixed at construction.
pub struct CloudflareClient {
    client: Client,
    base_url: String,
    zone_id: String,
}

impl CloudflareClient {
    pub fn new(config: &CloudflareConfig) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_token))
            .context("Cloudflare API token is not a valid header value")?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .context("Failed to build Cloudflare HTTP client")?;

        Ok(Self {
            client,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            zone_id: config.zone_id.clone(),
        })
    }

    fn zone_url(&self, path: &str) -> String {
        format!("{}/zones/{}/{}", self.base_url, self.zone_id, path)
    }

    /// Invalidates every cached object of the zone on the edge.
    pub async fn purge_everything(&self) -> Result<ApiResult<CloudflareEnvelope<Option<PurgeResult>>>> {
        let url = self.zone_url("purge_cache");
        info!("Purging entire cache for zone {}", self.zone_id);

        let request = self
            .client
            .post(&url)
            .json(&PurgeRequest { purge_everything: true });

        let outcome: ApiResult<CloudflareEnvelope<Option<PurgeResult>>> =
            self.execute(request, "purge").await?;

        if let ApiResult::Success(envelope) = &outcome {
            if envelope.success == Some(false) {
                warn!("Purge returned HTTP 200 but success=false: {}", join_errors(&envelope.errors));
            }
        }

        Ok(outcome)
    }

    pub async fn get_zone_settings(&self) -> Result<ApiResult<CloudflareEnvelope<Vec<ZoneSetting>>>> {
        let url = self.zone_url("settings");
        self.execute(self.client.get(&url), "settings").await
    }

    pub async fn get_dns_records(&self) -> Result<ApiResult<CloudflareEnvelope<Vec<DnsRecord>>>> {
        let url = self.zone_url("dns_records");
        self.execute(self.client.get(&url), "DNS records").await
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<ApiResult<T>> {
        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send {} request to Cloudflare", what))?;

        let status = response.status();
        debug!("Cloudflare {} request to {} returned {}", what, response.url(), status);

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_else(|e| {
                warn!("Failed to read Cloudflare {} error body: {}", what, e);
                String::new()
            });
            return Ok(ApiResult::Failure { status, body });
        }

        let payload = response
            .json()
            .await
            .with_context(|| format!("Failed to parse Cloudflare {} response", what))?;

        Ok(ApiResult::Success(payload))
    }
}

/// Renders a failure body as `code: message` pairs when it is a Cloudflare error
/// document, otherwise returns the body unchanged.
pub fn error_summary(body: &str) -> String {
    match serde_json::from_str::<CloudflareErrorBody>(body) {
        Ok(parsed) if !parsed.errors.is_empty() => join_errors(&parsed.errors),
        _ => body.trim().to_string(),
    }
}

fn join_errors(errors: &[CloudflareError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

// Cloudflare API types

#[derive(Debug, Serialize)]
struct PurgeRequest {
    purge_everything: bool,
}

#[derive(Debug, Deserialize)]
pub struct CloudflareEnvelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub errors: Vec<CloudflareError>,
    #[allow(dead_code)]
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
    pub result: T,
}

#[derive(Debug, Deserialize)]
struct CloudflareErrorBody {
    #[serde(default)]
    errors: Vec<CloudflareError>,
}

#[derive(Debug, Deserialize)]
pub struct CloudflareError {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct PurgeResult {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ZoneSetting {
    pub id: String,
    pub value: serde_json::Value,
    #[serde(default)]
    pub editable: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DnsRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub content: String,
    #[serde(default)]
    pub proxied: bool,
}

impl DnsRecord {
    /// Only address-bearing records are worth showing before a purge.
    pub fn is_displayed(&self) -> bool {
        matches!(self.record_type.as_str(), "A" | "CNAME")
    }
}
