//! HTTP transport for the analysis service.

use async_trait::async_trait;
use std::time::Duration;

use super::{AnalysisClient, Capability};
use crate::errors::{AnalysisError, GeneratorError, Result};

/// Posts each capability call as JSON to `{endpoint}/{capability}`.
#[derive(Debug, Clone)]
pub struct HttpAnalysisClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpAnalysisClient {
    /// Creates a client with a per-request timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GeneratorError::Configuration(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: None,
        })
    }

    /// Sets the bearer token sent with every call.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// URL a capability is posted to.
    #[must_use]
    pub fn capability_url(&self, capability: Capability) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), capability)
    }
}

#[async_trait]
impl AnalysisClient for HttpAnalysisClient {
    async fn call(
        &self,
        capability: Capability,
        request: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let url = self.capability_url(capability);
        tracing::debug!(%capability, %url, "Calling analysis service");

        let mut builder = self.client.post(&url).json(&request);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AnalysisError::new(capability.as_str(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::new(capability.as_str(), body)
                .with_status(status.as_u16())
                .into());
        }

        response.json().await.map_err(|e| {
            AnalysisError::new(capability.as_str(), format!("invalid JSON body: {e}")).into()
        })
    }
}
