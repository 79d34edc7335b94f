//! Client for the Azure AI Vision Image Analysis 4.0 REST API.

use std::time::Duration;

use reqwest::{header, Client};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::analysis::AnalysisResult;
use crate::error::{AnalyzerError, Result};

pub const API_VERSION: &str = "2023-10-01";
const ANALYZE_PATH: &str = "computervision/imageanalysis:analyze";
const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualFeature {
    Caption,
    DenseCaptions,
    Tags,
    Objects,
    People,
}

impl VisualFeature {
    pub const ALL: [VisualFeature; 5] = [
        VisualFeature::Caption,
        VisualFeature::DenseCaptions,
        VisualFeature::Tags,
        VisualFeature::Objects,
        VisualFeature::People,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VisualFeature::Caption => "caption",
            VisualFeature::DenseCaptions => "denseCaptions",
            VisualFeature::Tags => "tags",
            VisualFeature::Objects => "objects",
            VisualFeature::People => "people",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub key: String,
    /// `None` waits for the service indefinitely.
    pub timeout: Option<Duration>,
    pub language: Option<String>,
    pub gender_neutral_caption: Option<bool>,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            key: key.into(),
            timeout: None,
            language: None,
            gender_neutral_caption: None,
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ServiceError,
}

#[derive(Deserialize)]
struct ServiceError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub struct VisionClient {
    client: Client,
    config: ClientConfig,
}

impl VisionClient {
    pub fn new(mut config: ClientConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| AnalyzerError::remote("Client configuration failed", e.to_string()))?;

        config.endpoint = config.endpoint.trim_end_matches('/').to_string();
        info!("Vision client configured: endpoint={}", config.endpoint);

        Ok(Self { client, config })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    pub fn analyze_url(&self) -> String {
        format!("{}/{}", self.config.endpoint, ANALYZE_PATH)
    }

    fn query(&self, features: &[VisualFeature]) -> Vec<(&'static str, String)> {
        let features = features
            .iter()
            .map(VisualFeature::as_str)
            .collect::<Vec<_>>()
            .join(",");

        let mut query = vec![("api-version", API_VERSION.to_string()), ("features", features)];
        if let Some(language) = &self.config.language {
            query.push(("language", language.clone()));
        }
        if let Some(neutral) = self.config.gender_neutral_caption {
            query.push(("gender-neutral-caption", neutral.to_string()));
        }
        query
    }

    /// Send raw image bytes for analysis. Blocks the calling task until the
    /// service answers, the request fails, or the configured timeout passes.
    pub async fn analyze(
        &self,
        image: &[u8],
        features: &[VisualFeature],
    ) -> Result<AnalysisResult> {
        debug!(
            "📤 Sending {} bytes to vision service, features={:?}",
            image.len(),
            features
        );

        let response = self
            .client
            .post(self.analyze_url())
            .query(&self.query(features))
            .header(KEY_HEADER, &self.config.key)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        debug!("Vision service status: {}", status);

        if !status.is_success() {
            let (code, message) = match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) => (envelope.error.code, envelope.error.message),
                Err(_) => (None, None),
            };
            let reason = status
                .canonical_reason()
                .map(str::to_string)
                .or(code)
                .unwrap_or_else(|| status.as_str().to_string());
            let message = message.unwrap_or(body);
            warn!("Vision service rejected request: {} {}", status, message);
            return Err(AnalyzerError::RemoteService { reason, message });
        }

        AnalysisResult::from_json(&body).map_err(|e| {
            warn!("Unreadable analysis result: {}", e);
            AnalyzerError::remote("Invalid response", e.to_string())
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> AnalyzerError {
        if e.is_timeout() {
            if let Some(timeout) = self.config.timeout {
                return AnalyzerError::Timeout(timeout);
            }
        }
        warn!("Vision service request failed: {}", e);
        AnalyzerError::remote("Service request failed", e.to_string())
    }
}
