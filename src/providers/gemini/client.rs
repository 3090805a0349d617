//! Gemini Client Implementation
//!
//! Issues `streamGenerateContent` (SSE) and `generateContent` calls. The API
//! key travels in the `x-goog-api-key` header, never in the URL.

use reqwest::Client as HttpClient;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use super::payload::RequestPayload;
use super::streaming::{GeminiEventConverter, chunk_stream};
use super::types::GenerateContentRequest;
use crate::config::{DEFAULT_API_BASE_URL, Settings, Timeouts};
use crate::error::{Result, VideoError, classify_http_error};
use crate::models::resolve_model_name;
use crate::observability::{mask_secret, truncate_for_log};
use crate::retry::ConnectRetry;
use crate::stream::{ChunkStream, FinishReason};
use crate::utils::{CancelHandle, cancel::wrap_stream, join_url};

/// Result of a non-streaming call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Generation {
    pub text: String,
    pub finish_reason: Option<FinishReason>,
}

/// Gemini API client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http_client: HttpClient,
    base_url: String,
    api_key: SecretString,
    model: String,
    timeouts: Timeouts,
    retry: ConnectRetry,
}

impl GeminiClient {
    /// Create a client for `model`. Fails with `MissingApiKey` on an empty key.
    pub fn new(api_key: impl Into<String>, model: impl AsRef<str>) -> Result<Self> {
        let timeouts = Timeouts::default();
        let http_client = HttpClient::builder()
            .connect_timeout(timeouts.stream_connect)
            .build()
            .map_err(|e| VideoError::ConfigurationError(format!("Failed to create HTTP client: {e}")))?;
        Self::with_http_client(api_key, model, http_client)
    }

    /// Create a client with a custom HTTP client.
    pub fn with_http_client(
        api_key: impl Into<String>,
        model: impl AsRef<str>,
        http_client: HttpClient,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(VideoError::MissingApiKey(
                "GEMINI_API_KEY is not set".to_string(),
            ));
        }
        Ok(Self {
            http_client,
            base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: SecretString::from(api_key),
            model: resolve_model_name(model.as_ref()).to_string(),
            timeouts: Timeouts::default(),
            retry: ConnectRetry::default(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = Self::new(settings.api_key(), &settings.default_model)?
            .with_base_url(settings.api_base_url.clone());
        tracing::debug!(
            model = %client.model,
            base_url = %client.base_url,
            api_key = %mask_secret(settings.api_key()),
            "Gemini client configured"
        );
        Ok(client)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_connect_retry(mut self, retry: ConnectRetry) -> Self {
        self.retry = retry;
        self
    }

    /// Same client, different model.
    pub fn with_model(&self, model: impl AsRef<str>) -> Self {
        let mut client = self.clone();
        client.model = resolve_model_name(model.as_ref()).to_string();
        client
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    fn endpoint(&self, method: &str) -> String {
        join_url(&self.base_url, &format!("models/{}:{method}", self.model))
    }

    /// One POST attempt; any non-success status is classified.
    async fn send_once(&self, url: &str, body: &GenerateContentRequest) -> Result<reqwest::Response> {
        let request = self
            .http_client
            .post(url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(body)
            .send();

        let response = match tokio::time::timeout(self.timeouts.stream_connect, request).await {
            Ok(sent) => sent?,
            Err(_) => {
                return Err(VideoError::TimeoutError(format!(
                    "no response from Gemini within {}s",
                    self.timeouts.stream_connect.as_secs()
                )));
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let error = classify_http_error(status.as_u16(), &body);
        tracing::warn!(
            status = status.as_u16(),
            error = %error,
            body = %truncate_for_log(&body, 300),
            "Gemini request rejected"
        );
        Err(error)
    }

    /// Connect with retries on transport failures only.
    async fn connect(&self, url: &str, body: &GenerateContentRequest) -> Result<reqwest::Response> {
        self.retry.run(|| self.send_once(url, body)).await
    }

    /// Stream a generation for an assembled payload.
    pub async fn stream(&self, payload: &RequestPayload, cancel: CancelHandle) -> Result<ChunkStream> {
        let request = payload.to_request()?;
        self.stream_request(&request, cancel).await
    }

    /// Stream a generation for a raw request.
    ///
    /// Retries happen only while connecting; once the response is open no
    /// chunk is ever replayed. Cancelling `cancel` ends the stream and drops
    /// the connection. Cancelling before the response arrives returns
    /// [`VideoError::Cancelled`].
    pub async fn stream_request(
        &self,
        request: &GenerateContentRequest,
        cancel: CancelHandle,
    ) -> Result<ChunkStream> {
        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        let deadline = tokio::time::Instant::now() + self.timeouts.max_generation;
        tracing::debug!(model = %self.model, "opening Gemini stream");

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(VideoError::Cancelled),
            response = self.connect(&url, request) => response?,
        };

        let stream = chunk_stream(response, GeminiEventConverter::new(), deadline);
        Ok(wrap_stream(stream, cancel))
    }

    /// Non-streaming generation for an assembled payload.
    pub async fn generate(&self, payload: &RequestPayload) -> Result<Generation> {
        let request = payload.to_request()?;
        self.generate_request(&request).await
    }

    /// Non-streaming generation for a raw request.
    pub async fn generate_request(&self, request: &GenerateContentRequest) -> Result<Generation> {
        let url = self.endpoint("generateContent");
        let work = async {
            let response = self.connect(&url, request).await?;
            let response: super::types::GenerateContentResponse = response.json().await?;
            if let Some(reason) = response.block_reason() {
                return Err(VideoError::ProviderError {
                    code: 400,
                    message: format!("Prompt blocked by safety filters: {reason}"),
                    details: None,
                });
            }
            Ok(Generation {
                text: response.text(),
                finish_reason: response.finish_reason().map(FinishReason::from_gemini),
            })
        };
        tokio::time::timeout(self.timeouts.max_generation, work)
            .await
            .map_err(|_| {
                VideoError::TimeoutError("generation exceeded the maximum duration".to_string())
            })?
    }
}
