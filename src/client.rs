//! PixelLab API Client
//!
//! Wraps the two endpoints the pipeline talks to: `animate-with-text-v2` for
//! paid 16-frame generation calls and `balance` for credit checks. Requests
//! authenticate with a bearer key read from `PIXELLAB_API_KEY`.
//!
//! The executor depends on the [`GenerationClient`] trait rather than the
//! concrete HTTP client, so runs can be driven against canned responses.

use crate::error::PipelineError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Production API root. Tests point the client elsewhere via [`PixelLabClient::with_base_url`].
pub const PIXELLAB_API_BASE: &str = "https://api.pixellab.ai/v2";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "PIXELLAB_API_KEY";

const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Generation renders 16 frames server-side and routinely takes minutes.
const GENERATE_TIMEOUT: Duration = Duration::from_secs(300);
const BALANCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest error-body excerpt carried into an error message.
const ERROR_BODY_LIMIT: usize = 300;

/// One paid generation call: a reference image plus an action prompt.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Path to the reference PNG the animation starts from.
    pub reference: PathBuf,
    /// Action prompt, e.g. "flame flickering gently".
    pub prompt: String,
    /// Square frame edge in pixels.
    pub frame_size: u32,
}

/// Frames and cost returned by a single generation call.
#[derive(Debug, Clone)]
pub struct GenerationBatch {
    /// Decoded PNG bytes, in animation order.
    pub frames: Vec<Vec<u8>>,
    /// Amount charged for this call in USD.
    pub usd: f64,
}

/// Account credit as reported by the balance endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Balance {
    pub credits_usd: f64,
    pub generations_used: u64,
    pub generations_total: u64,
}

/// Client-side view of the generation API.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Submit one paid animation call and return its decoded frames.
    async fn generate(&self, request: &GenerationRequest)
        -> Result<GenerationBatch, PipelineError>;

    /// Fetch the current credit balance.
    async fn balance(&self) -> Result<Balance, PipelineError>;
}

// Wire types. Field names are the API contract; do not rename.

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EncodedImage {
    #[serde(rename = "type")]
    kind: String,
    base64: String,
    format: String,
}

impl EncodedImage {
    fn from_png_bytes(bytes: &[u8]) -> Self {
        Self {
            kind: "base64".to_string(),
            base64: BASE64.encode(bytes),
            format: "png".to_string(),
        }
    }

    fn decode(&self) -> Result<Vec<u8>, PipelineError> {
        BASE64.decode(&self.base64).map_err(|e| {
            PipelineError::RequestFailed(format!("Undecodable frame in response: {}", e))
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
struct ImageSize {
    width: u32,
    height: u32,
}

#[derive(Debug, Serialize)]
struct AnimateRequest<'a> {
    reference_image: EncodedImage,
    reference_image_size: ImageSize,
    image_size: ImageSize,
    action: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnimateResponse {
    #[serde(default)]
    images: Vec<EncodedImage>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    usd: f64,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    #[serde(default)]
    credits: Credits,
    #[serde(default)]
    subscription: Subscription,
}

#[derive(Debug, Default, Deserialize)]
struct Credits {
    #[serde(default)]
    usd: f64,
}

#[derive(Debug, Default, Deserialize)]
struct Subscription {
    #[serde(default)]
    generations: u64,
    #[serde(default)]
    total: u64,
}

/// HTTP client for the PixelLab v2 API.
pub struct PixelLabClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl PixelLabClient {
    /// Build a client from the `PIXELLAB_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, PipelineError> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                PipelineError::AuthFailed(format!(
                    "{} is not set; get a key at https://pixellab.ai",
                    API_KEY_ENV
                ))
            })?;
        Self::with_base_url(PIXELLAB_API_BASE, api_key)
    }

    /// Build a client against a specific API root.
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: String,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            http: build_http_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl GenerationClient for PixelLabClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationBatch, PipelineError> {
        let reference = std::fs::read(&request.reference)?;
        let size = ImageSize {
            width: request.frame_size,
            height: request.frame_size,
        };
        let payload = AnimateRequest {
            reference_image: EncodedImage::from_png_bytes(&reference),
            reference_image_size: size,
            image_size: size,
            action: &request.prompt,
        };

        let url = format!("{}/animate-with-text-v2", self.base_url);
        debug!(
            prompt = %request.prompt,
            reference = %request.reference.display(),
            "Sending generation request"
        );

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .timeout(GENERATE_TIMEOUT)
            .json(&payload)
            .send()
            .await
            .map_err(map_http_error)?;

        let response = require_success(response).await?;
        let body: AnimateResponse = response.json().await.map_err(|e| {
            PipelineError::RequestFailed(format!("Malformed generation response: {}", e))
        })?;

        let mut frames = Vec::with_capacity(body.images.len());
        for image in &body.images {
            frames.push(image.decode()?);
        }
        debug!(
            frames = frames.len(),
            usd = body.usage.usd,
            "Generation response received"
        );

        Ok(GenerationBatch {
            frames,
            usd: body.usage.usd,
        })
    }

    async fn balance(&self) -> Result<Balance, PipelineError> {
        let url = format!("{}/balance", self.base_url);
        let response = self
            .http
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .timeout(BALANCE_TIMEOUT)
            .send()
            .await
            .map_err(map_http_error)?;

        let response = require_success(response).await?;
        let body: BalanceResponse = response.json().await.map_err(|e| {
            PipelineError::RequestFailed(format!("Malformed balance response: {}", e))
        })?;

        Ok(Balance {
            credits_usd: body.credits.usd,
            generations_used: body.subscription.generations,
            generations_total: body.subscription.total,
        })
    }
}

fn build_http_client() -> Result<Client, PipelineError> {
    Client::builder()
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .timeout(GENERATE_TIMEOUT)
        .build()
        .map_err(|e| PipelineError::RequestFailed(format!("Failed to create HTTP client: {}", e)))
}

fn map_http_error(error: reqwest::Error) -> PipelineError {
    if error.is_timeout() {
        PipelineError::RequestFailed(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        PipelineError::RequestFailed(format!("Connection error: {}", error))
    } else {
        PipelineError::RequestFailed(format!("HTTP error: {}", error))
    }
}

/// Map non-2xx responses onto the error taxonomy, carrying a body excerpt.
async fn require_success(response: reqwest::Response) -> Result<reqwest::Response, PipelineError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    let excerpt = body_excerpt(&body);
    Err(match status.as_u16() {
        401 | 403 => PipelineError::AuthFailed(excerpt),
        429 => PipelineError::RateLimited(excerpt),
        code => PipelineError::RemoteStatus {
            status: code,
            body: excerpt,
        },
    })
}

fn body_excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= ERROR_BODY_LIMIT {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(ERROR_BODY_LIMIT).collect();
        format!("{}...", cut)
    }
}

// Mock client for executor tests.
#[cfg(test)]
pub struct MockClient {
    replies: parking_lot::Mutex<std::collections::VecDeque<Result<GenerationBatch, PipelineError>>>,
    calls: parking_lot::Mutex<Vec<GenerationRequest>>,
    balance: Balance,
}

#[cfg(test)]
impl MockClient {
    pub fn new(replies: Vec<Result<GenerationBatch, PipelineError>>) -> Self {
        Self {
            replies: parking_lot::Mutex::new(replies.into()),
            calls: parking_lot::Mutex::new(Vec::new()),
            balance: Balance {
                credits_usd: 10.0,
                generations_used: 4,
                generations_total: 100,
            },
        }
    }

    /// Prompts of every generation call received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.calls.lock().iter().map(|r| r.prompt.clone()).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Reference paths of every generation call received, in call order.
    pub fn references(&self) -> Vec<PathBuf> {
        self.calls.lock().iter().map(|r| r.reference.clone()).collect()
    }
}

#[cfg(test)]
#[async_trait]
impl GenerationClient for MockClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationBatch, PipelineError> {
        self.calls.lock().push(request.clone());
        self.replies.lock().pop_front().unwrap_or_else(|| {
            Err(PipelineError::RequestFailed(
                "Mock ran out of replies".to_string(),
            ))
        })
    }

    async fn balance(&self) -> Result<Balance, PipelineError> {
        Ok(self.balance)
    }
}
