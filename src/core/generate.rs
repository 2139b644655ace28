use crate::core::vendor::{build_client, ensure_success, join_url, require_key};
use crate::core::{ConfigProvider, GeneratedImage, GenerationRequest, ImageGenerator};
use crate::domain::model::Service;
use crate::utils::error::{Result, ToolkitError};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct GenerationPayload<'a> {
    model: &'a str,
    prompt: &'a str,
    sequential_image_generation: &'a str,
    response_format: &'a str,
    size: &'a str,
    stream: bool,
    watermark: bool,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    data: Vec<GeneratedData>,
}

#[derive(Debug, Deserialize)]
struct GeneratedData {
    url: Option<String>,
}

/// Text-to-image client for the Ark `images/generations` endpoint.
pub struct ArkImageGenerator<C: ConfigProvider> {
    config: C,
    client: Client,
}

impl<C: ConfigProvider> ArkImageGenerator<C> {
    pub fn new(config: C) -> Result<Self> {
        let client = build_client(config.ark_timeout_seconds())?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        join_url(self.config.ark_base_url(), "images/generations")
    }
}

/// Picks the first URL out of a generation response body.
pub fn first_image_url(body: &str) -> Result<String> {
    let parsed: GenerationResponse =
        serde_json::from_str(body).map_err(|e| ToolkitError::UnexpectedResponseError {
            service: Service::ImageGeneration,
            message: e.to_string(),
        })?;

    parsed
        .data
        .into_iter()
        .next()
        .and_then(|item| item.url)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ToolkitError::UnexpectedResponseError {
            service: Service::ImageGeneration,
            message: "response has no data[0].url".to_string(),
        })
}

#[async_trait]
impl<C: ConfigProvider> ImageGenerator for ArkImageGenerator<C> {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        let prompt = request.prompt.trim();
        if prompt.is_empty() {
            return Err(ToolkitError::validation("请输入图片描述"));
        }
        let api_key = require_key("ark.api_key", self.config.ark_api_key())?;

        let payload = GenerationPayload {
            model: self.config.image_model(),
            prompt,
            sequential_image_generation: "disabled",
            response_format: "url",
            size: request.size.as_str(),
            stream: false,
            watermark: self.config.watermark(),
        };

        tracing::debug!(
            "Requesting {} image from {}",
            request.size,
            self.endpoint()
        );
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;
        tracing::debug!("API response status: {}", response.status());

        let response = ensure_success(Service::ImageGeneration, response).await?;
        let body = response.text().await?;
        let url = first_image_url(&body)?;

        Ok(GeneratedImage {
            url,
            prompt: prompt.to_string(),
            size: request.size,
            created_at: Utc::now(),
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await.map_err(|e| {
            ToolkitError::DownloadError {
                message: e.to_string(),
            }
        })?;

        if !response.status().is_success() {
            return Err(ToolkitError::DownloadError {
                message: format!("HTTP {}", response.status()),
            });
        }

        let bytes = response.bytes().await.map_err(|e| ToolkitError::DownloadError {
            message: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}
