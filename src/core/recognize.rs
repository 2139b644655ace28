use crate::core::vendor::{build_client, ensure_success, join_url, require_key};
use crate::core::{ConfigProvider, ImageRecognizer, Recognition, RecognitionRequest};
use crate::domain::model::Service;
use crate::utils::error::{Result, ToolkitError};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Vision client: one user message carrying the question and an inlined
/// base64 image, sent to the Ark `chat/completions` endpoint.
pub struct ArkImageRecognizer<C: ConfigProvider> {
    config: C,
    client: Client,
}

impl<C: ConfigProvider> ArkImageRecognizer<C> {
    pub fn new(config: C) -> Result<Self> {
        let client = build_client(config.ark_timeout_seconds())?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        join_url(self.config.ark_base_url(), "chat/completions")
    }

    fn build_payload(&self, request: &RecognitionRequest) -> serde_json::Value {
        json!({
            "model": self.config.vision_model(),
            "messages": [
                {
                    "role": "user",
                    "content": [
                        {
                            "type": "text",
                            "text": request.effective_question()
                        },
                        {
                            "type": "image_url",
                            "image_url": { "url": request.data_url() }
                        }
                    ]
                }
            ]
        })
    }
}

pub fn first_answer(body: &str) -> Result<String> {
    let parsed: ChatCompletion =
        serde_json::from_str(body).map_err(|e| ToolkitError::UnexpectedResponseError {
            service: Service::Recognition,
            message: e.to_string(),
        })?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .ok_or_else(|| ToolkitError::UnexpectedResponseError {
            service: Service::Recognition,
            message: "response has no choices[0].message.content".to_string(),
        })
}

#[async_trait]
impl<C: ConfigProvider> ImageRecognizer for ArkImageRecognizer<C> {
    async fn recognize(&self, request: &RecognitionRequest) -> Result<Recognition> {
        if request.image_data.trim().is_empty() || request.image_format.is_none() {
            return Err(ToolkitError::validation("缺少图片数据或格式"));
        }
        let api_key = require_key("ark.api_key", self.config.ark_api_key())?;

        tracing::debug!(
            "Sending {} image ({} base64 chars) to {}",
            request.image_format.unwrap_or_default(),
            request.image_data.len(),
            self.endpoint()
        );
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&self.build_payload(request))
            .send()
            .await?;
        tracing::debug!("API response status: {}", response.status());

        let response = ensure_success(Service::Recognition, response).await?;
        let body = response.text().await?;

        Ok(Recognition {
            answer: first_answer(&body)?,
            question: request.effective_question().to_string(),
            created_at: Utc::now(),
        })
    }
}
