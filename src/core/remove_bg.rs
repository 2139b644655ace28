use crate::core::vendor::{build_client, ensure_success, require_key};
use crate::core::{BackgroundRemover, ConfigProvider, ProcessedImage, SourceImage};
use crate::domain::model::Service;
use crate::utils::error::{Result, ToolkitError};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::Client;

/// remove.bg client. The response body is the cut-out PNG itself.
pub struct RemoveBgClient<C: ConfigProvider> {
    config: C,
    client: Client,
}

impl<C: ConfigProvider> RemoveBgClient<C> {
    pub fn new(config: C) -> Result<Self> {
        let client = build_client(config.remove_bg_timeout_seconds())?;
        Ok(Self { config, client })
    }

    fn build_form(source: &SourceImage) -> Result<Form> {
        let part = Part::bytes(source.bytes.clone())
            .file_name(source.file_name.clone())
            .mime_str(source.format().mime_type())?;

        Ok(Form::new().part("image_file", part).text("size", "auto"))
    }
}

pub fn download_name(source: &SourceImage) -> String {
    format!("no-bg_{}.png", source.stem())
}

#[async_trait]
impl<C: ConfigProvider> BackgroundRemover for RemoveBgClient<C> {
    async fn remove_background(&self, source: &SourceImage) -> Result<ProcessedImage> {
        if source.bytes.is_empty() {
            return Err(ToolkitError::validation("请选择图片文件"));
        }
        let api_key = require_key("remove_bg.api_key", self.config.remove_bg_api_key())?;

        tracing::debug!(
            "Uploading {} ({} bytes) to {}",
            source.file_name,
            source.size(),
            self.config.remove_bg_endpoint()
        );
        let response = self
            .client
            .post(self.config.remove_bg_endpoint())
            .header("X-Api-Key", api_key)
            .multipart(Self::build_form(source)?)
            .send()
            .await?;
        tracing::debug!("API response status: {}", response.status());

        let response = ensure_success(Service::BackgroundRemoval, response).await?;

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("json"));
        if is_json {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Expected image bytes, got JSON: {}", body);
            return Err(ToolkitError::UnexpectedResponseError {
                service: Service::BackgroundRemoval,
                message: "expected image bytes, got JSON".to_string(),
            });
        }

        let bytes = response.bytes().await?.to_vec();
        if bytes.is_empty() {
            return Err(ToolkitError::UnexpectedResponseError {
                service: Service::BackgroundRemoval,
                message: "empty response body".to_string(),
            });
        }
        // 內容類型不可信，以位元組判斷
        if image::guess_format(&bytes).is_err() {
            tracing::error!(
                "Expected image bytes, got: {}",
                String::from_utf8_lossy(&bytes[..bytes.len().min(200)])
            );
            return Err(ToolkitError::UnexpectedResponseError {
                service: Service::BackgroundRemoval,
                message: "response body is not an image".to_string(),
            });
        }

        Ok(ProcessedImage {
            file_name: download_name(source),
            original_size: source.size(),
            processed_size: bytes.len(),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolkitConfig;
    use httpmock::prelude::*;

    const PNG_BYTES: [u8; 12] = [
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D,
    ];

    fn config_for(server: &MockServer) -> ToolkitConfig {
        let mut config = ToolkitConfig::default();
        config.remove_bg.endpoint = server.url("/v1.0/removebg");
        config.remove_bg.api_key = Some("rbg-key".to_string());
        config
    }

    fn source() -> SourceImage {
        SourceImage::new("portrait.jpg", vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10])
    }

    #[tokio::test]
    async fn test_success_returns_image_bytes() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1.0/removebg")
                .header("X-Api-Key", "rbg-key")
                .body_contains("name=\"image_file\"")
                .body_contains("filename=\"portrait.jpg\"")
                .body_contains("name=\"size\"");
            then.status(200)
                .header("Content-Type", "image/png")
                .body(PNG_BYTES);
        });

        let remover = RemoveBgClient::new(config_for(&server)).unwrap();
        let processed = remover.remove_background(&source()).await.unwrap();

        api_mock.assert();
        assert_eq!(processed.bytes, PNG_BYTES.to_vec());
        assert_eq!(processed.file_name, "no-bg_portrait.png");
        assert_eq!(processed.original_size, 6);
        assert_eq!(processed.processed_size, PNG_BYTES.len());
    }

    #[tokio::test]
    async fn test_json_success_body_is_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1.0/removebg");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"data": {"result_b64": "..."}}));
        });

        let remover = RemoveBgClient::new(config_for(&server)).unwrap();
        let err = remover.remove_background(&source()).await.unwrap_err();

        assert!(matches!(err, ToolkitError::UnexpectedResponseError { .. }));
    }

    #[tokio::test]
    async fn test_untyped_non_image_body_is_rejected() {
        let server = MockServer::start();
        let mut untyped = server.mock(|when, then| {
            when.method(POST).path("/v1.0/removebg");
            then.status(200)
                .body(r#"{"data":{"result_b64":"..."}}"#);
        });

        let remover = RemoveBgClient::new(config_for(&server)).unwrap();
        let err = remover.remove_background(&source()).await.unwrap_err();
        assert!(matches!(err, ToolkitError::UnexpectedResponseError { .. }));
        assert_eq!(err.http_status(), 502);

        untyped.delete();
        server.mock(|when, then| {
            when.method(POST).path("/v1.0/removebg");
            then.status(200)
                .header("Content-Type", "image/png")
                .body("<html><body>maintenance</body></html>");
        });
        let err = remover.remove_background(&source()).await.unwrap_err();
        assert!(matches!(err, ToolkitError::UnexpectedResponseError { .. }));
    }

    #[tokio::test]
    async fn test_vendor_error_title_is_shown() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1.0/removebg");
            then.status(400).json_body(serde_json::json!({
                "errors": [{"title": "No image given", "code": "missing_source"}]
            }));
        });

        let remover = RemoveBgClient::new(config_for(&server)).unwrap();
        let err = remover.remove_background(&source()).await.unwrap_err();

        assert_eq!(err.user_friendly_message(), "No image given");
        assert_eq!(err.http_status(), 400);
    }

    #[tokio::test]
    async fn test_rate_limit_and_auth_are_mapped() {
        let server = MockServer::start();
        let mut limited = server.mock(|when, then| {
            when.method(POST).path("/v1.0/removebg");
            then.status(429).json_body(serde_json::json!({
                "errors": [{"title": "Rate limit exceeded"}]
            }));
        });

        let remover = RemoveBgClient::new(config_for(&server)).unwrap();
        let err = remover.remove_background(&source()).await.unwrap_err();
        assert!(matches!(err, ToolkitError::RateLimitError { .. }));

        limited.delete();
        server.mock(|when, then| {
            when.method(POST).path("/v1.0/removebg");
            then.status(401);
        });
        let err = remover.remove_background(&source()).await.unwrap_err();
        assert!(matches!(err, ToolkitError::AuthenticationError { .. }));
    }

    #[tokio::test]
    async fn test_empty_file_and_missing_key_make_no_request() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path("/v1.0/removebg");
            then.status(200);
        });

        let remover = RemoveBgClient::new(config_for(&server)).unwrap();
        let empty = SourceImage::new("empty.png", vec![]);
        assert!(matches!(
            remover.remove_background(&empty).await,
            Err(ToolkitError::ValidationError { .. })
        ));

        let mut config = config_for(&server);
        config.remove_bg.api_key = None;
        let remover = RemoveBgClient::new(config).unwrap();
        assert!(matches!(
            remover.remove_background(&source()).await,
            Err(ToolkitError::MissingConfigError { .. })
        ));

        api_mock.assert_hits(0);
    }
}
