use axum::{
    extract::{multipart::Multipart, rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::config::toml_config::{MAX_QUALITY, MIN_QUALITY};
use crate::core::compress;
use crate::domain::model::{
    GenerationRequest, ImageFormat, ImageSize, RecognitionRequest, SourceImage,
};
use crate::server::AppState;
use crate::utils::error::{Result, ToolkitError};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    #[serde(default)]
    pub prompt: String,
    pub size: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub url: String,
    pub prompt: String,
    pub size: ImageSize,
}

/// POST /api/generate-image
pub async fn generate_image(
    State(state): State<AppState>,
    payload: std::result::Result<Json<GenerateBody>, JsonRejection>,
) -> Result<Json<GenerateResponse>> {
    let Json(body) = payload.map_err(|e| ToolkitError::validation(e.body_text()))?;

    if body.prompt.trim().is_empty() {
        return Err(ToolkitError::validation("请输入图片描述"));
    }
    let size = match body.size.as_deref() {
        Some(size) => size
            .parse::<ImageSize>()
            .map_err(|_| ToolkitError::validation("图片尺寸必须是 1K、2K 或 4K"))?,
        None => ImageSize::default(),
    };

    let image = state
        .generator
        .generate(&GenerationRequest::new(body.prompt, size))
        .await?;

    Ok(Json(GenerateResponse {
        url: image.url,
        prompt: image.prompt,
        size: image.size,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizeBody {
    pub image_data: Option<String>,
    pub image_format: Option<String>,
    pub question: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecognizeResponse {
    pub answer: String,
    pub question: String,
}

/// POST /api/recognize
pub async fn recognize(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RecognizeBody>, JsonRejection>,
) -> Result<Json<RecognizeResponse>> {
    let Json(body) = payload.map_err(|e| ToolkitError::validation(e.body_text()))?;

    let (image_data, image_format) = match (body.image_data, body.image_format) {
        (Some(data), Some(format)) if !data.trim().is_empty() && !format.trim().is_empty() => {
            (data, ImageFormat::from_mime_or_extension(&format))
        }
        _ => return Err(ToolkitError::validation("缺少图片数据或格式")),
    };

    let recognition = state
        .recognizer
        .recognize(&RecognitionRequest {
            image_data,
            image_format: Some(image_format),
            question: body.question,
        })
        .await?;

    Ok(Json(RecognizeResponse {
        answer: recognition.answer,
        question: recognition.question,
    }))
}

/// POST /api/remove-bg (multipart, `image_file`)
pub async fn remove_bg(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let upload = read_upload(multipart).await?;
    let source = upload.image()?;

    let processed = state.remover.remove_background(&source).await?;
    tracing::info!(
        "Background removed: {} -> {} bytes",
        processed.original_size,
        processed.processed_size
    );

    Ok(image_response("image/png", &processed.file_name, processed.bytes, &[]))
}

/// POST /api/compress (multipart, `image_file` and optional `quality`)
pub async fn compress_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response> {
    let upload = read_upload(multipart).await?;
    let quality = match upload.quality.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => raw.parse::<u8>().map_err(|_| {
            ToolkitError::validation(format!(
                "压缩质量必须在 {}% 到 {}% 之间",
                MIN_QUALITY, MAX_QUALITY
            ))
        })?,
        _ => state.default_quality,
    };
    let source = upload.image()?;

    let compressed = tokio::task::spawn_blocking(move || compress::compress(&source, quality))
        .await
        .map_err(|e| ToolkitError::IoError(std::io::Error::other(e.to_string())))??;

    let original_size = compressed.original_size.to_string();
    let compressed_size = compressed.compressed_size.to_string();
    Ok(image_response(
        "image/jpeg",
        &compressed.file_name,
        compressed.bytes,
        &[
            ("x-original-size", original_size.as_str()),
            ("x-compressed-size", compressed_size.as_str()),
        ],
    ))
}

#[derive(Debug, Default)]
struct Upload {
    image: Option<SourceImage>,
    quality: Option<String>,
}

impl Upload {
    fn image(self) -> Result<SourceImage> {
        let image = self
            .image
            .ok_or_else(|| ToolkitError::validation("请选择图片文件"))?;
        image.ensure_image()?;
        Ok(image)
    }
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload> {
    let mut upload = Upload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ToolkitError::validation(e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image_file") => {
                let file_name = field.file_name().unwrap_or("image").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ToolkitError::validation(e.body_text()))?;
                upload.image = Some(SourceImage::new(file_name, bytes.to_vec()));
            }
            Some("quality") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ToolkitError::validation(e.body_text()))?;
                upload.quality = Some(text);
            }
            other => tracing::debug!("Ignoring multipart field {:?}", other),
        }
    }

    Ok(upload)
}

fn image_response(
    content_type: &'static str,
    file_name: &str,
    bytes: Vec<u8>,
    extra_headers: &[(&'static str, &str)],
) -> Response {
    let mut response = (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(file_name)),
        ],
        bytes,
    )
        .into_response();

    for (name, value) in extra_headers {
        if let Ok(value) = header::HeaderValue::from_str(value) {
            response
                .headers_mut()
                .insert(header::HeaderName::from_static(*name), value);
        }
    }
    response
}

/// `attachment` with an ASCII fallback name plus the RFC 5987 UTF-8 form.
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();
    // form_urlencoded 把空白編成 '+'，'*' 不編碼，兩者都不是 attr-char
    let encoded = url::form_urlencoded::byte_serialize(file_name.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
        .replace('*', "%2A");

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}
