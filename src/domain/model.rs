use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::utils::error::{Result, ToolkitError};

pub const DEFAULT_QUESTION: &str = "请详细描述这张图片的内容，包括主要物体、场景、色彩、构图等信息。";

/// Third-party service behind an outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    ImageGeneration,
    Recognition,
    BackgroundRemoval,
}

impl Service {
    /// Message shown when the vendor fails for a reason other than auth or rate limiting.
    pub fn unavailable_message(&self) -> &'static str {
        match self {
            Service::ImageGeneration => "图片生成服务暂时不可用，请稍后重试",
            Service::Recognition => "图片识别服务暂时不可用，请稍后重试",
            Service::BackgroundRemoval => "背景移除服务暂时不可用，请稍后重试",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Service::ImageGeneration => "image generation",
            Service::Recognition => "image recognition",
            Service::BackgroundRemoval => "background removal",
        };
        f.write_str(name)
    }
}

/// Parsed case-insensitively through [`FromStr`]; serialized as `1K` / `2K` / `4K`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ImageSize {
    #[serde(rename = "1K")]
    OneK,
    #[default]
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::OneK => "1K",
            ImageSize::TwoK => "2K",
            ImageSize::FourK => "4K",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageSize {
    type Err = ToolkitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "1K" => Ok(ImageSize::OneK),
            "2K" => Ok(ImageSize::TwoK),
            "4K" => Ok(ImageSize::FourK),
            _ => Err(ToolkitError::InvalidConfigValueError {
                field: "size".to_string(),
                value: s.to_string(),
                reason: "Expected one of 1K, 2K, 4K".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    Png,
    #[default]
    Jpeg,
    Webp,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Webp => "webp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Webp => "image/webp",
        }
    }

    /// Sniffs the bytes first, then the file extension, and falls back to jpeg.
    pub fn detect(bytes: &[u8], file_name: &str) -> Self {
        match image::guess_format(bytes) {
            Ok(image::ImageFormat::Png) => return ImageFormat::Png,
            Ok(image::ImageFormat::Jpeg) => return ImageFormat::Jpeg,
            Ok(image::ImageFormat::WebP) => return ImageFormat::Webp,
            _ => {}
        }

        Self::from_mime_or_extension(
            Path::new(file_name)
                .extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or_default(),
        )
    }

    pub fn from_mime_or_extension(value: &str) -> Self {
        let value = value.to_ascii_lowercase();
        if value.contains("png") {
            ImageFormat::Png
        } else if value.contains("webp") {
            ImageFormat::Webp
        } else {
            ImageFormat::Jpeg
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file picked by the user.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl SourceImage {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("image")
            .to_string();

        let source = Self::new(file_name, bytes);
        source.ensure_image()?;
        Ok(source)
    }

    /// Rejects empty files and anything that is not PNG, JPEG or WebP.
    pub fn ensure_image(&self) -> Result<()> {
        if self.bytes.is_empty() {
            return Err(ToolkitError::validation("请选择图片文件"));
        }
        match image::guess_format(&self.bytes) {
            Ok(image::ImageFormat::Png | image::ImageFormat::Jpeg | image::ImageFormat::WebP) => {
                Ok(())
            }
            Ok(other) => Err(ToolkitError::validation(format!(
                "不支持的图片格式 {:?}，仅支持 PNG、JPEG、WebP",
                other
            ))),
            Err(_) => Err(ToolkitError::validation(format!(
                "{} 不是有效的图片文件",
                self.file_name
            ))),
        }
    }

    pub fn format(&self) -> ImageFormat {
        ImageFormat::detect(&self.bytes, &self.file_name)
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// File name without its extension.
    pub fn stem(&self) -> &str {
        Path::new(&self.file_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .unwrap_or("image")
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub size: ImageSize,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, size: ImageSize) -> Self {
        Self {
            prompt: prompt.into(),
            size,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedImage {
    pub url: String,
    pub prompt: String,
    pub size: ImageSize,
    pub created_at: DateTime<Utc>,
}

impl GeneratedImage {
    pub fn download_name(&self) -> String {
        format!("ai-generated-{}.png", self.created_at.timestamp_millis())
    }
}

#[derive(Debug, Clone)]
pub struct RecognitionRequest {
    /// Base64 payload without the `data:` URL prefix.
    pub image_data: String,
    pub image_format: Option<ImageFormat>,
    pub question: Option<String>,
}

impl RecognitionRequest {
    pub fn from_source(source: &SourceImage, question: Option<String>) -> Self {
        use base64::{engine::general_purpose, Engine as _};

        Self {
            image_data: general_purpose::STANDARD.encode(&source.bytes),
            image_format: Some(source.format()),
            question,
        }
    }

    /// The question sent to the model; blank questions fall back to the default one.
    pub fn effective_question(&self) -> &str {
        self.question
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .unwrap_or(DEFAULT_QUESTION)
    }

    pub fn data_url(&self) -> String {
        format!(
            "data:image/{};base64,{}",
            self.image_format.unwrap_or_default(),
            self.image_data
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Recognition {
    pub answer: String,
    pub question: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub original_size: usize,
    pub processed_size: usize,
}

#[derive(Debug, Clone)]
pub struct CompressedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub original_size: usize,
    pub compressed_size: usize,
    pub quality: u8,
}

impl CompressedImage {
    /// Percentage saved relative to the original, negative when the output grew.
    pub fn compression_ratio(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        (self.original_size as f64 - self.compressed_size as f64) / self.original_size as f64
            * 100.0
    }
}

pub fn format_file_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
