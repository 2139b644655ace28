use crate::core::compress;
use crate::core::{
    BackgroundRemover, CompressedImage, GeneratedImage, GenerationRequest, ImageGenerator,
    ImageRecognizer, ProcessedImage, Recognition, RecognitionRequest, SourceImage, Storage,
};
use crate::domain::model::format_file_size;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Result of an action together with where its download was written.
#[derive(Debug, Clone)]
pub struct Saved<T> {
    pub result: T,
    pub saved_to: Option<String>,
    /// Set when the result exists but its download could not be fetched or written.
    pub download_error: Option<String>,
}

impl<T> Saved<T> {
    fn stored(result: T, path: String) -> Self {
        Self {
            result,
            saved_to: Some(path),
            download_error: None,
        }
    }
}

/// Runs one user action: a single vendor call (or local re-encode) followed
/// by the download into storage.
pub struct ToolkitEngine<S: Storage> {
    storage: S,
    monitor: SystemMonitor,
}

impl<S: Storage> ToolkitEngine<S> {
    pub fn new(storage: S) -> Self {
        Self::new_with_monitoring(storage, false)
    }

    pub fn new_with_monitoring(storage: S, monitor_enabled: bool) -> Self {
        Self {
            storage,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn generate<G: ImageGenerator + ?Sized>(
        &self,
        generator: &G,
        request: &GenerationRequest,
        download: bool,
    ) -> Result<Saved<GeneratedImage>> {
        tracing::info!("Generating {} image", request.size);
        let image = generator.generate(request).await?;
        tracing::info!("Image generated: {}", image.url);
        self.monitor.log_stats("Generate");

        let mut saved = Saved {
            result: image,
            saved_to: None,
            download_error: None,
        };
        if download {
            // 生成已成功，下載失敗只回報，不丟掉圖片網址
            match self.download_generated(generator, &saved.result).await {
                Ok(path) => saved.saved_to = Some(path),
                Err(e) => {
                    tracing::warn!("Download of {} failed: {}", saved.result.url, e);
                    saved.download_error = Some(e.user_friendly_message());
                }
            }
        }

        self.monitor.log_final_stats();
        Ok(saved)
    }

    async fn download_generated<G: ImageGenerator + ?Sized>(
        &self,
        generator: &G,
        image: &GeneratedImage,
    ) -> Result<String> {
        let bytes = generator.download(&image.url).await?;
        self.save(&image.download_name(), &bytes).await
    }

    pub async fn recognize<R: ImageRecognizer + ?Sized>(
        &self,
        recognizer: &R,
        source: &SourceImage,
        question: Option<String>,
    ) -> Result<Recognition> {
        tracing::info!(
            "Recognizing {} ({})",
            source.file_name,
            format_file_size(source.size())
        );
        let request = RecognitionRequest::from_source(source, question);
        let recognition = recognizer.recognize(&request).await?;
        tracing::info!("Recognition finished ({} chars)", recognition.answer.chars().count());

        self.monitor.log_final_stats();
        Ok(recognition)
    }

    pub async fn remove_background<B: BackgroundRemover + ?Sized>(
        &self,
        remover: &B,
        source: &SourceImage,
    ) -> Result<Saved<ProcessedImage>> {
        tracing::info!(
            "Removing background from {} ({})",
            source.file_name,
            format_file_size(source.size())
        );
        let processed = remover.remove_background(source).await?;
        self.monitor.log_stats("Remove background");

        let saved_to = self.save(&processed.file_name, &processed.bytes).await?;

        self.monitor.log_final_stats();
        Ok(Saved::stored(processed, saved_to))
    }

    pub async fn compress(
        &self,
        source: &SourceImage,
        quality: u8,
    ) -> Result<Saved<CompressedImage>> {
        tracing::info!(
            "Compressing {} ({}) at quality {}%",
            source.file_name,
            format_file_size(source.size()),
            quality
        );
        let compressed = compress::compress(source, quality)?;
        tracing::info!(
            "Compressed to {} ({:.1}% saved)",
            format_file_size(compressed.compressed_size),
            compressed.compression_ratio()
        );
        self.monitor.log_stats("Compress");

        let saved_to = self.save(&compressed.file_name, &compressed.bytes).await?;

        self.monitor.log_final_stats();
        Ok(Saved::stored(compressed, saved_to))
    }

    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<String> {
        tracing::debug!("Writing {} ({} bytes) to storage", file_name, bytes.len());
        let path = self.storage.write_file(file_name, bytes).await?;
        tracing::info!("📁 Saved to: {}", path);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ImageSize, DEFAULT_QUESTION};
    use crate::utils::error::ToolkitError;
    use async_trait::async_trait;
    use chrono::Utc;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                ToolkitError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<String> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(format!("mock://{}", path))
        }
    }

    #[derive(Default)]
    struct FakeGenerator {
        downloads: AtomicUsize,
    }

    #[async_trait]
    impl ImageGenerator for FakeGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
            Ok(GeneratedImage {
                url: "https://cdn.example.com/a.png".to_string(),
                prompt: request.prompt.clone(),
                size: request.size,
                created_at: Utc::now(),
            })
        }

        async fn download(&self, _url: &str) -> Result<Vec<u8>> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1, 2, 3])
        }
    }

    struct EchoRecognizer;

    #[async_trait]
    impl ImageRecognizer for EchoRecognizer {
        async fn recognize(&self, request: &RecognitionRequest) -> Result<Recognition> {
            Ok(Recognition {
                answer: format!("format={}", request.image_format.unwrap_or_default()),
                question: request.effective_question().to_string(),
                created_at: Utc::now(),
            })
        }
    }

    struct FailingRemover;

    #[async_trait]
    impl BackgroundRemover for FailingRemover {
        async fn remove_background(&self, _source: &SourceImage) -> Result<ProcessedImage> {
            Err(ToolkitError::RateLimitError {
                service: crate::domain::model::Service::BackgroundRemoval,
            })
        }
    }

    fn small_png() -> SourceImage {
        let img = RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 128]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        SourceImage::new("tile.png", buf.into_inner())
    }

    #[tokio::test]
    async fn test_generate_downloads_only_when_asked() {
        let storage = MockStorage::new();
        let engine = ToolkitEngine::new(storage.clone());
        let generator = FakeGenerator::default();
        let request = GenerationRequest::new("mountains", ImageSize::OneK);

        let preview = engine.generate(&generator, &request, false).await.unwrap();
        assert!(preview.saved_to.is_none());
        assert!(preview.download_error.is_none());
        assert_eq!(generator.downloads.load(Ordering::SeqCst), 0);

        let saved = engine.generate(&generator, &request, true).await.unwrap();
        let name = saved.result.download_name();
        assert_eq!(saved.saved_to, Some(format!("mock://{}", name)));
        assert!(name.starts_with("ai-generated-") && name.ends_with(".png"));
        assert_eq!(storage.get_file(&name).await, Some(vec![1, 2, 3]));
    }

    struct ExpiredLinkGenerator;

    #[async_trait]
    impl ImageGenerator for ExpiredLinkGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
            FakeGenerator::default().generate(request).await
        }

        async fn download(&self, _url: &str) -> Result<Vec<u8>> {
            Err(ToolkitError::DownloadError {
                message: "HTTP 403".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_failed_download_keeps_generated_url() {
        let storage = MockStorage::new();
        let engine = ToolkitEngine::new(storage.clone());
        let request = GenerationRequest::new("lighthouse", ImageSize::TwoK);

        let saved = engine
            .generate(&ExpiredLinkGenerator, &request, true)
            .await
            .unwrap();

        assert_eq!(saved.result.url, "https://cdn.example.com/a.png");
        assert!(saved.saved_to.is_none());
        assert_eq!(saved.download_error.as_deref(), Some("下载失败，请稍后重试"));
        assert!(storage.files.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_recognize_inlines_detected_format() {
        let engine = ToolkitEngine::new(MockStorage::new());
        let recognition = engine
            .recognize(&EchoRecognizer, &small_png(), None)
            .await
            .unwrap();

        assert_eq!(recognition.answer, "format=png");
        assert_eq!(recognition.question, DEFAULT_QUESTION);
    }

    #[tokio::test]
    async fn test_compress_saves_jpeg_download() {
        let storage = MockStorage::new();
        let engine = ToolkitEngine::new(storage.clone());

        let saved = engine.compress(&small_png(), 70).await.unwrap();

        assert_eq!(saved.saved_to.as_deref(), Some("mock://compressed_tile.jpg"));
        let stored = storage.get_file("compressed_tile.jpg").await.unwrap();
        assert_eq!(stored, saved.result.bytes);
        assert_eq!(
            storage.read_file("compressed_tile.jpg").await.unwrap().len(),
            saved.result.compressed_size
        );
    }

    #[tokio::test]
    async fn test_failed_removal_saves_nothing() {
        let storage = MockStorage::new();
        let engine = ToolkitEngine::new(storage.clone());

        let err = engine
            .remove_background(&FailingRemover, &small_png())
            .await
            .unwrap_err();

        assert!(matches!(err, ToolkitError::RateLimitError { .. }));
        assert!(storage.files.lock().await.is_empty());
    }
}
