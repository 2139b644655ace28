use crate::domain::model::{
    GeneratedImage, GenerationRequest, ProcessedImage, Recognition, RecognitionRequest,
    SourceImage,
};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn ark_base_url(&self) -> &str;
    fn ark_api_key(&self) -> Option<&str>;
    fn image_model(&self) -> &str;
    fn vision_model(&self) -> &str;
    fn watermark(&self) -> bool;
    fn remove_bg_endpoint(&self) -> &str;
    fn remove_bg_api_key(&self) -> Option<&str>;
    fn ark_timeout_seconds(&self) -> Option<u64>;
    fn remove_bg_timeout_seconds(&self) -> Option<u64>;
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage>;
    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}

#[async_trait]
pub trait ImageRecognizer: Send + Sync {
    async fn recognize(&self, request: &RecognitionRequest) -> Result<Recognition>;
}

#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    async fn remove_background(&self, source: &SourceImage) -> Result<ProcessedImage>;
}
