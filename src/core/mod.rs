pub mod compress;
pub mod engine;
pub mod generate;
pub mod recognize;
pub mod remove_bg;
pub mod vendor;

pub use crate::domain::model::{
    CompressedImage, GeneratedImage, GenerationRequest, ProcessedImage, Recognition,
    RecognitionRequest, SourceImage,
};
pub use crate::domain::ports::{
    BackgroundRemover, ConfigProvider, ImageGenerator, ImageRecognizer, Storage,
};
pub use crate::utils::error::Result;
