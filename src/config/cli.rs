use crate::config::toml_config::{ToolkitConfig, MAX_QUALITY, MIN_QUALITY};
use crate::core::Storage;
use crate::domain::model::ImageSize;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

#[derive(Debug, Clone, Parser)]
#[command(name = "image-toolkit")]
#[command(about = "Compress, cut out, recognize and generate images via cloud APIs")]
pub struct CliConfig {
    #[arg(long, global = true, help = "TOML config file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Directory downloads are written to")]
    pub output_path: Option<String>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log CPU/memory usage per action")]
    pub monitor: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Generate an image from a text prompt
    Generate {
        /// Image description; use --template to pick a preset instead
        prompt: Option<String>,

        #[arg(long, default_value = "2K", value_parser = parse_size)]
        size: ImageSize,

        #[arg(long, help = "1-based index into `templates`")]
        template: Option<usize>,

        #[arg(long, help = "Only print the URL, do not download")]
        no_download: bool,
    },
    /// Ask a question about an image
    Recognize {
        image: PathBuf,

        #[arg(long, short)]
        question: Option<String>,
    },
    /// Remove the background of an image
    RemoveBg { image: PathBuf },
    /// Re-encode an image as JPEG
    Compress {
        image: PathBuf,

        #[arg(long, short, help = "JPEG quality, 10-100 (default from config, 80)")]
        quality: Option<u8>,
    },
    /// List prompt templates and preset questions
    Templates,
    /// Serve the HTTP API
    #[cfg(feature = "server")]
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
}

fn parse_size(value: &str) -> std::result::Result<ImageSize, String> {
    value.parse::<ImageSize>().map_err(|e| e.to_string())
}

impl CliConfig {
    /// Loads the TOML file when given, applies CLI overrides and env API keys.
    pub fn load_toolkit_config(&self) -> Result<ToolkitConfig> {
        let mut config = match &self.config {
            Some(path) => ToolkitConfig::from_file(path)?,
            None => ToolkitConfig::default(),
        };

        if let Some(output_path) = &self.output_path {
            config.output.path = output_path.clone();
        }
        if let Some(bind) = self.bind_override() {
            config.server.bind = bind.to_string();
        }

        Ok(config.with_env_keys())
    }

    fn bind_override(&self) -> Option<&str> {
        match &self.command {
            #[cfg(feature = "server")]
            Command::Serve { bind } => bind.as_deref(),
            _ => None,
        }
    }

    pub fn input_image(&self) -> Option<&Path> {
        match &self.command {
            Command::Recognize { image, .. }
            | Command::RemoveBg { image }
            | Command::Compress { image, .. } => Some(image.as_path()),
            _ => None,
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(output_path) = &self.output_path {
            validation::validate_path("output_path", output_path)?;
        }

        if let Some(image) = self.input_image() {
            let image = image.to_string_lossy();
            validation::validate_path("image", &image)?;
            validation::validate_file_extension("image", &image, IMAGE_EXTENSIONS)?;
        }

        if let Command::Compress {
            quality: Some(quality),
            ..
        } = &self.command
        {
            validation::validate_range("quality", *quality, MIN_QUALITY, MAX_QUALITY)?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = Path::new(&self.base_path).join(path);
        let data = tokio::fs::read(full_path).await?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<String> {
        let full_path = Path::new(&self.base_path).join(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&full_path, data).await?;
        Ok(full_path.to_string_lossy().into_owned())
    }
}
