pub mod config;
pub mod core;
pub mod domain;
#[cfg(feature = "server")]
pub mod server;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::{CliConfig, LocalStorage};

pub use crate::config::ToolkitConfig;
pub use crate::core::{
    engine::ToolkitEngine, generate::ArkImageGenerator, recognize::ArkImageRecognizer,
    remove_bg::RemoveBgClient,
};
pub use crate::utils::error::{Result, ToolkitError};
