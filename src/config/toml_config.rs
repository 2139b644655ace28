use crate::core::ConfigProvider;
use crate::utils::error::{Result, ToolkitError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_ARK_BASE_URL: &str = "https://ark.cn-beijing.volces.com/api/v3";
pub const DEFAULT_IMAGE_MODEL: &str = "ep-20251028211624-qm588";
pub const DEFAULT_VISION_MODEL: &str = "ep-20251026220435-8jf9k";
pub const DEFAULT_REMOVE_BG_ENDPOINT: &str = "https://api.remove.bg/v1.0/removebg";
pub const DEFAULT_QUALITY: u8 = 80;
pub const MIN_QUALITY: u8 = 10;
pub const MAX_QUALITY: u8 = 100;
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

pub const ARK_API_KEY_ENV: &str = "ARK_API_KEY";
pub const REMOVE_BG_API_KEY_ENV: &str = "REMOVE_BG_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    pub ark: ArkConfig,
    pub remove_bg: RemoveBgConfig,
    pub compress: CompressConfig,
    pub server: ServerConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArkConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub image_model: String,
    pub vision_model: String,
    pub watermark: bool,
    pub timeout_seconds: Option<u64>,
}

impl Default for ArkConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ARK_BASE_URL.to_string(),
            api_key: None,
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            watermark: true,
            timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoveBgConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl Default for RemoveBgConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_REMOVE_BG_ENDPOINT.to_string(),
            api_key: None,
            timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressConfig {
    pub default_quality: u8,
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self {
            default_quality: DEFAULT_QUALITY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "./output".to_string(),
        }
    }
}

impl ToolkitConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ToolkitError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        let mut config: Self =
            toml::from_str(&processed_content).map_err(|e| ToolkitError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;
        config.drop_unresolved_keys();
        Ok(config)
    }

    /// 替換環境變數 (例如 ${ARK_API_KEY})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ToolkitError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    // 未替換成功的 ${VAR} 不能當成金鑰送出
    fn drop_unresolved_keys(&mut self) {
        for key in [&mut self.ark.api_key, &mut self.remove_bg.api_key] {
            if key
                .as_deref()
                .is_some_and(|k| k.trim().is_empty() || k.starts_with("${"))
            {
                *key = None;
            }
        }
    }

    /// 金鑰未在檔案中提供時，從環境變數補上
    pub fn with_env_keys(mut self) -> Self {
        if self.ark.api_key.is_none() {
            self.ark.api_key = std::env::var(ARK_API_KEY_ENV).ok().filter(|k| !k.is_empty());
        }
        if self.remove_bg.api_key.is_none() {
            self.remove_bg.api_key = std::env::var(REMOVE_BG_API_KEY_ENV)
                .ok()
                .filter(|k| !k.is_empty());
        }
        self
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("ark.base_url", &self.ark.base_url)?;
        validation::validate_url("remove_bg.endpoint", &self.remove_bg.endpoint)?;
        validation::validate_non_empty_string("ark.image_model", &self.ark.image_model)?;
        validation::validate_non_empty_string("ark.vision_model", &self.ark.vision_model)?;
        validation::validate_range(
            "compress.default_quality",
            self.compress.default_quality,
            MIN_QUALITY,
            MAX_QUALITY,
        )?;
        validation::validate_path("output.path", &self.output.path)?;

        if let Some(timeout) = self.ark.timeout_seconds {
            validation::validate_range("ark.timeout_seconds", timeout, 1, 600)?;
        }
        if let Some(timeout) = self.remove_bg.timeout_seconds {
            validation::validate_range("remove_bg.timeout_seconds", timeout, 1, 600)?;
        }

        self.server
            .bind
            .parse::<std::net::SocketAddr>()
            .map_err(|e| ToolkitError::InvalidConfigValueError {
                field: "server.bind".to_string(),
                value: self.server.bind.clone(),
                reason: e.to_string(),
            })?;

        Ok(())
    }

    pub fn output_path(&self) -> &str {
        &self.output.path
    }
}

impl ConfigProvider for ToolkitConfig {
    fn ark_base_url(&self) -> &str {
        &self.ark.base_url
    }

    fn ark_api_key(&self) -> Option<&str> {
        self.ark.api_key.as_deref()
    }

    fn image_model(&self) -> &str {
        &self.ark.image_model
    }

    fn vision_model(&self) -> &str {
        &self.ark.vision_model
    }

    fn watermark(&self) -> bool {
        self.ark.watermark
    }

    fn remove_bg_endpoint(&self) -> &str {
        &self.remove_bg.endpoint
    }

    fn remove_bg_api_key(&self) -> Option<&str> {
        self.remove_bg.api_key.as_deref()
    }

    fn ark_timeout_seconds(&self) -> Option<u64> {
        self.ark.timeout_seconds
    }

    fn remove_bg_timeout_seconds(&self) -> Option<u64> {
        self.remove_bg.timeout_seconds
    }
}

impl Validate for ToolkitConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_without_file() {
        let config = ToolkitConfig::from_toml_str("").unwrap();

        assert_eq!(config.ark.base_url, DEFAULT_ARK_BASE_URL);
        assert_eq!(config.ark.image_model, DEFAULT_IMAGE_MODEL);
        assert!(config.ark.watermark);
        assert_eq!(config.compress.default_quality, 80);
        assert_eq!(config.remove_bg.endpoint, DEFAULT_REMOVE_BG_ENDPOINT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml_config() {
        let toml_content = r#"
[ark]
base_url = "https://ark.example.com/api/v3"
api_key = "ark-secret"
watermark = false

[compress]
default_quality = 60

[output]
path = "./downloads"
"#;

        let config = ToolkitConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.ark_base_url(), "https://ark.example.com/api/v3");
        assert_eq!(config.ark_api_key(), Some("ark-secret"));
        assert!(!config.watermark());
        assert_eq!(config.vision_model(), DEFAULT_VISION_MODEL);
        assert_eq!(config.compress.default_quality, 60);
        assert_eq!(config.output_path(), "./downloads");
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TOOLKIT_TEST_REMOVE_BG_KEY", "rbg-123");

        let toml_content = r#"
[remove_bg]
api_key = "${TOOLKIT_TEST_REMOVE_BG_KEY}"

[ark]
api_key = "${TOOLKIT_TEST_UNSET_VARIABLE}"
"#;

        let config = ToolkitConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.remove_bg_api_key(), Some("rbg-123"));
        assert_eq!(config.ark_api_key(), None);

        std::env::remove_var("TOOLKIT_TEST_REMOVE_BG_KEY");
    }

    #[test]
    fn test_config_validation() {
        let config = ToolkitConfig::from_toml_str(
            r#"
[ark]
base_url = "invalid-url"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = ToolkitConfig::from_toml_str(
            r#"
[compress]
default_quality = 5
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = ToolkitConfig::from_toml_str(
            r#"
[server]
bind = "not-an-address"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeouts_are_per_vendor() {
        let config = ToolkitConfig::from_toml_str(
            r#"
[remove_bg]
timeout_seconds = 45
"#,
        )
        .unwrap();
        assert_eq!(config.remove_bg_timeout_seconds(), Some(45));
        assert_eq!(config.ark_timeout_seconds(), None);
        assert!(config.validate().is_ok());

        let config = ToolkitConfig::from_toml_str(
            r#"
[remove_bg]
timeout_seconds = 0
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[ark]
image_model = "ep-file-test"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = ToolkitConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.image_model(), "ep-file-test");
    }

    #[test]
    fn test_malformed_toml_is_reported() {
        let err = ToolkitConfig::from_toml_str("[ark\nbase_url = 1").unwrap_err();
        assert!(matches!(err, ToolkitError::ConfigValidationError { .. }));
    }
}
