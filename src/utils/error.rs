use crate::domain::model::Service;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolkitError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Image codec error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("{service} rejected the API key")]
    AuthenticationError { service: Service },

    #[error("{service} rate limit exceeded")]
    RateLimitError { service: Service },

    #[error("{service} failed with HTTP {status}: {message}")]
    VendorError {
        service: Service,
        status: u16,
        message: String,
    },

    #[error("{service} returned an unexpected response: {message}")]
    UnexpectedResponseError { service: Service, message: String },

    #[error("Download failed: {message}")]
    DownloadError { message: String },
}

pub type Result<T> = std::result::Result<T, ToolkitError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Configuration,
    Authentication,
    RateLimit,
    Vendor,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ToolkitError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ValidationError { .. } | Self::ImageError(_) | Self::Base64Error(_) => {
                ErrorCategory::Input
            }
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => ErrorCategory::Configuration,
            Self::AuthenticationError { .. } => ErrorCategory::Authentication,
            Self::RateLimitError { .. } => ErrorCategory::RateLimit,
            Self::VendorError { .. } | Self::UnexpectedResponseError { .. } => {
                ErrorCategory::Vendor
            }
            Self::ApiError(_)
            | Self::IoError(_)
            | Self::SerializationError(_)
            | Self::DownloadError { .. } => ErrorCategory::Local,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::High,
            ErrorCategory::RateLimit => ErrorSeverity::Medium,
            ErrorCategory::Vendor => ErrorSeverity::Medium,
            ErrorCategory::Authentication | ErrorCategory::Configuration => {
                ErrorSeverity::Critical
            }
            ErrorCategory::Local => match self {
                Self::ApiError(_) | Self::DownloadError { .. } => ErrorSeverity::Medium,
                _ => ErrorSeverity::High,
            },
        }
    }

    /// 給使用者看的錯誤訊息，不含廠商回傳的原始內容
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ValidationError { message } => message.clone(),
            Self::ImageError(_) => "无法解析图片，请选择有效的图片文件".to_string(),
            Self::Base64Error(_) => "图片数据编码无效".to_string(),
            Self::MissingConfigError { field } => format!("缺少配置项: {}", field),
            Self::ConfigError { message } => format!("配置错误: {}", message),
            Self::InvalidConfigValueError { field, reason, .. } => {
                format!("配置项 {} 无效: {}", field, reason)
            }
            Self::ConfigValidationError { field, message } => {
                format!("配置项 {} 校验失败: {}", field, message)
            }
            Self::AuthenticationError { .. } => "API密钥无效或已过期".to_string(),
            Self::RateLimitError { .. } => "请求过于频繁，请稍后再试".to_string(),
            Self::VendorError { message, .. } => message.clone(),
            Self::UnexpectedResponseError { .. } => "API返回格式异常".to_string(),
            Self::DownloadError { .. } => "下载失败，请稍后重试".to_string(),
            Self::ApiError(_) | Self::IoError(_) | Self::SerializationError(_) => {
                "服务器内部错误，请稍后重试".to_string()
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => "检查输入的图片或描述内容后重试",
            ErrorCategory::Configuration => "检查配置文件或 ARK_API_KEY / REMOVE_BG_API_KEY 环境变量",
            ErrorCategory::Authentication => "更新对应服务的 API 密钥",
            ErrorCategory::RateLimit => "稍等片刻后再提交",
            ErrorCategory::Vendor => "第三方服务暂时不可用，请稍后重试",
            ErrorCategory::Local => "检查网络连接和本地磁盘后重试",
        }
    }

    /// HTTP status the server answers with for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ValidationError { .. } | Self::ImageError(_) | Self::Base64Error(_) => 400,
            Self::AuthenticationError { .. } => 401,
            Self::RateLimitError { .. } => 429,
            Self::VendorError { status, .. } => *status,
            Self::UnexpectedResponseError { .. } | Self::DownloadError { .. } => 502,
            _ => 500,
        }
    }
}
