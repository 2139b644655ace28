//! Plumbing shared by the vendor clients: client construction, key lookup
//! and the mapping from vendor HTTP statuses to [`ToolkitError`].

use crate::domain::model::Service;
use crate::utils::error::{Result, ToolkitError};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

pub fn build_client(timeout_seconds: Option<u64>) -> Result<Client> {
    let mut builder = Client::builder();
    if let Some(seconds) = timeout_seconds {
        builder = builder.timeout(Duration::from_secs(seconds));
    }
    Ok(builder.build()?)
}

/// Returns the API key or a configuration error naming the missing field.
pub fn require_key<'a>(field: &str, key: Option<&'a str>) -> Result<&'a str> {
    match key.map(str::trim) {
        Some(key) if !key.is_empty() => Ok(key),
        _ => Err(ToolkitError::MissingConfigError {
            field: field.to_string(),
        }),
    }
}

pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Passes successful responses through and turns everything else into a
/// mapped error. The vendor body is logged, never surfaced.
pub async fn ensure_success(service: Service, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::error!(
        service = %service,
        status = status.as_u16(),
        "API Error: {}",
        body
    );

    Err(map_vendor_status(service, status, &body))
}

pub fn map_vendor_status(service: Service, status: StatusCode, body: &str) -> ToolkitError {
    match status {
        StatusCode::UNAUTHORIZED => ToolkitError::AuthenticationError { service },
        StatusCode::TOO_MANY_REQUESTS => ToolkitError::RateLimitError { service },
        _ => ToolkitError::VendorError {
            service,
            status: status.as_u16(),
            message: vendor_detail(service, body)
                .unwrap_or_else(|| service.unavailable_message().to_string()),
        },
    }
}

// remove.bg 回傳 {"errors":[{"title": ...}]}，標題可直接顯示
fn vendor_detail(service: Service, body: &str) -> Option<String> {
    if service != Service::BackgroundRemoval {
        return None;
    }

    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("errors")?
        .get(0)?
        .get("title")?
        .as_str()
        .map(str::to_string)
        .filter(|title| !title.trim().is_empty())
}
