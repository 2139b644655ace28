use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::utils::error::ToolkitError;

impl IntoResponse for ToolkitError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::BAD_GATEWAY);
        // 4xx/5xx 以外的廠商狀態碼不能原樣回給瀏覽器
        let status = if status.is_client_error() || status.is_server_error() {
            status
        } else {
            StatusCode::BAD_GATEWAY
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {} ({:?})", self, self.category());
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        let body = Json(json!({
            "error": self.user_friendly_message(),
        }));

        (status, body).into_response()
    }
}
