pub mod api;
pub mod config;
pub mod control;
pub mod notify;
pub mod source;
pub mod transport;

pub use api::ApiError;
pub use self::config::ConfigError;
pub use control::{ControlError, Step};
pub use notify::NotifyError;
pub use source::SourceError;
pub use transport::TransportError;

use axum::Json;
use axum::response::{IntoResponse, Response};
use serde_json::json;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, device) = match self {
            ApiError::ControlError(e) => {
                let status = e.status_code();
                if status.is_server_error() {
                    tracing::error!("Control request failed: {}", e);
                }
                (status, e.to_string(), e.device())
            }
        };

        let mut error_obj = json!({
            "code": status.as_u16(),
            "message": error_message
        });

        if let Some(device) = device {
            error_obj["device_id"] = json!(device);
        }

        let body = Json(json!({
            "error": error_obj
        }));

        (status, body).into_response()
    }
}

impl From<ConfigError> for ApiError {
    fn from(error: ConfigError) -> Self {
        ApiError::ControlError(error.into())
    }
}
