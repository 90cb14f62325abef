use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use heylisten_monitor::{FetchError, MonitorError};
use serde_json::json;
use tracing::error;

/// Error returned by API handlers, rendered as `{ "error": "..." }`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Monitor(MonitorError),
}

impl From<MonitorError> for ApiError {
    fn from(e: MonitorError) -> Self {
        Self::Monitor(e)
    }
}

impl From<heylisten_types::Error> for ApiError {
    fn from(e: heylisten_types::Error) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Monitor(e) => match e {
                MonitorError::Fetch {
                    source: FetchError::NotFound(_),
                    ..
                }
                | MonitorError::NotMonitored(_) => StatusCode::NOT_FOUND,
                MonitorError::Fetch { .. } | MonitorError::Delivery(_) => StatusCode::BAD_GATEWAY,
                MonitorError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                MonitorError::Storage(_) | MonitorError::Config(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::BadRequest(m) | ApiError::NotFound(m) => m.clone(),
            ApiError::Monitor(e) => e.to_string(),
        };
        if status.is_server_error() {
            error!("Request failed: {}", message);
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}
