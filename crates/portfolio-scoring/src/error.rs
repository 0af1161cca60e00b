use crate::config::ConfigError;
use crate::import::ImportError;
use crate::oracle::OracleError;
use crate::portfolio::PortfolioServiceError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use std::fmt;

/// How a caller should react to a failed evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorDisposition {
    /// The submission or request must be corrected and sent again.
    Resubmit,
    /// Transient; the same request may succeed later.
    Retry,
    /// An internal invariant or configuration is broken.
    Alert,
}

impl ErrorDisposition {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Resubmit => "resubmit",
            Self::Retry => "retry",
            Self::Alert => "alert",
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Import(ImportError),
    Oracle(OracleError),
    Evaluation(PortfolioServiceError),
    Payload(serde_json::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Import(err) => write!(f, "import error: {}", err),
            AppError::Oracle(err) => write!(f, "oracle error: {}", err),
            AppError::Evaluation(err) => write!(f, "evaluation failed: {}", err),
            AppError::Payload(err) => write!(f, "invalid request payload: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Import(err) => Some(err),
            AppError::Oracle(err) => Some(err),
            AppError::Evaluation(err) => Some(err),
            AppError::Payload(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Evaluation(err) => return crate::portfolio::router::error_response(err),
            AppError::Import(_) | AppError::Payload(_) => StatusCode::BAD_REQUEST,
            AppError::Oracle(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<ImportError> for AppError {
    fn from(value: ImportError) -> Self {
        Self::Import(value)
    }
}

impl From<OracleError> for AppError {
    fn from(value: OracleError) -> Self {
        Self::Oracle(value)
    }
}

impl From<PortfolioServiceError> for AppError {
    fn from(value: PortfolioServiceError) -> Self {
        Self::Evaluation(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Payload(value)
    }
}
