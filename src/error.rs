//! Error handling for the patrol station

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A scan is already in flight (re-entrant trigger)
    #[error("A scan is already in progress")]
    AlreadyScanning,

    /// Active camera cannot be scanned (unknown or offline)
    #[error("Camera not scannable: {0}")]
    ScanIneligible(String),

    /// No live frame could be captured
    #[error("Capture unavailable: {0}")]
    CaptureUnavailable(String),

    /// Network or model failure during analysis
    #[error("Analysis transport error: {0}")]
    AnalysisTransport(String),

    /// Analysis reply did not match the expected schema
    #[error("Malformed analysis response: {0}")]
    MalformedAnalysisResponse(String),

    /// Geolocation permission denied or unavailable
    #[error("Geolocation denied: {0}")]
    GeolocationDenied(String),

    /// Camera slot could not be reconfigured
    #[error("Camera reconfiguration failed: {0}")]
    CameraReconfiguration(String),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Config error
    #[error("Config error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Error::AlreadyScanning => "ALREADY_SCANNING",
            Error::ScanIneligible(_) => "SCAN_INELIGIBLE",
            Error::CaptureUnavailable(_) => "CAPTURE_UNAVAILABLE",
            Error::AnalysisTransport(_) => "ANALYSIS_TRANSPORT_ERROR",
            Error::MalformedAnalysisResponse(_) => "MALFORMED_ANALYSIS_RESPONSE",
            Error::GeolocationDenied(_) => "GEOLOCATION_DENIED",
            Error::CameraReconfiguration(_) => "CAMERA_RECONFIGURATION_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::Http(_) => "HTTP_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Error::AlreadyScanning => StatusCode::CONFLICT,
            Error::ScanIneligible(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::CaptureUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::AnalysisTransport(_) | Error::Http(_) => StatusCode::BAD_GATEWAY,
            Error::MalformedAnalysisResponse(_) => StatusCode::BAD_GATEWAY,
            Error::GeolocationDenied(_) => StatusCode::FORBIDDEN,
            Error::CameraReconfiguration(_) | Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Config(_)
            | Error::Serialization(_)
            | Error::Io(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_code = self.code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error_code = %error_code,
                message = %message,
                "Request error"
            );
        } else {
            tracing::debug!(
                status = %status,
                error_code = %error_code,
                message = %message,
                "Request rejected"
            );
        }

        let body = Json(json!({
            "error_code": error_code,
            "message": message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_scanning_maps_to_conflict() {
        let resp = Error::AlreadyScanning.into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_reconfiguration_maps_to_bad_request() {
        let err = Error::CameraReconfiguration("no slot CAM-09".to_string());
        assert_eq!(err.code(), "CAMERA_RECONFIGURATION_ERROR");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
