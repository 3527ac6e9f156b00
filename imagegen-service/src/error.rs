//! Request-path error taxonomy and its HTTP mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::credentials::CredentialError;
use crate::services::providers::ProviderError;

/// Errors surfaced to the caller. Every failure in the request pipeline is
/// converted to one of these and serialized as an [`ErrorEnvelope`]; nothing
/// propagates to the platform as an opaque 500.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    MalformedInput(String),

    #[error("{0}")]
    InvalidPrompt(String),

    #[error("credential unavailable: {0}")]
    CredentialUnavailable(String),

    #[error("prompt rejected by provider: {0}")]
    ProviderRejected(String),

    #[error("provider quota exceeded")]
    ProviderQuotaExceeded,

    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("unexpected provider response: {0}")]
    ProviderProtocolError(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub message: String,
    pub code: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MalformedInput(_) | ApiError::InvalidPrompt(_) => StatusCode::BAD_REQUEST,
            ApiError::CredentialUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ProviderRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::ProviderQuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ProviderUnavailable(_) | ApiError::ProviderProtocolError(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    /// Stable code reported in the envelope and in metrics labels.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MalformedInput(_) => "MalformedInput",
            ApiError::InvalidPrompt(_) => "InvalidPrompt",
            ApiError::CredentialUnavailable(_) => "CredentialUnavailable",
            ApiError::ProviderRejected(_) => "ProviderRejected",
            ApiError::ProviderQuotaExceeded => "ProviderQuotaExceeded",
            ApiError::ProviderUnavailable(_) => "ProviderUnavailable",
            ApiError::ProviderProtocolError(_) => "ProviderProtocolError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = ErrorEnvelope {
            message: self.to_string(),
            code: self.code(),
        };

        (self.status(), Json(envelope)).into_response()
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Rejected(reason) => ApiError::ProviderRejected(reason),
            ProviderError::QuotaExceeded => ApiError::ProviderQuotaExceeded,
            ProviderError::Unavailable(reason) => ApiError::ProviderUnavailable(reason),
            ProviderError::Protocol(reason) => ApiError::ProviderProtocolError(reason),
        }
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        ApiError::CredentialUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_the_taxonomy() {
        let cases = [
            (ApiError::MalformedInput("x".into()), 400),
            (ApiError::InvalidPrompt("x".into()), 400),
            (ApiError::CredentialUnavailable("x".into()), 500),
            (ApiError::ProviderRejected("x".into()), 422),
            (ApiError::ProviderQuotaExceeded, 429),
            (ApiError::ProviderUnavailable("x".into()), 502),
            (ApiError::ProviderProtocolError("x".into()), 502),
        ];

        for (err, status) in cases {
            assert_eq!(err.status().as_u16(), status, "{}", err.code());
        }
    }

    #[test]
    fn codes_are_spelled_exactly() {
        assert_eq!(ApiError::MalformedInput("x".into()).code(), "MalformedInput");
        assert_eq!(ApiError::InvalidPrompt("x".into()).code(), "InvalidPrompt");
        assert_eq!(
            ApiError::CredentialUnavailable("x".into()).code(),
            "CredentialUnavailable"
        );
        assert_eq!(
            ApiError::ProviderRejected("x".into()).code(),
            "ProviderRejected"
        );
        assert_eq!(ApiError::ProviderQuotaExceeded.code(), "ProviderQuotaExceeded");
        assert_eq!(
            ApiError::ProviderUnavailable("x".into()).code(),
            "ProviderUnavailable"
        );
        assert_eq!(
            ApiError::ProviderProtocolError("x".into()).code(),
            "ProviderProtocolError"
        );
    }

    #[test]
    fn provider_errors_map_onto_the_taxonomy() {
        assert!(matches!(
            ApiError::from(ProviderError::Rejected("unsafe".into())),
            ApiError::ProviderRejected(_)
        ));
        assert!(matches!(
            ApiError::from(ProviderError::QuotaExceeded),
            ApiError::ProviderQuotaExceeded
        ));
        assert!(matches!(
            ApiError::from(ProviderError::Unavailable("timeout".into())),
            ApiError::ProviderUnavailable(_)
        ));
        assert!(matches!(
            ApiError::from(ProviderError::Protocol("bad shape".into())),
            ApiError::ProviderProtocolError(_)
        ));
    }

    #[test]
    fn credential_errors_become_unavailable() {
        let err = ApiError::from(CredentialError::Missing("GOOGLE_API_KEY".into()));
        assert!(matches!(err, ApiError::CredentialUnavailable(_)));
        assert_eq!(err.status().as_u16(), 500);
    }

    #[test]
    fn envelope_serializes_message_and_code() {
        let envelope = ErrorEnvelope {
            message: "prompt must not be empty".to_string(),
            code: "InvalidPrompt",
        };
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "message": "prompt must not be empty",
                "code": "InvalidPrompt"
            })
        );
    }
}
