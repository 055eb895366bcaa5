use std::time::Duration;
use thiserror::Error;

/// The closed error taxonomy every public call in this crate resolves to.
///
/// Provider adapters and the orchestrator map transport-level failures onto
/// this set at the boundary; nothing above the adapter layer should need to
/// look at a status code again.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found")]
    NotFound,

    #[error("auth required for provider {provider}")]
    AuthRequired { provider: String },

    #[error("provider {provider} unavailable")]
    ProviderUnavailable {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("internal io error: {0}")]
    InternalIo(#[from] std::io::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn provider_unavailable(provider: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider: provider.into(),
            retry_after: None,
        }
    }

    pub fn auth_required(provider: impl Into<String>) -> Self {
        Self::AuthRequired {
            provider: provider.into(),
        }
    }

    /// Maps an HTTP status code to the taxonomy per the provider adapter contract:
    /// 404 -> NotFound, 401/403 -> AuthRequired, 429/5xx -> ProviderUnavailable.
    pub fn from_status(provider: &str, status: reqwest::StatusCode) -> Self {
        match status.as_u16() {
            404 => Self::NotFound,
            401 | 403 => Self::auth_required(provider),
            _ => Self::provider_unavailable(provider),
        }
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        let provider = err.url().map(|u| u.host_str().unwrap_or("unknown")).unwrap_or("unknown").to_string();
        if err.is_timeout() {
            return Self::provider_unavailable(provider);
        }
        match err.status() {
            Some(status) => Self::from_status(&provider, status),
            None => Self::provider_unavailable(provider),
        }
    }
}

impl From<reqwest_middleware::Error> for CoreError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(e) => e.into(),
            reqwest_middleware::Error::Middleware(e) => Self::Validation(e.to_string()),
        }
    }
}

impl From<quick_xml::DeError> for CoreError {
    fn from(err: quick_xml::DeError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<image::ImageError> for CoreError {
    fn from(err: image::ImageError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(err.to_string())
    }
}
