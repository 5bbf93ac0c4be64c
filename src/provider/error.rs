//! Errors returned by the GCP and Falcon collaborators.
//!
//! Every error is classified into an [`ErrorKind`] so the orchestrator can tell
//! run-ending failures from ones that only affect a single project or registry.

use google_cloud_gax::error::rpc::{Code, StatusDetails};

const SERVICE_DISABLED: &str = "SERVICE_DISABLED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credentials were rejected. Fatal.
    Authentication,
    /// The API is not enabled in the target project.
    ServiceDisabled,
    PermissionDenied,
    NotFound,
    AlreadyExists,
    Other,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Gcp(#[from] google_cloud_gax::error::Error),

    #[error("Falcon authentication failed (HTTP {status}): {message}")]
    FalconAuthentication { status: u16, message: String },

    #[error("Falcon API returned HTTP {status}: {message}")]
    Falcon { status: u16, message: String },

    #[error("Falcon request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid service account key: {0}")]
    InvalidKey(#[from] serde_json::Error),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Gcp(err) => classify_gcp(err),
            Self::FalconAuthentication { .. } => ErrorKind::Authentication,
            Self::Falcon { status, .. } => classify_http(*status),
            Self::Http(_) | Self::InvalidKey(_) => ErrorKind::Other,
        }
    }

    /// Errors that must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Authentication
    }
}

fn classify_gcp(err: &google_cloud_gax::error::Error) -> ErrorKind {
    if err.is_authentication() {
        return ErrorKind::Authentication;
    }
    let Some(status) = err.status() else {
        return ErrorKind::Other;
    };

    let disabled = status.details.iter().any(|detail| {
        matches!(detail, StatusDetails::ErrorInfo(info) if info.reason == SERVICE_DISABLED)
    }) || status.message.contains(SERVICE_DISABLED)
        || status.message.contains("has not been used in project");
    if disabled {
        return ErrorKind::ServiceDisabled;
    }

    match status.code {
        Code::Unauthenticated => ErrorKind::Authentication,
        Code::PermissionDenied => ErrorKind::PermissionDenied,
        Code::NotFound => ErrorKind::NotFound,
        Code::AlreadyExists => ErrorKind::AlreadyExists,
        _ => ErrorKind::Other,
    }
}

const fn classify_http(status: u16) -> ErrorKind {
    match status {
        401 => ErrorKind::Authentication,
        403 => ErrorKind::PermissionDenied,
        404 => ErrorKind::NotFound,
        409 => ErrorKind::AlreadyExists,
        _ => ErrorKind::Other,
    }
}
