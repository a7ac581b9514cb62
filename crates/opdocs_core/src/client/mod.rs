//! Remote work-package client contracts.
//!
//! # Responsibility
//! - Define the operations core consumes from the OpenProject v3 API.
//! - Classify HTTP failures into conflict, rate-limit and generic status errors.
//!
//! # Invariants
//! - A 409 response is always `ClientError::Conflict`, never a generic status error.
//! - Implementations never retry on their own.
//!
//! # See also
//! - `client::hal` for the wire format.

pub mod hal;
mod http;

pub use http::HttpWorkPackageClient;

use crate::model::work_package::{
    NewWorkPackage, Project, Status, WorkPackage, WorkPackagePatch, WorkPackageType,
};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ClientResult<T> = Result<T, ClientError>;

/// HTTP status signalling an optimistic-lock mismatch.
pub const STATUS_CONFLICT: u16 = 409;
/// HTTP status signalling rate limiting.
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Failure of one remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Request never produced an HTTP response.
    Transport(String),
    /// Server rejected the update because `lockVersion` is stale.
    Conflict(String),
    /// Server asked the client to slow down.
    RateLimited,
    /// Any other non-success status.
    Status { status: u16, message: String },
    /// Response body did not match the expected shape.
    Decode(String),
    /// Request was rejected locally before being sent.
    InvalidInput(String),
}

impl ClientError {
    /// HTTP status behind this error, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Conflict(_) => Some(STATUS_CONFLICT),
            Self::RateLimited => Some(STATUS_TOO_MANY_REQUESTS),
            Self::Status { status, .. } => Some(*status),
            Self::Transport(_) | Self::Decode(_) | Self::InvalidInput(_) => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Stable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Conflict(_) => "conflict",
            Self::RateLimited => "rate_limited",
            Self::Status { .. } => "http_status",
            Self::Decode(_) => "decode",
            Self::InvalidInput(_) => "invalid_input",
        }
    }
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "request failed: {message}"),
            Self::Conflict(message) => write!(f, "update conflict: {message}"),
            Self::RateLimited => write!(f, "too many requests"),
            Self::Status { status, message } => write!(f, "HTTP error {status}: {message}"),
            Self::Decode(message) => write!(f, "unexpected response: {message}"),
            Self::InvalidInput(message) => write!(f, "invalid request: {message}"),
        }
    }
}

impl Error for ClientError {}

/// Maps a non-success response to a client error.
///
/// `body` is the raw response text; OpenProject error documents contribute their
/// `message` field, anything else is passed through trimmed.
pub fn classify_status(status: u16, body: &str) -> ClientError {
    let message = hal::error_message(body).unwrap_or_else(|| body.trim().to_string());
    match status {
        STATUS_CONFLICT => ClientError::Conflict(message),
        STATUS_TOO_MANY_REQUESTS => ClientError::RateLimited,
        other => ClientError::Status {
            status: other,
            message,
        },
    }
}

/// Operations consumed from the OpenProject work-package API.
pub trait WorkPackageClient {
    fn get_work_package(&self, id: &str) -> ClientResult<WorkPackage>;
    fn create_work_package(
        &self,
        project_id: &str,
        request: &NewWorkPackage,
    ) -> ClientResult<WorkPackage>;
    fn update_work_package(&self, id: &str, patch: &WorkPackagePatch)
        -> ClientResult<WorkPackage>;
    fn list_statuses(&self) -> ClientResult<Vec<Status>>;
    fn list_projects(&self) -> ClientResult<Vec<Project>>;
    fn list_project_types(&self, project_id: &str) -> ClientResult<Vec<WorkPackageType>>;
    fn search_work_packages(&self, query: &str) -> ClientResult<Vec<WorkPackage>>;
}

impl<C: WorkPackageClient + ?Sized> WorkPackageClient for &C {
    fn get_work_package(&self, id: &str) -> ClientResult<WorkPackage> {
        (**self).get_work_package(id)
    }

    fn create_work_package(
        &self,
        project_id: &str,
        request: &NewWorkPackage,
    ) -> ClientResult<WorkPackage> {
        (**self).create_work_package(project_id, request)
    }

    fn update_work_package(
        &self,
        id: &str,
        patch: &WorkPackagePatch,
    ) -> ClientResult<WorkPackage> {
        (**self).update_work_package(id, patch)
    }

    fn list_statuses(&self) -> ClientResult<Vec<Status>> {
        (**self).list_statuses()
    }

    fn list_projects(&self) -> ClientResult<Vec<Project>> {
        (**self).list_projects()
    }

    fn list_project_types(&self, project_id: &str) -> ClientResult<Vec<WorkPackageType>> {
        (**self).list_project_types(project_id)
    }

    fn search_work_packages(&self, query: &str) -> ClientResult<Vec<WorkPackage>> {
        (**self).search_work_packages(query)
    }
}

#[cfg(test)]
mod tests {
    use super::{classify_status, ClientError};

    #[test]
    fn classifies_conflict_with_server_message() {
        let body = r#"{
            "_type": "Error",
            "errorIdentifier": "urn:openproject-org:api:v3:errors:UpdateConflict",
            "message": "Your changes could not be saved."
        }"#;
        let err = classify_status(409, body);
        assert_eq!(
            err,
            ClientError::Conflict("Your changes could not be saved.".to_string())
        );
        assert!(err.is_conflict());
        assert_eq!(err.status(), Some(409));
    }

    #[test]
    fn classifies_rate_limit_and_generic_status() {
        assert_eq!(classify_status(429, ""), ClientError::RateLimited);

        let err = classify_status(500, "  upstream exploded \n");
        assert_eq!(
            err,
            ClientError::Status {
                status: 500,
                message: "upstream exploded".to_string()
            }
        );
        assert!(!err.is_conflict());
        assert_eq!(err.code(), "http_status");
    }
}
