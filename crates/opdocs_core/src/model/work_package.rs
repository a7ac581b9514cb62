//! OpenProject work-package records and request shapes.
//!
//! # Responsibility
//! - Typed read models decoded from HAL+JSON responses.
//! - Request models for create/update calls; wire encoding lives in `client::hal`.
//!
//! # Invariants
//! - `WorkPackage::lock_version` mirrors the server value from the last response.
//! - Every link stored here is the raw `href` returned by the server.

use serde::{Deserialize, Serialize};

/// Work package as returned by `GET /work_packages/{id}` and friends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkPackage {
    pub id: String,
    pub subject: String,
    /// Optimistic-lock token.
    pub lock_version: i64,
    pub parent_id: Option<String>,
    pub status: Option<StatusRef>,
    pub type_name: Option<String>,
    pub assignee: Option<String>,
    pub self_href: Option<String>,
}

/// Status link resolved on a work package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRef {
    pub id: String,
    pub name: String,
    pub href: String,
    pub is_closed: bool,
}

/// Entry of `GET /statuses`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub id: String,
    pub name: String,
    pub is_closed: bool,
    pub color: Option<String>,
    pub href: String,
}

impl Status {
    /// Converts a status listing entry into the link form stored on work packages.
    pub fn to_ref(&self) -> StatusRef {
        StatusRef {
            id: self.id.clone(),
            name: self.name.clone(),
            href: self.href.clone(),
            is_closed: self.is_closed,
        }
    }
}

/// Entry of `GET /projects`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
}

/// Entry of `GET /projects/{id}/types`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkPackageType {
    pub id: String,
    pub name: String,
    pub href: String,
}

/// Description body format accepted by OpenProject formattable fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionFormat {
    Plain,
    Markdown,
}

impl DescriptionFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Markdown => "markdown",
        }
    }
}

/// Formattable description payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    pub format: DescriptionFormat,
    pub raw: String,
}

/// Create request for `POST /projects/{project}/work_packages`.
///
/// Link fields hold full hrefs, not bare ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWorkPackage {
    pub subject: String,
    pub type_href: String,
    pub parent_href: Option<String>,
    pub status_href: Option<String>,
    pub description: Option<Description>,
}

/// Partial update for `PATCH /work_packages/{id}`.
///
/// `lock_version` is mandatory: the server rejects stale versions with 409.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkPackagePatch {
    pub lock_version: i64,
    pub subject: Option<String>,
    pub status_href: Option<String>,
}

impl WorkPackagePatch {
    /// Subject-only update.
    pub fn subject(lock_version: i64, subject: impl Into<String>) -> Self {
        Self {
            lock_version,
            subject: Some(subject.into()),
            status_href: None,
        }
    }

    /// Status-only update.
    pub fn status(lock_version: i64, status_href: impl Into<String>) -> Self {
        Self {
            lock_version,
            subject: None,
            status_href: Some(status_href.into()),
        }
    }
}
