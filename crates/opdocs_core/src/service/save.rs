//! Optimistic-concurrency save protocol for task work packages.
//!
//! # Responsibility
//! - Create a work package when no id is known, update it with `lockVersion` otherwise.
//! - Map 409 responses to `SaveResult::Conflict` so callers ask for a reload.
//! - Keep at most one save per work package in flight.
//!
//! # Invariants
//! - The held version token only ever comes from a server response.
//! - A conflict never touches the caller's token.
//! - Validation failures send no request.

use crate::client::{ClientError, WorkPackageClient};
use crate::config::OpenProjectConfig;
use crate::model::work_package::{NewWorkPackage, WorkPackage, WorkPackagePatch};
use log::{info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// Reason a save did not reach a usable server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveFailure {
    /// Remote call failed for a reason other than a version conflict.
    Client(ClientError),
    /// Input or configuration rejected before any request.
    Validation(String),
    /// Another save for the same work package has not finished.
    InFlight(String),
}

impl Display for SaveFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Client(err) => write!(f, "{err}"),
            Self::Validation(reason) => write!(f, "{reason}"),
            Self::InFlight(id) => write!(f, "work package {id} is already being saved"),
        }
    }
}

impl Error for SaveFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Client(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ClientError> for SaveFailure {
    fn from(value: ClientError) -> Self {
        Self::Client(value)
    }
}

/// Outcome of one save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveResult {
    Created { id: String, lock_version: i64 },
    Updated { lock_version: i64 },
    /// Server holds a newer version; the caller must reload before saving again.
    Conflict,
    Failed(SaveFailure),
}

impl SaveResult {
    /// Server version carried by a successful result.
    pub fn lock_version(&self) -> Option<i64> {
        match self {
            Self::Created { lock_version, .. } | Self::Updated { lock_version } => {
                Some(*lock_version)
            }
            Self::Conflict | Self::Failed(_) => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.lock_version().is_some()
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Updated { .. } => "updated",
            Self::Conflict => "conflict",
            Self::Failed(_) => "failed",
        }
    }
}

/// Locally held view of one task: id plus the last server version token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub id: Option<String>,
    pub subject: String,
    pub lock_version: Option<i64>,
}

impl TaskDraft {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ..Self::default()
        }
    }

    /// Applies a save outcome; only successful results replace the token.
    pub fn apply(&mut self, result: &SaveResult) {
        match result {
            SaveResult::Created { id, lock_version } => {
                self.id = Some(id.clone());
                self.lock_version = Some(*lock_version);
            }
            SaveResult::Updated { lock_version } => {
                self.lock_version = Some(*lock_version);
            }
            SaveResult::Conflict | SaveResult::Failed(_) => {}
        }
    }
}

/// Save protocol over a work-package client.
pub struct SaveProtocol<C: WorkPackageClient> {
    client: C,
    config: OpenProjectConfig,
    in_flight: Mutex<HashSet<String>>,
}

impl<C: WorkPackageClient> SaveProtocol<C> {
    pub fn new(client: C, config: OpenProjectConfig) -> Self {
        Self {
            client,
            config,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &OpenProjectConfig {
        &self.config
    }

    /// Creates (`item_id == None`) or updates one task subject.
    pub fn save(
        &self,
        item_id: Option<&str>,
        subject: &str,
        known_version: Option<i64>,
    ) -> SaveResult {
        match item_id {
            None => self.create(subject, None),
            Some(id) => self.update_subject(id, subject, known_version),
        }
    }

    /// Creates one task, optionally under `parent_id`.
    pub fn create(&self, subject: &str, parent_id: Option<&str>) -> SaveResult {
        let started_at = Instant::now();
        let request = match self.new_task_request(subject, parent_id) {
            Ok(request) => request,
            Err(failure) => {
                return self.finish("create", None, started_at, SaveResult::Failed(failure))
            }
        };

        let result = match self
            .client
            .create_work_package(&self.config.work_items.task_project_id, &request)
        {
            Ok(created) => SaveResult::Created {
                id: created.id,
                lock_version: created.lock_version,
            },
            Err(err) => classify(err),
        };
        self.finish("create", None, started_at, result)
    }

    /// Updates the subject of an existing task.
    pub fn update_subject(
        &self,
        id: &str,
        subject: &str,
        known_version: Option<i64>,
    ) -> SaveResult {
        let subject = subject.trim();
        let invalid = subject
            .is_empty()
            .then(|| SaveFailure::Validation("task subject must not be blank".to_string()));
        self.patch(id, known_version, "update", invalid, |lock_version| {
            WorkPackagePatch::subject(lock_version, subject)
        })
    }

    /// Moves an existing task to the status behind `status_href`.
    pub fn update_status(
        &self,
        id: &str,
        status_href: &str,
        known_version: Option<i64>,
    ) -> SaveResult {
        let status_href = status_href.trim();
        let invalid = status_href
            .is_empty()
            .then(|| SaveFailure::Validation("status link must not be blank".to_string()));
        self.patch(id, known_version, "update_status", invalid, |lock_version| {
            WorkPackagePatch::status(lock_version, status_href)
        })
    }

    /// Fetches the current server state of one work package.
    pub fn load(&self, id: &str) -> Result<WorkPackage, SaveFailure> {
        Ok(self.client.get_work_package(id)?)
    }

    fn patch(
        &self,
        id: &str,
        known_version: Option<i64>,
        op: &'static str,
        invalid: Option<SaveFailure>,
        build: impl FnOnce(i64) -> WorkPackagePatch,
    ) -> SaveResult {
        let started_at = Instant::now();
        let id = id.trim();
        if let Some(failure) = invalid {
            return self.finish(op, Some(id), started_at, SaveResult::Failed(failure));
        }
        let Some(lock_version) = known_version else {
            return self.finish(
                op,
                Some(id),
                started_at,
                SaveResult::Failed(SaveFailure::Validation(format!(
                    "lock version of work package {id} is unknown; reload the task"
                ))),
            );
        };
        let Some(_guard) = self.begin(id) else {
            return self.finish(
                op,
                Some(id),
                started_at,
                SaveResult::Failed(SaveFailure::InFlight(id.to_string())),
            );
        };

        let result = match self.client.update_work_package(id, &build(lock_version)) {
            Ok(updated) => SaveResult::Updated {
                lock_version: updated.lock_version,
            },
            Err(err) => classify(err),
        };
        self.finish(op, Some(id), started_at, result)
    }

    fn new_task_request(
        &self,
        subject: &str,
        parent_id: Option<&str>,
    ) -> Result<NewWorkPackage, SaveFailure> {
        let settings = &self.config.work_items;
        if settings.task_type_id.trim().is_empty() {
            return Err(SaveFailure::Validation(
                "task type id is not configured".to_string(),
            ));
        }
        if settings.task_project_id.trim().is_empty() {
            return Err(SaveFailure::Validation(
                "task project id is not configured".to_string(),
            ));
        }
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(SaveFailure::Validation(
                "task subject must not be blank".to_string(),
            ));
        }

        Ok(NewWorkPackage {
            subject: subject.to_string(),
            type_href: self.config.type_href(settings.task_type_id.trim()),
            parent_href: parent_id
                .map(str::trim)
                .filter(|parent| !parent.is_empty())
                .map(|parent| self.config.work_package_href(parent)),
            status_href: None,
            description: None,
        })
    }

    fn begin(&self, id: &str) -> Option<InFlightGuard<'_>> {
        let mut active = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !active.insert(id.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            active: &self.in_flight,
            id: id.to_string(),
        })
    }

    fn finish(
        &self,
        op: &'static str,
        id: Option<&str>,
        started_at: Instant,
        result: SaveResult,
    ) -> SaveResult {
        let id = id.unwrap_or("-");
        let elapsed = started_at.elapsed().as_millis();
        match &result {
            SaveResult::Created { id, lock_version } => info!(
                "event=task_save module=service op={op} status=created wp_id={id} lock_version={lock_version} duration_ms={elapsed}"
            ),
            SaveResult::Updated { lock_version } => info!(
                "event=task_save module=service op={op} status=updated wp_id={id} lock_version={lock_version} duration_ms={elapsed}"
            ),
            SaveResult::Conflict => warn!(
                "event=task_save module=service op={op} status=conflict wp_id={id} duration_ms={elapsed}"
            ),
            SaveResult::Failed(failure) => warn!(
                "event=task_save module=service op={op} status={} wp_id={id} duration_ms={elapsed} error_code={}",
                result.label(),
                failure_code(failure)
            ),
        }
        result
    }
}

struct InFlightGuard<'a> {
    active: &'a Mutex<HashSet<String>>,
    id: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

fn classify(err: ClientError) -> SaveResult {
    if err.is_conflict() {
        SaveResult::Conflict
    } else {
        SaveResult::Failed(SaveFailure::Client(err))
    }
}

fn failure_code(failure: &SaveFailure) -> &'static str {
    match failure {
        SaveFailure::Client(err) => err.code(),
        SaveFailure::Validation(_) => "validation",
        SaveFailure::InFlight(_) => "in_flight",
    }
}
