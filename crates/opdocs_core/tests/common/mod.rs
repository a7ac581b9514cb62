#![allow(dead_code)]

use opdocs_core::client::{ClientError, ClientResult, WorkPackageClient};
use opdocs_core::model::work_package::{
    NewWorkPackage, Project, Status, StatusRef, WorkPackage, WorkPackagePatch, WorkPackageType,
};
use opdocs_core::{
    BlockKind, BlockSnapshot, Clock, MemoryDocument, Notifier, OpenProjectConfig, SaveProtocol,
    Severity, SyncedDocument,
};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create {
        subject: String,
        parent_id: Option<String>,
        parent_existed: bool,
    },
    Update {
        id: String,
        lock_version: i64,
    },
    Get(String),
}

/// In-memory OpenProject stand-in with real lockVersion semantics.
#[derive(Default)]
pub struct FakeClient {
    pub calls: RefCell<Vec<Call>>,
    next_id: Cell<u64>,
    failing_subjects: RefCell<HashSet<String>>,
    rate_limited: Cell<bool>,
    store: RefCell<HashMap<String, WorkPackage>>,
}

impl FakeClient {
    pub fn new() -> Self {
        let client = Self::default();
        client.next_id.set(100);
        client
    }

    /// Creation of this subject answers with HTTP 500.
    pub fn fail_subject(&self, subject: &str) {
        self.failing_subjects.borrow_mut().insert(subject.to_string());
    }

    pub fn set_rate_limited(&self, limited: bool) {
        self.rate_limited.set(limited);
    }

    /// Seeds an existing work package.
    pub fn insert(&self, id: &str, subject: &str, lock_version: i64) {
        self.store.borrow_mut().insert(
            id.to_string(),
            WorkPackage {
                id: id.to_string(),
                subject: subject.to_string(),
                lock_version,
                parent_id: None,
                status: Some(StatusRef {
                    id: "1".to_string(),
                    name: "New".to_string(),
                    href: "/api/v3/statuses/1".to_string(),
                    is_closed: false,
                }),
                type_name: Some("Task".to_string()),
                assignee: None,
                self_href: Some(format!("/api/v3/work_packages/{id}")),
            },
        );
    }

    /// Simulates another user saving the work package.
    pub fn bump_version(&self, id: &str) {
        if let Some(wp) = self.store.borrow_mut().get_mut(id) {
            wp.lock_version += 1;
        }
    }

    pub fn assign(&self, id: &str, assignee: &str) {
        if let Some(wp) = self.store.borrow_mut().get_mut(id) {
            wp.assignee = Some(assignee.to_string());
        }
    }

    pub fn stored(&self, id: &str) -> Option<WorkPackage> {
        self.store.borrow().get(id).cloned()
    }

    pub fn created_subjects(&self) -> Vec<(String, Option<String>)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Create {
                    subject, parent_id, ..
                } => Some((subject.clone(), parent_id.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl WorkPackageClient for FakeClient {
    fn get_work_package(&self, id: &str) -> ClientResult<WorkPackage> {
        self.calls.borrow_mut().push(Call::Get(id.to_string()));
        self.stored(id).ok_or(ClientError::Status {
            status: 404,
            message: "not found".to_string(),
        })
    }

    fn create_work_package(
        &self,
        _project_id: &str,
        request: &NewWorkPackage,
    ) -> ClientResult<WorkPackage> {
        let parent_id = request
            .parent_href
            .as_deref()
            .and_then(|href| href.rsplit('/').next())
            .map(str::to_string);
        let parent_existed = parent_id
            .as_deref()
            .is_some_and(|parent| self.store.borrow().contains_key(parent));
        self.calls.borrow_mut().push(Call::Create {
            subject: request.subject.clone(),
            parent_id: parent_id.clone(),
            parent_existed,
        });

        if self.rate_limited.get() {
            return Err(ClientError::RateLimited);
        }
        if self.failing_subjects.borrow().contains(&request.subject) {
            return Err(ClientError::Status {
                status: 500,
                message: "internal error".to_string(),
            });
        }

        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let id = id.to_string();
        self.insert(&id, &request.subject, 0);
        let mut store = self.store.borrow_mut();
        let wp = store.get_mut(&id).ok_or(ClientError::Decode("lost".to_string()))?;
        wp.parent_id = parent_id;
        Ok(wp.clone())
    }

    fn update_work_package(
        &self,
        id: &str,
        patch: &WorkPackagePatch,
    ) -> ClientResult<WorkPackage> {
        self.calls.borrow_mut().push(Call::Update {
            id: id.to_string(),
            lock_version: patch.lock_version,
        });
        if self.rate_limited.get() {
            return Err(ClientError::RateLimited);
        }

        let mut store = self.store.borrow_mut();
        let wp = store.get_mut(id).ok_or(ClientError::Status {
            status: 404,
            message: "not found".to_string(),
        })?;
        if wp.lock_version != patch.lock_version {
            return Err(ClientError::Conflict(
                "Your changes could not be saved.".to_string(),
            ));
        }
        if let Some(subject) = &patch.subject {
            wp.subject = subject.clone();
        }
        if let Some(status_href) = &patch.status_href {
            let status_id = status_href.rsplit('/').next().unwrap_or_default().to_string();
            wp.status = Some(StatusRef {
                name: format!("Status {status_id}"),
                id: status_id,
                href: status_href.clone(),
                is_closed: false,
            });
        }
        wp.lock_version += 1;
        Ok(wp.clone())
    }

    fn list_statuses(&self) -> ClientResult<Vec<Status>> {
        Ok(vec![
            Status {
                id: "1".to_string(),
                name: "New".to_string(),
                is_closed: false,
                color: None,
                href: "/api/v3/statuses/1".to_string(),
            },
            Status {
                id: "12".to_string(),
                name: "Closed".to_string(),
                is_closed: true,
                color: None,
                href: "/api/v3/statuses/12".to_string(),
            },
        ])
    }

    fn list_projects(&self) -> ClientResult<Vec<Project>> {
        Ok(Vec::new())
    }

    fn list_project_types(&self, _project_id: &str) -> ClientResult<Vec<WorkPackageType>> {
        Ok(Vec::new())
    }

    fn search_work_packages(&self, query: &str) -> ClientResult<Vec<WorkPackage>> {
        Ok(self
            .store
            .borrow()
            .values()
            .filter(|wp| wp.subject.contains(query))
            .cloned()
            .collect())
    }
}

/// Clock that records sleeps instead of sleeping.
#[derive(Default)]
pub struct FakeClock {
    pub sleeps: RefCell<Vec<Duration>>,
}

impl FakeClock {
    pub fn total(&self) -> Duration {
        self.sleeps.borrow().iter().sum()
    }
}

impl Clock for FakeClock {
    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: RefCell<Vec<(String, Severity)>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        self.messages
            .borrow_mut()
            .push((message.to_string(), severity));
    }
}

pub fn config() -> OpenProjectConfig {
    let mut config = OpenProjectConfig {
        host: "https://op.example.org".to_string(),
        ..OpenProjectConfig::default()
    };
    config.validate().expect("test config is valid");
    config
}

pub fn synced<'a>(
    doc: MemoryDocument,
    client: &'a FakeClient,
    notifier: &'a RecordingNotifier,
) -> SyncedDocument<MemoryDocument, &'a FakeClient, &'a RecordingNotifier> {
    SyncedDocument::new(doc, SaveProtocol::new(client, config()), notifier)
}

/// Builds a document from `(kind, level, text)` rows.
pub fn document(rows: &[(BlockKind, u32, &str)]) -> MemoryDocument {
    let doc = MemoryDocument::new();
    for (kind, level, text) in rows {
        doc.push(BlockSnapshot::new(*kind, *level, *text));
    }
    doc
}
