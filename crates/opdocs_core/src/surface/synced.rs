//! Task-block behaviour on top of any editing surface.
//!
//! # Responsibility
//! - Create the work package of an unlinked task block as soon as it is placed.
//! - Refresh, rename and re-status linked task blocks through the save protocol.
//! - Turn a block into a reference to an existing work package picked by search.
//!
//! # Invariants
//! - Props are only written back after a successful server response.
//! - A failed creation leaves the block unlinked and notifies; it never errors the edit.

use super::{BlockSnapshot, BlockSpec, EditingSurface, SurfaceError};
use crate::client::WorkPackageClient;
use crate::model::block::{BlockId, BlockKind, OutlineItem, TaskProps, WorkPackageProps};
use crate::model::work_package::{Status, WorkPackage};
use crate::notify::{notify_save_result, Notifier};
use crate::service::save::{SaveFailure, SaveProtocol, SaveResult};
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failure of a task-block operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskBlockError {
    Surface(SurfaceError),
    NotATask(BlockId),
    /// Task block has no work package yet.
    NotLinked(BlockId),
    Load(SaveFailure),
}

impl Display for TaskBlockError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Surface(err) => write!(f, "{err}"),
            Self::NotATask(id) => write!(f, "block {id} is not a task block"),
            Self::NotLinked(id) => write!(f, "task block {id} has no work package"),
            Self::Load(err) => write!(f, "failed to load work package: {err}"),
        }
    }
}

impl Error for TaskBlockError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Surface(err) => Some(err),
            Self::Load(err) => Some(err),
            Self::NotATask(_) | Self::NotLinked(_) => None,
        }
    }
}

impl From<SurfaceError> for TaskBlockError {
    fn from(value: SurfaceError) -> Self {
        Self::Surface(value)
    }
}

/// Editing surface whose task blocks stay linked to OpenProject work packages.
pub struct SyncedDocument<S, C, N>
where
    S: EditingSurface,
    C: WorkPackageClient,
    N: Notifier,
{
    inner: S,
    protocol: SaveProtocol<C>,
    notifier: N,
}

impl<S, C, N> SyncedDocument<S, C, N>
where
    S: EditingSurface,
    C: WorkPackageClient,
    N: Notifier,
{
    pub fn new(inner: S, protocol: SaveProtocol<C>, notifier: N) -> Self {
        Self {
            inner,
            protocol,
            notifier,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn protocol(&self) -> &SaveProtocol<C> {
        &self.protocol
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Reloads a linked task block from the server.
    pub fn refresh_task(&self, id: BlockId) -> Result<TaskProps, TaskBlockError> {
        let (props, wp_id) = self.linked_props(id)?;
        let wp = self.protocol.load(&wp_id).map_err(TaskBlockError::Load)?;

        let refreshed = TaskProps {
            url: Some(self.protocol.config().work_package_url(&wp.id)),
            work_package_id: Some(wp.id),
            subject: wp.subject,
            lock_version: Some(wp.lock_version),
            parent_id: wp.parent_id.or(props.parent_id),
            status_is_closed: wp.status.as_ref().is_some_and(|status| status.is_closed),
            status: wp.status.map(|status| status.name),
        };
        self.inner
            .replace_block(id, BlockSpec::Task(refreshed.clone()))?;
        Ok(refreshed)
    }

    /// Saves a new subject using the block's version token.
    pub fn rename_task(&self, id: BlockId, subject: &str) -> Result<SaveResult, TaskBlockError> {
        let (mut props, wp_id) = self.linked_props(id)?;
        let result = self
            .protocol
            .update_subject(&wp_id, subject, props.lock_version);
        if let Some(lock_version) = result.lock_version() {
            props.subject = subject.trim().to_string();
            props.lock_version = Some(lock_version);
            self.inner.replace_block(id, BlockSpec::Task(props))?;
        }
        notify_save_result(&self.notifier, &result);
        Ok(result)
    }

    /// Moves the task to `status` using the block's version token.
    pub fn set_task_status(
        &self,
        id: BlockId,
        status: &Status,
    ) -> Result<SaveResult, TaskBlockError> {
        let (mut props, wp_id) = self.linked_props(id)?;
        let result = self
            .protocol
            .update_status(&wp_id, &status.href, props.lock_version);
        if let Some(lock_version) = result.lock_version() {
            props.status = Some(status.name.clone());
            props.status_is_closed = status.is_closed;
            props.lock_version = Some(lock_version);
            self.inner.replace_block(id, BlockSpec::Task(props))?;
        }
        notify_save_result(&self.notifier, &result);
        Ok(result)
    }

    /// Typeahead search for packages a reference block can point at.
    pub fn search_work_packages(&self, query: &str) -> Result<Vec<WorkPackage>, TaskBlockError> {
        self.protocol
            .client()
            .search_work_packages(query)
            .map_err(|err| TaskBlockError::Load(err.into()))
    }

    /// Replaces block `id` with a reference to work package `wp_id`.
    ///
    /// The package is fetched first; on failure the block is left untouched.
    pub fn link_work_package(
        &self,
        id: BlockId,
        wp_id: &str,
    ) -> Result<WorkPackageProps, TaskBlockError> {
        if self.inner.block(id).is_none() {
            return Err(TaskBlockError::Surface(SurfaceError::BlockNotFound(id)));
        }
        let wp = self.protocol.load(wp_id).map_err(TaskBlockError::Load)?;
        let props = WorkPackageProps::from(&wp);
        self.inner
            .replace_block(id, BlockSpec::WorkPackage(props.clone()))?;
        debug!(
            "event=work_package_link module=surface status=ok block_id={id} wp_id={}",
            wp.id
        );
        Ok(props)
    }

    fn linked_props(&self, id: BlockId) -> Result<(TaskProps, String), TaskBlockError> {
        let block = self
            .inner
            .block(id)
            .ok_or(TaskBlockError::Surface(SurfaceError::BlockNotFound(id)))?;
        if block.kind != BlockKind::Task {
            return Err(TaskBlockError::NotATask(id));
        }
        let props = block.task.ok_or(TaskBlockError::NotATask(id))?;
        let wp_id = props
            .work_package_id
            .clone()
            .filter(|_| props.is_linked())
            .ok_or(TaskBlockError::NotLinked(id))?;
        Ok((props, wp_id))
    }

    fn link_new_task(&self, id: BlockId, props: TaskProps) -> Result<(), SurfaceError> {
        if props.is_linked() || props.subject.trim().is_empty() {
            return Ok(());
        }

        let result = self
            .protocol
            .create(&props.subject, props.parent_id.as_deref());
        notify_save_result(&self.notifier, &result);

        match result {
            SaveResult::Created { id: wp_id, lock_version } => {
                debug!("event=task_link module=surface status=ok block_id={id} wp_id={wp_id}");
                let linked = TaskProps {
                    url: Some(self.protocol.config().work_package_url(&wp_id)),
                    work_package_id: Some(wp_id),
                    subject: props.subject.trim().to_string(),
                    lock_version: Some(lock_version),
                    ..props
                };
                self.inner.replace_block(id, BlockSpec::Task(linked))
            }
            _ => Ok(()),
        }
    }
}

impl<S, C, N> EditingSurface for SyncedDocument<S, C, N>
where
    S: EditingSurface,
    C: WorkPackageClient,
    N: Notifier,
{
    fn document_blocks(&self) -> Vec<OutlineItem> {
        self.inner.document_blocks()
    }

    fn replace_block(&self, id: BlockId, spec: BlockSpec) -> Result<(), SurfaceError> {
        let task = match &spec {
            BlockSpec::Task(props) => Some(props.clone()),
            _ => None,
        };
        self.inner.replace_block(id, spec)?;
        match task {
            Some(props) => self.link_new_task(id, props),
            None => Ok(()),
        }
    }

    fn insert_block_after(&self, after: BlockId, spec: BlockSpec) -> Result<BlockId, SurfaceError> {
        let task = match &spec {
            BlockSpec::Task(props) => Some(props.clone()),
            _ => None,
        };
        let id = self.inner.insert_block_after(after, spec)?;
        if let Some(props) = task {
            self.link_new_task(id, props)?;
        }
        Ok(id)
    }

    fn block(&self, id: BlockId) -> Option<BlockSnapshot> {
        self.inner.block(id)
    }
}
