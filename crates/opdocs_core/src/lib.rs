//! Core logic for turning document outlines into OpenProject work packages.
//! This crate owns the save protocol, hierarchy rules and materialization order.

pub mod client;
pub mod config;
pub mod hierarchy;
pub mod logging;
pub mod materialize;
pub mod model;
pub mod notify;
pub mod outline;
pub mod poll;
pub mod service;
pub mod surface;

pub use client::{ClientError, ClientResult, HttpWorkPackageClient, WorkPackageClient};
pub use config::{ConfigError, OpenProjectConfig, WorkItemSettings};
pub use hierarchy::{build_hierarchy, HierarchyError, HierarchyNode};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget, LoggingConfig};
pub use materialize::{
    convert_outline_to_tasks, ConversionError, MaterializeReport, TaskTreeMaterializer,
};
pub use model::block::{BlockId, BlockKind, OutlineItem, TaskProps, WorkPackageProps};
pub use model::work_package::{Status, WorkPackage};
pub use notify::{LogNotifier, Notifier, Severity};
pub use outline::{parse_outline, render_outline, OutlineParseError};
pub use poll::{poll_until, Clock, PollPolicy, PollTimeout, SystemClock};
pub use service::feature::FeatureService;
pub use service::save::{SaveFailure, SaveProtocol, SaveResult, TaskDraft};
pub use surface::{
    BlockSnapshot, BlockSpec, EditingSurface, MemoryDocument, SurfaceError, SyncedDocument,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
