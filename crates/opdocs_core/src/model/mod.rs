//! Domain model shared by the client, hierarchy and surface layers.
//!
//! # Responsibility
//! - Define editor-side block records (`OutlineItem`, `TaskProps`, `WorkPackageProps`).
//! - Define typed OpenProject records decoded from HAL responses.
//!
//! # Invariants
//! - Block identity is assigned locally; work-package identity only by the server.
//! - Work-package ids are always carried as strings.

pub mod block;
pub mod work_package;
