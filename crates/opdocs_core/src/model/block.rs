//! Editor block model.
//!
//! # Responsibility
//! - Describe blocks as the editing surface exposes them to core.
//! - Carry task block props, which double as the local projection of a work package.
//!
//! # Invariants
//! - `OutlineItem::order_index` equals the item's position in document order.
//! - `TaskProps::lock_version` is only ever written from a server response.

use super::work_package::WorkPackage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one editor block.
pub type BlockId = Uuid;

/// Block category as seen by core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Paragraph,
    Heading,
    BulletListItem,
    NumberedListItem,
    CheckListItem,
    /// Task block linked (or about to be linked) to an OpenProject work package.
    Task,
    /// Reference to an existing work package, chosen by search.
    WorkPackage,
}

impl BlockKind {
    /// Returns whether this kind takes part in outline hierarchy extraction.
    pub fn is_outline(self) -> bool {
        matches!(
            self,
            Self::BulletListItem | Self::NumberedListItem | Self::CheckListItem
        )
    }

    /// Stable string used in logs and rendered output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Heading => "heading",
            Self::BulletListItem => "bullet_list_item",
            Self::NumberedListItem => "numbered_list_item",
            Self::CheckListItem => "check_list_item",
            Self::Task => "task",
            Self::WorkPackage => "work_package",
        }
    }
}

/// One block of an editor snapshot, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineItem {
    pub id: BlockId,
    pub kind: BlockKind,
    /// Nesting depth; `0` is top level.
    pub indent_level: u32,
    /// Plain text content of the block.
    pub text: String,
    /// Position in document order.
    pub order_index: usize,
}

impl OutlineItem {
    /// Returns whether this item participates in hierarchy extraction.
    pub fn is_outline(&self) -> bool {
        self.kind.is_outline()
    }

    /// Returns trimmed text, or `None` when the item is blank.
    pub fn subject(&self) -> Option<&str> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }
}

/// Props of a task block.
///
/// `work_package_id` is populated once the remote creation succeeded. Conversion
/// logic polls this field to confirm creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProps {
    pub work_package_id: Option<String>,
    pub subject: String,
    pub lock_version: Option<i64>,
    pub parent_id: Option<String>,
    pub status: Option<String>,
    pub status_is_closed: bool,
    pub url: Option<String>,
}

impl TaskProps {
    /// Props of a not-yet-created task.
    pub fn draft(subject: impl Into<String>, parent_id: Option<&str>) -> Self {
        Self {
            subject: subject.into(),
            parent_id: parent_id.map(str::to_string),
            ..Self::default()
        }
    }

    /// Returns whether the remote work package exists.
    pub fn is_linked(&self) -> bool {
        self.work_package_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }
}

/// Props of a block that references an existing work package.
///
/// Display fields are copied from the server when the package is selected and
/// are not kept in sync afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkPackageProps {
    pub work_package_id: Option<String>,
    pub subject: String,
    pub status: Option<String>,
    pub assignee: Option<String>,
    pub type_name: Option<String>,
    /// API self link of the referenced package.
    pub href: Option<String>,
}

impl WorkPackageProps {
    /// Reference to a package known only by id, e.g. read back from Markdown.
    pub fn unresolved(work_package_id: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            work_package_id: Some(work_package_id.into()),
            subject: subject.into(),
            ..Self::default()
        }
    }

    pub fn is_linked(&self) -> bool {
        self.work_package_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }
}

impl From<&WorkPackage> for WorkPackageProps {
    fn from(wp: &WorkPackage) -> Self {
        Self {
            work_package_id: Some(wp.id.clone()),
            subject: wp.subject.clone(),
            status: wp.status.as_ref().map(|status| status.name.clone()),
            assignee: wp.assignee.clone(),
            type_name: wp.type_name.clone(),
            href: wp.self_href.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BlockKind, OutlineItem, TaskProps, WorkPackageProps};
    use uuid::Uuid;

    #[test]
    fn only_list_kinds_are_outline() {
        assert!(BlockKind::BulletListItem.is_outline());
        assert!(BlockKind::NumberedListItem.is_outline());
        assert!(BlockKind::CheckListItem.is_outline());
        assert!(!BlockKind::Paragraph.is_outline());
        assert!(!BlockKind::Heading.is_outline());
        assert!(!BlockKind::Task.is_outline());
    }

    #[test]
    fn subject_trims_and_rejects_blank() {
        let mut item = OutlineItem {
            id: Uuid::new_v4(),
            kind: BlockKind::BulletListItem,
            indent_level: 0,
            text: "  Write docs \t".to_string(),
            order_index: 0,
        };
        assert_eq!(item.subject(), Some("Write docs"));

        item.text = " \n ".to_string();
        assert_eq!(item.subject(), None);
    }

    #[test]
    fn draft_props_are_unlinked() {
        let props = TaskProps::draft("Root", Some("42"));
        assert!(!props.is_linked());
        assert_eq!(props.parent_id.as_deref(), Some("42"));
        assert_eq!(props.lock_version, None);

        let blank_id = TaskProps {
            work_package_id: Some("  ".to_string()),
            ..TaskProps::default()
        };
        assert!(!blank_id.is_linked());
    }

    #[test]
    fn unresolved_reference_is_linked_by_id_only() {
        let props = WorkPackageProps::unresolved("42", "Epic");
        assert!(props.is_linked());
        assert_eq!(props.status, None);
        assert!(!WorkPackageProps::default().is_linked());
    }
}
