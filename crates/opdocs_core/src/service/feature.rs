//! Feature work-package creation.
//!
//! Features land in the configured feature project and type, start in the default status
//! and carry a Markdown description.

use super::save::SaveFailure;
use crate::client::WorkPackageClient;
use crate::config::OpenProjectConfig;
use crate::model::work_package::{Description, DescriptionFormat, NewWorkPackage, WorkPackage};
use log::info;

/// Use-case facade for feature work packages.
pub struct FeatureService<C: WorkPackageClient> {
    client: C,
    config: OpenProjectConfig,
}

impl<C: WorkPackageClient> FeatureService<C> {
    pub fn new(client: C, config: OpenProjectConfig) -> Self {
        Self { client, config }
    }

    /// Creates one feature. A blank description is omitted from the request.
    pub fn create_feature(
        &self,
        subject: &str,
        description_markdown: Option<&str>,
    ) -> Result<WorkPackage, SaveFailure> {
        let request = self.new_feature_request(subject, description_markdown)?;
        let created = self
            .client
            .create_work_package(self.config.work_items.feature_project_id.trim(), &request)?;
        info!(
            "event=feature_create module=service status=ok wp_id={} lock_version={}",
            created.id, created.lock_version
        );
        Ok(created)
    }

    fn new_feature_request(
        &self,
        subject: &str,
        description_markdown: Option<&str>,
    ) -> Result<NewWorkPackage, SaveFailure> {
        let settings = &self.config.work_items;
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(SaveFailure::Validation(
                "feature subject must not be blank".to_string(),
            ));
        }
        for (field, value) in [
            ("feature project id", &settings.feature_project_id),
            ("feature type id", &settings.feature_type_id),
        ] {
            if value.trim().is_empty() {
                return Err(SaveFailure::Validation(format!("{field} is not configured")));
            }
        }

        let status_href = Some(settings.default_status_id.trim())
            .filter(|id| !id.is_empty())
            .map(|id| self.config.status_href(id));
        let description = description_markdown
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(|raw| Description {
                format: DescriptionFormat::Markdown,
                raw: raw.to_string(),
            });

        Ok(NewWorkPackage {
            subject: subject.to_string(),
            type_href: self.config.type_href(settings.feature_type_id.trim()),
            parent_href: None,
            status_href,
            description,
        })
    }
}
