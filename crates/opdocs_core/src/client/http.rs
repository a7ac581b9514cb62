//! Blocking reqwest implementation of `WorkPackageClient`.
//!
//! # Invariants
//! - Every request carries the configured timeout and, when set, a bearer token.
//! - Log lines contain method, path and timing only; bodies and query text stay out.

use super::{classify_status, hal, ClientError, ClientResult, WorkPackageClient};
use crate::config::OpenProjectConfig;
use crate::model::work_package::{
    NewWorkPackage, Project, Status, WorkPackage, WorkPackagePatch, WorkPackageType,
};
use log::{error, info, warn};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;
use std::time::Instant;

const HAL_JSON: &str = "application/hal+json";
const JSON: &str = "application/json";
/// Page size requested for collection endpoints.
const COLLECTION_PAGE_SIZE: &str = "100";

/// OpenProject v3 client over HTTP.
pub struct HttpWorkPackageClient {
    http: Client,
    config: OpenProjectConfig,
}

impl HttpWorkPackageClient {
    /// Builds a client from validated configuration.
    pub fn new(config: OpenProjectConfig) -> ClientResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(HAL_JSON));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));

        let http = Client::builder()
            .timeout(config.request_timeout())
            .default_headers(headers)
            .build()
            .map_err(|err| ClientError::Transport(format!("failed to build http client: {err}")))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &OpenProjectConfig {
        &self.config
    }

    fn get(&self, path: &str) -> ClientResult<Value> {
        self.send(Method::GET, path, |req| req)
    }

    fn send(
        &self,
        method: Method,
        path: &str,
        prepare: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> ClientResult<Value> {
        let started_at = Instant::now();
        let mut request = self.http.request(method.clone(), self.config.api_url(path));
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        }

        let response = match prepare(request).send() {
            Ok(response) => response,
            Err(err) => {
                error!(
                    "event=op_request module=client status=error method={} path={} duration_ms={} error_code=transport error={}",
                    method,
                    path,
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(ClientError::Transport(err.to_string()));
            }
        };

        let http_status = response.status();
        let body = response
            .text()
            .map_err(|err| ClientError::Transport(format!("failed to read response: {err}")))?;

        if !http_status.is_success() {
            let err = classify_status(http_status.as_u16(), &body);
            warn!(
                "event=op_request module=client status=error method={} path={} http_status={} duration_ms={} error_code={}",
                method,
                path,
                http_status.as_u16(),
                started_at.elapsed().as_millis(),
                err.code()
            );
            return Err(err);
        }

        info!(
            "event=op_request module=client status=ok method={} path={} http_status={} duration_ms={}",
            method,
            path,
            http_status.as_u16(),
            started_at.elapsed().as_millis()
        );

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|err| ClientError::Decode(err.to_string()))
    }
}

impl WorkPackageClient for HttpWorkPackageClient {
    fn get_work_package(&self, id: &str) -> ClientResult<WorkPackage> {
        let value = self.get(&format!("/work_packages/{}", checked_id(id)?))?;
        hal::decode_work_package(value)
    }

    fn create_work_package(
        &self,
        project_id: &str,
        request: &NewWorkPackage,
    ) -> ClientResult<WorkPackage> {
        let body = hal::encode_new_work_package(request);
        let path = format!("/projects/{}/work_packages", checked_id(project_id)?);
        let value = self.send(Method::POST, &path, |req| req.json(&body))?;
        hal::decode_work_package(value)
    }

    fn update_work_package(
        &self,
        id: &str,
        patch: &WorkPackagePatch,
    ) -> ClientResult<WorkPackage> {
        let body = hal::encode_patch(patch);
        let path = format!("/work_packages/{}", checked_id(id)?);
        let value = self.send(Method::PATCH, &path, |req| req.json(&body))?;
        hal::decode_work_package(value)
    }

    fn list_statuses(&self) -> ClientResult<Vec<Status>> {
        hal::decode_statuses(self.get("/statuses")?)
    }

    fn list_projects(&self) -> ClientResult<Vec<Project>> {
        let value = self.send(Method::GET, "/projects", |req| {
            req.query(&[("pageSize", COLLECTION_PAGE_SIZE)])
        })?;
        hal::decode_projects(value)
    }

    fn list_project_types(&self, project_id: &str) -> ClientResult<Vec<WorkPackageType>> {
        let value = self.get(&format!("/projects/{}/types", checked_id(project_id)?))?;
        hal::decode_types(value)
    }

    fn search_work_packages(&self, query: &str) -> ClientResult<Vec<WorkPackage>> {
        let filters = hal::typeahead_filter(query);
        let value = self.send(Method::GET, "/work_packages", |req| {
            req.query(&[("filters", filters.as_str()), ("pageSize", "20")])
        })?;
        hal::decode_work_packages(value)
    }
}

/// Rejects ids that would alter the request path.
fn checked_id(id: &str) -> ClientResult<&str> {
    let trimmed = id.trim();
    if trimmed.is_empty() || trimmed.contains(['/', '?', '#']) {
        return Err(ClientError::InvalidInput(format!(
            "invalid resource id `{id}`"
        )));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::{checked_id, HttpWorkPackageClient};
    use crate::config::OpenProjectConfig;

    #[test]
    fn checked_id_rejects_path_characters() {
        assert_eq!(checked_id(" 42 ").unwrap(), "42");
        assert!(checked_id("").is_err());
        assert!(checked_id("1/../2").is_err());
        assert!(checked_id("3?x=1").is_err());
    }

    #[test]
    fn new_keeps_config() {
        let client = HttpWorkPackageClient::new(OpenProjectConfig::default()).unwrap();
        assert_eq!(client.config().api_prefix, "/api/v3");
    }
}
