//! HAL+JSON encoding and decoding for OpenProject v3 resources.
//!
//! # Responsibility
//! - Decode work packages, statuses, projects and types into typed records.
//! - Encode create/update bodies and the typeahead filter.
//!
//! # Invariants
//! - Numeric and string ids decode to the same `String` form.
//! - A work package without `id` or `lockVersion` is a decode error.
//! - Collections without `_embedded.elements` decode to an empty list.
//! - Status/type entries without a self link are dropped.

use super::{ClientError, ClientResult};
use crate::model::work_package::{
    NewWorkPackage, Project, Status, StatusRef, WorkPackage, WorkPackagePatch, WorkPackageType,
};
use log::warn;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Debug, Default, Deserialize)]
struct Link {
    href: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SelfLinks {
    #[serde(rename = "self")]
    self_link: Option<Link>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireWorkPackage {
    id: Option<Value>,
    subject: Option<String>,
    lock_version: Option<i64>,
    #[serde(rename = "_links", default)]
    links: WireWorkPackageLinks,
    #[serde(rename = "_embedded", default)]
    embedded: WireWorkPackageEmbedded,
}

#[derive(Debug, Default, Deserialize)]
struct WireWorkPackageLinks {
    #[serde(rename = "self")]
    self_link: Option<Link>,
    status: Option<Link>,
    #[serde(rename = "type")]
    type_link: Option<Link>,
    parent: Option<Link>,
    assignee: Option<Link>,
}

#[derive(Debug, Default, Deserialize)]
struct WireWorkPackageEmbedded {
    status: Option<WireEmbeddedStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEmbeddedStatus {
    #[serde(default)]
    is_closed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireStatus {
    id: Option<Value>,
    name: Option<String>,
    #[serde(default)]
    is_closed: bool,
    color: Option<String>,
    #[serde(rename = "_links", default)]
    links: SelfLinks,
}

#[derive(Debug, Deserialize)]
struct WireNamed {
    id: Option<Value>,
    name: Option<String>,
    #[serde(rename = "_links", default)]
    links: SelfLinks,
}

#[derive(Debug, Deserialize)]
struct WireCollection<T> {
    #[serde(rename = "_embedded")]
    embedded: Option<WireElements<T>>,
}

#[derive(Debug, Deserialize)]
struct WireElements<T> {
    elements: Option<Vec<T>>,
}

/// Decodes one work-package document.
pub fn decode_work_package(value: Value) -> ClientResult<WorkPackage> {
    let wire: WireWorkPackage = from_value(value, "work package")?;
    work_package_from_wire(wire)
}

/// Decodes a work-package collection (search results).
pub fn decode_work_packages(value: Value) -> ClientResult<Vec<WorkPackage>> {
    collection_elements::<WireWorkPackage>(value, "work package")?
        .into_iter()
        .map(work_package_from_wire)
        .collect()
}

/// Decodes `GET /statuses`.
pub fn decode_statuses(value: Value) -> ClientResult<Vec<Status>> {
    Ok(collection_elements::<WireStatus>(value, "status")?
        .into_iter()
        .filter_map(|wire| {
            let href = link_href(wire.links.self_link.as_ref())?;
            Some(Status {
                id: wire.id.as_ref().and_then(id_string).unwrap_or_default(),
                name: wire.name.unwrap_or_default(),
                is_closed: wire.is_closed,
                color: wire.color,
                href,
            })
        })
        .collect())
}

/// Decodes `GET /projects`.
pub fn decode_projects(value: Value) -> ClientResult<Vec<Project>> {
    Ok(collection_elements::<WireNamed>(value, "project")?
        .into_iter()
        .filter_map(|wire| {
            Some(Project {
                id: wire.id.as_ref().and_then(id_string)?,
                name: wire.name.unwrap_or_default(),
            })
        })
        .collect())
}

/// Decodes `GET /projects/{id}/types`.
pub fn decode_types(value: Value) -> ClientResult<Vec<WorkPackageType>> {
    Ok(collection_elements::<WireNamed>(value, "type")?
        .into_iter()
        .filter_map(|wire| {
            let href = link_href(wire.links.self_link.as_ref())?;
            Some(WorkPackageType {
                id: wire
                    .id
                    .as_ref()
                    .and_then(id_string)
                    .or_else(|| id_from_href(&href))
                    .unwrap_or_default(),
                name: wire.name.unwrap_or_default(),
                href,
            })
        })
        .collect())
}

/// Encodes a create request body.
pub fn encode_new_work_package(request: &NewWorkPackage) -> Value {
    let mut links = Map::new();
    links.insert("type".to_string(), json!({ "href": request.type_href }));
    if let Some(parent_href) = &request.parent_href {
        links.insert("parent".to_string(), json!({ "href": parent_href }));
    }
    if let Some(status_href) = &request.status_href {
        links.insert("status".to_string(), json!({ "href": status_href }));
    }

    let mut body = Map::new();
    body.insert("subject".to_string(), json!(request.subject));
    if let Some(description) = &request.description {
        body.insert(
            "description".to_string(),
            json!({ "format": description.format.as_str(), "raw": description.raw }),
        );
    }
    body.insert("_links".to_string(), Value::Object(links));
    Value::Object(body)
}

/// Encodes a patch body; `lockVersion` is always present.
pub fn encode_patch(patch: &WorkPackagePatch) -> Value {
    let mut body = Map::new();
    body.insert("lockVersion".to_string(), json!(patch.lock_version));
    if let Some(subject) = &patch.subject {
        body.insert("subject".to_string(), json!(subject));
    }
    if let Some(status_href) = &patch.status_href {
        body.insert(
            "_links".to_string(),
            json!({ "status": { "href": status_href } }),
        );
    }
    Value::Object(body)
}

/// Serialized `filters` query value for typeahead search.
pub fn typeahead_filter(query: &str) -> String {
    json!([{ "typeahead": { "operator": "**", "values": [query] } }]).to_string()
}

/// Last non-empty path segment of an href, e.g. `/api/v3/statuses/7` -> `7`.
pub fn id_from_href(href: &str) -> Option<String> {
    href.trim_end_matches('/')
        .rsplit('/')
        .next()
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Extracts `message` from an OpenProject error document.
pub fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}

fn work_package_from_wire(wire: WireWorkPackage) -> ClientResult<WorkPackage> {
    let id = wire
        .id
        .as_ref()
        .and_then(id_string)
        .ok_or_else(|| ClientError::Decode("work package id missing".to_string()))?;
    let lock_version = wire
        .lock_version
        .ok_or_else(|| ClientError::Decode("work package lockVersion missing".to_string()))?;

    let links = wire.links;
    let status = links.status.as_ref().and_then(|link| {
        let href = link_href(Some(link))?;
        Some(StatusRef {
            id: id_from_href(&href).unwrap_or_default(),
            name: link.title.clone().unwrap_or_else(|| "Unknown".to_string()),
            href,
            is_closed: wire
                .embedded
                .status
                .as_ref()
                .is_some_and(|status| status.is_closed),
        })
    });

    Ok(WorkPackage {
        id,
        subject: wire.subject.unwrap_or_default(),
        lock_version,
        parent_id: link_href(links.parent.as_ref()).and_then(|href| id_from_href(&href)),
        status,
        type_name: links.type_link.and_then(|link| link.title),
        assignee: links.assignee.and_then(|link| link.title),
        self_href: link_href(links.self_link.as_ref()),
    })
}

fn collection_elements<T: DeserializeOwned>(value: Value, what: &str) -> ClientResult<Vec<T>> {
    let collection: WireCollection<T> = from_value(value, what)?;
    match collection.embedded.and_then(|embedded| embedded.elements) {
        Some(elements) => Ok(elements),
        None => {
            warn!("event=hal_decode module=client status=empty resource={what} reason=missing_elements");
            Ok(Vec::new())
        }
    }
}

fn from_value<T: DeserializeOwned>(value: Value, what: &str) -> ClientResult<T> {
    serde_json::from_value(value).map_err(|err| ClientError::Decode(format!("{what}: {err}")))
}

fn link_href(link: Option<&Link>) -> Option<String> {
    link.and_then(|link| link.href.as_deref())
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_string)
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(raw) if !raw.trim().is_empty() => Some(raw.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
