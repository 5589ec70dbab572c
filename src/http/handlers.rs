//! HTTP request handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;

use super::AppState;
use crate::catalog::DEFAULT_COLLECTION;
use crate::error::ResolveError;
use crate::resolver::Resolution;
use crate::resource::{ContentType, DEFAULT_TEXTURE_SLOT, Resource};

const SCENE_SERVER: &str = "SceneServer";
const FEATURE_SERVER: &str = "FeatureServer";

/// A parsed `/{collection?}/{archive}/{service}/...` request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneRequest {
    pub collection: Option<String>,
    pub archive: String,
    pub service: Service,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Service {
    Scene(Resource),
    Feature,
}

impl SceneRequest {
    pub fn parse(path: &str) -> Option<Self> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let is_service = |s: &&str| *s == SCENE_SERVER || *s == FEATURE_SERVER;

        let (collection, archive, at) = match segments.as_slice() {
            [archive, service, ..] if is_service(service) => (None, *archive, 1),
            [collection, archive, service, ..] if is_service(service) => {
                (Some((*collection).to_string()), *archive, 2)
            }
            _ => return None,
        };

        let rest = &segments[at + 1..];
        let service = if segments[at] == FEATURE_SERVER {
            if !rest.is_empty() {
                return None;
            }
            Service::Feature
        } else {
            Service::Scene(Resource::from_path(&rest.join("/"))?)
        };

        Some(Self {
            collection,
            archive: archive.to_string(),
            service,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ArchiveListing {
    pub collection: String,
    pub archive: String,
    /// Path of the scene layer endpoint for this archive.
    pub layer: String,
}

/// Handle `GET /`.
pub async fn list_archives(State(state): State<Arc<AppState>>) -> Json<Vec<ArchiveListing>> {
    let listing = state
        .catalog()
        .list()
        .into_iter()
        .map(|(collection, archive)| {
            let layer = if collection == DEFAULT_COLLECTION {
                format!("/{archive}/{SCENE_SERVER}/layers/0")
            } else {
                format!("/{collection}/{archive}/{SCENE_SERVER}/layers/0")
            };
            ArchiveListing {
                collection,
                archive,
                layer,
            }
        })
        .collect();
    Json(listing)
}

#[derive(Debug, Serialize)]
pub struct ReloadReport {
    pub archives: usize,
    pub failed: Vec<FailedCollection>,
}

#[derive(Debug, Serialize)]
pub struct FailedCollection {
    pub collection: String,
    pub error: String,
}

/// Handle `GET /reload`.
pub async fn reload_catalog(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReloadReport>, AppError> {
    let catalog = Arc::clone(state.catalog());
    let refresh = tokio::task::spawn_blocking(move || catalog.refresh())
        .await
        .map_err(|e| AppError::Internal(format!("catalog refresh panicked: {e}")))?
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(ReloadReport {
        archives: refresh.snapshot.len(),
        failed: refresh
            .failed
            .into_iter()
            .map(|f| FailedCollection {
                collection: f.collection,
                error: f.error.to_string(),
            })
            .collect(),
    }))
}

/// Handle every `SceneServer` and `FeatureServer` path.
pub async fn scene_resource(
    Path(path): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, AppError> {
    let request = SceneRequest::parse(&path)
        .ok_or_else(|| AppError::NotFound(format!("no such resource: /{path}")))?;
    tracing::debug!(?request, "scene request");

    let collection = request.collection.as_deref();
    let resource = match request.service {
        Service::Feature => {
            state
                .resolver()
                .locate_archive(collection, &request.archive)?;
            return Ok(json_response(b"[]".to_vec()));
        }
        Service::Scene(resource) => resource,
    };

    let resolution = state
        .resolver()
        .resolve_and_read(collection, &request.archive, &resource)
        .await?;

    let Resolution::Content(payload) = resolution else {
        tracing::debug!(archive = %request.archive, kind = %resource.kind(), "empty response");
        return Ok(StatusCode::OK.into_response());
    };
    tracing::debug!(
        archive = %request.archive,
        entry = %payload.entry,
        len = payload.bytes.len(),
        encoding = if payload.pre_compressed { "gzip" } else { "identity" },
        "serving member"
    );

    if resource == Resource::ServiceInfo {
        let body = service_info(&request.archive, &payload.bytes)
            .map_err(|e| AppError::Internal(format!("invalid layer document: {e}")))?;
        return Ok(json_response(body));
    }

    let mut response = payload.bytes.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(payload.content_type.mime()),
    );
    if payload.pre_compressed {
        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
    }
    if let Resource::Texture { slot, .. } = &resource {
        let slot = slot.as_deref().unwrap_or(DEFAULT_TEXTURE_SLOT);
        if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{slot}.jpg\"")) {
            headers.insert(header::CONTENT_DISPOSITION, value);
        }
    }
    Ok(response)
}

/// Wrap the layer document in a SceneServer service description.
pub fn service_info(archive: &str, layer: &[u8]) -> Result<Vec<u8>, serde_json::Error> {
    let layer: serde_json::Value = serde_json::from_slice(layer)?;
    serde_json::to_vec(&serde_json::json!({
        "serviceName": archive,
        "name": archive,
        "currentVersion": 10.6,
        "serviceVersion": "1.6",
        "supportedBindings": ["REST"],
        "layers": [layer],
    }))
}

fn json_response(body: Vec<u8>) -> Response {
    (
        [(header::CONTENT_TYPE, ContentType::Json.mime())],
        body,
    )
        .into_response()
}

/// Error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// 404
    NotFound(String),
    /// 500
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, message).into_response()
    }
}

impl From<ResolveError> for AppError {
    fn from(err: ResolveError) -> Self {
        if err.is_not_found() {
            Self::NotFound(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}
