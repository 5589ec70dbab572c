//! I3S resource hierarchy and entry resolution.
//!
//! A [`Resource`] is one addressable piece of a scene layer: the layer
//! document, a node page, a node's geometry, textures and so on. Each maps to
//! a fixed, ordered [`CandidateChain`] of member paths inside the package.

use std::fmt;

/// The fixed set of resource kinds a scene layer package exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    ServiceInfo,
    LayerInfo,
    NodePage,
    NodeIndexDocument,
    Geometry,
    Texture,
    CompressedTexture,
    Feature,
    SharedResource,
    Attribute,
}

impl ResourceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ServiceInfo => "service-info",
            Self::LayerInfo => "layer-info",
            Self::NodePage => "node-page",
            Self::NodeIndexDocument => "node-index-document",
            Self::Geometry => "geometry",
            Self::Texture => "texture",
            Self::CompressedTexture => "compressed-texture",
            Self::Feature => "feature",
            Self::SharedResource => "shared-resource",
            Self::Attribute => "attribute",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resource request with its captured path parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    ServiceInfo,
    LayerInfo,
    /// `None` is the root node page.
    NodePage { node: Option<String> },
    NodeIndexDocument { node: String },
    Geometry { node: String },
    /// `None` is the default `0_0` slot.
    Texture { node: String, slot: Option<String> },
    CompressedTexture { node: String },
    Feature { node: String },
    SharedResource { node: String },
    Attribute { node: String, attribute: String },
}

/// Content classification handed to the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Json,
    OctetStream,
    Jpeg,
}

impl ContentType {
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// Classify a member by the type of its decoded content.
    pub fn of_entry(path: &str) -> Self {
        let decoded = path.strip_suffix(GZIP_SUFFIX).unwrap_or(path);
        if decoded.ends_with(".json") {
            Self::Json
        } else if decoded.ends_with(".jpg") || decoded.ends_with(".jpeg") {
            Self::Jpeg
        } else {
            Self::OctetStream
        }
    }
}

/// Suffix marking a member as an independently gzipped stream.
pub const GZIP_SUFFIX: &str = ".gz";

/// Default texture slot name.
pub const DEFAULT_TEXTURE_SLOT: &str = "0_0";

/// How a member's bytes reach the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Gzipped members are decompressed before returning.
    Decoded,
    /// Bytes are returned as stored; the client is told they are gzip.
    PreCompressed,
}

/// One physical member to try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: String,
    pub content_type: ContentType,
    pub delivery: Delivery,
}

impl Candidate {
    fn decoded(path: String) -> Self {
        Self {
            content_type: ContentType::of_entry(&path),
            delivery: Delivery::Decoded,
            path,
        }
    }
}

/// What happens once every candidate has been tried and none exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exhausted {
    /// Report the last missing entry as not found.
    NotFound,
    /// Succeed with no content.
    NoContent,
}

/// Ordered member paths for a resource, tried first to last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateChain {
    pub candidates: Vec<Candidate>,
    pub on_exhausted: Exhausted,
}

impl Resource {
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::ServiceInfo => ResourceKind::ServiceInfo,
            Self::LayerInfo => ResourceKind::LayerInfo,
            Self::NodePage { .. } => ResourceKind::NodePage,
            Self::NodeIndexDocument { .. } => ResourceKind::NodeIndexDocument,
            Self::Geometry { .. } => ResourceKind::Geometry,
            Self::Texture { .. } => ResourceKind::Texture,
            Self::CompressedTexture { .. } => ResourceKind::CompressedTexture,
            Self::Feature { .. } => ResourceKind::Feature,
            Self::SharedResource { .. } => ResourceKind::SharedResource,
            Self::Attribute { .. } => ResourceKind::Attribute,
        }
    }

    /// Parse a resource path relative to a `SceneServer` root, e.g.
    /// `layers/0/nodes/12/textures/0_0`.
    ///
    /// Either separator is accepted and empty segments are ignored, so
    /// trailing slashes are harmless. The layer id is not interpreted: a
    /// package holds a single layer.
    pub fn from_path(path: &str) -> Option<Self> {
        let segments: Vec<&str> = path
            .split(['/', '\\'])
            .filter(|s| !s.is_empty())
            .collect();

        let resource = match segments.as_slice() {
            [] => Self::ServiceInfo,
            ["layers", _] => Self::LayerInfo,
            ["layers", _, "nodepages"] => Self::NodePage { node: None },
            ["layers", _, "nodepages", n] => Self::NodePage {
                node: Some(n.to_string()),
            },
            ["layers", _, "nodes", n] => Self::NodeIndexDocument { node: n.to_string() },
            ["layers", _, "nodes", n, "geometries", "0"] => Self::Geometry { node: n.to_string() },
            ["layers", _, "nodes", n, "textures", "0_0_1"] => {
                Self::CompressedTexture { node: n.to_string() }
            }
            ["layers", _, "nodes", n, "textures", slot] => Self::Texture {
                node: n.to_string(),
                slot: (*slot != DEFAULT_TEXTURE_SLOT).then(|| slot.to_string()),
            },
            ["layers", _, "nodes", n, "features", "0"] => Self::Feature { node: n.to_string() },
            ["layers", _, "nodes", n, "shared"] => Self::SharedResource { node: n.to_string() },
            ["layers", _, "nodes", n, "attributes", attribute, "0"] => Self::Attribute {
                node: n.to_string(),
                attribute: attribute.to_string(),
            },
            _ => return None,
        };
        Some(resource)
    }

    /// Member paths for this resource, in the order they must be tried.
    pub fn candidates(&self) -> CandidateChain {
        let (candidates, on_exhausted) = match self {
            Self::ServiceInfo | Self::LayerInfo => (
                vec![Candidate::decoded("3dSceneLayer.json.gz".to_string())],
                Exhausted::NotFound,
            ),
            Self::NodePage { node: None } => (
                vec![Candidate::decoded("nodepages/0.json.gz".to_string())],
                Exhausted::NotFound,
            ),
            Self::NodePage { node: Some(node) } => (
                vec![Candidate::decoded(format!("nodepages/{node}.json.gz"))],
                Exhausted::NoContent,
            ),
            Self::NodeIndexDocument { node } => (
                vec![Candidate::decoded(format!(
                    "nodes/{node}/3dNodeIndexDocument.json.gz"
                ))],
                Exhausted::NotFound,
            ),
            Self::Geometry { node } => (
                vec![Candidate {
                    path: format!("nodes/{node}/geometries/0.bin.gz"),
                    content_type: ContentType::OctetStream,
                    delivery: Delivery::PreCompressed,
                }],
                Exhausted::NotFound,
            ),
            Self::Texture { node, slot } => {
                let slot = slot.as_deref().unwrap_or(DEFAULT_TEXTURE_SLOT);
                (
                    vec![
                        Candidate::decoded(format!("nodes/{node}/textures/{slot}.jpg")),
                        Candidate::decoded(format!("nodes/{node}/textures/{slot}.bin")),
                    ],
                    Exhausted::NoContent,
                )
            }
            Self::CompressedTexture { node } => (
                vec![Candidate::decoded(format!(
                    "nodes/{node}/textures/0_0_1.bin.dds.gz"
                ))],
                Exhausted::NoContent,
            ),
            Self::Feature { node } => (
                vec![Candidate::decoded(format!("nodes/{node}/features/0.json.gz"))],
                Exhausted::NotFound,
            ),
            Self::SharedResource { node } => (
                vec![Candidate::decoded(format!(
                    "nodes/{node}/shared/sharedResource.json.gz"
                ))],
                Exhausted::NoContent,
            ),
            Self::Attribute { node, attribute } => (
                vec![Candidate::decoded(format!(
                    "nodes/{node}/attributes/{attribute}/0.bin.gz"
                ))],
                Exhausted::NotFound,
            ),
        };

        CandidateChain {
            candidates,
            on_exhausted,
        }
    }
}
