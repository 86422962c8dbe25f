//! Request and response bodies of the operations service.

use serde::{Deserialize, Serialize};

/// Plain result of an operation that only reports back.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct OperationMessage {
    pub message: String,
}

/// Copy or move between two storage locations.
#[derive(Debug, Clone, Serialize)]
pub struct TransferRequest {
    pub src: String,
    pub dst: String,
    pub threads: i64,
    pub delete_source: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BucketRequest {
    pub project: String,
    pub bucket: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectRequest {
    pub project: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceAccountRequest {
    pub project: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyRequest {
    pub project: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccount {
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountList {
    #[serde(default)]
    pub accounts: Vec<ServiceAccount>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RenamedAccount {
    pub email: String,
    pub old_display_name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountKey {
    pub name: String,
    pub key_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeyList {
    #[serde(default)]
    pub keys: Vec<ServiceAccountKey>,
}

/// A new key, uploaded by the service and reachable through a short-lived link.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CreatedKey {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VolumeRequest {
    pub path: String,
    pub author: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StateRequest {
    pub url: String,
    pub author: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Preview {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct BoundingBox {
    pub name: String,
    /// `[x0, y0, z0, x1, y1, z1]` in voxels.
    pub bbox: Vec<i64>,
}

/// What a viewer state link resolves to.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedState {
    pub source: String,
    #[serde(default)]
    pub voxel_size: Option<Vec<f64>>,
    #[serde(default)]
    pub bboxes: Vec<BoundingBox>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CutoutRequest {
    pub source: String,
    pub destination: String,
    pub bbox: Vec<i64>,
    pub voxel_size: Vec<f64>,
    pub author: String,
}
