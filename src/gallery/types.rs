use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct PosterEntry {
    pub name: String,
    pub url: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryPage {
    pub success: bool,
    pub items: Vec<PosterEntry>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct GalleryQuery {
    /// 1-based.
    pub page: Option<usize>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    pub file: String,
    pub new_name: String,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub file: String,
    /// Category slug of the destination directory.
    pub target: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub file: String,
}
