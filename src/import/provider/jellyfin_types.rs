/// Jellyfin API response types for deserialization.
///
/// Only the fields the importer reads are declared; everything else in the
/// server's responses is ignored.
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct JellyfinSystemInfo {
    pub server_name: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct JellyfinUser {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub policy: Option<JellyfinUserPolicy>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct JellyfinUserPolicy {
    #[serde(default)]
    pub is_administrator: bool,
}

/// The `{ Items, TotalRecordCount }` envelope used by item queries.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct JellyfinItemsResponse {
    #[serde(default)]
    pub items: Vec<JellyfinItem>,
    pub total_record_count: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct JellyfinItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "Type")]
    pub item_type: Option<String>,
    pub collection_type: Option<String>,
    pub production_year: Option<i32>,
    pub index_number: Option<u32>,
    #[serde(default)]
    pub image_tags: HashMap<String, String>,
}

impl JellyfinItem {
    pub fn primary_image_tag(&self) -> Option<&str> {
        self.image_tags
            .get("Primary")
            .map(String::as_str)
            .filter(|tag| !tag.is_empty())
    }
}
