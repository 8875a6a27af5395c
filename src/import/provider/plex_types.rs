/// Plex API response types for deserialization (JSON flavour, requested
/// with `Accept: application/json`).
use serde::Deserialize;

/// Every Plex response is wrapped in a `MediaContainer` object.
#[derive(Debug, Deserialize)]
pub(super) struct PlexEnvelope<T> {
    #[serde(rename = "MediaContainer")]
    pub media_container: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PlexIdentity {
    pub machine_identifier: Option<String>,
    pub version: Option<String>,
    pub friendly_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PlexSections {
    #[serde(rename = "Directory", default)]
    pub directories: Vec<PlexSection>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PlexSection {
    pub key: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type")]
    pub section_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PlexMetadataContainer {
    pub total_size: Option<usize>,
    #[serde(rename = "Metadata", default)]
    pub metadata: Vec<PlexMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PlexMetadata {
    pub rating_key: String,
    #[serde(default)]
    pub title: String,
    pub year: Option<i32>,
    pub index: Option<u32>,
    pub thumb: Option<String>,
}

impl PlexMetadata {
    pub fn thumb_path(&self) -> Option<&str> {
        self.thumb.as_deref().filter(|thumb| !thumb.is_empty())
    }
}
