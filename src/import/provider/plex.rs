/// Plex media server client.
use super::plex_types::{
    PlexEnvelope, PlexIdentity, PlexMetadata, PlexMetadataContainer, PlexSection, PlexSections,
};
use super::{MediaProvider, ProviderKind, get_json, send_checked};
use crate::import::{Library, LibraryKind, MediaItem, Page, ProviderError};
use async_trait::async_trait;
use reqwest::header::ACCEPT;

const TOKEN_PARAM: &str = "X-Plex-Token";

/// Plex item type filters for `/library/sections/{id}/all`.
const MOVIE_TYPE: &str = "1";
const SHOW_TYPE: &str = "2";

pub struct PlexProvider {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl PlexProvider {
    pub fn new(client: reqwest::Client, base_url: String, token: String) -> Self {
        Self {
            client,
            base_url,
            token,
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .header(TOKEN_PARAM, &self.token)
            .header(ACCEPT, "application/json")
    }

    async fn metadata_page(
        &self,
        path: &str,
        extra: &[(&str, &str)],
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<PlexMetadata>, usize), ProviderError> {
        let start = offset.to_string();
        let size = limit.to_string();
        let mut params: Vec<(&str, &str)> = extra.to_vec();
        params.push(("X-Plex-Container-Start", start.as_str()));
        params.push(("X-Plex-Container-Size", size.as_str()));

        let envelope: PlexEnvelope<PlexMetadataContainer> =
            get_json(self.get(path).query(&params)).await?;
        let container = envelope.media_container;
        let total = container.total_size.unwrap_or(container.metadata.len());
        Ok((container.metadata, total))
    }

    fn to_page(
        (metadata, total): (Vec<PlexMetadata>, usize),
        convert: impl Fn(PlexMetadata) -> Option<MediaItem>,
    ) -> Page<MediaItem> {
        let fetched = metadata.len();
        Page {
            items: metadata.into_iter().filter_map(convert).collect(),
            total,
            fetched,
        }
    }

    fn convert_item(metadata: PlexMetadata) -> Option<MediaItem> {
        let thumb = metadata.thumb_path()?.to_string();
        Some(
            MediaItem::new(metadata.title, metadata.rating_key, thumb)
                .with_year(metadata.year.map(|y| y.to_string())),
        )
    }

    /// Specials (season index 0) are excluded for Plex.
    fn convert_season(show_title: &str, metadata: PlexMetadata) -> Option<MediaItem> {
        if metadata.index == Some(0) {
            return None;
        }
        let thumb = metadata.thumb_path()?.to_string();
        let season_title = if metadata.title.trim().is_empty() {
            format!("Season {}", metadata.index.unwrap_or_default())
        } else {
            metadata.title.clone()
        };
        Some(
            MediaItem::new(
                format!("{} - {}", show_title, season_title),
                metadata.rating_key,
                thumb,
            )
            .with_year(metadata.year.map(|y| y.to_string()))
            .with_season_index(metadata.index),
        )
    }

    fn library_kind(section: &PlexSection) -> Option<LibraryKind> {
        match section.section_type.as_deref() {
            Some("movie") => Some(LibraryKind::Movie),
            Some("show") => Some(LibraryKind::Show),
            Some("artist") | Some("photo") => None,
            _ => Some(LibraryKind::guess_from_name(&section.title)),
        }
    }
}

#[async_trait]
impl MediaProvider for PlexProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Plex
    }

    async fn test_connection(&self) -> Result<String, ProviderError> {
        let envelope: PlexEnvelope<PlexIdentity> = get_json(self.get("/identity")).await?;
        let identity = envelope.media_container;
        let name = identity
            .friendly_name
            .or(identity.machine_identifier)
            .unwrap_or_else(|| "Plex".to_string());
        Ok(format!(
            "{} (Plex {})",
            name,
            identity.version.as_deref().unwrap_or("unknown version")
        ))
    }

    async fn libraries(&self) -> Result<Vec<Library>, ProviderError> {
        let envelope: PlexEnvelope<PlexSections> =
            get_json(self.get("/library/sections")).await?;

        Ok(envelope
            .media_container
            .directories
            .into_iter()
            .filter_map(|section| {
                let kind = Self::library_kind(&section)?;
                Some(Library {
                    id: section.key,
                    title: section.title,
                    kind,
                })
            })
            .collect())
    }

    async fn movies_page(
        &self,
        library_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Page<MediaItem>, ProviderError> {
        let raw = self
            .metadata_page(
                &format!("/library/sections/{}/all", library_id),
                &[("type", MOVIE_TYPE)],
                offset,
                limit,
            )
            .await?;
        Ok(Self::to_page(raw, Self::convert_item))
    }

    async fn shows_page(
        &self,
        library_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Page<MediaItem>, ProviderError> {
        let raw = self
            .metadata_page(
                &format!("/library/sections/{}/all", library_id),
                &[("type", SHOW_TYPE)],
                offset,
                limit,
            )
            .await?;
        Ok(Self::to_page(raw, Self::convert_item))
    }

    async fn seasons_page(
        &self,
        show: &MediaItem,
        offset: usize,
        limit: usize,
    ) -> Result<Page<MediaItem>, ProviderError> {
        let raw = self
            .metadata_page(
                &format!("/library/metadata/{}/children", show.id),
                &[],
                offset,
                limit,
            )
            .await?;
        Ok(Self::to_page(raw, |metadata| {
            Self::convert_season(&show.title, metadata)
        }))
    }

    async fn collections_page(
        &self,
        library_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Page<MediaItem>, ProviderError> {
        let raw = self
            .metadata_page(
                &format!("/library/sections/{}/collections", library_id),
                &[],
                offset,
                limit,
            )
            .await?;
        Ok(Self::to_page(raw, Self::convert_item))
    }

    async fn show(&self, show_id: &str) -> Result<MediaItem, ProviderError> {
        let envelope: PlexEnvelope<PlexMetadataContainer> =
            get_json(self.get(&format!("/library/metadata/{}", show_id))).await?;
        let metadata = envelope
            .media_container
            .metadata
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Malformed(format!("Show {} not found", show_id)))?;

        let thumb = metadata.thumb_path().unwrap_or_default().to_string();
        Ok(MediaItem::new(metadata.title, metadata.rating_key, thumb)
            .with_year(metadata.year.map(|y| y.to_string())))
    }

    async fn download_image(&self, item: &MediaItem) -> Result<Vec<u8>, ProviderError> {
        // Only server-relative paths; the token goes out with every request.
        if !item.image_ref.starts_with('/') || item.image_ref.starts_with("//") {
            return Err(ProviderError::Malformed(format!(
                "Unexpected image path for {}: {}",
                item.title, item.image_ref
            )));
        }

        let response = send_checked(
            self.get(&item.image_ref)
                .query(&[(TOKEN_PARAM, self.token.as_str())]),
        )
        .await?;

        Ok(response.bytes().await?.to_vec())
    }
}
