mod jellyfin;
mod jellyfin_types;
mod plex;
mod plex_types;

pub use jellyfin::JellyfinProvider;
pub use plex::PlexProvider;

use super::{ImportError, Library, MediaItem, Page, ProviderError};
use crate::{ImportConfig, ProviderConfig};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// The media servers posters can be imported from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Jellyfin,
    Plex,
}

impl ProviderKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "jellyfin" => Some(Self::Jellyfin),
            "plex" => Some(Self::Plex),
            _ => None,
        }
    }

    /// Display name, appended to every imported file name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Jellyfin => "Jellyfin",
            Self::Plex => "Plex",
        }
    }
}

/// A media server that lists poster-bearing items and serves their images.
///
/// Listing methods return a single page; callers walk them with
/// [`super::pagination::fetch_all`]. Items without a primary image never
/// appear in a page.
#[async_trait]
pub trait MediaProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn label(&self) -> &'static str {
        self.kind().label()
    }

    /// Human readable description of the server, e.g. its name and version.
    async fn test_connection(&self) -> Result<String, ProviderError>;

    /// Video libraries only; pseudo-libraries such as live TV are excluded.
    async fn libraries(&self) -> Result<Vec<Library>, ProviderError>;

    async fn movies_page(
        &self,
        library_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Page<MediaItem>, ProviderError>;

    async fn shows_page(
        &self,
        library_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Page<MediaItem>, ProviderError>;

    /// Seasons of one show, titled `"{show} - {season}"`.
    async fn seasons_page(
        &self,
        show: &MediaItem,
        offset: usize,
        limit: usize,
    ) -> Result<Page<MediaItem>, ProviderError>;

    async fn collections_page(
        &self,
        library_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Page<MediaItem>, ProviderError>;

    /// Narrows a full collection listing to those matching the library's
    /// media type. Providers whose collections are already scoped to a
    /// library keep them all.
    async fn filter_collections(
        &self,
        _library_id: &str,
        collections: Vec<MediaItem>,
    ) -> Result<Vec<MediaItem>, ProviderError> {
        Ok(collections)
    }

    /// Looks up a single show so its title can prefix season names.
    async fn show(&self, show_id: &str) -> Result<MediaItem, ProviderError>;

    /// Raw bytes of the item's primary image. Never JSON-decoded.
    async fn download_image(&self, item: &MediaItem) -> Result<Vec<u8>, ProviderError>;
}

/// Builds a fresh client for one inbound request. Any per-server context a
/// client resolves lives only as long as the returned value.
pub fn connect(
    kind: ProviderKind,
    provider_config: Option<&ProviderConfig>,
    import_config: &ImportConfig,
) -> Result<Box<dyn MediaProvider>, ImportError> {
    let provider_config = provider_config.ok_or_else(|| {
        ImportError::Config(format!("{} server is not configured", kind.label()))
    })?;

    if provider_config.url.trim().is_empty() {
        return Err(ImportError::Config(format!(
            "{} server URL is missing",
            kind.label()
        )));
    }
    if provider_config.token.trim().is_empty() {
        return Err(ImportError::Config(format!(
            "{} token is missing",
            kind.label()
        )));
    }

    let base_url = url::Url::parse(provider_config.url.trim()).map_err(|e| {
        ImportError::Config(format!("{} server URL is invalid: {}", kind.label(), e))
    })?;

    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(import_config.connect_timeout_secs))
        .timeout(Duration::from_secs(import_config.request_timeout_secs))
        .build()
        .map_err(|e| ImportError::Config(format!("Failed to build HTTP client: {}", e)))?;

    let base_url = base_url.as_str().trim_end_matches('/').to_string();
    let token = provider_config.token.trim().to_string();

    Ok(match kind {
        ProviderKind::Jellyfin => Box::new(JellyfinProvider::new(
            client,
            base_url,
            token,
            import_config.filter_collections_by_library,
        )),
        ProviderKind::Plex => Box::new(PlexProvider::new(client, base_url, token)),
    })
}

/// Sends a request and checks the status, leaving the body untouched.
pub(crate) async fn send_checked(
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, ProviderError> {
    let response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::BadStatus(status.as_u16()));
    }

    Ok(response)
}

/// Sends a request and decodes a JSON body.
pub(crate) async fn get_json<T: serde::de::DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, ProviderError> {
    let response = send_checked(request).await?;
    let body = response.bytes().await?;

    serde_json::from_slice(&body).map_err(|e| ProviderError::Malformed(e.to_string()))
}
