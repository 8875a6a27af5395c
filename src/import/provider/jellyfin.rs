/// Jellyfin media server client.
use super::jellyfin_types::{
    JellyfinItem, JellyfinItemsResponse, JellyfinSystemInfo, JellyfinUser,
};
use super::{MediaProvider, ProviderKind, get_json, send_checked};
use crate::import::{Library, LibraryKind, MediaItem, Page, ProviderError};
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

const TOKEN_HEADER: &str = "X-Emby-Token";

/// Collection types that never hold posters worth importing.
const EXCLUDED_COLLECTION_TYPES: &[&str] = &["livetv", "music", "books", "photos", "playlists"];

/// Number of members inspected when matching a collection to a library type.
const COLLECTION_SAMPLE_SIZE: usize = 3;

pub struct JellyfinProvider {
    client: reqwest::Client,
    base_url: String,
    token: String,
    filter_collections: bool,
    /// Admin (or first) user id, resolved on first use by this instance.
    user_id: OnceCell<String>,
}

impl JellyfinProvider {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        token: String,
        filter_collections: bool,
    ) -> Self {
        Self {
            client,
            base_url,
            token,
            filter_collections,
            user_id: OnceCell::new(),
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .header(TOKEN_HEADER, &self.token)
    }

    async fn user_id(&self) -> Result<&str, ProviderError> {
        let id = self
            .user_id
            .get_or_try_init(|| async {
                let users: Vec<JellyfinUser> = get_json(self.get("/Users")).await?;
                let user = users
                    .iter()
                    .find(|u| u.policy.as_ref().is_some_and(|p| p.is_administrator))
                    .or_else(|| users.first())
                    .ok_or_else(|| {
                        ProviderError::Malformed("Server reported no users".to_string())
                    })?;
                debug!("Using Jellyfin user '{}' ({})", user.name, user.id);
                Ok::<_, ProviderError>(user.id.clone())
            })
            .await?;
        Ok(id.as_str())
    }

    async fn items_page(
        &self,
        query: &[(&str, String)],
        offset: usize,
        limit: usize,
    ) -> Result<JellyfinItemsResponse, ProviderError> {
        let user_id = self.user_id().await?;
        let mut params: Vec<(&str, String)> = query.to_vec();
        params.push(("StartIndex", offset.to_string()));
        params.push(("Limit", limit.to_string()));

        get_json(
            self.get(&format!("/Users/{}/Items", user_id))
                .query(&params),
        )
        .await
    }

    fn to_page(
        response: JellyfinItemsResponse,
        convert: impl Fn(JellyfinItem) -> Option<MediaItem>,
    ) -> Page<MediaItem> {
        let fetched = response.items.len();
        let total = response.total_record_count.unwrap_or(fetched);
        let items = response.items.into_iter().filter_map(convert).collect();
        Page {
            items,
            total,
            fetched,
        }
    }

    /// Converts a movie, series or collection entry. Entries without a
    /// primary image are dropped.
    fn convert_item(item: JellyfinItem) -> Option<MediaItem> {
        let tag = item.primary_image_tag()?.to_string();
        Some(
            MediaItem::new(item.name, item.id, tag)
                .with_year(item.production_year.map(|y| y.to_string())),
        )
    }

    fn convert_season(show_title: &str, item: JellyfinItem) -> Option<MediaItem> {
        let tag = item.primary_image_tag()?.to_string();
        let season_title = if item.name.trim().is_empty() {
            format!("Season {}", item.index_number.unwrap_or_default())
        } else {
            item.name.clone()
        };
        Some(
            MediaItem::new(format!("{} - {}", show_title, season_title), item.id, tag)
                .with_year(item.production_year.map(|y| y.to_string()))
                .with_season_index(item.index_number),
        )
    }

    fn library_kind(item: &JellyfinItem) -> Option<LibraryKind> {
        match item.collection_type.as_deref() {
            Some(t) if EXCLUDED_COLLECTION_TYPES.contains(&t) => None,
            Some("movies") => Some(LibraryKind::Movie),
            Some("tvshows") => Some(LibraryKind::Show),
            _ => Some(LibraryKind::guess_from_name(&item.name)),
        }
    }

    async fn collection_matches(
        &self,
        collection: &MediaItem,
        expected_type: &str,
    ) -> Result<bool, ProviderError> {
        let user_id = self.user_id().await?;
        let sample: JellyfinItemsResponse = get_json(
            self.get(&format!("/Users/{}/Items", user_id)).query(&[
                ("ParentId", collection.id.clone()),
                ("Limit", COLLECTION_SAMPLE_SIZE.to_string()),
            ]),
        )
        .await?;

        Ok(sample
            .items
            .iter()
            .take(COLLECTION_SAMPLE_SIZE)
            .any(|member| member.item_type.as_deref() == Some(expected_type)))
    }
}

#[async_trait]
impl MediaProvider for JellyfinProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Jellyfin
    }

    async fn test_connection(&self) -> Result<String, ProviderError> {
        let info: JellyfinSystemInfo = get_json(self.get("/System/Info")).await?;
        Ok(format!(
            "{} (Jellyfin {})",
            info.server_name.as_deref().unwrap_or("Jellyfin"),
            info.version.as_deref().unwrap_or("unknown version")
        ))
    }

    async fn libraries(&self) -> Result<Vec<Library>, ProviderError> {
        let user_id = self.user_id().await?;
        let views: JellyfinItemsResponse =
            get_json(self.get(&format!("/Users/{}/Views", user_id))).await?;

        Ok(views
            .items
            .into_iter()
            .filter_map(|view| {
                let kind = Self::library_kind(&view)?;
                Some(Library {
                    id: view.id,
                    title: view.name,
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
        let response = self
            .items_page(
                &[
                    ("ParentId", library_id.to_string()),
                    ("IncludeItemTypes", "Movie".to_string()),
                    ("Recursive", "true".to_string()),
                    ("Fields", "ProductionYear".to_string()),
                    ("SortBy", "SortName".to_string()),
                    ("SortOrder", "Ascending".to_string()),
                ],
                offset,
                limit,
            )
            .await?;
        Ok(Self::to_page(response, Self::convert_item))
    }

    async fn shows_page(
        &self,
        library_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Page<MediaItem>, ProviderError> {
        let response = self
            .items_page(
                &[
                    ("ParentId", library_id.to_string()),
                    ("IncludeItemTypes", "Series".to_string()),
                    ("Recursive", "true".to_string()),
                    ("Fields", "ProductionYear".to_string()),
                    ("SortBy", "SortName".to_string()),
                    ("SortOrder", "Ascending".to_string()),
                ],
                offset,
                limit,
            )
            .await?;
        Ok(Self::to_page(response, Self::convert_item))
    }

    async fn seasons_page(
        &self,
        show: &MediaItem,
        offset: usize,
        limit: usize,
    ) -> Result<Page<MediaItem>, ProviderError> {
        let response = self
            .items_page(
                &[
                    ("ParentId", show.id.clone()),
                    ("IncludeItemTypes", "Season".to_string()),
                ],
                offset,
                limit,
            )
            .await?;
        // Specials (index 0) are kept for Jellyfin.
        Ok(Self::to_page(response, |item| {
            Self::convert_season(&show.title, item)
        }))
    }

    async fn collections_page(
        &self,
        _library_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Page<MediaItem>, ProviderError> {
        let response = self
            .items_page(
                &[
                    ("IncludeItemTypes", "BoxSet".to_string()),
                    ("Recursive", "true".to_string()),
                    ("SortBy", "SortName".to_string()),
                    ("SortOrder", "Ascending".to_string()),
                ],
                offset,
                limit,
            )
            .await?;
        Ok(Self::to_page(response, Self::convert_item))
    }

    async fn filter_collections(
        &self,
        library_id: &str,
        collections: Vec<MediaItem>,
    ) -> Result<Vec<MediaItem>, ProviderError> {
        if !self.filter_collections {
            return Ok(collections);
        }

        let Some(library) = self
            .libraries()
            .await?
            .into_iter()
            .find(|library| library.id == library_id)
        else {
            warn!(
                "Library {} not found, keeping all {} collections",
                library_id,
                collections.len()
            );
            return Ok(collections);
        };

        let expected_type = match library.kind {
            LibraryKind::Movie => "Movie",
            LibraryKind::Show => "Series",
        };

        let mut kept = Vec::with_capacity(collections.len());
        for collection in collections {
            match self.collection_matches(&collection, expected_type).await {
                Ok(true) => kept.push(collection),
                Ok(false) => debug!(
                    "Collection '{}' does not match library type {}",
                    collection.title, expected_type
                ),
                Err(e) => {
                    warn!(
                        "Could not sample collection '{}', keeping it: {}",
                        collection.title, e
                    );
                    kept.push(collection);
                }
            }
        }

        Ok(kept)
    }

    async fn show(&self, show_id: &str) -> Result<MediaItem, ProviderError> {
        let user_id = self.user_id().await?;
        let item: JellyfinItem =
            get_json(self.get(&format!("/Users/{}/Items/{}", user_id, show_id))).await?;
        let tag = item.primary_image_tag().unwrap_or_default().to_string();
        Ok(MediaItem::new(item.name, item.id, tag)
            .with_year(item.production_year.map(|y| y.to_string())))
    }

    async fn download_image(&self, item: &MediaItem) -> Result<Vec<u8>, ProviderError> {
        let response = send_checked(
            self.get(&format!("/Items/{}/Images/Primary", item.id))
                .query(&[("tag", item.image_ref.as_str()), ("quality", "90")]),
        )
        .await?;

        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn provider_for(server: &MockServer, filter_collections: bool) -> JellyfinProvider {
        Mock::given(method("GET"))
            .and(path("/Users"))
            .and(header(TOKEN_HEADER, "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "Id": "u-viewer", "Name": "viewer", "Policy": { "IsAdministrator": false } },
                { "Id": "u-admin", "Name": "admin", "Policy": { "IsAdministrator": true } }
            ])))
            .mount(server)
            .await;

        JellyfinProvider::new(
            reqwest::Client::new(),
            server.uri(),
            "secret".to_string(),
            filter_collections,
        )
    }

    #[tokio::test]
    async fn test_movies_page_uses_admin_user_and_drops_imageless_items() {
        let server = MockServer::start().await;
        let provider = provider_for(&server, false).await;

        Mock::given(method("GET"))
            .and(path("/Users/u-admin/Items"))
            .and(query_param("ParentId", "lib1"))
            .and(query_param("IncludeItemTypes", "Movie"))
            .and(query_param("StartIndex", "0"))
            .and(query_param("Limit", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Items": [
                    { "Id": "m1", "Name": "Heat", "ProductionYear": 1995, "ImageTags": { "Primary": "t1" } },
                    { "Id": "m2", "Name": "No Art", "ImageTags": {} }
                ],
                "TotalRecordCount": 2
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = provider.movies_page("lib1", 0, 50).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.fetched, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].title, "Heat");
        assert_eq!(page.items[0].image_ref, "t1");
        assert_eq!(page.items[0].year.as_deref(), Some("1995"));
    }

    #[tokio::test]
    async fn test_user_is_resolved_once_per_client() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "Id": "u1", "Name": "only" }
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/Users/u1/Items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Items": [] })))
            .expect(2)
            .mount(&server)
            .await;

        let provider =
            JellyfinProvider::new(reqwest::Client::new(), server.uri(), "t".to_string(), false);
        let first = provider.shows_page("lib", 0, 50).await.unwrap();
        provider.shows_page("lib", 50, 50).await.unwrap();

        // Missing TotalRecordCount falls back to the page length.
        assert_eq!(first.total, 0);
    }

    #[tokio::test]
    async fn test_libraries_exclude_live_tv_and_guess_types() {
        let server = MockServer::start().await;
        let provider = provider_for(&server, false).await;

        Mock::given(method("GET"))
            .and(path("/Users/u-admin/Views"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Items": [
                    { "Id": "a", "Name": "Movies", "CollectionType": "movies" },
                    { "Id": "b", "Name": "Shows", "CollectionType": "tvshows" },
                    { "Id": "c", "Name": "Live TV", "CollectionType": "livetv" },
                    { "Id": "d", "Name": "Anime Series" }
                ]
            })))
            .mount(&server)
            .await;

        let libraries = provider.libraries().await.unwrap();
        let kinds: Vec<_> = libraries.iter().map(|l| (l.id.as_str(), l.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("a", LibraryKind::Movie),
                ("b", LibraryKind::Show),
                ("d", LibraryKind::Show)
            ]
        );
    }

    #[tokio::test]
    async fn test_seasons_keep_specials_and_compose_titles() {
        let server = MockServer::start().await;
        let provider = provider_for(&server, false).await;

        Mock::given(method("GET"))
            .and(path("/Users/u-admin/Items"))
            .and(query_param("ParentId", "show1"))
            .and(query_param("IncludeItemTypes", "Season"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Items": [
                    { "Id": "s0", "Name": "Specials", "IndexNumber": 0, "ImageTags": { "Primary": "a" } },
                    { "Id": "s1", "Name": "", "IndexNumber": 1, "ImageTags": { "Primary": "b" } }
                ],
                "TotalRecordCount": 2
            })))
            .mount(&server)
            .await;

        let show = MediaItem::new("Lost", "show1", "tag");
        let page = provider.seasons_page(&show, 0, 50).await.unwrap();
        let titles: Vec<_> = page.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Lost - Specials", "Lost - Season 1"]);
        assert_eq!(page.items[1].season_index, Some(1));
    }

    #[tokio::test]
    async fn test_filter_collections_samples_members() {
        let server = MockServer::start().await;
        let provider = provider_for(&server, true).await;

        Mock::given(method("GET"))
            .and(path("/Users/u-admin/Views"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Items": [ { "Id": "movies", "Name": "Movies", "CollectionType": "movies" } ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/Users/u-admin/Items"))
            .and(query_param("ParentId", "c-movie"))
            .and(query_param("Limit", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Items": [ { "Id": "x", "Name": "Alien", "Type": "Movie" } ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/Users/u-admin/Items"))
            .and(query_param("ParentId", "c-series"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Items": [ { "Id": "y", "Name": "Star Trek", "Type": "Series" } ]
            })))
            .mount(&server)
            .await;

        let collections = vec![
            MediaItem::new("Alien", "c-movie", "t"),
            MediaItem::new("Trek", "c-series", "t"),
        ];
        let kept = provider
            .filter_collections("movies", collections)
            .await
            .unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "c-movie");
    }

    #[tokio::test]
    async fn test_download_image_returns_raw_bytes() {
        let server = MockServer::start().await;
        let provider = provider_for(&server, false).await;
        let bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00];

        Mock::given(method("GET"))
            .and(path("/Items/m1/Images/Primary"))
            .and(query_param("tag", "t1"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes.clone()))
            .mount(&server)
            .await;

        let item = MediaItem::new("Heat", "m1", "t1");
        assert_eq!(provider.download_image(&item).await.unwrap(), bytes);
    }

    #[tokio::test]
    async fn test_error_statuses_and_malformed_bodies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/System/Info"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/Users"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let provider =
            JellyfinProvider::new(reqwest::Client::new(), server.uri(), "t".to_string(), false);
        assert!(matches!(
            provider.test_connection().await,
            Err(ProviderError::BadStatus(401))
        ));
        assert!(matches!(
            provider.libraries().await,
            Err(ProviderError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let provider = JellyfinProvider::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9".to_string(),
            "t".to_string(),
            false,
        );
        assert!(matches!(
            provider.test_connection().await,
            Err(ProviderError::Unreachable(_))
        ));
    }
}
