//! In-memory provider for exercising the pipeline without a media server.

use super::provider::{MediaProvider, ProviderKind};
use super::{Library, LibraryKind, MediaItem, Page, ProviderError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub(crate) struct FakeProvider {
    pub movies: Vec<MediaItem>,
    pub shows: Vec<MediaItem>,
    pub seasons: HashMap<String, Vec<MediaItem>>,
    pub collections: Vec<MediaItem>,
    failing_downloads: HashSet<String>,
    failing_seasons: HashSet<String>,
    downloads: AtomicUsize,
    page_fetches: AtomicUsize,
}

impl FakeProvider {
    pub fn with_movies(mut self, count: usize) -> Self {
        self.movies = numbered("Movie", "m", count);
        self
    }

    pub fn with_shows(mut self, seasons_per_show: &[usize]) -> Self {
        self.shows = numbered("Show", "s", seasons_per_show.len());
        for (show, count) in self.shows.iter().zip(seasons_per_show) {
            let seasons = (1..=*count)
                .map(|n| {
                    MediaItem::new(
                        format!("{} - Season {}", show.title, n),
                        format!("{}-{}", show.id, n),
                        format!("tag-{}-{}", show.id, n),
                    )
                    .with_season_index(Some(n as u32))
                })
                .collect();
            self.seasons.insert(show.id.clone(), seasons);
        }
        self
    }

    pub fn failing_downloads(mut self, ids: &[&str]) -> Self {
        self.failing_downloads = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn failing_seasons(mut self, show_ids: &[&str]) -> Self {
        self.failing_seasons = show_ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    pub fn page_fetches(&self) -> usize {
        self.page_fetches.load(Ordering::SeqCst)
    }

    fn page(&self, all: &[MediaItem], offset: usize, limit: usize) -> Page<MediaItem> {
        self.page_fetches.fetch_add(1, Ordering::SeqCst);
        let start = offset.min(all.len());
        let end = (offset + limit).min(all.len());
        Page {
            items: all[start..end].to_vec(),
            total: all.len(),
            fetched: end - start,
        }
    }
}

fn numbered(prefix: &str, id_prefix: &str, count: usize) -> Vec<MediaItem> {
    (0..count)
        .map(|i| {
            MediaItem::new(
                format!("{} {}", prefix, i),
                format!("{}{}", id_prefix, i),
                format!("tag-{}{}", id_prefix, i),
            )
        })
        .collect()
}

#[async_trait]
impl MediaProvider for FakeProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Plex
    }

    fn label(&self) -> &'static str {
        "Fake"
    }

    async fn test_connection(&self) -> Result<String, ProviderError> {
        Ok("Fake server".to_string())
    }

    async fn libraries(&self) -> Result<Vec<Library>, ProviderError> {
        Ok(vec![
            Library {
                id: "movies".to_string(),
                title: "Movies".to_string(),
                kind: LibraryKind::Movie,
            },
            Library {
                id: "shows".to_string(),
                title: "Shows".to_string(),
                kind: LibraryKind::Show,
            },
        ])
    }

    async fn movies_page(
        &self,
        _library_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Page<MediaItem>, ProviderError> {
        Ok(self.page(&self.movies, offset, limit))
    }

    async fn shows_page(
        &self,
        _library_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Page<MediaItem>, ProviderError> {
        Ok(self.page(&self.shows, offset, limit))
    }

    async fn seasons_page(
        &self,
        show: &MediaItem,
        offset: usize,
        limit: usize,
    ) -> Result<Page<MediaItem>, ProviderError> {
        if self.failing_seasons.contains(&show.id) {
            return Err(ProviderError::BadStatus(500));
        }
        let seasons = self.seasons.get(&show.id).cloned().unwrap_or_default();
        Ok(self.page(&seasons, offset, limit))
    }

    async fn collections_page(
        &self,
        _library_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Page<MediaItem>, ProviderError> {
        Ok(self.page(&self.collections, offset, limit))
    }

    async fn show(&self, show_id: &str) -> Result<MediaItem, ProviderError> {
        self.shows
            .iter()
            .find(|show| show.id == show_id)
            .cloned()
            .ok_or(ProviderError::BadStatus(404))
    }

    async fn download_image(&self, item: &MediaItem) -> Result<Vec<u8>, ProviderError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if self.failing_downloads.contains(&item.id) {
            return Err(ProviderError::Unreachable("connection reset".to_string()));
        }
        Ok(format!("poster:{}", item.image_ref).into_bytes())
    }
}
