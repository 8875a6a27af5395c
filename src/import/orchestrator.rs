use super::batch::process_batch;
use super::pagination::fetch_all;
use super::provider::MediaProvider;
use super::{
    BatchResult, ContentCategory, ImportError, MediaItem, OverwritePolicy, Progress,
    ProviderError, TotalStats,
};
use crate::DirectoryConfig;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// One validated `import_posters` call.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    /// What to query from the provider (`type`).
    pub category: ContentCategory,
    pub library_id: String,
    /// Which gallery directory receives the files (`contentType`).
    pub target: ContentCategory,
    pub policy: OverwritePolicy,
    pub show_key: Option<String>,
    pub import_all_seasons: bool,
    pub batch_processing: bool,
    pub start_index: usize,
    /// Running totals echoed back by the client (all-shows seasons mode).
    pub prior_totals: TotalStats,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub success: bool,
    pub batch_complete: bool,
    pub progress: Progress,
    pub results: BatchResult,
    pub total_stats: TotalStats,
}

impl ImportResponse {
    fn new(progress: Progress, results: BatchResult, total_stats: TotalStats) -> Self {
        Self {
            success: true,
            batch_complete: true,
            progress,
            results,
            total_stats,
        }
    }
}

/// Decides which slice of provider data a call owes and folds its results.
///
/// Holds no state between calls: every call re-lists the provider and the
/// cursor and running totals arrive with the request.
pub struct Importer<'a> {
    provider: &'a dyn MediaProvider,
    directories: &'a DirectoryConfig,
    batch_size: usize,
}

impl<'a> Importer<'a> {
    pub fn new(
        provider: &'a dyn MediaProvider,
        directories: &'a DirectoryConfig,
        batch_size: usize,
    ) -> Self {
        Self {
            provider,
            directories,
            batch_size: batch_size.max(1),
        }
    }

    pub async fn run(&self, request: &ImportRequest) -> Result<ImportResponse, ImportError> {
        let target_dir = self.directories.dir_for(request.target);
        if !crate::startup_checks::is_writable_dir(target_dir).await {
            return Err(ImportError::DirectoryUnavailable(target_dir.to_path_buf()));
        }

        info!(
            "Importing {} from {} library '{}' into {:?} (start {}, batch {})",
            request.category,
            self.provider.label(),
            request.library_id,
            target_dir,
            request.start_index,
            request.batch_processing
        );

        match request.category {
            ContentCategory::Seasons => match request.show_key.as_deref() {
                Some(show_key) if !show_key.is_empty() => {
                    self.run_single_show(show_key, request, target_dir).await
                }
                _ if request.import_all_seasons => self.run_all_shows(request, target_dir).await,
                _ => Err(ImportError::Validation(
                    "Either showKey or importAllSeasons=true is required for seasons".to_string(),
                )),
            },
            category => {
                let items = self.list(category, &request.library_id).await?;
                Ok(self.run_flat(&items, request, target_dir).await)
            }
        }
    }

    /// Fully materializes a movies, shows or collections listing.
    pub async fn list(
        &self,
        category: ContentCategory,
        library_id: &str,
    ) -> Result<Vec<MediaItem>, ProviderError> {
        let provider = self.provider;
        match category {
            ContentCategory::Movies => {
                fetch_all(move |offset, limit| provider.movies_page(library_id, offset, limit))
                    .await
            }
            ContentCategory::Shows | ContentCategory::Seasons => {
                fetch_all(move |offset, limit| provider.shows_page(library_id, offset, limit))
                    .await
            }
            ContentCategory::Collections => {
                let collections = fetch_all(move |offset, limit| {
                    provider.collections_page(library_id, offset, limit)
                })
                .await?;
                provider.filter_collections(library_id, collections).await
            }
        }
    }

    pub async fn list_seasons(&self, show: &MediaItem) -> Result<Vec<MediaItem>, ProviderError> {
        let provider = self.provider;
        fetch_all(move |offset, limit| provider.seasons_page(show, offset, limit)).await
    }

    async fn run_flat(
        &self,
        items: &[MediaItem],
        request: &ImportRequest,
        target_dir: &Path,
    ) -> ImportResponse {
        let total = items.len();
        let (start, end) = if request.batch_processing {
            let start = request.start_index.min(total);
            (start, (start + self.batch_size).min(total))
        } else {
            (0, total)
        };

        let results = process_batch(
            &items[start..end],
            self.provider,
            target_dir,
            request.policy,
            request.target,
        )
        .await;

        // Summing across calls is the client's job for flat listings.
        let total_stats = TotalStats::from(&results);
        ImportResponse::new(Progress::at(end, total), results, total_stats)
    }

    async fn run_single_show(
        &self,
        show_key: &str,
        request: &ImportRequest,
        target_dir: &Path,
    ) -> Result<ImportResponse, ImportError> {
        let show = self.provider.show(show_key).await?;
        let seasons = self.list_seasons(&show).await?;

        let results = process_batch(
            &seasons,
            self.provider,
            target_dir,
            request.policy,
            request.target,
        )
        .await;

        let total_stats = TotalStats::from(&results);
        Ok(ImportResponse::new(
            Progress::at(seasons.len(), seasons.len()),
            results,
            total_stats,
        ))
    }

    /// The cursor walks the show list; each call imports every season of one show.
    async fn run_all_shows(
        &self,
        request: &ImportRequest,
        target_dir: &Path,
    ) -> Result<ImportResponse, ImportError> {
        let shows = self.list(ContentCategory::Shows, &request.library_id).await?;
        let total = shows.len();

        let (start, end) = if request.batch_processing {
            let start = request.start_index.min(total);
            (start, (start + 1).min(total))
        } else {
            (0, total)
        };

        let mut results = BatchResult::default();
        let mut total_stats = request.prior_totals;
        for show in &shows[start..end] {
            let show_result = self.import_show_seasons(show, request, target_dir).await;
            total_stats = total_stats.fold(&show_result);
            results.absorb(show_result);
        }

        Ok(ImportResponse::new(
            Progress::at(end, total),
            results,
            total_stats,
        ))
    }

    /// A failing show counts as one failed unit instead of failing the call.
    async fn import_show_seasons(
        &self,
        show: &MediaItem,
        request: &ImportRequest,
        target_dir: &Path,
    ) -> BatchResult {
        match self.list_seasons(show).await {
            Ok(seasons) => {
                process_batch(
                    &seasons,
                    self.provider,
                    target_dir,
                    request.policy,
                    request.target,
                )
                .await
            }
            Err(e) => {
                let message = format!("Failed to process seasons of {}: {}", show.title, e);
                warn!("{}", message);
                BatchResult {
                    failed: 1,
                    errors: vec![message],
                    ..Default::default()
                }
            }
        }
    }
}
