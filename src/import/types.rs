use serde::{Deserialize, Serialize};

/// A poster-bearing item as seen by the import pipeline, independent of
/// which media server produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub title: String,
    pub id: String,
    /// Opaque reference needed to fetch the primary image: an image tag for
    /// Jellyfin, a relative thumb path for Plex.
    pub image_ref: String,
    pub year: Option<String>,
    pub season_index: Option<u32>,
}

impl MediaItem {
    pub fn new(title: impl Into<String>, id: impl Into<String>, image_ref: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            id: id.into(),
            image_ref: image_ref.into(),
            year: None,
            season_index: None,
        }
    }

    pub fn with_year(mut self, year: Option<String>) -> Self {
        self.year = year;
        self
    }

    pub fn with_season_index(mut self, index: Option<u32>) -> Self {
        self.season_index = index;
        self
    }
}

/// Content category. Fixes both the provider query and the output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentCategory {
    Movies,
    #[serde(alias = "tv-shows")]
    Shows,
    #[serde(alias = "tv-seasons")]
    Seasons,
    Collections,
}

impl ContentCategory {
    pub const ALL: [ContentCategory; 4] = [
        ContentCategory::Movies,
        ContentCategory::Shows,
        ContentCategory::Seasons,
        ContentCategory::Collections,
    ];

    /// Parses the `type` request field.
    pub fn from_import_type(value: &str) -> Option<Self> {
        match value {
            "movies" => Some(Self::Movies),
            "shows" => Some(Self::Shows),
            "seasons" => Some(Self::Seasons),
            "collections" => Some(Self::Collections),
            _ => None,
        }
    }

    /// Parses the `contentType` request field, which names the gallery directory.
    pub fn from_content_type(value: &str) -> Option<Self> {
        match value {
            "movies" => Some(Self::Movies),
            "tv-shows" => Some(Self::Shows),
            "tv-seasons" => Some(Self::Seasons),
            "collections" => Some(Self::Collections),
            _ => None,
        }
    }

    /// The slug used for the gallery directory in URLs.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Movies => "movies",
            Self::Shows => "tv-shows",
            Self::Seasons => "tv-seasons",
            Self::Collections => "collections",
        }
    }
}

impl std::fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    Skip,
    Overwrite,
    Copy,
}

impl OverwritePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "skip" => Some(Self::Skip),
            "overwrite" => Some(Self::Overwrite),
            "copy" => Some(Self::Copy),
            _ => None,
        }
    }
}

/// Movie-like or show-like, as resolved from provider library metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryKind {
    Movie,
    Show,
}

impl LibraryKind {
    /// Name-substring fallback used when a provider does not declare a type.
    pub fn guess_from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if ["show", "tv", "series", "anime"]
            .iter()
            .any(|needle| lower.contains(needle))
        {
            Self::Show
        } else {
            Self::Movie
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Library {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: LibraryKind,
}

/// One page of provider results.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total number of entries the provider reports for the whole listing.
    pub total: usize,
    /// Raw entries returned for this page, before items without a primary
    /// image were dropped.
    pub fetched: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    SkipOption,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDetail {
    pub file: String,
    pub reason: SkipReason,
    pub message: String,
}

/// Counters and reasons for one batch. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub successful: usize,
    pub skipped: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub skipped_details: Vec<SkippedDetail>,
}

impl BatchResult {
    /// Appends another batch's counters and reasons.
    pub fn absorb(&mut self, other: BatchResult) {
        self.successful += other.successful;
        self.skipped += other.skipped;
        self.unchanged += other.unchanged;
        self.failed += other.failed;
        self.errors.extend(other.errors);
        self.skipped_details.extend(other.skipped_details);
    }
}

/// Running totals a client carries between calls of one import job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalStats {
    pub successful: usize,
    pub skipped: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl TotalStats {
    /// Folds one batch into the totals the client sent back.
    pub fn fold(self, batch: &BatchResult) -> TotalStats {
        TotalStats {
            successful: self.successful + batch.successful,
            skipped: self.skipped + batch.skipped,
            unchanged: self.unchanged + batch.unchanged,
            failed: self.failed + batch.failed,
        }
    }
}

impl From<&BatchResult> for TotalStats {
    fn from(batch: &BatchResult) -> Self {
        TotalStats::default().fold(batch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
    pub percentage: u32,
    pub is_complete: bool,
    pub next_index: Option<usize>,
}

impl Progress {
    /// Progress after a call that advanced the cursor to `processed`.
    pub fn at(processed: usize, total: usize) -> Self {
        if total == 0 {
            return Self::empty();
        }

        let processed = processed.min(total);
        let is_complete = processed >= total;
        Self {
            processed,
            total,
            percentage: ((processed as f64 / total as f64) * 100.0).round() as u32,
            is_complete,
            next_index: if is_complete { None } else { Some(processed) },
        }
    }

    /// Nothing to import: complete immediately instead of dividing by zero.
    pub fn empty() -> Self {
        Self {
            processed: 0,
            total: 0,
            percentage: 100,
            is_complete: true,
            next_index: None,
        }
    }
}
