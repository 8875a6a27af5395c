use super::conflict::{self, Resolution};
use super::filename::{POSTER_EXTENSION, generate_filename};
use super::provider::MediaProvider;
use super::{BatchResult, ContentCategory, MediaItem, OverwritePolicy, SkipReason, SkippedDetail};
use std::path::Path;
use tracing::{debug, info, warn};

/// Imports one batch of posters into `target_dir`, one item at a time.
///
/// Per-item failures are recorded in the result and never abort the batch.
pub async fn process_batch(
    items: &[MediaItem],
    provider: &dyn MediaProvider,
    target_dir: &Path,
    policy: OverwritePolicy,
    category: ContentCategory,
) -> BatchResult {
    let mut result = BatchResult::default();

    for item in items {
        process_item(item, provider, target_dir, policy, category, &mut result).await;
    }

    info!(
        "Batch of {} {} from {}: {} imported, {} skipped ({} unchanged), {} failed",
        items.len(),
        category,
        provider.label(),
        result.successful,
        result.skipped,
        result.unchanged,
        result.failed
    );

    result
}

async fn process_item(
    item: &MediaItem,
    provider: &dyn MediaProvider,
    target_dir: &Path,
    policy: OverwritePolicy,
    category: ContentCategory,
    result: &mut BatchResult,
) {
    let file_name = generate_filename(
        &item.title,
        &item.id,
        POSTER_EXTENSION,
        category,
        provider.label(),
    );
    let target = target_dir.join(&file_name);
    let stem = target
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(&file_name)
        .to_string();

    let resolution = match conflict::resolve(&target, policy, &stem, POSTER_EXTENSION).await {
        Ok(resolution) => resolution,
        Err(e) => {
            record_failure(result, format!("Failed to check {}: {}", item.title, e));
            return;
        }
    };

    match resolution {
        Resolution::Skip => {
            debug!("Skipping existing poster {}", file_name);
            result.skipped += 1;
            result.skipped_details.push(SkippedDetail {
                file: file_name.clone(),
                reason: SkipReason::SkipOption,
                message: format!("File {} already exists", file_name),
            });
        }
        Resolution::WriteTo(path) => {
            let Some(bytes) = download(item, provider, result).await else {
                return;
            };
            match write_poster(&path, &bytes).await {
                Ok(()) => {
                    debug!("Wrote poster {:?}", path);
                    result.successful += 1;
                }
                Err(e) => record_failure(result, format!("Failed to save {}: {}", item.title, e)),
            }
        }
        Resolution::CompareThenWrite(path) => {
            let Some(bytes) = download(item, provider, result).await else {
                return;
            };

            // A missing or unreadable existing file counts as different.
            let unchanged = tokio::fs::read(&path)
                .await
                .map(|existing| existing == bytes)
                .unwrap_or(false);

            if unchanged {
                debug!("Poster {} unchanged", file_name);
                result.skipped += 1;
                result.unchanged += 1;
                result.skipped_details.push(SkippedDetail {
                    file: file_name.clone(),
                    reason: SkipReason::Unchanged,
                    message: format!("File {} is unchanged", file_name),
                });
                return;
            }

            match write_poster(&path, &bytes).await {
                Ok(()) => {
                    debug!("Replaced poster {:?}", path);
                    result.successful += 1;
                }
                Err(e) => record_failure(result, format!("Failed to save {}: {}", item.title, e)),
            }
        }
    }
}

async fn download(
    item: &MediaItem,
    provider: &dyn MediaProvider,
    result: &mut BatchResult,
) -> Option<Vec<u8>> {
    match provider.download_image(item).await {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            record_failure(result, format!("Failed to download {}: {}", item.title, e));
            None
        }
    }
}

fn record_failure(result: &mut BatchResult, message: String) {
    warn!("{}", message);
    result.failed += 1;
    result.errors.push(message);
}

/// Writes the bytes and makes the file world-readable, owner-writable.
pub(crate) async fn write_poster(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::write(path, bytes).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644)).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::testing::FakeProvider;
    use tempfile::TempDir;

    fn movies(count: usize) -> Vec<MediaItem> {
        (0..count)
            .map(|i| MediaItem::new(format!("Movie {}", i), i.to_string(), format!("tag{}", i)))
            .collect()
    }

    #[tokio::test]
    async fn test_fresh_import_writes_every_item() {
        let temp_dir = TempDir::new().unwrap();
        let provider = FakeProvider::default();
        let items = movies(3);

        let result = process_batch(
            &items,
            &provider,
            temp_dir.path(),
            OverwritePolicy::Skip,
            ContentCategory::Movies,
        )
        .await;

        assert_eq!(result.successful, 3);
        assert_eq!(result.failed, 0);
        let written = temp_dir.path().join("Movie 0 [0] Fake.jpg");
        assert_eq!(std::fs::read(&written).unwrap(), b"poster:tag0");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&written).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o644);
        }
    }

    #[tokio::test]
    async fn test_skip_leaves_existing_file_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let provider = FakeProvider::default();
        let items = movies(1);
        let existing = temp_dir.path().join("Movie 0 [0] Fake.jpg");
        std::fs::write(&existing, b"original").unwrap();

        let result = process_batch(
            &items,
            &provider,
            temp_dir.path(),
            OverwritePolicy::Skip,
            ContentCategory::Movies,
        )
        .await;

        assert_eq!(result.skipped, 1);
        assert_eq!(result.successful, 0);
        assert_eq!(result.skipped_details[0].reason, SkipReason::SkipOption);
        assert_eq!(std::fs::read(&existing).unwrap(), b"original");
        assert_eq!(provider.downloads(), 0);
    }

    #[tokio::test]
    async fn test_overwrite_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let provider = FakeProvider::default();
        let items = movies(4);

        let first = process_batch(
            &items,
            &provider,
            temp_dir.path(),
            OverwritePolicy::Overwrite,
            ContentCategory::Movies,
        )
        .await;
        assert_eq!(first.successful, 4);

        let second = process_batch(
            &items,
            &provider,
            temp_dir.path(),
            OverwritePolicy::Overwrite,
            ContentCategory::Movies,
        )
        .await;
        assert_eq!(second.successful, 0);
        assert_eq!(second.skipped, 4);
        assert_eq!(second.unchanged, 4);
        assert!(
            second
                .skipped_details
                .iter()
                .all(|d| d.reason == SkipReason::Unchanged)
        );
    }

    #[tokio::test]
    async fn test_overwrite_replaces_changed_content() {
        let temp_dir = TempDir::new().unwrap();
        let provider = FakeProvider::default();
        let items = movies(1);
        let existing = temp_dir.path().join("Movie 0 [0] Fake.jpg");
        std::fs::write(&existing, b"stale").unwrap();

        let result = process_batch(
            &items,
            &provider,
            temp_dir.path(),
            OverwritePolicy::Overwrite,
            ContentCategory::Movies,
        )
        .await;

        assert_eq!(result.successful, 1);
        assert_eq!(result.unchanged, 0);
        assert_eq!(std::fs::read(&existing).unwrap(), b"poster:tag0");
    }

    #[tokio::test]
    async fn test_copy_never_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let provider = FakeProvider::default();
        let items = movies(1);

        for _ in 0..3 {
            let result = process_batch(
                &items,
                &provider,
                temp_dir.path(),
                OverwritePolicy::Copy,
                ContentCategory::Movies,
            )
            .await;
            assert_eq!(result.successful, 1);
        }

        for name in [
            "Movie 0 [0] Fake.jpg",
            "Movie 0 [0] Fake (1).jpg",
            "Movie 0 [0] Fake (2).jpg",
        ] {
            assert!(temp_dir.path().join(name).exists(), "missing {}", name);
        }
        // Copy always downloads, even when content is identical.
        assert_eq!(provider.downloads(), 3);
    }

    #[tokio::test]
    async fn test_dotted_titles_keep_full_stem_for_copies() {
        let temp_dir = TempDir::new().unwrap();
        let provider = FakeProvider::default();
        let items = vec![MediaItem::new("Mr. Robot: Who?", "7", "t")];

        for _ in 0..2 {
            process_batch(
                &items,
                &provider,
                temp_dir.path(),
                OverwritePolicy::Copy,
                ContentCategory::Shows,
            )
            .await;
        }

        assert!(temp_dir.path().join("Mr. Robot Who [7] Fake.jpg").exists());
        assert!(temp_dir.path().join("Mr. Robot Who [7] Fake (1).jpg").exists());
    }

    #[tokio::test]
    async fn test_download_failure_does_not_abort_batch() {
        let temp_dir = TempDir::new().unwrap();
        let provider = FakeProvider::default().failing_downloads(&["1"]);
        let items = movies(3);

        let result = process_batch(
            &items,
            &provider,
            temp_dir.path(),
            OverwritePolicy::Overwrite,
            ContentCategory::Movies,
        )
        .await;

        assert_eq!(result.successful, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("Failed to download Movie 1: "));
    }

    #[tokio::test]
    async fn test_collections_get_collection_suffix() {
        let temp_dir = TempDir::new().unwrap();
        let provider = FakeProvider::default();
        let items = vec![MediaItem::new("Bond", "c1", "t")];

        process_batch(
            &items,
            &provider,
            temp_dir.path(),
            OverwritePolicy::Skip,
            ContentCategory::Collections,
        )
        .await;

        assert!(
            temp_dir
                .path()
                .join("Bond [c1] Collection Fake.jpg")
                .exists()
        );
    }
}
