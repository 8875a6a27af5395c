use super::OverwritePolicy;
use std::path::{Path, PathBuf};

/// What to do with a poster whose target path has been computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Skip,
    WriteTo(PathBuf),
    /// Download first, then write only if the bytes differ from the file on disk.
    CompareThenWrite(PathBuf),
}

pub async fn resolve(
    target: &Path,
    policy: OverwritePolicy,
    stem: &str,
    extension: &str,
) -> std::io::Result<Resolution> {
    if !tokio::fs::try_exists(target).await? {
        return Ok(Resolution::WriteTo(target.to_path_buf()));
    }

    match policy {
        OverwritePolicy::Skip => Ok(Resolution::Skip),
        OverwritePolicy::Overwrite => Ok(Resolution::CompareThenWrite(target.to_path_buf())),
        OverwritePolicy::Copy => {
            let directory = target.parent().unwrap_or_else(|| Path::new("."));
            Ok(Resolution::WriteTo(
                next_copy_path(directory, stem, extension).await?,
            ))
        }
    }
}

/// First free `"{stem} ({n}).{ext}"` with `n >= 1`, probed one by one.
pub async fn next_copy_path(
    directory: &Path,
    stem: &str,
    extension: &str,
) -> std::io::Result<PathBuf> {
    let mut counter = 1u32;
    loop {
        let candidate = directory.join(format!("{} ({}).{}", stem, counter, extension));
        if !tokio::fs::try_exists(&candidate).await? {
            return Ok(candidate);
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_target_is_written_for_every_policy() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("Heat [1] Plex.jpg");

        for policy in [
            OverwritePolicy::Skip,
            OverwritePolicy::Overwrite,
            OverwritePolicy::Copy,
        ] {
            let resolution = resolve(&target, policy, "Heat [1] Plex", "jpg")
                .await
                .unwrap();
            assert_eq!(resolution, Resolution::WriteTo(target.clone()));
        }
    }

    #[tokio::test]
    async fn test_existing_target_per_policy() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("Heat [1] Plex.jpg");
        std::fs::write(&target, b"old").unwrap();

        assert_eq!(
            resolve(&target, OverwritePolicy::Skip, "Heat [1] Plex", "jpg")
                .await
                .unwrap(),
            Resolution::Skip
        );
        assert_eq!(
            resolve(&target, OverwritePolicy::Overwrite, "Heat [1] Plex", "jpg")
                .await
                .unwrap(),
            Resolution::CompareThenWrite(target.clone())
        );
        assert_eq!(
            resolve(&target, OverwritePolicy::Copy, "Heat [1] Plex", "jpg")
                .await
                .unwrap(),
            Resolution::WriteTo(temp_dir.path().join("Heat [1] Plex (1).jpg"))
        );
    }

    #[tokio::test]
    async fn test_copy_picks_smallest_free_counter() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("A.jpg"), b"0").unwrap();
        std::fs::write(temp_dir.path().join("A (1).jpg"), b"1").unwrap();
        std::fs::write(temp_dir.path().join("A (3).jpg"), b"3").unwrap();

        let path = next_copy_path(temp_dir.path(), "A", "jpg").await.unwrap();
        assert_eq!(path, temp_dir.path().join("A (2).jpg"));
    }
}
