use super::{
    GalleryError, GalleryPage, PosterEntry, PosterGallery, extension_of, validate_file_name,
};
use crate::import::ContentCategory;
use crate::import::batch::write_poster;
use crate::import::conflict::next_copy_path;
use crate::import::filename::sanitize_title;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

fn poster_url(category: ContentCategory, name: &str) -> String {
    format!("/posters/{}/{}", category.slug(), urlencoding::encode(name))
}

fn entry_from_metadata(
    category: ContentCategory,
    name: String,
    metadata: &std::fs::Metadata,
) -> PosterEntry {
    PosterEntry {
        url: poster_url(category, &name),
        name,
        size: metadata.len(),
        modified: metadata.modified().ok().map(DateTime::<Utc>::from),
    }
}

impl PosterGallery {
    pub async fn list(
        &self,
        category: ContentCategory,
        page: usize,
        search: Option<&str>,
    ) -> Result<GalleryPage, GalleryError> {
        let dir = self.dir(category);
        if !dir.is_dir() {
            warn!("Poster directory for {} is missing: {:?}", category, dir);
            return Err(GalleryError::NotFound);
        }

        let needle = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut entries = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .flatten()
        {
            if entry.file_type().is_file()
                && let Some(name) = entry.file_name().to_str()
                && !name.starts_with('.')
                && self.is_allowed_extension(name)
                && needle
                    .as_deref()
                    .is_none_or(|needle| name.to_lowercase().contains(needle))
                && let Ok(metadata) = entry.metadata()
            {
                entries.push(entry_from_metadata(category, name.to_string(), &metadata));
            }
        }

        entries.sort_by_cached_key(|entry| entry.name.to_lowercase());

        let per_page = self.config.images_per_page.max(1);
        let total_items = entries.len();
        let total_pages = total_items.div_ceil(per_page);
        let page = page.max(1);
        let items: Vec<PosterEntry> = entries
            .into_iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .collect();

        debug!(
            "Listed {} of {} posters in {} (page {}/{})",
            items.len(),
            total_items,
            category,
            page,
            total_pages
        );

        Ok(GalleryPage {
            success: true,
            items,
            page,
            total_pages,
            total_items,
        })
    }

    /// Path of an existing poster.
    pub async fn existing_file(
        &self,
        category: ContentCategory,
        file_name: &str,
    ) -> Result<PathBuf, GalleryError> {
        let path = self.file_path(category, file_name)?;
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => Ok(path),
            _ => Err(GalleryError::NotFound),
        }
    }

    async fn entry(&self, category: ContentCategory, path: &Path) -> Result<PosterEntry, GalleryError> {
        let metadata = tokio::fs::metadata(path).await?;
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or(GalleryError::InvalidPath)?
            .to_string();
        Ok(entry_from_metadata(category, name, &metadata))
    }

    /// Stores an uploaded image under its sanitized name, adding a
    /// `" (n)"` suffix instead of replacing an existing file.
    pub async fn store_upload(
        &self,
        category: ContentCategory,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<PosterEntry, GalleryError> {
        validate_file_name(original_name)?;

        let extension = extension_of(original_name)
            .ok_or_else(|| GalleryError::UnsupportedType(original_name.to_string()))?;
        if !self.is_allowed_extension(original_name) {
            return Err(GalleryError::UnsupportedType(extension));
        }

        if bytes.len() > self.config.max_upload_bytes {
            return Err(GalleryError::TooLarge(self.config.max_upload_bytes));
        }

        if image::guess_format(bytes).is_err() {
            return Err(GalleryError::UnsupportedType(
                "file content is not an image".to_string(),
            ));
        }

        let stem = Path::new(original_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(sanitize_title)
            .unwrap_or_default();
        if stem.is_empty() {
            return Err(GalleryError::InvalidName(original_name.to_string()));
        }

        let dir = self.dir(category);
        let mut target = dir.join(format!("{}.{}", stem, extension));
        if tokio::fs::try_exists(&target).await? {
            target = next_copy_path(dir, &stem, &extension).await?;
        }

        write_poster(&target, bytes).await?;
        info!("Stored uploaded poster {:?}", target);

        self.entry(category, &target).await
    }

    /// Renames a poster within its directory, keeping its extension.
    pub async fn rename(
        &self,
        category: ContentCategory,
        file_name: &str,
        new_name: &str,
    ) -> Result<PosterEntry, GalleryError> {
        let source = self.existing_file(category, file_name).await?;
        validate_file_name(new_name)?;

        let extension = extension_of(file_name).unwrap_or_default();
        let new_stem = match extension_of(new_name) {
            Some(ext) if ext == extension => Path::new(new_name)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or_default(),
            _ => new_name,
        };
        let new_stem = sanitize_title(new_stem);
        if new_stem.is_empty() {
            return Err(GalleryError::InvalidName(new_name.to_string()));
        }

        let new_file = if extension.is_empty() {
            new_stem
        } else {
            format!("{}.{}", new_stem, extension)
        };
        let target = self.dir(category).join(&new_file);
        if tokio::fs::try_exists(&target).await? {
            return Err(GalleryError::AlreadyExists(new_file));
        }

        tokio::fs::rename(&source, &target).await?;
        info!("Renamed poster {:?} to {:?}", source, target);

        self.entry(category, &target).await
    }

    /// Moves a poster into another category's directory under the same name.
    pub async fn move_to(
        &self,
        category: ContentCategory,
        file_name: &str,
        target_category: ContentCategory,
    ) -> Result<PosterEntry, GalleryError> {
        let source = self.existing_file(category, file_name).await?;
        let target = self.file_path(target_category, file_name)?;
        if tokio::fs::try_exists(&target).await? {
            return Err(GalleryError::AlreadyExists(file_name.to_string()));
        }

        if let Err(e) = tokio::fs::rename(&source, &target).await {
            // Directories may live on different filesystems.
            debug!("Rename failed ({}), falling back to copy", e);
            tokio::fs::copy(&source, &target).await?;
            tokio::fs::remove_file(&source).await?;
        }
        info!("Moved poster {:?} to {:?}", source, target);

        self.entry(target_category, &target).await
    }

    pub async fn delete(&self, category: ContentCategory, file_name: &str) -> Result<(), GalleryError> {
        let path = self.existing_file(category, file_name).await?;
        tokio::fs::remove_file(&path).await?;
        info!("Deleted poster {:?}", path);
        Ok(())
    }
}
