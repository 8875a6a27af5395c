// Gallery module - browsing and managing the poster directories
mod core;
mod error;
mod handlers;
mod types;

pub use error::GalleryError;
pub use handlers::{
    delete_handler, list_handler, move_handler, poster_handler, rename_handler, upload_handler,
};
pub use types::*;

use crate::import::ContentCategory;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub type SharedGallery = Arc<PosterGallery>;

pub struct PosterGallery {
    pub(crate) config: crate::GalleryConfig,
    pub(crate) directories: crate::DirectoryConfig,
}

impl PosterGallery {
    pub fn new(config: crate::GalleryConfig, directories: crate::DirectoryConfig) -> Self {
        Self {
            config,
            directories,
        }
    }

    pub(crate) fn category(slug: &str) -> Result<ContentCategory, GalleryError> {
        ContentCategory::from_content_type(slug).ok_or(GalleryError::NotFound)
    }

    pub(crate) fn is_allowed_extension(&self, file_name: &str) -> bool {
        extension_of(file_name).is_some_and(|ext| {
            self.config
                .allowed_extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(&ext))
        })
    }

    /// Joins a single file name onto the category directory.
    pub(crate) fn file_path(
        &self,
        category: ContentCategory,
        file_name: &str,
    ) -> Result<PathBuf, GalleryError> {
        validate_file_name(file_name)?;
        Ok(self.directories.dir_for(category).join(file_name))
    }

    pub(crate) fn dir(&self, category: ContentCategory) -> &Path {
        self.directories.dir_for(category)
    }
}

pub(crate) fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// File names must be one plain path component.
pub(crate) fn validate_file_name(file_name: &str) -> Result<(), GalleryError> {
    if file_name.is_empty()
        || file_name == "."
        || file_name.contains("..")
        || file_name.contains('/')
        || file_name.contains('\\')
        || file_name.contains('\0')
    {
        return Err(GalleryError::InvalidPath);
    }
    Ok(())
}
