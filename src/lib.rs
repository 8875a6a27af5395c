use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod auth;
pub mod gallery;
pub mod import;
pub mod startup_checks;

use import::{ContentCategory, ProviderKind};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    #[serde(default)]
    pub gallery: GalleryConfig,
    pub directories: DirectoryConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub jellyfin: Option<ProviderConfig>,
    #[serde(default)]
    pub plex: Option<ProviderConfig>,
}

impl Config {
    pub fn provider(&self, kind: ProviderKind) -> Option<&ProviderConfig> {
        match kind {
            ProviderKind::Jellyfin => self.jellyfin.as_ref(),
            ProviderKind::Plex => self.plex.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
    pub session_secret: String,
    pub admin_password: String,
    #[serde(default = "default_session_lifetime")]
    pub session_lifetime_minutes: u64,
}

fn default_session_lifetime() -> u64 {
    1440
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GalleryConfig {
    pub images_per_page: usize,
    pub max_upload_bytes: usize,
    pub allowed_extensions: Vec<String>,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            images_per_page: 24,
            max_upload_bytes: 10 * 1024 * 1024,
            allowed_extensions: ["jpg", "jpeg", "png", "webp", "gif"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

/// One output directory per content category.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DirectoryConfig {
    pub movies: PathBuf,
    pub tv_shows: PathBuf,
    pub tv_seasons: PathBuf,
    pub collections: PathBuf,
}

impl DirectoryConfig {
    pub fn dir_for(&self, category: ContentCategory) -> &Path {
        match category {
            ContentCategory::Movies => &self.movies,
            ContentCategory::Shows => &self.tv_shows,
            ContentCategory::Seasons => &self.tv_seasons,
            ContentCategory::Collections => &self.collections,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ImportConfig {
    pub batch_size: usize,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Drop Jellyfin collections whose members belong to the other media type.
    pub filter_collections_by_library: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: 25,
            connect_timeout_secs: 10,
            request_timeout_secs: 60,
            filter_collections_by_library: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    pub url: String,
    pub token: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            app: AppConfig {
                name: "Posterwall".to_string(),
                log_level: "info".to_string(),
                session_secret: "change-me-in-production".to_string(),
                admin_password: String::new(),
                session_lifetime_minutes: default_session_lifetime(),
            },
            gallery: GalleryConfig::default(),
            directories: DirectoryConfig {
                movies: PathBuf::from("posters/movies"),
                tv_shows: PathBuf::from("posters/tv-shows"),
                tv_seasons: PathBuf::from("posters/tv-seasons"),
                collections: PathBuf::from("posters/collections"),
            },
            import: ImportConfig::default(),
            jellyfin: None,
            plex: None,
        }
    }
}

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub gallery: gallery::SharedGallery,
    pub config: Config,
}

/// Headroom over the upload limit for multipart framing.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub async fn create_app(config: Config) -> Router {
    let gallery = Arc::new(gallery::PosterGallery::new(
        config.gallery.clone(),
        config.directories.clone(),
    ));

    let body_limit = config.gallery.max_upload_bytes + MULTIPART_OVERHEAD;

    let app_state = AppState {
        gallery,
        config: config.clone(),
    };

    Router::new()
        .route("/api/login", post(auth::login_handler))
        .route("/api/logout", post(auth::logout_handler))
        .route("/api/session", get(auth::session_handler))
        .route("/api/import/{provider}", post(import::import_handler))
        .route("/api/gallery/{category}", get(gallery::list_handler))
        .route("/api/gallery/{category}/upload", post(gallery::upload_handler))
        .route("/api/gallery/{category}/rename", post(gallery::rename_handler))
        .route("/api/gallery/{category}/move", post(gallery::move_handler))
        .route("/api/gallery/{category}/delete", post(gallery::delete_handler))
        .route("/posters/{category}/{file}", get(gallery::poster_handler))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|request: &axum::http::Request<_>| {
                            let method = request.method();
                            let uri = request.uri();
                            let matched_path = request
                                .extensions()
                                .get::<axum::extract::MatchedPath>()
                                .map(|matched_path| matched_path.as_str());

                            tracing::info_span!(
                                "http_request",
                                method = %method,
                                uri = %uri,
                                matched_path,
                            )
                        })
                        .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                            tracing::info!(
                                target: "access_log",
                                method = %request.method(),
                                path = %request.uri().path(),
                                query = ?request.uri().query(),
                                "request"
                            );
                        })
                        .on_response(
                            |response: &axum::http::Response<_>,
                             latency: std::time::Duration,
                             _span: &tracing::Span| {
                                tracing::info!(
                                    target: "access_log",
                                    status = %response.status(),
                                    latency_ms = %latency.as_millis(),
                                    "response"
                                );
                            },
                        ),
                )
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(app_state)
}
