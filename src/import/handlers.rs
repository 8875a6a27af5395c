use super::orchestrator::{ImportRequest, Importer};
use super::provider::{MediaProvider, ProviderKind, connect};
use super::{ContentCategory, ImportError, OverwritePolicy, TotalStats};
use crate::AppState;
use axum::{
    Form, Json,
    extract::{Path, State, rejection::FormRejection},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

/// Raw form fields. Everything is optional so that missing or malformed
/// parameters surface as JSON validation errors instead of extractor
/// rejections.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportForm {
    pub action: Option<String>,
    #[serde(rename = "type")]
    pub import_type: Option<String>,
    pub library_id: Option<String>,
    pub content_type: Option<String>,
    pub overwrite_option: Option<String>,
    pub show_key: Option<String>,
    pub import_all_seasons: Option<String>,
    pub batch_processing: Option<String>,
    pub start_index: Option<String>,
    pub total_successful: Option<String>,
    pub total_skipped: Option<String>,
    pub total_unchanged: Option<String>,
    pub total_failed: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    TestConnection,
    GetLibraries,
    GetShowsForSeasons,
    ImportPosters,
}

impl Action {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "test_connection" => Some(Self::TestConnection),
            "get_libraries" => Some(Self::GetLibraries),
            "get_shows_for_seasons" => Some(Self::GetShowsForSeasons),
            "import_posters" => Some(Self::ImportPosters),
            _ => None,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_flag(value: &Option<String>) -> bool {
    non_empty(value).is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn parse_count(value: &Option<String>, field: &str) -> Result<usize, ImportError> {
    match non_empty(value) {
        None => Ok(0),
        Some(v) => v
            .parse()
            .map_err(|_| ImportError::Validation(format!("Invalid {}: {}", field, v))),
    }
}

impl ImportForm {
    fn library_id(&self) -> Result<String, ImportError> {
        non_empty(&self.library_id)
            .map(str::to_string)
            .ok_or_else(|| ImportError::Validation("Library ID is required".to_string()))
    }

    pub fn into_request(self) -> Result<ImportRequest, ImportError> {
        let import_type = non_empty(&self.import_type)
            .ok_or_else(|| ImportError::Validation("Import type is required".to_string()))?;
        let category = ContentCategory::from_import_type(import_type).ok_or_else(|| {
            ImportError::Validation(format!("Invalid import type: {}", import_type))
        })?;

        let target = match non_empty(&self.content_type) {
            Some(value) => ContentCategory::from_content_type(value).ok_or_else(|| {
                ImportError::Validation(format!("Invalid content type: {}", value))
            })?,
            None => category,
        };

        let policy = match non_empty(&self.overwrite_option) {
            Some(value) => OverwritePolicy::parse(value).ok_or_else(|| {
                ImportError::Validation(format!("Invalid overwrite option: {}", value))
            })?,
            None => OverwritePolicy::Skip,
        };

        let show_key = non_empty(&self.show_key).map(str::to_string);
        let import_all_seasons = parse_flag(&self.import_all_seasons);

        // A single show is addressed by its key alone.
        let library_id = if category == ContentCategory::Seasons && show_key.is_some() {
            non_empty(&self.library_id).unwrap_or_default().to_string()
        } else {
            self.library_id()?
        };

        let batch_processing = parse_flag(&self.batch_processing);
        let start_index = if batch_processing {
            parse_count(&self.start_index, "startIndex")?
        } else {
            0
        };

        let prior_totals = TotalStats {
            successful: parse_count(&self.total_successful, "totalSuccessful")?,
            skipped: parse_count(&self.total_skipped, "totalSkipped")?,
            unchanged: parse_count(&self.total_unchanged, "totalUnchanged")?,
            failed: parse_count(&self.total_failed, "totalFailed")?,
        };

        Ok(ImportRequest {
            category,
            library_id,
            target,
            policy,
            show_key,
            import_all_seasons,
            batch_processing,
            start_index,
            prior_totals,
        })
    }
}

impl IntoResponse for ImportError {
    fn into_response(self) -> Response {
        Json(json!({
            "success": false,
            "error": self.to_string(),
        }))
        .into_response()
    }
}

/// `POST /api/import/{provider}`, dispatching on the `action` field.
pub async fn import_handler(
    State(app_state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    form: Result<Form<ImportForm>, FormRejection>,
) -> Response {
    if !crate::auth::is_authorized(&headers, &app_state.config.app, chrono::Utc::now()) {
        return crate::auth::unauthorized_response();
    }

    match dispatch(&app_state, &provider, form).await {
        Ok(response) => response,
        Err(e) => {
            error!("Import request to {} failed: {}", provider, e);
            e.into_response()
        }
    }
}

async fn dispatch(
    app_state: &AppState,
    provider: &str,
    form: Result<Form<ImportForm>, FormRejection>,
) -> Result<Response, ImportError> {
    let Form(form) =
        form.map_err(|e| ImportError::Validation(format!("Invalid request: {}", e)))?;

    let kind = ProviderKind::parse(provider)
        .ok_or_else(|| ImportError::Validation(format!("Unknown provider: {}", provider)))?;

    let action = non_empty(&form.action)
        .ok_or_else(|| ImportError::Validation("Action is required".to_string()))?;
    let action = Action::parse(action)
        .ok_or_else(|| ImportError::Validation(format!("Invalid action: {}", action)))?;

    let config = &app_state.config;
    let client = connect(kind, config.provider(kind), &config.import)?;
    let client: &dyn MediaProvider = client.as_ref();

    match action {
        Action::TestConnection => {
            let server = client.test_connection().await?;
            info!("Connected to {}: {}", client.label(), server);
            Ok(Json(json!({
                "success": true,
                "message": format!("Connected to {}", server),
            }))
            .into_response())
        }
        Action::GetLibraries => {
            let libraries = client.libraries().await?;
            Ok(Json(json!({
                "success": true,
                "libraries": libraries,
            }))
            .into_response())
        }
        Action::GetShowsForSeasons => {
            let library_id = form.library_id()?;
            let importer = Importer::new(client, &config.directories, config.import.batch_size);
            let shows = importer.list(ContentCategory::Shows, &library_id).await?;
            Ok(Json(json!({
                "success": true,
                "shows": shows,
            }))
            .into_response())
        }
        Action::ImportPosters => {
            let request = form.into_request()?;
            let importer = Importer::new(client, &config.directories, config.import.batch_size);
            let response = importer.run(&request).await?;
            Ok(Json(response).into_response())
        }
    }
}
