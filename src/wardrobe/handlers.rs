use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    images::services::{process_uploads, UploadItem},
    state::AppState,
};

use super::{
    category::Category,
    dto::{Pagination, UploadResponse, WardrobeEntry},
    repo,
};

pub const STATIC_MOUNT: &str = "/wardrobe";

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/wardrobe", get(list_items))
}

pub fn write_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// POST /upload (multipart, field `files`, repeatable)
#[instrument(skip_all)]
pub async fn upload(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut mp = mp.map_err(|e| {
        warn!(error = %e, "not a multipart body");
        AppError::validation(e.body_text())
    })?;

    let mut files = Vec::new();
    while let Some(field) = mp.next_field().await.map_err(|e| {
        warn!(error = %e, "multipart read failed");
        AppError::validation(e.body_text())
    })? {
        let name = field.name().unwrap_or_default();
        if name != "files" && name != "files[]" {
            continue;
        }
        let original_filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .filter(|ct| ct.starts_with("image/"))
            .unwrap_or("image/png")
            .to_string();
        let body = field.bytes().await.map_err(|e| {
            warn!(error = %e, filename = %original_filename, "multipart field read failed");
            AppError::validation(e.body_text())
        })?;
        files.push(UploadItem {
            original_filename,
            content_type,
            body,
        });
    }

    if files.is_empty() {
        warn!(user_id = user.id, "upload without files");
        return Err(AppError::validation("Please upload at least one image"));
    }

    info!(user_id = user.id, files = files.len(), "upload received");
    let results = process_uploads(&state, user.id, files).await.map_err(|e| {
        error!(
            user_id = user.id,
            stage = %e.stage,
            filename = %e.filename,
            error = %e.cause,
            "upload failed"
        );
        AppError::Processing(e.stage.user_message().into())
    })?;

    Ok(Json(UploadResponse {
        message: format!("Processed {} image(s)", results.len()),
        count: results.len(),
        results,
    }))
}

/// GET /wardrobe?limit&offset
#[instrument(skip_all)]
pub async fn list_items(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<WardrobeEntry>>, AppError> {
    let limit = p.limit.clamp(1, 100);
    let offset = p.offset.max(0);
    let items = repo::list_by_user(&state.db, user.id, limit, offset).await?;
    Ok(Json(
        items
            .into_iter()
            .map(|i| WardrobeEntry {
                url: format!(
                    "{}/{}/{}",
                    STATIC_MOUNT,
                    Category::from_label(&i.category)
                        .unwrap_or(Category::Special)
                        .folder(),
                    i.filename
                ),
                id: i.id,
                filename: i.filename,
                category: i.category,
            })
            .collect(),
    ))
}
