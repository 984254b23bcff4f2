use std::{fmt, path::Path};

use bytes::Bytes;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    state::AppState,
    wardrobe::{dto::UploadResult, repo},
};

/// One uploaded image as received from the client.
pub struct UploadItem {
    pub original_filename: String,
    pub content_type: String,
    pub body: Bytes,
}

/// How a request reacts to a failing image.
///
/// A single upload is all-or-nothing. A batch skips images that fail before
/// placement and keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPolicy {
    Atomic,
    BestEffort,
}

impl UploadPolicy {
    pub fn for_batch(len: usize) -> Self {
        if len <= 1 {
            UploadPolicy::Atomic
        } else {
            UploadPolicy::BestEffort
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Save,
    BackgroundRemoval,
    Classification,
    Placement,
    Record,
}

impl Stage {
    /// Stages a best-effort batch may skip past.
    pub fn skippable(self) -> bool {
        matches!(
            self,
            Stage::Save | Stage::BackgroundRemoval | Stage::Classification
        )
    }

    pub fn user_message(self) -> &'static str {
        match self {
            Stage::Save => "Invalid file or file could not be saved",
            Stage::BackgroundRemoval => "Image processing failed",
            Stage::Classification => "Clothing classification failed",
            Stage::Placement => "Could not store processed image",
            Stage::Record => "Could not record wardrobe item",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Save => "save",
            Stage::BackgroundRemoval => "background_removal",
            Stage::Classification => "classification",
            Stage::Placement => "placement",
            Stage::Record => "record",
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{stage} failed for {filename}: {cause:#}")]
pub struct PipelineError {
    pub stage: Stage,
    pub filename: String,
    pub cause: anyhow::Error,
}

fn failed(stage: Stage, filename: &str) -> impl FnOnce(anyhow::Error) -> PipelineError + '_ {
    move |cause| PipelineError {
        stage,
        filename: filename.to_string(),
        cause,
    }
}

/// Runs every item through save → background removal → classification →
/// placement → record, one at a time, under the policy chosen by batch size.
#[instrument(skip(st, items), fields(count = items.len()))]
pub async fn process_uploads(
    st: &AppState,
    user_id: i64,
    items: Vec<UploadItem>,
) -> Result<Vec<UploadResult>, PipelineError> {
    let policy = UploadPolicy::for_batch(items.len());
    let mut results = Vec::with_capacity(items.len());

    for item in &items {
        match process_one(st, user_id, item).await {
            Ok(r) => results.push(r),
            Err(e) if policy == UploadPolicy::BestEffort && e.stage.skippable() => {
                warn!(
                    stage = %e.stage,
                    filename = %item.original_filename,
                    error = %e.cause,
                    "image skipped"
                );
            }
            Err(e) => return Err(e),
        }
    }

    info!(user_id, processed = results.len(), ?policy, "upload finished");
    Ok(results)
}

async fn process_one(
    st: &AppState,
    user_id: i64,
    item: &UploadItem,
) -> Result<UploadResult, PipelineError> {
    let stem = Uuid::new_v4();
    let stored_filename = format!("{}{}", stem, extension_of(&item.original_filename));
    let processed_filename = format!("{}_processed.png", stem);

    st.storage
        .put_object(&stored_filename, item.body.clone())
        .await
        .map_err(failed(Stage::Save, &stored_filename))?;

    let png = st
        .remover
        .remove_background(item.body.clone(), &stored_filename)
        .await
        .map_err(failed(Stage::BackgroundRemoval, &stored_filename))?;
    st.storage
        .put_object(&processed_filename, png)
        .await
        .map_err(failed(Stage::BackgroundRemoval, &processed_filename))?;

    let label = match st.classifier.classify(item.body.clone(), &item.content_type).await {
        Ok(label) => label,
        Err(e) => {
            discard(st, &processed_filename).await;
            return Err(failed(Stage::Classification, &stored_filename)(e));
        }
    };

    let category = st.labeler.label_to_category(&label);

    let final_path = st
        .storage
        .promote(&processed_filename, category)
        .await
        .map_err(failed(Stage::Placement, &processed_filename))?;

    if let Err(e) = repo::insert_item(&st.db, &processed_filename, category, user_id).await {
        if let Err(cleanup) = tokio::fs::remove_file(&final_path).await {
            warn!(error = %cleanup, path = %final_path.display(), "remove unrecorded image failed");
        }
        return Err(failed(Stage::Record, &processed_filename)(e));
    }

    info!(
        user_id,
        original = %item.original_filename,
        stored = %stored_filename,
        label = %label,
        category = %category,
        "image stored"
    );

    Ok(UploadResult {
        original_filename: item.original_filename.clone(),
        stored_filename,
        processed_image_path: final_path.to_string_lossy().into_owned(),
        clothing_type: category.label().to_string(),
    })
}

async fn discard(st: &AppState, key: &str) {
    if let Err(e) = st.storage.delete_object(key).await {
        warn!(error = %e, key, "discard processed image failed");
    }
}

/// `.ext` of the client's file name, or empty when absent or not alphanumeric.
fn extension_of(filename: &str) -> String {
    match Path::new(filename).extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            format!(".{}", ext)
        }
        _ => String::new(),
    }
}
