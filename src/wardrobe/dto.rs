use serde::{Deserialize, Serialize};

/// Outcome of one successfully processed image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResult {
    pub original_filename: String,
    pub stored_filename: String,
    pub processed_image_path: String,
    pub clothing_type: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub count: usize,
    pub results: Vec<UploadResult>,
}

#[derive(Debug, Serialize)]
pub struct WardrobeEntry {
    pub id: i64,
    pub filename: String,
    pub category: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}
