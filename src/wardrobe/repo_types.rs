use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One stored clothing image owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WardrobeItem {
    pub id: i64,
    pub filename: String,
    pub category: String,
    // Not filled by the upload pipeline yet.
    pub color: Option<String>,
    pub material: Option<String>,
    pub style: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub user_id: i64,
}
