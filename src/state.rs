use std::sync::Arc;

use anyhow::Context;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::error;

use crate::adapters::{BackgroundRemover, ClothingClassifier, OpenAiClassifier, RembgClient};
use crate::auth::jwt::JwtKeys;
use crate::config::AppConfig;
use crate::storage::{LocalStorage, StorageClient};
use crate::wardrobe::category::{CategoryLabeler, KeywordLabeler};

/// Everything a handler needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub jwt: JwtKeys,
    pub storage: Arc<dyn StorageClient>,
    pub remover: Arc<dyn BackgroundRemover>,
    pub classifier: Arc<dyn ClothingClassifier>,
    pub labeler: Arc<dyn CategoryLabeler>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = SqlitePoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        let storage = LocalStorage::new(&config.storage.upload_dir, &config.storage.wardrobe_dir);
        storage.ensure_layout().await?;

        if config.models.openai_api_key.is_none() {
            error!("OPENAI_API_KEY is not set; every classification will fail");
        }
        if let Some(path) = &config.firebase_credentials {
            tracing::info!(path = %path.display(), "firebase credentials configured but not used");
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("wardrobe/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        let remover = Arc::new(RembgClient::new(http.clone(), &config.models.rembg_url));
        let classifier = Arc::new(OpenAiClassifier::new(
            http,
            config.models.openai_api_key.clone(),
            &config.models.openai_base_url,
            &config.models.openai_model,
        ));

        Ok(Self::from_parts(
            db,
            config,
            Arc::new(storage),
            remover,
            classifier,
            Arc::new(KeywordLabeler),
        ))
    }

    pub fn from_parts(
        db: SqlitePool,
        config: Arc<AppConfig>,
        storage: Arc<dyn StorageClient>,
        remover: Arc<dyn BackgroundRemover>,
        classifier: Arc<dyn ClothingClassifier>,
        labeler: Arc<dyn CategoryLabeler>,
    ) -> Self {
        let jwt = JwtKeys::from_config(&config.jwt);
        Self {
            db,
            config,
            jwt,
            storage,
            remover,
            classifier,
            labeler,
        }
    }
}
