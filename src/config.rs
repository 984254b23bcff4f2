use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Temporary landing area for raw uploads, served at `/uploaded_images`.
    pub upload_dir: PathBuf,
    /// Root of the per-category folders, served at `/wardrobe`.
    pub wardrobe_dir: PathBuf,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub rembg_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database_url: String,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub models: ModelsConfig,
    /// Service-account file for Firebase ID token verification. Read but not wired yet.
    pub firebase_credentials: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let server = ServerConfig {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("APP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(8080),
        };
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://wardrobe.db?mode=rwc".into());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "wardrobe".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "wardrobe-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };
        let storage = StorageConfig {
            upload_dir: std::env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "uploaded_images".into())
                .into(),
            wardrobe_dir: std::env::var("WARDROBE_DIR")
                .unwrap_or_else(|_| "wardrobe".into())
                .into(),
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(20 * 1024 * 1024),
        };
        let models = ModelsConfig {
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
            openai_model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".into()),
            rembg_url: std::env::var("REMBG_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:7000".into()),
        };
        let firebase_credentials = std::env::var("FIREBASE_CREDENTIALS").ok().map(PathBuf::from);

        Ok(Self {
            server,
            database_url,
            jwt,
            storage,
            models,
            firebase_credentials,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_address_comes_from_env() {
        std::env::set_var("JWT_SECRET", "from-env-secret");
        std::env::set_var("APP_HOST", "127.0.0.1");
        std::env::set_var("APP_PORT", "9123");
        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9123);

        std::env::set_var("APP_PORT", "not-a-port");
        assert_eq!(AppConfig::from_env().unwrap().server.port, 8080);
    }
}
