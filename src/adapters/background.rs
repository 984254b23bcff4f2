use anyhow::Context;
use axum::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use tracing::debug;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Strips the background of an image, producing a transparent PNG.
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    async fn remove_background(&self, image: Bytes, filename: &str) -> anyhow::Result<Bytes>;
}

/// Client for a rembg HTTP server (`rembg s`), `POST /api/remove`.
#[derive(Clone)]
pub struct RembgClient {
    http: reqwest::Client,
    endpoint: String,
}

impl RembgClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            endpoint: format!("{}/api/remove", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl BackgroundRemover for RembgClient {
    async fn remove_background(&self, image: Bytes, filename: &str) -> anyhow::Result<Bytes> {
        let part = Part::bytes(image.to_vec()).file_name(filename.to_string());
        let form = Form::new().part("file", part);

        let res = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .context("rembg request")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            anyhow::bail!("rembg returned {}: {}", status, body);
        }

        let png = res.bytes().await.context("rembg body")?;
        anyhow::ensure!(is_png(&png), "rembg response is not a PNG image");
        debug!(filename, bytes = png.len(), "background removed");
        Ok(png)
    }
}

pub fn is_png(bytes: &[u8]) -> bool {
    bytes.starts_with(PNG_SIGNATURE)
}
