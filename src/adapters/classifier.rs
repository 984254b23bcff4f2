use anyhow::Context;
use axum::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::wardrobe::category::Category;

const SYSTEM_PROMPT: &str = "你是專業的服裝分類助手，根據圖片內容判斷衣物種類。";

/// Assigns a free-text clothing label to an image.
#[async_trait]
pub trait ClothingClassifier: Send + Sync {
    async fn classify(&self, image: Bytes, content_type: &str) -> anyhow::Result<String>;
}

/// Multimodal chat-completions client (OpenAI API shape).
#[derive(Clone)]
pub struct OpenAiClassifier {
    http: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiClassifier {
    pub fn new(http: reqwest::Client, api_key: Option<String>, base_url: &str, model: &str) -> Self {
        Self {
            http,
            api_key,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
        }
    }

    fn user_prompt() -> String {
        let labels: Vec<&str> = Category::ALL.iter().map(|c| c.label()).collect();
        format!("請看這張圖片並分類衣物為以下其中一類：{}。", labels.join("、"))
    }

    fn build_request(&self, image: &[u8], content_type: &str) -> ChatRequest<'_> {
        let data_url = format!("data:{};base64,{}", content_type, STANDARD.encode(image));
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: Value::String(SYSTEM_PROMPT.into()),
                },
                ChatMessage {
                    role: "user",
                    content: Value::String(Self::user_prompt()),
                },
                ChatMessage {
                    role: "user",
                    content: json!([{ "type": "image_url", "image_url": { "url": data_url } }]),
                },
            ],
        }
    }
}

#[async_trait]
impl ClothingClassifier for OpenAiClassifier {
    async fn classify(&self, image: Bytes, content_type: &str) -> anyhow::Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .context("OPENAI_API_KEY is not configured")?;

        let res = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&self.build_request(&image, content_type))
            .send()
            .await
            .context("chat completions request")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            anyhow::bail!("chat completions returned {}: {}", status, body);
        }

        let parsed: ChatResponse = res.json().await.context("decode chat completions")?;
        let label = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .context("chat completions returned no content")?;

        debug!(label = %label, "image classified");
        Ok(label)
    }
}
