use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::images::ImageAttachment;
use crate::suite::ModelId;

const DEFAULT_TIMEOUT_SECS: u64 = 300;
const MAX_ERROR_BODY_BYTES: usize = 500;

// Backend errors go into result rows; they must not panic mid-run, so the
// cut has to land on a char boundary.
fn truncate_error_body(body: &str) -> &str {
    let mut end = body.len().min(MAX_ERROR_BODY_BYTES);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

/// Text generated for one prompt/image pair.
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
}

/// A model already loaded by the backend, reusable across test cases.
#[async_trait]
pub trait LoadedModel: Send + Sync {
    async fn generate(&self, prompt: &str, image: &ImageAttachment) -> Result<Generation>;
}

/// Seam to the inference engine. Loading is amortized per model; the
/// returned handle serves every (test, image) pair for that model.
#[async_trait]
pub trait VisionBackend: Send + Sync {
    async fn load_model(&self, id: &ModelId) -> Result<Box<dyn LoadedModel>>;
}

/// OpenAI-compatible chat-completions backend (vLLM, Ollama, mistral.rs all
/// speak this dialect). Images travel as base64 data URLs in the message.
pub struct OpenAiCompatBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiCompatBackend {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client for inference backend")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl VisionBackend for OpenAiCompatBackend {
    async fn load_model(&self, id: &ModelId) -> Result<Box<dyn LoadedModel>> {
        info!("Loading model {}", id);

        let url = format!("{}/v1/models", self.base_url);
        let mut req = self.client.get(&url);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("Failed to reach inference backend at {}", url))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "Backend model listing returned HTTP {}: {}",
                status.as_u16(),
                truncate_error_body(&body)
            );
        }

        let listing: ModelListing = resp
            .json()
            .await
            .context("Failed to parse backend model listing")?;

        if !listing.data.iter().any(|m| m.id == id.0) {
            anyhow::bail!("Model {} not available on backend", id);
        }

        Ok(Box::new(OpenAiCompatModel {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            model: id.clone(),
        }))
    }
}

struct OpenAiCompatModel {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: ModelId,
}

#[async_trait]
impl LoadedModel for OpenAiCompatModel {
    async fn generate(&self, prompt: &str, image: &ImageAttachment) -> Result<Generation> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        debug!("Requesting completion from {} for {}", url, self.model);

        let request = ChatRequest {
            model: self.model.0.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: prompt.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image.data_url.clone(),
                        },
                    },
                ],
            }],
        };

        let mut req = self.client.post(&url).json(&request);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .await
            .context("Failed to send completion request")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "Completion request returned HTTP {}: {}",
                status.as_u16(),
                truncate_error_body(&body)
            );
        }

        let response: ChatResponse = resp
            .json()
            .await
            .context("Failed to parse completion response")?;

        let text = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .context("Completion response contained no choices")?;

        Ok(Generation { text })
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct ModelListing {
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_error_body_short_passthrough() {
        assert_eq!(truncate_error_body("bad request"), "bad request");
    }

    #[test]
    fn test_truncate_error_body_multibyte_boundary() {
        // 'é' is two bytes and straddles the cutoff at byte 500
        let body = format!("{}é{}", "a".repeat(499), "b".repeat(50));
        let truncated = truncate_error_body(&body);
        assert_eq!(truncated.len(), 499);
        assert!(truncated.chars().all(|c| c == 'a'));
    }

    #[test]
    fn test_truncate_error_body_exact_limit() {
        let body = "x".repeat(500);
        assert_eq!(truncate_error_body(&body).len(), 500);
    }

    #[test]
    fn test_backend_creation() {
        let backend = OpenAiCompatBackend::new("http://localhost:8000/", None);
        assert!(backend.is_ok());
        assert_eq!(backend.unwrap().base_url, "http://localhost:8000");
    }

    #[test]
    fn test_chat_request_serializes_image_part() {
        let request = ChatRequest {
            model: "qwen2-vl".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: "Describe".to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: "data:image/png;base64,AAAA".to_string(),
                        },
                    },
                ],
            }],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["content"][0]["type"], "text");
        assert_eq!(json["messages"][0]["content"][1]["type"], "image_url");
        assert_eq!(
            json["messages"][0]["content"][1]["image_url"]["url"],
            "data:image/png;base64,AAAA"
        );
    }

    #[test]
    fn test_chat_response_deserialize() {
        let json = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "Net profit: 100"}}
            ]
        }"#;
        let resp: ChatResponse = serde_json::from_str(json).expect("should parse");
        assert_eq!(resp.choices[0].message.content, "Net profit: 100");
    }

    #[test]
    fn test_chat_response_empty_choices() {
        let json = r#"{"choices": []}"#;
        let resp: ChatResponse = serde_json::from_str(json).expect("should parse");
        assert!(resp.choices.is_empty());
    }

    #[test]
    fn test_model_listing_deserialize() {
        let json = r#"{"object": "list", "data": [{"id": "m1", "object": "model"}, {"id": "m2"}]}"#;
        let listing: ModelListing = serde_json::from_str(json).expect("should parse");
        assert_eq!(listing.data.len(), 2);
        assert_eq!(listing.data[0].id, "m1");
    }
}
