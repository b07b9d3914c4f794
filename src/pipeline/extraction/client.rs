//! Vision provider client.
//!
//! `VisionClient` is the seam between the pipeline and the external model:
//! production uses an OpenAI-compatible chat-completions endpoint, tests
//! substitute a mock. The instruction set is fixed; the provider is asked
//! for exactly one JSON object in the schema `parser` enforces.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ExtractionError;
use crate::config::VisionConfig;

const SYSTEM_PROMPT: &str =
    "You are a receipt data extraction expert. Return only valid JSON with exact field names.";

const EXTRACTION_PROMPT: &str = "\
Analyze the provided receipt image and extract structured information.

Extract these fields precisely:
- Date: format as DD/MM/YYYY (convert from any format found)
- Currency: 3-letter ISO code (INR, USD, EUR, etc.)
- Vendor/store name: the business name exactly as shown
- Individual items: each purchased item with name and cost
- Tax amount: total tax/GST amount only (exclude service charges)
- Total amount: final amount paid

Output rules:
1. Return ONLY valid JSON - no markdown, no explanations, no code blocks
2. Use the exact field names from the schema below
3. All monetary values are numbers (remove currency symbols)
4. The JSON must be parseable by a strict parser

Required JSON schema:
{
  \"date\": \"DD/MM/YYYY\",
  \"currency\": \"INR\",
  \"vendor_name\": \"Store Name\",
  \"receipt_items\": [
    { \"item_name\": \"Product Name\", \"item_cost\": 99.99 }
  ],
  \"tax\": 18.00,
  \"total\": 117.99
}";

/// Abstraction over the external vision model. One call per ingestion,
/// returning the raw model text for the given image URL.
#[async_trait]
pub trait VisionClient: Send + Sync {
    async fn extract_receipt(&self, image_url: &str) -> Result<String, ExtractionError>;
}

/// OpenAI-compatible chat-completions client.
pub struct OpenAiVisionClient {
    base_url: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OpenAiVisionClient {
    pub fn new(config: &VisionConfig) -> Result<Self, ExtractionError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExtractionError::Http(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
            client,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f64,
    response_format: ResponseFormat<'a>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: Content<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Content<'a> {
    Text(&'a str),
    Parts(Vec<Part<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum Part<'a> {
    #[serde(rename = "text")]
    Text { text: &'a str },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
    detail: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

fn build_request<'a>(model: &'a str, image_url: &'a str) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![
            Message {
                role: "system",
                content: Content::Text(SYSTEM_PROMPT),
            },
            Message {
                role: "user",
                content: Content::Parts(vec![
                    Part::Text {
                        text: EXTRACTION_PROMPT,
                    },
                    Part::ImageUrl {
                        image_url: ImageUrl {
                            url: image_url,
                            detail: "high",
                        },
                    },
                ]),
            },
        ],
        max_tokens: 2000,
        temperature: 0.1,
        response_format: ResponseFormat { kind: "json_object" },
    }
}

#[async_trait]
impl VisionClient for OpenAiVisionClient {
    async fn extract_receipt(&self, image_url: &str) -> Result<String, ExtractionError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = build_request(&self.model, image_url);

        tracing::info!(model = %self.model, "Requesting receipt extraction");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ExtractionError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    ExtractionError::Http(format!(
                        "request timed out after {}s",
                        self.timeout_secs
                    ))
                } else {
                    ExtractionError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::ResponseParsing(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ExtractionError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_matches_provider_schema() {
        let request = build_request("gpt-4o", "http://example.com/media/user_x/y.png");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["max_tokens"], 2000);
        assert_eq!(json["temperature"], 0.1);
        assert_eq!(json["response_format"]["type"], "json_object");

        assert_eq!(json["messages"][0]["role"], "system");
        assert!(json["messages"][0]["content"].is_string());

        let parts = json["messages"][1]["content"].as_array().unwrap();
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(
            parts[1]["image_url"]["url"],
            "http://example.com/media/user_x/y.png"
        );
        assert_eq!(parts[1]["image_url"]["detail"], "high");
    }

    #[test]
    fn prompt_names_every_schema_field() {
        for field in ["date", "currency", "vendor_name", "receipt_items", "item_name", "item_cost", "tax", "total"] {
            assert!(
                EXTRACTION_PROMPT.contains(field),
                "prompt must pin down {field}",
            );
        }
    }

    #[tokio::test]
    async fn connection_refused_maps_to_connection_error() {
        // Port 9 (discard) is practically never listening.
        let client = OpenAiVisionClient::new(&VisionConfig {
            base_url: "http://127.0.0.1:9/v1".to_string(),
            api_key: "test".to_string(),
            model: "gpt-4o".to_string(),
            timeout_secs: 2,
        })
        .unwrap();

        let err = client
            .extract_receipt("http://localhost/media/x.png")
            .await
            .unwrap_err();
        assert!(
            matches!(err, ExtractionError::Connection(_) | ExtractionError::Http(_)),
            "got {err:?}",
        );
    }
}
