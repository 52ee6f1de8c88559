//! OpenAI-compatible HTTP client for embeddings and chat completions.
//!
//! Responses are deserialized into exact shapes and validated before
//! anything enters the pipeline: a missing choice, an embedding count
//! mismatch, or a non-2xx status all surface as
//! [`AppError::ExternalService`].

use crate::llm::client::{ChatMessage, CompletionClient, EmbeddingClient, MessageRole};
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub struct OpenAiCompatClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    embedding_model: String,
    llm_model: String,
}

impl OpenAiCompatClient {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        embedding_model: impl Into<String>,
        llm_model: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            embedding_model: embedding_model.into(),
            llm_model: llm_model.into(),
        }
    }

    async fn post_json<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp> {
        let url = format!("{}{}", self.api_base, path);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "{} returned {}: {}",
                url,
                status,
                detail.chars().take(200).collect::<String>()
            )));
        }

        response
            .json::<Resp>()
            .await
            .map_err(|e| AppError::ExternalService(format!("Malformed response from {}: {}", url, e)))
    }
}

// ============= Wire Types =============

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: WireMessage,
}

fn role_str(role: MessageRole) -> &'static str {
    match role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    }
}

// ============= Trait Implementations =============

#[async_trait]
impl EmbeddingClient for OpenAiCompatClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingsRequest {
            model: &self.embedding_model,
            input: texts,
        };

        let mut response: EmbeddingsResponse = self.post_json("/embeddings", &request).await?;

        if response.data.len() != texts.len() {
            return Err(AppError::ExternalService(format!(
                "Embedding count mismatch: sent {} inputs, got {} vectors",
                texts.len(),
                response.data.len()
            )));
        }

        // The API is not required to preserve input order.
        response.data.sort_by_key(|d| d.index);

        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn model_name(&self) -> &str {
        &self.embedding_model
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompatClient {
    async fn generate_with_history(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.llm_model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: role_str(m.role).to_string(),
                    content: m.content.clone(),
                })
                .collect(),
        };

        let response: ChatCompletionResponse =
            self.post_json("/chat/completions", &request).await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::ExternalService("Completion returned no choices".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.llm_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenAiCompatClient {
        OpenAiCompatClient::new(server.uri(), "test-key", "test-embed", "test-llm")
    }

    #[tokio::test]
    async fn test_embed_preserves_input_order() {
        let server = MockServer::start().await;

        // Out-of-order data entries must be reordered by index.
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(body_partial_json(serde_json::json!({"model": "test-embed"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"index": 1, "embedding": [0.0, 1.0]},
                    {"index": 0, "embedding": [1.0, 0.0]}
                ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let vectors = client
            .embed(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();

        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_embed_count_mismatch_is_external_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"index": 0, "embedding": [1.0]}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client
            .embed(&["a".to_string(), "b".to_string()])
            .await;

        assert!(matches!(result, Err(AppError::ExternalService(_))));
    }

    #[tokio::test]
    async fn test_completion_returns_first_choice() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [
                    {"message": {"role": "assistant", "content": "TDD is a practice."}}
                ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let answer = client
            .generate_with_history(&[ChatMessage::user("What is TDD?")])
            .await
            .unwrap();

        assert_eq!(answer, "TDD is a practice.");
    }

    #[tokio::test]
    async fn test_completion_empty_choices_is_external_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client
            .generate_with_history(&[ChatMessage::user("hello")])
            .await;

        assert!(matches!(result, Err(AppError::ExternalService(_))));
    }

    #[tokio::test]
    async fn test_http_error_status_is_external_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client.embed(&["a".to_string()]).await;

        match result {
            Err(AppError::ExternalService(msg)) => assert!(msg.contains("429")),
            other => panic!("Expected ExternalService error, got {:?}", other.map(|_| ())),
        }
    }
}
