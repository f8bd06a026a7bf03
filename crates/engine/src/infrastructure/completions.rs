//! Chat-completions client for OpenAI-compatible APIs (DeepSeek by default)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::infrastructure::config::{LlmConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::infrastructure::ports::{FinishReason, LlmError, LlmPort, LlmRequest, LlmResponse};

/// Client for `POST {base_url}/chat/completions`
#[derive(Clone)]
pub struct CompletionsClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
    temperature: Option<f32>,
}

impl CompletionsClient {
    pub fn new(base_url: &str, model: &str, api_key: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key: api_key.trim().to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout,
            temperature: None,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        let mut client = Self::new(
            &config.base_url,
            &config.model,
            &config.api_key,
            config.timeout,
        );
        client.temperature = config.temperature;
        client
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl Default for CompletionsClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_MODEL, "", Duration::from_secs(60))
    }
}

#[async_trait]
impl LlmPort for CompletionsClient {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        if !self.is_configured() {
            return Err(LlmError::NotConfigured);
        }

        let api_request = OpenAIChatRequest {
            model: self.model.clone(),
            messages: build_messages(&request),
            stream: false,
            temperature: request.temperature.or(self.temperature),
            max_tokens: request.max_tokens,
        };

        tracing::debug!(
            model = %self.model,
            messages = api_request.messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .map_err(|e| self.map_transport_error(e))?;
            return Err(LlmError::RequestFailed(format!("{status}: {error_text}")));
        }

        let api_response: OpenAIChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        convert_response(api_response)
    }
}

impl CompletionsClient {
    fn map_transport_error(&self, error: reqwest::Error) -> LlmError {
        if error.is_timeout() {
            LlmError::Timeout(self.timeout.as_secs())
        } else {
            LlmError::RequestFailed(error.to_string())
        }
    }
}

fn build_messages(request: &LlmRequest) -> Vec<OpenAIMessage> {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);

    if let Some(system) = &request.system_prompt {
        messages.push(OpenAIMessage {
            role: "system".to_string(),
            content: Some(system.clone()),
        });
    }

    for msg in &request.messages {
        messages.push(OpenAIMessage {
            role: msg.role.as_str().to_string(),
            content: Some(msg.content.clone()),
        });
    }

    messages
}

fn convert_response(response: OpenAIChatResponse) -> Result<LlmResponse, LlmError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("No choices in LLM response".to_string()))?;

    let finish_reason = match choice.finish_reason.as_deref() {
        Some("stop") | None => FinishReason::Stop,
        Some("length") => FinishReason::Length,
        Some("content_filter") => FinishReason::ContentFilter,
        Some(_) => FinishReason::Unknown,
    };

    Ok(LlmResponse {
        content: choice.message.content.unwrap_or_default(),
        finish_reason,
    })
}

// =============================================================================
// OpenAI API types
// =============================================================================

#[derive(Debug, Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize, Default)]
struct OpenAIChoice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::ChatMessage;
    use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Captured {
        auth: Option<String>,
        body: Option<serde_json::Value>,
    }

    /// Serve a fake completions endpoint on an ephemeral port.
    async fn spawn_server(reply: serde_json::Value) -> (String, Arc<Mutex<Captured>>) {
        let captured = Arc::new(Mutex::new(Captured::default()));
        let state = (captured.clone(), reply);

        let app = Router::new()
            .route(
                "/v1/chat/completions",
                post(
                    |State((captured, reply)): State<(Arc<Mutex<Captured>>, serde_json::Value)>,
                     headers: HeaderMap,
                     Json(body): Json<serde_json::Value>| async move {
                        let mut guard = captured.lock().unwrap();
                        guard.auth = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        guard.body = Some(body);
                        Json(reply)
                    },
                ),
            )
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}/v1"), captured)
    }

    #[tokio::test]
    async fn sends_system_prompt_first_with_bearer_auth() {
        let (base_url, captured) = spawn_server(serde_json::json!({
            "choices": [{
                "message": {"role": "assistant", "content": "风从废墟间穿过。"},
                "finish_reason": "stop"
            }]
        }))
        .await;

        let client = CompletionsClient::new(&base_url, "deepseek-chat", "sk-test", Duration::from_secs(5));
        let request = LlmRequest::new(vec![
            ChatMessage::user("我推开门"),
            ChatMessage::assistant("门后一片漆黑。"),
        ])
        .with_system_prompt("# Role\nGM");

        let response = client.generate(request).await.unwrap();
        assert_eq!(response.content, "风从废墟间穿过。");
        assert_eq!(response.finish_reason, FinishReason::Stop);

        let captured = captured.lock().unwrap();
        assert_eq!(captured.auth.as_deref(), Some("Bearer sk-test"));
        let body = captured.body.as_ref().unwrap();
        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][2]["role"], "assistant");
        assert!(body.get("temperature").is_none());
    }

    #[tokio::test]
    async fn empty_choices_is_invalid_response() {
        let (base_url, _captured) = spawn_server(serde_json::json!({"choices": []})).await;
        let client = CompletionsClient::new(&base_url, "m", "sk-test", Duration::from_secs(5));

        let err = client
            .generate(LlmRequest::new(vec![ChatMessage::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_sending() {
        // Nothing listens on this address; NotConfigured must win.
        let client = CompletionsClient::new("http://127.0.0.1:9", "m", "  ", Duration::from_secs(1));
        let err = client
            .generate(LlmRequest::new(vec![ChatMessage::user("hi")]))
            .await
            .unwrap_err();
        assert_eq!(err, LlmError::NotConfigured);
    }

    #[test]
    fn unknown_finish_reason_is_preserved_as_unknown() {
        let response = OpenAIChatResponse {
            choices: vec![OpenAIChoice {
                message: OpenAIMessage {
                    role: "assistant".to_string(),
                    content: None,
                },
                finish_reason: Some("tool_calls".to_string()),
            }],
        };
        let converted = convert_response(response).unwrap();
        assert_eq!(converted.content, "");
        assert_eq!(converted.finish_reason, FinishReason::Unknown);
    }
}
