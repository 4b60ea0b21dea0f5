use super::{CompletionGateway, CompletionRequest, Transcriber};
use crate::config::GatewayConfig;
use crate::error::{Result, SplitError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};

const ORGANIZATION_HEADER: &str = "OpenAI-Organization";

/// 创建 HTTP 客户端 (连接池在所有调用间共享)
pub fn create_client() -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(16)
        .build()
        .map_err(|e| SplitError::Transport(format!("failed to build http client: {}", e)))
}

/// OpenAI 兼容的补全/转写网关
pub struct OpenAiGateway {
    http: Client,
    config: GatewayConfig,
    api_key: String,
}

impl OpenAiGateway {
    pub fn new(http: Client, config: GatewayConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| SplitError::Auth("OPENAI_API_KEY is not set".to_string()))?;
        Ok(Self {
            http,
            config,
            api_key,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder
            .bearer_auth(&self.api_key)
            .timeout(self.config.timeout());
        match &self.config.organization {
            Some(org) if !org.is_empty() => builder.header(ORGANIZATION_HEADER, org),
            _ => builder,
        }
    }

    /// 发送请求并读取响应体；瞬时故障 (超时/连接/429/5xx) 按相同请求重试
    async fn send_with_retries<F>(&self, label: &str, mut build: F) -> Result<String>
    where
        F: FnMut() -> RequestBuilder,
    {
        let max_attempts = self.config.max_retries + 1;
        let mut last_failure = LastFailure::Transport(String::new());

        for attempt in 1..=max_attempts {
            let started = Instant::now();
            match self.attempt(build()).await {
                Ok(body) => {
                    tracing::debug!(
                        "{} succeeded on attempt {}/{} in {:?}",
                        label,
                        attempt,
                        max_attempts,
                        started.elapsed()
                    );
                    return Ok(body);
                }
                Err(AttemptError::Fatal(err)) => {
                    tracing::error!("{} failed: {}", label, err);
                    return Err(err);
                }
                Err(AttemptError::Transient(failure)) => {
                    tracing::warn!(
                        "{} attempt {}/{} failed after {:?}: {}",
                        label,
                        attempt,
                        max_attempts,
                        started.elapsed(),
                        failure
                    );
                    last_failure = failure;
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.config.retry_backoff() * attempt).await;
            }
        }

        Err(match last_failure {
            LastFailure::Timeout => SplitError::Timeout {
                attempts: max_attempts,
                timeout: self.config.timeout(),
            },
            LastFailure::Transport(message) => SplitError::Transport(format!(
                "{} gave up after {} attempt(s): {}",
                label, max_attempts, message
            )),
        })
    }

    async fn attempt(&self, builder: RequestBuilder) -> std::result::Result<String, AttemptError> {
        let response = builder.send().await.map_err(AttemptError::from_reqwest)?;
        let status = response.status();
        let body = response.text().await.map_err(AttemptError::from_reqwest)?;

        if status.is_success() {
            return Ok(body);
        }
        let detail = format!("HTTP {}: {}", status, truncate(&body, 300));
        Err(match classify_status(status) {
            StatusClass::Auth => AttemptError::Fatal(SplitError::Auth(detail)),
            StatusClass::Transient => AttemptError::Transient(LastFailure::Transport(detail)),
            StatusClass::Fatal => AttemptError::Fatal(SplitError::Transport(detail)),
        })
    }
}

#[async_trait]
impl CompletionGateway for OpenAiGateway {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let model = self.config.models.for_profile(request.model_profile);
        let payload = build_chat_payload(&self.config, model, request);
        let url = self.endpoint("chat/completions");
        let label = format!("completion[{} -> {}]", request.model_profile, model);

        let body = self
            .send_with_retries(&label, || self.authorize(self.http.post(&url).json(&payload)))
            .await?;

        let envelope: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            SplitError::Transport(format!("{} returned a malformed envelope: {}", label, e))
        })?;
        if let Some(usage) = &envelope.usage {
            tracing::info!(
                "{} used {} prompt + {} completion tokens",
                label,
                usage.prompt_tokens,
                usage.completion_tokens
            );
        }

        // 内容层面的问题 (空回答、被截断) 交给解码器判定
        let Some(choice) = envelope.choices.into_iter().next() else {
            tracing::warn!("{} returned no choices", label);
            return Ok(String::new());
        };
        if choice.finish_reason.as_deref() == Some("length") {
            tracing::warn!("{} hit max_tokens={}", label, self.config.max_tokens);
        }
        Ok(choice.message.content.unwrap_or_default())
    }
}

#[async_trait]
impl Transcriber for OpenAiGateway {
    async fn transcribe(&self, audio_path: &Path, prompt: Option<&str>) -> Result<String> {
        let audio = tokio::fs::read(audio_path)
            .await
            .map_err(|e| SplitError::io(audio_path, e))?;
        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "voice.ogg".to_string());
        let url = self.endpoint("audio/transcriptions");
        let model = self.config.models.transcription.clone();
        let label = format!("transcription[{}]", model);

        let body = self
            .send_with_retries(&label, || {
                // multipart 表单不可复用，每次重试重新构建
                let mut form = Form::new()
                    .text("model", model.clone())
                    .text("response_format", "text")
                    .text("temperature", "0")
                    .part("file", Part::bytes(audio.clone()).file_name(file_name.clone()));
                if let Some(prompt) = prompt {
                    form = form.text("prompt", prompt.to_string());
                }
                self.authorize(self.http.post(&url).multipart(form))
            })
            .await?;

        Ok(body.trim().to_string())
    }
}

#[derive(Debug)]
enum LastFailure {
    Timeout,
    Transport(String),
}

impl std::fmt::Display for LastFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LastFailure::Timeout => f.write_str("timed out"),
            LastFailure::Transport(message) => f.write_str(message),
        }
    }
}

enum AttemptError {
    Transient(LastFailure),
    Fatal(SplitError),
}

impl AttemptError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AttemptError::Transient(LastFailure::Timeout)
        } else if err.is_connect() || err.is_request() || err.is_body() {
            AttemptError::Transient(LastFailure::Transport(err.to_string()))
        } else {
            AttemptError::Fatal(SplitError::Transport(err.to_string()))
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum StatusClass {
    Auth,
    Transient,
    Fatal,
}

fn classify_status(status: StatusCode) -> StatusClass {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StatusClass::Auth,
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => StatusClass::Transient,
        s if s.is_server_error() => StatusClass::Transient,
        _ => StatusClass::Fatal,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}

#[derive(Debug, Serialize)]
struct ChatPayload {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    seed: i64,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
    detail: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

fn build_chat_payload(config: &GatewayConfig, model: &str, request: &CompletionRequest) -> ChatPayload {
    let mut messages = vec![ChatMessage {
        role: "system",
        content: MessageContent::Text(request.system_instructions.clone()),
    }];

    let user_text = request.user_text();
    match &request.image {
        Some(image) => {
            let mut parts = Vec::new();
            if let Some(text) = user_text {
                parts.push(ContentPart::Text { text });
            }
            parts.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image.data_url(),
                    detail: "high",
                },
            });
            messages.push(ChatMessage {
                role: "user",
                content: MessageContent::Parts(parts),
            });
        }
        None => {
            if let Some(text) = user_text {
                messages.push(ChatMessage {
                    role: "user",
                    content: MessageContent::Text(text),
                });
            }
        }
    }

    ChatPayload {
        model: model.to_string(),
        messages,
        max_tokens: config.max_tokens,
        temperature: request.temperature.unwrap_or(config.temperature),
        seed: config.seed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ModelProfile;
    use crate::imaging::{EncodeFormat, EncodedImage};
    use serde_json::json;

    #[test]
    fn text_payload_applies_generation_policy() {
        let config = GatewayConfig::default();
        let request = CompletionRequest::text("rules", json!("Саня взял авиацию"), ModelProfile::DeepText);

        let payload = serde_json::to_value(build_chat_payload(&config, "gpt-x", &request)).unwrap();
        assert_eq!(payload["model"], "gpt-x");
        assert_eq!(payload["seed"], 42);
        assert_eq!(payload["max_tokens"], 3000);
        assert_eq!(payload["temperature"], 0.0);
        assert_eq!(payload["messages"][0], json!({"role": "system", "content": "rules"}));
        assert_eq!(payload["messages"][1]["content"], "Саня взял авиацию");
    }

    #[test]
    fn vision_payload_embeds_data_url() {
        let config = GatewayConfig::default();
        let image = EncodedImage {
            format: EncodeFormat::Png,
            base64: "QUJD".to_string(),
        };
        let request = CompletionRequest::vision("parse the bill", image).with_temperature(0.5);

        let payload = serde_json::to_value(build_chat_payload(&config, "vision-model", &request)).unwrap();
        assert_eq!(payload["temperature"], 0.5);
        let parts = payload["messages"][1]["content"].as_array().unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0]["type"], "image_url");
        assert_eq!(parts[0]["image_url"]["url"], "data:image/png;base64,QUJD");
        assert_eq!(parts[0]["image_url"]["detail"], "high");
    }

    #[test]
    fn status_classes() {
        assert_eq!(classify_status(StatusCode::UNAUTHORIZED), StatusClass::Auth);
        assert_eq!(classify_status(StatusCode::FORBIDDEN), StatusClass::Auth);
        assert_eq!(classify_status(StatusCode::TOO_MANY_REQUESTS), StatusClass::Transient);
        assert_eq!(classify_status(StatusCode::BAD_GATEWAY), StatusClass::Transient);
        assert_eq!(classify_status(StatusCode::BAD_REQUEST), StatusClass::Fatal);
        assert_eq!(classify_status(StatusCode::NOT_FOUND), StatusClass::Fatal);
    }

    #[test]
    fn missing_api_key_is_auth_error() {
        let client = create_client().unwrap();
        let result = OpenAiGateway::new(client, GatewayConfig::default());
        assert!(matches!(result, Err(SplitError::Auth(_))));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("привет", 3), "при...");
        assert_eq!(truncate("ok", 3), "ok");
    }
}
