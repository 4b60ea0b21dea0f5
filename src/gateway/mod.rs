pub mod client;
pub mod request;

pub use client::{create_client, OpenAiGateway};
pub use request::{CompletionRequest, ModelProfile};

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// 远程推理服务边界: 结构化请求进，原始文本出
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// 语音转写 (客人口述)
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_path: &Path, prompt: Option<&str>) -> Result<String>;
}
