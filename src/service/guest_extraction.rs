use crate::decoder::decode;
use crate::error::{Result, SplitError};
use crate::gateway::{CompletionGateway, CompletionRequest, ModelProfile, Transcriber};
use crate::models::GuestMentionMap;
use crate::prompts::guest_extraction::SYSTEM;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// 客人描述抽取: 自由文本 -> "提及 -> 客人列表"
pub struct MentionExtractor {
    gateway: Arc<dyn CompletionGateway>,
}

impl MentionExtractor {
    pub fn new(gateway: Arc<dyn CompletionGateway>) -> Self {
        Self { gateway }
    }

    pub async fn extract_guest_mentions(&self, description_text: &str) -> Result<GuestMentionMap> {
        let request = CompletionRequest::text(
            SYSTEM,
            Value::String(description_text.to_string()),
            ModelProfile::DeepText,
        );
        let raw = self.gateway.complete(&request).await?;
        let mentions = parse_mentions(&decode(&raw)?)?;

        tracing::info!(
            "Extracted {} mention(s) for guest(s) {:?}",
            mentions.len(),
            mentions.guests()
        );
        Ok(mentions)
    }
}

/// 语音描述转文本
pub async fn transcribe_description(
    transcriber: &dyn Transcriber,
    audio_path: &Path,
    prompt: Option<&str>,
) -> Result<String> {
    let text = transcriber.transcribe(audio_path, prompt).await?;
    tracing::info!(
        "Transcribed {} ({} chars)",
        audio_path.display(),
        text.chars().count()
    );
    Ok(text)
}

/// 只校验形状: 文本 -> 字符串数组
pub fn parse_mentions(value: &Value) -> Result<GuestMentionMap> {
    let object = value
        .as_object()
        .ok_or_else(|| SplitError::schema("guest mentions must be a JSON object"))?;

    object
        .iter()
        .map(|(mention, guests)| -> Result<(String, Vec<String>)> {
            let guests = guests
                .as_array()
                .ok_or_else(|| {
                    SplitError::schema(format!("mention {:?} must map to a list of guests", mention))
                })?
                .iter()
                .map(|guest| {
                    guest.as_str().map(str::to_string).ok_or_else(|| {
                        SplitError::schema(format!("mention {:?} has a non-string guest {}", mention, guest))
                    })
                })
                .collect::<Result<Vec<String>>>()?;
            Ok((mention.clone(), guests))
        })
        .collect()
}
