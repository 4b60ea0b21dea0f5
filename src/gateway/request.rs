use crate::imaging::EncodedImage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 请求所需的模型档位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelProfile {
    FastText,
    DeepText,
    Vision,
}

impl std::fmt::Display for ModelProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModelProfile::FastText => "fast-text",
            ModelProfile::DeepText => "deep-text",
            ModelProfile::Vision => "vision",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_instructions: String,
    pub context: Value,
    pub image: Option<EncodedImage>,
    pub model_profile: ModelProfile,
    /// 覆盖默认温度 (默认 0)
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn text(system_instructions: impl Into<String>, context: Value, profile: ModelProfile) -> Self {
        Self {
            system_instructions: system_instructions.into(),
            context,
            image: None,
            model_profile: profile,
            temperature: None,
        }
    }

    pub fn vision(system_instructions: impl Into<String>, image: EncodedImage) -> Self {
        Self {
            system_instructions: system_instructions.into(),
            context: Value::Null,
            image: Some(image),
            model_profile: ModelProfile::Vision,
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// 用户消息文本: 字符串原样发送，其余 JSON 美化输出，Null 不发送
    pub fn user_text(&self) -> Option<String> {
        match &self.context {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => Some(serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())),
        }
    }
}
