use crate::error::Result;
use crate::gateway::ModelProfile;
use crate::imaging::EncodeFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    pub image: ImageConfig,
    pub reconcile: ReconcileConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 同时处理的请求上限
    pub max_concurrency: usize,
    /// HTTP 接口只允许读取此目录下的照片与语音
    pub upload_dir: PathBuf,
}

/// 补全服务配置 (凭据 + 生成策略)
#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub seed: i64,
    pub temperature: f32,
    pub models: ModelsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub fast_text: String,
    pub deep_text: String,
    pub vision: String,
    pub transcription: String,
}

/// 账单照片预处理参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default)]
    pub max_size: Option<u32>,
    pub format: EncodeFormat,
    pub quality: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// 金额比对容差
    pub tolerance: f64,
    pub cache_alignments: bool,
    /// 对齐缓存条目上限
    pub cache_capacity: usize,
}

impl std::fmt::Debug for GatewayConfig {
    // 凭据不进日志
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("organization", &self.organization)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("seed", &self.seed)
            .field("temperature", &self.temperature)
            .field("models", &self.models)
            .finish()
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl ModelsConfig {
    pub fn for_profile(&self, profile: ModelProfile) -> &str {
        match profile {
            ModelProfile::FastText => &self.fast_text,
            ModelProfile::DeepText => &self.deep_text,
            ModelProfile::Vision => &self.vision,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            organization: None,
            max_tokens: 3000,
            timeout_secs: 180,
            max_retries: 3,
            retry_backoff_ms: 500,
            seed: 42,
            temperature: 0.0,
            models: ModelsConfig::default(),
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            fast_text: "gpt-3.5-turbo-0125".to_string(),
            deep_text: "gpt-4-0125-preview".to_string(),
            vision: "gpt-4-vision-preview".to_string(),
            transcription: "whisper-1".to_string(),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_size: Some(1020),
            format: EncodeFormat::Png,
            quality: 1.0,
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.01,
            cache_alignments: false,
            cache_capacity: 256,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                max_concurrency: 64,
                upload_dir: PathBuf::from("uploads"),
            },
            gateway: GatewayConfig::default(),
            image: ImageConfig::default(),
            reconcile: ReconcileConfig::default(),
        }
    }
}

impl AppConfig {
    /// 加载配置: 默认值 < bill-split.toml < BILLSPLIT__* 环境变量 < OPENAI_* 凭据
    pub fn from_env() -> Result<Self> {
        let defaults = AppConfig::default();
        let gw = &defaults.gateway;

        let settings = config::Config::builder()
            .set_default("server.host", defaults.server.host.as_str())?
            .set_default("server.port", i64::from(defaults.server.port))?
            .set_default("server.max_concurrency", defaults.server.max_concurrency as i64)?
            .set_default("server.upload_dir", defaults.server.upload_dir.to_string_lossy().into_owned())?
            .set_default("gateway.base_url", gw.base_url.as_str())?
            .set_default("gateway.max_tokens", i64::from(gw.max_tokens))?
            .set_default("gateway.timeout_secs", gw.timeout_secs as i64)?
            .set_default("gateway.max_retries", i64::from(gw.max_retries))?
            .set_default("gateway.retry_backoff_ms", gw.retry_backoff_ms as i64)?
            .set_default("gateway.seed", gw.seed)?
            .set_default("gateway.temperature", f64::from(gw.temperature))?
            .set_default("gateway.models.fast_text", gw.models.fast_text.as_str())?
            .set_default("gateway.models.deep_text", gw.models.deep_text.as_str())?
            .set_default("gateway.models.vision", gw.models.vision.as_str())?
            .set_default("gateway.models.transcription", gw.models.transcription.as_str())?
            .set_default("image.max_size", 1020_i64)?
            .set_default("image.format", "png")?
            .set_default("image.quality", 1.0_f64)?
            .set_default("reconcile.tolerance", defaults.reconcile.tolerance)?
            .set_default("reconcile.cache_alignments", defaults.reconcile.cache_alignments)?
            .set_default("reconcile.cache_capacity", defaults.reconcile.cache_capacity as i64)?
            .add_source(config::File::with_name("bill-split").required(false))
            .add_source(
                config::Environment::with_prefix("BILLSPLIT")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("gateway.api_key", std::env::var("OPENAI_API_KEY").ok())?
            .set_override_option(
                "gateway.organization",
                std::env::var("OPENAI_ORGANIZATION_ID").ok(),
            )?
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
