use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// 流水线错误分类
#[derive(Debug, Error)]
pub enum SplitError {
    /// 图像/音频文件不可读或无法解码
    #[error("IO error on {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("completion timed out after {attempts} attempt(s) (per-call timeout {timeout:?})")]
    Timeout { attempts: u32, timeout: Duration },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    /// 模型输出不是严格 JSON，附带原文便于排查
    #[error("decode error: {message}; raw response: {raw:?}")]
    Decode { message: String, raw: String },

    #[error("schema error: {0}")]
    Schema(String),

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    /// 当前部署未启用的能力 (例如未配置转写后端)
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl SplitError {
    pub fn io(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        SplitError::Io {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        SplitError::Schema(message.into())
    }

    /// 调用方重试是否可能成功 (仅网关层瞬时故障)
    pub fn is_retryable(&self) -> bool {
        matches!(self, SplitError::Timeout { .. } | SplitError::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, SplitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_gateway_failures_are_retryable() {
        assert!(SplitError::Transport("reset".into()).is_retryable());
        assert!(SplitError::Timeout {
            attempts: 4,
            timeout: Duration::from_secs(1)
        }
        .is_retryable());
        assert!(!SplitError::schema("missing id").is_retryable());
        assert!(!SplitError::Auth("bad key".into()).is_retryable());
        assert!(!SplitError::io("/tmp/x.png", "not found").is_retryable());
        assert!(!SplitError::Unsupported("no transcriber".into()).is_retryable());
    }

    #[test]
    fn decode_error_keeps_raw_text() {
        let err = SplitError::Decode {
            message: "expected value".into(),
            raw: "```json".into(),
        };
        assert!(err.to_string().contains("```json"));
    }
}
