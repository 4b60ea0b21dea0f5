//! 提示词模板 (版本化的配置数据，修改措辞不改变任务契约)

pub mod alignment;
pub mod bill_recognition;
pub mod guest_extraction;

pub const PROMPT_VERSION: &str = "2024-03-splitter-v3";
