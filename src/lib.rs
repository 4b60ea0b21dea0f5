pub mod api;
pub mod config;
pub mod decoder;
pub mod error;
pub mod gateway;
pub mod imaging;
pub mod models;
pub mod prompts;
pub mod service;

pub use config::AppConfig;
pub use error::{Result, SplitError};
pub use gateway::{create_client, CompletionGateway, OpenAiGateway, Transcriber};
pub use service::SplitService;
