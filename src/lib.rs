//! Gemini 与统一网关模型之间的双向转换库

pub mod config;
pub mod error;
pub mod http;
pub mod provider;
pub mod types;

pub use config::TranslatorConfig;
pub use error::BridgeError;
pub use provider::google_gemini::GeminiTranslator;
pub use types::*;
