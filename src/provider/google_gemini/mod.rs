//! Google Gemini / Imagen 线路格式转换

pub mod chat;
pub mod error;
pub mod images;
pub mod media;
pub mod models;
mod parts;
pub mod reasoning;
pub mod schema;
pub mod speech;
pub mod transcription;
pub mod translator;
pub mod types;
pub mod usage;

pub use error::parse_gemini_error;
pub use translator::GeminiTranslator;
