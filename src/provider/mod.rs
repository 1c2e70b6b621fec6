//! 各上游供应商的格式转换实现

pub mod google_gemini;
