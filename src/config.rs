use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::http::FetchContext;
use crate::types::Provider;

/// 翻译层配置，可由 JSON 反序列化，所有字段均有默认值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// `provider/model` 中缺省 provider 时使用
    pub default_provider: Provider,
    pub reasoning: ReasoningDefaults,
    pub models: ModelFilter,
    pub download: DownloadConfig,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            default_provider: Provider::gemini(),
            reasoning: ReasoningDefaults::default(),
            models: ModelFilter::default(),
            download: DownloadConfig::default(),
        }
    }
}

/// effort 与 token budget 互转时使用的边界
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningDefaults {
    /// budget 下界
    pub min_budget_tokens: i32,
    /// 请求未给出 max_output_tokens 时的 budget 上界
    pub default_max_output_tokens: i32,
}

impl Default for ReasoningDefaults {
    fn default() -> Self {
        Self {
            min_budget_tokens: 1024,
            default_max_output_tokens: 8192,
        }
    }
}

/// 模型列表过滤
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelFilter {
    /// 允许列表，元素可以是 `gemini-2.0-flash` 或 `gemini/gemini-2.0-flash`
    pub allowed: Vec<String>,
    /// 为 true 时忽略允许列表，原样返回上游目录
    pub unfiltered: bool,
}

/// 图片 URL 下载限制
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub timeout_ms: Option<u64>,
    pub max_bytes: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_ms: Some(30_000),
            max_bytes: 20 * 1024 * 1024,
        }
    }
}

impl DownloadConfig {
    /// 以配置的超时构建新的 FetchContext
    pub fn fetch_context(&self) -> FetchContext {
        FetchContext {
            timeout: self.timeout_ms.map(Duration::from_millis),
            ..FetchContext::default()
        }
    }
}

impl TranslatorConfig {
    /// 从 JSON 字符串加载并校验配置
    ///
    /// # Examples
    ///
    /// ```
    /// use kotoba_bridge::config::TranslatorConfig;
    ///
    /// let config = TranslatorConfig::from_json_str(r#"{"models": {"allowed": ["gemini-2.0-flash"]}}"#).unwrap();
    /// assert_eq!(config.models.allowed.len(), 1);
    /// assert_eq!(config.reasoning.min_budget_tokens, 1024);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidConfig`] for malformed JSON or out-of-range values.
    pub fn from_json_str(raw: &str) -> Result<Self, BridgeError> {
        let config: Self = serde_json::from_str(raw).map_err(|err| BridgeError::InvalidConfig {
            field: "config".to_string(),
            reason: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 校验数值范围
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.reasoning.min_budget_tokens <= 0 {
            return Err(BridgeError::InvalidConfig {
                field: "reasoning.min_budget_tokens".to_string(),
                reason: format!("must be positive, got {}", self.reasoning.min_budget_tokens),
            });
        }
        if self.reasoning.default_max_output_tokens <= 0 {
            return Err(BridgeError::InvalidConfig {
                field: "reasoning.default_max_output_tokens".to_string(),
                reason: format!(
                    "must be positive, got {}",
                    self.reasoning.default_max_output_tokens
                ),
            });
        }
        if self.download.max_bytes == 0 {
            return Err(BridgeError::InvalidConfig {
                field: "download.max_bytes".to_string(),
                reason: "must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = TranslatorConfig::from_json_str("{}").expect("config");
        assert_eq!(config, TranslatorConfig::default());
        assert_eq!(config.default_provider, Provider::gemini());
        assert_eq!(config.download.timeout_ms, Some(30_000));
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = TranslatorConfig::from_json_str(
            r#"{"default_provider": "vertex", "reasoning": {"min_budget_tokens": 128}}"#,
        )
        .expect("config");
        assert_eq!(config.default_provider, Provider::vertex());
        assert_eq!(config.reasoning.min_budget_tokens, 128);
        assert_eq!(config.reasoning.default_max_output_tokens, 8192);
    }

    #[test]
    fn rejects_non_positive_budget() {
        let err = TranslatorConfig::from_json_str(r#"{"reasoning": {"min_budget_tokens": 0}}"#)
            .expect_err("should fail");
        match err {
            BridgeError::InvalidConfig { field, .. } => {
                assert_eq!(field, "reasoning.min_budget_tokens");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_json() {
        let err = TranslatorConfig::from_json_str("{not json").expect_err("should fail");
        assert!(matches!(err, BridgeError::InvalidConfig { .. }));
    }

    #[test]
    fn fetch_context_uses_configured_timeout() {
        let ctx = DownloadConfig {
            timeout_ms: Some(250),
            max_bytes: 1,
        }
        .fetch_context();
        assert_eq!(ctx.timeout, Some(Duration::from_millis(250)));
        assert!(!ctx.cancel.is_cancelled());
    }
}
