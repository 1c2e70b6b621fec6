use crate::types::{ModalityTokens, TokenUsage};

use super::types::{GeminiModalityTokenCount, GeminiUsageMetadata};

/// UsageMetadata -> TokenUsage
///
/// 缓存命中与思考 token 单独拆出，按模态的细分原样保留。
pub fn usage_from_gemini(usage: &GeminiUsageMetadata) -> TokenUsage {
    TokenUsage {
        prompt_tokens: usage.prompt_token_count,
        completion_tokens: usage.candidates_token_count,
        total_tokens: usage.total_token_count,
        cached_tokens: usage.cached_content_token_count,
        reasoning_tokens: usage.thoughts_token_count,
        tool_use_prompt_tokens: usage.tool_use_prompt_token_count,
        prompt_modalities: modalities_from_gemini(&usage.prompt_tokens_details),
        completion_modalities: modalities_from_gemini(&usage.candidates_tokens_details),
    }
}

/// TokenUsage -> UsageMetadata
pub fn usage_to_gemini(usage: &TokenUsage) -> GeminiUsageMetadata {
    GeminiUsageMetadata {
        prompt_token_count: usage.prompt_tokens,
        cached_content_token_count: usage.cached_tokens,
        candidates_token_count: usage.completion_tokens,
        total_token_count: usage.total_tokens.or_else(|| {
            // 上游缺失 total 时按 prompt + completion 补齐
            match (usage.prompt_tokens, usage.completion_tokens) {
                (None, None) => None,
                (prompt, completion) => {
                    Some(prompt.unwrap_or(0) + completion.unwrap_or(0))
                }
            }
        }),
        tool_use_prompt_token_count: usage.tool_use_prompt_tokens,
        thoughts_token_count: usage.reasoning_tokens,
        prompt_tokens_details: modalities_to_gemini(&usage.prompt_modalities),
        candidates_tokens_details: modalities_to_gemini(&usage.completion_modalities),
        extra: Default::default(),
    }
}

/// 响应中没有 usageMetadata 时返回 None
pub(crate) fn optional_usage(usage: Option<&GeminiUsageMetadata>) -> Option<TokenUsage> {
    usage.map(usage_from_gemini)
}

fn modalities_from_gemini(details: &[GeminiModalityTokenCount]) -> Vec<ModalityTokens> {
    details
        .iter()
        .map(|detail| ModalityTokens {
            modality: detail.modality.clone(),
            tokens: detail.token_count,
        })
        .collect()
}

fn modalities_to_gemini(details: &[ModalityTokens]) -> Vec<GeminiModalityTokenCount> {
    details
        .iter()
        .map(|detail| GeminiModalityTokenCount {
            modality: detail.modality.clone(),
            token_count: detail.tokens,
        })
        .collect()
}
