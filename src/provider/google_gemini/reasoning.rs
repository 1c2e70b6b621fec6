//! Reasoning effort ↔ Gemini thinking configuration.
//!
//! Gemini models before generation 3 only accept a token budget
//! (`thinkingBudget`: `0` disables thinking, `-1` lets the model decide).
//! Generation 3 and later also accept a discrete `thinkingLevel`.

use crate::types::{ReasoningEffort, ReasoningSpec};

use super::types::{GeminiThinkingConfig, ThinkingLevel};

/// Budget value that disables thinking.
pub const BUDGET_DISABLED: i32 = 0;
/// Budget sentinel asking the model to pick its own budget.
pub const BUDGET_DYNAMIC: i32 = -1;

const MODEL_FAMILY_PREFIX: &str = "gemini-";

/// Budget ratios within `[min, max]` for each effort, in increasing order.
const EFFORT_RATIOS: [(ReasoningEffort, f64); 4] = [
    (ReasoningEffort::Minimal, 0.025),
    (ReasoningEffort::Low, 0.15),
    (ReasoningEffort::Medium, 0.425),
    (ReasoningEffort::High, 0.80),
];

/// Upper ratio bound of each effort when mapping a budget back.
const EFFORT_CEILINGS: [(f64, ReasoningEffort); 3] = [
    (0.05, ReasoningEffort::Minimal),
    (0.25, ReasoningEffort::Low),
    (0.60, ReasoningEffort::Medium),
];

/// Whether `model` accepts `thinkingLevel`.
///
/// True when the lowercased name contains `gemini-` immediately followed by a
/// digit of `3` or above.
///
/// # Examples
///
/// ```
/// use kotoba_bridge::provider::google_gemini::reasoning::supports_thinking_level;
///
/// assert!(supports_thinking_level("gemini-3-pro-preview"));
/// assert!(supports_thinking_level("models/Gemini-3.5-flash"));
/// assert!(!supports_thinking_level("gemini-2.5-pro"));
/// assert!(!supports_thinking_level("gemini-exp-1206"));
/// ```
pub fn supports_thinking_level(model: &str) -> bool {
    let lower = model.to_ascii_lowercase();
    lower.match_indices(MODEL_FAMILY_PREFIX).any(|(start, _)| {
        lower[start + MODEL_FAMILY_PREFIX.len()..]
            .chars()
            .next()
            .is_some_and(|ch| ch.is_ascii_digit() && ch >= '3')
    })
}

/// Whether `model` is a "pro" variant, which lacks the minimal and medium levels.
pub fn is_pro_model(model: &str) -> bool {
    model.to_ascii_lowercase().contains("pro")
}

/// Maps an effort to a thinking level, substituting levels the model lacks.
///
/// Returns `None` for [`ReasoningEffort::None`].
pub fn thinking_level_for(effort: ReasoningEffort, model: &str) -> Option<ThinkingLevel> {
    let pro = is_pro_model(model);
    match effort {
        ReasoningEffort::None => None,
        ReasoningEffort::Minimal if pro => Some(ThinkingLevel::Low),
        ReasoningEffort::Minimal => Some(ThinkingLevel::Minimal),
        ReasoningEffort::Low => Some(ThinkingLevel::Low),
        ReasoningEffort::Medium if pro => Some(ThinkingLevel::High),
        ReasoningEffort::Medium => Some(ThinkingLevel::Medium),
        ReasoningEffort::High => Some(ThinkingLevel::High),
    }
}

/// Effort matching a thinking level one to one.
pub fn effort_for_level(level: ThinkingLevel) -> ReasoningEffort {
    match level {
        ThinkingLevel::Minimal => ReasoningEffort::Minimal,
        ThinkingLevel::Low => ReasoningEffort::Low,
        ThinkingLevel::Medium => ReasoningEffort::Medium,
        ThinkingLevel::High => ReasoningEffort::High,
    }
}

/// Converts an effort into a token budget within `[min_budget, max_tokens]`.
///
/// Monotonic in effort; `None` maps to [`BUDGET_DISABLED`].
///
/// # Examples
///
/// ```
/// use kotoba_bridge::provider::google_gemini::reasoning::budget_from_effort;
/// use kotoba_bridge::types::ReasoningEffort;
///
/// assert_eq!(budget_from_effort(ReasoningEffort::None, 1024, 8192), 0);
/// assert_eq!(budget_from_effort(ReasoningEffort::High, 1024, 8192), 6758);
/// ```
pub fn budget_from_effort(effort: ReasoningEffort, min_budget: i32, max_tokens: i32) -> i32 {
    let Some(ratio) = EFFORT_RATIOS
        .iter()
        .find(|(candidate, _)| *candidate == effort)
        .map(|(_, ratio)| *ratio)
    else {
        return BUDGET_DISABLED;
    };
    if max_tokens <= min_budget {
        return min_budget;
    }
    let span = f64::from(max_tokens) - f64::from(min_budget);
    let budget = f64::from(min_budget) + ratio * span;
    (budget as i32).clamp(min_budget, max_tokens)
}

/// Inverse of [`budget_from_effort`], with the two sentinels special-cased.
///
/// Negative budgets other than [`BUDGET_DYNAMIC`] are not valid upstream and
/// read as [`ReasoningEffort::Low`].
///
/// # Examples
///
/// ```
/// use kotoba_bridge::provider::google_gemini::reasoning::effort_from_budget;
/// use kotoba_bridge::types::ReasoningEffort;
///
/// assert_eq!(effort_from_budget(0, 1024, 8192), ReasoningEffort::None);
/// assert_eq!(effort_from_budget(-1, 1024, 8192), ReasoningEffort::Medium);
/// assert_eq!(effort_from_budget(8192, 1024, 8192), ReasoningEffort::High);
/// assert_eq!(effort_from_budget(i32::MIN, 1024, 8192), ReasoningEffort::Low);
/// ```
pub fn effort_from_budget(budget: i32, min_budget: i32, max_tokens: i32) -> ReasoningEffort {
    match budget {
        BUDGET_DISABLED => return ReasoningEffort::None,
        BUDGET_DYNAMIC => return ReasoningEffort::Medium,
        _ if budget < BUDGET_DYNAMIC => return ReasoningEffort::Low,
        _ => {}
    }
    if max_tokens <= min_budget {
        return ReasoningEffort::High;
    }
    let ratio = (f64::from(budget) - f64::from(min_budget))
        / (f64::from(max_tokens) - f64::from(min_budget));
    EFFORT_CEILINGS
        .iter()
        .find(|(ceiling, _)| ratio <= *ceiling)
        .map(|(_, effort)| *effort)
        .unwrap_or(ReasoningEffort::High)
}

/// Builds the Gemini thinking config for a unified reasoning spec.
///
/// An explicit budget always wins over an effort label. Without a budget,
/// effort `none` disables thinking on every model; other efforts become a
/// level on models that accept one and a budget elsewhere.
pub fn thinking_config_for(
    model: &str,
    spec: &ReasoningSpec,
    min_budget: i32,
    max_tokens: i32,
) -> Option<GeminiThinkingConfig> {
    if let Some(budget) = spec.max_tokens {
        return Some(budget_config(budget));
    }

    let effort = spec.effort?;
    if effort == ReasoningEffort::None {
        return Some(budget_config(BUDGET_DISABLED));
    }

    if supports_thinking_level(model) {
        return Some(GeminiThinkingConfig {
            include_thoughts: Some(true),
            thinking_budget: None,
            thinking_level: thinking_level_for(effort, model),
        });
    }

    Some(budget_config(budget_from_effort(
        effort, min_budget, max_tokens,
    )))
}

fn budget_config(budget: i32) -> GeminiThinkingConfig {
    GeminiThinkingConfig {
        include_thoughts: Some(budget != BUDGET_DISABLED),
        thinking_budget: Some(budget),
        thinking_level: None,
    }
}

/// Echoes a Gemini thinking config back as a unified reasoning spec.
///
/// A budget reports both the budget and its derived effort. A level reports its
/// effort and, unless that effort is `none`, a compatibility budget.
pub fn reasoning_from_thinking_config(
    config: &GeminiThinkingConfig,
    min_budget: i32,
    max_tokens: i32,
) -> Option<ReasoningSpec> {
    if let Some(budget) = config.thinking_budget {
        return Some(ReasoningSpec {
            effort: Some(effort_from_budget(budget, min_budget, max_tokens)),
            max_tokens: Some(budget),
        });
    }

    let effort = effort_for_level(config.thinking_level?);
    let max_tokens = (effort != ReasoningEffort::None)
        .then(|| budget_from_effort(effort, min_budget, max_tokens));
    Some(ReasoningSpec {
        effort: Some(effort),
        max_tokens,
    })
}
