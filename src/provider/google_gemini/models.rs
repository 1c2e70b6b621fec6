//! models.list 目录转换与允许列表过滤

use std::collections::HashSet;

use crate::config::ModelFilter;
use crate::types::{ListModelsRequest, ListModelsResponse, Model, Provider, parse_model_string};

use super::types::{GeminiListModelsResponse, GeminiModel};

const MODELS_PREFIX: &str = "models/";

/// models.list 的查询参数
///
/// # Examples
///
/// ```
/// use kotoba_bridge::provider::google_gemini::models::list_models_query;
/// use kotoba_bridge::types::ListModelsRequest;
///
/// let request = ListModelsRequest {
///     page_size: Some(50),
///     page_token: Some("next".into()),
///     ..Default::default()
/// };
/// assert_eq!(
///     list_models_query(&request),
///     vec![("pageSize".to_string(), "50".to_string()), ("pageToken".to_string(), "next".to_string())]
/// );
/// ```
pub fn list_models_query(request: &ListModelsRequest) -> Vec<(String, String)> {
    let mut query = Vec::new();
    if let Some(size) = request.page_size.filter(|size| *size > 0) {
        query.push(("pageSize".to_string(), size.to_string()));
    }
    if let Some(token) = request.page_token.as_deref().filter(|token| !token.is_empty()) {
        query.push(("pageToken".to_string(), token.to_string()));
    }
    query
}

/// 上游目录 -> 统一模型列表
///
/// id 形如 `<provider>/<name>`。允许列表非空且未设置 `unfiltered` 时，只保留
/// 列表中的模型，并按列表顺序为目录中缺失的条目补上只含 id / name 的占位项。
pub fn to_unified_list_models_response(
    response: &GeminiListModelsResponse,
    provider: &Provider,
    filter: &ModelFilter,
) -> ListModelsResponse {
    let next_page_token = response.next_page_token.clone().filter(|token| !token.is_empty());

    if filter.unfiltered || filter.allowed.is_empty() {
        return ListModelsResponse {
            data: response
                .models
                .iter()
                .map(|model| model_from_gemini(model, provider))
                .collect(),
            next_page_token,
        };
    }

    let allowed: Vec<String> = filter
        .allowed
        .iter()
        .map(|entry| allow_list_name(entry, provider))
        .filter(|name| !name.is_empty())
        .collect();

    let mut seen = HashSet::new();
    let mut data = Vec::new();
    for model in &response.models {
        let name = bare_model_name(&model.name);
        if allowed.iter().any(|entry| entry == name) && seen.insert(name.to_string()) {
            data.push(model_from_gemini(model, provider));
        }
    }
    for name in &allowed {
        if seen.insert(name.clone()) {
            data.push(Model {
                id: format!("{}/{name}", provider.as_str()),
                name: Some(name.clone()),
                ..Default::default()
            });
        }
    }

    ListModelsResponse {
        data,
        next_page_token,
    }
}

/// 统一模型列表 -> 上游目录，name 还原为 `models/<name>`
pub fn to_gemini_list_models_response(response: &ListModelsResponse) -> GeminiListModelsResponse {
    let models = response
        .data
        .iter()
        .map(|model| {
            let (_, name) = parse_model_string(&model.id, Provider::gemini());
            GeminiModel {
                name: format!("{MODELS_PREFIX}{}", bare_model_name(&name)),
                version: model.version.clone(),
                display_name: model.name.clone(),
                description: model.description.clone(),
                input_token_limit: model.context_length,
                output_token_limit: model.max_output_tokens,
                supported_generation_methods: model.supported_methods.clone(),
                extra: Default::default(),
            }
        })
        .collect();

    GeminiListModelsResponse {
        models,
        next_page_token: response.next_page_token.clone(),
    }
}

fn model_from_gemini(model: &GeminiModel, provider: &Provider) -> Model {
    let name = bare_model_name(&model.name);
    Model {
        id: format!("{}/{name}", provider.as_str()),
        name: model
            .display_name
            .clone()
            .filter(|display| !display.is_empty())
            .or_else(|| Some(name.to_string())),
        description: model.description.clone(),
        context_length: model.input_token_limit,
        max_output_tokens: model.output_token_limit,
        supported_methods: model.supported_generation_methods.clone(),
        version: model.version.clone(),
    }
}

fn bare_model_name(name: &str) -> &str {
    name.strip_prefix(MODELS_PREFIX).unwrap_or(name)
}

/// 允许列表条目可带 provider 前缀，也可带 `models/` 前缀
fn allow_list_name(entry: &str, provider: &Provider) -> String {
    let entry = entry.trim();
    let (_, name) = parse_model_string(entry, provider.clone());
    bare_model_name(&name).to_string()
}
