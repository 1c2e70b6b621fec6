//! Chat / GenerateContent 双向转换

use serde_json::{Map, Value};

use crate::config::ReasoningDefaults;
use crate::error::BridgeError;
use crate::types::{
    ChatChoice, ChatOptions, ChatRequest, ChatResponse, ContentPart, ExtraParams, FinishReason,
    Message, ParamKey, Provider, ReasoningDetail, ReasoningDetailKind, ResponseFormat, Role,
    TextContent, ToolCall, ToolChoice, ToolDefinition, parse_model_string,
    tool_call_signature_key,
};

use super::parts::{
    SideChannel, content_part_to_gemini, file_to_content_part, inline_to_content_part,
    restore_side_channel,
};
use super::reasoning::{reasoning_from_thinking_config, thinking_config_for};
use super::schema::{lowercase_schema_types, normalize_schema, response_format_from_gemini};
use super::types::{
    GeminiCandidate, GeminiContent, GeminiFunctionCall, GeminiFunctionCallingConfig,
    GeminiFunctionDeclaration, GeminiFunctionResponse, GeminiGenerateContentResponse,
    GeminiGenerationConfig, GeminiGenerationRequest, GeminiPart, GeminiTool, GeminiToolConfig,
    PartPayload,
};
use super::usage::{optional_usage, usage_to_gemini};

const ROLE_USER: &str = "user";
const ROLE_MODEL: &str = "model";
const JSON_MIME: &str = "application/json";

/// 统一归为内容过滤的 finishReason
const CONTENT_FILTER_REASONS: [&str; 7] = [
    "SAFETY",
    "RECITATION",
    "LANGUAGE",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
    "IMAGE_SAFETY",
];

/// 构建 GenerateContent 请求体
///
/// system / developer 消息合并为 `systemInstruction`；`user` 映射为 `user`，
/// 其余角色一律映射为 `model`。
///
/// # Errors
///
/// 除 system 外没有任何可发送的消息时返回 [`BridgeError::Validation`]。
pub fn to_gemini_chat_request(
    request: &ChatRequest,
    defaults: &ReasoningDefaults,
) -> Result<GeminiGenerationRequest, BridgeError> {
    let mut system_texts = Vec::new();
    let mut contents = Vec::new();
    for message in &request.messages {
        match message.role.as_str() {
            "system" | "developer" => {
                if let Some(text) = message.joined_text("\n") {
                    system_texts.push(text);
                }
            }
            _ => {
                if let Some(content) = message_to_content(message) {
                    contents.push(content);
                }
            }
        }
    }

    if contents.is_empty() {
        return Err(BridgeError::Validation {
            message: "Gemini GenerateContent request requires at least one content message"
                .to_string(),
        });
    }

    let mut extra = request.options.extra.clone();
    let mut gemini = GeminiGenerationRequest {
        model: request.model.clone(),
        contents,
        ..Default::default()
    };

    if !system_texts.is_empty() {
        gemini.system_instruction = Some(GeminiContent {
            role: None,
            parts: vec![GeminiPart::text(system_texts.join("\n\n"))],
            extra: Default::default(),
        });
    }

    gemini.generation_config = build_generation_config(request, defaults, &mut extra);

    if !request.tools.is_empty() {
        gemini.tools = vec![GeminiTool {
            function_declarations: request.tools.iter().map(tool_to_declaration).collect(),
            extra: Default::default(),
        }];
    }
    gemini.tool_config = request.tool_choice.as_ref().map(tool_choice_to_config);

    SideChannel::take_from(&mut extra).apply(&mut gemini);
    gemini.extra = extra.into_inner();
    Ok(gemini)
}

/// 将 GenerateContent 请求体还原为统一 ChatRequest
pub fn to_unified_chat_request(
    request: &GeminiGenerationRequest,
    default_provider: Provider,
    defaults: &ReasoningDefaults,
) -> ChatRequest {
    let (provider, model) = parse_model_string(&request.model, default_provider);

    let mut messages = Vec::new();
    if let Some(system) = &request.system_instruction {
        let content: Vec<ContentPart> = system
            .parts
            .iter()
            .filter_map(|part| part.text.clone())
            .map(|text| ContentPart::Text(TextContent { text }))
            .collect();
        if !content.is_empty() {
            messages.push(Message {
                role: Role::system(),
                content,
                ..Default::default()
            });
        }
    }
    for content in &request.contents {
        content_to_messages(content, &mut messages);
    }

    let mut extra = ExtraParams::new();
    let mut options = ChatOptions::default();
    let mut response_format = None;
    if let Some(config) = &request.generation_config {
        options = options_from_generation_config(config, defaults, &mut extra);
        response_format = response_format_from_gemini(
            config.response_mime_type.as_deref(),
            config.response_schema.as_ref(),
        );
    }

    let mut tools = Vec::new();
    for tool in &request.tools {
        tools.extend(tool.function_declarations.iter().map(|declaration| ToolDefinition {
            name: declaration.name.clone(),
            description: declaration.description.clone(),
            input_schema: declaration.parameters.as_ref().map(lowercase_schema_types),
        }));
        // googleSearch / codeExecution 等内置工具保留在 extra
        for (key, value) in &tool.extra {
            extra.insert(key.clone(), value.clone());
        }
    }

    let tool_choice = request
        .tool_config
        .as_ref()
        .and_then(|config| config.function_calling_config.as_ref())
        .and_then(tool_choice_from_config);

    restore_side_channel(request, &mut extra);
    options.extra = extra;

    ChatRequest {
        provider,
        model,
        messages,
        options,
        tools,
        tool_choice,
        response_format,
    }
}

/// 将 GenerateContentResponse 映射为统一的 ChatResponse
///
/// # Errors
///
/// - 没有任何候选时返回 [`BridgeError::MissingField`]；
/// - 候选不含任何 part 时返回携带 finishReason 的 [`BridgeError::Upstream`]。
pub fn to_unified_chat_response(
    response: &GeminiGenerateContentResponse,
) -> Result<ChatResponse, BridgeError> {
    if response.candidates.is_empty() {
        let block_reason = response
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.get("blockReason"))
            .and_then(Value::as_str);
        let message = match block_reason {
            Some(reason) => format!("Gemini response contains no candidates (prompt blocked: {reason})"),
            None => "Gemini response contains no candidates".to_string(),
        };
        return Err(BridgeError::missing(message));
    }

    let mut choices = Vec::with_capacity(response.candidates.len());
    for (position, candidate) in response.candidates.iter().enumerate() {
        choices.push(candidate_to_choice(candidate, position)?);
    }

    Ok(ChatResponse {
        id: response.response_id.clone(),
        model: response.model_version.clone(),
        choices,
        usage: optional_usage(response.usage_metadata.as_ref()),
    })
}

/// 统一 ChatResponse -> GenerateContentResponse
pub fn to_gemini_chat_response(response: &ChatResponse) -> GeminiGenerateContentResponse {
    let candidates = response
        .choices
        .iter()
        .map(|choice| {
            let mut parts: Vec<GeminiPart> = choice
                .message
                .reasoning_details
                .iter()
                .filter(|detail| detail.kind == ReasoningDetailKind::Text)
                .filter_map(|detail| detail.text.clone())
                .map(GeminiPart::thought)
                .collect();
            parts.extend(message_parts(&choice.message));

            GeminiCandidate {
                content: Some(GeminiContent::new(ROLE_MODEL, parts)),
                finish_reason: choice.finish_reason.as_ref().map(finish_reason_to_gemini),
                index: Some(choice.index),
                ..Default::default()
            }
        })
        .collect();

    GeminiGenerateContentResponse {
        candidates,
        usage_metadata: response.usage.as_ref().map(usage_to_gemini),
        model_version: response.model.clone(),
        response_id: response.id.clone(),
        ..Default::default()
    }
}

/// FinishReason 文本 -> 通用 FinishReason
pub fn finish_reason_from_gemini(reason: &str) -> FinishReason {
    match reason {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::Length,
        "MALFORMED_FUNCTION_CALL" => FinishReason::Error,
        other if CONTENT_FILTER_REASONS.contains(&other) => FinishReason::ContentFilter,
        other => FinishReason::Other(other.to_string()),
    }
}

/// 通用 FinishReason -> FinishReason 文本
pub fn finish_reason_to_gemini(reason: &FinishReason) -> String {
    match reason {
        // Gemini 对工具调用同样返回 STOP
        FinishReason::Stop | FinishReason::ToolCalls => "STOP".to_string(),
        FinishReason::Length => "MAX_TOKENS".to_string(),
        FinishReason::ContentFilter => "SAFETY".to_string(),
        FinishReason::Error => "OTHER".to_string(),
        FinishReason::Other(other) => other.clone(),
    }
}

fn message_to_content(message: &Message) -> Option<GeminiContent> {
    let role = if message.role.as_str() == ROLE_USER {
        ROLE_USER
    } else {
        ROLE_MODEL
    };

    let parts = if message.role.as_str() == "tool" {
        vec![tool_result_part(message)]
    } else {
        message_parts(message)
    };

    if parts.is_empty() {
        None
    } else {
        Some(GeminiContent::new(role, parts))
    }
}

/// 文本与媒体在前，函数调用在后
fn message_parts(message: &Message) -> Vec<GeminiPart> {
    let mut parts: Vec<GeminiPart> = message.content.iter().map(content_part_to_gemini).collect();

    // 无 id 的签名属于首个文本 part
    if let Some(signature) = message
        .reasoning_details
        .iter()
        .find(|detail| detail.kind == ReasoningDetailKind::Encrypted && detail.id.is_none())
        .and_then(|detail| detail.signature.clone())
    {
        if let Some(first_text) = parts.iter_mut().find(|part| part.text.is_some()) {
            first_text.thought_signature = Some(signature);
        }
    }

    for call in &message.tool_calls {
        let id = call
            .id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(&call.name)
            .to_string();
        let args = serde_json::from_str::<Map<String, Value>>(&call.arguments).unwrap_or_default();
        let signature = signature_for_call(&id, &message.reasoning_details);
        parts.push(GeminiPart::function_call(
            GeminiFunctionCall {
                id: Some(id),
                name: call.name.clone(),
                args,
            },
            signature,
        ));
    }
    parts
}

fn signature_for_call(call_id: &str, details: &[ReasoningDetail]) -> Option<String> {
    let key = tool_call_signature_key(call_id);
    details
        .iter()
        .find(|detail| {
            detail.kind == ReasoningDetailKind::Encrypted && detail.id.as_deref() == Some(&key)
        })
        .and_then(|detail| detail.signature.clone())
}

/// tool 消息 -> functionResponse，Gemini 以 name 关联调用
fn tool_result_part(message: &Message) -> GeminiPart {
    let call_id = message.tool_call_id.clone().unwrap_or_default();
    let raw = message.joined_text("\n").unwrap_or_default();
    let response = if raw.is_empty() {
        Map::new()
    } else {
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            _ => {
                let mut wrapped = Map::new();
                wrapped.insert("content".to_string(), Value::String(raw));
                wrapped
            }
        }
    };

    GeminiPart::function_response(GeminiFunctionResponse {
        id: Some(call_id.clone()),
        name: call_id,
        response,
    })
}

fn build_generation_config(
    request: &ChatRequest,
    defaults: &ReasoningDefaults,
    extra: &mut ExtraParams,
) -> Option<GeminiGenerationConfig> {
    let options = &request.options;
    let mut config = GeminiGenerationConfig {
        temperature: options.temperature,
        top_p: options.top_p,
        top_k: extra.take(ParamKey::TopK).and_then(|value| value.as_i64()),
        candidate_count: options.n,
        max_output_tokens: options.max_output_tokens,
        stop_sequences: options.stop.clone(),
        presence_penalty: options.presence_penalty,
        frequency_penalty: options.frequency_penalty,
        seed: options.seed,
        ..Default::default()
    };

    match &request.response_format {
        Some(ResponseFormat::JsonSchema { schema, .. }) => {
            config.response_mime_type = Some(JSON_MIME.to_string());
            config.response_schema = Some(normalize_schema(schema));
        }
        Some(ResponseFormat::JsonObject) => {
            config.response_mime_type = Some(JSON_MIME.to_string());
        }
        Some(ResponseFormat::Text) | None => {}
    }

    if let Some(spec) = &options.reasoning {
        let max_tokens = options
            .max_output_tokens
            .map(|tokens| i32::try_from(tokens).unwrap_or(i32::MAX))
            .unwrap_or(defaults.default_max_output_tokens);
        config.thinking_config =
            thinking_config_for(&request.model, spec, defaults.min_budget_tokens, max_tokens);
    }

    if config == GeminiGenerationConfig::default() {
        None
    } else {
        Some(config)
    }
}

fn options_from_generation_config(
    config: &GeminiGenerationConfig,
    defaults: &ReasoningDefaults,
    extra: &mut ExtraParams,
) -> ChatOptions {
    if let Some(top_k) = config.top_k {
        extra.set(ParamKey::TopK, top_k.into());
    }

    let max_tokens = config
        .max_output_tokens
        .map(|tokens| i32::try_from(tokens).unwrap_or(i32::MAX))
        .unwrap_or(defaults.default_max_output_tokens);
    let reasoning = config.thinking_config.as_ref().and_then(|thinking| {
        reasoning_from_thinking_config(thinking, defaults.min_budget_tokens, max_tokens)
    });

    ChatOptions {
        temperature: config.temperature,
        top_p: config.top_p,
        max_output_tokens: config.max_output_tokens,
        stop: config.stop_sequences.clone(),
        presence_penalty: config.presence_penalty,
        frequency_penalty: config.frequency_penalty,
        seed: config.seed,
        n: config.candidate_count,
        reasoning,
        extra: ExtraParams::new(),
    }
}

fn tool_to_declaration(tool: &ToolDefinition) -> GeminiFunctionDeclaration {
    GeminiFunctionDeclaration {
        name: tool.name.clone(),
        description: tool.description.clone(),
        parameters: tool.input_schema.as_ref().map(normalize_schema),
    }
}

fn tool_choice_to_config(choice: &ToolChoice) -> GeminiToolConfig {
    let (mode, allowed_function_names) = match choice {
        ToolChoice::None => ("NONE", Vec::new()),
        ToolChoice::Auto => ("AUTO", Vec::new()),
        ToolChoice::Any => ("ANY", Vec::new()),
        ToolChoice::Tool { name } => ("ANY", vec![name.clone()]),
    };
    GeminiToolConfig {
        function_calling_config: Some(GeminiFunctionCallingConfig {
            mode: Some(mode.to_string()),
            allowed_function_names,
        }),
    }
}

fn tool_choice_from_config(config: &GeminiFunctionCallingConfig) -> Option<ToolChoice> {
    match config.mode.as_deref().map(str::to_ascii_uppercase).as_deref() {
        Some("NONE") => Some(ToolChoice::None),
        Some("AUTO") => Some(ToolChoice::Auto),
        Some("ANY") | Some("VALIDATED") => match config.allowed_function_names.as_slice() {
            [name] => Some(ToolChoice::Tool { name: name.clone() }),
            _ => Some(ToolChoice::Any),
        },
        _ => None,
    }
}

fn is_model_role(role: Option<&str>) -> bool {
    matches!(role, Some(ROLE_MODEL) | Some("assistant"))
}

/// 单个 Gemini content 还原为一条或多条消息
///
/// functionResponse 拆为独立的 tool 消息，按出现顺序排在所属消息之前。
fn content_to_messages(content: &GeminiContent, messages: &mut Vec<Message>) {
    let from_model = is_model_role(content.role.as_deref());
    let role = match content.role.as_deref() {
        None | Some(ROLE_USER) => Role::user(),
        Some(role) if is_model_role(Some(role)) => Role::assistant(),
        Some(other) => Role(other.to_string()),
    };

    let mut message = Message {
        role,
        ..Default::default()
    };

    for part in &content.parts {
        match part.payload() {
            PartPayload::Text { text, thought } => {
                if thought && from_model {
                    message.reasoning_details.push(ReasoningDetail {
                        id: None,
                        kind: ReasoningDetailKind::Text,
                        text: Some(text.to_string()),
                        signature: None,
                        index: message.reasoning_details.len(),
                    });
                } else {
                    message.content.push(ContentPart::Text(TextContent {
                        text: text.to_string(),
                    }));
                }
            }
            PartPayload::FunctionCall(call) if from_model => {
                let id = call
                    .id
                    .as_deref()
                    .filter(|id| !id.trim().is_empty())
                    .unwrap_or(&call.name)
                    .to_string();
                if let Some(signature) = &part.thought_signature {
                    message.reasoning_details.push(ReasoningDetail {
                        id: Some(tool_call_signature_key(&id)),
                        kind: ReasoningDetailKind::Encrypted,
                        text: None,
                        signature: Some(signature.clone()),
                        index: message.reasoning_details.len(),
                    });
                }
                message.tool_calls.push(ToolCall {
                    id: Some(id),
                    name: call.name.clone(),
                    arguments: serde_json::to_string(&call.args)
                        .unwrap_or_else(|_| "{}".to_string()),
                });
            }
            PartPayload::FunctionCall(_) => {}
            PartPayload::FunctionResponse(response) => {
                let call_id = match response.id.as_deref().filter(|id| !id.trim().is_empty()) {
                    Some(id) => id.to_string(),
                    // 无 id 时按函数名回溯同一 content 中的调用
                    None => message
                        .tool_calls
                        .iter()
                        .find(|call| call.name == response.name)
                        .and_then(|call| call.id.clone())
                        .unwrap_or_else(|| response.name.clone()),
                };
                let body = serde_json::to_string(&response.response)
                    .unwrap_or_else(|_| "{}".to_string());
                messages.push(Message {
                    role: Role::tool(),
                    name: Some(response.name.clone()),
                    content: vec![ContentPart::Text(TextContent { text: body })],
                    tool_call_id: Some(call_id),
                    ..Default::default()
                });
            }
            PartPayload::InlineData(blob) => {
                if let Some(converted) = inline_to_content_part(blob) {
                    message.content.push(converted);
                }
            }
            PartPayload::FileData(file) => message.content.push(file_to_content_part(file)),
            PartPayload::ExecutableCode(code) => {
                let language = code.get("language").and_then(Value::as_str).unwrap_or("");
                let source = code.get("code").and_then(Value::as_str).unwrap_or("");
                message.content.push(ContentPart::Text(TextContent {
                    text: format!("```{}\n{source}\n```", language.to_ascii_lowercase()),
                }));
            }
            PartPayload::CodeExecutionResult(result) => {
                let outcome = result.get("outcome").and_then(Value::as_str).unwrap_or("");
                let output = result.get("output").and_then(Value::as_str).unwrap_or("");
                message.content.push(ContentPart::Text(TextContent {
                    text: format!("Code execution result ({outcome}):\n{output}"),
                }));
            }
            PartPayload::Empty => {}
        }

        if !matches!(part.payload(), PartPayload::FunctionCall(_)) {
            if let Some(signature) = &part.thought_signature {
                push_content_signature(&mut message, signature);
            }
        }
    }

    if !message.content.is_empty()
        || !message.tool_calls.is_empty()
        || !message.reasoning_details.is_empty()
    {
        messages.push(message);
    }
}

fn push_content_signature(message: &mut Message, signature: &str) {
    let already_present = message
        .reasoning_details
        .iter()
        .any(|detail| detail.kind == ReasoningDetailKind::Encrypted && detail.id.is_none());
    if already_present {
        return;
    }
    message.reasoning_details.push(ReasoningDetail {
        id: None,
        kind: ReasoningDetailKind::Encrypted,
        text: None,
        signature: Some(signature.to_string()),
        index: message.reasoning_details.len(),
    });
}

fn candidate_to_choice(
    candidate: &GeminiCandidate,
    position: usize,
) -> Result<ChatChoice, BridgeError> {
    let Some(parts) = candidate.parts() else {
        let message = candidate
            .finish_message
            .clone()
            .unwrap_or_else(|| "Gemini candidate contains no content parts".to_string());
        return Err(BridgeError::upstream(candidate.finish_reason.clone(), message));
    };

    let mut message = Message {
        role: Role::assistant(),
        ..Default::default()
    };
    let mut text = String::new();
    let mut media = Vec::new();

    for part in parts {
        match part.payload() {
            PartPayload::Text { text: chunk, thought: true } => {
                message.reasoning_details.push(ReasoningDetail {
                    id: None,
                    kind: ReasoningDetailKind::Text,
                    text: Some(chunk.to_string()),
                    signature: None,
                    index: message.reasoning_details.len(),
                });
            }
            PartPayload::Text { text: chunk, .. } => text.push_str(chunk),
            PartPayload::FunctionCall(call) => {
                let id = call
                    .id
                    .as_deref()
                    .filter(|id| !id.trim().is_empty())
                    .unwrap_or(&call.name)
                    .to_string();
                if let Some(signature) = &part.thought_signature {
                    message.reasoning_details.push(ReasoningDetail {
                        id: Some(tool_call_signature_key(&id)),
                        kind: ReasoningDetailKind::Encrypted,
                        text: None,
                        signature: Some(signature.clone()),
                        index: message.reasoning_details.len(),
                    });
                }
                message.tool_calls.push(ToolCall {
                    id: Some(id),
                    name: call.name.clone(),
                    arguments: serde_json::to_string(&call.args)
                        .unwrap_or_else(|_| "{}".to_string()),
                });
                continue;
            }
            PartPayload::InlineData(blob) => media.extend(inline_to_content_part(blob)),
            PartPayload::FileData(file) => media.push(file_to_content_part(file)),
            _ => {}
        }
        if let Some(signature) = &part.thought_signature {
            push_content_signature(&mut message, signature);
        }
    }

    if !text.is_empty() {
        message.content.push(ContentPart::Text(TextContent { text }));
    }
    message.content.extend(media);

    let finish_reason = if message.tool_calls.is_empty() {
        candidate
            .finish_reason
            .as_deref()
            .map(finish_reason_from_gemini)
    } else {
        Some(FinishReason::ToolCalls)
    };

    Ok(ChatChoice {
        index: candidate.index.unwrap_or(position),
        message,
        finish_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ReasoningEffort, ReasoningSpec};
    use serde_json::json;

    fn defaults() -> ReasoningDefaults {
        ReasoningDefaults::default()
    }

    fn assistant_with_call(signature: Option<&str>) -> Message {
        Message {
            role: Role::assistant(),
            content: vec![ContentPart::Text(TextContent {
                text: "checking".into(),
            })],
            tool_calls: vec![ToolCall {
                id: Some("call_1".into()),
                name: "lookup".into(),
                arguments: r#"{"q":"rust"}"#.into(),
            }],
            reasoning_details: signature
                .map(|sig| {
                    vec![ReasoningDetail {
                        id: Some(tool_call_signature_key("call_1")),
                        kind: ReasoningDetailKind::Encrypted,
                        text: None,
                        signature: Some(sig.into()),
                        index: 0,
                    }]
                })
                .unwrap_or_default(),
            ..Default::default()
        }
    }

    #[test]
    fn system_messages_fold_into_instruction() {
        let request = ChatRequest {
            model: "gemini-2.0-flash".into(),
            messages: vec![
                Message::text(Role::system(), "be terse"),
                Message::text(Role("developer".into()), "use metric"),
                Message::text(Role::user(), "hi"),
            ],
            ..Default::default()
        };
        let gemini = to_gemini_chat_request(&request, &defaults()).expect("request");
        let system = gemini.system_instruction.expect("system");
        assert_eq!(system.parts[0].text.as_deref(), Some("be terse\n\nuse metric"));
        assert_eq!(gemini.contents.len(), 1);
        assert_eq!(gemini.contents[0].role.as_deref(), Some("user"));
        assert!(gemini.generation_config.is_none());
    }

    #[test]
    fn system_only_request_is_rejected() {
        let request = ChatRequest {
            messages: vec![Message::text(Role::system(), "alone")],
            ..Default::default()
        };
        match to_gemini_chat_request(&request, &defaults()) {
            Err(BridgeError::Validation { .. }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn tool_calls_follow_content_and_carry_signature() {
        let request = ChatRequest {
            messages: vec![Message::text(Role::user(), "q"), assistant_with_call(Some("c2ln"))],
            ..Default::default()
        };
        let gemini = to_gemini_chat_request(&request, &defaults()).expect("request");
        let model = &gemini.contents[1];
        assert_eq!(model.role.as_deref(), Some("model"));
        assert_eq!(model.parts[0].text.as_deref(), Some("checking"));
        let call = model.parts[1].function_call.as_ref().expect("call");
        assert_eq!(call.id.as_deref(), Some("call_1"));
        assert_eq!(call.args["q"], "rust");
        assert_eq!(model.parts[1].thought_signature.as_deref(), Some("c2ln"));
    }

    #[test]
    fn signature_requires_encrypted_kind() {
        let mut message = assistant_with_call(Some("c2ln"));
        message.reasoning_details[0].kind = ReasoningDetailKind::Text;
        let parts = message_parts(&message);
        assert!(parts[1].thought_signature.is_none());
    }

    #[test]
    fn call_without_id_uses_name_and_bad_args_become_empty() {
        let message = Message {
            role: Role::assistant(),
            tool_calls: vec![ToolCall {
                id: None,
                name: "lookup".into(),
                arguments: "not json".into(),
            }],
            ..Default::default()
        };
        let parts = message_parts(&message);
        let call = parts[0].function_call.as_ref().expect("call");
        assert_eq!(call.id.as_deref(), Some("lookup"));
        assert!(call.args.is_empty());
    }

    #[test]
    fn tool_results_decode_or_wrap() {
        let mut tool = Message::text(Role::tool(), r#"{"temp": 21}"#);
        tool.tool_call_id = Some("call_1".into());
        tool.name = Some("lookup".into());
        let response = tool_result_part(&tool).function_response.expect("response");
        assert_eq!(response.id.as_deref(), Some("call_1"));
        assert_eq!(response.name, "call_1");
        assert_eq!(response.response["temp"], 21);

        let mut raw = Message::text(Role::tool(), "sunny");
        raw.tool_call_id = Some("call_2".into());
        let response = tool_result_part(&raw).function_response.expect("response");
        assert_eq!(response.response["content"], "sunny");

        let mut scalar = Message::text(Role::tool(), "42");
        scalar.tool_call_id = Some("call_3".into());
        let response = tool_result_part(&scalar).function_response.expect("response");
        assert_eq!(response.response["content"], "42");

        let empty = Message {
            role: Role::tool(),
            tool_call_id: Some("call_4".into()),
            ..Default::default()
        };
        let response = tool_result_part(&empty).function_response.expect("response");
        assert!(response.response.is_empty());
    }

    #[test]
    fn generation_config_maps_options_and_side_channel() {
        let mut extra = ExtraParams::new();
        extra.insert("top_k", json!(40));
        extra.insert("cachedContent", json!("cachedContents/1"));
        extra.insert("responseLogprobs", json!(true));
        let request = ChatRequest {
            model: "gemini-2.5-flash".into(),
            messages: vec![Message::text(Role::user(), "hi")],
            options: ChatOptions {
                temperature: Some(0.2),
                max_output_tokens: Some(2048),
                stop: vec!["END".into()],
                n: Some(2),
                reasoning: Some(ReasoningSpec {
                    effort: Some(ReasoningEffort::High),
                    max_tokens: Some(5000),
                }),
                extra,
                ..Default::default()
            },
            response_format: Some(ResponseFormat::JsonSchema {
                name: Some("out".into()),
                schema: json!({"type": "OBJECT", "properties": {"v": {"type": ["string", "integer"]}}}),
                strict: Some(true),
            }),
            ..Default::default()
        };

        let gemini = to_gemini_chat_request(&request, &defaults()).expect("request");
        let config = gemini.generation_config.as_ref().expect("config");
        assert_eq!(config.top_k, Some(40));
        assert_eq!(config.candidate_count, Some(2));
        assert_eq!(config.response_mime_type.as_deref(), Some("application/json"));
        let schema = config.response_schema.as_ref().expect("schema");
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"]["v"].get("anyOf").is_some());
        let thinking = config.thinking_config.as_ref().expect("thinking");
        assert_eq!(thinking.thinking_budget, Some(5000));

        assert_eq!(gemini.cached_content.as_deref(), Some("cachedContents/1"));
        assert_eq!(gemini.extra.get("responseLogprobs"), Some(&json!(true)));
        assert!(!gemini.extra.contains_key("top_k"));
        assert!(!gemini.extra.contains_key("cachedContent"));
    }

    #[test]
    fn tool_choice_modes() {
        let named = tool_choice_to_config(&ToolChoice::Tool {
            name: "lookup".into(),
        });
        let calling = named.function_calling_config.expect("config");
        assert_eq!(calling.mode.as_deref(), Some("ANY"));
        assert_eq!(calling.allowed_function_names, vec!["lookup".to_string()]);
        assert_eq!(tool_choice_from_config(&calling), Some(ToolChoice::Tool { name: "lookup".into() }));

        for (choice, mode) in [
            (ToolChoice::None, "NONE"),
            (ToolChoice::Auto, "AUTO"),
            (ToolChoice::Any, "ANY"),
        ] {
            let config = tool_choice_to_config(&choice)
                .function_calling_config
                .expect("config");
            assert_eq!(config.mode.as_deref(), Some(mode));
            assert_eq!(tool_choice_from_config(&config), Some(choice));
        }
    }

    #[test]
    fn decodes_request_with_thoughts_and_function_responses() {
        let request: GeminiGenerationRequest = serde_json::from_value(json!({
            "model": "vertex/gemini-2.5-pro",
            "systemInstruction": {"parts": [{"text": "be terse"}]},
            "contents": [
                {"role": "user", "parts": [{"text": "weather?"}]},
                {"role": "model", "parts": [
                    {"text": "thinking", "thought": true},
                    {"functionCall": {"name": "weather", "args": {"city": "Kyoto"}}, "thoughtSignature": "c2ln"}
                ]},
                {"role": "user", "parts": [
                    {"functionResponse": {"name": "weather", "response": {"temp": 21}}}
                ]}
            ],
            "generationConfig": {
                "topK": 10,
                "maxOutputTokens": 4096,
                "thinkingConfig": {"thinkingBudget": -1}
            },
            "safetySettings": [{"category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_NONE"}]
        }))
        .expect("request");

        let unified = to_unified_chat_request(&request, Provider::gemini(), &defaults());
        assert_eq!(unified.provider, Provider::vertex());
        assert_eq!(unified.model, "gemini-2.5-pro");
        assert_eq!(unified.messages.len(), 4);
        assert_eq!(unified.messages[0].role, Role::system());

        let assistant = &unified.messages[2];
        assert_eq!(assistant.role, Role::assistant());
        assert_eq!(assistant.tool_calls[0].id.as_deref(), Some("weather"));
        assert_eq!(assistant.reasoning_details.len(), 2);
        assert_eq!(assistant.reasoning_details[0].text.as_deref(), Some("thinking"));
        assert_eq!(
            assistant.reasoning_details[1].id.as_deref(),
            Some("tool_call_weather")
        );

        let tool = &unified.messages[3];
        assert_eq!(tool.role, Role::tool());
        assert_eq!(tool.tool_call_id.as_deref(), Some("weather"));

        let reasoning = unified.options.reasoning.expect("reasoning");
        assert_eq!(reasoning.max_tokens, Some(-1));
        assert_eq!(reasoning.effort, Some(ReasoningEffort::Medium));
        assert_eq!(unified.options.extra.get_i64(ParamKey::TopK), Some(10));
        assert!(unified.options.extra.contains(ParamKey::SafetySettings));
    }

    #[test]
    fn zero_candidates_is_an_error() {
        let response = GeminiGenerateContentResponse::default();
        match to_unified_chat_response(&response) {
            Err(err @ BridgeError::MissingField { .. }) => assert!(!err.is_upstream()),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn empty_candidate_reports_finish_reason() {
        let response: GeminiGenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "SAFETY", "finishMessage": "blocked"}]
        }))
        .expect("response");
        match to_unified_chat_response(&response) {
            Err(BridgeError::Upstream { code, message }) => {
                assert_eq!(code.as_deref(), Some("SAFETY"));
                assert_eq!(message, "blocked");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn response_collects_text_thoughts_and_calls() {
        let response: GeminiGenerateContentResponse = serde_json::from_value(json!({
            "responseId": "resp-1",
            "modelVersion": "gemini-2.5-flash",
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "plan", "thought": true},
                    {"text": "Hello, "},
                    {"text": "world"},
                    {"functionCall": {"id": "c1", "name": "lookup", "args": {}}, "thoughtSignature": "c2ln"}
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 5, "totalTokenCount": 8, "thoughtsTokenCount": 2}
        }))
        .expect("response");

        let unified = to_unified_chat_response(&response).expect("unified");
        assert_eq!(unified.id.as_deref(), Some("resp-1"));
        let choice = &unified.choices[0];
        assert_eq!(choice.message.joined_text("").as_deref(), Some("Hello, world"));
        assert_eq!(choice.finish_reason, Some(FinishReason::ToolCalls));
        assert_eq!(choice.message.tool_calls[0].arguments, "{}");
        assert_eq!(choice.message.reasoning_details.len(), 2);
        assert_eq!(unified.usage.as_ref().and_then(|u| u.reasoning_tokens), Some(2));

        let back = to_gemini_chat_response(&unified);
        let parts = back.candidates[0].parts().expect("parts");
        assert_eq!(parts[0].thought, Some(true));
        assert_eq!(parts[1].text.as_deref(), Some("Hello, world"));
        assert_eq!(parts[2].thought_signature.as_deref(), Some("c2ln"));
        assert_eq!(back.candidates[0].finish_reason.as_deref(), Some("STOP"));
        assert_eq!(
            back.usage_metadata.as_ref().and_then(|u| u.thoughts_token_count),
            Some(2)
        );
    }

    #[test]
    fn finish_reason_table() {
        assert_eq!(finish_reason_from_gemini("MAX_TOKENS"), FinishReason::Length);
        assert_eq!(finish_reason_from_gemini("SPII"), FinishReason::ContentFilter);
        assert_eq!(
            finish_reason_from_gemini("FINISH_REASON_UNSPECIFIED"),
            FinishReason::Other("FINISH_REASON_UNSPECIFIED".into())
        );
        assert_eq!(finish_reason_to_gemini(&FinishReason::ContentFilter), "SAFETY");
    }
}
