//! Gemini / Imagen 线上协议结构
//!
//! 字段统一使用 camelCase 序列化，同时接受 snake_case 别名；未识别字段透传到 `extra`。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// GenerateContent 请求体
///
/// 同一结构也用于解码 Imagen 风格 (`instances`/`parameters`) 的图片请求。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeminiGenerationRequest {
    /// 模型名仅出现在 URL 中，反序列化时允许从 body 读取
    #[serde(default, skip_serializing)]
    pub model: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contents: Vec<GeminiContent>,
    #[serde(
        default,
        rename = "systemInstruction",
        alias = "system_instruction",
        skip_serializing_if = "Option::is_none"
    )]
    pub system_instruction: Option<GeminiContent>,
    #[serde(
        default,
        rename = "generationConfig",
        alias = "generation_config",
        skip_serializing_if = "Option::is_none"
    )]
    pub generation_config: Option<GeminiGenerationConfig>,
    #[serde(
        default,
        rename = "safetySettings",
        alias = "safety_settings",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub safety_settings: Vec<GeminiSafetySetting>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<GeminiTool>,
    #[serde(
        default,
        rename = "toolConfig",
        alias = "tool_config",
        skip_serializing_if = "Option::is_none"
    )]
    pub tool_config: Option<GeminiToolConfig>,
    #[serde(
        default,
        rename = "cachedContent",
        alias = "cached_content",
        skip_serializing_if = "Option::is_none"
    )]
    pub cached_content: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    /// Imagen 风格请求
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instances: Vec<ImagenInstance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ImagenParameters>,
    /// 透传到请求体顶层的其它字段
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl GeminiGenerationRequest {
    /// 按顺序拼接所有 content 中的全部文本 part
    pub fn flat_prompt(&self) -> String {
        self.contents
            .iter()
            .flat_map(|content| content.parts.iter())
            .filter_map(|part| part.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

/// 带角色的有序 part 列表
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl GeminiContent {
    pub fn new(role: &str, parts: Vec<GeminiPart>) -> Self {
        Self {
            role: Some(role.to_string()),
            parts,
            extra: HashMap::new(),
        }
    }
}

/// Content.part，多模态内容单元，任一时刻只携带一种负载
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// 标记该文本为思考内容
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
    /// 不透明的思考签名（base64），需原样回传
    #[serde(
        default,
        rename = "thoughtSignature",
        alias = "thought_signature",
        skip_serializing_if = "Option::is_none"
    )]
    pub thought_signature: Option<String>,
    #[serde(
        default,
        rename = "inlineData",
        alias = "inline_data",
        skip_serializing_if = "Option::is_none"
    )]
    pub inline_data: Option<GeminiBlob>,
    #[serde(
        default,
        rename = "fileData",
        alias = "file_data",
        skip_serializing_if = "Option::is_none"
    )]
    pub file_data: Option<GeminiFileData>,
    #[serde(
        default,
        rename = "functionCall",
        alias = "function_call",
        skip_serializing_if = "Option::is_none"
    )]
    pub function_call: Option<GeminiFunctionCall>,
    #[serde(
        default,
        rename = "functionResponse",
        alias = "function_response",
        skip_serializing_if = "Option::is_none"
    )]
    pub function_response: Option<GeminiFunctionResponse>,
    #[serde(
        default,
        rename = "executableCode",
        alias = "executable_code",
        skip_serializing_if = "Option::is_none"
    )]
    pub executable_code: Option<Value>,
    #[serde(
        default,
        rename = "codeExecutionResult",
        alias = "code_execution_result",
        skip_serializing_if = "Option::is_none"
    )]
    pub code_execution_result: Option<Value>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// 对 [`GeminiPart`] 负载的只读视图
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PartPayload<'a> {
    Text { text: &'a str, thought: bool },
    InlineData(&'a GeminiBlob),
    FileData(&'a GeminiFileData),
    FunctionCall(&'a GeminiFunctionCall),
    FunctionResponse(&'a GeminiFunctionResponse),
    ExecutableCode(&'a Value),
    CodeExecutionResult(&'a Value),
    Empty,
}

impl GeminiPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn thought(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            thought: Some(true),
            ..Default::default()
        }
    }

    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            inline_data: Some(GeminiBlob {
                mime_type: mime_type.into(),
                data: data.into(),
            }),
            ..Default::default()
        }
    }

    pub fn file(mime_type: Option<String>, file_uri: impl Into<String>) -> Self {
        Self {
            file_data: Some(GeminiFileData {
                mime_type,
                file_uri: file_uri.into(),
            }),
            ..Default::default()
        }
    }

    pub fn function_call(call: GeminiFunctionCall, thought_signature: Option<String>) -> Self {
        Self {
            function_call: Some(call),
            thought_signature,
            ..Default::default()
        }
    }

    pub fn function_response(response: GeminiFunctionResponse) -> Self {
        Self {
            function_response: Some(response),
            ..Default::default()
        }
    }

    /// 按 Gemini 的优先顺序返回该 part 携带的负载
    pub fn payload(&self) -> PartPayload<'_> {
        if let Some(call) = &self.function_call {
            return PartPayload::FunctionCall(call);
        }
        if let Some(response) = &self.function_response {
            return PartPayload::FunctionResponse(response);
        }
        if let Some(blob) = &self.inline_data {
            return PartPayload::InlineData(blob);
        }
        if let Some(file) = &self.file_data {
            return PartPayload::FileData(file);
        }
        if let Some(code) = &self.executable_code {
            return PartPayload::ExecutableCode(code);
        }
        if let Some(result) = &self.code_execution_result {
            return PartPayload::CodeExecutionResult(result);
        }
        if let Some(text) = &self.text {
            return PartPayload::Text {
                text: text.as_str(),
                thought: self.thought.unwrap_or(false),
            };
        }
        PartPayload::Empty
    }
}

/// InlineData，data 为 base64
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeminiBlob {
    #[serde(rename = "mimeType", alias = "mime_type", default)]
    pub mime_type: String,
    #[serde(default)]
    pub data: String,
}

/// FileData
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeminiFileData {
    #[serde(
        rename = "mimeType",
        alias = "mime_type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub mime_type: Option<String>,
    #[serde(rename = "fileUri", alias = "file_uri")]
    pub file_uri: String,
}

/// 函数调用
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeminiFunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Map<String, Value>,
}

/// 函数调用响应
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeminiFunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub response: serde_json::Map<String, Value>,
}

/// generationConfig
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeminiGenerationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(
        default,
        rename = "topP",
        alias = "top_p",
        skip_serializing_if = "Option::is_none"
    )]
    pub top_p: Option<f64>,
    #[serde(
        default,
        rename = "topK",
        alias = "top_k",
        skip_serializing_if = "Option::is_none"
    )]
    pub top_k: Option<i64>,
    #[serde(
        default,
        rename = "candidateCount",
        alias = "candidate_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub candidate_count: Option<u32>,
    #[serde(
        default,
        rename = "maxOutputTokens",
        alias = "max_output_tokens",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_output_tokens: Option<u32>,
    #[serde(
        default,
        rename = "stopSequences",
        alias = "stop_sequences",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub stop_sequences: Vec<String>,
    #[serde(
        default,
        rename = "presencePenalty",
        alias = "presence_penalty",
        skip_serializing_if = "Option::is_none"
    )]
    pub presence_penalty: Option<f64>,
    #[serde(
        default,
        rename = "frequencyPenalty",
        alias = "frequency_penalty",
        skip_serializing_if = "Option::is_none"
    )]
    pub frequency_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(
        default,
        rename = "responseMimeType",
        alias = "response_mime_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub response_mime_type: Option<String>,
    #[serde(
        default,
        rename = "responseSchema",
        alias = "response_schema",
        skip_serializing_if = "Option::is_none"
    )]
    pub response_schema: Option<Value>,
    #[serde(
        default,
        rename = "responseModalities",
        alias = "response_modalities",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub response_modalities: Vec<String>,
    #[serde(
        default,
        rename = "thinkingConfig",
        alias = "thinking_config",
        skip_serializing_if = "Option::is_none"
    )]
    pub thinking_config: Option<GeminiThinkingConfig>,
    #[serde(
        default,
        rename = "speechConfig",
        alias = "speech_config",
        skip_serializing_if = "Option::is_none"
    )]
    pub speech_config: Option<GeminiSpeechConfig>,
    #[serde(
        default,
        rename = "imageConfig",
        alias = "image_config",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_config: Option<GeminiImageConfig>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// thinkingConfig
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiThinkingConfig {
    #[serde(
        default,
        rename = "includeThoughts",
        alias = "include_thoughts",
        skip_serializing_if = "Option::is_none"
    )]
    pub include_thoughts: Option<bool>,
    /// 0 关闭思考，-1 动态 budget
    #[serde(
        default,
        rename = "thinkingBudget",
        alias = "thinking_budget",
        skip_serializing_if = "Option::is_none"
    )]
    pub thinking_budget: Option<i32>,
    #[serde(
        default,
        rename = "thinkingLevel",
        alias = "thinking_level",
        skip_serializing_if = "Option::is_none"
    )]
    pub thinking_level: Option<ThinkingLevel>,
}

/// Gemini 3 及以上模型的离散思考档位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThinkingLevel {
    Minimal,
    Low,
    Medium,
    High,
}

/// speechConfig
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiSpeechConfig {
    #[serde(
        default,
        rename = "voiceConfig",
        alias = "voice_config",
        skip_serializing_if = "Option::is_none"
    )]
    pub voice_config: Option<GeminiVoiceConfig>,
    #[serde(
        default,
        rename = "multiSpeakerVoiceConfig",
        alias = "multi_speaker_voice_config",
        skip_serializing_if = "Option::is_none"
    )]
    pub multi_speaker_voice_config: Option<GeminiMultiSpeakerVoiceConfig>,
    #[serde(
        default,
        rename = "languageCode",
        alias = "language_code",
        skip_serializing_if = "Option::is_none"
    )]
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiVoiceConfig {
    #[serde(
        default,
        rename = "prebuiltVoiceConfig",
        alias = "prebuilt_voice_config",
        skip_serializing_if = "Option::is_none"
    )]
    pub prebuilt_voice_config: Option<GeminiPrebuiltVoiceConfig>,
}

impl GeminiVoiceConfig {
    pub fn prebuilt(voice_name: impl Into<String>) -> Self {
        Self {
            prebuilt_voice_config: Some(GeminiPrebuiltVoiceConfig {
                voice_name: voice_name.into(),
            }),
        }
    }

    pub fn voice_name(&self) -> Option<&str> {
        self.prebuilt_voice_config
            .as_ref()
            .map(|config| config.voice_name.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiPrebuiltVoiceConfig {
    #[serde(rename = "voiceName", alias = "voice_name")]
    pub voice_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiMultiSpeakerVoiceConfig {
    #[serde(
        default,
        rename = "speakerVoiceConfigs",
        alias = "speaker_voice_configs"
    )]
    pub speaker_voice_configs: Vec<GeminiSpeakerVoiceConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiSpeakerVoiceConfig {
    pub speaker: String,
    #[serde(rename = "voiceConfig", alias = "voice_config")]
    pub voice_config: GeminiVoiceConfig,
}

/// imageConfig
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiImageConfig {
    #[serde(
        default,
        rename = "aspectRatio",
        alias = "aspect_ratio",
        skip_serializing_if = "Option::is_none"
    )]
    pub aspect_ratio: Option<String>,
    #[serde(
        default,
        rename = "imageSize",
        alias = "image_size",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_size: Option<String>,
}

/// 安全设置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiSafetySetting {
    pub category: String,
    pub threshold: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// 工具声明
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeminiTool {
    #[serde(
        default,
        rename = "functionDeclarations",
        alias = "function_declarations",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub function_declarations: Vec<GeminiFunctionDeclaration>,
    /// googleSearch / codeExecution 等内置工具原样透传
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeminiFunctionDeclaration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

/// toolConfig
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiToolConfig {
    #[serde(
        default,
        rename = "functionCallingConfig",
        alias = "function_calling_config",
        skip_serializing_if = "Option::is_none"
    )]
    pub function_calling_config: Option<GeminiFunctionCallingConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiFunctionCallingConfig {
    /// NONE / AUTO / ANY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(
        default,
        rename = "allowedFunctionNames",
        alias = "allowed_function_names",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub allowed_function_names: Vec<String>,
}

/// GenerateContentResponse 顶层结构
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeminiGenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    #[serde(
        default,
        rename = "promptFeedback",
        alias = "prompt_feedback",
        skip_serializing_if = "Option::is_none"
    )]
    pub prompt_feedback: Option<Value>,
    #[serde(
        default,
        rename = "usageMetadata",
        alias = "usage_metadata",
        skip_serializing_if = "Option::is_none"
    )]
    pub usage_metadata: Option<GeminiUsageMetadata>,
    #[serde(
        default,
        rename = "modelVersion",
        alias = "model_version",
        skip_serializing_if = "Option::is_none"
    )]
    pub model_version: Option<String>,
    #[serde(
        default,
        rename = "responseId",
        alias = "response_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub response_id: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// 单个候选回答
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeminiCandidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<GeminiContent>,
    #[serde(
        default,
        rename = "finishReason",
        alias = "finish_reason",
        skip_serializing_if = "Option::is_none"
    )]
    pub finish_reason: Option<String>,
    #[serde(
        default,
        rename = "finishMessage",
        alias = "finish_message",
        skip_serializing_if = "Option::is_none"
    )]
    pub finish_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// safetyRatings / citationMetadata 等
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl GeminiCandidate {
    /// 候选的 part 列表，content 缺失或为空时返回 None
    pub fn parts(&self) -> Option<&[GeminiPart]> {
        self.content
            .as_ref()
            .map(|content| content.parts.as_slice())
            .filter(|parts| !parts.is_empty())
    }
}

/// UsageMetadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeminiUsageMetadata {
    #[serde(
        rename = "promptTokenCount",
        alias = "prompt_token_count",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub prompt_token_count: Option<u64>,
    #[serde(
        rename = "cachedContentTokenCount",
        alias = "cached_content_token_count",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cached_content_token_count: Option<u64>,
    #[serde(
        rename = "candidatesTokenCount",
        alias = "candidates_token_count",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub candidates_token_count: Option<u64>,
    #[serde(
        rename = "totalTokenCount",
        alias = "total_token_count",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub total_token_count: Option<u64>,
    #[serde(
        rename = "toolUsePromptTokenCount",
        alias = "tool_use_prompt_token_count",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub tool_use_prompt_token_count: Option<u64>,
    #[serde(
        rename = "thoughtsTokenCount",
        alias = "thoughts_token_count",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub thoughts_token_count: Option<u64>,
    #[serde(
        rename = "promptTokensDetails",
        alias = "prompt_tokens_details",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub prompt_tokens_details: Vec<GeminiModalityTokenCount>,
    #[serde(
        rename = "candidatesTokensDetails",
        alias = "candidates_tokens_details",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub candidates_tokens_details: Vec<GeminiModalityTokenCount>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// 单一模态的 token 统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiModalityTokenCount {
    pub modality: String,
    #[serde(rename = "tokenCount", alias = "token_count", default)]
    pub token_count: u64,
}

/// Imagen :predict 请求体
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagenPredictRequest {
    pub instances: Vec<ImagenInstance>,
    pub parameters: ImagenParameters,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagenInstance {
    #[serde(default)]
    pub prompt: String,
    /// 编辑请求的原图与蒙版
    #[serde(
        default,
        rename = "referenceImages",
        alias = "reference_images",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub reference_images: Vec<ImagenReferenceImage>,
}

pub const REFERENCE_TYPE_RAW: &str = "REFERENCE_TYPE_RAW";
pub const REFERENCE_TYPE_MASK: &str = "REFERENCE_TYPE_MASK";

/// Imagen 编辑用参考图
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagenReferenceImage {
    #[serde(rename = "referenceType", alias = "reference_type", default)]
    pub reference_type: String,
    #[serde(rename = "referenceId", alias = "reference_id", default)]
    pub reference_id: u32,
    #[serde(
        default,
        rename = "referenceImage",
        alias = "reference_image",
        skip_serializing_if = "Option::is_none"
    )]
    pub reference_image: Option<ImagenReferenceData>,
    #[serde(
        default,
        rename = "maskImageConfig",
        alias = "mask_image_config",
        skip_serializing_if = "Option::is_none"
    )]
    pub mask_image_config: Option<ImagenMaskImageConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagenReferenceData {
    #[serde(
        rename = "bytesBase64Encoded",
        alias = "bytes_base64_encoded",
        default
    )]
    pub bytes_base64_encoded: String,
}

/// 蒙版模式、膨胀比例与语义分割类别
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagenMaskImageConfig {
    #[serde(
        default,
        rename = "maskMode",
        alias = "mask_mode",
        skip_serializing_if = "Option::is_none"
    )]
    pub mask_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dilation: Option<f64>,
    #[serde(
        default,
        rename = "maskClasses",
        alias = "mask_classes",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub mask_classes: Vec<i64>,
}

/// Imagen parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagenParameters {
    #[serde(
        default,
        rename = "sampleCount",
        alias = "sample_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub sample_count: Option<u32>,
    #[serde(
        default,
        rename = "sampleImageSize",
        alias = "sample_image_size",
        skip_serializing_if = "Option::is_none"
    )]
    pub sample_image_size: Option<String>,
    #[serde(
        default,
        rename = "aspectRatio",
        alias = "aspect_ratio",
        skip_serializing_if = "Option::is_none"
    )]
    pub aspect_ratio: Option<String>,
    #[serde(
        default,
        rename = "negativePrompt",
        alias = "negative_prompt",
        skip_serializing_if = "Option::is_none"
    )]
    pub negative_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(
        default,
        rename = "personGeneration",
        alias = "person_generation",
        skip_serializing_if = "Option::is_none"
    )]
    pub person_generation: Option<String>,
    #[serde(
        default,
        rename = "safetySettings",
        alias = "safety_settings",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub safety_settings: Vec<GeminiSafetySetting>,
    #[serde(
        default,
        rename = "addWatermark",
        alias = "add_watermark",
        skip_serializing_if = "Option::is_none"
    )]
    pub add_watermark: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(
        default,
        rename = "enhancePrompt",
        alias = "enhance_prompt",
        skip_serializing_if = "Option::is_none"
    )]
    pub enhance_prompt: Option<bool>,
    #[serde(
        default,
        rename = "outputOptions",
        alias = "output_options",
        skip_serializing_if = "Option::is_none"
    )]
    pub output_options: Option<ImagenOutputOptions>,
    #[serde(
        default,
        rename = "editMode",
        alias = "edit_mode",
        skip_serializing_if = "Option::is_none"
    )]
    pub edit_mode: Option<String>,
    #[serde(
        default,
        rename = "guidanceScale",
        alias = "guidance_scale",
        skip_serializing_if = "Option::is_none"
    )]
    pub guidance_scale: Option<i64>,
    #[serde(
        default,
        rename = "baseSteps",
        alias = "base_steps",
        skip_serializing_if = "Option::is_none"
    )]
    pub base_steps: Option<i64>,
    #[serde(
        default,
        rename = "includeRaiReason",
        alias = "include_rai_reason",
        skip_serializing_if = "Option::is_none"
    )]
    pub include_rai_reason: Option<bool>,
    #[serde(
        default,
        rename = "includeSafetyAttributes",
        alias = "include_safety_attributes",
        skip_serializing_if = "Option::is_none"
    )]
    pub include_safety_attributes: Option<bool>,
    #[serde(
        default,
        rename = "storageUri",
        alias = "storage_uri",
        skip_serializing_if = "Option::is_none"
    )]
    pub storage_uri: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagenOutputOptions {
    #[serde(
        default,
        rename = "mimeType",
        alias = "mime_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub mime_type: Option<String>,
    #[serde(
        default,
        rename = "compressionQuality",
        alias = "compression_quality",
        skip_serializing_if = "Option::is_none"
    )]
    pub compression_quality: Option<u32>,
}

/// Imagen :predict 响应体
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagenPredictResponse {
    #[serde(default)]
    pub predictions: Vec<ImagenPrediction>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagenPrediction {
    #[serde(
        default,
        rename = "bytesBase64Encoded",
        alias = "bytes_base64_encoded"
    )]
    pub bytes_base64_encoded: String,
    #[serde(
        default,
        rename = "mimeType",
        alias = "mime_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub mime_type: Option<String>,
    #[serde(
        default,
        rename = "raiFilteredReason",
        alias = "rai_filtered_reason",
        skip_serializing_if = "Option::is_none"
    )]
    pub rai_filtered_reason: Option<String>,
}

/// models.list 响应
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeminiListModelsResponse {
    #[serde(default)]
    pub models: Vec<GeminiModel>,
    #[serde(
        default,
        rename = "nextPageToken",
        alias = "next_page_token",
        skip_serializing_if = "Option::is_none"
    )]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeminiModel {
    /// 形如 `models/gemini-2.0-flash`
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(
        default,
        rename = "displayName",
        alias = "display_name",
        skip_serializing_if = "Option::is_none"
    )]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        rename = "inputTokenLimit",
        alias = "input_token_limit",
        skip_serializing_if = "Option::is_none"
    )]
    pub input_token_limit: Option<u64>,
    #[serde(
        default,
        rename = "outputTokenLimit",
        alias = "output_token_limit",
        skip_serializing_if = "Option::is_none"
    )]
    pub output_token_limit: Option<u64>,
    #[serde(
        default,
        rename = "supportedGenerationMethods",
        alias = "supported_generation_methods",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub supported_generation_methods: Vec<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}
