//! Unified request and response model shared by every modality.
//!
//! These types are provider-agnostic: the translators under [`crate::provider`]
//! convert them to and from a specific upstream wire format.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod extra;

pub use extra::{ExtraParams, ParamKey};

/// Upstream provider identifier, e.g. `gemini` or `vertex`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Provider(pub String);

impl Provider {
    pub fn gemini() -> Self {
        Self("gemini".to_string())
    }

    pub fn vertex() -> Self {
        Self("vertex".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Provider {
    fn default() -> Self {
        Self::gemini()
    }
}

const KNOWN_PROVIDERS: &[&str] = &[
    "gemini",
    "vertex",
    "openai",
    "azure",
    "anthropic",
    "bedrock",
    "cohere",
    "mistral",
    "groq",
    "ollama",
    "openrouter",
];

/// Splits a combined `provider/model` token.
///
/// The prefix is only treated as a provider when it names a known one, so
/// `models/gemini-2.0-flash` keeps its slash and falls back to `default`.
///
/// # Examples
///
/// ```
/// use kotoba_bridge::types::{parse_model_string, Provider};
///
/// let (provider, model) = parse_model_string("vertex/gemini-2.5-pro", Provider::gemini());
/// assert_eq!(provider, Provider::vertex());
/// assert_eq!(model, "gemini-2.5-pro");
///
/// let (provider, model) = parse_model_string("gemini-2.0-flash", Provider::gemini());
/// assert_eq!(provider, Provider::gemini());
/// assert_eq!(model, "gemini-2.0-flash");
/// ```
pub fn parse_model_string(model: &str, default: Provider) -> (Provider, String) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let lower = prefix.to_ascii_lowercase();
        if KNOWN_PROVIDERS.contains(&lower.as_str()) && !rest.is_empty() {
            return (Provider(lower), rest.to_string());
        }
    }
    (default, model.to_string())
}

/// Chat role string compatible with provider-specific semantics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(pub String);

impl Role {
    pub fn system() -> Self {
        Self("system".to_string())
    }

    pub fn user() -> Self {
        Self("user".to_string())
    }

    pub fn assistant() -> Self {
        Self("assistant".to_string())
    }

    pub fn tool() -> Self {
        Self("tool".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Normalized chat message in the OpenAI style.
///
/// Assistant messages carry tool invocations in `tool_calls`; tool messages
/// reference the invocation they answer through `tool_call_id`.
///
/// # Examples
///
/// ```
/// # use kotoba_bridge::types::{ContentPart, Message, Role};
/// let msg = Message::text(Role::user(), "Describe this image");
/// assert_eq!(msg.content.len(), 1);
/// assert!(msg.tool_calls.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role associated with this message.
    pub role: Role,
    /// Optional vendor-specific name attribute.
    #[serde(default)]
    pub name: Option<String>,
    /// Multimodal content parts provided in order.
    #[serde(default)]
    pub content: Vec<ContentPart>,
    /// Tool invocations requested by the assistant.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Invocation answered by a tool message.
    #[serde(default)]
    pub tool_call_id: Option<String>,
    /// Reasoning traces and opaque signatures attached to the message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasoning_details: Vec<ReasoningDetail>,
}

impl Default for Role {
    fn default() -> Self {
        Self::user()
    }
}

impl Message {
    /// Builds a message holding a single text part.
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: vec![ContentPart::Text(TextContent { text: text.into() })],
            ..Default::default()
        }
    }

    /// Concatenates the message's text parts, or `None` when it has none.
    pub fn joined_text(&self, separator: &str) -> Option<String> {
        let texts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text(TextContent { text }) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.join(separator))
        }
    }
}

/// Multimodal content part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text(TextContent),
    Image(ImageContent),
    Audio(AudioContent),
    File(FileContent),
}

/// Textual content payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub text: String,
}

/// Image input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    pub source: ImageSource,
}

/// Source for an image input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageSource {
    /// Remote URL or `data:` URL.
    Url { url: String },
    /// Base64-encoded inline payload.
    Base64 {
        data: String,
        mime_type: Option<String>,
    },
}

/// Base64 audio input, e.g. OpenAI `input_audio`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioContent {
    pub data: String,
    /// Container token such as `wav` or `mp3`.
    pub format: Option<String>,
}

/// File reference resolved by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileContent {
    pub uri: String,
    pub mime_type: Option<String>,
}

/// Tool invocation emitted by the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-supplied invocation identifier.
    pub id: Option<String>,
    /// Function name.
    pub name: String,
    /// JSON-encoded argument object.
    pub arguments: String,
}

/// Kind of a [`ReasoningDetail`] record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReasoningDetailKind {
    #[serde(rename = "reasoning.text")]
    Text,
    #[serde(rename = "reasoning.summary")]
    Summary,
    /// Opaque provider signature that must be echoed back verbatim.
    #[serde(rename = "reasoning.encrypted")]
    Encrypted,
}

/// Reasoning trace or opaque signature attached to a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningDetail {
    /// Lookup key, e.g. `tool_call_<id>` for function-call signatures.
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: ReasoningDetailKind,
    #[serde(default)]
    pub text: Option<String>,
    /// Opaque signature, base64 as transmitted by the provider.
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub index: usize,
}

/// Lookup key under which a tool call's thought signature is stored.
pub fn tool_call_signature_key(call_id: &str) -> String {
    format!("tool_call_{call_id}")
}

/// Declarative definition of a function tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: Option<String>,
    /// JSON Schema describing the argument object.
    pub input_schema: Option<Value>,
}

/// Tool-choice strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// Provider decides when to call tools.
    Auto,
    /// Provider must invoke at least one tool.
    #[serde(alias = "required")]
    Any,
    /// Tools are disabled for the request.
    None,
    /// Force a specific tool by name.
    Tool { name: String },
}

/// Response-formatting modes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    JsonObject,
    JsonSchema {
        name: Option<String>,
        schema: Value,
        strict: Option<bool>,
    },
}

/// Provider-agnostic reasoning effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningEffort {
    None,
    Minimal,
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(self) -> &'static str {
        match self {
            ReasoningEffort::None => "none",
            ReasoningEffort::Minimal => "minimal",
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

/// Requested reasoning configuration.
///
/// When both fields are set, `max_tokens` wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningSpec {
    pub effort: Option<ReasoningEffort>,
    /// Token budget; `0` disables reasoning, `-1` asks for a dynamic budget.
    pub max_tokens: Option<i32>,
}

/// Chat request shared across all providers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub provider: Provider,
    pub model: String,
    /// Ordered list of messages to send.
    pub messages: Vec<Message>,
    #[serde(default)]
    pub options: ChatOptions,
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: Option<ToolChoice>,
    pub response_format: Option<ResponseFormat>,
}

/// Tunable chat options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub max_output_tokens: Option<u32>,
    #[serde(default)]
    pub stop: Vec<String>,
    pub presence_penalty: Option<f64>,
    pub frequency_penalty: Option<f64>,
    pub seed: Option<i64>,
    /// Number of candidates to generate.
    pub n: Option<u32>,
    pub reasoning: Option<ReasoningSpec>,
    /// Provider-specific options such as safety settings or cached content.
    #[serde(default)]
    pub extra: ExtraParams,
}

/// Aggregated chat response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub id: Option<String>,
    pub model: Option<String>,
    pub choices: Vec<ChatChoice>,
    pub usage: Option<TokenUsage>,
}

/// One generated candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatChoice {
    pub index: usize,
    pub message: Message,
    pub finish_reason: Option<FinishReason>,
}

/// Why a response stopped generating content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Error,
    Other(String),
}

/// Token count attributed to one modality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalityTokens {
    /// Modality token such as `TEXT`, `IMAGE` or `AUDIO`.
    pub modality: String,
    pub tokens: u64,
}

/// Token usage metrics collected from the provider.
///
/// # Examples
///
/// ```
/// # use kotoba_bridge::types::TokenUsage;
/// let usage = TokenUsage {
///     prompt_tokens: Some(1200),
///     completion_tokens: Some(200),
///     total_tokens: Some(1400),
///     ..Default::default()
/// };
/// assert_eq!(usage.total_tokens, Some(1400));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
    /// Prompt tokens served from a context cache.
    pub cached_tokens: Option<u64>,
    /// Tokens spent on reasoning.
    pub reasoning_tokens: Option<u64>,
    /// Prompt tokens produced by tool results.
    pub tool_use_prompt_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prompt_modalities: Vec<ModalityTokens>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub completion_modalities: Vec<ModalityTokens>,
}

/// Image generation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageGenerationRequest {
    #[serde(default)]
    pub provider: Provider,
    pub model: String,
    pub prompt: String,
    #[serde(default)]
    pub options: ImageGenerationOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageGenerationOptions {
    /// Number of images requested.
    pub n: Option<u32>,
    /// `WIDTHxHEIGHT` or `auto`.
    pub size: Option<String>,
    /// Output container token such as `png` or `jpeg`.
    pub output_format: Option<String>,
    pub seed: Option<i64>,
    pub negative_prompt: Option<String>,
    #[serde(default)]
    pub extra: ExtraParams,
}

/// Image edit request: source images plus an instruction prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageEditRequest {
    #[serde(default)]
    pub provider: Provider,
    pub model: String,
    pub prompt: String,
    /// Raw bytes of each source image, in order.
    pub images: Vec<Vec<u8>>,
    #[serde(default)]
    pub options: ImageEditOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageEditOptions {
    pub n: Option<u32>,
    pub size: Option<String>,
    pub output_format: Option<String>,
    /// Output compression quality, 0-100.
    pub output_compression: Option<u32>,
    /// Edit kind: `inpainting`, `inpaint_removal`, `outpainting` or `bgswap`.
    #[serde(rename = "type")]
    pub edit_type: Option<String>,
    /// Raw mask bytes; painted regions are edited.
    pub mask: Option<Vec<u8>>,
    pub seed: Option<i64>,
    pub negative_prompt: Option<String>,
    #[serde(default)]
    pub extra: ExtraParams,
}

/// Image generation response.
///
/// Edits share this shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageGenerationResponse {
    pub id: Option<String>,
    pub model: Option<String>,
    /// Ordered images; `index` is dense and zero-based.
    pub data: Vec<ImageData>,
    pub output_format: Option<String>,
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    pub b64_json: Option<String>,
    pub url: Option<String>,
    pub revised_prompt: Option<String>,
    pub index: usize,
}

/// Text-to-speech request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeechRequest {
    #[serde(default)]
    pub provider: Provider,
    pub model: String,
    pub input: String,
    #[serde(default)]
    pub options: SpeechOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeechOptions {
    /// Single prebuilt voice name.
    pub voice: Option<String>,
    /// Per-speaker voices for multi-speaker synthesis.
    #[serde(default)]
    pub multi_voice: Vec<SpeakerVoice>,
    /// Requested container; only `wav` is supported, unset returns raw PCM.
    pub response_format: Option<String>,
    #[serde(default)]
    pub extra: ExtraParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerVoice {
    pub speaker: String,
    pub voice: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeechResponse {
    pub model: Option<String>,
    /// Raw PCM or a WAV container, depending on the requested format.
    pub audio: Vec<u8>,
    pub usage: Option<TokenUsage>,
}

/// Speech-to-text request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionRequest {
    #[serde(default)]
    pub provider: Provider,
    pub model: String,
    pub audio: Vec<u8>,
    #[serde(default)]
    pub options: TranscriptionOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionOptions {
    pub prompt: Option<String>,
    pub language: Option<String>,
    /// Audio referenced by URI is resolved upstream; see [`ParamKey::FileUri`].
    #[serde(default)]
    pub extra: ExtraParams,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResponse {
    pub model: Option<String>,
    pub text: String,
    pub task: Option<String>,
    pub language: Option<String>,
    pub usage: Option<TokenUsage>,
}

/// Model catalog request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListModelsRequest {
    #[serde(default)]
    pub provider: Provider,
    pub page_size: Option<u32>,
    pub page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListModelsResponse {
    pub data: Vec<Model>,
    pub next_page_token: Option<String>,
}

/// Catalog entry; backfilled entries only carry `id` and `name`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// `provider/model`.
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub context_length: Option<u64>,
    pub max_output_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supported_methods: Vec<String>,
    pub version: Option<String>,
}
