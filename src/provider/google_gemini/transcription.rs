//! 语音转文本

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::BridgeError;
use crate::types::{
    ParamKey, Provider, TranscriptionOptions, TranscriptionRequest, TranscriptionResponse,
    parse_model_string,
};

use super::media::detect_audio_mime_type;
use super::parts::{SideChannel, decode_base64, is_audio_mime, restore_side_channel};
use super::types::{
    GeminiCandidate, GeminiContent, GeminiGenerateContentResponse, GeminiGenerationRequest,
    GeminiPart, PartPayload,
};
use super::usage::{optional_usage, usage_to_gemini};

/// 未提供提示词时使用的默认指令
pub const DEFAULT_TRANSCRIPTION_PROMPT: &str = "Generate a transcript of the speech.";

const TASK_TRANSCRIBE: &str = "transcribe";

/// 构建转写请求：提示词 + 内联音频（MIME 按字节嗅探）
///
/// extra 中的 `file_uri` 作为 fileData part 追加，由上游自行拉取。
pub fn to_gemini_transcription_request(request: &TranscriptionRequest) -> GeminiGenerationRequest {
    let mut extra = request.options.extra.clone();
    let prompt = request
        .options
        .prompt
        .clone()
        .filter(|prompt| !prompt.is_empty())
        .unwrap_or_else(|| DEFAULT_TRANSCRIPTION_PROMPT.to_string());

    let mut parts = vec![GeminiPart::text(prompt)];
    if !request.audio.is_empty() {
        parts.push(GeminiPart::inline(
            detect_audio_mime_type(&request.audio),
            STANDARD.encode(&request.audio),
        ));
    }
    if let Some(uri) = extra.take_as::<String>(ParamKey::FileUri) {
        parts.push(GeminiPart::file(None, uri));
    }

    let mut gemini = GeminiGenerationRequest {
        model: request.model.clone(),
        contents: vec![GeminiContent::new("user", parts)],
        ..Default::default()
    };
    SideChannel::take_from(&mut extra).apply(&mut gemini);
    gemini.extra = extra.into_inner();
    gemini
}

/// 解码转写请求
///
/// # Errors
///
/// 任一 `audio/*` 内联 part 不是合法 base64 时返回 [`BridgeError::Decode`]。
pub fn to_unified_transcription_request(
    request: &GeminiGenerationRequest,
    default_provider: Provider,
) -> Result<TranscriptionRequest, BridgeError> {
    let (provider, model) = parse_model_string(&request.model, default_provider);
    let mut texts = Vec::new();
    let mut audio = Vec::new();
    let mut options = TranscriptionOptions::default();

    for part in request.contents.iter().flat_map(|content| content.parts.iter()) {
        match part.payload() {
            PartPayload::Text { text, .. } if !text.is_empty() => texts.push(text),
            PartPayload::InlineData(blob) if is_audio_mime(&blob.mime_type) => {
                audio.extend(decode_base64("audio", &blob.data)?);
            }
            PartPayload::FileData(file)
                if file.mime_type.as_deref().is_some_and(is_audio_mime) =>
            {
                // 只记录 URI，不拉取
                options.extra.set(ParamKey::FileUri, file.file_uri.clone().into());
            }
            _ => {}
        }
    }

    if !texts.is_empty() {
        options.prompt = Some(texts.join(" "));
    }
    restore_side_channel(request, &mut options.extra);

    Ok(TranscriptionRequest {
        provider,
        model,
        audio,
        options,
    })
}

/// 转写响应 -> 统一转写结果
///
/// # Errors
///
/// 没有候选时返回 [`BridgeError::MissingField`]。
pub fn to_unified_transcription_response(
    response: &GeminiGenerateContentResponse,
) -> Result<TranscriptionResponse, BridgeError> {
    let Some(candidate) = response.candidates.first() else {
        return Err(BridgeError::missing(
            "no candidates found in Gemini transcription response",
        ));
    };

    let text: String = candidate
        .parts()
        .unwrap_or_default()
        .iter()
        .filter(|part| part.thought != Some(true))
        .filter_map(|part| part.text.as_deref())
        .collect();

    Ok(TranscriptionResponse {
        model: response.model_version.clone(),
        text,
        task: Some(TASK_TRANSCRIBE.to_string()),
        language: None,
        usage: optional_usage(response.usage_metadata.as_ref()),
    })
}

/// 统一转写结果 -> GenerateContent 响应
pub fn to_gemini_transcription_response(
    response: &TranscriptionResponse,
) -> GeminiGenerateContentResponse {
    GeminiGenerateContentResponse {
        candidates: vec![GeminiCandidate {
            content: Some(GeminiContent::new(
                "model",
                vec![GeminiPart::text(response.text.clone())],
            )),
            finish_reason: Some("STOP".to_string()),
            ..Default::default()
        }],
        usage_metadata: response.usage.as_ref().map(usage_to_gemini),
        model_version: response.model.clone(),
        ..Default::default()
    }
}
