//! 各模态共用的 part 转换与旁路参数处理

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::BridgeError;
use crate::types::{
    AudioContent, ContentPart, ExtraParams, FileContent, ImageContent, ImageSource, ParamKey,
    TextContent,
};

use super::media::{detect_audio_mime_type, mime_type_to_extension};
use super::types::{GeminiBlob, GeminiFileData, GeminiGenerationRequest, GeminiPart, GeminiSafetySetting};

/// 内联图片缺省 MIME
const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// safetySettings / cachedContent / labels 三个顶层字段
#[derive(Debug, Default)]
pub(crate) struct SideChannel {
    safety_settings: Vec<GeminiSafetySetting>,
    cached_content: Option<String>,
    labels: HashMap<String, String>,
}

impl SideChannel {
    /// 从 extra 中取出三个字段；无法解析的值留在 extra 中原样透传
    ///
    /// labels 只保留字符串值。
    pub(crate) fn take_from(extra: &mut ExtraParams) -> Self {
        Self {
            safety_settings: extra.take_as(ParamKey::SafetySettings).unwrap_or_default(),
            cached_content: extra.take_as(ParamKey::CachedContent),
            labels: extra.take_string_map(ParamKey::Labels).unwrap_or_default(),
        }
    }

    pub(crate) fn apply(self, request: &mut GeminiGenerationRequest) {
        request.safety_settings = self.safety_settings;
        request.cached_content = self.cached_content;
        request.labels = self.labels;
    }
}

/// 把请求顶层的旁路字段与未识别字段写回 extra
pub(crate) fn restore_side_channel(request: &GeminiGenerationRequest, extra: &mut ExtraParams) {
    if !request.safety_settings.is_empty() {
        if let Ok(value) = serde_json::to_value(&request.safety_settings) {
            extra.set(ParamKey::SafetySettings, value);
        }
    }
    if let Some(cached) = &request.cached_content {
        extra.set(ParamKey::CachedContent, cached.clone().into());
    }
    if !request.labels.is_empty() {
        if let Ok(value) = serde_json::to_value(&request.labels) {
            extra.set(ParamKey::Labels, value);
        }
    }
    for (key, value) in &request.extra {
        extra.insert(key.clone(), value.clone());
    }
}

/// 通用 ContentPart -> Gemini Part
pub(crate) fn content_part_to_gemini(part: &ContentPart) -> GeminiPart {
    match part {
        ContentPart::Text(TextContent { text }) => GeminiPart::text(text.clone()),
        ContentPart::Image(ImageContent { source }) => match source {
            ImageSource::Url { url } => match parse_data_url(url) {
                Some((mime, data)) => GeminiPart::inline(mime, data),
                None => GeminiPart::file(None, url.clone()),
            },
            ImageSource::Base64 { data, mime_type } => GeminiPart::inline(
                mime_type.as_deref().unwrap_or(DEFAULT_IMAGE_MIME),
                data.clone(),
            ),
        },
        ContentPart::Audio(AudioContent { data, format }) => {
            let mime = match format.as_deref() {
                Some(format) if !format.trim().is_empty() => {
                    format!("audio/{}", format.trim().to_ascii_lowercase())
                }
                // 未声明格式时按字节嗅探
                _ => STANDARD
                    .decode(data)
                    .map(|bytes| detect_audio_mime_type(&bytes))
                    .unwrap_or(super::media::FALLBACK_AUDIO_MIME)
                    .to_string(),
            };
            GeminiPart::inline(mime, data.clone())
        }
        ContentPart::File(FileContent { uri, mime_type }) => {
            GeminiPart::file(mime_type.clone(), uri.clone())
        }
    }
}

/// Gemini inlineData -> ContentPart；非图片/音频返回 None
pub(crate) fn inline_to_content_part(blob: &GeminiBlob) -> Option<ContentPart> {
    if is_image_mime(&blob.mime_type) {
        return Some(ContentPart::Image(ImageContent {
            source: ImageSource::Base64 {
                data: blob.data.clone(),
                mime_type: Some(blob.mime_type.clone()),
            },
        }));
    }
    if is_audio_mime(&blob.mime_type) {
        let format = match mime_type_to_extension(&blob.mime_type).as_str() {
            "mpeg" => "mp3".to_string(),
            other => other.to_string(),
        };
        return Some(ContentPart::Audio(AudioContent {
            data: blob.data.clone(),
            format: Some(format).filter(|format| !format.is_empty()),
        }));
    }
    None
}

/// Gemini fileData -> ContentPart，图片 URI 作为图片输入
pub(crate) fn file_to_content_part(file: &GeminiFileData) -> ContentPart {
    match file.mime_type.as_deref() {
        Some(mime) if is_image_mime(mime) => ContentPart::Image(ImageContent {
            source: ImageSource::Url {
                url: file.file_uri.clone(),
            },
        }),
        _ => ContentPart::File(FileContent {
            uri: file.file_uri.clone(),
            mime_type: file.mime_type.clone(),
        }),
    }
}

pub(crate) fn is_image_mime(mime: &str) -> bool {
    mime.trim().to_ascii_lowercase().starts_with("image/")
}

pub(crate) fn is_audio_mime(mime: &str) -> bool {
    mime.trim().to_ascii_lowercase().starts_with("audio/")
}

/// 解码必需的 base64 负载，失败即返回错误
pub(crate) fn decode_base64(field: &str, data: &str) -> Result<Vec<u8>, BridgeError> {
    STANDARD
        .decode(data.trim())
        .map_err(|err| BridgeError::decode(field, err.to_string()))
}

/// `data:<mime>;base64,<payload>`
fn parse_data_url(url: &str) -> Option<(String, String)> {
    let rest = url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    let mime = if mime.is_empty() {
        DEFAULT_IMAGE_MIME
    } else {
        mime
    };
    Some((mime.to_string(), payload.to_string()))
}
