//! 文本转语音（TTS）

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::BridgeError;
use crate::types::{
    Provider, SpeakerVoice, SpeechOptions, SpeechRequest, SpeechResponse, parse_model_string,
};

use super::media::{GEMINI_TTS_PCM, GEMINI_TTS_PCM_MIME, pcm_to_wav, wav_to_pcm};
use super::parts::{SideChannel, decode_base64, is_audio_mime, restore_side_channel};
use super::types::{
    GeminiCandidate, GeminiContent, GeminiGenerateContentResponse, GeminiGenerationConfig,
    GeminiGenerationRequest, GeminiMultiSpeakerVoiceConfig, GeminiPart, GeminiSpeakerVoiceConfig,
    GeminiSpeechConfig, GeminiVoiceConfig, PartPayload,
};
use super::usage::{optional_usage, usage_to_gemini};

const MODALITY_AUDIO: &str = "AUDIO";
const FORMAT_WAV: &str = "wav";
const SUPPORTED_FORMATS: &[&str] = &[FORMAT_WAV];

/// 构建 TTS 请求
///
/// # Errors
///
/// `response_format` 不是 `wav` 时返回 [`BridgeError::UnsupportedParameter`]，
/// 此时不会构建任何请求。
///
/// # Examples
///
/// ```
/// use kotoba_bridge::error::BridgeError;
/// use kotoba_bridge::provider::google_gemini::speech::to_gemini_speech_request;
/// use kotoba_bridge::types::{SpeechOptions, SpeechRequest};
///
/// let request = SpeechRequest {
///     input: "hello".into(),
///     options: SpeechOptions { response_format: Some("mp3".into()), ..Default::default() },
///     ..Default::default()
/// };
/// assert!(matches!(
///     to_gemini_speech_request(&request),
///     Err(BridgeError::UnsupportedParameter { field: "response_format", .. })
/// ));
/// ```
pub fn to_gemini_speech_request(
    request: &SpeechRequest,
) -> Result<GeminiGenerationRequest, BridgeError> {
    if let Some(format) = request.options.response_format.as_deref() {
        if !format.trim().eq_ignore_ascii_case(FORMAT_WAV) {
            return Err(BridgeError::UnsupportedParameter {
                field: "response_format",
                value: format.to_string(),
                supported: SUPPORTED_FORMATS,
            });
        }
    }

    let mut extra = request.options.extra.clone();
    let mut gemini = GeminiGenerationRequest {
        model: request.model.clone(),
        contents: vec![GeminiContent::new(
            "user",
            vec![GeminiPart::text(request.input.clone())],
        )],
        generation_config: Some(GeminiGenerationConfig {
            response_modalities: vec![MODALITY_AUDIO.to_string()],
            speech_config: speech_config_for(&request.options),
            ..Default::default()
        }),
        ..Default::default()
    };

    SideChannel::take_from(&mut extra).apply(&mut gemini);
    gemini.extra = extra.into_inner();
    Ok(gemini)
}

fn speech_config_for(options: &SpeechOptions) -> Option<GeminiSpeechConfig> {
    let voice_config = options
        .voice
        .as_deref()
        .filter(|voice| !voice.is_empty())
        .map(GeminiVoiceConfig::prebuilt);
    let multi_speaker_voice_config = if options.multi_voice.is_empty() {
        None
    } else {
        Some(GeminiMultiSpeakerVoiceConfig {
            speaker_voice_configs: options
                .multi_voice
                .iter()
                .map(|speaker| GeminiSpeakerVoiceConfig {
                    speaker: speaker.speaker.clone(),
                    voice_config: GeminiVoiceConfig::prebuilt(speaker.voice.clone()),
                })
                .collect(),
        })
    };

    if voice_config.is_none() && multi_speaker_voice_config.is_none() {
        return None;
    }
    Some(GeminiSpeechConfig {
        voice_config,
        multi_speaker_voice_config,
        language_code: None,
    })
}

/// 解码 TTS 请求：文本拼接为输入，语音配置映射回 voice / multi_voice
pub fn to_unified_speech_request(
    request: &GeminiGenerationRequest,
    default_provider: Provider,
) -> SpeechRequest {
    let (provider, model) = parse_model_string(&request.model, default_provider);
    let input = request.flat_prompt();

    let mut options = SpeechOptions::default();
    if let Some(speech) = request
        .generation_config
        .as_ref()
        .and_then(|config| config.speech_config.as_ref())
    {
        options.voice = speech
            .voice_config
            .as_ref()
            .and_then(GeminiVoiceConfig::voice_name)
            .map(str::to_string);
        if let Some(multi) = &speech.multi_speaker_voice_config {
            options.multi_voice = multi
                .speaker_voice_configs
                .iter()
                .filter_map(|config| {
                    config.voice_config.voice_name().map(|voice| SpeakerVoice {
                        speaker: config.speaker.clone(),
                        voice: voice.to_string(),
                    })
                })
                .collect();
        }
    }
    restore_side_channel(request, &mut options.extra);

    SpeechRequest {
        provider,
        model,
        input,
        options,
    }
}

/// TTS 响应 -> 统一语音响应
///
/// 所有内联音频 part 解码后按顺序拼接；`response_format` 为 `wav` 时
/// 包装为 WAV 容器，否则原样返回 PCM。
///
/// # Errors
///
/// 没有候选时返回 [`BridgeError::MissingField`]；任一音频 part 不是合法 base64
/// 时返回 [`BridgeError::Decode`]。
pub fn to_unified_speech_response(
    response: &GeminiGenerateContentResponse,
    response_format: Option<&str>,
) -> Result<SpeechResponse, BridgeError> {
    let Some(candidate) = response.candidates.first() else {
        return Err(BridgeError::missing("no candidates found in Gemini speech response"));
    };

    let mut pcm = Vec::new();
    for part in candidate.parts().unwrap_or_default() {
        if let PartPayload::InlineData(blob) = part.payload() {
            if is_audio_mime(&blob.mime_type) {
                pcm.extend(decode_base64("audio", &blob.data)?);
            }
        }
    }

    let wants_wav = response_format
        .is_some_and(|format| format.trim().eq_ignore_ascii_case(FORMAT_WAV));
    let audio = if wants_wav {
        pcm_to_wav(&pcm, GEMINI_TTS_PCM)
    } else {
        pcm
    };

    Ok(SpeechResponse {
        model: response.model_version.clone(),
        audio,
        usage: optional_usage(response.usage_metadata.as_ref()),
    })
}

/// 统一语音响应 -> TTS 响应；WAV 输入先剥离为 PCM
pub fn to_gemini_speech_response(response: &SpeechResponse) -> GeminiGenerateContentResponse {
    let pcm = wav_to_pcm(&response.audio).unwrap_or(&response.audio);
    let part = GeminiPart::inline(GEMINI_TTS_PCM_MIME, STANDARD.encode(pcm));

    GeminiGenerateContentResponse {
        candidates: vec![GeminiCandidate {
            content: Some(GeminiContent::new("model", vec![part])),
            finish_reason: Some("STOP".to_string()),
            ..Default::default()
        }],
        usage_metadata: response.usage.as_ref().map(usage_to_gemini),
        model_version: response.model.clone(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::google_gemini::media::is_wav_container;
    use serde_json::json;

    fn audio_response(chunks: &[&str]) -> GeminiGenerateContentResponse {
        let parts: Vec<_> = chunks
            .iter()
            .map(|data| json!({"inlineData": {"mimeType": GEMINI_TTS_PCM_MIME, "data": data}}))
            .collect();
        serde_json::from_value(json!({
            "candidates": [{"content": {"role": "model", "parts": parts}}],
            "usageMetadata": {"promptTokenCount": 5, "candidatesTokenCount": 40, "totalTokenCount": 45}
        }))
        .expect("response")
    }

    #[test]
    fn builds_audio_request_with_voices() {
        let request = SpeechRequest {
            model: "gemini-2.5-flash-preview-tts".into(),
            input: "Joe: hi\nJane: hello".into(),
            options: SpeechOptions {
                voice: Some("Kore".into()),
                multi_voice: vec![
                    SpeakerVoice { speaker: "Joe".into(), voice: "Kore".into() },
                    SpeakerVoice { speaker: "Jane".into(), voice: "Puck".into() },
                ],
                response_format: Some("WAV".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let gemini = to_gemini_speech_request(&request).expect("request");
        let config = gemini.generation_config.as_ref().expect("config");
        assert_eq!(config.response_modalities, vec!["AUDIO".to_string()]);
        let speech = config.speech_config.as_ref().expect("speech config");
        assert_eq!(
            speech.voice_config.as_ref().and_then(GeminiVoiceConfig::voice_name),
            Some("Kore")
        );
        let speakers = &speech
            .multi_speaker_voice_config
            .as_ref()
            .expect("multi")
            .speaker_voice_configs;
        assert_eq!(speakers.len(), 2);
        assert_eq!(speakers[1].voice_config.voice_name(), Some("Puck"));

        let back = to_unified_speech_request(&gemini, Provider::gemini());
        assert_eq!(back.input, request.input);
        assert_eq!(back.options.voice.as_deref(), Some("Kore"));
        assert_eq!(back.options.multi_voice, request.options.multi_voice);
    }

    #[test]
    fn rejects_unsupported_format() {
        let request = SpeechRequest {
            options: SpeechOptions {
                response_format: Some("mp3".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        match to_gemini_speech_request(&request) {
            Err(BridgeError::UnsupportedParameter { value, supported, .. }) => {
                assert_eq!(value, "mp3");
                assert_eq!(supported, &["wav"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn concatenates_chunks_and_wraps_wav_on_request() {
        let response = audio_response(&[&STANDARD.encode([1u8, 2]), &STANDARD.encode([3u8, 4])]);

        let raw = to_unified_speech_response(&response, None).expect("raw");
        assert_eq!(raw.audio, vec![1, 2, 3, 4]);
        assert_eq!(raw.usage.as_ref().and_then(|u| u.total_tokens), Some(45));

        let wav = to_unified_speech_response(&response, Some("wav")).expect("wav");
        assert!(is_wav_container(&wav.audio));
        assert_eq!(wav.audio.len(), 44 + 4);
        assert_eq!(wav_to_pcm(&wav.audio), Some(&[1u8, 2, 3, 4][..]));
    }

    #[test]
    fn malformed_audio_chunk_is_fatal() {
        let response = audio_response(&["AQI=", "%%%"]);
        match to_unified_speech_response(&response, Some("wav")) {
            Err(BridgeError::Decode { field, .. }) => assert_eq!(field, "audio"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn response_to_gemini_unwraps_wav() {
        let response = SpeechResponse {
            audio: pcm_to_wav(&[9, 8, 7, 6], GEMINI_TTS_PCM),
            ..Default::default()
        };
        let gemini = to_gemini_speech_response(&response);
        let part = &gemini.candidates[0].parts().expect("parts")[0];
        let blob = part.inline_data.as_ref().expect("inline");
        assert_eq!(blob.mime_type, GEMINI_TTS_PCM_MIME);
        assert_eq!(STANDARD.decode(&blob.data).expect("base64"), vec![9, 8, 7, 6]);
    }
}
