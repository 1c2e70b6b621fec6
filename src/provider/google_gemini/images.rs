//! 图片生成：contents 与 Imagen (instances) 两种方言

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::BridgeError;
use crate::http::{FetchContext, HttpTransport, download_base64};
use crate::types::{
    ExtraParams, ImageData, ImageEditOptions, ImageEditRequest, ImageGenerationOptions,
    ImageGenerationRequest, ImageGenerationResponse, ParamKey, Provider, parse_model_string,
};

use super::media::{
    detect_image_mime_type, imagen_format_to_size, mime_type_to_extension,
    output_format_to_mime_type, size_to_imagen_format,
};
use super::parts::{SideChannel, decode_base64, restore_side_channel};
use super::types::{
    GeminiCandidate, GeminiContent, GeminiGenerateContentResponse, GeminiGenerationConfig,
    GeminiGenerationRequest, GeminiImageConfig, GeminiPart, ImagenInstance, ImagenMaskImageConfig,
    ImagenOutputOptions, ImagenParameters, ImagenPrediction, ImagenPredictRequest,
    ImagenPredictResponse, ImagenReferenceData, ImagenReferenceImage, PartPayload,
    REFERENCE_TYPE_MASK, REFERENCE_TYPE_RAW,
};
use super::usage::{optional_usage, usage_to_gemini};

const MODALITY_IMAGE: &str = "IMAGE";
const DEFAULT_IMAGE_MIME: &str = "image/png";
const MASK_MODE_USER_PROVIDED: &str = "MASK_MODE_USER_PROVIDED";

/// 统一编辑类型与 Imagen `editMode` 的对应关系
const EDIT_MODES: [(&str, &str); 4] = [
    ("inpainting", "EDIT_MODE_INPAINT_INSERTION"),
    ("inpaint_removal", "EDIT_MODE_INPAINT_REMOVAL"),
    ("outpainting", "EDIT_MODE_OUTPAINT"),
    ("bgswap", "EDIT_MODE_BGSWAP"),
];

/// 请求中 contents 方言无法生成的图片数量
///
/// contents 方言每次只返回一张图片，`n > 1` 时多出的部分被丢弃。
///
/// # Examples
///
/// ```
/// use kotoba_bridge::provider::google_gemini::images::dropped_sample_count;
/// use kotoba_bridge::types::{ImageGenerationOptions, ImageGenerationRequest};
///
/// let request = ImageGenerationRequest {
///     options: ImageGenerationOptions { n: Some(4), ..Default::default() },
///     ..Default::default()
/// };
/// assert_eq!(dropped_sample_count(&request), 3);
/// ```
pub fn dropped_sample_count(request: &ImageGenerationRequest) -> u32 {
    request.options.n.unwrap_or(1).saturating_sub(1)
}

/// 构建 contents 方言的图片生成请求
///
/// `n > 1` 会被截断为单张，并以 `warn` 级别记录。
pub fn to_gemini_image_generation_request(
    request: &ImageGenerationRequest,
) -> GeminiGenerationRequest {
    let dropped = dropped_sample_count(request);
    if dropped > 0 {
        tracing::warn!(
            requested = request.options.n.unwrap_or(1),
            dropped,
            model = %request.model,
            "Gemini contents image generation returns a single image; extra samples dropped"
        );
    }

    let mut extra = request.options.extra.clone();
    let image_config = request
        .options
        .size
        .as_deref()
        .filter(|size| !size.trim().eq_ignore_ascii_case("auto"))
        .map(size_to_imagen_format)
        .filter(|size| !size.is_empty())
        .map(|size| GeminiImageConfig {
            aspect_ratio: size.aspect_ratio.map(|ratio| ratio.as_str().to_string()),
            image_size: size.image_size.map(|bucket| bucket.as_str().to_string()),
        });

    let mut gemini = GeminiGenerationRequest {
        model: request.model.clone(),
        contents: vec![GeminiContent::new(
            "user",
            vec![GeminiPart::text(request.prompt.clone())],
        )],
        generation_config: Some(GeminiGenerationConfig {
            response_modalities: vec![MODALITY_IMAGE.to_string()],
            image_config,
            seed: request.options.seed,
            ..Default::default()
        }),
        ..Default::default()
    };

    SideChannel::take_from(&mut extra).apply(&mut gemini);
    gemini.extra = extra.into_inner();
    gemini
}

/// 构建 Imagen `:predict` 请求
pub fn to_imagen_request(request: &ImageGenerationRequest) -> ImagenPredictRequest {
    let options = &request.options;
    let mut extra = options.extra.clone();
    let mut parameters = ImagenParameters {
        sample_count: options.n,
        seed: options.seed,
        negative_prompt: options.negative_prompt.clone(),
        ..Default::default()
    };

    apply_imagen_size(&mut parameters, options.size.as_deref());
    parameters.output_options = imagen_output_options(options.output_format.as_deref(), None);
    take_imagen_extras(&mut extra, &mut parameters);

    ImagenPredictRequest {
        instances: vec![ImagenInstance {
            prompt: request.prompt.clone(),
            reference_images: Vec::new(),
        }],
        parameters,
        extra: extra.into_inner(),
    }
}

fn apply_imagen_size(parameters: &mut ImagenParameters, size: Option<&str>) {
    if let Some(size) = size.filter(|size| !size.trim().eq_ignore_ascii_case("auto")) {
        let converted = size_to_imagen_format(size);
        parameters.sample_image_size = converted.image_size.map(|bucket| bucket.as_str().to_string());
        parameters.aspect_ratio = converted.aspect_ratio.map(|ratio| ratio.as_str().to_string());
    }
}

fn imagen_output_options(
    output_format: Option<&str>,
    compression_quality: Option<u32>,
) -> Option<ImagenOutputOptions> {
    let mime_type = output_format.and_then(output_format_to_mime_type);
    if mime_type.is_none() && compression_quality.is_none() {
        return None;
    }
    Some(ImagenOutputOptions {
        mime_type: mime_type.map(str::to_string),
        compression_quality,
    })
}

/// extra 中显式给出的值覆盖由 size 推导的结果
fn take_imagen_extras(extra: &mut ExtraParams, parameters: &mut ImagenParameters) {
    if let Some(add_watermark) = extra.take_as(ParamKey::AddWatermark) {
        parameters.add_watermark = Some(add_watermark);
    }
    if let Some(sample_image_size) = extra.take_as(ParamKey::SampleImageSize) {
        parameters.sample_image_size = Some(sample_image_size);
    }
    if let Some(aspect_ratio) = extra.take_as(ParamKey::AspectRatio) {
        parameters.aspect_ratio = Some(aspect_ratio);
    }
    if let Some(person_generation) = extra.take_as(ParamKey::PersonGeneration) {
        parameters.person_generation = Some(person_generation);
    }
    if let Some(language) = extra.take_as(ParamKey::Language) {
        parameters.language = Some(language);
    }
    if let Some(enhance_prompt) = extra.take_as(ParamKey::EnhancePrompt) {
        parameters.enhance_prompt = Some(enhance_prompt);
    }
    if let Some(safety_settings) = extra.take_as(ParamKey::SafetySettings) {
        parameters.safety_settings = safety_settings;
    }
}

/// 解码图片生成请求，优先识别 Imagen 的 instances 形态
pub fn to_unified_image_generation_request(
    request: &GeminiGenerationRequest,
    default_provider: Provider,
) -> ImageGenerationRequest {
    let (provider, model) = parse_model_string(&request.model, default_provider);
    let mut options = ImageGenerationOptions::default();

    if let Some(instance) = request
        .instances
        .first()
        .filter(|instance| !instance.prompt.is_empty())
    {
        if let Some(parameters) = &request.parameters {
            options = options_from_imagen(parameters);
        }
        for (key, value) in &request.extra {
            options.extra.insert(key.clone(), value.clone());
        }
        return ImageGenerationRequest {
            provider,
            model,
            prompt: instance.prompt.clone(),
            options,
        };
    }

    let prompt = request
        .contents
        .iter()
        .flat_map(|content| content.parts.iter())
        .find_map(|part| part.text.as_deref().filter(|text| !text.is_empty()))
        .unwrap_or_default()
        .to_string();

    if let Some(config) = &request.generation_config {
        options.seed = config.seed;
        if let Some(image_config) = &config.image_config {
            options.size = Some(imagen_format_to_size(
                image_config.image_size.as_deref(),
                image_config.aspect_ratio.as_deref(),
            ));
        }
    }
    restore_side_channel(request, &mut options.extra);

    ImageGenerationRequest {
        provider,
        model,
        prompt,
        options,
    }
}

fn options_from_imagen(parameters: &ImagenParameters) -> ImageGenerationOptions {
    ImageGenerationOptions {
        n: parameters.sample_count,
        size: size_from_imagen(parameters),
        output_format: output_format_from_imagen(parameters),
        seed: parameters.seed,
        negative_prompt: parameters.negative_prompt.clone(),
        extra: extras_from_imagen(parameters),
    }
}

fn extras_from_imagen(parameters: &ImagenParameters) -> ExtraParams {
    let mut extra = ExtraParams::new();
    if let Some(person_generation) = &parameters.person_generation {
        extra.set(ParamKey::PersonGeneration, person_generation.clone().into());
    }
    if let Some(language) = &parameters.language {
        extra.set(ParamKey::Language, language.clone().into());
    }
    if let Some(enhance_prompt) = parameters.enhance_prompt {
        extra.set(ParamKey::EnhancePrompt, enhance_prompt.into());
    }
    if let Some(add_watermark) = parameters.add_watermark {
        extra.set(ParamKey::AddWatermark, add_watermark.into());
    }
    if !parameters.safety_settings.is_empty() {
        if let Ok(value) = serde_json::to_value(&parameters.safety_settings) {
            extra.set(ParamKey::SafetySettings, value);
        }
    }
    extra
}

fn size_from_imagen(parameters: &ImagenParameters) -> Option<String> {
    if parameters.sample_image_size.is_none() && parameters.aspect_ratio.is_none() {
        return None;
    }
    Some(imagen_format_to_size(
        parameters.sample_image_size.as_deref(),
        parameters.aspect_ratio.as_deref(),
    ))
}

fn output_format_from_imagen(parameters: &ImagenParameters) -> Option<String> {
    parameters
        .output_options
        .as_ref()
        .and_then(|options| options.mime_type.as_deref())
        .map(mime_type_to_extension)
        .filter(|format| !format.is_empty())
}

/// 统一编辑类型 -> Imagen `editMode`，大小写不敏感
///
/// # Examples
///
/// ```
/// use kotoba_bridge::provider::google_gemini::images::imagen_edit_mode;
///
/// assert_eq!(imagen_edit_mode("Inpainting"), Some("EDIT_MODE_INPAINT_INSERTION"));
/// assert_eq!(imagen_edit_mode("bgswap"), Some("EDIT_MODE_BGSWAP"));
/// assert_eq!(imagen_edit_mode("variation"), None);
/// ```
pub fn imagen_edit_mode(edit_type: &str) -> Option<&'static str> {
    let edit_type = edit_type.trim();
    EDIT_MODES
        .iter()
        .find(|(unified, _)| unified.eq_ignore_ascii_case(edit_type))
        .map(|(_, mode)| *mode)
}

/// Imagen `editMode` -> 统一编辑类型，[`imagen_edit_mode`] 的逆映射
pub fn edit_type_for_imagen_mode(edit_mode: &str) -> Option<&'static str> {
    let edit_mode = edit_mode.trim();
    EDIT_MODES
        .iter()
        .find(|(_, mode)| mode.eq_ignore_ascii_case(edit_mode))
        .map(|(unified, _)| *unified)
}

fn ensure_edit_images(request: &ImageEditRequest) -> Result<(), BridgeError> {
    if request.images.iter().any(|image| !image.is_empty()) {
        Ok(())
    } else {
        Err(BridgeError::Validation {
            message: "image edit request requires at least one source image".to_string(),
        })
    }
}

/// 构建 contents 方言的图片编辑请求：提示词在前，原图按顺序内联
///
/// 蒙版只有 Imagen 方言支持，此处忽略并以 `warn` 记录。
///
/// # Errors
///
/// 没有原图时返回 [`BridgeError::Validation`]。
pub fn to_gemini_image_edit_request(
    request: &ImageEditRequest,
) -> Result<GeminiGenerationRequest, BridgeError> {
    ensure_edit_images(request)?;
    if request.options.mask.as_ref().is_some_and(|mask| !mask.is_empty()) {
        tracing::warn!(
            model = %request.model,
            "Gemini contents image editing has no mask input; mask dropped"
        );
    }

    let mut parts = Vec::with_capacity(request.images.len() + 1);
    parts.push(GeminiPart::text(request.prompt.clone()));
    parts.extend(
        request
            .images
            .iter()
            .filter(|image| !image.is_empty())
            .map(|image| GeminiPart::inline(detect_image_mime_type(image), STANDARD.encode(image))),
    );

    let mut extra = request.options.extra.clone();
    let mut gemini = GeminiGenerationRequest {
        model: request.model.clone(),
        contents: vec![GeminiContent::new("user", parts)],
        generation_config: Some(GeminiGenerationConfig {
            response_modalities: vec![MODALITY_IMAGE.to_string()],
            ..Default::default()
        }),
        ..Default::default()
    };
    SideChannel::take_from(&mut extra).apply(&mut gemini);
    gemini.extra = extra.into_inner();
    Ok(gemini)
}

/// 构建 Imagen 编辑请求
///
/// 原图依次成为 `REFERENCE_TYPE_RAW` 参考图（id 从 1 开始），蒙版或 extra 中的
/// `maskMode` 生成一张 `REFERENCE_TYPE_MASK` 参考图。提供蒙版而未指定模式时使用
/// `MASK_MODE_USER_PROVIDED`；`dilation` 只接受 `[0, 1]`。`editMode` 由编辑类型
/// 推导，未给出类型时才读取 extra。
///
/// # Errors
///
/// 没有原图时返回 [`BridgeError::Validation`]。
pub fn to_imagen_edit_request(request: &ImageEditRequest) -> Result<ImagenPredictRequest, BridgeError> {
    ensure_edit_images(request)?;
    let options = &request.options;
    let mut extra = options.extra.clone();

    let mut reference_images: Vec<ImagenReferenceImage> = request
        .images
        .iter()
        .filter(|image| !image.is_empty())
        .zip(1u32..)
        .map(|(image, reference_id)| ImagenReferenceImage {
            reference_type: REFERENCE_TYPE_RAW.to_string(),
            reference_id,
            reference_image: Some(ImagenReferenceData {
                bytes_base64_encoded: STANDARD.encode(image),
            }),
            mask_image_config: None,
        })
        .collect();

    let mask = options.mask.as_ref().filter(|mask| !mask.is_empty());
    let mask_mode = extra
        .take_as::<String>(ParamKey::MaskMode)
        .or_else(|| mask.map(|_| MASK_MODE_USER_PROVIDED.to_string()));
    let dilation = extra
        .get_f64(ParamKey::Dilation)
        .filter(|dilation| (0.0..=1.0).contains(dilation));
    if dilation.is_some() {
        extra.take(ParamKey::Dilation);
    }
    let mask_classes = extra.get_i64_array(ParamKey::MaskClasses);
    if mask_classes.is_some() {
        extra.take(ParamKey::MaskClasses);
    }

    if mask.is_some() || mask_mode.is_some() {
        let reference_id = u32::try_from(reference_images.len())
            .unwrap_or(u32::MAX)
            .saturating_add(1);
        reference_images.push(ImagenReferenceImage {
            reference_type: REFERENCE_TYPE_MASK.to_string(),
            reference_id,
            reference_image: mask.map(|mask| ImagenReferenceData {
                bytes_base64_encoded: STANDARD.encode(mask),
            }),
            mask_image_config: Some(ImagenMaskImageConfig {
                mask_mode,
                dilation,
                mask_classes: mask_classes.unwrap_or_default(),
            }),
        });
    }

    let mut parameters = ImagenParameters {
        sample_count: options.n,
        seed: options.seed,
        negative_prompt: options.negative_prompt.clone(),
        edit_mode: options
            .edit_type
            .as_deref()
            .and_then(imagen_edit_mode)
            .map(str::to_string),
        ..Default::default()
    };
    apply_imagen_size(&mut parameters, options.size.as_deref());
    parameters.output_options =
        imagen_output_options(options.output_format.as_deref(), options.output_compression);
    if options.edit_type.is_none() {
        parameters.edit_mode = extra.take_as(ParamKey::EditMode);
    }
    take_imagen_extras(&mut extra, &mut parameters);
    parameters.guidance_scale = extra.take_as(ParamKey::GuidanceScale);
    parameters.base_steps = extra.take_as(ParamKey::BaseSteps);
    parameters.include_rai_reason = extra.take_as(ParamKey::IncludeRaiReason);
    parameters.include_safety_attributes = extra.take_as(ParamKey::IncludeSafetyAttributes);
    parameters.storage_uri = extra.take_as(ParamKey::StorageUri);

    Ok(ImagenPredictRequest {
        instances: vec![ImagenInstance {
            prompt: request.prompt.clone(),
            reference_images,
        }],
        parameters,
        extra: extra.into_inner(),
    })
}

/// 解码图片编辑请求，优先识别带参考图的 instances 形态
///
/// contents 形态下最后一段非空文本作为提示词，所有 inlineData 作为原图。
///
/// # Errors
///
/// - 图片或蒙版 base64 无法解码时返回 [`BridgeError::Decode`]；
/// - 没有任何原图时返回 [`BridgeError::Validation`]。
pub fn to_unified_image_edit_request(
    request: &GeminiGenerationRequest,
    default_provider: Provider,
) -> Result<ImageEditRequest, BridgeError> {
    let (provider, model) = parse_model_string(&request.model, default_provider);

    let (prompt, images, options) = match request
        .instances
        .first()
        .filter(|instance| !instance.prompt.is_empty())
    {
        Some(instance) => {
            let mut options = request
                .parameters
                .as_ref()
                .map(edit_options_from_imagen)
                .unwrap_or_default();
            let mut images = Vec::new();
            for reference in &instance.reference_images {
                let data = reference
                    .reference_image
                    .as_ref()
                    .map(|image| image.bytes_base64_encoded.as_str())
                    .filter(|data| !data.is_empty());
                match reference.reference_type.as_str() {
                    REFERENCE_TYPE_RAW => {
                        if let Some(data) = data {
                            images.push(decode_base64("referenceImages", data)?);
                        }
                    }
                    REFERENCE_TYPE_MASK => {
                        if let Some(data) = data {
                            options.mask = Some(decode_base64("mask", data)?);
                        }
                        if let Some(config) = &reference.mask_image_config {
                            restore_mask_config(config, &mut options.extra);
                        }
                    }
                    _ => {}
                }
            }
            for (key, value) in &request.extra {
                options.extra.insert(key.clone(), value.clone());
            }
            (instance.prompt.clone(), images, options)
        }
        None => {
            let mut prompt = String::new();
            let mut images = Vec::new();
            for part in request.contents.iter().flat_map(|content| content.parts.iter()) {
                if let Some(text) = part.text.as_deref().filter(|text| !text.is_empty()) {
                    prompt = text.to_string();
                }
                if let Some(blob) = part.inline_data.as_ref().filter(|blob| !blob.data.is_empty()) {
                    images.push(decode_base64("inlineData", &blob.data)?);
                }
            }
            let mut options = ImageEditOptions::default();
            if let Some(config) = &request.generation_config {
                options.seed = config.seed;
                if let Some(image_config) = &config.image_config {
                    options.size = Some(imagen_format_to_size(
                        image_config.image_size.as_deref(),
                        image_config.aspect_ratio.as_deref(),
                    ));
                }
            }
            restore_side_channel(request, &mut options.extra);
            (prompt, images, options)
        }
    };

    let request = ImageEditRequest {
        provider,
        model,
        prompt,
        images,
        options,
    };
    ensure_edit_images(&request)?;
    Ok(request)
}

fn restore_mask_config(config: &ImagenMaskImageConfig, extra: &mut ExtraParams) {
    if let Some(mask_mode) = &config.mask_mode {
        extra.set(ParamKey::MaskMode, mask_mode.clone().into());
    }
    if let Some(dilation) = config.dilation {
        extra.set(ParamKey::Dilation, dilation.into());
    }
    if !config.mask_classes.is_empty() {
        extra.set(ParamKey::MaskClasses, config.mask_classes.clone().into());
    }
}

fn edit_options_from_imagen(parameters: &ImagenParameters) -> ImageEditOptions {
    let mut extra = extras_from_imagen(parameters);
    // 无法识别的 editMode 原样保留
    let edit_type = match parameters.edit_mode.as_deref() {
        Some(mode) => {
            let edit_type = edit_type_for_imagen_mode(mode);
            if edit_type.is_none() {
                extra.set(ParamKey::EditMode, mode.into());
            }
            edit_type.map(str::to_string)
        }
        None => None,
    };
    if let Some(guidance_scale) = parameters.guidance_scale {
        extra.set(ParamKey::GuidanceScale, guidance_scale.into());
    }
    if let Some(base_steps) = parameters.base_steps {
        extra.set(ParamKey::BaseSteps, base_steps.into());
    }
    if let Some(include_rai_reason) = parameters.include_rai_reason {
        extra.set(ParamKey::IncludeRaiReason, include_rai_reason.into());
    }
    if let Some(include_safety_attributes) = parameters.include_safety_attributes {
        extra.set(ParamKey::IncludeSafetyAttributes, include_safety_attributes.into());
    }
    if let Some(storage_uri) = &parameters.storage_uri {
        extra.set(ParamKey::StorageUri, storage_uri.clone().into());
    }

    ImageEditOptions {
        n: parameters.sample_count,
        size: size_from_imagen(parameters),
        output_format: output_format_from_imagen(parameters),
        output_compression: parameters
            .output_options
            .as_ref()
            .and_then(|options| options.compression_quality),
        edit_type,
        mask: None,
        seed: parameters.seed,
        negative_prompt: parameters.negative_prompt.clone(),
        extra,
    }
}

/// contents 方言响应 -> 统一图片响应
///
/// 只保留 inlineData part，索引按保留顺序重新编号。
///
/// # Errors
///
/// 没有候选或首个候选不含 part 时返回错误，后者携带 finishReason 与 finishMessage。
pub fn to_unified_image_generation_response(
    response: &GeminiGenerateContentResponse,
) -> Result<ImageGenerationResponse, BridgeError> {
    let Some(candidate) = response.candidates.first() else {
        return Err(BridgeError::missing("no candidates found in Gemini image response"));
    };
    let Some(parts) = candidate.parts() else {
        let message = candidate
            .finish_message
            .clone()
            .unwrap_or_else(|| "Gemini image candidate contains no content parts".to_string());
        return Err(BridgeError::upstream(candidate.finish_reason.clone(), message));
    };

    let mut data = Vec::new();
    let mut output_format = None;
    for part in parts {
        let PartPayload::InlineData(blob) = part.payload() else {
            continue;
        };
        if output_format.is_none() {
            output_format = Some(mime_type_to_extension(&blob.mime_type)).filter(|f| !f.is_empty());
        }
        data.push(ImageData {
            b64_json: Some(blob.data.clone()),
            index: data.len(),
            ..Default::default()
        });
    }

    Ok(ImageGenerationResponse {
        id: response.response_id.clone(),
        model: response.model_version.clone(),
        data,
        output_format,
        usage: optional_usage(response.usage_metadata.as_ref()),
    })
}

/// Imagen 响应 -> 统一图片响应
pub fn imagen_to_unified_response(response: &ImagenPredictResponse) -> ImageGenerationResponse {
    let output_format = response
        .predictions
        .first()
        .and_then(|prediction| prediction.mime_type.as_deref())
        .map(mime_type_to_extension)
        .filter(|format| !format.is_empty());

    let data = response
        .predictions
        .iter()
        .enumerate()
        .map(|(index, prediction)| ImageData {
            b64_json: Some(prediction.bytes_base64_encoded.clone()),
            revised_prompt: None,
            url: None,
            index,
        })
        .collect();

    ImageGenerationResponse {
        data,
        output_format,
        ..Default::default()
    }
}

/// 统一图片响应 -> contents 方言响应
///
/// 只有 URL 的图片会通过 `transport` 下载后内联；下载受 `ctx` 的超时与取消控制，
/// 任一下载失败即整体失败。
///
/// # Errors
///
/// 下载失败时返回 [`BridgeError::ImageDownload`]。
pub async fn to_gemini_image_generation_response(
    response: &ImageGenerationResponse,
    transport: &dyn HttpTransport,
    ctx: &FetchContext,
    max_bytes: usize,
) -> Result<GeminiGenerateContentResponse, BridgeError> {
    let mime_type = response_mime_type(response);

    let mut parts = Vec::with_capacity(response.data.len());
    for image in &response.data {
        let data = match (&image.b64_json, &image.url) {
            (Some(b64), _) if !b64.is_empty() => b64.clone(),
            (_, Some(url)) if !url.is_empty() => {
                download_base64(transport, ctx, url, max_bytes)
                    .await
                    .map_err(|err| BridgeError::ImageDownload {
                        url: url.clone(),
                        source: Box::new(err),
                    })?
            }
            _ => String::new(),
        };
        parts.push(GeminiPart::inline(mime_type, data));
    }

    let candidates = if parts.is_empty() {
        Vec::new()
    } else {
        vec![GeminiCandidate {
            content: Some(GeminiContent::new("model", parts)),
            finish_reason: Some("STOP".to_string()),
            ..Default::default()
        }]
    };

    Ok(GeminiGenerateContentResponse {
        candidates,
        usage_metadata: response.usage.as_ref().map(usage_to_gemini),
        model_version: response.model.clone(),
        response_id: response.id.clone(),
        ..Default::default()
    })
}

/// 统一图片响应 -> Imagen 响应；仅有 URL 的条目被跳过
pub fn to_imagen_response(response: &ImageGenerationResponse) -> ImagenPredictResponse {
    let mime_type = response_mime_type(response);
    let predictions = response
        .data
        .iter()
        .filter_map(|image| image.b64_json.as_ref().filter(|b64| !b64.is_empty()))
        .map(|b64| ImagenPrediction {
            bytes_base64_encoded: b64.clone(),
            mime_type: Some(mime_type.to_string()),
            rai_filtered_reason: None,
        })
        .collect();

    ImagenPredictResponse {
        predictions,
        extra: Default::default(),
    }
}

fn response_mime_type(response: &ImageGenerationResponse) -> &'static str {
    response
        .output_format
        .as_deref()
        .and_then(output_format_to_mime_type)
        .unwrap_or(DEFAULT_IMAGE_MIME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(n: Option<u32>, size: Option<&str>) -> ImageGenerationRequest {
        ImageGenerationRequest {
            provider: Provider::gemini(),
            model: "imagen-3.0-generate-002".into(),
            prompt: "a red fox".into(),
            options: ImageGenerationOptions {
                n,
                size: size.map(str::to_string),
                ..Default::default()
            },
        }
    }

    #[test]
    fn contents_request_drops_extra_samples() {
        let mut req = request(Some(3), Some("1820x1024"));
        req.options.extra.insert("safety_settings", json!([]));
        req.options.extra.insert("labels", json!({"env": "test"}));

        let gemini = to_gemini_image_generation_request(&req);
        assert_eq!(dropped_sample_count(&req), 2);
        let config = gemini.generation_config.as_ref().expect("config");
        assert_eq!(config.response_modalities, vec!["IMAGE".to_string()]);
        assert_eq!(config.candidate_count, None);
        let image = config.image_config.as_ref().expect("image config");
        assert_eq!(image.aspect_ratio.as_deref(), Some("16:9"));
        assert_eq!(image.image_size.as_deref(), Some("2k"));
        assert_eq!(gemini.contents[0].parts[0].text.as_deref(), Some("a red fox"));
        assert_eq!(gemini.labels.get("env").map(String::as_str), Some("test"));
        assert!(gemini.extra.is_empty());
    }

    #[test]
    fn imagen_request_maps_parameters_and_overrides() {
        let mut req = request(Some(2), Some("768x1024"));
        req.options.output_format = Some("JPG".into());
        req.options.seed = Some(7);
        req.options.negative_prompt = Some("blurry".into());
        req.options.extra.insert("aspect_ratio", json!("9:16"));
        req.options.extra.insert("addWatermark", json!(false));
        req.options.extra.insert("personGeneration", json!("dont_allow"));
        req.options.extra.insert("custom", json!(1));

        let imagen = to_imagen_request(&req);
        let params = &imagen.parameters;
        assert_eq!(imagen.instances[0].prompt, "a red fox");
        assert_eq!(params.sample_count, Some(2));
        assert_eq!(params.sample_image_size.as_deref(), Some("1k"));
        assert_eq!(params.aspect_ratio.as_deref(), Some("9:16"));
        assert_eq!(params.add_watermark, Some(false));
        assert_eq!(params.person_generation.as_deref(), Some("dont_allow"));
        assert_eq!(
            params.output_options.as_ref().and_then(|o| o.mime_type.as_deref()),
            Some("image/jpeg")
        );
        assert_eq!(params.seed, Some(7));
        assert_eq!(imagen.extra.len(), 1);
        assert!(imagen.extra.contains_key("custom"));
    }

    #[test]
    fn auto_size_is_skipped() {
        let imagen = to_imagen_request(&request(None, Some("auto")));
        assert!(imagen.parameters.sample_image_size.is_none());
        assert!(imagen.parameters.aspect_ratio.is_none());
        let gemini = to_gemini_image_generation_request(&request(None, Some("AUTO")));
        assert!(gemini.generation_config.expect("config").image_config.is_none());
    }

    #[test]
    fn decode_prefers_instances() {
        let gemini: GeminiGenerationRequest = serde_json::from_value(json!({
            "model": "imagen-3.0-generate-002",
            "instances": [{"prompt": "from instances"}],
            "parameters": {"sampleCount": 2, "sampleImageSize": "2K", "aspectRatio": "4:3", "personGeneration": "allow_adult"},
            "contents": [{"parts": [{"text": "from contents"}]}]
        }))
        .expect("request");
        let unified = to_unified_image_generation_request(&gemini, Provider::gemini());
        assert_eq!(unified.prompt, "from instances");
        assert_eq!(unified.options.n, Some(2));
        assert_eq!(unified.options.size.as_deref(), Some("2048x1536"));
        assert_eq!(
            unified.options.extra.get_str(ParamKey::PersonGeneration),
            Some("allow_adult")
        );

        let fallback: GeminiGenerationRequest = serde_json::from_value(json!({
            "instances": [{"prompt": ""}],
            "contents": [{"parts": [{"inlineData": {"mimeType": "image/png", "data": "AA=="}}, {"text": "from contents"}, {"text": "ignored"}]}]
        }))
        .expect("request");
        let unified = to_unified_image_generation_request(&fallback, Provider::gemini());
        assert_eq!(unified.prompt, "from contents");
    }

    #[test]
    fn response_indices_are_dense() {
        let response: GeminiGenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [
                {"text": "here"},
                {"inlineData": {"mimeType": "image/webp", "data": "AAA="}},
                {"text": "and"},
                {"inlineData": {"mimeType": "image/png", "data": "BBB="}}
            ]}}]
        }))
        .expect("response");
        let unified = to_unified_image_generation_response(&response).expect("unified");
        assert_eq!(unified.data.len(), 2);
        assert_eq!(unified.data[0].index, 0);
        assert_eq!(unified.data[1].index, 1);
        assert_eq!(unified.data[1].b64_json.as_deref(), Some("BBB="));
        assert_eq!(unified.output_format.as_deref(), Some("webp"));
    }

    #[test]
    fn missing_parts_is_an_upstream_error() {
        let response: GeminiGenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "IMAGE_SAFETY", "finishMessage": "unsafe"}]
        }))
        .expect("response");
        match to_unified_image_generation_response(&response) {
            Err(BridgeError::Upstream { code, message }) => {
                assert_eq!(code.as_deref(), Some("IMAGE_SAFETY"));
                assert_eq!(message, "unsafe");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            to_unified_image_generation_response(&GeminiGenerateContentResponse::default()),
            Err(BridgeError::MissingField { .. })
        ));
    }

    #[test]
    fn imagen_response_round_trip() {
        let response: ImagenPredictResponse = serde_json::from_value(json!({
            "predictions": [
                {"bytesBase64Encoded": "AAA=", "mimeType": "image/jpeg"},
                {"bytesBase64Encoded": "BBB="}
            ]
        }))
        .expect("response");
        let unified = imagen_to_unified_response(&response);
        assert_eq!(unified.output_format.as_deref(), Some("jpeg"));
        assert_eq!(unified.data[1].index, 1);

        let back = to_imagen_response(&unified);
        assert_eq!(back.predictions.len(), 2);
        assert_eq!(back.predictions[1].mime_type.as_deref(), Some("image/jpeg"));
    }

    const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
    const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10];

    fn edit_request() -> ImageEditRequest {
        ImageEditRequest {
            provider: Provider::gemini(),
            model: "imagen-3.0-capability-001".into(),
            prompt: "replace the sky".into(),
            images: vec![PNG_BYTES.to_vec(), JPEG_BYTES.to_vec()],
            options: ImageEditOptions::default(),
        }
    }

    #[test]
    fn edit_modes_map_both_ways() {
        for (unified, mode) in EDIT_MODES {
            assert_eq!(imagen_edit_mode(unified), Some(mode));
            assert_eq!(edit_type_for_imagen_mode(mode), Some(unified));
        }
        assert_eq!(imagen_edit_mode(" OUTPAINTING "), Some("EDIT_MODE_OUTPAINT"));
        assert_eq!(edit_type_for_imagen_mode("EDIT_MODE_DEFAULT"), None);
    }

    #[test]
    fn edit_to_contents_inlines_sources_after_prompt() {
        let mut req = edit_request();
        req.options.mask = Some(vec![1, 2, 3]);
        req.options.extra.insert("labels", json!({"env": "test"}));
        req.options.extra.insert("responseFormat", json!("b64"));

        let gemini = to_gemini_image_edit_request(&req).expect("edit request");
        let parts = &gemini.contents[0].parts;
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].text.as_deref(), Some("replace the sky"));
        let first = parts[1].inline_data.as_ref().expect("inline png");
        assert_eq!(first.mime_type, "image/png");
        assert_eq!(first.data, STANDARD.encode(PNG_BYTES));
        let second = parts[2].inline_data.as_ref().expect("inline jpeg");
        assert_eq!(second.mime_type, "image/jpeg");
        let config = gemini.generation_config.as_ref().expect("config");
        assert_eq!(config.response_modalities, vec!["IMAGE".to_string()]);
        assert_eq!(gemini.labels.get("env").map(String::as_str), Some("test"));
        assert_eq!(gemini.extra.get("responseFormat"), Some(&json!("b64")));

        let back = to_unified_image_edit_request(&gemini, Provider::gemini()).expect("decode");
        assert_eq!(back.prompt, "replace the sky");
        assert_eq!(back.images, vec![PNG_BYTES.to_vec(), JPEG_BYTES.to_vec()]);
        assert_eq!(back.options.mask, None);
        assert_eq!(back.options.extra.get_raw("labels"), Some(&json!({"env": "test"})));
    }

    #[test]
    fn edit_to_imagen_builds_reference_images() {
        let mut req = edit_request();
        req.options.n = Some(2);
        req.options.size = Some("1024x1024".into());
        req.options.output_format = Some("jpeg".into());
        req.options.output_compression = Some(80);
        req.options.edit_type = Some("inpainting".into());
        req.options.mask = Some(vec![7, 7, 7]);
        req.options.seed = Some(42);
        req.options.extra.insert("dilation", json!(0.03));
        req.options.extra.insert("maskClasses", json!([3, 8.0, "sky"]));
        req.options.extra.insert("guidanceScale", json!(60));
        req.options.extra.insert("editMode", json!("EDIT_MODE_DEFAULT"));

        let imagen = to_imagen_edit_request(&req).expect("imagen edit");
        let references = &imagen.instances[0].reference_images;
        assert_eq!(references.len(), 3);
        assert_eq!(references[0].reference_type, REFERENCE_TYPE_RAW);
        assert_eq!(references[0].reference_id, 1);
        assert_eq!(references[1].reference_id, 2);
        let mask = &references[2];
        assert_eq!(mask.reference_type, REFERENCE_TYPE_MASK);
        assert_eq!(mask.reference_id, 3);
        assert_eq!(
            mask.reference_image.as_ref().map(|image| image.bytes_base64_encoded.as_str()),
            Some("BwcH")
        );
        let config = mask.mask_image_config.as_ref().expect("mask config");
        assert_eq!(config.mask_mode.as_deref(), Some(MASK_MODE_USER_PROVIDED));
        assert_eq!(config.dilation, Some(0.03));
        assert_eq!(config.mask_classes, vec![3, 8]);

        let parameters = &imagen.parameters;
        assert_eq!(parameters.sample_count, Some(2));
        assert_eq!(parameters.edit_mode.as_deref(), Some("EDIT_MODE_INPAINT_INSERTION"));
        assert_eq!(parameters.guidance_scale, Some(60));
        assert_eq!(parameters.seed, Some(42));
        assert_eq!(parameters.aspect_ratio.as_deref(), Some("1:1"));
        let output = parameters.output_options.as_ref().expect("output options");
        assert_eq!(output.mime_type.as_deref(), Some("image/jpeg"));
        assert_eq!(output.compression_quality, Some(80));
        // 已给出编辑类型，extra 中的 editMode 原样透传
        assert_eq!(imagen.extra.get("editMode"), Some(&json!("EDIT_MODE_DEFAULT")));
        assert!(!imagen.extra.contains_key("dilation"));
    }

    #[test]
    fn edit_mask_options_are_validated() {
        let mut req = edit_request();
        req.options.extra.insert("maskMode", json!("MASK_MODE_BACKGROUND"));
        req.options.extra.insert("dilation", json!(4.5));
        req.options.extra.insert("maskClasses", json!("sky"));

        let imagen = to_imagen_edit_request(&req).expect("imagen edit");
        let mask = imagen.instances[0].reference_images.last().expect("mask reference");
        assert_eq!(mask.reference_type, REFERENCE_TYPE_MASK);
        assert!(mask.reference_image.is_none());
        let config = mask.mask_image_config.as_ref().expect("mask config");
        assert_eq!(config.mask_mode.as_deref(), Some("MASK_MODE_BACKGROUND"));
        assert_eq!(config.dilation, None);
        assert!(config.mask_classes.is_empty());
        assert_eq!(imagen.extra.get("dilation"), Some(&json!(4.5)));
        assert_eq!(imagen.extra.get("maskClasses"), Some(&json!("sky")));

        let plain = to_imagen_edit_request(&edit_request()).expect("no mask");
        assert_eq!(plain.instances[0].reference_images.len(), 2);
        assert_eq!(plain.parameters.edit_mode, None);
    }

    #[test]
    fn imagen_edit_decodes_back_to_unified() {
        let body: GeminiGenerationRequest = serde_json::from_value(json!({
            "instances": [{
                "prompt": "remove the car",
                "referenceImages": [
                    {"referenceType": "REFERENCE_TYPE_RAW", "referenceId": 1,
                     "referenceImage": {"bytesBase64Encoded": "AQID"}},
                    {"referenceType": "REFERENCE_TYPE_MASK", "referenceId": 2,
                     "referenceImage": {"bytesBase64Encoded": "BwcH"},
                     "maskImageConfig": {"maskMode": "MASK_MODE_USER_PROVIDED", "dilation": 0.1}}
                ]
            }],
            "parameters": {
                "sampleCount": 1,
                "editMode": "EDIT_MODE_INPAINT_REMOVAL",
                "baseSteps": 35,
                "outputOptions": {"mimeType": "image/webp", "compressionQuality": 70}
            },
            "storageHint": "keep"
        }))
        .expect("request");

        let unified = to_unified_image_edit_request(&body, Provider::gemini()).expect("decode");
        assert_eq!(unified.prompt, "remove the car");
        assert_eq!(unified.images, vec![vec![1, 2, 3]]);
        assert_eq!(unified.options.mask, Some(vec![7, 7, 7]));
        assert_eq!(unified.options.edit_type.as_deref(), Some("inpaint_removal"));
        assert_eq!(unified.options.output_format.as_deref(), Some("webp"));
        assert_eq!(unified.options.output_compression, Some(70));
        assert_eq!(unified.options.extra.get_str(ParamKey::MaskMode), Some("MASK_MODE_USER_PROVIDED"));
        assert_eq!(unified.options.extra.get_f64(ParamKey::Dilation), Some(0.1));
        assert_eq!(unified.options.extra.get_i64(ParamKey::BaseSteps), Some(35));
        assert_eq!(unified.options.extra.get_raw("storageHint"), Some(&json!("keep")));

        let again = to_imagen_edit_request(&unified).expect("re-encode");
        assert_eq!(again.parameters.edit_mode.as_deref(), Some("EDIT_MODE_INPAINT_REMOVAL"));
        assert_eq!(again.parameters.base_steps, Some(35));
        assert_eq!(again.instances[0].reference_images.len(), 2);
    }

    #[test]
    fn edit_requires_source_images() {
        let mut req = edit_request();
        req.images = vec![Vec::new()];
        assert!(matches!(
            to_gemini_image_edit_request(&req),
            Err(BridgeError::Validation { .. })
        ));
        assert!(matches!(to_imagen_edit_request(&req), Err(BridgeError::Validation { .. })));

        let text_only: GeminiGenerationRequest = serde_json::from_value(json!({
            "contents": [{"role": "user", "parts": [{"text": "just words"}]}]
        }))
        .expect("request");
        assert!(matches!(
            to_unified_image_edit_request(&text_only, Provider::gemini()),
            Err(BridgeError::Validation { .. })
        ));

        let broken: GeminiGenerationRequest = serde_json::from_value(json!({
            "contents": [{"role": "user", "parts": [
                {"text": "fix"},
                {"inlineData": {"mimeType": "image/png", "data": "@@not base64@@"}}
            ]}]
        }))
        .expect("request");
        assert!(matches!(
            to_unified_image_edit_request(&broken, Provider::gemini()),
            Err(BridgeError::Decode { .. })
        ));
    }
}
