use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use kotoba_bridge::config::TranslatorConfig;
use kotoba_bridge::http::{FetchContext, HttpRequest, HttpResponse, HttpTransport};
use kotoba_bridge::provider::google_gemini::images::dropped_sample_count;
use kotoba_bridge::provider::google_gemini::types::{
    GeminiGenerateContentResponse, ImagenPredictResponse,
};
use kotoba_bridge::types::{
    ImageData, ImageEditOptions, ImageEditRequest, ImageGenerationOptions, ImageGenerationRequest,
    ImageGenerationResponse,
};
use kotoba_bridge::{BridgeError, GeminiTranslator};
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// 按 URL 返回固定图片并记录调用次数
struct ImageHost {
    calls: AtomicUsize,
}

#[async_trait]
impl HttpTransport for ImageHost {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, BridgeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if request.url.ends_with("missing.png") {
            return Ok(HttpResponse {
                status: 404,
                headers: Default::default(),
                body: b"not found".to_vec(),
            });
        }
        Ok(HttpResponse {
            status: 200,
            headers: Default::default(),
            body: b"jpeg-bytes".to_vec(),
        })
    }
}

/// 永不返回的上游
struct StalledHost;

#[async_trait]
impl HttpTransport for StalledHost {
    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, BridgeError> {
        std::future::pending().await
    }
}

/// 声明超大 Content-Length，并记录收到的体积上限
struct OversizedHost {
    limits: Mutex<Vec<Option<usize>>>,
}

#[async_trait]
impl HttpTransport for OversizedHost {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, BridgeError> {
        self.limits
            .lock()
            .expect("锁不应中毒")
            .push(request.max_body_bytes);
        let mut headers = HashMap::new();
        headers.insert("Content-Length".to_string(), "1048576".to_string());
        Ok(HttpResponse {
            status: 200,
            headers,
            body: Vec::new(),
        })
    }
}

fn translator_with(transport: Arc<dyn HttpTransport>) -> GeminiTranslator {
    GeminiTranslator::with_transport(TranslatorConfig::default(), transport)
        .expect("默认配置应能构建转换器")
}

fn request(n: u32, size: &str) -> ImageGenerationRequest {
    ImageGenerationRequest {
        model: "imagen-4.0-generate-001".to_string(),
        prompt: "雪中的红狐狸".to_string(),
        options: ImageGenerationOptions {
            n: Some(n),
            size: Some(size.to_string()),
            output_format: Some("jpeg".to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn gemini_images_basic_imagen_request_body() {
    let translator = translator_with(Arc::new(StalledHost));
    let imagen = translator.image_request_to_imagen(&request(4, "1024x1024"));
    let body = serde_json::to_value(&imagen).expect("请求体应可序列化");

    assert_eq!(body["instances"][0]["prompt"], "雪中的红狐狸");
    assert_eq!(body["parameters"]["sampleCount"], 4);
    assert_eq!(body["parameters"]["sampleImageSize"], "1k");
    assert_eq!(body["parameters"]["aspectRatio"], "1:1");
    assert_eq!(body["parameters"]["outputOptions"]["mimeType"], "image/jpeg");
}

#[test]
fn gemini_images_basic_contents_dialect_truncates_samples() {
    let translator = translator_with(Arc::new(StalledHost));
    let req = request(4, "1820x1024");
    let gemini = translator.image_request_to_gemini(&req);
    let body = serde_json::to_value(&gemini).expect("请求体应可序列化");

    assert_eq!(dropped_sample_count(&req), 3);
    assert!(body["generationConfig"].get("candidateCount").is_none());
    assert_eq!(body["generationConfig"]["responseModalities"], json!(["IMAGE"]));
    assert_eq!(body["generationConfig"]["imageConfig"]["aspectRatio"], "16:9");
    assert_eq!(body["generationConfig"]["imageConfig"]["imageSize"], "2k");
}

#[test]
fn gemini_images_basic_responses_from_both_dialects() {
    let translator = translator_with(Arc::new(StalledHost));

    let contents: GeminiGenerateContentResponse = serde_json::from_value(json!({
        "candidates": [{"content": {"parts": [
            {"text": "这是第一张"},
            {"inlineData": {"mimeType": "image/png", "data": "AAAA"}},
            {"text": "这是第二张"},
            {"inlineData": {"mimeType": "image/png", "data": "BBBB"}}
        ]}}],
        "usageMetadata": {"promptTokenCount": 6, "candidatesTokenCount": 2580, "totalTokenCount": 2586}
    }))
    .expect("响应应可解析");
    let unified = translator
        .image_response_from_gemini(&contents)
        .expect("图片响应转换应成功");
    let indices: Vec<usize> = unified.data.iter().map(|image| image.index).collect();
    assert_eq!(indices, vec![0, 1]);
    assert_eq!(unified.output_format.as_deref(), Some("png"));
    assert_eq!(
        unified.usage.as_ref().and_then(|usage| usage.total_tokens),
        Some(2586)
    );

    let imagen: ImagenPredictResponse = serde_json::from_value(json!({
        "predictions": [
            {"bytesBase64Encoded": "CCCC", "mimeType": "image/jpeg"},
            {"bytesBase64Encoded": "DDDD", "mimeType": "image/jpeg"}
        ]
    }))
    .expect("响应应可解析");
    let unified = translator.image_response_from_imagen(&imagen);
    assert_eq!(unified.data.len(), 2);
    assert_eq!(unified.data[1].b64_json.as_deref(), Some("DDDD"));
    assert_eq!(unified.output_format.as_deref(), Some("jpeg"));
}

#[tokio::test]
async fn gemini_images_basic_url_images_are_downloaded_once() {
    let host = Arc::new(ImageHost {
        calls: AtomicUsize::new(0),
    });
    let translator = translator_with(host.clone());
    let response = ImageGenerationResponse {
        model: Some("imagen-4.0-generate-001".to_string()),
        data: vec![
            ImageData {
                b64_json: Some("AAAA".to_string()),
                ..Default::default()
            },
            ImageData {
                url: Some("https://cdn.example.com/fox.jpg".to_string()),
                index: 1,
                ..Default::default()
            },
        ],
        output_format: Some("jpeg".to_string()),
        ..Default::default()
    };

    let gemini = translator
        .image_response_to_gemini(&response)
        .await
        .expect("URL 图片应被内联");
    let parts = gemini.candidates[0].parts().expect("应包含 part");
    assert_eq!(parts.len(), 2);
    let downloaded = parts[1].inline_data.as_ref().expect("应为内联数据");
    assert_eq!(downloaded.mime_type, "image/jpeg");
    assert_eq!(
        downloaded.data,
        general_purpose::STANDARD.encode(b"jpeg-bytes")
    );
    assert_eq!(gemini.candidates[0].finish_reason.as_deref(), Some("STOP"));
    assert_eq!(host.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn gemini_images_basic_download_failure_aborts_conversion() {
    let host = Arc::new(ImageHost {
        calls: AtomicUsize::new(0),
    });
    let translator = translator_with(host.clone());
    let response = ImageGenerationResponse {
        data: vec![ImageData {
            url: Some("https://cdn.example.com/missing.png".to_string()),
            ..Default::default()
        }],
        ..Default::default()
    };

    match translator.image_response_to_gemini(&response).await {
        Err(BridgeError::ImageDownload { url, source }) => {
            assert_eq!(url, "https://cdn.example.com/missing.png");
            assert!(matches!(*source, BridgeError::Transport { .. }));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(host.calls.load(Ordering::SeqCst), 1, "下载失败不应重试");
}

#[tokio::test]
async fn gemini_images_basic_download_honors_cancellation() {
    let translator = translator_with(Arc::new(StalledHost));
    let response = ImageGenerationResponse {
        data: vec![ImageData {
            url: Some("https://cdn.example.com/slow.png".to_string()),
            ..Default::default()
        }],
        ..Default::default()
    };

    let cancel = CancellationToken::new();
    let ctx = FetchContext::default().with_cancel(cancel.clone());
    let trigger = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
    });

    match translator.image_response_to_gemini_with(&response, &ctx).await {
        Err(BridgeError::ImageDownload { source, .. }) => {
            assert!(matches!(*source, BridgeError::Aborted { .. }));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    trigger.await.expect("取消任务应正常结束");

    let deadline = FetchContext::with_timeout(Duration::from_millis(20));
    match translator.image_response_to_gemini_with(&response, &deadline).await {
        Err(BridgeError::ImageDownload { source, .. }) => {
            assert!(source.to_string().contains("timed out"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn gemini_images_basic_download_limit_reaches_transport() {
    let host = Arc::new(OversizedHost {
        limits: Mutex::new(Vec::new()),
    });
    let config = TranslatorConfig::from_json_str(r#"{"download": {"max_bytes": 4096}}"#)
        .expect("配置应可解析");
    let translator =
        GeminiTranslator::with_transport(config, host.clone()).expect("配置应能构建转换器");
    let response = ImageGenerationResponse {
        data: vec![ImageData {
            url: Some("https://cdn.example.com/huge.png".to_string()),
            ..Default::default()
        }],
        ..Default::default()
    };

    match translator.image_response_to_gemini(&response).await {
        Err(BridgeError::ImageDownload { url, source }) => {
            assert_eq!(url, "https://cdn.example.com/huge.png");
            assert!(matches!(*source, BridgeError::Transport { .. }));
            assert!(source.to_string().contains("1048576"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    let limits = host.limits.lock().expect("锁不应中毒");
    assert_eq!(limits.as_slice(), &[Some(4096)]);
}

fn edit_request() -> ImageEditRequest {
    ImageEditRequest {
        model: "imagen-3.0-capability-001".to_string(),
        prompt: "把背景换成海边".to_string(),
        images: vec![vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]],
        options: ImageEditOptions {
            edit_type: Some("bgswap".to_string()),
            mask: Some(vec![0, 255, 0, 255]),
            output_format: Some("png".to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn gemini_images_basic_edit_round_trip_through_imagen() {
    let translator = translator_with(Arc::new(StalledHost));
    let req = edit_request();

    let imagen = translator
        .image_edit_request_to_imagen(&req)
        .expect("编辑请求应可转换");
    let body = serde_json::to_value(&imagen).expect("请求体应可序列化");
    let references = &body["instances"][0]["referenceImages"];
    assert_eq!(references[0]["referenceType"], "REFERENCE_TYPE_RAW");
    assert_eq!(references[0]["referenceId"], 1);
    assert_eq!(
        references[0]["referenceImage"]["bytesBase64Encoded"],
        general_purpose::STANDARD.encode([0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10])
    );
    assert_eq!(references[1]["referenceType"], "REFERENCE_TYPE_MASK");
    assert_eq!(references[1]["maskImageConfig"]["maskMode"], "MASK_MODE_USER_PROVIDED");
    assert_eq!(body["parameters"]["editMode"], "EDIT_MODE_BGSWAP");
    assert_eq!(body["parameters"]["outputOptions"]["mimeType"], "image/png");

    let parsed = serde_json::from_value(body).expect("请求体应可回读");
    let back = translator
        .image_edit_request_from_gemini(&parsed)
        .expect("编辑请求应可还原");
    assert_eq!(back.prompt, req.prompt);
    assert_eq!(back.images, req.images);
    assert_eq!(back.options.mask, req.options.mask);
    assert_eq!(back.options.edit_type.as_deref(), Some("bgswap"));
    assert_eq!(back.options.output_format.as_deref(), Some("png"));
}

#[test]
fn gemini_images_basic_edit_contents_dialect() {
    let translator = translator_with(Arc::new(StalledHost));
    let gemini = translator
        .image_edit_request_to_gemini(&edit_request())
        .expect("编辑请求应可转换");
    let body = serde_json::to_value(&gemini).expect("请求体应可序列化");

    let parts = &body["contents"][0]["parts"];
    assert_eq!(parts[0]["text"], "把背景换成海边");
    assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
    assert!(parts.get(2).is_none(), "contents 方言不携带蒙版");
    assert_eq!(body["generationConfig"]["responseModalities"], json!(["IMAGE"]));

    let mut empty = edit_request();
    empty.images.clear();
    assert!(matches!(
        translator.image_edit_request_to_gemini(&empty),
        Err(BridgeError::Validation { .. })
    ));
}
