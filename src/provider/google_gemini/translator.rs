use crate::config::TranslatorConfig;
use crate::error::BridgeError;
use crate::http::{DynHttpTransport, FetchContext, reqwest::default_dyn_transport};
use crate::types::{
    ChatRequest, ChatResponse, ImageEditRequest, ImageGenerationRequest, ImageGenerationResponse,
    ListModelsRequest, ListModelsResponse, SpeechRequest, SpeechResponse, TranscriptionRequest, TranscriptionResponse,
};

use super::types::{
    GeminiGenerateContentResponse, GeminiGenerationRequest, GeminiListModelsResponse,
    ImagenPredictRequest, ImagenPredictResponse,
};
use super::{chat, error, images, models, speech, transcription};

/// Google Gemini translation facade.
///
/// Binds the per-modality translators to a validated [`TranslatorConfig`]:
/// reasoning bounds, the default provider for model strings, the model
/// allow-list and the image download limits. The transport is only used to
/// inline URL images when re-encoding image responses.
pub struct GeminiTranslator {
    pub(crate) config: TranslatorConfig,
    pub(crate) transport: DynHttpTransport,
}

impl GeminiTranslator {
    /// Creates a translator backed by the default reqwest transport.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidConfig`] when `config` fails validation, or
    /// [`BridgeError::Transport`] when the HTTP client cannot be built.
    pub fn new(config: TranslatorConfig) -> Result<Self, BridgeError> {
        Self::with_transport(config, default_dyn_transport()?)
    }

    /// Creates a translator with a caller-supplied transport.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use async_trait::async_trait;
    /// # use kotoba_bridge::config::TranslatorConfig;
    /// # use kotoba_bridge::error::BridgeError;
    /// # use kotoba_bridge::http::{HttpRequest, HttpResponse, HttpTransport};
    /// # use kotoba_bridge::provider::google_gemini::GeminiTranslator;
    /// struct Offline;
    ///
    /// #[async_trait]
    /// impl HttpTransport for Offline {
    ///     async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, BridgeError> {
    ///         Err(BridgeError::transport("offline"))
    ///     }
    /// }
    ///
    /// let translator = GeminiTranslator::with_transport(TranslatorConfig::default(), Arc::new(Offline)).unwrap();
    /// assert_eq!(translator.config().reasoning.min_budget_tokens, 1024);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidConfig`] when `config` fails validation.
    pub fn with_transport(
        config: TranslatorConfig,
        transport: DynHttpTransport,
    ) -> Result<Self, BridgeError> {
        config.validate()?;
        Ok(Self { config, transport })
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    // chat

    pub fn chat_request_to_gemini(
        &self,
        request: &ChatRequest,
    ) -> Result<GeminiGenerationRequest, BridgeError> {
        chat::to_gemini_chat_request(request, &self.config.reasoning)
    }

    pub fn chat_request_from_gemini(&self, request: &GeminiGenerationRequest) -> ChatRequest {
        chat::to_unified_chat_request(
            request,
            self.config.default_provider.clone(),
            &self.config.reasoning,
        )
    }

    pub fn chat_response_from_gemini(
        &self,
        response: &GeminiGenerateContentResponse,
    ) -> Result<ChatResponse, BridgeError> {
        chat::to_unified_chat_response(response)
    }

    pub fn chat_response_to_gemini(&self, response: &ChatResponse) -> GeminiGenerateContentResponse {
        chat::to_gemini_chat_response(response)
    }

    // images

    /// contents 方言；`n > 1` 会被截断，见 [`images::dropped_sample_count`]
    pub fn image_request_to_gemini(
        &self,
        request: &ImageGenerationRequest,
    ) -> GeminiGenerationRequest {
        images::to_gemini_image_generation_request(request)
    }

    pub fn image_request_to_imagen(&self, request: &ImageGenerationRequest) -> ImagenPredictRequest {
        images::to_imagen_request(request)
    }

    pub fn image_request_from_gemini(
        &self,
        request: &GeminiGenerationRequest,
    ) -> ImageGenerationRequest {
        images::to_unified_image_generation_request(request, self.config.default_provider.clone())
    }

    // image edits

    pub fn image_edit_request_to_gemini(
        &self,
        request: &ImageEditRequest,
    ) -> Result<GeminiGenerationRequest, BridgeError> {
        images::to_gemini_image_edit_request(request)
    }

    pub fn image_edit_request_to_imagen(
        &self,
        request: &ImageEditRequest,
    ) -> Result<ImagenPredictRequest, BridgeError> {
        images::to_imagen_edit_request(request)
    }

    pub fn image_edit_request_from_gemini(
        &self,
        request: &GeminiGenerationRequest,
    ) -> Result<ImageEditRequest, BridgeError> {
        images::to_unified_image_edit_request(request, self.config.default_provider.clone())
    }

    pub fn image_response_from_gemini(
        &self,
        response: &GeminiGenerateContentResponse,
    ) -> Result<ImageGenerationResponse, BridgeError> {
        images::to_unified_image_generation_response(response)
    }

    pub fn image_response_from_imagen(
        &self,
        response: &ImagenPredictResponse,
    ) -> ImageGenerationResponse {
        images::imagen_to_unified_response(response)
    }

    /// 使用配置中的超时下载 URL 图片
    pub async fn image_response_to_gemini(
        &self,
        response: &ImageGenerationResponse,
    ) -> Result<GeminiGenerateContentResponse, BridgeError> {
        let ctx = self.config.download.fetch_context();
        self.image_response_to_gemini_with(response, &ctx).await
    }

    /// 由调用方提供超时与取消令牌
    pub async fn image_response_to_gemini_with(
        &self,
        response: &ImageGenerationResponse,
        ctx: &FetchContext,
    ) -> Result<GeminiGenerateContentResponse, BridgeError> {
        images::to_gemini_image_generation_response(
            response,
            self.transport.as_ref(),
            ctx,
            self.config.download.max_bytes,
        )
        .await
    }

    pub fn image_response_to_imagen(&self, response: &ImageGenerationResponse) -> ImagenPredictResponse {
        images::to_imagen_response(response)
    }

    // speech

    pub fn speech_request_to_gemini(
        &self,
        request: &SpeechRequest,
    ) -> Result<GeminiGenerationRequest, BridgeError> {
        speech::to_gemini_speech_request(request)
    }

    pub fn speech_request_from_gemini(&self, request: &GeminiGenerationRequest) -> SpeechRequest {
        speech::to_unified_speech_request(request, self.config.default_provider.clone())
    }

    pub fn speech_response_from_gemini(
        &self,
        response: &GeminiGenerateContentResponse,
        response_format: Option<&str>,
    ) -> Result<SpeechResponse, BridgeError> {
        speech::to_unified_speech_response(response, response_format)
    }

    pub fn speech_response_to_gemini(&self, response: &SpeechResponse) -> GeminiGenerateContentResponse {
        speech::to_gemini_speech_response(response)
    }

    // transcription

    pub fn transcription_request_to_gemini(
        &self,
        request: &TranscriptionRequest,
    ) -> GeminiGenerationRequest {
        transcription::to_gemini_transcription_request(request)
    }

    pub fn transcription_request_from_gemini(
        &self,
        request: &GeminiGenerationRequest,
    ) -> Result<TranscriptionRequest, BridgeError> {
        transcription::to_unified_transcription_request(request, self.config.default_provider.clone())
    }

    pub fn transcription_response_from_gemini(
        &self,
        response: &GeminiGenerateContentResponse,
    ) -> Result<TranscriptionResponse, BridgeError> {
        transcription::to_unified_transcription_response(response)
    }

    pub fn transcription_response_to_gemini(
        &self,
        response: &TranscriptionResponse,
    ) -> GeminiGenerateContentResponse {
        transcription::to_gemini_transcription_response(response)
    }

    // models

    pub fn list_models_query(&self, request: &ListModelsRequest) -> Vec<(String, String)> {
        models::list_models_query(request)
    }

    /// 按配置的允许列表过滤，id 前缀为配置的默认 provider
    pub fn list_models_response_from_gemini(
        &self,
        response: &GeminiListModelsResponse,
    ) -> ListModelsResponse {
        models::to_unified_list_models_response(
            response,
            &self.config.default_provider,
            &self.config.models,
        )
    }

    pub fn list_models_response_to_gemini(
        &self,
        response: &ListModelsResponse,
    ) -> GeminiListModelsResponse {
        models::to_gemini_list_models_response(response)
    }

    /// Maps an upstream error body to [`BridgeError::Upstream`].
    pub fn parse_error(&self, status: u16, body: &str) -> BridgeError {
        error::parse_gemini_error(status, body)
    }
}
