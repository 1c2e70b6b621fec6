use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::BridgeError;

use super::{
    DynHttpTransport, HttpRequest, HttpResponse, HttpTransport, check_content_length, collect_body,
};

/// 基于 reqwest 的默认 HttpTransport，用于下载图片等一次性请求
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// 使用自定义 reqwest::Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// 创建默认配置
    pub fn default_client() -> Result<Self, BridgeError> {
        Client::builder()
            .build()
            .map(Self::new)
            .map_err(|err| {
                BridgeError::transport(format!("failed to create reqwest client: {err}"))
            })
    }

    fn build_request(
        &self,
        mut request: HttpRequest,
    ) -> Result<reqwest::RequestBuilder, BridgeError> {
        let mut builder = self.client.get(&request.url);

        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        for (name, value) in request.headers.drain() {
            let header_name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| BridgeError::transport(format!("invalid header name: {err}")))?;
            let header_value = reqwest::header::HeaderValue::from_str(&value).map_err(|err| {
                BridgeError::transport(format!("invalid header value for {header_name}: {err}"))
            })?;
            builder = builder.header(header_name, header_value);
        }

        Ok(builder)
    }

    fn headers_to_map(headers: &reqwest::header::HeaderMap) -> HashMap<String, String> {
        headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, BridgeError> {
        let limit = request.max_body_bytes;
        let response = self.build_request(request)?.send().await.map_err(|err| {
            if err.is_timeout() {
                BridgeError::Aborted {
                    message: err.to_string(),
                }
            } else {
                BridgeError::transport(err.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers = Self::headers_to_map(response.headers());
        if let Some(limit) = limit {
            check_content_length(&headers, limit)?;
        }
        // 逐块读取，超过上限立即停止
        let body = collect_body(response.bytes_stream(), limit).await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// 便捷构造线程安全 Transport
pub fn default_dyn_transport() -> Result<DynHttpTransport, BridgeError> {
    Ok(Arc::new(ReqwestTransport::default_client()?))
}
