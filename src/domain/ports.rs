use crate::domain::model::{ApiResult, Request};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Sends a prepared [`Request`] to the API and decodes the answer.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn call(&self, request: &mut Request) -> Result<ApiResult>;
}

/// Adds credentials to a request before it reaches the transport.
pub trait Authentication: Send + Sync + std::fmt::Debug {
    fn apply(&self, request: &mut Request);

    /// username 與 API key（只有以 API key 驗證的方式才有）
    fn api_key_credentials(&self) -> Option<(&str, &str)> {
        None
    }
}

/// 讓共用的 transport 可以再被包裝（例如 `DebugTransport`）
#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn call(&self, request: &mut Request) -> Result<ApiResult> {
        (**self).call(request).await
    }
}
