use crate::domain::model::{ApiResult, Request};
use crate::domain::ports::Transport;
use crate::transport::{format_object_mask, parse_total_count, TransportSettings};
use crate::utils::error::{Result, SoftLayerError};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};

/// REST transport. XML-RPC remains the better-tested path.
#[derive(Debug, Clone)]
pub struct RestTransport {
    settings: TransportSettings,
    client: reqwest::Client,
}

/// 有特殊 HTTP 動詞的方法
pub fn rest_method_for(method: &str, has_args: bool) -> Method {
    if has_args {
        // 帶參數時一律 POST，否則 body 會被忽略
        return Method::POST;
    }
    match method {
        "createObject" | "createObjects" => Method::POST,
        "editObject" | "editObjects" => Method::PUT,
        _ => Method::GET,
    }
}

impl RestTransport {
    pub fn new(settings: TransportSettings) -> Result<Self> {
        let client = settings.build_http_client()?;
        Ok(Self { settings, client })
    }

    pub fn endpoint_url(&self) -> &str {
        &self.settings.endpoint_url
    }

    /// 組出 query 參數、URL 與 body
    pub fn prepare(&self, request: &mut Request) -> Result<Vec<(String, String)>> {
        let mut params: Vec<(String, String)> = request
            .headers
            .iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), v)
            })
            .collect();

        if let Some(mask) = request.mask.take() {
            let mask = format_object_mask(&mask);
            params.push(("objectMask".to_string(), mask.clone()));
            request.mask = Some(mask);
        }

        if request.limit.is_some() || request.offset.is_some() {
            params.push((
                "resultLimit".to_string(),
                format!(
                    "{},{}",
                    request.offset.unwrap_or(0),
                    request.limit.unwrap_or(0)
                ),
            ));
        }

        if let Some(filter) = &request.filter {
            params.push(("objectFilter".to_string(), serde_json::to_string(filter)?));
        }

        request.payload = if request.args.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&json!({ "parameters": request.args }))?)
        };

        let mut url = format!("{}/{}", self.settings.endpoint_url, request.service);
        if let Some(id) = request.identifier {
            url.push_str(&format!("/{}", id));
        }
        if !request.method.is_empty() {
            url.push_str(&format!("/{}", request.method));
        }
        url.push_str(".json");
        request.url = Some(url);

        Ok(params)
    }

    fn error_from_body(status: u16, body: &str) -> SoftLayerError {
        if body.is_empty() {
            return SoftLayerError::api(status.to_string(), "Empty response.");
        }
        match serde_json::from_str::<Value>(body) {
            Ok(value) => {
                // faultCode 一律是 HTTP 狀態碼，內文的 code 不採用
                let message = value
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or(body)
                    .to_string();
                SoftLayerError::api(status.to_string(), message)
            }
            Err(e) => {
                tracing::warn!("REST error body is not JSON: {}", e);
                SoftLayerError::api(status.to_string(), body)
            }
        }
    }
}

#[async_trait]
impl Transport for RestTransport {
    async fn call(&self, request: &mut Request) -> Result<ApiResult> {
        let params = self.prepare(request)?;
        let method = rest_method_for(&request.method, !request.args.is_empty());
        let url = request.url.clone().unwrap_or_default();

        tracing::debug!("{} {} ({}::{})", method, url, request.service, request.method);

        let mut builder = self.client.request(method, &url).query(&params);
        for (name, value) in &request.transport_headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(user) = &request.transport_user {
            builder = builder.basic_auth(user, request.transport_password.as_ref());
        }
        if let Some(payload) = &request.payload {
            builder = builder
                .header("Content-Type", "application/json")
                .body(payload.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SoftLayerError::transport(0, e.to_string()))?;

        request.url = Some(response.url().to_string());
        let status = response.status();
        let total_count = parse_total_count(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| SoftLayerError::transport(0, e.to_string()))?;

        if !status.is_success() {
            return Err(Self::error_from_body(status.as_u16(), &body));
        }

        if body.is_empty() {
            return Err(SoftLayerError::api(status.as_u16().to_string(), "Empty response."));
        }

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            tracing::warn!("REST response is not JSON: {}", e);
            SoftLayerError::api(status.as_u16().to_string(), body.clone())
        })?;

        Ok(ApiResult::with_total(value, total_count))
    }
}
