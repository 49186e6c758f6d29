use crate::domain::model::{ApiResult, Request};
use crate::domain::ports::Transport;
use crate::transport::xmlrpc_codec::{decode_method_response, encode_method_call, MethodResponse};
use crate::transport::{format_object_mask, parse_total_count, TransportSettings};
use crate::utils::error::{Result, SoftLayerError};
use async_trait::async_trait;
use serde_json::{json, Value};

/// XML-RPC transport: one POST to `<endpoint>/<Service>` per call.
#[derive(Debug, Clone)]
pub struct XmlRpcTransport {
    settings: TransportSettings,
    client: reqwest::Client,
}

impl XmlRpcTransport {
    pub fn new(settings: TransportSettings) -> Result<Self> {
        let client = settings.build_http_client()?;
        Ok(Self { settings, client })
    }

    pub fn endpoint_url(&self) -> &str {
        &self.settings.endpoint_url
    }

    /// 組出 API headers 與 payload，並寫回 request 以便除錯輸出
    pub fn prepare(&self, request: &mut Request) -> Result<()> {
        let mut headers = request.headers.clone();

        if let Some(id) = request.identifier {
            headers.insert(format!("{}InitParameters", request.service), json!({ "id": id }));
        }

        if let Some(mask) = request.mask.take() {
            let mask = format_object_mask(&mask);
            headers.insert("SoftLayer_ObjectMask".to_string(), json!({ "mask": mask }));
            request.mask = Some(mask);
        }

        if let Some(filter) = &request.filter {
            headers.insert(format!("{}ObjectFilter", request.service), filter.clone());
        }

        if let Some(limit) = request.limit.filter(|l| *l > 0) {
            headers.insert(
                "resultLimit".to_string(),
                json!({ "limit": limit, "offset": request.offset.unwrap_or(0) }),
            );
        }

        let mut params = Vec::with_capacity(request.args.len() + 1);
        params.push(json!({ "headers": Value::Object(headers) }));
        params.extend(request.args.iter().cloned());

        request
            .transport_headers
            .entry("Content-Type".to_string())
            .or_insert_with(|| "application/xml".to_string());
        request
            .transport_headers
            .entry("User-Agent".to_string())
            .or_insert_with(|| self.settings.user_agent.clone());

        request.url = Some(format!("{}/{}", self.settings.endpoint_url, request.service));
        request.payload = Some(encode_method_call(&request.method, &params)?);
        Ok(())
    }
}

#[async_trait]
impl Transport for XmlRpcTransport {
    async fn call(&self, request: &mut Request) -> Result<ApiResult> {
        self.prepare(request)?;

        let url = request.url.clone().unwrap_or_default();
        let payload = request.payload.clone().unwrap_or_default();

        tracing::debug!("POST {} ({}::{})", url, request.service, request.method);

        let mut builder = self.client.post(&url).body(payload);
        for (name, value) in &request.transport_headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(user) = &request.transport_user {
            builder = builder.basic_auth(user, request.transport_password.as_ref());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SoftLayerError::transport(0, e.to_string()))?;

        let status = response.status();
        let total_count = parse_total_count(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| SoftLayerError::transport(0, e.to_string()))?;

        tracing::debug!("XML-RPC response status: {}", status);

        if !status.is_success() {
            return Err(SoftLayerError::transport(
                status.as_u16(),
                format!("{} Error for url: {}", status, url),
            ));
        }

        match decode_method_response(&body)? {
            MethodResponse::Success(value) => Ok(ApiResult::with_total(value, total_count)),
            MethodResponse::Fault { code, message } => {
                tracing::debug!("XML-RPC fault {}: {}", code, message);
                Err(SoftLayerError::api(code, message))
            }
        }
    }
}
