use crate::config::{resolve_settings, SoftLayerSettings};
use crate::core::auth::{BasicAuthentication, BasicHttpAuthentication, TokenAuthentication};
use crate::domain::model::{ApiResult, Request};
use crate::domain::ports::{Authentication, Transport};
use crate::transport::{
    RestTransport, TransportSettings, XmlRpcTransport, API_PUBLIC_ENDPOINT,
};
use crate::utils::error::{Result, SoftLayerError};
use crate::utils::filter::{lookup_i64, lookup_str};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// 分頁呼叫的預設每頁筆數
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// 服務名稱補上 `SoftLayer_` 前綴
pub fn qualify_service(service: &str) -> String {
    if service.starts_with("SoftLayer_") {
        service.to_string()
    } else {
        format!("SoftLayer_{}", service)
    }
}

/// API client: an authentication strategy plus a transport.
#[derive(Debug, Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    auth: Option<Arc<dyn Authentication>>,
}

impl Client {
    pub fn new(transport: Arc<dyn Transport>, auth: Option<Arc<dyn Authentication>>) -> Self {
        Self { transport, auth }
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn auth(&self) -> Option<&Arc<dyn Authentication>> {
        self.auth.as_ref()
    }

    pub fn set_auth(&mut self, auth: Option<Arc<dyn Authentication>>) {
        self.auth = auth;
    }

    /// Starts a call; finish it with [`CallBuilder::send`] or [`CallBuilder::send_all`].
    pub fn call(&self, service: &str, method: &str) -> CallBuilder<'_> {
        CallBuilder {
            client: self,
            request: Request::new(qualify_service(service), method),
        }
    }

    /// 套用認證後交給 transport
    pub async fn execute(&self, mut request: Request) -> Result<ApiResult> {
        request.service = qualify_service(&request.service);
        if let Some(auth) = &self.auth {
            auth.apply(&mut request);
        }
        tracing::debug!("calling {}", request);
        self.transport.call(&mut request).await
    }

    /// 逐頁取回所有結果
    pub async fn iter_call(&self, request: Request) -> Result<Vec<Value>> {
        let limit = request.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if limit == 0 {
            return Err(SoftLayerError::argument(
                "The 'limit' argument must be greater than 0",
            ));
        }

        let mut offset = request.offset.unwrap_or(0);
        let mut results = Vec::new();
        let mut count: u64 = 0;

        loop {
            let mut page = request.clone();
            page.limit = Some(limit);
            page.offset = Some(offset);

            let ApiResult { value, total_count } = self.execute(page).await?;
            let items = match value {
                Value::Array(items) => items,
                other => {
                    results.push(other);
                    break;
                }
            };

            let fetched = items.len();
            count += fetched as u64;
            results.extend(items);

            if fetched < limit as usize {
                break;
            }
            if total_count.is_some_and(|total| count >= total) {
                break;
            }
            offset += limit;
        }

        tracing::debug!("iter_call fetched {} item(s)", results.len());
        Ok(results)
    }

    /// 以帳號密碼換取 portal token，並改用 token 認證
    pub async fn authenticate_with_password(
        &mut self,
        username: &str,
        password: &str,
        security_question_id: Option<i64>,
        security_question_answer: Option<&str>,
    ) -> Result<(i64, String)> {
        self.auth = None;
        let result = self
            .call("User_Customer", "getPortalLoginToken")
            .arg(username)
            .arg(password)
            .arg(security_question_id.map(Value::from).unwrap_or(Value::Null))
            .arg(
                security_question_answer
                    .map(Value::from)
                    .unwrap_or(Value::Null),
            )
            .send()
            .await?;

        let user_id = lookup_i64(&result, &["userId"])
            .ok_or_else(|| SoftLayerError::api("SoftLayer_Exception", "Login token has no userId"))?;
        let hash = lookup_str(&result, &["hash"])
            .ok_or_else(|| SoftLayerError::api("SoftLayer_Exception", "Login token has no hash"))?
            .to_string();

        self.auth = Some(Arc::new(TokenAuthentication::new(user_id, hash.clone())));
        Ok((user_id, hash))
    }
}

/// Builder for a single API call.
#[derive(Debug)]
pub struct CallBuilder<'a> {
    client: &'a Client,
    request: Request,
}

impl<'a> CallBuilder<'a> {
    pub fn arg(mut self, arg: impl Into<Value>) -> Self {
        self.request.args.push(arg.into());
        self
    }

    pub fn args<I, V>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.request.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn id(mut self, id: i64) -> Self {
        self.request.identifier = Some(id);
        self
    }

    pub fn mask(mut self, mask: impl Into<String>) -> Self {
        self.request.mask = Some(mask.into());
        self
    }

    pub fn mask_opt(mut self, mask: Option<&str>) -> Self {
        self.request.mask = mask.map(str::to_string);
        self
    }

    /// 空的 filter 不會送出
    pub fn filter(mut self, filter: Value) -> Self {
        let empty = match &filter {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        };
        self.request.filter = if empty { None } else { Some(filter) };
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.request.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.request.offset = Some(offset);
        self
    }

    /// API header（XML-RPC headers 結構 / REST query 參數）
    pub fn header(mut self, name: &str, value: Value) -> Self {
        self.request.headers.insert(name.to_string(), value);
        self
    }

    /// HTTP header
    pub fn raw_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.request
            .transport_headers
            .insert(name.to_string(), value.into());
        self
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub async fn send(self) -> Result<Value> {
        Ok(self.client.execute(self.request).await?.value)
    }

    pub async fn send_with_total(self) -> Result<ApiResult> {
        self.client.execute(self.request).await
    }

    pub async fn send_all(self) -> Result<Vec<Value>> {
        self.client.iter_call(self.request).await
    }
}

/// Builder for [`Client`].
#[derive(Debug, Default)]
pub struct ClientBuilder {
    username: Option<String>,
    api_key: Option<String>,
    auth: Option<Arc<dyn Authentication>>,
    endpoint_url: Option<String>,
    timeout: Option<Duration>,
    proxy: Option<String>,
    verify: Option<bool>,
    user_agent: Option<String>,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn auth(mut self, auth: Arc<dyn Authentication>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = Some(verify);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// 依設定值套用 builder 選項
    pub fn settings(mut self, settings: &SoftLayerSettings) -> Self {
        if let Some(username) = &settings.username {
            self.username = Some(username.clone());
        }
        if let Some(api_key) = &settings.api_key {
            self.api_key = Some(api_key.clone());
        }
        if let Some(endpoint_url) = &settings.endpoint_url {
            self.endpoint_url = Some(endpoint_url.clone());
        }
        if let Some(timeout) = settings.timeout {
            self.timeout = Some(Duration::from_secs(timeout));
        }
        if let Some(proxy) = &settings.proxy {
            self.proxy = Some(proxy.clone());
        }
        if let Some(verify) = settings.verify {
            self.verify = Some(verify);
        }
        self
    }

    pub fn build(self) -> Result<Client> {
        let endpoint_url = self
            .endpoint_url
            .unwrap_or_else(|| API_PUBLIC_ENDPOINT.to_string());
        let is_rest = endpoint_url.contains("/rest");

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => {
                let mut settings = TransportSettings::new(endpoint_url.as_str())
                    .with_timeout(self.timeout)
                    .with_proxy(self.proxy)
                    .with_verify(self.verify.unwrap_or(true));
                if let Some(user_agent) = self.user_agent {
                    settings = settings.with_user_agent(user_agent);
                }
                if is_rest {
                    Arc::new(RestTransport::new(settings)?)
                } else {
                    Arc::new(XmlRpcTransport::new(settings)?)
                }
            }
        };

        let auth: Option<Arc<dyn Authentication>> = match (self.auth, self.username, self.api_key) {
            (Some(auth), _, _) => Some(auth),
            (None, Some(username), Some(api_key)) if is_rest => {
                Some(Arc::new(BasicHttpAuthentication::new(username, api_key)))
            }
            (None, Some(username), Some(api_key)) => {
                Some(Arc::new(BasicAuthentication::new(username, api_key)))
            }
            _ => None,
        };

        tracing::debug!(endpoint = %endpoint_url, rest = is_rest, "client built");
        Ok(Client::new(transport, auth))
    }
}

/// 依參數 > 環境變數 > 設定檔的順序解析設定並建立 client
pub fn create_client_from_env(
    explicit: SoftLayerSettings,
    config_file: Option<&Path>,
) -> Result<Client> {
    let settings = resolve_settings(explicit, config_file)?;
    Client::builder().settings(&settings).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::FixtureTransport;
    use serde_json::json;

    fn fixture_client() -> (Client, Arc<FixtureTransport>) {
        let fixtures = Arc::new(FixtureTransport::new());
        let client = Client::new(fixtures.clone(), None);
        (client, fixtures)
    }

    #[test]
    fn test_qualify_service() {
        assert_eq!(qualify_service("Account"), "SoftLayer_Account");
        assert_eq!(qualify_service("SoftLayer_Account"), "SoftLayer_Account");
    }

    #[tokio::test]
    async fn test_call_builder_populates_request() {
        let (client, fixtures) = fixture_client();
        client
            .call("Account", "getObject")
            .id(5)
            .mask("id")
            .filter(json!({"id": {"operation": 1}}))
            .limit(10)
            .offset(20)
            .header("extra", json!({"a": 1}))
            .raw_header("X-Test", "yes")
            .arg(1)
            .send()
            .await
            .unwrap();

        let call = fixtures.last_call("Account", "getObject").unwrap();
        assert_eq!(call.identifier, Some(5));
        assert_eq!(call.mask.as_deref(), Some("id"));
        assert_eq!(call.limit, Some(10));
        assert_eq!(call.offset, Some(20));
        assert_eq!(call.headers["extra"], json!({"a": 1}));
        assert_eq!(call.transport_headers["X-Test"], "yes");
        assert_eq!(call.args, vec![json!(1)]);
    }

    #[tokio::test]
    async fn test_empty_filter_is_dropped() {
        let (client, fixtures) = fixture_client();
        client
            .call("Account", "getObject")
            .filter(json!({}))
            .send()
            .await
            .unwrap();
        assert!(fixtures.calls()[0].filter.is_none());
    }

    #[tokio::test]
    async fn test_auth_is_applied() {
        let fixtures = Arc::new(FixtureTransport::new());
        let client = Client::builder()
            .transport(fixtures.clone())
            .username("user")
            .api_key("key")
            .build()
            .unwrap();
        client.call("Account", "getObject").send().await.unwrap();
        let call = &fixtures.calls()[0];
        assert_eq!(call.headers["authenticate"]["username"], "user");

        let mut client = client;
        client.set_auth(None);
        client.call("Account", "getObject").send().await.unwrap();
        assert!(fixtures.calls()[1].headers.get("authenticate").is_none());
    }

    /// 依 offset/limit 切頁的假 transport
    #[derive(Debug)]
    struct PagedTransport {
        items: Vec<Value>,
        total: Option<u64>,
        calls: std::sync::Mutex<Vec<(u32, u32)>>,
    }

    #[async_trait::async_trait]
    impl Transport for PagedTransport {
        async fn call(&self, request: &mut Request) -> Result<ApiResult> {
            let limit = request.limit.unwrap_or(0);
            let offset = request.offset.unwrap_or(0);
            self.calls.lock().unwrap().push((offset, limit));
            let page: Vec<Value> = self
                .items
                .iter()
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect();
            Ok(ApiResult::with_total(Value::Array(page), self.total))
        }
    }

    fn paged(count: usize, total: Option<u64>) -> Arc<PagedTransport> {
        Arc::new(PagedTransport {
            items: (0..count).map(|i| json!({"id": i})).collect(),
            total,
            calls: std::sync::Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_iter_call_stops_on_short_page() {
        let transport = paged(5, None);
        let client = Client::new(transport.clone(), None);
        let results = client
            .call("Account", "getVirtualGuests")
            .limit(2)
            .send_all()
            .await
            .unwrap();

        assert_eq!(results.len(), 5);
        assert_eq!(*transport.calls.lock().unwrap(), vec![(0, 2), (2, 2), (4, 2)]);
    }

    #[tokio::test]
    async fn test_iter_call_stops_at_total_count() {
        let transport = paged(4, Some(4));
        let client = Client::new(transport.clone(), None);
        let results = client
            .call("Account", "getVirtualGuests")
            .limit(2)
            .send_all()
            .await
            .unwrap();

        assert_eq!(results.len(), 4);
        // 總數已達，不會再多要一頁空結果
        assert_eq!(transport.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_iter_call_single_page() {
        let (client, fixtures) = fixture_client();
        let results = client
            .call("Account", "getVirtualGuests")
            .send_all()
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        let calls = fixtures.calls_to("Account", "getVirtualGuests");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].limit, Some(DEFAULT_PAGE_SIZE));
        assert_eq!(calls[0].offset, Some(0));
    }

    #[tokio::test]
    async fn test_iter_call_non_list_result() {
        let (client, _) = fixture_client();
        let results = client.call("Account", "getObject").send_all().await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_object());
    }

    #[tokio::test]
    async fn test_iter_call_rejects_zero_limit() {
        let (client, _) = fixture_client();
        let err = client
            .call("Account", "getVirtualGuests")
            .limit(0)
            .send_all()
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_authenticate_with_password() {
        let (mut client, fixtures) = fixture_client();
        let (user_id, hash) = client
            .authenticate_with_password("user", "pass", None, None)
            .await
            .unwrap();
        assert_eq!(user_id, 12345);
        assert_eq!(hash, "abc123token");

        let login = fixtures.last_call("User_Customer", "getPortalLoginToken").unwrap();
        assert_eq!(login.args, vec![json!("user"), json!("pass"), Value::Null, Value::Null]);

        client.call("Account", "getObject").send().await.unwrap();
        let call = fixtures.last_call("Account", "getObject").unwrap();
        assert_eq!(call.headers["authenticate"]["complexType"], "PortalLoginToken");
        assert_eq!(call.headers["authenticate"]["userId"], 12345);
    }

    #[test]
    fn test_builder_picks_transport_by_endpoint() {
        let client = Client::builder()
            .endpoint_url("https://api.softlayer.com/rest/v3.1/")
            .username("user")
            .api_key("key")
            .build()
            .unwrap();
        assert!(format!("{:?}", client.transport()).contains("RestTransport"));
        assert!(format!("{:?}", client.auth()).contains("BasicHttpAuthentication"));

        let client = Client::builder().username("user").api_key("key").build().unwrap();
        assert!(format!("{:?}", client.transport()).contains("XmlRpcTransport"));
        assert!(format!("{:?}", client.auth()).contains("BasicAuthentication(user)"));
    }
}
