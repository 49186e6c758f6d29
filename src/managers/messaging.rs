//! Message queue service.
//!
//! Account lookup goes through the regular API client. Queue and topic
//! operations talk JSON over HTTP to the per-datacenter messaging endpoint,
//! authenticated with an `X-Auth-Token` obtained from the account's username
//! and API key.

use crate::core::Client;
use crate::transport::TransportSettings;
use crate::utils::error::{Result, SoftLayerError};
use reqwest::{Method, StatusCode};
use serde_json::{json, Map, Value};
use std::sync::{Mutex, MutexGuard};

/// 機房與公網、私網主機
pub const ENDPOINTS: &[(&str, &str, &str)] = &[(
    "dal05",
    "dal05.mq.softlayer.net",
    "dal05.mq.service.networklayer.com",
)];

const DEFAULT_DATACENTER: &str = "dal05";
const DEFAULT_NETWORK: &str = "public";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 把非 2xx 回應轉成 API 錯誤，訊息取自 body 的 `message`
async fn error_from_response(response: reqwest::Response) -> SoftLayerError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let parsed = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string));
    let message = parsed.unwrap_or_else(|| {
        if body.is_empty() {
            status.canonical_reason().unwrap_or("Unknown error").to_string()
        } else {
            body
        }
    });
    SoftLayerError::api(status.as_u16().to_string(), message)
}

#[derive(Debug, Clone)]
pub struct MessagingManager {
    client: Client,
}

impl MessagingManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn list_accounts(&self) -> Result<Vec<Value>> {
        let accounts = self
            .client
            .call("Account", "getMessageQueueAccounts")
            .mask("mask[id,name,status,nodes]")
            .send()
            .await?;
        Ok(super::as_list(accounts))
    }

    pub fn get_endpoints(&self) -> &'static [(&'static str, &'static str, &'static str)] {
        ENDPOINTS
    }

    /// `network` 為 `public` 或 `private`，預設 dal05 公網
    pub fn get_endpoint(&self, datacenter: Option<&str>, network: Option<&str>) -> Result<String> {
        let datacenter = datacenter.unwrap_or(DEFAULT_DATACENTER);
        let network = network.unwrap_or(DEFAULT_NETWORK);
        let (_, public, private) = ENDPOINTS
            .iter()
            .find(|(name, _, _)| *name == datacenter)
            .ok_or_else(|| {
                SoftLayerError::argument(format!("Invalid datacenter/network: {}/{}", datacenter, network))
            })?;
        match network {
            "public" => Ok(format!("https://{}", public)),
            "private" => Ok(format!("https://{}", private)),
            _ => Err(SoftLayerError::argument(format!(
                "Invalid datacenter/network: {}/{}",
                datacenter, network
            ))),
        }
    }

    pub async fn ping(&self, datacenter: Option<&str>, network: Option<&str>) -> Result<bool> {
        let endpoint = self.get_endpoint(datacenter, network)?;
        Self::ping_endpoint(&endpoint).await
    }

    pub async fn ping_endpoint(endpoint: &str) -> Result<bool> {
        let http = TransportSettings::new(endpoint).build_http_client()?;
        let response = http
            .get(format!("{}/v1/ping", endpoint.trim_end_matches('/')))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(true)
    }

    /// 以 client 的 username 與 API key 取得已驗證的連線
    pub async fn get_connection(
        &self,
        account_id: &str,
        datacenter: Option<&str>,
        network: Option<&str>,
    ) -> Result<MessagingConnection> {
        let (username, api_key) = self
            .client
            .auth()
            .and_then(|auth| auth.api_key_credentials())
            .ok_or_else(|| {
                SoftLayerError::argument("Messaging requires a username and API key")
            })?;
        let endpoint = self.get_endpoint(datacenter, network)?;
        let connection = MessagingConnection::new(account_id, endpoint)?;
        connection.authenticate(username, api_key).await?;
        Ok(connection)
    }
}

/// One authenticated session against a message queue account.
#[derive(Debug)]
pub struct MessagingConnection {
    account_id: String,
    endpoint: String,
    http: reqwest::Client,
    token: Mutex<Option<String>>,
    credentials: Mutex<Option<(String, String)>>,
}

impl MessagingConnection {
    pub fn new(account_id: impl Into<String>, endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        let http = TransportSettings::new(endpoint.as_str()).build_http_client()?;
        Ok(Self {
            account_id: account_id.into(),
            endpoint,
            http,
            token: Mutex::new(None),
            credentials: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}/{}", self.endpoint, self.account_id, path)
    }

    pub fn is_authenticated(&self) -> bool {
        lock(&self.token).is_some()
    }

    pub async fn authenticate(&self, username: &str, api_key: &str) -> Result<()> {
        let response = self
            .http
            .post(self.url("auth"))
            .header("X-Auth-User", username)
            .header("X-Auth-Key", api_key)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let token = response
            .headers()
            .get("X-Auth-Token")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| SoftLayerError::api("auth", "No X-Auth-Token in the auth response"))?;

        tracing::debug!(account = %self.account_id, "messaging token acquired");
        *lock(&self.token) = Some(token);
        *lock(&self.credentials) = Some((username.to_string(), api_key.to_string()));
        Ok(())
    }

    async fn send_once(
        &self,
        method: &Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<reqwest::Response> {
        let mut request = self
            .http
            .request(method.clone(), self.url(path))
            .header("Content-Type", "application/json")
            .query(query);
        let token = lock(&self.token).clone();
        if let Some(token) = token {
            request = request.header("X-Auth-Token", token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// 401 時重新驗證後重送一次，503 時直接重送一次
    async fn make_request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Value> {
        let mut reauthenticated = false;
        let mut retried = false;
        loop {
            let response = self.send_once(&method, path, query, body.as_ref()).await?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED && !reauthenticated {
                let credentials = lock(&self.credentials).clone();
                if let Some((username, api_key)) = credentials {
                    reauthenticated = true;
                    tracing::debug!("messaging token expired, authenticating again");
                    self.authenticate(&username, &api_key).await?;
                    continue;
                }
            }
            if status == StatusCode::SERVICE_UNAVAILABLE && !retried {
                retried = true;
                tracing::warn!(path, "messaging service unavailable, retrying once");
                continue;
            }
            if !status.is_success() {
                return Err(error_from_response(response).await);
            }

            let text = response.text().await?;
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_str(&text)?);
        }
    }

    fn tag_query(tags: &[String]) -> Vec<(&'static str, String)> {
        if tags.is_empty() {
            Vec::new()
        } else {
            vec![("tags", tags.join(","))]
        }
    }

    fn force_query(force: bool) -> Vec<(&'static str, String)> {
        if force {
            vec![("force", "1".to_string())]
        } else {
            Vec::new()
        }
    }

    fn message_body(body: &str, options: Option<Value>) -> Value {
        let mut message = match options {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        message.insert("body".to_string(), json!(body));
        Value::Object(message)
    }

    pub async fn stats(&self, period: &str) -> Result<Value> {
        self.make_request(Method::GET, &format!("stats/{}", period), &[], None)
            .await
    }

    pub async fn get_queues(&self, tags: &[String]) -> Result<Value> {
        self.make_request(Method::GET, "queues", &Self::tag_query(tags), None)
            .await
    }

    /// 同時用於建立與修改
    pub async fn create_queue(&self, name: &str, options: Value) -> Result<Value> {
        self.make_request(Method::PUT, &format!("queues/{}", name), &[], Some(options))
            .await
    }

    pub async fn modify_queue(&self, name: &str, options: Value) -> Result<Value> {
        self.create_queue(name, options).await
    }

    pub async fn get_queue(&self, name: &str) -> Result<Value> {
        self.make_request(Method::GET, &format!("queues/{}", name), &[], None)
            .await
    }

    pub async fn delete_queue(&self, name: &str, force: bool) -> Result<Value> {
        self.make_request(
            Method::DELETE,
            &format!("queues/{}", name),
            &Self::force_query(force),
            None,
        )
        .await
    }

    pub async fn push_queue_message(&self, name: &str, body: &str, options: Option<Value>) -> Result<Value> {
        self.make_request(
            Method::POST,
            &format!("queues/{}/messages", name),
            &[],
            Some(Self::message_body(body, options)),
        )
        .await
    }

    pub async fn pop_messages(&self, name: &str, count: u32) -> Result<Value> {
        self.make_request(
            Method::GET,
            &format!("queues/{}/messages", name),
            &[("batch", count.to_string())],
            None,
        )
        .await
    }

    /// 佇列為空時回傳 None
    pub async fn pop_message(&self, name: &str) -> Result<Option<Value>> {
        let messages = self.pop_messages(name, 1).await?;
        if messages.get("item_count").and_then(Value::as_i64).unwrap_or(0) > 0 {
            Ok(messages
                .get("items")
                .and_then(Value::as_array)
                .and_then(|items| items.first())
                .cloned())
        } else {
            Ok(None)
        }
    }

    pub async fn delete_message(&self, name: &str, message_id: &str) -> Result<Value> {
        self.make_request(
            Method::DELETE,
            &format!("queues/{}/messages/{}", name, message_id),
            &[],
            None,
        )
        .await
    }

    pub async fn get_topics(&self, tags: &[String]) -> Result<Value> {
        self.make_request(Method::GET, "topics", &Self::tag_query(tags), None)
            .await
    }

    pub async fn create_topic(&self, name: &str, options: Value) -> Result<Value> {
        self.make_request(Method::PUT, &format!("topics/{}", name), &[], Some(options))
            .await
    }

    pub async fn modify_topic(&self, name: &str, options: Value) -> Result<Value> {
        self.create_topic(name, options).await
    }

    pub async fn get_topic(&self, name: &str) -> Result<Value> {
        self.make_request(Method::GET, &format!("topics/{}", name), &[], None)
            .await
    }

    pub async fn delete_topic(&self, name: &str, force: bool) -> Result<Value> {
        self.make_request(
            Method::DELETE,
            &format!("topics/{}", name),
            &Self::force_query(force),
            None,
        )
        .await
    }

    pub async fn push_topic_message(&self, name: &str, body: &str, options: Option<Value>) -> Result<Value> {
        self.make_request(
            Method::POST,
            &format!("topics/{}/messages", name),
            &[],
            Some(Self::message_body(body, options)),
        )
        .await
    }

    pub async fn get_subscriptions(&self, name: &str) -> Result<Value> {
        self.make_request(
            Method::GET,
            &format!("topics/{}/subscriptions", name),
            &[],
            None,
        )
        .await
    }

    /// `endpoint_type` 為 `http` 或 `queue`
    pub async fn create_subscription(&self, name: &str, endpoint_type: &str, endpoint: Value) -> Result<Value> {
        self.make_request(
            Method::POST,
            &format!("topics/{}/subscriptions", name),
            &[],
            Some(json!({ "endpoint_type": endpoint_type, "endpoint": endpoint })),
        )
        .await
    }

    pub async fn delete_subscription(&self, name: &str, subscription_id: &str) -> Result<Value> {
        self.make_request(
            Method::DELETE,
            &format!("topics/{}/subscriptions/{}", name, subscription_id),
            &[],
            None,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::testing::fixture_client;

    #[test]
    fn test_get_endpoint() {
        let (client, _) = fixture_client();
        let manager = MessagingManager::new(client);
        assert_eq!(
            manager.get_endpoint(None, None).unwrap(),
            "https://dal05.mq.softlayer.net"
        );
        assert_eq!(
            manager.get_endpoint(Some("dal05"), Some("private")).unwrap(),
            "https://dal05.mq.service.networklayer.com"
        );
        let err = manager.get_endpoint(Some("ams01"), None).unwrap_err();
        assert_eq!(err.to_string(), "Invalid datacenter/network: ams01/public");
        assert!(manager.get_endpoint(None, Some("dark")).is_err());
    }

    #[tokio::test]
    async fn test_list_accounts() {
        let (client, transport) = fixture_client();
        let accounts = MessagingManager::new(client).list_accounts().await.unwrap();
        assert_eq!(accounts[0]["nodes"][0]["accountName"], "abcdefg");
        assert_eq!(
            transport
                .last_call("Account", "getMessageQueueAccounts")
                .unwrap()
                .mask
                .unwrap(),
            "mask[id,name,status,nodes]"
        );
    }

    #[tokio::test]
    async fn test_connection_needs_api_key() {
        let (client, _) = fixture_client();
        let err = MessagingManager::new(client)
            .get_connection("abcdefg", None, None)
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_message_body_merges_options() {
        let body = MessagingConnection::message_body("hi", Some(json!({"visibility_delay": 5})));
        assert_eq!(body, json!({"body": "hi", "visibility_delay": 5}));
        assert_eq!(MessagingConnection::message_body("hi", None), json!({"body": "hi"}));
    }
}
