use crate::domain::model::{ApiResult, Request};
use crate::domain::ports::Transport;
use crate::transport::rest::rest_method_for;
use crate::utils::error::Result;
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

/// One recorded exchange.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub request: Request,
    pub elapsed: Duration,
    pub succeeded: bool,
}

/// Wraps another transport, timing and remembering every call.
#[derive(Debug)]
pub struct DebugTransport {
    inner: Box<dyn Transport>,
    records: Mutex<Vec<CallRecord>>,
}

fn api_key_regex() -> &'static Regex {
    static KEY: OnceLock<Regex> = OnceLock::new();
    KEY.get_or_init(|| Regex::new(r"<string>[a-z0-9]{64}</string>").expect("static api key regex"))
}

/// 遮蔽 XML-RPC payload 中的 API key
pub fn scrub_api_key(payload: &str) -> String {
    api_key_regex()
        .replace_all(payload, "<string>API_KEY_GOES_HERE</string>")
        .to_string()
}

impl DebugTransport {
    pub fn new(inner: Box<dyn Transport>) -> Self {
        Self {
            inner,
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn records(&self) -> Vec<CallRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn requests(&self) -> Vec<Request> {
        self.records().into_iter().map(|r| r.request).collect()
    }

    /// 產生可重現請求的 curl 指令
    pub fn reproducible_command(request: &Request) -> String {
        let url = request.url.as_deref().unwrap_or_default();
        let mut parts = vec!["curl".to_string()];

        if request.transport_user.is_some() {
            parts.push("-u $SL_USERNAME:$SL_API_KEY".to_string());
        }

        let method = match &request.payload {
            Some(payload) if payload.starts_with("<?xml") => "POST".to_string(),
            _ => rest_method_for(&request.method, !request.args.is_empty()).to_string(),
        };
        parts.push(format!("-X {}", method));

        for (name, value) in &request.transport_headers {
            if name.eq_ignore_ascii_case("authorization") {
                parts.push(format!("-H '{}: Bearer $SL_TOKEN'", name));
            } else {
                parts.push(format!("-H '{}: {}'", name, value));
            }
        }

        if let Some(payload) = &request.payload {
            parts.push(format!("-d '{}'", scrub_api_key(payload)));
        }

        parts.push(format!("'{}'", url));
        parts.join(" ")
    }
}

#[async_trait]
impl Transport for DebugTransport {
    async fn call(&self, request: &mut Request) -> Result<ApiResult> {
        let started = Instant::now();
        let result = self.inner.call(request).await;
        let elapsed = started.elapsed();

        match &result {
            Ok(_) => tracing::info!("{} took {:?}", request, elapsed),
            Err(e) => tracing::warn!("{} failed after {:?}: {}", request, elapsed, e),
        }

        let record = CallRecord {
            request: request.clone(),
            elapsed,
            succeeded: result.is_ok(),
        };
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::FixtureTransport;

    #[test]
    fn test_scrub_api_key() {
        let key = "a".repeat(64);
        let payload = format!("<value><string>{}</string></value>", key);
        let scrubbed = scrub_api_key(&payload);
        assert!(!scrubbed.contains(&key));
        assert!(scrubbed.contains("API_KEY_GOES_HERE"));
    }

    #[tokio::test]
    async fn test_records_calls() {
        let transport = DebugTransport::new(Box::new(FixtureTransport::new()));
        let mut ok = Request::new("SoftLayer_Account", "getObject");
        let mut missing = Request::new("SoftLayer_Account", "doesNotExist");

        assert!(transport.call(&mut ok).await.is_ok());
        assert!(transport.call(&mut missing).await.is_err());

        let records = transport.records();
        assert_eq!(records.len(), 2);
        assert!(records[0].succeeded);
        assert!(!records[1].succeeded);
    }

    #[test]
    fn test_reproducible_command() {
        let mut request = Request::new("SoftLayer_Account", "getObject");
        request.url = Some("https://api.example.com/rest/v3.1/SoftLayer_Account/getObject.json".into());
        request.transport_user = Some("user".into());
        request
            .transport_headers
            .insert("User-Agent".into(), "softlayer-rs/0.1.0".into());

        let command = DebugTransport::reproducible_command(&request);
        assert!(command.starts_with("curl -u $SL_USERNAME:$SL_API_KEY -X GET"));
        assert!(command.contains("-H 'User-Agent: softlayer-rs/0.1.0'"));
        assert!(command.ends_with("'https://api.example.com/rest/v3.1/SoftLayer_Account/getObject.json'"));
    }
}
