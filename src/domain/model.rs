use crate::utils::filter::clean_string;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// 會帶入密碼的方法，輸出日誌時需遮蔽參數
const SENSITIVE_METHODS: [&str; 3] = [
    "performExternalAuthentication",
    "refreshEncryptedToken",
    "getPortalLoginToken",
];

/// A single API call as seen by a transport.
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// Full service name, e.g. `SoftLayer_Account`.
    pub service: String,
    pub method: String,
    pub args: Vec<Value>,
    /// API-level headers (authentication, init parameters, masks, ...).
    pub headers: Map<String, Value>,
    pub transport_user: Option<String>,
    pub transport_password: Option<String>,
    /// HTTP headers sent as-is.
    pub transport_headers: BTreeMap<String, String>,
    pub identifier: Option<i64>,
    pub mask: Option<String>,
    pub filter: Option<Value>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    /// Filled in by the transport.
    pub url: Option<String>,
    pub payload: Option<String>,
}

impl Request {
    pub fn new(service: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
            ..Default::default()
        }
    }

    pub fn is_sensitive(&self) -> bool {
        SENSITIVE_METHODS.contains(&self.method.as_str())
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = self.mask.as_deref().map(clean_string).unwrap_or_default();
        let filter = self
            .filter
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_default();
        let args = if self.is_sensitive() {
            "*************".to_string()
        } else {
            Value::Array(self.args.clone()).to_string()
        };
        let opt = |v: Option<String>| v.unwrap_or_else(|| "None".to_string());

        write!(
            f,
            "{}::{}(id={}, mask='{}', filter='{}', args={}, limit={}, offset={})",
            self.service,
            self.method,
            opt(self.identifier.map(|i| i.to_string())),
            mask,
            filter,
            args,
            opt(self.limit.map(|l| l.to_string())),
            opt(self.offset.map(|o| o.to_string())),
        )
    }
}

/// Decoded API result plus the `softlayer-total-items` header for lists.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResult {
    pub value: Value,
    pub total_count: Option<u64>,
}

impl ApiResult {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            total_count: None,
        }
    }

    pub fn with_total(value: Value, total_count: Option<u64>) -> Self {
        Self { value, total_count }
    }
}
