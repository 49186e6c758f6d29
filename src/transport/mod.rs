//! Transports: turn a [`Request`](crate::domain::model::Request) into an HTTP
//! exchange (XML-RPC or REST), answer from fixtures, or wrap another transport
//! for debugging.

pub mod debug;
pub mod fixture;
pub mod rest;
pub mod xmlrpc;
pub mod xmlrpc_codec;

pub use debug::DebugTransport;
pub use fixture::FixtureTransport;
pub use rest::RestTransport;
pub use xmlrpc::XmlRpcTransport;

use crate::utils::error::Result;
use std::time::Duration;

pub const API_PUBLIC_ENDPOINT: &str = "https://api.softlayer.com/xmlrpc/v3.1/";
pub const API_PRIVATE_ENDPOINT: &str = "https://api.service.softlayer.com/xmlrpc/v3.1/";
pub const API_PUBLIC_ENDPOINT_REST: &str = "https://api.softlayer.com/rest/v3.1/";
pub const API_PRIVATE_ENDPOINT_REST: &str = "https://api.service.softlayer.com/rest/v3.1/";

pub const TOTAL_ITEMS_HEADER: &str = "softlayer-total-items";

pub fn user_agent() -> String {
    format!("softlayer-rs/{}", env!("CARGO_PKG_VERSION"))
}

/// HTTP-level options shared by the XML-RPC and REST transports.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub endpoint_url: String,
    pub timeout: Option<Duration>,
    pub proxy: Option<String>,
    pub user_agent: String,
    pub verify: bool,
}

impl TransportSettings {
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into().trim_end_matches('/').to_string(),
            timeout: None,
            proxy: None,
            user_agent: user_agent(),
            verify: true,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub(crate) fn build_http_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .danger_accept_invalid_certs(!self.verify);

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(proxy) = &self.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy.as_str())?);
        }

        Ok(builder.build()?)
    }
}

/// 補上 `mask[...]` 外框，已有前綴者保持原樣
pub fn format_object_mask(mask: &str) -> String {
    let mask = mask.trim();
    if mask.starts_with("mask") || mask.starts_with('[') || mask.starts_with("filteredMask") {
        mask.to_string()
    } else {
        format!("mask[{}]", mask)
    }
}

pub(crate) fn parse_total_count(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(TOTAL_ITEMS_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
