//! Managers wrap one area of the API: they build object masks and filters and
//! hand back the decoded `serde_json::Value` results.

pub mod account;
pub mod block;
pub mod cdn;
pub mod dedicated_host;
pub mod dns;
pub mod event_log;
pub mod file;
pub mod firewall;
pub mod hardware;
pub mod image;
pub mod load_balancer;
pub mod messaging;
pub mod network;
pub mod ordering;
pub mod sshkey;
pub mod ssl;
pub mod storage;
pub mod tags;
pub mod ticket;
pub mod user;
pub mod vs;

pub use account::AccountManager;
pub use block::BlockStorageManager;
pub use cdn::CdnManager;
pub use dedicated_host::DedicatedHostManager;
pub use dns::DnsManager;
pub use event_log::EventLogManager;
pub use file::FileStorageManager;
pub use firewall::FirewallManager;
pub use hardware::HardwareManager;
pub use image::ImageManager;
pub use load_balancer::LoadBalancerManager;
pub use messaging::MessagingManager;
pub use network::NetworkManager;
pub use ordering::OrderingManager;
pub use sshkey::SshKeyManager;
pub use ssl::SslManager;
pub use storage::StorageManager;
pub use tags::TagManager;
pub use ticket::TicketManager;
pub use user::UserManager;
pub use vs::VsManager;

use crate::utils::filter::{query_filter, query_filter_in, NestedFilter};
use crate::core::Client;
use crate::utils::error::Result;
use serde_json::{json, Map, Value};

/// Filters shared by the virtual server and hardware listings.
#[derive(Debug, Clone, Default)]
pub struct ServerFilter {
    pub tags: Vec<String>,
    pub cpus: Option<u32>,
    /// VS 以 MB、硬體以 GB 計
    pub memory: Option<u64>,
    pub hostname: Option<String>,
    pub domain: Option<String>,
    pub local_disk: Option<bool>,
    pub datacenter: Option<String>,
    pub nic_speed: Option<u32>,
    pub public_ip: Option<String>,
    pub private_ip: Option<String>,
}

impl ServerFilter {
    /// 在 `root`（`virtualGuests` 或 `hardware`）底下建立過濾條件
    pub(crate) fn apply(
        &self,
        filter: &mut NestedFilter,
        root: &str,
        cpu_field: &str,
        memory_field: &str,
    ) {
        if !self.tags.is_empty() {
            filter.set(
                &[root, "tagReferences", "tag", "name"],
                query_filter_in(self.tags.iter().cloned()),
            );
        }
        if let Some(cpus) = self.cpus {
            filter.set(&[root, cpu_field], query_filter(cpus.to_string()));
        }
        if let Some(memory) = self.memory {
            filter.set(&[root, memory_field], query_filter(memory.to_string()));
        }
        if let Some(hostname) = &self.hostname {
            filter.set(&[root, "hostname"], query_filter(hostname));
        }
        if let Some(domain) = &self.domain {
            filter.set(&[root, "domain"], query_filter(domain));
        }
        if let Some(local_disk) = self.local_disk {
            filter.set(&[root, "localDiskFlag"], json!({ "operation": local_disk }));
        }
        if let Some(datacenter) = &self.datacenter {
            filter.set(&[root, "datacenter", "name"], query_filter(datacenter));
        }
        if let Some(nic_speed) = self.nic_speed {
            filter.set(
                &[root, "networkComponents", "maxSpeed"],
                query_filter(nic_speed.to_string()),
            );
        }
        if let Some(public_ip) = &self.public_ip {
            filter.set(&[root, "primaryIpAddress"], query_filter(public_ip));
        }
        if let Some(private_ip) = &self.private_ip {
            filter.set(&[root, "primaryBackendIpAddress"], query_filter(private_ip));
        }
    }
}

/// Fields changed by a server `edit`; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ServerEdit {
    pub userdata: Option<String>,
    pub hostname: Option<String>,
    pub domain: Option<String>,
    pub notes: Option<String>,
    /// 逗號分隔；空字串會移除所有 tag
    pub tags: Option<String>,
}

/// user data 與 tag 各自呼叫；其餘欄位一次 `editObject`，沒有欄位時直接回傳 true
pub(crate) async fn edit_server(
    client: &Client,
    service: &str,
    id: i64,
    changes: &ServerEdit,
) -> Result<Value> {
    if let Some(userdata) = &changes.userdata {
        client
            .call(service, "setUserMetadata")
            .id(id)
            .arg(json!([userdata]))
            .send()
            .await?;
    }

    if let Some(tags) = &changes.tags {
        client
            .call(service, "setTags")
            .id(id)
            .arg(tags.as_str())
            .send()
            .await?;
    }

    let mut object = Map::new();
    for (key, value) in [
        ("hostname", &changes.hostname),
        ("domain", &changes.domain),
        ("notes", &changes.notes),
    ] {
        if let Some(value) = value {
            object.insert(key.to_string(), json!(value));
        }
    }
    if object.is_empty() {
        return Ok(Value::Bool(true));
    }

    client
        .call(service, "editObject")
        .id(id)
        .arg(Value::Object(object))
        .send()
        .await
}

/// 只有看起來像 IP 位址時才以 IP 解析
pub(crate) fn looks_like_ip(identifier: &str) -> bool {
    identifier.parse::<std::net::IpAddr>().is_ok()
}

/// 將 Option<Vec> 形式的列表結果攤平
pub(crate) fn as_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::core::Client;
    use crate::transport::FixtureTransport;
    use std::sync::Arc;

    /// 以 fixture transport 建立的 client，並保留 transport 以檢查呼叫
    pub fn fixture_client() -> (Client, Arc<FixtureTransport>) {
        let transport = Arc::new(FixtureTransport::new());
        let client = Client::new(transport.clone(), None);
        (client, transport)
    }
}
