use crate::core::Client;
use crate::utils::error::Result;
use crate::utils::filter::{lookup_i64, lookup_str, query_filter, query_filter_in, NestedFilter};
use crate::utils::resolver::IdentifierMixin;
use async_trait::async_trait;
use serde_json::Value;

const LIST_MASK: &str = "mask[id,name,cpuCount,diskCapacity,memoryCapacity,datacenter,guestCount]";

const DETAIL_MASK: &str = "id,name,cpuCount,memoryCapacity,diskCapacity,createDate,modifyDate,\
    backendRouter[id, hostname, domain],\
    billingItem[id, nextInvoiceTotalRecurringAmount, children[categoryCode,nextInvoiceTotalRecurringAmount],\
    orderItem[id, order.userRecord[username]]],\
    datacenter[id, name, longName],guests[id, hostname, domain, uuid],guestCount";

/// Filters for [`DedicatedHostManager::list_instances`].
#[derive(Debug, Clone, Default)]
pub struct DedicatedHostFilter {
    pub tags: Vec<String>,
    pub cpus: Option<u32>,
    /// GB
    pub memory: Option<u64>,
    pub name: Option<String>,
    /// GB
    pub disk: Option<u64>,
    pub datacenter: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub enum DedicatedHostResolver {
    Name,
}

#[derive(Debug, Clone)]
pub struct DedicatedHostManager {
    client: Client,
}

impl DedicatedHostManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn hosts_filter(filters: &DedicatedHostFilter) -> Value {
        let mut filter = NestedFilter::new();
        if !filters.tags.is_empty() {
            filter.set(
                &["dedicatedHosts", "tagReferences", "tag", "name"],
                query_filter_in(filters.tags.iter().map(String::as_str)),
            );
        }
        if let Some(name) = &filters.name {
            filter.set(&["dedicatedHosts", "name"], query_filter(name));
        }
        if let Some(cpus) = filters.cpus {
            filter.set(&["dedicatedHosts", "cpuCount"], query_filter(cpus.to_string()));
        }
        if let Some(disk) = filters.disk {
            filter.set(&["dedicatedHosts", "diskCapacity"], query_filter(disk.to_string()));
        }
        if let Some(memory) = filters.memory {
            filter.set(&["dedicatedHosts", "memoryCapacity"], query_filter(memory.to_string()));
        }
        if let Some(datacenter) = &filters.datacenter {
            filter.set(&["dedicatedHosts", "datacenter", "name"], query_filter(datacenter));
        }
        filter.into_value()
    }

    pub async fn list_instances(&self, filters: &DedicatedHostFilter) -> Result<Vec<Value>> {
        let hosts = self
            .client
            .call("Account", "getDedicatedHosts")
            .mask(LIST_MASK)
            .filter(Self::hosts_filter(filters))
            .send()
            .await?;
        Ok(super::as_list(hosts))
    }

    pub async fn get_host(&self, host_id: i64) -> Result<Value> {
        self.client
            .call("Virtual_DedicatedHost", "getObject")
            .id(host_id)
            .mask(DETAIL_MASK)
            .send()
            .await
    }
}

#[async_trait]
impl IdentifierMixin for DedicatedHostManager {
    type Resolver = DedicatedHostResolver;
    const RESOLVERS: &'static [DedicatedHostResolver] = &[DedicatedHostResolver::Name];

    async fn resolve_with(&self, resolver: DedicatedHostResolver, identifier: &str) -> Result<Vec<i64>> {
        match resolver {
            DedicatedHostResolver::Name => {
                let filters = DedicatedHostFilter {
                    name: Some(identifier.to_string()),
                    ..Default::default()
                };
                Ok(self
                    .list_instances(&filters)
                    .await?
                    .iter()
                    .filter(|host| lookup_str(host, &["name"]) == Some(identifier))
                    .filter_map(|host| lookup_i64(host, &["id"]))
                    .collect())
            }
        }
    }
}
