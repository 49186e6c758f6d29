use crate::core::Client;
use crate::utils::error::Result;
use crate::utils::filter::{lookup, lookup_i64, lookup_str, query_filter, NestedFilter};
use crate::utils::resolver::IdentifierMixin;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

const VLAN_MASK: &str = "mask[firewallInterfaces,hardware,networkComponents,\
    primaryRouter[id, fullyQualifiedDomainName, datacenter],subnets,\
    totalPrimaryIpAddressCount,virtualGuests]";

const SUBNET_MASK: &str = "mask[hardware, datacenter, networkVlanId, ipAddressCount, \
    virtualGuests, id, networkIdentifier, cidr, subnetType, gateway, broadcastAddress, \
    usableIpAddressCount, note, tagReferences[tag], networkVlan[id,networkSpace]]";

/// Filters accepted by [`NetworkManager::list_subnets`].
#[derive(Debug, Clone, Default)]
pub struct SubnetFilter {
    pub identifier: Option<String>,
    pub datacenter: Option<String>,
    pub version: Option<u8>,
    pub subnet_type: Option<String>,
    pub network_space: Option<String>,
}

/// Per-datacenter counts built from the account VLANs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatacenterSummary {
    pub hardware_count: u64,
    pub networking_count: u64,
    pub primary_ip_count: u64,
    pub subnet_count: u64,
    pub virtual_guest_count: u64,
    pub vlan_count: u64,
}

#[derive(Debug, Clone, Copy)]
pub enum VlanResolver {
    Name,
}

#[derive(Debug, Clone, Copy)]
pub enum SubnetResolver {
    NetworkIdentifier,
}

fn count(value: &Value, key: &str) -> u64 {
    lookup(value, &[key])
        .and_then(Value::as_array)
        .map(|items| items.len() as u64)
        .unwrap_or(0)
}

/// VLANs and subnets.
#[derive(Debug, Clone)]
pub struct NetworkManager {
    client: Client,
}

impl NetworkManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn list_vlans(
        &self,
        datacenter: Option<&str>,
        vlan_number: Option<u32>,
        name: Option<&str>,
    ) -> Result<Vec<Value>> {
        let mut filter = NestedFilter::new();
        if let Some(vlan_number) = vlan_number {
            filter.set(
                &["networkVlans", "vlanNumber"],
                query_filter(vlan_number.to_string()),
            );
        }
        if let Some(name) = name {
            filter.set(&["networkVlans", "name"], query_filter(name));
        }
        if let Some(datacenter) = datacenter {
            filter.set(
                &["networkVlans", "primaryRouter", "datacenter", "name"],
                query_filter(datacenter),
            );
        }

        let vlans = self
            .client
            .call("Account", "getNetworkVlans")
            .mask(VLAN_MASK)
            .filter(filter.into_value())
            .send()
            .await?;
        Ok(super::as_list(vlans))
    }

    pub async fn get_vlan(&self, vlan_id: i64) -> Result<Value> {
        self.client
            .call("Network_Vlan", "getObject")
            .id(vlan_id)
            .mask(VLAN_MASK)
            .send()
            .await
    }

    /// 名稱與備註一次更新，tag 另外設定
    pub async fn edit_vlan(
        &self,
        vlan_id: i64,
        name: Option<&str>,
        note: Option<&str>,
        tags: Option<&str>,
    ) -> Result<bool> {
        let mut object = Map::new();
        if let Some(name) = name {
            object.insert("name".to_string(), json!(name));
        }
        if let Some(note) = note {
            object.insert("note".to_string(), json!(note));
        }

        if !object.is_empty() {
            self.client
                .call("Network_Vlan", "editObject")
                .id(vlan_id)
                .arg(Value::Object(object))
                .send()
                .await?;
        }
        if let Some(tags) = tags {
            self.client
                .call("Network_Vlan", "setTags")
                .id(vlan_id)
                .arg(tags)
                .send()
                .await?;
        }
        Ok(true)
    }

    /// 預設排除 GLOBAL_IP
    pub fn subnets_filter(filters: &SubnetFilter) -> Value {
        let mut filter = NestedFilter::new();
        if let Some(identifier) = &filters.identifier {
            filter.set(&["subnets", "networkIdentifier"], query_filter(identifier));
        }
        if let Some(datacenter) = &filters.datacenter {
            filter.set(&["subnets", "datacenter", "name"], query_filter(datacenter));
        }
        if let Some(version) = filters.version {
            filter.set(&["subnets", "version"], query_filter(version.to_string()));
        }
        match &filters.subnet_type {
            Some(subnet_type) => {
                filter.set(&["subnets", "subnetType"], query_filter(subnet_type));
            }
            None => {
                filter.set(
                    &["subnets", "subnetType"],
                    json!({ "operation": "!= GLOBAL_IP" }),
                );
            }
        }
        if let Some(network_space) = &filters.network_space {
            filter.set(
                &["subnets", "networkVlan", "networkSpace"],
                query_filter(network_space),
            );
        }
        filter.into_value()
    }

    pub async fn list_subnets(&self, filters: &SubnetFilter) -> Result<Vec<Value>> {
        let subnets = self
            .client
            .call("Account", "getSubnets")
            .mask(SUBNET_MASK)
            .filter(Self::subnets_filter(filters))
            .send()
            .await?;
        Ok(super::as_list(subnets))
    }

    pub async fn get_subnet(&self, subnet_id: i64) -> Result<Value> {
        self.client
            .call("Network_Subnet", "getObject")
            .id(subnet_id)
            .mask("mask[id, networkIdentifier, cidr, subnetType, gateway, broadcastAddress, \
                usableIpAddressCount, datacenter, networkVlan[id,networkSpace], \
                ipAddresses, hardware, virtualGuests]")
            .send()
            .await
    }

    /// 依 VLAN 的 primary router 所在機房彙總
    pub async fn summary_by_datacenter(&self) -> Result<BTreeMap<String, DatacenterSummary>> {
        let vlans = self.list_vlans(None, None, None).await?;
        Ok(Self::summarize(&vlans))
    }

    pub fn summarize(vlans: &[Value]) -> BTreeMap<String, DatacenterSummary> {
        let mut datacenters: BTreeMap<String, DatacenterSummary> = BTreeMap::new();
        for vlan in vlans {
            let Some(name) = lookup_str(vlan, &["primaryRouter", "datacenter", "name"]) else {
                tracing::debug!("vlan without a datacenter skipped");
                continue;
            };
            let entry = datacenters.entry(name.to_string()).or_default();
            entry.vlan_count += 1;
            entry.hardware_count += count(vlan, "hardware");
            entry.networking_count += count(vlan, "networkComponents");
            entry.primary_ip_count += lookup_i64(vlan, &["totalPrimaryIpAddressCount"])
                .unwrap_or(0)
                .max(0) as u64;
            entry.subnet_count += count(vlan, "subnets");
            entry.virtual_guest_count += count(vlan, "virtualGuests");
        }
        datacenters
    }

    fn ids(values: Vec<Value>) -> Vec<i64> {
        values
            .iter()
            .filter_map(|value| lookup_i64(value, &["id"]))
            .collect()
    }

    /// VLAN 名稱解析
    pub async fn resolve_vlan_ids(&self, identifier: &str) -> Result<Vec<i64>> {
        VlanResolverHandle(self).resolve_ids(identifier).await
    }
}

/// 子網路以 network identifier 解析
#[async_trait]
impl IdentifierMixin for NetworkManager {
    type Resolver = SubnetResolver;
    const RESOLVERS: &'static [SubnetResolver] = &[SubnetResolver::NetworkIdentifier];

    async fn resolve_with(&self, resolver: SubnetResolver, identifier: &str) -> Result<Vec<i64>> {
        match resolver {
            SubnetResolver::NetworkIdentifier => {
                let filters = SubnetFilter {
                    identifier: Some(identifier.to_string()),
                    ..Default::default()
                };
                let subnets = self
                    .client
                    .call("Account", "getSubnets")
                    .mask("id")
                    .filter(Self::subnets_filter(&filters))
                    .send()
                    .await?;
                Ok(Self::ids(super::as_list(subnets)))
            }
        }
    }
}

struct VlanResolverHandle<'a>(&'a NetworkManager);

#[async_trait]
impl IdentifierMixin for VlanResolverHandle<'_> {
    type Resolver = VlanResolver;
    const RESOLVERS: &'static [VlanResolver] = &[VlanResolver::Name];

    async fn resolve_with(&self, resolver: VlanResolver, identifier: &str) -> Result<Vec<i64>> {
        match resolver {
            VlanResolver::Name => {
                let mut filter = NestedFilter::new();
                filter.set(&["networkVlans", "name"], query_filter(identifier));
                let vlans = self
                    .0
                    .client
                    .call("Account", "getNetworkVlans")
                    .mask("id")
                    .filter(filter.into_value())
                    .send()
                    .await?;
                Ok(NetworkManager::ids(super::as_list(vlans)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::testing::fixture_client;

    #[tokio::test]
    async fn test_list_vlans_filters() {
        let (client, transport) = fixture_client();
        NetworkManager::new(client)
            .list_vlans(Some("dal13"), Some(4444), Some("vlan-public"))
            .await
            .unwrap();
        let call = transport.last_call("Account", "getNetworkVlans").unwrap();
        let filter = call.filter.unwrap();
        assert_eq!(filter["networkVlans"]["vlanNumber"]["operation"], 4444);
        assert_eq!(filter["networkVlans"]["name"]["operation"], "_= vlan-public");
        assert_eq!(
            filter["networkVlans"]["primaryRouter"]["datacenter"]["name"]["operation"],
            "_= dal13"
        );
        assert!(call.mask.unwrap().contains("totalPrimaryIpAddressCount"));
    }

    #[test]
    fn test_subnets_filter_defaults() {
        let filter = NetworkManager::subnets_filter(&SubnetFilter::default());
        assert_eq!(
            filter,
            json!({"subnets": {"subnetType": {"operation": "!= GLOBAL_IP"}}})
        );

        let filter = NetworkManager::subnets_filter(&SubnetFilter {
            identifier: Some("10.0.0.0".to_string()),
            version: Some(4),
            subnet_type: Some("PRIMARY".to_string()),
            network_space: Some("PUBLIC".to_string()),
            datacenter: Some("dal13".to_string()),
        });
        assert_eq!(filter["subnets"]["version"]["operation"], 4);
        assert_eq!(filter["subnets"]["subnetType"]["operation"], "_= PRIMARY");
        assert_eq!(
            filter["subnets"]["networkVlan"]["networkSpace"]["operation"],
            "_= PUBLIC"
        );
    }

    #[tokio::test]
    async fn test_summary_by_datacenter() {
        let (client, _) = fixture_client();
        let summary = NetworkManager::new(client)
            .summary_by_datacenter()
            .await
            .unwrap();
        let dal13 = summary.get("dal13").unwrap();
        assert_eq!(dal13.vlan_count, 2);
        assert!(dal13.virtual_guest_count >= 2);
    }

    #[test]
    fn test_summarize_counts() {
        let vlans = vec![
            json!({
                "primaryRouter": {"datacenter": {"name": "wdc07"}},
                "hardware": [{"id": 1}],
                "networkComponents": [{"id": 1}, {"id": 2}],
                "subnets": [],
                "virtualGuests": [{"id": 3}],
                "totalPrimaryIpAddressCount": 4
            }),
            json!({"primaryRouter": null}),
        ];
        let summary = NetworkManager::summarize(&vlans);
        assert_eq!(summary.len(), 1);
        assert_eq!(
            summary["wdc07"],
            DatacenterSummary {
                hardware_count: 1,
                networking_count: 2,
                primary_ip_count: 4,
                subnet_count: 0,
                virtual_guest_count: 1,
                vlan_count: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_edit_vlan() {
        let (client, transport) = fixture_client();
        NetworkManager::new(client)
            .edit_vlan(1, Some("renamed"), None, Some("a,b"))
            .await
            .unwrap();
        assert_eq!(
            transport.last_call("Network_Vlan", "editObject").unwrap().args,
            vec![json!({"name": "renamed"})]
        );
        assert_eq!(
            transport.last_call("Network_Vlan", "setTags").unwrap().args,
            vec![json!("a,b")]
        );
    }

    #[tokio::test]
    async fn test_resolvers() {
        let (client, transport) = fixture_client();
        let manager = NetworkManager::new(client);

        let ids = manager.resolve_vlan_ids("vlan-public").await.unwrap();
        assert!(ids.contains(&1));
        let ids = manager.resolve_ids("10.0.0.0").await.unwrap();
        assert!(ids.contains(&99));

        let call = transport.last_call("Account", "getSubnets").unwrap();
        assert_eq!(
            call.filter.unwrap()["subnets"]["networkIdentifier"]["operation"],
            "_= 10.0.0.0"
        );
    }
}
