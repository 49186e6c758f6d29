use crate::core::Client;
use crate::managers::{edit_server, looks_like_ip, ServerEdit, ServerFilter};
use crate::utils::error::Result;
use crate::utils::filter::{lookup, lookup_i64, NestedFilter};
use crate::utils::resolver::IdentifierMixin;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tokio::time::Instant;

const LIST_MASK: &str = "mask[id,globalIdentifier,hostname,domain,fullyQualifiedDomainName,\
    primaryBackendIpAddress,primaryIpAddress,lastKnownPowerState.name,powerState,maxCpu,\
    maxMemory,datacenter,activeTransaction.transactionStatus[friendlyName,name],status]";

const DETAIL_MASK: &str = "mask[
    id,
    globalIdentifier,
    fullyQualifiedDomainName,
    hostname,
    domain,
    createDate,
    modifyDate,
    provisionDate,
    notes,
    dedicatedAccountHostOnlyFlag,
    privateNetworkOnlyFlag,
    primaryBackendIpAddress,
    primaryIpAddress,
    networkComponents[id, status, speed, maxSpeed, name, macAddress, primaryIpAddress, port, primarySubnet],
    lastKnownPowerState.name,
    powerState,
    status,
    maxCpu,
    maxMemory,
    datacenter,
    activeTransaction[id, transactionStatus[friendlyName,name]],
    lastOperatingSystemReload.id,
    blockDevices,
    blockDeviceTemplateGroup[id, name, globalIdentifier],
    postInstallScriptUri,
    softwareComponents[passwords[username,password,notes],softwareLicense[softwareDescription[name]]],
    operatingSystem[passwords[username,password],softwareLicense.softwareDescription[manufacturer,name,version,referenceCode]],
    hourlyBillingFlag,
    userData,
    billingItem.recurringFee,
    tagReferences[id,tag[name,id]],
    networkVlans[id,vlanNumber,networkSpace],
    billingItem.orderItem.order.userRecord[username]
]";

const READY_MASK: &str = "id, lastOperatingSystemReload.id, activeTransaction.id,provisionDate";

/// Power actions available on a virtual server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VsPowerAction {
    PowerOn,
    PowerOffSoft,
    PowerOff,
    RebootSoft,
    RebootHard,
    RebootDefault,
    Pause,
    Resume,
}

impl VsPowerAction {
    pub fn method(self) -> &'static str {
        match self {
            VsPowerAction::PowerOn => "powerOn",
            VsPowerAction::PowerOffSoft => "powerOffSoft",
            VsPowerAction::PowerOff => "powerOff",
            VsPowerAction::RebootSoft => "rebootSoft",
            VsPowerAction::RebootHard => "rebootHard",
            VsPowerAction::RebootDefault => "rebootDefault",
            VsPowerAction::Pause => "pause",
            VsPowerAction::Resume => "resume",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum VsResolver {
    Ip,
    Hostname,
}

/// Virtual servers (`SoftLayer_Virtual_Guest`).
#[derive(Debug, Clone)]
pub struct VsManager {
    client: Client,
}

impl VsManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// hourly 與 monthly 只選一個時改用對應的 API
    pub async fn list_instances(
        &self,
        hourly: bool,
        monthly: bool,
        filters: &ServerFilter,
        mask: Option<&str>,
    ) -> Result<Vec<Value>> {
        let method = match (hourly, monthly) {
            (true, false) => "getHourlyVirtualGuests",
            (false, true) => "getMonthlyVirtualGuests",
            _ => "getVirtualGuests",
        };

        let mut filter = NestedFilter::new();
        filters.apply(&mut filter, "virtualGuests", "maxCpu", "maxMemory");

        let guests = self
            .client
            .call("Account", method)
            .mask(mask.unwrap_or(LIST_MASK))
            .filter(filter.into_value())
            .send()
            .await?;
        Ok(super::as_list(guests))
    }

    pub async fn get_instance(&self, instance_id: i64, mask: Option<&str>) -> Result<Value> {
        self.client
            .call("Virtual_Guest", "getObject")
            .id(instance_id)
            .mask(mask.unwrap_or(DETAIL_MASK))
            .send()
            .await
    }

    pub async fn get_create_options(&self) -> Result<Value> {
        self.client
            .call("Virtual_Guest", "getCreateObjectOptions")
            .send()
            .await
    }

    /// 立即取消並刪除所有資料
    pub async fn cancel_instance(&self, instance_id: i64) -> Result<Value> {
        self.client
            .call("Virtual_Guest", "deleteObject")
            .id(instance_id)
            .send()
            .await
    }

    pub async fn reload_instance(
        &self,
        instance_id: i64,
        post_uri: Option<&str>,
        ssh_keys: &[i64],
        image_id: Option<i64>,
    ) -> Result<Value> {
        let mut config = Map::new();
        if let Some(post_uri) = post_uri {
            config.insert("customProvisionScriptUri".to_string(), json!(post_uri));
        }
        if !ssh_keys.is_empty() {
            config.insert("sshKeyIds".to_string(), json!(ssh_keys));
        }
        if let Some(image_id) = image_id {
            config.insert("imageTemplateId".to_string(), json!(image_id));
        }

        self.client
            .call("Virtual_Guest", "reloadOperatingSystem")
            .id(instance_id)
            .arg("FORCE")
            .arg(Value::Object(config))
            .send()
            .await
    }

    pub async fn edit(&self, instance_id: i64, changes: &ServerEdit) -> Result<Value> {
        edit_server(&self.client, "Virtual_Guest", instance_id, changes).await
    }

    /// speed 為 0 會停用網卡
    pub async fn change_port_speed(&self, instance_id: i64, public: bool, speed: u32) -> Result<Value> {
        let method = if public {
            "setPublicNetworkInterfaceSpeed"
        } else {
            "setPrivateNetworkInterfaceSpeed"
        };
        self.client
            .call("Virtual_Guest", method)
            .id(instance_id)
            .arg(speed)
            .send()
            .await
    }

    pub async fn power(&self, instance_id: i64, action: VsPowerAction) -> Result<Value> {
        tracing::info!("{} on virtual server {}", action.method(), instance_id);
        self.client
            .call("Virtual_Guest", action.method())
            .id(instance_id)
            .send()
            .await
    }

    /// 已佈建完成且不在重灌中即視為就緒；`pending` 時還需沒有任何進行中的 transaction
    pub fn is_ready(instance: &Value, pending: bool) -> bool {
        let last_reload = lookup_i64(instance, &["lastOperatingSystemReload", "id"]);
        let active_transaction = lookup_i64(instance, &["activeTransaction", "id"]);

        let reloading = matches!(
            (active_transaction, last_reload),
            (Some(active), Some(reload)) if active == reload
        );
        let outstanding = pending && active_transaction.is_some();
        let provisioned = lookup(instance, &["provisionDate"])
            .is_some_and(|date| !date.is_null() && date.as_str() != Some(""));

        provisioned && !reloading && !outstanding
    }

    /// 輪詢直到就緒或超過 `limit`
    pub async fn wait_for_ready(
        &self,
        instance_id: i64,
        limit: Duration,
        delay: Duration,
        pending: bool,
    ) -> Result<bool> {
        let until = Instant::now() + limit;
        loop {
            let instance = self.get_instance(instance_id, Some(READY_MASK)).await?;
            if Self::is_ready(&instance, pending) {
                return Ok(true);
            }

            let now = Instant::now();
            if now >= until {
                tracing::info!("virtual server {} not ready after {:?}", instance_id, limit);
                return Ok(false);
            }
            tracing::debug!("virtual server {} not ready, sleeping", instance_id);
            tokio::time::sleep(delay.min(until - now)).await;
        }
    }

    async fn ids_for(&self, filters: ServerFilter) -> Result<Vec<i64>> {
        Ok(self
            .list_instances(true, true, &filters, Some("id"))
            .await?
            .iter()
            .filter_map(|guest| lookup_i64(guest, &["id"]))
            .collect())
    }
}

#[async_trait]
impl IdentifierMixin for VsManager {
    type Resolver = VsResolver;
    const RESOLVERS: &'static [VsResolver] = &[VsResolver::Ip, VsResolver::Hostname];

    async fn resolve_with(&self, resolver: VsResolver, identifier: &str) -> Result<Vec<i64>> {
        match resolver {
            VsResolver::Ip => {
                if !looks_like_ip(identifier) {
                    return Ok(Vec::new());
                }
                // 先找公網 IP，再找內網
                let public = self
                    .ids_for(ServerFilter {
                        public_ip: Some(identifier.to_string()),
                        ..Default::default()
                    })
                    .await?;
                if !public.is_empty() {
                    return Ok(public);
                }
                self.ids_for(ServerFilter {
                    private_ip: Some(identifier.to_string()),
                    ..Default::default()
                })
                .await
            }
            VsResolver::Hostname => {
                self.ids_for(ServerFilter {
                    hostname: Some(identifier.to_string()),
                    ..Default::default()
                })
                .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::testing::fixture_client;

    #[tokio::test]
    async fn test_list_instances_billing_selection() {
        let (client, transport) = fixture_client();
        let manager = VsManager::new(client);
        let none = ServerFilter::default();

        let hourly = manager.list_instances(true, false, &none, None).await.unwrap();
        assert_eq!(hourly[0]["id"], 104);
        let monthly = manager.list_instances(false, true, &none, None).await.unwrap();
        assert_eq!(monthly[0]["id"], 100);
        let all = manager.list_instances(true, true, &none, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let call = transport.last_call("Account", "getVirtualGuests").unwrap();
        assert!(call.filter.is_none());
        assert!(call.mask.unwrap().contains("lastKnownPowerState.name"));
    }

    #[tokio::test]
    async fn test_list_instances_filters() {
        let (client, transport) = fixture_client();
        let filters = ServerFilter {
            tags: vec!["tag1".to_string(), "tag2".to_string()],
            cpus: Some(2),
            memory: Some(1024),
            hostname: Some("hostname".to_string()),
            domain: Some("example.com".to_string()),
            local_disk: Some(true),
            datacenter: Some("dal05".to_string()),
            nic_speed: Some(100),
            public_ip: Some("1.2.3.4".to_string()),
            private_ip: Some("4.3.2.1".to_string()),
        };
        VsManager::new(client)
            .list_instances(true, true, &filters, None)
            .await
            .unwrap();

        let filter = transport
            .last_call("Account", "getVirtualGuests")
            .unwrap()
            .filter
            .unwrap();
        assert_eq!(
            filter,
            json!({
                "virtualGuests": {
                    "tagReferences": {"tag": {"name": {
                        "operation": "in",
                        "options": [{"name": "data", "value": ["tag1", "tag2"]}]
                    }}},
                    "maxCpu": {"operation": 2},
                    "maxMemory": {"operation": 1024},
                    "hostname": {"operation": "_= hostname"},
                    "domain": {"operation": "_= example.com"},
                    "localDiskFlag": {"operation": true},
                    "datacenter": {"name": {"operation": "_= dal05"}},
                    "networkComponents": {"maxSpeed": {"operation": 100}},
                    "primaryIpAddress": {"operation": "_= 1.2.3.4"},
                    "primaryBackendIpAddress": {"operation": "_= 4.3.2.1"}
                }
            })
        );
    }

    #[tokio::test]
    async fn test_reload_instance() {
        let (client, transport) = fixture_client();
        VsManager::new(client)
            .reload_instance(1, Some("https://example.com/script.sh"), &[1701], Some(42))
            .await
            .unwrap();
        let call = transport
            .last_call("Virtual_Guest", "reloadOperatingSystem")
            .unwrap();
        assert_eq!(
            call.args,
            vec![
                json!("FORCE"),
                json!({
                    "customProvisionScriptUri": "https://example.com/script.sh",
                    "sshKeyIds": [1701],
                    "imageTemplateId": 42
                })
            ]
        );
    }

    #[tokio::test]
    async fn test_edit() {
        let (client, transport) = fixture_client();
        let manager = VsManager::new(client);

        let result = manager.edit(100, &ServerEdit::default()).await.unwrap();
        assert_eq!(result, Value::Bool(true));
        assert!(transport.calls().is_empty());

        manager
            .edit(
                100,
                &ServerEdit {
                    userdata: Some("my data".to_string()),
                    hostname: Some("new-host".to_string()),
                    tags: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            transport.last_call("Virtual_Guest", "setUserMetadata").unwrap().args,
            vec![json!(["my data"])]
        );
        assert_eq!(
            transport.last_call("Virtual_Guest", "setTags").unwrap().args,
            vec![json!("")]
        );
        assert_eq!(
            transport.last_call("Virtual_Guest", "editObject").unwrap().args,
            vec![json!({"hostname": "new-host"})]
        );
    }

    #[tokio::test]
    async fn test_change_port_speed_and_power() {
        let (client, transport) = fixture_client();
        let manager = VsManager::new(client);
        manager.change_port_speed(100, false, 10).await.unwrap();
        assert_eq!(
            transport
                .last_call("Virtual_Guest", "setPrivateNetworkInterfaceSpeed")
                .unwrap()
                .args,
            vec![json!(10)]
        );

        manager.power(100, VsPowerAction::PowerOffSoft).await.unwrap();
        assert_eq!(transport.calls_to("Virtual_Guest", "powerOffSoft").len(), 1);
    }

    #[test]
    fn test_is_ready() {
        let provisioned = json!({"provisionDate": "2013-08-01", "activeTransaction": {"id": 1}, "lastOperatingSystemReload": {"id": 5}});
        assert!(VsManager::is_ready(&provisioned, false));
        assert!(!VsManager::is_ready(&provisioned, true));

        let reloading = json!({"provisionDate": "2013-08-01", "activeTransaction": {"id": 5}, "lastOperatingSystemReload": {"id": 5}});
        assert!(!VsManager::is_ready(&reloading, false));

        let provisioning = json!({"provisionDate": null});
        assert!(!VsManager::is_ready(&provisioning, false));
        assert!(!VsManager::is_ready(&json!({"provisionDate": ""}), false));
    }

    #[tokio::test]
    async fn test_wait_for_ready() {
        let (client, transport) = fixture_client();
        let manager = VsManager::new(client);

        let ready = manager
            .wait_for_ready(100, Duration::from_secs(0), Duration::from_millis(1), false)
            .await
            .unwrap();
        assert!(ready);

        // fixture 仍有進行中的 transaction
        let ready = manager
            .wait_for_ready(100, Duration::from_millis(5), Duration::from_millis(1), true)
            .await
            .unwrap();
        assert!(!ready);
        assert!(transport.calls_to("Virtual_Guest", "getObject").len() >= 2);
    }

    #[tokio::test]
    async fn test_resolvers() {
        let (client, transport) = fixture_client();
        let manager = VsManager::new(client);

        assert_eq!(
            manager.resolve_with(VsResolver::Ip, "vs-test1").await.unwrap(),
            Vec::<i64>::new()
        );
        assert!(transport.calls().is_empty());

        let ids = manager.resolve_ids("172.16.240.2").await.unwrap();
        assert!(!ids.is_empty());
        let call = transport.last_call("Account", "getVirtualGuests").unwrap();
        assert_eq!(
            call.filter.unwrap()["virtualGuests"]["primaryIpAddress"]["operation"],
            "_= 172.16.240.2"
        );
        assert_eq!(call.mask.as_deref(), Some("id"));
    }
}
