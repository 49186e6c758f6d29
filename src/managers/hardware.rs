use crate::core::Client;
use crate::managers::{edit_server, looks_like_ip, ServerEdit, ServerFilter};
use crate::managers::ticket::TicketManager;
use crate::utils::error::{Result, SoftLayerError};
use crate::utils::filter::{lookup, lookup_i64, NestedFilter};
use crate::utils::resolver::IdentifierMixin;
use async_trait::async_trait;
use serde_json::{json, Map, Value};

const LIST_MASK: &str = "mask[id,hostname,domain,hardwareStatusId,globalIdentifier,\
    fullyQualifiedDomainName,processorPhysicalCoreAmount,memoryCapacity,\
    primaryBackendIpAddress,primaryIpAddress,datacenter.name,hardwareStatus,\
    activeTransaction[id, transactionStatus[friendlyName,name]]]";

const DETAIL_MASK: &str = "mask[
    id,
    globalIdentifier,
    fullyQualifiedDomainName,
    hostname,
    domain,
    provisionDate,
    hardwareStatus,
    processorPhysicalCoreAmount,
    memoryCapacity,
    notes,
    primaryBackendIpAddress,
    primaryIpAddress,
    datacenter.name,
    networkComponents[id, status, maxSpeed, name, ipmiMacAddress, ipmiIpAddress, macAddress, primaryIpAddress, port, primarySubnet[id, netmask, broadcastAddress, networkIdentifier, gateway]],
    activeTransaction.id,
    operatingSystem.softwareLicense.softwareDescription[manufacturer,name,version,referenceCode],
    operatingSystem.passwords[username,password],
    billingItem[id,recurringFee,orderItem.order.userRecord[username]],
    hourlyBillingFlag,
    tagReferences[id,tag[name,id]],
    networkVlans[id,vlanNumber,networkSpace]
]";

const CANCEL_MASK: &str =
    "mask[id, hourlyBillingFlag, billingItem[id], openCancellationTicket[id], activeTransaction]";

const RECLAIM_MESSAGE: &str = "Please reclaim this server ASAP, it is no longer needed. Thankyou.";

/// 取消原因代碼與說明
pub const CANCELLATION_REASONS: [(&str, &str); 10] = [
    ("unneeded", "No longer needed"),
    ("closing", "Business closing down"),
    ("cost", "Server / Upgrade Costs"),
    ("migrate_larger", "Migrating to larger server"),
    ("migrate_smaller", "Migrating to smaller server"),
    ("datacenter", "Migrating to a different SoftLayer datacenter"),
    ("performance", "Network performance / latency"),
    ("support", "Support response / timing"),
    ("sales", "Sales process / upgrades"),
    ("moving", "Moving to competitor"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwarePowerAction {
    PowerOn,
    PowerOff,
    PowerCycle,
    RebootSoft,
    RebootHard,
    RebootDefault,
}

impl HardwarePowerAction {
    pub fn method(self) -> &'static str {
        match self {
            HardwarePowerAction::PowerOn => "powerOn",
            HardwarePowerAction::PowerOff => "powerOff",
            HardwarePowerAction::PowerCycle => "powerCycle",
            HardwarePowerAction::RebootSoft => "rebootSoft",
            HardwarePowerAction::RebootHard => "rebootHard",
            HardwarePowerAction::RebootDefault => "rebootDefault",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum HardwareResolver {
    Ip,
    Hostname,
}

/// Bare metal and dedicated servers (`SoftLayer_Hardware_Server`).
#[derive(Debug, Clone)]
pub struct HardwareManager {
    client: Client,
}

impl HardwareManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn list_hardware(&self, filters: &ServerFilter, mask: Option<&str>) -> Result<Vec<Value>> {
        let mut filter = NestedFilter::new();
        filters.apply(
            &mut filter,
            "hardware",
            "processorPhysicalCoreAmount",
            "memoryCapacity",
        );

        let hardware = self
            .client
            .call("Account", "getHardware")
            .mask(mask.unwrap_or(LIST_MASK))
            .filter(filter.into_value())
            .send()
            .await?;
        Ok(super::as_list(hardware))
    }

    pub async fn get_hardware(&self, hardware_id: i64, mask: Option<&str>) -> Result<Value> {
        self.client
            .call("Hardware_Server", "getObject")
            .id(hardware_id)
            .mask(mask.unwrap_or(DETAIL_MASK))
            .send()
            .await
    }

    /// 以目前的設定重灌作業系統
    pub async fn reload(&self, hardware_id: i64, post_uri: Option<&str>, ssh_keys: &[i64]) -> Result<Value> {
        let mut config = Map::new();
        if let Some(post_uri) = post_uri {
            config.insert("customProvisionScriptUri".to_string(), json!(post_uri));
        }
        if !ssh_keys.is_empty() {
            config.insert("sshKeyIds".to_string(), json!(ssh_keys));
        }

        self.client
            .call("Hardware_Server", "reloadOperatingSystem")
            .id(hardware_id)
            .arg("FORCE")
            .arg(Value::Object(config))
            .send()
            .await
    }

    pub fn get_cancellation_reasons() -> &'static [(&'static str, &'static str)] {
        &CANCELLATION_REASONS
    }

    /// 未知的代碼視為 `unneeded`
    pub fn cancellation_reason(code: &str) -> &'static str {
        CANCELLATION_REASONS
            .iter()
            .find(|(key, _)| *key == code)
            .map(|(_, text)| *text)
            .unwrap_or(CANCELLATION_REASONS[0].1)
    }

    /// 透過計費項目取消。月繳主機無法保證立即取消，改為開工單請求回收。
    pub async fn cancel_hardware(
        &self,
        hardware_id: i64,
        reason: &str,
        comment: &str,
        immediate: bool,
    ) -> Result<Value> {
        let reason = Self::cancellation_reason(reason);
        let server = self.get_hardware(hardware_id, Some(CANCEL_MASK)).await?;

        if lookup(&server, &["activeTransaction"]).is_some_and(|t| !t.is_null()) {
            return Err(SoftLayerError::operation(format!(
                "Hardware {} has an active transaction, wait for it to finish before cancelling",
                hardware_id
            )));
        }

        let Some(billing_id) = lookup_i64(&server, &["billingItem", "id"]) else {
            if let Some(ticket) = lookup_i64(&server, &["openCancellationTicket", "id"]) {
                return Err(SoftLayerError::operation(format!(
                    "Ticket #{} already exists for this server",
                    ticket
                )));
            }
            return Err(SoftLayerError::operation(format!(
                "Cannot locate billing for the server. The server may already be cancelled. ({})",
                hardware_id
            )));
        };

        let hourly = lookup(&server, &["hourlyBillingFlag"])
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if immediate && !hourly {
            tracing::warn!(
                "Immediate cancellation of monthly server {} is not guaranteed, opening a reclaim request",
                hardware_id
            );
            let result = self
                .cancel_billing_item(billing_id, false, reason, comment)
                .await?;

            let refreshed = self.get_hardware(hardware_id, Some(CANCEL_MASK)).await?;
            if let Some(ticket) = lookup_i64(&refreshed, &["openCancellationTicket", "id"]) {
                TicketManager::new(self.client.clone())
                    .update_ticket(ticket, RECLAIM_MESSAGE)
                    .await?;
            }
            return Ok(result);
        }

        self.cancel_billing_item(billing_id, immediate, reason, comment)
            .await
    }

    async fn cancel_billing_item(
        &self,
        billing_id: i64,
        immediate: bool,
        reason: &str,
        comment: &str,
    ) -> Result<Value> {
        self.client
            .call("Billing_Item", "cancelItem")
            .id(billing_id)
            .args([json!(immediate), json!(false), json!(reason), json!(comment)])
            .send()
            .await
    }

    pub async fn edit(&self, hardware_id: i64, changes: &ServerEdit) -> Result<Value> {
        edit_server(&self.client, "Hardware_Server", hardware_id, changes).await
    }

    pub async fn power(&self, hardware_id: i64, action: HardwarePowerAction) -> Result<Value> {
        tracing::info!("{} on hardware {}", action.method(), hardware_id);
        self.client
            .call("Hardware_Server", action.method())
            .id(hardware_id)
            .send()
            .await
    }

    async fn ids_for(&self, filters: ServerFilter) -> Result<Vec<i64>> {
        Ok(self
            .list_hardware(&filters, Some("id"))
            .await?
            .iter()
            .filter_map(|server| lookup_i64(server, &["id"]))
            .collect())
    }
}

#[async_trait]
impl IdentifierMixin for HardwareManager {
    type Resolver = HardwareResolver;
    const RESOLVERS: &'static [HardwareResolver] =
        &[HardwareResolver::Ip, HardwareResolver::Hostname];

    async fn resolve_with(&self, resolver: HardwareResolver, identifier: &str) -> Result<Vec<i64>> {
        match resolver {
            HardwareResolver::Ip => {
                if !looks_like_ip(identifier) {
                    return Ok(Vec::new());
                }
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
            HardwareResolver::Hostname => {
                self.ids_for(ServerFilter {
                    hostname: Some(identifier.to_string()),
                    ..Default::default()
                })
                .await
            }
        }
    }
}
