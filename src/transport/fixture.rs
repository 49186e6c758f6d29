use crate::domain::model::{ApiResult, Request};
use crate::domain::ports::Transport;
use crate::utils::error::{Result, SoftLayerError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// 內建的示範資料，每個服務一個 JSON 物件：`{ "<method>": <result>, ... }`
const FIXTURES: &[(&str, &str)] = &[
    ("SoftLayer_Account", include_str!("fixtures/SoftLayer_Account.json")),
    ("SoftLayer_Billing_Invoice", include_str!("fixtures/SoftLayer_Billing_Invoice.json")),
    (
        "SoftLayer_Billing_Invoice_Item",
        include_str!("fixtures/SoftLayer_Billing_Invoice_Item.json"),
    ),
    ("SoftLayer_Billing_Item", include_str!("fixtures/SoftLayer_Billing_Item.json")),
    ("SoftLayer_Billing_Order_Quote", include_str!("fixtures/SoftLayer_Billing_Order_Quote.json")),
    ("SoftLayer_Dns_Domain", include_str!("fixtures/SoftLayer_Dns_Domain.json")),
    (
        "SoftLayer_Dns_Domain_ResourceRecord",
        include_str!("fixtures/SoftLayer_Dns_Domain_ResourceRecord.json"),
    ),
    ("SoftLayer_Event_Log", include_str!("fixtures/SoftLayer_Event_Log.json")),
    ("SoftLayer_Hardware", include_str!("fixtures/SoftLayer_Hardware.json")),
    ("SoftLayer_Hardware_Server", include_str!("fixtures/SoftLayer_Hardware_Server.json")),
    ("SoftLayer_Location", include_str!("fixtures/SoftLayer_Location.json")),
    ("SoftLayer_Location_Datacenter", include_str!("fixtures/SoftLayer_Location_Datacenter.json")),
    (
        "SoftLayer_Network_Application_Delivery_Controller",
        include_str!("fixtures/SoftLayer_Network_Application_Delivery_Controller.json"),
    ),
    (
        "SoftLayer_Network_CdnMarketplace_Configuration_Cache_Purge",
        include_str!("fixtures/SoftLayer_Network_CdnMarketplace_Configuration_Cache_Purge.json"),
    ),
    (
        "SoftLayer_Network_CdnMarketplace_Configuration_Mapping",
        include_str!("fixtures/SoftLayer_Network_CdnMarketplace_Configuration_Mapping.json"),
    ),
    (
        "SoftLayer_Network_CdnMarketplace_Configuration_Mapping_Path",
        include_str!("fixtures/SoftLayer_Network_CdnMarketplace_Configuration_Mapping_Path.json"),
    ),
    (
        "SoftLayer_Network_CdnMarketplace_Metrics",
        include_str!("fixtures/SoftLayer_Network_CdnMarketplace_Metrics.json"),
    ),
    (
        "SoftLayer_Network_LBaaS_LoadBalancer",
        include_str!("fixtures/SoftLayer_Network_LBaaS_LoadBalancer.json"),
    ),
    ("SoftLayer_Network_Storage", include_str!("fixtures/SoftLayer_Network_Storage.json")),
    ("SoftLayer_Network_Subnet", include_str!("fixtures/SoftLayer_Network_Subnet.json")),
    ("SoftLayer_Network_Vlan", include_str!("fixtures/SoftLayer_Network_Vlan.json")),
    (
        "SoftLayer_Notification_Occurrence_Event",
        include_str!("fixtures/SoftLayer_Notification_Occurrence_Event.json"),
    ),
    ("SoftLayer_Product_Order", include_str!("fixtures/SoftLayer_Product_Order.json")),
    ("SoftLayer_Product_Package", include_str!("fixtures/SoftLayer_Product_Package.json")),
    (
        "SoftLayer_Product_Package_Preset",
        include_str!("fixtures/SoftLayer_Product_Package_Preset.json"),
    ),
    (
        "SoftLayer_Security_Certificate",
        include_str!("fixtures/SoftLayer_Security_Certificate.json"),
    ),
    ("SoftLayer_Security_Ssh_Key", include_str!("fixtures/SoftLayer_Security_Ssh_Key.json")),
    ("SoftLayer_Tag", include_str!("fixtures/SoftLayer_Tag.json")),
    ("SoftLayer_Ticket", include_str!("fixtures/SoftLayer_Ticket.json")),
    ("SoftLayer_Ticket_Subject", include_str!("fixtures/SoftLayer_Ticket_Subject.json")),
    ("SoftLayer_User_Customer", include_str!("fixtures/SoftLayer_User_Customer.json")),
    (
        "SoftLayer_Virtual_DedicatedHost",
        include_str!("fixtures/SoftLayer_Virtual_DedicatedHost.json"),
    ),
    ("SoftLayer_Virtual_Guest", include_str!("fixtures/SoftLayer_Virtual_Guest.json")),
    (
        "SoftLayer_Virtual_Guest_Block_Device_Template_Group",
        include_str!("fixtures/SoftLayer_Virtual_Guest_Block_Device_Template_Group.json"),
    ),
];

#[derive(Debug, Clone)]
enum Canned {
    Value(Value),
    Fault { code: String, message: String },
}

/// Answers calls from built-in fixtures. Used by `slcli --demo` and by tests.
#[derive(Debug, Default)]
pub struct FixtureTransport {
    overrides: Mutex<HashMap<(String, String), Canned>>,
    calls: Mutex<Vec<Request>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // 測試中 panic 後仍要能讀取紀錄
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FixtureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 覆寫單一方法的回傳值
    pub fn set_response(&self, service: &str, method: &str, value: Value) {
        lock(&self.overrides).insert(
            (qualify(service), method.to_string()),
            Canned::Value(value),
        );
    }

    /// 讓單一方法回傳 API fault
    pub fn set_fault(&self, service: &str, method: &str, code: &str, message: &str) {
        lock(&self.overrides).insert(
            (qualify(service), method.to_string()),
            Canned::Fault {
                code: code.to_string(),
                message: message.to_string(),
            },
        );
    }

    /// 所有已送出的請求（依順序）
    pub fn calls(&self) -> Vec<Request> {
        lock(&self.calls).clone()
    }

    /// 指定服務與方法的請求
    pub fn calls_to(&self, service: &str, method: &str) -> Vec<Request> {
        let service = qualify(service);
        lock(&self.calls)
            .iter()
            .filter(|r| r.service == service && r.method == method)
            .cloned()
            .collect()
    }

    pub fn last_call(&self, service: &str, method: &str) -> Option<Request> {
        self.calls_to(service, method).pop()
    }

    fn builtin(service: &str, method: &str) -> Result<Option<Value>> {
        let Some((_, raw)) = FIXTURES.iter().find(|(name, _)| *name == service) else {
            return Ok(None);
        };
        let mut table: Value = serde_json::from_str(raw)?;
        Ok(table.get_mut(method).map(Value::take))
    }
}

fn qualify(service: &str) -> String {
    if service.starts_with("SoftLayer_") {
        service.to_string()
    } else {
        format!("SoftLayer_{}", service)
    }
}

#[async_trait]
impl Transport for FixtureTransport {
    async fn call(&self, request: &mut Request) -> Result<ApiResult> {
        tracing::debug!("fixture call: {}", request);
        lock(&self.calls).push(request.clone());

        let key = (request.service.clone(), request.method.clone());
        let canned = lock(&self.overrides).get(&key).cloned();
        match canned {
            Some(Canned::Value(value)) => return Ok(ApiResult::new(value)),
            Some(Canned::Fault { code, message }) => return Err(SoftLayerError::api(code, message)),
            None => {}
        }

        match Self::builtin(&request.service, &request.method)? {
            Some(value) => Ok(ApiResult::new(value)),
            None => Err(SoftLayerError::api(
                "SoftLayer_Exception_NotImplemented",
                format!(
                    "{}::{} fixture is not implemented",
                    request.service, request.method
                ),
            )),
        }
    }
}
