use crate::core::Client;
use crate::utils::error::Result;
use crate::utils::filter::{lookup_str, query_filter_in, query_filter_orderby};
use serde_json::{json, Value};

const DEFAULT_BILLING_ITEM_MASK: &str = "mask[
    orderItem[id,order[id,userRecord[id,email,displayName,userStatus]]],
    nextInvoiceTotalRecurringAmount,
    location, hourlyFlag, children
]";

const SUMMARY_MASK: &str = "mask[
    nextInvoiceTotalAmount,
    pendingInvoice[invoiceTotalAmount],
    blockDeviceTemplateGroupCount,
    dedicatedHostCount,
    domainCount,
    hardwareCount,
    networkStorageCount,
    openTicketCount,
    networkVlanCount,
    subnetCount,
    userCount,
    virtualGuestCount
]";

const EVENT_LIST_MASK: &str = "mask[id, subject, startDate, endDate, modifyDate, statusCode, \
    acknowledgedFlag, impactedResourceCount, updateCount, systemTicketId, \
    notificationOccurrenceEventType[keyName]]";

const EVENT_DETAIL_MASK: &str = "mask[
    acknowledgedFlag,
    attachments,
    impactedResources,
    statusCode,
    updates,
    notificationOccurrenceEventType]";

const INVOICE_ITEMS_MASK: &str = "mask[
    id, description, hostName, domainName, oneTimeAfterTaxAmount, recurringAfterTaxAmount, createDate,
    categoryCode,
    category[name],
    location[name],
    children[id, category[name], description, oneTimeAfterTaxAmount, recurringAfterTaxAmount]
]";

const ACCOUNT_BILLING_ITEMS_MASK: &str = "mask[
    orderItem[id,order[id,userRecord[id,email,displayName,userStatus]]],
    nextInvoiceTotalRecurringAmount,
    location, hourlyFlag
]";

/// Account summary, invoices, billing items and notification events.
#[derive(Debug, Clone)]
pub struct AccountManager {
    client: Client,
}

impl AccountManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn get_summary(&self) -> Result<Value> {
        self.client
            .call("Account", "getObject")
            .mask(SUMMARY_MASK)
            .send()
            .await
    }

    /// 依事件類型加上額外條件
    pub fn event_filter(event_type: &str) -> Value {
        let mut filter = json!({
            "notificationOccurrenceEventType": {
                "keyName": { "operation": event_type }
            }
        });
        match event_type {
            "PLANNED" => {
                filter["endDate"] = json!({ "operation": "> sysdate - 2" });
                filter["startDate"] = query_filter_orderby("DESC");
            }
            "UNPLANNED_INCIDENT" => {
                filter["modifyDate"] = json!({ "operation": "> sysdate - 2" });
            }
            "ANNOUNCEMENT" => {
                filter["statusCode"] = json!({ "keyName": query_filter_in(["PUBLISHED"]) });
            }
            _ => {}
        }
        filter
    }

    /// 尚未結束的通知事件
    pub async fn get_upcoming_events(&self, event_type: &str) -> Result<Vec<Value>> {
        self.client
            .call("Notification_Occurrence_Event", "getAllObjects")
            .filter(Self::event_filter(event_type))
            .mask(EVENT_LIST_MASK)
            .send_all()
            .await
    }

    pub async fn ack_event(&self, event_id: i64) -> Result<Value> {
        self.client
            .call("Notification_Occurrence_Event", "acknowledgeNotification")
            .id(event_id)
            .send()
            .await
    }

    pub async fn get_event(&self, event_id: i64) -> Result<Value> {
        self.client
            .call("Notification_Occurrence_Event", "getObject")
            .id(event_id)
            .mask(EVENT_DETAIL_MASK)
            .send()
            .await
    }

    /// 預設只取 OPEN 的帳單；`get_all` 時逐頁取回
    pub async fn get_invoices(&self, limit: u32, closed: bool, get_all: bool) -> Result<Vec<Value>> {
        let mut filter = json!({
            "invoices": {
                "createDate": query_filter_orderby("DESC"),
                "statusCode": { "operation": "OPEN" },
            }
        });
        if closed {
            if let Some(invoices) = filter["invoices"].as_object_mut() {
                invoices.remove("statusCode");
            }
        }

        let call = self
            .client
            .call("Account", "getInvoices")
            .mask("mask[invoiceTotalAmount, itemCount]")
            .filter(filter)
            .limit(limit);

        if get_all {
            call.send_all().await
        } else {
            Ok(super::as_list(call.send().await?))
        }
    }

    pub async fn get_billing_items(&self, invoice_id: i64) -> Result<Vec<Value>> {
        self.client
            .call("Billing_Invoice", "getInvoiceTopLevelItems")
            .id(invoice_id)
            .mask(INVOICE_ITEMS_MASK)
            .limit(100)
            .send_all()
            .await
    }

    /// 帳號下所有未取消的頂層計費項目
    pub async fn get_account_billing_items(&self, mask: Option<&str>) -> Result<Vec<Value>> {
        let filter = json!({
            "allTopLevelBillingItems": {
                "cancellationDate": { "operation": "is null" },
                "createDate": query_filter_orderby("ASC"),
            }
        });
        self.client
            .call("Account", "getAllTopLevelBillingItems")
            .mask(mask.unwrap_or(ACCOUNT_BILLING_ITEMS_MASK))
            .filter(filter)
            .limit(100)
            .send_all()
            .await
    }

    pub async fn get_billing_item(&self, item_id: i64, mask: Option<&str>) -> Result<Value> {
        self.client
            .call("Billing_Item", "getObject")
            .id(item_id)
            .mask(mask.unwrap_or(DEFAULT_BILLING_ITEM_MASK))
            .send()
            .await
    }

    pub async fn get_billing_item_from_invoice(&self, item_id: i64, mask: Option<&str>) -> Result<Value> {
        self.client
            .call("Billing_Invoice_Item", "getBillingItem")
            .id(item_id)
            .mask(mask.unwrap_or(DEFAULT_BILLING_ITEM_MASK))
            .send()
            .await
    }

    /// id 可能是 Billing_Item 或 Billing_Invoice_Item；前者回 404 時改查後者
    pub async fn get_item_detail(&self, item_id: i64) -> Result<Value> {
        match self.get_billing_item(item_id, None).await {
            Err(e) if e.fault_code() == Some("404") => {
                tracing::debug!("billing item {} not found, trying invoice item", item_id);
                self.get_billing_item_from_invoice(item_id, None).await
            }
            other => other,
        }
    }

    pub async fn cancel_item(&self, item_id: i64, reason: &str, note: Option<&str>) -> Result<Value> {
        let note = match note {
            Some(note) => note.to_string(),
            None => {
                let user = self
                    .client
                    .call("Account", "getCurrentUser")
                    .mask("mask[id,displayName,email,username]")
                    .send()
                    .await?;
                format!(
                    "Cancelled by {} with the SLCLI",
                    lookup_str(&user, &["username"]).unwrap_or("None")
                )
            }
        };

        self.client
            .call("Billing_Item", "cancelItem")
            .id(item_id)
            .args([json!(false), json!(true), json!(reason), json!(note)])
            .send()
            .await
    }
}
