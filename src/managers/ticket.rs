use crate::core::Client;
use crate::utils::error::{Result, SoftLayerError};
use crate::utils::filter::lookup_i64;
use serde_json::{json, Value};

const LIST_MASK: &str =
    "mask[id, title, assignedUser[firstName, lastName],createDate,lastEditDate,accountId]";

const DETAIL_MASK: &str = "mask[id, title, assignedUser[firstName, lastName],status,\
    createDate,lastEditDate,updates[entry],updateCount]";

/// Support tickets.
#[derive(Debug, Clone)]
pub struct TicketManager {
    client: Client,
}

impl TicketManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// 兩者皆為 true（或皆為 false）時列出全部
    pub async fn list_tickets(&self, open: bool, closed: bool) -> Result<Vec<Value>> {
        let method = match (open, closed) {
            (true, false) => "getOpenTickets",
            (false, true) => "getClosedTickets",
            _ => "getTickets",
        };
        let tickets = self
            .client
            .call("Account", method)
            .mask(LIST_MASK)
            .send()
            .await?;
        Ok(super::as_list(tickets))
    }

    pub async fn list_subjects(&self) -> Result<Vec<Value>> {
        let subjects = self
            .client
            .call("Ticket_Subject", "getAllObjects")
            .send()
            .await?;
        Ok(super::as_list(subjects))
    }

    pub async fn get_ticket(&self, ticket_id: i64) -> Result<Value> {
        self.client
            .call("Ticket", "getObject")
            .id(ticket_id)
            .mask(DETAIL_MASK)
            .send()
            .await
    }

    /// 建立工單並指派給目前使用者
    pub async fn create_ticket(&self, title: &str, body: &str, subject: i64) -> Result<Value> {
        let user = self
            .client
            .call("Account", "getCurrentUser")
            .mask("mask[id]")
            .send()
            .await?;
        let user_id = lookup_i64(&user, &["id"])
            .ok_or_else(|| SoftLayerError::api("SoftLayer_Exception", "Current user has no id"))?;

        let ticket = json!({
            "subjectId": subject,
            "contents": body,
            "assignedUserId": user_id,
            "title": title,
        });
        self.client
            .call("Ticket", "createStandardTicket")
            .arg(ticket)
            .arg(body)
            .send()
            .await
    }

    pub async fn update_ticket(&self, ticket_id: i64, body: &str) -> Result<Value> {
        self.client
            .call("Ticket", "addUpdate")
            .id(ticket_id)
            .arg(json!({ "entry": body }))
            .send()
            .await
    }

    pub async fn attach_hardware(&self, ticket_id: i64, hardware_id: i64) -> Result<Value> {
        self.attachment("addAttachedHardware", ticket_id, hardware_id).await
    }

    pub async fn attach_virtual_server(&self, ticket_id: i64, guest_id: i64) -> Result<Value> {
        self.attachment("addAttachedVirtualGuest", ticket_id, guest_id).await
    }

    pub async fn detach_hardware(&self, ticket_id: i64, hardware_id: i64) -> Result<Value> {
        self.attachment("removeAttachedHardware", ticket_id, hardware_id).await
    }

    pub async fn detach_virtual_server(&self, ticket_id: i64, guest_id: i64) -> Result<Value> {
        self.attachment("removeAttachedVirtualGuest", ticket_id, guest_id).await
    }

    async fn attachment(&self, method: &str, ticket_id: i64, object_id: i64) -> Result<Value> {
        self.client
            .call("Ticket", method)
            .id(ticket_id)
            .arg(object_id)
            .send()
            .await
    }
}
