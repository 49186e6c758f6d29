use crate::app::environment::Environment;
use crate::app::formatting::{Align, Cell, Table};
use crate::app::helpers::{clean_time, text_or_blank, trim_to};
use crate::managers::AccountManager;
use crate::utils::error::Result;
use crate::utils::filter::{lookup, lookup_i64, lookup_str};
use clap::Subcommand;
use serde_json::Value;

const EVENT_TYPES: [(&str, &str); 3] = [
    ("PLANNED", "Planned"),
    ("UNPLANNED_INCIDENT", "Unplanned"),
    ("ANNOUNCEMENT", "Announcement"),
];

#[derive(Debug, Subcommand)]
pub enum AccountCommand {
    /// Prints some various bits of information about an account
    Summary,
    /// List invoices
    Invoices {
        /// How many invoices to get back
        #[arg(long, default_value_t = 50)]
        limit: u32,
        /// Include closed invoices
        #[arg(long)]
        closed: bool,
        /// Return ALL invoices. There may be a lot of these
        #[arg(long)]
        all: bool,
    },
    /// Invoice details
    InvoiceDetail { identifier: i64 },
    /// Lists billing items with some other useful information
    BillingItems,
    /// Gets detailed information about a billing item
    ItemDetail { identifier: i64 },
    /// Cancels a billing item
    CancelItem {
        identifier: i64,
        #[arg(long, default_value = "No longer needed")]
        reason: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Summary and acknowledgement of upcoming and ongoing maintenance events
    Events {
        /// Acknowledge every upcoming event
        #[arg(long)]
        ack_all: bool,
    },
    /// Details of a specific event
    EventDetail { identifier: i64 },
    /// Acknowledge an event
    EventAck { identifier: i64 },
}

fn summary_table(account: &Value) -> Table {
    let mut table = Table::key_value().with_title(format!(
        "Account Summary: {}",
        lookup_str(account, &["companyName"]).unwrap_or("-")
    ));
    let rows: [(&str, &[&str]); 12] = [
        ("Company Name", &["companyName"]),
        ("Balance", &["pendingInvoice", "invoiceTotalAmount"]),
        ("Upcoming Invoice", &["nextInvoiceTotalAmount"]),
        ("Image Templates", &["blockDeviceTemplateGroupCount"]),
        ("Dedicated Hosts", &["dedicatedHostCount"]),
        ("Hardware", &["hardwareCount"]),
        ("Virtual Guests", &["virtualGuestCount"]),
        ("Domains", &["domainCount"]),
        ("Network Storage Volumes", &["networkStorageCount"]),
        ("Open Tickets", &["openTicketCount"]),
        ("Network Vlans", &["networkVlanCount"]),
        ("Subnets", &["subnetCount"]),
    ];
    for (name, path) in rows {
        table.add_row(vec![name.into(), lookup(account, path).into()]);
    }
    table.add_row(vec!["Users".into(), account.get("userCount").into()]);
    table
}

fn invoice_table(invoices: &[Value]) -> Table {
    let mut table = Table::new([
        "Id", "Created", "Type", "Status", "Invoice Amount", "Items",
    ])
    .with_title("Invoices");
    for invoice in invoices {
        table.add_row(vec![
            invoice.get("id").into(),
            clean_time(invoice.get("createDate"), "%Y-%m-%d").into(),
            invoice.get("typeCode").into(),
            invoice.get("statusCode").into(),
            invoice.get("invoiceTotalAmount").into(),
            invoice.get("itemCount").into(),
        ]);
    }
    table
}

fn invoice_items_table(invoice_id: i64, items: &[Value]) -> Table {
    let mut table = Table::new([
        "Item Id", "Category", "Description", "Single", "Monthly", "Create Date", "Location",
    ])
    .with_title(format!("Invoice {}", invoice_id));
    table.set_align("Description", Align::Left);
    for item in items {
        let description = match (
            lookup_str(item, &["hostName"]),
            lookup_str(item, &["domainName"]),
        ) {
            (Some(host), Some(domain)) => format!("{}.{}", host, domain),
            _ => text_or_blank(item.get("description")),
        };
        table.add_row(vec![
            item.get("id").into(),
            lookup(item, &["category", "name"]).into(),
            trim_to(&description, 60).into(),
            item.get("oneTimeAfterTaxAmount").into(),
            item.get("recurringAfterTaxAmount").into(),
            clean_time(item.get("createDate"), "%Y-%m-%d").into(),
            lookup(item, &["location", "name"]).into(),
        ]);
        for child in item.get("children").and_then(Value::as_array).into_iter().flatten() {
            table.add_row(vec![
                ">>>".into(),
                lookup(child, &["category", "name"]).into(),
                trim_to(&text_or_blank(child.get("description")), 60).into(),
                child.get("oneTimeAfterTaxAmount").into(),
                child.get("recurringAfterTaxAmount").into(),
                "---".into(),
                "---".into(),
            ]);
        }
    }
    table
}

fn ordered_by(item: &Value) -> String {
    match lookup(item, &["orderItem", "order", "userRecord"]) {
        Some(user) if !user.is_null() => text_or_blank(user.get("displayName")),
        _ => "IBM".to_string(),
    }
}

pub fn billing_items_table(items: &[Value]) -> Table {
    let mut table = Table::new([
        "Id", "Create Date", "Cost", "Category Code", "Ordered By", "Description", "Notes",
    ])
    .with_title("Billing Items");
    table.set_align("Description", Align::Left);
    table.set_align("Category Code", Align::Left);
    for item in items {
        let description = match (
            lookup_str(item, &["hostName"]),
            lookup_str(item, &["domainName"]),
        ) {
            (Some(host), Some(domain)) => format!("{}.{}", host, domain),
            _ => text_or_blank(item.get("description")),
        };
        table.add_row(vec![
            item.get("id").into(),
            clean_time(item.get("createDate"), "%Y-%m-%d").into(),
            item.get("nextInvoiceTotalRecurringAmount").into(),
            item.get("categoryCode").into(),
            ordered_by(item).into(),
            trim_to(&description, 50).into(),
            trim_to(lookup_str(item, &["notes"]).unwrap_or("None"), 40).into(),
        ]);
    }
    table
}

fn item_detail_table(item: &Value) -> Table {
    let mut table = Table::new(["Key", "Value"]).with_title(
        lookup_str(item, &["description"])
            .unwrap_or("Billing Item")
            .to_string(),
    );
    table.set_align("Key", Align::Left);
    table.set_align("Value", Align::Left);
    for field in ["createDate", "cycleStartDate", "cancellationDate"] {
        table.add_row(vec![field.into(), clean_time(item.get(field), "%Y-%m-%d").into()]);
    }
    table.add_row(vec!["description".into(), item.get("description").into()]);

    if let (Some(host), Some(domain)) = (
        lookup_str(item, &["hostName"]),
        lookup_str(item, &["domainName"]),
    ) {
        table.add_row(vec!["FQDN".into(), format!("{}.{}", host, domain).into()]);
    }

    if item.get("hourlyFlag").and_then(Value::as_bool).unwrap_or(false) {
        for field in ["hourlyRecurringFee", "hoursUsed", "currentHourlyCharge"] {
            table.add_row(vec![field.into(), item.get(field).into()]);
        }
    } else {
        table.add_row(vec!["recurringFee".into(), item.get("recurringFee").into()]);
    }

    table.add_row(vec!["Ordered By".into(), ordered_by(item).into()]);
    table.add_row(vec!["Notes".into(), item.get("notes").into()]);
    table.add_row(vec!["Location".into(), lookup(item, &["location", "name"]).into()]);
    for child in item.get("children").and_then(Value::as_array).into_iter().flatten() {
        table.add_row(vec![
            child.get("categoryCode").into(),
            child.get("description").into(),
        ]);
    }
    table
}

fn event_table(title: &str, events: &[Value]) -> Table {
    let mut table = Table::new([
        "Id",
        "Start Date",
        "End Date",
        "Subject",
        "Status",
        "Acknowledged",
        "Updates",
        "Impacted Resources",
    ])
    .with_title(title);
    table.set_align("Subject", Align::Left);
    for event in events {
        table.add_row(vec![
            event.get("id").into(),
            clean_time(event.get("startDate"), "%Y-%m-%d %H:%M").into(),
            clean_time(event.get("endDate"), "%Y-%m-%d %H:%M").into(),
            text_or_blank(event.get("subject")).replace(['\r', '\n'], " ").into(),
            lookup(event, &["statusCode", "name"]).into(),
            event.get("acknowledgedFlag").into(),
            event.get("updateCount").into(),
            event.get("impactedResourceCount").into(),
        ]);
    }
    table
}

fn event_detail_tables(event: &Value) -> Vec<Table> {
    let mut basic = Table::new(["Id", "Status", "Type", "Start", "End", "Acknowledged"])
        .with_title(text_or_blank(event.get("subject")));
    basic.add_row(vec![
        event.get("id").into(),
        lookup(event, &["statusCode", "name"]).into(),
        lookup(event, &["notificationOccurrenceEventType", "keyName"]).into(),
        clean_time(event.get("startDate"), "%Y-%m-%d %H:%M").into(),
        clean_time(event.get("endDate"), "%Y-%m-%d %H:%M").into(),
        event.get("acknowledgedFlag").into(),
    ]);

    let mut impacted = Table::new(["Type", "Id", "Hostname", "Private Ip", "Label"])
        .with_title("Impacted Resources");
    for resource in event
        .get("impactedResources")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        impacted.add_row(vec![
            resource.get("resourceType").into(),
            resource.get("resourceTableId").into(),
            resource.get("hostname").into(),
            resource.get("privateIp").into(),
            resource.get("filterLabel").into(),
        ]);
    }

    let mut updates = Table::new(["Date", "Update"]).with_title("Updates");
    updates.set_align("Update", Align::Left);
    for update in event.get("updates").and_then(Value::as_array).into_iter().flatten() {
        updates.add_row(vec![
            clean_time(update.get("startDate"), "%Y-%m-%d %H:%M").into(),
            Cell::from(text_or_blank(update.get("contents"))),
        ]);
    }

    vec![basic, impacted, updates]
}

pub async fn run(env: &mut Environment, cmd: AccountCommand) -> Result<()> {
    let manager = AccountManager::new(env.client.clone());
    match cmd {
        AccountCommand::Summary => {
            let summary = manager.get_summary().await?;
            env.fout(summary_table(&summary))
        }
        AccountCommand::Invoices { limit, closed, all } => {
            let invoices = manager.get_invoices(limit, closed, all).await?;
            env.fout(invoice_table(&invoices))
        }
        AccountCommand::InvoiceDetail { identifier } => {
            let items = manager.get_billing_items(identifier).await?;
            env.fout(invoice_items_table(identifier, &items))
        }
        AccountCommand::BillingItems => {
            let items = manager.get_account_billing_items(None).await?;
            env.fout(billing_items_table(&items))
        }
        AccountCommand::ItemDetail { identifier } => {
            let item = manager.get_item_detail(identifier).await?;
            env.fout(item_detail_table(&item))
        }
        AccountCommand::CancelItem {
            identifier,
            reason,
            note,
        } => {
            env.require_confirmation(&identifier.to_string())?;
            let result = manager
                .cancel_item(identifier, &reason, note.as_deref())
                .await?;
            env.fout(result)
        }
        AccountCommand::Events { ack_all } => {
            let mut tables = Vec::new();
            for (event_type, title) in EVENT_TYPES {
                let mut events = manager.get_upcoming_events(event_type).await?;
                if ack_all {
                    for event in events.iter_mut() {
                        if let Some(id) = lookup_i64(event, &["id"]) {
                            let acknowledged = manager.ack_event(id).await?;
                            event["acknowledgedFlag"] = acknowledged;
                        }
                    }
                }
                tables.push(event_table(title, &events));
            }
            env.fout(tables)
        }
        AccountCommand::EventDetail { identifier } => {
            let event = manager.get_event(identifier).await?;
            env.fout(event_detail_tables(&event))
        }
        AccountCommand::EventAck { identifier } => {
            let result = manager.ack_event(identifier).await?;
            env.fout(result)
        }
    }
}
