use crate::app::environment::Environment;
use crate::app::formatting::{Align, Cell, Table};
use crate::app::helpers::{clean_time, resolve_id, text_or_blank, trim_to};
use crate::managers::{HardwareManager, TicketManager, VsManager};
use crate::utils::error::{Result, SoftLayerError};
use crate::utils::filter::{lookup, lookup_i64, lookup_str};
use clap::{Args, Subcommand};
use serde_json::Value;

#[derive(Debug, Subcommand)]
pub enum TicketCommand {
    /// List tickets
    List {
        /// Display only open tickets
        #[arg(long)]
        open: bool,
        /// Display only closed tickets
        #[arg(long)]
        closed: bool,
    },
    /// Get details for a ticket
    Detail {
        identifier: i64,
        /// Number of updates to show
        #[arg(long, default_value_t = 10)]
        count: usize,
    },
    /// Create a support ticket
    Create {
        #[arg(long)]
        title: String,
        /// The subject id to use for the ticket, see `slcli ticket subjects`
        #[arg(long)]
        subject_id: i64,
        /// The ticket body; prompted for when omitted
        #[arg(long)]
        body: Option<String>,
        #[command(flatten)]
        attach: AttachArgs,
    },
    /// Adds an update to an existing ticket
    Update {
        identifier: i64,
        /// Text to add to the ticket; prompted for when omitted
        #[arg(long)]
        body: Option<String>,
    },
    /// List Subject IDs for ticket creation
    Subjects,
    /// Attach devices to a ticket
    Attach {
        identifier: i64,
        #[command(flatten)]
        attach: AttachArgs,
    },
    /// Detach devices from a ticket
    Detach {
        identifier: i64,
        #[command(flatten)]
        attach: AttachArgs,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct AttachArgs {
    /// The identifier for hardware to attach
    #[arg(long)]
    pub hardware: Option<String>,
    /// The identifier for a virtual server to attach
    #[arg(long)]
    pub virtual_server: Option<String>,
}

impl AttachArgs {
    fn is_empty(&self) -> bool {
        self.hardware.is_none() && self.virtual_server.is_none()
    }
}

fn assigned_user(ticket: &Value) -> String {
    match (
        lookup_str(ticket, &["assignedUser", "firstName"]),
        lookup_str(ticket, &["assignedUser", "lastName"]),
    ) {
        (Some(first), Some(last)) => format!("{} {}", first, last),
        _ => "-".to_string(),
    }
}

fn ticket_table(tickets: &[Value]) -> Table {
    let mut table = Table::new([
        "id", "assigned_user", "title", "last_edited", "status", "updates", "priority",
    ]);
    table.set_align("title", Align::Left);
    for ticket in tickets {
        table.add_row(vec![
            ticket.get("id").into(),
            assigned_user(ticket).into(),
            trim_to(&text_or_blank(ticket.get("title")), 56).into(),
            clean_time(ticket.get("lastEditDate"), "%Y-%m-%d %H:%M").into(),
            lookup(ticket, &["status", "name"]).into(),
            ticket.get("updateCount").into(),
            ticket.get("priority").into(),
        ]);
    }
    table
}

fn ticket_detail_table(ticket: &Value, count: usize) -> Table {
    let mut table = Table::key_value();
    table.add_row(vec!["id".into(), ticket.get("id").into()]);
    table.add_row(vec!["title".into(), ticket.get("title").into()]);
    table.add_row(vec!["priority".into(), ticket.get("priority").into()]);
    table.add_row(vec!["user".into(), assigned_user(ticket).into()]);
    table.add_row(vec!["status".into(), lookup(ticket, &["status", "name"]).into()]);
    table.add_row(vec![
        "created".into(),
        clean_time(ticket.get("createDate"), "%Y-%m-%d %H:%M").into(),
    ]);
    table.add_row(vec![
        "edited".into(),
        clean_time(ticket.get("lastEditDate"), "%Y-%m-%d %H:%M").into(),
    ]);

    // 只顯示最新的 count 筆
    let updates: Vec<&Value> = ticket
        .get("updates")
        .and_then(Value::as_array)
        .map(|updates| updates.iter().collect())
        .unwrap_or_default();
    let skip = updates.len().saturating_sub(count);
    for update in updates.into_iter().skip(skip) {
        table.add_row(vec![
            "update".into(),
            Cell::from(text_or_blank(update.get("entry")).trim().to_string()),
        ]);
    }
    table
}

fn body_or_prompt(env: &mut Environment, body: Option<String>) -> Result<String> {
    let body = match body {
        Some(body) => body,
        None => env.input("Ticket body: ")?,
    };
    if body.trim().is_empty() {
        return Err(SoftLayerError::argument("Ticket body cannot be empty"));
    }
    Ok(body)
}

/// 依 attach 參數附加或移除設備
async fn change_attachments(
    env: &Environment,
    ticket_id: i64,
    attach: &AttachArgs,
    detach: bool,
) -> Result<Vec<Value>> {
    let manager = TicketManager::new(env.client.clone());
    let mut results = Vec::new();

    if let Some(hardware) = &attach.hardware {
        let hardware_id = resolve_id(
            &HardwareManager::new(env.client.clone()),
            hardware,
            "hardware",
        )
        .await?;
        results.push(if detach {
            manager.detach_hardware(ticket_id, hardware_id).await?
        } else {
            manager.attach_hardware(ticket_id, hardware_id).await?
        });
    }

    if let Some(guest) = &attach.virtual_server {
        let guest_id = resolve_id(&VsManager::new(env.client.clone()), guest, "VS").await?;
        results.push(if detach {
            manager.detach_virtual_server(ticket_id, guest_id).await?
        } else {
            manager.attach_virtual_server(ticket_id, guest_id).await?
        });
    }

    Ok(results)
}

pub async fn run(env: &mut Environment, cmd: TicketCommand) -> Result<()> {
    let manager = TicketManager::new(env.client.clone());
    match cmd {
        TicketCommand::List { open, closed } => {
            let tickets = manager.list_tickets(open, closed).await?;
            env.fout(ticket_table(&tickets))
        }
        TicketCommand::Detail { identifier, count } => {
            let ticket = manager.get_ticket(identifier).await?;
            env.fout(ticket_detail_table(&ticket, count))
        }
        TicketCommand::Create {
            title,
            subject_id,
            body,
            attach,
        } => {
            let body = body_or_prompt(env, body)?;
            let created = manager.create_ticket(&title, &body, subject_id).await?;
            let ticket_id = lookup_i64(&created, &["id"]).ok_or_else(|| {
                SoftLayerError::api("SoftLayer_Exception", "Created ticket has no id")
            })?;
            change_attachments(env, ticket_id, &attach, false).await?;

            let ticket = manager.get_ticket(ticket_id).await?;
            env.fout(ticket_detail_table(&ticket, 10))
        }
        TicketCommand::Update { identifier, body } => {
            let body = body_or_prompt(env, body)?;
            manager.update_ticket(identifier, &body).await?;
            env.out(&format!("Ticket {} updated", identifier))
        }
        TicketCommand::Subjects => {
            let subjects = manager.list_subjects().await?;
            let mut table = Table::new(["id", "subject"]);
            for subject in &subjects {
                table.add_row(vec![subject.get("id").into(), subject.get("name").into()]);
            }
            env.fout(table)
        }
        TicketCommand::Attach { identifier, attach } => {
            if attach.is_empty() {
                return Err(SoftLayerError::argument(
                    "Either --hardware or --virtual-server is required",
                ));
            }
            let results = change_attachments(env, identifier, &attach, false).await?;
            env.fout(Value::Array(results))
        }
        TicketCommand::Detach { identifier, attach } => {
            if attach.is_empty() {
                return Err(SoftLayerError::argument(
                    "Either --hardware or --virtual-server is required",
                ));
            }
            change_attachments(env, identifier, &attach, true).await?;
            env.out(&format!("Detached from ticket {}", identifier))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::demo_env;
    use crate::config::cli::OutputFormat;
    use serde_json::json;

    #[tokio::test]
    async fn test_list_open_tickets() {
        let (mut env, buffer, transport) = demo_env(OutputFormat::Json, "");
        run(
            &mut env,
            TicketCommand::List {
                open: true,
                closed: false,
            },
        )
        .await
        .unwrap();

        assert_eq!(transport.calls_to("Account", "getOpenTickets").len(), 1);
        let out: Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(out.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_detail_limits_updates() {
        let (mut env, buffer, _) = demo_env(OutputFormat::Table, "");
        run(
            &mut env,
            TicketCommand::Detail {
                identifier: 100,
                count: 1,
            },
        )
        .await
        .unwrap();

        let out = buffer.contents();
        assert!(out.contains("John Smith"));
        assert!(out.contains("user says something"));
        assert!(!out.contains("a bot says something"));
    }

    #[tokio::test]
    async fn test_create_prompts_for_body_and_attaches() {
        let (mut env, _, transport) = demo_env(OutputFormat::Json, "The network is down\n");
        run(
            &mut env,
            TicketCommand::Create {
                title: "Test".to_string(),
                subject_id: 1004,
                body: None,
                attach: AttachArgs {
                    hardware: Some("1000".to_string()),
                    virtual_server: None,
                },
            },
        )
        .await
        .unwrap();

        let call = transport.last_call("Ticket", "createStandardTicket").unwrap();
        assert_eq!(call.args[0]["contents"], "The network is down");
        assert_eq!(call.args[0]["assignedUserId"], 12345);
        let attach = transport.last_call("Ticket", "addAttachedHardware").unwrap();
        assert_eq!(attach.identifier, Some(100));
        assert_eq!(attach.args, vec![json!(1000)]);
    }

    #[tokio::test]
    async fn test_update_requires_body() {
        let (mut env, _, _) = demo_env(OutputFormat::Raw, "\n");
        let err = run(
            &mut env,
            TicketCommand::Update {
                identifier: 100,
                body: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_attach_and_detach_virtual_server() {
        let (mut env, buffer, transport) = demo_env(OutputFormat::Jsonraw, "");
        let attach = AttachArgs {
            hardware: None,
            virtual_server: Some("100".to_string()),
        };
        run(
            &mut env,
            TicketCommand::Attach {
                identifier: 100,
                attach: attach.clone(),
            },
        )
        .await
        .unwrap();
        assert!(buffer.contents().contains("\"virtualGuestId\":100"));

        run(&mut env, TicketCommand::Detach { identifier: 100, attach })
            .await
            .unwrap();
        assert_eq!(
            transport
                .calls_to("Ticket", "removeAttachedVirtualGuest")
                .len(),
            1
        );

        let err = run(
            &mut env,
            TicketCommand::Attach {
                identifier: 100,
                attach: AttachArgs::default(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_subjects() {
        let (mut env, buffer, _) = demo_env(OutputFormat::Csv, "");
        run(&mut env, TicketCommand::Subjects).await.unwrap();
        assert!(buffer.contents().starts_with("id,subject\n1001,Accounting Request"));
    }
}
