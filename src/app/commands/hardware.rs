use crate::app::commands::server::{
    ensure_changes, password_table, resolve_ssh_keys, tags, vlan_table, ServerEditArgs,
    ServerListArgs,
};
use crate::app::environment::Environment;
use crate::app::formatting::{active_txn, blank, gb, Cell, FormattedItem, Table};
use crate::app::helpers::resolve_id;
use crate::managers::hardware::HardwarePowerAction;
use crate::managers::HardwareManager;
use crate::utils::error::{Result, SoftLayerError};
use crate::utils::filter::{lookup, lookup_str};
use clap::{ArgGroup, Subcommand};
use serde_json::Value;

#[derive(Debug, Subcommand)]
pub enum HardwareCommand {
    /// List hardware servers
    List {
        #[command(flatten)]
        filters: ServerListArgs,
    },
    /// Get details for a hardware device
    Detail {
        identifier: String,
        /// Show passwords (check over your shoulder!)
        #[arg(long)]
        passwords: bool,
        /// Show associated prices
        #[arg(long)]
        price: bool,
    },
    /// Cancel a dedicated server
    Cancel {
        identifier: String,
        /// Cancels the server immediately (instead of on the billing anniversary)
        #[arg(long)]
        immediate: bool,
        /// An optional comment to add to the cancellation ticket
        #[arg(long)]
        comment: Option<String>,
        /// An optional cancellation reason, see `slcli hw cancel-reasons`
        #[arg(long)]
        reason: Option<String>,
    },
    /// Display a list of cancellation reasons
    CancelReasons,
    /// Reload operating system on a server
    Reload {
        identifier: String,
        /// Post-install script to download
        #[arg(short = 'i', long)]
        postinstall: Option<String>,
        /// SSH keys to add to the root user (multiple allowed)
        #[arg(short = 'k', long = "key")]
        keys: Vec<String>,
    },
    /// Power on a server
    PowerOn { identifier: String },
    /// Power off an active server
    PowerOff { identifier: String },
    /// Power cycle a server
    PowerCycle { identifier: String },
    /// Reboot an active server
    #[command(group(ArgGroup::new("mode").args(["hard", "soft"])))]
    Reboot {
        identifier: String,
        /// Perform a hard reboot
        #[arg(long)]
        hard: bool,
        /// Perform a soft reboot
        #[arg(long)]
        soft: bool,
    },
    /// Edit hardware details
    Edit {
        identifier: String,
        #[command(flatten)]
        changes: ServerEditArgs,
    },
}

fn list_table(servers: &[Value], sortby: Option<String>) -> Table {
    let mut table = Table::new([
        "id", "hostname", "primary_ip", "backend_ip", "datacenter", "action",
    ]);
    table.sortby = sortby;
    for server in servers {
        table.add_row(vec![
            server.get("id").into(),
            server.get("hostname").into(),
            server.get("primaryIpAddress").into(),
            server.get("primaryBackendIpAddress").into(),
            lookup(server, &["datacenter", "name"]).into(),
            active_txn(server).into(),
        ]);
    }
    table
}

fn detail_table(result: &Value, passwords: bool, price: bool) -> Table {
    let mut table = Table::key_value();
    table.add_row(vec!["id".into(), result.get("id").into()]);
    table.add_row(vec!["guid".into(), result.get("globalIdentifier").into()]);
    table.add_row(vec!["hostname".into(), result.get("hostname").into()]);
    table.add_row(vec!["domain".into(), result.get("domain").into()]);
    table.add_row(vec!["fqdn".into(), result.get("fullyQualifiedDomainName").into()]);
    table.add_row(vec![
        "status".into(),
        lookup(result, &["hardwareStatus", "status"]).into(),
    ]);
    table.add_row(vec![
        "datacenter".into(),
        lookup(result, &["datacenter", "name"]).into(),
    ]);

    let os = lookup(result, &["operatingSystem", "softwareLicense", "softwareDescription"]);
    let os_name = os.and_then(|os| lookup_str(os, &["name"]));
    let os_version = os.and_then(|os| os.get("version"));
    table.add_row(vec![
        "os".into(),
        match (os_version, os_name) {
            (Some(version), Some(name)) => Cell::from(FormattedItem::new(version.clone(), name)),
            _ => Cell::from(blank()),
        },
    ]);
    table.add_row(vec!["os_version".into(), os_version.into()]);
    table.add_row(vec![
        "cores".into(),
        result.get("processorPhysicalCoreAmount").into(),
    ]);
    table.add_row(vec![
        "memory".into(),
        result
            .get("memoryCapacity")
            .and_then(Value::as_i64)
            .map_or_else(|| Cell::from(blank()), |memory| Cell::from(gb(memory))),
    ]);
    table.add_row(vec!["public_ip".into(), result.get("primaryIpAddress").into()]);
    table.add_row(vec![
        "private_ip".into(),
        result.get("primaryBackendIpAddress").into(),
    ]);
    table.add_row(vec!["created".into(), result.get("provisionDate").into()]);
    table.add_row(vec![
        "owner".into(),
        lookup(
            result,
            &["billingItem", "orderItem", "order", "userRecord", "username"],
        )
        .into(),
    ]);
    table.add_row(vec!["vlans".into(), vlan_table(result.get("networkVlans")).into()]);

    if let Some(notes) = lookup_str(result, &["notes"]).filter(|n| !n.is_empty()) {
        table.add_row(vec!["notes".into(), notes.into()]);
    }
    if price {
        table.add_row(vec![
            "price rate".into(),
            lookup(result, &["billingItem", "recurringFee"]).into(),
        ]);
    }
    if passwords {
        table.add_row(vec!["users".into(), password_table(result).into()]);
    }
    table.add_row(vec!["tags".into(), tags(result.get("tagReferences")).into()]);
    table
}

pub async fn run(env: &mut Environment, cmd: HardwareCommand) -> Result<()> {
    let manager = HardwareManager::new(env.client.clone());
    match cmd {
        HardwareCommand::List { filters } => {
            let servers = manager.list_hardware(&filters.to_filter(), None).await?;
            env.fout(list_table(&servers, filters.sortby))
        }
        HardwareCommand::Detail {
            identifier,
            passwords,
            price,
        } => {
            let hardware_id = resolve_id(&manager, &identifier, "hardware").await?;
            let result = manager.get_hardware(hardware_id, None).await?;
            env.fout(detail_table(&result, passwords, price))
        }
        HardwareCommand::Cancel {
            identifier,
            immediate,
            comment,
            reason,
        } => {
            let hardware_id = resolve_id(&manager, &identifier, "hardware").await?;
            env.require_confirmation(&hardware_id.to_string())?;
            manager
                .cancel_hardware(
                    hardware_id,
                    reason.as_deref().unwrap_or("unneeded"),
                    comment.as_deref().unwrap_or(""),
                    immediate,
                )
                .await?;
            Ok(())
        }
        HardwareCommand::CancelReasons => {
            let mut table = Table::new(["Code", "Reason"]);
            for (code, reason) in HardwareManager::get_cancellation_reasons() {
                table.add_row(vec![(*code).into(), (*reason).into()]);
            }
            env.fout(table)
        }
        HardwareCommand::Reload {
            identifier,
            postinstall,
            keys,
        } => {
            let hardware_id = resolve_id(&manager, &identifier, "hardware").await?;
            let key_ids = resolve_ssh_keys(env, &keys).await?;
            env.require_confirmation(&hardware_id.to_string())?;
            manager
                .reload(hardware_id, postinstall.as_deref(), &key_ids)
                .await?;
            Ok(())
        }
        HardwareCommand::PowerOn { identifier } => {
            let hardware_id = resolve_id(&manager, &identifier, "hardware").await?;
            manager.power(hardware_id, HardwarePowerAction::PowerOn).await?;
            Ok(())
        }
        HardwareCommand::PowerOff { identifier } => {
            let hardware_id = resolve_id(&manager, &identifier, "hardware").await?;
            env.require_confirmation(&hardware_id.to_string())?;
            manager.power(hardware_id, HardwarePowerAction::PowerOff).await?;
            Ok(())
        }
        HardwareCommand::PowerCycle { identifier } => {
            let hardware_id = resolve_id(&manager, &identifier, "hardware").await?;
            env.require_confirmation(&hardware_id.to_string())?;
            manager
                .power(hardware_id, HardwarePowerAction::PowerCycle)
                .await?;
            Ok(())
        }
        HardwareCommand::Reboot {
            identifier,
            hard,
            soft,
        } => {
            let hardware_id = resolve_id(&manager, &identifier, "hardware").await?;
            env.require_confirmation(&hardware_id.to_string())?;
            let action = match (hard, soft) {
                (true, _) => HardwarePowerAction::RebootHard,
                (_, true) => HardwarePowerAction::RebootSoft,
                _ => HardwarePowerAction::RebootDefault,
            };
            manager.power(hardware_id, action).await?;
            Ok(())
        }
        HardwareCommand::Edit {
            identifier,
            changes,
        } => {
            let hardware_id = resolve_id(&manager, &identifier, "hardware").await?;
            let edit = changes.to_edit()?;
            ensure_changes(&edit)?;
            if manager.edit(hardware_id, &edit).await? == Value::Bool(false) {
                return Err(SoftLayerError::abort("Failed to update hardware"));
            }
            Ok(())
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
    async fn test_list() {
        let (mut env, buffer, transport) = demo_env(OutputFormat::Json, "");
        run(
            &mut env,
            HardwareCommand::List {
                filters: ServerListArgs {
                    memory: Some(2),
                    ..Default::default()
                },
            },
        )
        .await
        .unwrap();

        let out: Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(out.as_array().unwrap().len(), 2);
        assert_eq!(out[0]["hostname"], "hardware-test1");
        assert_eq!(out[1]["action"], Value::Null);

        let call = transport.last_call("Account", "getHardware").unwrap();
        assert_eq!(
            call.filter,
            Some(json!({"hardware": {"memoryCapacity": {"operation": 2}}}))
        );
    }

    #[tokio::test]
    async fn test_detail() {
        let (mut env, buffer, _) = demo_env(OutputFormat::Json, "");
        run(
            &mut env,
            HardwareCommand::Detail {
                identifier: "1000".to_string(),
                passwords: true,
                price: false,
            },
        )
        .await
        .unwrap();

        let out: Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(out["status"], "ACTIVE");
        assert_eq!(out["os"], "Ubuntu 12.04 LTS");
        assert_eq!(out["memory"], 2048);
        assert_eq!(out["notes"], "These are test notes.");
        assert_eq!(out["users"], json!([{"username": "root", "password": "abc123"}]));
        assert_eq!(out["vlans"].as_array().unwrap().len(), 2);
        assert_eq!(out["tags"], json!(["test_tag"]));
        assert!(out.get("price rate").is_none());
    }

    #[tokio::test]
    async fn test_cancel() {
        let (mut env, _, transport) = demo_env(OutputFormat::Raw, "1000\n");
        run(
            &mut env,
            HardwareCommand::Cancel {
                identifier: "1000".to_string(),
                immediate: false,
                comment: Some("bye".to_string()),
                reason: Some("cost".to_string()),
            },
        )
        .await
        .unwrap();

        let call = transport.last_call("Billing_Item", "cancelItem").unwrap();
        assert_eq!(call.identifier, Some(6327));
        assert_eq!(
            call.args,
            vec![
                json!(false),
                json!(false),
                json!("Server / Upgrade Costs"),
                json!("bye")
            ]
        );
    }

    #[tokio::test]
    async fn test_cancel_aborted() {
        let (mut env, _, transport) = demo_env(OutputFormat::Raw, "\n");
        let err = run(
            &mut env,
            HardwareCommand::Cancel {
                identifier: "1000".to_string(),
                immediate: false,
                comment: None,
                reason: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(transport.calls_to("Billing_Item", "cancelItem").is_empty());
    }

    #[tokio::test]
    async fn test_cancel_reasons() {
        let (mut env, buffer, _) = demo_env(OutputFormat::Json, "");
        run(&mut env, HardwareCommand::CancelReasons).await.unwrap();
        let out: Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(out.as_array().unwrap().len(), 10);
        assert_eq!(out[0], json!({"Code": "unneeded", "Reason": "No longer needed"}));
    }

    #[tokio::test]
    async fn test_reload_and_power() {
        let (mut env, _, transport) = demo_env(OutputFormat::Raw, "");
        env.skip_confirmations = true;
        let id = || "1000".to_string();

        run(
            &mut env,
            HardwareCommand::Reload {
                identifier: id(),
                postinstall: None,
                keys: vec!["100".to_string()],
            },
        )
        .await
        .unwrap();
        run(&mut env, HardwareCommand::PowerCycle { identifier: id() })
            .await
            .unwrap();
        run(
            &mut env,
            HardwareCommand::Reboot {
                identifier: id(),
                hard: true,
                soft: false,
            },
        )
        .await
        .unwrap();

        let reload = transport
            .last_call("Hardware_Server", "reloadOperatingSystem")
            .unwrap();
        assert_eq!(reload.args[1], json!({"sshKeyIds": [100]}));
        assert_eq!(transport.calls_to("Hardware_Server", "powerCycle").len(), 1);
        assert_eq!(transport.calls_to("Hardware_Server", "rebootHard").len(), 1);
    }

    #[tokio::test]
    async fn test_edit() {
        let (mut env, _, transport) = demo_env(OutputFormat::Raw, "");
        run(
            &mut env,
            HardwareCommand::Edit {
                identifier: "1000".to_string(),
                changes: ServerEditArgs {
                    userdata: Some("data".to_string()),
                    notes: Some("note".to_string()),
                    ..Default::default()
                },
            },
        )
        .await
        .unwrap();

        assert_eq!(
            transport
                .last_call("Hardware_Server", "setUserMetadata")
                .unwrap()
                .args,
            vec![json!(["data"])]
        );
        assert_eq!(
            transport.last_call("Hardware_Server", "editObject").unwrap().args,
            vec![json!({"notes": "note"})]
        );
    }
}
