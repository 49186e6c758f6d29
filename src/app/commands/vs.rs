use crate::app::commands::server::{
    ensure_changes, password_table, resolve_ssh_keys, tags, vlan_table, ServerEditArgs,
    ServerListArgs,
};
use crate::app::environment::Environment;
use crate::app::formatting::{active_txn, blank, listing, mb_to_gb, Cell, FormattedItem, Table};
use crate::app::helpers::resolve_id;
use crate::managers::vs::VsPowerAction;
use crate::managers::VsManager;
use crate::utils::error::{Result, SoftLayerError};
use crate::utils::filter::{lookup, lookup_str};
use clap::{ArgGroup, Subcommand};
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Subcommand)]
pub enum VsCommand {
    /// List virtual servers
    List {
        #[command(flatten)]
        filters: ServerListArgs,
        /// Show only hourly instances
        #[arg(long)]
        hourly: bool,
        /// Show only monthly instances
        #[arg(long)]
        monthly: bool,
    },
    /// Get details for a virtual server
    Detail {
        identifier: String,
        /// Show passwords (check over your shoulder!)
        #[arg(long)]
        passwords: bool,
        /// Show associated prices
        #[arg(long)]
        price: bool,
    },
    /// Cancel virtual servers
    Cancel { identifier: String },
    /// Reload operating system on a virtual server
    Reload {
        identifier: String,
        /// Post-install script to download
        #[arg(short = 'i', long)]
        postinstall: Option<String>,
        /// SSH keys to add to the root user (multiple allowed)
        #[arg(short = 'k', long = "key")]
        keys: Vec<String>,
        /// Image ID. The default is to use the current operating system
        #[arg(long)]
        image: Option<i64>,
    },
    /// Edit a virtual server's details
    Edit {
        identifier: String,
        #[command(flatten)]
        changes: ServerEditArgs,
        /// Public port speed
        #[arg(long, value_parser = ["0", "10", "100", "1000", "10000"])]
        public_speed: Option<String>,
        /// Private port speed
        #[arg(long, value_parser = ["0", "10", "100", "1000", "10000"])]
        private_speed: Option<String>,
    },
    /// Power on a virtual server
    PowerOn { identifier: String },
    /// Power off an active virtual server
    PowerOff {
        identifier: String,
        /// Perform a hard shutdown
        #[arg(long)]
        hard: bool,
    },
    /// Reboot an active virtual server
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
    /// Pauses an active virtual server
    Pause { identifier: String },
    /// Resumes a paused virtual server
    Resume { identifier: String },
    /// Check if a virtual server is ready
    Ready {
        identifier: String,
        /// Seconds to wait
        #[arg(long, default_value_t = 0)]
        wait: u64,
        /// Also wait for outstanding transactions to finish
        #[arg(long)]
        pending: bool,
    },
    /// Virtual server order options
    CreateOptions,
}

fn list_table(guests: &[Value], sortby: Option<String>) -> Table {
    let mut table = Table::new([
        "id", "hostname", "primary_ip", "backend_ip", "datacenter", "action",
    ]);
    table.sortby = sortby;
    for guest in guests {
        table.add_row(vec![
            guest.get("id").into(),
            guest.get("hostname").into(),
            guest.get("primaryIpAddress").into(),
            guest.get("primaryBackendIpAddress").into(),
            lookup(guest, &["datacenter", "name"]).into(),
            active_txn(guest).into(),
        ]);
    }
    table
}

fn state_item(value: &Value, key_name: &[&str], name: &[&str]) -> FormattedItem {
    match (lookup(value, key_name), lookup_str(value, name)) {
        (Some(key), Some(name)) if !key.is_null() => FormattedItem::new(key.clone(), name),
        _ => blank(),
    }
}

async fn detail_table(
    env: &Environment,
    manager: &VsManager,
    vs_id: i64,
    passwords: bool,
    price: bool,
) -> Result<Table> {
    let result = manager.get_instance(vs_id, None).await?;
    let mut table = Table::key_value();

    table.add_row(vec!["id".into(), result.get("id").into()]);
    table.add_row(vec!["guid".into(), result.get("globalIdentifier").into()]);
    table.add_row(vec!["hostname".into(), result.get("hostname").into()]);
    table.add_row(vec!["domain".into(), result.get("domain").into()]);
    table.add_row(vec!["fqdn".into(), result.get("fullyQualifiedDomainName").into()]);
    table.add_row(vec![
        "status".into(),
        state_item(&result, &["status", "keyName"], &["status", "name"]).into(),
    ]);
    table.add_row(vec![
        "state".into(),
        state_item(&result, &["powerState", "keyName"], &["powerState", "name"]).into(),
    ]);
    table.add_row(vec!["active_transaction".into(), active_txn(&result).into()]);
    table.add_row(vec![
        "datacenter".into(),
        lookup(&result, &["datacenter", "name"]).into(),
    ]);

    let os = lookup(&result, &["operatingSystem", "softwareLicense", "softwareDescription"]);
    let os_version = os.and_then(|os| os.get("version"));
    table.add_row(vec![
        "os".into(),
        match (os_version, os.and_then(|os| lookup_str(os, &["name"]))) {
            (Some(version), Some(name)) => Cell::from(FormattedItem::new(version.clone(), name)),
            _ => Cell::from(blank()),
        },
    ]);
    table.add_row(vec!["os_version".into(), os_version.into()]);
    table.add_row(vec!["cores".into(), result.get("maxCpu").into()]);
    table.add_row(vec![
        "memory".into(),
        result
            .get("maxMemory")
            .and_then(Value::as_i64)
            .map_or_else(|| Cell::from(blank()), |memory| Cell::from(mb_to_gb(memory))),
    ]);
    table.add_row(vec!["public_ip".into(), result.get("primaryIpAddress").into()]);
    table.add_row(vec![
        "private_ip".into(),
        result.get("primaryBackendIpAddress").into(),
    ]);
    table.add_row(vec!["private_only".into(), result.get("privateNetworkOnlyFlag").into()]);
    table.add_row(vec![
        "private_cpu".into(),
        result.get("dedicatedAccountHostOnlyFlag").into(),
    ]);
    table.add_row(vec!["created".into(), result.get("createDate").into()]);
    table.add_row(vec!["modified".into(), result.get("modifyDate").into()]);
    table.add_row(vec![
        "owner".into(),
        lookup(
            &result,
            &["billingItem", "orderItem", "order", "userRecord", "username"],
        )
        .into(),
    ]);
    table.add_row(vec!["vlans".into(), vlan_table(result.get("networkVlans")).into()]);

    if let Some(notes) = lookup_str(&result, &["notes"]).filter(|n| !n.is_empty()) {
        table.add_row(vec!["notes".into(), notes.into()]);
    }
    if price {
        table.add_row(vec![
            "price rate".into(),
            lookup(&result, &["billingItem", "recurringFee"]).into(),
        ]);
    }
    if passwords {
        table.add_row(vec!["users".into(), password_table(&result).into()]);
    }
    table.add_row(vec!["tags".into(), tags(result.get("tagReferences")).into()]);

    // PTR 記錄查不到時略過
    let private_only = result
        .get("privateNetworkOnlyFlag")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !private_only {
        match env
            .client
            .call("Virtual_Guest", "getReverseDomainRecords")
            .id(vs_id)
            .send()
            .await
        {
            Ok(domains) => {
                for domain in domains.as_array().into_iter().flatten() {
                    let records = domain.get("resourceRecords").and_then(Value::as_array);
                    for record in records.into_iter().flatten() {
                        table.add_row(vec!["ptr".into(), record.get("data").into()]);
                    }
                }
            }
            Err(e @ SoftLayerError::ApiError { .. }) => {
                tracing::debug!("no reverse records for {}: {}", vs_id, e);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(table)
}

/// `template` 內某欄位的值列表
fn option_values(options: &Value, group: &str, path: &[&str]) -> Vec<String> {
    let mut values: Vec<String> = options
        .get(group)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|option| lookup(option, path))
        .map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    values.sort();
    values.dedup();
    values
}

fn create_options_table(options: &Value) -> Table {
    let mut table = Table::key_value();
    table.add_row(vec![
        "datacenter".into(),
        listing(
            option_values(options, "datacenters", &["template", "datacenter", "name"]),
            ",",
        )
        .into(),
    ]);

    let mut cpus: Vec<i64> = options
        .get("processors")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|option| lookup(option, &["template", "startCpus"]).and_then(Value::as_i64))
        .collect();
    cpus.sort_unstable();
    cpus.dedup();
    table.add_row(vec!["cpus".into(), listing(cpus, ",").into()]);

    let mut memory: Vec<i64> = options
        .get("memory")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|option| lookup(option, &["template", "maxMemory"]).and_then(Value::as_i64))
        .collect();
    memory.sort_unstable();
    memory.dedup();
    table.add_row(vec!["memory".into(), listing(memory, ",").into()]);

    table.add_row(vec![
        "os".into(),
        listing(
            option_values(
                options,
                "operatingSystems",
                &["template", "operatingSystemReferenceCode"],
            ),
            "\n",
        )
        .into(),
    ]);

    let mut speeds: Vec<i64> = options
        .get("networkComponents")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|option| {
            lookup(option, &["template", "networkComponents"])
                .and_then(Value::as_array)
                .and_then(|components| components.first())
                .and_then(|component| component.get("maxSpeed"))
                .and_then(Value::as_i64)
        })
        .collect();
    speeds.sort_unstable();
    speeds.dedup();
    table.add_row(vec!["nic".into(), listing(speeds, ",").into()]);
    table
}

fn port_speed(raw: &str) -> Result<u32> {
    raw.parse()
        .map_err(|_| SoftLayerError::argument(format!("Invalid port speed: {}", raw)))
}

pub async fn run(env: &mut Environment, cmd: VsCommand) -> Result<()> {
    let manager = VsManager::new(env.client.clone());
    match cmd {
        VsCommand::List {
            filters,
            hourly,
            monthly,
        } => {
            let guests = manager
                .list_instances(hourly, monthly, &filters.to_filter(), None)
                .await?;
            env.fout(list_table(&guests, filters.sortby))
        }
        VsCommand::Detail {
            identifier,
            passwords,
            price,
        } => {
            let vs_id = resolve_id(&manager, &identifier, "VS").await?;
            let table = detail_table(env, &manager, vs_id, passwords, price).await?;
            env.fout(table)
        }
        VsCommand::Cancel { identifier } => {
            let vs_id = resolve_id(&manager, &identifier, "VS").await?;
            env.require_confirmation(&vs_id.to_string())?;
            manager.cancel_instance(vs_id).await?;
            Ok(())
        }
        VsCommand::Reload {
            identifier,
            postinstall,
            keys,
            image,
        } => {
            let vs_id = resolve_id(&manager, &identifier, "VS").await?;
            let key_ids = resolve_ssh_keys(env, &keys).await?;
            env.require_confirmation(&vs_id.to_string())?;
            manager
                .reload_instance(vs_id, postinstall.as_deref(), &key_ids, image)
                .await?;
            Ok(())
        }
        VsCommand::Edit {
            identifier,
            changes,
            public_speed,
            private_speed,
        } => {
            let vs_id = resolve_id(&manager, &identifier, "VS").await?;
            let edit = changes.to_edit()?;
            if public_speed.is_none() && private_speed.is_none() {
                ensure_changes(&edit)?;
            }

            let result = manager.edit(vs_id, &edit).await?;
            if result == Value::Bool(false) {
                return Err(SoftLayerError::abort("Failed to update virtual server"));
            }
            if let Some(speed) = public_speed {
                manager.change_port_speed(vs_id, true, port_speed(&speed)?).await?;
            }
            if let Some(speed) = private_speed {
                manager.change_port_speed(vs_id, false, port_speed(&speed)?).await?;
            }
            Ok(())
        }
        VsCommand::PowerOn { identifier } => {
            let vs_id = resolve_id(&manager, &identifier, "VS").await?;
            manager.power(vs_id, VsPowerAction::PowerOn).await?;
            Ok(())
        }
        VsCommand::PowerOff { identifier, hard } => {
            let vs_id = resolve_id(&manager, &identifier, "VS").await?;
            env.require_confirmation(&vs_id.to_string())?;
            let action = if hard {
                VsPowerAction::PowerOff
            } else {
                VsPowerAction::PowerOffSoft
            };
            manager.power(vs_id, action).await?;
            Ok(())
        }
        VsCommand::Reboot {
            identifier,
            hard,
            soft,
        } => {
            let vs_id = resolve_id(&manager, &identifier, "VS").await?;
            env.require_confirmation(&vs_id.to_string())?;
            let action = match (hard, soft) {
                (true, _) => VsPowerAction::RebootHard,
                (_, true) => VsPowerAction::RebootSoft,
                _ => VsPowerAction::RebootDefault,
            };
            manager.power(vs_id, action).await?;
            Ok(())
        }
        VsCommand::Pause { identifier } => {
            let vs_id = resolve_id(&manager, &identifier, "VS").await?;
            env.require_confirmation(&vs_id.to_string())?;
            manager.power(vs_id, VsPowerAction::Pause).await?;
            Ok(())
        }
        VsCommand::Resume { identifier } => {
            let vs_id = resolve_id(&manager, &identifier, "VS").await?;
            manager.power(vs_id, VsPowerAction::Resume).await?;
            Ok(())
        }
        VsCommand::Ready {
            identifier,
            wait,
            pending,
        } => {
            let vs_id = resolve_id(&manager, &identifier, "VS").await?;
            let limit = Duration::from_secs(wait);
            let delay = Duration::from_secs(wait.clamp(1, 10));
            if manager.wait_for_ready(vs_id, limit, delay, pending).await? {
                env.fout("READY")
            } else {
                Err(SoftLayerError::abort(format!("Instance {} not ready", vs_id)))
            }
        }
        VsCommand::CreateOptions => {
            let options = manager.get_create_options().await?;
            env.fout(create_options_table(&options))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::demo_env;
    use crate::config::cli::OutputFormat;
    use serde_json::json;

    fn list() -> VsCommand {
        VsCommand::List {
            filters: ServerListArgs::default(),
            hourly: false,
            monthly: false,
        }
    }

    #[tokio::test]
    async fn test_list() {
        let (mut env, buffer, transport) = demo_env(OutputFormat::Json, "");
        run(&mut env, list()).await.unwrap();

        assert_eq!(transport.calls_to("Account", "getVirtualGuests").len(), 1);
        let out: Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(out[0]["hostname"], "vs-test1");
        assert_eq!(out[0]["datacenter"], "dal13");
        assert_eq!(out[0]["action"], "");
    }

    #[tokio::test]
    async fn test_list_hourly_with_filters() {
        let (mut env, _, transport) = demo_env(OutputFormat::Raw, "");
        run(
            &mut env,
            VsCommand::List {
                filters: ServerListArgs {
                    datacenter: Some("dal13".to_string()),
                    ..Default::default()
                },
                hourly: true,
                monthly: false,
            },
        )
        .await
        .unwrap();
        let call = transport.last_call("Account", "getHourlyVirtualGuests").unwrap();
        assert_eq!(
            call.filter,
            Some(json!({"virtualGuests": {"datacenter": {"name": {"operation": "_= dal13"}}}}))
        );
    }

    #[tokio::test]
    async fn test_detail() {
        let (mut env, buffer, _) = demo_env(OutputFormat::Json, "");
        run(
            &mut env,
            VsCommand::Detail {
                identifier: "100".to_string(),
                passwords: true,
                price: true,
            },
        )
        .await
        .unwrap();

        let out: Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(out["hostname"], "vs-test1");
        assert_eq!(out["status"], "ACTIVE");
        assert_eq!(out["state"], "RUNNING");
        assert_eq!(out["os"], "12.04-64 Minimal for VSI");
        assert_eq!(out["memory"], 1024);
        assert_eq!(out["owner"], "chechu");
        assert_eq!(out["price rate"], 1.54);
        assert_eq!(out["vlans"], json!([{"type": "PUBLIC", "number": 23, "id": 1}]));
        assert_eq!(out["users"], json!([{"username": "user", "password": "pass"}]));
        assert_eq!(out["tags"], json!(["production"]));
    }

    #[tokio::test]
    async fn test_detail_table_memory() {
        let (mut env, buffer, _) = demo_env(OutputFormat::Table, "");
        run(
            &mut env,
            VsCommand::Detail {
                identifier: "100".to_string(),
                passwords: false,
                price: false,
            },
        )
        .await
        .unwrap();
        let out = buffer.contents();
        assert!(out.contains("memory : 1G"));
        assert!(!out.contains("price rate"));
    }

    #[tokio::test]
    async fn test_cancel_requires_confirmation() {
        let (mut env, _, transport) = demo_env(OutputFormat::Raw, "nope\n");
        let err = run(
            &mut env,
            VsCommand::Cancel {
                identifier: "100".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Aborted.");
        assert!(transport.calls_to("Virtual_Guest", "deleteObject").is_empty());

        let (mut env, _, transport) = demo_env(OutputFormat::Raw, "100\n");
        run(
            &mut env,
            VsCommand::Cancel {
                identifier: "100".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(transport.calls_to("Virtual_Guest", "deleteObject").len(), 1);
    }

    #[tokio::test]
    async fn test_reload_with_keys() {
        let (mut env, _, transport) = demo_env(OutputFormat::Raw, "");
        env.skip_confirmations = true;
        run(
            &mut env,
            VsCommand::Reload {
                identifier: "100".to_string(),
                postinstall: Some("https://example.com/script.sh".to_string()),
                keys: vec!["Test 1".to_string()],
                image: Some(4321),
            },
        )
        .await
        .unwrap();

        let call = transport
            .last_call("Virtual_Guest", "reloadOperatingSystem")
            .unwrap();
        assert_eq!(call.args[0], json!("FORCE"));
        assert_eq!(
            call.args[1],
            json!({
                "customProvisionScriptUri": "https://example.com/script.sh",
                "sshKeyIds": [100],
                "imageTemplateId": 4321
            })
        );
    }

    #[tokio::test]
    async fn test_edit() {
        let (mut env, _, transport) = demo_env(OutputFormat::Raw, "");
        run(
            &mut env,
            VsCommand::Edit {
                identifier: "100".to_string(),
                changes: ServerEditArgs {
                    hostname: Some("new-host".to_string()),
                    tags: vec!["web".to_string()],
                    ..Default::default()
                },
                public_speed: Some("100".to_string()),
                private_speed: None,
            },
        )
        .await
        .unwrap();

        let edit = transport.last_call("Virtual_Guest", "editObject").unwrap();
        assert_eq!(edit.args[0], json!({"hostname": "new-host"}));
        let tags = transport.last_call("Virtual_Guest", "setTags").unwrap();
        assert_eq!(tags.args[0], json!("web"));
        let speed = transport
            .last_call("Virtual_Guest", "setPublicNetworkInterfaceSpeed")
            .unwrap();
        assert_eq!(speed.args[0], json!(100));

        let err = run(
            &mut env,
            VsCommand::Edit {
                identifier: "100".to_string(),
                changes: ServerEditArgs::default(),
                public_speed: None,
                private_speed: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_power_actions() {
        let (mut env, _, transport) = demo_env(OutputFormat::Raw, "");
        env.skip_confirmations = true;
        let id = || "100".to_string();

        run(&mut env, VsCommand::PowerOn { identifier: id() }).await.unwrap();
        run(&mut env, VsCommand::PowerOff { identifier: id(), hard: false })
            .await
            .unwrap();
        run(&mut env, VsCommand::PowerOff { identifier: id(), hard: true })
            .await
            .unwrap();
        run(
            &mut env,
            VsCommand::Reboot {
                identifier: id(),
                hard: false,
                soft: true,
            },
        )
        .await
        .unwrap();
        run(
            &mut env,
            VsCommand::Reboot {
                identifier: id(),
                hard: false,
                soft: false,
            },
        )
        .await
        .unwrap();
        run(&mut env, VsCommand::Pause { identifier: id() }).await.unwrap();
        run(&mut env, VsCommand::Resume { identifier: id() }).await.unwrap();

        let methods: Vec<String> = transport
            .calls()
            .into_iter()
            .map(|call| call.method)
            .collect();
        assert_eq!(
            methods,
            vec![
                "powerOn",
                "powerOffSoft",
                "powerOff",
                "rebootSoft",
                "rebootDefault",
                "pause",
                "resume"
            ]
        );
    }

    #[tokio::test]
    async fn test_ready() {
        let (mut env, buffer, _) = demo_env(OutputFormat::Raw, "");
        run(
            &mut env,
            VsCommand::Ready {
                identifier: "100".to_string(),
                wait: 0,
                pending: false,
            },
        )
        .await
        .unwrap();
        assert_eq!(buffer.contents(), "READY\n");

        let err = run(
            &mut env,
            VsCommand::Ready {
                identifier: "100".to_string(),
                wait: 0,
                pending: true,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Instance 100 not ready");
    }

    #[tokio::test]
    async fn test_create_options() {
        let (mut env, buffer, _) = demo_env(OutputFormat::Json, "");
        run(&mut env, VsCommand::CreateOptions).await.unwrap();

        let out: Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(out["datacenter"], json!(["dal13", "wdc07"]));
        assert_eq!(out["cpus"], json!(["1", "2"]));
        assert_eq!(out["memory"], json!(["1024", "2048"]));
        assert_eq!(out["os"], json!(["CENTOS_LATEST", "UBUNTU_LATEST"]));
        assert_eq!(out["nic"], json!(["10", "100"]));
    }
}
