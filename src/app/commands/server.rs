//! Arguments and tables shared by `vs` and `hw`.

use crate::app::environment::Environment;
use crate::app::formatting::{listing, FormattedItem, Table};
use crate::app::helpers::resolve_id;
use crate::managers::{ServerEdit, ServerFilter, SshKeyManager};
use crate::utils::error::{Result, SoftLayerError};
use crate::utils::filter::lookup_str;
use clap::Args;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Args)]
pub struct ServerListArgs {
    /// Filter by number of CPU cores
    #[arg(short = 'c', long)]
    pub cpu: Option<u32>,
    /// Filter by domain portion of the FQDN
    #[arg(short = 'D', long)]
    pub domain: Option<String>,
    /// Filter by datacenter shortname
    #[arg(short = 'd', long)]
    pub datacenter: Option<String>,
    /// Filter by host portion of the FQDN
    #[arg(short = 'H', long)]
    pub hostname: Option<String>,
    /// Filter by memory
    #[arg(short = 'm', long)]
    pub memory: Option<u64>,
    /// Filter by network port speed in Mbps
    #[arg(short = 'n', long)]
    pub network: Option<u32>,
    /// Filter by public IP address
    #[arg(long)]
    pub public_ip: Option<String>,
    /// Filter by private IP address
    #[arg(long)]
    pub private_ip: Option<String>,
    /// Only servers with local disk
    #[arg(long)]
    pub local_disk: bool,
    /// Filter by tags (multiple allowed)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Column to sort by
    #[arg(long)]
    pub sortby: Option<String>,
}

impl ServerListArgs {
    pub fn to_filter(&self) -> ServerFilter {
        ServerFilter {
            tags: self.tags.clone(),
            cpus: self.cpu,
            memory: self.memory,
            hostname: self.hostname.clone(),
            domain: self.domain.clone(),
            local_disk: self.local_disk.then_some(true),
            datacenter: self.datacenter.clone(),
            nic_speed: self.network,
            public_ip: self.public_ip.clone(),
            private_ip: self.private_ip.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct ServerEditArgs {
    /// Domain portion of the FQDN
    #[arg(short = 'D', long)]
    pub domain: Option<String>,
    /// Host portion of the FQDN
    #[arg(short = 'H', long)]
    pub hostname: Option<String>,
    /// User defined metadata string
    #[arg(short = 'u', long, conflicts_with = "userfile")]
    pub userdata: Option<String>,
    /// Read userdata from file
    #[arg(short = 'F', long)]
    pub userfile: Option<PathBuf>,
    /// Tags to set or empty string to remove all
    #[arg(short = 'g', long = "tag")]
    pub tags: Vec<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

impl ServerEditArgs {
    pub fn to_edit(&self) -> Result<ServerEdit> {
        let userdata = match (&self.userdata, &self.userfile) {
            (Some(data), _) => Some(data.clone()),
            (None, Some(path)) => Some(std::fs::read_to_string(path)?),
            (None, None) => None,
        };
        Ok(ServerEdit {
            userdata,
            hostname: self.hostname.clone(),
            domain: self.domain.clone(),
            notes: self.notes.clone(),
            tags: (!self.tags.is_empty()).then(|| self.tags.join(",")),
        })
    }
}

/// `tagReferences` 的 tag 名稱
pub fn tags(references: Option<&Value>) -> FormattedItem {
    let names: Vec<String> = references
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|reference| lookup_str(reference, &["tag", "name"]))
        .map(str::to_string)
        .collect();
    listing(names, ",")
}

pub fn vlan_table(vlans: Option<&Value>) -> Table {
    let mut table = Table::new(["type", "number", "id"]);
    for vlan in vlans.and_then(Value::as_array).into_iter().flatten() {
        table.add_row(vec![
            vlan.get("networkSpace").into(),
            vlan.get("vlanNumber").into(),
            vlan.get("id").into(),
        ]);
    }
    table
}

/// `operatingSystem.passwords` 列表
pub fn password_table(server: &Value) -> Table {
    let mut table = Table::new(["username", "password"]);
    let passwords = server
        .get("operatingSystem")
        .and_then(|os| os.get("passwords"))
        .and_then(Value::as_array);
    for item in passwords.into_iter().flatten() {
        table.add_row(vec![item.get("username").into(), item.get("password").into()]);
    }
    table
}

pub async fn resolve_ssh_keys(env: &Environment, keys: &[String]) -> Result<Vec<i64>> {
    let manager = SshKeyManager::new(env.client.clone());
    let mut ids = Vec::with_capacity(keys.len());
    for key in keys {
        ids.push(resolve_id(&manager, key, "SshKey").await?);
    }
    Ok(ids)
}

pub fn ensure_changes(edit: &ServerEdit) -> Result<()> {
    if edit.userdata.is_none()
        && edit.hostname.is_none()
        && edit.domain.is_none()
        && edit.notes.is_none()
        && edit.tags.is_none()
    {
        return Err(SoftLayerError::argument("At least one option is required"));
    }
    Ok(())
}
