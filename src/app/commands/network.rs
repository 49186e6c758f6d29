use crate::app::environment::Environment;
use crate::app::formatting::{blank, Cell, Table};
use crate::app::helpers::resolve_id;
use crate::managers::network::SubnetFilter;
use crate::managers::NetworkManager;
use crate::utils::error::{Result, SoftLayerError};
use crate::utils::filter::{lookup, lookup_str};
use clap::{Args, Subcommand};
use serde_json::Value;

#[derive(Debug, Subcommand)]
pub enum VlanCommand {
    /// List VLANs
    List {
        /// Filter by datacenter shortname
        #[arg(short = 'd', long)]
        datacenter: Option<String>,
        /// Filter by VLAN number
        #[arg(short = 'n', long)]
        number: Option<u32>,
        /// Filter by VLAN name
        #[arg(long)]
        name: Option<String>,
        /// Column to sort by
        #[arg(long)]
        sortby: Option<String>,
    },
    /// Get details about a VLAN
    Detail {
        identifier: String,
        /// Hide virtual server listing
        #[arg(long)]
        no_vs: bool,
        /// Hide hardware listing
        #[arg(long)]
        no_hardware: bool,
    },
    /// Edit a VLAN's name, note or tags
    Edit {
        identifier: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        note: Option<String>,
        /// Tags to set or empty string to remove all
        #[arg(short = 'g', long = "tag")]
        tags: Vec<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum SubnetCommand {
    /// List subnets
    List {
        /// Filter by network identifier
        #[arg(long)]
        identifier: Option<String>,
        /// Filter by datacenter shortname
        #[arg(short = 'd', long)]
        datacenter: Option<String>,
        /// Display only IPv4 subnets
        #[arg(long = "v4", alias = "ipv4", conflicts_with = "ipv6")]
        ipv4: bool,
        /// Display only IPv6 subnets
        #[arg(long = "v6", alias = "ipv6")]
        ipv6: bool,
        /// Filter by subnet type
        #[arg(short = 't', long)]
        subnet_type: Option<String>,
        /// Filter by network space
        #[arg(long)]
        network_space: Option<String>,
        /// Column to sort by
        #[arg(long)]
        sortby: Option<String>,
    },
    /// Get subnet details
    Detail {
        identifier: String,
        /// Hide virtual server listing
        #[arg(long)]
        no_vs: bool,
        /// Hide hardware listing
        #[arg(long)]
        no_hardware: bool,
    },
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    /// Column to sort by
    #[arg(long, value_parser = [
        "datacenter", "hardware", "vlans", "subnets", "virtual_servers", "public_ips",
    ])]
    pub sortby: Option<String>,
}

fn count(value: &Value, key: &str) -> Cell {
    match value.get(key).and_then(Value::as_array) {
        Some(items) => Cell::from(items.len() as u64),
        None => Cell::from(blank()),
    }
}

/// 主機清單（hostname / domain / IP）
fn server_table(servers: Option<&Value>) -> Table {
    let mut table = Table::new(["hostname", "domain", "public_ip", "private_ip"]);
    for server in servers.and_then(Value::as_array).into_iter().flatten() {
        table.add_row(vec![
            server.get("hostname").into(),
            server.get("domain").into(),
            server.get("primaryIpAddress").into(),
            server.get("primaryBackendIpAddress").into(),
        ]);
    }
    table
}

fn none_or_table(table: Table) -> Cell {
    if table.is_empty() {
        Cell::from("none")
    } else {
        table.into()
    }
}

async fn resolve_vlan(manager: &NetworkManager, identifier: &str) -> Result<i64> {
    let ids = manager.resolve_vlan_ids(identifier).await?;
    match ids.as_slice() {
        [id] => Ok(*id),
        [] => Err(SoftLayerError::abort(format!(
            "Unable to find object with identifier: {}",
            identifier
        ))),
        many => Err(SoftLayerError::abort(format!(
            "Multiple VLAN found for '{}': {}",
            identifier,
            many.iter().map(i64::to_string).collect::<Vec<_>>().join(", ")
        ))),
    }
}

fn vlan_list_table(vlans: &[Value], sortby: Option<String>) -> Table {
    let mut table = Table::new([
        "id",
        "number",
        "name",
        "firewall",
        "datacenter",
        "hardware",
        "virtual_servers",
        "public_ips",
    ]);
    table.sortby = sortby;
    for vlan in vlans {
        let firewall = vlan
            .get("firewallInterfaces")
            .and_then(Value::as_array)
            .is_some_and(|interfaces| !interfaces.is_empty());
        table.add_row(vec![
            vlan.get("id").into(),
            vlan.get("vlanNumber").into(),
            vlan.get("name").into(),
            (if firewall { "Yes" } else { "No" }).into(),
            lookup(vlan, &["primaryRouter", "datacenter", "name"]).into(),
            count(vlan, "hardware"),
            count(vlan, "virtualGuests"),
            vlan.get("totalPrimaryIpAddressCount").into(),
        ]);
    }
    table
}

fn vlan_detail_table(vlan: &Value, no_vs: bool, no_hardware: bool) -> Table {
    let mut table = Table::key_value();
    table.add_row(vec!["id".into(), vlan.get("id").into()]);
    table.add_row(vec!["number".into(), vlan.get("vlanNumber").into()]);
    table.add_row(vec![
        "datacenter".into(),
        lookup(vlan, &["primaryRouter", "datacenter", "longName"]).into(),
    ]);
    table.add_row(vec![
        "primary_router".into(),
        lookup(vlan, &["primaryRouter", "fullyQualifiedDomainName"]).into(),
    ]);
    let firewall = vlan
        .get("firewallInterfaces")
        .and_then(Value::as_array)
        .is_some_and(|interfaces| !interfaces.is_empty());
    table.add_row(vec!["firewall".into(), firewall.into()]);

    let mut subnets = Table::new(["id", "identifier", "netmask", "gateway", "type", "usable ips"]);
    for subnet in vlan.get("subnets").and_then(Value::as_array).into_iter().flatten() {
        subnets.add_row(vec![
            subnet.get("id").into(),
            subnet.get("networkIdentifier").into(),
            subnet.get("netmask").into(),
            subnet.get("gateway").into(),
            subnet.get("subnetType").into(),
            subnet.get("usableIpAddressCount").into(),
        ]);
    }
    table.add_row(vec!["subnets".into(), none_or_table(subnets)]);

    if !no_vs {
        table.add_row(vec![
            "vs".into(),
            none_or_table(server_table(vlan.get("virtualGuests"))),
        ]);
    }
    if !no_hardware {
        table.add_row(vec![
            "hardware".into(),
            none_or_table(server_table(vlan.get("hardware"))),
        ]);
    }
    table
}

fn subnet_list_table(subnets: &[Value], sortby: Option<String>) -> Table {
    let mut table = Table::new([
        "id",
        "identifier",
        "type",
        "network_space",
        "datacenter",
        "vlan_id",
        "IPs",
        "hardware",
        "vs",
    ]);
    table.sortby = sortby;
    for subnet in subnets {
        let identifier = match (
            lookup_str(subnet, &["networkIdentifier"]),
            lookup(subnet, &["cidr"]),
        ) {
            (Some(network), Some(cidr)) => Cell::from(format!("{}/{}", network, cidr)),
            _ => Cell::from(blank()),
        };
        table.add_row(vec![
            subnet.get("id").into(),
            identifier,
            subnet.get("subnetType").into(),
            lookup(subnet, &["networkVlan", "networkSpace"]).into(),
            lookup(subnet, &["datacenter", "name"]).into(),
            subnet.get("networkVlanId").into(),
            subnet.get("ipAddressCount").into(),
            count(subnet, "hardware"),
            count(subnet, "virtualGuests"),
        ]);
    }
    table
}

fn subnet_detail_table(subnet: &Value, no_vs: bool, no_hardware: bool) -> Table {
    let mut table = Table::key_value();
    table.add_row(vec!["id".into(), subnet.get("id").into()]);
    table.add_row(vec!["identifier".into(), subnet.get("networkIdentifier").into()]);
    table.add_row(vec!["subnet type".into(), subnet.get("subnetType").into()]);
    table.add_row(vec![
        "network space".into(),
        lookup(subnet, &["networkVlan", "networkSpace"]).into(),
    ]);
    table.add_row(vec!["gateway".into(), subnet.get("gateway").into()]);
    table.add_row(vec!["broadcast".into(), subnet.get("broadcastAddress").into()]);
    table.add_row(vec!["datacenter".into(), lookup(subnet, &["datacenter", "name"]).into()]);
    table.add_row(vec![
        "usable ips".into(),
        subnet.get("usableIpAddressCount").into(),
    ]);
    if !no_vs {
        table.add_row(vec![
            "vs".into(),
            none_or_table(server_table(subnet.get("virtualGuests"))),
        ]);
    }
    if !no_hardware {
        table.add_row(vec![
            "hardware".into(),
            none_or_table(server_table(subnet.get("hardware"))),
        ]);
    }
    table
}

pub async fn run_vlan(env: &mut Environment, cmd: VlanCommand) -> Result<()> {
    let manager = NetworkManager::new(env.client.clone());
    match cmd {
        VlanCommand::List {
            datacenter,
            number,
            name,
            sortby,
        } => {
            let vlans = manager
                .list_vlans(datacenter.as_deref(), number, name.as_deref())
                .await?;
            env.fout(vlan_list_table(&vlans, sortby))
        }
        VlanCommand::Detail {
            identifier,
            no_vs,
            no_hardware,
        } => {
            let vlan_id = resolve_vlan(&manager, &identifier).await?;
            let vlan = manager.get_vlan(vlan_id).await?;
            env.fout(vlan_detail_table(&vlan, no_vs, no_hardware))
        }
        VlanCommand::Edit {
            identifier,
            name,
            note,
            tags,
        } => {
            if name.is_none() && note.is_none() && tags.is_empty() {
                return Err(SoftLayerError::argument("At least one option is required"));
            }
            let vlan_id = resolve_vlan(&manager, &identifier).await?;
            let tags = (!tags.is_empty()).then(|| tags.join(","));
            manager
                .edit_vlan(vlan_id, name.as_deref(), note.as_deref(), tags.as_deref())
                .await?;
            env.out(&format!("Vlan {} was updated", vlan_id))
        }
    }
}

pub async fn run_subnet(env: &mut Environment, cmd: SubnetCommand) -> Result<()> {
    let manager = NetworkManager::new(env.client.clone());
    match cmd {
        SubnetCommand::List {
            identifier,
            datacenter,
            ipv4,
            ipv6,
            subnet_type,
            network_space,
            sortby,
        } => {
            let version = match (ipv4, ipv6) {
                (true, _) => Some(4),
                (_, true) => Some(6),
                _ => None,
            };
            let subnets = manager
                .list_subnets(&SubnetFilter {
                    identifier,
                    datacenter,
                    version,
                    subnet_type,
                    network_space,
                })
                .await?;
            env.fout(subnet_list_table(&subnets, sortby))
        }
        SubnetCommand::Detail {
            identifier,
            no_vs,
            no_hardware,
        } => {
            let subnet_id = resolve_id(&manager, &identifier, "subnet").await?;
            let subnet = manager.get_subnet(subnet_id).await?;
            env.fout(subnet_detail_table(&subnet, no_vs, no_hardware))
        }
    }
}

pub async fn run_summary(env: &mut Environment, args: SummaryArgs) -> Result<()> {
    let manager = NetworkManager::new(env.client.clone());
    let datacenters = manager.summary_by_datacenter().await?;

    let mut table = Table::new([
        "datacenter",
        "hardware",
        "virtual_servers",
        "vlans",
        "subnets",
        "public_ips",
    ]);
    table.sortby = Some(args.sortby.unwrap_or_else(|| "datacenter".to_string()));
    for (name, summary) in &datacenters {
        table.add_row(vec![
            name.as_str().into(),
            summary.hardware_count.into(),
            summary.virtual_guest_count.into(),
            summary.vlan_count.into(),
            summary.subnet_count.into(),
            summary.primary_ip_count.into(),
        ]);
    }
    env.fout(table)
}
