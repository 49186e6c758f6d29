use crate::app::environment::Environment;
use crate::app::formatting::Table;
use crate::app::helpers::resolve_id;
use crate::managers::dedicated_host::DedicatedHostFilter;
use crate::managers::DedicatedHostManager;
use crate::utils::error::Result;
use crate::utils::filter::lookup;
use clap::Subcommand;
use serde_json::Value;

#[derive(Debug, Subcommand)]
pub enum DedicatedHostCommand {
    /// List dedicated hosts on the account
    List {
        /// Filter by host name
        #[arg(short = 'H', long)]
        name: Option<String>,
        /// Filter by datacenter shortname
        #[arg(short, long)]
        datacenter: Option<String>,
        /// Filter by number of CPU cores
        #[arg(short, long = "cpu")]
        cpu: Option<u32>,
        /// Filter by memory capacity in GB
        #[arg(short, long)]
        memory: Option<u64>,
        /// Filter by disk capacity in GB
        #[arg(short = 'D', long)]
        disk: Option<u64>,
        /// Filter by tags; repeat for more
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Column to sort by
        #[arg(long, value_parser = ["id", "name", "cpuCount", "diskCapacity", "memoryCapacity", "datacenter", "guestCount"])]
        sortby: Option<String>,
    },
    /// Get details for a dedicated host
    Detail {
        identifier: String,
        /// Show associated prices
        #[arg(long)]
        price: bool,
        /// Show guests on the dedicated host
        #[arg(long)]
        guests: bool,
    },
}

fn host_table(hosts: &[Value], sortby: Option<String>) -> Table {
    let mut table = Table::new([
        "id",
        "name",
        "cpuCount",
        "diskCapacity",
        "memoryCapacity",
        "datacenter",
        "guestCount",
    ]);
    table.sortby = sortby;
    for host in hosts {
        table.add_row(vec![
            host.get("id").into(),
            host.get("name").into(),
            host.get("cpuCount").into(),
            host.get("diskCapacity").into(),
            host.get("memoryCapacity").into(),
            lookup(host, &["datacenter", "name"]).into(),
            host.get("guestCount").into(),
        ]);
    }
    table
}

fn host_detail_table(host: &Value, price: bool, guests: bool) -> Table {
    let mut table = Table::key_value();
    table.add_row(vec!["id".into(), host.get("id").into()]);
    table.add_row(vec!["name".into(), host.get("name").into()]);
    table.add_row(vec!["cpu count".into(), host.get("cpuCount").into()]);
    table.add_row(vec!["memory capacity".into(), host.get("memoryCapacity").into()]);
    table.add_row(vec!["disk capacity".into(), host.get("diskCapacity").into()]);
    table.add_row(vec!["create date".into(), host.get("createDate").into()]);
    table.add_row(vec!["modify date".into(), host.get("modifyDate").into()]);
    table.add_row(vec!["router id".into(), lookup(host, &["backendRouter", "id"]).into()]);
    table.add_row(vec![
        "router hostname".into(),
        lookup(host, &["backendRouter", "hostname"]).into(),
    ]);
    table.add_row(vec![
        "owner".into(),
        lookup(host, &["billingItem", "orderItem", "order", "userRecord", "username"]).into(),
    ]);

    if price {
        table.add_row(vec![
            "price_rate".into(),
            lookup(host, &["billingItem", "nextInvoiceTotalRecurringAmount"]).into(),
        ]);
        let children = lookup(host, &["billingItem", "children"])
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for child in children {
            table.add_row(vec![
                child.get("categoryCode").into(),
                child.get("nextInvoiceTotalRecurringAmount").into(),
            ]);
        }
    }

    table.add_row(vec!["guest count".into(), host.get("guestCount").into()]);
    if guests {
        let mut guest_table = Table::new(["id", "hostname", "domain", "uuid"]);
        let rows = host
            .get("guests")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for guest in rows {
            guest_table.add_row(vec![
                guest.get("id").into(),
                guest.get("hostname").into(),
                guest.get("domain").into(),
                guest.get("uuid").into(),
            ]);
        }
        table.add_row(vec!["guests".into(), guest_table.into()]);
    }
    table.add_row(vec!["datacenter".into(), lookup(host, &["datacenter", "name"]).into()]);
    table
}

pub async fn run(env: &mut Environment, cmd: DedicatedHostCommand) -> Result<()> {
    let manager = DedicatedHostManager::new(env.client.clone());
    match cmd {
        DedicatedHostCommand::List {
            name,
            datacenter,
            cpu,
            memory,
            disk,
            tags,
            sortby,
        } => {
            let filters = DedicatedHostFilter {
                tags,
                cpus: cpu,
                memory,
                name,
                disk,
                datacenter,
            };
            let hosts = manager.list_instances(&filters).await?;
            env.fout(host_table(&hosts, sortby))
        }
        DedicatedHostCommand::Detail {
            identifier,
            price,
            guests,
        } => {
            let host_id = resolve_id(&manager, &identifier, "dedicated host").await?;
            let host = manager.get_host(host_id).await?;
            env.fout(host_detail_table(&host, price, guests))
        }
    }
}
