use crate::app::environment::Environment;
use crate::app::formatting::Table;
use crate::managers::firewall::{has_firewall_component, is_dedicated, is_high_availability};
use crate::managers::FirewallManager;
use crate::utils::error::Result;
use crate::utils::filter::{lookup, lookup_i64};
use clap::Subcommand;
use serde_json::Value;

#[derive(Debug, Subcommand)]
pub enum FirewallCommand {
    /// List firewalls
    List,
}

fn components<'a>(vlan: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    vlan.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|component| has_firewall_component(component))
}

fn firewall_table(vlans: &[Value]) -> Table {
    let mut table = Table::new(["firewall id", "type", "features", "server/vlan id"]);
    for vlan in vlans.iter().filter(|vlan| is_dedicated(vlan)) {
        let features = if is_high_availability(vlan) { "HA" } else { "-" };
        let firewall_id = lookup_i64(vlan, &["networkVlanFirewall", "id"]).unwrap_or_default();
        table.add_row(vec![
            format!("vlan:{}", firewall_id).into(),
            "VLAN - dedicated".into(),
            features.into(),
            vlan.get("id").into(),
        ]);
    }

    for vlan in vlans.iter().filter(|vlan| !is_dedicated(vlan)) {
        for guest in components(vlan, "firewallGuestNetworkComponents") {
            table.add_row(vec![
                format!("vs:{}", lookup_i64(guest, &["id"]).unwrap_or_default()).into(),
                "Virtual Server - standard".into(),
                "-".into(),
                lookup(guest, &["guestNetworkComponent", "guest", "id"]).into(),
            ]);
        }
        for server in components(vlan, "firewallNetworkComponents") {
            table.add_row(vec![
                format!("server:{}", lookup_i64(server, &["id"]).unwrap_or_default()).into(),
                "Server - standard".into(),
                "-".into(),
                lookup(server, &["networkComponent", "downlinkComponent", "hardwareId"]).into(),
            ]);
        }
    }
    table
}

pub async fn run(env: &mut Environment, cmd: FirewallCommand) -> Result<()> {
    let manager = FirewallManager::new(env.client.clone());
    match cmd {
        FirewallCommand::List => {
            let vlans = manager.get_firewalls().await?;
            env.fout(firewall_table(&vlans))
        }
    }
}
