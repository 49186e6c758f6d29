use crate::app::environment::Environment;
use crate::app::formatting::{listing, FormattedItem, Table};
use crate::managers::LoadBalancerManager;
use crate::utils::error::Result;
use crate::utils::filter::{lookup, lookup_str};
use clap::Subcommand;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Subcommand)]
pub enum LoadBalCommand {
    /// List active load balancers
    List,
    /// Get Load Balancer details
    Detail { identifier: String },
    /// List Netscalers
    NsList,
    /// Get Netscaler details
    NsDetail { identifier: i64 },
}

fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn lb_type(balancer: &Value) -> FormattedItem {
    let public = balancer.get("isPublic").and_then(Value::as_i64) == Some(1)
        || balancer.get("isPublic").and_then(Value::as_bool) == Some(true);
    let label = if public { "Public" } else { "Private" };
    FormattedItem::new(balancer.get("isPublic").cloned().unwrap_or(Value::Null), label)
}

/// 成員 uuid → 健康狀態
fn member_health(balancer: &Value) -> HashMap<String, String> {
    array(balancer, "health")
        .iter()
        .flat_map(|pool| array(pool, "membersHealth"))
        .filter_map(|member| {
            Some((
                lookup_str(member, &["uuid"])?.to_string(),
                lookup_str(member, &["status"])?.to_string(),
            ))
        })
        .collect()
}

fn lbaas_table(balancers: &[Value]) -> Table {
    let mut table = Table::new([
        "ID", "UUID", "Name", "Description", "Address", "Type", "Location", "Listeners",
        "Members",
    ]);
    table.sortby = Some("Location".to_string());
    for balancer in balancers {
        table.add_row(vec![
            balancer.get("id").into(),
            balancer.get("uuid").into(),
            balancer.get("name").into(),
            balancer.get("description").into(),
            balancer.get("address").into(),
            lb_type(balancer).into(),
            lookup(balancer, &["datacenter", "longName"]).into(),
            balancer.get("listenerCount").into(),
            balancer.get("memberCount").into(),
        ]);
    }
    table
}

fn lbaas_detail_table(balancer: &Value) -> Table {
    let mut table = Table::key_value();
    table.add_row(vec!["ID".into(), balancer.get("id").into()]);
    table.add_row(vec!["UUID".into(), balancer.get("uuid").into()]);
    table.add_row(vec!["Address".into(), balancer.get("address").into()]);
    table.add_row(vec!["Type".into(), lb_type(balancer).into()]);
    table.add_row(vec![
        "Location".into(),
        lookup(balancer, &["datacenter", "longName"]).into(),
    ]);
    table.add_row(vec!["Description".into(), balancer.get("description").into()]);
    table.add_row(vec![
        "Status".into(),
        format!(
            "{} / {}",
            lookup_str(balancer, &["provisioningStatus"]).unwrap_or("-"),
            lookup_str(balancer, &["operatingStatus"]).unwrap_or("-")
        )
        .into(),
    ]);

    let mut listeners = Table::new(["UUID", "Listener", "Backend", "Method", "Sticky", "Limit"]);
    for listener in array(balancer, "listeners") {
        let pool = listener.get("defaultPool").unwrap_or(&Value::Null);
        listeners.add_row(vec![
            listener.get("uuid").into(),
            format!(
                "{}:{}",
                lookup_str(listener, &["protocol"]).unwrap_or("-"),
                listener.get("protocolPort").unwrap_or(&Value::Null)
            )
            .into(),
            format!(
                "{}:{}",
                lookup_str(pool, &["protocol"]).unwrap_or("-"),
                pool.get("protocolPort").unwrap_or(&Value::Null)
            )
            .into(),
            pool.get("loadBalancingAlgorithm").into(),
            lookup(pool, &["sessionAffinity", "type"]).into(),
            listener.get("connectionLimit").into(),
        ]);
    }
    table.add_row(vec!["Protocols".into(), listeners.into()]);

    let mut monitors = Table::new(["UUID", "Type", "Interval", "Retries", "Timeout", "URL"]);
    for monitor in array(balancer, "healthMonitors") {
        monitors.add_row(vec![
            monitor.get("uuid").into(),
            monitor.get("monitorType").into(),
            monitor.get("interval").into(),
            monitor.get("maxRetries").into(),
            monitor.get("timeout").into(),
            monitor.get("urlPath").into(),
        ]);
    }
    table.add_row(vec!["Health Checks".into(), monitors.into()]);

    let health = member_health(balancer);
    let mut members = Table::new(["UUID", "Address", "Weight", "Status"]);
    for member in array(balancer, "members") {
        let status = lookup_str(member, &["uuid"])
            .and_then(|uuid| health.get(uuid))
            .cloned();
        members.add_row(vec![
            member.get("uuid").into(),
            member.get("address").into(),
            member.get("weight").into(),
            status.into(),
        ]);
    }
    table.add_row(vec!["Members".into(), members.into()]);

    let ciphers = array(balancer, "sslCiphers")
        .iter()
        .filter_map(|cipher| lookup_str(cipher, &["name"]));
    table.add_row(vec!["Ciphers".into(), listing(ciphers, ",").into()]);
    table
}

fn netscaler_table(adcs: &[Value]) -> Table {
    let mut table = Table::new([
        "Id",
        "Location",
        "Name",
        "Description",
        "IP Address",
        "Management Ip",
        "Bandwidth",
        "Create Date",
    ]);
    for adc in adcs {
        table.add_row(vec![
            adc.get("id").into(),
            lookup(adc, &["datacenter", "longName"]).into(),
            adc.get("name").into(),
            adc.get("description").into(),
            adc.get("primaryIpAddress").into(),
            adc.get("managementIpAddress").into(),
            adc.get("outboundPublicBandwidthUsage").into(),
            adc.get("createDate").into(),
        ]);
    }
    table
}

fn netscaler_detail_table(adc: &Value) -> Table {
    let mut table = Table::key_value();
    table.add_row(vec!["ID".into(), adc.get("id").into()]);
    table.add_row(vec!["Name".into(), adc.get("name").into()]);
    table.add_row(vec!["Location".into(), lookup(adc, &["datacenter", "longName"]).into()]);
    table.add_row(vec!["Description".into(), adc.get("description").into()]);
    table.add_row(vec!["Management Ip".into(), adc.get("managementIpAddress").into()]);
    table.add_row(vec!["Root Password".into(), lookup(adc, &["password", "password"]).into()]);
    table.add_row(vec!["Primary Ip".into(), adc.get("primaryIpAddress").into()]);
    table.add_row(vec!["License Expiration".into(), adc.get("licenseExpirationDate").into()]);

    let mut subnets = Table::new(["Id", "Subnet", "Type", "Space"]);
    for subnet in array(adc, "subnets") {
        subnets.add_row(vec![
            subnet.get("id").into(),
            format!(
                "{}/{}",
                lookup_str(subnet, &["networkIdentifier"]).unwrap_or("-"),
                subnet.get("cidr").unwrap_or(&Value::Null)
            )
            .into(),
            subnet.get("subnetType").into(),
            subnet.get("addressSpace").into(),
        ]);
    }
    table.add_row(vec!["Subnets".into(), subnets.into()]);

    let mut vlans = Table::new(["Id", "Number"]);
    for vlan in array(adc, "networkVlans") {
        vlans.add_row(vec![vlan.get("id").into(), vlan.get("vlanNumber").into()]);
    }
    table.add_row(vec!["Vlans".into(), vlans.into()]);

    let tags = array(adc, "tagReferences")
        .iter()
        .filter_map(|tag| lookup_str(tag, &["tag", "name"]));
    table.add_row(vec!["Tags".into(), listing(tags, ",").into()]);
    table
}

pub async fn run(env: &mut Environment, cmd: LoadBalCommand) -> Result<()> {
    let manager = LoadBalancerManager::new(env.client.clone());
    match cmd {
        LoadBalCommand::List => {
            let balancers = manager.get_lbaas().await?;
            if balancers.is_empty() {
                return env.out("No LBaaS devices found");
            }
            env.fout(lbaas_table(&balancers))
        }
        LoadBalCommand::Detail { identifier } => {
            let (lb_id, _) = manager.get_lbaas_uuid_id(&identifier).await?;
            let balancer = manager.get_lb(lb_id).await?;
            env.fout(lbaas_detail_table(&balancer))
        }
        LoadBalCommand::NsList => {
            let adcs = manager.get_adcs().await?;
            if adcs.is_empty() {
                return env.out("No Netscalers");
            }
            env.fout(netscaler_table(&adcs))
        }
        LoadBalCommand::NsDetail { identifier } => {
            let adc = manager.get_adc(identifier).await?;
            env.fout(netscaler_detail_table(&adc))
        }
    }
}
