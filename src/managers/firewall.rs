use super::ordering::is_falsy;
use crate::core::Client;
use crate::utils::error::Result;
use crate::utils::filter::lookup_str;
use serde_json::Value;

const FIREWALL_VLAN_MASK: &str = "firewallNetworkComponents,networkVlanFirewall,\
    dedicatedFirewallFlag,firewallGuestNetworkComponents,firewallInterfaces,\
    firewallRules,highAvailabilityFirewallFlag";

const FIREWALL_KEYS: [&str; 7] = [
    "dedicatedFirewallFlag",
    "highAvailabilityFirewallFlag",
    "networkVlanFirewall",
    "firewallNetworkComponents",
    "firewallGuestNetworkComponents",
    "firewallInterfaces",
    "firewallRules",
];

/// 狀態為 `no_edit` 的元件不能管理
pub fn has_firewall_component(component: &Value) -> bool {
    lookup_str(component, &["status"]) != Some("no_edit")
}

pub fn is_dedicated(vlan: &Value) -> bool {
    !is_falsy(vlan.get("dedicatedFirewallFlag"))
}

pub fn is_high_availability(vlan: &Value) -> bool {
    !is_falsy(vlan.get("highAvailabilityFirewallFlag"))
}

fn has_any_firewall(vlan: &Value) -> bool {
    FIREWALL_KEYS.iter().any(|key| match vlan.get(*key) {
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        other => !is_falsy(other),
    })
}

/// Dedicated and shared firewalls, found through the account VLANs.
#[derive(Debug, Clone)]
pub struct FirewallManager {
    client: Client,
}

impl FirewallManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn get_firewalls(&self) -> Result<Vec<Value>> {
        let vlans = self
            .client
            .call("Account", "getNetworkVlans")
            .mask(FIREWALL_VLAN_MASK)
            .send()
            .await?;
        Ok(super::as_list(vlans)
            .into_iter()
            .filter(has_any_firewall)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::testing::fixture_client;
    use serde_json::json;

    #[test]
    fn test_component_status() {
        assert!(has_firewall_component(&json!({"status": "ok"})));
        assert!(!has_firewall_component(&json!({"status": "no_edit"})));
    }

    #[tokio::test]
    async fn test_get_firewalls_skips_plain_vlans() {
        let (client, transport) = fixture_client();
        transport.set_response(
            "Account",
            "getNetworkVlans",
            json!([
                {"id": 1, "dedicatedFirewallFlag": 1, "networkVlanFirewall": {"id": 7}},
                {"id": 2, "dedicatedFirewallFlag": 0, "firewallGuestNetworkComponents": [{"id": 3}]},
                {"id": 3, "dedicatedFirewallFlag": 0, "highAvailabilityFirewallFlag": false,
                 "firewallInterfaces": [], "firewallRules": [], "networkVlanFirewall": null}
            ]),
        );
        let firewalls = FirewallManager::new(client).get_firewalls().await.unwrap();
        let ids: Vec<_> = firewalls.iter().map(|f| f["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(2)]);
        let call = transport.last_call("Account", "getNetworkVlans").unwrap();
        assert!(call.mask.unwrap().contains("highAvailabilityFirewallFlag"));
    }
}
