//! Netscaler ADCs and LBaaS load balancers.

use crate::core::Client;
use crate::utils::error::{Result, SoftLayerError};
use crate::utils::filter::{lookup_i64, lookup_str};
use crate::utils::resolver::looks_like_guid;
use serde_json::{json, Value};

const ADC_LIST_MASK: &str =
    "mask[managementIpAddress,outboundPublicBandwidthUsage,primaryIpAddress,datacenter]";

const ADC_DETAIL_MASK: &str = "mask[networkVlans, password, managementIpAddress, \
    primaryIpAddress, subnets, tagReferences, licenseExpirationDate, datacenter]";

const LBAAS_LIST_MASK: &str = "mask[datacenter,listenerCount,memberCount]";

const LBAAS_DETAIL_MASK: &str = "mask[healthMonitors, l7Pools, members, sslCiphers, \
    listeners[defaultPool[healthMonitor, members, sessionAffinity],l7Policies]]";

const LBAAS: &str = "Network_LBaaS_LoadBalancer";

#[derive(Debug, Clone)]
pub struct LoadBalancerManager {
    client: Client,
}

impl LoadBalancerManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn get_adcs(&self) -> Result<Vec<Value>> {
        let adcs = self
            .client
            .call("Account", "getApplicationDeliveryControllers")
            .mask(ADC_LIST_MASK)
            .send()
            .await?;
        Ok(super::as_list(adcs))
    }

    pub async fn get_adc(&self, adc_id: i64) -> Result<Value> {
        self.client
            .call("Network_Application_Delivery_Controller", "getObject")
            .id(adc_id)
            .mask(ADC_DETAIL_MASK)
            .send()
            .await
    }

    pub async fn get_lbaas(&self) -> Result<Vec<Value>> {
        let balancers = self
            .client
            .call(LBAAS, "getAllObjects")
            .mask(LBAAS_LIST_MASK)
            .send()
            .await?;
        Ok(super::as_list(balancers))
    }

    /// 明細加上 `health`（各成員的健康狀態）
    pub async fn get_lb(&self, lb_id: i64) -> Result<Value> {
        let mut balancer = self
            .client
            .call(LBAAS, "getObject")
            .id(lb_id)
            .mask(LBAAS_DETAIL_MASK)
            .send()
            .await?;
        let uuid = lookup_str(&balancer, &["uuid"])
            .ok_or_else(|| SoftLayerError::not_found(format!("Load balancer {} has no uuid", lb_id)))?
            .to_string();
        let health = self
            .client
            .call(LBAAS, "getLoadBalancerMemberHealth")
            .arg(uuid)
            .send()
            .await?;
        if let Value::Object(map) = &mut balancer {
            map.insert("health".to_string(), health);
        }
        Ok(balancer)
    }

    pub async fn get_lbaas_by_name(&self, name: &str) -> Result<Vec<Value>> {
        let balancers = self
            .client
            .call(LBAAS, "getAllObjects")
            .mask("mask[id,uuid]")
            .filter(json!({ "name": { "operation": name } }))
            .send()
            .await?;
        Ok(super::as_list(balancers)
            .into_iter()
            .filter(|lb| lookup_str(lb, &["name"]).map_or(true, |n| n == name))
            .collect())
    }

    /// 數字 id、UUID 或名稱 → `(id, uuid)`
    pub async fn get_lbaas_uuid_id(&self, identifier: &str) -> Result<(i64, String)> {
        let balancer = if identifier.chars().all(|c| c.is_ascii_digit()) && !identifier.is_empty() {
            let lb_id: i64 = identifier
                .parse()
                .map_err(|_| SoftLayerError::argument(format!("Invalid id {}", identifier)))?;
            self.client
                .call(LBAAS, "getObject")
                .id(lb_id)
                .mask("mask[id,uuid]")
                .send()
                .await?
        } else if looks_like_guid(identifier) {
            self.client
                .call(LBAAS, "getLoadBalancer")
                .arg(identifier)
                .mask("mask[id,uuid]")
                .send()
                .await?
        } else {
            self.get_lbaas_by_name(identifier)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    SoftLayerError::not_found(format!("Unable to find LBaaS with name: {}", identifier))
                })?
        };

        match (lookup_i64(&balancer, &["id"]), lookup_str(&balancer, &["uuid"])) {
            (Some(id), Some(uuid)) => Ok((id, uuid.to_string())),
            _ => Err(SoftLayerError::not_found(format!(
                "Unable to find LBaaS {}",
                identifier
            ))),
        }
    }
}
