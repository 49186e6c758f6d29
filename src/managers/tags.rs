use crate::core::Client;
use crate::utils::error::{Result, SoftLayerError};
use serde::Serialize;
use serde_json::Value;

const LIST_MASK: &str = "mask[id,name,referenceCount]";
const TAG_MASK: &str = "mask[id,name]";

/// 目前使用者的標籤，分成已掛載與未掛載兩組
#[derive(Debug, Clone, Default, Serialize)]
pub struct TagListing {
    pub attached: Vec<Value>,
    pub unattached: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct TagManager {
    client: Client,
}

impl TagManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn list_tags(&self, mask: Option<&str>) -> Result<TagListing> {
        let mask = mask.unwrap_or(LIST_MASK);
        let unattached = self
            .client
            .call("Tag", "getUnattachedTagsForCurrentUser")
            .mask(mask)
            .send_all()
            .await?;
        let attached = self
            .client
            .call("Tag", "getAttachedTagsForCurrentUser")
            .mask(mask)
            .send_all()
            .await?;
        Ok(TagListing { attached, unattached })
    }

    pub async fn get_tag(&self, tag_id: i64, mask: Option<&str>) -> Result<Value> {
        self.client
            .call("Tag", "getObject")
            .id(tag_id)
            .mask(mask.unwrap_or(TAG_MASK))
            .send()
            .await
    }

    pub async fn get_tag_by_name(&self, name: &str, mask: Option<&str>) -> Result<Vec<Value>> {
        let tags = self
            .client
            .call("Tag", "getTagByTagName")
            .arg(name)
            .mask(mask.unwrap_or(TAG_MASK))
            .send()
            .await?;
        Ok(super::as_list(tags))
    }

    pub async fn get_tag_references(&self, tag_id: i64, mask: Option<&str>) -> Result<Vec<Value>> {
        self.client
            .call("Tag", "getReferences")
            .id(tag_id)
            .mask(mask.unwrap_or("mask[tagType]"))
            .send_all()
            .await
    }

    /// 依標籤類型（`tagType.keyName`）取回被標記的物件
    pub async fn reference_lookup(&self, resource_table_id: i64, tag_type: &str) -> Result<Value> {
        let service = service_for_tag_type(tag_type)?;
        self.client
            .call(&service, "getObject")
            .id(resource_table_id)
            .send()
            .await
    }

    /// `tags` 為逗號分隔字串，會整組取代原有標籤
    pub async fn set_tags(&self, tags: &str, key_name: &str, resource_id: i64) -> Result<Value> {
        self.client
            .call("Tag", "setTags")
            .arg(tags)
            .arg(key_name)
            .arg(resource_id)
            .send()
            .await
    }

    pub async fn delete_tag(&self, name: &str) -> Result<Value> {
        self.client.call("Tag", "deleteTag").arg(name).send().await
    }

    pub async fn get_all_tag_types(&self) -> Result<Vec<Value>> {
        let types = self.client.call("Tag", "getAllTagTypes").send().await?;
        Ok(super::as_list(types))
    }

    /// 可被標記的帳號資源；沒有對應清單方法的類型回傳空集合
    pub async fn taggable_by_type(&self, tag_type: &str) -> Result<Vec<Value>> {
        let (method, mask) = match tag_type {
            "HARDWARE" => ("getHardware", "mask[id,fullyQualifiedDomainName]"),
            "GUEST" => ("getVirtualGuests", "mask[id,fullyQualifiedDomainName]"),
            "NETWORK_VLAN" => ("getNetworkVlans", "mask[id,vlanNumber,name]"),
            "IMAGE_TEMPLATE" => ("getPrivateBlockDeviceTemplateGroups", "mask[id,name]"),
            _ => return Ok(Vec::new()),
        };
        self.client
            .call("Account", method)
            .mask(mask)
            .send_all()
            .await
    }
}

/// HARDWARE → Hardware、NETWORK_VLAN → Network_Vlan
fn service_for_tag_type(tag_type: &str) -> Result<String> {
    match tag_type {
        "ACCOUNT_DOCUMENT" | "CONTRACT" => Err(SoftLayerError::api(
            "404",
            format!("Unable to lookup {} types", tag_type),
        )),
        "APPLICATION_DELIVERY_CONTROLLER" => {
            Ok("Network_Application_Delivery_Controller".to_string())
        }
        "GUEST" => Ok("Virtual_Guest".to_string()),
        "DEDICATED_HOST" => Ok("Virtual_DedicatedHost".to_string()),
        other => Ok(other
            .to_lowercase()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join("_")),
    }
}
