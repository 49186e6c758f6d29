use crate::core::Client;
use crate::utils::error::Result;
use crate::utils::filter::{lookup_i64, query_filter, NestedFilter};
use crate::utils::resolver::{looks_like_guid, IdentifierMixin};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

pub const IMAGE_MASK: &str = "id,accountId,name,globalIdentifier,blockDevices,parentId,createDate";

#[derive(Debug, Clone, Copy)]
pub enum ImageResolver {
    PublicGuid,
    PrivateGuid,
    PublicName,
    PrivateName,
}

/// Image templates (`SoftLayer_Virtual_Guest_Block_Device_Template_Group`).
#[derive(Debug, Clone)]
pub struct ImageManager {
    client: Client,
}

impl ImageManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn get_image(&self, image_id: i64, mask: Option<&str>) -> Result<Value> {
        self.client
            .call("Virtual_Guest_Block_Device_Template_Group", "getObject")
            .id(image_id)
            .mask(mask.unwrap_or(IMAGE_MASK))
            .send()
            .await
    }

    pub async fn delete_image(&self, image_id: i64) -> Result<Value> {
        self.client
            .call("Virtual_Guest_Block_Device_Template_Group", "deleteObject")
            .id(image_id)
            .send()
            .await
    }

    pub async fn list_private_images(
        &self,
        guid: Option<&str>,
        name: Option<&str>,
        mask: Option<&str>,
    ) -> Result<Vec<Value>> {
        let mut filter = NestedFilter::new();
        if let Some(name) = name {
            filter.set(&["privateBlockDeviceTemplateGroups", "name"], query_filter(name));
        }
        if let Some(guid) = guid {
            filter.set(
                &["privateBlockDeviceTemplateGroups", "globalIdentifier"],
                query_filter(guid),
            );
        }

        let images = self
            .client
            .call("Account", "getPrivateBlockDeviceTemplateGroups")
            .mask(mask.unwrap_or(IMAGE_MASK))
            .filter(filter.into_value())
            .send()
            .await?;
        Ok(super::as_list(images))
    }

    /// 公開映像檔的過濾條件在最上層
    pub async fn list_public_images(
        &self,
        guid: Option<&str>,
        name: Option<&str>,
        mask: Option<&str>,
    ) -> Result<Vec<Value>> {
        let mut filter = NestedFilter::new();
        if let Some(name) = name {
            filter.set(&["name"], query_filter(name));
        }
        if let Some(guid) = guid {
            filter.set(&["globalIdentifier"], query_filter(guid));
        }

        let images = self
            .client
            .call("Virtual_Guest_Block_Device_Template_Group", "getPublicImages")
            .mask(mask.unwrap_or(IMAGE_MASK))
            .filter(filter.into_value())
            .send()
            .await?;
        Ok(super::as_list(images))
    }

    pub async fn edit(
        &self,
        image_id: i64,
        name: Option<&str>,
        note: Option<&str>,
        tag: Option<&str>,
    ) -> Result<bool> {
        let mut object = Map::new();
        if let Some(name) = name {
            object.insert("name".to_string(), json!(name));
        }
        if let Some(note) = note {
            object.insert("note".to_string(), json!(note));
        }

        if !object.is_empty() {
            self.client
                .call("Virtual_Guest_Block_Device_Template_Group", "editObject")
                .id(image_id)
                .arg(Value::Object(object))
                .send()
                .await?;
        }
        if let Some(tag) = tag {
            self.client
                .call("Virtual_Guest_Block_Device_Template_Group", "setTags")
                .id(image_id)
                .arg(tag)
                .send()
                .await?;
        }
        Ok(true)
    }
}

fn ids(images: Vec<Value>) -> Vec<i64> {
    images
        .iter()
        .filter_map(|image| lookup_i64(image, &["id"]))
        .collect()
}

#[async_trait]
impl IdentifierMixin for ImageManager {
    type Resolver = ImageResolver;
    const RESOLVERS: &'static [ImageResolver] = &[
        ImageResolver::PublicGuid,
        ImageResolver::PrivateGuid,
        ImageResolver::PublicName,
        ImageResolver::PrivateName,
    ];

    async fn resolve_with(&self, resolver: ImageResolver, identifier: &str) -> Result<Vec<i64>> {
        match resolver {
            ImageResolver::PublicGuid | ImageResolver::PrivateGuid
                if !looks_like_guid(identifier) =>
            {
                Ok(Vec::new())
            }
            ImageResolver::PublicGuid => Ok(ids(
                self.list_public_images(Some(identifier), None, Some("id"))
                    .await?,
            )),
            ImageResolver::PrivateGuid => Ok(ids(
                self.list_private_images(Some(identifier), None, Some("id"))
                    .await?,
            )),
            ImageResolver::PublicName => Ok(ids(
                self.list_public_images(None, Some(identifier), Some("id"))
                    .await?,
            )),
            ImageResolver::PrivateName => Ok(ids(
                self.list_private_images(None, Some(identifier), Some("id"))
                    .await?,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::testing::fixture_client;

    #[tokio::test]
    async fn test_list_private_images_filters() {
        let (client, transport) = fixture_client();
        ImageManager::new(client)
            .list_private_images(Some("0B5DEAF4-643D-46CA-A695-CECBE8832C9D"), Some("test_image"), None)
            .await
            .unwrap();
        let call = transport
            .last_call("Account", "getPrivateBlockDeviceTemplateGroups")
            .unwrap();
        let filter = call.filter.unwrap();
        assert_eq!(
            filter["privateBlockDeviceTemplateGroups"]["name"]["operation"],
            "_= test_image"
        );
        assert_eq!(
            filter["privateBlockDeviceTemplateGroups"]["globalIdentifier"]["operation"],
            "_= 0B5DEAF4-643D-46CA-A695-CECBE8832C9D"
        );
        assert_eq!(call.mask.as_deref(), Some(IMAGE_MASK));
    }

    #[tokio::test]
    async fn test_list_public_images_top_level_filter() {
        let (client, transport) = fixture_client();
        let images = ImageManager::new(client)
            .list_public_images(None, Some("public_image"), None)
            .await
            .unwrap();
        assert_eq!(images[0]["id"], 200);
        let filter = transport
            .last_call("Virtual_Guest_Block_Device_Template_Group", "getPublicImages")
            .unwrap()
            .filter
            .unwrap();
        assert_eq!(filter, json!({"name": {"operation": "_= public_image"}}));
    }

    #[tokio::test]
    async fn test_resolve_guid_uses_public_first() {
        let (client, transport) = fixture_client();
        let ids = ImageManager::new(client)
            .resolve_ids("0B5DEAF4-643D-46CA-A695-CECBE8832C9D")
            .await
            .unwrap();
        assert_eq!(ids, vec![200]);
        assert_eq!(
            transport
                .calls_to("Virtual_Guest_Block_Device_Template_Group", "getPublicImages")
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_resolve_name_skips_guid_lookups() {
        let (client, transport) = fixture_client();
        transport.set_response(
            "Virtual_Guest_Block_Device_Template_Group",
            "getPublicImages",
            json!([]),
        );
        let ids = ImageManager::new(client).resolve_ids("test_image").await.unwrap();
        assert_eq!(ids, vec![100]);

        // 名稱不是 GUID：只查一次公開、一次私有
        assert_eq!(
            transport
                .calls_to("Virtual_Guest_Block_Device_Template_Group", "getPublicImages")
                .len(),
            1
        );
        assert_eq!(
            transport
                .calls_to("Account", "getPrivateBlockDeviceTemplateGroups")
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_edit_image() {
        let (client, transport) = fixture_client();
        let manager = ImageManager::new(client);
        assert!(manager.edit(100, None, None, None).await.unwrap());
        assert!(transport.calls().is_empty());

        manager
            .edit(100, Some("renamed"), Some("a note"), Some("tag1"))
            .await
            .unwrap();
        assert_eq!(
            transport
                .last_call("Virtual_Guest_Block_Device_Template_Group", "editObject")
                .unwrap()
                .args,
            vec![json!({"name": "renamed", "note": "a note"})]
        );
    }
}
