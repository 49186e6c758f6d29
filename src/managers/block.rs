//! Block (iSCSI) storage.

use super::storage::{StorageKind, StorageManager};
use crate::core::Client;
use std::ops::Deref;

/// Manages iSCSI volumes. All volume operations come from [`StorageManager`].
#[derive(Debug, Clone)]
pub struct BlockStorageManager(StorageManager);

impl BlockStorageManager {
    pub fn new(client: Client) -> Self {
        Self(StorageManager::new(client, StorageKind::Block))
    }
}

impl Deref for BlockStorageManager {
    type Target = StorageManager;

    fn deref(&self) -> &StorageManager {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::storage::{HostTargets, StorageType, VolumeFilter, VolumeOrder};
    use crate::managers::testing::fixture_client;
    use crate::managers::storage::testing::storage_package;
    use serde_json::json;

    #[tokio::test]
    async fn test_list_block_volumes_filter() {
        let (client, transport) = fixture_client();
        let volumes = BlockStorageManager::new(client)
            .list_volumes(&VolumeFilter {
                datacenter: Some("dal05".to_string()),
                username: None,
                storage_type: Some("endurance".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(volumes.len(), 2);

        let call = transport.last_call("Account", "getIscsiNetworkStorage").unwrap();
        let filter = call.filter.unwrap();
        let root = &filter["iscsiNetworkStorage"];
        assert_eq!(root["serviceResource"]["type"]["type"]["operation"], "!~ ISCSI");
        assert_eq!(root["storageType"]["keyName"]["operation"], "_= ENDURANCE_BLOCK_STORAGE");
        assert_eq!(root["serviceResource"]["datacenter"]["name"]["operation"], "_= dal05");
        assert!(call.mask.unwrap().contains("lunId"));
    }

    #[test]
    fn test_default_type_filter_matches_any_block_volume() {
        let (client, _) = fixture_client();
        let filter = BlockStorageManager::new(client).volumes_filter(&VolumeFilter::default());
        assert_eq!(
            filter["iscsiNetworkStorage"]["storageType"]["keyName"]["operation"],
            "*= BLOCK_STORAGE"
        );
    }

    #[tokio::test]
    async fn test_authorize_hosts() {
        let (client, transport) = fixture_client();
        let hosts = HostTargets {
            virtual_guest_ids: vec![100],
            ..Default::default()
        };
        BlockStorageManager::new(client)
            .authorize_host_to_volume(50, &hosts)
            .await
            .unwrap();
        let call = transport
            .last_call("Network_Storage", "allowAccessFromHostList")
            .unwrap();
        assert_eq!(call.identifier, Some(50));
        assert_eq!(
            call.args,
            vec![json!([{"objectType": "SoftLayer_Virtual_Guest", "id": 100}])]
        );
    }

    #[tokio::test]
    async fn test_order_block_volume() {
        let (client, transport) = fixture_client();
        transport.set_response("Product_Package", "getAllObjects", json!([storage_package()]));
        let manager = BlockStorageManager::new(client);
        let mut order = VolumeOrder {
            storage_type: StorageType::Endurance,
            location: "dal13".to_string(),
            size: 20,
            os_type: Some("LINUX".to_string()),
            iops: None,
            tier_level: Some(0.25),
            snapshot_size: None,
        };
        manager.order_volume(&order).await.unwrap();

        let placed = &transport.last_call("Product_Order", "placeOrder").unwrap().args[0];
        assert_eq!(placed["location"], 1854895);
        assert_eq!(placed["osFormatType"]["keyName"], "LINUX");
        assert_eq!(placed["prices"][0], json!({"id": 1}));

        let package_call = transport.last_call("Product_Package", "getAllObjects").unwrap();
        assert_eq!(
            package_call.filter.unwrap()["categories"]["categoryCode"]["operation"],
            "_= storage_service_enterprise"
        );

        order.os_type = None;
        let err = manager.order_volume(&order).await.unwrap_err();
        assert_eq!(err.to_string(), "OS type is required for block storage orders");
    }
}
