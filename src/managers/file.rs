//! File (NFS) storage.

use super::storage::{StorageKind, StorageManager};
use crate::core::Client;
use std::ops::Deref;

#[derive(Debug, Clone)]
pub struct FileStorageManager(StorageManager);

impl FileStorageManager {
    pub fn new(client: Client) -> Self {
        Self(StorageManager::new(client, StorageKind::File))
    }
}

impl Deref for FileStorageManager {
    type Target = StorageManager;

    fn deref(&self) -> &StorageManager {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::storage::{StorageType, VolumeFilter, VolumeOrder};
    use crate::managers::testing::fixture_client;
    use crate::managers::storage::testing::storage_package;
    use serde_json::json;

    #[tokio::test]
    async fn test_list_file_volumes() {
        let (client, transport) = fixture_client();
        let volumes = FileStorageManager::new(client)
            .list_volumes(&VolumeFilter {
                username: Some("SL01SEV*".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(volumes[0]["fileNetworkMountAddress"], "127.0.0.1:/TEST");

        let call = transport.last_call("Account", "getNasNetworkStorage").unwrap();
        let filter = call.filter.unwrap();
        assert_eq!(
            filter["nasNetworkStorage"]["serviceResource"]["type"]["type"]["operation"],
            "!~ NAS"
        );
        assert_eq!(
            filter["nasNetworkStorage"]["storageType"]["keyName"]["operation"],
            "*= FILE_STORAGE"
        );
        assert_eq!(filter["nasNetworkStorage"]["username"]["operation"], "^= SL01SEV");
    }

    #[tokio::test]
    async fn test_order_file_volume() {
        let (client, transport) = fixture_client();
        transport.set_response("Product_Package", "getAllObjects", json!([storage_package()]));
        let manager = FileStorageManager::new(client);
        let mut order = VolumeOrder {
            storage_type: StorageType::Performance,
            location: "dal05".to_string(),
            size: 20,
            os_type: None,
            iops: Some(1000),
            tier_level: None,
            snapshot_size: None,
        };
        manager.order_volume(&order).await.unwrap();

        let placed = &transport.last_call("Product_Order", "placeOrder").unwrap().args[0];
        assert_eq!(
            placed["complexType"],
            "SoftLayer_Container_Product_Order_Network_PerformanceStorage_Nfs"
        );
        assert_eq!(placed["location"], 449500);
        assert_eq!(placed["prices"], json!([{"id": 5}, {"id": 41}, {"id": 60}]));
        assert!(placed.get("osFormatType").is_none());

        order.os_type = Some("LINUX".to_string());
        let err = manager.order_volume(&order).await.unwrap_err();
        assert_eq!(err.to_string(), "OS type is not used on file storage orders");
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_list_and_create() {
        let (client, transport) = fixture_client();
        let manager = FileStorageManager::new(client);
        let snapshots = manager.get_volume_snapshot_list(200).await.unwrap();
        assert_eq!(snapshots[0]["id"], 470);
        assert!(transport
            .last_call("Network_Storage", "getSnapshots")
            .unwrap()
            .mask
            .unwrap()
            .contains("snapshotCreationTimestamp"));

        manager.create_snapshot(200, "nightly").await.unwrap();
        let call = transport.last_call("Network_Storage", "createSnapshot").unwrap();
        assert_eq!(call.identifier, Some(200));
        assert_eq!(call.args, vec![json!("nightly")]);
    }
}
