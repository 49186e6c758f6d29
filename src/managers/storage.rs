//! Block (iSCSI) and file (NFS) storage volumes.
//!
//! Both kinds live on `SoftLayer_Network_Storage` and differ only in the
//! account list method, the filter root and the order categories, so the
//! operations are written once against [`StorageKind`].

use super::ordering::is_falsy;
use crate::core::Client;
use crate::utils::error::{Result, SoftLayerError};
use crate::utils::filter::{lookup, lookup_i64, lookup_str, query_filter, NestedFilter};
use serde_json::{json, Value};

const BLOCK_LIST_MASK: &str = "id,username,capacityGb,bytesUsed,\
    serviceResource.datacenter[name],serviceResourceBackendIpAddress,\
    activeTransactionCount,storageType[keyName],lunId";

const FILE_LIST_MASK: &str = "id,username,capacityGb,bytesUsed,\
    serviceResource.datacenter[name],serviceResourceBackendIpAddress,\
    activeTransactionCount,storageType[keyName],fileNetworkMountAddress";

const DETAIL_MASK: &str = "id,username,password,capacityGb,bytesUsed,snapshotCapacityGb,\
    parentVolume.snapshotSizeBytes,storageType.keyName,serviceResource.datacenter[name],\
    serviceResourceBackendIpAddress,fileNetworkMountAddress,storageTierLevel,iops,lunId,\
    activeTransactionCount,activeTransactions.transactionStatus[friendlyName],\
    replicationPartnerCount,replicationStatus,\
    replicationPartners[id,username,serviceResourceBackendIpAddress,\
    serviceResource[datacenter[name]],replicationSchedule[type[keyname]]]";

const ACCESS_MASK: &str = "id,allowedVirtualGuests[allowedHost[credential]],\
    allowedHardware[allowedHost[credential]],allowedSubnets[allowedHost[credential]],\
    allowedIpAddresses[allowedHost[credential]]";

const SNAPSHOT_MASK: &str = "id,notes,snapshotSizeBytes,storageType[keyName],\
    snapshotCreationTimestamp,hourlySchedule,dailySchedule,weeklySchedule";

const PACKAGE_MASK: &str = "id,name,categories[categoryCode],items[prices[categories],attributes]";

const ORDER_TYPE_PREFIX: &str = "SoftLayer_Container_Product_Order_Network_";

pub const DEFAULT_CANCEL_REASON: &str = "No longer needed";

/// Which flavour of `Network_Storage` a manager works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Block,
    File,
}

impl StorageKind {
    pub fn label(self) -> &'static str {
        match self {
            StorageKind::Block => "block",
            StorageKind::File => "file",
        }
    }

    fn account_method(self) -> &'static str {
        match self {
            StorageKind::Block => "getIscsiNetworkStorage",
            StorageKind::File => "getNasNetworkStorage",
        }
    }

    fn filter_root(self) -> &'static str {
        match self {
            StorageKind::Block => "iscsiNetworkStorage",
            StorageKind::File => "nasNetworkStorage",
        }
    }

    fn excluded_resource_type(self) -> &'static str {
        match self {
            StorageKind::Block => "!~ ISCSI",
            StorageKind::File => "!~ NAS",
        }
    }

    fn type_suffix(self) -> &'static str {
        match self {
            StorageKind::Block => "BLOCK_STORAGE",
            StorageKind::File => "FILE_STORAGE",
        }
    }

    fn list_mask(self) -> &'static str {
        match self {
            StorageKind::Block => BLOCK_LIST_MASK,
            StorageKind::File => FILE_LIST_MASK,
        }
    }

    fn endurance_base_category(self) -> &'static str {
        match self {
            StorageKind::Block => "storage_block",
            StorageKind::File => "storage_file",
        }
    }

    fn performance_category(self) -> &'static str {
        match self {
            StorageKind::Block => "performance_storage_iscsi",
            StorageKind::File => "performance_storage_nfs",
        }
    }

    fn performance_complex_type(self) -> String {
        match self {
            StorageKind::Block => format!("{}PerformanceStorage_Iscsi", ORDER_TYPE_PREFIX),
            StorageKind::File => format!("{}PerformanceStorage_Nfs", ORDER_TYPE_PREFIX),
        }
    }
}

/// Performance volumes are sized by IOPS, endurance volumes by IOPS per GB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    Performance,
    Endurance,
}

impl StorageType {
    pub fn category_code(self, kind: StorageKind) -> &'static str {
        match self {
            StorageType::Performance => kind.performance_category(),
            StorageType::Endurance => "storage_service_enterprise",
        }
    }
}

impl std::str::FromStr for StorageType {
    type Err = SoftLayerError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.to_lowercase().as_str() {
            "performance" => Ok(StorageType::Performance),
            "endurance" => Ok(StorageType::Endurance),
            other => Err(SoftLayerError::argument(format!(
                "storage type must be either performance or endurance, not {}",
                other
            ))),
        }
    }
}

/// Filters for [`StorageManager::list_volumes`].
#[derive(Debug, Clone, Default)]
pub struct VolumeFilter {
    pub datacenter: Option<String>,
    pub username: Option<String>,
    /// `performance` 或 `endurance`
    pub storage_type: Option<String>,
}

/// Hosts granted (or denied) access to a volume.
#[derive(Debug, Clone, Default)]
pub struct HostTargets {
    pub hardware_ids: Vec<i64>,
    pub virtual_guest_ids: Vec<i64>,
    pub ip_address_ids: Vec<i64>,
    pub subnet_ids: Vec<i64>,
}

impl HostTargets {
    pub fn is_empty(&self) -> bool {
        self.hardware_ids.is_empty()
            && self.virtual_guest_ids.is_empty()
            && self.ip_address_ids.is_empty()
            && self.subnet_ids.is_empty()
    }

    /// `SoftLayer_Network_Storage_Allowed_Host` 樣板
    pub fn templates(&self) -> Vec<Value> {
        [
            ("SoftLayer_Hardware", &self.hardware_ids),
            ("SoftLayer_Virtual_Guest", &self.virtual_guest_ids),
            ("SoftLayer_Network_Subnet_IpAddress", &self.ip_address_ids),
            ("SoftLayer_Network_Subnet", &self.subnet_ids),
        ]
        .into_iter()
        .flat_map(|(object_type, ids)| {
            ids.iter()
                .map(move |id| json!({ "objectType": object_type, "id": id }))
        })
        .collect()
    }
}

/// Snapshot schedule passed to `enableSnapshots`.
#[derive(Debug, Clone)]
pub struct SnapshotSchedule {
    /// `HOURLY`, `DAILY` 或 `WEEKLY`
    pub schedule_type: String,
    pub retention_count: u32,
    pub minute: u32,
    pub hour: u32,
    pub day_of_week: String,
}

/// Everything needed to place a volume order.
#[derive(Debug, Clone)]
pub struct VolumeOrder {
    pub storage_type: StorageType,
    /// 機房短名，例如 `dal09`
    pub location: String,
    pub size: i64,
    pub os_type: Option<String>,
    pub iops: Option<i64>,
    pub tier_level: Option<f64>,
    pub snapshot_size: Option<i64>,
}

/// IOPS per GB → the tier attribute value used by the catalog.
pub fn endurance_tier_level(tier: f64) -> Option<i64> {
    match (tier * 100.0).round() as i64 {
        25 => Some(100),
        200 => Some(200),
        400 => Some(300),
        1000 => Some(1000),
        _ => None,
    }
}

/// 由 volume 的 `storageTierLevel` 推回 IOPS per GB
pub fn find_endurance_tier_iops_per_gb(volume: &Value) -> Result<f64> {
    let tier = lookup_str(volume, &["storageTierLevel"])
        .or_else(|| lookup_str(volume, &["storageTierLevel", "keyName"]));
    match tier {
        Some("LOW_INTENSITY_TIER") => Ok(0.25),
        Some("READHEAVY_TIER") => Ok(2.0),
        Some("WRITEHEAVY_TIER") => Ok(4.0),
        Some("10_IOPS_PER_GB") => Ok(10.0),
        _ => Err(SoftLayerError::operation(
            "Could not find tier IOPS per GB for this volume",
        )),
    }
}

fn has_category(price: &Value, category: &str) -> bool {
    price
        .get("categories")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .any(|c| lookup_str(c, &["categoryCode"]) == Some(category))
}

fn capacity_of(item: &Value) -> Option<i64> {
    match item.get("capacity")? {
        Value::String(s) => s.trim().parse::<f64>().ok().map(|c| c as i64),
        Value::Number(n) => n.as_f64().map(|c| c as i64),
        _ => None,
    }
}

fn within_restriction(price: &Value, value: i64) -> bool {
    let minimum = lookup_i64(price, &["capacityRestrictionMinimum"]).unwrap_or(i64::MIN);
    let maximum = lookup_i64(price, &["capacityRestrictionMaximum"]).unwrap_or(i64::MAX);
    minimum <= value && value <= maximum
}

/// 掃描 package 的 item，回傳第一個符合條件且沒有地區群組的價格 `{id}`
fn find_price<I, P>(
    package: &Value,
    category: &str,
    item_matches: I,
    price_matches: P,
    missing: &str,
) -> Result<Value>
where
    I: Fn(&Value) -> bool,
    P: Fn(&Value) -> bool,
{
    let items = package.get("items").and_then(Value::as_array).into_iter().flatten();
    for item in items.filter(|item| item_matches(item)) {
        for price in item.get("prices").and_then(Value::as_array).into_iter().flatten() {
            if !is_falsy(price.get("locationGroupId")) || !has_category(price, category) {
                continue;
            }
            if !price_matches(price) {
                continue;
            }
            if let Some(id) = lookup_i64(price, &["id"]) {
                return Ok(json!({ "id": id }));
            }
        }
    }
    Err(SoftLayerError::not_found(missing))
}

fn tier_or_error(tier_level: Option<f64>) -> Result<i64> {
    let tier = tier_level
        .ok_or_else(|| SoftLayerError::argument("Tier level is required for endurance orders"))?;
    endurance_tier_level(tier).ok_or_else(|| {
        SoftLayerError::argument(format!(
            "Invalid endurance tier {}, choose one of 0.25, 2, 4, 10",
            tier
        ))
    })
}

pub fn find_category_price(package: &Value, category: &str) -> Result<Value> {
    find_price(
        package,
        category,
        |_| true,
        |_| true,
        &format!("Could not find price for {}", category),
    )
}

pub fn find_endurance_space_price(package: &Value, size: i64, level: i64) -> Result<Value> {
    find_price(
        package,
        "performance_storage_space",
        |item| capacity_of(item) == Some(size),
        |price| within_restriction(price, level),
        "Could not find price for disk space",
    )
}

pub fn find_endurance_tier_price(package: &Value, level: i64) -> Result<Value> {
    find_price(
        package,
        "storage_tier_level",
        |item| {
            item.get("attributes")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .any(|attribute| lookup_i64(attribute, &["value"]) == Some(level))
        },
        |_| true,
        "Could not find price for tier",
    )
}

pub fn find_performance_space_price(package: &Value, size: i64) -> Result<Value> {
    find_price(
        package,
        "performance_storage_space",
        |item| capacity_of(item) == Some(size),
        |_| true,
        "Could not find disk space price for the given volume",
    )
}

pub fn find_performance_iops_price(package: &Value, size: i64, iops: i64) -> Result<Value> {
    find_price(
        package,
        "performance_storage_iops",
        |item| capacity_of(item) == Some(iops),
        |price| within_restriction(price, size),
        "Could not find price for iops for the given volume",
    )
}

pub fn find_snapshot_space_price(package: &Value, size: i64, level: i64) -> Result<Value> {
    find_price(
        package,
        "storage_snapshot_space",
        |item| capacity_of(item) == Some(size),
        |price| within_restriction(price, level),
        "Could not find price for snapshot space",
    )
}

/// Operations shared by block and file volumes.
#[derive(Debug, Clone)]
pub struct StorageManager {
    client: Client,
    kind: StorageKind,
}

impl StorageManager {
    pub fn new(client: Client, kind: StorageKind) -> Self {
        Self { client, kind }
    }

    pub fn kind(&self) -> StorageKind {
        self.kind
    }

    pub fn volumes_filter(&self, filters: &VolumeFilter) -> Value {
        let root = self.kind.filter_root();
        let suffix = self.kind.type_suffix();
        let mut filter = NestedFilter::new();
        filter.set(
            &[root, "serviceResource", "type", "type"],
            query_filter(self.kind.excluded_resource_type()),
        );
        let keyname = match &filters.storage_type {
            Some(storage_type) => format!("{}_{}", storage_type.to_uppercase(), suffix),
            None => format!("*{}*", suffix),
        };
        filter.set(&[root, "storageType", "keyName"], query_filter(keyname));
        if let Some(datacenter) = &filters.datacenter {
            filter.set(
                &[root, "serviceResource", "datacenter", "name"],
                query_filter(datacenter),
            );
        }
        if let Some(username) = &filters.username {
            filter.set(&[root, "username"], query_filter(username));
        }
        filter.into_value()
    }

    pub async fn list_volumes(&self, filters: &VolumeFilter) -> Result<Vec<Value>> {
        let volumes = self
            .client
            .call("Account", self.kind.account_method())
            .mask(self.kind.list_mask())
            .filter(self.volumes_filter(filters))
            .send()
            .await?;
        Ok(super::as_list(volumes))
    }

    pub async fn get_volume_details(&self, volume_id: i64, mask: Option<&str>) -> Result<Value> {
        self.client
            .call("Network_Storage", "getObject")
            .id(volume_id)
            .mask(mask.unwrap_or(DETAIL_MASK))
            .send()
            .await
    }

    pub async fn get_volume_access_list(&self, volume_id: i64) -> Result<Value> {
        self.get_volume_details(volume_id, Some(ACCESS_MASK)).await
    }

    pub async fn get_volume_snapshot_list(&self, volume_id: i64) -> Result<Vec<Value>> {
        let snapshots = self
            .client
            .call("Network_Storage", "getSnapshots")
            .id(volume_id)
            .mask(SNAPSHOT_MASK)
            .send()
            .await?;
        Ok(super::as_list(snapshots))
    }

    pub async fn authorize_host_to_volume(&self, volume_id: i64, hosts: &HostTargets) -> Result<Value> {
        self.client
            .call("Network_Storage", "allowAccessFromHostList")
            .id(volume_id)
            .arg(hosts.templates())
            .send()
            .await
    }

    pub async fn deauthorize_host_to_volume(&self, volume_id: i64, hosts: &HostTargets) -> Result<Value> {
        self.client
            .call("Network_Storage", "removeAccessFromHostList")
            .id(volume_id)
            .arg(hosts.templates())
            .send()
            .await
    }

    pub async fn create_snapshot(&self, volume_id: i64, notes: &str) -> Result<Value> {
        self.client
            .call("Network_Storage", "createSnapshot")
            .id(volume_id)
            .arg(notes)
            .send()
            .await
    }

    pub async fn delete_snapshot(&self, snapshot_id: i64) -> Result<Value> {
        self.client
            .call("Network_Storage", "deleteObject")
            .id(snapshot_id)
            .send()
            .await
    }

    pub async fn enable_snapshots(&self, volume_id: i64, schedule: &SnapshotSchedule) -> Result<Value> {
        self.client
            .call("Network_Storage", "enableSnapshots")
            .id(volume_id)
            .arg(schedule.schedule_type.as_str())
            .arg(schedule.retention_count)
            .arg(schedule.minute)
            .arg(schedule.hour)
            .arg(schedule.day_of_week.as_str())
            .send()
            .await
    }

    pub async fn disable_snapshots(&self, volume_id: i64, schedule_type: &str) -> Result<Value> {
        self.client
            .call("Network_Storage", "disableSnapshots")
            .id(volume_id)
            .arg(schedule_type)
            .send()
            .await
    }

    pub async fn restore_from_snapshot(&self, volume_id: i64, snapshot_id: i64) -> Result<Value> {
        self.client
            .call("Network_Storage", "restoreFromSnapshot")
            .id(volume_id)
            .arg(snapshot_id)
            .send()
            .await
    }

    pub async fn failover_to_replicant(&self, volume_id: i64, replicant_id: i64, immediate: bool) -> Result<Value> {
        self.client
            .call("Network_Storage", "failoverToReplicant")
            .id(volume_id)
            .arg(replicant_id)
            .arg(immediate)
            .send()
            .await
    }

    pub async fn failback_from_replicant(&self, volume_id: i64, replicant_id: i64) -> Result<Value> {
        self.client
            .call("Network_Storage", "failbackFromReplicant")
            .id(volume_id)
            .arg(replicant_id)
            .send()
            .await
    }

    /// 取得唯一一個有該分類代碼的啟用中 package
    pub async fn get_package(&self, category_code: &str) -> Result<Value> {
        let mut filter = NestedFilter::new();
        filter
            .set(&["categories", "categoryCode"], query_filter(category_code))
            .set(&["statusCode"], query_filter("ACTIVE"));
        let packages = self
            .client
            .call("Product_Package", "getAllObjects")
            .mask(PACKAGE_MASK)
            .filter(filter.into_value())
            .send()
            .await?;

        // 伺服器已過濾；回傳含分類時再於本地確認一次
        let mut packages: Vec<Value> = super::as_list(packages)
            .into_iter()
            .filter(|package| match package.get("categories").and_then(Value::as_array) {
                Some(categories) => categories
                    .iter()
                    .any(|c| lookup_str(c, &["categoryCode"]) == Some(category_code)),
                None => true,
            })
            .collect();
        match packages.len() {
            0 => Err(SoftLayerError::not_found(format!(
                "No packages were found for {}",
                category_code
            ))),
            1 => Ok(packages.remove(0)),
            _ => Err(SoftLayerError::operation(format!(
                "More than one package was found for {}",
                category_code
            ))),
        }
    }

    pub async fn get_location_id(&self, location: &str) -> Result<i64> {
        let datacenters = self
            .client
            .call("Location_Datacenter", "getDatacenters")
            .mask("mask[longName,id,name]")
            .send()
            .await?;
        super::as_list(datacenters)
            .iter()
            .find(|dc| lookup_str(dc, &["name"]) == Some(location))
            .and_then(|dc| lookup_i64(dc, &["id"]))
            .ok_or_else(|| {
                SoftLayerError::argument(
                    "Invalid datacenter name specified. \
                     Please provide the lower case short name (e.g.: dal09)",
                )
            })
    }

    /// 組出 `placeOrder` 的 order container（不送出）
    pub fn build_volume_order(&self, package: &Value, location_id: i64, order: &VolumeOrder) -> Result<Value> {
        let (complex_type, mut prices) = match order.storage_type {
            StorageType::Performance => {
                let iops = order.iops.ok_or_else(|| {
                    SoftLayerError::argument("IOPS is required for performance orders")
                })?;
                (
                    self.kind.performance_complex_type(),
                    vec![
                        find_category_price(package, self.kind.performance_category())?,
                        find_performance_space_price(package, order.size)?,
                        find_performance_iops_price(package, order.size, iops)?,
                    ],
                )
            }
            StorageType::Endurance => {
                let level = tier_or_error(order.tier_level)?;
                (
                    format!("{}Storage_Enterprise", ORDER_TYPE_PREFIX),
                    vec![
                        find_category_price(package, self.kind.endurance_base_category())?,
                        find_category_price(package, "storage_service_enterprise")?,
                        find_endurance_space_price(package, order.size, level)?,
                        find_endurance_tier_price(package, level)?,
                    ],
                )
            }
        };

        if let Some(snapshot_size) = order.snapshot_size {
            if order.storage_type == StorageType::Performance {
                return Err(SoftLayerError::argument(
                    "Snapshot space can only be ordered with endurance volumes",
                ));
            }
            let level = tier_or_error(order.tier_level)?;
            prices.push(find_snapshot_space_price(package, snapshot_size, level)?);
        }

        let mut container = json!({
            "complexType": complex_type,
            "packageId": lookup_i64(package, &["id"]),
            "prices": prices,
            "quantity": 1,
            "location": location_id,
        });
        if let Some(os_type) = &order.os_type {
            container["osFormatType"] = json!({ "keyName": os_type });
        }
        Ok(container)
    }

    pub async fn order_volume(&self, order: &VolumeOrder) -> Result<Value> {
        match (self.kind, &order.os_type) {
            (StorageKind::Block, None) => {
                return Err(SoftLayerError::argument("OS type is required for block storage orders"))
            }
            (StorageKind::File, Some(_)) => {
                return Err(SoftLayerError::argument("OS type is not used on file storage orders"))
            }
            _ => {}
        }

        let location_id = self.get_location_id(&order.location).await?;
        let package = self
            .get_package(order.storage_type.category_code(self.kind))
            .await?;
        let container = self.build_volume_order(&package, location_id, order)?;
        tracing::info!(
            "ordering {} volume of {}GB in {}",
            self.kind.label(),
            order.size,
            order.location
        );
        self.client
            .call("Product_Order", "placeOrder")
            .arg(container)
            .send()
            .await
    }

    /// 只有 endurance volume 可以加購快照空間
    pub async fn order_snapshot_space(
        &self,
        volume_id: i64,
        capacity: i64,
        tier: Option<f64>,
        upgrade: bool,
    ) -> Result<Value> {
        let package = self.get_package("storage_service_enterprise").await?;
        let volume = self
            .get_volume_details(
                volume_id,
                Some("serviceResource.datacenter[id],storageTierLevel,billingItem"),
            )
            .await?;

        if lookup_str(&volume, &["billingItem", "categoryCode"]) != Some("storage_service_enterprise") {
            return Err(SoftLayerError::operation(format!(
                "{} volume storage_type must be Endurance",
                capitalize(self.kind.label())
            )));
        }

        let tier = match tier {
            Some(tier) => tier,
            None => find_endurance_tier_iops_per_gb(&volume)?,
        };
        let level = tier_or_error(Some(tier))?;
        let complex_type = if upgrade {
            "SoftLayer_Container_Product_Order_Network_Storage_Enterprise_SnapshotSpace_Upgrade"
        } else {
            "SoftLayer_Container_Product_Order_Network_Storage_Enterprise_SnapshotSpace"
        };

        let order = json!({
            "complexType": complex_type,
            "packageId": lookup_i64(&package, &["id"]),
            "prices": [find_snapshot_space_price(&package, capacity, level)?],
            "quantity": 1,
            "location": lookup_i64(&volume, &["serviceResource", "datacenter", "id"]),
            "volumeId": volume_id,
        });
        self.client
            .call("Product_Order", "placeOrder")
            .arg(order)
            .send()
            .await
    }

    pub async fn cancel_snapshot_space(&self, volume_id: i64, reason: &str, immediate: bool) -> Result<Value> {
        let volume = self
            .get_volume_details(volume_id, Some("mask[id,billingItem[activeChildren]]"))
            .await?;
        let billing_id = lookup(&volume, &["billingItem", "activeChildren"])
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .find(|child| lookup_str(child, &["categoryCode"]) == Some("storage_snapshot_space"))
            .and_then(|child| lookup_i64(child, &["id"]))
            .ok_or_else(|| SoftLayerError::operation("No snapshot space found to cancel"))?;
        self.cancel_billing_item(billing_id, reason, immediate).await
    }

    pub async fn cancel_volume(&self, volume_id: i64, reason: &str, immediate: bool) -> Result<Value> {
        let volume = self
            .get_volume_details(volume_id, Some("mask[id,billingItem[id]]"))
            .await?;
        let billing_id = lookup_i64(&volume, &["billingItem", "id"]).ok_or_else(|| {
            SoftLayerError::operation(format!(
                "Storage volume {} has no billing item, it may already be cancelled",
                volume_id
            ))
        })?;
        self.cancel_billing_item(billing_id, reason, immediate).await
    }

    async fn cancel_billing_item(&self, billing_id: i64, reason: &str, immediate: bool) -> Result<Value> {
        self.client
            .call("Billing_Item", "cancelItem")
            .id(billing_id)
            .arg(immediate)
            .arg(true)
            .arg(reason)
            .send()
            .await
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use serde_json::{json, Value};

    /// 同時含 performance 與 endurance 價格的 package
    pub fn storage_package() -> Value {
        json!({
            "id": 759,
            "name": "Storage As A Service (StaaS)",
            "categories": [
                {"categoryCode": "storage_service_enterprise"},
                {"categoryCode": "performance_storage_iscsi"},
                {"categoryCode": "performance_storage_nfs"}
            ],
            "items": [
                {"capacity": "0", "attributes": [], "prices": [
                    {"id": 1, "locationGroupId": "", "categories": [{"categoryCode": "storage_block"}]},
                    {"id": 2, "locationGroupId": "", "categories": [{"categoryCode": "storage_file"}]},
                    {"id": 3, "locationGroupId": "", "categories": [{"categoryCode": "storage_service_enterprise"}]},
                    {"id": 4, "locationGroupId": "", "categories": [{"categoryCode": "performance_storage_iscsi"}]},
                    {"id": 5, "locationGroupId": "", "categories": [{"categoryCode": "performance_storage_nfs"}]}
                ]},
                {"capacity": "20", "attributes": [], "prices": [
                    {"id": 40, "locationGroupId": 503, "categories": [{"categoryCode": "performance_storage_space"}],
                     "capacityRestrictionMinimum": "100", "capacityRestrictionMaximum": "100"},
                    {"id": 41, "locationGroupId": "", "categories": [{"categoryCode": "performance_storage_space"}],
                     "capacityRestrictionMinimum": "100", "capacityRestrictionMaximum": "100"},
                    {"id": 42, "locationGroupId": "", "categories": [{"categoryCode": "performance_storage_space"}],
                     "capacityRestrictionMinimum": "200", "capacityRestrictionMaximum": "300"}
                ]},
                {"capacity": "10", "attributes": [], "prices": [
                    {"id": 50, "locationGroupId": "", "categories": [{"categoryCode": "storage_snapshot_space"}],
                     "capacityRestrictionMinimum": "200", "capacityRestrictionMaximum": "200"}
                ]},
                {"capacity": "1000", "attributes": [], "prices": [
                    {"id": 60, "locationGroupId": "", "categories": [{"categoryCode": "performance_storage_iops"}],
                     "capacityRestrictionMinimum": "20", "capacityRestrictionMaximum": "80"}
                ]},
                {"capacity": "0", "attributes": [{"value": "200"}], "prices": [
                    {"id": 70, "locationGroupId": "", "categories": [{"categoryCode": "storage_tier_level"}]}
                ]},
                {"capacity": "0", "attributes": [{"value": "100"}], "prices": [
                    {"id": 71, "locationGroupId": "", "categories": [{"categoryCode": "storage_tier_level"}]}
                ]}
            ]
        })
    }
}
