//! `slcli block` and `slcli file`: the same command tree over the two volume kinds.

use crate::app::environment::Environment;
use crate::app::formatting::{blank, listing, FormattedItem, Table};
use crate::managers::storage::{
    HostTargets, SnapshotSchedule, StorageKind, StorageManager, StorageType, VolumeFilter,
    VolumeOrder, DEFAULT_CANCEL_REASON,
};
use crate::managers::{BlockStorageManager, FileStorageManager};
use crate::utils::error::{Result, SoftLayerError};
use crate::utils::filter::{lookup, lookup_i64, lookup_str};
use clap::{Args, Subcommand};
use serde_json::Value;

#[derive(Debug, Clone, Default, Args)]
pub struct HostArgs {
    /// The id of one SoftLayer_Hardware to authorize
    #[arg(short = 'd', long = "hardware-id")]
    pub hardware_id: Vec<i64>,
    /// The id of one SoftLayer_Virtual_Guest to authorize
    #[arg(long = "virtual-id")]
    pub virtual_id: Vec<i64>,
    /// The id of one SoftLayer_Network_Subnet_IpAddress to authorize
    #[arg(short = 'i', long = "ip-address-id")]
    pub ip_address_id: Vec<i64>,
    /// The id of one SoftLayer_Network_Subnet to authorize
    #[arg(short = 's', long = "subnet-id")]
    pub subnet_id: Vec<i64>,
}

impl HostArgs {
    fn targets(self) -> HostTargets {
        HostTargets {
            hardware_ids: self.hardware_id,
            virtual_guest_ids: self.virtual_id,
            ip_address_ids: self.ip_address_id,
            subnet_ids: self.subnet_id,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum StorageCommand {
    /// List storage volumes
    VolumeList {
        #[arg(short, long)]
        username: Option<String>,
        /// Datacenter short name
        #[arg(short, long)]
        datacenter: Option<String>,
        /// Type of storage volume
        #[arg(short = 't', long = "storage-type", value_parser = ["performance", "endurance"])]
        storage_type: Option<String>,
        /// Column to sort by
        #[arg(long)]
        sortby: Option<String>,
    },
    /// Display details for a specified volume
    VolumeDetail { volume_id: i64 },
    /// Order a storage volume
    VolumeOrder {
        /// Type of storage volume
        #[arg(long = "storage-type", value_parser = ["performance", "endurance"])]
        storage_type: String,
        /// Size of storage volume in GB
        #[arg(long)]
        size: i64,
        /// Performance Storage IOPS
        #[arg(long)]
        iops: Option<i64>,
        /// Endurance Storage Tier (IOPS per GB)
        #[arg(long, value_parser = ["0.25", "2", "4", "10"])]
        tier: Option<String>,
        /// Operating system of the hosts (block volumes only)
        #[arg(long = "os-type")]
        os_type: Option<String>,
        /// Datacenter short name (e.g.: dal09)
        #[arg(long)]
        location: String,
        /// Optional parameter for ordering snapshot space along with endurance storage
        #[arg(long = "snapshot-size")]
        snapshot_size: Option<i64>,
    },
    /// Cancel an existing storage volume
    VolumeCancel {
        volume_id: i64,
        /// An optional reason for cancellation
        #[arg(long)]
        reason: Option<String>,
        /// Cancels the volume immediately instead of on the billing anniversary
        #[arg(long)]
        immediate: bool,
    },
    /// List hosts that are authorized to access the volume
    AccessList {
        volume_id: i64,
        /// Column to sort by
        #[arg(long)]
        sortby: Option<String>,
    },
    /// Authorizes hosts to access a given volume
    AccessAuthorize {
        volume_id: i64,
        #[command(flatten)]
        hosts: HostArgs,
    },
    /// Revokes authorization for hosts accessing a given volume
    AccessRevoke {
        volume_id: i64,
        #[command(flatten)]
        hosts: HostArgs,
    },
    /// List volume snapshots
    SnapshotList {
        volume_id: i64,
        /// Column to sort by
        #[arg(long)]
        sortby: Option<String>,
    },
    /// Creates a snapshot on a given volume
    SnapshotCreate {
        volume_id: i64,
        /// Notes to set on the new snapshot
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Deletes a snapshot on a given volume
    SnapshotDelete { snapshot_id: i64 },
    /// Enables snapshots for a given volume on the specified schedule
    SnapshotEnable {
        volume_id: i64,
        #[arg(long = "schedule-type", value_parser = ["HOURLY", "DAILY", "WEEKLY"])]
        schedule_type: String,
        /// Number of snapshots to retain
        #[arg(long = "retention-count")]
        retention_count: u32,
        /// Minute of the hour when snapshots should be taken
        #[arg(long, default_value_t = 0)]
        minute: u32,
        /// Hour of the day when snapshots should be taken
        #[arg(long, default_value_t = 0)]
        hour: u32,
        /// Day of the week when snapshots should be taken
        #[arg(long = "day-of-week", default_value = "SUNDAY")]
        day_of_week: String,
    },
    /// Disables snapshots on the specified schedule for a given volume
    SnapshotDisable {
        volume_id: i64,
        #[arg(long = "schedule-type", value_parser = ["HOURLY", "DAILY", "WEEKLY"])]
        schedule_type: String,
    },
    /// Restore volume from existing snapshot
    SnapshotRestore {
        volume_id: i64,
        /// The id of the snapshot which will be used to restore the volume
        #[arg(short, long = "snapshot-id")]
        snapshot_id: i64,
    },
    /// Order snapshot space for a storage volume
    SnapshotOrder {
        volume_id: i64,
        /// Size of snapshot space to create in GB
        #[arg(long)]
        capacity: i64,
        /// Endurance Storage Tier (IOPS per GB) of the primary volume
        #[arg(long, value_parser = ["0.25", "2", "4", "10"])]
        tier: Option<String>,
        /// Flag to indicate that the order is an upgrade
        #[arg(long)]
        upgrade: bool,
    },
    /// Cancel existing snapshot space for a given volume
    SnapshotCancel {
        volume_id: i64,
        /// An optional reason for cancellation
        #[arg(long)]
        reason: Option<String>,
        /// Cancels the snapshot space immediately instead of on the billing anniversary
        #[arg(long)]
        immediate: bool,
    },
    /// Failover a volume to a replicant volume
    ReplicaFailover {
        volume_id: i64,
        /// ID of the replicant volume
        #[arg(long = "replicant-id")]
        replicant_id: i64,
        /// Failover to replicant immediately
        #[arg(long)]
        immediate: bool,
    },
    /// Failback a volume from a replicant volume
    ReplicaFailback {
        volume_id: i64,
        /// ID of the replicant volume
        #[arg(long = "replicant-id")]
        replicant_id: i64,
    },
}

fn manager_for(env: &Environment, kind: StorageKind) -> StorageManager {
    match kind {
        StorageKind::Block => (*BlockStorageManager::new(env.client.clone())).clone(),
        StorageKind::File => (*FileStorageManager::new(env.client.clone())).clone(),
    }
}

fn parse_tier(tier: Option<String>) -> Result<Option<f64>> {
    tier.map(|t| {
        t.parse::<f64>()
            .map_err(|_| SoftLayerError::argument(format!("Invalid tier {}", t)))
    })
    .transpose()
}

/// `ENDURANCE_BLOCK_STORAGE` → `ENDURANCE`
fn storage_type_label(volume: &Value) -> FormattedItem {
    match lookup_str(volume, &["storageType", "keyName"]) {
        Some(key) => {
            let label = key.split('_').next().unwrap_or(key);
            FormattedItem::new(key, label)
        }
        None => blank(),
    }
}

fn volume_table(kind: StorageKind, volumes: &[Value], sortby: Option<String>) -> Table {
    let last = match kind {
        StorageKind::Block => "lunId",
        StorageKind::File => "mount_addr",
    };
    let mut table = Table::new([
        "id",
        "username",
        "datacenter",
        "storage_type",
        "capacity_gb",
        "bytes_used",
        "ip_addr",
        "active_transactions",
        last,
    ]);
    table.sortby = sortby.or_else(|| Some("username".to_string()));
    for volume in volumes {
        let last_cell = match kind {
            StorageKind::Block => volume.get("lunId"),
            StorageKind::File => volume.get("fileNetworkMountAddress"),
        };
        table.add_row(vec![
            volume.get("id").into(),
            volume.get("username").into(),
            lookup(volume, &["serviceResource", "datacenter", "name"]).into(),
            storage_type_label(volume).into(),
            volume.get("capacityGb").into(),
            volume.get("bytesUsed").into(),
            volume.get("serviceResourceBackendIpAddress").into(),
            volume.get("activeTransactionCount").into(),
            last_cell.into(),
        ]);
    }
    table
}

fn tier_label(volume: &Value) -> Option<&str> {
    lookup_str(volume, &["storageTierLevel"])
        .or_else(|| lookup_str(volume, &["storageTierLevel", "description"]))
}

fn volume_detail_table(kind: StorageKind, volume: &Value) -> Table {
    let mut table = Table::key_value();
    table.add_row(vec!["ID".into(), volume.get("id").into()]);
    table.add_row(vec!["Username".into(), volume.get("username").into()]);
    table.add_row(vec!["Type".into(), storage_type_label(volume).into()]);
    table.add_row(vec!["Capacity (GB)".into(), volume.get("capacityGb").into()]);
    match kind {
        StorageKind::Block => table.add_row(vec!["LUN Id".into(), volume.get("lunId").into()]),
        StorageKind::File => table.add_row(vec![
            "Mount Address".into(),
            volume.get("fileNetworkMountAddress").into(),
        ]),
    }

    let performance = lookup_str(volume, &["storageType", "keyName"])
        .is_some_and(|key| key.contains("PERFORMANCE"));
    if performance {
        table.add_row(vec!["IOPs".into(), volume.get("iops").into()]);
    } else {
        table.add_row(vec!["Endurance Tier".into(), tier_label(volume).into()]);
    }

    table.add_row(vec![
        "Data Center".into(),
        lookup(volume, &["serviceResource", "datacenter", "name"]).into(),
    ]);
    table.add_row(vec!["Bytes Used".into(), volume.get("bytesUsed").into()]);
    table.add_row(vec![
        "IP".into(),
        volume.get("serviceResourceBackendIpAddress").into(),
    ]);

    if volume.get("snapshotCapacityGb").is_some_and(|v| !v.is_null()) {
        table.add_row(vec![
            "Snapshot Capacity (GB)".into(),
            volume.get("snapshotCapacityGb").into(),
        ]);
        table.add_row(vec![
            "Snapshot Used (Bytes)".into(),
            lookup(volume, &["parentVolume", "snapshotSizeBytes"]).into(),
        ]);
    }

    table.add_row(vec![
        "Ongoing Transactions".into(),
        volume.get("activeTransactionCount").into(),
    ]);
    if let Some(transactions) = volume.get("activeTransactions").and_then(Value::as_array) {
        let names = transactions.iter().filter_map(|t| {
            lookup_str(t, &["transactionStatus", "friendlyName"]).map(str::to_string)
        });
        table.add_row(vec!["Active Transactions".into(), listing(names, "\n").into()]);
    }

    table.add_row(vec![
        "Replicant Count".into(),
        volume.get("replicationPartnerCount").into(),
    ]);
    if lookup_i64(volume, &["replicationPartnerCount"]).unwrap_or(0) > 0 {
        table.add_row(vec![
            "Replication Status".into(),
            volume.get("replicationStatus").into(),
        ]);
        let mut replicants = Table::new(["id", "username", "ip", "datacenter", "schedule"]);
        for partner in volume
            .get("replicationPartners")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            replicants.add_row(vec![
                partner.get("id").into(),
                partner.get("username").into(),
                partner.get("serviceResourceBackendIpAddress").into(),
                lookup(partner, &["serviceResource", "datacenter", "name"]).into(),
                lookup(partner, &["replicationSchedule", "type", "keyname"]).into(),
            ]);
        }
        table.add_row(vec!["Replicant Volumes".into(), replicants.into()]);
    }
    table
}

fn access_table(access: &Value, sortby: Option<String>) -> Table {
    let mut table = Table::new([
        "id",
        "name",
        "type",
        "private_ip_address",
        "source_subnet",
        "username",
        "password",
    ]);
    table.sortby = sortby;
    let groups = [
        ("allowedVirtualGuests", "VIRTUAL"),
        ("allowedHardware", "HARDWARE"),
        ("allowedSubnets", "SUBNET"),
        ("allowedIpAddresses", "IP"),
    ];
    for (key, host_type) in groups {
        for host in access.get(key).and_then(Value::as_array).into_iter().flatten() {
            let name = match host_type {
                "SUBNET" => lookup_str(host, &["networkIdentifier"]).map(|network| {
                    format!("{}/{}", network, lookup_i64(host, &["cidr"]).unwrap_or(0))
                }),
                "IP" => lookup_str(host, &["ipAddress"]).map(str::to_string),
                _ => match (lookup_str(host, &["hostname"]), lookup_str(host, &["domain"])) {
                    (Some(hostname), Some(domain)) => Some(format!("{}.{}", hostname, domain)),
                    (Some(hostname), None) => Some(hostname.to_string()),
                    _ => None,
                },
            };
            let private_ip = host
                .get("primaryBackendIpAddress")
                .or_else(|| host.get("ipAddress"));
            table.add_row(vec![
                host.get("id").into(),
                name.into(),
                host_type.into(),
                private_ip.into(),
                lookup_str(host, &["networkIdentifier"]).into(),
                lookup(host, &["allowedHost", "credential", "username"]).into(),
                lookup(host, &["allowedHost", "credential", "password"]).into(),
            ]);
        }
    }
    table
}

fn snapshot_table(snapshots: &[Value], sortby: Option<String>) -> Table {
    let mut table = Table::new(["id", "name", "created", "size_bytes"]);
    table.sortby = sortby;
    for snapshot in snapshots {
        table.add_row(vec![
            snapshot.get("id").into(),
            snapshot.get("notes").into(),
            snapshot.get("snapshotCreationTimestamp").into(),
            snapshot.get("snapshotSizeBytes").into(),
        ]);
    }
    table
}

/// 下單結果：單號與項目
fn print_order(env: &mut Environment, order: &Value) -> Result<()> {
    let Some(order_id) = lookup_i64(order, &["placedOrder", "id"]) else {
        return env.out("Order could not be placed! Please verify your options and try again.");
    };
    let mut lines = vec![format!("Order #{} placed successfully!", order_id)];
    for item in lookup(order, &["placedOrder", "items"])
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        lines.push(format!(" > {}", lookup_str(item, &["description"]).unwrap_or("-")));
    }
    env.out(&lines.join("\n"))
}

pub async fn run(env: &mut Environment, kind: StorageKind, cmd: StorageCommand) -> Result<()> {
    let manager = manager_for(env, kind);
    match cmd {
        StorageCommand::VolumeList {
            username,
            datacenter,
            storage_type,
            sortby,
        } => {
            let volumes = manager
                .list_volumes(&VolumeFilter {
                    datacenter,
                    username,
                    storage_type,
                })
                .await?;
            env.fout(volume_table(kind, &volumes, sortby))
        }
        StorageCommand::VolumeDetail { volume_id } => {
            let volume = manager.get_volume_details(volume_id, None).await?;
            env.fout(volume_detail_table(kind, &volume))
        }
        StorageCommand::VolumeOrder {
            storage_type,
            size,
            iops,
            tier,
            os_type,
            location,
            snapshot_size,
        } => {
            let order = VolumeOrder {
                storage_type: storage_type.parse::<StorageType>()?,
                location,
                size,
                os_type,
                iops,
                tier_level: parse_tier(tier)?,
                snapshot_size,
            };
            let placed = manager.order_volume(&order).await?;
            print_order(env, &placed)
        }
        StorageCommand::VolumeCancel {
            volume_id,
            reason,
            immediate,
        } => {
            env.require_confirmation(&volume_id.to_string())?;
            let reason = reason.unwrap_or_else(|| DEFAULT_CANCEL_REASON.to_string());
            manager.cancel_volume(volume_id, &reason, immediate).await?;
            let when = if immediate { "immediately" } else { "on the next billing anniversary" };
            env.out(&format!(
                "{} volume with id {} has been marked for cancellation {}",
                capitalized(kind),
                volume_id,
                when
            ))
        }
        StorageCommand::AccessList { volume_id, sortby } => {
            let access = manager.get_volume_access_list(volume_id).await?;
            env.fout(access_table(&access, sortby))
        }
        StorageCommand::AccessAuthorize { volume_id, hosts } => {
            let targets = hosts.targets();
            if targets.is_empty() {
                return Err(SoftLayerError::argument("At least one host id is required"));
            }
            manager.authorize_host_to_volume(volume_id, &targets).await?;
            env.out(&format!(
                "The specified hosts were authorized to access {}",
                volume_id
            ))
        }
        StorageCommand::AccessRevoke { volume_id, hosts } => {
            let targets = hosts.targets();
            if targets.is_empty() {
                return Err(SoftLayerError::argument("At least one host id is required"));
            }
            manager.deauthorize_host_to_volume(volume_id, &targets).await?;
            env.out(&format!(
                "Access to {} was revoked for the specified hosts",
                volume_id
            ))
        }
        StorageCommand::SnapshotList { volume_id, sortby } => {
            let snapshots = manager.get_volume_snapshot_list(volume_id).await?;
            env.fout(snapshot_table(&snapshots, sortby))
        }
        StorageCommand::SnapshotCreate { volume_id, notes } => {
            let snapshot = manager
                .create_snapshot(volume_id, notes.as_deref().unwrap_or_default())
                .await?;
            match lookup_i64(&snapshot, &["id"]) {
                Some(id) => env.out(&format!("New snapshot created with id: {}", id)),
                None => env.out("Error occurred while creating snapshot.\nEnsure volume is not failed over or in another state which prevents taking snapshots."),
            }
        }
        StorageCommand::SnapshotDelete { snapshot_id } => {
            manager.delete_snapshot(snapshot_id).await?;
            env.out(&format!("Snapshot {} deleted", snapshot_id))
        }
        StorageCommand::SnapshotEnable {
            volume_id,
            schedule_type,
            retention_count,
            minute,
            hour,
            day_of_week,
        } => {
            let schedule = SnapshotSchedule {
                schedule_type: schedule_type.clone(),
                retention_count,
                minute,
                hour,
                day_of_week,
            };
            manager.enable_snapshots(volume_id, &schedule).await?;
            env.out(&format!(
                "{} snapshots have been enabled for volume {}",
                schedule_type, volume_id
            ))
        }
        StorageCommand::SnapshotDisable {
            volume_id,
            schedule_type,
        } => {
            manager.disable_snapshots(volume_id, &schedule_type).await?;
            env.out(&format!(
                "{} snapshots have been disabled for volume {}",
                schedule_type, volume_id
            ))
        }
        StorageCommand::SnapshotRestore {
            volume_id,
            snapshot_id,
        } => {
            manager.restore_from_snapshot(volume_id, snapshot_id).await?;
            env.out(&format!(
                "{} volume {} is being restored using snapshot {}",
                capitalized(kind),
                volume_id,
                snapshot_id
            ))
        }
        StorageCommand::SnapshotOrder {
            volume_id,
            capacity,
            tier,
            upgrade,
        } => {
            let placed = manager
                .order_snapshot_space(volume_id, capacity, parse_tier(tier)?, upgrade)
                .await?;
            print_order(env, &placed)
        }
        StorageCommand::SnapshotCancel {
            volume_id,
            reason,
            immediate,
        } => {
            env.require_confirmation(&volume_id.to_string())?;
            let reason = reason.unwrap_or_else(|| DEFAULT_CANCEL_REASON.to_string());
            manager.cancel_snapshot_space(volume_id, &reason, immediate).await?;
            env.out(&format!(
                "{} volume with id {} has been marked for snapshot cancellation",
                capitalized(kind),
                volume_id
            ))
        }
        StorageCommand::ReplicaFailover {
            volume_id,
            replicant_id,
            immediate,
        } => {
            manager
                .failover_to_replicant(volume_id, replicant_id, immediate)
                .await?;
            env.out(&format!(
                "Failover to replicant {} is now in progress.",
                replicant_id
            ))
        }
        StorageCommand::ReplicaFailback {
            volume_id,
            replicant_id,
        } => {
            manager.failback_from_replicant(volume_id, replicant_id).await?;
            env.out(&format!(
                "Failback from replicant {} is now in progress.",
                replicant_id
            ))
        }
    }
}

fn capitalized(kind: StorageKind) -> &'static str {
    match kind {
        StorageKind::Block => "Block",
        StorageKind::File => "File",
    }
}
