use crate::app::environment::Environment;
use crate::app::formatting::{blank, FormattedItem, Table};
use crate::managers::cdn::{OriginPath, OriginType};
use crate::managers::CdnManager;
use crate::utils::error::{Result, SoftLayerError};
use crate::utils::filter::lookup;
use clap::Subcommand;
use serde_json::Value;

#[derive(Debug, Subcommand)]
pub enum CdnCommand {
    /// List all CDN accounts
    List {
        /// Column to sort by
        #[arg(long, value_parser = ["unique_id", "domain", "origin", "vendor", "cname", "status"])]
        sortby: Option<String>,
    },
    /// Detail a CDN Account
    Detail {
        unique_id: String,
        /// Bandwidth, Hits, Ratio counted over history number of days ago
        #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(i64).range(1..=89))]
        history: i64,
    },
    /// List origin path for an existing CDN mapping
    OriginList { unique_id: String },
    /// Create an origin path for an existing CDN mapping
    OriginAdd {
        unique_id: String,
        /// IP address or hostname of the origin, or the Object Storage endpoint
        origin: String,
        /// Path to the content to be cached
        path: String,
        /// The origin type
        #[arg(short = 't', long = "origin-type", default_value = "server", value_parser = ["server", "storage"])]
        origin_type: String,
        /// The host header to communicate with the origin
        #[arg(short = 'H', long)]
        header: Option<String>,
        /// The name of the available resource (object storage only)
        #[arg(short, long = "bucket-name")]
        bucket_name: Option<String>,
        /// The http port number
        #[arg(short, long, default_value_t = 80)]
        port: u16,
        /// The protocol used by the origin
        #[arg(short = 'P', long, default_value = "http", value_parser = ["http", "https"])]
        protocol: String,
        /// Performance configuration
        #[arg(short, long = "optimize-for", value_parser = ["web", "video", "file"])]
        optimize_for: Option<String>,
        /// File extensions that can be stored in the CDN (object storage only)
        #[arg(short, long)]
        extensions: Option<String>,
        /// Cache query rules
        #[arg(short, long = "cache-query", default_value = "include-all")]
        cache_query: String,
    },
    /// Removes an origin path for an existing CDN mapping
    OriginRemove { unique_id: String, origin_path: String },
    /// Creates a purge record and also initiates the purge call
    Purge {
        unique_id: String,
        /// Paths to purge, e.g. /article/file.txt
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

fn cdn_table(mappings: &[Value], sortby: Option<String>) -> Table {
    let mut table = Table::new(["unique_id", "domain", "origin", "vendor", "cname", "status"]);
    table.sortby = sortby;
    for mapping in mappings {
        table.add_row(vec![
            mapping.get("uniqueId").into(),
            mapping.get("domain").into(),
            mapping.get("originHost").into(),
            mapping.get("vendorName").into(),
            mapping.get("cname").into(),
            mapping.get("status").into(),
        ]);
    }
    table
}

/// `totals` 與 `names` 同序；缺值時顯示 `-`
fn metric(metrics: &Value, index: usize, unit: &str) -> FormattedItem {
    match lookup(metrics, &["totals"]).and_then(|t| t.get(index)) {
        Some(total) if !total.is_null() => {
            let text = match total {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            FormattedItem::new(total.clone(), format!("{}{}", text, unit))
        }
        _ => blank(),
    }
}

pub async fn run(env: &mut Environment, cmd: CdnCommand) -> Result<()> {
    let manager = CdnManager::new(env.client.clone());
    match cmd {
        CdnCommand::List { sortby } => {
            let mappings = manager.list_cdn().await?;
            env.fout(cdn_table(&mappings, sortby))
        }
        CdnCommand::Detail { unique_id, history } => {
            let cdn = manager.get_cdn(&unique_id).await?;
            let metrics = manager
                .get_usage_metrics(&unique_id, history, "aggregate")
                .await?;

            let mut table = Table::key_value();
            table.add_row(vec!["unique_id".into(), cdn.get("uniqueId").into()]);
            table.add_row(vec!["hostname".into(), cdn.get("domain").into()]);
            table.add_row(vec!["protocol".into(), cdn.get("protocol").into()]);
            table.add_row(vec!["origin".into(), cdn.get("originHost").into()]);
            table.add_row(vec!["origin_type".into(), cdn.get("originType").into()]);
            table.add_row(vec!["path".into(), cdn.get("path").into()]);
            table.add_row(vec!["provider".into(), cdn.get("vendorName").into()]);
            table.add_row(vec!["status".into(), cdn.get("status").into()]);
            table.add_row(vec!["total_bandwidth".into(), metric(&metrics, 0, " GB").into()]);
            table.add_row(vec!["total_hits".into(), metric(&metrics, 1, "").into()]);
            table.add_row(vec!["hit_radio".into(), metric(&metrics, 2, " %").into()]);
            env.fout(table)
        }
        CdnCommand::OriginList { unique_id } => {
            let origins = manager.get_origins(&unique_id).await?;
            let mut table = Table::new(["Path", "Origin", "HTTP Port", "Status"]);
            for origin in &origins {
                table.add_row(vec![
                    origin.get("path").into(),
                    origin.get("origin").into(),
                    origin.get("httpPort").into(),
                    origin.get("status").into(),
                ]);
            }
            env.fout(table)
        }
        CdnCommand::OriginAdd {
            unique_id,
            origin,
            path,
            origin_type,
            header,
            bucket_name,
            port,
            protocol,
            optimize_for,
            extensions,
            cache_query,
        } => {
            let origin_type = origin_type.parse::<OriginType>()?;
            if origin_type == OriginType::Storage && bucket_name.is_none() {
                return Err(SoftLayerError::argument(
                    "[-b | --bucket-name] is required when [-t | --origin-type] is \"storage\"",
                ));
            }
            let mut request = OriginPath::new(path, origin, origin_type);
            request.header = header;
            request.bucket_name = bucket_name;
            request.port = port;
            request.protocol = protocol;
            request.optimize_for = optimize_for;
            request.file_extensions = extensions;
            request.cache_query = cache_query;

            let created = manager.add_origin(&unique_id, &request).await?;
            let mut table = Table::key_value();
            table.add_row(vec!["CDN Unique ID".into(), created.get("mappingUniqueId").into()]);
            table.add_row(vec!["Path".into(), created.get("path").into()]);
            table.add_row(vec!["Origin".into(), created.get("origin").into()]);
            table.add_row(vec!["Origin Type".into(), created.get("originType").into()]);
            table.add_row(vec!["Header".into(), created.get("header").into()]);
            table.add_row(vec!["Http Port".into(), created.get("httpPort").into()]);
            table.add_row(vec!["Status".into(), created.get("status").into()]);
            if origin_type == OriginType::Storage {
                table.add_row(vec!["Bucket Name".into(), created.get("bucketName").into()]);
                table.add_row(vec!["File Extension".into(), created.get("fileExtension").into()]);
            }
            env.fout(table)
        }
        CdnCommand::OriginRemove {
            unique_id,
            origin_path,
        } => {
            manager.remove_origin(&unique_id, &origin_path).await?;
            env.out(&format!("Origin with path {} has been deleted", origin_path))
        }
        CdnCommand::Purge { unique_id, paths } => {
            let mut table = Table::new(["Date", "Path", "Saved", "Status"]);
            for path in &paths {
                for purge in manager.purge_content(&unique_id, path).await? {
                    table.add_row(vec![
                        purge.get("date").into(),
                        purge.get("path").into(),
                        purge.get("saved").into(),
                        purge.get("status").into(),
                    ]);
                }
            }
            env.fout(table)
        }
    }
}
