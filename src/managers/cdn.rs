//! CDN domain mappings on the CDN marketplace services.

use crate::core::Client;
use crate::utils::error::{Result, SoftLayerError};
use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

const MAPPING: &str = "Network_CdnMarketplace_Configuration_Mapping";
const MAPPING_PATH: &str = "Network_CdnMarketplace_Configuration_Mapping_Path";

/// Where an origin path fetches its content from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginType {
    Server,
    Storage,
}

impl OriginType {
    fn api_name(self) -> &'static str {
        match self {
            OriginType::Server => "HOST_SERVER",
            OriginType::Storage => "OBJECT_STORAGE",
        }
    }
}

impl std::str::FromStr for OriginType {
    type Err = SoftLayerError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.to_lowercase().as_str() {
            "server" => Ok(OriginType::Server),
            "storage" => Ok(OriginType::Storage),
            other => Err(SoftLayerError::argument(format!(
                "origin type must be server or storage, not {}",
                other
            ))),
        }
    }
}

/// `createOriginPath` 的輸入
#[derive(Debug, Clone)]
pub struct OriginPath {
    pub path: String,
    pub origin: String,
    pub origin_type: OriginType,
    pub header: Option<String>,
    pub port: u16,
    pub protocol: String,
    pub bucket_name: Option<String>,
    pub file_extensions: Option<String>,
    /// `web`、`video` 或 `file`
    pub optimize_for: Option<String>,
    pub cache_query: String,
}

impl OriginPath {
    pub fn new(path: impl Into<String>, origin: impl Into<String>, origin_type: OriginType) -> Self {
        Self {
            path: path.into(),
            origin: origin.into(),
            origin_type,
            header: None,
            port: 80,
            protocol: "http".to_string(),
            bucket_name: None,
            file_extensions: None,
            optimize_for: None,
            cache_query: "include-all".to_string(),
        }
    }
}

fn performance_configuration(optimize_for: Option<&str>) -> &'static str {
    match optimize_for {
        Some("video") => "Video on demand optimization",
        Some("file") => "Large file optimization",
        _ => "General web delivery",
    }
}

/// 回傳為單元素陣列時取出第一個
fn first(value: Value) -> Value {
    match value {
        Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        Value::Array(_) => Value::Null,
        other => other,
    }
}

#[derive(Debug, Clone)]
pub struct CdnManager {
    client: Client,
}

impl CdnManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn list_cdn(&self) -> Result<Vec<Value>> {
        let mappings = self.client.call(MAPPING, "listDomainMappings").send().await?;
        Ok(super::as_list(mappings))
    }

    pub async fn get_cdn(&self, unique_id: &str) -> Result<Value> {
        let mapping = self
            .client
            .call(MAPPING, "listDomainMappingByUniqueId")
            .arg(unique_id)
            .send()
            .await?;
        match first(mapping) {
            Value::Null => Err(SoftLayerError::not_found(format!(
                "Unable to find CDN with unique id {}",
                unique_id
            ))),
            mapping => Ok(mapping),
        }
    }

    pub async fn get_origins(&self, unique_id: &str) -> Result<Vec<Value>> {
        let origins = self
            .client
            .call(MAPPING_PATH, "listOriginPath")
            .arg(unique_id)
            .send()
            .await?;
        Ok(super::as_list(origins))
    }

    pub async fn add_origin(&self, unique_id: &str, origin: &OriginPath) -> Result<Value> {
        let mut config = Map::new();
        config.insert("uniqueId".to_string(), json!(unique_id));
        config.insert("path".to_string(), json!(origin.path));
        config.insert("origin".to_string(), json!(origin.origin));
        config.insert("originType".to_string(), json!(origin.origin_type.api_name()));
        config.insert("httpPort".to_string(), json!(origin.port));
        config.insert("protocol".to_string(), json!(origin.protocol.to_uppercase()));
        config.insert(
            "performanceConfiguration".to_string(),
            json!(performance_configuration(origin.optimize_for.as_deref())),
        );
        config.insert("cacheKeyQueryRule".to_string(), json!(origin.cache_query));
        if let Some(header) = &origin.header {
            config.insert("header".to_string(), json!(header));
        }
        if origin.origin_type == OriginType::Storage {
            if let Some(bucket) = &origin.bucket_name {
                config.insert("bucketName".to_string(), json!(bucket));
            }
            if let Some(extensions) = &origin.file_extensions {
                config.insert("fileExtension".to_string(), json!(extensions));
            }
        }

        let created = self
            .client
            .call(MAPPING_PATH, "createOriginPath")
            .arg(Value::Object(config))
            .send()
            .await?;
        Ok(first(created))
    }

    pub async fn remove_origin(&self, unique_id: &str, path: &str) -> Result<Value> {
        self.client
            .call(MAPPING_PATH, "deleteOriginPath")
            .arg(unique_id)
            .arg(path)
            .send()
            .await
    }

    pub async fn purge_content(&self, unique_id: &str, path: &str) -> Result<Vec<Value>> {
        let purged = self
            .client
            .call("Network_CdnMarketplace_Configuration_Cache_Purge", "createPurge")
            .arg(unique_id)
            .arg(path)
            .send()
            .await?;
        Ok(super::as_list(purged))
    }

    /// 最近 `history` 天的流量統計
    pub async fn get_usage_metrics(&self, unique_id: &str, history: i64, frequency: &str) -> Result<Value> {
        let end = Utc::now();
        let start = end - Duration::days(history);
        let metrics = self
            .client
            .call("Network_CdnMarketplace_Metrics", "getMappingUsageMetrics")
            .arg(unique_id)
            .arg(start.timestamp())
            .arg(end.timestamp())
            .arg(frequency)
            .send()
            .await?;
        Ok(first(metrics))
    }
}
