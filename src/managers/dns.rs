use crate::core::Client;
use crate::utils::error::{Result, SoftLayerError};
use crate::utils::filter::{lookup_i64, query_filter, NestedFilter};
use crate::utils::resolver::IdentifierMixin;
use async_trait::async_trait;
use chrono::Local;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::OnceLock;

const RECORD_MASK: &str =
    "id,expire,domainId,lastGeneratedDate,minimum,refresh,retry,mxPriority,ttl,type,data,host";

#[derive(Debug, Clone, Copy)]
pub enum ZoneResolver {
    Name,
}

/// Filters accepted by [`DnsManager::get_records`].
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub ttl: Option<u32>,
    pub host: Option<String>,
    pub data: Option<String>,
    pub record_type: Option<String>,
}

/// SRV record fields beyond the common ones.
#[derive(Debug, Clone)]
pub struct SrvRecord {
    pub service: String,
    pub protocol: String,
    pub port: u16,
    pub priority: u32,
    pub weight: u32,
}

impl Default for SrvRecord {
    fn default() -> Self {
        Self {
            service: String::new(),
            protocol: String::new(),
            port: 0,
            priority: 20,
            weight: 10,
        }
    }
}

/// DNS zones and resource records.
#[derive(Debug, Clone)]
pub struct DnsManager {
    client: Client,
}

impl DnsManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn list_zones(&self, mask: Option<&str>) -> Result<Vec<Value>> {
        let value = self
            .client
            .call("Account", "getDomains")
            .mask_opt(mask)
            .send()
            .await?;
        Ok(super::as_list(value))
    }

    pub async fn get_zone(&self, zone_id: i64, records: bool) -> Result<Value> {
        self.client
            .call("Dns_Domain", "getObject")
            .id(zone_id)
            .mask_opt(records.then_some("resourceRecords"))
            .send()
            .await
    }

    /// serial 預設為今天日期加上 01
    pub async fn create_zone(&self, zone: &str, serial: Option<&str>) -> Result<Value> {
        let serial = serial
            .map(str::to_string)
            .unwrap_or_else(|| Local::now().format("%Y%m%d01").to_string());
        self.client
            .call("Dns_Domain", "createObject")
            .arg(json!({
                "name": zone,
                "serial": serial,
                "resourceRecords": {},
            }))
            .send()
            .await
    }

    pub async fn delete_zone(&self, zone_id: i64) -> Result<Value> {
        self.client
            .call("Dns_Domain", "deleteObject")
            .id(zone_id)
            .send()
            .await
    }

    /// `zone` 必須帶 `id`
    pub async fn edit_zone(&self, zone: Value) -> Result<Value> {
        let zone_id = lookup_i64(&zone, &["id"])
            .ok_or_else(|| SoftLayerError::argument("A zone id is required to edit a zone"))?;
        self.client
            .call("Dns_Domain", "editObject")
            .id(zone_id)
            .arg(zone)
            .send()
            .await
    }

    fn generate_create_dict(record: &str, record_type: &str, data: &str, ttl: u32) -> Map<String, Value> {
        let mut resource = Map::new();
        resource.insert("host".to_string(), json!(record));
        resource.insert("data".to_string(), json!(data));
        resource.insert("ttl".to_string(), json!(ttl));
        resource.insert("type".to_string(), json!(record_type));
        resource
    }

    async fn create_resource_record(&self, resource: Map<String, Value>) -> Result<Value> {
        tracing::debug!("creating resource record {:?}", resource);
        self.client
            .call("Dns_Domain_ResourceRecord", "createObject")
            .arg(Value::Object(resource))
            .send()
            .await
    }

    pub async fn create_record(
        &self,
        zone_id: i64,
        record: &str,
        record_type: &str,
        data: &str,
        ttl: u32,
    ) -> Result<Value> {
        let mut resource = Self::generate_create_dict(record, record_type, data, ttl);
        resource.insert("domainId".to_string(), json!(zone_id));
        self.create_resource_record(resource).await
    }

    pub async fn create_record_mx(
        &self,
        zone_id: i64,
        record: &str,
        data: &str,
        ttl: u32,
        priority: Option<u32>,
    ) -> Result<Value> {
        let mut resource = Self::generate_create_dict(record, "MX", data, ttl);
        resource.insert("domainId".to_string(), json!(zone_id));
        resource.insert("mxPriority".to_string(), json!(priority.unwrap_or(10)));
        self.create_resource_record(resource).await
    }

    pub async fn create_record_srv(
        &self,
        zone_id: i64,
        record: &str,
        data: &str,
        ttl: u32,
        srv: &SrvRecord,
    ) -> Result<Value> {
        let mut resource = Self::generate_create_dict(record, "SRV", data, ttl);
        resource.insert("domainId".to_string(), json!(zone_id));
        resource.insert(
            "complexType".to_string(),
            json!("SoftLayer_Dns_Domain_ResourceRecord_SrvType"),
        );
        resource.insert("service".to_string(), json!(srv.service));
        resource.insert("protocol".to_string(), json!(srv.protocol));
        resource.insert("port".to_string(), json!(srv.port));
        resource.insert("priority".to_string(), json!(srv.priority));
        resource.insert("weight".to_string(), json!(srv.weight));
        self.create_resource_record(resource).await
    }

    /// PTR 記錄不屬於任何 zone
    pub async fn create_record_ptr(&self, record: &str, data: &str, ttl: u32) -> Result<Value> {
        let resource = Self::generate_create_dict(record, "PTR", data, ttl);
        self.create_resource_record(resource).await
    }

    pub fn records_filter(filters: &RecordFilter) -> Value {
        let mut filter = NestedFilter::new();
        if let Some(ttl) = filters.ttl {
            filter.set(&["resourceRecords", "ttl"], json!({ "operation": ttl }));
        }
        if let Some(host) = &filters.host {
            filter.set(&["resourceRecords", "host"], json!({ "operation": host }));
        }
        if let Some(data) = &filters.data {
            filter.set(&["resourceRecords", "data"], json!({ "operation": data }));
        }
        if let Some(record_type) = &filters.record_type {
            filter.set(
                &["resourceRecords", "type"],
                json!({ "operation": record_type.to_lowercase() }),
            );
        }
        filter.into_value()
    }

    pub async fn get_records(&self, zone_id: i64, filters: &RecordFilter) -> Result<Vec<Value>> {
        let value = self
            .client
            .call("Dns_Domain", "getResourceRecords")
            .id(zone_id)
            .mask(RECORD_MASK)
            .filter(Self::records_filter(filters))
            .send()
            .await?;
        Ok(super::as_list(value))
    }

    pub async fn get_record(&self, record_id: i64) -> Result<Value> {
        self.client
            .call("Dns_Domain_ResourceRecord", "getObject")
            .id(record_id)
            .send()
            .await
    }

    /// `record` 必須帶 `id`；`isGatewayAddress` 不可寫入，送出前移除
    pub async fn edit_record(&self, mut record: Value) -> Result<Value> {
        let record_id = lookup_i64(&record, &["id"])
            .ok_or_else(|| SoftLayerError::argument("A record id is required to edit a record"))?;
        if let Some(map) = record.as_object_mut() {
            map.remove("isGatewayAddress");
        }
        self.client
            .call("Dns_Domain_ResourceRecord", "editObject")
            .id(record_id)
            .arg(record)
            .send()
            .await
    }

    pub async fn delete_record(&self, record_id: i64) -> Result<Value> {
        self.client
            .call("Dns_Domain_ResourceRecord", "deleteObject")
            .id(record_id)
            .send()
            .await
    }

    /// BIND 格式的 zone 內容
    pub async fn dump_zone(&self, zone_id: i64) -> Result<String> {
        let value = self
            .client
            .call("Dns_Domain", "getZoneFileContents")
            .id(zone_id)
            .send()
            .await?;
        Ok(match value {
            Value::String(contents) => contents,
            other => other.to_string(),
        })
    }
}

#[async_trait]
impl IdentifierMixin for DnsManager {
    type Resolver = ZoneResolver;
    const RESOLVERS: &'static [ZoneResolver] = &[ZoneResolver::Name];

    async fn resolve_with(&self, resolver: ZoneResolver, identifier: &str) -> Result<Vec<i64>> {
        match resolver {
            ZoneResolver::Name => {
                let mut filter = NestedFilter::new();
                filter.set(&["domains", "name"], query_filter(identifier));
                let zones = self
                    .client
                    .call("Account", "getDomains")
                    .mask("id")
                    .filter(filter.into_value())
                    .send()
                    .await?;
                Ok(super::as_list(zones)
                    .iter()
                    .filter_map(|zone| lookup_i64(zone, &["id"]))
                    .collect())
            }
        }
    }
}

/// One record parsed out of a BIND zone file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedRecord {
    pub record: String,
    pub record_type: String,
    pub data: String,
    pub ttl: Option<u32>,
}

impl fmt::Display for ParsedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ttl = self
            .ttl
            .map(|t| t.to_string())
            .unwrap_or_else(|| "None".to_string());
        write!(
            f,
            "type={}, record={}, data={}, ttl={}",
            self.record_type, self.record, self.data, ttl
        )
    }
}

/// Result of parsing a zone file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneDetails {
    pub zone: String,
    pub records: Vec<ParsedRecord>,
    pub bad_lines: Vec<String>,
}

fn origin_regex() -> &'static Regex {
    static ORIGIN: OnceLock<Regex> = OnceLock::new();
    ORIGIN.get_or_init(|| Regex::new(r"^\$ORIGIN (?P<zone>.*)\.").expect("static origin regex"))
}

fn record_regex() -> &'static Regex {
    static RECORD: OnceLock<Regex> = OnceLock::new();
    RECORD.get_or_init(|| {
        Regex::new(
            r"^((?P<domain>(([\w-]+|\*)(\.)?)*|@)?\s+(?P<ttl>\d+)?\s+(?P<class>\w+)?)?\s+(?P<type>\w+)\s+(?P<data>.*)",
        )
        .expect("static record regex")
    })
}

fn mx_regex() -> &'static Regex {
    static MX: OnceLock<Regex> = OnceLock::new();
    MX.get_or_init(|| Regex::new(r"(?P<weight>\d+)\s+(?P<data>.*)").expect("static mx regex"))
}

/// 解析 BIND zone 檔；第一行必須是 `$ORIGIN`
pub fn parse_zone_details(contents: &str) -> Result<ZoneDetails> {
    let lines: Vec<&str> = contents.split('\n').map(str::trim).collect();
    let first = lines.first().copied().unwrap_or_default();
    let zone = origin_regex()
        .captures(first)
        .and_then(|caps| caps.name("zone"))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| {
            SoftLayerError::argument("Zone file must start with an $ORIGIN line")
        })?;

    let mut records = Vec::new();
    let mut bad_lines = Vec::new();

    for line in lines.iter().skip(1) {
        let Some(caps) = record_regex().captures(line) else {
            bad_lines.push(line.to_string());
            continue;
        };

        let record = caps
            .name("domain")
            .map(|m| m.as_str())
            .filter(|d| !d.is_empty())
            .unwrap_or("@")
            .to_string();
        let ttl = caps.name("ttl").and_then(|m| m.as_str().parse().ok());
        let record_type = caps
            .name("type")
            .map(|m| m.as_str().to_uppercase())
            .unwrap_or_default();
        let mut data = caps
            .name("data")
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        // 不支援 MX 權重，去掉開頭的數字
        if record_type == "MX" {
            if let Some(stripped) = mx_regex()
                .captures(&data)
                .and_then(|c| c.name("data"))
                .map(|m| m.as_str().to_string())
            {
                data = stripped;
            }
        }

        // SOA 或格式怪異的行
        if record_type == "IN" {
            bad_lines.push(line.to_string());
            continue;
        }

        records.push(ParsedRecord {
            record,
            record_type,
            data,
            ttl,
        });
    }

    Ok(ZoneDetails {
        zone,
        records,
        bad_lines,
    })
}
