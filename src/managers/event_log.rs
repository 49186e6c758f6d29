//! Account event log (`SoftLayer_Event_Log`).

use crate::core::Client;
use crate::utils::error::{Result, SoftLayerError};
use crate::utils::filter::lookup_str;
use chrono::NaiveDate;
use serde_json::{json, Map, Value};

pub const DEFAULT_UTC_OFFSET: &str = "-0500";

/// 以 request id 搜尋時會查的物件類型
const REQUEST_ID_OBJECT_TYPES: [&str; 2] = ["CCI", "Security Group"];

/// Search options for [`EventLogManager::get_event_logs`].
#[derive(Debug, Clone)]
pub struct EventLogQuery {
    /// `MM/DD/YYYY`
    pub date_min: Option<String>,
    pub date_max: Option<String>,
    pub event_name: Option<String>,
    pub object_id: Option<i64>,
    pub object_type: Option<String>,
    /// `+HHMM` 或 `-HHMM`
    pub utc_offset: String,
}

impl Default for EventLogQuery {
    fn default() -> Self {
        Self {
            date_min: None,
            date_max: None,
            event_name: None,
            object_id: None,
            object_type: None,
            utc_offset: DEFAULT_UTC_OFFSET.to_string(),
        }
    }
}

/// `05/01/2019` + `-0500` → `2019-05-01T00:00:00.000000-05:00`
pub fn format_event_log_date(date: &str, utc_offset: &str) -> Result<String> {
    let day = NaiveDate::parse_from_str(date.trim(), "%m/%d/%Y").map_err(|e| {
        SoftLayerError::argument(format!("Invalid date {} (expected MM/DD/YYYY): {}", date, e))
    })?;
    let offset = utc_offset.trim();
    let valid = offset.len() == 5
        && (offset.starts_with('+') || offset.starts_with('-'))
        && offset[1..].chars().all(|c| c.is_ascii_digit());
    if !valid {
        return Err(SoftLayerError::argument(format!(
            "Invalid UTC offset {} (expected +HHMM or -HHMM)",
            utc_offset
        )));
    }
    Ok(format!(
        "{}T00:00:00.000000{}:{}",
        day.format("%Y-%m-%d"),
        &offset[..3],
        &offset[3..]
    ))
}

fn date_option(name: &str, date: &str, utc_offset: &str) -> Result<Value> {
    Ok(json!({ "name": name, "value": [format_event_log_date(date, utc_offset)?] }))
}

impl EventLogQuery {
    pub fn build_filter(&self) -> Result<Value> {
        let mut filter = Map::new();
        let offset = self.utc_offset.as_str();

        let created = match (&self.date_min, &self.date_max) {
            (Some(min), Some(max)) => Some(json!({
                "operation": "betweenDate",
                "options": [
                    date_option("startDate", min, offset)?,
                    date_option("endDate", max, offset)?,
                ]
            })),
            (Some(min), None) => Some(json!({
                "operation": "greaterThanDate",
                "options": [date_option("date", min, offset)?]
            })),
            (None, Some(max)) => Some(json!({
                "operation": "lessThanDate",
                "options": [date_option("date", max, offset)?]
            })),
            (None, None) => None,
        };
        if let Some(created) = created {
            filter.insert("eventCreateDate".to_string(), created);
        }
        if let Some(event_name) = &self.event_name {
            filter.insert("eventName".to_string(), json!({ "operation": event_name }));
        }
        if let Some(object_id) = self.object_id {
            filter.insert("objectId".to_string(), json!({ "operation": object_id }));
        }
        if let Some(object_type) = &self.object_type {
            filter.insert("objectName".to_string(), json!({ "operation": object_type }));
        }
        Ok(Value::Object(filter))
    }
}

/// `metaData` 是 JSON 字串；解析失敗時視為沒有
pub fn parse_metadata(log: &Value) -> Option<Value> {
    lookup_str(log, &["metaData"])
        .filter(|raw| !raw.trim().is_empty())
        .and_then(|raw| serde_json::from_str(raw).ok())
}

#[derive(Debug, Clone)]
pub struct EventLogManager {
    client: Client,
}

impl EventLogManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn get_event_logs(&self, filter: Value, limit: Option<u32>) -> Result<Vec<Value>> {
        let mut call = self.client.call("Event_Log", "getAllObjects").filter(filter);
        if let Some(limit) = limit {
            call = call.limit(limit);
        }
        let logs = call.send().await?;
        Ok(super::as_list(logs))
    }

    pub async fn get_event_log_types(&self) -> Result<Vec<Value>> {
        let types = self
            .client
            .call("Event_Log", "getAllEventObjectNames")
            .send()
            .await?;
        Ok(super::as_list(types))
    }

    /// 在 CCI 與 Security Group 記錄中找出 `metaData.requestId` 相符者
    pub async fn get_event_logs_by_request_id(&self, request_id: &str) -> Result<Vec<Value>> {
        let mut matched = Vec::new();
        for object_type in REQUEST_ID_OBJECT_TYPES {
            let query = EventLogQuery {
                object_type: Some(object_type.to_string()),
                ..Default::default()
            };
            let logs = self.get_event_logs(query.build_filter()?, None).await?;
            matched.extend(logs.into_iter().filter(|log| {
                lookup_str(log, &["objectName"]) == Some(object_type)
                    && parse_metadata(log)
                        .as_ref()
                        .and_then(|meta| lookup_str(meta, &["requestId"]))
                        == Some(request_id)
            }));
        }
        Ok(matched)
    }
}
