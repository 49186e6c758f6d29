//! Object filter helpers.
//!
//! SoftLayer object filters are nested JSON objects whose leaves are
//! `{"operation": ..., "options": [...]}` nodes. The helpers here turn flat user
//! input (`hostname=web*`, `datacenter.name IN dal10,dal13`) into that shape.

use crate::utils::error::{Result, SoftLayerError};
use chrono::{Datelike, NaiveDate};
use serde_json::{json, Map, Value};

/// 已知的運算子，順序很重要（`<=` 必須在 `<` 之前比對）
const KNOWN_OPERATIONS: [&str; 10] = ["<=", ">=", "<", ">", "~", "!~", "*=", "^=", "$=", "_="];

/// 將使用者輸入轉成 `{"operation": ...}` 節點
pub fn query_filter(query: impl AsRef<str>) -> Value {
    let query = query.as_ref().trim();

    if let Ok(number) = query.parse::<i64>() {
        return json!({ "operation": number });
    }

    for operation in KNOWN_OPERATIONS {
        if let Some(rest) = query.strip_prefix(operation) {
            return json!({ "operation": format!("{} {}", operation, rest.trim()) });
        }
    }

    let operation = if query.starts_with('*') && query.ends_with('*') {
        format!("*= {}", query.trim_matches('*'))
    } else if query.starts_with('*') {
        format!("$= {}", query.trim_start_matches('*'))
    } else if query.ends_with('*') {
        format!("^= {}", query.trim_end_matches('*'))
    } else {
        format!("_= {}", query)
    };

    json!({ "operation": operation })
}

/// `betweenDate` 過濾條件，輸入格式為 `YYYY-MM-DD`
pub fn query_filter_date(start: &str, end: &str) -> Result<Value> {
    let parse = |raw: &str| {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|e| SoftLayerError::argument(format!("Invalid date {}: {}", raw, e)))
    };
    let start = parse(start)?;
    let end = parse(end)?;
    let fmt = |d: NaiveDate| format!("{}/{}/{} 0:0:0", d.month(), d.day(), d.year());

    Ok(json!({
        "operation": "betweenDate",
        "options": [
            { "name": "startDate", "value": [fmt(start)] },
            { "name": "endDate", "value": [fmt(end)] },
        ]
    }))
}

pub fn query_filter_orderby(direction: &str) -> Value {
    json!({
        "operation": "orderBy",
        "options": [{ "name": "sort", "value": [direction] }]
    })
}

pub fn query_filter_in<I, S>(values: I) -> Value
where
    I: IntoIterator<Item = S>,
    S: Into<Value>,
{
    let values: Vec<Value> = values.into_iter().map(Into::into).collect();
    json!({
        "operation": "in",
        "options": [{ "name": "data", "value": values }]
    })
}

/// 可自動建立中間層的過濾條件建構器
#[derive(Debug, Clone, Default)]
pub struct NestedFilter {
    root: Map<String, Value>,
}

impl NestedFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以既有的 filter 為基底；非物件的輸入會被忽略
    pub fn from_value(value: Option<Value>) -> Self {
        match value {
            Some(Value::Object(root)) => Self { root },
            _ => Self::default(),
        }
    }

    pub fn set(&mut self, path: &[&str], value: Value) -> &mut Self {
        if let Some((last, parents)) = path.split_last() {
            let mut current = &mut self.root;
            for part in parents {
                let entry = current
                    .entry(part.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !entry.is_object() {
                    *entry = Value::Object(Map::new());
                }
                current = match entry {
                    Value::Object(map) => map,
                    _ => unreachable!("entry was just replaced with an object"),
                };
            }
            current.insert(last.to_string(), value);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }
}

/// 沿著 key 路徑取值，任一層不存在即回傳 None
pub fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

pub fn lookup_str<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    lookup(value, path).and_then(Value::as_str)
}

pub fn lookup_i64(value: &Value, path: &[&str]) -> Option<i64> {
    lookup(value, path).and_then(value_as_i64)
}

/// API 偶爾以字串回傳數字 id
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// 解析 `a.b=c` 與 `a.b IN x,y` 形式的 CLI 過濾條件
pub fn build_filters<S: AsRef<str>>(filters: &[S]) -> Result<Value> {
    let mut root = NestedFilter::new();

    for raw in filters {
        let raw = raw.as_ref();
        let (key, value, is_in) = if let Some((key, value)) = raw.split_once(" IN ") {
            (key, value, true)
        } else if let Some((key, value)) = raw.split_once('=') {
            (key, value, false)
        } else {
            return Err(SoftLayerError::argument(format!(
                "Failed to find valid operation for: {}",
                raw
            )));
        };

        let parts: Vec<&str> = key.split('.').map(str::trim).collect();
        let node = if is_in {
            query_filter_in(value.split(',').map(|p| p.trim().to_string()))
        } else {
            query_filter(value.trim())
        };
        root.set(&parts, node);
    }

    Ok(root.into_value())
}

/// 遞迴搜尋是否存在 `key == value` 的節點
pub fn has_key_value(tree: &Value, key: &str, value: &str) -> bool {
    match tree {
        Value::Object(map) => map.iter().any(|(k, v)| {
            (k == key && v.as_str() == Some(value)) || has_key_value(v, key, value)
        }),
        Value::Array(items) => items.iter().any(|v| has_key_value(v, key, value)),
        _ => false,
    }
}

/// 分頁呼叫需要穩定排序；沒有 orderBy 時補上 `id` 排序
pub fn fix_filter(filter: Option<&Value>) -> Value {
    let mut fixed = match filter {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };
    if !has_key_value(&Value::Object(fixed.clone()), "operation", "orderBy") {
        fixed.insert("id".to_string(), query_filter_orderby("ASC"));
    }
    Value::Object(fixed)
}

/// 壓縮多餘空白（多行 object mask 用於日誌時）
pub fn clean_string(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
