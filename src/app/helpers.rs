use crate::utils::error::{Result, SoftLayerError};
use crate::utils::resolver::IdentifierMixin;
use serde_json::Value;

/// 將識別碼解析為唯一的 id；找不到或多筆時中止
pub async fn resolve_id<M>(manager: &M, identifier: &str, name: &str) -> Result<i64>
where
    M: IdentifierMixin,
{
    let ids = manager.resolve_ids(identifier).await?;
    match ids.as_slice() {
        [id] => Ok(*id),
        [] => Err(SoftLayerError::abort(format!(
            "Unable to find object with identifier: {}",
            identifier
        ))),
        many => Err(SoftLayerError::abort(format!(
            "Multiple {} found for '{}': {}",
            name,
            identifier,
            many.iter().map(i64::to_string).collect::<Vec<_>>().join(", ")
        ))),
    }
}

/// 逗號分隔的數字清單
pub fn parse_ids(raw: &[String]) -> Result<Vec<i64>> {
    raw.iter()
        .flat_map(|part| part.split(','))
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .map_err(|_| SoftLayerError::argument(format!("Invalid id: {}", part)))
        })
        .collect()
}

/// 命令列參數：可解析為 JSON 者照 JSON，否則視為字串
pub fn parse_parameter(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// `--extra '{"key": ...}'` 必須是 JSON 物件
pub fn parse_json_object(raw: Option<&str>, field: &str) -> Result<serde_json::Map<String, Value>> {
    match raw {
        None => Ok(serde_json::Map::new()),
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(SoftLayerError::argument(format!(
                "{} must be a JSON object",
                field
            ))),
        },
    }
}

/// 一般欄位顯示用：null 或缺少時為 `-`
pub fn text_or_blank(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// API 的 ISO-8601 時間轉為 `out_format`；無法解析時原樣回傳
pub fn clean_time(value: Option<&Value>, out_format: &str) -> String {
    match value {
        Some(Value::String(raw)) => chrono::DateTime::parse_from_rfc3339(raw)
            .map(|time| time.format(out_format).to_string())
            .unwrap_or_else(|_| raw.clone()),
        other => text_or_blank(other),
    }
}

/// 超過 `length` 的文字截斷並補上 `...`
pub fn trim_to(text: &str, length: usize) -> String {
    if text.chars().count() <= length {
        return text.to_string();
    }
    let mut trimmed: String = text.chars().take(length).collect();
    trimmed.push_str("...");
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    #[derive(Debug, Clone, Copy)]
    struct Lookup;

    struct Names;

    #[async_trait]
    impl IdentifierMixin for Names {
        type Resolver = Lookup;
        const RESOLVERS: &'static [Lookup] = &[Lookup];

        async fn resolve_with(&self, _: Lookup, identifier: &str) -> Result<Vec<i64>> {
            Ok(match identifier {
                "one" => vec![1],
                "many" => vec![2, 3],
                _ => vec![],
            })
        }
    }

    #[tokio::test]
    async fn test_resolve_id() {
        assert_eq!(resolve_id(&Names, "one", "thing").await.unwrap(), 1);
        assert_eq!(resolve_id(&Names, "42", "thing").await.unwrap(), 42);

        let err = resolve_id(&Names, "none", "thing").await.unwrap_err();
        assert_eq!(err.to_string(), "Unable to find object with identifier: none");
        assert_eq!(err.exit_code(), 2);

        let err = resolve_id(&Names, "many", "things").await.unwrap_err();
        assert_eq!(err.to_string(), "Multiple things found for 'many': 2, 3");
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(
            parse_ids(&["1,2".to_string(), " 3".to_string()]).unwrap(),
            vec![1, 2, 3]
        );
        assert!(parse_ids(&["x".to_string()]).is_err());

        assert_eq!(parse_parameter("10"), json!(10));
        assert_eq!(parse_parameter("{\"a\": 1}"), json!({"a": 1}));
        assert_eq!(parse_parameter("hostname"), json!("hostname"));

        assert!(parse_json_object(Some("[1]"), "--extra").is_err());

        let created = json!("2018-04-01T10:20:00-07:00");
        assert_eq!(clean_time(Some(&created), "%Y-%m-%d"), "2018-04-01");
        assert_eq!(clean_time(Some(&created), "%Y-%m-%d %H:%M"), "2018-04-01 10:20");
        assert_eq!(clean_time(Some(&json!("yesterday")), "%Y-%m-%d"), "yesterday");
        assert_eq!(clean_time(None, "%Y-%m-%d"), "-");

        assert_eq!(trim_to("abcdef", 3), "abc...");
        assert_eq!(trim_to("abc", 3), "abc");
        assert_eq!(parse_json_object(None, "--extra").unwrap().len(), 0);
    }
}
