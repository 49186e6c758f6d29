use crate::utils::error::Result;
use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

fn guid_regex() -> &'static Regex {
    static GUID: OnceLock<Regex> = OnceLock::new();
    GUID.get_or_init(|| {
        Regex::new(r"^[0-9a-fA-F]{8}-([0-9a-fA-F]{4}-){3}[0-9a-fA-F]{12}$")
            .expect("static GUID regex")
    })
}

pub fn looks_like_guid(identifier: &str) -> bool {
    identifier.len() == 36 && guid_regex().is_match(identifier)
}

/// 以名稱、主機名、IP 等人類可讀識別碼解析出數字 id
///
/// 純數字識別碼直接回傳；否則依 `RESOLVERS` 順序嘗試，第一個有結果的解析器勝出。
#[async_trait]
pub trait IdentifierMixin: Send + Sync {
    type Resolver: Copy + Send + Sync + std::fmt::Debug + 'static;

    const RESOLVERS: &'static [Self::Resolver];

    async fn resolve_with(&self, resolver: Self::Resolver, identifier: &str) -> Result<Vec<i64>>;

    async fn resolve_ids(&self, identifier: &str) -> Result<Vec<i64>> {
        if let Ok(id) = identifier.trim().parse::<i64>() {
            return Ok(vec![id]);
        }

        for resolver in Self::RESOLVERS {
            let ids = self.resolve_with(*resolver, identifier).await?;
            if !ids.is_empty() {
                tracing::debug!(?resolver, identifier, "resolved {} id(s)", ids.len());
                return Ok(ids);
            }
        }

        Ok(Vec::new())
    }
}
