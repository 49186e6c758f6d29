use crate::core::Client;
use crate::utils::error::Result;
use crate::utils::filter::{lookup_i64, lookup_str, query_filter, NestedFilter};
use crate::utils::resolver::IdentifierMixin;
use async_trait::async_trait;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy)]
pub enum SshKeyResolver {
    Label,
}

/// SSH keys stored on the account.
#[derive(Debug, Clone)]
pub struct SshKeyManager {
    client: Client,
}

impl SshKeyManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn add_key(&self, key: &str, label: &str, notes: Option<&str>) -> Result<Value> {
        let mut order = Map::new();
        order.insert("key".to_string(), Value::from(key));
        order.insert("label".to_string(), Value::from(label));
        order.insert(
            "notes".to_string(),
            notes.map(Value::from).unwrap_or(Value::Null),
        );
        self.client
            .call("Security_Ssh_Key", "createObject")
            .arg(Value::Object(order))
            .send()
            .await
    }

    pub async fn delete_key(&self, key_id: i64) -> Result<Value> {
        self.client
            .call("Security_Ssh_Key", "deleteObject")
            .id(key_id)
            .send()
            .await
    }

    /// 只送出有給的欄位；都沒給時不呼叫 API
    pub async fn edit_key(&self, key_id: i64, label: Option<&str>, notes: Option<&str>) -> Result<bool> {
        let mut data = Map::new();
        if let Some(label) = label {
            data.insert("label".to_string(), Value::from(label));
        }
        if let Some(notes) = notes {
            data.insert("notes".to_string(), Value::from(notes));
        }
        if data.is_empty() {
            return Ok(true);
        }

        let result = self
            .client
            .call("Security_Ssh_Key", "editObject")
            .id(key_id)
            .arg(Value::Object(data))
            .send()
            .await?;
        Ok(result.as_bool().unwrap_or(true))
    }

    pub async fn get_key(&self, key_id: i64) -> Result<Value> {
        self.client
            .call("Security_Ssh_Key", "getObject")
            .id(key_id)
            .send()
            .await
    }

    pub async fn list_keys(&self, label: Option<&str>) -> Result<Vec<Value>> {
        let mut filter = NestedFilter::new();
        if let Some(label) = label {
            filter.set(&["sshKeys", "label"], query_filter(label));
        }
        let keys = self
            .client
            .call("Account", "getSshKeys")
            .filter(filter.into_value())
            .send()
            .await?;
        Ok(super::as_list(keys))
    }
}

#[async_trait]
impl IdentifierMixin for SshKeyManager {
    type Resolver = SshKeyResolver;
    const RESOLVERS: &'static [SshKeyResolver] = &[SshKeyResolver::Label];

    async fn resolve_with(&self, resolver: SshKeyResolver, identifier: &str) -> Result<Vec<i64>> {
        match resolver {
            // 在本地比對 label，不依賴 API 的過濾
            SshKeyResolver::Label => Ok(self
                .list_keys(Some(identifier))
                .await?
                .iter()
                .filter(|key| lookup_str(key, &["label"]) == Some(identifier))
                .filter_map(|key| lookup_i64(key, &["id"]))
                .collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::testing::fixture_client;
    use serde_json::json;

    #[tokio::test]
    async fn test_add_key() {
        let (client, transport) = fixture_client();
        let key = SshKeyManager::new(client)
            .add_key("ssh-rsa AAAAB3Nz test@example", "label", Some("notes"))
            .await
            .unwrap();
        assert_eq!(key["id"], 1234);
        let call = transport.last_call("Security_Ssh_Key", "createObject").unwrap();
        assert_eq!(
            call.args[0],
            json!({"key": "ssh-rsa AAAAB3Nz test@example", "label": "label", "notes": "notes"})
        );
    }

    #[tokio::test]
    async fn test_edit_key_sends_only_given_fields() {
        let (client, transport) = fixture_client();
        let manager = SshKeyManager::new(client);

        assert!(manager.edit_key(1234, Some("new"), None).await.unwrap());
        let call = transport.last_call("Security_Ssh_Key", "editObject").unwrap();
        assert_eq!(call.args[0], json!({"label": "new"}));
        assert_eq!(call.identifier, Some(1234));

        assert!(manager.edit_key(1234, None, None).await.unwrap());
        assert_eq!(transport.calls_to("Security_Ssh_Key", "editObject").len(), 1);
    }

    #[tokio::test]
    async fn test_list_keys_label_filter() {
        let (client, transport) = fixture_client();
        let keys = SshKeyManager::new(client).list_keys(Some("Test 1")).await.unwrap();
        assert_eq!(keys.len(), 2);
        let call = transport.last_call("Account", "getSshKeys").unwrap();
        assert_eq!(call.filter.unwrap()["sshKeys"]["label"]["operation"], "_= Test 1");
    }

    #[tokio::test]
    async fn test_resolve_by_label() {
        let (client, _) = fixture_client();
        let manager = SshKeyManager::new(client);
        assert_eq!(manager.resolve_ids("Test 2").await.unwrap(), vec![101]);
        assert!(manager.resolve_ids("missing").await.unwrap().is_empty());
    }
}
