use crate::core::Client;
use crate::utils::error::Result;
use crate::utils::filter::{lookup_i64, lookup_str, query_filter, NestedFilter};
use crate::utils::resolver::IdentifierMixin;
use async_trait::async_trait;
use serde_json::Value;

const LIST_MASK: &str =
    "mask[id, username, displayName, userStatus[name], hardwareCount, virtualGuestCount]";

const DETAIL_MASK: &str = "mask[userStatus[name], parent[id, username]]";

#[derive(Debug, Clone, Copy)]
pub enum UserResolver {
    Username,
}

/// Portal users on the account.
#[derive(Debug, Clone)]
pub struct UserManager {
    client: Client,
}

impl UserManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn list_users(&self, mask: Option<&str>, filter: Option<Value>) -> Result<Vec<Value>> {
        let users = self
            .client
            .call("Account", "getUsers")
            .mask(mask.unwrap_or(LIST_MASK))
            .filter(filter.unwrap_or(Value::Null))
            .send_all()
            .await?;
        Ok(users)
    }

    pub async fn get_user(&self, user_id: i64, mask: Option<&str>) -> Result<Value> {
        self.client
            .call("User_Customer", "getObject")
            .id(user_id)
            .mask(mask.unwrap_or(DETAIL_MASK))
            .send()
            .await
    }

    pub async fn get_current_user(&self) -> Result<Value> {
        self.client
            .call("Account", "getCurrentUser")
            .mask(DETAIL_MASK)
            .send()
            .await
    }
}

#[async_trait]
impl IdentifierMixin for UserManager {
    type Resolver = UserResolver;
    const RESOLVERS: &'static [UserResolver] = &[UserResolver::Username];

    async fn resolve_with(&self, resolver: UserResolver, identifier: &str) -> Result<Vec<i64>> {
        match resolver {
            UserResolver::Username => {
                let mut filter = NestedFilter::new();
                filter.set(&["users", "username"], query_filter(identifier));
                Ok(self
                    .list_users(Some("mask[id,username]"), Some(filter.into_value()))
                    .await?
                    .iter()
                    .filter(|user| lookup_str(user, &["username"]) == Some(identifier))
                    .filter_map(|user| lookup_i64(user, &["id"]))
                    .collect())
            }
        }
    }
}
