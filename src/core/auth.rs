use crate::domain::model::Request;
use crate::domain::ports::Authentication;
use serde_json::json;
use std::fmt;

/// Username + API key sent inside the API headers.
#[derive(Clone)]
pub struct BasicAuthentication {
    pub username: String,
    pub api_key: String,
}

impl BasicAuthentication {
    pub fn new(username: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            api_key: api_key.into(),
        }
    }
}

impl Authentication for BasicAuthentication {
    fn apply(&self, request: &mut Request) {
        request.headers.insert(
            "authenticate".to_string(),
            json!({ "username": self.username, "apiKey": self.api_key }),
        );
    }

    fn api_key_credentials(&self) -> Option<(&str, &str)> {
        Some((&self.username, &self.api_key))
    }
}

impl fmt::Debug for BasicAuthentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BasicAuthentication({})", self.username)
    }
}

/// Portal login token obtained from `User_Customer::getPortalLoginToken`.
#[derive(Clone)]
pub struct TokenAuthentication {
    pub user_id: i64,
    pub auth_token: String,
}

impl TokenAuthentication {
    pub fn new(user_id: i64, auth_token: impl Into<String>) -> Self {
        Self {
            user_id,
            auth_token: auth_token.into(),
        }
    }
}

impl Authentication for TokenAuthentication {
    fn apply(&self, request: &mut Request) {
        request.headers.insert(
            "authenticate".to_string(),
            json!({
                "complexType": "PortalLoginToken",
                "userId": self.user_id,
                "authToken": self.auth_token,
            }),
        );
    }
}

impl fmt::Debug for TokenAuthentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenAuthentication({})", self.user_id)
    }
}

/// HTTP basic auth on the transport, used by the REST endpoint.
#[derive(Clone)]
pub struct BasicHttpAuthentication {
    pub username: String,
    pub api_key: String,
}

impl BasicHttpAuthentication {
    pub fn new(username: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            api_key: api_key.into(),
        }
    }
}

impl Authentication for BasicHttpAuthentication {
    fn apply(&self, request: &mut Request) {
        request.transport_user = Some(self.username.clone());
        request.transport_password = Some(self.api_key.clone());
    }

    fn api_key_credentials(&self) -> Option<(&str, &str)> {
        Some((&self.username, &self.api_key))
    }
}

impl fmt::Debug for BasicHttpAuthentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BasicHttpAuthentication({})", self.username)
    }
}

/// IAM bearer token.
#[derive(Clone)]
pub struct BearerAuthentication {
    pub username: String,
    pub token: String,
}

impl BearerAuthentication {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
        }
    }
}

impl Authentication for BearerAuthentication {
    fn apply(&self, request: &mut Request) {
        request.transport_headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.token),
        );
        request.headers.insert(
            "authenticate".to_string(),
            json!({ "username": self.username }),
        );
    }
}

impl fmt::Debug for BearerAuthentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BearerAuthentication({})", self.username)
    }
}
