use crate::core::Client;
use crate::utils::error::{Result, SoftLayerError};
use crate::utils::filter::lookup_i64;
use serde_json::Value;

const CERT_MASK: &str = "mask[id, commonName, validityDays, notes]";

/// Which account certificates to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CertStatus {
    #[default]
    All,
    Expired,
    Valid,
}

impl CertStatus {
    fn account_method(self) -> &'static str {
        match self {
            CertStatus::All => "getSecurityCertificates",
            CertStatus::Expired => "getExpiredSecurityCertificates",
            CertStatus::Valid => "getValidSecurityCertificates",
        }
    }
}

impl std::str::FromStr for CertStatus {
    type Err = SoftLayerError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.to_lowercase().as_str() {
            "all" => Ok(CertStatus::All),
            "expired" => Ok(CertStatus::Expired),
            "valid" => Ok(CertStatus::Valid),
            other => Err(SoftLayerError::argument(format!(
                "status must be all, expired or valid, not {}",
                other
            ))),
        }
    }
}

/// SSL certificates stored on the account.
#[derive(Debug, Clone)]
pub struct SslManager {
    client: Client,
}

impl SslManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn list_certs(&self, status: CertStatus) -> Result<Vec<Value>> {
        let certs = self
            .client
            .call("Account", status.account_method())
            .mask(CERT_MASK)
            .send()
            .await?;
        Ok(super::as_list(certs))
    }

    /// `certificate` 至少要有 `certificate` 與 `privateKey`
    pub async fn add_certificate(&self, certificate: Value) -> Result<Value> {
        self.client
            .call("Security_Certificate", "createObject")
            .arg(certificate)
            .send()
            .await
    }

    pub async fn remove_certificate(&self, cert_id: i64) -> Result<Value> {
        self.client
            .call("Security_Certificate", "deleteObject")
            .id(cert_id)
            .send()
            .await
    }

    /// 以物件裡的 `id` 決定要更新哪一張憑證
    pub async fn edit_certificate(&self, certificate: Value) -> Result<Value> {
        let cert_id = lookup_i64(&certificate, &["id"])
            .ok_or_else(|| SoftLayerError::argument("Certificate id is required"))?;
        self.client
            .call("Security_Certificate", "editObject")
            .id(cert_id)
            .arg(certificate)
            .send()
            .await
    }

    pub async fn get_certificate(&self, cert_id: i64) -> Result<Value> {
        self.client
            .call("Security_Certificate", "getObject")
            .id(cert_id)
            .send()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::testing::fixture_client;
    use serde_json::json;

    #[tokio::test]
    async fn test_list_certs_by_status() {
        let (client, transport) = fixture_client();
        let manager = SslManager::new(client);

        let valid = manager.list_certs(CertStatus::Valid).await.unwrap();
        assert_eq!(valid[0]["commonName"], "valid.example.com");
        let call = transport
            .last_call("Account", "getValidSecurityCertificates")
            .unwrap();
        assert_eq!(call.mask.unwrap(), CERT_MASK);

        manager.list_certs(CertStatus::default()).await.unwrap();
        assert_eq!(transport.calls_to("Account", "getSecurityCertificates").len(), 1);
        assert_eq!("EXPIRED".parse::<CertStatus>().unwrap(), CertStatus::Expired);
    }

    #[tokio::test]
    async fn test_edit_certificate_uses_id() {
        let (client, transport) = fixture_client();
        let manager = SslManager::new(client);
        manager
            .edit_certificate(json!({"id": 1234, "notes": "renewed"}))
            .await
            .unwrap();
        let call = transport.last_call("Security_Certificate", "editObject").unwrap();
        assert_eq!(call.identifier, Some(1234));
        assert_eq!(call.args[0]["notes"], "renewed");

        let err = manager.edit_certificate(json!({"notes": "x"})).await.unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_add_and_remove() {
        let (client, transport) = fixture_client();
        let manager = SslManager::new(client);
        let cert = manager
            .add_certificate(json!({"certificate": "-----BEGIN CERT-----", "privateKey": "key"}))
            .await
            .unwrap();
        assert_eq!(cert["id"], 1234);

        manager.remove_certificate(1234).await.unwrap();
        assert_eq!(
            transport
                .last_call("Security_Certificate", "deleteObject")
                .unwrap()
                .identifier,
            Some(1234)
        );
    }
}
