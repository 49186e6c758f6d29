use crate::app::environment::Environment;
use crate::app::formatting::Table;
use crate::managers::ssl::CertStatus;
use crate::managers::SslManager;
use crate::utils::error::{Result, SoftLayerError};
use crate::utils::filter::lookup_str;
use clap::{Args, Subcommand};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

/// 憑證內容皆以檔案路徑傳入
#[derive(Debug, Clone, Args)]
pub struct CertificateFiles {
    /// Certificate file
    #[arg(long)]
    pub crt: Option<PathBuf>,
    /// Certificate Signing Request file
    #[arg(long)]
    pub csr: Option<PathBuf>,
    /// Intermediate Certificate file
    #[arg(long)]
    pub icc: Option<PathBuf>,
    /// Private Key file
    #[arg(long)]
    pub key: Option<PathBuf>,
    /// Additional notes
    #[arg(long)]
    pub notes: Option<String>,
}

impl CertificateFiles {
    fn template(&self) -> Result<Map<String, Value>> {
        let mut template = Map::new();
        let files = [
            ("certificate", &self.crt),
            ("certificateSigningRequest", &self.csr),
            ("intermediateCertificate", &self.icc),
            ("privateKey", &self.key),
        ];
        for (field, path) in files {
            if let Some(path) = path {
                template.insert(field.to_string(), json!(std::fs::read_to_string(path)?));
            }
        }
        if let Some(notes) = &self.notes {
            template.insert("notes".to_string(), json!(notes));
        }
        Ok(template)
    }
}

#[derive(Debug, Subcommand)]
pub enum SslCommand {
    /// List SSL certificates
    List {
        /// Show certificates with this status
        #[arg(long, default_value = "all", value_parser = ["all", "valid", "expired"])]
        status: String,
        /// Column to sort by
        #[arg(long, value_parser = ["id", "common_name", "days_until_expire", "notes"])]
        sortby: Option<String>,
    },
    /// Add and upload SSL certificate details
    Add {
        #[command(flatten)]
        files: CertificateFiles,
    },
    /// Edit SSL certificate
    Edit {
        id: i64,
        #[command(flatten)]
        files: CertificateFiles,
    },
    /// Remove SSL certificate
    Remove { id: i64 },
    /// Download SSL certificate and key files
    Download {
        id: i64,
        /// Directory the files are written to
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

/// 只寫出有內容的欄位
fn write_cert_files(dir: &Path, cert: &Value) -> Result<Vec<PathBuf>> {
    let name = lookup_str(cert, &["commonName"]).unwrap_or("certificate");
    let parts = [
        ("certificate", "crt"),
        ("privateKey", "key"),
        ("intermediateCertificate", "icc"),
        ("certificateSigningRequest", "csr"),
    ];
    let mut written = Vec::new();
    for (field, extension) in parts {
        if let Some(content) = lookup_str(cert, &[field]).filter(|c| !c.is_empty()) {
            let path = dir.join(format!("{}.{}", name, extension));
            std::fs::write(&path, content)?;
            written.push(path);
        }
    }
    Ok(written)
}

pub async fn run(env: &mut Environment, cmd: SslCommand) -> Result<()> {
    let manager = SslManager::new(env.client.clone());
    match cmd {
        SslCommand::List { status, sortby } => {
            let certs = manager.list_certs(status.parse::<CertStatus>()?).await?;
            let mut table = Table::new(["id", "common_name", "days_until_expire", "notes"]);
            table.sortby = sortby;
            for cert in &certs {
                table.add_row(vec![
                    cert.get("id").into(),
                    cert.get("commonName").into(),
                    cert.get("validityDays").into(),
                    cert.get("notes").into(),
                ]);
            }
            env.fout(table)
        }
        SslCommand::Add { files } => {
            let template = files.template()?;
            if !template.contains_key("certificate") || !template.contains_key("privateKey") {
                return Err(SoftLayerError::argument("--crt and --key are required"));
            }
            manager.add_certificate(Value::Object(template)).await?;
            env.out("SSL certificate added")
        }
        SslCommand::Edit { id, files } => {
            let mut template = files.template()?;
            template.insert("id".to_string(), json!(id));
            manager.edit_certificate(Value::Object(template)).await?;
            env.out("SSL certificate edited")
        }
        SslCommand::Remove { id } => {
            env.require_confirmation(&id.to_string())?;
            manager.remove_certificate(id).await?;
            env.out(&format!("SSL certificate {} removed", id))
        }
        SslCommand::Download { id, dir } => {
            let cert = manager.get_certificate(id).await?;
            for path in write_cert_files(&dir, &cert)? {
                env.out(&format!("Wrote {}", path.display()))?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::demo_env;
    use crate::config::cli::OutputFormat;
    use tempfile::{tempdir, NamedTempFile};

    fn no_files() -> CertificateFiles {
        CertificateFiles {
            crt: None,
            csr: None,
            icc: None,
            key: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_list_valid() {
        let (mut env, buffer, transport) = demo_env(OutputFormat::Json, "");
        run(
            &mut env,
            SslCommand::List {
                status: "valid".to_string(),
                sortby: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(
            transport
                .calls_to("Account", "getValidSecurityCertificates")
                .len(),
            1
        );
        let out: Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(out[0]["common_name"], "valid.example.com");
        assert_eq!(out[0]["days_until_expire"], 180);
    }

    #[tokio::test]
    async fn test_add_reads_files() {
        let crt = NamedTempFile::new().unwrap();
        std::fs::write(crt.path(), "CERT").unwrap();
        let key = NamedTempFile::new().unwrap();
        std::fs::write(key.path(), "KEY").unwrap();

        let (mut env, buffer, transport) = demo_env(OutputFormat::Json, "");
        let mut files = no_files();
        files.crt = Some(crt.path().to_path_buf());
        files.key = Some(key.path().to_path_buf());
        files.notes = Some("web".to_string());
        run(&mut env, SslCommand::Add { files }).await.unwrap();

        let call = transport.last_call("Security_Certificate", "createObject").unwrap();
        assert_eq!(
            call.args[0],
            json!({"certificate": "CERT", "privateKey": "KEY", "notes": "web"})
        );
        assert!(buffer.contents().contains("SSL certificate added"));
    }

    #[tokio::test]
    async fn test_add_requires_key() {
        let (mut env, _, transport) = demo_env(OutputFormat::Json, "");
        let err = run(&mut env, SslCommand::Add { files: no_files() })
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(transport
            .calls_to("Security_Certificate", "createObject")
            .is_empty());
    }

    #[tokio::test]
    async fn test_edit_sends_id() {
        let (mut env, _, transport) = demo_env(OutputFormat::Json, "");
        let mut files = no_files();
        files.notes = Some("rotated".to_string());
        run(&mut env, SslCommand::Edit { id: 1234, files })
            .await
            .unwrap();
        let call = transport.last_call("Security_Certificate", "editObject").unwrap();
        assert_eq!(call.identifier, Some(1234));
        assert_eq!(call.args[0], json!({"notes": "rotated", "id": 1234}));
    }

    #[tokio::test]
    async fn test_remove_needs_confirmation() {
        let (mut env, _, transport) = demo_env(OutputFormat::Json, "no\n");
        let err = run(&mut env, SslCommand::Remove { id: 1234 })
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(transport
            .calls_to("Security_Certificate", "deleteObject")
            .is_empty());

        let (mut env, buffer, _) = demo_env(OutputFormat::Json, "1234\n");
        run(&mut env, SslCommand::Remove { id: 1234 }).await.unwrap();
        assert!(buffer.contents().contains("SSL certificate 1234 removed"));
    }

    #[tokio::test]
    async fn test_download_skips_empty_parts() {
        let dir = tempdir().unwrap();
        let (mut env, _, _) = demo_env(OutputFormat::Json, "");
        run(
            &mut env,
            SslCommand::Download {
                id: 1234,
                dir: dir.path().to_path_buf(),
            },
        )
        .await
        .unwrap();
        assert!(dir.path().join("cert.crt").exists());
        assert!(dir.path().join("cert.key").exists());
        assert!(!dir.path().join("cert.icc").exists());
    }
}
