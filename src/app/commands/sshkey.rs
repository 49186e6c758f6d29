use crate::app::environment::Environment;
use crate::app::formatting::Table;
use crate::app::helpers::resolve_id;
use crate::managers::SshKeyManager;
use crate::utils::error::{Result, SoftLayerError};
use crate::utils::filter::lookup_str;
use clap::Subcommand;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Subcommand)]
pub enum SshKeyCommand {
    /// List SSH keys
    List {
        /// Column to sort by
        #[arg(long, value_parser = ["id", "label", "fingerprint", "notes"])]
        sortby: Option<String>,
    },
    /// Add a new SSH key
    Add {
        label: String,
        /// The id_rsa.pub file to import for this key
        #[arg(short = 'f', long = "in-file", conflicts_with = "key")]
        in_file: Option<PathBuf>,
        /// The actual SSH key
        #[arg(short = 'k', long)]
        key: Option<String>,
        /// Extra note that will be associated with key
        #[arg(long)]
        note: Option<String>,
    },
    /// Permanently removes an SSH key
    Remove { identifier: String },
    /// Edits an SSH key
    Edit {
        identifier: String,
        /// The new label for the key
        #[arg(long)]
        label: Option<String>,
        /// New notes for the key
        #[arg(long)]
        note: Option<String>,
    },
    /// Prints out an SSH key to the screen
    Detail {
        identifier: String,
        /// The public SSH key will be written to this file
        #[arg(short = 'f', long = "file")]
        file: Option<PathBuf>,
    },
}

fn key_table(keys: &[Value], sortby: Option<String>) -> Table {
    let mut table = Table::new(["id", "label", "fingerprint", "notes"]);
    table.sortby = sortby;
    for key in keys {
        table.add_row(vec![
            key.get("id").into(),
            key.get("label").into(),
            key.get("fingerprint").into(),
            key.get("notes").into(),
        ]);
    }
    table
}

pub async fn run(env: &mut Environment, cmd: SshKeyCommand) -> Result<()> {
    let manager = SshKeyManager::new(env.client.clone());
    match cmd {
        SshKeyCommand::List { sortby } => {
            let keys = manager.list_keys(None).await?;
            env.fout(key_table(&keys, sortby))
        }
        SshKeyCommand::Add {
            label,
            in_file,
            key,
            note,
        } => {
            let key_text = match (in_file, key) {
                (Some(path), _) => std::fs::read_to_string(&path)?.trim().to_string(),
                (None, Some(key)) => key,
                (None, None) => {
                    return Err(SoftLayerError::argument(
                        "Either [-f | --in-file] or [-k | --key] arguments are required to add a key",
                    ))
                }
            };
            let created = manager.add_key(&key_text, &label, note.as_deref()).await?;
            env.out(&format!(
                "SSH key added: {}",
                lookup_str(&created, &["fingerprint"]).unwrap_or("-")
            ))
        }
        SshKeyCommand::Remove { identifier } => {
            let key_id = resolve_id(&manager, &identifier, "SshKey").await?;
            env.require_confirmation(&key_id.to_string())?;
            manager.delete_key(key_id).await?;
            Ok(())
        }
        SshKeyCommand::Edit {
            identifier,
            label,
            note,
        } => {
            let key_id = resolve_id(&manager, &identifier, "SshKey").await?;
            if !manager
                .edit_key(key_id, label.as_deref(), note.as_deref())
                .await?
            {
                return Err(SoftLayerError::abort("Failed to edit SSH key"));
            }
            Ok(())
        }
        SshKeyCommand::Detail { identifier, file } => {
            let key_id = resolve_id(&manager, &identifier, "SshKey").await?;
            let key = manager.get_key(key_id).await?;

            if let Some(path) = file {
                std::fs::write(&path, lookup_str(&key, &["key"]).unwrap_or_default())?;
            }

            let mut table = Table::new(["id", "label", "notes"]);
            table.add_row(vec![
                key.get("id").into(),
                key.get("label").into(),
                key.get("notes").into(),
            ]);
            env.fout(table)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::demo_env;
    use crate::config::cli::OutputFormat;
    use serde_json::json;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[tokio::test]
    async fn test_list_sorted() {
        let (mut env, buffer, _) = demo_env(OutputFormat::Raw, "");
        run(
            &mut env,
            SshKeyCommand::List {
                sortby: Some("label".to_string()),
            },
        )
        .await
        .unwrap();
        let out = buffer.contents();
        let first = out.find("Test 1").unwrap();
        let second = out.find("Test 2").unwrap();
        assert!(first < second);
    }

    #[tokio::test]
    async fn test_add_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ssh-rsa AAAAB3Nz test@example").unwrap();

        let (mut env, buffer, transport) = demo_env(OutputFormat::Raw, "");
        run(
            &mut env,
            SshKeyCommand::Add {
                label: "label".to_string(),
                in_file: Some(file.path().to_path_buf()),
                key: None,
                note: None,
            },
        )
        .await
        .unwrap();

        let call = transport.last_call("Security_Ssh_Key", "createObject").unwrap();
        assert_eq!(call.args[0]["key"], "ssh-rsa AAAAB3Nz test@example");
        assert_eq!(call.args[0]["notes"], Value::Null);
        assert_eq!(buffer.contents(), "SSH key added: aa:bb:cc:dd\n");
    }

    #[tokio::test]
    async fn test_add_requires_key() {
        let (mut env, _, _) = demo_env(OutputFormat::Raw, "");
        let err = run(
            &mut env,
            SshKeyCommand::Add {
                label: "label".to_string(),
                in_file: None,
                key: None,
                note: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_remove_by_label() {
        let (mut env, _, transport) = demo_env(OutputFormat::Raw, "");
        env.skip_confirmations = true;
        transport.set_response("Account", "getSshKeys", json!([{"id": 101, "label": "Test 2"}]));
        run(
            &mut env,
            SshKeyCommand::Remove {
                identifier: "Test 2".to_string(),
            },
        )
        .await
        .unwrap();
        let call = transport.last_call("Security_Ssh_Key", "deleteObject").unwrap();
        assert_eq!(call.identifier, Some(101));
    }

    #[tokio::test]
    async fn test_edit_and_detail() {
        let (mut env, buffer, transport) = demo_env(OutputFormat::Json, "");
        run(
            &mut env,
            SshKeyCommand::Edit {
                identifier: "1234".to_string(),
                label: Some("renamed".to_string()),
                note: None,
            },
        )
        .await
        .unwrap();
        let call = transport.last_call("Security_Ssh_Key", "editObject").unwrap();
        assert_eq!(call.args[0], json!({"label": "renamed"}));

        let dir = tempdir().unwrap();
        let path = dir.path().join("id_rsa.pub");
        run(
            &mut env,
            SshKeyCommand::Detail {
                identifier: "1234".to_string(),
                file: Some(path.clone()),
            },
        )
        .await
        .unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "ssh-rsa AAAAB3Nz test@example"
        );
        let out: Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(out[0]["label"], "label");
    }
}
