use crate::app::environment::Environment;
use crate::app::formatting::{blank, Cell, Table};
use crate::managers::TagManager;
use crate::utils::error::{Result, SoftLayerError};
use crate::utils::filter::{lookup, lookup_i64, lookup_str};
use clap::Subcommand;
use serde_json::Value;

#[derive(Debug, Subcommand)]
pub enum TagsCommand {
    /// List all tags currently on your account
    List {
        /// Show the resources each tag is attached to
        #[arg(short = 'd', long)]
        detail: bool,
    },
    /// Get details for a tag
    Details {
        identifier: String,
        /// Treat the identifier as a tag name
        #[arg(long)]
        name: bool,
    },
    /// Set tags on a resource, replacing any existing ones
    Set {
        /// Comma separated list of tags, enclosed in quotes
        #[arg(short = 't', long)]
        tags: String,
        /// Key name of a tag type, see `slcli tags taggable`
        #[arg(short = 'k', long)]
        key_name: String,
        /// ID of the object being tagged
        #[arg(short = 'r', long)]
        resource_id: i64,
    },
    /// Delete a tag; only tags without references can be removed
    Delete {
        identifier: String,
        /// Treat the identifier as a tag name
        #[arg(long)]
        name: bool,
    },
    /// List everything that could be tagged
    Taggable,
}

/// 參照對象的顯示名稱；查不到時為空白
async fn reference_name(manager: &TagManager, reference: &Value) -> Cell {
    let (Some(resource_id), Some(tag_type)) = (
        lookup_i64(reference, &["resourceTableId"]),
        lookup_str(reference, &["tagType", "keyName"]),
    ) else {
        return blank().into();
    };

    match manager.reference_lookup(resource_id, tag_type).await {
        Ok(resource) => ["fullyQualifiedDomainName", "name", "vlanNumber"]
            .iter()
            .find_map(|key| resource.get(*key).filter(|v| !v.is_null()))
            .into(),
        Err(e) => {
            tracing::debug!("reference {} {} not found: {}", tag_type, resource_id, e);
            blank().into()
        }
    }
}

async fn references_table(manager: &TagManager, tag_id: i64) -> Result<Table> {
    let references = manager.get_tag_references(tag_id, None).await?;
    let mut table = Table::new(["id", "type", "resource_id", "resource"]);
    for reference in &references {
        table.add_row(vec![
            reference.get("id").into(),
            lookup(reference, &["tagType", "keyName"]).into(),
            reference.get("resourceTableId").into(),
            reference_name(manager, reference).await,
        ]);
    }
    Ok(table)
}

async fn tag_table(
    manager: &TagManager,
    title: &str,
    tags: &[Value],
    detail: bool,
) -> Result<Table> {
    let mut columns = vec!["id", "name", "count"];
    if detail {
        columns.push("references");
    }
    let mut table = Table::new(columns).with_title(title);
    for tag in tags {
        let mut row: Vec<Cell> = vec![
            tag.get("id").into(),
            tag.get("name").into(),
            tag.get("referenceCount").into(),
        ];
        if detail {
            row.push(match lookup_i64(tag, &["id"]) {
                Some(tag_id) => references_table(manager, tag_id).await?.into(),
                None => blank().into(),
            });
        }
        table.add_row(row);
    }
    Ok(table)
}

/// 以 id 或名稱取得標籤
async fn find_tags(manager: &TagManager, identifier: &str, by_name: bool) -> Result<Vec<Value>> {
    match identifier.parse::<i64>() {
        Ok(tag_id) if !by_name => Ok(vec![manager.get_tag(tag_id, None).await?]),
        _ => manager.get_tag_by_name(identifier, None).await,
    }
}

pub async fn run(env: &mut Environment, cmd: TagsCommand) -> Result<()> {
    let manager = TagManager::new(env.client.clone());
    match cmd {
        TagsCommand::List { detail } => {
            let tags = manager.list_tags(None).await?;
            let tables = vec![
                tag_table(&manager, "Attached", &tags.attached, detail).await?,
                tag_table(&manager, "Unattached", &tags.unattached, detail).await?,
            ];
            env.fout(tables)
        }
        TagsCommand::Details { identifier, name } => {
            let tags = find_tags(&manager, &identifier, name).await?;
            if tags.is_empty() {
                return Err(SoftLayerError::abort(format!(
                    "Unable to find tag: {}",
                    identifier
                )));
            }
            let mut tables = Vec::with_capacity(tags.len());
            for tag in &tags {
                let Some(tag_id) = lookup_i64(tag, &["id"]) else {
                    continue;
                };
                let title = lookup_str(tag, &["name"]).unwrap_or("-").to_string();
                tables.push(references_table(&manager, tag_id).await?.with_title(title));
            }
            env.fout(tables)
        }
        TagsCommand::Set {
            tags,
            key_name,
            resource_id,
        } => {
            let result = manager.set_tags(&tags, &key_name, resource_id).await?;
            env.fout(result)
        }
        TagsCommand::Delete { identifier, name } => {
            let tag_name = match identifier.parse::<i64>() {
                Ok(tag_id) if !name => {
                    let tag = manager.get_tag(tag_id, Some("mask[id,name]")).await?;
                    lookup_str(&tag, &["name"])
                        .map(str::to_string)
                        .ok_or_else(|| SoftLayerError::not_found(format!("tag {}", tag_id)))?
                }
                _ => identifier,
            };
            let result = manager.delete_tag(&tag_name).await?;
            env.fout(result)
        }
        TagsCommand::Taggable => {
            let mut tables = Vec::new();
            for tag_type in manager.get_all_tag_types().await? {
                let Some(key_name) = lookup_str(&tag_type, &["keyName"]) else {
                    continue;
                };
                let resources = manager.taggable_by_type(key_name).await?;
                if resources.is_empty() {
                    continue;
                }
                let title = lookup_str(&tag_type, &["description"]).unwrap_or(key_name);
                let mut table = Table::new(["id", "name"]).with_title(title);
                for resource in &resources {
                    let name = ["fullyQualifiedDomainName", "name", "vlanNumber"]
                        .iter()
                        .find_map(|key| resource.get(*key).filter(|v| !v.is_null()));
                    table.add_row(vec![resource.get("id").into(), name.into()]);
                }
                tables.push(table);
            }
            env.fout(tables)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::demo_env;
    use crate::config::cli::OutputFormat;
    use serde_json::json;

    #[tokio::test]
    async fn test_list() {
        let (mut env, buffer, _) = demo_env(OutputFormat::Json, "");
        run(&mut env, TagsCommand::List { detail: false }).await.unwrap();

        let out: Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(
            out,
            json!([
                [{"id": 1286571, "name": "bs_test_instance", "count": 5}],
                [{"id": 287895, "name": "coreos", "count": 0}]
            ])
        );
    }

    #[tokio::test]
    async fn test_list_detail_resolves_references() {
        let (mut env, buffer, transport) = demo_env(OutputFormat::Json, "");
        run(&mut env, TagsCommand::List { detail: true }).await.unwrap();

        let lookup = transport.last_call("Virtual_Guest", "getObject").unwrap();
        assert_eq!(lookup.identifier, Some(33488921));
        let out: Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(
            out[0][0]["references"][0]["resource"],
            "vs-test1.test.sftlyr.ws"
        );
    }

    #[tokio::test]
    async fn test_details_by_name() {
        let (mut env, buffer, transport) = demo_env(OutputFormat::Table, "");
        run(
            &mut env,
            TagsCommand::Details {
                identifier: "bs_test_instance".to_string(),
                name: false,
            },
        )
        .await
        .unwrap();

        assert_eq!(transport.calls_to("Tag", "getTagByTagName").len(), 1);
        let out = buffer.contents();
        assert!(out.contains("bs_test_instance"));
        assert!(out.contains("GUEST"));
    }

    #[tokio::test]
    async fn test_details_by_id() {
        let (mut env, _, transport) = demo_env(OutputFormat::Json, "");
        run(
            &mut env,
            TagsCommand::Details {
                identifier: "1286571".to_string(),
                name: false,
            },
        )
        .await
        .unwrap();
        let call = transport.last_call("Tag", "getObject").unwrap();
        assert_eq!(call.identifier, Some(1286571));
        assert!(transport.calls_to("Tag", "getTagByTagName").is_empty());
    }

    #[tokio::test]
    async fn test_set_and_delete() {
        let (mut env, buffer, transport) = demo_env(OutputFormat::Jsonraw, "");
        run(
            &mut env,
            TagsCommand::Set {
                tags: "tag1,tag2".to_string(),
                key_name: "GUEST".to_string(),
                resource_id: 100,
            },
        )
        .await
        .unwrap();
        let call = transport.last_call("Tag", "setTags").unwrap();
        assert_eq!(call.args, vec![json!("tag1,tag2"), json!("GUEST"), json!(100)]);

        run(
            &mut env,
            TagsCommand::Delete {
                identifier: "1286571".to_string(),
                name: false,
            },
        )
        .await
        .unwrap();
        let call = transport.last_call("Tag", "deleteTag").unwrap();
        assert_eq!(call.args, vec![json!("bs_test_instance")]);
        assert_eq!(buffer.contents(), "true\ntrue\n");
    }

    #[tokio::test]
    async fn test_taggable() {
        let (mut env, buffer, _) = demo_env(OutputFormat::Json, "");
        run(&mut env, TagsCommand::Taggable).await.unwrap();

        let out: Value = serde_json::from_str(&buffer.contents()).unwrap();
        let tables = out.as_array().unwrap();
        assert_eq!(tables.len(), 4);
        assert_eq!(tables[0][0]["name"], "hardware-test1.test.sftlyr.ws");
        assert_eq!(tables[2][0]["name"], "vlan-public");
    }
}
