use crate::app::environment::Environment;
use crate::app::formatting::{active_txn, blank, listing, Cell, FormattedItem, Table};
use crate::app::helpers::{clean_time, resolve_id};
use crate::managers::ImageManager;
use crate::utils::error::{Result, SoftLayerError};
use crate::utils::filter::{lookup, lookup_str};
use clap::Subcommand;
use serde_json::Value;

const PRIVATE: &str = "private";
const PUBLIC: &str = "public";

#[derive(Debug, Subcommand)]
pub enum ImageCommand {
    /// List images
    List {
        /// Display only public images
        #[arg(long, conflicts_with = "private")]
        public: bool,
        /// Display only private images
        #[arg(long)]
        private: bool,
        /// Filter on image name
        #[arg(long)]
        name: Option<String>,
        /// Filter on image guid
        #[arg(long)]
        guid: Option<String>,
    },
    /// Get details for an image
    Detail { identifier: String },
    /// Delete an image
    Delete { identifier: String },
    /// Edit an image's name, note or tag
    Edit {
        identifier: String,
        /// Name of the image
        #[arg(long)]
        name: Option<String>,
        /// Additional note for the image
        #[arg(long)]
        note: Option<String>,
        /// Tags for the image
        #[arg(long)]
        tag: Option<String>,
    },
}

fn visibility(image: &Value) -> &'static str {
    match image.get("publicFlag") {
        Some(Value::Bool(true)) => PUBLIC,
        Some(Value::Number(n)) if n.as_i64() == Some(1) => PUBLIC,
        _ => PRIVATE,
    }
}

fn image_type(image: &Value) -> Cell {
    match (lookup(image, &["imageType", "keyName"]), lookup_str(image, &["imageType", "name"])) {
        (Some(key), Some(name)) => Cell::from(FormattedItem::new(key.clone(), name)),
        _ => Cell::from(blank()),
    }
}

fn image_row(image: &Value, visibility: &str) -> Vec<Cell> {
    vec![
        image.get("id").into(),
        image.get("globalIdentifier").into(),
        image.get("name").into(),
        image_type(image),
        visibility.into(),
        image.get("accountId").into(),
    ]
}

fn detail_table(image: &Value) -> Table {
    let mut table = Table::key_value();
    table.add_row(vec!["id".into(), image.get("id").into()]);
    table.add_row(vec![
        "global_identifier".into(),
        image.get("globalIdentifier").into(),
    ]);
    table.add_row(vec!["name".into(), image.get("name").into()]);
    table.add_row(vec![
        "status".into(),
        match (
            lookup(image, &["status", "keyName"]),
            lookup_str(image, &["status", "name"]),
        ) {
            (Some(key), Some(name)) => Cell::from(FormattedItem::new(key.clone(), name)),
            _ => Cell::from(blank()),
        },
    ]);
    table.add_row(vec!["active_transaction".into(), active_txn(image).into()]);
    table.add_row(vec!["account".into(), image.get("accountId").into()]);
    table.add_row(vec!["visibility".into(), visibility(image).into()]);
    table.add_row(vec!["type".into(), image_type(image)]);
    table.add_row(vec!["note".into(), image.get("note").into()]);
    table.add_row(vec![
        "created".into(),
        clean_time(image.get("createDate"), "%Y-%m-%d %H:%M").into(),
    ]);

    let datacenters: Vec<String> = image
        .get("datacenters")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|datacenter| lookup_str(datacenter, &["name"]))
        .map(str::to_string)
        .collect();
    table.add_row(vec!["datacenters".into(), listing(datacenters, ",").into()]);
    table
}

pub async fn run(env: &mut Environment, cmd: ImageCommand) -> Result<()> {
    let manager = ImageManager::new(env.client.clone());
    match cmd {
        ImageCommand::List {
            public,
            private,
            name,
            guid,
        } => {
            let mut table = Table::new(["id", "guid", "name", "type", "visibility", "account"]);
            table.sortby = Some("name".to_string());
            if !public {
                let images = manager
                    .list_private_images(guid.as_deref(), name.as_deref(), None)
                    .await?;
                for image in &images {
                    table.add_row(image_row(image, PRIVATE));
                }
            }
            if !private {
                let images = manager
                    .list_public_images(guid.as_deref(), name.as_deref(), None)
                    .await?;
                for image in &images {
                    table.add_row(image_row(image, PUBLIC));
                }
            }
            env.fout(table)
        }
        ImageCommand::Detail { identifier } => {
            let image_id = resolve_id(&manager, &identifier, "image").await?;
            let image = manager
                .get_image(
                    image_id,
                    Some("id,accountId,name,globalIdentifier,note,createDate,publicFlag,\
                        status,imageType,activeTransaction,datacenters"),
                )
                .await?;
            env.fout(detail_table(&image))
        }
        ImageCommand::Delete { identifier } => {
            let image_id = resolve_id(&manager, &identifier, "image").await?;
            env.require_confirmation(&image_id.to_string())?;
            manager.delete_image(image_id).await?;
            Ok(())
        }
        ImageCommand::Edit {
            identifier,
            name,
            note,
            tag,
        } => {
            if name.is_none() && note.is_none() && tag.is_none() {
                return Err(SoftLayerError::argument("At least one option is required"));
            }
            let image_id = resolve_id(&manager, &identifier, "image").await?;
            if !manager
                .edit(image_id, name.as_deref(), note.as_deref(), tag.as_deref())
                .await?
            {
                return Err(SoftLayerError::abort("Failed to Edit Image"));
            }
            Ok(())
        }
    }
}
