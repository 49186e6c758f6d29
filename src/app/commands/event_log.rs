use crate::app::environment::Environment;
use crate::app::formatting::Table;
use crate::managers::event_log::{parse_metadata, EventLogQuery, DEFAULT_UTC_OFFSET};
use crate::managers::EventLogManager;
use crate::utils::error::Result;
use crate::utils::filter::lookup_str;
use clap::Subcommand;
use serde_json::Value;

#[derive(Debug, Subcommand)]
pub enum EventLogCommand {
    /// Get event logs
    Get {
        /// The earliest date we want to search for event logs (MM/DD/YYYY)
        #[arg(short = 'd', long = "date-min")]
        date_min: Option<String>,
        /// The latest date we want to search for event logs (MM/DD/YYYY)
        #[arg(short = 'D', long = "date-max")]
        date_max: Option<String>,
        /// The event we want to get event logs for
        #[arg(short = 'e', long = "obj-event")]
        obj_event: Option<String>,
        /// The id of the object we want to get event logs for
        #[arg(short = 'i', long = "obj-id")]
        obj_id: Option<i64>,
        /// The type of the object we want to get event logs for
        #[arg(short = 't', long = "obj-type")]
        obj_type: Option<String>,
        /// UTC Offset for searching with dates. +/-HHMM format
        #[arg(short = 'z', long = "utc-offset", default_value = DEFAULT_UTC_OFFSET, allow_hyphen_values = true)]
        utc_offset: String,
        /// Display metadata if present
        #[arg(long)]
        metadata: bool,
        /// How many results to get in one api call
        #[arg(short = 'l', long, default_value_t = 50)]
        limit: u32,
        /// Only show events whose metadata carries this request id
        #[arg(long = "request-id", conflicts_with_all = ["date_min", "date_max", "obj_event", "obj_id", "obj_type"])]
        request_id: Option<String>,
    },
    /// Get event log types
    Types,
}

/// 依 key 排序並縮排
fn metadata_cell(log: &Value) -> String {
    parse_metadata(log)
        .and_then(|meta| serde_json::to_string_pretty(&meta).ok())
        .unwrap_or_default()
}

fn event_table(logs: &[Value], metadata: bool) -> Table {
    let mut columns = vec!["Event", "Object", "Type", "Date", "Username"];
    if metadata {
        columns.push("Metadata");
    }
    let mut table = Table::new(columns);
    for log in logs {
        let username = lookup_str(log, &["username"])
            .or_else(|| lookup_str(log, &["userType"]))
            .unwrap_or_default();
        let mut row = vec![
            log.get("eventName").into(),
            log.get("label").into(),
            log.get("objectName").into(),
            log.get("eventCreateDate").into(),
            username.into(),
        ];
        if metadata {
            row.push(metadata_cell(log).into());
        }
        table.add_row(row);
    }
    table
}

pub async fn run(env: &mut Environment, cmd: EventLogCommand) -> Result<()> {
    let manager = EventLogManager::new(env.client.clone());
    match cmd {
        EventLogCommand::Get {
            date_min,
            date_max,
            obj_event,
            obj_id,
            obj_type,
            utc_offset,
            metadata,
            limit,
            request_id,
        } => {
            let logs = match request_id {
                Some(request_id) => manager.get_event_logs_by_request_id(&request_id).await?,
                None => {
                    let query = EventLogQuery {
                        date_min,
                        date_max,
                        event_name: obj_event,
                        object_id: obj_id,
                        object_type: obj_type,
                        utc_offset,
                    };
                    manager
                        .get_event_logs(query.build_filter()?, Some(limit))
                        .await?
                }
            };
            env.fout(event_table(&logs, metadata))
        }
        EventLogCommand::Types => {
            let types = manager.get_event_log_types().await?;
            let mut table = Table::new(["types"]);
            for event_type in &types {
                table.add_row(vec![event_type.get("value").into()]);
            }
            env.fout(table)
        }
    }
}
