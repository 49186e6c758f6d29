use crate::app::environment::Environment;
use crate::app::formatting::{Align, Table};
use crate::app::helpers::{clean_time, resolve_id};
use crate::managers::dns::{parse_zone_details, RecordFilter, SrvRecord};
use crate::managers::DnsManager;
use crate::utils::error::{Result, SoftLayerError};
use crate::utils::filter::lookup_i64;
use crate::utils::validation::{validate_range, validate_record_type};
use clap::Subcommand;
use serde_json::{json, Value};
use std::path::PathBuf;

const DEFAULT_TTL: u32 = 7200;

#[derive(Debug, Subcommand)]
pub enum DnsCommand {
    /// List all zones
    ZoneList,
    /// Create a zone
    ZoneCreate { zone: String },
    /// Delete zone
    ZoneDelete { zone: String },
    /// Print zone in BIND format
    ZonePrint { zone: String },
    /// List all records in a zone
    RecordList {
        zone: String,
        /// Record data, such as an IP address
        #[arg(long)]
        data: Option<String>,
        /// Host record, such as www
        #[arg(long)]
        record: Option<String>,
        /// TTL value in seconds, such as 86400
        #[arg(long)]
        ttl: Option<u32>,
        /// Record type, such as A or CNAME
        #[arg(long = "type", value_name = "TYPE")]
        record_type: Option<String>,
    },
    /// Add resource record
    RecordAdd {
        /// Host record, such as www
        record: String,
        /// A, AAAA, CNAME, MX, NS, PTR, SPF, SRV or TXT
        #[arg(value_name = "TYPE")]
        record_type: String,
        /// Record data, such as an IP address
        data: String,
        /// Zone name or identifier; not needed for PTR records
        #[arg(long)]
        zone: Option<String>,
        #[arg(long, default_value_t = DEFAULT_TTL)]
        ttl: u32,
        /// MX / SRV priority
        #[arg(long)]
        priority: Option<u32>,
        /// SRV protocol, such as tcp
        #[arg(long)]
        protocol: Option<String>,
        /// SRV port
        #[arg(long)]
        port: Option<u16>,
        /// SRV service, such as _sip
        #[arg(long)]
        service: Option<String>,
        /// SRV weight
        #[arg(long)]
        weight: Option<u32>,
    },
    /// Update DNS record
    RecordEdit {
        zone: String,
        /// Edit by host record, such as www
        #[arg(long)]
        by_record: Option<String>,
        /// Edit a single record by its ID
        #[arg(long)]
        by_id: Option<i64>,
        /// Record data, such as an IP address
        #[arg(long)]
        data: Option<String>,
        /// TTL value in seconds
        #[arg(long)]
        ttl: Option<u32>,
    },
    /// Remove resource record
    RecordRemove { record_id: i64 },
    /// Import zone based off a BIND zone file
    Import {
        zonefile: PathBuf,
        /// Don't actually create records
        #[arg(long)]
        dry_run: bool,
    },
}

fn zone_table(zones: &[Value]) -> Table {
    let mut table = Table::new(["id", "zone", "serial", "updated"]);
    table.set_align("zone", Align::Left);
    for zone in zones {
        table.add_row(vec![
            zone.get("id").into(),
            zone.get("name").into(),
            zone.get("serial").into(),
            clean_time(zone.get("updateDate"), "%Y-%m-%d %H:%M").into(),
        ]);
    }
    table
}

fn record_table(records: &[Value]) -> Table {
    let mut table = Table::new(["id", "record", "type", "ttl", "data"]);
    table.set_align("record", Align::Right);
    table.set_align("data", Align::Left);
    for record in records {
        table.add_row(vec![
            record.get("id").into(),
            record.get("host").into(),
            record
                .get("type")
                .and_then(Value::as_str)
                .map(str::to_uppercase)
                .into(),
            record.get("ttl").into(),
            record.get("data").into(),
        ]);
    }
    table
}

async fn create_record(
    manager: &DnsManager,
    zone_id: Option<i64>,
    record: &str,
    record_type: &str,
    data: &str,
    ttl: u32,
    priority: Option<u32>,
    srv: Option<SrvRecord>,
) -> Result<Value> {
    if record_type == "PTR" {
        return manager.create_record_ptr(record, data, ttl).await;
    }
    let zone_id = zone_id.ok_or_else(|| {
        SoftLayerError::argument(format!("--zone is required for {} records", record_type))
    })?;
    match record_type {
        "MX" => manager.create_record_mx(zone_id, record, data, ttl, priority).await,
        "SRV" => {
            let srv = srv.unwrap_or_default();
            manager.create_record_srv(zone_id, record, data, ttl, &srv).await
        }
        _ => manager.create_record(zone_id, record, record_type, data, ttl).await,
    }
}

async fn import_zone(env: &mut Environment, manager: &DnsManager, zonefile: PathBuf, dry_run: bool) -> Result<()> {
    let contents = std::fs::read_to_string(&zonefile)?;
    let details = parse_zone_details(&contents)?;

    env.out(&format!("Parsed: zone={}", details.zone))?;
    for record in &details.records {
        env.out(&format!("Parsed: {}", record))?;
    }
    for line in &details.bad_lines {
        env.out(&format!("Unparsed: {}", line))?;
    }

    if dry_run {
        return Ok(());
    }

    // 找不到 zone 時直接建立
    let zone_id = match resolve_id(manager, &details.zone, "zone").await {
        Ok(zone_id) => zone_id,
        Err(SoftLayerError::CliAbort { .. }) => {
            let created = manager.create_zone(&details.zone, None).await?;
            env.out(&format!("Created: {}", details.zone))?;
            lookup_i64(&created, &["id"]).ok_or_else(|| {
                SoftLayerError::abort(format!("Zone {} was created without an id", details.zone))
            })?
        }
        Err(e) => return Err(e),
    };

    for record in &details.records {
        let result = manager
            .create_record(
                zone_id,
                &record.record,
                &record.record_type,
                &record.data,
                record.ttl.unwrap_or(DEFAULT_TTL),
            )
            .await;
        match result {
            Ok(_) => env.out(&format!("Created: {}", record))?,
            Err(e @ SoftLayerError::ApiError { .. }) => {
                tracing::warn!("failed to create record {}: {}", record, e);
                env.out(&format!("Failed: {}", record))?;
                env.out(&e.to_string())?;
            }
            Err(e) => return Err(e),
        }
    }

    env.out("Finished")
}

pub async fn run(env: &mut Environment, cmd: DnsCommand) -> Result<()> {
    let manager = DnsManager::new(env.client.clone());
    match cmd {
        DnsCommand::ZoneList => {
            let zones = manager.list_zones(None).await?;
            env.fout(zone_table(&zones))
        }
        DnsCommand::ZoneCreate { zone } => {
            manager.create_zone(&zone, None).await?;
            env.out(&format!("Created zone: {}", zone))
        }
        DnsCommand::ZoneDelete { zone } => {
            let zone_id = resolve_id(&manager, &zone, "zone").await?;
            env.require_confirmation(&zone)?;
            manager.delete_zone(zone_id).await?;
            env.out(&format!("Deleted zone: {}", zone))
        }
        DnsCommand::ZonePrint { zone } => {
            let zone_id = resolve_id(&manager, &zone, "zone").await?;
            let contents = manager.dump_zone(zone_id).await?;
            env.out(&contents)
        }
        DnsCommand::RecordList {
            zone,
            data,
            record,
            ttl,
            record_type,
        } => {
            let zone_id = resolve_id(&manager, &zone, "zone").await?;
            let filters = RecordFilter {
                ttl,
                host: record,
                data,
                record_type,
            };
            let records = manager.get_records(zone_id, &filters).await?;
            env.fout(record_table(&records))
        }
        DnsCommand::RecordAdd {
            record,
            record_type,
            data,
            zone,
            ttl,
            priority,
            protocol,
            port,
            service,
            weight,
        } => {
            let record_type = record_type.to_uppercase();
            validate_record_type(&record_type)?;
            validate_range("ttl", ttl, 1, 2_147_483_647)?;

            let zone_id = match &zone {
                Some(zone) => Some(resolve_id(&manager, zone, "zone").await?),
                None => None,
            };
            let srv = (record_type == "SRV").then(|| {
                let defaults = SrvRecord::default();
                SrvRecord {
                    service: service.unwrap_or_default(),
                    protocol: protocol.unwrap_or_default(),
                    port: port.unwrap_or(defaults.port),
                    priority: priority.unwrap_or(defaults.priority),
                    weight: weight.unwrap_or(defaults.weight),
                }
            });
            let created = create_record(
                &manager,
                zone_id,
                &record,
                &record_type,
                &data,
                ttl,
                priority,
                srv,
            )
            .await?;
            env.fout(record_table(&[created]))
        }
        DnsCommand::RecordEdit {
            zone,
            by_record,
            by_id,
            data,
            ttl,
        } => {
            let zone_id = resolve_id(&manager, &zone, "zone").await?;
            let filters = RecordFilter {
                host: by_record,
                ..Default::default()
            };
            let records = manager.get_records(zone_id, &filters).await?;
            let mut edited = 0;
            for mut record in records {
                if by_id.is_some() && lookup_i64(&record, &["id"]) != by_id {
                    continue;
                }
                if let Some(data) = &data {
                    record["data"] = json!(data);
                }
                if let Some(ttl) = ttl {
                    record["ttl"] = json!(ttl);
                }
                manager.edit_record(record).await?;
                edited += 1;
            }
            if edited == 0 {
                return Err(SoftLayerError::abort("No matching records to edit"));
            }
            env.out(&format!("Updated {} record(s)", edited))
        }
        DnsCommand::RecordRemove { record_id } => {
            env.require_confirmation("yes")?;
            manager.delete_record(record_id).await?;
            let mut table = Table::new(["record"]);
            table.add_row(vec![record_id.into()]);
            env.fout(table)
        }
        DnsCommand::Import { zonefile, dry_run } => {
            import_zone(env, &manager, zonefile, dry_run).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::demo_env;
    use crate::config::cli::OutputFormat;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_zone_list() {
        let (mut env, buffer, _) = demo_env(OutputFormat::Json, "");
        run(&mut env, DnsCommand::ZoneList).await.unwrap();

        let out: Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(out[0]["zone"], "example.com");
        assert_eq!(out[1]["serial"], 2014030801);
    }

    #[tokio::test]
    async fn test_zone_print_by_name() {
        let (mut env, buffer, transport) = demo_env(OutputFormat::Raw, "");
        transport.set_response("Account", "getDomains", json!([{"id": 12345}]));
        run(
            &mut env,
            DnsCommand::ZonePrint {
                zone: "example.com".to_string(),
            },
        )
        .await
        .unwrap();

        let call = transport.last_call("Dns_Domain", "getZoneFileContents").unwrap();
        assert_eq!(call.identifier, Some(12345));
        assert!(buffer.contents().starts_with("$ORIGIN example.com."));
    }

    #[tokio::test]
    async fn test_ambiguous_zone_aborts() {
        let (mut env, _, _) = demo_env(OutputFormat::Raw, "");
        let err = run(
            &mut env,
            DnsCommand::ZonePrint {
                zone: "example".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Multiple zone found for 'example': 12345, 12346");
    }

    #[tokio::test]
    async fn test_zone_delete_confirmation() {
        let (mut env, buffer, transport) = demo_env(OutputFormat::Raw, "example.com\n");
        run(
            &mut env,
            DnsCommand::ZoneDelete {
                zone: "12345".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert!(transport.calls_to("Dns_Domain", "deleteObject").is_empty());

        let (mut env, buffer2, transport) = demo_env(OutputFormat::Raw, "12345\n");
        run(
            &mut env,
            DnsCommand::ZoneDelete {
                zone: "12345".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(transport.calls_to("Dns_Domain", "deleteObject").len(), 1);
        assert!(buffer.contents().is_empty());
        assert!(buffer2.contents().contains("Deleted zone: 12345"));
    }

    #[tokio::test]
    async fn test_record_list_filters() {
        let (mut env, buffer, transport) = demo_env(OutputFormat::Json, "");
        run(
            &mut env,
            DnsCommand::RecordList {
                zone: "12345".to_string(),
                data: None,
                record: Some("www".to_string()),
                ttl: None,
                record_type: Some("CNAME".to_string()),
            },
        )
        .await
        .unwrap();

        let call = transport.last_call("Dns_Domain", "getResourceRecords").unwrap();
        assert_eq!(
            call.filter,
            Some(json!({"resourceRecords": {
                "host": {"operation": "www"},
                "type": {"operation": "cname"}
            }}))
        );
        let out: Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(out[2]["type"], "MX");
    }

    fn record_add(record_type: &str, zone: Option<&str>) -> DnsCommand {
        DnsCommand::RecordAdd {
            record: "test".to_string(),
            record_type: record_type.to_string(),
            data: "1.2.3.5".to_string(),
            zone: zone.map(str::to_string),
            ttl: DEFAULT_TTL,
            priority: None,
            protocol: Some("tcp".to_string()),
            port: Some(5060),
            service: Some("_sip".to_string()),
            weight: None,
        }
    }

    #[tokio::test]
    async fn test_record_add_variants() {
        let (mut env, _, transport) = demo_env(OutputFormat::Raw, "");
        run(&mut env, record_add("a", Some("12345"))).await.unwrap();
        let call = transport
            .last_call("Dns_Domain_ResourceRecord", "createObject")
            .unwrap();
        assert_eq!(call.args[0]["type"], "A");
        assert_eq!(call.args[0]["domainId"], 12345);

        run(&mut env, record_add("SRV", Some("12345"))).await.unwrap();
        let call = transport
            .last_call("Dns_Domain_ResourceRecord", "createObject")
            .unwrap();
        assert_eq!(call.args[0]["port"], 5060);
        assert_eq!(call.args[0]["priority"], 20);

        run(&mut env, record_add("PTR", None)).await.unwrap();
        let call = transport
            .last_call("Dns_Domain_ResourceRecord", "createObject")
            .unwrap();
        assert!(call.args[0].get("domainId").is_none());

        let err = run(&mut env, record_add("MX", None)).await.unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(run(&mut env, record_add("BOGUS", Some("12345"))).await.is_err());
    }

    #[tokio::test]
    async fn test_record_edit_by_id() {
        let (mut env, _, transport) = demo_env(OutputFormat::Raw, "");
        run(
            &mut env,
            DnsCommand::RecordEdit {
                zone: "12345".to_string(),
                by_record: None,
                by_id: Some(2),
                data: Some("other.example.com.".to_string()),
                ttl: Some(600),
            },
        )
        .await
        .unwrap();

        let edits = transport.calls_to("Dns_Domain_ResourceRecord", "editObject");
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].identifier, Some(2));
        assert_eq!(edits[0].args[0]["data"], "other.example.com.");
        assert_eq!(edits[0].args[0]["ttl"], 600);
    }

    #[tokio::test]
    async fn test_import_creates_missing_zone() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "$ORIGIN realtest.com.\n@ 86400 IN A 1.2.3.4\nmail 3600 IN MX 10 mx.realtest.com.\n"
        )
        .unwrap();

        let (mut env, buffer, transport) = demo_env(OutputFormat::Raw, "");
        transport.set_response("Account", "getDomains", json!([]));
        run(
            &mut env,
            DnsCommand::Import {
                zonefile: file.path().to_path_buf(),
                dry_run: false,
            },
        )
        .await
        .unwrap();

        let out = buffer.contents();
        assert!(out.contains("Parsed: zone=realtest.com"));
        assert!(out.contains("Created: realtest.com"));
        assert!(out.contains("Created: type=MX, record=mail, data=mx.realtest.com., ttl=3600"));
        assert!(out.ends_with("Finished\n"));

        let creates = transport.calls_to("Dns_Domain_ResourceRecord", "createObject");
        assert_eq!(creates.len(), 2);
        assert_eq!(creates[0].args[0]["domainId"], 98765);
    }

    #[tokio::test]
    async fn test_import_dry_run() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "$ORIGIN realtest.com.\n@ 86400 IN A 1.2.3.4\n").unwrap();

        let (mut env, _, transport) = demo_env(OutputFormat::Raw, "");
        run(
            &mut env,
            DnsCommand::Import {
                zonefile: file.path().to_path_buf(),
                dry_run: true,
            },
        )
        .await
        .unwrap();
        assert!(transport.calls().is_empty());
    }
}
