use crate::app::environment::Environment;
use crate::app::formatting::iter_to_table;
use crate::app::helpers::parse_parameter;
use crate::config::cli::OutputFormat;
use crate::utils::error::{Result, SoftLayerError};
use crate::utils::filter::build_filters;
use clap::Args;
use serde_json::Value;

/// `slcli call-api Account getObject --mask id` and friends.
#[derive(Debug, Args)]
pub struct CallApiArgs {
    /// Service name, with or without the `SoftLayer_` prefix
    pub service: String,
    pub method: String,
    /// Positional parameters; JSON values are decoded, anything else is a string
    pub parameters: Vec<String>,

    /// Init parameter (object id)
    #[arg(long)]
    pub id: Option<i64>,

    /// Object mask
    #[arg(long)]
    pub mask: Option<String>,

    #[arg(long)]
    pub limit: Option<u32>,

    #[arg(long)]
    pub offset: Option<u32>,

    /// Object filter in `a.b=value` or `a.b IN x,y` form, repeatable
    #[arg(short = 'f', long = "filter")]
    pub filters: Vec<String>,

    /// Object filter as raw JSON, merged with `--filter`
    #[arg(long)]
    pub json_filter: Option<String>,

    /// Fetch every page of a list result
    #[arg(long)]
    pub all: bool,
}

/// 深層合併；`extra` 的值覆蓋 `base`
fn merge(base: &mut Value, extra: Value) {
    match (base, extra) {
        (Value::Object(base), Value::Object(extra)) => {
            for (key, value) in extra {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, extra) => *base = extra,
    }
}

pub fn object_filter(filters: &[String], json_filter: Option<&str>) -> Result<Value> {
    let mut filter = build_filters(filters)?;
    if let Some(raw) = json_filter {
        let extra: Value = serde_json::from_str(raw)
            .map_err(|e| SoftLayerError::argument(format!("Invalid --json-filter: {}", e)))?;
        if !extra.is_object() {
            return Err(SoftLayerError::argument("--json-filter must be a JSON object"));
        }
        merge(&mut filter, extra);
    }
    Ok(filter)
}

pub async fn run(env: &mut Environment, args: CallApiArgs) -> Result<()> {
    let filter = object_filter(&args.filters, args.json_filter.as_deref())?;

    let mut call = env
        .client
        .call(&args.service, &args.method)
        .args(args.parameters.iter().map(|p| parse_parameter(p)))
        .mask_opt(args.mask.as_deref())
        .filter(filter);
    if let Some(id) = args.id {
        call = call.id(id);
    }
    if let Some(limit) = args.limit {
        call = call.limit(limit);
    }
    if let Some(offset) = args.offset {
        call = call.offset(offset);
    }

    let result = if args.all {
        Value::Array(call.send_all().await?)
    } else {
        call.send().await?
    };

    match env.format {
        OutputFormat::Json | OutputFormat::Jsonraw => env.fout(result),
        _ => env.fout(iter_to_table(&result)),
    }
}
