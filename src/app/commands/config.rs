use crate::app::environment::Environment;
use crate::app::formatting::{blank, Cell, Table};
use crate::config::{default_config_path, write_config, SoftLayerSettings};
use crate::core::Client;
use crate::transport::{API_PRIVATE_ENDPOINT, API_PUBLIC_ENDPOINT};
use crate::utils::error::{Result, SoftLayerError};
use crate::utils::filter::lookup_str;
use crate::utils::validation::Validate;
use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Edit configuration
    Setup {
        #[arg(short = 'u', long)]
        username: Option<String>,
        #[arg(short = 'k', long)]
        api_key: Option<String>,
        /// `public`, `private` or a full endpoint url
        #[arg(short = 'e', long)]
        endpoint: Option<String>,
        /// 秒
        #[arg(short = 't', long)]
        timeout: Option<u64>,
    },
    /// Show current configuration
    Show,
}

/// `public` / `private` 對應到預設 endpoint，其餘視為完整網址
pub fn endpoint_for(choice: &str) -> String {
    match choice.trim().to_lowercase().as_str() {
        "" | "public" => API_PUBLIC_ENDPOINT.to_string(),
        "private" => API_PRIVATE_ENDPOINT.to_string(),
        _ => choice.trim().to_string(),
    }
}

/// API key 只顯示前後各四碼
fn mask_api_key(api_key: &str) -> String {
    if api_key.len() <= 8 {
        return "*".repeat(api_key.len());
    }
    format!("{}...{}", &api_key[..4], &api_key[api_key.len() - 4..])
}

pub fn config_table(settings: &SoftLayerSettings) -> Table {
    let mut table = Table::key_value();
    let optional = |value: &Option<String>| -> Cell {
        match value {
            Some(value) => value.clone().into(),
            None => blank().into(),
        }
    };
    table.add_row(vec!["Username".into(), optional(&settings.username)]);
    table.add_row(vec![
        "API Key".into(),
        optional(&settings.api_key.as_deref().map(mask_api_key)),
    ]);
    table.add_row(vec!["Endpoint URL".into(), optional(&settings.endpoint_url)]);
    table.add_row(vec![
        "Timeout".into(),
        settings
            .timeout
            .map(|t| Cell::from(t as i64))
            .unwrap_or_else(|| Cell::from("not set")),
    ]);
    table
}

fn prompt_with_default(env: &mut Environment, label: &str, current: Option<&str>) -> Result<String> {
    let prompt = match current {
        Some(current) => format!("{} [{}]: ", label, current),
        None => format!("{}: ", label),
    };
    let answer = env.input(&prompt)?;
    Ok(if answer.is_empty() {
        current.unwrap_or_default().to_string()
    } else {
        answer
    })
}

async fn setup(
    env: &mut Environment,
    username: Option<String>,
    api_key: Option<String>,
    endpoint: Option<String>,
    timeout: Option<u64>,
) -> Result<()> {
    let current = env.settings.clone();

    let username = match username {
        Some(username) => username,
        None => prompt_with_default(env, "Username", current.username.as_deref())?,
    };
    let api_key = match api_key {
        Some(api_key) => api_key,
        None => prompt_with_default(env, "API Key or Password", current.api_key.as_deref())?,
    };
    let endpoint_url = match endpoint {
        Some(endpoint) => endpoint_for(&endpoint),
        None => endpoint_for(&prompt_with_default(
            env,
            "Endpoint (public|private|custom)",
            Some("public"),
        )?),
    };

    let settings = SoftLayerSettings {
        username: Some(username),
        api_key: Some(api_key),
        endpoint_url: Some(endpoint_url),
        timeout: timeout.or(current.timeout),
        ..Default::default()
    }
    .normalized();

    if !settings.has_credentials() {
        return Err(SoftLayerError::argument("Username and API key are required"));
    }
    settings.validate()?;

    // 寫檔前先確認帳密可用
    let client = if env.demo {
        env.client.clone()
    } else {
        Client::builder().settings(&settings).build()?
    };
    let user = client
        .call("Account", "getCurrentUser")
        .mask("mask[id,username]")
        .send()
        .await?;
    tracing::info!(
        "credentials verified for {}",
        lookup_str(&user, &["username"]).unwrap_or("unknown")
    );

    let path = match env.config_file.clone().or_else(default_config_path) {
        Some(path) => path,
        None => return Err(SoftLayerError::abort("Unable to determine config file location")),
    };

    env.fout(config_table(&settings))?;
    if !env.skip_confirmations
        && !env.confirm(&format!("Are you sure you want to write settings to \"{}\"?", path.display()), true)?
    {
        return Err(SoftLayerError::abort("Aborted."));
    }

    write_config(&path, &settings)?;
    env.out("Configuration Updated Successfully")
}

pub async fn run(env: &mut Environment, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Setup {
            username,
            api_key,
            endpoint,
            timeout,
        } => setup(env, username, api_key, endpoint, timeout).await,
        ConfigCommand::Show => {
            let table = config_table(&env.settings);
            env.fout(table)
        }
    }
}
