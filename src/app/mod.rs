//! The `slcli` application: argument dispatch, output formatting and the
//! per-invocation [`Environment`](environment::Environment).

pub mod commands;
pub mod environment;
pub mod formatting;
pub mod helpers;

use crate::config::cli::{Cli, Command, OutputFormat};
use crate::config::resolve_settings;
use crate::core::Client;
use crate::managers::storage::StorageKind;
use crate::transport::{DebugTransport, FixtureTransport};
use crate::utils::error::Result;
use environment::Environment;
use formatting::{format_output, Table};
use std::sync::Arc;
use std::time::Instant;

async fn dispatch(env: &mut Environment, command: Command) -> Result<()> {
    match command {
        Command::CallApi(args) => commands::call_api::run(env, args).await,
        Command::Config(cmd) => commands::config::run(env, cmd).await,
        Command::Account(cmd) => commands::account::run(env, cmd).await,
        Command::Dns(cmd) => commands::dns::run(env, cmd).await,
        Command::Sshkey(cmd) => commands::sshkey::run(env, cmd).await,
        Command::Ticket(cmd) => commands::ticket::run(env, cmd).await,
        Command::Vs(cmd) => commands::vs::run(env, cmd).await,
        Command::Hw(cmd) => commands::hardware::run(env, cmd).await,
        Command::Vlan(cmd) => commands::network::run_vlan(env, cmd).await,
        Command::Subnet(cmd) => commands::network::run_subnet(env, cmd).await,
        Command::Summary(args) => commands::network::run_summary(env, args).await,
        Command::Image(cmd) => commands::image::run(env, cmd).await,
        Command::Tags(cmd) => commands::tags::run(env, cmd).await,
        Command::Order(cmd) => commands::order::run(env, cmd).await,
        Command::Block(cmd) => commands::storage::run(env, StorageKind::Block, cmd).await,
        Command::File(cmd) => commands::storage::run(env, StorageKind::File, cmd).await,
        Command::Cdn(cmd) => commands::cdn::run(env, cmd).await,
        Command::Mq(cmd) => commands::mq::run(env, cmd).await,
        Command::User(cmd) => commands::user::run(env, cmd).await,
        Command::Ssl(cmd) => commands::ssl::run(env, cmd).await,
        Command::EventLog(cmd) => commands::event_log::run(env, cmd).await,
        Command::Firewall(cmd) => commands::firewall::run(env, cmd).await,
        Command::Loadbal(cmd) => commands::loadbal::run(env, cmd).await,
        Command::Dedicatedhost(cmd) => commands::dedicatedhost::run(env, cmd).await,
    }
}

/// 依 verbose 等級輸出到 stderr 的診斷資訊
fn print_diagnostics(env: &Environment, verbose: u8, started: Instant) -> Result<()> {
    let Some(log) = env.call_log() else {
        return Ok(());
    };
    let records = log.records();

    let mut summary = Table::key_value();
    summary.add_row(vec![
        "execution_time".into(),
        format!("{:.4}", started.elapsed().as_secs_f64()).into(),
    ]);
    summary.add_row(vec!["api_calls".into(), (records.len() as u64).into()]);
    summary.add_row(vec!["version".into(), crate::transport::user_agent().into()]);
    env.err(&format_output(&summary.into(), OutputFormat::Table)?);

    if verbose > 1 {
        let mut calls = Table::new(["service", "method", "id", "elapsed", "ok"]);
        for record in &records {
            calls.add_row(vec![
                record.request.service.as_str().into(),
                record.request.method.as_str().into(),
                record
                    .request
                    .identifier
                    .map(|id| id.to_string())
                    .into(),
                format!("{:.4}", record.elapsed.as_secs_f64()).into(),
                record.succeeded.into(),
            ]);
        }
        env.err(&format_output(&calls.into(), OutputFormat::Table)?);
    }

    if verbose > 2 {
        for record in &records {
            env.err(&DebugTransport::reproducible_command(&record.request));
        }
    }
    Ok(())
}

/// 解析設定、建立 client 後執行命令
pub async fn run(cli: Cli) -> Result<()> {
    let started = Instant::now();
    let verbose = cli.verbosity();
    let format = cli.output_format();

    let (client, settings) = if cli.demo {
        tracing::info!("demo mode: answering from fixtures");
        let client = Client::new(Arc::new(FixtureTransport::new()), None);
        (client, Default::default())
    } else {
        let settings = resolve_settings(cli.explicit_settings(), cli.config.as_deref())?;
        let client = Client::builder().settings(&settings).build()?;
        (client, settings)
    };

    let mut env = Environment::new(client, format).skip_confirmations(cli.really);
    env.demo = cli.demo;
    env.config_file = cli.config.clone();
    env.settings = settings;
    if verbose > 0 {
        env = env.with_call_log();
    }

    let result = dispatch(&mut env, cli.command).await;
    if verbose > 0 {
        print_diagnostics(&env, verbose, started)?;
    }
    result
}

#[cfg(test)]
pub(crate) mod testing {
    use super::environment::{Environment, SharedBuffer};
    use crate::config::cli::OutputFormat;
    use crate::core::Client;
use crate::managers::storage::StorageKind;
    use crate::transport::FixtureTransport;
    use std::io::Cursor;
    use std::sync::Arc;

    /// 使用 fixture 資料的環境；`answer` 為提示時的輸入
    pub fn demo_env(
        format: OutputFormat,
        answer: &str,
    ) -> (Environment, SharedBuffer, Arc<FixtureTransport>) {
        let transport = Arc::new(FixtureTransport::new());
        let client = Client::new(transport.clone(), None);
        let buffer = SharedBuffer::new();
        let mut env = Environment::new(client, format).with_io(
            Box::new(buffer.clone()),
            Box::new(Cursor::new(answer.to_string().into_bytes())),
        );
        env.demo = true;
        (env, buffer, transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[tokio::test]
    async fn test_demo_run_dispatches() {
        let cli = Cli::try_parse_from(["slcli", "--demo", "--format", "json", "sshkey", "list"])
            .unwrap();
        assert!(run(cli).await.is_ok());
    }
}
