use clap::Parser;
use softlayer::app;
use softlayer::config::cli::Cli;
use softlayer::utils::logger;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbosity());
    tracing::debug!("command line: {:?}", cli);

    if let Err(e) = app::run(cli).await {
        tracing::error!(
            "{} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::debug!("Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("{}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }
}
