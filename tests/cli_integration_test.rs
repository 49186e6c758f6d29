use clap::Parser;
use softlayer::app;
use softlayer::config::cli::{Cli, Command, OutputFormat};

fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(std::iter::once("slcli").chain(args.iter().copied()))
}

#[test]
fn test_demo_commands_run() {
    for args in [
        &["--demo", "--format", "json", "vs", "list"][..],
        &["--demo", "--format", "csv", "hw", "list"][..],
        &["--demo", "--format", "raw", "sshkey", "list"][..],
        &["--demo", "--format", "table", "summary"][..],
        &["--demo", "--format", "json", "call-api", "Account", "getObject"][..],
    ] {
        let cli = parse(args).unwrap();
        let result = tokio_test::block_on(app::run(cli));
        assert!(result.is_ok(), "{:?} failed: {:?}", args, result.err());
    }
}

#[test]
fn test_argument_error_exit_code() {
    let cli = parse(&["--demo", "image", "edit", "100"]).unwrap();
    let err = tokio_test::block_on(app::run(cli)).unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert_eq!(err.user_friendly_message(), "At least one option is required");
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = parse(&["vs", "cancel", "100", "-y", "--format", "jsonraw"]).unwrap();
    assert!(cli.really);
    assert_eq!(cli.output_format(), OutputFormat::Jsonraw);
    assert!(matches!(cli.command, Command::Vs(_)));
}

#[test]
fn test_conflicting_flags_rejected() {
    assert!(parse(&["vs", "reboot", "100", "--hard", "--soft"]).is_err());
    assert!(parse(&["subnet", "list", "--v4", "--v6"]).is_err());
    assert!(parse(&["image", "list", "--public", "--private"]).is_err());
}
