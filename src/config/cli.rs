use crate::app::commands::{
    account::AccountCommand, call_api::CallApiArgs, cdn::CdnCommand, config::ConfigCommand,
    dedicatedhost::DedicatedHostCommand, dns::DnsCommand, event_log::EventLogCommand,
    firewall::FirewallCommand, hardware::HardwareCommand, image::ImageCommand,
    loadbal::LoadBalCommand, mq::MqCommand, network::SubnetCommand, network::SummaryArgs,
    network::VlanCommand, order::OrderCommand, ssl::SslCommand, sshkey::SshKeyCommand,
    storage::StorageCommand, tags::TagsCommand, ticket::TicketCommand, user::UserCommand,
    vs::VsCommand,
};
use crate::config::SoftLayerSettings;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Raw,
    Json,
    Jsonraw,
    Csv,
}

#[derive(Debug, Parser)]
#[command(name = "slcli")]
#[command(version, about = "SoftLayer Command-line Client")]
#[command(after_help = "To use most commands your SoftLayer username and api_key need to be \
    configured. The easiest way to do that is to use: 'slcli config setup'")]
pub struct Cli {
    /// Output format (table on a terminal, raw otherwise)
    #[arg(long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Config file location
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Sets the debug noise level, specify multiple times for more verbosity
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// HTTP[S] proxy to be used to make API calls
    #[arg(long, global = true)]
    pub proxy: Option<String>,

    /// Confirm all prompt actions
    #[arg(short = 'y', long, global = true)]
    pub really: bool,

    /// Use demo data instead of actually making API calls
    #[arg(long, global = true)]
    pub demo: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn output_format(&self) -> OutputFormat {
        self.format.unwrap_or_else(|| {
            if std::io::stdout().is_terminal() {
                OutputFormat::Table
            } else {
                OutputFormat::Raw
            }
        })
    }

    /// 上限 3
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    /// 命令列可直接指定的設定（目前只有 proxy）
    pub fn explicit_settings(&self) -> SoftLayerSettings {
        SoftLayerSettings {
            proxy: self.proxy.clone(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Call arbitrary API endpoints
    CallApi(CallApiArgs),
    /// View and edit client configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Account information
    #[command(subcommand)]
    Account(AccountCommand),
    /// Domain Name System
    #[command(subcommand)]
    Dns(DnsCommand),
    /// SSH keys
    #[command(subcommand)]
    Sshkey(SshKeyCommand),
    /// Support tickets
    #[command(subcommand)]
    Ticket(TicketCommand),
    /// Virtual servers
    #[command(subcommand)]
    Vs(VsCommand),
    /// Hardware servers
    #[command(subcommand)]
    Hw(HardwareCommand),
    /// Network VLANs
    #[command(subcommand)]
    Vlan(VlanCommand),
    /// Network subnets
    #[command(subcommand)]
    Subnet(SubnetCommand),
    /// Account summary by datacenter
    Summary(SummaryArgs),
    /// Compute images
    #[command(subcommand)]
    Image(ImageCommand),
    /// Manage tags
    #[command(subcommand)]
    Tags(TagsCommand),
    /// View and order from the catalog
    #[command(subcommand)]
    Order(OrderCommand),
    /// Block storage
    #[command(subcommand)]
    Block(StorageCommand),
    /// File storage
    #[command(subcommand)]
    File(StorageCommand),
    /// Content Delivery Network
    #[command(subcommand)]
    Cdn(CdnCommand),
    /// Message queue service
    #[command(subcommand)]
    Mq(MqCommand),
    /// Manage users
    #[command(subcommand)]
    User(UserCommand),
    /// SSL certificates
    #[command(subcommand)]
    Ssl(SslCommand),
    /// Event logs
    #[command(subcommand)]
    EventLog(EventLogCommand),
    /// Firewalls
    #[command(subcommand)]
    Firewall(FirewallCommand),
    /// Load balancers
    #[command(subcommand)]
    Loadbal(LoadBalCommand),
    /// Dedicated hosts
    #[command(subcommand)]
    Dedicatedhost(DedicatedHostCommand),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_options() {
        let cli = Cli::try_parse_from([
            "slcli", "-vvvv", "--format", "json", "--demo", "vs", "list", "-y",
        ])
        .unwrap();
        assert_eq!(cli.verbosity(), 3);
        assert_eq!(cli.output_format(), OutputFormat::Json);
        assert!(cli.demo);
        assert!(cli.really);
        assert!(matches!(cli.command, Command::Vs(_)));
    }

    #[test]
    fn test_storage_groups_share_commands() {
        let cli = Cli::try_parse_from([
            "slcli", "block", "access-authorize", "100", "--virtual-id", "10", "-d", "20",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Block(_)));

        let cli = Cli::try_parse_from(["slcli", "file", "volume-list", "--sortby", "id"]).unwrap();
        assert!(matches!(cli.command, Command::File(_)));

        let cli = Cli::try_parse_from(["slcli", "event-log", "get", "-z", "+0100"]).unwrap();
        assert!(matches!(cli.command, Command::EventLog(_)));
    }

    #[test]
    fn test_proxy_becomes_explicit_setting() {
        let cli = Cli::try_parse_from(["slcli", "--proxy", "http://localhost:3128", "summary"]).unwrap();
        assert_eq!(
            cli.explicit_settings().proxy.as_deref(),
            Some("http://localhost:3128")
        );
    }
}
