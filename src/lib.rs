//! SoftLayer API client: transports (XML-RPC, REST, fixtures), a client with
//! pagination helpers, per-area managers and the `slcli` application.

pub mod config;
pub mod core;
pub mod domain;
pub mod managers;
pub mod transport;
pub mod utils;

#[cfg(feature = "cli")]
pub mod app;

pub use core::{create_client_from_env, Client, ClientBuilder};
pub use domain::model::{ApiResult, Request};
pub use managers::{
    AccountManager, BlockStorageManager, CdnManager, DedicatedHostManager, DnsManager,
    EventLogManager, FileStorageManager, FirewallManager, HardwareManager, ImageManager,
    LoadBalancerManager, MessagingManager, NetworkManager, OrderingManager, SshKeyManager,
    SslManager, TagManager, TicketManager, UserManager, VsManager,
};
pub use utils::error::{Result, SoftLayerError};
