//! One module per top-level `slcli` command. Each defines its clap arguments
//! and a `run` function that calls a manager and prints through the
//! [`Environment`](crate::app::environment::Environment).

pub mod account;
pub mod call_api;
pub mod cdn;
pub mod config;
pub mod dedicatedhost;
pub mod dns;
pub mod event_log;
pub mod firewall;
pub mod hardware;
pub mod image;
pub mod loadbal;
pub mod mq;
pub mod network;
pub mod order;
pub mod server;
pub mod ssl;
pub mod sshkey;
pub mod storage;
pub mod tags;
pub mod ticket;
pub mod user;
pub mod vs;
