pub mod auth;
pub mod client;

pub use auth::{BasicAuthentication, BasicHttpAuthentication, BearerAuthentication, TokenAuthentication};
pub use client::{create_client_from_env, CallBuilder, Client, ClientBuilder, DEFAULT_PAGE_SIZE};
pub use crate::utils::error::Result;
