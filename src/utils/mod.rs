pub mod error;
pub mod filter;
pub mod logger;
pub mod resolver;
pub mod validation;
