//! IAM identity provider integration.

pub mod auth;
pub mod config;
mod utils;

pub use self::utils::ServerError;
