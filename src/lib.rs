//! # Boleto Webservice Client
//!
//! Registers boletos with the Banco do Brasil SOAP webservice. Bearer tokens
//! are cached in a file shared by every process using the same cache
//! directory and renewed once when a registration fails with a stale token.
//!
//! Modules:
//! - `config`: client settings, environments and the YAML loader
//! - `cache`: file-backed token cache with tolerance-based expiry
//! - `sources`: token authority talking to the OAuth2 endpoint
//! - `envelope`: SOAP envelope encoding and response flattening
//! - `client`: registration flow with single-renewal retry
//! - `sinks`: optional trace sink for exchanged XML

pub mod cache;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod helpers;
pub mod observability;
pub mod sinks;
pub mod sources;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::client::RegistrationClient;
pub use crate::config::environment::{Endpoints, Environment};
pub use crate::config::settings::{ClientSettings, Credentials};
pub use crate::envelope::{RegistrationRequest, ResponseMap, ResponseNode};
pub use crate::error::{ClientError, RegistrationFailure};
