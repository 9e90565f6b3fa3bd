//! OANDA v20 REST API client and wire types

mod client;
pub mod types;

pub use client::OandaClient;
pub use types::*;
