//! Network context collector: interfaces, addresses, active ruleset, hostname.

pub mod collector;

pub use collector::{collect_network_context, Error};
