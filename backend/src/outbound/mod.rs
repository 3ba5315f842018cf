//! Outbound adapters implementing the domain ports.

pub mod gateway;
pub mod identity;
pub mod persistence;
