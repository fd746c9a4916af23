//! Configuration types for the token dApp.
//!
//! This crate provides:
//! - Network presets (Hardhat localhost, Sepolia, mainnet) and the chain id a
//!   session must be connected to
//! - Loading of deployment output (`contract-address.json`)

pub mod deployment;
pub mod network;

pub use deployment::ContractAddresses;
pub use network::{NetworkConfig, NetworkConfigBuilder, NetworkType};
