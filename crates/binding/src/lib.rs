//! Contract bindings for the token dApp.
//!
//! Only the ERC-20 surface is needed: metadata and balance reads, the
//! `transfer` call and the `Transfer` event used for history scans.
//!
//! Bindings are generated using alloy's `sol!` macro.

pub mod token;

pub use token::IERC20;
