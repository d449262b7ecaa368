//! Wallet connection management.
//!
//! A uniform layer over heterogeneous wallet back-ends (injected browser
//! wallets, WalletConnect, a read-only network fallback): which connectors
//! are offered in a given environment, how connect/disconnect lifecycles
//! run, and what error each connector last reported.

pub mod adapters;
pub mod cli;
pub mod commands;
pub mod connection;
pub mod environment;
pub mod launcher;
pub mod preference;
