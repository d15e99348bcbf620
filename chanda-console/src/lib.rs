//! Chanda Console - operator front end for the contribution ledger.
//!
//! Contributors submit payments with a screenshot; the admin lists,
//! corrects and removes them. Everything goes through one
//! [`chanda_storage::PaymentLedger`], so the console session owns exactly
//! one list cache.

pub mod commands;
pub mod config;
pub mod error;
pub mod render;
pub mod session;
pub mod telemetry;

pub use commands::{run_repl, Command, Console, Outcome};
pub use config::ConsoleConfig;
pub use error::ConsoleError;
