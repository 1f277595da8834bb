#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unused_crate_dependencies)]

// Used by the binary target only
use dotenvy as _;
use tokio as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;
pub mod utils;

// Re-export primary types for convenient access
pub use bootstrap::{init_logging, resolve_settings};
pub use commands::Commands;
pub use error::CliError;
pub use parser::Cli;
