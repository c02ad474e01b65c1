#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

//! blockhost command-line adapter.

// Used by the binary target only
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod console;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;
pub mod signals;

pub use bootstrap::{CliContext, bootstrap};
pub use commands::Commands;
pub use error::CliError;
pub use parser::Cli;
