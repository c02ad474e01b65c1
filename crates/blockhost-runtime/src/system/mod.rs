//! Host command execution.
//!
//! `SystemCommandRunner` implements the `CommandRunner` port from
//! blockhost-core. The CLI constructs it and hands it to the firewall and
//! elevation code; tests substitute mocks.

mod commands;

pub use commands::{SystemCommandRunner, first_output_line};
