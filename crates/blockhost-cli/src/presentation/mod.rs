//! Shared CLI presentation utilities.
//!
//! Format-only: handlers decide what to show, these functions decide how.

pub mod network_display;
pub mod tables;

pub use network_display::{format_step, print_manual_steps, print_network_status, print_setup};
pub use tables::{format_optional, print_separator};
