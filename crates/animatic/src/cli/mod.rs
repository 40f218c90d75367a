//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the animatic binary.

mod commands;
mod config;
mod fingerprint;
mod render;

pub use commands::{Cli, Commands};
pub use config::{load_config, show_config};
pub use fingerprint::fingerprint_file;
pub use render::{RenderArgs, render_script};
