//! vstash command line
//!
//! Thin layer over the workspace crates: configuration, log setup, command
//! parsing, and rendering. Everything with real behaviour lives in
//! `vstash-version`, `vstash-staging`, `vstash-backend`, and
//! `vstash-pipeline`.

#![warn(unreachable_pub)]

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod console;
pub mod logging;

pub use app::App;
pub use config::Config;
pub use console::Console;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
