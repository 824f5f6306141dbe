//! Console market board.
//!
//! Wires the Universalis client into the refresh core and drives it from
//! stdin:
//! - TOML configuration
//! - Line-oriented commands (select, invalidate, reset, notax)
//! - A renderer printing each published view

pub mod app;
pub mod command;
pub mod config;
pub mod error;
pub mod render;

pub use app::Application;
pub use command::Command;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
