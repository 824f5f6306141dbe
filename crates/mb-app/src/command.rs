//! Console commands.
//!
//! One command per line:
//!
//! ```text
//! select <item_id> <scope>
//! invalidate <item_id> <scope>
//! reset
//! notax on|off
//! status
//! metrics
//! help
//! quit
//! ```
//!
//! A scope is a world, data center or region name. The region codes 1-4
//! are accepted as shorthand for region names.

use crate::error::{AppError, AppResult};
use mb_core::{MarketScope, Region};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Select { item_id: u32, scope: MarketScope },
    Invalidate { item_id: u32, scope: MarketScope },
    Reset,
    NoTax(bool),
    Status,
    Metrics,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  select <item_id> <scope>      show an item (world, data center or region)
  invalidate <item_id> <scope>  drop a cached snapshot
  reset                         clear the cache and refetch the selection
  notax on|off                  switch the price basis
  status                        upstream and cache status
  metrics                       prometheus metrics
  quit";

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> AppResult<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("select" | "s", [item, scope]) => Self::Select {
                item_id: parse_item_id(item)?,
                scope: parse_scope(scope)?,
            },
            ("invalidate", [item, scope]) => Self::Invalidate {
                item_id: parse_item_id(item)?,
                scope: parse_scope(scope)?,
            },
            ("reset", []) => Self::Reset,
            ("notax", [flag]) => Self::NoTax(parse_flag(flag)?),
            ("status", []) => Self::Status,
            ("metrics", []) => Self::Metrics,
            ("help" | "?", []) => Self::Help,
            ("quit" | "exit" | "q", []) => Self::Quit,
            _ => return Err(AppError::Command(line.trim().to_string())),
        };

        Ok(Some(command))
    }
}

fn parse_item_id(word: &str) -> AppResult<u32> {
    mb_core::parse_item_id(word).map_err(|e| AppError::Command(e.to_string()))
}

fn parse_scope(name: &str) -> AppResult<MarketScope> {
    if let Ok(code) = name.parse::<u8>() {
        return Region::from_code(code)
            .map(MarketScope::from)
            .map_err(|e| AppError::Command(e.to_string()));
    }

    MarketScope::parse(name).map_err(|e| AppError::Command(e.to_string()))
}

fn parse_flag(word: &str) -> AppResult<bool> {
    match word.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(AppError::Command(format!("expected on|off, got {word}"))),
    }
}
