//! Application wiring and the console loop.
//!
//! stdin lines become board commands; a renderer task prints one line per
//! published view. Neither side blocks on a fetch.

use crate::command::{Command, HELP};
use crate::config::AppConfig;
use crate::error::AppResult;
use crate::render::{basis_notice, render_view};
use mb_core::{SnapshotKey, SystemClock};
use mb_refresh::{MarketBoard, RefreshCoordinator, RefreshView};
use mb_telemetry::Metrics;
use mb_universalis::UniversalisClient;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{info, warn};

pub struct Application {
    config: AppConfig,
    client: Arc<UniversalisClient>,
    board: MarketBoard,
}

impl Application {
    /// Must be called from within a tokio runtime.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let client = Arc::new(UniversalisClient::new(&config.upstream)?);
        let board = MarketBoard::new(
            &config.refresh,
            config.retry.clone(),
            client.clone(),
            client.clone(),
            Arc::new(SystemClock),
        )?;

        Ok(Self {
            config,
            client,
            board,
        })
    }

    /// Log the upstream's data-center catalogue. Failure is not fatal; the
    /// status monitor keeps probing.
    pub async fn run_preflight(&self) {
        match self.client.data_centers().await {
            Ok(data_centers) => {
                for dc in &data_centers {
                    info!(
                        name = %dc.name,
                        region = ?dc.region(),
                        worlds = dc.worlds.len(),
                        "Data center"
                    );
                }
            }
            Err(e) => warn!(error = %e, base_url = %self.config.upstream.base_url, "Preflight failed"),
        }
    }

    pub async fn run(self) -> AppResult<()> {
        info!(
            ttl_ms = self.config.refresh.ttl_ms,
            cache_capacity = self.config.refresh.cache_capacity,
            no_tax = self.config.refresh.no_tax,
            "Market board ready"
        );
        println!("{HELP}");

        let renderer = tokio::spawn(render_loop(
            self.board.subscribe(),
            self.board.coordinator().clone(),
        ));

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        info!("Input closed");
                        break;
                    };
                    if !self.handle_line(&line)? {
                        break;
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.board.shutdown().await;
        renderer.abort();
        info!("Market board stopped");
        Ok(())
    }

    /// Returns `false` when the loop should stop.
    fn handle_line(&self, line: &str) -> AppResult<bool> {
        let command = match Command::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(true),
            Err(e) => {
                println!("{e} (try `help`)");
                return Ok(true);
            }
        };

        match command {
            Command::Select { item_id, scope } => {
                let outcome = self.board.select(item_id, scope);
                if outcome.is_cached() {
                    info!(item_id, "Served from cache");
                }
            }
            Command::Invalidate { item_id, scope } => {
                let key = SnapshotKey::new(item_id, scope);
                if self.board.invalidate(&key) {
                    println!("invalidated {key}");
                } else {
                    println!("{key} was not cached");
                }
            }
            Command::Reset => {
                if self.board.reset_all().is_none() {
                    println!("cache cleared");
                }
            }
            Command::NoTax(no_tax) => {
                let change = self.board.set_no_tax(no_tax);
                if let Some(notice) = basis_notice(&change, no_tax) {
                    println!("{notice}");
                }
            }
            Command::Status => {
                let coordinator = self.board.coordinator();
                println!(
                    "upstream {}, {} cached, loading {}, no-tax {}",
                    if self.board.is_upstream_up() { "up" } else { "down" },
                    coordinator.cache_len(),
                    self.board.is_loading(),
                    coordinator.no_tax()
                );
            }
            Command::Metrics => match Metrics::gather_text() {
                Ok(text) => print!("{text}"),
                Err(e) => warn!(error = %e, "Failed to gather metrics"),
            },
            Command::Help => println!("{HELP}"),
            Command::Quit => return Ok(false),
        }

        Ok(true)
    }
}

/// Print every published view until the board goes away.
async fn render_loop(mut rx: watch::Receiver<RefreshView>, coordinator: RefreshCoordinator) {
    while rx.changed().await.is_ok() {
        let view = rx.borrow_and_update().clone();
        println!("{}", render_view(&view, coordinator.no_tax()));
    }
}
