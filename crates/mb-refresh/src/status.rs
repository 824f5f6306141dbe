//! Upstream availability monitor.
//!
//! A single background loop probes the upstream, records the result, then
//! sleeps a fixed interval. Probe failures are recorded as "down" and never
//! surface as errors. The flag reads `false` until the first probe returns.

use mb_telemetry::Metrics;
use mb_universalis::StatusProbe;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default probe interval (10 minutes).
pub const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_secs(600);

/// Handle to the background status loop. Dropping it stops the loop.
pub struct StatusMonitor {
    up: Arc<AtomicBool>,
    shutdown_token: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl StatusMonitor {
    /// Start probing immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(probe: Arc<dyn StatusProbe>, interval: Duration) -> Self {
        let up = Arc::new(AtomicBool::new(false));
        let shutdown_token = CancellationToken::new();

        let handle = tokio::spawn(run_status_loop(
            probe,
            interval,
            up.clone(),
            shutdown_token.clone(),
        ));

        Self {
            up,
            shutdown_token,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Last known probe result.
    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::SeqCst)
    }

    /// Signal the loop to exit.
    pub fn stop(&self) {
        self.shutdown_token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Stop and wait for the loop to exit.
    pub async fn shutdown(&self) {
        self.stop();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Status monitor task failed");
            }
        }
    }
}

impl Drop for StatusMonitor {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}

async fn run_status_loop(
    probe: Arc<dyn StatusProbe>,
    interval: Duration,
    up: Arc<AtomicBool>,
    shutdown_token: CancellationToken,
) {
    info!(interval_secs = interval.as_secs(), "Status monitor started");

    loop {
        let result = tokio::select! {
            biased;
            () = shutdown_token.cancelled() => break,
            r = probe.probe() => r,
        };

        let is_up = match result {
            Ok(()) => {
                debug!("Upstream seems up");
                true
            }
            Err(e) => {
                warn!(error = %e, "Upstream seems down");
                false
            }
        };

        let was_up = up.swap(is_up, Ordering::SeqCst);
        if was_up != is_up {
            info!(up = is_up, "Upstream status changed");
        }
        Metrics::upstream_status(is_up);

        tokio::select! {
            biased;
            () = shutdown_token.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }
    }

    info!("Status monitor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mb_universalis::{UpstreamError, UpstreamResult};
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicU32;

    /// Returns scripted results, then repeats the last one.
    struct ScriptedProbe {
        script: Mutex<VecDeque<bool>>,
        last: AtomicBool,
        calls: AtomicU32,
    }

    impl ScriptedProbe {
        fn new(script: Vec<bool>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                last: AtomicBool::new(false),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatusProbe for ScriptedProbe {
        async fn probe(&self) -> UpstreamResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().pop_front();
            let ok = match next {
                Some(ok) => {
                    self.last.store(ok, Ordering::SeqCst);
                    ok
                }
                None => self.last.load(Ordering::SeqCst),
            };
            if ok {
                Ok(())
            } else {
                Err(UpstreamError::Transport("connection refused".to_string()))
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_defaults_to_down_until_first_probe() {
        let probe = ScriptedProbe::new(vec![true]);
        let monitor = StatusMonitor::spawn(probe.clone(), DEFAULT_STATUS_INTERVAL);

        // Spawned task has not run yet on the current-thread runtime.
        assert!(!monitor.is_up());

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(monitor.is_up());
        assert_eq!(probe.calls(), 1);

        monitor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reprobes_every_interval_and_records_failures() {
        let probe = ScriptedProbe::new(vec![true, false, true]);
        let interval = Duration::from_secs(600);
        let monitor = StatusMonitor::spawn(probe.clone(), interval);

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(monitor.is_up());

        // Nothing happens mid-interval.
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(probe.calls(), 1);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(probe.calls(), 2);
        assert!(!monitor.is_up());

        tokio::time::sleep(interval).await;
        assert_eq!(probe.calls(), 3);
        assert!(monitor.is_up());

        monitor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_the_loop() {
        let probe = ScriptedProbe::new(vec![false]);
        let monitor = StatusMonitor::spawn(probe.clone(), Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(1)).await;
        monitor.shutdown().await;
        assert!(monitor.is_stopped());

        let calls = probe.calls();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(probe.calls(), calls);
        assert!(!monitor.is_up());
    }
}
