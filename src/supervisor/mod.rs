//! Managed mode: an arbiter that owns the listening socket and keeps a fixed
//! number of workers alive, recycling each after a jittered request count and
//! replacing any worker whose request overran the timeout.

pub mod guard;
pub mod restart;
pub mod worker;

use crate::config::WorkerSettings;
use crate::utils::error::{Result, ScrapeError};
use crate::utils::monitor::ResourceMonitor;
use axum::Router;
use rand::Rng;
use restart::RestartTracker;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use worker::{spawn_worker, WorkerEvent, WorkerOutcome, WorkerSpec};

pub use guard::{RetireReason, WorkerStamp};

/// Builds a fresh router inside each worker's runtime.
pub type AppFactory = Arc<dyn Fn() -> Result<Router> + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArbiterReport {
    pub spawned: u64,
    pub recycled: u64,
    pub timeouts: u64,
    pub failures: u64,
    pub requests: u64,
}

pub struct Arbiter {
    settings: WorkerSettings,
    factory: AppFactory,
    monitor: Arc<ResourceMonitor>,
}

impl Arbiter {
    pub fn new(settings: WorkerSettings, factory: AppFactory) -> Self {
        Self {
            settings,
            factory,
            monitor: Arc::new(ResourceMonitor::default()),
        }
    }

    pub fn with_monitor(mut self, monitor: Arc<ResourceMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    /// Request limit for a new worker: `max_requests` plus up to `max_requests_jitter`.
    pub fn worker_limit(&self) -> u64 {
        if !self.settings.recycling_enabled() {
            return 0;
        }
        let jitter = self.settings.max_requests_jitter;
        let extra = if jitter > 0 {
            rand::thread_rng().gen_range(0..=jitter)
        } else {
            0
        };
        self.settings.max_requests + extra
    }

    pub async fn run<F>(self, listener: std::net::TcpListener, shutdown: F) -> Result<ArbiterReport>
    where
        F: Future<Output = ()> + Send,
    {
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;
        tracing::info!(
            "🚀 Listening on http://{} (managed: {} worker(s) x {} thread(s), timeout {}, max requests {} + jitter {})",
            addr,
            self.settings.workers,
            self.settings.threads,
            self.settings
                .timeout()
                .map(|t| format!("{:?}", t))
                .unwrap_or_else(|| "off".to_string()),
            self.settings.max_requests,
            self.settings.max_requests_jitter
        );

        let (stop_tx, stop_rx) = watch::channel(false);
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let mut restarts =
            RestartTracker::new(self.settings.max_restarts, self.settings.restart_window());
        let mut report = ArbiterReport::default();
        // slot -> generation currently responsible for it
        let mut current: HashMap<usize, u64> = HashMap::new();
        let mut running = 0usize;
        let mut generation = 0u64;

        for slot in 0..self.settings.workers {
            generation += 1;
            self.spawn(slot, generation, &listener, &stop_rx, &events_tx)?;
            current.insert(slot, generation);
            running += 1;
            report.spawned += 1;
        }

        tokio::pin!(shutdown);
        let mut stopping = false;

        loop {
            tokio::select! {
                _ = &mut shutdown, if !stopping => {
                    stopping = true;
                    tracing::info!("🛑 Shutdown requested, draining {} worker(s)", running);
                    let _ = stop_tx.send(true);
                    if running == 0 {
                        break;
                    }
                }
                event = events_rx.recv() => {
                    let Some(event) = event else { break };
                    match event {
                        WorkerEvent::Retiring { slot, generation: retiring, reason } => {
                            tracing::debug!("Worker {} (generation {}) retiring: {:?}", slot, retiring, reason);
                            if !stopping && current.get(&slot) == Some(&retiring) {
                                generation += 1;
                                self.spawn(slot, generation, &listener, &stop_rx, &events_tx)?;
                                current.insert(slot, generation);
                                running += 1;
                                report.spawned += 1;
                            }
                        }
                        WorkerEvent::Exited { slot, generation: exited, served, timeouts, outcome } => {
                            running = running.saturating_sub(1);
                            report.requests += served;
                            report.timeouts += timeouts;
                            self.monitor.log_stats(&format!("worker {} generation {} exited", slot, exited));

                            match &outcome {
                                WorkerOutcome::Retired(RetireReason::Shutdown) => {
                                    tracing::info!("Worker {} (generation {}) stopped after {} request(s)", slot, exited, served);
                                }
                                WorkerOutcome::Retired(reason) => {
                                    report.recycled += 1;
                                    tracing::info!("Worker {} (generation {}) recycled after {} request(s) ({:?})", slot, exited, served, reason);
                                }
                                WorkerOutcome::Failed(message) => {
                                    report.failures += 1;
                                    tracing::error!("❌ Worker {} (generation {}) failed: {}", slot, exited, message);
                                    if restarts.record_restart() {
                                        let _ = stop_tx.send(true);
                                        return Err(ScrapeError::SupervisorError {
                                            message: format!(
                                                "{} worker failures within {:?}, last: {}",
                                                restarts.count(),
                                                self.settings.restart_window(),
                                                message
                                            ),
                                        });
                                    }
                                }
                            }

                            if !stopping && current.get(&slot) == Some(&exited) {
                                generation += 1;
                                self.spawn(slot, generation, &listener, &stop_rx, &events_tx)?;
                                current.insert(slot, generation);
                                running += 1;
                                report.spawned += 1;
                            }

                            if stopping && running == 0 {
                                break;
                            }
                        }
                    }
                }
            }
        }

        tracing::info!(
            "Arbiter stopped: {} worker(s) spawned, {} recycled, {} timeout(s), {} failure(s), {} request(s)",
            report.spawned,
            report.recycled,
            report.timeouts,
            report.failures,
            report.requests
        );
        Ok(report)
    }

    fn spawn(
        &self,
        slot: usize,
        generation: u64,
        listener: &std::net::TcpListener,
        stop: &watch::Receiver<bool>,
        events: &mpsc::UnboundedSender<WorkerEvent>,
    ) -> Result<()> {
        let socket = listener.try_clone()?;
        socket.set_nonblocking(true)?;

        let spec = WorkerSpec {
            slot,
            generation,
            limit: self.worker_limit(),
            settings: self.settings.clone(),
        };
        spawn_worker(
            spec,
            socket,
            self.factory.clone(),
            stop.clone(),
            events.clone(),
        )
        .map_err(|e| ScrapeError::SupervisorError {
            message: format!("cannot spawn worker {}: {}", slot, e),
        })?;

        self.monitor
            .log_stats(&format!("worker {} generation {} spawned", slot, generation));
        Ok(())
    }
}
