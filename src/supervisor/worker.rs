//! A managed worker: one OS thread running its own tokio runtime and router.

use crate::config::WorkerSettings;
use crate::supervisor::guard::{guard_requests, RetireReason, WorkerGuard};
use crate::supervisor::AppFactory;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    Retired(RetireReason),
    Failed(String),
}

#[derive(Debug)]
pub enum WorkerEvent {
    /// The worker stopped accepting and is draining; its slot can be refilled now.
    Retiring {
        slot: usize,
        generation: u64,
        reason: RetireReason,
    },
    Exited {
        slot: usize,
        generation: u64,
        served: u64,
        timeouts: u64,
        outcome: WorkerOutcome,
    },
}

#[derive(Debug, Clone)]
pub struct WorkerSpec {
    pub slot: usize,
    pub generation: u64,
    pub limit: u64,
    pub settings: WorkerSettings,
}

struct WorkerExit {
    served: u64,
    timeouts: u64,
    outcome: WorkerOutcome,
}

impl WorkerExit {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            served: 0,
            timeouts: 0,
            outcome: WorkerOutcome::Failed(message.into()),
        }
    }
}

pub fn spawn_worker(
    spec: WorkerSpec,
    listener: std::net::TcpListener,
    factory: AppFactory,
    stop: watch::Receiver<bool>,
    events: mpsc::UnboundedSender<WorkerEvent>,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name(format!("worker-{}", spec.slot))
        .spawn(move || {
            let exit = run_worker(&spec, listener, factory, stop, events.clone());
            let _ = events.send(WorkerEvent::Exited {
                slot: spec.slot,
                generation: spec.generation,
                served: exit.served,
                timeouts: exit.timeouts,
                outcome: exit.outcome,
            });
        })
}

fn run_worker(
    spec: &WorkerSpec,
    listener: std::net::TcpListener,
    factory: AppFactory,
    stop: watch::Receiver<bool>,
    events: mpsc::UnboundedSender<WorkerEvent>,
) -> WorkerExit {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(spec.settings.threads)
        .thread_name(format!("worker-{}-g{}", spec.slot, spec.generation))
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => return WorkerExit::failed(format!("cannot build runtime: {}", e)),
    };

    let exit = runtime.block_on(serve(spec, listener, factory, stop, events));
    // Connections abandoned after the graceful timeout are dropped with the runtime.
    runtime.shutdown_timeout(Duration::from_secs(1));
    exit
}

async fn serve(
    spec: &WorkerSpec,
    listener: std::net::TcpListener,
    factory: AppFactory,
    mut stop: watch::Receiver<bool>,
    events: mpsc::UnboundedSender<WorkerEvent>,
) -> WorkerExit {
    let (guard, mut retire_rx) = WorkerGuard::new(
        spec.slot,
        spec.generation,
        spec.limit,
        spec.settings.timeout(),
        spec.settings.threads,
    );

    let router = match factory() {
        Ok(router) => router,
        Err(e) => return WorkerExit::failed(format!("cannot build application: {}", e)),
    };
    let app = router.layer(axum::middleware::from_fn_with_state(
        guard.clone(),
        guard_requests,
    ));

    let listener = match tokio::net::TcpListener::from_std(listener) {
        Ok(listener) => listener,
        Err(e) => return WorkerExit::failed(format!("cannot adopt listener: {}", e)),
    };

    tracing::info!(
        "Worker {} (generation {}) booted, limit {}",
        spec.slot,
        spec.generation,
        if spec.limit > 0 {
            spec.limit.to_string()
        } else {
            "none".to_string()
        }
    );

    let (drain_tx, drain_rx) = oneshot::channel::<()>();
    let signal = {
        let guard = guard.clone();
        let slot = spec.slot;
        let generation = spec.generation;
        async move {
            tokio::select! {
                _ = wait_until(&mut retire_rx, |reason| reason.is_some()) => {}
                _ = wait_until(&mut stop, |stopping| *stopping) => {}
            }
            match guard.retirement() {
                Some(reason) => {
                    let _ = events.send(WorkerEvent::Retiring {
                        slot,
                        generation,
                        reason,
                    });
                }
                None => {
                    guard.retire(RetireReason::Shutdown);
                }
            }
            let _ = drain_tx.send(());
        }
    };

    let graceful = spec.settings.graceful_timeout();
    let drain_deadline = async move {
        if drain_rx.await.is_ok() {
            tokio::time::sleep(graceful).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    let server = axum::serve(listener, app).with_graceful_shutdown(signal);
    let served_result = tokio::select! {
        result = async { server.await } => result.map_err(|e| e.to_string()),
        _ = drain_deadline => {
            tracing::warn!(
                "Worker {} (generation {}) still busy after {:?}, abandoning in-flight requests",
                spec.slot,
                spec.generation,
                graceful
            );
            Ok(())
        }
    };

    let outcome = match served_result {
        Ok(()) => WorkerOutcome::Retired(guard.retirement().unwrap_or(RetireReason::Shutdown)),
        Err(message) => WorkerOutcome::Failed(message),
    };

    WorkerExit {
        served: guard.served(),
        timeouts: guard.timeouts(),
        outcome,
    }
}

async fn wait_until<T>(rx: &mut watch::Receiver<T>, predicate: impl Fn(&T) -> bool) {
    loop {
        if predicate(&rx.borrow_and_update()) {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone: nothing will ever change, so never resolve.
            std::future::pending::<()>().await;
        }
    }
}
