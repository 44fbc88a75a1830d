//! Per-worker request accounting: concurrency slots, request timeout, and the
//! served-request limit that triggers recycling.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetireReason {
    MaxRequests,
    Timeout,
    Shutdown,
}

/// Attached to every request a managed worker handles.
#[derive(Debug, Clone)]
pub struct WorkerStamp {
    pub worker: usize,
    pub generation: u64,
    pub served: u64,
    pub limit: u64,
}

pub struct WorkerGuard {
    worker: usize,
    generation: u64,
    limit: u64,
    timeout: Option<Duration>,
    served: AtomicU64,
    timeouts: AtomicU64,
    slots: Semaphore,
    retire_tx: watch::Sender<Option<RetireReason>>,
}

impl WorkerGuard {
    /// `limit` of zero never retires on request count.
    pub fn new(
        worker: usize,
        generation: u64,
        limit: u64,
        timeout: Option<Duration>,
        threads: usize,
    ) -> (Arc<Self>, watch::Receiver<Option<RetireReason>>) {
        let (retire_tx, retire_rx) = watch::channel(None);
        let guard = Self {
            worker,
            generation,
            limit,
            timeout,
            served: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            slots: Semaphore::new(threads.max(1)),
            retire_tx,
        };
        (Arc::new(guard), retire_rx)
    }

    pub fn served(&self) -> u64 {
        self.served.load(Ordering::SeqCst)
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::SeqCst)
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn retirement(&self) -> Option<RetireReason> {
        *self.retire_tx.borrow()
    }

    /// Marks the worker for retirement. Only the first reason sticks.
    pub fn retire(&self, reason: RetireReason) -> bool {
        self.retire_tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(reason);
                true
            } else {
                false
            }
        })
    }

    fn stamp(&self, served: u64) -> WorkerStamp {
        WorkerStamp {
            worker: self.worker,
            generation: self.generation,
            served,
            limit: self.limit,
        }
    }
}

pub async fn guard_requests(
    State(guard): State<Arc<WorkerGuard>>,
    mut request: Request,
    next: Next,
) -> Response {
    // Waiting for a slot does not count against the timeout.
    let _slot = match guard.slots.acquire().await {
        Ok(permit) => permit,
        Err(_) => return (StatusCode::SERVICE_UNAVAILABLE, "Worker is shutting down").into_response(),
    };

    let served = guard.served.fetch_add(1, Ordering::SeqCst) + 1;
    request.extensions_mut().insert(guard.stamp(served));

    if guard.limit > 0 && served == guard.limit && guard.retire(RetireReason::MaxRequests) {
        tracing::info!(
            "♻️  Worker {} (generation {}) reached {} requests, recycling",
            guard.worker,
            guard.generation,
            served
        );
    }

    let Some(timeout) = guard.timeout else {
        return next.run(request).await;
    };

    let path = request.uri().path().to_string();
    match tokio::time::timeout(timeout, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            guard.timeouts.fetch_add(1, Ordering::SeqCst);
            guard.retire(RetireReason::Timeout);
            tracing::warn!(
                "⏱️  {} exceeded {:?} on worker {} (generation {}), replacing worker",
                path,
                timeout,
                guard.worker,
                guard.generation
            );
            (
                StatusCode::GATEWAY_TIMEOUT,
                format!("Request exceeded the {}s worker timeout", timeout.as_secs()),
            )
                .into_response()
        }
    }
}
