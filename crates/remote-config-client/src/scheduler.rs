// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Periodic invocation of the poll worker.
//!
//! The worker runs once immediately after [`Scheduler::start`], then again
//! `interval` after it signalled completion. Intervals are measured from the
//! end of the previous run, so a slow worker never overlaps with itself, even
//! across a `stop`/`start` cycle: a restarted loop waits for the in-flight run
//! of the previous loop before invoking the worker again.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::store::lock;

type Worker = dyn Fn(Done) + Send + Sync;

/// Completion signal handed to the worker on every invocation.
///
/// Dropping the signal counts as completion.
pub struct Done {
    tx: Option<oneshot::Sender<()>>,
}

impl fmt::Debug for Done {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Done")
            .field("pending", &self.tx.is_some())
            .finish()
    }
}

impl Done {
    fn new(tx: oneshot::Sender<()>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Marks the current invocation as finished, whatever its outcome.
    pub fn done(mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Fixed-delay scheduler with idempotent start/stop.
pub struct Scheduler {
    worker: Arc<Worker>,
    interval: Duration,
    cancel: Mutex<Option<CancellationToken>>,
    // Held by a loop from its first invocation until it exits.
    run_lock: Arc<AsyncMutex<()>>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .finish()
    }
}

impl Scheduler {
    pub fn new<F>(interval: Duration, worker: F) -> Self
    where
        F: Fn(Done) + Send + Sync + 'static,
    {
        Self {
            worker: Arc::new(worker),
            interval,
            cancel: Mutex::new(None),
            run_lock: Arc::new(AsyncMutex::new(())),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        lock(&self.cancel).is_some()
    }

    /// Starts the loop on the current tokio runtime. No-op when already running.
    ///
    /// Returns `false` when the loop is not running afterwards, which only
    /// happens when called outside a tokio runtime.
    pub fn start(&self) -> bool {
        let mut cancel = lock(&self.cancel);
        if cancel.is_some() {
            return true;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(err) => {
                error!("[RC] Unable to start the poll loop: {err}");
                return false;
            }
        };

        let token = CancellationToken::new();
        runtime.spawn(run_loop(
            self.worker.clone(),
            self.interval,
            token.clone(),
            self.run_lock.clone(),
        ));
        *cancel = Some(token);
        debug!(interval = ?self.interval, "[RC] Poll loop started");
        true
    }

    /// Cancels future invocations. An in-flight invocation runs to completion.
    pub fn stop(&self) {
        if let Some(token) = lock(&self.cancel).take() {
            token.cancel();
            debug!("[RC] Poll loop stopped");
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_loop(
    worker: Arc<Worker>,
    interval: Duration,
    cancel: CancellationToken,
    run_lock: Arc<AsyncMutex<()>>,
) {
    let _running = tokio::select! {
        _ = cancel.cancelled() => return,
        guard = run_lock.lock_owned() => guard,
    };
    loop {
        if cancel.is_cancelled() {
            break;
        }
        let (tx, rx) = oneshot::channel();
        worker(Done::new(tx));
        // A dropped sender also means the worker is finished.
        let _ = rx.await;

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(interval) => {}
        }
    }
}
