// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Product handlers and their acknowledgment conventions.
//!
//! A handler declares how it acknowledges a dispatched configuration when it
//! is registered:
//!
//! - [`ProductHandler::sync`]: returning `Ok` acknowledges, `Err` fails.
//! - [`ProductHandler::callback`]: the handler receives an [`Ack`] token and
//!   consumes it whenever the work is done, possibly from another thread.
//! - [`ProductHandler::future`]: the returned future is spawned on the tokio
//!   runtime and its output becomes the outcome.
//!
//! Panics raised by a handler are caught and recorded as an `ERROR` outcome
//! for the item being dispatched. Sibling items are unaffected.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, warn};

use crate::store::AppliedConfig;

/// Change being delivered to a product handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Apply,
    Unapply,
    Modify,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Apply => "apply",
            Action::Unapply => "unapply",
            Action::Modify => "modify",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acknowledgment convention declared by a [`ProductHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckStyle {
    Sync,
    Callback,
    Future,
}

type SyncFn = dyn Fn(Action, &Value, &str) -> anyhow::Result<()> + Send + Sync;
type CallbackFn = dyn Fn(Action, &Value, &str, Ack) + Send + Sync;
type FutureFn = dyn Fn(Action, Arc<Value>, String) -> BoxFuture<'static, anyhow::Result<()>>
    + Send
    + Sync;

/// Handler registered for one product.
///
/// Cloning is cheap and clones share the same underlying closure.
#[derive(Clone)]
pub enum ProductHandler {
    Sync(Arc<SyncFn>),
    Callback(Arc<CallbackFn>),
    Future(Arc<FutureFn>),
}

impl fmt::Debug for ProductHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProductHandler").field(&self.style()).finish()
    }
}

impl ProductHandler {
    /// Handler whose return value is the outcome.
    pub fn sync<F>(handler: F) -> Self
    where
        F: Fn(Action, &Value, &str) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        ProductHandler::Sync(Arc::new(handler))
    }

    /// Handler reporting its outcome through the [`Ack`] token it receives.
    pub fn callback<F>(handler: F) -> Self
    where
        F: Fn(Action, &Value, &str, Ack) + Send + Sync + 'static,
    {
        ProductHandler::Callback(Arc::new(handler))
    }

    /// Handler returning a future resolved on the tokio runtime.
    pub fn future<F, Fut>(handler: F) -> Self
    where
        F: Fn(Action, Arc<Value>, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        ProductHandler::Future(Arc::new(move |action, file, id| {
            handler(action, file, id).boxed()
        }))
    }

    pub fn style(&self) -> AckStyle {
        match self {
            ProductHandler::Sync(_) => AckStyle::Sync,
            ProductHandler::Callback(_) => AckStyle::Callback,
            ProductHandler::Future(_) => AckStyle::Future,
        }
    }

    /// Invokes the handler for `item` and wires its outcome to the item state.
    pub(crate) fn invoke(&self, action: Action, item: &Arc<AppliedConfig>) {
        let file: &Value = item.file();
        let id = item.id();
        match self {
            ProductHandler::Sync(handler) => {
                match catch_unwind(AssertUnwindSafe(|| handler(action, file, id))) {
                    Ok(Ok(())) => {
                        item.acknowledge();
                    }
                    Ok(Err(err)) => record_failure(item, action, format!("{err:#}")),
                    Err(payload) => record_failure(item, action, panic_message(payload)),
                }
            }
            ProductHandler::Callback(handler) => {
                let ack = Ack::new(item.clone(), action);
                if let Err(payload) =
                    catch_unwind(AssertUnwindSafe(|| handler(action, file, id, ack)))
                {
                    record_failure(item, action, panic_message(payload));
                }
            }
            ProductHandler::Future(handler) => {
                let future = match catch_unwind(AssertUnwindSafe(|| {
                    handler(action, item.file().clone(), id.to_string())
                })) {
                    Ok(future) => future,
                    Err(payload) => {
                        record_failure(item, action, panic_message(payload));
                        return;
                    }
                };
                let runtime = match tokio::runtime::Handle::try_current() {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        record_failure(item, action, format!("no async runtime available: {err}"));
                        return;
                    }
                };
                let item = item.clone();
                runtime.spawn(async move {
                    match AssertUnwindSafe(future).catch_unwind().await {
                        Ok(Ok(())) => {
                            item.acknowledge();
                        }
                        Ok(Err(err)) => record_failure(&item, action, format!("{err:#}")),
                        Err(payload) => record_failure(&item, action, panic_message(payload)),
                    }
                });
            }
        }
    }
}

/// One-shot acknowledgment token handed to callback-style handlers.
///
/// Dropping the token without calling [`Ack::ack`] leaves the item
/// `UNACKNOWLEDGED`.
#[must_use = "dropping an Ack leaves the configuration unacknowledged"]
pub struct Ack {
    item: Arc<AppliedConfig>,
    action: Action,
}

impl fmt::Debug for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ack")
            .field("path", &self.item.path())
            .field("action", &self.action)
            .finish()
    }
}

impl Ack {
    fn new(item: Arc<AppliedConfig>, action: Action) -> Self {
        Self { item, action }
    }

    /// Path of the configuration this token acknowledges.
    pub fn path(&self) -> &str {
        self.item.path()
    }

    /// Reports the outcome of the dispatched change.
    pub fn ack(self, result: anyhow::Result<()>) {
        match result {
            Ok(()) => {
                self.item.acknowledge();
            }
            Err(err) => record_failure(&self.item, self.action, format!("{err:#}")),
        }
    }
}

fn record_failure(item: &AppliedConfig, action: Action, error: String) {
    warn!(
        path = item.path(),
        action = %action,
        "[RC] Product handler failed: {error}"
    );
    if !item.fail(error) {
        debug!(path = item.path(), "[RC] Ignoring failure for an already settled config");
    }
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("handler panicked: {message}")
    } else {
        "handler panicked".to_string()
    }
}
