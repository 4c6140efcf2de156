// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batch handlers observing a whole update before per-product dispatch.
//!
//! A batch handler receives every change of an update that concerns its
//! products at once, which lets consumers spanning several products
//! reconcile in a single step. Outcomes it reports are applied to the items
//! before dispatch, and every path it claims is skipped by the per-product
//! handlers.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::mem;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::core::ManagerInner;
use super::diff::PendingUpdate;
use crate::apply_state::ApplyState;
use crate::handler::panic_message;
use crate::store::{lock, AppliedConfig};

/// Read-only description of a changed configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDescriptor {
    pub path: String,
    pub product: String,
    pub id: String,
    pub version: u64,
    pub file: Arc<Value>,
}

impl ConfigDescriptor {
    fn from_item(item: &AppliedConfig) -> Self {
        Self {
            path: item.path().to_string(),
            product: item.product().to_string(),
            id: item.id().to_string(),
            version: item.version(),
            file: item.file().clone(),
        }
    }
}

/// Handle returned by [`crate::RemoteConfigManager::set_batch_handler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchHandlerId(pub(super) u64);

pub(super) type BatchHandlerFn = dyn Fn(&mut UpdateTransaction) + Send + Sync;

pub(super) struct BatchHandler {
    pub(super) id: BatchHandlerId,
    pub(super) products: HashSet<String>,
    pub(super) handler: Arc<BatchHandlerFn>,
}

impl fmt::Debug for BatchHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchHandler")
            .field("id", &self.id)
            .field("products", &self.products)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Acknowledged,
    Failed(String),
}

/// Change set of one update, filtered to the products of a batch handler.
#[derive(Debug, Default)]
pub struct UpdateTransaction {
    to_unapply: Vec<ConfigDescriptor>,
    to_apply: Vec<ConfigDescriptor>,
    to_modify: Vec<ConfigDescriptor>,
    handled: BTreeSet<String>,
    // Reporting order matters: the last outcome for a path wins.
    outcomes: Vec<(String, Outcome)>,
}

impl UpdateTransaction {
    fn from_update(update: &PendingUpdate) -> Self {
        let describe = |items: &[Arc<AppliedConfig>]| -> Vec<ConfigDescriptor> {
            items
                .iter()
                .map(|item| ConfigDescriptor::from_item(item))
                .collect()
        };
        Self {
            to_unapply: describe(&update.to_unapply),
            to_apply: describe(&update.to_apply),
            to_modify: describe(&update.to_modify),
            ..Self::default()
        }
    }

    fn filtered(&self, products: &HashSet<String>) -> Self {
        let keep = |items: &[ConfigDescriptor]| -> Vec<ConfigDescriptor> {
            items
                .iter()
                .filter(|item| products.contains(&item.product))
                .cloned()
                .collect()
        };
        Self {
            to_unapply: keep(&self.to_unapply),
            to_apply: keep(&self.to_apply),
            to_modify: keep(&self.to_modify),
            ..Self::default()
        }
    }

    pub fn to_unapply(&self) -> &[ConfigDescriptor] {
        &self.to_unapply
    }

    pub fn to_apply(&self) -> &[ConfigDescriptor] {
        &self.to_apply
    }

    pub fn to_modify(&self) -> &[ConfigDescriptor] {
        &self.to_modify
    }

    pub fn is_empty(&self) -> bool {
        self.to_unapply.is_empty() && self.to_apply.is_empty() && self.to_modify.is_empty()
    }

    /// Prevents the per-product handler from being invoked for `path`.
    pub fn mark_handled(&mut self, path: impl Into<String>) {
        self.handled.insert(path.into());
    }

    /// Records `path` as acknowledged and marks it handled.
    pub fn ack(&mut self, path: impl Into<String>) {
        let path = path.into();
        self.outcomes.push((path.clone(), Outcome::Acknowledged));
        self.handled.insert(path);
    }

    /// Records `path` as failed with `error` and marks it handled.
    pub fn error(&mut self, path: impl Into<String>, error: impl fmt::Display) {
        let path = path.into();
        self.outcomes
            .push((path.clone(), Outcome::Failed(error.to_string())));
        self.handled.insert(path);
    }

    pub fn is_handled(&self, path: &str) -> bool {
        self.handled.contains(path)
    }
}

impl ManagerInner {
    /// Runs every interested batch handler and applies the reported outcomes.
    ///
    /// Returns the paths per-product dispatch must skip.
    pub(super) fn run_batch_handlers(&self, update: &PendingUpdate) -> HashSet<String> {
        let handlers: Vec<Arc<BatchHandler>> = lock(&self.batch_handlers).clone();
        let mut handled = HashSet::new();
        if handlers.is_empty() {
            return handled;
        }

        let transaction = UpdateTransaction::from_update(update);
        let mut outcomes = Vec::new();
        for entry in handlers {
            let mut view = transaction.filtered(&entry.products);
            if view.is_empty() {
                continue;
            }
            debug!(handler = ?entry.id, "[RC] Running batch handler");
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| (entry.handler)(&mut view))) {
                warn!(
                    handler = ?entry.id,
                    "[RC] Batch handler failed: {}",
                    panic_message(payload)
                );
            }
            handled.extend(mem::take(&mut view.handled));
            outcomes.append(&mut view.outcomes);
        }

        for (path, outcome) in outcomes {
            let Some(item) = update.find(&path) else {
                continue;
            };
            match outcome {
                Outcome::Acknowledged => item.set_outcome(ApplyState::Acknowledged, String::new()),
                Outcome::Failed(error) => item.set_outcome(ApplyState::Error, error),
            }
        }
        handled
    }
}
