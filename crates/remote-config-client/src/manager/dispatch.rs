// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delivery of a validated update to the per-product handlers.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use super::core::ManagerInner;
use super::diff::PendingUpdate;
use crate::apply_state::ApplyState;
use crate::handler::Action;
use crate::store::{lock, AppliedConfig};

impl ManagerInner {
    /// Dispatches removals, then additions, then modifications.
    pub(super) fn dispatch_update(&self, update: &PendingUpdate, handled: &HashSet<String>) {
        self.dispatch(&update.to_unapply, Action::Unapply, handled);
        self.dispatch(&update.to_apply, Action::Apply, handled);
        self.dispatch(&update.to_modify, Action::Modify, handled);
    }

    fn dispatch(&self, items: &[Arc<AppliedConfig>], action: Action, handled: &HashSet<String>) {
        for item in items {
            if !handled.contains(item.path()) {
                self.call_handler_for(action, item);
            }
            // The store follows the update whether or not a handler ran.
            match action {
                Action::Unapply => {
                    self.store.remove(item.path());
                }
                Action::Apply | Action::Modify => self.store.insert(item.clone()),
            }
        }
    }

    fn call_handler_for(&self, action: Action, item: &Arc<AppliedConfig>) {
        // Batch handlers may already have settled the item.
        if action != Action::Unapply && item.apply_state() != ApplyState::Unacknowledged {
            return;
        }
        let handler = lock(&self.handlers).get(item.product()).cloned();
        let Some(handler) = handler else {
            debug!(
                path = item.path(),
                product = item.product(),
                "[RC] No handler registered for product"
            );
            return;
        };

        debug!(path = item.path(), action = %action, "[RC] Dispatching config");
        self.telemetry().on_dispatch(action, item.product());
        handler.invoke(action, item);
    }
}
