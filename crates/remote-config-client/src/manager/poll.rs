// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! One poll iteration: report the client state, read the answer, apply it.
//!
//! Failures never escape an iteration. Transport failures leave every piece
//! of state untouched so the next iteration retries with the same request.
//! Rejected responses are reported to the agent through `has_error`/`error`
//! on the following request.

use remote_config_proto::ClientGetConfigsResponse;
use tracing::{debug, error, warn};

use super::core::{client_id, ManagerInner};
use super::diff::compute_update;
use crate::error::ParseError;
use crate::http::HttpError;
use crate::store::lock;

/// Status used by the agent when Remote Configuration is turned off.
const STATUS_DISABLED: u16 = 404;

/// Empty bodies and `{}` mean nothing changed since the last poll.
///
/// Surrounding whitespace is ignored; anything else inside the braces is a
/// real response.
fn is_unchanged(body: &[u8]) -> bool {
    match std::str::from_utf8(body) {
        Ok(text) => matches!(text.trim(), "" | "{}"),
        Err(_) => false,
    }
}

impl ManagerInner {
    pub(super) async fn poll(&self) {
        let _polling = self.poll_lock.lock().await;
        let telemetry = self.telemetry();

        let body = match self.request_body() {
            Ok(body) => body,
            Err(err) => {
                error!("[RC] Unable to serialise the client state: {err}");
                return;
            }
        };

        let response = match self.transport.post_config(body).await {
            Ok(response) => response,
            Err(err) => {
                warn!("[RC] Unable to reach the agent: {err}");
                telemetry.on_transport_error(&err);
                return;
            }
        };
        if response.status == STATUS_DISABLED {
            debug!("[RC] Remote Configuration is disabled in the agent");
            telemetry.on_remote_config_disabled();
            return;
        }
        if !response.is_success() {
            let err = HttpError::Status(response.status);
            warn!("[RC] Agent rejected the poll: {err}");
            telemetry.on_transport_error(&err);
            return;
        }

        telemetry.on_poll_success();
        // The pending error, if any, was delivered with this request.
        lock(&self.state).clear_error();

        if is_unchanged(&response.body) {
            return;
        }
        if let Err(err) = self.apply_response(&response.body) {
            warn!("[RC] Rejecting remote configuration update: {err}");
            telemetry.on_parse_error(&err);
            lock(&self.state).record_error(err.to_string());
        }
    }

    fn request_body(&self) -> Result<Vec<u8>, serde_json::Error> {
        let config_states = self.store.config_states();
        let request = lock(&self.state).build_request(client_id(), &self.settings, config_states);
        serde_json::to_vec(&request)
    }

    /// Validates `body` as a whole, then dispatches the resulting update.
    fn apply_response(&self, body: &[u8]) -> Result<(), ParseError> {
        let response: ClientGetConfigsResponse =
            serde_json::from_slice(body).map_err(ParseError::Response)?;
        let update = compute_update(&self.store, &response)?;

        if let Some(targets) = &update.targets {
            lock(&self.state).apply_targets(targets);
        }
        if update.is_empty() {
            return Ok(());
        }
        debug!(
            unapply = update.to_unapply.len(),
            apply = update.to_apply.len(),
            modify = update.to_modify.len(),
            "[RC] Applying remote configuration update"
        );

        let handled = self.run_batch_handlers(&update);
        self.dispatch_update(&update, &handled);

        let cached_target_files = self.store.cached_target_files();
        lock(&self.state).cached_target_files = cached_target_files;
        Ok(())
    }
}
