// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Client-level state reported to the agent on every poll.

use remote_config_proto::{
    Client, ClientGetConfigsRequest, ClientState, ClientTracer, ConfigState, TargetFileMeta,
};

use super::diff::TargetsUpdate;
use crate::capabilities::CapabilityMask;
use crate::config::RemoteConfigSettings;

/// Root metadata is not tracked by tracer clients.
const ROOT_VERSION: u64 = 1;

/// Mutable state shared by the poll loop and the public API.
#[derive(Debug, Default)]
pub(super) struct ClientStateTracker {
    pub(super) targets_version: u64,
    pub(super) backend_client_state: String,
    pub(super) has_error: bool,
    pub(super) error: String,
    /// Subscribed products, in subscription order.
    pub(super) products: Vec<String>,
    pub(super) capabilities: CapabilityMask,
    pub(super) extra_services: Vec<String>,
    pub(super) cached_target_files: Vec<TargetFileMeta>,
}

impl ClientStateTracker {
    pub(super) fn record_error(&mut self, message: String) {
        self.has_error = true;
        self.error = message;
    }

    pub(super) fn clear_error(&mut self) {
        self.has_error = false;
        self.error.clear();
    }

    pub(super) fn apply_targets(&mut self, targets: &TargetsUpdate) {
        self.targets_version = targets.version;
        self.backend_client_state = targets.backend_client_state.clone();
    }

    /// Adds `products`, keeping first-subscription order.
    pub(super) fn subscribe<I>(&mut self, products: I)
    where
        I: IntoIterator<Item = String>,
    {
        for product in products {
            if !self.products.contains(&product) {
                self.products.push(product);
            }
        }
    }

    pub(super) fn unsubscribe<'a, I>(&mut self, products: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for product in products {
            self.products.retain(|subscribed| subscribed != product);
        }
    }

    pub(super) fn build_request(
        &self,
        client_id: &str,
        settings: &RemoteConfigSettings,
        config_states: Vec<ConfigState>,
    ) -> ClientGetConfigsRequest {
        ClientGetConfigsRequest {
            client: Some(Client {
                state: Some(ClientState {
                    root_version: ROOT_VERSION,
                    targets_version: self.targets_version,
                    config_states,
                    has_error: self.has_error,
                    error: self.error.clone(),
                    backend_client_state: self.backend_client_state.clone(),
                }),
                id: client_id.to_string(),
                products: self.products.clone(),
                is_tracer: true,
                client_tracer: Some(ClientTracer {
                    runtime_id: settings.runtime_id.clone(),
                    language: settings.language.clone(),
                    tracer_version: settings.tracer_version.clone(),
                    service: settings.service.clone(),
                    env: settings.env.clone(),
                    app_version: settings.app_version.clone(),
                    extra_services: self.extra_services.clone(),
                    tags: settings.tracer_tags(),
                }),
                capabilities: self.capabilities.to_bytes(),
            }),
            cached_target_files: self.cached_target_files.clone(),
        }
    }

    pub(super) fn snapshot(&self, client_id: &str, config_states: Vec<ConfigState>) -> ClientSnapshot {
        ClientSnapshot {
            id: client_id.to_string(),
            products: self.products.clone(),
            capabilities: self.capabilities.to_base64(),
            targets_version: self.targets_version,
            backend_client_state: self.backend_client_state.clone(),
            has_error: self.has_error,
            error: self.error.clone(),
            config_states,
            cached_target_files: self.cached_target_files.clone(),
        }
    }
}

/// Point-in-time view of the client state, as it would be reported next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSnapshot {
    pub id: String,
    pub products: Vec<String>,
    /// Base64 encoding of the capability mask.
    pub capabilities: String,
    pub targets_version: u64,
    pub backend_client_state: String,
    pub has_error: bool,
    pub error: String,
    /// One entry per applied configuration, ordered by path.
    pub config_states: Vec<ConfigState>,
    pub cached_target_files: Vec<TargetFileMeta>,
}
