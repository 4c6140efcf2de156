// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Shared fixtures for manager tests: a scripted transport and builders for
//! agent responses.

#![cfg(test)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use remote_config_proto::ClientGetConfigsRequest;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use super::RemoteConfigManager;
use crate::config::RemoteConfigSettings;
use crate::http::{HttpError, Transport, TransportResponse};

pub(crate) const RUNTIME_ID: &str = "0d0a3d4e-7d66-4d4c-9c1f-5b8a3a3c2d10";

/// Transport replaying queued answers and recording every request body.
///
/// Once the queue is drained every poll is answered with `{}`.
#[derive(Default)]
pub(crate) struct MockTransport {
    responses: Mutex<VecDeque<Result<TransportResponse, HttpError>>>,
    requests: Mutex<Vec<ClientGetConfigsRequest>>,
}

impl MockTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn push(&self, status: u16, body: impl Into<Vec<u8>>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(TransportResponse::new(status, body)));
    }

    pub(crate) fn push_json(&self, body: &Value) {
        self.push(200, body.to_string());
    }

    pub(crate) fn push_error(&self) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(HttpError::InvalidUrl("connection refused".to_string())));
    }

    pub(crate) fn requests(&self) -> Vec<ClientGetConfigsRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn last_request(&self) -> ClientGetConfigsRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request was sent")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post_config(&self, body: Vec<u8>) -> Result<TransportResponse, HttpError> {
        let request: ClientGetConfigsRequest =
            serde_json::from_slice(&body).expect("request body must be valid JSON");
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(TransportResponse::new(200, "{}")))
    }
}

pub(crate) fn test_settings() -> RemoteConfigSettings {
    RemoteConfigSettings {
        poll_interval: Duration::from_secs(5),
        runtime_id: RUNTIME_ID.to_string(),
        tracer_version: "1.0.0".to_string(),
        service: "checkout".to_string(),
        env: "staging".to_string(),
        app_version: "2.3.4".to_string(),
        tags: vec![("team".to_string(), "apm".to_string())],
        repository_url: Some("https://github.com/DataDog/example".to_string()),
        commit_sha: Some("abc123".to_string()),
        ..RemoteConfigSettings::default()
    }
}

pub(crate) fn manager_with(transport: Arc<MockTransport>) -> RemoteConfigManager {
    RemoteConfigManager::new(test_settings(), transport)
}

/// A target served by the fake agent.
#[derive(Debug, Clone)]
pub(crate) struct TargetSpec {
    pub(crate) path: String,
    pub(crate) content: Value,
    pub(crate) version: u64,
    /// Raw bytes served instead of the serialised `content`.
    pub(crate) raw_override: Option<Vec<u8>>,
}

impl TargetSpec {
    pub(crate) fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub(crate) fn raw(&self) -> Vec<u8> {
        self.raw_override
            .clone()
            .unwrap_or_else(|| self.content.to_string().into_bytes())
    }

    pub(crate) fn sha256(&self) -> String {
        hex::encode(Sha256::digest(self.raw()))
    }
}

pub(crate) fn target(path: &str, content: Value) -> TargetSpec {
    TargetSpec {
        path: path.to_string(),
        content,
        version: 1,
        raw_override: None,
    }
}

/// Builds a poll response declaring exactly `targets`.
pub(crate) fn response_for(targets_version: u64, targets: &[TargetSpec]) -> Value {
    let mut index = Map::new();
    for spec in targets {
        index.insert(
            spec.path.clone(),
            json!({
                "length": spec.raw().len(),
                "hashes": { "sha256": spec.sha256() },
                "custom": { "v": spec.version },
            }),
        );
    }
    let signed = json!({
        "signed": {
            "_type": "targets",
            "version": targets_version,
            "expires": "2030-01-01T00:00:00Z",
            "custom": { "opaque_backend_state": format!("state-{targets_version}") },
            "targets": index,
        },
        "signatures": [],
    });

    json!({
        "targets": STANDARD.encode(signed.to_string()),
        "target_files": targets
            .iter()
            .map(|spec| json!({ "path": spec.path, "raw": STANDARD.encode(spec.raw()) }))
            .collect::<Vec<_>>(),
        "client_configs": targets.iter().map(|spec| spec.path.clone()).collect::<Vec<_>>(),
    })
}
