// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Builders for agent answers used by the integration tests.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

/// Feature toggle path exercised by the scenarios.
pub const FEATURES_PATH: &str = "datadog/2/ASM_FEATURES/asm_features_activation/config";

/// Tracing configuration path, used to check product routing.
pub const TRACING_PATH: &str = "datadog/2/APM_TRACING/service_config/config";

/// A target file served by the fake agent.
#[derive(Clone)]
pub struct TargetFixture {
    pub path: &'static str,
    pub payload: Value,
    pub version: u64,
}

impl TargetFixture {
    pub fn new(path: &'static str, payload: Value) -> Self {
        Self {
            path,
            payload,
            version: 1,
        }
    }

    pub fn raw(&self) -> Vec<u8> {
        self.payload.to_string().into_bytes()
    }

    pub fn sha256(&self) -> String {
        hex::encode(Sha256::digest(self.raw()))
    }
}

/// Builds the JSON body the agent sends when `targets` are the declared configs.
pub fn agent_response(targets_version: u64, targets: &[TargetFixture]) -> String {
    let mut index = Map::new();
    for fixture in targets {
        index.insert(
            fixture.path.to_string(),
            json!({
                "length": fixture.raw().len(),
                "hashes": { "sha256": fixture.sha256() },
                "custom": { "v": fixture.version },
            }),
        );
    }
    let signed = json!({
        "signed": {
            "_type": "targets",
            "version": targets_version,
            "custom": { "opaque_backend_state": "backend-state" },
            "targets": index,
        },
        "signatures": [],
    });

    json!({
        "targets": STANDARD.encode(signed.to_string()),
        "target_files": targets
            .iter()
            .map(|fixture| json!({ "path": fixture.path, "raw": STANDARD.encode(fixture.raw()) }))
            .collect::<Vec<_>>(),
        "client_configs": targets.iter().map(|fixture| fixture.path).collect::<Vec<_>>(),
    })
    .to_string()
}
