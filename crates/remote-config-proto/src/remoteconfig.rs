// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

/// Body sent by a tracer on every poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientGetConfigsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<Client>,
    #[serde(deserialize_with = "crate::codec::nullable")]
    pub cached_target_files: Vec<TargetFileMeta>,
}

/// Identity and state of a single Remote Config client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Client {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ClientState>,
    #[serde(deserialize_with = "crate::codec::nullable")]
    pub id: String,
    #[serde(deserialize_with = "crate::codec::nullable")]
    pub products: Vec<String>,
    pub is_tracer: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_tracer: Option<ClientTracer>,
    /// Capability bit-set, big-endian, base64 on the wire.
    #[serde(with = "crate::codec::base64_bytes")]
    pub capabilities: Vec<u8>,
}

/// Apply-state bookkeeping reported back to the agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientState {
    pub root_version: u64,
    pub targets_version: u64,
    #[serde(deserialize_with = "crate::codec::nullable")]
    pub config_states: Vec<ConfigState>,
    pub has_error: bool,
    #[serde(deserialize_with = "crate::codec::nullable")]
    pub error: String,
    /// Opaque token echoed from the last signed targets index.
    #[serde(deserialize_with = "crate::codec::nullable")]
    pub backend_client_state: String,
}

/// Per-config apply state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigState {
    pub id: String,
    pub version: u64,
    pub product: String,
    pub apply_state: u64,
    #[serde(deserialize_with = "crate::codec::nullable")]
    pub apply_error: String,
}

/// Tracer metadata used by the agent for targeting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientTracer {
    #[serde(deserialize_with = "crate::codec::nullable")]
    pub runtime_id: String,
    #[serde(deserialize_with = "crate::codec::nullable")]
    pub language: String,
    #[serde(deserialize_with = "crate::codec::nullable")]
    pub tracer_version: String,
    #[serde(deserialize_with = "crate::codec::nullable")]
    pub service: String,
    #[serde(deserialize_with = "crate::codec::nullable")]
    pub env: String,
    #[serde(deserialize_with = "crate::codec::nullable")]
    pub app_version: String,
    #[serde(deserialize_with = "crate::codec::nullable")]
    pub extra_services: Vec<String>,
    #[serde(deserialize_with = "crate::codec::nullable")]
    pub tags: Vec<String>,
}

/// Integrity metadata of a target file the client already holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetFileMeta {
    pub path: String,
    pub length: u64,
    #[serde(deserialize_with = "crate::codec::nullable")]
    pub hashes: Vec<TargetFileHash>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetFileHash {
    pub algorithm: String,
    pub hash: String,
}

/// Agent answer to a [`ClientGetConfigsRequest`].
///
/// An up-to-date client receives `{}`, which deserialises to the default
/// (all fields empty).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientGetConfigsResponse {
    #[serde(
        with = "crate::codec::base64_list",
        skip_serializing_if = "crate::codec::is_empty"
    )]
    pub roots: Vec<Vec<u8>>,
    /// Base64-encoded JSON of the signed targets index.
    #[serde(
        with = "crate::codec::base64_bytes",
        skip_serializing_if = "crate::codec::is_empty"
    )]
    pub targets: Vec<u8>,
    #[serde(
        deserialize_with = "crate::codec::nullable",
        skip_serializing_if = "crate::codec::is_empty"
    )]
    pub target_files: Vec<File>,
    #[serde(
        deserialize_with = "crate::codec::nullable",
        skip_serializing_if = "crate::codec::is_empty"
    )]
    pub client_configs: Vec<String>,
}

/// Raw content of a target file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct File {
    pub path: String,
    #[serde(with = "crate::codec::base64_bytes")]
    pub raw: Vec<u8>,
}
