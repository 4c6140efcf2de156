// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory store of the configurations currently applied in-process.
//!
//! Items are shared as `Arc<AppliedConfig>`: the poll loop replaces whole
//! items on modification while acknowledgments from handlers keep a handle to
//! the exact item they were dispatched with. An acknowledgment that lands
//! after its item was replaced or removed therefore has no visible effect.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use remote_config_proto::{ConfigState, TargetFileHash, TargetFileMeta};
use serde_json::Value;

use crate::apply_state::ApplyState;

/// Fallback message recorded when a failure carries no text.
const DEFAULT_APPLY_ERROR: &str = "Error";

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ApplyStatus {
    state: ApplyState,
    error: String,
}

/// A configuration received from the agent together with its apply status.
#[derive(Debug)]
pub struct AppliedConfig {
    path: String,
    product: String,
    id: String,
    version: u64,
    length: u64,
    hashes: BTreeMap<String, String>,
    file: Arc<Value>,
    // State and error always change together.
    status: Mutex<ApplyStatus>,
}

/// Everything needed to build an [`AppliedConfig`].
#[derive(Debug, Clone)]
pub(crate) struct NewConfig {
    pub path: String,
    pub product: String,
    pub id: String,
    pub version: u64,
    pub length: u64,
    pub hashes: BTreeMap<String, String>,
    pub file: Value,
}

impl AppliedConfig {
    pub(crate) fn new(config: NewConfig) -> Self {
        Self {
            path: config.path,
            product: config.product,
            id: config.id,
            version: config.version,
            length: config.length,
            hashes: config.hashes,
            file: Arc::new(config.file),
            status: Mutex::new(ApplyStatus {
                state: ApplyState::Unacknowledged,
                error: String::new(),
            }),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn hashes(&self) -> &BTreeMap<String, String> {
        &self.hashes
    }

    pub fn sha256(&self) -> Option<&str> {
        self.hashes.get("sha256").map(String::as_str)
    }

    /// Decoded payload of the target file.
    pub fn file(&self) -> &Arc<Value> {
        &self.file
    }

    pub fn apply_state(&self) -> ApplyState {
        lock(&self.status).state
    }

    pub fn apply_error(&self) -> String {
        lock(&self.status).error.clone()
    }

    /// Moves a pending item to `ACKNOWLEDGED`. Terminal states are kept.
    pub(crate) fn acknowledge(&self) -> bool {
        let mut status = lock(&self.status);
        if status.state.is_terminal() {
            return false;
        }
        status.state = ApplyState::Acknowledged;
        status.error.clear();
        true
    }

    /// Moves a pending item to `ERROR`. Terminal states are kept.
    pub(crate) fn fail(&self, error: impl Into<String>) -> bool {
        let mut status = lock(&self.status);
        if status.state.is_terminal() {
            return false;
        }
        status.state = ApplyState::Error;
        status.error = non_empty_error(error.into());
        true
    }

    /// Records an outcome reported ahead of dispatch by an update observer.
    pub(crate) fn set_outcome(&self, state: ApplyState, error: String) {
        let mut status = lock(&self.status);
        status.state = state;
        status.error = match state {
            ApplyState::Error => non_empty_error(error),
            _ => String::new(),
        };
    }

    pub(crate) fn config_state(&self) -> ConfigState {
        let status = lock(&self.status);
        ConfigState {
            id: self.id.clone(),
            version: self.version,
            product: self.product.clone(),
            apply_state: status.state.as_u64(),
            apply_error: status.error.clone(),
        }
    }

    pub(crate) fn cached_target_file(&self) -> TargetFileMeta {
        TargetFileMeta {
            path: self.path.clone(),
            length: self.length,
            hashes: self
                .hashes
                .iter()
                .map(|(algorithm, hash)| TargetFileHash {
                    algorithm: algorithm.clone(),
                    hash: hash.clone(),
                })
                .collect(),
        }
    }
}

fn non_empty_error(error: String) -> String {
    if error.is_empty() {
        DEFAULT_APPLY_ERROR.to_string()
    } else {
        error
    }
}

/// Applied configurations keyed by target path.
#[derive(Debug, Default)]
pub struct ConfigStore {
    configs: Mutex<BTreeMap<String, Arc<AppliedConfig>>>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<Arc<AppliedConfig>> {
        lock(&self.configs).get(path).cloned()
    }

    /// Inserts or fully replaces the item stored under its path.
    pub(crate) fn insert(&self, config: Arc<AppliedConfig>) {
        lock(&self.configs).insert(config.path().to_string(), config);
    }

    pub(crate) fn remove(&self, path: &str) -> Option<Arc<AppliedConfig>> {
        lock(&self.configs).remove(path)
    }

    pub fn len(&self) -> usize {
        lock(&self.configs).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.configs).is_empty()
    }

    pub fn paths(&self) -> Vec<String> {
        lock(&self.configs).keys().cloned().collect()
    }

    /// Snapshot of every held item, ordered by path.
    pub fn values(&self) -> Vec<Arc<AppliedConfig>> {
        lock(&self.configs).values().cloned().collect()
    }

    pub(crate) fn config_states(&self) -> Vec<ConfigState> {
        lock(&self.configs)
            .values()
            .map(|config| config.config_state())
            .collect()
    }

    pub(crate) fn cached_target_files(&self) -> Vec<TargetFileMeta> {
        lock(&self.configs)
            .values()
            .map(|config| config.cached_target_file())
            .collect()
    }
}
