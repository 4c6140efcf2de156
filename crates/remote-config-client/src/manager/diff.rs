// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Difference between the configurations applied in-process and the ones the
//! agent declares.
//!
//! The computation is pure: it reads the store and the response and either
//! yields the full change set or rejects the response. Nothing is mutated
//! until the whole response has been validated.

use std::collections::HashSet;
use std::sync::Arc;

use remote_config_proto::ClientGetConfigsResponse;
use serde_json::Value;

use crate::config_path::parse_config_path;
use crate::error::ParseError;
use crate::store::{AppliedConfig, ConfigStore, NewConfig};
use crate::targets::parse_targets_document;

/// Signed index fields echoed back on the next request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct TargetsUpdate {
    pub(super) version: u64,
    pub(super) backend_client_state: String,
}

/// Change set derived from one poll response.
#[derive(Debug, Default)]
pub(super) struct PendingUpdate {
    /// Items currently held whose path is no longer declared.
    pub(super) to_unapply: Vec<Arc<AppliedConfig>>,
    /// Declared paths not held yet.
    pub(super) to_apply: Vec<Arc<AppliedConfig>>,
    /// Declared paths held with a different content hash.
    pub(super) to_modify: Vec<Arc<AppliedConfig>>,
    /// Present when the response carried a signed index.
    pub(super) targets: Option<TargetsUpdate>,
}

impl PendingUpdate {
    pub(super) fn is_empty(&self) -> bool {
        self.to_unapply.is_empty() && self.to_apply.is_empty() && self.to_modify.is_empty()
    }

    pub(super) fn find(&self, path: &str) -> Option<&Arc<AppliedConfig>> {
        self.to_unapply
            .iter()
            .chain(&self.to_apply)
            .chain(&self.to_modify)
            .find(|item| item.path() == path)
    }
}

/// Partitions the declared configs of `response` against `store`.
pub(super) fn compute_update(
    store: &ConfigStore,
    response: &ClientGetConfigsResponse,
) -> Result<PendingUpdate, ParseError> {
    let declared: HashSet<&str> = response.client_configs.iter().map(String::as_str).collect();
    let mut update = PendingUpdate {
        to_unapply: store
            .values()
            .into_iter()
            .filter(|item| !declared.contains(item.path()))
            .collect(),
        ..PendingUpdate::default()
    };

    // Without a signed index only removals can be derived.
    if response.targets.is_empty() {
        return Ok(update);
    }
    let targets = parse_targets_document(&response.targets)?;

    let mut seen = HashSet::new();
    for path in &response.client_configs {
        if !seen.insert(path.as_str()) {
            continue;
        }
        let meta = targets
            .signed
            .targets
            .get(path)
            .ok_or_else(|| ParseError::MissingTarget(path.clone()))?;

        let current = store.get(path);
        if let Some(current) = &current {
            if current.sha256() == meta.sha256() {
                continue;
            }
        }

        let file = response
            .target_files
            .iter()
            .find(|file| &file.path == path)
            .ok_or_else(|| ParseError::MissingFile(path.clone()))?;
        let parsed = parse_config_path(path)?;
        let content: Value =
            serde_json::from_slice(&file.raw).map_err(|source| ParseError::FileContent {
                path: path.clone(),
                source,
            })?;

        let item = Arc::new(AppliedConfig::new(NewConfig {
            path: path.clone(),
            product: parsed.product,
            id: parsed.id,
            version: meta.version(),
            length: meta.length,
            hashes: meta.hashes.clone(),
            file: content,
        }));
        if current.is_some() {
            update.to_modify.push(item);
        } else {
            update.to_apply.push(item);
        }
    }

    update.targets = Some(TargetsUpdate {
        version: targets.signed.version,
        backend_client_state: targets.opaque_backend_state().to_string(),
    });
    Ok(update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::test_support::{response_for, target, TargetSpec};
    use proptest::prelude::*;
    use std::collections::{BTreeMap, BTreeSet};

    fn parse(value: serde_json::Value) -> ClientGetConfigsResponse {
        serde_json::from_value(value).unwrap()
    }

    fn held(store: &ConfigStore, path: &str, content: serde_json::Value) {
        let spec = target(path, content);
        store.insert(Arc::new(AppliedConfig::new(NewConfig {
            path: path.to_string(),
            product: parse_config_path(path).unwrap().product,
            id: parse_config_path(path).unwrap().id,
            version: spec.version,
            length: spec.raw().len() as u64,
            hashes: BTreeMap::from([("sha256".to_string(), spec.sha256())]),
            file: spec.content.clone(),
        })));
    }

    fn paths(items: &[Arc<AppliedConfig>]) -> BTreeSet<String> {
        items.iter().map(|item| item.path().to_string()).collect()
    }

    #[test]
    fn new_paths_are_applied_and_changed_paths_modified() {
        let store = ConfigStore::new();
        held(&store, "datadog/2/ASM_FEATURES/same/config", serde_json::json!({"v": 1}));
        held(&store, "datadog/2/ASM_FEATURES/changed/config", serde_json::json!({"v": 1}));
        held(&store, "datadog/2/ASM_FEATURES/gone/config", serde_json::json!({"v": 1}));

        let response = parse(response_for(
            7,
            &[
                target("datadog/2/ASM_FEATURES/same/config", serde_json::json!({"v": 1})),
                target("datadog/2/ASM_FEATURES/changed/config", serde_json::json!({"v": 2})),
                target("employee/ASM_DD/new/config", serde_json::json!({"rules": []})),
            ],
        ));

        let update = compute_update(&store, &response).unwrap();

        assert_eq!(paths(&update.to_unapply), BTreeSet::from(["datadog/2/ASM_FEATURES/gone/config".to_string()]));
        assert_eq!(paths(&update.to_apply), BTreeSet::from(["employee/ASM_DD/new/config".to_string()]));
        assert_eq!(paths(&update.to_modify), BTreeSet::from(["datadog/2/ASM_FEATURES/changed/config".to_string()]));
        assert_eq!(
            update.targets,
            Some(TargetsUpdate {
                version: 7,
                backend_client_state: "state-7".to_string()
            })
        );

        let applied = update.find("employee/ASM_DD/new/config").unwrap();
        assert_eq!(applied.product(), "ASM_DD");
        assert_eq!(applied.id(), "new");
        assert_eq!(applied.version(), 1);
        assert_eq!(applied.file()["rules"], serde_json::json!([]));
        // The store is never touched by the computation.
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn missing_index_only_yields_removals() {
        let store = ConfigStore::new();
        held(&store, "datadog/2/ASM_FEATURES/kept/config", serde_json::json!({}));
        held(&store, "datadog/2/ASM_FEATURES/gone/config", serde_json::json!({}));

        let response = parse(serde_json::json!({
            "client_configs": ["datadog/2/ASM_FEATURES/kept/config", "datadog/2/ASM_FEATURES/unknown/config"]
        }));
        let update = compute_update(&store, &response).unwrap();

        assert_eq!(paths(&update.to_unapply), BTreeSet::from(["datadog/2/ASM_FEATURES/gone/config".to_string()]));
        assert!(update.to_apply.is_empty());
        assert!(update.to_modify.is_empty());
        assert!(update.targets.is_none());
    }

    #[test]
    fn inconsistent_responses_are_rejected() {
        let store = ConfigStore::new();
        let mut response = parse(response_for(
            1,
            &[target("datadog/2/ASM_FEATURES/a/config", serde_json::json!({}))],
        ));

        response.client_configs.push("datadog/2/ASM_FEATURES/b/config".to_string());
        let err = compute_update(&store, &response).unwrap_err();
        assert_eq!(err.to_string(), "Unable to find target for path datadog/2/ASM_FEATURES/b/config");

        response.client_configs.pop();
        response.target_files.clear();
        let err = compute_update(&store, &response).unwrap_err();
        assert_eq!(err.to_string(), "Unable to find file for path datadog/2/ASM_FEATURES/a/config");
    }

    #[test]
    fn malformed_paths_reject_the_response() {
        let response = parse(response_for(1, &[target("badformat", serde_json::json!({}))]));
        let err = compute_update(&ConfigStore::new(), &response).unwrap_err();
        assert!(matches!(err, ParseError::MalformedPath(ref path) if path == "badformat"));
    }

    #[test]
    fn non_json_files_are_rejected() {
        let mut spec = target("datadog/2/ASM_FEATURES/a/config", serde_json::json!({}));
        spec.raw_override = Some(b"not json".to_vec());
        let response = parse(response_for(1, &[spec]));
        let err = compute_update(&ConfigStore::new(), &response).unwrap_err();
        assert!(matches!(err, ParseError::FileContent { ref path, .. } if path == "datadog/2/ASM_FEATURES/a/config"));
    }

    #[test]
    fn duplicate_declarations_are_applied_once() {
        let mut response = parse(response_for(
            1,
            &[target("datadog/2/ASM_FEATURES/a/config", serde_json::json!({}))],
        ));
        response.client_configs.push("datadog/2/ASM_FEATURES/a/config".to_string());

        let update = compute_update(&ConfigStore::new(), &response).unwrap();
        assert_eq!(update.to_apply.len(), 1);
    }

    fn arb_world() -> impl Strategy<Value = (BTreeMap<u8, u8>, BTreeMap<u8, u8>)> {
        // Path index -> content revision, for held and declared configs.
        (
            proptest::collection::btree_map(0u8..12, 0u8..3, 0..8),
            proptest::collection::btree_map(0u8..12, 0u8..3, 0..8),
        )
    }

    fn world_path(index: u8) -> String {
        format!("datadog/2/ASM_FEATURES/config-{index}/config")
    }

    proptest! {
        #[test]
        fn partition_matches_set_difference((held_set, declared_set) in arb_world()) {
            let store = ConfigStore::new();
            for (index, revision) in &held_set {
                held(&store, &world_path(*index), serde_json::json!({ "revision": revision }));
            }
            let specs: Vec<TargetSpec> = declared_set
                .iter()
                .map(|(index, revision)| target(&world_path(*index), serde_json::json!({ "revision": revision })))
                .collect();
            let response = parse(response_for(1, &specs));

            let update = compute_update(&store, &response).unwrap();

            let expected_unapply: BTreeSet<String> = held_set.keys()
                .filter(|index| !declared_set.contains_key(*index))
                .map(|index| world_path(*index))
                .collect();
            let expected_apply: BTreeSet<String> = declared_set.keys()
                .filter(|index| !held_set.contains_key(*index))
                .map(|index| world_path(*index))
                .collect();
            let expected_modify: BTreeSet<String> = declared_set.iter()
                .filter(|(index, revision)| held_set.get(*index).is_some_and(|held| held != *revision))
                .map(|(index, _)| world_path(*index))
                .collect();

            let unapply = paths(&update.to_unapply);
            let apply = paths(&update.to_apply);
            let modify = paths(&update.to_modify);
            prop_assert_eq!(&unapply, &expected_unapply);
            prop_assert_eq!(&apply, &expected_apply);
            prop_assert_eq!(&modify, &expected_modify);
            prop_assert!(unapply.is_disjoint(&apply));
            prop_assert!(unapply.is_disjoint(&modify));
            prop_assert!(apply.is_disjoint(&modify));
        }
    }
}
