// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Serde shapes for the signed targets index carried in poll responses.
//!
//! The index arrives as base64-encoded JSON in the `targets` field. It is
//! replaced wholesale on every response that carries one. Signatures and
//! expiry dates are not checked here.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::Number;

use crate::error::ParseError;

/// Decoded `targets` blob of a poll response.
#[derive(Debug, Deserialize, Clone)]
pub struct TargetsDocument {
    pub signed: TargetsSigned,
}

/// Signed part of the index: one entry per declared path.
#[derive(Debug, Deserialize, Clone)]
pub struct TargetsSigned {
    /// Version of the index, echoed back as `targets_version`.
    #[serde(default, deserialize_with = "saturating_u64")]
    pub version: u64,
    #[serde(default)]
    pub expires: Option<String>,
    #[serde(default)]
    pub targets: BTreeMap<String, TargetDescription>,
    #[serde(default)]
    pub custom: Option<TargetsSignedCustom>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TargetsSignedCustom {
    /// Backend-provided opaque state echoed back as `backend_client_state`.
    #[serde(default)]
    pub opaque_backend_state: Option<String>,
}

/// Index entry of one target file.
#[derive(Debug, Deserialize, Clone)]
pub struct TargetDescription {
    #[serde(default, deserialize_with = "saturating_u64")]
    pub length: u64,
    /// Keyed by algorithm name.
    #[serde(default)]
    pub hashes: BTreeMap<String, String>,
    #[serde(default)]
    pub custom: Option<TargetCustom>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TargetCustom {
    #[serde(default, deserialize_with = "saturating_u64")]
    pub v: u64,
}

impl TargetDescription {
    /// Config version advertised by the backend (`custom.v`).
    pub fn version(&self) -> u64 {
        self.custom.as_ref().map_or(0, |custom| custom.v)
    }

    /// Hash used to detect content changes between polls.
    pub fn sha256(&self) -> Option<&str> {
        self.hashes.get("sha256").map(String::as_str)
    }
}

impl TargetsDocument {
    pub fn opaque_backend_state(&self) -> &str {
        self.signed
            .custom
            .as_ref()
            .and_then(|custom| custom.opaque_backend_state.as_deref())
            .unwrap_or_default()
    }
}

/// Reads any JSON number (or `null`) as a `u64`, clamping negatives to 0 and
/// truncating fractions, so an odd counter never rejects the whole index.
fn saturating_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<Number>::deserialize(deserializer)? else {
        return Ok(0);
    };
    if let Some(value) = number.as_u64() {
        return Ok(value);
    }
    if number.as_i64().is_some() {
        return Ok(0);
    }
    // `as` saturates and maps NaN to 0.
    Ok(number.as_f64().map_or(0, |value| value as u64))
}

/// Parses the decoded `targets` bytes of a poll response.
pub fn parse_targets_document(bytes: &[u8]) -> Result<TargetsDocument, ParseError> {
    serde_json::from_slice(bytes).map_err(ParseError::Targets)
}
