// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Parsing of Remote Config target paths.
//!
//! Two layouts are accepted: `datadog/<org>/<product>/<id>/<name>` and
//! `employee/<product>/<id>/<name>`. Anything else is rejected, which makes
//! the whole poll response invalid.

use crate::error::ParseError;

/// Namespace a target path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPathSource {
    /// Customer configs scoped to a numeric org.
    Datadog,
    /// Internal configs.
    Employee,
}

/// Structured view of a target path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPath {
    pub source: ConfigPathSource,
    /// Selects the product handler.
    pub product: String,
    /// Opaque identifier handed to the product handler.
    pub id: String,
}

/// Extracts the product and config id from `path`.
pub fn parse_config_path(path: &str) -> Result<ConfigPath, ParseError> {
    let segments: Vec<&str> = path.split('/').collect();
    let (source, rest) = match segments.as_slice() {
        ["datadog", org, rest @ ..] if is_org_id(org) => (ConfigPathSource::Datadog, rest),
        ["employee", rest @ ..] => (ConfigPathSource::Employee, rest),
        _ => return Err(ParseError::MalformedPath(path.to_string())),
    };
    match rest {
        [product, id, name] if !product.is_empty() && !id.is_empty() && !name.is_empty() => {
            Ok(ConfigPath {
                source,
                product: (*product).to_string(),
                id: (*id).to_string(),
            })
        }
        _ => Err(ParseError::MalformedPath(path.to_string())),
    }
}

fn is_org_id(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}
