// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Reasons a poll response is rejected as a whole.
///
/// The message of the error is reported back to the agent on the next poll,
/// so the variants keep wording stable across releases.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Response body is not valid JSON or does not match the wire model.
    #[error("Invalid remote config response: {0}")]
    Response(#[source] serde_json::Error),
    /// The base64 `targets` blob does not decode into a signed index.
    #[error("Invalid targets metadata: {0}")]
    Targets(#[source] serde_json::Error),
    /// A declared config has no entry in the signed index.
    #[error("Unable to find target for path {0}")]
    MissingTarget(String),
    /// A declared config has no matching entry in `target_files`.
    #[error("Unable to find file for path {0}")]
    MissingFile(String),
    /// A declared path does not follow the `<namespace>/<product>/<id>/<name>` layout.
    #[error("Unable to parse path {0}")]
    MalformedPath(String),
    /// A target file does not contain a JSON document.
    #[error("Invalid content for path {path}: {source}")]
    FileContent {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
