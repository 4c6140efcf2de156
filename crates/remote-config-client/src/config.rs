// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Environment-driven settings for the Remote Configuration client.
//!
//! Defaults follow the tracer conventions: Remote Configuration is enabled
//! and the agent listening on `localhost:8126` is polled every five seconds,
//! each request being abandoned after two.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::http::HttpError;

const ENV_ENABLED: &str = "DD_REMOTE_CONFIGURATION_ENABLED";
/// Poll interval expressed in (possibly fractional) seconds.
const ENV_POLL_INTERVAL: &str = "DD_REMOTE_CONFIG_POLL_INTERVAL_SECONDS";
/// Bound on one agent request, in (possibly fractional) seconds.
const ENV_REQUEST_TIMEOUT: &str = "DD_REMOTE_CONFIG_REQUEST_TIMEOUT_SECONDS";
/// Full agent URL, takes precedence over host and port.
const ENV_AGENT_URL: &str = "DD_TRACE_AGENT_URL";
const ENV_AGENT_HOST: &str = "DD_AGENT_HOST";
const ENV_AGENT_PORT: &str = "DD_TRACE_AGENT_PORT";
const ENV_SERVICE: &str = "DD_SERVICE";
const ENV_ENV: &str = "DD_ENV";
const ENV_VERSION: &str = "DD_VERSION";
/// Global tags, `key:value` pairs separated by commas or spaces.
const ENV_TAGS: &str = "DD_TAGS";
const ENV_GIT_REPOSITORY_URL: &str = "DD_GIT_REPOSITORY_URL";
const ENV_GIT_COMMIT_SHA: &str = "DD_GIT_COMMIT_SHA";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_AGENT_HOST: &str = "localhost";
const DEFAULT_AGENT_PORT: u16 = 8126;
/// Language reported in the `client_tracer` block.
pub const DEFAULT_LANGUAGE: &str = "rust";

/// Errors raised when settings cannot be turned into a running client.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `DD_REMOTE_CONFIGURATION_ENABLED` turned the client off.
    #[error("remote configuration is disabled")]
    Disabled,
    /// The HTTP transport could not be created from the agent URL.
    #[error("unable to build agent transport: {0}")]
    Transport(#[from] HttpError),
}

/// Settings used to build a [`crate::RemoteConfigManager`].
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteConfigSettings {
    /// `false` keeps [`crate::RemoteConfigManager::from_settings`] from building a client.
    pub enabled: bool,
    /// Delay between the end of a poll and the start of the next one.
    pub poll_interval: Duration,
    /// Time allowed for one poll request before it is abandoned.
    pub request_timeout: Duration,
    /// Base URL of the agent (scheme, host and port).
    pub agent_url: String,
    /// Per-process identifier reported as `client_tracer.runtime_id`.
    pub runtime_id: String,
    pub language: String,
    pub tracer_version: String,
    pub service: String,
    pub env: String,
    pub app_version: String,
    /// Global tags as `(key, value)` pairs.
    pub tags: Vec<(String, String)>,
    pub repository_url: Option<String>,
    pub commit_sha: Option<String>,
}

impl Default for RemoteConfigSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            agent_url: agent_url_from_parts(None, None),
            runtime_id: uuid::Uuid::new_v4().to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            tracer_version: env!("CARGO_PKG_VERSION").to_string(),
            service: String::new(),
            env: String::new(),
            app_version: String::new(),
            tags: Vec::new(),
            repository_url: None,
            commit_sha: None,
        }
    }
}

impl RemoteConfigSettings {
    /// Reads `DD_*` variables of the running process.
    pub fn from_os_env() -> Self {
        Self::from_env_iter(env::vars())
    }

    /// Reads `DD_*` variables from `iter`; unknown keys are ignored.
    pub fn from_env_iter<I, K, V>(iter: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: HashMap<String, String> = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let get = |key: &str| map.get(key).and_then(|value| sanitize_non_empty(value));

        let enabled = parse_bool(map.get(ENV_ENABLED).map(String::as_str), true);
        let poll_interval = parse_seconds(
            ENV_POLL_INTERVAL,
            map.get(ENV_POLL_INTERVAL).map(String::as_str),
            DEFAULT_POLL_INTERVAL,
        );
        let request_timeout = parse_seconds(
            ENV_REQUEST_TIMEOUT,
            map.get(ENV_REQUEST_TIMEOUT).map(String::as_str),
            DEFAULT_REQUEST_TIMEOUT,
        );
        let agent_url = get(ENV_AGENT_URL)
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| {
                agent_url_from_parts(get(ENV_AGENT_HOST).as_deref(), get(ENV_AGENT_PORT).as_deref())
            });

        Self {
            enabled,
            poll_interval,
            request_timeout,
            agent_url,
            service: get(ENV_SERVICE).unwrap_or_default(),
            env: get(ENV_ENV).unwrap_or_default(),
            app_version: get(ENV_VERSION).unwrap_or_default(),
            tags: get(ENV_TAGS).as_deref().map(parse_tags).unwrap_or_default(),
            repository_url: get(ENV_GIT_REPOSITORY_URL),
            commit_sha: get(ENV_GIT_COMMIT_SHA),
            ..Self::default()
        }
    }

    /// Tags reported in `client_tracer.tags`, git metadata last.
    pub fn tracer_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self
            .tags
            .iter()
            .map(|(key, value)| format!("{key}:{value}"))
            .collect();
        if let Some(repository_url) = &self.repository_url {
            tags.push(format!("git.repository_url:{repository_url}"));
            if let Some(commit_sha) = &self.commit_sha {
                tags.push(format!("git.commit.sha:{commit_sha}"));
            }
        }
        tags
    }
}

fn agent_url_from_parts(host: Option<&str>, port: Option<&str>) -> String {
    let host = host.unwrap_or(DEFAULT_AGENT_HOST);
    let port = match port.map(str::parse::<u16>) {
        Some(Ok(port)) => port,
        Some(Err(_)) => {
            warn!("[RC] Ignoring invalid {ENV_AGENT_PORT}, using {DEFAULT_AGENT_PORT}");
            DEFAULT_AGENT_PORT
        }
        None => DEFAULT_AGENT_PORT,
    };
    // Bare IPv6 literals need brackets in a URL authority.
    if host.contains(':') && !host.starts_with('[') {
        format!("http://[{host}]:{port}")
    } else {
        format!("http://{host}:{port}")
    }
}

/// Positive, finite seconds; anything else keeps `default`.
fn parse_seconds(name: &str, value: Option<&str>, default: Duration) -> Duration {
    let Some(raw) = value.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return default;
    };
    match raw.parse::<f64>() {
        Ok(seconds) if seconds.is_finite() && seconds > 0.0 => Duration::from_secs_f64(seconds),
        _ => {
            warn!(
                "[RC] Ignoring invalid {name} value {raw:?}, using {}s",
                default.as_secs_f64()
            );
            default
        }
    }
}

fn parse_tags(raw: &str) -> Vec<(String, String)> {
    raw.split([',', ' '])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .filter_map(|item| {
            let (key, value) = item.split_once(':').unwrap_or((item, ""));
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// `None` for blank values.
fn sanitize_non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Unrecognised values keep `default`.
fn parse_bool(value: Option<&str>, default: bool) -> bool {
    let Some(value) = value.map(str::trim) else {
        return default;
    };
    let is = |words: &[&str]| words.iter().any(|word| value.eq_ignore_ascii_case(word));
    if is(&["1", "true", "t", "yes", "y"]) {
        true
    } else if is(&["0", "false", "f", "no", "n"]) {
        false
    } else {
        default
    }
}
