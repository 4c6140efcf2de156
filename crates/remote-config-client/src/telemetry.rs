// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Telemetry hooks for the Remote Configuration client.
//!
//! Embedders implement [`RemoteConfigTelemetry`] to observe poll outcomes and
//! handler dispatches without reaching into the manager state. The
//! [`CountingTelemetry`] implementation keeps atomic counters that can be
//! exported through any metric backend.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::ParseError;
use crate::handler::Action;
use crate::http::HttpError;

/// Telemetry hook invoked on significant client events.
pub trait RemoteConfigTelemetry: Send + Sync {
    /// Called after the agent answered a poll with a 2xx status.
    fn on_poll_success(&self) {}
    /// Called when a poll fails at the transport level or with an unexpected status.
    fn on_transport_error(&self, _error: &HttpError) {}
    /// Called when the agent answers 404, meaning Remote Configuration is disabled.
    fn on_remote_config_disabled(&self) {}
    /// Called when a poll response is rejected as a whole.
    fn on_parse_error(&self, _error: &ParseError) {}
    /// Called for every handler invocation.
    fn on_dispatch(&self, _action: Action, _product: &str) {}
}

/// Hook installed until the embedder provides one.
#[derive(Debug, Default)]
pub(crate) struct NoopTelemetry;

impl RemoteConfigTelemetry for NoopTelemetry {}

/// Event counts shared between a [`CountingTelemetry`] and its readers.
#[derive(Debug, Default)]
pub struct TelemetryCounters {
    poll_success: AtomicU64,
    transport_error: AtomicU64,
    disabled: AtomicU64,
    parse_error: AtomicU64,
    dispatch_apply: AtomicU64,
    dispatch_modify: AtomicU64,
    dispatch_unapply: AtomicU64,
}

impl TelemetryCounters {
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            poll_success: self.poll_success.load(Ordering::Relaxed),
            transport_error: self.transport_error.load(Ordering::Relaxed),
            disabled: self.disabled.load(Ordering::Relaxed),
            parse_error: self.parse_error.load(Ordering::Relaxed),
            dispatch_apply: self.dispatch_apply.load(Ordering::Relaxed),
            dispatch_modify: self.dispatch_modify.load(Ordering::Relaxed),
            dispatch_unapply: self.dispatch_unapply.load(Ordering::Relaxed),
        }
    }
}

/// Counter values read at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    /// Number of polls answered with a 2xx status.
    pub poll_success: u64,
    /// Number of polls that failed before a usable answer was received.
    pub transport_error: u64,
    /// Number of polls answered with 404.
    pub disabled: u64,
    /// Number of responses rejected by the parser.
    pub parse_error: u64,
    /// Number of `apply` handler invocations.
    pub dispatch_apply: u64,
    /// Number of `modify` handler invocations.
    pub dispatch_modify: u64,
    /// Number of `unapply` handler invocations.
    pub dispatch_unapply: u64,
}

impl fmt::Display for TelemetrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "poll_success={}, transport_error={}, disabled={}, parse_error={}, dispatch_apply={}, dispatch_modify={}, dispatch_unapply={}",
            self.poll_success,
            self.transport_error,
            self.disabled,
            self.parse_error,
            self.dispatch_apply,
            self.dispatch_modify,
            self.dispatch_unapply
        )
    }
}

/// Hook counting every event it observes.
#[derive(Debug, Clone)]
pub struct CountingTelemetry {
    counters: Arc<TelemetryCounters>,
}

impl CountingTelemetry {
    /// Counts into `counters`, which may be shared with other hooks.
    pub fn new(counters: Arc<TelemetryCounters>) -> Self {
        Self { counters }
    }

    pub fn counters(&self) -> Arc<TelemetryCounters> {
        self.counters.clone()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.counters.snapshot()
    }
}

impl Default for CountingTelemetry {
    fn default() -> Self {
        Self::new(Arc::new(TelemetryCounters::default()))
    }
}

impl RemoteConfigTelemetry for CountingTelemetry {
    fn on_poll_success(&self) {
        self.counters.poll_success.fetch_add(1, Ordering::Relaxed);
    }

    fn on_transport_error(&self, _error: &HttpError) {
        self.counters
            .transport_error
            .fetch_add(1, Ordering::Relaxed);
    }

    fn on_remote_config_disabled(&self) {
        self.counters.disabled.fetch_add(1, Ordering::Relaxed);
    }

    fn on_parse_error(&self, _error: &ParseError) {
        self.counters.parse_error.fetch_add(1, Ordering::Relaxed);
    }

    fn on_dispatch(&self, action: Action, _product: &str) {
        let counter = match action {
            Action::Apply => &self.counters.dispatch_apply,
            Action::Modify => &self.counters.dispatch_modify,
            Action::Unapply => &self.counters.dispatch_unapply,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}
