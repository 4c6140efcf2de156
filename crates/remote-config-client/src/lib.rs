// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Tracer-side Remote Configuration client.
//!
//! The crate polls the agent's `/v0.7/config` endpoint, keeps track of the
//! configurations currently applied in-process, computes the difference with
//! what the agent declares, and hands every change to the product handler
//! registered for it. Apply outcomes are reported back to the agent on the
//! following poll.
//!
//! A process should build exactly one [`RemoteConfigManager`] and share clones
//! of it; every clone drives the same poll loop and client state.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod apply_state;
pub mod capabilities;
pub mod config;
pub mod config_path;
pub mod error;
pub mod handler;
pub mod http;
pub mod manager;
pub mod scheduler;
pub mod store;
pub mod targets;
pub mod telemetry;

pub use apply_state::ApplyState;
pub use capabilities::{Capability, CapabilityMask};
pub use config::{ConfigError, RemoteConfigSettings};
pub use config_path::{parse_config_path, ConfigPath, ConfigPathSource};
pub use error::ParseError;
pub use handler::{Ack, AckStyle, Action, ProductHandler};
pub use http::{HttpError, HttpTransport, Transport, TransportResponse};
pub use manager::{
    client_id, BatchHandlerId, ClientSnapshot, ConfigDescriptor, RemoteConfigManager,
    UpdateTransaction,
};
pub use scheduler::{Done, Scheduler};
pub use store::{AppliedConfig, ConfigStore};
pub use telemetry::{CountingTelemetry, RemoteConfigTelemetry, TelemetryCounters, TelemetrySnapshot};
