// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Remote Configuration manager facade.
//!
//! The manager is split by concern: `core` owns the public handle and the
//! registries, `poll` runs one iteration against the agent, `diff` derives
//! the change set, `batch` runs pre-dispatch observers and `dispatch`
//! delivers changes to product handlers.

mod batch;
mod core;
mod diff;
mod dispatch;
mod poll;
mod state;
#[cfg(test)]
pub(crate) mod test_support;

pub use batch::{BatchHandlerId, ConfigDescriptor, UpdateTransaction};
pub use self::core::{client_id, RemoteConfigManager};
pub use state::ClientSnapshot;
