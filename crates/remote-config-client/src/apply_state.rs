// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Lifecycle status of an applied configuration.

use std::fmt;

/// Apply state reported to the agent for every held configuration.
///
/// Items start as [`ApplyState::Unacknowledged`] whenever they are applied or
/// modified and settle on exactly one of the two terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ApplyState {
    #[default]
    Unacknowledged,
    Acknowledged,
    Error,
}

impl ApplyState {
    /// Numeric code used on the wire.
    pub fn as_u64(self) -> u64 {
        match self {
            Self::Unacknowledged => 1,
            Self::Acknowledged => 2,
            Self::Error => 3,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Unacknowledged)
    }
}

impl fmt::Display for ApplyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unacknowledged => "unacknowledged",
            Self::Acknowledged => "acknowledged",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}
