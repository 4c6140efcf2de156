// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Capability bit-set advertised to the agent.
//!
//! Capabilities accumulate as products are added, so the mask is not bounded
//! by a native integer width. It is stored as a growable little-endian byte
//! vector and rendered on the wire as the minimal big-endian byte string,
//! base64-encoded. An empty mask still renders one zero byte (`AA==`).

use std::fmt;
use std::ops::BitOr;

use base64::Engine;

/// A single named capability, identified by its bit position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Capability(u32);

impl Capability {
    pub const ASM_ACTIVATION: Capability = Capability(1);
    pub const ASM_IP_BLOCKING: Capability = Capability(2);
    pub const ASM_DD_RULES: Capability = Capability(3);
    pub const ASM_EXCLUSIONS: Capability = Capability(4);
    pub const ASM_REQUEST_BLOCKING: Capability = Capability(5);
    pub const ASM_RESPONSE_BLOCKING: Capability = Capability(6);
    pub const ASM_USER_BLOCKING: Capability = Capability(7);
    pub const ASM_CUSTOM_RULES: Capability = Capability(8);
    pub const ASM_CUSTOM_BLOCKING_RESPONSE: Capability = Capability(9);
    pub const ASM_TRUSTED_IPS: Capability = Capability(10);
    pub const ASM_API_SECURITY_SAMPLE_RATE: Capability = Capability(11);
    pub const APM_TRACING_SAMPLE_RATE: Capability = Capability(12);
    pub const APM_TRACING_LOGS_INJECTION: Capability = Capability(13);
    pub const APM_TRACING_HTTP_HEADER_TAGS: Capability = Capability(14);
    pub const APM_TRACING_CUSTOM_TAGS: Capability = Capability(15);
    pub const ASM_PROCESSOR_OVERRIDES: Capability = Capability(16);
    pub const ASM_CUSTOM_DATA_SCANNERS: Capability = Capability(17);
    pub const ASM_EXCLUSION_DATA: Capability = Capability(18);
    pub const APM_TRACING_ENABLED: Capability = Capability(19);
    pub const APM_TRACING_DATA_STREAMS_ENABLED: Capability = Capability(20);
    pub const ASM_RASP_SQLI: Capability = Capability(21);
    pub const ASM_RASP_LFI: Capability = Capability(22);
    pub const ASM_RASP_SSRF: Capability = Capability(23);
    pub const ASM_RASP_SHI: Capability = Capability(24);
    pub const ASM_RASP_XXE: Capability = Capability(25);
    pub const ASM_RASP_RCE: Capability = Capability(26);
    pub const ASM_RASP_NOSQLI: Capability = Capability(27);
    pub const ASM_RASP_XSS: Capability = Capability(28);
    pub const APM_TRACING_SAMPLE_RULES: Capability = Capability(29);
    pub const CSM_ACTIVATION: Capability = Capability(30);
    pub const ASM_AUTO_USER_INSTRUM_MODE: Capability = Capability(31);
    pub const ASM_ENDPOINT_FINGERPRINT: Capability = Capability(32);
    pub const ASM_SESSION_FINGERPRINT: Capability = Capability(33);
    pub const ASM_NETWORK_FINGERPRINT: Capability = Capability(34);
    pub const ASM_HEADER_FINGERPRINT: Capability = Capability(35);
    pub const ASM_TRUNCATION_RULES: Capability = Capability(36);
    pub const ASM_RASP_CMDI: Capability = Capability(37);
    pub const APM_TRACING_ENABLE_DYNAMIC_INSTRUMENTATION: Capability = Capability(38);
    pub const APM_TRACING_ENABLE_EXCEPTION_REPLAY: Capability = Capability(39);
    pub const APM_TRACING_ENABLE_CODE_ORIGIN: Capability = Capability(40);
    pub const APM_TRACING_ENABLE_LIVE_DEBUGGING: Capability = Capability(41);
    pub const ASM_DD_MULTICONFIG: Capability = Capability(42);
    pub const ASM_TRACE_TAGGING_RULES: Capability = Capability(43);
    pub const ASM_EXTENDED_DATA_COLLECTION: Capability = Capability(44);
    pub const APM_TRACING_MULTICONFIG: Capability = Capability(45);
    pub const FFE_FLAG_CONFIGURATION_RULES: Capability = Capability(46);

    /// Builds a capability for an arbitrary bit position.
    pub const fn from_bit(bit: u32) -> Self {
        Capability(bit)
    }

    pub const fn bit(self) -> u32 {
        self.0
    }
}

/// Growable capability bit-set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CapabilityMask {
    // Little-endian bytes; never ends with a zero byte.
    bytes: Vec<u8>,
}

impl CapabilityMask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mask with a single bit set.
    pub fn bit(index: u32) -> Self {
        let mut mask = Self::new();
        mask.set(index);
        mask
    }

    pub fn set(&mut self, index: u32) {
        let (byte, offset) = locate(index);
        if self.bytes.len() <= byte {
            self.bytes.resize(byte + 1, 0);
        }
        self.bytes[byte] |= 1 << offset;
    }

    pub fn clear(&mut self, index: u32) {
        let (byte, offset) = locate(index);
        if let Some(slot) = self.bytes.get_mut(byte) {
            *slot &= !(1 << offset);
        }
        self.normalize();
    }

    pub fn contains(&self, index: u32) -> bool {
        let (byte, offset) = locate(index);
        self.bytes
            .get(byte)
            .is_some_and(|slot| slot & (1 << offset) != 0)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Sets (`enabled = true`) or clears every bit of `mask`.
    pub fn update(&mut self, mask: &CapabilityMask, enabled: bool) {
        if enabled {
            if self.bytes.len() < mask.bytes.len() {
                self.bytes.resize(mask.bytes.len(), 0);
            }
            for (slot, bits) in self.bytes.iter_mut().zip(&mask.bytes) {
                *slot |= bits;
            }
        } else {
            for (slot, bits) in self.bytes.iter_mut().zip(&mask.bytes) {
                *slot &= !bits;
            }
            self.normalize();
        }
    }

    /// Minimal big-endian representation; an empty mask yields `[0]`.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.bytes.is_empty() {
            return vec![0];
        }
        self.bytes.iter().rev().copied().collect()
    }

    /// Parses a big-endian byte string. Leading zero bytes are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut mask = Self {
            bytes: bytes.iter().rev().copied().collect(),
        };
        mask.normalize();
        mask
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.to_bytes())
    }

    pub fn from_base64(encoded: &str) -> Result<Self, base64::DecodeError> {
        let bytes = base64::engine::general_purpose::STANDARD.decode(encoded.as_bytes())?;
        Ok(Self::from_bytes(&bytes))
    }

    /// Iterates over the positions of every set bit, lowest first.
    pub fn iter_bits(&self) -> impl Iterator<Item = u32> + '_ {
        self.bytes.iter().enumerate().flat_map(|(byte, slot)| {
            (0..8u32)
                .filter(move |offset| slot & (1 << offset) != 0)
                .map(move |offset| byte as u32 * 8 + offset)
        })
    }

    fn normalize(&mut self) {
        while self.bytes.last() == Some(&0) {
            self.bytes.pop();
        }
    }
}

fn locate(index: u32) -> (usize, u32) {
    ((index / 8) as usize, index % 8)
}

impl From<Capability> for CapabilityMask {
    fn from(capability: Capability) -> Self {
        CapabilityMask::bit(capability.bit())
    }
}

impl FromIterator<Capability> for CapabilityMask {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut mask = CapabilityMask::new();
        for capability in iter {
            mask.set(capability.bit());
        }
        mask
    }
}

impl BitOr for CapabilityMask {
    type Output = CapabilityMask;

    fn bitor(mut self, rhs: CapabilityMask) -> CapabilityMask {
        self.update(&rhs, true);
        self
    }
}

impl BitOr<Capability> for Capability {
    type Output = CapabilityMask;

    fn bitor(self, rhs: Capability) -> CapabilityMask {
        CapabilityMask::from(self) | CapabilityMask::from(rhs)
    }
}

impl BitOr<Capability> for CapabilityMask {
    type Output = CapabilityMask;

    fn bitor(self, rhs: Capability) -> CapabilityMask {
        self | CapabilityMask::from(rhs)
    }
}

impl fmt::Display for CapabilityMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}
