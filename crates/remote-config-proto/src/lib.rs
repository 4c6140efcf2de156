// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Wire models for the tracer-facing Remote Configuration endpoint.
//!
//! Tracers `POST` a [`ClientGetConfigsRequest`] describing their current state
//! to the agent's `/v0.7/config` endpoint and receive a
//! [`ClientGetConfigsResponse`] in return. Both bodies are JSON; binary fields
//! travel as standard base64 strings and explicit `null`s coming from other
//! tracer implementations deserialise to empty defaults.

pub(crate) mod codec {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// One byte string as a base64 string; `null` decodes to no bytes.
    pub mod base64_bytes {
        use super::*;

        pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&STANDARD.encode(bytes))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(encoded) => STANDARD.decode(encoded).map_err(serde::de::Error::custom),
                None => Ok(Vec::new()),
            }
        }
    }

    /// A list of byte strings as a list of base64 strings.
    pub mod base64_list {
        use super::*;

        pub fn serialize<S: Serializer>(
            items: &[Vec<u8>],
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            let encoded: Vec<String> = items.iter().map(|item| STANDARD.encode(item)).collect();
            encoded.serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<Vec<u8>>, D::Error> {
            Option::<Vec<String>>::deserialize(deserializer)?
                .unwrap_or_default()
                .iter()
                .map(|encoded| STANDARD.decode(encoded).map_err(serde::de::Error::custom))
                .collect()
        }
    }

    /// Reads an explicit `null` as the type's empty value.
    pub fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Default + Deserialize<'de>,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }

    pub fn is_empty<T>(items: &[T]) -> bool {
        items.is_empty()
    }
}

pub mod remoteconfig;

pub use remoteconfig::*;
