// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP transport towards the local Datadog agent.
//!
//! The manager only depends on the [`Transport`] trait so embedders can plug
//! their own exchange (and tests can script responses). [`HttpTransport`] is
//! the default reqwest-backed implementation. It never interprets the status
//! code: 404 and 5xx answers are returned as responses and classified by the
//! poll loop.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use thiserror::Error;

/// Agent endpoint polled by tracer clients.
pub const CONFIG_ENDPOINT: &str = "/v0.7/config";

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Failures raised while exchanging a poll with the agent.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Transport-level issue (DNS, TLS, socket, timeout, etc.).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The agent answered with a status that is neither 2xx nor 404.
    #[error("unexpected status: {0}")]
    Status(u16),
    /// The agent URL cannot be used as a request base.
    #[error("invalid agent url: {0}")]
    InvalidUrl(String),
}

/// Raw answer to a poll request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Request/response exchange used by the poll loop.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Posts a serialised client state and returns whatever the agent answered.
    async fn post_config(&self, body: Vec<u8>) -> Result<TransportResponse, HttpError>;
}

/// reqwest-backed [`Transport`] posting to `<agent url>/v0.7/config`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    url: String,
}

impl HttpTransport {
    /// Builds a transport for the agent reachable at `agent_url`.
    ///
    /// `timeout` bounds every request, including reading the body.
    pub fn new(agent_url: &str, timeout: Option<Duration>) -> Result<Self, HttpError> {
        let base = agent_url.trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(HttpError::InvalidUrl(agent_url.to_string()));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            url: format!("{base}{CONFIG_ENDPOINT}"),
        })
    }

    /// Full URL requests are posted to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_config(&self, body: Vec<u8>) -> Result<TransportResponse, HttpError> {
        tracing::debug!(url = %self.url, body_len = body.len(), "[RC] Sending poll request");

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))
            .body(body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        tracing::debug!(
            url = %self.url,
            status = status,
            content_length = body.len(),
            "[RC] Received poll response"
        );
        Ok(TransportResponse::new(status, body.to_vec()))
    }
}
