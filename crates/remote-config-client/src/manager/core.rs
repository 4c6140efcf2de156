// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Remote Configuration manager orchestration.
//!
//! [`RemoteConfigManager`] is a cheap handle over shared internals. The poll
//! loop is driven by a [`Scheduler`] that only runs while at least one product
//! is subscribed, so an idle process never polls the agent.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock, Weak};

use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use super::batch::{BatchHandler, BatchHandlerId, UpdateTransaction};
use super::state::{ClientSnapshot, ClientStateTracker};
use crate::capabilities::CapabilityMask;
use crate::config::{ConfigError, RemoteConfigSettings};
use crate::handler::ProductHandler;
use crate::http::{HttpTransport, Transport};
use crate::scheduler::Scheduler;
use crate::store::{lock, AppliedConfig, ConfigStore};
use crate::telemetry::{NoopTelemetry, RemoteConfigTelemetry};

static CLIENT_ID: OnceLock<String> = OnceLock::new();

/// Identifier of this process towards the agent, generated on first use.
pub fn client_id() -> &'static str {
    CLIENT_ID.get_or_init(|| uuid::Uuid::new_v4().to_string())
}

/// Shared internals used by the public handle and the poll loop.
pub(crate) struct ManagerInner {
    /// Identity reported in `client_tracer`.
    pub(super) settings: RemoteConfigSettings,
    pub(super) transport: Arc<dyn Transport>,
    /// Configurations currently applied, keyed by path.
    pub(super) store: ConfigStore,
    pub(super) state: Mutex<ClientStateTracker>,
    pub(super) handlers: Mutex<HashMap<String, ProductHandler>>,
    pub(super) batch_handlers: Mutex<Vec<Arc<BatchHandler>>>,
    next_batch_handler_id: AtomicU64,
    telemetry: RwLock<Arc<dyn RemoteConfigTelemetry>>,
    /// Serialises scheduled polls with polls triggered through the API.
    pub(super) poll_lock: AsyncMutex<()>,
    scheduler: Scheduler,
}

impl ManagerInner {
    pub(super) fn telemetry(&self) -> Arc<dyn RemoteConfigTelemetry> {
        self.telemetry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Client keeping in-process configuration in sync with the agent.
///
/// Build one per process and share clones; every clone drives the same
/// state and poll loop.
#[derive(Clone)]
pub struct RemoteConfigManager {
    inner: Arc<ManagerInner>,
}

impl std::fmt::Debug for RemoteConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfigManager")
            .field("agent_url", &self.inner.settings.agent_url)
            .field("scheduler", &self.inner.scheduler)
            .field("applied", &self.inner.store.len())
            .finish()
    }
}

impl RemoteConfigManager {
    /// Creates a manager exchanging polls through `transport`.
    ///
    /// Polling starts with the first subscribed product.
    pub fn new(settings: RemoteConfigSettings, transport: Arc<dyn Transport>) -> Self {
        let interval = settings.poll_interval;
        let inner = Arc::new_cyclic(|weak: &Weak<ManagerInner>| {
            let weak = weak.clone();
            let scheduler = Scheduler::new(interval, move |done| {
                let weak = weak.clone();
                tokio::spawn(async move {
                    if let Some(inner) = weak.upgrade() {
                        inner.poll().await;
                    }
                    done.done();
                });
            });
            ManagerInner {
                settings,
                transport,
                store: ConfigStore::new(),
                state: Mutex::new(ClientStateTracker::default()),
                handlers: Mutex::new(HashMap::new()),
                batch_handlers: Mutex::new(Vec::new()),
                next_batch_handler_id: AtomicU64::new(1),
                telemetry: RwLock::new(Arc::new(NoopTelemetry)),
                poll_lock: AsyncMutex::new(()),
                scheduler,
            }
        });
        Self { inner }
    }

    /// Creates a manager polling the agent over HTTP as configured by `settings`.
    pub fn from_settings(settings: RemoteConfigSettings) -> Result<Self, ConfigError> {
        if !settings.enabled {
            return Err(ConfigError::Disabled);
        }
        let transport = HttpTransport::new(&settings.agent_url, Some(settings.request_timeout))?;
        Ok(Self::new(settings, Arc::new(transport)))
    }

    pub fn settings(&self) -> &RemoteConfigSettings {
        &self.inner.settings
    }

    pub fn set_telemetry(&self, telemetry: Arc<dyn RemoteConfigTelemetry>) {
        *self
            .inner
            .telemetry
            .write()
            .unwrap_or_else(PoisonError::into_inner) = telemetry;
    }

    /// Sets (`enabled = true`) or clears every capability bit of `mask`.
    pub fn update_capabilities(&self, mask: impl Into<CapabilityMask>, enabled: bool) {
        let mask = mask.into();
        lock(&self.inner.state)
            .capabilities
            .update(&mask, enabled);
    }

    pub fn capabilities(&self) -> CapabilityMask {
        lock(&self.inner.state).capabilities.clone()
    }

    /// Registers `handler` for `product` and subscribes to it.
    ///
    /// A handler already registered for `product` is replaced.
    pub fn set_product_handler(&self, product: impl Into<String>, handler: ProductHandler) {
        let product = product.into();
        debug!(product = %product, style = ?handler.style(), "[RC] Registering product handler");
        lock(&self.inner.handlers).insert(product.clone(), handler);
        self.subscribe_products([product]);
    }

    /// Unregisters the handler of `product` and unsubscribes from it.
    pub fn remove_product_handler(&self, product: &str) {
        lock(&self.inner.handlers).remove(product);
        self.unsubscribe_products([product]);
    }

    /// Subscribes to `products` without registering handlers.
    ///
    /// Starts the poll loop if it is not running yet, including a loop that
    /// could not start earlier because no tokio runtime was available.
    pub fn subscribe_products<I, S>(&self, products: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        // Loop state follows `products`; both change under the state lock.
        let mut state = lock(&self.inner.state);
        state.subscribe(products.into_iter().map(Into::into));
        if !state.products.is_empty() {
            self.inner.scheduler.start();
        }
    }

    /// Unsubscribes from `products`; registered handlers are kept.
    pub fn unsubscribe_products<'a, I>(&self, products: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut state = lock(&self.inner.state);
        state.unsubscribe(products);
        if state.products.is_empty() {
            self.inner.scheduler.stop();
        }
    }

    pub fn products(&self) -> Vec<String> {
        lock(&self.inner.state).products.clone()
    }

    /// Registers an observer invoked once per update, before dispatch, with the
    /// changes concerning `products`. Does not subscribe to `products`.
    pub fn set_batch_handler<I, S, F>(&self, products: I, handler: F) -> BatchHandlerId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&mut UpdateTransaction) + Send + Sync + 'static,
    {
        let id = BatchHandlerId(
            self.inner
                .next_batch_handler_id
                .fetch_add(1, Ordering::Relaxed),
        );
        let products: HashSet<String> = products.into_iter().map(Into::into).collect();
        lock(&self.inner.batch_handlers).push(Arc::new(BatchHandler {
            id,
            products,
            handler: Arc::new(handler),
        }));
        id
    }

    /// Returns `false` when `id` was not registered.
    pub fn remove_batch_handler(&self, id: BatchHandlerId) -> bool {
        let mut handlers = lock(&self.inner.batch_handlers);
        let before = handlers.len();
        handlers.retain(|entry| entry.id != id);
        handlers.len() != before
    }

    /// Replaces the services reported in `client_tracer.extra_services`.
    pub fn set_extra_services<I, S>(&self, services: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        lock(&self.inner.state).extra_services = services.into_iter().map(Into::into).collect();
    }

    /// Runs one poll iteration now, waiting for any in-flight one first.
    pub async fn poll_once(&self) {
        self.inner.poll().await;
    }

    pub fn is_polling(&self) -> bool {
        self.inner.scheduler.is_running()
    }

    /// Lets tests drive every poll through [`Self::poll_once`].
    #[cfg(test)]
    pub(super) fn stop_polling(&self) {
        self.inner.scheduler.stop();
    }

    pub fn applied_config(&self, path: &str) -> Option<Arc<AppliedConfig>> {
        self.inner.store.get(path)
    }

    /// Every applied configuration, ordered by path.
    pub fn applied_configs(&self) -> Vec<Arc<AppliedConfig>> {
        self.inner.store.values()
    }

    pub fn snapshot(&self) -> ClientSnapshot {
        let config_states = self.inner.store.config_states();
        lock(&self.inner.state).snapshot(client_id(), config_states)
    }
}
