// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Exchange instance - the main entry point
//!
//! An [`Exchange`] owns its configuration and registry. Instances share
//! nothing, so several can run side by side on the same host.

use crate::config::ExchangeConfig;
use crate::element::{ElementDiscovery, discover_elements};
use crate::error::ExchangeError;
use crate::fetch::ContentFetcher;
use crate::matcher::EnvironmentMatcher;
use crate::notify::{ChangeNotifier, ListenerId, RESIZE_EVENT};
use crate::registry::{Capabilities, Registry};
use crate::sink::{ErrorSink, LogErrorSink};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Platform services an exchange runs against
#[derive(Clone)]
pub struct Host {
    /// Finds elements carrying the rule attribute
    pub discovery: Arc<dyn ElementDiscovery>,
    /// Evaluates conditions
    pub matcher: Arc<dyn EnvironmentMatcher>,
    /// Fetches markup for container elements
    pub fetcher: Arc<dyn ContentFetcher>,
    /// Delivers environment-change events
    pub notifier: Arc<dyn ChangeNotifier>,
    /// Receives recoverable errors
    pub sink: Arc<dyn ErrorSink>,
}

impl Host {
    /// Create a host reporting errors to the log
    pub fn new(
        discovery: Arc<dyn ElementDiscovery>,
        matcher: Arc<dyn EnvironmentMatcher>,
        fetcher: Arc<dyn ContentFetcher>,
        notifier: Arc<dyn ChangeNotifier>,
    ) -> Self {
        Self {
            discovery,
            matcher,
            fetcher,
            notifier,
            sink: Arc::new(LogErrorSink),
        }
    }

    /// Report errors to `sink` instead
    pub fn with_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::new(Arc::clone(&self.matcher), Arc::clone(&self.fetcher))
            .with_sink(Arc::clone(&self.sink))
    }
}

/// A running exchange instance
pub struct Exchange {
    config: ExchangeConfig,
    registry: Registry,
    notifier: Arc<dyn ChangeNotifier>,
    listener: ListenerId,
    events_tx: mpsc::UnboundedSender<()>,
    events: mpsc::UnboundedReceiver<()>,
}

impl Exchange {
    /// Start an exchange with the default configuration
    pub fn start(host: Host) -> Self {
        Self::init(ExchangeConfig::default(), None, host)
    }

    /// Apply `options` over `config`, bind every element found on the host,
    /// run the initial pass and subscribe to resize events.
    ///
    /// Invalid options are reported to the host's sink and otherwise ignored.
    pub fn init(mut config: ExchangeConfig, options: Option<&Value>, host: Host) -> Self {
        if let Some(options) = options {
            for err in config.apply_options(options) {
                host.sink.report(ExchangeError::Configuration(err));
            }
        }

        let attribute = config.attribute_name();
        let elements = discover_elements(host.discovery.as_ref(), &attribute);
        log::info!("Found {} elements carrying '{attribute}'", elements.len());

        let registry = Registry::initialize(
            elements,
            &config.media_queries,
            &attribute,
            host.capabilities(),
        );

        let (events_tx, events) = mpsc::unbounded_channel();
        let mut exchange = Self {
            config,
            registry,
            notifier: host.notifier,
            listener: ListenerId::unique(),
            events_tx,
            events,
        };
        exchange.subscribe();
        exchange
    }

    /// (Re-)register the resize listener. Calling this again never adds a
    /// second listener.
    pub fn subscribe(&mut self) {
        let events_tx = self.events_tx.clone();
        self.notifier.subscribe(
            RESIZE_EVENT,
            self.listener,
            Arc::new(move || {
                let _ = events_tx.send(());
            }),
        );
    }

    /// Re-evaluate every binding now. Returns the number of swaps.
    pub fn resize(&mut self) -> usize {
        self.registry.on_environment_change()
    }

    /// Handle every queued environment change and fetch completion without
    /// waiting. Returns the number of events handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while self.events.try_recv().is_ok() {
            self.registry.on_environment_change();
            handled += 1;
        }
        handled + self.registry.drain_completions()
    }

    /// Wait until every in-flight fetch has completed
    pub async fn settle(&mut self) {
        self.registry.settle().await;
    }

    /// Event loop: re-evaluate on each environment change and apply fetch
    /// completions as they arrive. Runs until the instance is dropped or
    /// the task is cancelled.
    pub async fn run(&mut self) {
        loop {
            tokio::select! {
                Some(()) = self.events.recv() => {
                    let swapped = self.registry.on_environment_change();
                    log::debug!("Environment changed, {swapped} bindings swapped");
                }
                Some(completion) = self.registry.next_completion() => {
                    self.registry.complete(completion);
                }
                else => break,
            }
        }
    }

    /// Effective configuration
    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// Bindings owned by this instance
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Mutable access to the bindings, for registering elements added later
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }
}

impl Drop for Exchange {
    fn drop(&mut self) {
        self.notifier.unsubscribe(RESIZE_EVENT, self.listener);
    }
}

impl std::fmt::Debug for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exchange")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("listener", &self.listener)
            .finish_non_exhaustive()
    }
}
