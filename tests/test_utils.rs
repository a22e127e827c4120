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

//! Shared test utilities
//!
//! Host doubles with deterministic behaviour: a matcher driven by an explicit
//! set of true conditions and a fetcher whose responses are released by hand.

#![allow(dead_code)]

use async_trait::async_trait;
use exchange::{
    ChangeHub, CollectingErrorSink, ContentFetcher, EnvironmentMatcher, FetchError, Host,
    MemoryDocument,
};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Notify;

/// Matcher answering `true` for an explicit set of conditions
#[derive(Default)]
pub struct SetMatcher {
    holding: RwLock<HashSet<String>>,
}

impl SetMatcher {
    pub fn new(conditions: &[&str]) -> Self {
        let matcher = Self::default();
        matcher.set(conditions);
        matcher
    }

    pub fn set(&self, conditions: &[&str]) {
        *self.holding.write() = conditions.iter().map(|c| c.to_string()).collect();
    }
}

impl EnvironmentMatcher for SetMatcher {
    fn matches(&self, condition: &str) -> bool {
        self.holding.read().contains(condition)
    }
}

/// Fetcher whose responses wait until [`GatedFetcher::release`] is called
#[derive(Default)]
pub struct GatedFetcher {
    bodies: Mutex<HashMap<String, Result<String, FetchError>>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    requests: Mutex<Vec<String>>,
}

impl GatedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, body: &str) -> &Self {
        self.bodies.lock().insert(url.to_string(), Ok(body.to_string()));
        self
    }

    pub fn fail(&self, url: &str, error: FetchError) -> &Self {
        self.bodies.lock().insert(url.to_string(), Err(error));
        self
    }

    /// Let the (current or next) request for `url` complete
    pub fn release(&self, url: &str) {
        self.gate(url).notify_one();
    }

    /// URLs requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    fn gate(&self, url: &str) -> Arc<Notify> {
        Arc::clone(
            self.gates
                .lock()
                .entry(url.to_string())
                .or_insert_with(|| Arc::new(Notify::new())),
        )
    }
}

#[async_trait]
impl ContentFetcher for GatedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.requests.lock().push(url.to_string());
        self.gate(url).notified().await;
        self.bodies
            .lock()
            .get(url)
            .cloned()
            .unwrap_or(Err(FetchError::Status { status: 404 }))
    }
}

/// Host pieces kept around so tests can drive them
pub struct TestHost {
    pub document: Arc<MemoryDocument>,
    pub matcher: Arc<SetMatcher>,
    pub fetcher: Arc<GatedFetcher>,
    pub hub: Arc<ChangeHub>,
    pub sink: Arc<CollectingErrorSink>,
}

impl TestHost {
    pub fn new(document: MemoryDocument, conditions: &[&str]) -> Self {
        Self {
            document: Arc::new(document),
            matcher: Arc::new(SetMatcher::new(conditions)),
            fetcher: Arc::new(GatedFetcher::new()),
            hub: Arc::new(ChangeHub::new()),
            sink: Arc::new(CollectingErrorSink::new()),
        }
    }

    pub fn host(&self) -> Host {
        Host::new(
            self.document.clone(),
            self.matcher.clone(),
            self.fetcher.clone(),
            self.hub.clone(),
        )
        .with_sink(self.sink.clone())
    }
}
