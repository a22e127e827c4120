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

//! Content application
//!
//! Image-like elements are updated in place. Every other element gets its
//! markup from a background fetch whose result comes back as a tagged
//! [`FetchCompletion`] message; the registry decides whether it is still
//! current before touching the element.

use crate::binding::BindingId;
use crate::element::{ElementHandle, ElementKind};
use crate::error::FetchError;
use crate::fetch::ContentFetcher;
use crate::rule::Rule;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

/// Outcome of applying a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Application {
    /// Content was written synchronously
    Applied,
    /// A fetch is in flight; its completion arrives later
    Pending,
}

/// Result of a background fetch, tagged with the condition that started it
#[derive(Debug, Clone, PartialEq)]
pub struct FetchCompletion {
    /// Binding the fetch was issued for
    pub binding: BindingId,
    /// Active condition at the time the fetch started
    pub tag: String,
    /// Requested content source
    pub url: String,
    /// Body, or why it could not be fetched
    pub result: Result<String, FetchError>,
}

/// Applies winning rules to elements
pub struct ContentApplier {
    fetcher: Arc<dyn ContentFetcher>,
    completions: mpsc::UnboundedSender<FetchCompletion>,
    in_flight: AtomicUsize,
}

impl ContentApplier {
    /// Create an applier and the receiving end of its completion channel
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
    ) -> (Self, mpsc::UnboundedReceiver<FetchCompletion>) {
        let (completions, receiver) = mpsc::unbounded_channel();
        let applier = Self {
            fetcher,
            completions,
            in_flight: AtomicUsize::new(0),
        };
        (applier, receiver)
    }

    /// Apply `rule` to `element`. Never waits for network work.
    pub fn apply(&self, binding: BindingId, rule: &Rule, element: &ElementHandle) -> Application {
        match element.kind() {
            ElementKind::Image => {
                element.set_source(&rule.content_source);
                Application::Applied
            }
            ElementKind::Container => {
                self.spawn_fetch(binding, rule);
                Application::Pending
            }
        }
    }

    /// Fetches started and not yet completed
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub(crate) fn mark_completed(&self) {
        if self
            .in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_err()
        {
            log::warn!("Fetch completion without a matching in-flight request");
        }
    }

    fn spawn_fetch(&self, binding: BindingId, rule: &Rule) {
        self.in_flight.fetch_add(1, Ordering::AcqRel);

        let fetcher = Arc::clone(&self.fetcher);
        let completions = self.completions.clone();
        let tag = rule.condition.clone();
        let url = rule.content_source.clone();

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                let _ = completions.send(FetchCompletion {
                    binding,
                    tag,
                    url,
                    result: Err(FetchError::Transport {
                        message: "no async runtime available".to_string(),
                    }),
                });
                return;
            }
        };

        handle.spawn(async move {
            let result = fetcher.fetch(&url).await;
            if completions
                .send(FetchCompletion {
                    binding,
                    tag,
                    url,
                    result,
                })
                .is_err()
            {
                log::trace!("Registry dropped before fetch completed");
            }
        });
    }
}
