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

//! Binding registry
//!
//! Owns every binding, runs the initial resolution pass and re-evaluates all
//! bindings on environment changes. Fetch completions are applied here, on
//! the thread that owns the registry, after a staleness check.

use crate::alias::AliasTable;
use crate::applier::{Application, ContentApplier, FetchCompletion};
use crate::binding::{Binding, BindingId};
use crate::element::{ElementHandle, same_element};
use crate::error::{ContentLoadError, ExchangeError, MalformedRuleError};
use crate::fetch::ContentFetcher;
use crate::matcher::EnvironmentMatcher;
use crate::parser::RuleParser;
use crate::resolver::Resolver;
use crate::sink::{ErrorSink, LogErrorSink};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Host capabilities the registry needs
#[derive(Clone)]
pub struct Capabilities {
    /// Condition matcher
    pub matcher: Arc<dyn EnvironmentMatcher>,
    /// Markup fetcher for container elements
    pub fetcher: Arc<dyn ContentFetcher>,
    /// Where recoverable errors go
    pub sink: Arc<dyn ErrorSink>,
}

impl Capabilities {
    /// Create capabilities reporting errors to the log
    pub fn new(matcher: Arc<dyn EnvironmentMatcher>, fetcher: Arc<dyn ContentFetcher>) -> Self {
        Self {
            matcher,
            fetcher,
            sink: Arc::new(LogErrorSink),
        }
    }

    /// Report errors to `sink` instead
    pub fn with_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }
}

/// What happened to a fetch completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Markup was replaced
    Applied,
    /// The binding moved on to another condition; content was dropped and
    /// a failure was still reported
    Stale,
    /// The fetch failed; the element was left untouched
    Failed,
    /// The completion named no known binding
    Unknown,
}

/// Owns all bindings of one exchange instance
pub struct Registry {
    bindings: Vec<Binding>,
    resolver: Resolver,
    applier: ContentApplier,
    completions: mpsc::UnboundedReceiver<FetchCompletion>,
    sink: Arc<dyn ErrorSink>,
    malformed: Vec<MalformedRuleError>,
}

impl Registry {
    /// Create an empty registry
    pub fn new(capabilities: Capabilities) -> Self {
        let (applier, completions) = ContentApplier::new(capabilities.fetcher);
        Self {
            bindings: Vec::new(),
            resolver: Resolver::new(capabilities.matcher),
            applier,
            completions,
            sink: capabilities.sink,
            malformed: Vec::new(),
        }
    }

    /// Bind every element and run the initial pass.
    ///
    /// Elements whose attribute is malformed are reported and skipped; the
    /// remaining elements are still bound.
    pub fn initialize<I>(
        elements: I,
        aliases: &AliasTable,
        attribute: &str,
        capabilities: Capabilities,
    ) -> Self
    where
        I: IntoIterator<Item = ElementHandle>,
    {
        let mut registry = Self::new(capabilities);
        for element in elements {
            // Already reported to the sink.
            let _ = registry.register(element, aliases, attribute);
        }
        log::debug!(
            "Registry initialized with {} bindings ({} malformed)",
            registry.len(),
            registry.malformed.len()
        );
        registry
    }

    /// Parse `element`'s rule attribute, bind it and evaluate it once.
    ///
    /// Returns the existing id when the element is already bound, and `None`
    /// when it does not carry `attribute`.
    pub fn register(
        &mut self,
        element: ElementHandle,
        aliases: &AliasTable,
        attribute: &str,
    ) -> Result<Option<BindingId>, MalformedRuleError> {
        if let Some(id) = self.find(&element) {
            return Ok(Some(id));
        }

        let Some(raw) = element.attribute(attribute) else {
            log::debug!("<{}> has no '{attribute}' attribute", element.tag_name());
            return Ok(None);
        };

        let rules = match RuleParser::new(aliases).parse(&raw) {
            Ok(rules) => rules,
            Err(err) => {
                log::warn!("Skipping <{}>: {err}", element.tag_name());
                self.sink.report(ExchangeError::MalformedRule(err.clone()));
                self.malformed.push(err.clone());
                return Err(err);
            }
        };

        let id = BindingId(self.bindings.len());
        self.bindings.push(Binding::new(element, rules));
        self.evaluate(id);
        Ok(Some(id))
    }

    /// Re-evaluate one binding; `true` when content was swapped
    pub fn evaluate(&mut self, id: BindingId) -> bool {
        let Some(binding) = self.bindings.get_mut(id.0) else {
            return false;
        };
        self.resolver.evaluate(id, binding, &self.applier)
    }

    /// Re-evaluate every binding in insertion order. Returns the number of
    /// swaps.
    pub fn on_environment_change(&mut self) -> usize {
        let mut swapped = 0;
        for (index, binding) in self.bindings.iter_mut().enumerate() {
            let application = self
                .resolver
                .resolve(BindingId(index), binding, &self.applier);
            if let Some(application) = application {
                if application == Application::Pending {
                    log::trace!("Binding #{index} awaiting content");
                }
                swapped += 1;
            }
        }
        swapped
    }

    /// Apply a fetch result if its binding is still on the same condition.
    /// Failures reach the error sink even when the binding has moved on.
    pub fn complete(&mut self, completion: FetchCompletion) -> CompletionOutcome {
        self.applier.mark_completed();

        let Some(binding) = self.bindings.get(completion.binding.0) else {
            return CompletionOutcome::Unknown;
        };
        let stale = !binding.is_active(&completion.tag);

        match completion.result {
            Ok(_) if stale => {
                log::debug!(
                    "Binding {}: dropping stale content from '{}'",
                    completion.binding,
                    completion.url
                );
                CompletionOutcome::Stale
            }
            Ok(markup) => {
                binding.element().set_inner_markup(&markup);
                CompletionOutcome::Applied
            }
            Err(source) => {
                self.sink.report(ExchangeError::ContentLoad(ContentLoadError {
                    url: completion.url,
                    source,
                }));
                if stale {
                    CompletionOutcome::Stale
                } else {
                    CompletionOutcome::Failed
                }
            }
        }
    }

    /// Wait for the next fetch completion
    pub async fn next_completion(&mut self) -> Option<FetchCompletion> {
        self.completions.recv().await
    }

    /// Apply every completion that has already arrived. Returns how many were
    /// processed.
    pub fn drain_completions(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(completion) = self.completions.try_recv() {
            self.complete(completion);
            processed += 1;
        }
        processed
    }

    /// Wait until no fetch is in flight, applying completions as they arrive
    pub async fn settle(&mut self) {
        while self.applier.in_flight() > 0 {
            match self.completions.recv().await {
                Some(completion) => {
                    self.complete(completion);
                }
                None => break,
            }
        }
    }

    /// Fetches started and not yet completed
    pub fn in_flight(&self) -> usize {
        self.applier.in_flight()
    }

    /// Binding by id
    pub fn binding(&self, id: BindingId) -> Option<&Binding> {
        self.bindings.get(id.0)
    }

    /// Id of the binding for `element`
    pub fn find(&self, element: &ElementHandle) -> Option<BindingId> {
        self.bindings
            .iter()
            .position(|binding| same_element(binding.element(), element))
            .map(BindingId)
    }

    /// Bindings in insertion order
    pub fn bindings(&self) -> impl Iterator<Item = (BindingId, &Binding)> {
        self.bindings
            .iter()
            .enumerate()
            .map(|(index, binding)| (BindingId(index), binding))
    }

    /// Parse errors seen while registering elements
    pub fn malformed(&self) -> &[MalformedRuleError] {
        &self.malformed
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether nothing is bound
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("bindings", &self.bindings)
            .field("in_flight", &self.applier.in_flight())
            .finish_non_exhaustive()
    }
}
