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

//! Rule resolution
//!
//! Rules are scanned in declaration order. The first rule whose condition
//! holds *and* differs from the active condition wins. A rule that holds but
//! is already active does not stop the scan, so a later rule that also holds
//! replaces it.
//!
//! That last property is kept on purpose and is covered by tests: with
//! overlapping conditions, content keeps moving to the later matching rule.
//! Whether product requirements want this should be confirmed before relying
//! on overlapping conditions.

use crate::applier::{Application, ContentApplier};
use crate::binding::{Binding, BindingId};
use crate::matcher::EnvironmentMatcher;
use crate::rule::Rule;
use std::sync::Arc;

/// Decides whether a binding needs new content and applies it
#[derive(Clone)]
pub struct Resolver {
    matcher: Arc<dyn EnvironmentMatcher>,
}

impl Resolver {
    /// Create a resolver querying `matcher`
    pub fn new(matcher: Arc<dyn EnvironmentMatcher>) -> Self {
        Self { matcher }
    }

    /// Rule that would be applied right now, if any
    pub fn select<'b>(&self, binding: &'b Binding) -> Option<&'b Rule> {
        binding
            .rules()
            .iter()
            .find(|rule| {
                self.matcher.matches(&rule.condition) && !binding.is_active(&rule.condition)
            })
    }

    /// Evaluate a binding, applying the winning rule.
    ///
    /// Returns `None` when nothing changed. The active condition is updated
    /// as soon as the rule is applied, including when its content is still
    /// being fetched.
    pub fn resolve(
        &self,
        id: BindingId,
        binding: &mut Binding,
        applier: &ContentApplier,
    ) -> Option<Application> {
        let rule = self.select(binding)?.clone();
        log::debug!(
            "Binding {id}: {} -> {}",
            binding.active_condition().unwrap_or("<none>"),
            rule
        );
        let application = applier.apply(id, &rule, binding.element());
        binding.activate(&rule.condition);
        Some(application)
    }

    /// Evaluate a binding; `true` when content was swapped
    pub fn evaluate(&self, id: BindingId, binding: &mut Binding, applier: &ContentApplier) -> bool {
        self.resolve(id, binding, applier).is_some()
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver").finish_non_exhaustive()
    }
}
