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

//! Per-element binding state

use crate::element::ElementHandle;
use crate::rule::Rule;

/// Position of a binding in its registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub(crate) usize);

impl BindingId {
    /// Insertion index within the registry
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for BindingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An element, its rules in declaration order, and the condition of the rule
/// last applied to it
pub struct Binding {
    element: ElementHandle,
    rules: Vec<Rule>,
    active_condition: Option<String>,
}

impl Binding {
    /// Create a binding with nothing applied yet
    pub fn new(element: ElementHandle, rules: Vec<Rule>) -> Self {
        Self {
            element,
            rules,
            active_condition: None,
        }
    }

    /// Bound element
    pub fn element(&self) -> &ElementHandle {
        &self.element
    }

    /// Rules in declaration order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Condition of the most recently applied rule
    pub fn active_condition(&self) -> Option<&str> {
        self.active_condition.as_deref()
    }

    /// Whether `condition` is the active one
    pub fn is_active(&self, condition: &str) -> bool {
        self.active_condition.as_deref() == Some(condition)
    }

    /// Record that a rule with `condition` was just applied
    pub(crate) fn activate(&mut self, condition: &str) {
        self.active_condition = Some(condition.to_string());
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("element", &self.element.tag_name())
            .field("rules", &self.rules)
            .field("active_condition", &self.active_condition)
            .finish()
    }
}
