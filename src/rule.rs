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

//! Content rules

use serde::{Deserialize, Serialize};

/// One `(content source, condition)` pair declared on an element.
///
/// `condition` always holds the resolved condition string, never an alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    /// Image URL or markup URL to apply when the condition holds
    pub content_source: String,
    /// Condition evaluated by the environment matcher
    pub condition: String,
}

impl Rule {
    /// Create a rule from an already-resolved condition
    pub fn new(content_source: impl Into<String>, condition: impl Into<String>) -> Self {
        Self {
            content_source: content_source.into(),
            condition: condition.into(),
        }
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.content_source, self.condition)
    }
}
