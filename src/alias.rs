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

//! Alias table mapping short names to full media conditions

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Always-true condition used by the `default` alias
pub const DEFAULT_CONDITION: &str = "only screen";

/// Viewports up to 640px wide
pub const SMALL_CONDITION: &str = "only screen and (max-width: 640px)";

/// Viewports between 641px and 1024px wide
pub const MEDIUM_CONDITION: &str = "only screen and (min-width:641px) and (max-width:1024px)";

/// Viewports from 1025px wide
pub const LARGE_CONDITION: &str = "only screen and (min-width:1025px)";

/// High-density displays, spelled for every engine prefix
pub const RETINA_CONDITION: &str = concat!(
    "only screen and (-webkit-min-device-pixel-ratio: 2),",
    "only screen and (min--moz-device-pixel-ratio: 2),",
    "only screen and (-o-min-device-pixel-ratio: 2/1),",
    "only screen and (min-device-pixel-ratio: 2),",
    "only screen and (min-resolution: 192dpi),",
    "only screen and (min-resolution: 2dppx)"
);

/// Mapping from alias names to condition strings
///
/// Insertion order is kept so tables serialize the way they were written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasTable {
    entries: IndexMap<String, String>,
}

impl AliasTable {
    /// Create an empty table
    pub fn empty() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Build a table from `(alias, condition)` pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Add or replace an alias
    pub fn insert(&mut self, alias: impl Into<String>, condition: impl Into<String>) {
        self.entries.insert(alias.into(), condition.into());
    }

    /// Exact-match lookup on the trimmed alias token
    pub fn get(&self, alias: &str) -> Option<&str> {
        self.entries.get(alias.trim()).map(String::as_str)
    }

    /// Expand an alias, or return the token unchanged when no alias matches
    pub fn resolve(&self, token: &str) -> String {
        let token = token.trim();
        match self.get(token) {
            Some(condition) => condition.to_string(),
            None => token.to_string(),
        }
    }

    /// Number of aliases
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no aliases
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate aliases in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::from_pairs([
            ("default", DEFAULT_CONDITION),
            ("small", SMALL_CONDITION),
            ("medium", MEDIUM_CONDITION),
            ("large", LARGE_CONDITION),
            ("retina", RETINA_CONDITION),
        ])
    }
}
