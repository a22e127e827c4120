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

//! In-memory document for headless hosts and tests

use crate::element::{Element, ElementDiscovery, ElementHandle};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Attribute holding an image's resource location
pub const SOURCE_ATTR: &str = "src";

/// Element stored in a [`MemoryDocument`]
#[derive(Debug)]
pub struct MemoryElement {
    tag_name: String,
    attributes: RwLock<IndexMap<String, String>>,
    inner_markup: RwLock<String>,
    writes: AtomicUsize,
}

impl MemoryElement {
    /// Create a detached element
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            attributes: RwLock::new(IndexMap::new()),
            inner_markup: RwLock::new(String::new()),
            writes: AtomicUsize::new(0),
        }
    }

    /// Set an attribute, returning the element for chaining
    pub fn with_attribute(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.write().insert(name.into(), value.into());
        self
    }

    /// Set inner markup, returning the element for chaining
    pub fn with_inner_markup(self, markup: impl Into<String>) -> Self {
        *self.inner_markup.write() = markup.into();
        self
    }

    /// Set or replace an attribute
    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.write().insert(name.into(), value.into());
    }

    /// Current `src` attribute
    pub fn source(&self) -> Option<String> {
        self.attribute(SOURCE_ATTR)
    }

    /// Current inner markup
    pub fn inner_markup(&self) -> String {
        self.inner_markup.read().clone()
    }

    /// Number of content writes performed through [`Element`]
    pub fn content_writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

impl Element for MemoryElement {
    fn tag_name(&self) -> String {
        self.tag_name.clone()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.read().get(name).cloned()
    }

    fn set_source(&self, source: &str) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.set_attribute(SOURCE_ATTR, source);
    }

    fn set_inner_markup(&self, markup: &str) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        *self.inner_markup.write() = markup.to_string();
    }
}

/// Flat in-memory element tree
#[derive(Debug)]
pub struct MemoryDocument {
    elements: RwLock<Vec<Arc<MemoryElement>>>,
    attribute_query: bool,
}

impl MemoryDocument {
    /// Create a document that supports direct attribute queries
    pub fn new() -> Self {
        Self {
            elements: RwLock::new(Vec::new()),
            attribute_query: true,
        }
    }

    /// Create a document that only supports full-tree scans
    pub fn without_attribute_query() -> Self {
        Self {
            attribute_query: false,
            ..Self::new()
        }
    }

    /// Append an element and return a handle to it
    pub fn append(&self, element: MemoryElement) -> Arc<MemoryElement> {
        let element = Arc::new(element);
        self.elements.write().push(Arc::clone(&element));
        element
    }

    /// Number of elements in the document
    pub fn len(&self) -> usize {
        self.elements.read().len()
    }

    /// Whether the document is empty
    pub fn is_empty(&self) -> bool {
        self.elements.read().is_empty()
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementDiscovery for MemoryDocument {
    fn query_by_attribute(&self, attribute: &str) -> Option<Vec<ElementHandle>> {
        if !self.attribute_query {
            return None;
        }
        Some(
            self.elements
                .read()
                .iter()
                .filter(|element| element.attributes.read().contains_key(attribute))
                .map(|element| Arc::clone(element) as ElementHandle)
                .collect(),
        )
    }

    fn all_elements(&self) -> Vec<ElementHandle> {
        self.elements
            .read()
            .iter()
            .map(|element| Arc::clone(element) as ElementHandle)
            .collect()
    }
}
