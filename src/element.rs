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

//! Host element abstraction and element discovery

use std::sync::Arc;

/// How content is applied to an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Resource element (`<img>`): the source attribute is replaced in place
    Image,
    /// Any other element: its inner markup is replaced by fetched content
    Container,
}

/// A DOM-like element owned by the host.
///
/// Mutators take `&self`; hosts keep their own interior mutability, the way
/// DOM nodes do.
pub trait Element: Send + Sync {
    /// Tag name, e.g. `img` or `div`
    fn tag_name(&self) -> String;

    /// Read an attribute value
    fn attribute(&self, name: &str) -> Option<String>;

    /// Replace the resource location (`src`) of an image-like element
    fn set_source(&self, source: &str);

    /// Replace the inner markup of the element
    fn set_inner_markup(&self, markup: &str);

    /// Content application strategy for this element
    fn kind(&self) -> ElementKind {
        if self.tag_name().eq_ignore_ascii_case("img") {
            ElementKind::Image
        } else {
            ElementKind::Container
        }
    }
}

/// Shared handle to a host element
pub type ElementHandle = Arc<dyn Element>;

/// Whether two handles point at the same element
pub fn same_element(a: &ElementHandle, b: &ElementHandle) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Host capability for finding elements
pub trait ElementDiscovery: Send + Sync {
    /// Direct attribute query. Returns `None` when the host has no such
    /// capability.
    fn query_by_attribute(&self, attribute: &str) -> Option<Vec<ElementHandle>>;

    /// Every element in the tree, in document order
    fn all_elements(&self) -> Vec<ElementHandle>;
}

/// Find every element carrying `attribute`.
///
/// Falls back to a full-tree scan with a per-element check when the host
/// cannot query by attribute. Elements whose attribute is empty are skipped
/// by the fallback.
pub fn discover_elements(
    discovery: &dyn ElementDiscovery,
    attribute: &str,
) -> Vec<ElementHandle> {
    if let Some(found) = discovery.query_by_attribute(attribute) {
        return found;
    }

    log::debug!("Attribute query unavailable, scanning the full tree for '{attribute}'");
    discovery
        .all_elements()
        .into_iter()
        .filter(|element| {
            element
                .attribute(attribute)
                .is_some_and(|value| !value.is_empty())
        })
        .collect()
}
