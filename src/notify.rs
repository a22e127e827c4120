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

//! Environment-change notification capability

use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Event fired when the viewport changes size
pub const RESIZE_EVENT: &str = "resize";

/// Callback invoked when an environment-change event fires
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Stable identity of a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Allocate an id distinct from every other allocated id
    pub fn unique() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Lets the engine subscribe to environment-change events.
///
/// Subscribing the same `(event_name, id)` pair again replaces the previous
/// listener instead of adding a second one.
pub trait ChangeNotifier: Send + Sync {
    /// Register `listener` for `event_name`
    fn subscribe(&self, event_name: &str, id: ListenerId, listener: Listener);

    /// Remove a listener, returning whether it was registered
    fn unsubscribe(&self, event_name: &str, id: ListenerId) -> bool;
}

/// In-process [`ChangeNotifier`] driven by explicit [`emit`](ChangeHub::emit) calls
#[derive(Default)]
pub struct ChangeHub {
    listeners: RwLock<IndexMap<(String, ListenerId), Listener>>,
}

impl ChangeHub {
    /// Create a hub with no listeners
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke every listener of `event_name` in subscription order.
    /// Returns how many were called.
    pub fn emit(&self, event_name: &str) -> usize {
        // Listeners are cloned out so they may subscribe or unsubscribe.
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .iter()
            .filter(|((name, _), _)| name == event_name)
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in &listeners {
            listener();
        }
        listeners.len()
    }

    /// Number of listeners registered for `event_name`
    pub fn listener_count(&self, event_name: &str) -> usize {
        self.listeners
            .read()
            .keys()
            .filter(|(name, _)| name == event_name)
            .count()
    }
}

impl std::fmt::Debug for ChangeHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeHub")
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

impl ChangeNotifier for ChangeHub {
    fn subscribe(&self, event_name: &str, id: ListenerId, listener: Listener) {
        self.listeners
            .write()
            .insert((event_name.to_string(), id), listener);
    }

    fn unsubscribe(&self, event_name: &str, id: ListenerId) -> bool {
        self.listeners
            .write()
            .shift_remove(&(event_name.to_string(), id))
            .is_some()
    }
}
