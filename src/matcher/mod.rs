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

//! Environment matching
//!
//! The resolver only needs a yes/no answer for a condition string. Hosts with
//! a native media query engine implement [`EnvironmentMatcher`] directly;
//! headless hosts can use [`MediaQueryMatcher`] over a simulated [`Viewport`].

pub mod media_query;

pub use media_query::{MediaQueryMatcher, Viewport};

/// Reports whether a condition currently holds.
///
/// Conditions are opaque: an unknown or invalid condition is simply `false`.
pub trait EnvironmentMatcher: Send + Sync {
    /// Whether `condition` holds right now
    fn matches(&self, condition: &str) -> bool;
}

impl<F> EnvironmentMatcher for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn matches(&self, condition: &str) -> bool {
        self(condition)
    }
}
