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

//! Responsive content exchange
//!
//! Binds elements to an ordered list of `[content source, condition]` rules
//! declared in a data attribute and keeps each element showing the content of
//! the best matching rule as the environment changes.
//!
//! ```text
//! <img data-exchange="[a.jpg, small][b.jpg, large]">
//! <div data-exchange="[/partials/small.html, small][/partials/large.html, large]"></div>
//! ```
//!
//! Images get their `src` replaced in place; other elements get their markup
//! from a background fetch. Platform services (element discovery, condition
//! matching, fetching, change notification) are traits so the engine runs in
//! any host.

#![warn(missing_docs)]

pub mod alias;
pub mod applier;
pub mod binding;
pub mod config;
pub mod element;
pub mod error;
pub mod exchange;
pub mod fetch;
pub mod matcher;
pub mod memory;
pub mod notify;
pub mod parser;
pub mod registry;
pub mod resolver;
pub mod rule;
pub mod sink;

pub use alias::AliasTable;
pub use applier::{Application, ContentApplier, FetchCompletion};
pub use binding::{Binding, BindingId};
pub use config::{ExchangeConfig, ExchangeConfigBuilder};
pub use element::{Element, ElementDiscovery, ElementHandle, ElementKind, discover_elements};
pub use error::{
    ConfigurationError, ContentLoadError, ExchangeError, FetchError, MalformedReason,
    MalformedRuleError, Result,
};
pub use exchange::{Exchange, Host};
pub use fetch::{ContentFetcher, HttpFetcher};
pub use matcher::{EnvironmentMatcher, MediaQueryMatcher, Viewport};
pub use memory::{MemoryDocument, MemoryElement};
pub use notify::{ChangeHub, ChangeNotifier, Listener, ListenerId, RESIZE_EVENT};
pub use parser::{RuleParser, parse_rules};
pub use registry::{Capabilities, CompletionOutcome, Registry};
pub use resolver::Resolver;
pub use rule::Rule;
pub use sink::{CollectingErrorSink, ErrorSink, LogErrorSink};
