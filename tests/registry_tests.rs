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

//! Registry behaviour: initial pass, re-evaluation, tie-break and fetch
//! completion handling

mod test_utils;

use exchange::{
    AliasTable, Capabilities, CollectingErrorSink, CompletionOutcome, ElementHandle,
    ExchangeError, FetchError, MemoryElement, Registry,
};
use std::sync::Arc;
use test_utils::{GatedFetcher, SetMatcher};

const ATTR: &str = "data-exchange";

struct Fixture {
    matcher: Arc<SetMatcher>,
    fetcher: Arc<GatedFetcher>,
    sink: Arc<CollectingErrorSink>,
}

impl Fixture {
    fn new(conditions: &[&str]) -> Self {
        Self {
            matcher: Arc::new(SetMatcher::new(conditions)),
            fetcher: Arc::new(GatedFetcher::new()),
            sink: Arc::new(CollectingErrorSink::new()),
        }
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::new(self.matcher.clone(), self.fetcher.clone()).with_sink(self.sink.clone())
    }

    fn registry(&self, elements: &[Arc<MemoryElement>]) -> Registry {
        Registry::initialize(
            elements.iter().map(|e| e.clone() as ElementHandle),
            &AliasTable::empty(),
            ATTR,
            self.capabilities(),
        )
    }
}

fn image(attr: &str) -> Arc<MemoryElement> {
    Arc::new(MemoryElement::new("img").with_attribute(ATTR, attr))
}

fn container(attr: &str) -> Arc<MemoryElement> {
    Arc::new(
        MemoryElement::new("div")
            .with_attribute(ATTR, attr)
            .with_inner_markup("<p>original</p>"),
    )
}

#[test]
fn test_initial_pass_applies_first_matching_rule() {
    let fixture = Fixture::new(&["B", "C"]);
    let element = image("[a.jpg, A][b.jpg, B][c.jpg, C]");
    let registry = fixture.registry(&[element.clone()]);

    assert_eq!(registry.len(), 1);
    assert_eq!(element.source().as_deref(), Some("b.jpg"));
    let (_, binding) = registry.bindings().next().unwrap();
    assert_eq!(binding.active_condition(), Some("B"));
}

#[test]
fn test_repeated_change_without_new_match_is_noop() {
    let fixture = Fixture::new(&["A"]);
    let element = image("[a.jpg, A]");
    let mut registry = fixture.registry(&[element.clone()]);

    assert_eq!(registry.on_environment_change(), 0);
    assert_eq!(registry.on_environment_change(), 0);
    assert_eq!(element.content_writes(), 1);
}

#[test]
fn test_still_matching_active_rule_yields_to_later_match() {
    let fixture = Fixture::new(&["A"]);
    let element = image("[a.jpg, A][b.jpg, B]");
    let mut registry = fixture.registry(&[element.clone()]);
    assert_eq!(element.source().as_deref(), Some("a.jpg"));

    fixture.matcher.set(&["A", "B"]);
    assert_eq!(registry.on_environment_change(), 1);
    assert_eq!(element.source().as_deref(), Some("b.jpg"));

    // Both still hold: the scan now passes over the active B and takes A.
    assert_eq!(registry.on_environment_change(), 1);
    assert_eq!(element.source().as_deref(), Some("a.jpg"));
}

#[test]
fn test_bindings_are_evaluated_in_insertion_order() {
    let fixture = Fixture::new(&[]);
    let first = image("[one.jpg, A]");
    let second = image("[two.jpg, A]");
    let mut registry = fixture.registry(&[first.clone(), second.clone()]);

    fixture.matcher.set(&["A"]);
    assert_eq!(registry.on_environment_change(), 2);
    let order: Vec<usize> = registry.bindings().map(|(id, _)| id.index()).collect();
    assert_eq!(order, vec![0, 1]);
    assert_eq!(first.source().as_deref(), Some("one.jpg"));
    assert_eq!(second.source().as_deref(), Some("two.jpg"));
}

#[test]
fn test_malformed_element_does_not_block_others() {
    let fixture = Fixture::new(&["A"]);
    let broken = image("[broken.jpg A]");
    let fine = image("[fine.jpg, A]");
    let registry = fixture.registry(&[broken.clone(), fine.clone()]);

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.malformed().len(), 1);
    assert_eq!(broken.source(), None);
    assert_eq!(fine.source().as_deref(), Some("fine.jpg"));
    assert!(matches!(
        fixture.sink.errors().as_slice(),
        [ExchangeError::MalformedRule(_)]
    ));
}

#[test]
fn test_element_is_bound_once() {
    let fixture = Fixture::new(&["A"]);
    let element = image("[a.jpg, A]");
    let mut registry = fixture.registry(&[element.clone(), element.clone()]);
    assert_eq!(registry.len(), 1);

    let id = registry
        .register(element.clone(), &AliasTable::empty(), ATTR)
        .unwrap();
    assert_eq!(id, registry.find(&(element.clone() as ElementHandle)));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_element_without_attribute_is_skipped() {
    let fixture = Fixture::new(&["A"]);
    let mut registry = fixture.registry(&[]);
    let plain = Arc::new(MemoryElement::new("img"));
    assert_eq!(registry.register(plain, &AliasTable::empty(), ATTR), Ok(None));
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_fetched_markup_replaces_content() {
    let fixture = Fixture::new(&["A"]);
    fixture.fetcher.respond("a.html", "<p>for A</p>");
    let element = container("[a.html, A]");
    let mut registry = fixture.registry(&[element.clone()]);
    assert_eq!(registry.in_flight(), 1);
    assert_eq!(element.inner_markup(), "<p>original</p>");

    fixture.fetcher.release("a.html");
    registry.settle().await;

    assert_eq!(registry.in_flight(), 0);
    assert_eq!(element.inner_markup(), "<p>for A</p>");
}

#[tokio::test]
async fn test_late_completion_does_not_overwrite_newer_content() {
    let fixture = Fixture::new(&["X"]);
    fixture
        .fetcher
        .respond("x.html", "<p>X</p>")
        .respond("y.html", "<p>Y</p>");
    let element = container("[x.html, X][y.html, Y]");
    let mut registry = fixture.registry(&[element.clone()]);

    fixture.matcher.set(&["Y"]);
    assert_eq!(registry.on_environment_change(), 1);
    assert_eq!(registry.in_flight(), 2);

    fixture.fetcher.release("y.html");
    let completion = registry.next_completion().await.unwrap();
    assert_eq!(completion.url, "y.html");
    assert_eq!(registry.complete(completion), CompletionOutcome::Applied);

    fixture.fetcher.release("x.html");
    let completion = registry.next_completion().await.unwrap();
    assert_eq!(completion.tag, "X");
    assert_eq!(registry.complete(completion), CompletionOutcome::Stale);

    assert_eq!(element.inner_markup(), "<p>Y</p>");
    assert_eq!(fixture.fetcher.requests(), vec!["x.html", "y.html"]);
    assert!(fixture.sink.is_empty());
}

#[tokio::test]
async fn test_failed_fetch_is_reported_and_content_kept() {
    let fixture = Fixture::new(&["A"]);
    fixture
        .fetcher
        .fail("a.html", FetchError::Status { status: 503 });
    let element = container("[a.html, A]");
    let mut registry = fixture.registry(&[element.clone()]);

    fixture.fetcher.release("a.html");
    let completion = registry.next_completion().await.unwrap();
    assert_eq!(registry.complete(completion), CompletionOutcome::Failed);

    assert_eq!(element.inner_markup(), "<p>original</p>");
    match fixture.sink.errors().as_slice() {
        [ExchangeError::ContentLoad(err)] => {
            assert_eq!(err.url, "a.html");
            assert_eq!(err.source, FetchError::Status { status: 503 });
        }
        other => panic!("Expected one content load error, got {other:?}"),
    }

    // Failure does not trigger a refetch for the same condition.
    assert_eq!(registry.on_environment_change(), 0);
}

#[test]
fn test_fetch_without_runtime_surfaces_error() {
    let fixture = Fixture::new(&["A"]);
    let element = container("[a.html, A]");
    let mut registry = fixture.registry(&[element.clone()]);

    assert_eq!(registry.drain_completions(), 1);
    assert_eq!(registry.in_flight(), 0);
    assert_eq!(element.inner_markup(), "<p>original</p>");
    assert!(matches!(
        fixture.sink.errors().as_slice(),
        [ExchangeError::ContentLoad(_)]
    ));
}

#[tokio::test]
async fn test_late_failure_is_still_reported() {
    let fixture = Fixture::new(&["X"]);
    fixture
        .fetcher
        .fail("x.html", FetchError::Status { status: 500 })
        .respond("y.html", "<p>Y</p>");
    let element = container("[x.html, X][y.html, Y]");
    let mut registry = fixture.registry(&[element.clone()]);

    fixture.matcher.set(&["Y"]);
    assert_eq!(registry.on_environment_change(), 1);

    fixture.fetcher.release("x.html");
    let completion = registry.next_completion().await.unwrap();
    assert_eq!(completion.tag, "X");
    assert_eq!(registry.complete(completion), CompletionOutcome::Stale);

    assert_eq!(element.inner_markup(), "<p>original</p>");
    match fixture.sink.errors().as_slice() {
        [ExchangeError::ContentLoad(err)] => {
            assert_eq!(err.url, "x.html");
            assert_eq!(err.source, FetchError::Status { status: 500 });
        }
        other => panic!("Expected one content load error, got {other:?}"),
    }

    fixture.fetcher.release("y.html");
    registry.settle().await;
    assert_eq!(element.inner_markup(), "<p>Y</p>");
}
