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

//! Bracket tokenizer for rule attributes
//!
//! Splits `[a.jpg, small] [b.jpg, large]` into zero-copy segments. Text
//! outside brackets is a separator and never becomes a segment.

use super::span::Span;

/// Segments with at most this many letters left are split artifacts
pub const ARTIFACT_MAX_LETTERS: usize = 4;

/// Text found between one `[` and the next `]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'input> {
    /// Segment body without the brackets
    pub text: &'input str,
    /// Byte span of the body within the attribute
    pub span: Span,
}

impl<'input> Segment<'input> {
    /// Discard near-empty split artifacts.
    ///
    /// Counts what is left after removing every non-word character and every
    /// digit; whitespace or punctuation leftovers fall at or under
    /// [`ARTIFACT_MAX_LETTERS`].
    pub fn is_split_artifact(&self) -> bool {
        let letters = self
            .text
            .chars()
            .filter(|c| c.is_ascii_alphabetic() || *c == '_')
            .count();
        letters <= ARTIFACT_MAX_LETTERS
    }
}

/// Iterator over the bracketed segments of an attribute value
pub struct Tokenizer<'input> {
    input: &'input str,
    position: usize,
}

impl<'input> Tokenizer<'input> {
    /// Create a tokenizer over the raw attribute value
    pub fn new(input: &'input str) -> Self {
        Self { input, position: 0 }
    }

    /// Scan to the next `[ ... ]` group.
    ///
    /// Closing is non-greedy: the body ends at the first `]`. An unclosed `[`
    /// leaves the rest of the input as a trailing separator.
    pub fn next_segment(&mut self) -> Option<Segment<'input>> {
        let rest = &self.input[self.position..];
        let open = rest.find('[')?;
        let body_start = self.position + open + 1;

        let Some(close) = self.input[body_start..].find(']') else {
            self.position = self.input.len();
            return None;
        };
        let body_end = body_start + close;
        self.position = body_end + 1;

        Some(Segment {
            text: &self.input[body_start..body_end],
            span: Span::new(body_start, body_end),
        })
    }
}

impl<'input> Iterator for Tokenizer<'input> {
    type Item = Segment<'input>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_segment()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<&str> {
        Tokenizer::new(input).map(|s| s.text).collect()
    }

    #[test]
    fn test_adjacent_segments() {
        assert_eq!(
            texts("[a.jpg, small][b.jpg, large]"),
            vec!["a.jpg, small", "b.jpg, large"]
        );
    }

    #[test]
    fn test_separators_are_dropped() {
        assert_eq!(
            texts("  junk [a.jpg, small] , and more [b.jpg, large] tail"),
            vec!["a.jpg, small", "b.jpg, large"]
        );
    }

    #[test]
    fn test_non_greedy_close() {
        assert_eq!(texts("[a[b], c]"), vec!["a[b"]);
    }

    #[test]
    fn test_unclosed_bracket_is_separator() {
        assert_eq!(texts("[a.jpg, small][b.jpg, large"), vec!["a.jpg, small"]);
        assert!(texts("no brackets here").is_empty());
    }

    #[test]
    fn test_span_points_at_body() {
        let input = "x [a.jpg, small]";
        let segment = Tokenizer::new(input).next().unwrap();
        assert_eq!(segment.span, Span::new(3, 15));
        assert_eq!(&input[segment.span.start..segment.span.end], "a.jpg, small");
    }

    #[test]
    fn test_split_artifact_rule() {
        let artifact = |text| Segment {
            text,
            span: Span::new(0, 0),
        };
        assert!(artifact("  , ").is_split_artifact());
        assert!(artifact("1234567, 89").is_split_artifact());
        assert!(artifact("ab, cd").is_split_artifact());
        assert!(!artifact("a.jpg, small").is_split_artifact());
        assert!(!artifact("abcde").is_split_artifact());
    }
}
