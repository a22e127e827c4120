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

//! Rule attribute parser
//!
//! Turns `[a.jpg, small][b.jpg, (large)]` into an ordered list of [`Rule`]s
//! with aliases expanded through an [`AliasTable`].

pub mod span;
pub mod tokenizer;

pub use span::{Span, Spanned};
pub use tokenizer::{ARTIFACT_MAX_LETTERS, Segment, Tokenizer};

use crate::alias::AliasTable;
use crate::error::{MalformedReason, MalformedRuleError};
use crate::rule::Rule;

/// Result type for rule parsing
pub type ParseResult<T> = Result<T, MalformedRuleError>;

/// Parser bound to an alias table
#[derive(Debug, Clone, Copy)]
pub struct RuleParser<'a> {
    aliases: &'a AliasTable,
}

impl<'a> RuleParser<'a> {
    /// Create a parser resolving conditions through `aliases`
    pub fn new(aliases: &'a AliasTable) -> Self {
        Self { aliases }
    }

    /// Parse an attribute value into rules in declaration order
    pub fn parse(&self, raw: &str) -> ParseResult<Vec<Rule>> {
        Ok(self
            .parse_spanned(raw)?
            .into_iter()
            .map(Spanned::into_inner)
            .collect())
    }

    /// Parse keeping the location of each rule's segment
    pub fn parse_spanned(&self, raw: &str) -> ParseResult<Vec<Spanned<Rule>>> {
        let mut rules = Vec::new();
        for segment in Tokenizer::new(raw) {
            if segment.is_split_artifact() {
                log::trace!("Skipping split artifact '{}' at {}", segment.text, segment.span);
                continue;
            }
            rules.push(Spanned::new(self.parse_segment(&segment)?, segment.span));
        }
        Ok(rules)
    }

    fn parse_segment(&self, segment: &Segment<'_>) -> ParseResult<Rule> {
        let malformed = |reason| MalformedRuleError {
            segment: segment.text.to_string(),
            span: segment.span,
            reason,
        };

        let (source, token) = segment
            .text
            .split_once(',')
            .ok_or_else(|| malformed(MalformedReason::MissingComma))?;

        let source = source.trim();
        if source.is_empty() {
            return Err(malformed(MalformedReason::EmptySource));
        }

        let token: String = token.trim().chars().filter(|c| !matches!(c, '(' | ')')).collect();
        let token = token.trim();
        if token.is_empty() {
            return Err(malformed(MalformedReason::EmptyCondition));
        }

        Ok(Rule::new(source, self.aliases.resolve(token)))
    }
}

/// Parse an attribute value with the given alias table
pub fn parse_rules(raw: &str, aliases: &AliasTable) -> ParseResult<Vec<Rule>> {
    RuleParser::new(aliases).parse(raw)
}
