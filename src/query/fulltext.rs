//! Full-text evaluation
//!
//! Matches a CONTAINS tree against an object's free text. Text is split into
//! alphanumeric tokens; a WORD or PHRASE matches when its own token sequence
//! appears contiguously in the text. The score is the number of positive
//! leaves that matched.

use super::ast::FullTextNode;
use super::walker::{fulltext_text, walk_fulltext, FullTextVisitor};
use crate::error::LiteralError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Outcome of matching one object against a full-text query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FullTextMatch {
    pub matched: bool,
    pub score: Decimal,
}

impl FullTextMatch {
    pub fn new(matched: bool, score: Decimal) -> Self {
        Self { matched, score }
    }
}

/// Keyword and phrase matcher over plain text
#[derive(Debug, Clone, Copy, Default)]
pub struct TextMatcher {
    case_sensitive: bool,
}

impl TextMatcher {
    pub fn new(case_sensitive: bool) -> Self {
        Self { case_sensitive }
    }

    pub fn evaluate(&self, search: &FullTextNode, text: &str) -> Result<FullTextMatch, LiteralError> {
        let tokens = self.tokenize(text);
        let mut evaluation = Evaluation {
            matcher: self,
            tokens: &tokens,
            stack: Vec::new(),
            score: 0,
        };
        walk_fulltext(&mut evaluation, search)?;

        let matched = evaluation.stack.pop().unwrap_or(false);
        Ok(FullTextMatch::new(matched, Decimal::from(evaluation.score)))
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| {
                if self.case_sensitive {
                    t.to_string()
                } else {
                    t.to_lowercase()
                }
            })
            .collect()
    }

    fn contains_sequence(&self, haystack: &[String], needle: &str) -> bool {
        let needle = self.tokenize(needle);
        if needle.is_empty() || needle.len() > haystack.len() {
            return false;
        }
        haystack.windows(needle.len()).any(|w| w == needle.as_slice())
    }
}

struct Evaluation<'a> {
    matcher: &'a TextMatcher,
    tokens: &'a [String],
    stack: Vec<bool>,
    score: u32,
}

impl Evaluation<'_> {
    fn pop_children(&mut self, count: usize) -> Vec<bool> {
        let at = self.stack.len().saturating_sub(count);
        self.stack.split_off(at)
    }

    fn leaf(&mut self, text: &str) {
        let matched = self.matcher.contains_sequence(self.tokens, text);
        if matched {
            self.score += 1;
        }
        self.stack.push(matched);
    }
}

impl FullTextVisitor for Evaluation<'_> {
    type Error = LiteralError;

    fn on_and(&mut self, _node: &FullTextNode, children: &[FullTextNode]) -> Result<(), LiteralError> {
        let results = self.pop_children(children.len());
        self.stack.push(results.iter().all(|m| *m));
        Ok(())
    }

    fn on_or(&mut self, _node: &FullTextNode, children: &[FullTextNode]) -> Result<(), LiteralError> {
        let results = self.pop_children(children.len());
        self.stack.push(results.iter().any(|m| *m));
        Ok(())
    }

    fn on_minus(&mut self, _node: &FullTextNode, child: &FullTextNode) -> Result<(), LiteralError> {
        let matched = match child {
            FullTextNode::Word(_) | FullTextNode::Phrase(_) => {
                let text = fulltext_text(child)?;
                self.matcher.contains_sequence(self.tokens, &text)
            }
            nested => {
                let mut inner = Evaluation {
                    matcher: self.matcher,
                    tokens: self.tokens,
                    stack: Vec::new(),
                    score: 0,
                };
                walk_fulltext(&mut inner, nested)?;
                inner.stack.pop().unwrap_or(false)
            }
        };
        self.stack.push(!matched);
        Ok(())
    }

    fn on_word(&mut self, _node: &FullTextNode, text: &str) -> Result<(), LiteralError> {
        self.leaf(text);
        Ok(())
    }

    fn on_phrase(&mut self, _node: &FullTextNode, text: &str) -> Result<(), LiteralError> {
        self.leaf(text);
        Ok(())
    }
}
