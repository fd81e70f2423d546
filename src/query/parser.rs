//! CMIS-QL Parser
//!
//! Hand-written recursive descent parser for the query subset the engine
//! understands:
//!
//! ```text
//! SELECT [* | selector [[AS] alias], ...]
//! FROM type [[AS] alias]
//!     [[INNER | LEFT [OUTER]] JOIN type [[AS] alias] ON col = col]*
//! [WHERE predicate]
//! [ORDER BY selector [ASC | DESC], ...]
//! ```
//!
//! Literal tokens are kept as raw text; coercion happens when the walker
//! reaches them. The CONTAINS argument is parsed into a [`FullTextNode`].

use super::ast::*;
use super::literal::decode_string_literal;
use crate::error::{Error, Result};

const RESERVED: &[&str] = &[
    "SELECT", "FROM", "WHERE", "ORDER", "BY", "AS", "JOIN", "INNER", "LEFT", "OUTER", "ON",
    "AND", "OR", "NOT", "IN", "LIKE", "IS", "NULL", "ANY", "ASC", "DESC",
];

/// CMIS-QL parser
pub struct QueryParser {
    input: String,
    pos: usize,
    next_selector: SelectorId,
}

impl QueryParser {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
            pos: 0,
            next_selector: 0,
        }
    }

    /// Parse one complete statement
    pub fn parse(&mut self) -> Result<QueryStatement> {
        let mut statement = QueryStatement::new(self.input.trim());

        self.expect_keyword("SELECT")?;
        statement.select = self.parse_select_list()?;

        self.expect_keyword("FROM")?;
        statement.from = self.parse_from()?;

        if self.try_keyword("WHERE") {
            statement.where_clause = Some(self.parse_or_predicate()?);
        }

        if self.try_keyword("ORDER") {
            self.expect_keyword("BY")?;
            statement.order_by = self.parse_order_by()?;
        }

        self.try_char(';');
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(Error::ParseError(format!(
                "Unexpected input at position {}: '{}'",
                self.pos,
                &self.input[self.pos..]
            )));
        }

        Ok(statement)
    }

    fn allocate_id(&mut self) -> SelectorId {
        let id = self.next_selector;
        self.next_selector += 1;
        id
    }

    // ========================================================================
    // SELECT / FROM / ORDER BY
    // ========================================================================

    fn parse_select_list(&mut self) -> Result<Vec<SelectItem>> {
        let mut items = Vec::new();
        loop {
            let selector = if self.try_char('*') {
                Selector::Column(ColumnReference::new(self.allocate_id(), None, WILDCARD))
            } else {
                self.parse_selector()?
            };

            let alias = if self.try_keyword("AS") {
                Some(self.parse_identifier()?)
            } else {
                self.try_alias()
            };

            items.push(SelectItem { selector, alias });

            if !self.try_char(',') {
                break;
            }
        }
        Ok(items)
    }

    /// `name()` function or `[qualifier.]property` column
    fn parse_selector(&mut self) -> Result<Selector> {
        let first = self.parse_identifier()?;
        if self.try_char('(') {
            self.expect_char(')')?;
            return Ok(Selector::Function(FunctionReference::new(
                self.allocate_id(),
                &first,
            )));
        }

        Ok(Selector::Column(self.finish_column(first)?))
    }

    fn finish_column(&mut self, first: String) -> Result<ColumnReference> {
        // No whitespace allowed around the qualifier dot.
        if self.peek_char_is('.') {
            self.pos += 1;
            let property = if self.peek_char_is('*') {
                self.pos += 1;
                WILDCARD.to_string()
            } else {
                self.parse_identifier()?
            };
            Ok(ColumnReference::new(self.allocate_id(), Some(&first), &property))
        } else {
            Ok(ColumnReference::new(self.allocate_id(), None, &first))
        }
    }

    fn parse_column(&mut self) -> Result<ColumnReference> {
        let first = self.parse_identifier()?;
        self.finish_column(first)
    }

    fn parse_from(&mut self) -> Result<Vec<FromItem>> {
        let mut items = vec![self.parse_from_item()?];

        loop {
            let kind = if self.try_keyword("INNER") {
                self.expect_keyword("JOIN")?;
                JoinKind::Inner
            } else if self.try_keyword("LEFT") {
                self.try_keyword("OUTER");
                self.expect_keyword("JOIN")?;
                JoinKind::LeftOuter
            } else if self.try_keyword("JOIN") {
                JoinKind::Inner
            } else {
                break;
            };

            let mut item = self.parse_from_item()?;
            self.expect_keyword("ON")?;
            let left = self.parse_column()?;
            self.expect_char('=')?;
            let right = self.parse_column()?;
            item.join = Some(JoinSpec { kind, left, right });
            items.push(item);
        }

        Ok(items)
    }

    fn parse_from_item(&mut self) -> Result<FromItem> {
        let type_id = self.parse_identifier()?;
        let alias = if self.try_keyword("AS") {
            Some(self.parse_identifier()?)
        } else {
            self.try_alias()
        };
        Ok(FromItem {
            type_id,
            alias,
            join: None,
        })
    }

    fn parse_order_by(&mut self) -> Result<Vec<SortSpec>> {
        let mut specs = Vec::new();
        loop {
            let selector = self.parse_selector()?;
            let ascending = if self.try_keyword("DESC") {
                false
            } else {
                self.try_keyword("ASC");
                true
            };
            specs.push(SortSpec {
                selector,
                ascending,
            });

            if !self.try_char(',') {
                break;
            }
        }
        Ok(specs)
    }

    /// A bare identifier that is not a keyword, used as an implicit alias.
    fn try_alias(&mut self) -> Option<String> {
        self.skip_whitespace();
        let word = self.peek_word()?;
        if RESERVED.iter().any(|k| k.eq_ignore_ascii_case(&word)) {
            return None;
        }
        self.pos += word.len();
        Some(word)
    }

    // ========================================================================
    // WHERE
    // ========================================================================

    fn parse_or_predicate(&mut self) -> Result<PredicateNode> {
        let mut left = self.parse_and_predicate()?;
        while self.try_keyword("OR") {
            let right = self.parse_and_predicate()?;
            left = PredicateNode::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and_predicate(&mut self) -> Result<PredicateNode> {
        let mut left = self.parse_not_predicate()?;
        while self.try_keyword("AND") {
            let right = self.parse_not_predicate()?;
            left = PredicateNode::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not_predicate(&mut self) -> Result<PredicateNode> {
        if self.try_keyword("NOT") {
            let child = self.parse_not_predicate()?;
            Ok(PredicateNode::Not(Box::new(child)))
        } else {
            self.parse_primary_predicate()
        }
    }

    fn parse_primary_predicate(&mut self) -> Result<PredicateNode> {
        if self.try_char('(') {
            let inner = self.parse_or_predicate()?;
            self.expect_char(')')?;
            return Ok(inner);
        }

        if self.try_keyword("CONTAINS") {
            return self.parse_contains();
        }
        if self.try_keyword("IN_FOLDER") {
            let (qualifier, folder) = self.parse_folder_arguments()?;
            return Ok(PredicateNode::InFolder { qualifier, folder });
        }
        if self.try_keyword("IN_TREE") {
            let (qualifier, folder) = self.parse_folder_arguments()?;
            return Ok(PredicateNode::InTree { qualifier, folder });
        }

        // ANY col [NOT] IN (...)
        if self.try_keyword("ANY") {
            let column = Box::new(PredicateNode::Column(self.parse_column()?));
            let negated = self.try_keyword("NOT");
            self.expect_keyword("IN")?;
            let list = Box::new(self.parse_literal_list()?);
            return Ok(if negated {
                PredicateNode::NotInAny(column, list)
            } else {
                PredicateNode::InAny(column, list)
            });
        }

        let left = self.parse_operand()?;

        if self.try_keyword("IS") {
            let negated = self.try_keyword("NOT");
            self.expect_keyword("NULL")?;
            return Ok(if negated {
                PredicateNode::IsNotNull(Box::new(left))
            } else {
                PredicateNode::IsNull(Box::new(left))
            });
        }

        let negated = self.try_keyword("NOT");
        if self.try_keyword("IN") {
            let list = Box::new(self.parse_literal_list()?);
            return Ok(if negated {
                PredicateNode::NotIn(Box::new(left), list)
            } else {
                PredicateNode::In(Box::new(left), list)
            });
        }
        if self.try_keyword("LIKE") {
            let pattern = Box::new(self.parse_literal()?);
            return Ok(if negated {
                PredicateNode::NotLike(Box::new(left), pattern)
            } else {
                PredicateNode::Like(Box::new(left), pattern)
            });
        }
        if negated {
            return Err(Error::ParseError(
                "Expected IN or LIKE after NOT".to_string(),
            ));
        }

        let left = Box::new(left);
        if self.try_str("<=") {
            Ok(PredicateNode::Le(left, Box::new(self.parse_operand()?)))
        } else if self.try_str(">=") {
            Ok(PredicateNode::Ge(left, Box::new(self.parse_operand()?)))
        } else if self.try_str("<>") {
            Ok(PredicateNode::Neq(left, Box::new(self.parse_operand()?)))
        } else if self.try_char('<') {
            Ok(PredicateNode::Lt(left, Box::new(self.parse_operand()?)))
        } else if self.try_char('>') {
            Ok(PredicateNode::Gt(left, Box::new(self.parse_operand()?)))
        } else if self.try_char('=') {
            if self.try_keyword("ANY") {
                let column = PredicateNode::Column(self.parse_column()?);
                Ok(PredicateNode::EqAny(left, Box::new(column)))
            } else {
                Ok(PredicateNode::Eq(left, Box::new(self.parse_operand()?)))
            }
        } else {
            Err(Error::ParseError(format!(
                "Expected comparison operator, got {:?}",
                self.peek_char()
            )))
        }
    }

    /// Literal, `SCORE()` style function, or column reference
    fn parse_operand(&mut self) -> Result<PredicateNode> {
        self.skip_whitespace();
        if self.peek_literal_start() {
            return self.parse_literal();
        }

        let first = self.parse_identifier()?;
        if self.try_char('(') {
            self.expect_char(')')?;
            let id = self.allocate_id();
            return Ok(PredicateNode::Score(FunctionReference::new(id, &first)));
        }
        Ok(PredicateNode::Column(self.finish_column(first)?))
    }

    fn parse_contains(&mut self) -> Result<PredicateNode> {
        self.expect_char('(')?;
        self.skip_whitespace();
        let qualifier = if self.peek_char_is('\'') {
            None
        } else {
            let q = self.parse_identifier()?;
            self.expect_char(',')?;
            Some(q)
        };

        self.skip_whitespace();
        let raw = self.parse_raw_string()?;
        self.expect_char(')')?;

        let text = decode_string_literal(&raw)?;
        let search = FullTextParser::new(&text).parse()?;
        Ok(PredicateNode::Contains { qualifier, search })
    }

    fn parse_folder_arguments(
        &mut self,
    ) -> Result<(Option<Box<PredicateNode>>, Box<PredicateNode>)> {
        self.expect_char('(')?;
        self.skip_whitespace();
        let qualifier = if self.peek_char_is('\'') {
            None
        } else {
            let q = self.parse_identifier()?;
            self.expect_char(',')?;
            let id = self.allocate_id();
            Some(Box::new(PredicateNode::column(id, Some(&q), WILDCARD)))
        };

        let folder = Box::new(self.parse_literal()?);
        self.expect_char(')')?;
        Ok((qualifier, folder))
    }

    fn parse_literal_list(&mut self) -> Result<PredicateNode> {
        self.expect_char('(')?;
        let mut items = vec![self.parse_literal()?];
        while self.try_char(',') {
            items.push(self.parse_literal()?);
        }
        self.expect_char(')')?;
        Ok(PredicateNode::LiteralList(items))
    }

    /// Raw literal token: string, `TIMESTAMP '...'`, boolean or number
    fn parse_literal(&mut self) -> Result<PredicateNode> {
        self.skip_whitespace();
        if self.peek_char_is('\'') {
            return Ok(PredicateNode::Literal(self.parse_raw_string()?));
        }
        if self.try_keyword("TIMESTAMP") {
            self.skip_whitespace();
            let raw = self.parse_raw_string()?;
            return Ok(PredicateNode::Literal(format!("TIMESTAMP {}", raw)));
        }
        if self.try_keyword("TRUE") {
            return Ok(PredicateNode::literal("TRUE"));
        }
        if self.try_keyword("FALSE") {
            return Ok(PredicateNode::literal("FALSE"));
        }
        Ok(PredicateNode::Literal(self.parse_number()?))
    }

    fn peek_literal_start(&self) -> bool {
        match self.peek_char() {
            Some('\'') | Some('+') | Some('-') | Some('.') => true,
            Some(c) if c.is_ascii_digit() => true,
            _ => ["TIMESTAMP", "TRUE", "FALSE"]
                .iter()
                .any(|k| self.peek_keyword_is(k)),
        }
    }

    // ========================================================================
    // Helper Methods
    // ========================================================================

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_is(&self, c: char) -> bool {
        self.peek_char() == Some(c)
    }

    fn try_char(&mut self, c: char) -> bool {
        self.skip_whitespace();
        if self.peek_char() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect_char(&mut self, c: char) -> Result<()> {
        if self.try_char(c) {
            Ok(())
        } else {
            Err(Error::ParseError(format!(
                "Expected '{}', got {:?}",
                c,
                self.peek_char()
            )))
        }
    }

    fn try_str(&mut self, s: &str) -> bool {
        self.skip_whitespace();
        if self.input[self.pos..].starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    /// Identifier-shaped word at the cursor, without consuming it
    fn peek_word(&self) -> Option<String> {
        let rest = &self.input[self.pos..];
        let mut chars = rest.char_indices();
        match chars.next() {
            Some((_, c)) if c.is_alphabetic() || c == '_' => {}
            _ => return None,
        }
        let end = chars
            .find(|(_, c)| !is_identifier_char(*c))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        Some(rest[..end].to_string())
    }

    fn peek_keyword_is(&self, keyword: &str) -> bool {
        self.peek_word()
            .map(|w| w.eq_ignore_ascii_case(keyword))
            .unwrap_or(false)
    }

    fn try_keyword(&mut self, keyword: &str) -> bool {
        self.skip_whitespace();
        if self.peek_keyword_is(keyword) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.try_keyword(keyword) {
            Ok(())
        } else {
            Err(Error::ParseError(format!("Expected keyword '{}'", keyword)))
        }
    }

    fn parse_identifier(&mut self) -> Result<String> {
        self.skip_whitespace();
        let word = self
            .peek_word()
            .ok_or_else(|| Error::ParseError(format!("Expected identifier at position {}", self.pos)))?;
        self.pos += word.len();
        Ok(word)
    }

    /// Quoted string, returned with its quotes and escapes intact
    fn parse_raw_string(&mut self) -> Result<String> {
        if !self.peek_char_is('\'') {
            return Err(Error::ParseError("Expected string literal".to_string()));
        }
        let start = self.pos;
        self.pos += 1;

        while let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
            match c {
                '\\' => {
                    if let Some(escaped) = self.peek_char() {
                        self.pos += escaped.len_utf8();
                    }
                }
                '\'' => return Ok(self.input[start..self.pos].to_string()),
                _ => {}
            }
        }

        Err(Error::ParseError("Unclosed string".to_string()))
    }

    fn parse_number(&mut self) -> Result<String> {
        self.skip_whitespace();
        let start = self.pos;

        if matches!(self.peek_char(), Some('+') | Some('-')) {
            self.pos += 1;
        }

        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() || c == '.' {
                self.pos += 1;
            } else if c == 'e' || c == 'E' {
                self.pos += 1;
                if matches!(self.peek_char(), Some('+') | Some('-')) {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }

        if self.pos == start {
            Err(Error::ParseError(format!(
                "Expected literal, got {:?}",
                self.peek_char()
            )))
        } else {
            Ok(self.input[start..self.pos].to_string())
        }
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == ':'
}

// ============================================================================
// Full-text
// ============================================================================

/// Parser for the text inside a CONTAINS argument.
///
/// Juxtaposed terms form an implicit AND, the `OR` keyword separates
/// alternatives, a leading `-` negates one term and `"..."` is a phrase.
struct FullTextParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> FullTextParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse(&mut self) -> Result<FullTextNode> {
        let mut alternatives = vec![self.parse_conjunction()?];
        while self.try_or() {
            alternatives.push(self.parse_conjunction()?);
        }
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(Error::ParseError(format!(
                "Unexpected full-text input: '{}'",
                &self.input[self.pos..]
            )));
        }

        Ok(collapse(alternatives, FullTextNode::Or))
    }

    fn parse_conjunction(&mut self) -> Result<FullTextNode> {
        let mut terms = Vec::new();
        loop {
            self.skip_whitespace();
            if self.pos >= self.input.len() || self.peek_or() {
                break;
            }
            terms.push(self.parse_term()?);
        }
        if terms.is_empty() {
            return Err(Error::ParseError("Empty full-text expression".to_string()));
        }
        Ok(collapse(terms, FullTextNode::And))
    }

    fn parse_term(&mut self) -> Result<FullTextNode> {
        let rest = &self.input[self.pos..];
        if let Some(stripped) = rest.strip_prefix('-') {
            if stripped.starts_with(|c: char| !c.is_whitespace()) {
                self.pos += 1;
                let leaf = self.parse_leaf()?;
                return Ok(FullTextNode::Minus(Box::new(leaf)));
            }
        }
        self.parse_leaf()
    }

    fn parse_leaf(&mut self) -> Result<FullTextNode> {
        let rest = &self.input[self.pos..];
        let quoted = rest.starts_with('"');
        let mut escaped = false;
        let mut end = None;

        for (i, c) in rest.char_indices().skip(usize::from(quoted)) {
            if escaped {
                escaped = false;
                continue;
            }
            match c {
                '\\' => escaped = true,
                '"' if quoted => {
                    end = Some(i + 1);
                    break;
                }
                c if !quoted && c.is_whitespace() => {
                    end = Some(i);
                    break;
                }
                _ => {}
            }
        }

        let end = match end {
            Some(end) => end,
            None if quoted => {
                return Err(Error::ParseError(format!("Unterminated phrase: {}", rest)))
            }
            None => rest.len(),
        };

        let token = rest[..end].to_string();
        self.pos += end;
        Ok(if quoted {
            FullTextNode::Phrase(token)
        } else {
            FullTextNode::Word(token)
        })
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.input[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn peek_or(&self) -> bool {
        let rest = &self.input[self.pos..];
        rest.starts_with("OR")
            && rest[2..]
                .chars()
                .next()
                .map(char::is_whitespace)
                .unwrap_or(true)
    }

    fn try_or(&mut self) -> bool {
        self.skip_whitespace();
        if self.peek_or() {
            self.pos += 2;
            true
        } else {
            false
        }
    }
}

fn collapse(mut nodes: Vec<FullTextNode>, wrap: fn(Vec<FullTextNode>) -> FullTextNode) -> FullTextNode {
    if nodes.len() == 1 {
        nodes.remove(0)
    } else {
        wrap(nodes)
    }
}

/// Parse one CMIS-QL statement
pub fn parse(query: &str) -> Result<QueryStatement> {
    QueryParser::new(query).parse()
}
