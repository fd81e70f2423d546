//! LIKE pattern translation and matching

use regex::Regex;

/// Translate a LIKE pattern into its matchable form.
///
/// `%` becomes `.*`, `_` becomes `.`. A backslash followed by `%` or `_` is
/// copied through unchanged, as is every other character.
pub fn translate_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    for token in scan(pattern) {
        match token {
            LikeToken::AnySequence => out.push_str(".*"),
            LikeToken::AnyChar => out.push('.'),
            LikeToken::Escaped(c) => {
                out.push('\\');
                out.push(c);
            }
            LikeToken::Literal(c) => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LikeToken {
    AnySequence,
    AnyChar,
    Escaped(char),
    Literal(char),
}

fn scan(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        let token = match c {
            '%' => LikeToken::AnySequence,
            '_' => LikeToken::AnyChar,
            '\\' => match chars.peek() {
                Some(&next @ ('%' | '_')) => {
                    chars.next();
                    LikeToken::Escaped(next)
                }
                _ => LikeToken::Literal('\\'),
            },
            other => LikeToken::Literal(other),
        };
        tokens.push(token);
    }
    tokens
}

/// Compiled LIKE pattern.
///
/// Built from the same scan as [`translate_pattern`], but literal runs are
/// regex-escaped and `\%` / `\_` match a literal `%` / `_`. The whole value
/// must match.
#[derive(Debug, Clone)]
pub struct LikeMatcher {
    pattern: String,
    regex: Regex,
}

impl LikeMatcher {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let mut source = String::with_capacity(pattern.len() + 16);
        source.push_str("(?s)^");
        let mut literal = String::new();
        for token in scan(pattern) {
            match token {
                LikeToken::Literal(c) | LikeToken::Escaped(c) => literal.push(c),
                LikeToken::AnySequence | LikeToken::AnyChar => {
                    source.push_str(&regex::escape(&literal));
                    literal.clear();
                    source.push_str(if token == LikeToken::AnySequence { ".*" } else { "." });
                }
            }
        }
        source.push_str(&regex::escape(&literal));
        source.push('$');

        Ok(Self {
            pattern: pattern.to_string(),
            regex: Regex::new(&source)?,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}
