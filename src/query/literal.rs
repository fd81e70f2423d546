//! Literal coercion
//!
//! Turns literal token text into typed values. The value kind comes from the
//! token's lexical class only, never from the property it is compared with.

use crate::error::LiteralError;
use crate::types::Value;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

const TIMESTAMP_KEYWORD: &str = "TIMESTAMP";

/// Coerce a literal token into a typed value.
///
/// - `TRUE` / `FALSE` (any case) → Boolean
/// - `'...'` → String
/// - `TIMESTAMP '...'` → DateTime (UTC)
/// - `[+-]digits` → Integer
/// - digits with `.` or an exponent → Decimal
pub fn coerce_literal(text: &str) -> Result<Value, LiteralError> {
    let token = text.trim();
    if token.is_empty() {
        return Err(LiteralError::new(text, "empty literal"));
    }

    if token.eq_ignore_ascii_case("true") {
        return Ok(Value::Boolean(true));
    }
    if token.eq_ignore_ascii_case("false") {
        return Ok(Value::Boolean(false));
    }

    if token.starts_with('\'') {
        return decode_string_literal(token).map(Value::String);
    }

    if let Some(rest) = strip_keyword(token, TIMESTAMP_KEYWORD) {
        let body = decode_string_literal(rest.trim_start())?;
        return parse_timestamp(&body)
            .map(Value::DateTime)
            .ok_or_else(|| LiteralError::new(text, "invalid timestamp"));
    }

    parse_number(token).ok_or_else(|| LiteralError::new(text, "not a boolean, number, string or timestamp"))
}

/// Strip the surrounding single quotes of a string literal and un-escape
/// `\'` and `\\`. Other backslash sequences are kept as written so that LIKE
/// patterns keep their `\%` and `\_` escapes.
pub fn decode_string_literal(text: &str) -> Result<String, LiteralError> {
    let body = text
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .filter(|_| text.len() >= 2)
        .ok_or_else(|| LiteralError::new(text, "string literal must be enclosed in single quotes"))?;

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\'') => out.push('\''),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => return Err(LiteralError::new(text, "dangling escape character")),
            },
            '\'' => return Err(LiteralError::new(text, "unescaped quote inside string literal")),
            _ => out.push(c),
        }
    }
    Ok(out)
}

/// Decode a full-text word or phrase token: strip double quotes from a phrase
/// and un-escape `\\`, `\'`, `\"` and `\-`.
pub fn decode_fulltext_literal(text: &str) -> Result<String, LiteralError> {
    let body = if text.starts_with('"') {
        text.strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .filter(|_| text.len() >= 2)
            .ok_or_else(|| LiteralError::new(text, "unterminated phrase"))?
    } else {
        text
    };

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(e @ ('\\' | '\'' | '"' | '-')) => out.push(e),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => return Err(LiteralError::new(text, "dangling escape character")),
        }
    }

    if out.trim().is_empty() {
        return Err(LiteralError::new(text, "empty full-text term"));
    }
    Ok(out)
}

fn strip_keyword<'a>(token: &'a str, keyword: &str) -> Option<&'a str> {
    let head = token.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = &token[keyword.len()..];
    rest.starts_with(|c: char| c.is_whitespace() || c == '\'')
        .then_some(rest)
}

/// Parse an RFC 3339 timestamp; a value without an offset is read as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    // No offset given: read as UTC.
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn parse_number(token: &str) -> Option<Value> {
    let unsigned = token.strip_prefix(['+', '-']).unwrap_or(token);
    if unsigned.is_empty()
        || !unsigned.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        || !unsigned
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return None;
    }

    let is_decimal = unsigned.contains(['.', 'e', 'E']);
    if !is_decimal {
        return i64::from_str(token).ok().map(Value::Integer);
    }

    let token = token.strip_prefix('+').unwrap_or(token);
    let parsed = if token.contains(['e', 'E']) {
        Decimal::from_scientific(token).ok()
    } else {
        Decimal::from_str(token).ok()
    };
    parsed.map(Value::Decimal)
}
