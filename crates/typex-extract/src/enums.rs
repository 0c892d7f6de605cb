//! Enum definitions.

use crate::composites::typedef_alias;
use crate::params::split_params;
use crate::types::{EnumInfo, EnumItem};
use once_cell::sync::Lazy;
use regex::Regex;

static ENUM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(\btypedef\s+)?\benum\b(?:\s+(?:class|struct)\b)?(?:\s+(\w+))?\s*(?::\s*[\w\s]+?)?\s*\{([^{}]*)\}\s*([^;{}]*);",
    )
    .expect("valid regex")
});

/// Find every enum definition in `text`.
pub fn get_all_enums(text: &str) -> Vec<String> {
    ENUM.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// Parse one raw definition produced by [`get_all_enums`].
pub fn parse_enum(raw: &str, file: &str) -> EnumInfo {
    let mut info = EnumInfo {
        header_text: file.to_string(),
        decl: raw.to_string(),
        name_text: String::new(),
        type_name_text: String::new(),
        items: Vec::new(),
    };

    let Some(caps) = ENUM.captures(raw) else {
        return info;
    };
    info.name_text = caps.get(2).map_or("", |m| m.as_str()).to_string();
    if caps.get(1).is_some() {
        let trailer = caps.get(4).map_or("", |m| m.as_str());
        info.type_name_text = typedef_alias(trailer).unwrap_or_default();
    }
    info.items = parse_items(caps.get(3).map_or("", |m| m.as_str()));
    info
}

/// Parse enumerators, numbering implicit ones from the previous value.
pub fn parse_items(body: &str) -> Vec<EnumItem> {
    let mut items: Vec<EnumItem> = Vec::new();
    let mut next = Some(0i64);

    for part in split_params(body) {
        let (name, value_text) = match part.split_once('=') {
            Some((name, value)) => (name.trim(), value.trim()),
            None => (part.as_str(), ""),
        };
        // Attributes and deprecation macros may follow the name.
        let name = name.split_whitespace().next().unwrap_or_default();
        if name.is_empty() {
            continue;
        }

        let value = if value_text.is_empty() {
            next
        } else {
            eval(value_text, &items)
        };
        next = value.and_then(|v| v.checked_add(1));

        items.push(EnumItem {
            name: name.to_string(),
            value_text: value_text.to_string(),
            value,
        });
    }
    items
}

/// Deepest operator nesting [`eval`] follows before giving up.
const MAX_EVAL_DEPTH: usize = 64;

/// Evaluate a constant initializer.
///
/// Handles integer and character literals, earlier enumerators, unary
/// `-`/`~`, `+`/`-`, shifts and `|`. Anything else, or anything nested
/// deeper than [`MAX_EVAL_DEPTH`], is `None`.
fn eval(expr: &str, items: &[EnumItem]) -> Option<i64> {
    eval_at(expr, items, 0)
}

fn eval_at(expr: &str, items: &[EnumItem], depth: usize) -> Option<i64> {
    if depth > MAX_EVAL_DEPTH {
        return None;
    }
    let expr = strip_parens(expr.trim());
    if expr.is_empty() {
        return None;
    }
    let sub = |text: &str| eval_at(text, items, depth + 1);

    let is_or = |b: &[u8], i: usize| {
        b[i] == b'|' && b.get(i + 1) != Some(&b'|') && (i == 0 || b[i - 1] != b'|')
    };
    if let Some(i) = find_top_level(expr, is_or) {
        return Some(sub(&expr[..i])? | sub(&expr[i + 1..])?);
    }
    if let Some(i) = find_top_level(expr, |b, i| b[i] == b'<' && b.get(i + 1) == Some(&b'<')) {
        let shift = u32::try_from(sub(&expr[i + 2..])?).ok()?;
        return sub(&expr[..i])?.checked_shl(shift);
    }
    if let Some(i) = find_top_level(expr, |b, i| b[i] == b'>' && b.get(i + 1) == Some(&b'>')) {
        let shift = u32::try_from(sub(&expr[i + 2..])?).ok()?;
        return sub(&expr[..i])?.checked_shr(shift);
    }
    if let Some(i) = find_top_level(expr, is_binary_additive) {
        let lhs = sub(&expr[..i])?;
        let rhs = sub(&expr[i + 1..])?;
        return if expr.as_bytes()[i] == b'+' {
            lhs.checked_add(rhs)
        } else {
            lhs.checked_sub(rhs)
        };
    }

    if let Some(rest) = expr.strip_prefix('-') {
        return sub(rest)?.checked_neg();
    }
    if let Some(rest) = expr.strip_prefix('~') {
        return Some(!sub(rest)?);
    }
    if let Some(rest) = expr.strip_prefix('+') {
        return sub(rest);
    }

    parse_int_literal(expr).or_else(|| {
        items
            .iter()
            .rev()
            .find(|item| item.name == expr)
            .and_then(|item| item.value)
    })
}

/// Rightmost top-level position accepted by `pred`, so that operators of
/// equal precedence associate to the left.
fn find_top_level(expr: &str, pred: impl Fn(&[u8], usize) -> bool) -> Option<usize> {
    let bytes = expr.as_bytes();
    let mut depth = 0i32;
    let mut found = None;
    for i in 0..bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => depth -= 1,
            _ if depth == 0 && pred(bytes, i) => found = Some(i),
            _ => {}
        }
    }
    found
}

fn is_binary_additive(bytes: &[u8], i: usize) -> bool {
    if !matches!(bytes[i], b'+' | b'-') {
        return false;
    }
    bytes[..i]
        .iter()
        .rev()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|&b| b.is_ascii_alphanumeric() || b == b'_' || b == b')' || b == b'\'')
}

/// Remove parentheses wrapping the whole expression.
fn strip_parens(mut expr: &str) -> &str {
    while expr.starts_with('(') && expr.ends_with(')') {
        let inner = &expr[1..expr.len() - 1];
        let mut depth = 0i32;
        let balanced = inner.bytes().all(|b| {
            match b {
                b'(' => depth += 1,
                b')' => depth -= 1,
                _ => {}
            }
            depth >= 0
        });
        if !balanced || depth != 0 {
            break;
        }
        expr = inner.trim();
    }
    expr
}

/// Parse a C integer or character literal.
pub fn parse_int_literal(text: &str) -> Option<i64> {
    if let Some(ch) = text.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')) {
        let mut chars = ch.chars();
        return match (chars.next(), chars.next(), chars.next()) {
            (Some(c), None, None) => Some(c as i64),
            (Some('\\'), Some(e), None) => match e {
                'n' => Some(10),
                't' => Some(9),
                'r' => Some(13),
                '0' => Some(0),
                '\\' | '\'' | '"' => Some(e as i64),
                _ => None,
            },
            _ => None,
        };
    }

    let digits = text.trim_end_matches(['u', 'U', 'l', 'L']);
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok().map(|v| v as i64);
    }
    if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        return u64::from_str_radix(bin, 2).ok().map(|v| v as i64);
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return u64::from_str_radix(&digits[1..], 8).ok().map(|v| v as i64);
    }
    if !digits.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    digits
        .parse::<i64>()
        .ok()
        .or_else(|| digits.parse::<u64>().ok().map(|v| v as i64))
}
