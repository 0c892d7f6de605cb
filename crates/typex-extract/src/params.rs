//! Parameter-list grammar.
//!
//! Function parameters, struct members and typedef declarators all share
//! the `type declarator` shape, so one splitter and one parser serve all of
//! them.

use crate::types::Param;
use once_cell::sync::Lazy;
use regex::Regex;

/// Words that can only be part of a type, never a declared name.
const TYPE_KEYWORDS: &[&str] = &[
    "void", "char", "short", "int", "long", "float", "double", "signed", "unsigned", "bool",
    "_Bool", "_Complex", "wchar_t", "char8_t", "char16_t", "char32_t", "const", "volatile",
    "restrict", "__restrict", "register", "__int8", "__int16", "__int32", "__int64", "__ptr32",
    "__ptr64", "__unaligned",
];

/// Words that may precede a type without being one.
const QUALIFIERS: &[&str] = &["const", "volatile", "restrict", "__restrict", "register"];

/// `(*name)(` and its variants, e.g. `(__stdcall *name[4])(`.
static FUNC_PTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(\s*(?:\w+\s+)*[*&^]+\s*(?:const\s+)?(\w*)\s*(?:\[[^\]]*\]\s*)*\)\s*\(")
        .expect("valid regex")
});

/// What may follow the base type of a declarator list.
static DECLARATOR_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+(?:\*|\w|\(\*)").expect("valid regex"));

/// Split a parameter list on top-level commas.
///
/// Commas nested in parentheses, brackets or braces do not split. Empty
/// fragments are dropped.
pub fn split_params(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (i, ch) in text.char_indices() {
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                push_fragment(&mut parts, &text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    push_fragment(&mut parts, &text[start..]);
    parts
}

fn push_fragment(parts: &mut Vec<String>, fragment: &str) {
    let fragment = fragment.trim();
    if !fragment.is_empty() {
        parts.push(fragment.to_string());
    }
}

/// Parse a whole parameter list. A lone `void` means no parameters.
pub fn parse_func_parameters(text: &str) -> Vec<Param> {
    let parts = split_params(text);
    if parts.len() == 1 && parts[0] == "void" {
        return Vec::new();
    }
    parts.iter().filter_map(|p| parse_param(p)).collect()
}

/// Parse a single `type declarator` fragment.
pub fn parse_param(text: &str) -> Option<Param> {
    let text = strip_default_value(text).trim();
    if text.is_empty() || text == "void" {
        return None;
    }
    if text == "..." {
        return Some(Param::vararg());
    }

    if let Some(caps) = FUNC_PTR.captures(text) {
        let name = caps.get(1).map_or("", |m| m.as_str());
        return Some(Param::new(name, text));
    }

    let tokens = tokenize(text);
    let dims_start = tokens
        .iter()
        .rposition(|t| !t.starts_with('['))
        .map_or(0, |i| i + 1);
    let (rest, dims) = tokens.split_at(dims_start);
    let dims = dims.concat();

    let named = rest.len() >= 2 && {
        let last = &rest[rest.len() - 1];
        let prev = &rest[rest.len() - 2];
        is_identifier(last)
            && !TYPE_KEYWORDS.contains(&last.as_str())
            && !matches!(prev.as_str(), "struct" | "union" | "enum" | "class")
            && !rest[..rest.len() - 1]
                .iter()
                .all(|t| QUALIFIERS.contains(&t.as_str()))
    };

    let (name, base) = if named {
        (rest[rest.len() - 1].as_str(), &rest[..rest.len() - 1])
    } else {
        ("", rest)
    };

    let mut type_text = join_type_tokens(base);
    if !dims.is_empty() {
        if !type_text.is_empty() && !type_text.ends_with(['*', '&']) {
            type_text.push(' ');
        }
        type_text.push_str(&dims);
    }
    Some(Param::new(name, type_text))
}

/// Expand `base a, *b, c[2]` into `base a`, `base *b`, `base c[2]`.
///
/// The shared base type is the longest leading run of words of the first
/// declarator that is still followed by a declarator (`*`, a word or `(*`).
pub fn expand_declarators(text: &str) -> Vec<String> {
    let parts = split_params(text);
    let Some(first) = parts.first() else {
        return Vec::new();
    };

    let mut out = vec![first.clone()];
    if parts.len() > 1 {
        let base = shared_base_type(first);
        out.extend(
            parts[1..]
                .iter()
                .map(|p| format!("{} {}", base, p).trim().to_string()),
        );
    }
    out
}

/// The base type shared by all declarators of a list, judged from the first.
pub fn shared_base_type(first: &str) -> &str {
    let run = first
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c.is_whitespace()))
        .unwrap_or(first.len());

    let mut ends: Vec<usize> = first[..run].char_indices().map(|(i, _)| i).skip(1).collect();
    ends.push(run);

    ends.into_iter()
        .rev()
        .find(|&end| DECLARATOR_START.is_match(&first[end..]))
        .map_or("", |end| first[..end].trim())
}

fn strip_default_value(text: &str) -> &str {
    let mut depth = 0i32;
    for (i, ch) in text.char_indices() {
        match ch {
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' | '>' => depth -= 1,
            '=' if depth == 0 => return &text[..i],
            _ => {}
        }
    }
    text
}

fn is_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Split type text into words, `*`/`&`, `...` and balanced bracket groups.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_alphanumeric() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || is_scope(&chars, i)) {
                i += if chars[i] == ':' { 2 } else { 1 };
            }
            tokens.push(chars[start..i.min(chars.len())].iter().collect());
        } else if let Some(close) = closing(c) {
            let start = i;
            let mut depth = 0;
            while i < chars.len() {
                if chars[i] == c {
                    depth += 1;
                } else if chars[i] == close {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                i += 1;
            }
            i = (i + 1).min(chars.len());
            tokens.push(chars[start..i].iter().collect());
        } else if c == '.' && chars.get(i + 1) == Some(&'.') && chars.get(i + 2) == Some(&'.') {
            tokens.push("...".to_string());
            i += 3;
        } else {
            tokens.push(c.to_string());
            i += 1;
        }
    }
    tokens
}

fn is_scope(chars: &[char], i: usize) -> bool {
    chars[i] == ':' && chars.get(i + 1) == Some(&':')
}

fn closing(open: char) -> Option<char> {
    match open {
        '(' => Some(')'),
        '[' => Some(']'),
        '{' => Some('}'),
        _ => None,
    }
}

/// Join type tokens with single spaces, keeping pointer runs together.
pub(crate) fn join_type_tokens(tokens: &[String]) -> String {
    let mut out = String::new();
    for tok in tokens {
        let glue = matches!(tok.as_str(), "*" | "&") && out.ends_with(['*', '&']);
        if !out.is_empty() && !glue {
            out.push(' ');
        }
        out.push_str(tok);
    }
    out
}
