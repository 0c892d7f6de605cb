//! Struct and union definitions.
//!
//! Definitions are located by keyword and cut out with a brace matcher, so
//! nested definitions stay inside their enclosing block. Named definitions
//! found inside a block are reported after it.

use crate::filters::matching_brace;
use crate::params::{expand_declarators, parse_param, split_params, tokenize};
use crate::types::{CompositeInfo, CompositeKind, Param};
use once_cell::sync::Lazy;
use regex::Regex;

static STRUCT_START: Lazy<Regex> = Lazy::new(|| start_pattern("struct"));
static UNION_START: Lazy<Regex> = Lazy::new(|| start_pattern("union"));

fn start_pattern(keyword: &str) -> Regex {
    Regex::new(&format!(
        r"(\btypedef\s+(?:(?:const|volatile)\s+)*)?\b{}\b(?:\s+(\w+))?\s*\{{",
        keyword
    ))
    .expect("valid regex")
}

fn start_regex(kind: CompositeKind) -> &'static Regex {
    match kind {
        CompositeKind::Struct => &STRUCT_START,
        CompositeKind::Union => &UNION_START,
    }
}

/// Byte offsets of one definition inside some text.
#[derive(Debug, Clone, Copy)]
struct Block {
    start: usize,
    open: usize,
    close: usize,
    end: usize,
}

/// Find the next definition at or after `from`.
///
/// A keyword whose brace never closes is skipped, so later definitions are
/// still found.
fn next_block(text: &str, re: &Regex, mut from: usize) -> Option<Block> {
    loop {
        let m = re.find_at(text, from)?;
        let open = m.end() - 1;
        let Some(close) = matching_brace(text.as_bytes(), open) else {
            tracing::trace!(at = m.start(), "skipping unclosed definition");
            from = m.end();
            continue;
        };
        let end = match text[close + 1..].find([';', '{', '}']) {
            Some(i) if text.as_bytes()[close + 1 + i] == b';' => close + 1 + i + 1,
            _ => close + 1,
        };
        return Some(Block {
            start: m.start(),
            open,
            close,
            end,
        });
    }
}

/// Collect definitions nested in `body`, outermost first.
fn nested_blocks(body: &str, re: &Regex, out: &mut Vec<String>) {
    let mut from = 0;
    while let Some(block) = next_block(body, re, from) {
        out.push(body[block.start..block.end].trim().to_string());
        nested_blocks(&body[block.open + 1..block.close], re, out);
        from = block.end;
    }
}

/// Cut every definition of `kind` out of `text`.
///
/// Returns the remaining text and the raw definitions in source order.
pub fn get_all_composites(text: &str, kind: CompositeKind) -> (String, Vec<String>) {
    let re = start_regex(kind);
    let mut text = text.to_string();
    let mut blocks = Vec::new();
    let mut from = 0;

    while let Some(block) = next_block(&text, re, from) {
        blocks.push(text[block.start..block.end].trim().to_string());
        nested_blocks(&text[block.open + 1..block.close], re, &mut blocks);
        text.replace_range(block.start..block.end, " ");
        from = block.start;
    }

    (text, blocks)
}

/// Cut every struct definition out of `text`.
pub fn get_all_structs(text: &str) -> (String, Vec<String>) {
    get_all_composites(text, CompositeKind::Struct)
}

/// Cut every union definition out of `text`.
pub fn get_all_unions(text: &str) -> (String, Vec<String>) {
    get_all_composites(text, CompositeKind::Union)
}

/// Parse one raw definition produced by [`get_all_composites`].
pub fn parse_composite(raw: &str, file: &str, kind: CompositeKind) -> CompositeInfo {
    let mut info = CompositeInfo {
        kind,
        header_text: file.to_string(),
        decl: raw.to_string(),
        members_list: Vec::new(),
        name_text: String::new(),
        type_name_text: String::new(),
    };

    let Some(caps) = start_regex(kind).captures(raw) else {
        return info;
    };
    let is_typedef = caps.get(1).is_some();
    info.name_text = caps.get(2).map_or("", |m| m.as_str()).to_string();

    let open = caps.get(0).map_or(0, |m| m.end() - 1);
    let Some(close) = matching_brace(raw.as_bytes(), open) else {
        return info;
    };

    info.members_list = parse_members(&raw[open + 1..close]);
    if is_typedef {
        let trailer = raw[close + 1..].trim().trim_end_matches(';');
        info.type_name_text = typedef_alias(trailer).unwrap_or_default();
    }
    info
}

/// Parse a struct definition.
pub fn parse_struct(raw: &str, file: &str) -> CompositeInfo {
    parse_composite(raw, file, CompositeKind::Struct)
}

/// Parse a union definition.
pub fn parse_union(raw: &str, file: &str) -> CompositeInfo {
    parse_composite(raw, file, CompositeKind::Union)
}

/// The first plain (non-pointer) name of a typedef declarator list.
pub(crate) fn typedef_alias(trailer: &str) -> Option<String> {
    split_params(trailer).into_iter().find_map(|decl| {
        let tokens = tokenize(&decl);
        match tokens.as_slice() {
            [name] if name.chars().all(|c| c.is_alphanumeric() || c == '_') => Some(name.clone()),
            _ => None,
        }
    })
}

/// Parse the member declarations of a definition body.
pub fn parse_members(body: &str) -> Vec<Param> {
    split_statements(body)
        .iter()
        .flat_map(|stmt| expand_declarators(stmt))
        .filter_map(|decl| parse_param(strip_bitfield(&decl)))
        .collect()
}

/// Split on top-level `;`.
fn split_statements(body: &str) -> Vec<String> {
    let mut stmts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (i, ch) in body.char_indices() {
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ';' if depth == 0 => {
                let stmt = body[start..i].trim();
                if !stmt.is_empty() {
                    stmts.push(stmt.to_string());
                }
                start = i + 1;
            }
            _ => {}
        }
    }
    let rest = body[start..].trim();
    if !rest.is_empty() {
        stmts.push(rest.to_string());
    }
    stmts
}

/// Drop a bit-field width (`flags : 3`), leaving `::` scopes alone.
fn strip_bitfield(decl: &str) -> &str {
    let bytes = decl.as_bytes();
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b':' if depth == 0 => {
                let scoped = bytes.get(i + 1) == Some(&b':') || (i > 0 && bytes[i - 1] == b':');
                if !scoped {
                    return &decl[..i];
                }
            }
            _ => {}
        }
    }
    decl
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_all_structs_excises() {
        let text = "int a; struct point { int x; int y; }; int f(void);";
        let (rest, blocks) = get_all_structs(text);
        assert_eq!(blocks, vec!["struct point { int x; int y; };"]);
        assert_eq!(rest, "int a;   int f(void);");
    }

    #[test]
    fn test_get_all_structs_typedef() {
        let text = "typedef struct _POINT { LONG x; LONG y; } POINT, *PPOINT;";
        let (rest, blocks) = get_all_structs(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0], text);
        assert_eq!(rest.trim(), "");
    }

    #[test]
    fn test_get_all_structs_ignores_references() {
        let text = "struct stat; int stat(const char *path, struct stat *buf);";
        let (rest, blocks) = get_all_structs(text);
        assert!(blocks.is_empty());
        assert_eq!(rest, text);
    }

    #[test]
    fn test_get_all_structs_nested() {
        let text = "struct outer { struct inner { int a; } in; int b; };";
        let (_, blocks) = get_all_structs(text);
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].starts_with("struct outer"));
        assert_eq!(blocks[1], "struct inner { int a; } in;");
    }

    #[test]
    fn test_get_all_unions_inside_struct() {
        let text = "struct s { int kind; union { int i; float f; } u; };";
        let (_, blocks) = get_all_unions(text);
        assert_eq!(blocks, vec!["union { int i; float f; } u;"]);
    }

    #[test]
    fn test_get_all_structs_unbalanced() {
        let text = "struct broken { int a;";
        let (rest, blocks) = get_all_structs(text);
        assert!(blocks.is_empty());
        assert_eq!(rest, text);
    }

    #[test]
    fn test_get_all_structs_skips_unclosed() {
        let text = "struct broken { int a; struct ok { int y; }; int g(int q);";
        let (rest, blocks) = get_all_structs(text);
        assert_eq!(blocks, vec!["struct ok { int y; };"]);
        assert_eq!(rest, "struct broken { int a;   int g(int q);");
    }

    #[test]
    fn test_get_all_structs_unclosed_then_later() {
        let text = "struct ctx { struct ctx { int a; }; struct later { int y; }; int f(void);";
        let (_, blocks) = get_all_structs(text);
        assert_eq!(
            blocks,
            vec!["struct ctx { int a; };", "struct later { int y; };"]
        );
    }

    #[test]
    fn test_parse_struct_tag_and_alias() {
        let info = parse_struct(
            "typedef struct _POINT { LONG x; LONG y; } POINT, *PPOINT;",
            "windef.h",
        );
        assert_eq!(info.kind, CompositeKind::Struct);
        assert_eq!(info.name_text, "_POINT");
        assert_eq!(info.type_name_text, "POINT");
        assert_eq!(info.header_text, "windef.h");
        assert_eq!(
            info.members_list,
            vec![Param::new("x", "LONG"), Param::new("y", "LONG")]
        );
        assert_eq!(info.key(), Some("_POINT"));
    }

    #[test]
    fn test_parse_struct_anonymous_typedef() {
        let info = parse_struct("typedef struct { int a; } *PANON, ANON;", "a.h");
        assert_eq!(info.name_text, "");
        assert_eq!(info.type_name_text, "ANON");
    }

    #[test]
    fn test_parse_struct_variable_is_not_alias() {
        let info = parse_struct("struct { int a; } instance;", "a.h");
        assert_eq!(info.key(), None);
    }

    #[test]
    fn test_parse_members() {
        let members = parse_members(
            " int a, *b; char name[16]; unsigned flags : 3; void (*cb)(int, int); union { int i; float f; } u; ",
        );
        assert_eq!(
            members,
            vec![
                Param::new("a", "int"),
                Param::new("b", "int *"),
                Param::new("name", "char [16]"),
                Param::new("flags", "unsigned"),
                Param::new("cb", "void (*cb)(int, int)"),
                Param::new("u", "union { int i; float f; }"),
            ]
        );
    }

    #[test]
    fn test_parse_union() {
        let info = parse_union("union value { int i; float f; char *s; };", "v.h");
        assert_eq!(info.kind, CompositeKind::Union);
        assert_eq!(info.name_text, "value");
        assert_eq!(info.members_list.len(), 3);
        assert_eq!(info.member("s"), Some(&Param::new("s", "char *")));
    }

    #[test]
    fn test_strip_bitfield_keeps_scope() {
        assert_eq!(strip_bitfield("unsigned a : 1"), "unsigned a ");
        assert_eq!(strip_bitfield("std::size_t n"), "std::size_t n");
    }
}
