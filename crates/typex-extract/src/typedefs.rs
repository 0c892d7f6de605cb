//! Plain typedef statements.
//!
//! Typedef declarators have the same shape as parameters, so each one is
//! run through the parameter grammar: the alias becomes the name and the
//! aliased type the type text.

use crate::params::{expand_declarators, parse_func_parameters};
use crate::types::Param;
use once_cell::sync::Lazy;
use regex::Regex;

/// `typedef <expr>;` where the expression holds no braces, which leaves out
/// struct, union and enum definitions.
static TYPEDEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\btypedef\s*([\w\s\*\[\]\(\),.+\-/]+?)\s*;").expect("valid regex")
});

/// `(*NAME)` at the end of a declarator.
static PARENTHESIZED_POINTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((\s*\*\s*\w+)\)(;?)$").expect("valid regex"));

/// Find the right-hand sides of all typedef statements.
pub fn get_typedefs(text: &str) -> Vec<String> {
    TYPEDEF
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Parse every typedef in `text` into (alias, type) entries.
pub fn parse_typedefs(text: &str) -> Vec<Param> {
    let mut parsed = Vec::new();
    for t_def in get_typedefs(text) {
        let declarators = expand_declarators(&t_def);
        if declarators.is_empty() {
            continue;
        }
        for decl in declarators {
            let decl = if decl.ends_with(')') {
                remove_brackets_around_pointer(&decl)
            } else {
                decl
            };
            parsed.extend(parse_func_parameters(&decl));
        }
    }
    parsed
}

/// Turn `int (*HANDLER)` into `int *HANDLER`; function pointers such as
/// `void (*CB)(int)` are left alone.
pub fn remove_brackets_around_pointer(decl: &str) -> String {
    PARENTHESIZED_POINTER.replace(decl, "$1$2").into_owned()
}
