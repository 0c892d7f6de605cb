//! Function declarations.
//!
//! Candidates are the `;`/brace separated statements of normalized text
//! that end in a parenthesized list and start with an identifier. Names,
//! return types and calling conventions are read from the tokens in front
//! of the parameter list.

use crate::params::{join_type_tokens, tokenize};
use once_cell::sync::Lazy;
use regex::Regex;

/// Calling convention keywords and the macros headers spell them with.
pub const CALLING_CONVENTIONS: &[&str] = &[
    "__cdecl",
    "_cdecl",
    "cdecl",
    "__stdcall",
    "_stdcall",
    "__fastcall",
    "_fastcall",
    "__thiscall",
    "__vectorcall",
    "__clrcall",
    "__pascal",
    "pascal",
    "PASCAL",
    "WINAPI",
    "WINAPIV",
    "APIENTRY",
    "APIPRIVATE",
    "CALLBACK",
    "NTAPI",
    "WSAAPI",
    "STDAPICALLTYPE",
    "STDAPIVCALLTYPE",
    "STDMETHODCALLTYPE",
];

/// Storage classes and linkage macros that are not part of the return type.
pub const IGNORED_SPECIFIERS: &[&str] = &[
    "extern",
    "static",
    "inline",
    "_inline",
    "__inline",
    "__inline__",
    "__forceinline",
    "__extension__",
    "__extern_inline",
    "__extern_always_inline",
    "virtual",
    "explicit",
    "constexpr",
    "WINBASEAPI",
    "WINUSERAPI",
    "WINADVAPI",
    "WINGDIAPI",
    "WINSOCK_API_LINKAGE",
    "NTSYSAPI",
    "NTSYSCALLAPI",
    "DECLSPEC_IMPORT",
];

/// Words that look like a call when followed by `(` but never name a
/// function.
const NOT_FUNCTION_NAMES: &[&str] = &[
    "if", "while", "for", "switch", "return", "sizeof", "typedef", "defined", "alignof", "decltype",
    "__typeof__", "typeof", "static_assert", "_Static_assert",
];

/// Most nested parentheses a declaration may have before it is treated as
/// a mis-captured blob.
pub const MAX_OPEN_PARENS: usize = 10;

static DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][\w\s\*&:]*\(.*\)(?:\s*const)?$").expect("valid regex")
});

/// The parts of one declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDecl {
    pub name: String,
    pub ret_type: String,
    /// Raw text between the parameter list parentheses.
    pub params: String,
    pub call_conv: String,
}

/// Find every function-declaration-shaped statement.
///
/// Returned declarations end with `;`.
pub fn get_declarations(text: &str) -> Vec<String> {
    text.split([';', '{', '}'])
        .map(str::trim)
        .filter(|stmt| DECLARATION.is_match(stmt))
        .map(|stmt| format!("{};", stmt))
        .collect()
}

/// Whether a declaration has unbalanced or too many parentheses.
pub fn wrong_func_parameters(decl: &str) -> bool {
    let open = decl.matches('(').count();
    open != decl.matches(')').count() || open > MAX_OPEN_PARENS
}

/// Split a declaration into name, return type, parameters and calling
/// convention. `None` when it does not declare a function: statements
/// without a return type are macro invocations.
pub fn parse_func_declaration(decl: &str) -> Option<ParsedDecl> {
    split_declaration(decl).filter(|parsed| !parsed.ret_type.is_empty())
}

fn split_declaration(decl: &str) -> Option<ParsedDecl> {
    let decl = decl.trim().trim_end_matches(';').trim_end();
    let decl = decl.strip_suffix("const").map_or(decl, str::trim_end);

    let (open, close) = last_group(decl)?;
    let prefix = decl[..open].trim_end();
    let params = decl[open + 1..close].trim();

    // `int (*signal(int sig, void (*func)(int)))(int)` returns a function
    // pointer; the declared function sits inside the first group.
    if prefix.ends_with(')') {
        let (inner_open, inner_close) = last_group(prefix)?;
        let inner = prefix[inner_open + 1..inner_close].trim();
        let (conv, inner) = split_leading_call_conv(inner);
        let inner = inner.strip_prefix('*')?;
        let mut parsed = split_declaration(inner.trim_start())?;
        let ret = return_type(&prefix[..inner_open])?;
        parsed.ret_type = format!("{} (*)({})", ret, params);
        if parsed.call_conv.is_empty() {
            parsed.call_conv = conv.to_string();
        }
        return Some(parsed);
    }

    let tokens = tokenize(prefix);
    let (name, ret_tokens) = tokens.split_last()?;
    if !is_identifier(name) || NOT_FUNCTION_NAMES.contains(&name.as_str()) {
        return None;
    }

    let mut call_conv = String::new();
    let mut kept = Vec::with_capacity(ret_tokens.len());
    for tok in ret_tokens {
        if CALLING_CONVENTIONS.contains(&tok.as_str()) {
            call_conv = tok.clone();
        } else if !IGNORED_SPECIFIERS.contains(&tok.as_str()) {
            kept.push(tok.clone());
        }
    }
    if kept.iter().any(|t| t == "typedef") {
        return None;
    }

    Some(ParsedDecl {
        name: name.clone(),
        ret_type: join_type_tokens(&kept),
        params: params.to_string(),
        call_conv,
    })
}

/// Return type spelled in front of a function-pointer declarator.
fn return_type(prefix: &str) -> Option<String> {
    let kept: Vec<String> = tokenize(prefix)
        .into_iter()
        .filter(|tok| {
            !CALLING_CONVENTIONS.contains(&tok.as_str())
                && !IGNORED_SPECIFIERS.contains(&tok.as_str())
        })
        .collect();
    if kept.is_empty() {
        None
    } else {
        Some(join_type_tokens(&kept))
    }
}

fn split_leading_call_conv(text: &str) -> (&str, &str) {
    for &conv in CALLING_CONVENTIONS {
        if let Some(rest) = text.strip_prefix(conv) {
            if rest.starts_with(|c: char| c.is_whitespace() || c == '*') {
                return (conv, rest.trim_start());
            }
        }
    }
    ("", text)
}

/// Byte range of the parenthesized group that ends `text`.
fn last_group(text: &str) -> Option<(usize, usize)> {
    let close = text.len().checked_sub(1)?;
    if !text.ends_with(')') {
        return None;
    }
    let mut depth = 0i32;
    for (i, b) in text.bytes().enumerate().rev() {
        match b {
            b')' => depth += 1,
            b'(' => {
                depth -= 1;
                if depth == 0 {
                    return Some((i, close));
                }
            }
            _ => {}
        }
    }
    None
}

fn is_identifier(token: &str) -> bool {
    token.starts_with(|c: char| c.is_alphabetic() || c == '_')
        && token.chars().all(|c| c.is_alphanumeric() || c == '_' || c == ':')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_declarations() {
        let text = "int f(int a); enum { A, B = MAKE(1) }; int x = g(2); static int sq(int x); FOO";
        assert_eq!(get_declarations(text), vec!["int f(int a);", "static int sq(int x);"]);
    }

    #[test]
    fn test_wrong_func_parameters() {
        assert!(!wrong_func_parameters("int f(int a);"));
        assert!(wrong_func_parameters("int f(int a;"));
        assert!(wrong_func_parameters("int f(int a));"));
        let deep = format!("int f{}{};", "(".repeat(11), ")".repeat(11));
        assert!(wrong_func_parameters(&deep));
        let ok = format!("int f{}{};", "(".repeat(10), ")".repeat(10));
        assert!(!wrong_func_parameters(&ok));
    }

    #[test]
    fn test_parse_simple() {
        let parsed = parse_func_declaration("char *strcpy(char *dest, const char *src);").unwrap();
        assert_eq!(parsed.name, "strcpy");
        assert_eq!(parsed.ret_type, "char *");
        assert_eq!(parsed.params, "char *dest, const char *src");
        assert_eq!(parsed.call_conv, "");
    }

    #[test]
    fn test_parse_call_conv_and_specifiers() {
        let parsed =
            parse_func_declaration("WINBASEAPI BOOL WINAPI CloseHandle(HANDLE hObject);").unwrap();
        assert_eq!(parsed.name, "CloseHandle");
        assert_eq!(parsed.ret_type, "BOOL");
        assert_eq!(parsed.call_conv, "WINAPI");
    }

    #[test]
    fn test_parse_extern_pointer_return() {
        let parsed = parse_func_declaration("extern void *malloc (size_t __size);").unwrap();
        assert_eq!(parsed.name, "malloc");
        assert_eq!(parsed.ret_type, "void *");
        assert_eq!(parsed.params, "size_t __size");
    }

    #[test]
    fn test_parse_returns_function_pointer() {
        let parsed =
            parse_func_declaration("void (*signal(int sig, void (*func)(int)))(int);").unwrap();
        assert_eq!(parsed.name, "signal");
        assert_eq!(parsed.ret_type, "void (*)(int)");
        assert_eq!(parsed.params, "int sig, void (*func)(int)");
    }

    #[test]
    fn test_parse_rejects_non_functions() {
        assert_eq!(parse_func_declaration("if (x);"), None);
        assert_eq!(parse_func_declaration("typedef int f(int);"), None);
        assert_eq!(parse_func_declaration("(x);"), None);
    }

    #[test]
    fn test_parse_rejects_macro_invocation() {
        assert_eq!(parse_func_declaration("DECLARE_HANDLE(HWND);"), None);
    }

    #[test]
    fn test_parse_const_member() {
        let parsed = parse_func_declaration("int size() const;").unwrap();
        assert_eq!(parsed.name, "size");
        assert_eq!(parsed.params, "");
    }
}
