//! Text passes that prepare header text for extraction.
//!
//! The normalizer removes everything the declaration patterns cannot cope
//! with: comments, preprocessor lines, linkage blocks, compiler and SAL
//! annotations and inline function bodies. The result is collapsed to a
//! single line with single spaces.

use once_cell::sync::Lazy;
use regex::Regex;

/// Annotations that carry no type information.
const ANNOTATION_PATTERNS: &[&str] = &[
    r#"\bextern\s+"C(?:\+\+)?"\s*\{?"#,
    r"\b__attribute__\s*\(\((?:[^()]|\([^()]*\))*\)\)",
    r"\b__declspec\s*\((?:[^()]|\([^()]*\))*\)",
    r#"\b__asm(?:__)?\s*\((?:[^()"]|"[^"]*")*\)"#,
    // glibc
    r"\b__(?:attr_\w+|nonnull|access)\s*\(\((?:[^()]|\([^()]*\))*\)\)",
    r"\b__(?:THROW|THROWNL|wur|BEGIN_DECLS|END_DECLS|attribute_\w+__|restrict)\b",
    // SAL 2
    r"\b_(?:In|Out|Inout|Outptr|Deref|Ret|Pre|Post|Success|Check|Must|Printf|Scanf|Reserved|Frees|Null|NullNull|Field|When|Use|Analysis|Kernel|IRQL)(?:_\w*)?_(?:\s*\((?:[^()]|\([^()]*\))*\))?",
    // SAL 1
    r"\b__(?:in|out|inout|deref|reserved)(?:_\w+)?\b(?:\s*\([^()]*\))?",
    // MSVC decoration macros
    r"\b(?:DECLSPEC_\w+|_CRT_\w*(?:DEPRECATE|INSECURE|ATTRIBUTE|NOALIAS|RESTRICT)\w*)(?:\s*\((?:[^()]|\([^()]*\))*\))?",
    r"\b(?:EXTERN_C_START|EXTERN_C_END|_ACRTIMP|_CRTIMP\w*|_CRT_BEGIN_C_HEADER|_CRT_END_C_HEADER)\b",
];

static ANNOTATIONS: Lazy<Vec<Regex>> = Lazy::new(|| {
    ANNOTATION_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("annotation pattern is valid"))
        .collect()
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

static ONELINE_TYPEDEF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\btypedef\b[^;{}]*;").expect("valid regex"));

/// Run every normalization pass over raw header text.
pub fn use_filters(text: &str) -> String {
    let text = remove_comments(text);
    let text = remove_preprocessor_lines(&text);
    let text = remove_annotations(&text);
    let text = remove_function_bodies(&text);
    collapse_whitespace(&text)
}

/// Remove one-line `typedef ...;` statements.
///
/// Function pointer typedefs look like function declarations to the
/// declaration pattern.
pub fn filter_oneline_typedefs(text: &str) -> String {
    ONELINE_TYPEDEF.replace_all(text, "").into_owned()
}

/// Strip `/* */` and `//` comments, leaving string and char literals alone.
pub fn remove_comments(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    let mut copy_from = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b'"' | b'\'' => {
                let quote = bytes[pos];
                pos += 1;
                while pos < bytes.len() && bytes[pos] != quote && bytes[pos] != b'\n' {
                    if bytes[pos] == b'\\' {
                        pos += 1;
                    }
                    pos += 1;
                }
                pos += 1;
            }
            b'/' if bytes.get(pos + 1) == Some(&b'/') => {
                out.push_str(&text[copy_from..pos]);
                // A backslash-newline continues a line comment.
                while pos < bytes.len() {
                    if bytes[pos] == b'\n' && (pos == 0 || bytes[pos - 1] != b'\\') {
                        break;
                    }
                    pos += 1;
                }
                copy_from = pos;
            }
            b'/' if bytes.get(pos + 1) == Some(&b'*') => {
                out.push_str(&text[copy_from..pos]);
                out.push(' ');
                pos = match text[pos + 2..].find("*/") {
                    Some(end) => pos + 2 + end + 2,
                    None => bytes.len(),
                };
                copy_from = pos;
            }
            _ => pos += 1,
        }
    }

    if copy_from < bytes.len() {
        out.push_str(&text[copy_from..]);
    }
    out
}

/// Drop preprocessor directives, including their continuation lines.
pub fn remove_preprocessor_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut continued = false;

    for line in text.lines() {
        let directive = continued || line.trim_start().starts_with('#');
        continued = directive && line.trim_end().ends_with('\\');
        if !directive {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// Remove compiler, SAL and linkage annotations.
pub fn remove_annotations(text: &str) -> String {
    let mut text = text.to_string();
    for re in ANNOTATIONS.iter() {
        if re.is_match(&text) {
            text = re.replace_all(&text, " ").into_owned();
        }
    }
    text
}

/// Replace inline function bodies with `;`, turning definitions into
/// declarations.
pub fn remove_function_bodies(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copy_from = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos] != b')' {
            pos += 1;
            continue;
        }

        let mut open = pos + 1;
        while open < bytes.len() && bytes[open].is_ascii_whitespace() {
            open += 1;
        }
        // C++ member qualifiers between the parameter list and the body.
        for qualifier in ["const", "noexcept", "override"] {
            let rest = &text[open..];
            let whole_word = rest.starts_with(qualifier)
                && !rest[qualifier.len()..].starts_with(|c: char| c.is_alphanumeric() || c == '_');
            if whole_word {
                open += qualifier.len();
                while open < bytes.len() && bytes[open].is_ascii_whitespace() {
                    open += 1;
                }
            }
        }

        if bytes.get(open) == Some(&b'{') {
            if let Some(close) = matching_brace(bytes, open) {
                out.push_str(&text[copy_from..=pos]);
                out.push(';');
                pos = close + 1;
                copy_from = pos;
                continue;
            }
        }
        pos += 1;
    }

    out.push_str(&text[copy_from..]);
    out
}

/// Collapse runs of whitespace into single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Find the `}` matching the `{` at `open`.
pub(crate) fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_comments() {
        let text = "int a; // line\n/* block\n comment */int b;";
        assert_eq!(collapse_whitespace(&remove_comments(text)), "int a; int b;");
    }

    #[test]
    fn test_remove_comments_keeps_string_literals() {
        let text = r#"char *s = "http://x/*y*/";"#;
        assert_eq!(remove_comments(text), text);
    }

    #[test]
    fn test_remove_comments_unterminated_block() {
        assert_eq!(remove_comments("int a; /* never closed").trim(), "int a;");
    }

    #[test]
    fn test_remove_preprocessor_lines() {
        let text = "#define X 1\n#define LONG(a) \\\n  (a + 1)\nint f(void);\n  #ifdef Y\n";
        assert_eq!(remove_preprocessor_lines(text), "int f(void);\n");
    }

    #[test]
    fn test_remove_annotations_attribute() {
        let text = "int printf(const char *, ...) __attribute__((format(printf, 1, 2)));";
        assert_eq!(
            collapse_whitespace(&remove_annotations(text)),
            "int printf(const char *, ...) ;"
        );
    }

    #[test]
    fn test_remove_annotations_sal() {
        let text = "BOOL WINAPI ReadFile(_In_ HANDLE h, _Out_writes_bytes_(n) LPVOID buf, __in_opt DWORD n);";
        assert_eq!(
            collapse_whitespace(&remove_annotations(text)),
            "BOOL WINAPI ReadFile( HANDLE h, LPVOID buf, DWORD n);"
        );
    }

    #[test]
    fn test_remove_annotations_keeps_int64() {
        let text = "__int64 f(__inline int x);";
        assert_eq!(remove_annotations(text), text);
    }

    #[test]
    fn test_remove_annotations_glibc() {
        let text = "extern void *malloc (size_t __size) __THROW __attribute_malloc__ __wur;";
        assert_eq!(
            collapse_whitespace(&remove_annotations(text)),
            "extern void *malloc (size_t __size) ;"
        );
    }

    #[test]
    fn test_remove_linkage() {
        let text = "extern \"C\" {\nint f(void);\n}";
        assert_eq!(collapse_whitespace(&remove_annotations(text)), "int f(void); }");
    }

    #[test]
    fn test_remove_function_bodies() {
        let text = "static inline int sq(int x) { if (x) { return x * x; } return 0; } int g(void);";
        assert_eq!(
            remove_function_bodies(text),
            "static inline int sq(int x); int g(void);"
        );
    }

    #[test]
    fn test_remove_function_bodies_const_member() {
        let text = "int get() const { return v; }";
        assert_eq!(remove_function_bodies(text), "int get();");
    }

    #[test]
    fn test_remove_function_bodies_qualifier_is_whole_word() {
        let text = "int f() constoverride { return 1; }";
        assert_eq!(remove_function_bodies(text), text);
        let text = "int f() constexpr { return 1; }";
        assert_eq!(remove_function_bodies(text), text);
        assert_eq!(remove_function_bodies("void f() override { }"), "void f();");
    }

    #[test]
    fn test_remove_function_bodies_unbalanced() {
        let text = "int f(void) { return 0;";
        assert_eq!(remove_function_bodies(text), text);
    }

    #[test]
    fn test_filter_oneline_typedefs() {
        let text = "typedef void (*CB)(int x); int f(int); typedef enum { A } E;";
        assert_eq!(
            filter_oneline_typedefs(text),
            " int f(int); typedef enum { A } E;"
        );
    }

    #[test]
    fn test_use_filters() {
        let text = "/* c */\n#include <x.h>\nint\n  f(int a);   // f\n";
        assert_eq!(use_filters(text), "int f(int a);");
    }
}
