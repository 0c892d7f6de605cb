//! Extracted declaration records.
//!
//! These are textual records: type expressions are kept as normalized C
//! source text rather than resolved into a type system.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Target format of the extracted records.
///
/// The format changes exactly one behavior: JSON output encodes variadic
/// functions through the `vararg` flag alone, every other format also gets a
/// trailing `...` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// JSON type database.
    #[default]
    Json,
    /// Human readable C-like listing.
    Text,
}

impl OutputFormat {
    /// Whether variadic functions get a synthetic `vararg` parameter.
    pub fn wants_vararg_param(&self) -> bool {
        !matches!(self, OutputFormat::Json)
    }
}

/// A function parameter, struct member or typedef entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Param {
    /// Declared name, empty for unnamed parameters.
    pub name: String,
    /// Type text, e.g. `const char *`.
    #[serde(rename = "type")]
    pub type_text: String,
}

impl Param {
    /// Create a new parameter.
    pub fn new(name: impl Into<String>, type_text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_text: type_text.into(),
        }
    }

    /// The synthetic parameter appended to variadic functions.
    pub fn vararg() -> Self {
        Self::new("vararg", "...")
    }

    /// Whether this is the synthetic variadic parameter.
    pub fn is_vararg(&self) -> bool {
        self.type_text == "..."
    }

    /// Format as a C declarator.
    pub fn to_c_string(&self) -> String {
        if self.is_vararg() {
            return "...".to_string();
        }
        if self.name.is_empty() {
            return self.type_text.clone();
        }
        // Function pointer types already spell out their name.
        if self.type_text.contains('(') && self.type_text.contains(&self.name) {
            return self.type_text.clone();
        }
        if let Some(pos) = self.type_text.find('[') {
            let (base, dims) = self.type_text.split_at(pos);
            let base = base.trim_end();
            let sep = if base.ends_with('*') { "" } else { " " };
            return format!("{}{}{}{}", base, sep, self.name, dims);
        }
        if self.type_text.ends_with('*') {
            format!("{}{}", self.type_text, self.name)
        } else {
            format!("{} {}", self.type_text, self.name)
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_c_string())
    }
}

/// An extracted function declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuncInfo {
    /// Raw declaration text.
    pub decl: String,
    /// Function name.
    pub name: String,
    /// Header the declaration came from.
    pub header: String,
    /// Return type text.
    pub ret_type: String,
    /// Ordered parameters.
    pub params: Vec<Param>,
    /// Whether the function takes variable arguments.
    pub vararg: bool,
    /// Calling convention keyword, empty when none was spelled out.
    pub call_conv: String,
}

impl FuncInfo {
    /// Remove underscores from parameter names.
    ///
    /// Headers decorate parameter names inconsistently (`_Str`, `__s`,
    /// `len_`), binary symbol databases do not.
    pub fn delete_underscores_in_param_names(&mut self) {
        for param in &mut self.params {
            param.name.retain(|c| c != '_');
        }
    }

    /// Format as a C prototype.
    pub fn format(&self) -> String {
        let mut params: Vec<String> = self.params.iter().map(Param::to_c_string).collect();
        if self.vararg && !self.params.last().is_some_and(Param::is_vararg) {
            params.push("...".to_string());
        }
        let params = if params.is_empty() {
            "void".to_string()
        } else {
            params.join(", ")
        };

        let mut out = self.ret_type.clone();
        if !out.ends_with('*') {
            out.push(' ');
        }
        if !self.call_conv.is_empty() {
            out.push_str(&self.call_conv);
            out.push(' ');
        }
        out.push_str(&self.name);
        out.push('(');
        out.push_str(&params);
        out.push_str(");");
        out
    }
}

/// Which aggregate keyword introduced a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeKind {
    Struct,
    Union,
}

impl CompositeKind {
    /// The C keyword.
    pub fn keyword(&self) -> &'static str {
        match self {
            CompositeKind::Struct => "struct",
            CompositeKind::Union => "union",
        }
    }
}

impl fmt::Display for CompositeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// An extracted struct or union definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeInfo {
    /// Struct or union.
    pub kind: CompositeKind,
    /// Header the definition came from.
    pub header_text: String,
    /// Raw definition text.
    pub decl: String,
    /// Members in declaration order.
    pub members_list: Vec<Param>,
    /// Tag name (`struct tag { ... }`), may be empty.
    pub name_text: String,
    /// Typedef alias (`typedef struct { ... } alias;`), may be empty.
    pub type_name_text: String,
}

/// An extracted struct definition.
pub type StructInfo = CompositeInfo;

/// An extracted union definition.
pub type UnionInfo = CompositeInfo;

impl CompositeInfo {
    /// The name this definition is stored under: the tag, falling back to
    /// the typedef alias. `None` for anonymous, unaliased definitions.
    pub fn key(&self) -> Option<&str> {
        if !self.name_text.is_empty() {
            Some(&self.name_text)
        } else if !self.type_name_text.is_empty() {
            Some(&self.type_name_text)
        } else {
            None
        }
    }

    /// Look up a member by name.
    pub fn member(&self, name: &str) -> Option<&Param> {
        self.members_list.iter().find(|m| m.name == name)
    }
}

/// One enumerator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumItem {
    /// Enumerator name.
    pub name: String,
    /// Initializer text as written, empty when implicit.
    pub value_text: String,
    /// Evaluated value, when it could be computed.
    pub value: Option<i64>,
}

/// An extracted enum definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumInfo {
    /// Header the definition came from.
    pub header_text: String,
    /// Raw definition text.
    pub decl: String,
    /// Tag name, may be empty.
    pub name_text: String,
    /// Typedef alias, may be empty.
    pub type_name_text: String,
    /// Enumerators in declaration order.
    pub items: Vec<EnumItem>,
}

impl EnumInfo {
    /// The tag, falling back to the alias.
    pub fn key(&self) -> Option<&str> {
        if !self.name_text.is_empty() {
            Some(&self.name_text)
        } else if !self.type_name_text.is_empty() {
            Some(&self.type_name_text)
        } else {
            None
        }
    }

    /// Get the evaluated value of an enumerator.
    pub fn value_of(&self, name: &str) -> Option<i64> {
        self.items.iter().find(|i| i.name == name)?.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_vararg_param() {
        assert!(!OutputFormat::Json.wants_vararg_param());
        assert!(OutputFormat::Text.wants_vararg_param());
    }

    #[test]
    fn test_param_to_c_string() {
        assert_eq!(Param::new("s", "const char *").to_c_string(), "const char *s");
        assert_eq!(Param::new("n", "int").to_c_string(), "int n");
        assert_eq!(Param::new("buf", "char [16]").to_c_string(), "char buf[16]");
        assert_eq!(Param::new("v", "char *[4]").to_c_string(), "char *v[4]");
        assert_eq!(Param::new("", "HANDLE").to_c_string(), "HANDLE");
        assert_eq!(Param::vararg().to_c_string(), "...");
        assert_eq!(
            Param::new("cb", "void (*cb)(int)").to_c_string(),
            "void (*cb)(int)"
        );
    }

    #[test]
    fn test_delete_underscores() {
        let mut f = FuncInfo {
            decl: "int f(int __a, char *_b_);".to_string(),
            name: "f".to_string(),
            header: "f.h".to_string(),
            ret_type: "int".to_string(),
            params: vec![Param::new("__a", "int"), Param::new("_b_", "char *")],
            vararg: false,
            call_conv: String::new(),
        };
        f.delete_underscores_in_param_names();
        assert_eq!(f.params[0].name, "a");
        assert_eq!(f.params[1].name, "b");
    }

    #[test]
    fn test_func_format() {
        let f = FuncInfo {
            decl: String::new(),
            name: "printf".to_string(),
            header: "stdio.h".to_string(),
            ret_type: "int".to_string(),
            params: vec![Param::new("format", "const char *")],
            vararg: true,
            call_conv: String::new(),
        };
        assert_eq!(f.format(), "int printf(const char *format, ...);");
    }

    #[test]
    fn test_func_format_call_conv_and_void() {
        let f = FuncInfo {
            decl: String::new(),
            name: "GetLastError".to_string(),
            header: "winbase.h".to_string(),
            ret_type: "DWORD".to_string(),
            params: Vec::new(),
            vararg: false,
            call_conv: "WINAPI".to_string(),
        };
        assert_eq!(f.format(), "DWORD WINAPI GetLastError(void);");
    }

    #[test]
    fn test_composite_key_prefers_tag() {
        let mut s = CompositeInfo {
            kind: CompositeKind::Struct,
            header_text: "a.h".to_string(),
            decl: String::new(),
            members_list: Vec::new(),
            name_text: "_point".to_string(),
            type_name_text: "point_t".to_string(),
        };
        assert_eq!(s.key(), Some("_point"));
        s.name_text.clear();
        assert_eq!(s.key(), Some("point_t"));
        s.type_name_text.clear();
        assert_eq!(s.key(), None);
    }

    #[test]
    fn test_param_serializes_type_field() {
        let json = serde_json::to_string(&Param::new("x", "int")).unwrap();
        assert_eq!(json, r#"{"name":"x","type":"int"}"#);
    }
}
