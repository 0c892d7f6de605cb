//! Non-fatal findings reported alongside an extraction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of record a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    Function,
    Struct,
    Union,
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeclKind::Function => "declaration",
            DeclKind::Struct => "struct",
            DeclKind::Union => "union",
        };
        f.write_str(s)
    }
}

/// Where a record came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    /// Header file identifier.
    pub file: String,
    /// Raw declaration or definition text.
    pub text: String,
}

impl Origin {
    pub fn new(file: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            text: text.into(),
        }
    }
}

/// A name collision: the first record was kept, the duplicate dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DeclKind,
    pub name: String,
    /// The record that was kept.
    pub first: Origin,
    /// The record that was dropped.
    pub duplicate: Origin,
}

impl Diagnostic {
    pub fn duplicate(kind: DeclKind, name: impl Into<String>, first: Origin, duplicate: Origin) -> Self {
        Self {
            kind,
            name: name.into(),
            first,
            duplicate,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Duplicit {}: {}\nFile: {}\n{}\nFirst {} was:\nFile: {}\n{}",
            self.kind,
            self.name,
            self.duplicate.file,
            self.duplicate.text,
            self.kind,
            self.first.file,
            self.first.text
        )
    }
}

/// Collects diagnostics for one extraction call.
///
/// Every pushed diagnostic is also emitted as a `tracing` warning.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(
            kind = %diagnostic.kind,
            name = %diagnostic.name,
            "{}",
            diagnostic
        );
        self.items.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display_names_both_files() {
        let d = Diagnostic::duplicate(
            DeclKind::Function,
            "foo",
            Origin::new("a.h", "int foo(void);"),
            Origin::new("b.h", "int foo(int x);"),
        );
        let msg = d.to_string();
        assert!(msg.starts_with("Duplicit declaration: foo"));
        assert!(msg.contains("File: b.h\nint foo(int x);"));
        assert!(msg.contains("First declaration was:\nFile: a.h\nint foo(void);"));
    }

    #[test]
    fn test_diagnostics_collects() {
        let mut diags = Diagnostics::new();
        assert!(diags.is_empty());
        diags.push(Diagnostic::duplicate(
            DeclKind::Struct,
            "s",
            Origin::new("a.h", "struct s { int a; };"),
            Origin::new("a.h", "struct s { int b; };"),
        ));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags.into_vec()[0].kind, DeclKind::Struct);
    }
}
