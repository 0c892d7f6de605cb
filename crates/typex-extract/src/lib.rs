//! # typex-extract
//!
//! Best-effort extraction of declarations from C and C++ headers.
//!
//! This crate provides:
//! - Text normalization (comments, preprocessor lines, compiler annotations)
//! - Function declarations with return type, parameters, calling convention
//!   and varargs
//! - Struct and union definitions with their members
//! - Enum definitions with evaluated enumerator values
//! - Typedefs
//! - A configurable filter for generic-text (`TCHAR`) functions and prose
//!   captured as declarations
//! - A type database merging many headers, first occurrence wins
//!
//! Extraction is regex and brace-matching driven, not a C parser. Input that
//! does not look like a declaration is skipped rather than rejected.
//!
//! # Example
//!
//! ```ignore
//! use typex_extract::{extract, OutputFormat, TypeDatabase};
//!
//! let found = extract("stdio.h", "int printf(const char *format, ...);", OutputFormat::Json);
//! let printf = &found.functions["printf"];
//! assert!(printf.vararg);
//!
//! let mut db = TypeDatabase::new();
//! db.merge(found);
//! ```

pub mod composites;
pub mod database;
pub mod diagnostics;
pub mod enums;
pub mod extractor;
pub mod filters;
pub mod functions;
pub mod params;
pub mod policy;
pub mod typedefs;
pub mod types;

pub use database::{DatabaseStats, TypeDatabase};
pub use diagnostics::{DeclKind, Diagnostic, Diagnostics, Origin};
pub use extractor::{extract, Extraction, Extractor};
pub use policy::{FilterPolicy, FunctionFilter};
pub use types::*;

use std::path::PathBuf;

/// Error type for extraction operations.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

pub type Result<T> = std::result::Result<T, ExtractError>;
