//! Header extraction command.
//!
//! Walks the given paths, extracts every header and merges the results
//! into one type database, which is printed as JSON or as C-like text.

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use typex_extract::{
    CompositeInfo, EnumInfo, Extractor, FilterPolicy, OutputFormat, TypeDatabase,
};
use walkdir::WalkDir;

/// File extensions treated as headers when walking directories.
const HEADER_EXTENSIONS: &[&str] = &["h", "hh", "hpp", "hxx", "inc"];

/// Arguments of `typex extract`.
#[derive(Args)]
pub struct ExtractArgs {
    /// Header files or directories to scan recursively
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: Format,

    /// Write output to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON filter policy replacing the builtin one
    #[arg(long)]
    policy: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// JSON type database
    Json,
    /// C-like prototypes and type definitions
    Text,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => OutputFormat::Json,
            Format::Text => OutputFormat::Text,
        }
    }
}

/// Handle `typex extract`.
pub fn handle_extract_command(args: ExtractArgs) -> Result<()> {
    let policy = match &args.policy {
        Some(path) => FilterPolicy::load(path)
            .with_context(|| format!("Failed to load filter policy: {}", path.display()))?,
        None => FilterPolicy::default(),
    };
    let extractor =
        Extractor::with_policy(&policy, args.format.into()).context("Invalid filter policy")?;

    let files = collect_headers(&args.paths)?;
    if files.is_empty() {
        bail!("No header files found");
    }

    let mut db = TypeDatabase::new();
    let mut duplicates = 0;
    let mut collisions = 0;
    for file in &files {
        debug!(file = %file.display(), "extracting");
        let extraction = extractor
            .extract_file(file)
            .with_context(|| format!("Failed to read header: {}", file.display()))?;
        duplicates += extraction.diagnostics.len();
        collisions += db.merge(extraction);
    }

    let stats = db.stats();
    info!(
        files = files.len(),
        functions = stats.functions,
        typedefs = stats.typedefs,
        structs = stats.structs,
        unions = stats.unions,
        enums = stats.enums,
        duplicates,
        collisions,
        "extraction finished"
    );

    let rendered = match args.format {
        Format::Json => db.to_json()?,
        Format::Text => render_text(&db),
    };

    match &args.output {
        Some(path) => fs::write(path, format!("{}\n", rendered))
            .with_context(|| format!("Failed to write output: {}", path.display()))?,
        None => println!("{}", rendered),
    }
    Ok(())
}

/// Expand directories into the headers below them, in sorted order.
pub fn collect_headers(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry
                    .with_context(|| format!("Failed to walk directory: {}", path.display()))?;
                if entry.file_type().is_file() && is_header(entry.path()) {
                    files.push(entry.into_path());
                }
            }
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            bail!("No such file or directory: {}", path.display());
        }
    }
    Ok(files)
}

fn is_header(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| HEADER_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Render the database as C-like text, one declaration per line.
pub fn render_text(db: &TypeDatabase) -> String {
    let mut lines = Vec::new();

    lines.extend(db.typedefs().map(|t| format!("typedef {};", t.to_c_string())));
    lines.extend(db.structs().chain(db.unions()).map(render_composite));
    lines.extend(db.enums().map(render_enum));
    lines.extend(db.functions().map(|f| f.format()));

    lines.join("\n")
}

fn render_composite(info: &CompositeInfo) -> String {
    let members: String = info
        .members_list
        .iter()
        .map(|m| format!(" {};", m.to_c_string()))
        .collect();
    format!(
        "{} {} {{{} }};",
        info.kind.keyword(),
        info.key().unwrap_or_default(),
        members
    )
}

fn render_enum(info: &EnumInfo) -> String {
    let items: Vec<String> = info
        .items
        .iter()
        .map(|item| match (item.value, item.value_text.is_empty()) {
            (Some(value), _) => format!("{} = {}", item.name, value),
            (None, false) => format!("{} = {}", item.name, item.value_text),
            (None, true) => item.name.clone(),
        })
        .collect();
    let name = info.key().map(|k| format!("{} ", k)).unwrap_or_default();
    format!("enum {}{{ {} }};", name, items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use typex_extract::extract;

    #[test]
    fn test_is_header() {
        assert!(is_header(Path::new("a/windows.h")));
        assert!(is_header(Path::new("vector.HPP")));
        assert!(is_header(Path::new("defs.inc")));
        assert!(!is_header(Path::new("main.c")));
        assert!(!is_header(Path::new("Makefile")));
    }

    #[test]
    fn test_collect_headers_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("b.h"), "").unwrap();
        fs::write(dir.path().join("a.hpp"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::write(dir.path().join("sub").join("c.h"), "").unwrap();

        let files = collect_headers(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.hpp"),
                PathBuf::from("b.h"),
                PathBuf::from("sub").join("c.h"),
            ]
        );
    }

    #[test]
    fn test_collect_headers_missing() {
        assert!(collect_headers(&[PathBuf::from("/nonexistent/dir")]).is_err());
    }

    #[test]
    fn test_render_text() {
        let mut db = TypeDatabase::new();
        db.merge(extract(
            "a.h",
            "typedef unsigned long DWORD; struct pt { int x; int y; }; \
             enum color { RED, GREEN = 4 }; int printf(const char *format, ...);",
            OutputFormat::Text,
        ));
        assert_eq!(
            render_text(&db),
            "typedef unsigned long DWORD;\n\
             struct pt { int x; int y; };\n\
             enum color { RED = 0, GREEN = 4 };\n\
             int printf(const char *format, ...);"
        );
    }
}
