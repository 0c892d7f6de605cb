//! The extraction pipeline.
//!
//! Stages run in a fixed order over one header's text:
//!
//! 1. normalize the text ([`use_filters`])
//! 2. structs, which are cut out of the working text
//! 3. unions, read from the text as it was before structs were cut
//! 4. enums and typedefs, read from the struct-free text
//! 5. one-line typedefs are dropped before functions are collected
//! 6. functions, then the function filter
//!
//! Duplicate names keep their first occurrence; each collision becomes a
//! [`Diagnostic`].

use crate::composites::{get_all_structs, get_all_unions, parse_composite};
use crate::diagnostics::{DeclKind, Diagnostic, Diagnostics, Origin};
use crate::enums::{get_all_enums, parse_enum};
use crate::filters::{filter_oneline_typedefs, use_filters};
use crate::functions::{get_declarations, parse_func_declaration, wrong_func_parameters};
use crate::params::parse_func_parameters;
use crate::policy::{FilterPolicy, FunctionFilter};
use crate::typedefs::parse_typedefs;
use crate::types::{CompositeInfo, CompositeKind, EnumInfo, FuncInfo, OutputFormat, Param};
use crate::{ExtractError, Result};
use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, trace};

/// Everything found in one header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    /// Functions keyed by name.
    pub functions: IndexMap<String, FuncInfo>,
    /// Typedefs in source order. Names may repeat.
    pub typedefs: Vec<Param>,
    /// Structs keyed by tag, or by typedef alias when untagged.
    pub structs: IndexMap<String, CompositeInfo>,
    /// Unions keyed like structs.
    pub unions: IndexMap<String, CompositeInfo>,
    /// Enums in source order. Not deduplicated.
    pub enums: Vec<EnumInfo>,
    /// Name collisions seen while extracting.
    pub diagnostics: Vec<Diagnostic>,
}

impl Extraction {
    /// Whether nothing at all was extracted.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
            && self.typedefs.is_empty()
            && self.structs.is_empty()
            && self.unions.is_empty()
            && self.enums.is_empty()
    }
}

/// Runs the pipeline with a fixed function filter and output format.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    filter: FunctionFilter,
    format: OutputFormat,
}

impl Extractor {
    /// Create an extractor with the builtin filter policy.
    pub fn new(format: OutputFormat) -> Self {
        Self {
            filter: FunctionFilter::default(),
            format,
        }
    }

    /// Create an extractor with a custom filter policy.
    pub fn with_policy(policy: &FilterPolicy, format: OutputFormat) -> Result<Self> {
        Ok(Self {
            filter: policy.compile()?,
            format,
        })
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Extract all declarations from `text`, recording `file` as their
    /// origin.
    pub fn extract(&self, file: &str, text: &str) -> Extraction {
        let mut diags = Diagnostics::new();

        let content = use_filters(text);
        let (structs, stripped) = parse_all_structs(&content, file, &mut diags);
        // Unions see the text before structs were removed, so unions nested
        // in structs are found too.
        let unions = parse_all_unions(&content, file, &mut diags);
        let enums = parse_all_enums(&stripped, file);
        let typedefs = parse_typedefs(&stripped);

        let rest = filter_oneline_typedefs(&stripped);
        let functions = parse_all_functions(&rest, self.format, file, &mut diags);
        let functions = self.filter.remove_unwanted_functions(functions);

        debug!(
            file,
            functions = functions.len(),
            typedefs = typedefs.len(),
            structs = structs.len(),
            unions = unions.len(),
            enums = enums.len(),
            duplicates = diags.len(),
            "extracted header"
        );

        Extraction {
            functions,
            typedefs,
            structs,
            unions,
            enums,
            diagnostics: diags.into_vec(),
        }
    }

    /// Read a header from disk and extract it. Invalid UTF-8 is replaced.
    pub fn extract_file(&self, path: impl AsRef<Path>) -> Result<Extraction> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(self.extract(&path.display().to_string(), &text))
    }
}

/// Extract with the builtin filter policy.
pub fn extract(file: &str, text: &str, format: OutputFormat) -> Extraction {
    Extractor::new(format).extract(file, text)
}

/// Parse all structs and return them with the text that remains once
/// their definitions are cut out.
pub fn parse_all_structs(
    content: &str,
    file: &str,
    diags: &mut Diagnostics,
) -> (IndexMap<String, CompositeInfo>, String) {
    let (rest, raws) = get_all_structs(content);
    (collect_composites(raws, file, CompositeKind::Struct, diags), rest)
}

/// Parse all unions.
pub fn parse_all_unions(
    content: &str,
    file: &str,
    diags: &mut Diagnostics,
) -> IndexMap<String, CompositeInfo> {
    let (_, raws) = get_all_unions(content);
    collect_composites(raws, file, CompositeKind::Union, diags)
}

fn collect_composites(
    raws: Vec<String>,
    file: &str,
    kind: CompositeKind,
    diags: &mut Diagnostics,
) -> IndexMap<String, CompositeInfo> {
    let decl_kind = match kind {
        CompositeKind::Struct => DeclKind::Struct,
        CompositeKind::Union => DeclKind::Union,
    };

    let mut found = IndexMap::new();
    for raw in raws {
        let info = parse_composite(&raw, file, kind);
        let Some(key) = info.key().map(str::to_string) else {
            trace!(%kind, decl = %raw, "skipping nameless definition");
            continue;
        };
        match found.entry(key) {
            Entry::Occupied(entry) => {
                let first: &CompositeInfo = entry.get();
                diags.push(Diagnostic::duplicate(
                    decl_kind,
                    entry.key().clone(),
                    Origin::new(first.header_text.clone(), first.decl.clone()),
                    Origin::new(info.header_text, info.decl),
                ));
            }
            Entry::Vacant(entry) => {
                entry.insert(info);
            }
        }
    }
    found
}

/// Parse all enums in source order.
pub fn parse_all_enums(content: &str, file: &str) -> Vec<EnumInfo> {
    get_all_enums(content)
        .iter()
        .map(|raw| parse_enum(raw, file))
        .collect()
}

/// Parse all function declarations, keeping the first of each name.
pub fn parse_all_functions(
    content: &str,
    format: OutputFormat,
    file: &str,
    diags: &mut Diagnostics,
) -> IndexMap<String, FuncInfo> {
    let mut functions: IndexMap<String, FuncInfo> = IndexMap::new();

    for decl in get_declarations(content) {
        if wrong_func_parameters(&decl) {
            debug!(%decl, "skipping declaration with unbalanced or deep parentheses");
            continue;
        }
        let Some(parsed) = parse_func_declaration(&decl) else {
            trace!(%decl, "not a function declaration");
            continue;
        };

        let mut params = parsed.params.as_str();
        let vararg = params.ends_with("...");
        if vararg {
            params = params[..params.len() - 3].trim_end();
            params = params.strip_suffix(',').unwrap_or(params);
        }
        let mut params_list = parse_func_parameters(params);
        if vararg && format.wants_vararg_param() {
            params_list.push(Param::vararg());
        }

        let mut info = FuncInfo {
            decl: decl.clone(),
            name: parsed.name,
            header: file.to_string(),
            ret_type: parsed.ret_type,
            params: params_list,
            vararg,
            call_conv: parsed.call_conv,
        };
        info.delete_underscores_in_param_names();

        match functions.entry(info.name.clone()) {
            Entry::Occupied(entry) => {
                let first = entry.get();
                diags.push(Diagnostic::duplicate(
                    DeclKind::Function,
                    info.name.clone(),
                    Origin::new(first.header.clone(), first.decl.clone()),
                    Origin::new(info.header, info.decl),
                ));
            }
            Entry::Vacant(entry) => {
                entry.insert(info);
            }
        }
    }
    functions
}
