//! Rules for dropping unwanted function declarations.
//!
//! The rules are data: a list of Windows generic-text ("T") type names and a
//! list of patterns for prose that slipped through as declarations. Both can
//! be replaced by loading a [`FilterPolicy`] from JSON.

use crate::types::FuncInfo;
use crate::{ExtractError, Result};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Generic-text types. They are macros resolved to an `A` or `W` variant at
/// compile time, so binaries only ever contain the resolved functions.
pub const DEFAULT_T_TYPES: &[&str] = &[
    "LPCTSTR", "PCTSTR", "LPTSTR", "PTSTR", "TBYTE", "PTBYTE", "TCHAR",
];

/// Comment sentences captured as declarations: they start with an uppercase
/// letter and contain "the".
pub const DEFAULT_SENTENCE_PATTERNS: &[&str] = &[r"[A-Z].*\bthe\b.*"];

/// Serializable filter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterPolicy {
    /// Type names that exclude a function when used as a whole word in its
    /// return or parameter types.
    pub t_types: Vec<String>,
    /// Regexes that exclude a declaration when they match its full text.
    pub sentence_patterns: Vec<String>,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            t_types: DEFAULT_T_TYPES.iter().map(|s| s.to_string()).collect(),
            sentence_patterns: DEFAULT_SENTENCE_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl FilterPolicy {
    /// Load a policy from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save the policy as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Compile the policy into a [`FunctionFilter`].
    pub fn compile(&self) -> Result<FunctionFilter> {
        let t_types = if self.t_types.is_empty() {
            None
        } else {
            let alternatives: Vec<String> = self.t_types.iter().map(|t| regex::escape(t)).collect();
            Some(compile_pattern(&format!(r"\b(?:{})\b", alternatives.join("|")))?)
        };

        let sentences = self
            .sentence_patterns
            .iter()
            .map(|p| compile_pattern(&format!("^(?:{})$", p)))
            .collect::<Result<Vec<_>>>()?;

        Ok(FunctionFilter { t_types, sentences })
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| ExtractError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// A compiled [`FilterPolicy`].
#[derive(Debug, Clone)]
pub struct FunctionFilter {
    t_types: Option<Regex>,
    sentences: Vec<Regex>,
}

impl Default for FunctionFilter {
    fn default() -> Self {
        FilterPolicy::default()
            .compile()
            .expect("builtin filter policy compiles")
    }
}

impl FunctionFilter {
    /// Whether `type_text` mentions a generic-text type.
    pub fn is_t_type(&self, type_text: &str) -> bool {
        self.t_types.as_ref().is_some_and(|re| re.is_match(type_text))
    }

    /// Whether the whole declaration reads like a sentence.
    pub fn is_sentence(&self, decl: &str) -> bool {
        self.sentences.iter().any(|re| re.is_match(decl))
    }

    /// Should the function appear in the extracted output?
    pub fn is_wanted(&self, func: &FuncInfo) -> bool {
        if self.is_t_type(&func.ret_type) {
            return false;
        }
        if func.params.iter().any(|p| self.is_t_type(&p.type_text)) {
            return false;
        }
        !self.is_sentence(&func.decl)
    }

    /// Keep only wanted functions, preserving order.
    pub fn remove_unwanted_functions(
        &self,
        functions: IndexMap<String, FuncInfo>,
    ) -> IndexMap<String, FuncInfo> {
        functions
            .into_iter()
            .filter(|(_, func)| {
                let wanted = self.is_wanted(func);
                if !wanted {
                    tracing::debug!(name = %func.name, "dropping unwanted function");
                }
                wanted
            })
            .collect()
    }
}
