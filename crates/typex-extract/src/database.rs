//! Type database accumulated from many headers.
//!
//! Extractions are merged in the order they are added. A name that is
//! already present keeps its first record; later ones are counted as
//! collisions and dropped.

use crate::extractor::Extraction;
use crate::types::{CompositeInfo, EnumInfo, FuncInfo, Param};
use crate::{ExtractError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Declarations from a set of headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDatabase {
    /// Function declarations.
    functions: IndexMap<String, FuncInfo>,

    /// Typedefs, alias to aliased type.
    typedefs: IndexMap<String, Param>,

    structs: IndexMap<String, CompositeInfo>,
    unions: IndexMap<String, CompositeInfo>,

    /// Named enums, keyed by tag or typedef alias.
    enums: IndexMap<String, EnumInfo>,

    /// Enums with neither a tag nor an alias.
    #[serde(default)]
    anonymous_enums: Vec<EnumInfo>,
}

/// Record counts of a [`TypeDatabase`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DatabaseStats {
    pub functions: usize,
    pub typedefs: usize,
    pub structs: usize,
    pub unions: usize,
    /// Named and anonymous enums.
    pub enums: usize,
}

impl TypeDatabase {
    /// Create a new empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one extraction. Returns how many records were dropped because
    /// their name was already taken.
    pub fn merge(&mut self, extraction: Extraction) -> usize {
        let mut collisions = 0;

        for (name, func) in extraction.functions {
            collisions += insert_first(&mut self.functions, name, func);
        }
        for typedef in extraction.typedefs {
            if typedef.name.is_empty() {
                continue;
            }
            collisions += insert_first(&mut self.typedefs, typedef.name.clone(), typedef);
        }
        for (name, info) in extraction.structs {
            collisions += insert_first(&mut self.structs, name, info);
        }
        for (name, info) in extraction.unions {
            collisions += insert_first(&mut self.unions, name, info);
        }
        for info in extraction.enums {
            match info.key().map(str::to_string) {
                Some(key) => collisions += insert_first(&mut self.enums, key, info),
                None => self.anonymous_enums.push(info),
            }
        }

        if collisions > 0 {
            tracing::debug!(collisions, "merge dropped records with taken names");
        }
        collisions
    }

    // ==================== Lookup ====================

    pub fn get_function(&self, name: &str) -> Option<&FuncInfo> {
        self.functions.get(name)
    }

    /// Get the aliased type of a typedef.
    pub fn get_typedef(&self, name: &str) -> Option<&str> {
        self.typedefs.get(name).map(|p| p.type_text.as_str())
    }

    pub fn get_struct(&self, name: &str) -> Option<&CompositeInfo> {
        self.structs.get(name)
    }

    pub fn get_union(&self, name: &str) -> Option<&CompositeInfo> {
        self.unions.get(name)
    }

    pub fn get_enum(&self, name: &str) -> Option<&EnumInfo> {
        self.enums.get(name)
    }

    /// Find the value of an enumerator in any enum.
    pub fn enum_constant(&self, name: &str) -> Option<i64> {
        self.enums
            .values()
            .chain(&self.anonymous_enums)
            .find_map(|e| e.value_of(name))
    }

    pub fn functions(&self) -> impl Iterator<Item = &FuncInfo> {
        self.functions.values()
    }

    pub fn typedefs(&self) -> impl Iterator<Item = &Param> {
        self.typedefs.values()
    }

    pub fn structs(&self) -> impl Iterator<Item = &CompositeInfo> {
        self.structs.values()
    }

    pub fn unions(&self) -> impl Iterator<Item = &CompositeInfo> {
        self.unions.values()
    }

    /// All enums, named ones first.
    pub fn enums(&self) -> impl Iterator<Item = &EnumInfo> {
        self.enums.values().chain(&self.anonymous_enums)
    }

    pub fn stats(&self) -> DatabaseStats {
        DatabaseStats {
            functions: self.functions.len(),
            typedefs: self.typedefs.len(),
            structs: self.structs.len(),
            unions: self.unions.len(),
            enums: self.enums.len() + self.anonymous_enums.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stats() == DatabaseStats::default()
    }

    // ==================== Serialization ====================

    /// Serialize to a pretty-printed JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a database from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Save the database to a JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a database from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

/// Insert unless the key exists; returns 1 on collision.
fn insert_first<V>(map: &mut IndexMap<String, V>, key: String, value: V) -> usize {
    if map.contains_key(&key) {
        1
    } else {
        map.insert(key, value);
        0
    }
}
