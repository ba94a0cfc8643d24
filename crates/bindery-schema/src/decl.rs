//! The in-memory declaration tree handed to the resolution engine.
//!
//! An external loader produces this model; the engine never touches source
//! text itself. Everything here is plain data and deserializable so loaders
//! can be swapped without touching the resolvers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// SourceLocation
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct SourceLocation {
    pub file: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

///
/// DeclarationSet
///
/// Every compilation unit of one run, fully loaded before resolution starts.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DeclarationSet {
    pub units: Vec<CompilationUnit>,
}

impl DeclarationSet {
    pub fn push(&mut self, unit: CompilationUnit) {
        self.units.push(unit);
    }

    pub fn extend(&mut self, other: Self) {
        self.units.extend(other.units);
    }
}

///
/// CompilationUnit
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct CompilationUnit {
    pub module_path: String,

    #[serde(default)]
    pub imports: Vec<Import>,

    #[serde(default)]
    pub records: Vec<RecordDecl>,

    #[serde(default)]
    pub interfaces: Vec<InterfaceDecl>,

    #[serde(default)]
    pub typedefs: Vec<TypeDefDecl>,

    #[serde(default)]
    pub constants: Vec<ConstDecl>,
}

impl CompilationUnit {
    /// Resolve an import alias to its module path.
    #[must_use]
    pub fn resolve_import(&self, alias: &str) -> Option<&str> {
        self.imports
            .iter()
            .find(|import| import.alias == alias)
            .map(|import| import.path.as_str())
    }
}

///
/// Import
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Import {
    pub alias: String,
    pub path: String,
}

///
/// RecordDecl
/// A named composite declaration with members.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RecordDecl {
    pub name: String,

    #[serde(default)]
    pub annotations: AnnotationMap,

    #[serde(default)]
    pub members: Vec<MemberDecl>,

    pub location: SourceLocation,
}

///
/// MemberDecl
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MemberDecl {
    pub name: String,

    /// Visible outside the declaring module.
    #[serde(default)]
    pub exported: bool,

    /// Structurally embedded (declared without its own name), as opposed to
    /// carrying an embed annotation.
    #[serde(default)]
    pub composed: bool,

    #[serde(rename = "type")]
    pub ty: TypeNode,

    #[serde(default)]
    pub annotations: AnnotationMap,

    pub location: SourceLocation,
}

///
/// InterfaceDecl
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InterfaceDecl {
    pub name: String,

    #[serde(default)]
    pub annotations: AnnotationMap,

    #[serde(default)]
    pub methods: Vec<MethodDecl>,

    pub location: SourceLocation,
}

///
/// MethodDecl
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MethodDecl {
    pub name: String,

    #[serde(default)]
    pub annotations: AnnotationMap,

    #[serde(default)]
    pub params: Vec<ParamDecl>,

    pub location: SourceLocation,
}

///
/// ParamDecl
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ParamDecl {
    #[serde(default)]
    pub name: String,

    #[serde(rename = "type")]
    pub ty: TypeNode,
}

///
/// TypeDefDecl
/// A user-defined type with an underlying type.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TypeDefDecl {
    pub name: String,
    pub underlying: TypeNode,
    pub location: SourceLocation,
}

///
/// ConstDecl
/// A named constant with an optional declared type.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ConstDecl {
    pub name: String,

    #[serde(default, rename = "type")]
    pub ty: Option<TypeNode>,

    #[serde(default)]
    pub value: Option<i64>,

    pub location: SourceLocation,
}

///
/// TypeNode
/// The declared shape of a member, parameter or underlying type.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeNode {
    Named {
        #[serde(default)]
        module: Option<String>,
        name: String,
    },
    Pointer(Box<TypeNode>),
    Slice(Box<TypeNode>),
}

impl TypeNode {
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self::Named {
            module: None,
            name: name.to_string(),
        }
    }

    #[must_use]
    pub fn qualified(module: &str, name: &str) -> Self {
        Self::Named {
            module: Some(module.to_string()),
            name: name.to_string(),
        }
    }

    /// The dotted name as written in source, ignoring indirection.
    /// Used for structural matches such as the cancellation-context check.
    #[must_use]
    pub fn written_name(&self) -> String {
        match self {
            Self::Named { module, name } => match module {
                Some(module) => format!("{module}.{name}"),
                None => name.clone(),
            },
            Self::Pointer(_) | Self::Slice(_) => String::new(),
        }
    }
}

///
/// AnnotationMap
/// Raw annotation instances keyed by annotation name, in declaration order
/// per name.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct AnnotationMap(pub BTreeMap<String, Vec<serde_json::Value>>);

impl AnnotationMap {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[serde_json::Value]> {
        self.0.get(name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[serde_json::Value])> {
        self.0
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn insert(&mut self, name: &str, value: serde_json::Value) {
        self.0.entry(name.to_string()).or_default().push(value);
    }
}
