use crate::{
    KEY_SEPARATOR,
    decl::{CompilationUnit, TypeNode},
};
use serde::Serialize;

/// Module path of the standard time module.
pub const TIME_MODULE: &str = "time";

/// Simple name of the recognized timestamp type inside [`TIME_MODULE`].
pub const TIMESTAMP_TYPE: &str = "Time";

///
/// Basic
///
/// The fixed allow-list of primitive scalar kinds a column can map to.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[remain::sorted]
pub enum Basic {
    Bool,
    Byte,
    Float32,
    Float64,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Rune,
    String,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
}

impl Basic {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let basic = match name {
            "bool" => Self::Bool,
            "byte" => Self::Byte,
            "float32" => Self::Float32,
            "float64" => Self::Float64,
            "int" => Self::Int,
            "int8" => Self::Int8,
            "int16" => Self::Int16,
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            "rune" => Self::Rune,
            "string" => Self::String,
            "uint" => Self::Uint,
            "uint8" => Self::Uint8,
            "uint16" => Self::Uint16,
            "uint32" => Self::Uint32,
            "uint64" => Self::Uint64,
            _ => return None,
        };

        Some(basic)
    }

    /// Integer-family kinds, the only ones eligible to back an enumeration.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Int
                | Self::Int8
                | Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::Uint
                | Self::Uint8
                | Self::Uint16
                | Self::Uint32
                | Self::Uint64
        )
    }
}

// Basic-looking names that are explicitly rejected for column mapping.
const EXCLUDED_BASICS: &[&str] = &["complex64", "complex128", "uintptr"];

///
/// TypeKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[remain::sorted]
pub enum TypeKind {
    Basic,
    Collection,
    Composed,
    Reference,
}

///
/// TypeDescriptor
///
/// Resolved shape of a declared type. Immutable once built; classification
/// is pure and failure is non-fatal — callers decide how to react to
/// `has_error`.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TypeDescriptor {
    pub kind: TypeKind,
    pub simple_name: String,

    /// The name as written in source, including any module qualifier.
    pub qualified_name: String,

    /// Resolved module path; empty means the declaring module.
    pub origin_module: String,

    pub basic: Option<Basic>,
    pub is_supported_basic: bool,
    pub has_error: bool,
}

impl TypeDescriptor {
    #[must_use]
    pub const fn is_collection(&self) -> bool {
        matches!(self.kind, TypeKind::Collection)
    }

    /// Registry lookup key, substituting the declaring module when the type
    /// resolved to its own module.
    #[must_use]
    pub fn lookup_key(&self, declaring_module: &str) -> String {
        let module = if self.origin_module.is_empty() {
            declaring_module
        } else {
            &self.origin_module
        };

        format!("{module}{KEY_SEPARATOR}{}", self.simple_name)
    }

    /// The recognized timestamp type from the standard time module.
    #[must_use]
    pub fn is_timestamp(&self) -> bool {
        self.origin_module == TIME_MODULE
            && self.simple_name == TIMESTAMP_TYPE
            && !self.is_collection()
    }

    fn error(qualified_name: String) -> Self {
        Self {
            kind: TypeKind::Composed,
            simple_name: String::new(),
            qualified_name,
            origin_module: String::new(),
            basic: None,
            is_supported_basic: false,
            has_error: true,
        }
    }
}

/// Classify a declared type against the unit's import table.
///
/// Pointer indirection is stripped recursively before classification; at
/// most one collection layer is stripped to obtain the element type.
#[must_use]
pub fn classify(unit: &CompilationUnit, ty: &TypeNode) -> TypeDescriptor {
    let (node, was_reference) = strip_pointers(ty);

    match node {
        TypeNode::Slice(element) => {
            let (element, _) = strip_pointers(element);
            let mut descriptor = match element {
                // Nested collections cannot map to a column shape.
                TypeNode::Slice(_) => TypeDescriptor::error(String::new()),
                TypeNode::Named { module, name } => classify_named(unit, module.as_deref(), name),
                TypeNode::Pointer(_) => unreachable!("pointers already stripped"),
            };
            descriptor.kind = TypeKind::Collection;

            descriptor
        }
        TypeNode::Named { module, name } => {
            let mut descriptor = classify_named(unit, module.as_deref(), name);
            if was_reference {
                descriptor.kind = TypeKind::Reference;
            }

            descriptor
        }
        TypeNode::Pointer(_) => unreachable!("pointers already stripped"),
    }
}

fn strip_pointers(ty: &TypeNode) -> (&TypeNode, bool) {
    let mut node = ty;
    let mut was_reference = false;
    while let TypeNode::Pointer(inner) = node {
        node = inner;
        was_reference = true;
    }

    (node, was_reference)
}

fn classify_named(unit: &CompilationUnit, module: Option<&str>, name: &str) -> TypeDescriptor {
    match module {
        None => {
            if let Some(basic) = Basic::from_name(name) {
                return TypeDescriptor {
                    kind: TypeKind::Basic,
                    simple_name: name.to_string(),
                    qualified_name: name.to_string(),
                    origin_module: String::new(),
                    basic: Some(basic),
                    is_supported_basic: true,
                    has_error: false,
                };
            }

            if EXCLUDED_BASICS.contains(&name) {
                let mut descriptor = TypeDescriptor::error(name.to_string());
                descriptor.kind = TypeKind::Basic;
                descriptor.simple_name = name.to_string();

                return descriptor;
            }

            // A user-defined type in the declaring module.
            TypeDescriptor {
                kind: TypeKind::Composed,
                simple_name: name.to_string(),
                qualified_name: name.to_string(),
                origin_module: String::new(),
                basic: None,
                is_supported_basic: false,
                has_error: false,
            }
        }
        Some(alias) => match unit.resolve_import(alias) {
            Some(path) => TypeDescriptor {
                kind: TypeKind::Composed,
                simple_name: name.to_string(),
                qualified_name: format!("{alias}.{name}"),
                origin_module: path.to_string(),
                basic: None,
                is_supported_basic: false,
                has_error: false,
            },
            None => {
                let mut descriptor = TypeDescriptor::error(format!("{alias}.{name}"));
                descriptor.simple_name = name.to_string();

                descriptor
            }
        },
    }
}
