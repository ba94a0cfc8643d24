//! Enumeration registration.
//!
//! A user-defined type is an enumeration candidate when its underlying
//! type is one of the integer-family basics, written without a module
//! qualifier. Constants declared with the candidate type become its
//! values. Registration does not require any constant to exist; an empty
//! enumeration is legal, it just has no values yet.

use crate::{
    KEY_SEPARATOR,
    decl::{CompilationUnit, SourceLocation, TypeNode},
    types::Basic,
};
use serde::Serialize;

use super::Registries;

///
/// EnumDescriptor
///

#[derive(Clone, Debug, Serialize)]
pub struct EnumDescriptor {
    pub name: String,

    /// Registry key (`module#name`).
    pub key: String,

    pub module_path: String,
    pub underlying: Basic,
    pub values: Vec<EnumValueDescriptor>,
    pub location: SourceLocation,
}

impl EnumDescriptor {
    #[cfg(test)]
    pub(crate) fn stub(name: &str, key: &str) -> Self {
        Self {
            name: name.to_string(),
            key: key.to_string(),
            module_path: String::new(),
            underlying: Basic::Int,
            values: Vec::new(),
            location: SourceLocation::default(),
        }
    }
}

///
/// EnumValueDescriptor
///

#[derive(Clone, Debug, Serialize)]
pub struct EnumValueDescriptor {
    pub name: String,
    pub value: Option<i64>,
}

pub(crate) fn register(unit: &CompilationUnit, regs: &mut Registries) {
    for typedef in &unit.typedefs {
        let TypeNode::Named { module: None, name } = &typedef.underlying else {
            continue;
        };
        let Some(underlying) = Basic::from_name(name) else {
            continue;
        };
        if !underlying.is_integer() {
            continue;
        }

        let values = unit
            .constants
            .iter()
            .filter(|constant| {
                constant
                    .ty
                    .as_ref()
                    .is_some_and(|ty| matches!(ty, TypeNode::Named { module: None, name } if *name == typedef.name))
            })
            .map(|constant| EnumValueDescriptor {
                name: constant.name.clone(),
                value: constant.value,
            })
            .collect();

        let key = format!("{}{KEY_SEPARATOR}{}", unit.module_path, typedef.name);
        regs.enums.insert(
            key.clone(),
            EnumDescriptor {
                name: typedef.name.clone(),
                key,
                module_path: unit.module_path.clone(),
                underlying,
                values,
                location: typedef.location.clone(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{ConstDecl, TypeDefDecl};

    fn unit(typedefs: Vec<TypeDefDecl>, constants: Vec<ConstDecl>) -> CompilationUnit {
        CompilationUnit {
            module_path: "app/model".to_string(),
            typedefs,
            constants,
            ..Default::default()
        }
    }

    fn typedef(name: &str, underlying: TypeNode) -> TypeDefDecl {
        TypeDefDecl {
            name: name.to_string(),
            underlying,
            location: SourceLocation::default(),
        }
    }

    fn constant(name: &str, ty: &str, value: i64) -> ConstDecl {
        ConstDecl {
            name: name.to_string(),
            ty: Some(TypeNode::named(ty)),
            value: Some(value),
            location: SourceLocation::default(),
        }
    }

    #[test]
    fn integer_typedefs_register_with_their_constants() {
        let unit = unit(
            vec![typedef("Status", TypeNode::named("int"))],
            vec![
                constant("StatusActive", "Status", 0),
                constant("StatusBanned", "Status", 1),
                constant("Unrelated", "int", 9),
            ],
        );

        let mut regs = Registries::default();
        register(&unit, &mut regs);

        let descriptor = regs
            .enums
            .get("app/model#Status")
            .expect("Status should be registered");
        assert_eq!(descriptor.underlying, Basic::Int);
        assert_eq!(descriptor.values.len(), 2);
        assert_eq!(descriptor.values[0].name, "StatusActive");
    }

    #[test]
    fn string_typedefs_are_never_eligible() {
        let unit = unit(vec![typedef("Role", TypeNode::named("string"))], vec![]);

        let mut regs = Registries::default();
        register(&unit, &mut regs);

        assert!(regs.enums.is_empty());
    }

    #[test]
    fn registration_does_not_require_constants() {
        let unit = unit(vec![typedef("Level", TypeNode::named("uint8"))], vec![]);

        let mut regs = Registries::default();
        register(&unit, &mut regs);

        let descriptor = regs.enums.get("app/model#Level").expect("registered");
        assert!(descriptor.values.is_empty());
    }

    #[test]
    fn qualified_underlying_types_are_skipped() {
        let unit = unit(
            vec![typedef("Wrapped", TypeNode::qualified("other", "int"))],
            vec![],
        );

        let mut regs = Registries::default();
        register(&unit, &mut regs);

        assert!(regs.enums.is_empty());
    }
}
