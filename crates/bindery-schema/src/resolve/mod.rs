//! The resolution pipeline.
//!
//! Stages run in dependency order over the whole declaration set:
//! enumerations, embeddable identification, embeddable population, entity
//! identification, embeddable flattening, entity flattening,
//! repositories. Identification registers every key of a stage before the
//! next stage starts so forward references within and across units resolve
//! the same way.
//!
//! Diagnostics accumulate; no stage aborts the run.

mod embeddable;
mod entity;
mod enums;
mod flatten;
mod repository;

pub use embeddable::EmbeddableDescriptor;
pub use entity::EntityDescriptor;
pub use enums::{EnumDescriptor, EnumValueDescriptor};
pub use repository::{MethodDescriptor, QueryDescriptor, RepositoryDescriptor};

use crate::{
    annotation::{AnnotationRegistry, Level, Payload},
    decl::{AnnotationMap, CompilationUnit, DeclarationSet, SourceLocation},
    diag::DiagnosticList,
    err_at,
};
use serde::Serialize;
use std::collections::BTreeMap;

///
/// Registries
///
/// Everything registered so far, shared by the stages. Secondary maps
/// index entities by declared name and by table for uniqueness checks and
/// repository binding.
///

#[derive(Debug, Default, Serialize)]
pub struct Registries {
    pub enums: BTreeMap<String, EnumDescriptor>,
    pub embeddables: BTreeMap<String, EmbeddableDescriptor>,
    pub entities: BTreeMap<String, EntityDescriptor>,
    pub entities_by_name: BTreeMap<String, String>,
    pub entities_by_table: BTreeMap<String, String>,
    pub repositories: BTreeMap<String, RepositoryDescriptor>,
    pub repositories_by_name: BTreeMap<String, String>,
}

///
/// Resolution
///
/// The complete output of one run: every registry plus every diagnostic
/// observed along the way.
///

#[derive(Debug, Default, Serialize)]
pub struct Resolution {
    pub enums: BTreeMap<String, EnumDescriptor>,
    pub embeddables: BTreeMap<String, EmbeddableDescriptor>,
    pub entities: BTreeMap<String, EntityDescriptor>,
    pub repositories: BTreeMap<String, RepositoryDescriptor>,
    pub diagnostics: DiagnosticList,
}

impl Resolution {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    #[must_use]
    pub fn entity_by_name(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities
            .values()
            .find(|entity| entity.name == name)
    }

    /// Convert into a hard error when any diagnostic was recorded.
    pub fn into_result(self) -> Result<Self, crate::Error> {
        if self.has_errors() {
            Err(crate::Error::Resolution(self.diagnostics))
        } else {
            Ok(self)
        }
    }
}

/// Resolve a declaration set with the standard annotation registry.
#[must_use]
pub fn resolve(set: &DeclarationSet) -> Resolution {
    resolve_with(set, &AnnotationRegistry::standard())
}

/// Resolve a declaration set with a caller-supplied annotation registry.
#[must_use]
pub fn resolve_with(set: &DeclarationSet, registry: &AnnotationRegistry) -> Resolution {
    let mut regs = Registries::default();
    let mut errs = DiagnosticList::new();

    for unit in &set.units {
        enforce_levels(unit, registry, &mut errs);
        enums::register(unit, &mut regs);
    }

    // All embeddable keys must exist before any member resolves against
    // them, or a forward reference in a later unit would misreport.
    for unit in &set.units {
        embeddable::identify(unit, registry, &mut regs, &mut errs);
    }
    for unit in &set.units {
        embeddable::populate(unit, registry, &mut regs, &mut errs);
    }

    for unit in &set.units {
        entity::identify(unit, registry, &mut regs, &mut errs);
    }

    embeddable::flatten_all(&mut regs, &mut errs);
    entity::flatten_all(&mut regs, &mut errs);

    for unit in &set.units {
        repository::register(unit, registry, &mut regs, &mut errs);
    }

    Resolution {
        enums: regs.enums,
        embeddables: regs.embeddables,
        entities: regs.entities,
        repositories: regs.repositories,
        diagnostics: errs,
    }
}

/// Report known annotations applied at the wrong declaration level.
/// Member placement is enforced while the members themselves resolve.
fn enforce_levels(unit: &CompilationUnit, registry: &AnnotationRegistry, errs: &mut DiagnosticList) {
    for record in &unit.records {
        check_level(registry, &record.annotations, Level::Record, "record", &record.name, &record.location, errs);
    }

    for interface in &unit.interfaces {
        check_level(
            registry,
            &interface.annotations,
            Level::Interface,
            "interface",
            &interface.name,
            &interface.location,
            errs,
        );

        for method in &interface.methods {
            check_level(registry, &method.annotations, Level::Method, "method", &method.name, &method.location, errs);
        }
    }
}

fn check_level(
    registry: &AnnotationRegistry,
    annotations: &AnnotationMap,
    level: Level,
    what: &str,
    owner: &str,
    location: &SourceLocation,
    errs: &mut DiagnosticList,
) {
    for (name, _) in annotations.iter() {
        let Some(spec) = registry.spec(name) else {
            // Foreign annotations are none of our business.
            continue;
        };

        if spec.level != level {
            err_at!(
                errs,
                location,
                "the annotation '{name}' cannot be applied to the {what} '{owner}'"
            );
        }
    }
}

/// Decode a single-use annotation off a record or interface, reporting a
/// duplicate but still decoding the first instance.
pub(crate) fn decode_single(
    registry: &AnnotationRegistry,
    annotations: &AnnotationMap,
    name: &str,
    owner: &str,
    location: &SourceLocation,
    errs: &mut DiagnosticList,
) -> Option<Payload> {
    let instances = annotations.get(name)?;

    if instances.len() > 1 {
        err_at!(
            errs,
            location,
            "'{owner}' cannot be annotated more than once with '{name}'"
        );
    }

    let raw = instances.first()?;
    match registry.decode(name, raw) {
        Ok(payload) => Some(payload),
        Err(message) => {
            err_at!(
                errs,
                location,
                "invalid '{name}' annotation on '{owner}': {message}"
            );

            None
        }
    }
}
