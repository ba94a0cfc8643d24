//! Embeddable identification, population and flattening.
//!
//! Identification registers the key of every embeddable record before any
//! member resolves, so composition across units works regardless of unit
//! order. Population then resolves the members, and flattening expands
//! nested composition into each embeddable's leaf view.

use crate::{
    KEY_SEPARATOR,
    annotation::{self, AnnotationRegistry},
    decl::{CompilationUnit, RecordDecl, SourceLocation},
    diag::DiagnosticList,
    err_at,
    member::{Binding, MemberDescriptor, resolve_members},
};
use serde::Serialize;
use std::collections::BTreeMap;

use super::{Registries, decode_single, flatten};

///
/// EmbeddableDescriptor
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct EmbeddableDescriptor {
    pub name: String,

    /// Registry key (`module#name`).
    pub key: String,

    pub module_path: String,

    /// Direct members, resolved but not expanded.
    pub members: Vec<MemberDescriptor>,

    /// Leaf members after nested composition is expanded.
    pub flattened: Vec<MemberDescriptor>,

    /// Shallow column view over the direct members.
    pub columns: BTreeMap<String, String>,

    pub location: SourceLocation,
}

impl EmbeddableDescriptor {
    #[cfg(test)]
    pub(crate) fn stub(name: &str, key: &str) -> Self {
        Self {
            name: name.to_string(),
            key: key.to_string(),
            ..Self::default()
        }
    }
}

/// Register the key of every embeddable record in the unit. A record
/// claiming to be both an entity and an embeddable is reported here, once,
/// and registered as neither.
pub(crate) fn identify(
    unit: &CompilationUnit,
    registry: &AnnotationRegistry,
    regs: &mut Registries,
    errs: &mut DiagnosticList,
) {
    for record in &unit.records {
        if !record.annotations.contains(annotation::EMBEDDABLE) {
            continue;
        }

        if record.annotations.contains(annotation::ENTITY) {
            err_at!(
                errs,
                record.location,
                "the record '{}' cannot be both an entity and an embeddable",
                record.name
            );
            continue;
        }

        decode_single(
            registry,
            &record.annotations,
            annotation::EMBEDDABLE,
            &record.name,
            &record.location,
            errs,
        );

        let key = format!("{}{KEY_SEPARATOR}{}", unit.module_path, record.name);
        regs.embeddables.insert(
            key.clone(),
            EmbeddableDescriptor {
                name: record.name.clone(),
                key,
                module_path: unit.module_path.clone(),
                members: Vec::new(),
                flattened: Vec::new(),
                columns: BTreeMap::new(),
                location: record.location.clone(),
            },
        );
    }
}

/// Resolve the members of every embeddable identified earlier.
pub(crate) fn populate(
    unit: &CompilationUnit,
    registry: &AnnotationRegistry,
    regs: &mut Registries,
    errs: &mut DiagnosticList,
) {
    for record in &unit.records {
        let key = format!("{}{KEY_SEPARATOR}{}", unit.module_path, record.name);
        if !regs.embeddables.contains_key(&key) {
            continue;
        }

        let members = admit_members(
            record,
            resolve_members(unit, registry, record, regs, errs),
            errs,
        );
        let columns = flatten::build_column_map(&record.name, &members, errs);

        if let Some(descriptor) = regs.embeddables.get_mut(&key) {
            descriptor.members = members;
            descriptor.columns = columns;
        }
    }
}

// Members an embeddable cannot carry are dropped so composing entities
// never see them.
fn admit_members(
    record: &RecordDecl,
    members: Vec<MemberDescriptor>,
    errs: &mut DiagnosticList,
) -> Vec<MemberDescriptor> {
    members
        .into_iter()
        .filter(|member| {
            if member.ty.has_error {
                // already reported while the member resolved
                return false;
            }

            if matches!(member.binding, Binding::Association(_)) {
                err_at!(
                    errs,
                    member.location,
                    "the embeddable '{}' cannot declare the association member '{}'",
                    record.name,
                    member.name
                );
                return false;
            }

            true
        })
        .collect()
}

/// Expand nested composition inside every embeddable. This is the one
/// place cyclic composition is reported.
pub(crate) fn flatten_all(regs: &mut Registries, errs: &mut DiagnosticList) {
    // Flatten against the complete registry first, then write the views
    // back; flattening one embeddable may read any other.
    let mut views: BTreeMap<String, Vec<MemberDescriptor>> = BTreeMap::new();
    {
        let flattener = flatten::Flattener::new(regs, true);
        for (key, descriptor) in &regs.embeddables {
            views.insert(
                key.clone(),
                flattener.flatten(Some(key), &descriptor.members, errs),
            );
        }
    }

    for (key, flattened) in views {
        if let Some(descriptor) = regs.embeddables.get_mut(&key) {
            descriptor.flattened = flattened;
        }
    }
}
