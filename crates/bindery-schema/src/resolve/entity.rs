//! Entity identification and flattening.

use crate::{
    KEY_SEPARATOR,
    annotation::{self, AnnotationRegistry, Payload},
    decl::{CompilationUnit, SourceLocation},
    diag::DiagnosticList,
    err_at,
    ident::to_snake_case,
    member::{Binding, MemberDescriptor, resolve_members},
};
use serde::Serialize;
use std::collections::BTreeMap;

use super::{Registries, decode_single, flatten};

///
/// EntityDescriptor
///

#[derive(Clone, Debug, Serialize)]
pub struct EntityDescriptor {
    /// Logical entity name; defaults to the record name.
    pub name: String,

    /// Registry key (`module#record-name`).
    pub key: String,

    pub module_path: String,
    pub table: String,

    /// Direct members, resolved but not expanded.
    pub members: Vec<MemberDescriptor>,

    /// Leaf members after composition is expanded.
    pub flattened: Vec<MemberDescriptor>,

    /// Key of the identifier member, when one is declared.
    pub id_member: Option<String>,

    /// Column name to flattened member key.
    pub columns: BTreeMap<String, String>,

    pub location: SourceLocation,
}

impl EntityDescriptor {
    /// Look up a flattened member by its dot-joined key.
    #[must_use]
    pub fn member_by_key(&self, key: &str) -> Option<&MemberDescriptor> {
        self.flattened.iter().find(|member| member.key == key)
    }
}

/// Register every entity record of the unit and resolve its direct
/// members. Records that also claim to be embeddable were reported during
/// embeddable identification and are skipped here without another word.
pub(crate) fn identify(
    unit: &CompilationUnit,
    registry: &AnnotationRegistry,
    regs: &mut Registries,
    errs: &mut DiagnosticList,
) {
    for record in &unit.records {
        if !record.annotations.contains(annotation::ENTITY)
            || record.annotations.contains(annotation::EMBEDDABLE)
        {
            continue;
        }

        let name = match decode_single(
            registry,
            &record.annotations,
            annotation::ENTITY,
            &record.name,
            &record.location,
            errs,
        ) {
            Some(Payload::Entity(payload)) => payload
                .name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map_or_else(|| record.name.clone(), ToString::to_string),
            _ => record.name.clone(),
        };

        let table = match decode_single(
            registry,
            &record.annotations,
            annotation::TABLE,
            &record.name,
            &record.location,
            errs,
        ) {
            Some(Payload::Table(payload)) => payload
                .name
                .as_deref()
                .map(str::trim)
                .filter(|table| !table.is_empty())
                .map_or_else(|| to_snake_case(&name), ToString::to_string),
            _ => to_snake_case(&name),
        };

        if regs.entities_by_name.contains_key(&name) {
            err_at!(
                errs,
                record.location,
                "an entity named '{name}' is already defined"
            );
            continue;
        }

        if regs.entities_by_table.contains_key(&table) {
            err_at!(
                errs,
                record.location,
                "the table '{table}' is already mapped by another entity"
            );
            continue;
        }

        let members = resolve_members(unit, registry, record, regs, errs);
        let id_member = detect_id(&record.name, &members, errs);

        let key = format!("{}{KEY_SEPARATOR}{}", unit.module_path, record.name);
        regs.entities_by_name.insert(name.clone(), key.clone());
        regs.entities_by_table.insert(table.clone(), key.clone());
        regs.entities.insert(
            key.clone(),
            EntityDescriptor {
                name,
                key,
                module_path: unit.module_path.clone(),
                table,
                members,
                flattened: Vec::new(),
                id_member,
                columns: BTreeMap::new(),
                location: record.location.clone(),
            },
        );
    }
}

// The first id member wins; any further one is reported. An entity with
// no id member at all is left alone, identifier-less projections are
// legal.
fn detect_id(
    record_name: &str,
    members: &[MemberDescriptor],
    errs: &mut DiagnosticList,
) -> Option<String> {
    let mut id_member = None;

    for member in members {
        if !matches!(member.binding, Binding::Id { .. }) {
            continue;
        }

        if id_member.is_some() {
            err_at!(
                errs,
                member.location,
                "the entity '{record_name}' declares more than one id member"
            );
            continue;
        }

        id_member = Some(member.key.clone());
    }

    id_member
}

/// Expand composition inside every entity and derive its column map.
/// Cycles were already reported while the embeddables flattened, so the
/// walk here breaks them silently.
pub(crate) fn flatten_all(regs: &mut Registries, errs: &mut DiagnosticList) {
    let mut views: BTreeMap<String, Vec<MemberDescriptor>> = BTreeMap::new();
    {
        let flattener = flatten::Flattener::new(regs, false);
        for (key, descriptor) in &regs.entities {
            views.insert(
                key.clone(),
                flattener.flatten(None, &descriptor.members, errs),
            );
        }
    }

    for (key, flattened) in views {
        let Some(descriptor) = regs.entities.get_mut(&key) else {
            continue;
        };

        descriptor.columns = flatten::build_column_map(&descriptor.name, &flattened, errs);
        descriptor.flattened = flattened;
    }
}
