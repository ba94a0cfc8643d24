//! Per-member annotation decoding and validation.
//!
//! Every declared member of a record becomes one [`MemberDescriptor`],
//! whether or not its validation passed; downstream passes decide what to
//! skip. All violations are reported, never just the first.

use crate::{
    annotation::{
        self, AnnotationRegistry, AssociationPayload, AttributeOverridePayload, ColumnPayload,
        EnumeratedKind, EnumeratedPayload, Level, Payload, TemporalKind, TemporalPayload,
    },
    decl::{CompilationUnit, MemberDecl, RecordDecl, SourceLocation},
    diag::DiagnosticList,
    err_at,
    ident::to_snake_case,
    resolve::Registries,
    types::{TypeDescriptor, classify},
};
use derive_more::Display;
use serde::Serialize;
use std::collections::BTreeMap;

///
/// AssociationKind
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
#[remain::sorted]
pub enum AssociationKind {
    #[display("many-to-many")]
    ManyToMany,
    #[display("many-to-one")]
    ManyToOne,
    #[display("one-to-many")]
    OneToMany,
    #[display("one-to-one")]
    OneToOne,
}

impl AssociationKind {
    #[must_use]
    pub const fn is_to_many(self) -> bool {
        matches!(self, Self::OneToMany | Self::ManyToMany)
    }

    fn from_annotation(name: &str) -> Option<Self> {
        let kind = match name {
            annotation::ONE_TO_ONE => Self::OneToOne,
            annotation::ONE_TO_MANY => Self::OneToMany,
            annotation::MANY_TO_ONE => Self::ManyToOne,
            annotation::MANY_TO_MANY => Self::ManyToMany,
            _ => return None,
        };

        Some(kind)
    }
}

///
/// TimestampRole
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[remain::sorted]
pub enum TimestampRole {
    Created,
    Modified,
    Temporal(TemporalKind),
}

///
/// Binding
///
/// The single semantic kind a member maps with. Illegal combinations that
/// cannot be ruled out by construction are reported during resolution.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[remain::sorted]
pub enum Binding {
    Association(AssociationKind),
    Embedded,
    Enumerated(EnumeratedKind),
    Id { generated: bool },
    Plain,
    Transient,
}

///
/// OverrideDescriptor
/// Replaces the derived column mapping of a named nested member.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct OverrideDescriptor {
    pub target: String,
    pub column_name: String,
    pub column_length: Option<u32>,
    pub is_unique: bool,
}

impl From<&AttributeOverridePayload> for OverrideDescriptor {
    fn from(payload: &AttributeOverridePayload) -> Self {
        Self {
            target: payload.name.clone(),
            column_name: payload.column_name.clone(),
            column_length: payload.column_length,
            is_unique: payload.column_unique,
        }
    }
}

///
/// MemberDescriptor
///

#[derive(Clone, Debug, Serialize)]
pub struct MemberDescriptor {
    pub name: String,
    pub column_name: String,

    /// Whether the column name was written out rather than derived; an
    /// explicit name survives composition flattening.
    pub explicit_column: bool,

    pub column_length: Option<u32>,
    pub is_unique: bool,

    /// Structurally embedded in the declaring record.
    pub is_composed_in: bool,

    pub ty: TypeDescriptor,

    /// Registry lookup key of the member type (`module#name`).
    pub type_key: String,

    pub binding: Binding,
    pub timestamp: Option<TimestampRole>,
    pub lob: bool,
    pub association: Option<AssociationPayload>,

    /// Only meaningful when the member is composed.
    pub override_map: BTreeMap<String, OverrideDescriptor>,

    /// Dot-joined path from the owning entity root; the bare member name
    /// until composition flattening assigns the full path.
    pub key: String,

    /// Key of the owning composed member when nested.
    pub parent_key: Option<String>,

    /// Position of the top-most composing member when nested; used to
    /// localize errors on deeply composed members.
    pub root_location: Option<SourceLocation>,

    pub location: SourceLocation,
}

impl MemberDescriptor {
    /// Composed either structurally or through the embed annotation.
    #[must_use]
    pub const fn is_composed(&self) -> bool {
        self.is_composed_in || matches!(self.binding, Binding::Embedded)
    }

    /// Whether the member occupies a column slot in the owning entity.
    #[must_use]
    pub const fn maps_to_column(&self) -> bool {
        !self.is_composed()
            && !matches!(
                self.binding,
                Binding::Transient | Binding::Association(_)
            )
    }

    /// Where diagnostics about this member should point.
    #[must_use]
    pub const fn report_location(&self) -> &SourceLocation {
        match &self.root_location {
            Some(location) => location,
            None => &self.location,
        }
    }
}

// Everything decoded off one member before cross-flag validation runs.
#[derive(Default)]
struct Decoded {
    column: Option<ColumnPayload>,
    transient: bool,
    id: bool,
    generated: bool,
    lob: bool,
    created: bool,
    modified: bool,
    temporal: Option<TemporalPayload>,
    enumerated: Option<EnumeratedPayload>,
    embedded: bool,
    overrides: Vec<AttributeOverridePayload>,
    associations: Vec<(AssociationKind, AssociationPayload)>,
}

impl Decoded {
    fn has_timestamp(&self) -> bool {
        self.created || self.modified || self.temporal.is_some()
    }

    // Number of distinct annotation kinds present, association kinds
    // counted individually.
    fn annotation_count(&self) -> usize {
        [
            self.column.is_some(),
            self.transient,
            self.id,
            self.generated,
            self.lob,
            self.created,
            self.modified,
            self.temporal.is_some(),
            self.enumerated.is_some(),
            self.embedded,
            !self.overrides.is_empty(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
            + self.associations.len()
    }
}

/// Resolve every direct member of a record into descriptors.
pub(crate) fn resolve_members(
    unit: &CompilationUnit,
    registry: &AnnotationRegistry,
    record: &RecordDecl,
    regs: &Registries,
    errs: &mut DiagnosticList,
) -> Vec<MemberDescriptor> {
    record
        .members
        .iter()
        .map(|member| resolve_member(unit, registry, record, member, regs, errs))
        .collect()
}

fn resolve_member(
    unit: &CompilationUnit,
    registry: &AnnotationRegistry,
    record: &RecordDecl,
    member: &MemberDecl,
    regs: &Registries,
    errs: &mut DiagnosticList,
) -> MemberDescriptor {
    if !member.composed && !member.exported {
        err_at!(
            errs,
            member.location,
            "the member '{}' in '{}' must be exported",
            member.name,
            record.name
        );
    }

    let ty = classify(unit, &member.ty);
    let type_key = ty.lookup_key(&unit.module_path);
    let decoded = decode_annotations(registry, member, errs);

    validate(member, &ty, &type_key, &decoded, regs, errs);

    let mut column_name = to_snake_case(&member.name);
    let mut explicit_column = false;
    let mut column_length = None;
    let mut is_unique = false;
    if let Some(column) = &decoded.column {
        if let Some(name) = column.name.as_deref()
            && !name.trim().is_empty()
        {
            column_name = name.trim().to_string();
            explicit_column = true;
        }
        column_length = column.length;
        is_unique = column.unique;
    }

    let binding = if decoded.transient {
        Binding::Transient
    } else if decoded.id {
        Binding::Id {
            generated: decoded.generated,
        }
    } else if let Some(enumerated) = &decoded.enumerated {
        Binding::Enumerated(enumerated.value)
    } else if decoded.embedded {
        Binding::Embedded
    } else if let Some((kind, _)) = decoded.associations.first() {
        Binding::Association(*kind)
    } else {
        Binding::Plain
    };

    let timestamp = if decoded.created {
        Some(TimestampRole::Created)
    } else if decoded.modified {
        Some(TimestampRole::Modified)
    } else {
        decoded
            .temporal
            .as_ref()
            .map(|temporal| TimestampRole::Temporal(temporal.value))
    };

    let mut override_map = BTreeMap::new();
    if decoded.embedded || member.composed {
        for payload in &decoded.overrides {
            override_map.insert(payload.name.clone(), OverrideDescriptor::from(payload));
        }
    }

    MemberDescriptor {
        name: member.name.clone(),
        column_name,
        explicit_column,
        column_length,
        is_unique,
        is_composed_in: member.composed,
        ty,
        type_key,
        binding,
        timestamp,
        lob: decoded.lob,
        association: decoded.associations.first().map(|(_, payload)| payload.clone()),
        override_map,
        key: member.name.clone(),
        parent_key: None,
        root_location: None,
        location: member.location.clone(),
    }
}

fn decode_annotations(
    registry: &AnnotationRegistry,
    member: &MemberDecl,
    errs: &mut DiagnosticList,
) -> Decoded {
    let mut decoded = Decoded::default();

    for (name, instances) in member.annotations.iter() {
        let Some(spec) = registry.spec(name) else {
            // Foreign annotations are none of our business.
            continue;
        };

        if spec.level != Level::Member {
            err_at!(
                errs,
                member.location,
                "the annotation '{name}' cannot be applied to the member '{}'",
                member.name
            );
            continue;
        }

        if !spec.repeatable && instances.len() > 1 {
            err_at!(
                errs,
                member.location,
                "the member '{}' cannot be annotated more than once with '{name}'",
                member.name
            );
        }

        let taken = if spec.repeatable {
            instances
        } else {
            &instances[..instances.len().min(1)]
        };

        for raw in taken {
            let payload = match registry.decode(name, raw) {
                Ok(payload) => payload,
                Err(message) => {
                    err_at!(
                        errs,
                        member.location,
                        "invalid '{name}' annotation on member '{}': {message}",
                        member.name
                    );
                    continue;
                }
            };

            apply_payload(&mut decoded, name, payload);
        }
    }

    decoded
}

fn apply_payload(decoded: &mut Decoded, name: &str, payload: Payload) {
    match payload {
        Payload::Column(column) => decoded.column = Some(column),
        Payload::Enumerated(enumerated) => decoded.enumerated = Some(enumerated),
        Payload::Temporal(temporal) => decoded.temporal = Some(temporal),
        Payload::AttributeOverride(payload) => decoded.overrides.push(payload),
        Payload::Association(payload) => {
            if let Some(kind) = AssociationKind::from_annotation(name) {
                decoded.associations.push((kind, payload));
            }
        }
        Payload::Unit => match name {
            annotation::ID => decoded.id = true,
            annotation::GENERATED_VALUE => decoded.generated = true,
            annotation::TRANSIENT => decoded.transient = true,
            annotation::LOB => decoded.lob = true,
            annotation::CREATED_DATE => decoded.created = true,
            annotation::LAST_MODIFIED_DATE => decoded.modified = true,
            annotation::EMBEDDED => decoded.embedded = true,
            _ => {}
        },
        // Record, interface and method payloads never pass the level check.
        Payload::Entity(_)
        | Payload::Table(_)
        | Payload::Repository(_)
        | Payload::Query(_) => {}
    }
}

// Cross-flag validation. Checks are independent; every violation is
// reported.
fn validate(
    member: &MemberDecl,
    ty: &TypeDescriptor,
    type_key: &str,
    decoded: &Decoded,
    regs: &Registries,
    errs: &mut DiagnosticList,
) {
    let count = decoded.annotation_count();

    if ty.has_error {
        if ty.qualified_name.is_empty() {
            err_at!(errs, member.location, "the member type is not supported");
        } else {
            err_at!(
                errs,
                member.location,
                "the member type '{}' is neither imported nor valid",
                ty.qualified_name
            );
        }
    }

    if decoded.transient && count > 1 {
        err_at!(
            errs,
            member.location,
            "the member '{}' annotated as transient cannot carry another annotation",
            member.name
        );
    }

    if decoded.enumerated.is_some() {
        if count > 1 + usize::from(decoded.column.is_some()) {
            err_at!(
                errs,
                member.location,
                "the enumerated member '{}' can only be combined with the column annotation",
                member.name
            );
        }

        if ty.is_collection() {
            err_at!(errs, member.location, "enumerated collections are not supported");
        } else if !ty.has_error && !regs.enums.contains_key(type_key) {
            err_at!(
                errs,
                member.location,
                "the member '{}' cannot be enumerated because the type '{}' is not a registered enumeration",
                member.name,
                ty.qualified_name
            );
        }
    }

    if decoded.embedded {
        if count > 1 + usize::from(!decoded.overrides.is_empty()) {
            err_at!(
                errs,
                member.location,
                "the embedded member '{}' can only be combined with attribute-override annotations",
                member.name
            );
        }

        if ty.is_collection() {
            err_at!(errs, member.location, "embedded collections are not supported");
        } else if !ty.has_error && !regs.embeddables.contains_key(type_key) {
            err_at!(
                errs,
                member.location,
                "the member '{}' cannot be embedded because the type '{}' is not a registered embeddable",
                member.name,
                ty.qualified_name
            );
        }
    }

    if decoded.associations.len() > 1 {
        err_at!(
            errs,
            member.location,
            "the member '{}' carries more than one association annotation",
            member.name
        );
    }

    if let Some((kind, _)) = decoded.associations.first() {
        if decoded.associations.len() == 1
            && count > 1 + usize::from(decoded.column.is_some())
        {
            err_at!(
                errs,
                member.location,
                "an association annotation on '{}' can only be combined with the column annotation",
                member.name
            );
        }

        if ty.is_collection() && !kind.is_to_many() {
            err_at!(
                errs,
                member.location,
                "the collection member '{}' cannot use a {kind} association",
                member.name
            );
        }

        if !ty.is_collection() && kind.is_to_many() {
            err_at!(
                errs,
                member.location,
                "the member '{}' must be a collection to use a {kind} association",
                member.name
            );
        }
    }

    if decoded.id && decoded.has_timestamp() {
        err_at!(
            errs,
            member.location,
            "the id member '{}' cannot carry a timestamp annotation",
            member.name
        );
    }

    if decoded.generated && !decoded.id {
        err_at!(
            errs,
            member.location,
            "the generated-value annotation on '{}' requires the id annotation",
            member.name
        );
    }

    if decoded.has_timestamp() && !ty.is_timestamp() {
        err_at!(
            errs,
            member.location,
            "the member '{}' must be of type time.Time to carry a timestamp annotation",
            member.name
        );
    }
}
