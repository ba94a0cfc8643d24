//! Composition flattening.
//!
//! Expands composed members into the leaf members of their embeddable
//! types, recursively, producing dot-joined keys rooted at the owner.
//! Column names of nested leaves derive from the full key unless an
//! attribute override targets the leaf; override maps merge downward with
//! outer entries winning over inner ones.

use crate::{
    diag::DiagnosticList,
    err_at,
    ident::to_snake_case,
    member::{MemberDescriptor, OverrideDescriptor},
};
use std::collections::{BTreeMap, BTreeSet};

use super::Registries;

///
/// Flattener
///

pub(crate) struct Flattener<'a> {
    regs: &'a Registries,

    /// Cyclic composition is reported exactly once, while flattening the
    /// embeddables themselves; entity flattening walks the same graph again
    /// and must stay silent about it.
    report_cycles: bool,
}

impl<'a> Flattener<'a> {
    pub(crate) const fn new(regs: &'a Registries, report_cycles: bool) -> Self {
        Self {
            regs,
            report_cycles,
        }
    }

    /// Flatten the direct members of one owner. `self_key` seeds the
    /// visited set so an embeddable composing itself is caught.
    pub(crate) fn flatten(
        &self,
        self_key: Option<&str>,
        members: &[MemberDescriptor],
        errs: &mut DiagnosticList,
    ) -> Vec<MemberDescriptor> {
        let mut visited = BTreeSet::new();
        if let Some(key) = self_key {
            visited.insert(key.to_string());
        }

        let mut out = Vec::with_capacity(members.len());
        self.collect(members, "", None, None, &mut visited, &mut out, errs);

        out
    }

    #[expect(clippy::too_many_arguments, reason = "recursive accumulator")]
    fn collect(
        &self,
        members: &[MemberDescriptor],
        prefix: &str,
        overrides: Option<&BTreeMap<String, OverrideDescriptor>>,
        root: Option<&MemberDescriptor>,
        visited: &mut BTreeSet<String>,
        out: &mut Vec<MemberDescriptor>,
        errs: &mut DiagnosticList,
    ) {
        for member in members {
            let key = join_key(prefix, &member.name);

            if member.is_composed() {
                // An unresolvable type was already reported and must not
                // key-match an unrelated local embeddable.
                if member.ty.has_error {
                    continue;
                }

                let Some(target) = self.regs.embeddables.get(&member.type_key) else {
                    // The annotated case was already reported while the
                    // member itself resolved.
                    if member.is_composed_in {
                        err_at!(
                            errs,
                            member.location,
                            "the composed member '{}' has no registered embeddable type '{}'",
                            member.name,
                            member.ty.qualified_name
                        );
                    }
                    continue;
                };

                if !visited.insert(member.type_key.clone()) {
                    if self.report_cycles {
                        err_at!(
                            errs,
                            member.location,
                            "the embeddable '{}' composes itself through the member '{}'",
                            target.name,
                            member.name
                        );
                    }
                    continue;
                }

                let merged = merge_overrides(overrides, member, prefix.is_empty());
                let root = root.or(Some(member));
                self.collect(
                    &target.members,
                    &key,
                    Some(&merged),
                    root,
                    visited,
                    out,
                    errs,
                );
                visited.remove(&member.type_key);

                continue;
            }

            let mut flat = member.clone();
            flat.key = key;
            if !prefix.is_empty() {
                flat.parent_key = Some(prefix.to_string());
                flat.root_location = root.map(|composer| composer.location.clone());

                if let Some(replacement) =
                    overrides.and_then(|map| map.get(relative_key(&flat.key)))
                {
                    flat.column_name = replacement.column_name.clone();
                    flat.column_length = replacement.column_length;
                    flat.is_unique = replacement.is_unique;
                } else if !flat.explicit_column {
                    flat.column_name = to_snake_case(&flat.key);
                }
            }

            out.push(flat);
        }
    }
}

/// Map every column-bearing flattened member to its key, reporting one
/// diagnostic per colliding member beyond the first. The first mapping of
/// a column name wins.
pub(crate) fn build_column_map(
    owner: &str,
    members: &[MemberDescriptor],
    errs: &mut DiagnosticList,
) -> BTreeMap<String, String> {
    let mut columns = BTreeMap::new();

    for member in members {
        if !member.maps_to_column() {
            continue;
        }

        if columns.contains_key(&member.column_name) {
            err_at!(
                errs,
                member.report_location(),
                "the column '{}' is mapped more than once in '{owner}'",
                member.column_name
            );
            continue;
        }

        columns.insert(member.column_name.clone(), member.key.clone());
    }

    columns
}

fn join_key(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// The key a leaf is overridden by: the full key minus its first segment,
/// so overrides written on a composing member address members of its type.
fn relative_key(key: &str) -> &str {
    key.split_once('.').map_or(key, |(_, rest)| rest)
}

/// Merge the override map of a composing member into the one inherited
/// from its parent. Inherited entries address the nested member through
/// the composing member's name and win on collision.
fn merge_overrides(
    parent: Option<&BTreeMap<String, OverrideDescriptor>>,
    member: &MemberDescriptor,
    at_root: bool,
) -> BTreeMap<String, OverrideDescriptor> {
    if at_root {
        return member.override_map.clone();
    }

    let mut merged: BTreeMap<String, OverrideDescriptor> = member
        .override_map
        .iter()
        .map(|(target, descriptor)| {
            (format!("{}.{target}", member.name), descriptor.clone())
        })
        .collect();

    if let Some(parent) = parent {
        for (target, descriptor) in parent {
            merged.insert(target.clone(), descriptor.clone());
        }
    }

    merged
}
