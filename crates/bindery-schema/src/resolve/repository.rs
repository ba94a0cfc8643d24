//! Repository binding.
//!
//! An annotated interface binds to an entity by its logical name and
//! exposes finder methods. Method shape is validated for every annotated
//! interface, registered or not, so a broken binding still surfaces every
//! problem in one run.

use crate::{
    KEY_SEPARATOR,
    annotation::{self, AnnotationRegistry, Payload, QueryPayload, RepositoryPayload},
    decl::{CompilationUnit, InterfaceDecl, MethodDecl, SourceLocation},
    diag::DiagnosticList,
    err_at,
};
use serde::Serialize;

use super::{Registries, decode_single};

/// Qualified type every repository method must accept first, carrying
/// deadline and cancellation through the call.
const CONTEXT_CAPABILITY: &str = "context.Context";

///
/// RepositoryDescriptor
///

#[derive(Clone, Debug, Serialize)]
pub struct RepositoryDescriptor {
    /// Logical repository name; defaults to the interface name.
    pub name: String,

    /// Registry key (`module#interface-name`).
    pub key: String,

    pub module_path: String,

    /// Registry key of the bound entity.
    pub entity_key: String,

    /// Logical name the binding was declared with.
    pub entity_name: String,

    pub methods: Vec<MethodDescriptor>,
    pub location: SourceLocation,
}

///
/// MethodDescriptor
///

#[derive(Clone, Debug, Serialize)]
pub struct MethodDescriptor {
    pub name: String,
    pub query: Option<QueryDescriptor>,
    pub location: SourceLocation,
}

///
/// QueryDescriptor
///

#[derive(Clone, Debug, Serialize)]
pub struct QueryDescriptor {
    pub statement: String,
    pub native: bool,
}

impl From<QueryPayload> for QueryDescriptor {
    fn from(payload: QueryPayload) -> Self {
        Self {
            statement: payload.value,
            native: payload.native,
        }
    }
}

pub(crate) fn register(
    unit: &CompilationUnit,
    registry: &AnnotationRegistry,
    regs: &mut Registries,
    errs: &mut DiagnosticList,
) {
    for interface in &unit.interfaces {
        if !interface.annotations.contains(annotation::REPOSITORY) {
            continue;
        }

        let payload = match decode_single(
            registry,
            &interface.annotations,
            annotation::REPOSITORY,
            &interface.name,
            &interface.location,
            errs,
        ) {
            Some(Payload::Repository(payload)) => Some(payload),
            _ => None,
        };

        // Methods are checked regardless of whether the binding itself
        // holds up.
        let methods = resolve_methods(registry, interface, errs);

        let Some(payload) = payload else {
            continue;
        };

        // decode_single already reported the duplicate; a twice-annotated
        // interface is not registered.
        let duplicated = interface
            .annotations
            .get(annotation::REPOSITORY)
            .is_some_and(|instances| instances.len() > 1);
        if duplicated {
            continue;
        }

        register_binding(unit, interface, payload, methods, regs, errs);
    }
}

fn register_binding(
    unit: &CompilationUnit,
    interface: &InterfaceDecl,
    payload: RepositoryPayload,
    methods: Vec<MethodDescriptor>,
    regs: &mut Registries,
    errs: &mut DiagnosticList,
) {
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map_or_else(|| interface.name.trim().to_string(), ToString::to_string);

    if regs.repositories_by_name.contains_key(&name) {
        err_at!(
            errs,
            interface.location,
            "a repository named '{name}' is already defined"
        );
        return;
    }

    let Some(entity_key) = regs.entities_by_name.get(&payload.entity).cloned() else {
        err_at!(
            errs,
            interface.location,
            "the repository '{}' references the unknown entity '{}'",
            interface.name,
            payload.entity
        );
        return;
    };

    let key = format!("{}{KEY_SEPARATOR}{}", unit.module_path, interface.name);
    regs.repositories_by_name.insert(name.clone(), key.clone());
    regs.repositories.insert(
        key.clone(),
        RepositoryDescriptor {
            name,
            key,
            module_path: unit.module_path.clone(),
            entity_key,
            entity_name: payload.entity,
            methods,
            location: interface.location.clone(),
        },
    );
}

fn resolve_methods(
    registry: &AnnotationRegistry,
    interface: &InterfaceDecl,
    errs: &mut DiagnosticList,
) -> Vec<MethodDescriptor> {
    interface
        .methods
        .iter()
        .map(|method| {
            validate_signature(interface, method, errs);

            let query = match decode_single(
                registry,
                &method.annotations,
                annotation::QUERY,
                &method.name,
                &method.location,
                errs,
            ) {
                Some(Payload::Query(payload)) => Some(QueryDescriptor::from(payload)),
                _ => None,
            };

            MethodDescriptor {
                name: method.name.clone(),
                query,
                location: method.location.clone(),
            }
        })
        .collect()
}

fn validate_signature(interface: &InterfaceDecl, method: &MethodDecl, errs: &mut DiagnosticList) {
    let Some(first) = method.params.first() else {
        err_at!(
            errs,
            method.location,
            "the method '{}' in repository '{}' must declare at least one parameter",
            method.name,
            interface.name
        );
        return;
    };

    if first.ty.written_name() != CONTEXT_CAPABILITY {
        err_at!(
            errs,
            method.location,
            "the first parameter of method '{}' in repository '{}' must be {CONTEXT_CAPABILITY}",
            method.name,
            interface.name
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        decl::{AnnotationMap, ParamDecl, RecordDecl, TypeNode},
        resolve::entity,
    };
    use serde_json::{Value, json};

    fn location(line: u32) -> SourceLocation {
        SourceLocation {
            file: "repository.go".to_string(),
            line,
            column: 1,
        }
    }

    fn context_param() -> ParamDecl {
        ParamDecl {
            name: "ctx".to_string(),
            ty: TypeNode::qualified("context", "Context"),
        }
    }

    fn method(name: &str, annotations: &[(&str, Value)], params: Vec<ParamDecl>) -> MethodDecl {
        let mut map = AnnotationMap::default();
        for (annotation, value) in annotations {
            map.insert(annotation, value.clone());
        }

        MethodDecl {
            name: name.to_string(),
            annotations: map,
            params,
            location: location(8),
        }
    }

    fn interface(name: &str, annotations: &[(&str, Value)], methods: Vec<MethodDecl>) -> InterfaceDecl {
        let mut map = AnnotationMap::default();
        for (annotation, value) in annotations {
            map.insert(annotation, value.clone());
        }

        InterfaceDecl {
            name: name.to_string(),
            annotations: map,
            methods,
            location: location(3),
        }
    }

    fn user_entity() -> RecordDecl {
        let mut annotations = AnnotationMap::default();
        annotations.insert(annotation::ENTITY, Value::Null);

        RecordDecl {
            name: "User".to_string(),
            annotations,
            members: vec![],
            location: location(1),
        }
    }

    fn run(records: Vec<RecordDecl>, interfaces: Vec<InterfaceDecl>) -> (Registries, DiagnosticList) {
        let unit = CompilationUnit {
            module_path: "app/repo".to_string(),
            records,
            interfaces,
            ..Default::default()
        };

        let registry = AnnotationRegistry::standard();
        let mut regs = Registries::default();
        let mut errs = DiagnosticList::new();

        entity::identify(&unit, &registry, &mut regs, &mut errs);
        register(&unit, &registry, &mut regs, &mut errs);

        (regs, errs)
    }

    #[test]
    fn repository_binds_to_its_entity() {
        let (regs, errs) = run(
            vec![user_entity()],
            vec![interface(
                "UserRepository",
                &[(annotation::REPOSITORY, json!({ "entity": "User" }))],
                vec![method(
                    "FindByName",
                    &[(
                        annotation::QUERY,
                        json!({ "value": "SELECT * FROM user WHERE name = ?", "native": true }),
                    )],
                    vec![
                        context_param(),
                        ParamDecl {
                            name: "name".to_string(),
                            ty: TypeNode::named("string"),
                        },
                    ],
                )],
            )],
        );

        assert!(errs.is_empty(), "unexpected: {errs}");
        let repository = regs
            .repositories
            .get("app/repo#UserRepository")
            .expect("registered");
        assert_eq!(repository.name, "UserRepository");
        assert_eq!(repository.entity_key, "app/repo#User");
        assert_eq!(repository.methods.len(), 1);
        let query = repository.methods[0].query.as_ref().expect("query decoded");
        assert!(query.native);
    }

    #[test]
    fn unknown_entity_reports_and_skips_registration() {
        let (regs, errs) = run(
            vec![],
            vec![interface(
                "GhostRepository",
                &[(annotation::REPOSITORY, json!({ "entity": "Ghost" }))],
                vec![],
            )],
        );

        assert_eq!(errs.len(), 1);
        assert!(errs.to_string().contains("unknown entity 'Ghost'"));
        assert!(regs.repositories.is_empty());
    }

    #[test]
    fn methods_are_validated_even_when_the_binding_fails() {
        let (regs, errs) = run(
            vec![],
            vec![interface(
                "GhostRepository",
                &[(annotation::REPOSITORY, json!({ "entity": "Ghost" }))],
                vec![method("FindAll", &[], vec![])],
            )],
        );

        assert_eq!(errs.len(), 2, "binding error and signature error: {errs}");
        assert!(errs.to_string().contains("at least one parameter"));
        assert!(regs.repositories.is_empty());
    }

    #[test]
    fn first_parameter_must_carry_the_context_capability() {
        let (_, errs) = run(
            vec![user_entity()],
            vec![interface(
                "UserRepository",
                &[(annotation::REPOSITORY, json!({ "entity": "User" }))],
                vec![method(
                    "FindByName",
                    &[],
                    vec![ParamDecl {
                        name: "name".to_string(),
                        ty: TypeNode::named("string"),
                    }],
                )],
            )],
        );

        assert_eq!(errs.len(), 1);
        assert!(errs.to_string().contains("must be context.Context"));
    }

    #[test]
    fn duplicate_repository_names_skip_the_later_binding() {
        let (regs, errs) = run(
            vec![user_entity()],
            vec![
                interface(
                    "UserRepository",
                    &[(annotation::REPOSITORY, json!({ "entity": "User", "name": "users" }))],
                    vec![],
                ),
                interface(
                    "AccountRepository",
                    &[(annotation::REPOSITORY, json!({ "entity": "User", "name": "users" }))],
                    vec![],
                ),
            ],
        );

        assert_eq!(errs.len(), 1);
        assert!(errs.to_string().contains("already defined"));
        assert_eq!(regs.repositories.len(), 1);
    }

    #[test]
    fn missing_entity_argument_is_a_decode_error() {
        let (regs, errs) = run(
            vec![user_entity()],
            vec![interface(
                "UserRepository",
                &[(annotation::REPOSITORY, Value::Null)],
                vec![],
            )],
        );

        assert_eq!(errs.len(), 1);
        assert!(errs.to_string().contains("invalid 'bind:repository'"));
        assert!(regs.repositories.is_empty());
    }
}
