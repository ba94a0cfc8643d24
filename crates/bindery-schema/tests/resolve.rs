//! End-to-end resolution over whole declaration sets.

use bindery_schema::{
    annotation,
    decl::{
        AnnotationMap, CompilationUnit, DeclarationSet, InterfaceDecl, MemberDecl, MethodDecl,
        ParamDecl, RecordDecl, SourceLocation, TypeNode,
    },
    resolve::resolve,
};
use serde_json::{Value, json};

fn location(file: &str, line: u32) -> SourceLocation {
    SourceLocation {
        file: file.to_string(),
        line,
        column: 1,
    }
}

fn annotations(pairs: &[(&str, Value)]) -> AnnotationMap {
    let mut map = AnnotationMap::default();
    for (name, value) in pairs {
        map.insert(name, value.clone());
    }

    map
}

fn member(name: &str, ty: TypeNode, pairs: &[(&str, Value)]) -> MemberDecl {
    MemberDecl {
        name: name.to_string(),
        exported: true,
        composed: false,
        ty,
        annotations: annotations(pairs),
        location: location("model.go", 10),
    }
}

fn record(name: &str, pairs: &[(&str, Value)], members: Vec<MemberDecl>) -> RecordDecl {
    RecordDecl {
        name: name.to_string(),
        annotations: annotations(pairs),
        members,
        location: location("model.go", 1),
    }
}

fn unit(module: &str, records: Vec<RecordDecl>) -> CompilationUnit {
    CompilationUnit {
        module_path: module.to_string(),
        records,
        ..Default::default()
    }
}

fn set(units: Vec<CompilationUnit>) -> DeclarationSet {
    DeclarationSet { units }
}

#[test]
fn a_plain_entity_resolves_without_diagnostics() {
    let set = set(vec![unit(
        "app/model",
        vec![record(
            "User",
            &[(annotation::ENTITY, Value::Null)],
            vec![
                member(
                    "Id",
                    TypeNode::named("int"),
                    &[
                        (annotation::ID, Value::Null),
                        (annotation::GENERATED_VALUE, Value::Null),
                    ],
                ),
                member("Name", TypeNode::named("string"), &[]),
            ],
        )],
    )]);

    let resolution = resolve(&set);

    assert!(!resolution.has_errors(), "unexpected: {}", resolution.diagnostics);
    let entity = resolution.entity_by_name("User").expect("User registered");
    assert_eq!(entity.table, "user");
    assert_eq!(entity.columns.get("id").map(String::as_str), Some("Id"));
    assert_eq!(entity.columns.get("name").map(String::as_str), Some("Name"));
    assert_eq!(entity.id_member.as_deref(), Some("Id"));
}

#[test]
fn duplicate_default_columns_yield_one_diagnostic_and_keep_the_first_mapping() {
    // Audit.By is overridden to "created_by", which the direct member
    // CreatedBy already claims by derivation.
    let set = set(vec![unit(
        "app/model",
        vec![
            record(
                "Audit",
                &[(annotation::EMBEDDABLE, Value::Null)],
                vec![member("By", TypeNode::named("string"), &[])],
            ),
            record(
                "Document",
                &[(annotation::ENTITY, Value::Null)],
                vec![
                    member("CreatedBy", TypeNode::named("string"), &[]),
                    member(
                        "Created",
                        TypeNode::named("Audit"),
                        &[
                            (annotation::EMBEDDED, Value::Null),
                            (
                                annotation::ATTRIBUTE_OVERRIDE,
                                json!({ "name": "By", "column_name": "created_by" }),
                            ),
                        ],
                    ),
                ],
            ),
        ],
    )]);

    let resolution = resolve(&set);

    assert_eq!(
        resolution.diagnostics.len(),
        1,
        "exactly one diagnostic: {}",
        resolution.diagnostics
    );
    assert!(
        resolution
            .diagnostics
            .to_string()
            .contains("mapped more than once")
    );

    let entity = resolution.entity_by_name("Document").expect("still registered");
    assert_eq!(
        entity.columns.get("created_by").map(String::as_str),
        Some("CreatedBy")
    );
}

#[test]
fn an_unbound_repository_yields_one_diagnostic_and_no_registration() {
    let mut repo_unit = unit("app/repo", vec![]);
    repo_unit.interfaces = vec![InterfaceDecl {
        name: "OrderRepository".to_string(),
        annotations: annotations(&[(annotation::REPOSITORY, json!({ "entity": "Order" }))]),
        methods: vec![],
        location: location("repository.go", 3),
    }];

    let resolution = resolve(&set(vec![repo_unit]));

    assert_eq!(resolution.diagnostics.len(), 1);
    assert!(
        resolution
            .diagnostics
            .to_string()
            .contains("unknown entity 'Order'")
    );
    assert!(resolution.repositories.is_empty());
}

#[test]
fn entity_and_embeddable_on_one_record_is_one_error_and_no_registration() {
    let set = set(vec![unit(
        "app/model",
        vec![record(
            "Broken",
            &[
                (annotation::ENTITY, Value::Null),
                (annotation::EMBEDDABLE, Value::Null),
            ],
            vec![member("Name", TypeNode::named("string"), &[])],
        )],
    )]);

    let resolution = resolve(&set);

    assert_eq!(resolution.diagnostics.len(), 1);
    assert!(resolution.entities.is_empty());
    assert!(resolution.embeddables.is_empty());
}

#[test]
fn override_precedence_prefers_the_outermost_declaration() {
    // Entity -> B -> A; both the entity and B override A.Y.
    let mut member_of_a = member("MemberOfA", TypeNode::named("A"), &[]);
    member_of_a.composed = true;
    member_of_a.annotations = annotations(&[(
        annotation::ATTRIBUTE_OVERRIDE,
        json!({ "name": "Y", "column_name": "from_b" }),
    )]);

    let set = set(vec![unit(
        "app/model",
        vec![
            record(
                "A",
                &[(annotation::EMBEDDABLE, Value::Null)],
                vec![member("Y", TypeNode::named("string"), &[])],
            ),
            record("B", &[(annotation::EMBEDDABLE, Value::Null)], vec![member_of_a]),
            record(
                "E",
                &[(annotation::ENTITY, Value::Null)],
                vec![member(
                    "MemberOfB",
                    TypeNode::named("B"),
                    &[
                        (annotation::EMBEDDED, Value::Null),
                        (
                            annotation::ATTRIBUTE_OVERRIDE,
                            json!({ "name": "MemberOfA.Y", "column_name": "from_entity" }),
                        ),
                    ],
                )],
            ),
        ],
    )]);

    let resolution = resolve(&set);

    assert!(!resolution.has_errors(), "unexpected: {}", resolution.diagnostics);
    let entity = resolution.entity_by_name("E").expect("registered");
    assert_eq!(
        entity.columns.get("from_entity").map(String::as_str),
        Some("MemberOfB.MemberOfA.Y")
    );
    assert!(!entity.columns.contains_key("from_b"));
}

#[test]
fn composition_resolves_across_units_in_either_order() {
    // The entity's unit comes first; the embeddable it composes is
    // declared in a later unit.
    let set = set(vec![
        unit(
            "app/entities",
            vec![record(
                "User",
                &[(annotation::ENTITY, Value::Null)],
                vec![{
                    let mut m = member(
                        "HomeAddress",
                        TypeNode::qualified("shared", "Address"),
                        &[(annotation::EMBEDDED, Value::Null)],
                    );
                    m.location = location("user.go", 7);
                    m
                }],
            )],
        ),
        unit(
            "app/shared",
            vec![record(
                "Address",
                &[(annotation::EMBEDDABLE, Value::Null)],
                vec![member("City", TypeNode::named("string"), &[])],
            )],
        ),
    ]);

    // resolve_import needs the alias mapping in the entity unit
    let mut set = set;
    set.units[0].imports = vec![bindery_schema::decl::Import {
        alias: "shared".to_string(),
        path: "app/shared".to_string(),
    }];

    let resolution = resolve(&set);

    assert!(!resolution.has_errors(), "unexpected: {}", resolution.diagnostics);
    let entity = resolution.entity_by_name("User").expect("registered");
    assert_eq!(
        entity.columns.get("home_address_city").map(String::as_str),
        Some("HomeAddress.City")
    );
}

#[test]
fn cyclic_composition_is_reported_not_recursed() {
    let mut a_child = member("Child", TypeNode::named("B"), &[]);
    a_child.composed = true;
    let mut b_parent = member("Parent", TypeNode::named("A"), &[]);
    b_parent.composed = true;

    let set = set(vec![unit(
        "app/model",
        vec![
            record("A", &[(annotation::EMBEDDABLE, Value::Null)], vec![a_child]),
            record("B", &[(annotation::EMBEDDABLE, Value::Null)], vec![b_parent]),
        ],
    )]);

    let resolution = resolve(&set);

    assert!(resolution.has_errors());
    assert!(
        resolution
            .diagnostics
            .to_string()
            .contains("composes itself")
    );
    // both embeddables stay registered
    assert_eq!(resolution.embeddables.len(), 2);
}

#[test]
fn repositories_bind_and_validate_methods() {
    let mut repo_unit = unit(
        "app/model",
        vec![record("User", &[(annotation::ENTITY, Value::Null)], vec![])],
    );
    repo_unit.interfaces = vec![InterfaceDecl {
        name: "UserRepository".to_string(),
        annotations: annotations(&[(annotation::REPOSITORY, json!({ "entity": "User" }))]),
        methods: vec![
            MethodDecl {
                name: "FindByName".to_string(),
                annotations: annotations(&[(
                    annotation::QUERY,
                    json!({ "value": "SELECT * FROM user WHERE name = ?" }),
                )]),
                params: vec![
                    ParamDecl {
                        name: "ctx".to_string(),
                        ty: TypeNode::qualified("context", "Context"),
                    },
                    ParamDecl {
                        name: "name".to_string(),
                        ty: TypeNode::named("string"),
                    },
                ],
                location: location("repository.go", 6),
            },
            MethodDecl {
                name: "Broken".to_string(),
                annotations: AnnotationMap::default(),
                params: vec![ParamDecl {
                    name: "name".to_string(),
                    ty: TypeNode::named("string"),
                }],
                location: location("repository.go", 9),
            },
        ],
        location: location("repository.go", 3),
    }];

    let resolution = resolve(&set(vec![repo_unit]));

    assert_eq!(resolution.diagnostics.len(), 1);
    assert!(
        resolution
            .diagnostics
            .to_string()
            .contains("must be context.Context")
    );

    // the binding itself still registers; only the one method is bad
    let repository = resolution
        .repositories
        .get("app/model#UserRepository")
        .expect("registered");
    assert_eq!(repository.entity_name, "User");
    assert_eq!(repository.methods.len(), 2);
    assert!(repository.methods[0].query.is_some());
}

#[test]
fn every_diagnostic_of_a_broken_set_is_reported_in_one_run() {
    // Three independent problems in one set: an unexported member, an
    // association inside an embeddable and a duplicate entity name.
    let set = set(vec![unit(
        "app/model",
        vec![
            record(
                "Audit",
                &[(annotation::EMBEDDABLE, Value::Null)],
                vec![member(
                    "Watcher",
                    TypeNode::named("User"),
                    &[(annotation::ONE_TO_ONE, Value::Null)],
                )],
            ),
            record(
                "User",
                &[(annotation::ENTITY, Value::Null)],
                vec![{
                    let mut m = member("name", TypeNode::named("string"), &[]);
                    m.exported = false;
                    m
                }],
            ),
            record("User2", &[(annotation::ENTITY, json!({ "name": "User" }))], vec![]),
        ],
    )]);

    let resolution = resolve(&set);

    let text = resolution.diagnostics.to_string();
    assert!(text.contains("cannot declare the association"));
    assert!(text.contains("must be exported"));
    assert!(text.contains("already defined"));
    assert_eq!(resolution.diagnostics.len(), 3, "all three: {text}");
}
