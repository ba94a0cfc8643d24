//! Annotation names, applicability levels and the decoding registry.
//!
//! The registry maps an annotation name to its target level and a typed
//! payload decoder. Resolvers never look at raw payload values themselves;
//! decoding is delegated here.

mod payload;

pub use payload::*;

use serde::Serialize;
use std::collections::BTreeMap;

pub const ENTITY: &str = "bind:entity";
pub const TABLE: &str = "bind:table";

pub const ID: &str = "bind:id";
pub const GENERATED_VALUE: &str = "bind:generated-value";

pub const COLUMN: &str = "bind:column";
pub const TRANSIENT: &str = "bind:transient";
pub const LOB: &str = "bind:lob";

pub const ENUMERATED: &str = "bind:enumerated";
pub const TEMPORAL: &str = "bind:temporal";
pub const CREATED_DATE: &str = "bind:created-date";
pub const LAST_MODIFIED_DATE: &str = "bind:last-modified-date";

pub const EMBEDDABLE: &str = "bind:embeddable";
pub const EMBEDDED: &str = "bind:embedded";
pub const ATTRIBUTE_OVERRIDE: &str = "bind:attribute-override";

pub const ONE_TO_ONE: &str = "bind:one-to-one";
pub const ONE_TO_MANY: &str = "bind:one-to-many";
pub const MANY_TO_ONE: &str = "bind:many-to-one";
pub const MANY_TO_MANY: &str = "bind:many-to-many";

pub const REPOSITORY: &str = "bind:repository";
pub const QUERY: &str = "bind:query";

///
/// Level
/// Where an annotation may legally appear.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[remain::sorted]
pub enum Level {
    Interface,
    Member,
    Method,
    Record,
}

///
/// AnnotationSpec
///

pub struct AnnotationSpec {
    pub level: Level,

    /// Whether the annotation may appear more than once on one declaration.
    pub repeatable: bool,

    decoder: fn(&serde_json::Value) -> Result<Payload, String>,
}

///
/// AnnotationRegistry
///

pub struct AnnotationRegistry {
    specs: BTreeMap<&'static str, AnnotationSpec>,
}

impl AnnotationRegistry {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            specs: BTreeMap::new(),
        }
    }

    /// Registry preloaded with the full `bind:` annotation set.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();

        registry.register(ENTITY, Level::Record, false, payload::decode_entity);
        registry.register(TABLE, Level::Record, false, payload::decode_table);
        registry.register(EMBEDDABLE, Level::Record, false, payload::decode_unit);

        registry.register(ID, Level::Member, false, payload::decode_unit);
        registry.register(GENERATED_VALUE, Level::Member, false, payload::decode_unit);
        registry.register(COLUMN, Level::Member, false, payload::decode_column);
        registry.register(TRANSIENT, Level::Member, false, payload::decode_unit);
        registry.register(LOB, Level::Member, false, payload::decode_unit);
        registry.register(ENUMERATED, Level::Member, false, payload::decode_enumerated);
        registry.register(TEMPORAL, Level::Member, false, payload::decode_temporal);
        registry.register(CREATED_DATE, Level::Member, false, payload::decode_unit);
        registry.register(LAST_MODIFIED_DATE, Level::Member, false, payload::decode_unit);
        registry.register(EMBEDDED, Level::Member, false, payload::decode_unit);
        registry.register(
            ATTRIBUTE_OVERRIDE,
            Level::Member,
            true,
            payload::decode_attribute_override,
        );
        registry.register(ONE_TO_ONE, Level::Member, false, payload::decode_association);
        registry.register(ONE_TO_MANY, Level::Member, false, payload::decode_association);
        registry.register(MANY_TO_ONE, Level::Member, false, payload::decode_association);
        registry.register(MANY_TO_MANY, Level::Member, false, payload::decode_association);

        registry.register(REPOSITORY, Level::Interface, false, payload::decode_repository);
        registry.register(QUERY, Level::Method, false, payload::decode_query);

        registry
    }

    pub fn register(
        &mut self,
        name: &'static str,
        level: Level,
        repeatable: bool,
        decoder: fn(&serde_json::Value) -> Result<Payload, String>,
    ) {
        self.specs.insert(
            name,
            AnnotationSpec {
                level,
                repeatable,
                decoder,
            },
        );
    }

    #[must_use]
    pub fn spec(&self, name: &str) -> Option<&AnnotationSpec> {
        self.specs.get(name)
    }

    /// Decode one raw annotation instance into its typed payload.
    pub fn decode(&self, name: &str, raw: &serde_json::Value) -> Result<Payload, String> {
        let spec = self
            .specs
            .get(name)
            .ok_or_else(|| format!("unknown annotation '{name}'"))?;

        (spec.decoder)(raw)
    }
}

impl Default for AnnotationRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn standard_registry_knows_every_level() {
        let registry = AnnotationRegistry::standard();

        assert_eq!(registry.spec(ENTITY).unwrap().level, Level::Record);
        assert_eq!(registry.spec(COLUMN).unwrap().level, Level::Member);
        assert_eq!(registry.spec(REPOSITORY).unwrap().level, Level::Interface);
        assert_eq!(registry.spec(QUERY).unwrap().level, Level::Method);
        assert!(registry.spec(ATTRIBUTE_OVERRIDE).unwrap().repeatable);
        assert!(!registry.spec(COLUMN).unwrap().repeatable);
    }

    #[test]
    fn unknown_annotations_fail_decoding() {
        let registry = AnnotationRegistry::standard();

        assert!(registry.decode("bind:nope", &json!({})).is_err());
    }

    #[test]
    fn unit_annotations_accept_empty_payloads() {
        let registry = AnnotationRegistry::standard();

        assert!(matches!(
            registry.decode(ID, &serde_json::Value::Null),
            Ok(Payload::Unit)
        ));
        assert!(matches!(registry.decode(TRANSIENT, &json!({})), Ok(Payload::Unit)));
    }
}
