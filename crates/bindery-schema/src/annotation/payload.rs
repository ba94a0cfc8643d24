use serde::{Deserialize, Serialize};

///
/// Payload
/// Typed value of one decoded annotation instance.
///

#[derive(Clone, Debug, PartialEq, Serialize)]
#[remain::sorted]
pub enum Payload {
    Association(AssociationPayload),
    AttributeOverride(AttributeOverridePayload),
    Column(ColumnPayload),
    Entity(EntityPayload),
    Enumerated(EnumeratedPayload),
    Query(QueryPayload),
    Repository(RepositoryPayload),
    Table(TablePayload),
    Temporal(TemporalPayload),
    Unit,
}

///
/// EntityPayload
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EntityPayload {
    pub name: Option<String>,
}

///
/// TablePayload
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TablePayload {
    pub name: Option<String>,
}

///
/// ColumnPayload
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnPayload {
    pub name: Option<String>,
    pub length: Option<u32>,
    pub unique: bool,
}

///
/// EnumeratedPayload
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EnumeratedPayload {
    pub value: EnumeratedKind,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnumeratedKind {
    #[default]
    Ordinal,
    String,
}

///
/// TemporalPayload
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TemporalPayload {
    pub value: TemporalKind,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
#[remain::sorted]
pub enum TemporalKind {
    Date,
    Time,
    Timestamp,
}

///
/// AttributeOverridePayload
/// Replaces the derived column mapping of a named nested member.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeOverridePayload {
    /// Dotted path of the targeted nested member.
    pub name: String,

    pub column_name: String,

    #[serde(default)]
    pub column_length: Option<u32>,

    #[serde(default)]
    pub column_unique: bool,
}

///
/// AssociationPayload
/// Shared payload of the four relationship annotations.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssociationPayload {
    pub cascade: Vec<CascadeKind>,
    pub fetch: Option<FetchKind>,
    pub mapped_by: Option<String>,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[remain::sorted]
pub enum CascadeKind {
    All,
    Persist,
    Remove,
    SaveUpdate,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
#[remain::sorted]
pub enum FetchKind {
    Eager,
    Lazy,
}

///
/// RepositoryPayload
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryPayload {
    #[serde(default)]
    pub name: Option<String>,

    /// Entity name the repository binds to. Mandatory.
    pub entity: String,
}

///
/// QueryPayload
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueryPayload {
    pub value: String,

    #[serde(default)]
    pub native: bool,
}

// Decoder functions registered by `AnnotationRegistry::standard`.

pub(crate) fn decode_unit(_raw: &serde_json::Value) -> Result<Payload, String> {
    Ok(Payload::Unit)
}

pub(crate) fn decode_entity(raw: &serde_json::Value) -> Result<Payload, String> {
    decode(raw).map(Payload::Entity)
}

pub(crate) fn decode_table(raw: &serde_json::Value) -> Result<Payload, String> {
    decode(raw).map(Payload::Table)
}

pub(crate) fn decode_column(raw: &serde_json::Value) -> Result<Payload, String> {
    decode(raw).map(Payload::Column)
}

pub(crate) fn decode_enumerated(raw: &serde_json::Value) -> Result<Payload, String> {
    decode(raw).map(Payload::Enumerated)
}

pub(crate) fn decode_temporal(raw: &serde_json::Value) -> Result<Payload, String> {
    decode(raw).map(Payload::Temporal)
}

pub(crate) fn decode_attribute_override(raw: &serde_json::Value) -> Result<Payload, String> {
    decode(raw).map(Payload::AttributeOverride)
}

pub(crate) fn decode_association(raw: &serde_json::Value) -> Result<Payload, String> {
    decode(raw).map(Payload::Association)
}

pub(crate) fn decode_repository(raw: &serde_json::Value) -> Result<Payload, String> {
    decode(raw).map(Payload::Repository)
}

pub(crate) fn decode_query(raw: &serde_json::Value) -> Result<Payload, String> {
    decode(raw).map(Payload::Query)
}

fn decode<T>(raw: &serde_json::Value) -> Result<T, String>
where
    T: serde::de::DeserializeOwned,
{
    // A bare annotation with no arguments arrives as null; decode it as an
    // empty argument map so mandatory fields still report as missing.
    let value = if raw.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        raw.clone()
    };

    serde_json::from_value(value).map_err(|err| err.to_string())
}
