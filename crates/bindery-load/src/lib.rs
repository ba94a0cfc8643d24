//! Loads declaration documents from JSON files into the in-memory model
//! the resolution engine consumes.
//!
//! A document is either one compilation unit or a whole declaration set;
//! the loader accepts both shapes and folds every given path into a single
//! set, in argument order.

use bindery_schema::decl::{CompilationUnit, DeclarationSet};
use serde::Deserialize;
use std::{fs, path::Path};
use thiserror::Error as ThisError;

///
/// LoadError
///

#[derive(Debug, ThisError)]
pub enum LoadError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("cannot parse '{path}': {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

///
/// Document
/// One parsed input file, in either accepted shape.
///

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Document {
    Set(DeclarationSet),
    Unit(CompilationUnit),
}

impl From<Document> for DeclarationSet {
    fn from(document: Document) -> Self {
        match document {
            Document::Set(set) => set,
            Document::Unit(unit) => Self { units: vec![unit] },
        }
    }
}

/// Load one declaration document.
pub fn load_path(path: impl AsRef<Path>) -> Result<DeclarationSet, LoadError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;

    parse(&text, &path.display().to_string())
}

/// Load and fold several declaration documents, in order.
pub fn load_paths<I, P>(paths: I) -> Result<DeclarationSet, LoadError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut set = DeclarationSet::default();
    for path in paths {
        set.extend(load_path(path)?);
    }

    Ok(set)
}

/// Parse a declaration document from a string. `origin` only labels
/// errors.
pub fn parse(text: &str, origin: &str) -> Result<DeclarationSet, LoadError> {
    let document: Document = serde_json::from_str(text).map_err(|source| LoadError::Json {
        path: origin.to_string(),
        source,
    })?;

    Ok(document.into())
}
