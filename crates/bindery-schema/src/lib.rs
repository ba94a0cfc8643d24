pub mod annotation;
pub mod decl;
pub mod diag;
pub mod ident;
pub mod member;
pub mod resolve;
pub mod types;

/// Separator between a module path and a declared name in registry keys.
pub const KEY_SEPARATOR: char = '#';

use crate::diag::DiagnosticList;
use thiserror::Error as ThisError;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        annotation::{AnnotationRegistry, Level, Payload},
        decl::{CompilationUnit, DeclarationSet, SourceLocation},
        diag::{Diagnostic, DiagnosticList},
        err_at,
        member::{AssociationKind, Binding, MemberDescriptor, OverrideDescriptor},
        resolve::{Resolution, resolve},
        types::{Basic, TypeDescriptor, TypeKind},
    };
    pub use serde::{Deserialize, Serialize};
}

///
/// Error
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("resolution failed: {0}")]
    Resolution(DiagnosticList),
}
