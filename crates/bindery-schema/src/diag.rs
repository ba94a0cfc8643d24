use crate::decl::SourceLocation;
use serde::Serialize;
use std::fmt;

///
/// Diagnostic
///
/// One structured error with the source position it was observed at.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    pub location: SourceLocation,
}

impl Diagnostic {
    #[must_use]
    pub const fn new(message: String, location: SourceLocation) -> Self {
        Self { message, location }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}:{}) : {}",
            self.location.file, self.location.line, self.location.column, self.message
        )
    }
}

///
/// DiagnosticNode
///

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum DiagnosticNode {
    Leaf(Diagnostic),
    Branch(DiagnosticList),
}

///
/// DiagnosticList
///
/// Ordered, possibly nested error accumulator. Resolvers append and
/// continue; nothing short-circuits. Nested lists are flattened
/// recursively for display.
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct DiagnosticList {
    nodes: Vec<DiagnosticNode>,
}

impl DiagnosticList {
    #[must_use]
    pub const fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.nodes.push(DiagnosticNode::Leaf(diagnostic));
    }

    /// Append another list as a nested branch, preserving its ordering.
    pub fn merge(&mut self, other: Self) {
        if !other.is_empty() {
            self.nodes.push(DiagnosticNode::Branch(other));
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.iter().all(|node| match node {
            DiagnosticNode::Leaf(_) => false,
            DiagnosticNode::Branch(list) => list.is_empty(),
        })
    }

    /// Number of leaf diagnostics, counted through nested branches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| match node {
                DiagnosticNode::Leaf(_) => 1,
                DiagnosticNode::Branch(list) => list.len(),
            })
            .sum()
    }

    /// Depth-first flattening of every leaf diagnostic.
    #[must_use]
    pub fn flatten(&self) -> Vec<&Diagnostic> {
        let mut out = Vec::with_capacity(self.nodes.len());
        self.collect_into(&mut out);

        out
    }

    fn collect_into<'a>(&'a self, out: &mut Vec<&'a Diagnostic>) {
        for node in &self.nodes {
            match node {
                DiagnosticNode::Leaf(diagnostic) => out.push(diagnostic),
                DiagnosticNode::Branch(list) => list.collect_into(out),
            }
        }
    }

    pub fn result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for DiagnosticList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, diagnostic) in self.flatten().into_iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
        }

        Ok(())
    }
}

impl std::error::Error for DiagnosticList {}

/// Append a formatted diagnostic at a source location.
#[macro_export]
macro_rules! err_at {
    ($errs:expr, $loc:expr, $($arg:tt)*) => {
        $errs.add($crate::diag::Diagnostic::new(format!($($arg)*), $loc.clone()))
    };
}
