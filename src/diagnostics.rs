//! Error values and the accumulating sink handed to every pipeline
//! stage. Formatting and printing live in the CLI, not here.

use serde::Serialize;

use crate::source::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    Lexical,
    Syntax,
    Resolution,
    Runtime,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

/// Collects diagnostics for one runtime instance. Constructed by the
/// driver and passed into each stage; nothing here is process-global.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, kind: DiagnosticKind, message: impl Into<String>, position: Option<Position>) {
        self.entries.push(Diagnostic {
            kind,
            message: message.into(),
            position,
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn has_kind(&self, kind: DiagnosticKind) -> bool {
        self.entries.iter().any(|entry| entry.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
