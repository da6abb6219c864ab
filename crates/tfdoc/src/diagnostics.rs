//! non-fatal findings of a conversion run
use crate::config::SourceRange;

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A root block of a type the converter does not handle, skipped with its children
    UnknownBlockType { kind: String, range: SourceRange },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::UnknownBlockType { kind, range } => write!(
                f,
                "unknown block type: {kind} ({}:{})",
                range.filename, range.start_line
            ),
        }
    }
}

/// Sink for [Diagnostic]s, one per conversion run
#[derive(Debug, Default, derive_new::new)]
pub struct Diagnostics {
    #[new(default)]
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn log(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(%diagnostic, "block skipped");
        self.entries.push(diagnostic);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
