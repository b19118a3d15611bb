use std::path::PathBuf;

use thiserror::Error;

/// Why a sampling attempt produced nothing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SampleError {
    /// No ISO week has both listening history and photos.
    #[error("no week has both listening history and photos")]
    NoOverlap,
}

/// A recovered problem met during ingestion. Ingestion keeps going after
/// each of these; they are collected in the [`IngestReport`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    #[error("cannot read directory {}: {message}", .path.display())]
    DirectoryUnreadable { path: PathBuf, message: String },

    /// Unreadable file, malformed JSON, or a `ts` that no format accepts.
    #[error("{}: {message}", .file.display())]
    Parse { file: PathBuf, message: String },

    #[error("{}: unexpected top-level structure ({found})", .file.display())]
    UnsupportedShape { file: PathBuf, found: &'static str },

    #[error("{}: record {index} has no timestamp", .file.display())]
    MissingTimestamp { file: PathBuf, index: usize },

    #[error("{}: no embedded capture time, using file modification time", .path.display())]
    MetadataMissing { path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    DirectoryUnreadable,
    Parse,
    UnsupportedShape,
    MissingTimestamp,
    MetadataMissing,
}

impl Diagnostic {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Diagnostic::DirectoryUnreadable { .. } => DiagnosticKind::DirectoryUnreadable,
            Diagnostic::Parse { .. } => DiagnosticKind::Parse,
            Diagnostic::UnsupportedShape { .. } => DiagnosticKind::UnsupportedShape,
            Diagnostic::MissingTimestamp { .. } => DiagnosticKind::MissingTimestamp,
            Diagnostic::MetadataMissing { .. } => DiagnosticKind::MetadataMissing,
        }
    }
}

/// Counters and diagnostics from one ingestion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Files matching the discovery rule.
    pub files_seen: u64,
    /// Files dropped entirely (parse failure, unsupported shape).
    pub files_skipped: u64,
    /// Items placed into a week bucket.
    pub items_ingested: u64,
    /// Records dropped for lack of a usable timestamp.
    pub items_skipped: u64,
    pub warnings: Vec<Diagnostic>,
}

impl IngestReport {
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.warnings.iter().filter(|d| d.kind() == kind).count()
    }

    pub(crate) fn record(&mut self, diagnostic: Diagnostic) {
        // Missing metadata is routine for screenshots and exports; keep it out of the default log.
        match diagnostic.kind() {
            DiagnosticKind::MetadataMissing | DiagnosticKind::MissingTimestamp => {
                tracing::debug!("{}", diagnostic)
            }
            _ => tracing::warn!("{}", diagnostic),
        }
        self.warnings.push(diagnostic);
    }
}
