//! Domain error taxonomy for the export pipeline.
//!
//! Validation errors are resolved at the input boundary (re-prompt),
//! data-source and serialization errors propagate to the top-level caller.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the export pipeline.
#[derive(Debug, Error)]
pub enum ExportError {
    /// A user-supplied zone code fails its format rule. Any one bad token
    /// invalidates the whole batch; the caller should re-prompt.
    #[error("Code invalide: '{code}'. {expected}")]
    InvalidCodeFormat {
        /// The offending token, as typed.
        code: String,
        /// Human description of the expected shape.
        expected: &'static str,
    },

    /// A required reference table is missing on disk.
    #[error("Fichier source introuvable : {0}")]
    SourceNotFound(PathBuf),

    /// All four output tables are empty; nothing to write.
    #[error("Aucune donnée à exporter : les quatre tableaux sont vides.")]
    EmptyResultSet,
}
