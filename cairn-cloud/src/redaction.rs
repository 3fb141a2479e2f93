//! Field-level redaction applied to every row before it leaves the machine.
//!
//! No absolute filesystem path, secret value, or raw source text is
//! uploaded: paths are relativized against the project root, secrets are
//! replaced with a fixed marker, source text is dropped, and raw blobs are
//! hex-encoded. Redaction is deterministic and, for the path/secret/code
//! kinds, idempotent: re-applying it to already-redacted data changes
//! nothing.

use crate::catalog::Catalog;
use crate::error::{CloudError, CloudResult};
use cairn_types::{Row, RowValue};
use std::collections::{HashMap, HashSet};

/// Marker substituted for secret values. The original is never uploaded.
pub const SECRET_MARKER: &str = "[REDACTED]";

/// How a single field is transformed before upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedactionKind {
    /// Absolute path relativized against the project root.
    Path,
    /// Like `Path`, but the root itself becomes the empty string rather
    /// than a bare separator.
    RootPath,
    /// Non-null values replaced with [`SECRET_MARKER`]; null stays null.
    Secret,
    /// Raw source text, dropped unconditionally.
    Code,
    /// Raw byte buffer encoded as a lowercase hex string.
    BlobHex,
}

/// A field → kind pair within one table's rule set.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub kind: RedactionKind,
}

const fn rule(field: &'static str, kind: RedactionKind) -> FieldRule {
    FieldRule { field, kind }
}

/// Reference redaction configuration. Tables absent here upload verbatim.
const STANDARD_RULES: &[(&str, &[FieldRule])] = &[
    (
        "projects",
        &[rule("root_path", RedactionKind::RootPath)],
    ),
    (
        "analysis_runs",
        &[rule("workspace_root", RedactionKind::RootPath)],
    ),
    (
        "files",
        &[
            rule("file_path", RedactionKind::Path),
            rule("content_hash", RedactionKind::BlobHex),
        ],
    ),
    ("directories", &[rule("dir_path", RedactionKind::Path)]),
    (
        "symbols",
        &[
            rule("file_path", RedactionKind::Path),
            rule("signature", RedactionKind::Code),
        ],
    ),
    (
        "symbol_references",
        &[
            rule("file_path", RedactionKind::Path),
            rule("context_line", RedactionKind::Code),
        ],
    ),
    ("imports", &[rule("source_path", RedactionKind::Path)]),
    (
        "diagnostics",
        &[
            rule("file_path", RedactionKind::Path),
            rule("snippet", RedactionKind::Code),
        ],
    ),
    (
        "diagnostic_fixes",
        &[
            rule("file_path", RedactionKind::Path),
            rule("replacement", RedactionKind::Code),
        ],
    ),
    ("suppressions", &[rule("file_path", RedactionKind::Path)]),
    (
        "secret_findings",
        &[
            rule("file_path", RedactionKind::Path),
            rule("secret_value", RedactionKind::Secret),
            rule("line_text", RedactionKind::Code),
        ],
    ),
    (
        "todo_items",
        &[
            rule("file_path", RedactionKind::Path),
            rule("text", RedactionKind::Code),
        ],
    ),
    ("hotspots", &[rule("file_path", RedactionKind::Path)]),
    (
        "duplicates",
        &[
            rule("first_path", RedactionKind::Path),
            rule("second_path", RedactionKind::Path),
        ],
    ),
    (
        "duplicate_blocks",
        &[
            rule("file_path", RedactionKind::Path),
            rule("source_text", RedactionKind::Code),
        ],
    ),
    (
        "commit_files",
        &[
            rule("file_path", RedactionKind::Path),
            rule("old_path", RedactionKind::Path),
        ],
    ),
    ("test_files", &[rule("file_path", RedactionKind::Path)]),
    (
        "coverage_files",
        &[
            rule("file_path", RedactionKind::Path),
            rule("line_bitmap", RedactionKind::BlobHex),
        ],
    ),
    ("change_impacts", &[rule("file_path", RedactionKind::Path)]),
];

/// Strips the project root from an absolute path.
///
/// Paths outside the root are returned unchanged; callers indexing files
/// outside the workspace therefore upload full paths.
pub fn redact_path(path: &str, root: &str) -> String {
    if path.is_empty() || root.is_empty() {
        return path.to_string();
    }
    match path.strip_prefix(root) {
        Some(rest) => {
            let rest = rest
                .strip_prefix('/')
                .or_else(|| rest.strip_prefix('\\'))
                .unwrap_or(rest);
            rest.to_string()
        }
        None => path.to_string(),
    }
}

/// Like [`redact_path`], but a path equal to the root (with or without a
/// trailing separator) becomes the empty string instead of a bare
/// separator.
pub fn redact_root_path(path: &str, root: &str) -> String {
    let trim = |s: &str| s.trim_end_matches(['/', '\\']).to_string();
    if !path.is_empty() && trim(path) == trim(root) {
        return String::new();
    }
    redact_path(path, root)
}

fn apply_kind(kind: RedactionKind, value: &RowValue, root: &str) -> RowValue {
    match kind {
        RedactionKind::Path => match value {
            RowValue::Text(s) => RowValue::Text(redact_path(s, root)),
            other => other.clone(),
        },
        RedactionKind::RootPath => match value {
            RowValue::Text(s) => RowValue::Text(redact_root_path(s, root)),
            other => other.clone(),
        },
        RedactionKind::Secret => match value {
            RowValue::Null => RowValue::Null,
            _ => RowValue::Text(SECRET_MARKER.to_string()),
        },
        RedactionKind::Code => RowValue::Null,
        RedactionKind::BlobHex => match value {
            RowValue::Blob(bytes) => RowValue::Text(hex::encode(bytes)),
            other => other.clone(),
        },
    }
}

/// Per-table, per-field redaction transform.
pub struct RedactionEngine {
    rules: HashMap<&'static str, &'static [FieldRule]>,
}

impl RedactionEngine {
    /// Builds the engine from the reference rule configuration.
    pub fn standard() -> Self {
        let rules = STANDARD_RULES.iter().copied().collect();
        Self { rules }
    }

    /// Checks the rule set against the catalog at configuration load:
    /// every ruled table must be a replicated table, with no duplicate
    /// table or field entries.
    pub fn validate(&self, catalog: &Catalog) -> CloudResult<()> {
        let mut tables = HashSet::new();
        for (table, fields) in STANDARD_RULES {
            if !tables.insert(*table) {
                return Err(CloudError::Config(format!(
                    "duplicate redaction rule set for table {table}"
                )));
            }
            if catalog.get(table).is_none() {
                return Err(CloudError::Config(format!(
                    "redaction rule for unknown table {table}"
                )));
            }
            let mut seen = HashSet::new();
            for fr in *fields {
                if fr.field.is_empty() || !seen.insert(fr.field) {
                    return Err(CloudError::Config(format!(
                        "invalid redaction field list for table {table}"
                    )));
                }
            }
        }
        // The introspection surface must agree with the configuration.
        debug_assert_eq!(self.redacted_tables().len(), STANDARD_RULES.len());
        Ok(())
    }

    /// Whether a table carries at least one redaction rule.
    pub fn table_needs_redaction(&self, table: &str) -> bool {
        self.rules.contains_key(table)
    }

    /// Every table carrying rules, for audits. The length always equals
    /// the number of entries in the rule configuration.
    pub fn redacted_tables(&self) -> Vec<&'static str> {
        let mut tables: Vec<_> = self.rules.keys().copied().collect();
        tables.sort_unstable();
        tables
    }

    /// Applies the table's rules to the fields present in the row; every
    /// other field is copied unchanged. Tables with no rule set pass
    /// through verbatim.
    pub fn redact_row(&self, table: &str, row: &Row, root: &str) -> Row {
        let Some(rules) = self.rules.get(table) else {
            return row.clone();
        };
        let mut out = row.clone();
        for fr in *rules {
            if let Some(value) = row.get(fr.field) {
                out.insert(fr.field.to_string(), apply_kind(fr.kind, value, root));
            }
        }
        out
    }

    /// Row-wise map of [`redact_row`].
    pub fn redact_batch(&self, table: &str, rows: &[Row], root: &str) -> Vec<Row> {
        rows.iter().map(|r| self.redact_row(table, r, root)).collect()
    }
}
