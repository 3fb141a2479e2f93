//! Static registry of replicated tables.
//!
//! Declares which local tables replicate to the cloud, from which source
//! database, keyed by which upsert conflict columns. Adding a table is a
//! configuration change here, never a runtime decision.

use crate::error::{CloudError, CloudResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// One of the three local embedded databases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceDb {
    /// Primary analysis store (files, symbols, diagnostics, metrics).
    Drift,
    /// Causal change graph.
    Bridge,
    /// Semantic/embedding store. Carries a cursor but no replicated
    /// tables today.
    Cortex,
}

impl SourceDb {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceDb::Drift => "drift",
            SourceDb::Bridge => "bridge",
            SourceDb::Cortex => "cortex",
        }
    }

    /// All source databases, in cursor-field order.
    pub const ALL: [SourceDb; 3] = [SourceDb::Drift, SourceDb::Bridge, SourceDb::Cortex];
}

impl fmt::Display for SourceDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration of one replicated table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDefinition {
    pub local_table: &'static str,
    pub source: SourceDb,
    /// Destination upsert key, in declared order.
    pub conflict_columns: &'static [&'static str],
}

impl TableDefinition {
    /// Destination table name, derived deterministically from the local name.
    pub fn cloud_table(&self) -> String {
        format!("cloud_{}", self.local_table)
    }
}

/// The common upsert key: rows carry a local surrogate id, scoped by the
/// stamped tenant/project identity.
const ID_KEY: &[&str] = &["tenant_id", "project_id", "id"];

const STANDARD_TABLES: &[TableDefinition] = &[
    // drift — primary analysis store
    def("projects", SourceDb::Drift, ID_KEY),
    def("analysis_runs", SourceDb::Drift, ID_KEY),
    def("files", SourceDb::Drift, ID_KEY),
    def("directories", SourceDb::Drift, ID_KEY),
    def("modules", SourceDb::Drift, ID_KEY),
    def("symbols", SourceDb::Drift, ID_KEY),
    def("symbol_references", SourceDb::Drift, ID_KEY),
    def("imports", SourceDb::Drift, ID_KEY),
    def("exports", SourceDb::Drift, ID_KEY),
    def("functions", SourceDb::Drift, ID_KEY),
    def("classes", SourceDb::Drift, ID_KEY),
    def(
        "call_edges",
        SourceDb::Drift,
        &["tenant_id", "project_id", "caller_id", "callee_id"],
    ),
    def("type_aliases", SourceDb::Drift, ID_KEY),
    def("diagnostics", SourceDb::Drift, ID_KEY),
    def("diagnostic_fixes", SourceDb::Drift, ID_KEY),
    def("lint_rules", SourceDb::Drift, ID_KEY),
    def("suppressions", SourceDb::Drift, ID_KEY),
    def("dependencies", SourceDb::Drift, ID_KEY),
    def("dependency_versions", SourceDb::Drift, ID_KEY),
    def("licenses", SourceDb::Drift, ID_KEY),
    def("vulnerabilities", SourceDb::Drift, ID_KEY),
    def("secret_findings", SourceDb::Drift, ID_KEY),
    def("todo_items", SourceDb::Drift, ID_KEY),
    def("code_metrics", SourceDb::Drift, ID_KEY),
    def("file_metrics", SourceDb::Drift, ID_KEY),
    def("complexity_snapshots", SourceDb::Drift, ID_KEY),
    def("churn_stats", SourceDb::Drift, ID_KEY),
    def("hotspots", SourceDb::Drift, ID_KEY),
    def("duplicates", SourceDb::Drift, ID_KEY),
    def("duplicate_blocks", SourceDb::Drift, ID_KEY),
    def("commits", SourceDb::Drift, ID_KEY),
    def(
        "commit_files",
        SourceDb::Drift,
        &["tenant_id", "project_id", "commit_id", "file_id"],
    ),
    def("authors", SourceDb::Drift, ID_KEY),
    def("branches", SourceDb::Drift, ID_KEY),
    def("test_files", SourceDb::Drift, ID_KEY),
    def("test_cases", SourceDb::Drift, ID_KEY),
    def("coverage_files", SourceDb::Drift, ID_KEY),
    // bridge — causal change graph
    def("causal_nodes", SourceDb::Bridge, ID_KEY),
    def(
        "causal_edges",
        SourceDb::Bridge,
        &["tenant_id", "project_id", "from_node_id", "to_node_id"],
    ),
    def("change_impacts", SourceDb::Bridge, ID_KEY),
    def("session_links", SourceDb::Bridge, ID_KEY),
    def("timeline_events", SourceDb::Bridge, ID_KEY),
];

const fn def(
    local_table: &'static str,
    source: SourceDb,
    conflict_columns: &'static [&'static str],
) -> TableDefinition {
    TableDefinition {
        local_table,
        source,
        conflict_columns,
    }
}

/// Immutable ordered list of replicated tables, loaded once.
#[derive(Debug, Clone)]
pub struct Catalog {
    tables: &'static [TableDefinition],
}

impl Catalog {
    /// The standard replication catalog.
    pub fn standard() -> Self {
        Self {
            tables: STANDARD_TABLES,
        }
    }

    pub fn tables(&self) -> &[TableDefinition] {
        self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn get(&self, local_table: &str) -> Option<&TableDefinition> {
        self.tables.iter().find(|t| t.local_table == local_table)
    }

    /// Tables reading from one source database, in catalog order.
    pub fn tables_for(&self, source: SourceDb) -> impl Iterator<Item = &TableDefinition> {
        self.tables.iter().filter(move |t| t.source == source)
    }

    /// Configuration-load-time checks, so catalog drift surfaces at
    /// startup instead of per row mid-push.
    pub fn validate(&self) -> CloudResult<()> {
        let mut seen = HashSet::new();
        for table in self.tables {
            if table.local_table.is_empty() {
                return Err(CloudError::Config("empty local table name".to_string()));
            }
            if !seen.insert(table.local_table) {
                return Err(CloudError::Config(format!(
                    "duplicate table definition: {}",
                    table.local_table
                )));
            }
            if table.conflict_columns.is_empty() {
                return Err(CloudError::Config(format!(
                    "table {} has no conflict columns",
                    table.local_table
                )));
            }
            if table.conflict_columns.iter().any(|c| c.is_empty()) {
                return Err(CloudError::Config(format!(
                    "table {} has an empty conflict column name",
                    table.local_table
                )));
            }
        }
        Ok(())
    }
}
