use indexmap::IndexMap;
use tracing::debug;

use crate::resolved::{
    ColumnAccess, ColumnId, ResolvedColumn, ResolvedExpr, ResolvedScan, ResolvedStatement, ResolvedTvfArg,
    ResolvedVisitor, ScanKind,
};

/// Read/write access per column for one statement. Reads are collected from
/// the finished tree; writes are recorded while DML is resolved.
#[derive(Debug, Default)]
pub struct AccessTracker {
    access: IndexMap<ColumnId, ColumnAccess>,
}

impl AccessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, column: &ResolvedColumn, access: ColumnAccess) {
        let entry = self.access.entry(column.id).or_default();
        *entry = entry.merge(access);
    }

    pub fn access(&self, id: ColumnId) -> ColumnAccess {
        self.access.get(&id).copied().unwrap_or_default()
    }

    /// Marks every column the statement reads: column references, captured
    /// correlated columns, query outputs and columns that other nodes map
    /// positionally.
    pub fn record_reads(&mut self, statement: &ResolvedStatement) {
        if let ResolvedStatement::Query { output_column_list, .. } = statement {
            for c in output_column_list {
                self.record(&c.column, ColumnAccess::READ);
            }
        }
        if let ResolvedStatement::Insert { query_output_column_list, .. } = statement {
            for c in query_output_column_list {
                self.record(c, ColumnAccess::READ);
            }
        }
        statement.walk(self);
    }

    fn record_all(&mut self, columns: &[ResolvedColumn]) {
        for c in columns {
            self.record(c, ColumnAccess::READ);
        }
    }

    /// Drops columns nothing accesses from scan column lists. Must run after
    /// the whole tree is built and before [`AccessTracker::stamp`].
    pub fn prune(&self, statement: &mut ResolvedStatement) {
        statement.for_each_scan_mut(&mut |scan| self.prune_scan(scan));
    }

    fn prune_scan(&self, scan: &mut ResolvedScan) {
        let node = scan.node_name();
        let before = scan.column_list.len();
        match &mut scan.kind {
            ScanKind::SetOperation { .. }
            | ScanKind::With { .. }
            | ScanKind::WithRef { .. }
            | ScanKind::Recursive { .. }
            | ScanKind::RecursiveRef { .. }
            | ScanKind::Tvf { .. }
            | ScanKind::SingleRow => return,
            ScanKind::Table { column_index_list, .. } => {
                let mut kept_columns = Vec::with_capacity(before);
                let mut kept_indexes = Vec::with_capacity(before);
                for (column, index) in scan.column_list.drain(..).zip(column_index_list.drain(..)) {
                    if self.access.contains_key(&column.id) {
                        kept_columns.push(column);
                        kept_indexes.push(index);
                    }
                }
                scan.column_list = kept_columns;
                *column_index_list = kept_indexes;
            }
            _ => scan.column_list.retain(|c| self.access.contains_key(&c.id)),
        }
        let removed = before - scan.column_list.len();
        if removed > 0 {
            debug!(scan = node, removed, "pruned unused columns");
        }
    }

    /// Writes the final access flags onto DML statements.
    pub fn stamp(&self, statement: &mut ResolvedStatement) {
        let flags: Vec<ColumnAccess> = match statement.table_scan() {
            Some(scan) => scan.column_list.iter().map(|c| self.access(c.id)).collect(),
            None => return,
        };
        match statement {
            ResolvedStatement::Insert { column_access_list, .. }
            | ResolvedStatement::Update { column_access_list, .. }
            | ResolvedStatement::Delete { column_access_list, .. } => *column_access_list = flags,
            ResolvedStatement::Query { .. } => {}
        }
    }

    pub fn into_map(self) -> IndexMap<ColumnId, ColumnAccess> {
        self.access
    }
}

impl ResolvedVisitor for AccessTracker {
    fn visit_scan(&mut self, scan: &ResolvedScan) {
        match &scan.kind {
            ScanKind::SetOperation { items, .. } => {
                for item in items {
                    self.record_all(&item.output_column_list);
                }
            }
            ScanKind::Recursive { non_recursive, recursive, .. } => {
                self.record_all(&non_recursive.output_column_list);
                self.record_all(&recursive.output_column_list);
            }
            ScanKind::With { entries, .. } => {
                for entry in entries {
                    self.record_all(&entry.scan.column_list);
                }
            }
            ScanKind::Tvf { args, .. } => {
                for arg in args {
                    if let ResolvedTvfArg::Relation(input) = arg {
                        self.record_all(&input.column_list);
                    }
                }
            }
            _ => {}
        }
    }

    fn visit_expr(&mut self, expr: &ResolvedExpr) {
        match expr {
            ResolvedExpr::ColumnRef { column, .. } => self.record(column, ColumnAccess::READ),
            ResolvedExpr::Subquery { parameters, scan, .. } => {
                self.record_all(parameters);
                self.record_all(&scan.column_list);
            }
            _ => {}
        }
    }
}
