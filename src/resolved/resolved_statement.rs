use crate::resolved::{
    ColumnAccess, ResolvedColumn, ResolvedExpr, ResolvedScan, ResolvedVisitor, for_each_expr_scan_mut, walk_expr,
};

/// A named output column of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputColumn {
    pub name: String,
    pub column: ResolvedColumn,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateItem {
    pub target: ResolvedColumn,
    pub value: ResolvedExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedStatement {
    Query {
        output_column_list: Vec<OutputColumn>,
        query: ResolvedScan,
    },
    Insert {
        table_scan: ResolvedScan,
        insert_column_list: Vec<ResolvedColumn>,
        /// VALUES rows, each aligned with `insert_column_list`.
        rows: Vec<Vec<ResolvedExpr>>,
        query: Option<ResolvedScan>,
        query_output_column_list: Vec<ResolvedColumn>,
        /// Aligned with `table_scan.column_list`.
        column_access_list: Vec<ColumnAccess>,
    },
    Update {
        table_scan: ResolvedScan,
        where_expr: ResolvedExpr,
        update_items: Vec<UpdateItem>,
        column_access_list: Vec<ColumnAccess>,
    },
    Delete {
        table_scan: ResolvedScan,
        where_expr: ResolvedExpr,
        column_access_list: Vec<ColumnAccess>,
    },
}

impl ResolvedStatement {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ResolvedStatement::Query { .. } => "QueryStmt",
            ResolvedStatement::Insert { .. } => "InsertStmt",
            ResolvedStatement::Update { .. } => "UpdateStmt",
            ResolvedStatement::Delete { .. } => "DeleteStmt",
        }
    }

    pub fn table_scan(&self) -> Option<&ResolvedScan> {
        match self {
            ResolvedStatement::Query { .. } => None,
            ResolvedStatement::Insert { table_scan, .. }
            | ResolvedStatement::Update { table_scan, .. }
            | ResolvedStatement::Delete { table_scan, .. } => Some(table_scan),
        }
    }

    /// Read/write flags of the target table's columns, for DML.
    pub fn column_access_list(&self) -> Option<&[ColumnAccess]> {
        match self {
            ResolvedStatement::Query { .. } => None,
            ResolvedStatement::Insert { column_access_list, .. }
            | ResolvedStatement::Update { column_access_list, .. }
            | ResolvedStatement::Delete { column_access_list, .. } => Some(column_access_list),
        }
    }

    pub fn walk(&self, visitor: &mut dyn ResolvedVisitor) {
        match self {
            ResolvedStatement::Query { query, .. } => query.walk(visitor),
            ResolvedStatement::Insert { table_scan, rows, query, .. } => {
                table_scan.walk(visitor);
                for expr in rows.iter().flatten() {
                    walk_expr(expr, visitor);
                }
                if let Some(query) = query {
                    query.walk(visitor);
                }
            }
            ResolvedStatement::Update { table_scan, where_expr, update_items, .. } => {
                table_scan.walk(visitor);
                walk_expr(where_expr, visitor);
                for item in update_items {
                    walk_expr(&item.value, visitor);
                }
            }
            ResolvedStatement::Delete { table_scan, where_expr, .. } => {
                table_scan.walk(visitor);
                walk_expr(where_expr, visitor);
            }
        }
    }

    pub fn for_each_scan_mut(&mut self, f: &mut dyn FnMut(&mut ResolvedScan)) {
        match self {
            ResolvedStatement::Query { query, .. } => query.for_each_scan_mut(f),
            ResolvedStatement::Insert { table_scan, rows, query, .. } => {
                table_scan.for_each_scan_mut(f);
                for expr in rows.iter_mut().flatten() {
                    for_each_expr_scan_mut(expr, f);
                }
                if let Some(query) = query {
                    query.for_each_scan_mut(f);
                }
            }
            ResolvedStatement::Update { table_scan, where_expr, update_items, .. } => {
                table_scan.for_each_scan_mut(f);
                for_each_expr_scan_mut(where_expr, f);
                for item in update_items {
                    for_each_expr_scan_mut(&mut item.value, f);
                }
            }
            ResolvedStatement::Delete { table_scan, where_expr, .. } => {
                table_scan.for_each_scan_mut(f);
                for_each_expr_scan_mut(where_expr, f);
            }
        }
    }
}
