use std::sync::Arc;

use crate::{
    ast::{JoinKind, SampleUnit, SetOperator},
    catalog::{Table, TableValuedFunction},
    resolved::{ComputedColumn, ResolvedColumn, ResolvedExpr, ResolvedOrderByItem},
};

/// One input of a set operation together with the columns it contributes,
/// positionally matched against the operation's column list.
#[derive(Debug, Clone, PartialEq)]
pub struct SetOperationItem {
    pub scan: ResolvedScan,
    pub output_column_list: Vec<ResolvedColumn>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedWithEntry {
    /// Unique within the statement (`name`, `name_2`, ...).
    pub alias: String,
    pub scan: ResolvedScan,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedTvfArg {
    Scalar(ResolvedExpr),
    Relation(ResolvedScan),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanKind {
    /// FROM-less SELECT.
    SingleRow,
    Table {
        table: Arc<Table>,
        alias: Option<String>,
        /// Catalog column ordinal for each entry of the column list.
        column_index_list: Vec<usize>,
    },
    Join {
        kind: JoinKind,
        left: Box<ResolvedScan>,
        right: Box<ResolvedScan>,
        condition: Option<ResolvedExpr>,
    },
    Filter {
        input: Box<ResolvedScan>,
        predicate: ResolvedExpr,
    },
    Project {
        input: Box<ResolvedScan>,
        expr_list: Vec<ComputedColumn>,
    },
    Aggregate {
        input: Box<ResolvedScan>,
        group_by_list: Vec<ComputedColumn>,
        aggregate_list: Vec<ComputedColumn>,
    },
    Analytic {
        input: Box<ResolvedScan>,
        function_list: Vec<ComputedColumn>,
    },
    OrderBy {
        input: Box<ResolvedScan>,
        items: Vec<ResolvedOrderByItem>,
    },
    LimitOffset {
        input: Box<ResolvedScan>,
        limit: ResolvedExpr,
        offset: Option<ResolvedExpr>,
    },
    Sample {
        input: Box<ResolvedScan>,
        method: String,
        size: ResolvedExpr,
        unit: SampleUnit,
    },
    SetOperation {
        op: SetOperator,
        all: bool,
        items: Vec<SetOperationItem>,
    },
    With {
        entries: Vec<ResolvedWithEntry>,
        query: Box<ResolvedScan>,
        recursive: bool,
    },
    /// Reads a WITH entry; columns match the entry's positionally.
    WithRef {
        alias: String,
    },
    /// Fixpoint of a recursive WITH entry.
    Recursive {
        all: bool,
        non_recursive: Box<SetOperationItem>,
        recursive: Box<SetOperationItem>,
    },
    /// Self-reference inside the recursive term.
    RecursiveRef {
        alias: String,
    },
    Tvf {
        function: Arc<TableValuedFunction>,
        args: Vec<ResolvedTvfArg>,
        alias: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedScan {
    pub column_list: Vec<ResolvedColumn>,
    pub kind: ScanKind,
}

impl ResolvedScan {
    pub fn new(column_list: Vec<ResolvedColumn>, kind: ScanKind) -> Self {
        Self { column_list, kind }
    }

    pub fn single_row() -> Self {
        Self::new(Vec::new(), ScanKind::SingleRow)
    }

    pub fn node_name(&self) -> &'static str {
        match &self.kind {
            ScanKind::SingleRow => "SingleRowScan",
            ScanKind::Table { .. } => "TableScan",
            ScanKind::Join { .. } => "JoinScan",
            ScanKind::Filter { .. } => "FilterScan",
            ScanKind::Project { .. } => "ProjectScan",
            ScanKind::Aggregate { .. } => "AggregateScan",
            ScanKind::Analytic { .. } => "AnalyticScan",
            ScanKind::OrderBy { .. } => "OrderByScan",
            ScanKind::LimitOffset { .. } => "LimitOffsetScan",
            ScanKind::Sample { .. } => "SampleScan",
            ScanKind::SetOperation { .. } => "SetOperationScan",
            ScanKind::With { .. } => "WithScan",
            ScanKind::WithRef { .. } => "WithRefScan",
            ScanKind::Recursive { .. } => "RecursiveScan",
            ScanKind::RecursiveRef { .. } => "RecursiveRefScan",
            ScanKind::Tvf { .. } => "TVFScan",
        }
    }

    /// Child scans in evaluation order, excluding subqueries nested in
    /// expressions.
    pub fn inputs(&self) -> Vec<&ResolvedScan> {
        match &self.kind {
            ScanKind::SingleRow | ScanKind::Table { .. } | ScanKind::WithRef { .. } | ScanKind::RecursiveRef { .. } => {
                Vec::new()
            }
            ScanKind::Join { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            ScanKind::Filter { input, .. }
            | ScanKind::Project { input, .. }
            | ScanKind::Aggregate { input, .. }
            | ScanKind::Analytic { input, .. }
            | ScanKind::OrderBy { input, .. }
            | ScanKind::LimitOffset { input, .. }
            | ScanKind::Sample { input, .. } => vec![input.as_ref()],
            ScanKind::SetOperation { items, .. } => items.iter().map(|i| &i.scan).collect(),
            ScanKind::With { entries, query, .. } => {
                entries.iter().map(|e| &e.scan).chain(std::iter::once(query.as_ref())).collect()
            }
            ScanKind::Recursive { non_recursive, recursive, .. } => vec![&non_recursive.scan, &recursive.scan],
            ScanKind::Tvf { args, .. } => args
                .iter()
                .filter_map(|a| match a {
                    ResolvedTvfArg::Relation(scan) => Some(scan),
                    ResolvedTvfArg::Scalar(_) => None,
                })
                .collect(),
        }
    }

    pub fn inputs_mut(&mut self) -> Vec<&mut ResolvedScan> {
        match &mut self.kind {
            ScanKind::SingleRow | ScanKind::Table { .. } | ScanKind::WithRef { .. } | ScanKind::RecursiveRef { .. } => {
                Vec::new()
            }
            ScanKind::Join { left, right, .. } => vec![left.as_mut(), right.as_mut()],
            ScanKind::Filter { input, .. }
            | ScanKind::Project { input, .. }
            | ScanKind::Aggregate { input, .. }
            | ScanKind::Analytic { input, .. }
            | ScanKind::OrderBy { input, .. }
            | ScanKind::LimitOffset { input, .. }
            | ScanKind::Sample { input, .. } => vec![input.as_mut()],
            ScanKind::SetOperation { items, .. } => items.iter_mut().map(|i| &mut i.scan).collect(),
            ScanKind::With { entries, query, .. } => {
                entries.iter_mut().map(|e| &mut e.scan).chain(std::iter::once(query.as_mut())).collect()
            }
            ScanKind::Recursive { non_recursive, recursive, .. } => {
                vec![&mut non_recursive.scan, &mut recursive.scan]
            }
            ScanKind::Tvf { args, .. } => args
                .iter_mut()
                .filter_map(|a| match a {
                    ResolvedTvfArg::Relation(scan) => Some(scan),
                    ResolvedTvfArg::Scalar(_) => None,
                })
                .collect(),
        }
    }

    /// Expressions owned directly by this scan.
    pub fn expressions(&self) -> Vec<&ResolvedExpr> {
        match &self.kind {
            ScanKind::Join { condition, .. } => condition.iter().collect(),
            ScanKind::Filter { predicate, .. } => vec![predicate],
            ScanKind::Project { expr_list, .. } | ScanKind::Analytic { function_list: expr_list, .. } => {
                expr_list.iter().map(|c| &c.expr).collect()
            }
            ScanKind::Aggregate { group_by_list, aggregate_list, .. } => {
                group_by_list.iter().chain(aggregate_list.iter()).map(|c| &c.expr).collect()
            }
            ScanKind::OrderBy { items, .. } => items.iter().map(|i| &i.expr).collect(),
            ScanKind::LimitOffset { limit, offset, .. } => std::iter::once(limit).chain(offset.iter()).collect(),
            ScanKind::Sample { size, .. } => vec![size],
            ScanKind::Tvf { args, .. } => args
                .iter()
                .filter_map(|a| match a {
                    ResolvedTvfArg::Scalar(e) => Some(e),
                    ResolvedTvfArg::Relation(_) => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn expressions_mut(&mut self) -> Vec<&mut ResolvedExpr> {
        match &mut self.kind {
            ScanKind::Join { condition, .. } => condition.iter_mut().collect(),
            ScanKind::Filter { predicate, .. } => vec![predicate],
            ScanKind::Project { expr_list, .. } | ScanKind::Analytic { function_list: expr_list, .. } => {
                expr_list.iter_mut().map(|c| &mut c.expr).collect()
            }
            ScanKind::Aggregate { group_by_list, aggregate_list, .. } => {
                group_by_list.iter_mut().chain(aggregate_list.iter_mut()).map(|c| &mut c.expr).collect()
            }
            ScanKind::OrderBy { items, .. } => items.iter_mut().map(|i| &mut i.expr).collect(),
            ScanKind::LimitOffset { limit, offset, .. } => std::iter::once(limit).chain(offset.iter_mut()).collect(),
            ScanKind::Sample { size, .. } => vec![size],
            ScanKind::Tvf { args, .. } => args
                .iter_mut()
                .filter_map(|a| match a {
                    ResolvedTvfArg::Scalar(e) => Some(e),
                    ResolvedTvfArg::Relation(_) => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Pre-order walk over this scan and every scan below it, including
    /// subqueries nested in expressions.
    pub fn walk(&self, visitor: &mut dyn ResolvedVisitor) {
        visitor.visit_scan(self);
        for expr in self.expressions() {
            walk_expr(expr, visitor);
        }
        for input in self.inputs() {
            input.walk(visitor);
        }
    }

    /// Mutable pre-order walk over every scan, including subqueries nested
    /// in expressions.
    pub fn for_each_scan_mut(&mut self, f: &mut dyn FnMut(&mut ResolvedScan)) {
        f(self);
        for expr in self.expressions_mut() {
            for_each_expr_scan_mut(expr, f);
        }
        for input in self.inputs_mut() {
            input.for_each_scan_mut(f);
        }
    }

    /// Indented tree of node names and column lists.
    pub fn debug_string(&self) -> String {
        let mut out = String::new();
        self.write_debug(0, &mut out);
        out
    }

    fn write_debug(&self, indent: usize, out: &mut String) {
        let columns: Vec<String> = self.column_list.iter().map(|c| c.to_string()).collect();
        out.push_str(&format!("{}{}[{}]\n", "  ".repeat(indent), self.node_name(), columns.join(", ")));
        for input in self.inputs() {
            input.write_debug(indent + 1, out);
        }
    }
}

/// Read-only traversal hook over a resolved tree.
pub trait ResolvedVisitor {
    fn visit_scan(&mut self, _scan: &ResolvedScan) {}
    fn visit_expr(&mut self, _expr: &ResolvedExpr) {}
}

pub fn walk_expr(expr: &ResolvedExpr, visitor: &mut dyn ResolvedVisitor) {
    visitor.visit_expr(expr);
    for child in expr.children() {
        walk_expr(child, visitor);
    }
    if let Some(scan) = expr.subquery_scan() {
        scan.walk(visitor);
    }
}

/// Mutable walk over the scans of subqueries nested in `expr`.
pub fn for_each_expr_scan_mut(expr: &mut ResolvedExpr, f: &mut dyn FnMut(&mut ResolvedScan)) {
    for child in expr.children_mut() {
        for_each_expr_scan_mut(child, f);
    }
    if let Some(scan) = expr.subquery_scan_mut() {
        scan.for_each_scan_mut(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catalog::Column, resolved::ColumnId, types::Type};

    fn table_scan() -> ResolvedScan {
        let table = Arc::new(Table::new("t", vec![Column::new("a", Type::Int64)]));
        let a = ResolvedColumn { id: ColumnId(1), table_name: "t".into(), name: "a".into(), ty: Type::Int64 };
        ResolvedScan::new(vec![a], ScanKind::Table { table, alias: None, column_index_list: vec![0] })
    }

    struct CountScans(usize);

    impl ResolvedVisitor for CountScans {
        fn visit_scan(&mut self, _scan: &ResolvedScan) {
            self.0 += 1;
        }
    }

    #[test]
    fn walk_reaches_subquery_scans() {
        let inner = table_scan();
        let subquery = ResolvedExpr::Subquery {
            kind: crate::resolved::ResolvedSubqueryKind::Exists,
            ty: Type::Bool,
            in_expr: None,
            parameters: Vec::new(),
            scan: Box::new(inner),
        };
        let filter = ResolvedScan::new(
            table_scan().column_list.clone(),
            ScanKind::Filter { input: Box::new(table_scan()), predicate: subquery },
        );
        let mut counter = CountScans(0);
        filter.walk(&mut counter);
        assert_eq!(counter.0, 3);

        let mut filter = filter;
        let mut tables = 0;
        filter.for_each_scan_mut(&mut |s| {
            if matches!(s.kind, ScanKind::Table { .. }) {
                tables += 1;
            }
        });
        assert_eq!(tables, 2);
    }

    #[test]
    fn debug_string_indents_inputs() {
        let scan = table_scan();
        let project = ResolvedScan::new(
            scan.column_list.clone(),
            ScanKind::Project { input: Box::new(scan), expr_list: Vec::new() },
        );
        assert_eq!(project.debug_string(), "ProjectScan[t.a#1]\n  TableScan[t.a#1]\n");
    }
}
