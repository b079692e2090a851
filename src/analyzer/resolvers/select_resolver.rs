use std::collections::HashSet;

use tracing::trace;

use crate::{
    analyzer::{
        AggregateResolver, AnalysisContext, AnalyzerError, CoercionResolver, ExprContext, ExprResolver, FromResolver,
        NameList, NameScope, OrderByResolver, OrderTarget, QueryOutput, QueryResolutionInfo, WildcardResolver,
        inferred_name,
    },
    ast::{OrderByItem, Select, SelectItem, Span},
    resolved::{
        ColumnId, ComputedColumn, OutputColumn, ResolvedColumn, ResolvedExpr, ResolvedOrderByItem, ResolvedScan,
        ScanKind,
    },
    types::LanguageFeature,
};

struct SelectColumn {
    name: String,
    explicit: bool,
    expr: ResolvedExpr,
    span: Span,
}

struct GroupKey {
    expr: ResolvedExpr,
    column: ResolvedColumn,
}

struct OrderKey {
    target: OrderTarget,
    descending: bool,
    nulls_first: Option<bool>,
}

/// Everything a SELECT block's clauses resolve to before the scans are
/// stacked.
struct Clauses {
    columns: Vec<SelectColumn>,
    group_by: Vec<GroupKey>,
    having: Option<ResolvedExpr>,
    order_by: Vec<OrderKey>,
}

pub struct SelectResolver;

impl SelectResolver {
    /// Resolves one SELECT block together with the ORDER BY that follows it,
    /// since ORDER BY may name FROM columns the select list drops.
    pub fn resolve(
        ctx: &mut AnalysisContext,
        select: &Select,
        order_by: &[OrderByItem],
        outer: &NameScope,
    ) -> Result<QueryOutput, AnalyzerError> {
        ctx.nested(select.span, |ctx| Self::resolve_select(ctx, select, order_by, outer))
    }

    fn resolve_select(
        ctx: &mut AnalysisContext,
        select: &Select,
        order_by: &[OrderByItem],
        outer: &NameScope,
    ) -> Result<QueryOutput, AnalyzerError> {
        let query_name = ctx.next_query_name();
        let (mut scan, from_names) = match &select.from {
            Some(from) => {
                let (scan, names) = FromResolver::resolve(ctx, from, outer)?;
                (scan, Some(names))
            }
            None => (ResolvedScan::single_row(), None),
        };
        let mut scope = NameScope::child(outer);
        if let Some(names) = &from_names {
            scope.add_name_list(names)?;
        }

        if let Some(predicate) = &select.where_clause {
            let expr = ExprResolver::resolve(ctx, predicate, &ExprContext::new(&scope, "WHERE clause"))?;
            let expr = CoercionResolver::condition(ctx, expr, "WHERE clause", predicate.span)?;
            scan = ResolvedScan::new(scan.column_list.clone(), ScanKind::Filter { input: Box::new(scan), predicate: expr });
        }

        ctx.select_infos.push(QueryResolutionInfo::new());
        let clauses = Self::resolve_clauses(ctx, select, order_by, &scope, from_names.as_ref());
        let info = ctx.select_infos.pop().unwrap_or_default();
        Self::build(ctx, select, clauses?, info, scan, &query_name)
    }

    fn resolve_clauses(
        ctx: &mut AnalysisContext,
        select: &Select,
        order_by: &[OrderByItem],
        scope: &NameScope,
        from_names: Option<&NameList>,
    ) -> Result<Clauses, AnalyzerError> {
        let columns = Self::resolve_select_list(ctx, select, scope, from_names)?;
        Self::check_duplicate_aliases(ctx, &columns)?;

        let mut group_by: Vec<GroupKey> = Vec::new();
        let group_ctx = ExprContext::new(scope, "GROUP BY clause");
        for key in &select.group_by {
            let expr = match Self::select_column_for_group_key(ctx, key, &columns)? {
                Some(expr) => expr,
                None => ExprResolver::resolve(ctx, key, &group_ctx)?,
            };
            if !expr.ty().supports_grouping() {
                return Err(AnalyzerError::sql(format!("Grouping by expressions of type {} is not allowed", expr.ty()))
                    .at(key.span));
            }
            if group_by.iter().any(|k| k.expr == expr) {
                continue;
            }
            let name = match expr.as_column() {
                Some(column) => column.name.clone(),
                None => format!("$groupbycol{}", group_by.len() + 1),
            };
            let column = ctx.allocate_column("$groupby", &name, expr.ty().clone());
            group_by.push(GroupKey { expr, column });
        }

        let having = match &select.having {
            Some(predicate) => {
                let ectx = ExprContext::new(scope, "HAVING clause").with_aggregates();
                let expr = ExprResolver::resolve(ctx, predicate, &ectx)?;
                Some(CoercionResolver::condition(ctx, expr, "HAVING clause", predicate.span)?)
            }
            None => None,
        };

        let order_ctx = ExprContext::new(scope, "ORDER BY clause").with_aggregates().with_analytic();
        let output_names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        let mut keys = Vec::with_capacity(order_by.len());
        for item in order_by {
            let mut target = OrderByResolver::resolve_target(ctx, item, &output_names, &order_ctx)?;
            if select.distinct
                && let OrderTarget::Expr(expr) = &target
            {
                // after DISTINCT only the selected values exist
                match columns.iter().position(|c| c.expr == *expr) {
                    Some(idx) => target = OrderTarget::Output(idx),
                    None => {
                        return Err(AnalyzerError::sql(
                            "ORDER BY clause expression references a value that is not visible after SELECT DISTINCT",
                        )
                        .at(item.expr.span));
                    }
                }
            }
            keys.push(OrderKey { target, descending: item.descending, nulls_first: item.nulls_first });
        }

        Ok(Clauses { columns, group_by, having, order_by: keys })
    }

    fn resolve_select_list(
        ctx: &mut AnalysisContext,
        select: &Select,
        scope: &NameScope,
        from_names: Option<&NameList>,
    ) -> Result<Vec<SelectColumn>, AnalyzerError> {
        let ectx = ExprContext::new(scope, "SELECT list").with_aggregates().with_analytic();
        let mut columns = Vec::with_capacity(select.items.len());
        for item in &select.items {
            match item {
                SelectItem::Expr { expr, alias } => {
                    let resolved = ExprResolver::resolve(ctx, expr, &ectx)?;
                    let name = alias
                        .clone()
                        .or_else(|| inferred_name(expr))
                        .unwrap_or_else(|| format!("$col{}", columns.len() + 1));
                    columns.push(SelectColumn { name, explicit: alias.is_some(), expr: resolved, span: expr.span });
                }
                SelectItem::Star { span } => {
                    let expanded = WildcardResolver::expand_star(from_names).map_err(|e| e.at(*span))?;
                    columns.extend(expanded.into_iter().map(|(name, expr)| SelectColumn {
                        name,
                        explicit: false,
                        expr,
                        span: *span,
                    }));
                }
                SelectItem::QualifiedStar { qualifier, span } => {
                    let expanded = WildcardResolver::expand_qualified(ctx, qualifier, &ectx).map_err(|e| e.at(*span))?;
                    columns.extend(expanded.into_iter().map(|(name, expr)| SelectColumn {
                        name,
                        explicit: false,
                        expr,
                        span: *span,
                    }));
                }
            }
        }
        Ok(columns)
    }

    fn check_duplicate_aliases(ctx: &AnalysisContext, columns: &[SelectColumn]) -> Result<(), AnalyzerError> {
        if ctx.language().supports(LanguageFeature::AllowDuplicateColumnNames) {
            return Ok(());
        }
        let mut seen = HashSet::new();
        for c in columns.iter().filter(|c| c.explicit) {
            if !seen.insert(c.name.to_lowercase()) {
                return Err(AnalyzerError::sql(format!("Duplicate alias {} in SELECT list", c.name)).at(c.span));
            }
        }
        Ok(())
    }

    /// `GROUP BY 2` or `GROUP BY alias` naming a select-list column.
    fn select_column_for_group_key(
        ctx: &AnalysisContext,
        key: &crate::ast::Expr,
        columns: &[SelectColumn],
    ) -> Result<Option<ResolvedExpr>, AnalyzerError> {
        if !ctx.language().supports(LanguageFeature::GroupByOrdinal) {
            return Ok(None);
        }
        let column = if let Some(ordinal) = key.as_int_literal() {
            match usize::try_from(ordinal) {
                Ok(n) if (1..=columns.len()).contains(&n) => &columns[n - 1],
                _ => {
                    return Err(AnalyzerError::sql(format!(
                        "GROUP BY is out of SELECT column number range: {ordinal}"
                    ))
                    .at(key.span));
                }
            }
        } else if let Some(name) = key.as_identifier()
            && let Some(column) = columns.iter().find(|c| c.explicit && c.name.eq_ignore_ascii_case(name))
        {
            column
        } else {
            return Ok(None);
        };
        if references_computed(&column.expr) {
            return Err(AnalyzerError::sql(format!(
                "GROUP BY {} refers to an aggregate or analytic expression",
                column.name
            ))
            .at(key.span));
        }
        Ok(Some(column.expr.clone()))
    }

    /// Stacks the scans: aggregate, HAVING filter, analytic, project,
    /// DISTINCT and ORDER BY.
    fn build(
        ctx: &mut AnalysisContext,
        select: &Select,
        clauses: Clauses,
        info: QueryResolutionInfo,
        mut scan: ResolvedScan,
        query_name: &str,
    ) -> Result<QueryOutput, AnalyzerError> {
        let Clauses { mut columns, group_by, mut having, mut order_by } = clauses;
        let aggregated = !select.group_by.is_empty() || info.has_aggregates() || select.having.is_some();
        let QueryResolutionInfo { aggregate_columns, mut analytic_columns } = info;

        if aggregated {
            let grouping: Vec<(ResolvedExpr, ResolvedColumn)> =
                group_by.iter().map(|k| (k.expr.clone(), k.column.clone())).collect();
            let visible: HashSet<ColumnId> = group_by
                .iter()
                .map(|k| k.column.id)
                .chain(aggregate_columns.iter().map(|c| c.column.id))
                .chain(analytic_columns.iter().map(|c| c.column.id))
                .collect();
            for c in &mut columns {
                AggregateResolver::regroup(&mut c.expr, &grouping, &visible, "SELECT list").map_err(|e| e.at(c.span))?;
            }
            if let Some(predicate) = &mut having {
                AggregateResolver::regroup(predicate, &grouping, &visible, "HAVING clause")?;
            }
            for key in &mut order_by {
                if let OrderTarget::Expr(expr) = &mut key.target {
                    AggregateResolver::regroup(expr, &grouping, &visible, "ORDER BY clause")?;
                }
            }
            for c in &mut analytic_columns {
                AggregateResolver::regroup(&mut c.expr, &grouping, &visible, "Analytic function")?;
            }
            let group_by_list: Vec<ComputedColumn> =
                group_by.into_iter().map(|k| ComputedColumn { column: k.column, expr: k.expr }).collect();
            let column_list = group_by_list
                .iter()
                .chain(aggregate_columns.iter())
                .map(|c| c.column.clone())
                .collect();
            trace!(keys = group_by_list.len(), aggregates = aggregate_columns.len(), "aggregate scan");
            scan = ResolvedScan::new(
                column_list,
                ScanKind::Aggregate { input: Box::new(scan), group_by_list, aggregate_list: aggregate_columns },
            );
        }

        if let Some(predicate) = having {
            scan = ResolvedScan::new(scan.column_list.clone(), ScanKind::Filter { input: Box::new(scan), predicate });
        }

        if !analytic_columns.is_empty() {
            let mut column_list = scan.column_list.clone();
            column_list.extend(analytic_columns.iter().map(|c| c.column.clone()));
            scan = ResolvedScan::new(
                column_list,
                ScanKind::Analytic { input: Box::new(scan), function_list: analytic_columns },
            );
        }

        // project the select list, plus ORDER BY keys the list lacks
        let mut expr_list = Vec::new();
        let mut outputs = Vec::with_capacity(columns.len());
        for c in columns {
            let column = match c.expr.as_column() {
                Some(column) => column.clone(),
                None => {
                    let column = ctx.allocate_column(query_name, &c.name, c.expr.ty().clone());
                    expr_list.push(ComputedColumn { column: column.clone(), expr: c.expr });
                    column
                }
            };
            outputs.push(OutputColumn { name: c.name, column });
        }
        let mut project_columns: Vec<ResolvedColumn> = outputs.iter().map(|o| o.column.clone()).collect();
        let mut sort_items = Vec::with_capacity(order_by.len());
        for (idx, key) in order_by.into_iter().enumerate() {
            let expr = match key.target {
                OrderTarget::Output(i) => ResolvedExpr::column_ref(outputs[i].column.clone()),
                OrderTarget::Expr(expr) => {
                    let column = match expr.as_column() {
                        Some(column) => column.clone(),
                        None => {
                            let name = format!("$orderbycol{}", idx + 1);
                            let column = ctx.allocate_column("$orderby", &name, expr.ty().clone());
                            expr_list.push(ComputedColumn { column: column.clone(), expr });
                            column
                        }
                    };
                    if !project_columns.iter().any(|c| c.id == column.id) {
                        project_columns.push(column.clone());
                    }
                    ResolvedExpr::column_ref(column)
                }
            };
            OrderByResolver::check_orderable(&expr)?;
            sort_items.push(ResolvedOrderByItem { expr, descending: key.descending, nulls_first: key.nulls_first });
        }
        scan = ResolvedScan::new(project_columns, ScanKind::Project { input: Box::new(scan), expr_list });

        if select.distinct {
            let mut group_by_list = Vec::with_capacity(outputs.len());
            for output in &mut outputs {
                if !output.column.ty.supports_grouping() {
                    return Err(AnalyzerError::sql(format!(
                        "Column {} of type {} cannot be used in SELECT DISTINCT",
                        output.name, output.column.ty
                    )));
                }
                let column = ctx.allocate_column("$distinct", &output.column.name, output.column.ty.clone());
                group_by_list.push(ComputedColumn { column: column.clone(), expr: ResolvedExpr::column_ref(output.column.clone()) });
                output.column = column;
            }
            // DISTINCT keys are all outputs; remap the sort keys onto them
            for item in &mut sort_items {
                if let Some(column) = item.expr.as_column()
                    && let Some(computed) = group_by_list.iter().find(|c| c.expr.as_column().is_some_and(|o| o.id == column.id))
                {
                    item.expr = ResolvedExpr::column_ref(computed.column.clone());
                }
            }
            let column_list = group_by_list.iter().map(|c| c.column.clone()).collect();
            scan = ResolvedScan::new(
                column_list,
                ScanKind::Aggregate { input: Box::new(scan), group_by_list, aggregate_list: Vec::new() },
            );
        }

        let output_columns: Vec<ResolvedColumn> = outputs.iter().map(|o| o.column.clone()).collect();
        if !sort_items.is_empty() {
            scan = ResolvedScan::new(output_columns, ScanKind::OrderBy { input: Box::new(scan), items: sort_items });
        } else if scan.column_list != output_columns {
            scan = ResolvedScan::new(output_columns, ScanKind::Project { input: Box::new(scan), expr_list: Vec::new() });
        }
        Ok(QueryOutput { scan, columns: outputs })
    }
}

/// Whether `expr` reads an aggregate or analytic result column.
fn references_computed(expr: &ResolvedExpr) -> bool {
    match expr {
        ResolvedExpr::ColumnRef { column, .. } => column.table_name == "$aggregate" || column.table_name == "$analytic",
        other => other.children().into_iter().any(references_computed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analyzer::AnalyzerOptions,
        ast::{Expr, TableExpr},
        catalog::{Column, SimpleCatalog, Table},
        types::{LanguageOptions, Type},
    };

    fn catalog() -> SimpleCatalog {
        let mut catalog = SimpleCatalog::new("test");
        catalog.add_table(Table::new(
            "t",
            vec![Column::new("a", Type::Int64), Column::new("b", Type::String), Column::new("j", Type::Json)],
        ));
        catalog
    }

    fn resolve(options: &AnalyzerOptions, select: Select, order_by: &[OrderByItem]) -> Result<QueryOutput, AnalyzerError> {
        let catalog = catalog();
        let mut ctx = AnalysisContext::new(&catalog, options);
        let root = NameScope::root();
        SelectResolver::resolve(&mut ctx, &select, order_by, &root)
    }

    fn names(output: &QueryOutput) -> Vec<&str> {
        output.columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn select_list_names_and_plain_columns() {
        let select = Select::new(vec![
            SelectItem::expr(Expr::path("a")),
            SelectItem::expr(Expr::binary(crate::ast::BinaryOp::Add, Expr::path("a"), Expr::int(1))),
            SelectItem::aliased(Expr::path("b"), "x"),
        ])
        .from(TableExpr::table("t"));
        let output = resolve(&AnalyzerOptions::new(), select, &[]).unwrap();
        assert_eq!(names(&output), vec!["a", "$col2", "x"]);
        assert_eq!(output.columns[0].column.table_name, "t");
        assert_eq!(output.columns[1].column.table_name, "$query");
        assert_eq!(output.scan.column_list.len(), 3);
        assert!(matches!(output.scan.kind, ScanKind::Project { .. }));
    }

    #[test]
    fn grouping_rejects_loose_columns() {
        let select = Select::new(vec![SelectItem::expr(Expr::path("b")), SelectItem::expr(Expr::count_star())])
            .from(TableExpr::table("t"))
            .group_by(vec![Expr::path("a")]);
        let err = resolve(&AnalyzerOptions::new(), select, &[]).unwrap_err();
        assert_eq!(err.to_string(), "SELECT list expression references column b which is neither grouped nor aggregated");

        let select = Select::new(vec![SelectItem::expr(Expr::path("a")), SelectItem::expr(Expr::count_star())])
            .from(TableExpr::table("t"))
            .group_by(vec![Expr::path("a")]);
        let output = resolve(&AnalyzerOptions::new(), select, &[]).unwrap();
        assert_eq!(output.columns[0].column.table_name, "$groupby");
        assert_eq!(output.columns[1].column.table_name, "$aggregate");

        let select = Select::new(vec![SelectItem::expr(Expr::path("j"))])
            .from(TableExpr::table("t"))
            .group_by(vec![Expr::path("j")]);
        let err = resolve(&AnalyzerOptions::new(), select, &[]).unwrap_err();
        assert_eq!(err.to_string(), "Grouping by expressions of type JSON is not allowed");
    }

    #[test]
    fn group_by_ordinal_and_alias() {
        let options = AnalyzerOptions::with_language(LanguageOptions::new().enable(LanguageFeature::GroupByOrdinal));
        let select = Select::new(vec![
            SelectItem::aliased(Expr::binary(crate::ast::BinaryOp::Add, Expr::path("a"), Expr::int(1)), "k"),
            SelectItem::expr(Expr::count_star()),
        ])
        .from(TableExpr::table("t"))
        .group_by(vec![Expr::path("k")]);
        let output = resolve(&options, select.clone(), &[]).unwrap();
        assert_eq!(output.columns[0].column.name, "$groupbycol1");

        let by_ordinal = select.group_by(vec![Expr::int(1)]);
        assert!(resolve(&options, by_ordinal.clone(), &[]).is_ok());
        let err = resolve(&options, by_ordinal.group_by(vec![Expr::int(2)]), &[]).unwrap_err();
        assert_eq!(err.to_string(), "GROUP BY $col2 refers to an aggregate or analytic expression");
    }

    #[test]
    fn order_by_may_use_dropped_from_columns() {
        let select = Select::new(vec![SelectItem::expr(Expr::path("b"))]).from(TableExpr::table("t"));
        let output = resolve(&AnalyzerOptions::new(), select.clone(), &[OrderByItem::asc(Expr::path("a"))]).unwrap();
        match &output.scan.kind {
            ScanKind::OrderBy { input, .. } => assert_eq!(input.column_list.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(output.scan.column_list.len(), 1);

        let err = resolve(&AnalyzerOptions::new(), select.distinct(), &[OrderByItem::asc(Expr::path("a"))]).unwrap_err();
        assert!(err.to_string().contains("not visible after SELECT DISTINCT"));
    }

    #[test]
    fn duplicate_aliases_need_permission() {
        let select = Select::new(vec![
            SelectItem::aliased(Expr::int(1), "x"),
            SelectItem::aliased(Expr::int(2), "X"),
        ]);
        let err = resolve(&AnalyzerOptions::new(), select.clone(), &[]).unwrap_err();
        assert_eq!(err.to_string(), "Duplicate alias X in SELECT list");
        let options =
            AnalyzerOptions::with_language(LanguageOptions::new().enable(LanguageFeature::AllowDuplicateColumnNames));
        assert!(resolve(&options, select, &[]).is_ok());
    }

    #[test]
    fn star_without_from_fails() {
        let err = resolve(&AnalyzerOptions::new(), Select::new(vec![SelectItem::star()]), &[]).unwrap_err();
        assert_eq!(err.to_string(), "SELECT * must have a FROM clause");
    }
}
