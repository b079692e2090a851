use std::{collections::HashSet, sync::Arc};

use crate::{
    analyzer::{AnalysisContext, AnalyzerError, ExprContext, ExprResolver, FunctionResolver},
    ast::{FunctionCall, Span, WindowSpec},
    catalog::Function,
    resolved::{ColumnId, ComputedColumn, ResolvedColumn, ResolvedExpr, ResolvedOrderByItem, ResolvedWindow},
};

pub struct AggregateResolver;

impl AggregateResolver {
    /// Resolves an aggregate call into a `$aggregate` column of the
    /// enclosing SELECT and returns a reference to it.
    pub fn resolve_aggregate(
        ctx: &mut AnalysisContext,
        function: Arc<Function>,
        call: &FunctionCall,
        ectx: &ExprContext,
        span: Span,
    ) -> Result<ResolvedExpr, AnalyzerError> {
        if ectx.in_aggregate {
            return Err(AnalyzerError::sql("Aggregations of aggregations are not allowed"));
        }
        if !ectx.allow_aggregates || ctx.select_infos.is_empty() {
            return Err(AnalyzerError::sql(format!(
                "Aggregate function {} not allowed in {}",
                function.sql_name(),
                ectx.clause
            )));
        }
        let inner = ectx.inside_aggregate();
        let args = call.args.iter().map(|a| ExprResolver::resolve(ctx, a, &inner)).collect::<Result<Vec<_>, _>>()?;
        if call.distinct
            && let Some(arg) = args.iter().find(|a| !a.ty().supports_grouping())
        {
            return Err(AnalyzerError::sql(format!(
                "Aggregate functions with DISTINCT cannot be used with arguments of type {}",
                arg.ty()
            )));
        }
        let (args, ty) = FunctionResolver::bind_arguments(ctx, &function, args, span)?;
        let expr = ResolvedExpr::AggregateCall { function, args, ty: ty.clone(), distinct: call.distinct };

        let index = ctx.select_infos.last().map_or(0, |info| info.aggregate_columns.len()) + 1;
        let column = ctx.allocate_column("$aggregate", &format!("$agg{index}"), ty);
        if let Some(info) = ctx.select_infos.last_mut() {
            info.aggregate_columns.push(ComputedColumn { column: column.clone(), expr });
        }
        Ok(ResolvedExpr::column_ref(column))
    }

    /// Resolves `f(...) OVER (...)` into an `$analytic` column.
    pub fn resolve_analytic(
        ctx: &mut AnalysisContext,
        function: Arc<Function>,
        call: &FunctionCall,
        window: &WindowSpec,
        ectx: &ExprContext,
        span: Span,
    ) -> Result<ResolvedExpr, AnalyzerError> {
        if ectx.in_aggregate {
            return Err(AnalyzerError::sql(format!(
                "Analytic function {} cannot be an argument of an aggregate function",
                function.sql_name()
            )));
        }
        if !ectx.allow_analytic || ctx.select_infos.is_empty() {
            return Err(AnalyzerError::sql(format!(
                "Analytic function {} not allowed in {}",
                function.sql_name(),
                ectx.clause
            )));
        }
        if call.distinct {
            return Err(AnalyzerError::sql(format!(
                "DISTINCT is not allowed in analytic function {}",
                function.sql_name()
            )));
        }
        let inner = ectx.without_analytic();
        let args = call.args.iter().map(|a| ExprResolver::resolve(ctx, a, &inner)).collect::<Result<Vec<_>, _>>()?;

        let mut partition_by = Vec::with_capacity(window.partition_by.len());
        for key in &window.partition_by {
            let expr = ExprResolver::resolve(ctx, key, &inner)?;
            if !expr.ty().supports_grouping() {
                return Err(AnalyzerError::sql(format!("Partitioning by expressions of type {} is not allowed", expr.ty()))
                    .at(key.span));
            }
            partition_by.push(expr);
        }
        let mut order_by = Vec::with_capacity(window.order_by.len());
        for item in &window.order_by {
            let expr = ExprResolver::resolve(ctx, &item.expr, &inner)?;
            if !expr.ty().supports_ordering() {
                return Err(AnalyzerError::sql(format!("Ordering by expressions of type {} is not allowed", expr.ty()))
                    .at(item.expr.span));
            }
            order_by.push(ResolvedOrderByItem { expr, descending: item.descending, nulls_first: item.nulls_first });
        }

        let (args, ty) = FunctionResolver::bind_arguments(ctx, &function, args, span)?;
        let expr = ResolvedExpr::AnalyticCall {
            function,
            args,
            ty: ty.clone(),
            window: ResolvedWindow { partition_by, order_by },
        };
        let index = ctx.select_infos.last().map_or(0, |info| info.analytic_columns.len()) + 1;
        let column = ctx.allocate_column("$analytic", &format!("$analytic{index}"), ty);
        if let Some(info) = ctx.select_infos.last_mut() {
            info.analytic_columns.push(ComputedColumn { column: column.clone(), expr });
        }
        Ok(ResolvedExpr::column_ref(column))
    }

    /// Rewrites `expr` to read only columns visible after grouping: whole
    /// grouping keys become references to their group columns, and any
    /// other column must already be one of `visible`.
    pub fn regroup(
        expr: &mut ResolvedExpr,
        grouping: &[(ResolvedExpr, ResolvedColumn)],
        visible: &HashSet<ColumnId>,
        clause: &str,
    ) -> Result<(), AnalyzerError> {
        if let Some((_, column)) = grouping.iter().find(|(key, _)| key == expr) {
            *expr = ResolvedExpr::column_ref(column.clone());
            return Ok(());
        }
        match expr {
            ResolvedExpr::ColumnRef { correlated: true, .. } => Ok(()),
            ResolvedExpr::ColumnRef { column, .. } => {
                if visible.contains(&column.id) {
                    Ok(())
                } else {
                    Err(not_grouped(clause, column))
                }
            }
            ResolvedExpr::Subquery { parameters, scan, in_expr, .. } => {
                let mut renames = Vec::new();
                for param in parameters.iter_mut() {
                    if visible.contains(&param.id) {
                        continue;
                    }
                    let replacement = grouping.iter().find(|(key, _)| key.as_column().is_some_and(|c| c.id == param.id));
                    match replacement {
                        Some((_, group_column)) => {
                            renames.push((param.id, group_column.clone()));
                            *param = group_column.clone();
                        }
                        None => return Err(not_grouped(clause, param)),
                    }
                }
                if !renames.is_empty() {
                    scan.for_each_scan_mut(&mut |s| {
                        for e in s.expressions_mut() {
                            rename_correlated(e, &renames);
                        }
                    });
                }
                match in_expr {
                    Some(e) => Self::regroup(e, grouping, visible, clause),
                    None => Ok(()),
                }
            }
            other => {
                for child in other.children_mut() {
                    Self::regroup(child, grouping, visible, clause)?;
                }
                Ok(())
            }
        }
    }
}

fn not_grouped(clause: &str, column: &ResolvedColumn) -> AnalyzerError {
    AnalyzerError::sql(format!(
        "{clause} expression references column {} which is neither grouped nor aggregated",
        column.name
    ))
}

/// Points correlated references (and nested subquery parameters) at the
/// group columns that replaced them.
fn rename_correlated(expr: &mut ResolvedExpr, renames: &[(ColumnId, ResolvedColumn)]) {
    let rename = |column: &mut ResolvedColumn| {
        if let Some((_, to)) = renames.iter().find(|(id, _)| *id == column.id) {
            *column = to.clone();
        }
    };
    match expr {
        ResolvedExpr::ColumnRef { column, correlated: true } => rename(column),
        ResolvedExpr::Subquery { parameters, .. } => parameters.iter_mut().for_each(rename),
        _ => {}
    }
    for child in expr.children_mut() {
        rename_correlated(child, renames);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analyzer::{AnalyzerOptions, NameScope, QueryResolutionInfo},
        ast::Expr,
        catalog::SimpleCatalog,
        types::{Type, Value},
    };

    fn col(id: u32, name: &str) -> ResolvedColumn {
        ResolvedColumn { id: ColumnId(id), table_name: "t".into(), name: name.into(), ty: Type::Int64 }
    }

    #[test]
    fn aggregates_become_columns() {
        let catalog = SimpleCatalog::new("c");
        let options = AnalyzerOptions::new();
        let mut ctx = AnalysisContext::new(&catalog, &options);
        ctx.select_infos.push(QueryResolutionInfo::new());
        let root = NameScope::root();
        let ectx = ExprContext::new(&root, "SELECT list").with_aggregates();

        let expr = ExprResolver::resolve(&mut ctx, &Expr::call("sum", vec![Expr::int(1)]), &ectx).unwrap();
        let column = expr.as_column().unwrap();
        assert_eq!(column.table_name, "$aggregate");
        assert_eq!(column.name, "$agg1");
        assert!(ctx.select_infos[0].has_aggregates());

        let nested = Expr::call("sum", vec![Expr::call("count", vec![Expr::int(1)])]);
        let err = ExprResolver::resolve(&mut ctx, &nested, &ectx).unwrap_err();
        assert_eq!(err.to_string(), "Aggregations of aggregations are not allowed");

        let err = ExprResolver::resolve(&mut ctx, &Expr::count_star(), &ExprContext::new(&root, "WHERE clause"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Aggregate function COUNT(*) not allowed in WHERE clause");
    }

    #[test]
    fn regroup_replaces_keys_and_rejects_loose_columns() {
        let a = col(1, "a");
        let b = col(2, "b");
        let group_a = ResolvedColumn { table_name: "$groupby".into(), ..col(10, "a") };
        let grouping = vec![(ResolvedExpr::column_ref(a.clone()), group_a.clone())];
        let visible: HashSet<ColumnId> = [group_a.id].into_iter().collect();

        let mut expr = ResolvedExpr::column_ref(a);
        AggregateResolver::regroup(&mut expr, &grouping, &visible, "SELECT list").unwrap();
        assert_eq!(expr.as_column(), Some(&group_a));

        let mut loose = ResolvedExpr::column_ref(b);
        let err = AggregateResolver::regroup(&mut loose, &grouping, &visible, "SELECT list").unwrap_err();
        assert_eq!(err.to_string(), "SELECT list expression references column b which is neither grouped nor aggregated");

        let mut literal = ResolvedExpr::literal(Value::int64(3));
        assert!(AggregateResolver::regroup(&mut literal, &grouping, &visible, "SELECT list").is_ok());
    }
}
