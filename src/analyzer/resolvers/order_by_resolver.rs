use crate::{
    analyzer::{
        AnalysisContext, AnalyzerError, ExprContext, ExprResolver, NameKind, NameList, NameScope, QueryOutput,
    },
    ast::OrderByItem,
    resolved::{ComputedColumn, ResolvedExpr, ResolvedOrderByItem, ResolvedScan, ScanKind},
};

/// What one ORDER BY item sorts on.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderTarget {
    /// A select-list column, by ordinal or alias.
    Output(usize),
    Expr(ResolvedExpr),
}

pub struct OrderByResolver;

impl OrderByResolver {
    /// Resolves an item against the output names first (`ORDER BY 2`,
    /// `ORDER BY alias`), then as an expression in `ectx`.
    pub fn resolve_target(
        ctx: &mut AnalysisContext,
        item: &OrderByItem,
        output_names: &[&str],
        ectx: &ExprContext,
    ) -> Result<OrderTarget, AnalyzerError> {
        if let Some(ordinal) = item.expr.as_int_literal() {
            return match usize::try_from(ordinal) {
                Ok(n) if (1..=output_names.len()).contains(&n) => Ok(OrderTarget::Output(n - 1)),
                _ => Err(AnalyzerError::sql(format!("ORDER BY is out of SELECT column number range: {ordinal}"))
                    .at(item.expr.span)),
            };
        }
        if let Some(name) = item.expr.as_identifier() {
            let mut matches = output_names.iter().enumerate().filter(|(_, n)| n.eq_ignore_ascii_case(name));
            if let Some((idx, _)) = matches.next() {
                if matches.next().is_some() {
                    return Err(AnalyzerError::ambiguous(NameKind::Column, name).at(item.expr.span));
                }
                return Ok(OrderTarget::Output(idx));
            }
        }
        let expr = ExprResolver::resolve(ctx, &item.expr, ectx)?;
        Self::check_orderable(&expr).map_err(|e| e.at(item.expr.span))?;
        Ok(OrderTarget::Expr(expr))
    }

    pub fn check_orderable(expr: &ResolvedExpr) -> Result<(), AnalyzerError> {
        if expr.ty().supports_ordering() {
            Ok(())
        } else {
            Err(AnalyzerError::sql(format!("ORDER BY does not support expressions of type {}", expr.ty())))
        }
    }

    /// ORDER BY over a finished query (set operation or parenthesized
    /// query), which can only see the output columns.
    pub fn resolve_on_output(
        ctx: &mut AnalysisContext,
        output: QueryOutput,
        order_by: &[OrderByItem],
        outer: &NameScope,
    ) -> Result<QueryOutput, AnalyzerError> {
        let names = NameList::from_output(&output.columns);
        let mut scope = NameScope::child(outer);
        scope.add_name_list(&names)?;
        let ectx = ExprContext::new(&scope, "ORDER BY clause");
        let output_names: Vec<&str> = output.columns.iter().map(|c| c.name.as_str()).collect();

        let mut extra: Vec<ComputedColumn> = Vec::new();
        let mut items = Vec::with_capacity(order_by.len());
        for item in order_by {
            let expr = match Self::resolve_target(ctx, item, &output_names, &ectx)? {
                OrderTarget::Output(idx) => ResolvedExpr::column_ref(output.columns[idx].column.clone()),
                OrderTarget::Expr(expr) => match expr.as_column() {
                    Some(column) => ResolvedExpr::column_ref(column.clone()),
                    None => {
                        let name = format!("$orderbycol{}", extra.len() + 1);
                        let column = ctx.allocate_column("$orderby", &name, expr.ty().clone());
                        extra.push(ComputedColumn { column: column.clone(), expr });
                        ResolvedExpr::column_ref(column)
                    }
                },
            };
            Self::check_orderable(&expr).map_err(|e| e.at(item.expr.span))?;
            items.push(ResolvedOrderByItem { expr, descending: item.descending, nulls_first: item.nulls_first });
        }

        let column_list = output.scan.column_list.clone();
        let input = if extra.is_empty() {
            output.scan
        } else {
            let mut columns = column_list.clone();
            columns.extend(extra.iter().map(|c| c.column.clone()));
            ResolvedScan::new(columns, ScanKind::Project { input: Box::new(output.scan), expr_list: extra })
        };
        let scan = ResolvedScan::new(column_list, ScanKind::OrderBy { input: Box::new(input), items });
        Ok(QueryOutput { scan, columns: output.columns })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analyzer::AnalyzerOptions,
        ast::Expr,
        catalog::SimpleCatalog,
        resolved::{ColumnId, OutputColumn, ResolvedColumn},
        types::{StructField, Type},
    };

    fn output() -> QueryOutput {
        let a = ResolvedColumn { id: ColumnId(1), table_name: "$query".into(), name: "a".into(), ty: Type::Int64 };
        let s = ResolvedColumn {
            id: ColumnId(2),
            table_name: "$query".into(),
            name: "s".into(),
            ty: Type::struct_of(vec![StructField::named("x", Type::Int64)]),
        };
        QueryOutput {
            scan: ResolvedScan::new(vec![a.clone(), s.clone()], ScanKind::SingleRow),
            columns: vec![OutputColumn { name: "a".into(), column: a }, OutputColumn { name: "s".into(), column: s }],
        }
    }

    #[test]
    fn ordinals_and_names_pick_output_columns() {
        let catalog = SimpleCatalog::new("c");
        let options = AnalyzerOptions::new();
        let mut ctx = AnalysisContext::new(&catalog, &options);
        let root = NameScope::root();
        let ectx = ExprContext::new(&root, "ORDER BY clause");
        let names = ["a", "s"];

        let target = OrderByResolver::resolve_target(&mut ctx, &OrderByItem::asc(Expr::int(2)), &names, &ectx).unwrap();
        assert_eq!(target, OrderTarget::Output(1));
        let target = OrderByResolver::resolve_target(&mut ctx, &OrderByItem::asc(Expr::path("A")), &names, &ectx);
        assert_eq!(target.unwrap(), OrderTarget::Output(0));
        let err = OrderByResolver::resolve_target(&mut ctx, &OrderByItem::asc(Expr::int(3)), &names, &ectx).unwrap_err();
        assert_eq!(err.to_string(), "ORDER BY is out of SELECT column number range: 3");
    }

    #[test]
    fn computed_keys_are_projected_below_the_sort() {
        let catalog = SimpleCatalog::new("c");
        let options = AnalyzerOptions::new();
        let mut ctx = AnalysisContext::new(&catalog, &options);
        let root = NameScope::root();
        let items = vec![OrderByItem::desc(Expr::binary(crate::ast::BinaryOp::Add, Expr::path("a"), Expr::int(1)))];
        let sorted = OrderByResolver::resolve_on_output(&mut ctx, output(), &items, &root).unwrap();
        assert_eq!(sorted.scan.column_list.len(), 2);
        match &sorted.scan.kind {
            ScanKind::OrderBy { input, items } => {
                assert_eq!(input.column_list.len(), 3);
                assert!(items[0].descending);
            }
            other => panic!("unexpected {other:?}"),
        }

        let err = OrderByResolver::resolve_on_output(&mut ctx, output(), &[OrderByItem::asc(Expr::path("s"))], &root)
            .unwrap_err();
        assert_eq!(err.to_string(), "ORDER BY does not support expressions of type STRUCT<x INT64>");
    }
}
