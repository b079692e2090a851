use crate::{
    analyzer::{
        AnalysisContext, AnalyzerError, CoercionResolver, ExprContext, ExprResolver, NameScope, OrderByResolver,
        SelectResolver, SetOperationResolver, WithResolver,
    },
    ast::{Expr, ExprKind, Query, QueryExpr},
    resolved::{OutputColumn, ResolvedExpr, ResolvedScan, ScanKind},
    types::Type,
};

/// A resolved query: its scan plus the names its output columns are
/// visible under.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutput {
    pub scan: ResolvedScan,
    pub columns: Vec<OutputColumn>,
}

pub struct QueryResolver;

impl QueryResolver {
    pub fn resolve(ctx: &mut AnalysisContext, query: &Query, outer: &NameScope) -> Result<QueryOutput, AnalyzerError> {
        ctx.nested(query.span, |ctx| Self::resolve_query(ctx, query, outer))
    }

    fn resolve_query(ctx: &mut AnalysisContext, query: &Query, outer: &NameScope) -> Result<QueryOutput, AnalyzerError> {
        let Some(with) = &query.with else {
            return Self::resolve_body(ctx, query, outer);
        };
        let (entries, tokens) = WithResolver::resolve(ctx, with, outer)?;
        let body = Self::resolve_body(ctx, query, outer);
        // entries go out of scope in reverse, whether or not the body resolved
        let popped = WithResolver::pop(ctx, tokens);
        let body = body?;
        popped?;
        let scan = ResolvedScan::new(
            body.scan.column_list.clone(),
            ScanKind::With { entries, query: Box::new(body.scan), recursive: with.recursive },
        );
        Ok(QueryOutput { scan, columns: body.columns })
    }

    fn resolve_body(ctx: &mut AnalysisContext, query: &Query, outer: &NameScope) -> Result<QueryOutput, AnalyzerError> {
        let mut output = match &query.body {
            QueryExpr::Select(select) => SelectResolver::resolve(ctx, select, &query.order_by, outer)?,
            body => {
                let output = Self::resolve_query_expr(ctx, body, outer)?;
                if query.order_by.is_empty() {
                    output
                } else {
                    OrderByResolver::resolve_on_output(ctx, output, &query.order_by, outer)?
                }
            }
        };
        if let Some(limit) = &query.limit {
            let limit = Self::resolve_limit(ctx, limit, "LIMIT", outer)?;
            let offset = match &query.offset {
                Some(offset) => Some(Self::resolve_limit(ctx, offset, "OFFSET", outer)?),
                None => None,
            };
            output.scan = ResolvedScan::new(
                output.scan.column_list.clone(),
                ScanKind::LimitOffset { input: Box::new(output.scan), limit, offset },
            );
        }
        Ok(output)
    }

    /// A query expression with no ORDER BY or LIMIT of its own.
    pub fn resolve_query_expr(
        ctx: &mut AnalysisContext,
        body: &QueryExpr,
        outer: &NameScope,
    ) -> Result<QueryOutput, AnalyzerError> {
        match body {
            QueryExpr::Select(select) => SelectResolver::resolve(ctx, select, &[], outer),
            QueryExpr::SetOperation(op) => SetOperationResolver::resolve(ctx, op, outer),
            QueryExpr::Nested(query) => Self::resolve(ctx, query, outer),
        }
    }

    /// LIMIT and OFFSET take a constant: an integer literal or a parameter.
    fn resolve_limit(
        ctx: &mut AnalysisContext,
        expr: &Expr,
        clause: &'static str,
        outer: &NameScope,
    ) -> Result<ResolvedExpr, AnalyzerError> {
        let constant = match &expr.kind {
            ExprKind::Literal(_) | ExprKind::NamedParameter(_) | ExprKind::PositionalParameter(_) => true,
            ExprKind::Cast { operand, .. } => {
                matches!(operand.kind, ExprKind::Literal(_) | ExprKind::NamedParameter(_) | ExprKind::PositionalParameter(_))
            }
            _ => false,
        };
        if !constant {
            return Err(AnalyzerError::sql(format!("{clause} expects an integer literal or parameter")).at(expr.span));
        }
        let resolved = ExprResolver::resolve(ctx, expr, &ExprContext::new(outer, clause))?;
        let resolved = CoercionResolver::coerce_implicitly(ctx, resolved, &Type::Int64, expr.span, clause)?;
        if let ResolvedExpr::Literal { value, .. } = &resolved {
            if value.is_null() {
                return Err(AnalyzerError::sql(format!("{clause} must not be null")).at(expr.span));
            }
            if value.as_i64().is_some_and(|v| v < 0) {
                return Err(AnalyzerError::sql(format!(
                    "{clause} expects a non-negative integer literal or parameter"
                ))
                .at(expr.span));
            }
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analyzer::AnalyzerOptions,
        ast::{Select, SelectItem, SetOperator, TableExpr},
        catalog::{Column, SimpleCatalog, Table},
    };

    fn catalog() -> SimpleCatalog {
        let mut catalog = SimpleCatalog::new("test");
        catalog.add_table(Table::new("t", vec![Column::new("a", Type::Int64), Column::new("b", Type::String)]));
        catalog
    }

    fn select_a() -> Query {
        Select::new(vec![SelectItem::expr(Expr::path("a"))]).from(TableExpr::table("t")).into_query()
    }

    fn resolve(query: &Query) -> Result<QueryOutput, AnalyzerError> {
        let catalog = catalog();
        let options = AnalyzerOptions::new();
        let mut ctx = AnalysisContext::new(&catalog, &options);
        let root = NameScope::root();
        QueryResolver::resolve(&mut ctx, query, &root)
    }

    #[test]
    fn limit_takes_non_negative_constants() {
        let output = resolve(&select_a().limit(Expr::int(10), Some(Expr::int(2)))).unwrap();
        match &output.scan.kind {
            ScanKind::LimitOffset { offset, .. } => assert!(offset.is_some()),
            other => panic!("unexpected {other:?}"),
        }

        let err = resolve(&select_a().limit(Expr::path("a"), None)).unwrap_err();
        assert_eq!(err.to_string(), "LIMIT expects an integer literal or parameter");
        let err = resolve(&select_a().limit(Expr::int(-1), None)).unwrap_err();
        assert_eq!(err.to_string(), "LIMIT expects a non-negative integer literal or parameter");
        let err = resolve(&select_a().limit(Expr::null(), None)).unwrap_err();
        assert_eq!(err.to_string(), "LIMIT must not be null");
        let err = resolve(&select_a().limit(Expr::int(1), Some(Expr::bool(true)))).unwrap_err();
        assert_eq!(err.to_string(), "OFFSET has type BOOL which cannot be coerced to type INT64");
    }

    #[test]
    fn with_entries_are_visible_in_the_body_only() {
        let body = Select::new(vec![SelectItem::expr(Expr::path("a"))]).from(TableExpr::table("q")).into_query();
        let query = body.clone().with(false, vec![("q", select_a())]);
        let output = resolve(&query).unwrap();
        match &output.scan.kind {
            ScanKind::With { entries, recursive, .. } => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].alias, "q");
                assert!(!recursive);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(resolve(&body).is_err());
    }

    #[test]
    fn order_by_over_a_union_sees_its_output() {
        let union = Query::set_operation(SetOperator::Union, true, vec![select_a(), select_a()])
            .order_by(vec![crate::ast::OrderByItem::desc(Expr::path("a"))]);
        let output = resolve(&union).unwrap();
        assert!(matches!(output.scan.kind, ScanKind::OrderBy { .. }));
        assert_eq!(output.columns[0].name, "a");
    }
}
