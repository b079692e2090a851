use crate::{
    analyzer::{
        AnalysisContext, AnalyzerError, CoercionResolver, CorrelatedColumns, ExprContext, NameScope, QueryResolver,
    },
    ast::{Query, Span},
    cast::InputArgument,
    resolved::{ComputedColumn, ResolvedExpr, ResolvedScan, ResolvedSubqueryKind, ScanKind},
    types::Type,
};

pub struct SubqueryResolver;

impl SubqueryResolver {
    /// Resolves a subquery expression. Names of the enclosing query stay
    /// visible; the ones it uses become the subquery's parameters.
    pub fn resolve(
        ctx: &mut AnalysisContext,
        kind: ResolvedSubqueryKind,
        query: &Query,
        in_expr: Option<ResolvedExpr>,
        ectx: &ExprContext,
        span: Span,
    ) -> Result<ResolvedExpr, AnalyzerError> {
        let scope = NameScope::subquery(ectx.scope);
        ctx.correlated.push(CorrelatedColumns::new());
        let output = QueryResolver::resolve(ctx, query, &scope);
        let parameters = ctx.correlated.pop().unwrap_or_default().into_vec();
        let output = output?;
        let mut scan = output.scan;

        let single_column = |what: &str| -> Result<Type, AnalyzerError> {
            match output.columns.as_slice() {
                [only] => Ok(only.column.ty.clone()),
                _ => Err(AnalyzerError::sql(what.to_string()).at(span)),
            }
        };

        let (ty, in_expr) = match kind {
            ResolvedSubqueryKind::Exists => (Type::Bool, None),
            ResolvedSubqueryKind::Scalar => {
                (single_column("Scalar subquery cannot have more than one column")?, None)
            }
            ResolvedSubqueryKind::Array => {
                let element = single_column("ARRAY subquery cannot have more than one column")?;
                if element.element_type().is_some() {
                    return Err(AnalyzerError::sql(format!(
                        "Cannot use array subquery with column of type {element} because nested arrays are not supported"
                    ))
                    .at(span));
                }
                (Type::array(element), None)
            }
            ResolvedSubqueryKind::In => {
                let column_type = single_column("Subquery of type IN must have only one output column")?;
                let Some(lhs) = in_expr else {
                    return Err(AnalyzerError::InvalidArgument("IN subquery without a left operand".into()));
                };
                let args = [CoercionResolver::argument_of(&lhs), InputArgument::expression(column_type.clone())];
                let Some(common) = ctx.coercer().common_supertype(&args) else {
                    return Err(AnalyzerError::sql(format!(
                        "Cannot execute IN subquery with uncomparable types {} and {column_type}",
                        lhs.ty()
                    ))
                    .at(span));
                };
                if !common.supports_equality() {
                    return Err(AnalyzerError::sql(format!("IN is not defined for arguments of type {common}")).at(span));
                }
                let lhs = CoercionResolver::coerce(ctx, lhs, &common, span)?;
                if column_type != common {
                    scan = Self::cast_single_column(ctx, scan, &common);
                }
                (Type::Bool, Some(Box::new(lhs)))
            }
        };
        Ok(ResolvedExpr::Subquery { kind, ty, in_expr, parameters, scan: Box::new(scan) })
    }

    fn cast_single_column(ctx: &mut AnalysisContext, scan: ResolvedScan, to: &Type) -> ResolvedScan {
        let Some(source) = scan.column_list.first().cloned() else {
            return scan;
        };
        let column = ctx.allocate_column("$in_cast", &source.name, to.clone());
        let expr = ResolvedExpr::Cast { expr: Box::new(ResolvedExpr::column_ref(source)), ty: to.clone(), safe: false };
        ResolvedScan::new(
            vec![column.clone()],
            ScanKind::Project { input: Box::new(scan), expr_list: vec![ComputedColumn { column, expr }] },
        )
    }
}
