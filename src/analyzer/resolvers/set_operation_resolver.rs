use tracing::trace;

use crate::{
    analyzer::{AnalysisContext, AnalyzerError, CoercionResolver, NameScope, QueryOutput, QueryResolver},
    ast::{SetOperation, SetOperator, Span},
    cast::InputArgument,
    resolved::{ComputedColumn, OutputColumn, ResolvedColumn, ResolvedExpr, ResolvedScan, ScanKind, SetOperationItem},
    types::Type,
};

pub struct SetOperationResolver;

impl SetOperationResolver {
    pub fn resolve(
        ctx: &mut AnalysisContext,
        op: &SetOperation,
        outer: &NameScope,
    ) -> Result<QueryOutput, AnalyzerError> {
        let name = op.name();
        let mut inputs = Vec::with_capacity(op.inputs.len());
        for input in &op.inputs {
            inputs.push(QueryResolver::resolve_query_expr(ctx, input, outer)?);
        }
        Self::check_arity(&inputs, &name).map_err(|e| e.at(op.span))?;
        let types = Self::column_types(ctx, &inputs, &name).map_err(|e| e.at(op.span))?;
        if !(op.op == SetOperator::Union && op.all) {
            for (idx, ty) in types.iter().enumerate() {
                if !ty.supports_grouping() {
                    return Err(AnalyzerError::sql(format!(
                        "Column {} in {name} has type {ty}, which is only allowed in UNION ALL",
                        idx + 1
                    ))
                    .at(op.span));
                }
            }
        }

        let table_name = format!("${}", name.to_lowercase().replace(' ', "_"));
        let mut items = Vec::with_capacity(inputs.len());
        let mut first_names = Vec::new();
        for (idx, input) in inputs.into_iter().enumerate() {
            if idx == 0 {
                first_names = input.columns.iter().map(|c| c.name.clone()).collect();
            }
            let input = Self::coerce_output(ctx, input, &types, &format!("{table_name}{}_cast", idx + 1), op.span)?;
            let output_column_list = input.columns.into_iter().map(|c| c.column).collect();
            items.push(SetOperationItem { scan: input.scan, output_column_list });
        }
        let columns: Vec<OutputColumn> = first_names
            .into_iter()
            .zip(types)
            .map(|(name, ty)| {
                let column = ctx.allocate_column(&table_name, &name, ty);
                OutputColumn { name, column }
            })
            .collect();
        trace!(op = %name, inputs = items.len(), columns = columns.len(), "set operation resolved");
        let scan = ResolvedScan::new(
            columns.iter().map(|c| c.column.clone()).collect(),
            ScanKind::SetOperation { op: op.op, all: op.all, items },
        );
        Ok(QueryOutput { scan, columns })
    }

    pub fn check_arity(inputs: &[QueryOutput], name: &str) -> Result<(), AnalyzerError> {
        let Some(first) = inputs.first() else {
            return Err(AnalyzerError::InvalidArgument(format!("{name} without inputs")));
        };
        for (idx, input) in inputs.iter().enumerate().skip(1) {
            if input.columns.len() != first.columns.len() {
                return Err(AnalyzerError::sql(format!(
                    "Queries in {name} have mismatched column count; query 1 has {} columns, query {} has {} columns",
                    first.columns.len(),
                    idx + 1,
                    input.columns.len()
                )));
            }
        }
        Ok(())
    }

    /// The supertype of each output position across all inputs.
    pub fn column_types(ctx: &AnalysisContext, inputs: &[QueryOutput], name: &str) -> Result<Vec<Type>, AnalyzerError> {
        let width = inputs.first().map_or(0, |i| i.columns.len());
        let mut types = Vec::with_capacity(width);
        for idx in 0..width {
            let args: Vec<InputArgument> = inputs.iter().map(|input| Self::column_argument(input, idx)).collect();
            match ctx.coercer().common_supertype(&args) {
                Some(ty) => types.push(ty),
                None => {
                    let listed: Vec<String> = inputs.iter().map(|i| i.columns[idx].column.ty.to_string()).collect();
                    return Err(AnalyzerError::sql(format!(
                        "Column {} in {name} has incompatible types: {}",
                        idx + 1,
                        listed.join(", ")
                    )));
                }
            }
        }
        Ok(types)
    }

    /// Output column `idx` as a coercion argument. A column computed from a
    /// bare literal keeps literal coercion rules, so `SELECT 1 UNION ALL
    /// SELECT 2.5` unifies to DOUBLE.
    fn column_argument(input: &QueryOutput, idx: usize) -> InputArgument {
        let column = &input.columns[idx].column;
        if let ScanKind::Project { expr_list, .. } = &input.scan.kind
            && let Some(computed) = expr_list.iter().find(|c| c.column.id == column.id)
            && matches!(computed.expr, ResolvedExpr::Literal { .. })
        {
            return CoercionResolver::argument_of(&computed.expr);
        }
        InputArgument::expression(column.ty.clone())
    }

    /// Adds a projection converting the mismatched output columns of `input`
    /// to `types`.
    pub fn coerce_output(
        ctx: &mut AnalysisContext,
        input: QueryOutput,
        types: &[Type],
        table_name: &str,
        span: Span,
    ) -> Result<QueryOutput, AnalyzerError> {
        if input.columns.iter().zip(types).all(|(c, ty)| &c.column.ty == ty) {
            return Ok(input);
        }
        let mut expr_list = Vec::new();
        let mut columns = Vec::with_capacity(input.columns.len());
        for (output, ty) in input.columns.into_iter().zip(types) {
            if &output.column.ty == ty {
                columns.push(output);
                continue;
            }
            let expr = CoercionResolver::coerce(ctx, ResolvedExpr::column_ref(output.column.clone()), ty, span)?;
            let column: ResolvedColumn = ctx.allocate_column(table_name, &output.name, ty.clone());
            expr_list.push(ComputedColumn { column: column.clone(), expr });
            columns.push(OutputColumn { name: output.name, column });
        }
        let scan = ResolvedScan::new(
            columns.iter().map(|c| c.column.clone()).collect(),
            ScanKind::Project { input: Box::new(input.scan), expr_list },
        );
        Ok(QueryOutput { scan, columns })
    }
}
