use tracing::trace;

use crate::{
    analyzer::{AnalysisContext, AnalyzerError, DmlResolver, NameScope, QueryResolver},
    ast::Statement,
    resolved::ResolvedStatement,
};

pub struct StatementResolver;

impl StatementResolver {
    pub fn resolve(
        ctx: &mut AnalysisContext,
        statement: &Statement,
        root: &NameScope,
    ) -> Result<ResolvedStatement, AnalyzerError> {
        let resolved = ctx.nested(statement.span(), |ctx| Self::resolve_statement(ctx, statement, root));
        if let Ok(resolved) = &resolved {
            trace!(kind = resolved.kind_name(), "statement resolved");
        }
        resolved
    }

    fn resolve_statement(
        ctx: &mut AnalysisContext,
        statement: &Statement,
        root: &NameScope,
    ) -> Result<ResolvedStatement, AnalyzerError> {
        match statement {
            Statement::Query(query) => {
                let output = QueryResolver::resolve(ctx, query, root)?;
                Ok(ResolvedStatement::Query { output_column_list: output.columns, query: output.scan })
            }
            Statement::Insert { table, columns, source, .. } => {
                DmlResolver::resolve_insert(ctx, table, columns, source, root)
            }
            Statement::Update { table, alias, assignments, where_clause, span } => DmlResolver::resolve_update(
                ctx,
                table,
                alias.as_deref(),
                assignments,
                where_clause.as_ref(),
                root,
                *span,
            ),
            Statement::Delete { table, alias, where_clause, span } => {
                DmlResolver::resolve_delete(ctx, table, alias.as_deref(), where_clause.as_ref(), root, *span)
            }
        }
    }
}
