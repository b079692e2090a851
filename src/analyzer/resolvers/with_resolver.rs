use std::collections::HashSet;

use tracing::debug;

use crate::{
    analyzer::{
        AnalysisContext, AnalyzerError, NameScope, QueryOutput, QueryResolver,
        RecursiveTermValidator, SetOperationResolver, WithEntryInfo, WithToken,
    },
    ast::{QueryExpr, SetOperation, SetOperator, WithClause, WithEntry},
    cast::InputArgument,
    resolved::{OutputColumn, ResolvedScan, ResolvedWithEntry, ScanKind, SetOperationItem},
    types::LanguageFeature,
};

/// Aliases pushed by one WITH clause, innermost last.
pub type WithTokens = Vec<(String, WithToken)>;

pub struct WithResolver;

impl WithResolver {
    /// Resolves the entries in order, each visible to the ones after it.
    /// On success the aliases stay pushed and the caller must hand the
    /// tokens back to [`WithResolver::pop`] once the body is resolved.
    pub fn resolve(
        ctx: &mut AnalysisContext,
        with: &WithClause,
        outer: &NameScope,
    ) -> Result<(Vec<ResolvedWithEntry>, WithTokens), AnalyzerError> {
        if with.recursive && !ctx.language().supports(LanguageFeature::WithRecursive) {
            return Err(AnalyzerError::sql("RECURSIVE is not supported in the WITH clause"));
        }
        let mut tokens = WithTokens::new();
        let mut entries = Vec::with_capacity(with.entries.len());
        let mut seen = HashSet::new();
        for entry in &with.entries {
            let resolved = if seen.insert(entry.alias.to_lowercase()) {
                Self::resolve_entry(ctx, entry, with.recursive, outer)
            } else {
                Err(AnalyzerError::sql(format!("Duplicate alias {} for WITH subquery", entry.alias)))
            };
            match resolved {
                Ok((resolved, token)) => {
                    tokens.push((entry.alias.clone(), token));
                    entries.push(resolved);
                }
                Err(err) => {
                    Self::pop(ctx, tokens)?;
                    return Err(err.at(entry.span));
                }
            }
        }
        Ok((entries, tokens))
    }

    pub fn pop(ctx: &mut AnalysisContext, tokens: WithTokens) -> Result<(), AnalyzerError> {
        for (alias, token) in tokens.into_iter().rev() {
            ctx.with_aliases.pop(&alias, token)?;
        }
        Ok(())
    }

    fn resolve_entry(
        ctx: &mut AnalysisContext,
        entry: &WithEntry,
        recursive_clause: bool,
        outer: &NameScope,
    ) -> Result<(ResolvedWithEntry, WithToken), AnalyzerError> {
        let unique_alias = ctx.with_aliases.unique_alias(&entry.alias);
        let output = if recursive_clause && entry.query.references_table(&entry.alias) {
            Self::resolve_recursive(ctx, entry, &unique_alias, outer)?
        } else {
            QueryResolver::resolve(ctx, &entry.query, outer)?
        };
        debug!(alias = %entry.alias, unique_alias, columns = output.columns.len(), "with entry resolved");
        let info = WithEntryInfo {
            unique_alias: unique_alias.clone(),
            columns: output.columns.iter().map(|c| (c.name.clone(), c.column.ty.clone())).collect(),
            recursive: false,
        };
        let token = ctx.with_aliases.push_entry(&entry.alias, info);
        Ok((ResolvedWithEntry { alias: unique_alias, scan: output.scan }, token))
    }

    /// `base UNION [ALL|DISTINCT] recursive_term`: the base is resolved with
    /// the alias blocked, the recursive term with the alias bound to the
    /// base's columns.
    fn resolve_recursive(
        ctx: &mut AnalysisContext,
        entry: &WithEntry,
        unique_alias: &str,
        outer: &NameScope,
    ) -> Result<QueryOutput, AnalyzerError> {
        let alias = entry.alias.as_str();
        let query = &entry.query;
        let union = match &query.body {
            QueryExpr::SetOperation(op)
                if op.op == SetOperator::Union
                    && op.inputs.len() >= 2
                    && query.with.is_none()
                    && query.order_by.is_empty()
                    && query.limit.is_none() =>
            {
                op
            }
            _ => {
                return Err(AnalyzerError::sql(format!(
                    "Recursive WITH entry {alias} must be a UNION of a non-recursive term and a recursive term"
                )));
            }
        };
        let name = union.name();
        let (base_inputs, recursive_input) = union.inputs.split_at(union.inputs.len() - 1);

        let poisoned = ctx.with_aliases.push_poisoned(alias);
        let base = if let [only] = base_inputs {
            QueryResolver::resolve_query_expr(ctx, only, outer)
        } else {
            let base = SetOperation { op: union.op, all: union.all, inputs: base_inputs.to_vec(), span: union.span };
            SetOperationResolver::resolve(ctx, &base, outer)
        };
        ctx.with_aliases.pop(alias, poisoned)?;
        let base = base?;

        let info = WithEntryInfo {
            unique_alias: unique_alias.to_string(),
            columns: base.columns.iter().map(|c| (c.name.clone(), c.column.ty.clone())).collect(),
            recursive: true,
        };
        let token = ctx.with_aliases.push_entry(alias, info);
        let recursive = QueryResolver::resolve_query_expr(ctx, &recursive_input[0], outer);
        ctx.with_aliases.pop(alias, token)?;
        let recursive = recursive?;

        let inputs = [base, recursive];
        SetOperationResolver::check_arity(&inputs, &name)?;
        let [base, recursive] = inputs;
        let types: Vec<_> = base.columns.iter().map(|c| c.column.ty.clone()).collect();
        for (idx, (column, ty)) in recursive.columns.iter().zip(&types).enumerate() {
            let arg = InputArgument::expression(column.column.ty.clone());
            if !ctx.coercer().coerces_to(&arg, ty, false) {
                return Err(AnalyzerError::sql(format!(
                    "Column {} in the recursive term of {alias} has type {}, which cannot be coerced to type {ty}",
                    idx + 1,
                    column.column.ty
                )));
            }
            if !union.all && !ty.supports_grouping() {
                return Err(AnalyzerError::sql(format!(
                    "Column {} in {name} has type {ty}, which is only allowed in UNION ALL",
                    idx + 1
                )));
            }
        }
        let recursive =
            SetOperationResolver::coerce_output(ctx, recursive, &types, &format!("{unique_alias}_cast"), union.span)?;
        RecursiveTermValidator::new(unique_alias, alias).validate(&recursive.scan)?;

        let columns: Vec<OutputColumn> = base
            .columns
            .iter()
            .map(|c| OutputColumn {
                name: c.name.clone(),
                column: ctx.allocate_column(unique_alias, &c.name, c.column.ty.clone()),
            })
            .collect();
        let item = |output: QueryOutput| SetOperationItem {
            scan: output.scan,
            output_column_list: output.columns.into_iter().map(|c| c.column).collect(),
        };
        let scan = ResolvedScan::new(
            columns.iter().map(|c| c.column.clone()).collect(),
            ScanKind::Recursive {
                all: union.all,
                non_recursive: Box::new(item(base)),
                recursive: Box::new(item(recursive)),
            },
        );
        Ok(QueryOutput { scan, columns })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analyzer::{AnalyzerOptions, WithLookup},
        ast::{BinaryOp, Expr, Query, Select, SelectItem, TableExpr},
        catalog::SimpleCatalog,
        types::LanguageOptions,
    };

    fn recursive_options() -> AnalyzerOptions {
        AnalyzerOptions::with_language(LanguageOptions::new().enable(LanguageFeature::WithRecursive))
    }

    fn counter(step: Query) -> WithClause {
        let base = Select::new(vec![SelectItem::aliased(Expr::int(1), "n")]).into_query();
        let union = Query::set_operation(SetOperator::Union, true, vec![base, step]);
        WithClause { recursive: true, entries: vec![WithEntry { alias: "r".into(), query: union, span: Default::default() }] }
    }

    fn step_from(from: TableExpr) -> Query {
        Select::new(vec![SelectItem::expr(Expr::binary(BinaryOp::Add, Expr::path("r.n"), Expr::int(1)))])
            .from(from)
            .filter(Expr::binary(BinaryOp::Less, Expr::path("r.n"), Expr::int(10)))
            .into_query()
    }

    #[test]
    fn recursive_entry_builds_a_fixpoint_scan() {
        let catalog = SimpleCatalog::new("c");
        let options = recursive_options();
        let mut ctx = AnalysisContext::new(&catalog, &options);
        let root = NameScope::root();
        let (entries, tokens) = WithResolver::resolve(&mut ctx, &counter(step_from(TableExpr::table("r"))), &root).unwrap();
        assert!(matches!(ctx.with_aliases.lookup("r"), Some(WithLookup::Entry(info)) if !info.recursive));
        WithResolver::pop(&mut ctx, tokens).unwrap();
        assert!(ctx.with_aliases.is_empty());
        match &entries[0].scan.kind {
            ScanKind::Recursive { all, recursive, .. } => {
                assert!(*all);
                assert_eq!(recursive.output_column_list[0].ty, crate::types::Type::Int64);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn recursive_needs_the_language_feature() {
        let catalog = SimpleCatalog::new("c");
        let options = AnalyzerOptions::new();
        let mut ctx = AnalysisContext::new(&catalog, &options);
        let root = NameScope::root();
        let err = WithResolver::resolve(&mut ctx, &counter(step_from(TableExpr::table("r"))), &root).unwrap_err();
        assert_eq!(err.to_string(), "RECURSIVE is not supported in the WITH clause");
    }

    #[test]
    fn failed_entries_leave_no_aliases_behind() {
        let catalog = SimpleCatalog::new("c");
        let options = recursive_options();
        let mut ctx = AnalysisContext::new(&catalog, &options);
        let root = NameScope::root();
        let self_join = TableExpr::join(
            crate::ast::JoinKind::Cross,
            TableExpr::table("r"),
            TableExpr::aliased("r", "r2"),
            None,
        );
        let err = WithResolver::resolve(&mut ctx, &counter(step_from(self_join)), &root).unwrap_err();
        assert_eq!(err.to_string(), "Multiple recursive references to r are not allowed");
        assert!(ctx.with_aliases.is_empty());

        let one = || Select::new(vec![SelectItem::expr(Expr::int(1))]).into_query();
        let duplicated = WithClause {
            recursive: false,
            entries: vec![
                WithEntry { alias: "q".into(), query: one(), span: Default::default() },
                WithEntry { alias: "Q".into(), query: one(), span: Default::default() },
            ],
        };
        let err = WithResolver::resolve(&mut ctx, &duplicated, &root).unwrap_err();
        assert_eq!(err.to_string(), "Duplicate alias Q for WITH subquery");
        assert!(ctx.with_aliases.is_empty());
    }
}
