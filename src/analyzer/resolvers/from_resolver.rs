use std::sync::Arc;

use tracing::trace;

use crate::{
    analyzer::{
        AnalysisContext, AnalyzerError, CoercionResolver, ExprContext, ExprResolver, NameKind, NameList, NameScope,
        QueryResolver, WithLookup,
    },
    ast::{Expr, JoinKind, Sample, SampleUnit, Span, TableExpr, TvfArg},
    catalog::{Column, TvfArgumentKind, TvfOutput},
    resolved::{ResolvedColumn, ResolvedExpr, ResolvedScan, ResolvedTvfArg, ScanKind},
    types::{Type, ValueData},
};

const SAMPLE_METHODS: [&str; 3] = ["bernoulli", "system", "reservoir"];

pub struct FromResolver;

impl FromResolver {
    /// Resolves one FROM item into its scan and the names it exposes.
    /// `outer` holds the names of enclosing queries only; FROM items never
    /// see their siblings.
    pub fn resolve(
        ctx: &mut AnalysisContext,
        item: &TableExpr,
        outer: &NameScope,
    ) -> Result<(ResolvedScan, NameList), AnalyzerError> {
        ctx.nested(item.span(), |ctx| Self::resolve_item(ctx, item, outer))
    }

    fn resolve_item(
        ctx: &mut AnalysisContext,
        item: &TableExpr,
        outer: &NameScope,
    ) -> Result<(ResolvedScan, NameList), AnalyzerError> {
        match item {
            TableExpr::Table { path, alias, sample, .. } => {
                let (mut scan, columns) = Self::resolve_table(ctx, path)?;
                if let ScanKind::Table { alias: scan_alias, .. } = &mut scan.kind {
                    scan_alias.clone_from(alias);
                }
                if let Some(sample) = sample {
                    scan = Self::resolve_sample(ctx, scan, sample, outer)?;
                }
                let alias = alias.clone().or_else(|| path.last().cloned()).unwrap_or_default();
                Ok((scan, Self::range_variable(&alias, columns)?))
            }
            TableExpr::Subquery { query, alias, .. } => {
                let output = QueryResolver::resolve(ctx, query, outer)?;
                let columns = NameList::from_output(&output.columns);
                let names = match alias {
                    Some(alias) => Self::range_variable(alias, columns)?,
                    None => columns,
                };
                Ok((output.scan, names))
            }
            TableExpr::Tvf { name, args, alias, span } => Self::resolve_tvf(ctx, name, args, alias.as_deref(), *span, outer),
            TableExpr::Join { kind, left, right, on, .. } => Self::resolve_join(ctx, *kind, left, right, on.as_ref(), outer),
        }
    }

    /// A table path: visible WITH entries first, then the catalog.
    fn resolve_table(ctx: &mut AnalysisContext, path: &[String]) -> Result<(ResolvedScan, NameList), AnalyzerError> {
        let key = path.join(".");
        let entry = match ctx.with_aliases.lookup(&key) {
            Some(WithLookup::Poisoned) => {
                return Err(AnalyzerError::sql(format!(
                    "Recursive reference to {key} is not allowed in the non-recursive term"
                )));
            }
            Some(WithLookup::Entry(info)) => Some(info.clone()),
            None => None,
        };
        if let Some(info) = entry {
            let table_name = path.last().cloned().unwrap_or_default();
            let mut names = NameList::new();
            let mut column_list = Vec::with_capacity(info.columns.len());
            for (name, ty) in &info.columns {
                let column = ctx.allocate_column(&table_name, name, ty.clone());
                names.add_column(name, column.clone(), false);
                column_list.push(column);
            }
            let kind = if info.recursive {
                ScanKind::RecursiveRef { alias: info.unique_alias }
            } else {
                ScanKind::WithRef { alias: info.unique_alias }
            };
            trace!(alias = %key, recursive = info.recursive, "table path bound to WITH entry");
            return Ok((ResolvedScan::new(column_list, kind), names));
        }
        Self::catalog_table(ctx, path, None)
    }

    /// A catalog table, bypassing WITH aliases. DML targets resolve this way.
    pub fn catalog_table(
        ctx: &mut AnalysisContext,
        path: &[String],
        alias: Option<&str>,
    ) -> Result<(ResolvedScan, NameList), AnalyzerError> {
        let key = path.join(".");
        let Some(table) = ctx.catalog.find_table(path) else {
            return Err(AnalyzerError::unknown(NameKind::Table, key, ctx.catalog.suggest_table(path)));
        };
        let mut names = NameList::new();
        let mut column_list = Vec::with_capacity(table.num_columns());
        for column in &table.columns {
            let resolved = ctx.allocate_column(&table.name, &column.name, column.ty.clone());
            names.add_column(&column.name, resolved.clone(), false);
            column_list.push(resolved);
        }
        let column_index_list = (0..table.num_columns()).collect();
        let alias = alias.map(str::to_string);
        let scan = ResolvedScan::new(column_list, ScanKind::Table { table, alias, column_index_list });
        Ok((scan, names))
    }

    /// Exposes `columns` unqualified and as `alias.column`.
    pub fn range_variable(alias: &str, columns: NameList) -> Result<NameList, AnalyzerError> {
        let mut names = columns.clone();
        names.add_range_variable(alias, Arc::new(columns))?;
        Ok(names)
    }

    fn resolve_sample(
        ctx: &mut AnalysisContext,
        input: ResolvedScan,
        sample: &Sample,
        outer: &NameScope,
    ) -> Result<ResolvedScan, AnalyzerError> {
        let method = sample.method.to_lowercase();
        if !SAMPLE_METHODS.contains(&method.as_str()) {
            return Err(AnalyzerError::sql(format!("Unsupported sampling method: {}", sample.method)));
        }
        if method == "reservoir" && sample.unit != SampleUnit::Rows {
            return Err(AnalyzerError::sql("RESERVOIR sampling only supports the ROWS sample size unit"));
        }
        let size = ExprResolver::resolve(ctx, &sample.size, &ExprContext::new(outer, "TABLESAMPLE"))?;
        if !matches!(size, ResolvedExpr::Literal { .. } | ResolvedExpr::Parameter { .. }) {
            return Err(AnalyzerError::sql("TABLESAMPLE size must be a literal or a query parameter").at(sample.size.span));
        }
        let target = match sample.unit {
            SampleUnit::Rows => Type::Int64,
            SampleUnit::Percent => Type::Double,
        };
        let size = CoercionResolver::coerce_implicitly(ctx, size, &target, sample.size.span, "TABLESAMPLE size")?;
        if let ResolvedExpr::Literal { value, .. } = &size {
            let negative = match value.data() {
                Some(ValueData::Int64(v)) => *v < 0,
                Some(ValueData::Double(v)) => v.0 < 0.0,
                _ => false,
            };
            if negative {
                return Err(AnalyzerError::sql("TABLESAMPLE size must be non-negative").at(sample.size.span));
            }
        }
        Ok(ResolvedScan::new(
            input.column_list.clone(),
            ScanKind::Sample { input: Box::new(input), method, size, unit: sample.unit },
        ))
    }

    fn resolve_join(
        ctx: &mut AnalysisContext,
        kind: JoinKind,
        left: &TableExpr,
        right: &TableExpr,
        on: Option<&Expr>,
        outer: &NameScope,
    ) -> Result<(ResolvedScan, NameList), AnalyzerError> {
        let (left_scan, mut names) = Self::resolve(ctx, left, outer)?;
        let (right_scan, right_names) = Self::resolve(ctx, right, outer)?;
        names.merge(right_names)?;

        let condition = match (kind, on) {
            (JoinKind::Comma | JoinKind::Cross, Some(on)) => {
                return Err(AnalyzerError::sql(format!("{} cannot have an ON clause", join_name(kind))).at(on.span));
            }
            (JoinKind::Comma | JoinKind::Cross, None) => None,
            (_, None) => {
                return Err(AnalyzerError::sql(format!(
                    "{} must have an immediately following ON clause",
                    join_name(kind)
                )));
            }
            (_, Some(on)) => {
                let mut scope = NameScope::child(outer);
                scope.add_name_list(&names)?;
                let expr = ExprResolver::resolve(ctx, on, &ExprContext::new(&scope, "ON clause"))?;
                Some(CoercionResolver::condition(ctx, expr, "ON clause", on.span)?)
            }
        };
        let column_list = left_scan.column_list.iter().chain(right_scan.column_list.iter()).cloned().collect();
        let scan = ResolvedScan::new(
            column_list,
            ScanKind::Join { kind, left: Box::new(left_scan), right: Box::new(right_scan), condition },
        );
        Ok((scan, names))
    }

    fn resolve_tvf(
        ctx: &mut AnalysisContext,
        name: &str,
        args: &[TvfArg],
        alias: Option<&str>,
        span: Span,
        outer: &NameScope,
    ) -> Result<(ResolvedScan, NameList), AnalyzerError> {
        let Some(function) = ctx.catalog.find_table_valued_function(name) else {
            return Err(AnalyzerError::unknown(NameKind::TableValuedFunction, name, None));
        };

        // relation arguments keep their name lists for ForwardInput outputs
        let mut resolved = Vec::with_capacity(args.len());
        let mut relation_names: Vec<Option<NameList>> = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                TvfArg::Expr(expr) => {
                    let expr = ExprResolver::resolve(ctx, expr, &ExprContext::new(outer, "Table-valued function argument"))?;
                    resolved.push(ResolvedTvfArg::Scalar(expr));
                    relation_names.push(None);
                }
                TvfArg::Table(path) => {
                    let (scan, names) = Self::resolve_table(ctx, path)?;
                    resolved.push(ResolvedTvfArg::Relation(scan));
                    relation_names.push(Some(names));
                }
                TvfArg::Query(query) => {
                    let output = QueryResolver::resolve(ctx, query, outer)?;
                    resolved.push(ResolvedTvfArg::Relation(output.scan));
                    relation_names.push(Some(NameList::from_output(&output.columns)));
                }
            }
        }

        let matches_shape = resolved.len() == function.arguments.len()
            && resolved.iter().zip(&function.arguments).all(|(arg, kind)| {
                matches!(
                    (arg, kind),
                    (ResolvedTvfArg::Relation(_), TvfArgumentKind::Relation)
                        | (ResolvedTvfArg::Scalar(_), TvfArgumentKind::Scalar(_))
                )
            });
        if !matches_shape {
            return Err(tvf_mismatch(&function.signature_string(), &function.name, &resolved));
        }
        let mut args = Vec::with_capacity(resolved.len());
        for (arg, kind) in resolved.into_iter().zip(&function.arguments) {
            args.push(match (arg, kind) {
                (ResolvedTvfArg::Scalar(expr), TvfArgumentKind::Scalar(ty)) => {
                    if !ctx.coercer().coerces_to(&CoercionResolver::argument_of(&expr), ty, false) {
                        let err = tvf_mismatch(
                            &function.signature_string(),
                            &function.name,
                            &[ResolvedTvfArg::Scalar(expr)],
                        );
                        return Err(err);
                    }
                    ResolvedTvfArg::Scalar(CoercionResolver::coerce(ctx, expr, ty, span)?)
                }
                (arg, _) => arg,
            });
        }

        let output: Vec<(String, Type)> = match &function.output {
            TvfOutput::Fixed(columns) => columns.iter().map(|Column { name, ty, .. }| (name.clone(), ty.clone())).collect(),
            TvfOutput::ForwardInput(idx) => match relation_names.get(*idx).and_then(Option::as_ref) {
                Some(names) => names.columns().iter().map(|c| (c.name.clone(), c.column.ty.clone())).collect(),
                None => {
                    return Err(AnalyzerError::InvalidArgument(format!(
                        "Table-valued function {} forwards argument {idx}, which is not a relation",
                        function.name
                    )));
                }
            },
        };
        let table_name = alias.unwrap_or(function.name.as_str()).to_string();
        let mut names = NameList::new();
        let column_list: Vec<ResolvedColumn> = output
            .into_iter()
            .map(|(name, ty)| {
                let column = ctx.allocate_column(&table_name, &name, ty);
                names.add_column(&name, column.clone(), false);
                column
            })
            .collect();
        let scan = ResolvedScan::new(
            column_list,
            ScanKind::Tvf { function, args, alias: alias.map(str::to_string) },
        );
        let names = match alias {
            Some(alias) => Self::range_variable(alias, names)?,
            None => names,
        };
        Ok((scan, names))
    }
}

fn join_name(kind: JoinKind) -> &'static str {
    match kind {
        JoinKind::Comma => "Comma join",
        JoinKind::Cross => "CROSS JOIN",
        JoinKind::Inner => "INNER JOIN",
        JoinKind::Left => "LEFT JOIN",
        JoinKind::Right => "RIGHT JOIN",
        JoinKind::Full => "FULL JOIN",
    }
}

fn tvf_mismatch(signature: &str, name: &str, args: &[ResolvedTvfArg]) -> AnalyzerError {
    let types: Vec<String> = args
        .iter()
        .map(|a| match a {
            ResolvedTvfArg::Relation(_) => "TABLE".to_string(),
            ResolvedTvfArg::Scalar(e) => e.ty().debug_string(),
        })
        .collect();
    AnalyzerError::sql(format!(
        "No matching signature for table-valued function {} for argument types: {}. Supported signature: {signature}",
        name.to_uppercase(),
        types.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analyzer::{AnalyzerOptions, NameTarget},
        catalog::{SimpleCatalog, Table, TableValuedFunction},
    };

    fn catalog() -> SimpleCatalog {
        let mut catalog = SimpleCatalog::new("test");
        catalog
            .add_table(Table::new("t", vec![Column::new("a", Type::Int64), Column::new("b", Type::String)]))
            .add_table(Table::new("u", vec![Column::new("a", Type::Int64), Column::new("c", Type::Bool)]))
            .add_table_valued_function(TableValuedFunction::new(
                "top_rows",
                vec![TvfArgumentKind::Relation, TvfArgumentKind::Scalar(Type::Int64)],
                TvfOutput::ForwardInput(0),
            ));
        catalog
    }

    #[test]
    fn tables_expose_columns_and_range_variable() {
        let catalog = catalog();
        let options = AnalyzerOptions::new();
        let mut ctx = AnalysisContext::new(&catalog, &options);
        let root = NameScope::root();
        let (scan, names) = FromResolver::resolve(&mut ctx, &TableExpr::aliased("t", "x"), &root).unwrap();
        assert_eq!(scan.column_list.len(), 2);
        assert!(names.range_variable("X").is_some());

        let err = FromResolver::resolve(&mut ctx, &TableExpr::table("tt"), &root).unwrap_err();
        assert_eq!(err.to_string(), "Table not found: tt; Did you mean t?");
    }

    #[test]
    fn joins_need_on_unless_cross() {
        let catalog = catalog();
        let options = AnalyzerOptions::new();
        let mut ctx = AnalysisContext::new(&catalog, &options);
        let root = NameScope::root();

        let inner = TableExpr::join(JoinKind::Inner, TableExpr::table("t"), TableExpr::table("u"), None);
        let err = FromResolver::resolve(&mut ctx, &inner, &root).unwrap_err();
        assert_eq!(err.to_string(), "INNER JOIN must have an immediately following ON clause");

        let on = Expr::eq(Expr::path("t.a"), Expr::path("u.a"));
        let inner = TableExpr::join(JoinKind::Inner, TableExpr::table("t"), TableExpr::table("u"), Some(on));
        let (scan, names) = FromResolver::resolve(&mut ctx, &inner, &root).unwrap();
        assert_eq!(scan.column_list.len(), 4);

        // `a` is exposed by both sides
        let mut scope = NameScope::child(&root);
        scope.add_name_list(&names).unwrap();
        assert_eq!(scope.lookup("a").map(|l| l.target.clone()), Some(NameTarget::Ambiguous));

        let self_join = TableExpr::join(JoinKind::Cross, TableExpr::table("t"), TableExpr::table("t"), None);
        let err = FromResolver::resolve(&mut ctx, &self_join, &root).unwrap_err();
        assert_eq!(err.to_string(), "Duplicate table alias t in the same FROM clause");
    }

    #[test]
    fn tvf_forwards_its_input_columns() {
        let catalog = catalog();
        let options = AnalyzerOptions::new();
        let mut ctx = AnalysisContext::new(&catalog, &options);
        let root = NameScope::root();
        let tvf = TableExpr::Tvf {
            name: "top_rows".into(),
            args: vec![TvfArg::Table(vec!["t".into()]), TvfArg::Expr(Expr::int(3))],
            alias: None,
            span: Span::default(),
        };
        let (scan, names) = FromResolver::resolve(&mut ctx, &tvf, &root).unwrap();
        assert_eq!(names.column_names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(scan.column_list[0].table_name, "top_rows");

        let bad = TableExpr::Tvf {
            name: "top_rows".into(),
            args: vec![TvfArg::Expr(Expr::string("x"))],
            alias: None,
            span: Span::default(),
        };
        let err = FromResolver::resolve(&mut ctx, &bad, &root).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No matching signature for table-valued function TOP_ROWS for argument types: STRING. \
             Supported signature: TOP_ROWS(TABLE, INT64)"
        );
    }

    #[test]
    fn sample_size_must_be_constant() {
        let catalog = catalog();
        let options = AnalyzerOptions::new();
        let mut ctx = AnalysisContext::new(&catalog, &options);
        let root = NameScope::root();
        let sampled = |size: Expr, unit| TableExpr::Table {
            path: vec!["t".into()],
            alias: None,
            sample: Some(Sample { method: "BERNOULLI".into(), size, unit }),
            span: Span::default(),
        };
        let (scan, _) = FromResolver::resolve(&mut ctx, &sampled(Expr::int(10), SampleUnit::Percent), &root).unwrap();
        assert!(matches!(scan.kind, ScanKind::Sample { .. }));

        let err = FromResolver::resolve(&mut ctx, &sampled(Expr::int(-1), SampleUnit::Rows), &root).unwrap_err();
        assert_eq!(err.to_string(), "TABLESAMPLE size must be non-negative");
    }
}
