use std::collections::HashSet;

use tracing::debug;

use crate::{
    analyzer::{
        AnalysisContext, AnalyzerError, CoercionResolver, ExprContext, ExprResolver, FromResolver,
        NameList, NameScope, QueryResolver, SetOperationResolver,
    },
    ast::{Assignment, Expr, InsertSource, Query, Span},
    cast::InputArgument,
    catalog::Table,
    resolved::{ColumnAccess, ResolvedColumn, ResolvedScan, ResolvedStatement, ScanKind, UpdateItem},
};

/// The DML target: its scan, the names it exposes and the catalog table.
struct Target {
    scan: ResolvedScan,
    names: NameList,
    table: std::sync::Arc<Table>,
}

impl Target {
    fn resolve(ctx: &mut AnalysisContext, path: &[String], alias: Option<&str>) -> Result<Self, AnalyzerError> {
        let (scan, columns) = FromResolver::catalog_table(ctx, path, alias)?;
        let ScanKind::Table { table, .. } = &scan.kind else {
            return Err(AnalyzerError::InvalidArgument("DML target did not resolve to a table".into()));
        };
        let table = table.clone();
        let range_variable = alias.map(str::to_string).or_else(|| path.last().cloned()).unwrap_or_default();
        let names = FromResolver::range_variable(&range_variable, columns)?;
        Ok(Self { scan, names, table })
    }

    /// The scan column and ordinal for a catalog column name.
    fn column(&self, name: &str) -> Result<(usize, ResolvedColumn), AnalyzerError> {
        match self.table.find_column(name) {
            Some((idx, _)) => Ok((idx, self.scan.column_list[idx].clone())),
            None => Err(AnalyzerError::sql(format!("Column {name} is not present in table {}", self.table.name))),
        }
    }
}

pub struct DmlResolver;

impl DmlResolver {
    pub fn resolve_insert(
        ctx: &mut AnalysisContext,
        path: &[String],
        columns: &[String],
        source: &InsertSource,
        outer: &NameScope,
    ) -> Result<ResolvedStatement, AnalyzerError> {
        let target = Target::resolve(ctx, path, None)?;
        let mut insert_column_list = Vec::new();
        if columns.is_empty() {
            for (idx, column) in target.table.columns.iter().enumerate() {
                if column.writable {
                    insert_column_list.push(target.scan.column_list[idx].clone());
                }
            }
        } else {
            let mut seen = HashSet::new();
            for name in columns {
                if !seen.insert(name.to_lowercase()) {
                    return Err(AnalyzerError::sql(format!("INSERT has columns with duplicate name: {name}")));
                }
                let (idx, column) = target.column(name)?;
                if !target.table.columns[idx].writable {
                    return Err(AnalyzerError::sql(format!("Cannot INSERT value on non-writable column: {name}")));
                }
                insert_column_list.push(column);
            }
        }
        for column in &insert_column_list {
            ctx.access.record(column, ColumnAccess::WRITE);
        }

        let (rows, query, query_output_column_list) = match source {
            InsertSource::Values(rows) => (Self::resolve_rows(ctx, rows, &insert_column_list, outer)?, None, Vec::new()),
            InsertSource::Query(query) => {
                let (scan, columns) = Self::resolve_insert_query(ctx, query, &insert_column_list, outer)?;
                (Vec::new(), Some(scan), columns)
            }
        };
        debug!(table = %target.table.name, columns = insert_column_list.len(), rows = rows.len(), "insert resolved");
        Ok(ResolvedStatement::Insert {
            table_scan: target.scan,
            insert_column_list,
            rows,
            query,
            query_output_column_list,
            column_access_list: Vec::new(),
        })
    }

    fn resolve_rows(
        ctx: &mut AnalysisContext,
        rows: &[Vec<Expr>],
        columns: &[ResolvedColumn],
        outer: &NameScope,
    ) -> Result<Vec<Vec<crate::resolved::ResolvedExpr>>, AnalyzerError> {
        let ectx = ExprContext::new(outer, "INSERT VALUES");
        let mut resolved = Vec::with_capacity(rows.len());
        for row in rows {
            if row.len() != columns.len() {
                let span = row.first().map(|e| e.span).unwrap_or_default();
                return Err(AnalyzerError::sql(format!(
                    "Inserted row has wrong column count; Has {}, expected {}",
                    row.len(),
                    columns.len()
                ))
                .at(span));
            }
            let mut values = Vec::with_capacity(row.len());
            for (expr, column) in row.iter().zip(columns) {
                let value = ExprResolver::resolve(ctx, expr, &ectx)?;
                let what = format!("Value for column {}", column.name);
                values.push(CoercionResolver::coerce_implicitly(ctx, value, &column.ty, expr.span, &what)?);
            }
            resolved.push(values);
        }
        Ok(resolved)
    }

    fn resolve_insert_query(
        ctx: &mut AnalysisContext,
        query: &Query,
        columns: &[ResolvedColumn],
        outer: &NameScope,
    ) -> Result<(ResolvedScan, Vec<ResolvedColumn>), AnalyzerError> {
        let output = QueryResolver::resolve(ctx, query, outer)?;
        if output.columns.len() != columns.len() {
            return Err(AnalyzerError::sql(format!(
                "Inserted row has wrong column count; Has {}, expected {}",
                output.columns.len(),
                columns.len()
            ))
            .at(query.span));
        }
        for (idx, (produced, target)) in output.columns.iter().zip(columns).enumerate() {
            let arg = InputArgument::expression(produced.column.ty.clone());
            if !ctx.coercer().coerces_to(&arg, &target.ty, false) {
                return Err(AnalyzerError::sql(format!(
                    "Query column {} has type {} which cannot be inserted into column {}, which has type {}",
                    idx + 1,
                    produced.column.ty,
                    target.name,
                    target.ty
                ))
                .at(query.span));
            }
        }
        let types: Vec<_> = columns.iter().map(|c| c.ty.clone()).collect();
        let output = SetOperationResolver::coerce_output(ctx, output, &types, "$insert_cast", query.span)?;
        let columns = output.columns.into_iter().map(|c| c.column).collect();
        Ok((output.scan, columns))
    }

    pub fn resolve_update(
        ctx: &mut AnalysisContext,
        path: &[String],
        alias: Option<&str>,
        assignments: &[Assignment],
        where_clause: Option<&Expr>,
        outer: &NameScope,
        span: Span,
    ) -> Result<ResolvedStatement, AnalyzerError> {
        let Some(where_clause) = where_clause else {
            return Err(AnalyzerError::sql("UPDATE must have a WHERE clause").at(span));
        };
        let target = Target::resolve(ctx, path, alias)?;
        let mut scope = NameScope::child(outer);
        scope.add_name_list(&target.names)?;
        let where_expr = Self::resolve_where(ctx, where_clause, &scope)?;

        let range_variable = alias.or_else(|| path.last().map(String::as_str)).unwrap_or_default();
        let ectx = ExprContext::new(&scope, "UPDATE clause");
        let mut seen = HashSet::new();
        let mut update_items = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let name = match assignment.target.as_slice() {
                [name] => name,
                [qualifier, name] if qualifier.eq_ignore_ascii_case(range_variable) => name,
                _ => {
                    return Err(AnalyzerError::unimplemented(format!(
                        "Updating nested fields is not supported: {}",
                        assignment.target.join(".")
                    ))
                    .at(assignment.value.span));
                }
            };
            let (idx, column) = target.column(name).map_err(|e| e.at(assignment.value.span))?;
            if !target.table.columns[idx].writable {
                return Err(AnalyzerError::sql(format!("Cannot UPDATE value on non-writable column: {name}"))
                    .at(assignment.value.span));
            }
            if !seen.insert(column.id) {
                return Err(AnalyzerError::sql(format!("Update item {name} assigned more than once"))
                    .at(assignment.value.span));
            }
            let value = ExprResolver::resolve(ctx, &assignment.value, &ectx)?;
            let what = format!("Value assigned to {name}");
            let value = CoercionResolver::coerce_implicitly(ctx, value, &column.ty, assignment.value.span, &what)?;
            ctx.access.record(&column, ColumnAccess::WRITE);
            update_items.push(UpdateItem { target: column, value });
        }
        debug!(table = %target.table.name, items = update_items.len(), "update resolved");
        Ok(ResolvedStatement::Update { table_scan: target.scan, where_expr, update_items, column_access_list: Vec::new() })
    }

    pub fn resolve_delete(
        ctx: &mut AnalysisContext,
        path: &[String],
        alias: Option<&str>,
        where_clause: Option<&Expr>,
        outer: &NameScope,
        span: Span,
    ) -> Result<ResolvedStatement, AnalyzerError> {
        let Some(where_clause) = where_clause else {
            return Err(AnalyzerError::sql("DELETE must have a WHERE clause").at(span));
        };
        let target = Target::resolve(ctx, path, alias)?;
        let mut scope = NameScope::child(outer);
        scope.add_name_list(&target.names)?;
        let where_expr = Self::resolve_where(ctx, where_clause, &scope)?;
        Ok(ResolvedStatement::Delete { table_scan: target.scan, where_expr, column_access_list: Vec::new() })
    }

    fn resolve_where(
        ctx: &mut AnalysisContext,
        predicate: &Expr,
        scope: &NameScope,
    ) -> Result<crate::resolved::ResolvedExpr, AnalyzerError> {
        let expr = ExprResolver::resolve(ctx, predicate, &ExprContext::new(scope, "WHERE clause"))?;
        CoercionResolver::condition(ctx, expr, "WHERE clause", predicate.span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analyzer::AnalyzerOptions,
        ast::BinaryOp,
        catalog::{Column, SimpleCatalog},
        types::Type,
    };

    fn catalog() -> SimpleCatalog {
        let mut catalog = SimpleCatalog::new("test");
        catalog.add_table(Table::new(
            "t",
            vec![Column::new("a", Type::Int64), Column::new("b", Type::Double), Column::read_only("id", Type::Int64)],
        ));
        catalog
    }

    fn path() -> Vec<String> {
        vec!["t".to_string()]
    }

    #[test]
    fn insert_defaults_to_writable_columns_and_coerces_values() {
        let catalog = catalog();
        let options = AnalyzerOptions::new();
        let mut ctx = AnalysisContext::new(&catalog, &options);
        let root = NameScope::root();
        let source = InsertSource::Values(vec![vec![Expr::int(1), Expr::int(2)]]);
        let ResolvedStatement::Insert { insert_column_list, rows, .. } =
            DmlResolver::resolve_insert(&mut ctx, &path(), &[], &source, &root).unwrap()
        else {
            panic!("expected an insert");
        };
        assert_eq!(insert_column_list.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(rows[0][1].ty(), &Type::Double);
        assert_eq!(ctx.access.access(insert_column_list[0].id), ColumnAccess::WRITE);

        let short = InsertSource::Values(vec![vec![Expr::int(1)]]);
        let err = DmlResolver::resolve_insert(&mut ctx, &path(), &[], &short, &root).unwrap_err();
        assert_eq!(err.to_string(), "Inserted row has wrong column count; Has 1, expected 2");

        let err = DmlResolver::resolve_insert(&mut ctx, &path(), &["id".to_string()], &short, &root).unwrap_err();
        assert_eq!(err.to_string(), "Cannot INSERT value on non-writable column: id");
    }

    #[test]
    fn update_checks_targets_and_requires_where() {
        let catalog = catalog();
        let options = AnalyzerOptions::new();
        let mut ctx = AnalysisContext::new(&catalog, &options);
        let root = NameScope::root();
        let assign = |target: &str, value: Expr| Assignment {
            target: target.split('.').map(str::to_string).collect(),
            value,
        };
        let increment = Expr::binary(BinaryOp::Add, Expr::path("a"), Expr::int(1));
        let filter = Expr::bool(true);

        let statement = DmlResolver::resolve_update(
            &mut ctx,
            &path(),
            None,
            &[assign("t.a", increment.clone())],
            Some(&filter),
            &root,
            Span::default(),
        )
        .unwrap();
        let ResolvedStatement::Update { update_items, .. } = statement else { panic!("expected an update") };
        assert_eq!(update_items[0].target.name, "a");
        assert_eq!(update_items[0].value.node_name(), "FunctionCall");

        let err = DmlResolver::resolve_update(
            &mut ctx,
            &path(),
            None,
            &[assign("a", Expr::int(1)), assign("A", Expr::int(2))],
            Some(&filter),
            &root,
            Span::default(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Update item A assigned more than once");

        let err =
            DmlResolver::resolve_update(&mut ctx, &path(), None, &[assign("a", increment)], None, &root, Span::default())
                .unwrap_err();
        assert_eq!(err.to_string(), "UPDATE must have a WHERE clause");
    }

    #[test]
    fn delete_sees_the_alias() {
        let catalog = catalog();
        let options = AnalyzerOptions::new();
        let mut ctx = AnalysisContext::new(&catalog, &options);
        let root = NameScope::root();
        let filter = Expr::eq(Expr::path("x.a"), Expr::int(3));
        let statement =
            DmlResolver::resolve_delete(&mut ctx, &path(), Some("x"), Some(&filter), &root, Span::default()).unwrap();
        let ResolvedStatement::Delete { table_scan, where_expr, .. } = statement else { panic!("expected a delete") };
        assert!(matches!(table_scan.kind, ScanKind::Table { alias: Some(ref a), .. } if a == "x"));
        assert_eq!(where_expr.ty(), &Type::Bool);

        let unknown = Expr::eq(Expr::path("t.a"), Expr::int(3));
        assert!(DmlResolver::resolve_delete(&mut ctx, &path(), Some("x"), Some(&unknown), &root, Span::default()).is_err());
    }
}
