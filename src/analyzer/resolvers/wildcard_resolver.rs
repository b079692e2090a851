use crate::{
    analyzer::{AnalysisContext, AnalyzerError, ColumnResolver, ExprContext, NameList, NameTarget, is_internal_name},
    resolved::ResolvedExpr,
};

/// Expands `*` and `qualifier.*` select items into named expressions.
pub struct WildcardResolver;

impl WildcardResolver {
    pub fn expand_star(from: Option<&NameList>) -> Result<Vec<(String, ResolvedExpr)>, AnalyzerError> {
        let Some(from) = from else {
            return Err(AnalyzerError::sql("SELECT * must have a FROM clause"));
        };
        let columns: Vec<_> = from
            .columns()
            .iter()
            .filter(|c| !is_internal_name(&c.name))
            .map(|c| (c.name.clone(), ResolvedExpr::column_ref(c.column.clone())))
            .collect();
        if columns.is_empty() {
            return Err(AnalyzerError::sql("SELECT * would expand to zero columns"));
        }
        Ok(columns)
    }

    /// `t.*` over a range variable, or `s.*` over a STRUCT value.
    pub fn expand_qualified(
        ctx: &mut AnalysisContext,
        qualifier: &str,
        ectx: &ExprContext,
    ) -> Result<Vec<(String, ResolvedExpr)>, AnalyzerError> {
        if let Some(found) = ectx.scope.lookup(qualifier)
            && let NameTarget::RangeVariable(list) = found.target
        {
            let depth = found.correlation_depth;
            let mut columns = Vec::new();
            for c in list.columns().iter().filter(|c| !is_internal_name(&c.name)) {
                let expr = if depth > 0 {
                    ctx.capture_correlated(&c.column, depth);
                    ResolvedExpr::ColumnRef { column: c.column.clone(), correlated: true }
                } else {
                    ResolvedExpr::column_ref(c.column.clone())
                };
                columns.push((c.name.clone(), expr));
            }
            return Ok(columns);
        }

        let value = ColumnResolver::resolve_path(ctx, &[qualifier.to_string()], ectx)?;
        let Some(st) = value.ty().as_struct() else {
            return Err(AnalyzerError::sql(format!("Dot-star is not supported for type {}", value.ty())));
        };
        let fields: Vec<_> = st
            .fields
            .iter()
            .enumerate()
            .map(|(idx, f)| (idx, f.name.clone().unwrap_or_else(|| format!("$field{}", idx + 1)), f.ty.clone()))
            .collect();
        if fields.is_empty() {
            return Err(AnalyzerError::sql(format!("Dot-star would expand to zero columns for type {}", value.ty())));
        }
        Ok(fields
            .into_iter()
            .map(|(field_index, name, ty)| {
                (name, ResolvedExpr::GetStructField { expr: Box::new(value.clone()), field_index, ty })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        analyzer::{AnalyzerOptions, NameScope},
        catalog::SimpleCatalog,
        resolved::{ColumnId, ResolvedColumn},
        types::{StructField, Type},
    };

    fn col(id: u32, name: &str, ty: Type) -> ResolvedColumn {
        ResolvedColumn { id: ColumnId(id), table_name: "t".into(), name: name.into(), ty }
    }

    #[test]
    fn star_needs_columns() {
        assert_eq!(
            WildcardResolver::expand_star(None).unwrap_err().to_string(),
            "SELECT * must have a FROM clause"
        );
        let mut list = NameList::new();
        list.add_column("$hidden", col(1, "$hidden", Type::Int64), false);
        assert!(WildcardResolver::expand_star(Some(&list)).is_err());
        list.add_column("a", col(2, "a", Type::Int64), false);
        let expanded = WildcardResolver::expand_star(Some(&list)).unwrap();
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].0, "a");
    }

    #[test]
    fn qualified_star_expands_range_variables_and_structs() {
        let catalog = SimpleCatalog::new("c");
        let options = AnalyzerOptions::new();
        let mut ctx = AnalysisContext::new(&catalog, &options);
        let point = Type::struct_of(vec![StructField::named("x", Type::Int64), StructField::anonymous(Type::Double)]);
        let mut columns = NameList::new();
        columns.add_column("a", col(1, "a", Type::Int64), false);
        columns.add_column("p", col(2, "p", point), false);
        let mut names = columns.clone();
        names.add_range_variable("t", Arc::new(columns)).unwrap();
        let root = NameScope::root();
        let mut scope = NameScope::child(&root);
        scope.add_name_list(&names).unwrap();
        let ectx = ExprContext::new(&scope, "SELECT list");

        let all = WildcardResolver::expand_qualified(&mut ctx, "T", &ectx).unwrap();
        assert_eq!(all.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(), vec!["a", "p"]);

        let fields = WildcardResolver::expand_qualified(&mut ctx, "p", &ectx).unwrap();
        assert_eq!(fields.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(), vec!["x", "$field2"]);

        let err = WildcardResolver::expand_qualified(&mut ctx, "a", &ectx).unwrap_err();
        assert_eq!(err.to_string(), "Dot-star is not supported for type INT64");
    }
}
