use crate::{
    analyzer::{AnalysisContext, AnalyzerError, ColumnMatch, ExprContext, NameKind, NameTarget},
    catalog::closest_name,
    resolved::ResolvedExpr,
};

pub struct ColumnResolver;

impl ColumnResolver {
    /// Resolves `a`, `t.a`, `a.field` or `t.a.field.field` against the
    /// visible scopes.
    pub fn resolve_path(
        ctx: &mut AnalysisContext,
        path: &[String],
        ectx: &ExprContext,
    ) -> Result<ResolvedExpr, AnalyzerError> {
        let Some(first) = path.first() else {
            return Err(AnalyzerError::InvalidArgument("Empty column path".into()));
        };
        let Some(found) = ectx.scope.lookup(first) else {
            let suggestion = closest_name(first, ectx.scope.visible_names());
            return Err(AnalyzerError::unknown(NameKind::Column, first.clone(), suggestion));
        };
        let depth = found.correlation_depth;

        let (column, rest) = match found.target {
            NameTarget::RangeVariable(list) => {
                let Some(name) = path.get(1) else {
                    return Err(AnalyzerError::sql(format!("Table alias {first} cannot be used as a value")));
                };
                match list.find_column(name) {
                    ColumnMatch::Found(column) => (column.clone(), &path[2..]),
                    ColumnMatch::Ambiguous => {
                        return Err(AnalyzerError::ambiguous(NameKind::Column, format!("{first}.{name}")));
                    }
                    ColumnMatch::None => {
                        let suggestion = closest_name(name, list.column_names());
                        return Err(AnalyzerError::sql(match suggestion {
                            Some(s) => format!("Name {name} not found inside {first}; Did you mean {s}?"),
                            None => format!("Name {name} not found inside {first}"),
                        }));
                    }
                }
            }
            NameTarget::Column(column) => (column.clone(), &path[1..]),
            NameTarget::Ambiguous => return Err(AnalyzerError::ambiguous(NameKind::Column, first.clone())),
            NameTarget::FunctionArgument(ty) => {
                let arg = ResolvedExpr::Argument { name: first.to_lowercase(), ty: ty.clone() };
                return path[1..].iter().try_fold(arg, |expr, field| Self::get_field(expr, field));
            }
        };

        let base = if depth > 0 {
            ctx.capture_correlated(&column, depth);
            ResolvedExpr::ColumnRef { column, correlated: true }
        } else {
            ResolvedExpr::column_ref(column)
        };
        rest.iter().try_fold(base, |expr, field| Self::get_field(expr, field))
    }

    /// `expr.field` on a STRUCT value.
    pub fn get_field(expr: ResolvedExpr, field: &str) -> Result<ResolvedExpr, AnalyzerError> {
        let Some(st) = expr.ty().as_struct() else {
            return Err(AnalyzerError::sql(format!(
                "Cannot access field {field} on a value with type {}",
                expr.ty()
            )));
        };
        let (field_index, ty) = match st.find_field(field) {
            Ok(Some((idx, f))) => (idx, f.ty.clone()),
            Ok(None) => {
                let names = st.fields.iter().filter_map(|f| f.name.as_deref());
                return Err(AnalyzerError::unknown(NameKind::Field, field, closest_name(field, names)));
            }
            Err(()) => {
                return Err(AnalyzerError::sql(format!(
                    "Field name {field} is ambiguous in type {}",
                    expr.ty()
                )));
            }
        };
        Ok(ResolvedExpr::GetStructField { expr: Box::new(expr), field_index, ty })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        analyzer::{AnalyzerOptions, NameList, NameScope},
        catalog::SimpleCatalog,
        resolved::{ColumnId, ResolvedColumn},
        types::{StructField, Type},
    };

    fn col(id: u32, name: &str, ty: Type) -> ResolvedColumn {
        ResolvedColumn { id: ColumnId(id), table_name: "t".into(), name: name.into(), ty }
    }

    fn path(dotted: &str) -> Vec<String> {
        dotted.split('.').map(str::to_string).collect()
    }

    #[test]
    fn resolves_qualified_and_struct_paths() {
        let catalog = SimpleCatalog::new("c");
        let options = AnalyzerOptions::new();
        let mut ctx = AnalysisContext::new(&catalog, &options);
        let point = Type::struct_of(vec![StructField::named("x", Type::Int64), StructField::named("y", Type::Int64)]);
        let mut list = NameList::new();
        list.add_column("a", col(1, "a", Type::Int64), false);
        list.add_column("p", col(2, "p", point), false);
        let mut vars = list.clone();
        vars.add_range_variable("t", Arc::new(list)).unwrap();
        let root = NameScope::root();
        let mut scope = NameScope::child(&root);
        scope.add_name_list(&vars).unwrap();
        let ectx = ExprContext::new(&scope, "SELECT list");

        let a = ColumnResolver::resolve_path(&mut ctx, &path("t.a"), &ectx).unwrap();
        assert_eq!(a.as_column().map(|c| c.id), Some(ColumnId(1)));

        let y = ColumnResolver::resolve_path(&mut ctx, &path("p.y"), &ectx).unwrap();
        assert!(matches!(y, ResolvedExpr::GetStructField { field_index: 1, .. }));

        let err = ColumnResolver::resolve_path(&mut ctx, &path("p.z"), &ectx).unwrap_err();
        assert!(err.to_string().starts_with("Field name z does not exist"));

        let err = ColumnResolver::resolve_path(&mut ctx, &path("aa"), &ectx).unwrap_err();
        assert_eq!(err.to_string(), "Unrecognized name: aa; Did you mean a?");
    }

    #[test]
    fn outer_columns_are_captured() {
        let catalog = SimpleCatalog::new("c");
        let options = AnalyzerOptions::new();
        let mut ctx = AnalysisContext::new(&catalog, &options);
        let root = NameScope::root();
        let mut outer = NameScope::child(&root);
        outer.bind_implicit("a", &col(1, "a", Type::Int64));
        let inner = NameScope::subquery(&outer);
        ctx.correlated.push(Default::default());

        let a = ColumnResolver::resolve_path(&mut ctx, &path("a"), &ExprContext::new(&inner, "WHERE clause")).unwrap();
        assert!(matches!(a, ResolvedExpr::ColumnRef { correlated: true, .. }));
        let captured = ctx.correlated.pop().unwrap().into_vec();
        assert_eq!(captured.len(), 1);
    }
}
