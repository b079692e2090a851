use crate::{
    analyzer::{AnalysisContext, AnalyzerError},
    ast::Span,
    cast::{InputArgument, cast_value},
    resolved::ResolvedExpr,
    types::{Type, Value},
};

pub struct CoercionResolver;

impl CoercionResolver {
    /// What the coercer knows about a resolved expression.
    pub fn argument_of(expr: &ResolvedExpr) -> InputArgument {
        match expr {
            ResolvedExpr::Literal { value, has_explicit_type: false } if value.is_null() && value.ty() == &Type::Int64 => {
                InputArgument::untyped_null()
            }
            ResolvedExpr::Literal { value, has_explicit_type: false } => InputArgument::literal(value.clone()),
            ResolvedExpr::Parameter { untyped: true, .. } => InputArgument::untyped_parameter(),
            ResolvedExpr::Parameter { ty, .. } => InputArgument::parameter(ty.clone()),
            other => InputArgument::expression(other.ty().clone()),
        }
    }

    /// Converts `expr` to `to`. Literals are folded, untyped parameters take
    /// the type, anything else is wrapped in a cast. The caller has already
    /// checked that the coercion is allowed.
    pub fn coerce(
        ctx: &mut AnalysisContext,
        expr: ResolvedExpr,
        to: &Type,
        span: Span,
    ) -> Result<ResolvedExpr, AnalyzerError> {
        if expr.ty() == to {
            return Ok(expr);
        }
        match expr {
            ResolvedExpr::Literal { value, has_explicit_type } if value.is_null() => {
                Ok(ResolvedExpr::Literal { value: Value::null(to.clone()), has_explicit_type })
            }
            ResolvedExpr::Literal { value, has_explicit_type } => {
                let options = ctx.options;
                let value = cast_value(&value, to, options.default_time_zone, &options.language, Some(ctx.catalog))
                    .map_err(|e| e.at(span))?;
                Ok(ResolvedExpr::Literal { value, has_explicit_type })
            }
            ResolvedExpr::Parameter { name, untyped: true, .. } => {
                ctx.bind_parameter_type(&name, to).map_err(|e| e.at(span))?;
                Ok(ResolvedExpr::Parameter { name, ty: to.clone(), untyped: false })
            }
            other => Ok(ResolvedExpr::Cast { expr: Box::new(other), ty: to.clone(), safe: false }),
        }
    }

    /// [`CoercionResolver::coerce`] after checking that an implicit coercion
    /// exists. `what` names the value in the error message.
    pub fn coerce_implicitly(
        ctx: &mut AnalysisContext,
        expr: ResolvedExpr,
        to: &Type,
        span: Span,
        what: &str,
    ) -> Result<ResolvedExpr, AnalyzerError> {
        if !ctx.coercer().coerces_to(&Self::argument_of(&expr), to, false) {
            return Err(AnalyzerError::sql(format!(
                "{what} has type {} which cannot be coerced to type {to}",
                expr.ty()
            ))
            .at(span));
        }
        Self::coerce(ctx, expr, to, span)
    }

    /// WHERE, HAVING, ON and similar predicates must be BOOL.
    pub fn condition(
        ctx: &mut AnalysisContext,
        expr: ResolvedExpr,
        clause: &str,
        span: Span,
    ) -> Result<ResolvedExpr, AnalyzerError> {
        if expr.ty() == &Type::Bool {
            return Ok(expr);
        }
        if Self::argument_of(&expr).is_untyped() {
            return Self::coerce(ctx, expr, &Type::Bool, span);
        }
        Err(AnalyzerError::sql(format!("{clause} should return type BOOL, but returns {}", expr.ty())).at(span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analyzer::AnalyzerOptions,
        cast::ArgumentKind,
        catalog::SimpleCatalog,
        resolved::{ColumnId, ParameterName, ResolvedColumn},
    };

    fn column(ty: Type) -> ResolvedExpr {
        ResolvedExpr::column_ref(ResolvedColumn { id: ColumnId(1), table_name: "t".into(), name: "a".into(), ty })
    }

    #[test]
    fn bare_null_is_untyped() {
        let null = ResolvedExpr::literal(Value::null(Type::Int64));
        assert_eq!(CoercionResolver::argument_of(&null).kind, ArgumentKind::UntypedNull);
        let typed = ResolvedExpr::Literal { value: Value::null(Type::Int64), has_explicit_type: true };
        assert_eq!(CoercionResolver::argument_of(&typed).kind, ArgumentKind::Expression);
    }

    #[test]
    fn literals_fold_and_columns_cast() {
        let catalog = SimpleCatalog::new("c");
        let options = AnalyzerOptions::new();
        let mut ctx = AnalysisContext::new(&catalog, &options);

        let folded =
            CoercionResolver::coerce(&mut ctx, ResolvedExpr::literal(Value::int64(7)), &Type::Double, Span::default())
                .unwrap();
        assert_eq!(folded, ResolvedExpr::literal(Value::double(7.0)));

        let cast = CoercionResolver::coerce(&mut ctx, column(Type::Int64), &Type::Double, Span::default()).unwrap();
        assert_eq!(cast.node_name(), "Cast");
        assert_eq!(cast.ty(), &Type::Double);
    }

    #[test]
    fn coercion_is_idempotent() {
        let catalog = SimpleCatalog::new("c");
        let options = AnalyzerOptions::new();
        let mut ctx = AnalysisContext::new(&catalog, &options);
        for expr in [ResolvedExpr::literal(Value::string("2020-01-01")), column(Type::Int32)] {
            let target = if expr.ty() == &Type::String { Type::Date } else { Type::Int64 };
            let once = CoercionResolver::coerce(&mut ctx, expr, &target, Span::default()).unwrap();
            let twice = CoercionResolver::coerce(&mut ctx, once.clone(), &target, Span::default()).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn untyped_parameters_take_the_target_type() {
        let catalog = SimpleCatalog::new("c");
        let options = AnalyzerOptions::new().undeclared_parameters();
        let mut ctx = AnalysisContext::new(&catalog, &options);
        let param = ctx.parameter(ParameterName::Named("p".into())).unwrap();
        let bound = CoercionResolver::coerce(&mut ctx, param, &Type::String, Span::default()).unwrap();
        assert!(matches!(bound, ResolvedExpr::Parameter { ty: Type::String, untyped: false, .. }));
    }

    #[test]
    fn conditions_must_be_bool() {
        let catalog = SimpleCatalog::new("c");
        let options = AnalyzerOptions::new();
        let mut ctx = AnalysisContext::new(&catalog, &options);
        let err = CoercionResolver::condition(&mut ctx, column(Type::Int64), "WHERE clause", Span::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "WHERE clause should return type BOOL, but returns INT64");
        let null = ResolvedExpr::literal(Value::null(Type::Int64));
        let cond = CoercionResolver::condition(&mut ctx, null, "WHERE clause", Span::default()).unwrap();
        assert_eq!(cond.ty(), &Type::Bool);
    }
}
