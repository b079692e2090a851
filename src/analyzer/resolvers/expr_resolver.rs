use crate::{
    analyzer::{
        AnalysisContext, AnalyzerError, CoercionResolver, ColumnResolver, ErrorClass, ExprContext, FunctionResolver,
        LiteralResolver, SubqueryResolver,
    },
    ast::{Expr, ExprKind, Literal, Span, SubqueryKind, UnaryOp},
    cast::cast_value,
    resolved::{ParameterName, ResolvedExpr, ResolvedSubqueryKind},
    types::{StructField, Type, Value},
};

pub struct ExprResolver;

impl ExprResolver {
    pub fn resolve(ctx: &mut AnalysisContext, expr: &Expr, ectx: &ExprContext) -> Result<ResolvedExpr, AnalyzerError> {
        ctx.nested(expr.span, |ctx| Self::resolve_kind(ctx, expr, ectx))
    }

    fn resolve_kind(ctx: &mut AnalysisContext, expr: &Expr, ectx: &ExprContext) -> Result<ResolvedExpr, AnalyzerError> {
        let span = expr.span;
        match &expr.kind {
            ExprKind::Literal(literal) => LiteralResolver::resolve(ctx, literal, span),
            ExprKind::Path(path) => ColumnResolver::resolve_path(ctx, path, ectx),
            ExprKind::NamedParameter(name) => ctx.parameter(ParameterName::Named(name.clone())),
            ExprKind::PositionalParameter(position) => ctx.parameter(ParameterName::Positional(*position)),
            ExprKind::SystemVariable(path) => ctx.system_variable(path),
            ExprKind::Unary { op: UnaryOp::Minus, operand } => Self::negate(ctx, operand, ectx, span),
            ExprKind::Unary { op: UnaryOp::Plus, operand } => {
                let operand = Self::resolve(ctx, operand, ectx)?;
                if !operand.ty().kind().is_numeric() {
                    return Err(AnalyzerError::sql(format!(
                        "No matching signature for operator unary + for argument types: {}",
                        operand.ty()
                    )));
                }
                Ok(operand)
            }
            ExprKind::Binary { op, left, right } => {
                let args = vec![Self::resolve(ctx, left, ectx)?, Self::resolve(ctx, right, ectx)?];
                FunctionResolver::resolve_operator(ctx, op.function_name(), args, span)
            }
            ExprKind::And(items) => {
                let args = Self::resolve_all(ctx, items, ectx)?;
                FunctionResolver::resolve_operator(ctx, "$and", args, span)
            }
            ExprKind::Or(items) => {
                let args = Self::resolve_all(ctx, items, ectx)?;
                FunctionResolver::resolve_operator(ctx, "$or", args, span)
            }
            ExprKind::Not(operand) => {
                let operand = Self::resolve(ctx, operand, ectx)?;
                FunctionResolver::resolve_operator(ctx, "$not", vec![operand], span)
            }
            ExprKind::IsNull { operand, negated } => {
                let operand = Self::resolve(ctx, operand, ectx)?;
                let test = FunctionResolver::resolve_operator(ctx, "$is_null", vec![operand], span)?;
                Self::maybe_negate(ctx, test, *negated, span)
            }
            ExprKind::InList { operand, list, negated } => {
                let mut args = vec![Self::resolve(ctx, operand, ectx)?];
                args.extend(Self::resolve_all(ctx, list, ectx)?);
                let test = FunctionResolver::resolve_operator(ctx, "$in", args, span)?;
                Self::maybe_negate(ctx, test, *negated, span)
            }
            ExprKind::InSubquery { operand, query, negated } => {
                let lhs = Self::resolve(ctx, operand, ectx)?;
                let test = SubqueryResolver::resolve(ctx, ResolvedSubqueryKind::In, query, Some(lhs), ectx, span)?;
                Self::maybe_negate(ctx, test, *negated, span)
            }
            ExprKind::Like { operand, pattern, negated } => {
                let args = vec![Self::resolve(ctx, operand, ectx)?, Self::resolve(ctx, pattern, ectx)?];
                let test = FunctionResolver::resolve_operator(ctx, "$like", args, span)?;
                Self::maybe_negate(ctx, test, *negated, span)
            }
            ExprKind::Between { operand, low, high, negated } => {
                let args = vec![
                    Self::resolve(ctx, operand, ectx)?,
                    Self::resolve(ctx, low, ectx)?,
                    Self::resolve(ctx, high, ectx)?,
                ];
                let test = FunctionResolver::resolve_operator(ctx, "$between", args, span)?;
                Self::maybe_negate(ctx, test, *negated, span)
            }
            ExprKind::FunctionCall(call) => FunctionResolver::resolve_call(ctx, call, ectx, span),
            ExprKind::Cast { operand, type_name, safe } => {
                let operand = Self::resolve(ctx, operand, ectx)?;
                let ty = ctx.resolve_type(type_name, span)?;
                Self::cast(ctx, operand, &ty, *safe, span)
            }
            ExprKind::Subquery { kind, query } => {
                let kind = match kind {
                    SubqueryKind::Scalar => ResolvedSubqueryKind::Scalar,
                    SubqueryKind::Exists => ResolvedSubqueryKind::Exists,
                    SubqueryKind::Array => ResolvedSubqueryKind::Array,
                };
                SubqueryResolver::resolve(ctx, kind, query, None, ectx, span)
            }
            ExprKind::Struct(fields) => Self::make_struct(ctx, fields, ectx),
            ExprKind::Array { element_type, elements } => {
                Self::make_array(ctx, element_type.as_deref(), elements, ectx, span)
            }
            ExprKind::FieldAccess { operand, field } => {
                let operand = Self::resolve(ctx, operand, ectx)?;
                ColumnResolver::get_field(operand, field)
            }
        }
    }

    fn resolve_all(
        ctx: &mut AnalysisContext,
        exprs: &[Expr],
        ectx: &ExprContext,
    ) -> Result<Vec<ResolvedExpr>, AnalyzerError> {
        exprs.iter().map(|e| Self::resolve(ctx, e, ectx)).collect()
    }

    fn maybe_negate(
        ctx: &mut AnalysisContext,
        expr: ResolvedExpr,
        negated: bool,
        span: Span,
    ) -> Result<ResolvedExpr, AnalyzerError> {
        if negated { FunctionResolver::resolve_operator(ctx, "$not", vec![expr], span) } else { Ok(expr) }
    }

    /// Numeric literals fold their sign so `-9223372036854775808` stays in
    /// range.
    fn negate(
        ctx: &mut AnalysisContext,
        operand: &Expr,
        ectx: &ExprContext,
        span: Span,
    ) -> Result<ResolvedExpr, AnalyzerError> {
        match &operand.kind {
            ExprKind::Literal(Literal::Int(v)) => {
                let negated = v
                    .checked_neg()
                    .ok_or_else(|| AnalyzerError::eval(format!("int64 out of range: -{v}")))?;
                Ok(ResolvedExpr::literal(Value::int64(negated)))
            }
            ExprKind::Literal(Literal::Float(v)) => Ok(ResolvedExpr::literal(Value::double(-v))),
            _ => {
                let operand = Self::resolve(ctx, operand, ectx)?;
                FunctionResolver::resolve_operator(ctx, "$unary_minus", vec![operand], span)
            }
        }
    }

    /// CAST / SAFE_CAST. Literal operands are converted right away; a
    /// SAFE_CAST whose value does not convert yields NULL.
    pub fn cast(
        ctx: &mut AnalysisContext,
        operand: ResolvedExpr,
        ty: &Type,
        safe: bool,
        span: Span,
    ) -> Result<ResolvedExpr, AnalyzerError> {
        if operand.ty() == ty {
            return Ok(match operand {
                ResolvedExpr::Literal { value, .. } => ResolvedExpr::Literal { value, has_explicit_type: true },
                other => other,
            });
        }
        if !ctx.coercer().coerces_to(&CoercionResolver::argument_of(&operand), ty, true) {
            return Err(AnalyzerError::unsupported_cast(operand.ty(), ty).at(span));
        }
        match operand {
            ResolvedExpr::Literal { value, has_explicit_type: false } if value.is_null() => {
                Ok(ResolvedExpr::Literal { value: Value::null(ty.clone()), has_explicit_type: true })
            }
            ResolvedExpr::Literal { value, .. } => {
                let options = ctx.options;
                match cast_value(&value, ty, options.default_time_zone, &options.language, Some(ctx.catalog)) {
                    Ok(value) => Ok(ResolvedExpr::Literal { value, has_explicit_type: true }),
                    Err(e) if safe && e.class() == ErrorClass::Dynamic => {
                        Ok(ResolvedExpr::Literal { value: Value::null(ty.clone()), has_explicit_type: true })
                    }
                    Err(e) => Err(e.at(span)),
                }
            }
            ResolvedExpr::Parameter { name, untyped: true, .. } => {
                ctx.bind_parameter_type(&name, ty)?;
                Ok(ResolvedExpr::Parameter { name, ty: ty.clone(), untyped: false })
            }
            other => Ok(ResolvedExpr::Cast { expr: Box::new(other), ty: ty.clone(), safe }),
        }
    }

    fn make_struct(
        ctx: &mut AnalysisContext,
        fields: &[(Expr, Option<String>)],
        ectx: &ExprContext,
    ) -> Result<ResolvedExpr, AnalyzerError> {
        let mut values = Vec::with_capacity(fields.len());
        let mut types = Vec::with_capacity(fields.len());
        for (expr, alias) in fields {
            let value = Self::resolve(ctx, expr, ectx)?;
            let name = alias.clone().or_else(|| inferred_name(expr));
            types.push(match name {
                Some(name) => StructField::named(name, value.ty().clone()),
                None => StructField::anonymous(value.ty().clone()),
            });
            values.push(value);
        }
        Ok(ResolvedExpr::MakeStruct { fields: values, ty: Type::struct_of(types) })
    }

    fn make_array(
        ctx: &mut AnalysisContext,
        element_type: Option<&str>,
        elements: &[Expr],
        ectx: &ExprContext,
        span: Span,
    ) -> Result<ResolvedExpr, AnalyzerError> {
        let elements = Self::resolve_all(ctx, elements, ectx)?;
        let element = match element_type {
            Some(name) => ctx.resolve_type(name, span)?,
            None => {
                let args: Vec<_> = elements.iter().map(CoercionResolver::argument_of).collect();
                ctx.coercer().common_supertype(&args).ok_or_else(|| {
                    let types: Vec<String> = elements.iter().map(|e| e.ty().debug_string()).collect();
                    AnalyzerError::sql(format!(
                        "Array elements of types {{{}}} do not have a common supertype",
                        types.join(", ")
                    ))
                })?
            }
        };
        if element.element_type().is_some() {
            return Err(AnalyzerError::sql(format!(
                "Cannot construct array with element type {element} because nested arrays are not supported"
            )));
        }
        let elements = elements
            .into_iter()
            .map(|e| CoercionResolver::coerce_implicitly(ctx, e, &element, span, "Array element"))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ResolvedExpr::MakeArray { elements, ty: Type::array(element) })
    }
}

/// Column name implied by an unaliased expression: the last path
/// component or the accessed field.
pub fn inferred_name(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Path(path) => path.last().cloned(),
        ExprKind::FieldAccess { field, .. } => Some(field.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analyzer::{AnalyzerOptions, NameScope},
        ast::BinaryOp,
        catalog::SimpleCatalog,
    };

    fn resolve(expr: &Expr) -> Result<ResolvedExpr, AnalyzerError> {
        let catalog = SimpleCatalog::new("c");
        let options = AnalyzerOptions::new();
        let mut ctx = AnalysisContext::new(&catalog, &options);
        let root = NameScope::root();
        ExprResolver::resolve(&mut ctx, expr, &ExprContext::new(&root, "Expression"))
    }

    #[test]
    fn casts_fold_literals() {
        let folded = resolve(&Expr::cast(Expr::string("12"), "INT32")).unwrap();
        assert_eq!(folded, ResolvedExpr::Literal { value: Value::int32(12), has_explicit_type: true });

        let err = resolve(&Expr::cast(Expr::string("x"), "INT64").at(Span::new(0, 17))).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Dynamic);
        assert_eq!(err.location(), Some(Span::new(0, 17)));

        let safe = resolve(&Expr::safe_cast(Expr::string("x"), "INT64")).unwrap();
        assert_eq!(safe, ResolvedExpr::Literal { value: Value::null(Type::Int64), has_explicit_type: true });

        let err = resolve(&Expr::cast(Expr::bool(true), "DATE")).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported cast from BOOL to DATE");
    }

    #[test]
    fn negative_literals_fold() {
        let min = resolve(&Expr::new(ExprKind::Unary { op: UnaryOp::Minus, operand: Box::new(Expr::int(5)) })).unwrap();
        assert_eq!(min, ResolvedExpr::literal(Value::int64(-5)));
    }

    #[test]
    fn operators_become_function_calls() {
        let sum = resolve(&Expr::binary(BinaryOp::Add, Expr::int(1), Expr::float(2.5))).unwrap();
        assert_eq!(sum.ty(), &Type::Double);
        match sum {
            ResolvedExpr::FunctionCall { function, args, .. } => {
                assert_eq!(function.name, "$add");
                assert_eq!(args[0], ResolvedExpr::literal(Value::double(1.0)));
            }
            other => panic!("unexpected {other:?}"),
        }
        let err = resolve(&Expr::binary(BinaryOp::Add, Expr::bool(true), Expr::int(1))).unwrap_err();
        assert!(err.to_string().starts_with("No matching signature for operator + for argument types: BOOL, INT64"));
    }

    #[test]
    fn arrays_unify_their_elements() {
        let array = resolve(&Expr::new(ExprKind::Array {
            element_type: None,
            elements: vec![Expr::int(1), Expr::float(2.0), Expr::null()],
        }))
        .unwrap();
        assert_eq!(array.ty(), &Type::array(Type::Double));

        let nested = Expr::new(ExprKind::Array {
            element_type: None,
            elements: vec![Expr::new(ExprKind::Array { element_type: None, elements: vec![Expr::int(1)] })],
        });
        assert!(resolve(&nested).is_err());
    }

    #[test]
    fn structs_take_field_names_from_aliases() {
        let st = resolve(&Expr::new(ExprKind::Struct(vec![(Expr::int(1), Some("x".into())), (Expr::string("s"), None)])))
            .unwrap();
        assert_eq!(st.ty().debug_string(), "STRUCT<x INT64, STRING>");
        let x = resolve(&Expr::new(ExprKind::FieldAccess {
            operand: Box::new(Expr::new(ExprKind::Struct(vec![(Expr::int(1), Some("x".into()))]))),
            field: "x".into(),
        }))
        .unwrap();
        assert_eq!(x.ty(), &Type::Int64);
    }
}
