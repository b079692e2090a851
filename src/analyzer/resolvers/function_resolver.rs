use std::sync::Arc;

use crate::{
    analyzer::{AggregateResolver, AnalysisContext, AnalyzerError, CoercionResolver, ExprContext, ExprResolver, NameKind},
    ast::{FunctionCall, Span},
    cast::{ArgumentKind, InputArgument},
    catalog::{ArgumentConstraint, Function, FunctionMode, FunctionSignature, SignatureArgument, SignatureResult},
    resolved::ResolvedExpr,
    types::{Type, TypeKind},
};

/// A signature chosen for a call, with the type every argument is coerced
/// to.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureMatch {
    pub argument_types: Vec<Type>,
    pub result: Type,
    /// Type bound to the templated `ANY` arguments, if any.
    pub bound: Option<Type>,
    cost: u32,
}

pub struct FunctionResolver;

impl FunctionResolver {
    pub fn lookup(ctx: &AnalysisContext, name: &str) -> Result<Arc<Function>, AnalyzerError> {
        ctx.catalog
            .find_function(name)
            .ok_or_else(|| AnalyzerError::unknown(NameKind::Function, name, ctx.catalog.suggest_function(name)))
    }

    /// Resolves a function call expression of any mode.
    pub fn resolve_call(
        ctx: &mut AnalysisContext,
        call: &FunctionCall,
        ectx: &ExprContext,
        span: Span,
    ) -> Result<ResolvedExpr, AnalyzerError> {
        let function = if call.star {
            if !call.name.eq_ignore_ascii_case("count") || !call.args.is_empty() {
                return Err(AnalyzerError::sql(format!("Argument * is not supported by {}", call.name.to_uppercase())));
            }
            Self::lookup(ctx, "$count_star")?
        } else {
            Self::lookup(ctx, &call.name)?
        };

        match (function.mode, &call.over) {
            (FunctionMode::Scalar, Some(_)) => Err(AnalyzerError::sql(format!(
                "Function {} is not an aggregate or analytic function and cannot have an OVER clause",
                function.sql_name()
            ))),
            (FunctionMode::Scalar, None) if call.distinct => Err(AnalyzerError::sql(format!(
                "DISTINCT is not allowed for scalar function {}",
                function.sql_name()
            ))),
            (FunctionMode::Scalar, None) => {
                let args = call.args.iter().map(|a| ExprResolver::resolve(ctx, a, ectx)).collect::<Result<Vec<_>, _>>()?;
                Self::resolve_scalar(ctx, function, args, span)
            }
            (FunctionMode::Analytic, None) => Err(AnalyzerError::sql(format!(
                "Analytic function {} must have an OVER clause",
                function.sql_name()
            ))),
            (FunctionMode::Aggregate, None) => AggregateResolver::resolve_aggregate(ctx, function, call, ectx, span),
            (_, Some(window)) => AggregateResolver::resolve_analytic(ctx, function, call, window, ectx, span),
        }
    }

    /// Operators are scalar catalog functions named `$op`.
    pub fn resolve_operator(
        ctx: &mut AnalysisContext,
        name: &str,
        args: Vec<ResolvedExpr>,
        span: Span,
    ) -> Result<ResolvedExpr, AnalyzerError> {
        let function = Self::lookup(ctx, name)?;
        Self::resolve_scalar(ctx, function, args, span)
    }

    fn resolve_scalar(
        ctx: &mut AnalysisContext,
        function: Arc<Function>,
        args: Vec<ResolvedExpr>,
        span: Span,
    ) -> Result<ResolvedExpr, AnalyzerError> {
        let (args, ty) = Self::bind_arguments(ctx, &function, args, span)?;
        Ok(ResolvedExpr::FunctionCall { function, args, ty })
    }

    /// Picks a signature and coerces `args` to it.
    pub fn bind_arguments(
        ctx: &mut AnalysisContext,
        function: &Function,
        args: Vec<ResolvedExpr>,
        span: Span,
    ) -> Result<(Vec<ResolvedExpr>, Type), AnalyzerError> {
        let matched = Self::match_signature(ctx, function, &args)?;
        let args = args
            .into_iter()
            .zip(&matched.argument_types)
            .map(|(arg, ty)| CoercionResolver::coerce(ctx, arg, ty, span))
            .collect::<Result<Vec<_>, _>>()?;
        ctx.warn_deprecated(function);
        Ok((args, matched.result))
    }

    /// Cheapest signature accepting `args`; ties go to the earlier
    /// signature.
    pub fn match_signature(
        ctx: &AnalysisContext,
        function: &Function,
        args: &[ResolvedExpr],
    ) -> Result<SignatureMatch, AnalyzerError> {
        let inputs: Vec<InputArgument> = args.iter().map(CoercionResolver::argument_of).collect();
        let mut best: Option<SignatureMatch> = None;
        for signature in &function.signatures {
            if let Some(m) = Self::try_signature(ctx, signature, &inputs)
                && best.as_ref().is_none_or(|b| m.cost < b.cost)
            {
                best = Some(m);
            }
        }
        let Some(matched) = best else {
            return Err(Self::no_match(function, &inputs));
        };
        if let Some(bound) = &matched.bound {
            let (ok, what) = match function.constraint {
                ArgumentConstraint::None => (true, ""),
                ArgumentConstraint::Equality => (bound.supports_equality(), "Equality"),
                ArgumentConstraint::Ordering => (bound.supports_ordering(), "Ordering"),
            };
            if !ok {
                return Err(AnalyzerError::sql(format!(
                    "{what} is not defined for arguments of type {bound} in {}",
                    function.sql_name()
                )));
            }
        }
        Ok(matched)
    }

    fn try_signature(
        ctx: &AnalysisContext,
        signature: &FunctionSignature,
        inputs: &[InputArgument],
    ) -> Option<SignatureMatch> {
        let count = inputs.len();
        if !signature.accepts_arity(count) {
            return None;
        }
        let coercer = ctx.coercer();

        // arguments sharing the templated type
        let mut templated = Vec::new();
        for (idx, input) in inputs.iter().enumerate() {
            match signature.argument_for(idx, count)? {
                SignatureArgument::Fixed(_) => {}
                SignatureArgument::Any => templated.push(input.clone()),
                SignatureArgument::ArrayOfAny => match input.ty.element_type() {
                    Some(element) if !input.is_untyped() => templated.push(input.child(element, None)),
                    _ if input.is_untyped() => templated.push(InputArgument::untyped_null()),
                    _ => return None,
                },
            }
        }
        let uses_template = signature.arguments.iter().any(|a| !matches!(a, SignatureArgument::Fixed(_)))
            || !matches!(signature.result, SignatureResult::Fixed(_));
        let bound = if uses_template { Some(coercer.common_supertype(&templated)?) } else { None };

        let mut argument_types = Vec::with_capacity(count);
        let mut cost = 0;
        for (idx, input) in inputs.iter().enumerate() {
            let target = match signature.argument_for(idx, count)? {
                SignatureArgument::Fixed(ty) => ty.clone(),
                SignatureArgument::Any => bound.clone()?,
                SignatureArgument::ArrayOfAny => Type::array(bound.clone()?),
            };
            if !coercer.coerces_to(input, &target, false) {
                return None;
            }
            if !input.is_untyped() {
                cost += TypeKind::coercion_cost(target.kind(), input.ty.kind());
            }
            argument_types.push(target);
        }
        let result = match &signature.result {
            SignatureResult::Fixed(ty) => ty.clone(),
            SignatureResult::Any => bound.clone()?,
            SignatureResult::ArrayOfAny => Type::array(bound.clone()?),
        };
        Some(SignatureMatch { argument_types, result, bound, cost })
    }

    fn no_match(function: &Function, inputs: &[InputArgument]) -> AnalyzerError {
        let name = if function.is_operator() {
            function.sql_name()
        } else {
            format!("function {}", function.sql_name())
        };
        let types: Vec<String> = inputs
            .iter()
            .map(|i| match i.kind {
                ArgumentKind::UntypedNull => "NULL".to_string(),
                _ => i.ty.debug_string(),
            })
            .collect();
        let found = if types.is_empty() {
            "with no arguments".to_string()
        } else {
            format!("for argument types: {}", types.join(", "))
        };
        AnalyzerError::sql(format!(
            "No matching signature for {name} {found}. Supported signatures: {}",
            function.supported_signatures()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analyzer::AnalyzerOptions,
        catalog::{Catalog, SimpleCatalog},
        resolved::{ColumnId, ResolvedColumn},
        types::{LanguageFeature, LanguageOptions, Value},
    };

    fn column(id: u32, ty: Type) -> ResolvedExpr {
        ResolvedExpr::column_ref(ResolvedColumn { id: ColumnId(id), table_name: "t".into(), name: "c".into(), ty })
    }

    #[test]
    fn cheapest_signature_wins() {
        let catalog = SimpleCatalog::new("c");
        let options = AnalyzerOptions::new();
        let mut ctx = AnalysisContext::new(&catalog, &options);
        let add = catalog.find_function("$add").unwrap();
        let args = vec![column(1, Type::Int64), ResolvedExpr::literal(Value::int64(1))];
        let m = FunctionResolver::match_signature(&ctx, &add, &args).unwrap();
        assert_eq!(m.result, Type::Int64);

        let args = vec![column(1, Type::Int64), column(2, Type::Double)];
        let (args, ty) = FunctionResolver::bind_arguments(&mut ctx, &add, args, Span::default()).unwrap();
        assert_eq!(ty, Type::Double);
        assert_eq!(args[0].node_name(), "Cast");
    }

    #[test]
    fn integer_division_is_double_unless_a_decimal_is_involved() {
        let catalog = SimpleCatalog::new("c");
        let options = AnalyzerOptions::new();
        let ctx = AnalysisContext::new(&catalog, &options);
        let divide = catalog.find_function("$divide").unwrap();
        let ints = vec![ResolvedExpr::literal(Value::int64(1)), ResolvedExpr::literal(Value::int64(2))];
        assert_eq!(FunctionResolver::match_signature(&ctx, &divide, &ints).unwrap().result, Type::Double);

        let mixed = vec![column(1, Type::Int64), column(2, Type::Numeric)];
        assert_eq!(FunctionResolver::match_signature(&ctx, &divide, &mixed).unwrap().result, Type::Numeric);

        let add = catalog.find_function("$add").unwrap();
        assert_eq!(FunctionResolver::match_signature(&ctx, &add, &mixed).unwrap().result, Type::Numeric);
    }

    #[test]
    fn mismatches_list_the_signatures() {
        let catalog = SimpleCatalog::new("c");
        let options = AnalyzerOptions::new();
        let ctx = AnalysisContext::new(&catalog, &options);
        let length = catalog.find_function("length").unwrap();
        let err = FunctionResolver::match_signature(&ctx, &length, &[column(1, Type::Date)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No matching signature for function LENGTH for argument types: DATE. \
             Supported signatures: LENGTH(STRING); LENGTH(BYTES)"
        );
    }

    #[test]
    fn templated_arguments_share_a_type() {
        let catalog = SimpleCatalog::new("c");
        let options = AnalyzerOptions::new();
        let ctx = AnalysisContext::new(&catalog, &options);
        let coalesce = catalog.find_function("coalesce").unwrap();
        let args = vec![ResolvedExpr::literal(Value::null(Type::Int64)), column(1, Type::String)];
        let m = FunctionResolver::match_signature(&ctx, &coalesce, &args).unwrap();
        assert_eq!(m.result, Type::String);
        assert_eq!(m.argument_types, vec![Type::String, Type::String]);

        let len = catalog.find_function("array_length").unwrap();
        let m = FunctionResolver::match_signature(&ctx, &len, &[column(1, Type::array(Type::Date))]).unwrap();
        assert_eq!(m.argument_types, vec![Type::array(Type::Date)]);
    }

    #[test]
    fn comparison_constraints_apply_to_the_bound_type() {
        let catalog = SimpleCatalog::new("c");
        let options = AnalyzerOptions::new();
        let ctx = AnalysisContext::new(&catalog, &options);
        let less = catalog.find_function("$less").unwrap();
        let arrays = vec![column(1, Type::array(Type::Int64)), column(2, Type::array(Type::Int64))];
        let err = FunctionResolver::match_signature(&ctx, &less, &arrays).unwrap_err();
        assert!(err.to_string().starts_with("Ordering is not defined for arguments of type ARRAY<INT64>"));
    }

    #[test]
    fn deprecated_functions_warn_once() {
        let mut catalog = SimpleCatalog::new("c");
        catalog.add_function(Function::scalar("old_len", vec![FunctionSignature::fixed(&[Type::String], Type::Int64)]).deprecated());
        let options = AnalyzerOptions::with_language(LanguageOptions::new().enable(LanguageFeature::DeprecationWarnings));
        let mut ctx = AnalysisContext::new(&catalog, &options);
        let f = FunctionResolver::lookup(&ctx, "OLD_LEN").unwrap();
        for _ in 0..2 {
            let arg = vec![ResolvedExpr::literal(Value::string("x"))];
            FunctionResolver::bind_arguments(&mut ctx, &f, arg, Span::default()).unwrap();
        }
        assert_eq!(ctx.accumulator.deprecation_warnings.len(), 1);
    }
}
