use crate::{
    analyzer::{AnalysisContext, AnalyzerError},
    ast::{Literal, Span},
    cast::cast_value,
    resolved::ResolvedExpr,
    types::{Type, Value},
};

pub struct LiteralResolver;

impl LiteralResolver {
    pub fn resolve(ctx: &AnalysisContext, literal: &Literal, span: Span) -> Result<ResolvedExpr, AnalyzerError> {
        let value = match literal {
            // bare NULL: INT64 until something coerces it
            Literal::Null => Value::null(Type::Int64),
            Literal::Bool(b) => Value::bool(*b),
            Literal::Int(v) => Value::int64(*v),
            Literal::Float(v) => Value::double(*v),
            Literal::String(s) => Value::string(s.clone()),
            Literal::Bytes(b) => Value::bytes(b.clone()),
            Literal::Typed { type_name, text } => return Self::typed(ctx, type_name, text, span),
        };
        Ok(ResolvedExpr::literal(value))
    }

    /// `DATE '2020-01-01'` and friends: the text is cast from STRING.
    fn typed(ctx: &AnalysisContext, type_name: &str, text: &str, span: Span) -> Result<ResolvedExpr, AnalyzerError> {
        let ty = ctx.resolve_type(type_name, span)?;
        let source = match ty {
            Type::Bytes => Value::bytes(text.as_bytes().to_vec()),
            _ => Value::string(text),
        };
        let value = cast_value(&source, &ty, ctx.options.default_time_zone, &ctx.options.language, Some(ctx.catalog))
            .map_err(|e| match e {
                AnalyzerError::UnsupportedCast { .. } => {
                    AnalyzerError::sql(format!("Invalid {} literal", ty.debug_string()))
                }
                other => other,
            })
            .map_err(|e| e.at(span))?;
        Ok(ResolvedExpr::Literal { value, has_explicit_type: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analyzer::{AnalyzerOptions, ErrorClass},
        catalog::SimpleCatalog,
    };

    #[test]
    fn typed_literals_parse_their_text() {
        let catalog = SimpleCatalog::new("c");
        let options = AnalyzerOptions::new();
        let ctx = AnalysisContext::new(&catalog, &options);
        let date = LiteralResolver::resolve(
            &ctx,
            &Literal::Typed { type_name: "DATE".into(), text: "2021-03-04".into() },
            Span::default(),
        )
        .unwrap();
        assert_eq!(date.ty(), &Type::Date);
        assert!(matches!(date, ResolvedExpr::Literal { has_explicit_type: true, .. }));

        let bad = LiteralResolver::resolve(
            &ctx,
            &Literal::Typed { type_name: "DATE".into(), text: "yesterday".into() },
            Span::new(3, 20),
        )
        .unwrap_err();
        assert_eq!(bad.class(), ErrorClass::Dynamic);
        assert_eq!(bad.location(), Some(Span::new(3, 20)));
    }

    #[test]
    fn plain_literals_are_untyped() {
        let catalog = SimpleCatalog::new("c");
        let options = AnalyzerOptions::new();
        let ctx = AnalysisContext::new(&catalog, &options);
        let one = LiteralResolver::resolve(&ctx, &Literal::Int(1), Span::default()).unwrap();
        assert_eq!(one, ResolvedExpr::literal(Value::int64(1)));
        let null = LiteralResolver::resolve(&ctx, &Literal::Null, Span::default()).unwrap();
        assert_eq!(null.ty(), &Type::Int64);
    }
}
