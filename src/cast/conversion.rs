use std::{fmt, sync::Arc};

use crate::{
    analyzer::AnalyzerError,
    cast::CastClass,
    types::{Type, Value},
};

/// User-supplied conversion body.
pub type ConversionFn = Arc<dyn Fn(&Value) -> Result<Value, AnalyzerError> + Send + Sync>;

/// What kind of expression is being converted when asking a catalog for a
/// conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionSourceKind {
    Literal,
    Parameter,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindConversionOptions {
    pub is_explicit: bool,
    pub source_kind: ConversionSourceKind,
}

impl FindConversionOptions {
    pub fn explicit() -> Self {
        Self { is_explicit: true, source_kind: ConversionSourceKind::Literal }
    }

    pub fn implicit(source_kind: ConversionSourceKind) -> Self {
        Self { is_explicit: false, source_kind }
    }
}

/// Runs a conversion function for one `(from, to)` pair.
#[derive(Clone)]
pub struct ConversionEvaluator {
    from: Type,
    to: Type,
    function: ConversionFn,
}

impl ConversionEvaluator {
    pub fn new(from: Type, to: Type, function: ConversionFn) -> Result<Self, AnalyzerError> {
        if from == to {
            return Err(AnalyzerError::InvalidArgument(format!(
                "Conversion from {from} to itself is not allowed"
            )));
        }
        Ok(Self { from, to, function })
    }

    pub fn from_type(&self) -> &Type {
        &self.from
    }

    pub fn to_type(&self) -> &Type {
        &self.to
    }

    pub fn eval(&self, value: &Value) -> Result<Value, AnalyzerError> {
        if value.ty() != &self.from {
            return Err(AnalyzerError::InvalidArgument(
                "Type of casted value doesn't match the source type of conversion".into(),
            ));
        }
        let out = (self.function)(value)?;
        if out.ty() != &self.to {
            return Err(AnalyzerError::InvalidArgument(format!(
                "Conversion to {} returned a value of type {}",
                self.to,
                out.ty()
            )));
        }
        Ok(out)
    }
}

impl fmt::Debug for ConversionEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionEvaluator").field("from", &self.from).field("to", &self.to).finish()
    }
}

/// A catalog-registered cast involving an extended type.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub evaluator: ConversionEvaluator,
    pub property: CastClass,
}

impl Conversion {
    pub fn new(from: Type, to: Type, function: ConversionFn, property: CastClass) -> Result<Self, AnalyzerError> {
        Ok(Self { evaluator: ConversionEvaluator::new(from, to, function)?, property })
    }

    /// Explicit requests always match; implicit ones depend on the
    /// conversion's class and the kind of source expression.
    pub fn is_match(&self, options: &FindConversionOptions) -> bool {
        if options.is_explicit || self.property.supports_implicit_coercion() {
            return true;
        }
        match options.source_kind {
            ConversionSourceKind::Literal => self.property.supports_literal_coercion(),
            ConversionSourceKind::Parameter => self.property == CastClass::ExplicitOrLiteralOrParameter,
            ConversionSourceKind::Other => false,
        }
    }

    pub fn eval(&self, value: &Value) -> Result<Value, AnalyzerError> {
        self.evaluator.eval(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money_to_string(property: CastClass) -> Conversion {
        let money = Type::extended("MONEY");
        Conversion::new(
            money,
            Type::String,
            Arc::new(|v: &Value| Ok(Value::string(v.debug_string()))),
            property,
        )
        .unwrap()
    }

    #[test]
    fn matching_follows_property_and_source_kind() {
        let lit = FindConversionOptions::implicit(ConversionSourceKind::Literal);
        let param = FindConversionOptions::implicit(ConversionSourceKind::Parameter);
        let other = FindConversionOptions::implicit(ConversionSourceKind::Other);

        let c = money_to_string(CastClass::Explicit);
        assert!(c.is_match(&FindConversionOptions::explicit()));
        assert!(!c.is_match(&lit));

        let c = money_to_string(CastClass::ExplicitOrLiteral);
        assert!(c.is_match(&lit) && !c.is_match(&param));

        let c = money_to_string(CastClass::ExplicitOrLiteralOrParameter);
        assert!(c.is_match(&lit) && c.is_match(&param) && !c.is_match(&other));

        assert!(money_to_string(CastClass::Implicit).is_match(&other));
    }

    #[test]
    fn evaluator_checks_source_type() {
        let c = money_to_string(CastClass::Explicit);
        let ok = c.eval(&Value::extended(Type::extended("MONEY"), "$1")).unwrap();
        assert_eq!(ok, Value::string("$1"));
        let err = c.eval(&Value::int64(1)).unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidArgument(_)));
    }
}
